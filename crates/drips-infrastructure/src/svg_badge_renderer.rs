//! SVG badge renderer: initials in white on a filled black circle.

use drips_core::avatar::{AvatarImage, BadgeRenderer, BadgeSize};

pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Renders badges as standalone SVG documents.
#[derive(Debug, Clone)]
pub struct SvgBadgeRenderer {
    background: String,
    foreground: String,
}

impl SvgBadgeRenderer {
    pub fn new() -> Self {
        Self {
            background: "#000000".to_string(),
            foreground: "#FFFFFF".to_string(),
        }
    }

    /// Overrides fill (circle) and text colours. Any SVG colour value works.
    pub fn with_colors(mut self, background: impl Into<String>, foreground: impl Into<String>) -> Self {
        self.background = background.into();
        self.foreground = foreground.into();
        self
    }
}

impl Default for SvgBadgeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BadgeRenderer for SvgBadgeRenderer {
    fn render(&self, text: &str, size: BadgeSize) -> AvatarImage {
        let cx = f64::from(size.width) / 2.0;
        let cy = f64::from(size.height) / 2.0;
        let font_size = (f64::from(size.width.min(size.height)) * 0.4).round();

        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<ellipse cx="{cx}" cy="{cy}" rx="{cx}" ry="{cy}" fill="{bg}"/>"#,
                r#"<text x="{cx}" y="{cy}" fill="{fg}" font-family="sans-serif" font-size="{fs}" "#,
                r#"text-anchor="middle" dominant-baseline="central">{text}</text>"#,
                "</svg>"
            ),
            w = size.width,
            h = size.height,
            cx = cx,
            cy = cy,
            bg = escape_xml(&self.background),
            fg = escape_xml(&self.foreground),
            fs = font_size,
            text = escape_xml(text),
        );

        AvatarImage::new(text, size, SVG_MEDIA_TYPE, svg.into_bytes())
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg_text(image: &AvatarImage) -> String {
        String::from_utf8(image.bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_render_draws_circle_and_centred_text() {
        let image = SvgBadgeRenderer::new().render("MT", BadgeSize::square(64));
        let svg = svg_text(&image);

        assert_eq!(image.media_type(), SVG_MEDIA_TYPE);
        assert_eq!(image.initials(), "MT");
        assert_eq!(image.size(), BadgeSize::square(64));
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"width="64" height="64""#));
        assert!(svg.contains(r##"<ellipse cx="32" cy="32" rx="32" ry="32" fill="#000000"/>"##));
        assert!(svg.contains(r##"fill="#FFFFFF""##));
        assert!(svg.contains(r#"text-anchor="middle""#));
        assert!(svg.contains(">MT</text>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = SvgBadgeRenderer::new();
        let a = renderer.render("S", BadgeSize::square(48));
        let b = renderer.render("S", BadgeSize::square(48));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_escapes_markup() {
        let image = SvgBadgeRenderer::new().render("<&", BadgeSize::square(32));
        assert!(svg_text(&image).contains(">&lt;&amp;</text>"));
        assert_eq!(image.initials(), "<&");
    }

    #[test]
    fn test_custom_colors() {
        let image = SvgBadgeRenderer::new()
            .with_colors("navy", "gold")
            .render("A", BadgeSize { width: 80, height: 40 });
        let svg = svg_text(&image);
        assert!(svg.contains(r#"rx="40" ry="20" fill="navy""#));
        assert!(svg.contains(r#"fill="gold""#));
        assert!(svg.contains(r#"font-size="16""#));
    }
}
