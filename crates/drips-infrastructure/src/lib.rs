pub mod config_service;
pub mod paths;
pub mod svg_badge_renderer;
pub mod wikipedia_search;

pub use crate::config_service::ConfigService;
pub use crate::paths::DripsPaths;
pub use crate::svg_badge_renderer::SvgBadgeRenderer;
pub use crate::wikipedia_search::{WikipediaSearchFetcher, article_url, parse_search_response};
