//! REPL input parsing.

use std::ops::RangeInclusive;

/// Slash commands with the argument each one expects.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/scroll", "<row>"),
    ("/show", "<a>-<b>"),
    ("/hide", "<a>-<b>"),
    ("/open", "<row>"),
    ("/cancel", ""),
    ("/retry", ""),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain text: the search box now contains this.
    Query(String),
    /// The list scrolled so that this row is visible.
    Scroll(usize),
    Show(RangeInclusive<usize>),
    Hide(RangeInclusive<usize>),
    Open(usize),
    Cancel,
    Retry,
    Quit,
}

impl ReplCommand {
    /// Parses one input line. Returns a usage message for malformed commands.
    pub fn parse(line: &str) -> Result<Self, String> {
        let trimmed = line.trim();
        if trimmed == "quit" || trimmed == "exit" {
            return Ok(Self::Quit);
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Query(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match name {
            "scroll" => parse_index(arg).map(Self::Scroll),
            "show" => parse_rows(arg).map(Self::Show),
            "hide" => parse_rows(arg).map(Self::Hide),
            "open" => parse_index(arg).map(Self::Open),
            "cancel" => Ok(Self::Cancel),
            "retry" => Ok(Self::Retry),
            other => Err(format!("Unknown command: /{other}")),
        }
    }
}

fn parse_index(arg: &str) -> Result<usize, String> {
    arg.parse()
        .map_err(|_| format!("Expected a row number, got '{arg}'"))
}

/// `<a>` or `<a>-<b>`, inclusive.
fn parse_rows(arg: &str) -> Result<RangeInclusive<usize>, String> {
    let (start, end) = match arg.split_once('-') {
        Some((start, end)) => (parse_index(start.trim())?, parse_index(end.trim())?),
        None => {
            let index = parse_index(arg)?;
            (index, index)
        }
    };

    if start > end {
        return Err(format!("Row range {start}-{end} is backwards"));
    }
    Ok(start..=end)
}

/// Command names starting with `prefix`.
pub fn completions(prefix: &str) -> Vec<&'static str> {
    if !prefix.starts_with('/') {
        return Vec::new();
    }
    COMMANDS
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| name.starts_with(prefix))
        .collect()
}

/// Text shown after the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandHint {
    /// Rest of a partly typed command name; accepting it completes the name.
    Name(String),
    /// Argument a complete command still needs. Display only.
    Usage(String),
}

impl CommandHint {
    pub fn text(&self) -> &str {
        match self {
            Self::Name(text) | Self::Usage(text) => text,
        }
    }
}

/// Hint for `line` with the cursor at its end.
pub fn hint(line: &str) -> Option<CommandHint> {
    if !line.starts_with('/') {
        return None;
    }

    match line.split_once(char::is_whitespace) {
        None => {
            let (name, usage) = COMMANDS.iter().find(|(name, _)| name.starts_with(line))?;
            if name.len() > line.len() {
                Some(CommandHint::Name(name[line.len()..].to_string()))
            } else if !usage.is_empty() {
                Some(CommandHint::Usage(format!(" {usage}")))
            } else {
                None
            }
        }
        Some((typed, arg)) if arg.trim().is_empty() => COMMANDS
            .iter()
            .find(|(name, usage)| *name == typed && !usage.is_empty())
            .map(|(_, usage)| CommandHint::Usage(usage.to_string())),
        Some(_) => None,
    }
}

/// Limits `range` to the `len` rows currently listed.
pub fn clamp_rows(range: RangeInclusive<usize>, len: usize) -> Vec<usize> {
    let Some(last) = len.checked_sub(1) else {
        return Vec::new();
    };
    let (start, end) = (*range.start(), (*range.end()).min(last));
    if start > end {
        return Vec::new();
    }
    (start..=end).collect()
}
