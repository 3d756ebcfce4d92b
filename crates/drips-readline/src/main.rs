mod command;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use drips_application::{SearchSession, SearchSessionHandle};
use drips_core::observer::{ChannelObserver, SessionEvent};
use drips_core::search::SearchResultItem;
use drips_infrastructure::{
    ConfigService, DripsPaths, SvgBadgeRenderer, WikipediaSearchFetcher, article_url,
};

use crate::command::{CommandHint, ReplCommand, clamp_rows};

/// Rows as last reported by the session, for `/open`.
type Rows = Arc<Mutex<Vec<SearchResultItem>>>;

/// Rustyline helper backed by the slash command table.
#[derive(Clone, Copy)]
struct CliHelper;

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = command::completions(&line[..pos])
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hint for CommandHint {
    fn display(&self) -> &str {
        self.text()
    }

    fn completion(&self) -> Option<&str> {
        match self {
            CommandHint::Name(rest) => Some(rest),
            CommandHint::Usage(_) => None,
        }
    }
}

impl Hinter for CliHelper {
    type Hint = CommandHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<CommandHint> {
        // Only at the end of the line
        if pos < line.len() {
            return None;
        }
        command::hint(line)
    }
}

impl Validator for CliHelper {}

/// Sends tracing output to a daily log file so it never interleaves with the
/// prompt. The guard must live until exit to flush buffered lines.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = DripsPaths::log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::daily(&log_dir, "drips.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn print_rows(start: usize, items: &[SearchResultItem]) {
    for (offset, item) in items.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{:>5}", start + offset).bright_black(),
            item.title.bright_blue(),
            format!("({})", item.edited_label()).bright_black()
        );
    }
}

fn print_event(rows: &Rows, event: SessionEvent) {
    let mut shown = rows.lock().unwrap_or_else(PoisonError::into_inner);

    match event {
        SessionEvent::ItemsReset { items } => {
            if items.is_empty() {
                println!("{}", "(no results)".bright_black());
            } else {
                println!("{}", format!("{} results", items.len()).bright_green());
                print_rows(0, &items);
            }
            *shown = items;
        }
        SessionEvent::ItemsAppended { start_index, items } => {
            print_rows(start_index, &items);
            shown.extend(items);
        }
        SessionEvent::AvatarReady { index, image } => {
            println!(
                "{}",
                format!(
                    "  [{}] badge '{}' ready ({}, {} bytes of {})",
                    index,
                    image.initials(),
                    image.size(),
                    image.bytes().len(),
                    image.media_type()
                )
                .bright_black()
            );
        }
        SessionEvent::Error { message } => {
            println!("{}", message.red());
            println!("{}", "Type '/retry' to try again or '/cancel'.".yellow());
        }
    }
}

fn open_row(rows: &Rows, index: usize) {
    let shown = rows.lock().unwrap_or_else(PoisonError::into_inner);
    match shown.get(index).and_then(|item| article_url(&item.title)) {
        Some(url) => println!("{}", url.as_str().bright_cyan()),
        None => println!("{}", format!("No row {index}").yellow()),
    }
}

/// Rows of `range` that are currently listed, or `None` after telling the
/// user there are none.
fn listed_rows(rows: &Rows, range: RangeInclusive<usize>) -> Option<Vec<usize>> {
    let len = rows.lock().unwrap_or_else(PoisonError::into_inner).len();
    let indices = clamp_rows(range.clone(), len);
    if indices.is_empty() {
        println!(
            "{}",
            format!("No rows in {}-{} ({len} listed)", range.start(), range.end()).yellow()
        );
        return None;
    }
    Some(indices)
}

fn apply(handle: &SearchSessionHandle, rows: &Rows, command: ReplCommand) -> Result<()> {
    match command {
        ReplCommand::Query(text) => handle.query_text_changed(text)?,
        ReplCommand::Scroll(index) => handle.near_end_of_visible_range(index)?,
        ReplCommand::Show(range) => {
            if let Some(indices) = listed_rows(rows, range) {
                handle.rows_visible(indices)?;
            }
        }
        ReplCommand::Hide(range) => {
            if let Some(indices) = listed_rows(rows, range) {
                handle.rows_hidden(indices)?;
            }
        }
        ReplCommand::Open(index) => open_row(rows, index),
        ReplCommand::Cancel => handle.cancel()?,
        ReplCommand::Retry => handle.retry()?,
        ReplCommand::Quit => {}
    }
    Ok(())
}

/// The main entry point for the drips readline REPL.
///
/// Every plain line is treated as the new content of the search box; slash
/// commands stand in for scrolling and row visibility. Session events are
/// printed by a background task as they arrive.
#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;

    // ===== Backend Initialization =====
    let config_service = ConfigService::new_default()?;
    let config = config_service.get_config()?;
    tracing::info!(
        "[Drips] Starting with config {} (endpoint {})",
        config_service.path().display(),
        config.search.endpoint
    );
    let fetcher = Arc::new(WikipediaSearchFetcher::new(&config.search));
    let renderer = Arc::new(SvgBadgeRenderer::new());
    let (observer, mut events) = ChannelObserver::channel();

    let session = SearchSession::new(config, fetcher, renderer, Arc::new(observer));
    let handle = session.handle();
    let session_task = tokio::spawn(session.run());

    // Spawn response handler task
    let rows: Rows = Arc::default();
    let handler_rows = Arc::clone(&rows);
    let response_handler = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&handler_rows, event);
        }
    });

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== Drips: Wikipedia search ===".bright_magenta().bold());
    println!(
        "{}",
        "Type to search. '/scroll <row>', '/show <a>-<b>', '/hide <a>-<b>', '/open <row>', '/cancel', '/retry', or 'quit'."
            .bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match ReplCommand::parse(&line) {
                    Ok(ReplCommand::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Ok(command) => {
                        if let Err(e) = apply(&handle, &rows, command) {
                            eprintln!("{}", format!("Error: {e}").red());
                            break;
                        }
                    }
                    Err(usage) => println!("{}", usage.yellow()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Session shutdown closes the event channel, which ends the handler
    let _ = handle.shutdown();
    let _ = session_task.await;
    let _ = response_handler.await;

    Ok(())
}
