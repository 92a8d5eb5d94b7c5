//! Command-line replay tool for texting transcripts.
//!
//! Feeds a file (or stdin) through the streaming parser in fragments of a
//! fixed size, printing every notification as it is delivered and a summary
//! of the collected calls on stderr.
//!
//! Usage:
//!   texting [PATH] [--chunk-size N] [--bare] [--coalesce] [--json] [--config PATH]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use texting_config::Config;
use texting_parser::{CallRecord, Event, EventSink, Grammar, TextingParser, coalesce_chunks};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Parser, Debug)]
#[command(
    name = "texting",
    version,
    about = "Replay a texting transcript through the streaming parser"
)]
struct Cli {
    /// Transcript to replay. Reads stdin when omitted.
    path: Option<PathBuf>,

    /// Characters per fragment; 0 feeds the whole text at once. Defaults to
    /// the configured chunk size.
    #[arg(long, short = 'n')]
    chunk_size: Option<usize>,

    /// Use the legacy bare grammar (`@mention` ... `@/`).
    #[arg(long)]
    bare: bool,

    /// Merge adjacent chunks of the same kind before printing.
    #[arg(long)]
    coalesce: bool,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Config file to use instead of ~/.config/texting/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

/// Writes each event on its own line as soon as the parser delivers it.
struct Printer<W> {
    out: W,
    format: Format,
    coalesce: bool,
    /// Last chunk, kept back while it may still merge with the next one.
    held: Option<Event>,
}

impl<W: AsyncWrite + Unpin> Printer<W> {
    fn new(out: W, format: Format, coalesce: bool) -> Self {
        Self {
            out,
            format,
            coalesce,
            held: None,
        }
    }

    async fn write(&mut self, event: &Event) -> Result<()> {
        let line = match self.format {
            Format::Text => event.to_string(),
            Format::Json => serde_json::to_string(event)?,
        };
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(event) = self.held.take() {
            self.write(&event).await?;
        }
        self.out.flush().await?;
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin> EventSink for Printer<W> {
    async fn event(&mut self, event: Event) -> Result<()> {
        if !self.coalesce {
            return self.write(&event).await;
        }

        let mut merged = coalesce_chunks(self.held.take().into_iter().chain([event]));
        let Some(last) = merged.pop() else {
            return Ok(());
        };
        for event in &merged {
            self.write(event).await?;
        }
        if last.chunk_text().is_some() {
            self.held = Some(last);
        } else {
            self.write(&last).await?;
        }
        Ok(())
    }
}

/// Splits `text` into fragments of `chunk_size` chars; 0 keeps it whole.
fn fragments(text: &str, chunk_size: usize) -> Vec<&str> {
    if chunk_size == 0 || text.is_empty() {
        return vec![text];
    }
    let mut out = vec![];
    let mut start = 0;
    for (count, (i, _)) in text.char_indices().enumerate() {
        if count > 0 && count % chunk_size == 0 {
            out.push(&text[start..i]);
            start = i;
        }
    }
    out.push(&text[start..]);
    out
}

async fn replay<W: AsyncWrite + Unpin>(
    text: &str,
    chunk_size: usize,
    grammar: Grammar,
    printer: Printer<W>,
) -> Result<(Printer<W>, Vec<CallRecord>)> {
    let mut parser = TextingParser::with_grammar(grammar, printer)?;
    for fragment in fragments(text, chunk_size) {
        parser.feed(fragment).await?;
    }
    parser.finalize().await?;

    let calls = parser.collected_calls().to_vec();
    let mut printer = parser.into_receiver();
    printer.flush().await?;
    Ok((printer, calls))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let path = Config::expand_path(path);
            Config::load_from_path(&path)?
                .with_context(|| format!("config file {} not found", path.display()))
        }
        None => {
            log::debug!("config path: {}", Config::config_path().display());
            Ok(Config::load()?.unwrap_or_default())
        }
    }
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            let path = Config::expand_path(path);
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_summary(calls: &[CallRecord], grammar: &Grammar) {
    eprintln!("{} call(s)", calls.len());
    for call in calls {
        let body = match (&call.body, call.is_fenced()) {
            (None, _) => "no body",
            (Some(_), true) => "fenced body",
            (Some(_), false) => "plain body",
        };
        eprintln!(
            "  {}  {}  [{}]  {body}",
            call.call_id,
            call.first_mention,
            call.mentions(grammar).join(", ")
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let grammar = if cli.bare {
        Grammar::bare()
    } else {
        config.grammar
    };
    let chunk_size = cli.chunk_size.unwrap_or(config.chunk_size);

    let text = read_input(cli.path.as_deref()).await?;
    log::debug!(
        "replaying {} bytes in fragments of {chunk_size} chars",
        text.len()
    );

    let format = if cli.json { Format::Json } else { Format::Text };
    let printer = Printer::new(tokio::io::stdout(), format, cli.coalesce);
    let (_, calls) = replay(&text, chunk_size, grammar.clone(), printer).await?;
    print_summary(&calls, &grammar);
    Ok(())
}
