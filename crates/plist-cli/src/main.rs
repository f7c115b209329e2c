//! `plist` CLI: convert, dump, and inspect property lists from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Convert any property list to binary (stdin → stdout)
//! cat Info.plist | plist convert --to binary > Info.bplist
//!
//! # Convert from file to file
//! plist convert -i Info.bplist -o Info.plist --to xml
//!
//! # Old-style text, Apple or GnuStep flavour
//! plist convert -i prefs.plist --to gnustep
//!
//! # Dump as pretty-printed JSON
//! plist dump -i Info.plist
//!
//! # Show the detected format and a summary of the tree
//! plist info -i Info.plist
//!
//! # Trace codec internals on stderr
//! plist --verbose info -i Info.plist
//! ```
//!
//! The input format is always detected from the content.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plist_core::{Dialect, OutputFormat, Value};
use std::io::{self, Read, Write};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "plist",
    version,
    about = "Property list (binary, XML, ASCII) converter",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log codec activity to stderr (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode a property list in another format
    Convert {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Target format
        #[arg(long, value_enum)]
        to: Target,
    },
    /// Print a property list as pretty-printed JSON
    Dump {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the detected format, root type and element count
    Info {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Binary,
    Xml,
    /// Old-style NeXTSTEP/Apple text
    Ascii,
    /// Old-style text with GnuStep typed literals
    Gnustep,
}

impl From<Target> for OutputFormat {
    fn from(target: Target) -> Self {
        match target {
            Target::Binary => OutputFormat::Binary,
            Target::Xml => OutputFormat::Xml,
            Target::Ascii => OutputFormat::Ascii(Dialect::Apple),
            Target::Gnustep => OutputFormat::Ascii(Dialect::GnuStep),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert { input, output, to } => {
            let bytes = read_input(input.as_deref())?;
            let value = plist_core::from_bytes(&bytes).context("Failed to parse property list")?;
            let format = OutputFormat::from(to);
            let out = plist_core::to_bytes(&value, format)
                .with_context(|| format!("Failed to encode property list as {}", format.format()))?;
            write_output(output.as_deref(), &out)?;
        }
        Commands::Dump { input, output } => {
            let bytes = read_input(input.as_deref())?;
            let value = plist_core::from_bytes(&bytes).context("Failed to parse property list")?;
            let mut pretty = serde_json::to_string_pretty(&value)?;
            pretty.push('\n');
            write_output(output.as_deref(), pretty.as_bytes())?;
        }
        Commands::Info { input } => {
            let bytes = read_input(input.as_deref())?;
            let format =
                plist_core::detect_format(&bytes).context("Failed to detect property list format")?;
            let value = plist_core::from_bytes(&bytes).context("Failed to parse property list")?;
            println!("Format:    {format}");
            println!("Root:      {}", value.kind_name());
            println!("Elements:  {}", count_elements(&value));
            println!("Size:      {} bytes", bytes.len());
        }
    }

    Ok(())
}

/// Install a stderr subscriber when `--verbose` or `RUST_LOG` asks for one.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => return,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

/// Every node in the tree, the root and dictionary values included.
fn count_elements(value: &Value) -> usize {
    1 + match value {
        Value::Dictionary(dict) => dict.values().map(count_elements).sum(),
        Value::Array(items) | Value::Set(items) => items.iter().map(count_elements).sum(),
        _ => 0,
    }
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    let bytes = match path {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read file: {path}"))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    debug!(bytes = bytes.len(), source = path.unwrap_or("<stdin>"), "read input");
    Ok(bytes)
}

fn write_output(path: Option<&str>, content: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write file: {path}"))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content)
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
