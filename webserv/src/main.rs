//! Webserv - an nginx-style configurable web server
//!
//! This is the main entry point for the Webserv CLI.

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use std::ops::Range;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webserv_config::{ConfigError, ConfigProvider};

/// Webserv - nginx-style configuration compiler and web server
#[derive(Parser)]
#[command(name = "webserv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "webserv.conf")]
        config: String,

        /// Extra include pattern merged after the file's own includes
        #[arg(long)]
        include: Option<String>,
    },

    /// Print the compiled configuration tree
    Show {
        /// Path to the configuration file
        #[arg(default_value = "webserv.conf")]
        config: String,

        /// Extra include pattern merged after the file's own includes
        #[arg(long)]
        include: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Validate { config, include } => {
            tracing::info!("Validating config: {}", config);
            let mut provider = ConfigProvider::default();

            match provider.load(&config, include.as_deref()) {
                Ok(()) => {
                    println!("✅ Configuration '{}' is valid!", config);
                }
                Err(e) => {
                    report_error(Path::new(&config), &e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Show { config, include, format } => {
            let mut provider = ConfigProvider::default();
            if let Err(e) = provider.load(&config, include.as_deref()) {
                report_error(Path::new(&config), &e);
                std::process::exit(1);
            }

            let tree = provider.configuration()?;
            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(tree)?,
                Format::Toml => toml::to_string_pretty(tree)?,
            };
            println!("{}", rendered);
        }

        Commands::Version => {
            println!("Webserv v{}", env!("CARGO_PKG_VERSION"));
            println!("Configuration model v{}", webserv_core::VERSION);
        }
    }

    Ok(())
}

/// Print a configuration error, with a source excerpt for syntax errors
fn report_error(path: &Path, err: &ConfigError) {
    let source = err
        .line()
        .and_then(|line| std::fs::read_to_string(path).ok().map(|src| (line, src)));

    let Some((line, src)) = source else {
        eprintln!("❌ Configuration Error: {}", err);
        return;
    };

    let id = path.display().to_string();
    let span = line_span(&src, line);
    let printed = Report::build(ReportKind::Error, (id.as_str(), span.clone()))
        .with_message(err.to_string())
        .with_label(
            Label::new((id.as_str(), span))
                .with_message(format!("line {}", line))
                .with_color(Color::Red),
        )
        .finish()
        .eprint((id.as_str(), Source::from(src.as_str())));

    if printed.is_err() {
        eprintln!("❌ Configuration Error: {}", err);
    }
}

/// Byte range of 1-based `line`, clamped to the last line of `src`
fn line_span(src: &str, line: usize) -> Range<usize> {
    let mut start = 0;
    for (n, text) in src.split_inclusive('\n').enumerate() {
        let end = start + text.trim_end_matches(['\n', '\r']).len();
        if n + 1 == line {
            return start..end;
        }
        start += text.len();
    }
    src.len()..src.len()
}
