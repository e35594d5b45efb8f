//! Konkord - annotated corpus exploration console

use anyhow::{Context, Result};
use clap::Parser;
use konkord_lib::commands::run_console;
use konkord_lib::config::{get_data_dir, AnnotatorKind, Config};
use konkord_lib::session::{annotator_for, Session};
use konkord_lib::source::DispatchFetcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "konkord", version, about = "Search annotated corpora and replay query history")]
struct Cli {
    /// Data directory holding konkord.json and settings.db
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of <data-dir>/konkord.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read commands from a file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// How loaded text is split into annotated tokens
    #[arg(long, value_enum)]
    annotator: Option<AnnotatorKind>,

    /// Do not read or record recently loaded sources
    #[arg(long)]
    no_recent: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_file(path)?,
        None => {
            let dir = cli.data_dir.clone().unwrap_or_else(get_data_dir);
            Config::load_from_dir(&dir)?
        }
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(kind) = cli.annotator {
        config.annotator = kind;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("Using data directory: {:?}", config.data_dir);

    // The HTTP client is blocking and must be created outside the runtime.
    let mut session = if cli.no_recent {
        let annotator = annotator_for(config.annotator);
        Session::with_collaborators(config, Arc::new(DispatchFetcher::new()?), annotator)
    } else {
        Session::new(config)?
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    match &cli.script {
        Some(path) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {:?}", path))?;
            runtime.block_on(run_console(&mut session, script.as_bytes(), true))?;
        }
        None => {
            println!("konkord {}, type help for commands", env!("CARGO_PKG_VERSION"));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            runtime.block_on(run_console(&mut session, stdin, false))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotator_flag() {
        let cli = Cli::try_parse_from(["konkord", "--annotator", "whitespace"]).unwrap();
        assert_eq!(cli.annotator, Some(AnnotatorKind::Whitespace));

        let cli = Cli::try_parse_from(["konkord", "--annotator", "tagged"]).unwrap();
        assert_eq!(cli.annotator, Some(AnnotatorKind::Tagged));

        assert!(Cli::try_parse_from(["konkord", "--annotator", "bogus"]).is_err());
        assert_eq!(Cli::try_parse_from(["konkord"]).unwrap().annotator, None);
    }

    #[test]
    fn test_annotator_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["konkord", "--data-dir", data_dir, "--annotator", "whitespace"])
            .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.annotator, AnnotatorKind::Whitespace);
        assert_eq!(config.data_dir.as_path(), dir.path());
    }
}
