// Copyright © 2014, Peter Atashian
use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use mwexport::{logging, Config};
use std::path::PathBuf;
use std::process;
use tracing::info;

const USAGE: &str = "Usage: mwexport host username password export_dir";

/// Export the raw wikitext of every page of a MediaWiki to a local directory.
#[derive(Parser)]
#[command(name = "mwexport", version)]
struct Args {
    /// Wiki host, e.g. wiki.example.org
    host: String,
    #[arg(allow_hyphen_values = true)]
    username: String,
    #[arg(allow_hyphen_values = true)]
    password: String,
    /// Created if it does not exist
    #[arg(allow_hyphen_values = true)]
    export_dir: PathBuf,
}

fn export(args: Args) -> anyhow::Result<()> {
    let config = Config::new(&*args.host, args.username, args.password);
    let summary = mwexport::run(config, &args.export_dir)
        .with_context(|| format!("exporting {} to {}", args.host, args.export_dir.display()))?;
    if summary.continuation.is_some() {
        info!(pages = summary.pages, "export incomplete: listing was truncated");
    }
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        },
        Err(_) => {
            println!("{}", USAGE);
            process::exit(1);
        },
    };
    logging::init_logging();
    if let Err(err) = export(args) {
        eprintln!("mwexport error: {:#}", err);
        process::exit(1);
    }
}
