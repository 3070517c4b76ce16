use std::error::Error;
use std::io;
use std::process;

use clap::Parser;
use log::LevelFilter;

mod cli;
use crate::cli::Cli;
use crate::cli::Commands;

mod commands;
use crate::commands::{CliError, SetArgs};

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = cli::load_config(cli.config.as_deref())?;
    let mut out = io::stdout().lock();

    match &cli.command {
        Commands::Info { file } => commands::info(&mut out, file, &config),
        Commands::Dump { file, field } => commands::dump(&mut out, file, *field, &config),
        Commands::Set {
            file,
            xmp,
            exif,
            iptc,
            comment,
        } => {
            let args = SetArgs {
                xmp: xmp.as_deref(),
                exif: exif.as_deref(),
                iptc: iptc.as_deref(),
                comment: comment.as_deref(),
            };
            commands::set(file, &args, &config)
        }
        Commands::Strip { file } => commands::strip(file, &config),
        Commands::Create {
            file,
            width,
            height,
        } => commands::create(file, *width, *height, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    // -v for info, -vv for debug, RUST_LOG overrides
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {}", err);

        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(err.exit_code());
    }
}
