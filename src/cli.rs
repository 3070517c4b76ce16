use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::debug;
use pgf::Config;

use crate::commands::CliError;

#[derive(Parser)]
#[command(name = "pgfmeta")]
#[command(about = "Inspect and edit the metadata embedded in PGF images")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More logging, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Shows the header and which metadata fields are present
    Info {
        file: PathBuf,
    },

    /// Prints the metadata, binary fields as hex
    Dump {
        file: PathBuf,

        /// Only print this field
        #[arg(short, long, value_enum)]
        field: Option<Field>,
    },

    /// Replaces metadata fields, the others are kept
    Set {
        file: PathBuf,

        /// XMP packet to embed
        #[arg(long, value_name = "FILE")]
        xmp: Option<PathBuf>,

        /// Raw EXIF block to embed
        #[arg(long, value_name = "FILE")]
        exif: Option<PathBuf>,

        /// Raw IPTC block to embed
        #[arg(long, value_name = "FILE")]
        iptc: Option<PathBuf>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Removes the whole metadata region
    Strip {
        file: PathBuf,
    },

    /// Creates a new container without image payload
    Create {
        file: PathBuf,

        #[arg(long, default_value_t = 0)]
        width: i32,

        #[arg(long, default_value_t = 0)]
        height: i32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Field {
    Exif,
    Iptc,
    Xmp,
    Comment,
}

pub fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    let path = match path {
        Some(p) => p,
        None => return Ok(Config::default()),
    };

    let data = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_toml(&data).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded config from {:?}: {:?}", path, config);
    Ok(config)
}
