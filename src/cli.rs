use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-world")]
#[command(about = "Resolve Java classes through masked and parallel-world loader chains")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Resolve a class through ambient -> masking -> parallel world.
    Resolve {
        class_name: String,

        #[arg(long = "jar", value_name = "FILE")]
        jars: Vec<PathBuf>,

        /// World prefix, e.g. "1.0/". Empty means the normal location.
        #[arg(long, value_name = "PREFIX", default_value = "")]
        world: String,

        /// Class name prefixes hidden from the ambient loader.
        #[arg(long = "mask", value_name = "PREFIX")]
        masks: Vec<String>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// List the classes visible under a world prefix of a jar.
    Catalog {
        jar: PathBuf,

        #[arg(long, value_name = "PREFIX", default_value = "")]
        world: String,
    },
    /// Report candidate parallel-world prefixes in a jar.
    Worlds { jar: PathBuf },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
