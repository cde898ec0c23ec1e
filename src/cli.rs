use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vex_discovery::prelude::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Invalid log format: {}. Please specify 'text' or 'json'",
                s
            )),
        }
    }
}

/// Discover OpenVEX documents attached to software components
#[derive(Parser, Debug)]
#[command(name = "vex-discovery")]
#[command(version)]
#[command(about = "Discover OpenVEX documents attached to software components", long_about = None)]
pub struct Args {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format on stderr: text or json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Config file (defaults to ./vex-discovery.config.yml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the VEX documents published for a package URL
    Probe {
        /// Package URL, e.g. pkg:oci/alpine@sha256%3A...
        purl: String,

        /// Repository used when the purl has no repository_url qualifier
        #[arg(long, value_name = "REPOSITORY")]
        repository: Option<String>,

        /// Repository that replaces whatever the purl says
        #[arg(long, value_name = "REPOSITORY")]
        repository_override: Option<String>,

        /// Timeout in seconds for each registry call
        #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the package URLs and hashes an image can be discovered under
    Identifiers {
        /// Image reference, e.g. alpine:3.18 or cgr.dev/chainguard/static@sha256:...
        reference: String,

        /// Platform used to pick the child of an image index
        #[arg(long, value_name = "OS/ARCH[/VARIANT]")]
        platform: Option<Platform>,

        /// Timeout in seconds for each registry call
        #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
