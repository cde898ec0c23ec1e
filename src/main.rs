mod cli;
mod logging;

use cli::{Args, Command};
use std::path::{Path, PathBuf};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn};
use vex_discovery::config::{discover_config, load_config_from_path, ConfigFile};
use vex_discovery::prelude::*;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    if let Err(e) = logging::init_tracing(args.verbose, args.log_format) {
        eprintln!("⚠️  Warning: {}", e);
    }

    let exit_code = match run(args).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            report(&e);
            ExitCode::ApplicationError
        }
    };

    process::exit(exit_code.as_i32());
}

/// Prints the error and the causes its message does not already include.
fn report(error: &anyhow::Error) {
    eprintln!("\n❌ An error occurred:\n");
    eprintln!("{}", error);

    let mut previous = error.to_string();
    for cause in error.chain().skip(1) {
        let message = cause.to_string();
        if !previous.contains(&message) {
            eprintln!("\nCaused by: {}", message);
        }
        previous = message;
    }

    eprintln!();
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let cancellation = CancellationToken::new();
    cancel_on_interrupt(cancellation.clone());

    match args.command {
        Command::Probe {
            purl,
            repository,
            repository_override,
            timeout,
            output,
        } => {
            let overrides = OciOverrides {
                repository,
                repository_override,
            };
            let options = build_options(&config, &overrides, timeout)?
                .with_cancellation(cancellation)
                .with_span(info_span!("probe", purl = %purl));

            let agent = DiscoveryAgent::new()?.with_options(options);
            let documents = agent.probe_purl(&purl).await?;
            eprintln!("🔎 Found {} VEX document(s) for {}", documents.len(), purl);

            present(output, &serde_json::to_string_pretty(&documents)?)
        }
        Command::Identifiers {
            reference,
            platform,
            timeout,
            output,
        } => {
            let platform = match platform {
                Some(platform) => platform,
                None => config.platform()?.unwrap_or_default(),
            };
            let options = build_options(&config, &OciOverrides::default(), timeout)?
                .with_cancellation(cancellation)
                .with_span(info_span!("identifiers", reference = %reference));

            let use_case = GenerateIdentifiersUseCase::new(OciRegistryClient::new()?);
            let bundle = use_case.execute(&options, &reference, &platform).await?;

            present(output, &serde_json::to_string_pretty(&bundle)?)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(path) => load_config_from_path(path),
        None => Ok(discover_config(Path::new("."))?.unwrap_or_default()),
    }
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling registry calls");
            token.cancel();
        }
    });
}

/// OCI settings given on the command line
#[derive(Debug, Default)]
struct OciOverrides {
    repository: Option<String>,
    repository_override: Option<String>,
}

/// Merges config file settings with command-line flags; flags win.
fn build_options(
    config: &ConfigFile,
    overrides: &OciOverrides,
    timeout_secs: Option<u64>,
) -> Result<Options> {
    let mut options = Options::new();
    options.prober_options = config.prober_options()?;

    let mut oci = options.oci_options();
    if let Some(repository) = &overrides.repository {
        oci.repository = Some(repository.clone());
    }
    if let Some(repository) = &overrides.repository_override {
        oci.repository_override = Some(repository.clone());
    }
    options = options.with_oci_options(oci);

    let timeout = timeout_secs
        .map(std::time::Duration::from_secs)
        .or_else(|| config.timeout());
    if let Some(timeout) = timeout {
        options = options.with_timeout(timeout);
    }

    Ok(options)
}

fn present(output: Option<PathBuf>, json: &str) -> Result<()> {
    let presenter: Box<dyn OutputPresenter> = match output {
        Some(path) => Box::new(FileSystemWriter::new(path)),
        None => Box::new(StdoutPresenter::new()),
    };
    presenter.present(&format!("{}\n", json))
}
