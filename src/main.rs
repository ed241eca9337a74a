use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dropship::{Config, DigitalOcean, Pipeline, pipeline};

#[derive(Parser)]
#[command(name = "dropship")]
#[command(about = "Provision a DigitalOcean droplet, point DNS at it, and bootstrap the application")]
#[command(version)]
struct Cli {
    /// Dotenv file to load before reading the environment
    /// (default: `.env`, skipped when absent)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the generated scripts and planned actions, then exit
    #[arg(long)]
    dry_run: bool,

    /// Log debug output, including failed SSH probes
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report(&anyhow::Error::new(e).context("failed to start runtime"));
            return ExitCode::FAILURE;
        }
    };

    // The pipeline is blocking; it runs on a worker thread so that
    // Ctrl-C can be reported from here.
    let code = runtime.block_on(async move {
        let work = tokio::task::spawn_blocking(move || run(&cli));
        tokio::select! {
            joined = work => match joined {
                Ok(Ok(())) => ExitCode::SUCCESS,
                Ok(Err(e)) => {
                    report(&e);
                    ExitCode::FAILURE
                }
                Err(e) => {
                    report(&anyhow::Error::new(e));
                    ExitCode::FAILURE
                }
            },
            Ok(()) = tokio::signal::ctrl_c() => {
                eprintln!("\n\nDeployment cancelled by user");
                ExitCode::FAILURE
            }
        }
    });

    runtime.shutdown_background();
    code
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    load_env_file(cli.env_file.as_deref())?;
    let config = Config::from_env().context("configuration error")?;

    if cli.dry_run {
        print!("{}", pipeline::dry_run(&config));
        return Ok(());
    }

    eprintln!("========================================");
    eprintln!("Dropship: DigitalOcean deployment");
    eprintln!("========================================");

    pipeline::check_prerequisites()?;

    let api = DigitalOcean::new(&config.api_token)?;
    let deployment = Pipeline::new(&config, api).run()?;

    eprintln!("{}", pipeline::summary(&config, &deployment));
    Ok(())
}

fn load_env_file(path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => match dotenvy::dotenv() {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(e).context("failed to load .env"),
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dropship=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dropship=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn report(e: &anyhow::Error) {
    error!("Deployment failed: {e}");
    eprintln!("{e:?}");
}
