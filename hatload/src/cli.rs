//! Command line interface of the `hatload` binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::{loadtest, observability};

/// Simulated user traffic for the hat storefront.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Healthcheck(HealthcheckCommand),
    Styles(StylesCommand),
    Version(VersionCommand),
}

/// run the load test and print a report
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// base URL of the storefront, such as http://localhost:8080
    #[argh(option)]
    host: Option<String>,

    /// number of simulated users
    #[argh(option, short = 'u')]
    users: Option<usize>,

    /// how long to run, such as 30s or 5m
    #[argh(option, short = 'd', from_str_fn(parse_duration))]
    duration: Option<Duration>,

    /// write a JSON summary of the run to this path
    #[argh(option)]
    report: Option<PathBuf>,
}

/// send a single request to the storefront homepage
///
/// Exits with an error unless the storefront answers with a success status.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "healthcheck")]
struct HealthcheckCommand {}

/// print the styles users browse, one per line
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "styles")]
struct StylesCommand {}

/// print the hatload version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    if let Command::Version(_) = args.command {
        println!("hatload {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;

    if let Command::Styles(_) = args.command {
        for style in config.catalog()?.styles() {
            println!("{style}");
        }
        return Ok(());
    }

    if let Command::Run(run) = &args.command {
        if let Some(host) = &run.host {
            config.host = host.clone();
        }
        if let Some(users) = run.users {
            config.users = users;
        }
        if let Some(duration) = run.duration {
            config.duration = duration;
        }
        if let Some(report) = &run.report {
            config.report_path = Some(report.clone());
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("hatload-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match args.command {
            Command::Run(_) => run(config).await,
            Command::Healthcheck(_) => healthcheck(config).await,
            Command::Styles(_) | Command::Version(_) => unreachable!(),
        }
    })
}

async fn run(config: Config) -> Result<()> {
    let remote = config.remote()?;
    let scenario = config.scenario()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping users");
            interrupt.cancel();
        }
    });

    let report = loadtest::run_until(remote, scenario, config.duration, cancel).await?;

    if let Some(path) = &config.report_path {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "report written");
    }

    Ok(())
}

async fn healthcheck(config: Config) -> Result<()> {
    crate::healthcheck::healthcheck(&config.remote()?).await?;
    Ok(())
}
