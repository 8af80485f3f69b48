//! Command line entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{debug, info};

use sacamantecas::application::{ExitStatus, Runner, Skimmer};
use sacamantecas::infrastructure::config::{APP_NAME, APP_VERSION};
use sacamantecas::infrastructure::logging::format_error_report;
use sacamantecas::infrastructure::{
    AddressResolver, HttpTransport, ProfileStore, Settings, init_logging, report_error,
};

const NO_ARGUMENTS_MESSAGE: &str = "No input sources were specified for processing.\n\
\n\
Drag and drop an input file onto the application icon,\n\
or provide the names of the input sources as arguments.";

#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about = "Skims metadata out of library catalogue record pages")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Profiles file (INI), overrides the `profiles_path` setting
    #[arg(long, value_name = "FILE")]
    profiles: Option<PathBuf>,

    /// Addresses, `.txt` files or `.xlsx` workbooks to process
    sources: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(error) => return early_failure(&error.to_string()),
    };
    if let Some(profiles) = cli.profiles {
        settings.profiles_path = profiles;
    }

    let guards = match init_logging(&settings) {
        Ok(guards) => guards,
        Err(error) => return early_failure(&format!("{error:#}")),
    };
    info!("{APP_NAME} version {APP_VERSION}");
    debug!("{}", settings.user_agent);
    debug!("Log file «{}».", guards.log_file.display());

    let status = run(cli.sources, &settings);

    info!("\nProcess finished.");
    debug!("Debug log finished.");
    drop(guards);
    ExitCode::from(status.code())
}

/// Failure before the log files exist; report straight to stderr.
fn early_failure(message: &str) -> ExitCode {
    for line in format_error_report(message, None) {
        eprintln!("{line}");
    }
    ExitCode::from(ExitStatus::Error.code())
}

fn run(sources: Vec<String>, settings: &Settings) -> ExitStatus {
    if sources.is_empty() {
        report_error(NO_ARGUMENTS_MESSAGE, None);
        return ExitStatus::NoArguments;
    }

    let profiles = match ProfileStore::load(&settings.profiles_path) {
        Ok(profiles) => profiles,
        Err(error) => {
            report_error(&error.to_string(), error.details().as_deref());
            return ExitStatus::Error;
        }
    };

    let transport = match HttpTransport::from_settings(settings) {
        Ok(transport) => transport,
        Err(error) => {
            report_error(&error.to_string(), None);
            return ExitStatus::Error;
        }
    };
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            report_error(&format!("Failed to start the async runtime: {error}"), None);
            return ExitStatus::Error;
        }
    };

    let resolver = AddressResolver::new(transport, settings.fallback_charset.clone());
    let runner = Runner::new(Skimmer::new(profiles, resolver));
    let interrupted = runner.interrupt_flag();

    runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received.");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
        info!("\nSkimming metadata:\n");
        runner.run(&sources).await
    })
}
