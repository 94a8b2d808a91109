use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use aumcdb_meds_fetch::command::SystemCommandRunner;
use aumcdb_meds_fetch::config::{ConfigLoader, SourceOverrides};
use aumcdb_meds_fetch::domain::TransferMethod;
use aumcdb_meds_fetch::error::FetchError;
use aumcdb_meds_fetch::fetcher::{FetchOptions, Fetcher};
use aumcdb_meds_fetch::output::{HumanOutput, JsonOutput, OutputMode};
use aumcdb_meds_fetch::prompt::{InputSource, NonInteractiveInput, TerminalInput};

#[derive(Parser)]
#[command(name = "aumcdb-fetch")]
#[command(about = "Download and unpack the AUMCdb dataset for MEDS extraction")]
#[command(version)]
struct Cli {
    /// Existing directory that receives the extracted dataset.
    #[arg(long, short = 'o', default_value = ".")]
    output_dir: Utf8PathBuf,

    /// Dataset descriptor (JSON). Defaults to ./aumcdb-fetch.json.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    common_url: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long, env = "AUMCDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, value_enum)]
    method: Option<TransferMethod>,

    /// Not available for AUMCdb; kept so scripts passing it get a clear error.
    #[arg(long)]
    demo: bool,

    #[arg(long)]
    dry_run: bool,

    /// Fail instead of prompting for missing values.
    #[arg(long)]
    non_interactive: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::MissingConfig(_)
        | FetchError::ConfigRead(_)
        | FetchError::ConfigParse(_)
        | FetchError::InvalidMethod(_)
        | FetchError::MissingInput(_)
        | FetchError::OutputDirMissing(_) => 2,
        FetchError::Transfer { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut descriptor = ConfigLoader::resolve(cli.config.as_deref())?;
    descriptor.apply_overrides(SourceOverrides {
        url: cli.url,
        common_url: cli.common_url,
        username: cli.username,
        api_key: cli.api_key,
        method: cli.method,
    });

    let input: &dyn InputSource = if cli.non_interactive {
        &NonInteractiveInput
    } else {
        &TerminalInput
    };
    let options = FetchOptions {
        demo: cli.demo,
        dry_run: cli.dry_run,
    };

    let fetcher = Fetcher::new(SystemCommandRunner::new(), input);
    let report = fetcher.fetch(&cli.output_dir, &descriptor, &options)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_fetch(&report).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_fetch(&report).into_diagnostic()?,
    }
    Ok(())
}
