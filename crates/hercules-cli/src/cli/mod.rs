mod commands;
mod helpers;

use clap::Parser;
use hercules_core::domain::HerculesError;

pub fn run_from_env() -> i32 {
    helpers::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_hercules_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            if let Some(summary_line) = diagnostic.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("hercules".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "hercules",
    version,
    about = "Index simulation campaigns and decode digitizer telemetry"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Scan run configs below a campaign root and write the dataset index
    Build(commands::BuildArgs),
    /// Print the axes and metadata of an indexed campaign
    Info(commands::RootArgs),
    /// Resolve one parameter vector to its run directory
    Lookup(commands::LookupArgs),
    /// Enumerate every indexed run in grid order
    List(commands::RootArgs),
    /// Summarise one stream of a telemetry file
    Telemetry(commands::TelemetryArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Build(args) => commands::run_build_command(args),
        CliCommand::Info(args) => commands::run_info_command(args),
        CliCommand::Lookup(args) => commands::run_lookup_command(args),
        CliCommand::List(args) => commands::run_list_command(args),
        CliCommand::Telemetry(args) => commands::run_telemetry_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(#[from] HerculesError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_hercules_error(&self) -> HerculesError {
        match self {
            Self::Usage(message) => {
                HerculesError::invalid_argument("INPUT.CLI_USAGE", message.clone())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => HerculesError::io("IO.CLI", format!("{error:#}")),
        }
    }
}
