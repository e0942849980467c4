mod commands;
mod helpers;

use clap::Parser;
use fixture_core::domain::FixtureError;
use helpers::normalize_legacy_args;

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_fixture_error();
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("produce-fixtures".to_string())
        .chain(normalize_legacy_args(args.into_iter().map(Into::into)))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => commands::run_generate_command(cli.generate),
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
    name = "produce-fixtures",
    version,
    about = "Produce golden power-spectrum fixtures for the simulation integration tests"
)]
struct Cli {
    #[command(flatten)]
    generate: commands::GenerateArgs,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(FixtureError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_fixture_error(&self) -> FixtureError {
        match self {
            Self::Usage(message) => {
                FixtureError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => FixtureError::internal("RUN.CLI", format!("{error:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, run};

    #[test]
    fn help_exits_successfully() {
        assert_eq!(run(["--help"]).expect("help should render"), 0);
    }

    #[test]
    fn unknown_flags_are_usage_errors() {
        let error = run(["--frobnicate"]).expect_err("unknown flag should be rejected");
        assert!(matches!(error, CliError::Usage(_)));
    }

    #[test]
    fn unknown_legacy_log_level_is_a_usage_error() {
        let error = run(["--logVERBOSE"]).expect_err("log level should be rejected");
        assert!(matches!(error, CliError::Usage(message) if message.contains("VERBOSE")));
    }
}
