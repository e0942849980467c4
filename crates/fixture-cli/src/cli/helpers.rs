use super::CliError;
use fixture_core::domain::LogLevel;
use tracing_subscriber::EnvFilter;

const LOG_FLAG: &str = "--log";

/// Rewrites the historical `--logDEBUG` spelling into `--log=DEBUG`.
pub(super) fn normalize_legacy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.strip_prefix(LOG_FLAG) {
            Some(level) if !level.is_empty() && !level.starts_with('=') => {
                format!("{LOG_FLAG}={level}")
            }
            _ => arg,
        })
        .collect()
}

/// `RUST_LOG` takes precedence over the level chosen on the command line.
pub(super) fn init_logging(level: LogLevel) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.tracing_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install the log subscriber: {error}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::normalize_legacy_args;

    fn normalize(args: &[&str]) -> Vec<String> {
        normalize_legacy_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn legacy_log_spelling_is_rewritten() {
        assert_eq!(
            normalize(&["--logDEBUG", "--force"]),
            vec!["--log=DEBUG", "--force"]
        );
    }

    #[test]
    fn modern_log_spellings_pass_through() {
        assert_eq!(
            normalize(&["--log", "INFO", "--log=ERROR", "--nums=1,2"]),
            vec!["--log", "INFO", "--log=ERROR", "--nums=1,2"]
        );
    }
}
