use anyhow::Error;
use std::process::ExitCode;
use thiserror::Error as ThisError;
use wacrm_config::ConfigError;
use wacrm_core::CoreError;
use wacrm_extract::ExtractError;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NOT_FOUND: u8 = 2;
pub const EXIT_INVALID_INPUT: u8 = 3;

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub fn invalid_input(message: impl Into<String>) -> Error {
    CliError::InvalidInput(message.into()).into()
}

pub fn not_found(message: impl Into<String>) -> Error {
    CliError::NotFound(message.into()).into()
}

pub fn report_error(err: &Error, verbose: bool) {
    if verbose {
        eprintln!("error: {:#}", err);
    } else {
        eprintln!("error: {}", err);
    }
}

pub fn exit_code_for(err: &Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return ExitCode::from(match cli_err {
                CliError::InvalidInput(_) => EXIT_INVALID_INPUT,
                CliError::NotFound(_) => EXIT_NOT_FOUND,
            });
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return ExitCode::from(config_exit_code(config_err));
        }
        if let Some(extract_err) = cause.downcast_ref::<ExtractError>() {
            return ExitCode::from(extract_exit_code(extract_err));
        }
        if let Some(_core_err) = cause.downcast_ref::<CoreError>() {
            return ExitCode::from(EXIT_INVALID_INPUT);
        }
        if let Some(_json_err) = cause.downcast_ref::<serde_json::Error>() {
            return ExitCode::from(EXIT_INVALID_INPUT);
        }
    }
    ExitCode::from(EXIT_FAILURE)
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingHomeDir => EXIT_FAILURE,
        ConfigError::InvalidConfigPath(_)
        | ConfigError::MissingConfigFile(_)
        | ConfigError::InsecurePermissions(_)
        | ConfigError::InvalidMinDigits(_)
        | ConfigError::InvalidSuffixLength(_)
        | ConfigError::InvalidDuration { .. }
        | ConfigError::InvalidAttempts { .. }
        | ConfigError::AttemptsOrder { .. }
        | ConfigError::InvalidChain { .. }
        | ConfigError::InvalidNumberPlan(_)
        | ConfigError::Read { .. }
        | ConfigError::Parse { .. } => EXIT_INVALID_INPUT,
    }
}

fn extract_exit_code(err: &ExtractError) -> u8 {
    match err {
        ExtractError::Core(_) | ExtractError::Selector { .. } | ExtractError::Url(_) => {
            EXIT_INVALID_INPUT
        }
        ExtractError::Io(_) | ExtractError::Dispatch(_) | ExtractError::Notify(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::{exit_code_for, invalid_input, not_found};
    use anyhow::Context as _;
    use std::process::ExitCode;
    use wacrm_config::ConfigError;

    #[test]
    fn exit_codes_follow_the_error_chain() {
        assert_eq!(exit_code_for(&not_found("no identifier")), ExitCode::from(2));
        assert_eq!(exit_code_for(&invalid_input("bad")), ExitCode::from(3));

        let wrapped = Err::<(), _>(ConfigError::InvalidMinDigits(0))
            .context("load config")
            .expect_err("error");
        assert_eq!(exit_code_for(&wrapped), ExitCode::from(3));

        assert_eq!(
            exit_code_for(&anyhow::anyhow!("something else")),
            ExitCode::from(1)
        );
    }
}
