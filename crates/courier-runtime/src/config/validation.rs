//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, BotConfig, CourierConfig, LogOutput, LoggingConfig, RuntimeConfig};

const TOKEN_ID_DIGITS: std::ops::RangeInclusive<usize> = 6..=12;
const TOKEN_SECRET_LEN: usize = 35;

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_api_config(&config.api)?;
    validate_runtime_config(&config.runtime)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates bot credentials. A missing token is allowed.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if let Some(token) = &bot.token {
        validate_token(token)?;
    }

    if let Some(username) = &bot.username
        && username.trim_start_matches('@').is_empty()
    {
        return Err(ConfigError::validation("Bot username cannot be empty"));
    }

    Ok(())
}

/// Checks the `<6-12 digits>:<35 url-safe characters>` token shape.
pub fn validate_token(token: &str) -> ConfigResult<()> {
    let Some((id, secret)) = token.split_once(':') else {
        return Err(ConfigError::invalid_token("expected '<bot id>:<secret>'"));
    };

    if !TOKEN_ID_DIGITS.contains(&id.len()) || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::invalid_token(format!(
            "bot id must be {} to {} digits",
            TOKEN_ID_DIGITS.start(),
            TOKEN_ID_DIGITS.end()
        )));
    }

    let url_safe = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'-';
    if secret.len() != TOKEN_SECRET_LEN || !secret.bytes().all(url_safe) {
        return Err(ConfigError::invalid_token(format!(
            "secret must be {TOKEN_SECRET_LEN} characters of [A-Za-z0-9_-]"
        )));
    }

    Ok(())
}

fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    validate_url(&api.base_url)?;

    if api.retry_attempts == 0 {
        return Err(ConfigError::validation("Retry attempts must be at least 1"));
    }

    if api.timeout_secs == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.max_concurrency == 0 {
        return Err(ConfigError::validation(
            "Max concurrency must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates a URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("api.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq";

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn test_token_shape() {
        assert!(validate_token(TOKEN).is_ok());
        assert!(validate_token("12345:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq").is_err());
        assert!(validate_token("123456789:short").is_err());
        assert!(validate_token("123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsa!q").is_err());
        assert!(validate_token("no-colon").is_err());
    }

    #[test]
    fn test_bad_token_fails_config() {
        let mut config = CourierConfig::default();
        config.bot.token = Some("nope".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_api_limits() {
        let mut config = CourierConfig::default();
        config.api.retry_attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = CourierConfig::default();
        config.api.base_url = "ftp://example.org".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = CourierConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }
}
