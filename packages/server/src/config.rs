use anyhow::{Context, Result};
use dotenvy::dotenv;
use portfolio_sync::security::{SecretString, SummarizerCredentials};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub drive_folder_id: String,
    pub google_access_token: SecretString,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub sheet_gid: Option<i64>,
    pub sync_deadline: Duration,
    pub source_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            drive_folder_id: env::var("GOOGLE_DRIVE_FOLDER_ID")
                .context("GOOGLE_DRIVE_FOLDER_ID must be set")?,
            google_access_token: SecretString::required(
                "GOOGLE_ACCESS_TOKEN",
                env::var("GOOGLE_ACCESS_TOKEN").ok(),
            )?,
            openai_api_key: SecretString::required("OPENAI_API_KEY", env::var("OPENAI_API_KEY").ok())?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok().filter(|s| !s.trim().is_empty()),
            spreadsheet_id: env::var("SPREADSHEET_ID").ok().filter(|s| !s.trim().is_empty()),
            sheet_gid: env::var("SHEET_GID")
                .ok()
                .map(|gid| gid.parse())
                .transpose()
                .context("SHEET_GID must be a number")?,
            sync_deadline: Duration::from_secs(
                env::var("SYNC_DEADLINE_SECS")
                    .unwrap_or_else(|_| "55".to_string())
                    .parse()
                    .context("SYNC_DEADLINE_SECS must be a number of seconds")?,
            ),
            source_requests_per_second: env::var("SOURCE_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("SOURCE_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }

    /// Credentials for the analysis summarizer.
    pub fn summarizer_credentials(&self) -> SummarizerCredentials {
        let credentials =
            SummarizerCredentials::new(self.openai_api_key.clone(), self.openai_model.clone());
        match &self.openai_base_url {
            Some(url) => credentials.with_base_url(url.clone()),
            None => credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            port: 8080,
            drive_folder_id: "root".into(),
            google_access_token: "ya29.token".into(),
            openai_api_key: "sk-test".into(),
            openai_model: "gpt-4o".into(),
            openai_base_url: None,
            spreadsheet_id: None,
            sheet_gid: None,
            sync_deadline: Duration::from_secs(55),
            source_requests_per_second: 10,
        }
    }

    #[test]
    fn test_summarizer_credentials_carry_model_and_endpoint() {
        let credentials = config().summarizer_credentials();
        assert_eq!(credentials.model, "gpt-4o");
        assert_eq!(credentials.api_key.expose(), "sk-test");
        assert_eq!(credentials.base_url, None);

        let proxied = Config {
            openai_base_url: Some("https://proxy.internal/v1".into()),
            ..config()
        };
        assert_eq!(
            proxied.summarizer_credentials().base_url.as_deref(),
            Some("https://proxy.internal/v1")
        );
    }
}
