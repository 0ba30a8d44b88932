/// CLI configuration
use anyhow::{bail, Context};
use freesound_client::{uris, ClientConfig, Credential, CONTENT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "freesound.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// API key, sent as `Authorization: Token ...`
    #[serde(default)]
    pub api_key: Option<String>,

    /// OAuth2 access token; takes precedence over `api_key`
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Where downloads go when no directory is given
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl CliConfig {
    /// Load configuration from file and environment.
    ///
    /// `path` must exist when given; otherwise `freesound.toml` in the
    /// working directory is read if present. `FREESOUND_*` variables
    /// (e.g. `FREESOUND_API_KEY`) override file values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("FREESOUND").try_parsing(true),
        );

        settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Build the client configuration, picking the OAuth2 token if set.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let credential = match (non_empty(&self.access_token), non_empty(&self.api_key)) {
            (Some(token), _) => Credential::OAuth2(token.to_string()),
            (None, Some(key)) => Credential::ApiKey(key.to_string()),
            (None, None) => bail!(
                "No credential configured (set FREESOUND_API_KEY or FREESOUND_ACCESS_TOKEN, \
                 or api_key in {DEFAULT_CONFIG_FILE})"
            ),
        };

        let mut config = ClientConfig::new(credential)
            .with_base_url(self.api_url.clone())
            .with_chunk_size(self.chunk_size);
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// Default values
fn default_api_url() -> String {
    uris::BASE.to_string()
}

fn default_chunk_size() -> usize {
    CONTENT_CHUNK_SIZE
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            access_token: None,
            api_url: default_api_url(),
            timeout_secs: None,
            chunk_size: default_chunk_size(),
            download_dir: default_download_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.api_url, "https://freesound.org/apiv2");
        assert_eq!(config.chunk_size, 10 * 1024);
        assert!(config.client_config().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freesound.toml");
        std::fs::write(
            &path,
            "api_key = \"file-key\"\napi_url = \"http://localhost:8000/apiv2\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/apiv2");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.download_dir, PathBuf::from("."));

        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.credential, Credential::ApiKey("file-key".into()));
        assert_eq!(client_config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_access_token_wins() {
        let config = CliConfig {
            api_key: Some("key".into()),
            access_token: Some("token".into()),
            ..CliConfig::default()
        };
        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.credential, Credential::OAuth2("token".into()));
    }

    #[test]
    fn test_blank_token_ignored() {
        let config = CliConfig {
            api_key: Some("key".into()),
            access_token: Some("   ".into()),
            ..CliConfig::default()
        };
        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.credential, Credential::ApiKey("key".into()));
    }
}
