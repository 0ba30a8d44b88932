//! Configuration and value types shared across the client.

use crate::error::{FreesoundError, Result};
use crate::uris;
use std::fmt;
use std::time::Duration;

/// Size of the blocks a download is written in (10 KiB).
pub const CONTENT_CHUNK_SIZE: usize = 10 * 1024;

// =============================================================================
// Authentication
// =============================================================================

/// Credential attached to every request made by a client.
///
/// Freesound accepts either a plain API key or an OAuth2 access token.
/// Downloading original files and `/me/` require OAuth2.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// API key, sent as `Authorization: Token <key>`
    ApiKey(String),
    /// OAuth2 access token, sent as `Authorization: Bearer <token>`
    OAuth2(String),
}

impl Credential {
    /// Value of the `Authorization` header for this credential.
    pub fn header_value(&self) -> String {
        match self {
            Credential::ApiKey(key) => format!("Token {key}"),
            Credential::OAuth2(token) => format!("Bearer {token}"),
        }
    }

    fn secret(&self) -> &str {
        match self {
            Credential::ApiKey(s) | Credential::OAuth2(s) => s,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Credential::ApiKey(_) => "ApiKey",
            Credential::OAuth2(_) => "OAuth2",
        };
        f.debug_tuple(kind).field(&"<redacted>").finish()
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for a [`FreesoundClient`](crate::FreesoundClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "https://freesound.org/apiv2")
    pub base_url: String,
    /// Credential sent with every request
    pub credential: Credential,
    /// Overall request timeout; `None` leaves the transport default
    pub timeout: Option<Duration>,
    /// Block size used when writing downloads
    pub chunk_size: usize,
}

impl ClientConfig {
    /// Create a config for the public Freesound API.
    pub fn new(credential: Credential) -> Self {
        Self {
            base_url: uris::BASE.to_string(),
            credential,
            timeout: None,
            chunk_size: CONTENT_CHUNK_SIZE,
        }
    }

    /// Config authenticating with an API key.
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self::new(Credential::ApiKey(key.into()))
    }

    /// Config authenticating with an OAuth2 access token.
    pub fn with_oauth2_token(token: impl Into<String>) -> Self {
        Self::new(Credential::OAuth2(token.into()))
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the download block size. Zero falls back to the default.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 {
            CONTENT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    /// Build a config from the environment.
    ///
    /// `FREESOUND_ACCESS_TOKEN` takes precedence over `FREESOUND_API_KEY`;
    /// `FREESOUND_API_URL` overrides the base URL.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let credential = if let Some(token) = read("FREESOUND_ACCESS_TOKEN") {
            Credential::OAuth2(token)
        } else if let Some(key) = read("FREESOUND_API_KEY") {
            Credential::ApiKey(key)
        } else {
            return Err(FreesoundError::MissingCredential(
                "set FREESOUND_API_KEY or FREESOUND_ACCESS_TOKEN".into(),
            ));
        };

        let mut config = Self::new(credential);
        if let Some(url) = read("FREESOUND_API_URL") {
            config.base_url = url;
        }
        Ok(config)
    }

    /// Check the config and return it with a normalized base URL.
    pub(crate) fn validated(self) -> Result<Self> {
        if self.base_url.is_empty() {
            return Err(FreesoundError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = self.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(FreesoundError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        url::Url::parse(&base_url).map_err(|e| FreesoundError::InvalidUrl(e.to_string()))?;

        if self.credential.secret().trim().is_empty() {
            return Err(FreesoundError::MissingCredential(
                "token cannot be empty".into(),
            ));
        }

        Ok(Self { base_url, ..self })
    }
}

// =============================================================================
// Download Types
// =============================================================================

/// Progress information reported while a file is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveProgress {
    /// Blocks written so far (0 before the first block)
    pub chunks: u64,
    /// Size of one block in bytes
    pub chunk_size: usize,
    /// Value of the Content-Length header, when the server sent one
    pub total_size: Option<u64>,
}

impl RetrieveProgress {
    /// Completed fraction in `0.0..=1.0`, when the total is known.
    pub fn fraction(&self) -> Option<f32> {
        let total = self.total_size?;
        if total == 0 {
            return Some(1.0);
        }
        let written = (self.chunks * self.chunk_size as u64).min(total);
        Some(written as f32 / total as f32)
    }
}

/// Encoding quality of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewQuality {
    #[default]
    Low,
    High,
}

/// File format of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewFormat {
    #[default]
    Mp3,
    Ogg,
}

impl PreviewFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PreviewFormat::Mp3 => "mp3",
            PreviewFormat::Ogg => "ogg",
        }
    }
}

/// Which preview of a sound to download. Defaults to low quality mp3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preview {
    pub quality: PreviewQuality,
    pub format: PreviewFormat,
}

impl Preview {
    pub fn new(quality: PreviewQuality, format: PreviewFormat) -> Self {
        Self { quality, format }
    }

    /// Key of this preview inside a sound's `previews` object.
    ///
    /// The API sends `preview-lq-mp3`; keys are normalized to underscores.
    pub fn field_name(&self) -> String {
        let quality = match self.quality {
            PreviewQuality::Low => "lq",
            PreviewQuality::High => "hq",
        };
        format!("preview_{}_{}", quality, self.format.extension())
    }
}
