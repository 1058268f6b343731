//! Endpoint credentials and the local credential cache.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::StoreError;

/// Default model deployment name.
pub const DEFAULT_MODEL: &str = "o3-pro-2";
/// Default Responses API version query parameter.
pub const DEFAULT_API_VERSION: &str = "preview";

/// Everything needed to address the remote endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    /// Base URL, for example `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub api_version: String,
}

impl CredentialSet {
    /// Creates credentials with the default model and API version.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// True when all four fields are non-blank.
    pub fn is_complete(&self) -> bool {
        [
            &self.endpoint,
            &self.api_key,
            &self.model,
            &self.api_version,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Reads `TEXTPIPE_ENDPOINT` and `TEXTPIPE_API_KEY`, plus the optional
    /// `TEXTPIPE_MODEL` and `TEXTPIPE_API_VERSION`.
    ///
    /// Returns `None` unless both endpoint and key are set.
    pub fn from_env() -> Option<Self> {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut creds = Self::new(var("TEXTPIPE_ENDPOINT")?, var("TEXTPIPE_API_KEY")?);
        if let Some(model) = var("TEXTPIPE_MODEL") {
            creds.model = model;
        }
        if let Some(api_version) = var("TEXTPIPE_API_VERSION") {
            creds.api_version = api_version;
        }
        Some(creds)
    }

    /// Full Responses API URL for these credentials.
    pub fn responses_url(&self) -> String {
        format!(
            "{}/openai/v1/responses?api-version={}",
            self.endpoint.trim().trim_end_matches('/'),
            self.api_version.trim()
        )
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Persistent key-value home for credentials, loaded at startup and saved on update.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<CredentialSet>, StoreError>;
    fn save(&self, credentials: &CredentialSet) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file store, by default under the user's configuration directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/textpipe/credentials.json`.
    pub fn default_location() -> Result<Self, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("textpipe").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<CredentialSet>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let creds: CredentialSet =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        debug!(event = "credentials.loaded", domain = "config", path = %self.path.display());
        Ok(Some(creds))
    }

    fn save(&self, credentials: &CredentialSet) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string_pretty(credentials).map_err(|e| StoreError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, body).map_err(|e| self.io_error(e))?;
        info!(event = "credentials.saved", domain = "config", path = %self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(
                    event = "credentials.cleared",
                    domain = "config",
                    path = %self.path.display()
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-process store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<CredentialSet>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<CredentialSet>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, credentials: &CredentialSet) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}
