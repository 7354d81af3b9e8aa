//! CLI configuration.
//!
//! Read from `<config dir>/vox/config.json`, then overridden by the
//! environment:
//! `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `VOX_SITE`,
//! `VOX_CHUNK_SIZE`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vox_drive::{Credentials, GraphConfig};
use vox_protocol::ConflictBehavior;
use vox_transfer::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, align_chunk_size};
use vox_upload::UploadOptions;

fn default_drive_pattern() -> String {
    GraphConfig::default().drive_pattern
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_conflict() -> ConflictBehavior {
    UploadOptions::default().conflict
}

fn default_timeout_secs() -> u64 {
    GraphConfig::default().timeout.as_secs()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoxConfig {
    #[serde(default)]
    pub credentials: Credentials,
    /// Graph site path, e.g. `contoso.sharepoint.com:/sites/Vox`.
    #[serde(default)]
    pub site: String,
    #[serde(default = "default_drive_pattern")]
    pub drive_pattern: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_conflict")]
    pub conflict: ConflictBehavior,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VoxConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            site: String::new(),
            drive_pattern: default_drive_pattern(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            conflict: default_conflict(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VoxConfig {
    /// Loads the config file and applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.normalize();
        Ok(config)
    }

    /// Reads `path`; a missing or unparsable file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = var(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.credentials.tenant_id, "AZURE_TENANT_ID");
        set(&mut self.credentials.client_id, "AZURE_CLIENT_ID");
        set(&mut self.credentials.client_secret, "AZURE_CLIENT_SECRET");
        set(&mut self.site, "VOX_SITE");

        if let Some(raw) = var("VOX_CHUNK_SIZE") {
            match raw.trim().parse::<u64>() {
                Ok(size) => self.chunk_size = size,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring VOX_CHUNK_SIZE"),
            }
        }
    }

    /// Caps the chunk size at the store maximum and rounds it down to the
    /// upload granule.
    pub fn normalize(&mut self) {
        let aligned = align_chunk_size(self.chunk_size);
        if aligned != self.chunk_size {
            tracing::warn!(
                requested = self.chunk_size,
                aligned,
                max = MAX_CHUNK_SIZE,
                "chunk size must be a multiple of 320 KiB up to 60 MiB, adjusted"
            );
            self.chunk_size = aligned;
        }
    }

    pub fn graph(&self) -> GraphConfig {
        GraphConfig {
            site: self.site.clone(),
            drive_pattern: self.drive_pattern.clone(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            chunk_size: self.chunk_size,
            conflict: self.conflict,
        }
    }

    /// Fails when the settings needed to reach the library are missing.
    pub fn require_remote(&self) -> anyhow::Result<()> {
        if !self.credentials.is_complete() {
            anyhow::bail!(
                "missing Azure credentials: set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET"
            );
        }
        if self.site.is_empty() {
            anyhow::bail!("missing site: set VOX_SITE or \"site\" in {}", config_path()?.display());
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("vox").join("config.json"))
}

/// Local voice catalog file.
pub fn catalog_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("vox").join("voices.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME")
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
