//! Per-user profile files
//!
//! Each synthesized user can be written out as `<address>.json` in a profile
//! directory so later runs and tools can pick the same identities up again.
//! Profiles never contain passwords.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::address::Address;
use crate::config::NetworkConfig;
use crate::error::ConfigError;
use crate::user::{Role, User};

const PROFILE_EXTENSION: &str = "json";

/// What is persisted for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub role: Role,
    pub address: Address,
    pub rpc_url: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_user(user: &User, network: &NetworkConfig) -> Self {
        Self {
            name: user.name.clone(),
            role: user.role,
            address: user.address,
            rpc_url: network.rpc_url.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Directory of profile files
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the profile file for an address
    pub fn path_for(&self, address: &Address) -> PathBuf {
        self.dir
            .join(format!("{}.{}", address.to_hex(), PROFILE_EXTENSION))
    }

    /// Delete every profile file; returns how many were removed
    pub fn purge(&self) -> Result<usize, ConfigError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(self.io_error(&self.dir, source)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(&self.dir, e))?.path();
            let is_profile = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(PROFILE_EXTENSION);
            if is_profile {
                std::fs::remove_file(&path).map_err(|e| self.io_error(&path, e))?;
                removed += 1;
            }
        }

        debug!("Removed {} profiles from {}", removed, self.dir.display());
        Ok(removed)
    }

    /// Write (or overwrite) the profile for a user
    pub fn write(&self, user: &User, network: &NetworkConfig) -> Result<PathBuf, ConfigError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let profile = UserProfile::from_user(user, network);
        let path = self.path_for(&user.address);
        let json = serde_json::to_string_pretty(&profile)?;
        std::fs::write(&path, json).map_err(|e| self.io_error(&path, e))?;
        Ok(path)
    }

    /// Read the profile for an address
    pub fn read(&self, address: &Address) -> Result<UserProfile, ConfigError> {
        let path = self.path_for(address);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.clone())
            } else {
                self.io_error(&path, source)
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
