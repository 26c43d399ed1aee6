//! User profiles
//!
//! Free-text shopper profiles stored as `<data_dir>/user_profiles/<name>.txt`.
//! One profile is active per process, chosen by configuration.

use crate::catalog::is_valid_segment;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content reported when the active profile has no file yet
pub const EMPTY_PROFILE: &str = "No profile information available.";

const PROFILE_EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid profile name: {0:?}")]
    InvalidName(String),
    #[error("Profile storage failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ProfileResult<T> = Result<T, ProfileError>;

#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
    current: String,
}

impl ProfileStore {
    pub fn new(data_dir: &Path, current: impl Into<String>) -> Self {
        Self {
            dir: data_dir.join("user_profiles"),
            current: current.into(),
        }
    }

    /// Name of the active profile
    pub fn current(&self) -> &str {
        &self.current
    }

    fn current_path(&self) -> ProfileResult<PathBuf> {
        if !is_valid_segment(&self.current) {
            return Err(ProfileError::InvalidName(self.current.clone()));
        }
        Ok(self.dir.join(format!("{}.{PROFILE_EXTENSION}", self.current)))
    }

    async fn ensure_dir(&self) -> ProfileResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ProfileError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    /// Text of the active profile; a missing file reads as [`EMPTY_PROFILE`]
    pub async fn load(&self) -> ProfileResult<String> {
        let path = self.current_path()?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "User profile not found, using empty profile");
                Ok(EMPTY_PROFILE.to_string())
            }
            Err(source) => Err(ProfileError::Io { path, source }),
        }
    }

    /// Names of every stored profile, sorted
    pub async fn list(&self) -> ProfileResult<Vec<String>> {
        self.ensure_dir().await?;
        let io_error = |source| ProfileError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Replace the active profile's text
    pub async fn save(&self, content: &str) -> ProfileResult<()> {
        let path = self.current_path()?;
        self.ensure_dir().await?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| ProfileError::Io { path, source })?;
        tracing::info!(profile = %self.current, bytes = content.len(), "User profile updated");
        Ok(())
    }
}
