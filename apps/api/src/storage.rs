//! JSON-file persistence for the two student profiles.
//!
//! One file per profile under `DATA_DIR`; a missing file loads as the default profile.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::profile::{AcademicProfile, PersonalProfile};

pub const ACADEMIC_FILE: &str = "potential.json";
pub const PERSONAL_FILE: &str = "personality.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

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

    pub async fn load_academic(&self) -> Result<AcademicProfile, StoreError> {
        self.load(ACADEMIC_FILE).await
    }

    pub async fn load_personal(&self) -> Result<PersonalProfile, StoreError> {
        self.load(PERSONAL_FILE).await
    }

    pub async fn save_academic(&self, profile: &AcademicProfile) -> Result<(), StoreError> {
        self.save(ACADEMIC_FILE, profile).await
    }

    pub async fn save_personal(&self, profile: &PersonalProfile) -> Result<(), StoreError> {
        self.save(PERSONAL_FILE, profile).await
    }

    async fn load<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.dir.join(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, using default profile", path.display());
                return Ok(T::default());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })
    }

    async fn save<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(file);
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        info!("Saved {}", path.display());
        Ok(())
    }
}
