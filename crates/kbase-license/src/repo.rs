use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use kbase_types::{license::License, Result};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::license_error;

/// Storage for the single installed license.
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Latest stored license, if any.
    async fn get_license(&self) -> Result<Option<License>>;
    /// Replaces whatever is stored with `license`.
    async fn create_license(&self, license: License) -> Result<()>;
    async fn delete_license(&self) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryLicenseRepository {
    current: Arc<Mutex<Option<License>>>,
}

impl InMemoryLicenseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseRepository for InMemoryLicenseRepository {
    async fn get_license(&self) -> Result<Option<License>> {
        Ok(self.current.lock().await.clone())
    }

    async fn create_license(&self, license: License) -> Result<()> {
        *self.current.lock().await = Some(license);
        Ok(())
    }

    async fn delete_license(&self) -> Result<()> {
        self.current.lock().await.take();
        Ok(())
    }
}

/// Keeps the license as one JSON document; writes go through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileLicenseRepository {
    path: PathBuf,
}

impl JsonFileLicenseRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LicenseRepository for JsonFileLicenseRepository {
    async fn get_license(&self) -> Result<Option<License>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(license_error(format!(
                    "failed to read license store {}: {err}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|err| license_error(format!("corrupt license store: {err}")))
    }

    async fn create_license(&self, license: License) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|err| {
                license_error(format!("failed to create {}: {err}", parent.display()))
            })?;
        }
        let doc = serde_json::to_vec_pretty(&license)
            .map_err(|err| license_error(format!("failed to encode license: {err}")))?;
        let staging = self.staging_path();
        fs::write(&staging, doc)
            .await
            .map_err(|err| license_error(format!("failed to write license: {err}")))?;
        if let Err(err) = fs::rename(&staging, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                warn!("failed to remove {}: {cleanup}", staging.display());
            }
            return Err(license_error(format!("failed to store license: {err}")));
        }
        debug!("License stored at {}", self.path.display());
        Ok(())
    }

    async fn delete_license(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(license_error(format!("failed to delete license: {err}"))),
        }
    }
}
