//! Payment-proof storage service
//!
//! Stores uploaded payment-proof images on local disk and discards them once
//! the payment decision is made. File storage is an external collaborator;
//! this is the minimal local-disk face of it.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::settings::Settings;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct ProofStorageService {
    upload_dir: PathBuf,
}

impl ProofStorageService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            upload_dir: PathBuf::from(&settings.storage.upload_dir),
        }
    }

    /// Persist an uploaded proof image, returning its stored path
    pub async fn save(&self, registration_id: i64, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let file_name = format!("proof-{registration_id}-{}.img", Uuid::new_v4());
        let path = self.upload_dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        debug!(registration_id = registration_id, path = %path.display(), "Payment proof stored");
        Ok(path.to_string_lossy().into_owned())
    }

    /// Best-effort removal of a stored proof image
    pub async fn discard(&self, stored_path: &str) {
        if let Err(e) = tokio::fs::remove_file(Path::new(stored_path)).await {
            warn!(path = stored_path, error = %e, "Failed to remove payment proof");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.upload_dir = dir.path().to_string_lossy().into_owned();

        let service = ProofStorageService::new(&settings);
        let path = service.save(7, b"fake image bytes").await.unwrap();
        assert!(Path::new(&path).exists());

        service.discard(&path).await;
        assert!(!Path::new(&path).exists());
    }
}
