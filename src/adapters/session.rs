use crate::domain::model::Session;
use crate::domain::ports::Storage;
use crate::utils::error::{OrbitError, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);
        match fs::remove_file(full_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub const SESSION_FILE: &str = "session.json";

/// Persists the signed-in session between CLI runs.
pub struct SessionStore<S: Storage> {
    storage: S,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn load(&self) -> Result<Option<Session>> {
        let bytes = match self.storage.read_file(SESSION_FILE).await {
            Ok(bytes) => bytes,
            Err(OrbitError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No stored session");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let session: Session = serde_json::from_slice(&bytes)?;
        tracing::debug!("🔑 Loaded session for user {}", session.user.id);
        Ok(Some(session))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec_pretty(session)?;
        self.storage.write_file(SESSION_FILE, &json).await?;
        tracing::debug!("💾 Session saved for user {}", session.user.id);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.remove_file(SESSION_FILE).await
    }
}
