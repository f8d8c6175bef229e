use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::auth::pkce::Verifier;

/// Keeps the PKCE verifier across the authorization redirect. A new
/// authorization attempt overwrites whatever was stored before.
pub trait VerifierStore: Send + Sync {
    fn save(&self, verifier: &Verifier) -> std::io::Result<()>;
    fn load(&self) -> std::io::Result<Option<Verifier>>;
}

#[derive(Debug)]
pub struct FileVerifierStore {
    path: PathBuf,
}

impl FileVerifierStore {
    pub const FILE_NAME: &'static str = "pkce_verifier";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VerifierStore for FileVerifierStore {
    fn save(&self, verifier: &Verifier) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, verifier.value.as_bytes())
    }

    fn load(&self) -> std::io::Result<Option<Verifier>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(None),
            Ok(s) => Ok(Some(Verifier::from_persisted(s.trim().to_string()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryVerifierStore {
    value: Mutex<Option<String>>,
}

impl VerifierStore for MemoryVerifierStore {
    fn save(&self, verifier: &Verifier) -> std::io::Result<()> {
        if let Ok(mut value) = self.value.lock() {
            *value = Some(verifier.value.clone());
        }
        Ok(())
    }

    fn load(&self) -> std::io::Result<Option<Verifier>> {
        let value = self.value.lock().ok().and_then(|v| v.clone());
        Ok(value.map(Verifier::from_persisted))
    }
}
