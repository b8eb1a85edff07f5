//! Long-lived local tier backed by one JSON file per key.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::traits::{LocalTier, StorageError};

/// Local tier that survives process restarts.
///
/// Writes go to a temp file that is renamed over the target, so a crash
/// mid-write leaves the previous payload intact.
pub struct FileTier {
    dir: PathBuf,
}

impl FileTier {
    /// Open (creating if needed) a tier rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl LocalTier for FileTier {
    fn name(&self) -> &str {
        "persistent"
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        debug!(path = %target.display(), bytes = payload.len(), "Cart written to persistent tier");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_read_remove() {
        let dir = tempdir().unwrap();
        let tier = FileTier::open(dir.path()).unwrap();

        assert_eq!(tier.read("eceCart").unwrap(), None);
        tier.write("eceCart", r#"[{"id":1}]"#).unwrap();
        assert_eq!(tier.read("eceCart").unwrap().as_deref(), Some(r#"[{"id":1}]"#));
        assert!(!dir.path().join("eceCart.json.tmp").exists());

        tier.remove("eceCart").unwrap();
        assert_eq!(tier.read("eceCart").unwrap(), None);
        assert!(tier.remove("eceCart").is_ok());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        FileTier::open(dir.path()).unwrap().write("cart", "[]").unwrap();

        let reopened = FileTier::open(dir.path()).unwrap();
        assert_eq!(reopened.read("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_open_creates_nested_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let tier = FileTier::open(&nested).unwrap();
        tier.write("cart", "[]").unwrap();
        assert!(nested.join("cart.json").exists());
    }
}
