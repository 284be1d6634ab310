use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::ProvisioningError;
use super::state::ProvisionedResources;

/// JSON file holding the provisioned resource ids
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable JSON counts as "nothing provisioned yet".
    pub fn load(&self) -> Result<ProvisionedResources, ProvisioningError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ProvisionedResources::default()),
            Err(source) => return Err(self.io_error(source)),
        };
        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring malformed provisioning state: {}", e);
                Ok(ProvisionedResources::default())
            }
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    pub fn save(&self, state: &ProvisionedResources) -> Result<(), ProvisioningError> {
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> ProvisioningError {
        ProvisioningError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("credura-state-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let store = StateStore::new(temp_path());
        assert_eq!(store.load().unwrap(), ProvisionedResources::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path();
        let store = StateStore::new(&path);
        let state = ProvisionedResources {
            wire_channel_id: Some("wire-1".into()),
            ..Default::default()
        };

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert!(!path.with_extension("json.tmp").exists());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_malformed_file_is_empty_state() {
        let path = temp_path();
        fs::write(&path, "{not json").unwrap();
        let store = StateStore::new(&path);

        assert_eq!(store.load().unwrap(), ProvisionedResources::default());

        fs::remove_file(path).unwrap();
    }
}
