//! Secure File Vault - Local Host Collaborators
//!
//! Filesystem-backed implementations of the platform collaborator
//! traits, used by the CLI binary and integration-style tests. A real
//! deployment swaps these for platform bindings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;

use crate::error::{VaultError, VaultResult};
use crate::gate::SettingsStore;
use crate::ingest::{FilePicker, PermissionProvider, PickError, PickFilter, PickedFile};
use crate::preview::ByteSource;
use crate::registry::SourceHandle;

/// Permission provider with a fixed answer.
pub struct StaticPermissions {
    granted: bool,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request_read_access(&self) -> bool {
        self.granted
    }
}

/// Picker over a fixed list of local paths. Handles are the path
/// strings themselves; hints are MIME-style guesses from the extension.
pub struct PathPicker {
    paths: Vec<PathBuf>,
}

impl PathPicker {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl FilePicker for PathPicker {
    async fn pick_multiple(&self, _filter: PickFilter) -> Result<Vec<PickedFile>, PickError> {
        if self.paths.is_empty() {
            return Err(PickError::Cancelled);
        }

        let mut picked = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let size_bytes = tokio::fs::metadata(path).await.ok().map(|m| m.len());
            picked.push(PickedFile {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned()),
                handle: Some(SourceHandle(path.to_string_lossy().into_owned())),
                size_bytes,
                hint: hint_for_path(path).map(String::from),
            });
        }
        Ok(picked)
    }
}

/// MIME-style hint from a path's extension, mirroring what a platform
/// picker would report.
fn hint_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "csv" => "text/csv",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    })
}

/// Byte source over local files; the handle is the file path.
pub struct FsByteSource;

#[async_trait]
impl ByteSource for FsByteSource {
    async fn read_text(&self, handle: &SourceHandle) -> VaultResult<String> {
        Ok(tokio::fs::read_to_string(handle.as_str()).await?)
    }

    async fn read_base64(&self, handle: &SourceHandle) -> VaultResult<String> {
        let bytes = tokio::fs::read(handle.as_str()).await?;
        Ok(BASE64.encode(bytes))
    }
}

/// Key-value store persisted as one JSON object file.
///
/// Writes go to a temp file first and are renamed into place, so a
/// crash mid-write never leaves a torn settings file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> VaultResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(VaultError::IoError(e)),
        }
    }

    async fn save(&self, values: &HashMap<String, String>) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(values)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        debug!("settings: persisted {} key(s)", values.len());
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }

    async fn remove(&self, key: &str) -> VaultResult<()> {
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.save(&values).await?;
        }
        Ok(())
    }
}
