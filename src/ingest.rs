//! Secure File Vault - Ingestion Pipeline
//!
//! Orchestrates permission acquisition, multi-file selection,
//! classification and registration. Permission denial and user
//! cancellation are reported outcomes, not errors; only an unexpected
//! picker fault surfaces as a failure, and even then the flow degrades
//! instead of aborting.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::error::VaultError;
use crate::registry::{ContentItem, ContentRegistry, SourceHandle};

/// Storage permission provider (platform collaborator).
///
/// Any truthy grant across the requested scopes is sufficient.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request_read_access(&self) -> bool;
}

/// Selection filter passed to the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickFilter {
    AllFiles,
}

/// One file as reported by the picker.
#[derive(Debug, Clone)]
pub struct PickedFile {
    /// Display name; the picker is expected to always supply one
    pub name: Option<String>,
    /// Opaque byte-source reference
    pub handle: Option<SourceHandle>,
    /// Size, if the source reports one
    pub size_bytes: Option<u64>,
    /// Free-form MIME/extension hint
    pub hint: Option<String>,
}

/// Picker failure modes. Cancellation is a distinct signal so callers
/// can tell an abandoned gesture from a real fault.
#[derive(Debug, Error)]
pub enum PickError {
    #[error("user cancelled selection")]
    Cancelled,
    #[error("picker failed: {0}")]
    Failed(String),
}

impl From<PickError> for VaultError {
    fn from(e: PickError) -> Self {
        match e {
            PickError::Cancelled => VaultError::UserCancelled,
            PickError::Failed(reason) => VaultError::PickerFailure(reason),
        }
    }
}

/// Multi-selection file picker (platform collaborator).
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_multiple(&self, filter: PickFilter) -> Result<Vec<PickedFile>, PickError>;
}

/// Terminal outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Number of items actually appended (may be less than picked)
    Imported(usize),
    /// Platform denied every requested permission scope
    PermissionDenied,
    /// User dismissed the picker
    UserCancelled,
    /// Picker raised something other than cancellation; appends from
    /// earlier in the batch (if any) remain registered
    PartialFailure(String),
}

impl IngestOutcome {
    /// Human-readable caption for the outcome toast. Non-import
    /// outcomes route through the error taxonomy's captions.
    pub fn caption(&self) -> String {
        match self {
            IngestOutcome::Imported(0) => "No files selected".into(),
            IngestOutcome::Imported(n) => format!("Imported {n} file(s)"),
            IngestOutcome::PermissionDenied => VaultError::PermissionDenied.caption(),
            IngestOutcome::UserCancelled => VaultError::UserCancelled.caption(),
            IngestOutcome::PartialFailure(reason) => {
                VaultError::PickerFailure(reason.clone()).caption()
            }
        }
    }
}

/// Ingestion Pipeline.
///
/// A second `ingest` call while one is in flight queues behind the
/// first; the pipeline never runs concurrently with itself.
pub struct IngestPipeline {
    permissions: Arc<dyn PermissionProvider>,
    picker: Arc<dyn FilePicker>,
    registry: Arc<ContentRegistry>,
    in_flight: Mutex<()>,
}

impl IngestPipeline {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        picker: Arc<dyn FilePicker>,
        registry: Arc<ContentRegistry>,
    ) -> Self {
        Self {
            permissions,
            picker,
            registry,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one ingestion: permission, selection, classify-and-register
    /// per file. Each step may short-circuit to a reported outcome.
    pub async fn ingest(&self) -> IngestOutcome {
        let _guard = self.in_flight.lock().await;

        if !self.permissions.request_read_access().await {
            info!("ingest: {}", VaultError::PermissionDenied);
            return IngestOutcome::PermissionDenied;
        }

        let picked = match self.picker.pick_multiple(PickFilter::AllFiles).await {
            Ok(files) => files,
            Err(pick_err) => return report_pick_error(pick_err),
        };

        let mut appended = 0usize;
        for file in picked {
            // Defensive: the picker is expected to always supply a name.
            let Some(name) = file.name.filter(|n| !n.is_empty()) else {
                debug!("ingest: skipping picked file without a name");
                continue;
            };

            let item = ContentItem::new(name, file.handle, file.size_bytes, file.hint);
            debug!("ingest: registered {:?} as {:?}", item.name, item.category);
            self.registry.append(item);
            appended += 1;
        }

        info!("ingest: imported {appended} file(s)");
        IngestOutcome::Imported(appended)
    }
}

/// Map a picker error into the outcome set, logging cancellation at
/// debug and real faults at warn.
fn report_pick_error(err: PickError) -> IngestOutcome {
    let err = VaultError::from(err);
    if err.is_expected() {
        debug!("ingest: {err}");
    } else {
        warn!("ingest: {err}");
    }
    match err {
        VaultError::PickerFailure(reason) => IngestOutcome::PartialFailure(reason),
        _ => IngestOutcome::UserCancelled,
    }
}
