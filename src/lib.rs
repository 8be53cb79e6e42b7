//! # Secure File Vault Core
//!
//! Ingestion, classification and preview pipeline for a local file
//! vault, plus the biometric gate guarding entry to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  SECURE FILE VAULT CORE                  │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │  BIOMETRIC  │  │  INGESTION   │  │  PREVIEW       │   │
//! │  │  GATE       │  │  PIPELINE    │  │  PIPELINE      │   │
//! │  └──────┬──────┘  └──────┬───────┘  └───────┬────────┘   │
//! │         │                │ classify          │ decode    │
//! │  ┌──────┴──────┐  ┌──────┴───────────────────┴────────┐  │
//! │  │  SETTINGS   │  │          CONTENT REGISTRY         │  │
//! │  │  STORE      │  │   (append-only, newest first)     │  │
//! │  └─────────────┘  └───────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The presentation layer is an external collaborator: it invokes the
//! operations here in response to user gestures and renders whatever
//! state comes back. Platform services (permissions, file picker, byte
//! reads, biometric sensor, key-value store) enter through traits, so
//! every pipeline is testable with stubs.

pub mod classify;
pub mod error;
pub mod gate;
pub mod host;
pub mod ingest;
pub mod preview;
pub mod registry;

pub use classify::{style_for, Category, CategoryStyle};
pub use error::{VaultError, VaultResult};
pub use gate::{
    AuthDecision, BiometricGate, BiometricSensor, FactorKind, GatePhase, SensorStatus,
    SettingsStore,
};
pub use ingest::{
    FilePicker, IngestOutcome, IngestPipeline, PermissionProvider, PickError, PickFilter,
    PickedFile,
};
pub use preview::{ByteSource, ContentKind, PreviewState, PreviewTicket, Previewer};
pub use registry::{ContentItem, ContentRegistry, SourceHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
