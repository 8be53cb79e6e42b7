//! Secure File Vault - Preview Rendering Pipeline
//!
//! Decodes one registry item's bytes according to its content kind and
//! produces a render-ready result or an error state. The kind is
//! computed once as a closed tagged variant, then dispatched to a
//! per-kind decode strategy; every invocation reaches a terminal state.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use calamine::{open_workbook_auto_from_rs, Reader as _};
use log::{debug, warn};
use tokio::sync::watch;

use crate::error::{VaultError, VaultResult};
use crate::registry::{ContentItem, SourceHandle};

/// Byte source reader (storage collaborator).
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Read the full content behind a handle as UTF-8 text.
    async fn read_text(&self, handle: &SourceHandle) -> VaultResult<String>;
    /// Read the full content behind a handle as a base64-encoded blob.
    async fn read_base64(&self, handle: &SourceHandle) -> VaultResult<String>;
}

/// Closed classification of how an item's bytes are decoded.
///
/// Computed once per preview request; dispatch is a pure function of
/// this variant, never of raw hint strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Document,
    PlainText,
    DelimitedTable,
    Spreadsheet,
    Unsupported,
}

impl ContentKind {
    /// Detect the kind from the picker-supplied hint, falling back to
    /// the name suffix. No match resolves to `Unsupported`.
    pub fn detect(name: &str, hint: Option<&str>) -> ContentKind {
        if let Some(hint) = hint {
            let hint = hint.to_lowercase();
            if hint.starts_with("image/") {
                return ContentKind::Image;
            }
            if hint.contains("pdf") {
                return ContentKind::Document;
            }
            // text/csv is a table, not plain text - checked first
            if hint.contains("csv") {
                return ContentKind::DelimitedTable;
            }
            if hint.contains("spreadsheetml") || hint.contains("ms-excel") || hint.contains("sheet")
            {
                return ContentKind::Spreadsheet;
            }
            if hint.starts_with("text/") || hint.contains("json") || hint.contains("markdown") {
                return ContentKind::PlainText;
            }
        }

        match name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()) {
            Some(ext) => match ext.as_str() {
                "jpg" | "jpeg" | "png" | "gif" | "webp" => ContentKind::Image,
                "pdf" => ContentKind::Document,
                "csv" => ContentKind::DelimitedTable,
                "xls" | "xlsx" => ContentKind::Spreadsheet,
                "txt" | "md" | "json" => ContentKind::PlainText,
                _ => ContentKind::Unsupported,
            },
            None => ContentKind::Unsupported,
        }
    }

    fn for_item(item: &ContentItem) -> ContentKind {
        ContentKind::detect(&item.name, item.hint.as_deref())
    }
}

/// Per-request preview state. Transient - recomputed on every request.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Pending,
    Text(String),
    Table(Vec<Vec<String>>),
    /// Rendering delegated to an external image renderer
    Image(SourceHandle),
    /// Pagination delegated to an external document renderer
    Document(SourceHandle),
    Unsupported,
    Error(String),
}

impl PreviewState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PreviewState::Pending)
    }

    /// Caption shown in place of a preview for non-renderable states.
    pub fn caption(&self) -> Option<&'static str> {
        match self {
            PreviewState::Unsupported => Some("No preview available"),
            PreviewState::Error(_) => Some("Could not load preview"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct PreviewSlot {
    request: u64,
    state: PreviewState,
}

/// Handle to one preview request.
///
/// Observes the shared preview slot; a ticket superseded by a newer
/// request resolves to `None` instead of surfacing the stale result.
pub struct PreviewTicket {
    request: u64,
    rx: watch::Receiver<PreviewSlot>,
}

impl PreviewTicket {
    /// Request identifier, monotonically increasing per previewer.
    pub fn request_id(&self) -> u64 {
        self.request
    }

    /// Current state without waiting.
    pub fn state(&self) -> Option<PreviewState> {
        let slot = self.rx.borrow();
        (slot.request == self.request).then(|| slot.state.clone())
    }

    /// Wait for this request's terminal state. Returns `None` when a
    /// newer request superseded this one - the late result is
    /// discarded, never shown.
    pub async fn resolved(mut self) -> Option<PreviewState> {
        loop {
            {
                let slot = self.rx.borrow_and_update();
                if slot.request != self.request {
                    return None;
                }
                if slot.state.is_terminal() {
                    return Some(slot.state.clone());
                }
            }
            if self.rx.changed().await.is_err() {
                let slot = self.rx.borrow();
                return (slot.request == self.request && slot.state.is_terminal())
                    .then(|| slot.state.clone());
            }
        }
    }
}

/// Preview Rendering Pipeline.
///
/// `preview` is restartable: each call re-runs decoding from scratch
/// under a fresh request id, and only the newest request may write the
/// terminal state.
pub struct Previewer {
    reader: Arc<dyn ByteSource>,
    next_request: AtomicU64,
    slot: Arc<watch::Sender<PreviewSlot>>,
}

impl Previewer {
    pub fn new(reader: Arc<dyn ByteSource>) -> Self {
        let (slot, _) = watch::channel(PreviewSlot {
            request: 0,
            state: PreviewState::Unsupported,
        });
        Self {
            reader,
            next_request: AtomicU64::new(0),
            slot: Arc::new(slot),
        }
    }

    /// Start decoding one item. The returned ticket observes `Pending`
    /// immediately and a terminal state once decoding finishes.
    pub fn preview(&self, item: &ContentItem) -> PreviewTicket {
        let request = self.next_request.fetch_add(1, Ordering::SeqCst) + 1;
        let kind = ContentKind::for_item(item);
        debug!("preview: request {request} for {:?} as {kind:?}", item.name);

        self.slot.send_replace(PreviewSlot {
            request,
            state: PreviewState::Pending,
        });

        let reader = Arc::clone(&self.reader);
        let slot = Arc::clone(&self.slot);
        let source = item.source.clone();
        let name = item.name.clone();

        tokio::spawn(async move {
            let state = decode(kind, source, reader.as_ref()).await;
            if let PreviewState::Error(ref reason) = state {
                warn!("preview: decode of {name:?} failed: {reason}");
            }
            // A newer request owns the slot now - drop the stale result.
            slot.send_if_modified(|current| {
                if current.request == request {
                    current.state = state;
                    true
                } else {
                    debug!("preview: discarding stale result for request {request}");
                    false
                }
            });
        });

        PreviewTicket {
            request,
            rx: self.slot.subscribe(),
        }
    }
}

/// Dispatch on the computed kind. Image and document kinds hand the
/// handle straight to an external renderer; only the textual kinds
/// read bytes, and every read or decode failure collapses to a single
/// visible error state.
async fn decode(
    kind: ContentKind,
    source: Option<SourceHandle>,
    reader: &dyn ByteSource,
) -> PreviewState {
    match kind {
        ContentKind::Unsupported => PreviewState::Unsupported,
        ContentKind::Image => match source {
            Some(handle) => PreviewState::Image(handle),
            None => PreviewState::Unsupported,
        },
        ContentKind::Document => match source {
            Some(handle) => PreviewState::Document(handle),
            None => PreviewState::Unsupported,
        },
        ContentKind::PlainText | ContentKind::DelimitedTable | ContentKind::Spreadsheet => {
            let Some(handle) = source else {
                return PreviewState::Unsupported;
            };
            match decode_bytes(kind, &handle, reader).await {
                Ok(state) => state,
                Err(_) => PreviewState::Error("load failed".into()),
            }
        }
    }
}

async fn decode_bytes(
    kind: ContentKind,
    handle: &SourceHandle,
    reader: &dyn ByteSource,
) -> VaultResult<PreviewState> {
    match kind {
        ContentKind::PlainText => {
            let text = reader.read_text(handle).await?;
            Ok(PreviewState::Text(text))
        }
        ContentKind::DelimitedTable => {
            let text = reader.read_text(handle).await?;
            Ok(PreviewState::Table(parse_delimited(&text)))
        }
        ContentKind::Spreadsheet => {
            let blob = reader.read_base64(handle).await?;
            let bytes = BASE64
                .decode(blob.trim())
                .map_err(|e| VaultError::DecodeFailure(e.to_string()))?;
            Ok(PreviewState::Table(decode_workbook(bytes)?))
        }
        _ => unreachable!("decode_bytes only handles byte-reading kinds"),
    }
}

/// Permissive delimiter-aware parse: delimiter auto-detected from the
/// first line, no schema validation, ragged rows kept as-is.
fn parse_delimited(text: &str) -> Vec<Vec<String>> {
    let delimiter = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            [',', ';', '\t']
                .into_iter()
                .max_by_key(|d| line.matches(*d).count())
                .unwrap_or(',')
        })
        .unwrap_or(',');

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(delimiter)
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}

/// Decode a workbook blob and flatten its first sheet (by position)
/// into rows of display strings. The first row is data, not assumed to
/// be a header.
fn decode_workbook(bytes: Vec<u8>) -> VaultResult<Vec<Vec<String>>> {
    let cursor = Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| VaultError::DecodeFailure(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| VaultError::DecodeFailure("workbook has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| VaultError::DecodeFailure(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    use crate::registry::ContentItem;

    /// Reader over a fixed payload, counting calls and optionally
    /// gating each read behind a release signal.
    struct StubReader {
        text: VaultResult<String>,
        reads: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl StubReader {
        fn with_text(text: &str) -> Self {
            Self {
                text: Ok(text.to_string()),
                reads: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                text: Err(VaultError::DecodeFailure("boom".into())),
                reads: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl ByteSource for StubReader {
        async fn read_text(&self, _handle: &SourceHandle) -> VaultResult<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.text {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(VaultError::DecodeFailure("boom".into())),
            }
        }

        async fn read_base64(&self, handle: &SourceHandle) -> VaultResult<String> {
            self.read_text(handle).await
        }
    }

    fn item(name: &str, hint: Option<&str>) -> ContentItem {
        ContentItem::new(
            name,
            Some(SourceHandle(format!("/src/{name}"))),
            None,
            hint.map(String::from),
        )
    }

    #[test]
    fn test_kind_detection_hint_first() {
        assert_eq!(ContentKind::detect("x.bin", Some("image/png")), ContentKind::Image);
        assert_eq!(ContentKind::detect("x.bin", Some("application/pdf")), ContentKind::Document);
        assert_eq!(ContentKind::detect("x.bin", Some("text/csv")), ContentKind::DelimitedTable);
        assert_eq!(ContentKind::detect("x.bin", Some("text/plain")), ContentKind::PlainText);
        assert_eq!(
            ContentKind::detect("x.bin", Some("application/vnd.ms-excel")),
            ContentKind::Spreadsheet
        );
    }

    #[test]
    fn test_kind_detection_suffix_fallback() {
        assert_eq!(ContentKind::detect("a.webp", None), ContentKind::Image);
        assert_eq!(ContentKind::detect("a.pdf", None), ContentKind::Document);
        assert_eq!(ContentKind::detect("a.csv", None), ContentKind::DelimitedTable);
        assert_eq!(ContentKind::detect("a.xlsx", None), ContentKind::Spreadsheet);
        assert_eq!(ContentKind::detect("a.md", None), ContentKind::PlainText);
        assert_eq!(ContentKind::detect("a.tar", None), ContentKind::Unsupported);
        assert_eq!(ContentKind::detect("noext", None), ContentKind::Unsupported);
    }

    #[test]
    fn test_parse_delimited_basic() {
        let rows = parse_delimited("a,b\n1,2");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_delimited_detects_semicolon_and_tab() {
        assert_eq!(
            parse_delimited("a;b;c\n1;2;3"),
            vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
        );
        assert_eq!(parse_delimited("a\tb\n1\t2"), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_delimited_keeps_ragged_rows() {
        let rows = parse_delimited("a,b,c\n1\n\n2,3");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1"], vec!["2", "3"]]);
    }

    #[tokio::test]
    async fn test_text_preview_resolves() {
        let previewer = Previewer::new(Arc::new(StubReader::with_text("hello vault")));
        let ticket = previewer.preview(&item("notes.txt", None));
        // Decoding has not been polled yet on this runtime.
        assert_eq!(ticket.state(), Some(PreviewState::Pending));
        assert_eq!(
            ticket.resolved().await,
            Some(PreviewState::Text("hello vault".into()))
        );
    }

    #[tokio::test]
    async fn test_csv_preview_yields_table() {
        let previewer = Previewer::new(Arc::new(StubReader::with_text("a,b\n1,2")));
        let ticket = previewer.preview(&item("data.csv", None));
        assert_eq!(
            ticket.resolved().await,
            Some(PreviewState::Table(vec![
                vec!["a".into(), "b".into()],
                vec!["1".into(), "2".into()],
            ]))
        );
    }

    #[tokio::test]
    async fn test_image_delegates_without_reading() {
        let reader = Arc::new(StubReader::with_text("unused"));
        let previewer = Previewer::new(reader.clone());
        let ticket = previewer.preview(&item("pic.png", None));
        assert_eq!(
            ticket.resolved().await,
            Some(PreviewState::Image(SourceHandle("/src/pic.png".into())))
        );
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_never_touches_reader() {
        let reader = Arc::new(StubReader::with_text("unused"));
        let previewer = Previewer::new(reader.clone());
        let ticket = previewer.preview(&item("archive.tar", None));
        assert_eq!(ticket.resolved().await, Some(PreviewState::Unsupported));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_handle_short_circuits_to_unsupported() {
        let previewer = Previewer::new(Arc::new(StubReader::with_text("unused")));
        let no_source = ContentItem::new("notes.txt", None, None, None);
        let ticket = previewer.preview(&no_source);
        assert_eq!(ticket.resolved().await, Some(PreviewState::Unsupported));
    }

    #[tokio::test]
    async fn test_read_failure_becomes_error_state() {
        let previewer = Previewer::new(Arc::new(StubReader::failing()));
        let ticket = previewer.preview(&item("notes.txt", None));
        assert_eq!(
            ticket.resolved().await,
            Some(PreviewState::Error("load failed".into()))
        );
    }

    #[tokio::test]
    async fn test_invalid_workbook_blob_becomes_error_state() {
        // Valid base64, but not a workbook calamine can open.
        let blob = BASE64.encode(b"definitely not a spreadsheet");
        let previewer = Previewer::new(Arc::new(StubReader::with_text(&blob)));
        let ticket = previewer.preview(&item("broken.xlsx", None));
        assert_eq!(
            ticket.resolved().await,
            Some(PreviewState::Error("load failed".into()))
        );
    }

    #[tokio::test]
    async fn test_stale_request_is_discarded() {
        let gate = Arc::new(Notify::new());
        let slow_reader = StubReader {
            text: Ok("slow text".into()),
            reads: AtomicUsize::new(0),
            gate: Some(Arc::clone(&gate)),
        };
        let previewer = Previewer::new(Arc::new(slow_reader));

        let stale = previewer.preview(&item("slow.txt", None));
        // Navigate away: a newer request supersedes the first.
        let fresh = previewer.preview(&item("pic.png", None));

        gate.notify_waiters();
        gate.notify_one();

        assert_eq!(stale.resolved().await, None);
        assert_eq!(
            fresh.resolved().await,
            Some(PreviewState::Image(SourceHandle("/src/pic.png".into())))
        );
    }

    #[tokio::test]
    async fn test_restartable_same_item() {
        let previewer = Previewer::new(Arc::new(StubReader::with_text("again")));
        let it = item("notes.txt", None);
        let first = previewer.preview(&it);
        assert_eq!(first.resolved().await, Some(PreviewState::Text("again".into())));
        let second = previewer.preview(&it);
        assert_eq!(second.resolved().await, Some(PreviewState::Text("again".into())));
    }
}
