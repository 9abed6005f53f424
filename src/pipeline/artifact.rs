//! Transient Artifacts
//!
//! Per-request scratch files. Every path is unique for the lifetime of the
//! process and every artifact is removed exactly once: explicitly through
//! [`TransientArtifact::dispose`], or by `Drop` if the owning task is
//! cancelled or unwinds before reaching it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use uuid::Uuid;

/// Which side of a transformation an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Input,
    Output,
}

impl ArtifactKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Process-unique request sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{:06}", self.0)
    }
}

#[derive(Debug, Default)]
struct ArtifactStats {
    allocated: AtomicUsize,
    disposed: AtomicUsize,
}

/// Allocates transient artifact paths under a single directory.
///
/// Paths are `<root>/<nonce>-<seq>-<kind>.<ext>`. The sequence comes from an
/// atomic counter and the nonce is fixed per store, so allocation needs no
/// lock and never collides, even across processes sharing `root`.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    nonce: String,
    next_request: AtomicU64,
    stats: Arc<ArtifactStats>,
}

impl ArtifactStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let nonce = Uuid::new_v4().simple().to_string()[..12].to_string();

        tracing::debug!("Artifact store at {} (nonce {})", root.display(), nonce);

        Ok(Self {
            root,
            nonce,
            next_request: AtomicU64::new(1),
            stats: Arc::new(ArtifactStats::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn next_request_id(&self) -> RequestId {
        RequestId(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Reserve a path for one artifact of `request`. Nothing is written yet.
    pub fn allocate(
        &self,
        kind: ArtifactKind,
        request: RequestId,
        suggested_extension: &str,
    ) -> TransientArtifact {
        let file_name = format!(
            "{}-{:06}-{}.{}",
            self.nonce,
            request.0,
            kind.as_str(),
            sanitize_extension(suggested_extension)
        );
        self.stats.allocated.fetch_add(1, Ordering::Relaxed);

        TransientArtifact {
            path: self.root.join(file_name),
            kind,
            disposed: false,
            stats: self.stats.clone(),
        }
    }

    /// Number of artifacts allocated so far.
    pub fn allocated(&self) -> usize {
        self.stats.allocated.load(Ordering::Relaxed)
    }

    /// Number of artifacts disposed so far.
    pub fn disposed(&self) -> usize {
        self.stats.disposed.load(Ordering::Relaxed)
    }

    /// Artifacts allocated but not yet disposed.
    pub fn live(&self) -> usize {
        self.allocated().saturating_sub(self.disposed())
    }
}

/// Keep extensions to a short alphanumeric token so they cannot escape the
/// store directory.
fn sanitize_extension(ext: &str) -> String {
    let cleaned: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();

    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned
    }
}

/// A file-backed scratch artifact owned by one request.
#[derive(Debug)]
pub struct TransientArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    disposed: bool,
    stats: Arc<ArtifactStats>,
}

impl TransientArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Lowercase extension of the allocated path.
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
    }

    /// Materialize the artifact with `bytes`.
    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(&self.path, bytes).await
    }

    /// Remove the backing file. A missing file is not an error; other I/O
    /// failures are logged and swallowed.
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.stats.disposed.fetch_add(1, Ordering::Relaxed);

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("Removed {:?} artifact {}", self.kind, self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove {:?} artifact {}: {}",
                self.kind,
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for TransientArtifact {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.stats.disposed.fetch_add(1, Ordering::Relaxed);

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(
                "Removed {:?} artifact {} on drop",
                self.kind,
                self.path.display()
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove {:?} artifact {} on drop: {}",
                self.kind,
                self.path.display(),
                e
            ),
        }
    }
}
