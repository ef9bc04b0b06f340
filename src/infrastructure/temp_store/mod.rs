//! Session-scoped temporary file store
//!
//! Uploads and rendered results live under `<root>/<session id>/`. Every
//! write (re)schedules deletion of the file and of its session directory,
//! so an active session keeps sliding its expiry forward.

mod reaper;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::domain::session::SessionId;
use crate::domain::DomainError;

use reaper::{run_reaper, ReaperCommand};

/// Name used when the client supplies no usable file name
pub const FALLBACK_UPLOAD_NAME: &str = "upload.bin";

/// Default time-to-live for temp artifacts (24 hours)
pub const DEFAULT_TEMP_TTL: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
    ttl: Duration,
    reaper: mpsc::UnboundedSender<ReaperCommand>,
    writes: Arc<RwLock<()>>,
}

impl TempStore {
    /// Create the root directory and start the deletion reaper.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(root: impl Into<PathBuf>, ttl: Duration) -> Result<Self, DomainError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(&root).await?;

        let writes = Arc::new(RwLock::new(()));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_reaper(rx, writes.clone()));

        info!(root = %root.display(), ttl_secs = ttl.as_secs(), "Temp store ready");

        Ok(Self {
            root,
            ttl,
            reaper: tx,
            writes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Directory for a session, created if missing
    pub async fn session_dir(&self, sid: &SessionId) -> Result<PathBuf, DomainError> {
        let dir = self.root.join(sid.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Persist an uploaded file under the client's base name
    pub async fn save_upload(
        &self,
        sid: &SessionId,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<PathBuf, DomainError> {
        let name = filename
            .and_then(sanitize_file_name)
            .unwrap_or(FALLBACK_UPLOAD_NAME);
        self.write(sid, name, bytes).await
    }

    /// Persist a rendered result
    pub async fn save_result(
        &self,
        sid: &SessionId,
        name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, DomainError> {
        let name = sanitize_file_name(name)
            .ok_or_else(|| DomainError::validation("invalid path"))?;
        self.write(sid, name, bytes).await
    }

    async fn write(&self, sid: &SessionId, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        let dir = self.root.join(sid.as_str());
        let path = dir.join(name);

        // Deadlines move before the directory is touched
        let _writing = self.writes.read().await;
        self.schedule_cleanup(&dir, self.ttl);
        self.schedule_cleanup(&path, self.ttl);

        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "Wrote temp file");

        Ok(path)
    }

    /// Look up a stored file for serving.
    ///
    /// Only the final component of `filename` is used. Errors with
    /// `invalid path` when the session id is malformed, nothing usable is
    /// left of the name, or the resolved path escapes the root. Returns
    /// `None` when the file does not exist (never written, or expired).
    pub async fn resolve(&self, sid: &str, filename: &str) -> Result<Option<PathBuf>, DomainError> {
        let sid = SessionId::new(sid).map_err(|_| DomainError::validation("invalid path"))?;
        let name = sanitize_file_name(filename)
            .ok_or_else(|| DomainError::validation("invalid path"))?;

        let candidate = self.root.join(sid.as_str()).join(name);

        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !resolved.starts_with(&self.root) {
            return Err(DomainError::validation("invalid path"));
        }

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => Ok(Some(resolved)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete `path` after `delay`. Rescheduling a pending path replaces its
    /// deadline.
    pub fn schedule_cleanup(&self, path: &Path, delay: Duration) {
        let command = ReaperCommand::Schedule {
            path: path.to_path_buf(),
            delay,
        };
        if self.reaper.send(command).is_err() {
            warn!(path = %path.display(), "Temp reaper is not running; deletion not scheduled");
        }
    }

    /// Drop a pending deletion, if any
    pub fn cancel(&self, path: &Path) {
        let _ = self.reaper.send(ReaperCommand::Cancel {
            path: path.to_path_buf(),
        });
    }
}

/// Reduce a client-supplied name to its final path component
fn sanitize_file_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        base => Some(base),
    }
}
