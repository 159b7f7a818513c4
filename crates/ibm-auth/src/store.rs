//! Single-record token storage
//!
//! `TokenStore` is the seam between the token manager and wherever the
//! current IAM token lives. `FileTokenStore` persists `{"token": "..."}` to
//! disk so the token survives restarts; `MemoryTokenStore` backs tests.
//!
//! Reads never fail: a missing, unreadable, malformed or empty record all
//! mean "no token".

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Abstraction over the place the current token is kept.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn TokenStore>`).
pub trait TokenStore: Send + Sync {
    /// Current token, or `None` when unauthenticated.
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;

    /// Replace the stored token. Empty tokens are rejected.
    fn set(&self, token: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// On-disk shape of the credential record.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    token: Option<String>,
}

/// Disk-backed token record.
///
/// The file is re-read on every `get`, so deleting it externally flips the
/// service back to unauthenticated. The Mutex only serializes writers within
/// this process; across processes the last rename wins.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Option<String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file unreadable, treating as unauthenticated");
                return None;
            }
        };

        match serde_json::from_str::<CredentialRecord>(&contents) {
            Ok(record) => record.token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file malformed, treating as unauthenticated");
                None
            }
        }
    }

    async fn write(&self, token: String) -> Result<()> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.path, &CredentialRecord { token: Some(token) }).await
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(self.read())
    }

    fn set(&self, token: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.write(token))
    }
}

/// Per-write suffix so concurrent writers never share a temp file, even
/// across `FileTokenStore` instances pointing at the same path.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write the record atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets 0600 on unix since the file holds a bearer token.
async fn write_atomic(path: &Path, record: &CredentialRecord) -> Result<()> {
    let json = serde_json::to_string(record)
        .map_err(|e| Error::CredentialParse(format!("serializing token record: {e}")))?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("token path has no file name".into()))?
        .to_string_lossy();
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}.{seq}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted token");
    Ok(())
}

/// In-process token record.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async { self.token.lock().await.clone().filter(|t| !t.is_empty()) })
    }

    fn set(&self, token: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if token.is_empty() {
                return Err(Error::EmptyToken);
            }
            *self.token.lock().await = Some(token);
            Ok(())
        })
    }
}
