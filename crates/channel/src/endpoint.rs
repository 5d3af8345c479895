//! Endpoint addresses.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

// Socket paths are limited to around 100 bytes on macOS, keep this short.
const ENDPOINT_SUFFIX: &str = "TestDebugEvents";

#[cfg(windows)]
const PIPE_PREFIX: &str = r"\\.\pipe\TestBridge.";

/// Address the debuggee connects to.
///
/// On unix this is a socket file inside the events directory, on Windows a
/// named pipe. Either way the name includes the process id so concurrently
/// running hosts never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    path: PathBuf,
}

impl Endpoint {
    /// Endpoint for the current process.
    pub fn for_current_process(events_dir: impl AsRef<Path>) -> Self {
        Self::new(events_dir, std::process::id())
    }

    #[cfg(not(windows))]
    pub fn new(events_dir: impl AsRef<Path>, pid: u32) -> Self {
        Self {
            path: events_dir
                .as_ref()
                .join(format!(".{ENDPOINT_SUFFIX}-{pid}")),
        }
    }

    #[cfg(windows)]
    pub fn new(_events_dir: impl AsRef<Path>, pid: u32) -> Self {
        Self {
            path: PathBuf::from(format!("{PIPE_PREFIX}{ENDPOINT_SUFFIX}-{pid}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the endpoint lives on the filesystem and needs cleaning up.
    pub fn is_filesystem_backed(&self) -> bool {
        cfg!(not(windows))
    }

    /// Make sure the directory holding the endpoint exists.
    pub(crate) async fn ensure_parent(&self) -> io::Result<()> {
        if !self.is_filesystem_backed() {
            return Ok(());
        }
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await
            }
            _ => Ok(()),
        }
    }

    /// Remove a leftover endpoint file, if any.
    pub(crate) async fn remove_stale(&self) -> io::Result<()> {
        if !self.is_filesystem_backed() {
            return Ok(());
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed stale endpoint file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Synchronous removal used while closing.
    pub(crate) fn remove(&self) {
        if !self.is_filesystem_backed() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "could not remove endpoint file");
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_process_scoped() {
        let a = Endpoint::new("/tmp/events", 10);
        let b = Endpoint::new("/tmp/events", 11);
        assert_ne!(a, b);
        assert_eq!(a, Endpoint::new("/tmp/events", 10));
    }

    #[cfg(unix)]
    #[test]
    fn unix_endpoint_lives_in_events_dir() {
        let endpoint = Endpoint::new("/tmp/events", 4242);
        assert_eq!(
            endpoint.path(),
            Path::new("/tmp/events/.TestDebugEvents-4242")
        );
        assert!(endpoint.is_filesystem_backed());
    }

    #[test]
    fn current_process_endpoint_uses_pid() {
        let endpoint = Endpoint::for_current_process("/tmp/events");
        let pid = std::process::id().to_string();
        assert!(endpoint.to_string().ends_with(&pid));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn remove_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::new(dir.path(), 1);
        std::fs::write(endpoint.path(), b"stale").unwrap();

        endpoint.remove_stale().await.unwrap();
        assert!(!endpoint.path().exists());

        // removing again is fine
        endpoint.remove_stale().await.unwrap();
    }
}
