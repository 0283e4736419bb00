//! Tracing subscriber setup — structured logs to a rotating file.

use std::path::{Path, PathBuf};

/// Return the platform-standard data directory for majordomo.
///
/// Falls back to `~/.majordomo/` when no platform directory can be resolved.
fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("majordomo");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".majordomo")
}

/// Initialize the tracing subscriber.
///
/// On each startup:
/// 1. Rotates existing logs (`backend.log` → `.1` → `.2` → `.3`, keeps 3).
/// 2. Opens a fresh `backend.log` with a line-flushing writer.
/// 3. Logs a startup banner with the data directory path.
///
/// Called once by the driver binary; the library never initializes logging.
pub fn init() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let log_path = log_dir.join("backend.log");

    rotate_log_file(&log_path, 3);

    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("failed to open {}: {e}", log_path.display());
            return;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("majordomo=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== majordomo starting ==="
    );
}

/// Rotate log files: `backend.log` → `backend.log.1` → … → `.{keep}`.
///
/// The oldest file beyond `keep` is deleted; missing links in the chain are
/// skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that flushes after every write, so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_file_chain() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("backend.log");

        std::fs::write(&base, "first").unwrap();
        rotate_log_file(&base, 3);
        assert!(!base.exists());
        assert_eq!(std::fs::read_to_string(format!("{}.1", base.display())).unwrap(), "first");

        std::fs::write(&base, "second").unwrap();
        rotate_log_file(&base, 3);
        assert_eq!(std::fs::read_to_string(format!("{}.1", base.display())).unwrap(), "second");
        assert_eq!(std::fs::read_to_string(format!("{}.2", base.display())).unwrap(), "first");
    }

    #[test]
    fn test_rotate_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("backend.log");

        for content in ["a", "b", "c", "d"] {
            std::fs::write(&base, content).unwrap();
            rotate_log_file(&base, 3);
        }
        // "a" fell off the end of the chain.
        assert_eq!(std::fs::read_to_string(format!("{}.1", base.display())).unwrap(), "d");
        assert_eq!(std::fs::read_to_string(format!("{}.2", base.display())).unwrap(), "c");
        assert_eq!(std::fs::read_to_string(format!("{}.3", base.display())).unwrap(), "b");
        assert!(!std::path::Path::new(&format!("{}.4", base.display())).exists());
    }
}
