/// Process-wide logging facility.
///
/// Installed exactly once by `main` before anything else runs. Every record
/// goes to stderr and, when the log file can be opened, is appended to
/// %APPDATA%\Mindfulness\mindfulness.log as well. Filtering follows the
/// standard RUST_LOG convention with a default level of `info`.
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::Env;

/// Writer that duplicates every record to stderr and the daemon log file.
/// File writes are best-effort; a full disk must not take logging down.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

/// Initializes the global logger, teeing output to stderr and `log_path`.
///
/// The file is opened in append mode so restarts do not erase history. If it
/// cannot be opened the daemon still runs with stderr-only logging.
pub fn init(log_path: &Path) {
    let (file, open_error) = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .init();

    if let Some(e) = open_error {
        log::warn!(
            "Failed to open log file {} ({e}); logging to stderr only",
            log_path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = OpenOptions::new().create(true).append(true).open(&path).unwrap();

        let mut tee = Tee { file: Some(file) };
        tee.write_all(b"first\n").unwrap();
        tee.write_all(b"second\n").unwrap();
        tee.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn tee_without_file_still_accepts_writes() {
        let mut tee = Tee { file: None };
        assert_eq!(tee.write(b"dropped").unwrap(), 7);
        tee.flush().unwrap();
    }
}
