//! Defines the [`Sink`] trait, which receives rendered pages, and
//! [`DirectorySink`], which writes them into an output directory.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Receives rendered pages. Paths are relative to the sink's root.
pub trait Sink {
    /// Stores `contents` at `path`, replacing anything previously stored
    /// there.
    fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Writes pages to disk under `root`, creating parent directories as needed.
pub struct DirectorySink {
    root: PathBuf,

    /// Directories already created by this sink, so each is only created
    /// once.
    seen_dirs: HashSet<PathBuf>,

    /// The files written so far, in order.
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Creates a sink that writes beneath `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> DirectorySink {
        DirectorySink {
            root: root.into(),
            seen_dirs: HashSet::new(),
            written: Vec::new(),
        }
    }

    /// Returns the absolute paths of the files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Sink for DirectorySink {
    fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let file_path = self.root.join(path);
        if let Some(dir) = file_path.parent() {
            if !self.seen_dirs.contains(dir) {
                std::fs::create_dir_all(dir).map_err(|e| annotate(dir, e))?;
                self.seen_dirs.insert(dir.to_owned());
            }
        }
        std::fs::write(&file_path, contents).map_err(|e| annotate(&file_path, e))?;
        debug!(path = %file_path.display(), bytes = contents.len(), "wrote page");
        self.written.push(file_path);
        Ok(())
    }
}

// Keeps the error kind but names the path that failed.
fn annotate(path: &Path, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_creates_directories() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = DirectorySink::new(dir.path());

        sink.write(Path::new("categories/rust/index.html"), b"rust")?;
        sink.write(Path::new("categories/go/index.html"), b"go")?;

        assert_eq!(
            "rust",
            fs::read_to_string(dir.path().join("categories/rust/index.html"))?
        );
        assert_eq!(
            "go",
            fs::read_to_string(dir.path().join("categories/go/index.html"))?
        );
        assert_eq!(2, sink.written().len());
        Ok(())
    }

    #[test]
    fn test_write_overwrites() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("categories/rust.html");
        fs::create_dir_all(target.parent().unwrap())?;
        fs::write(&target, "a much longer stale page")?;

        let mut sink = DirectorySink::new(dir.path());
        sink.write(Path::new("categories/rust.html"), b"fresh")?;
        sink.write(Path::new("categories/rust.html"), b"fresher")?;

        assert_eq!("fresher", fs::read_to_string(&target)?);
        Ok(())
    }

    #[test]
    fn test_write_error_names_path() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        // a file where the sink needs a directory
        fs::write(dir.path().join("categories"), "")?;

        let mut sink = DirectorySink::new(dir.path());
        let err = sink
            .write(Path::new("categories/rust/index.html"), b"rust")
            .unwrap_err();
        assert!(err.to_string().contains("categories"));
        Ok(())
    }

    #[test]
    fn test_write_retries_directory_after_failure() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("categories"), "")?;

        let mut sink = DirectorySink::new(dir.path());
        let page = Path::new("categories/rust/index.html");
        assert!(sink.write(page, b"rust").is_err());

        fs::remove_file(dir.path().join("categories"))?;
        sink.write(page, b"rust")?;
        assert_eq!("rust", fs::read_to_string(dir.path().join(page))?);
        assert_eq!(1, sink.written().len());
        Ok(())
    }
}
