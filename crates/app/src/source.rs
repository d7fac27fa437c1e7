/// A read-only view of the probed file.
#[derive(Debug)]
pub struct SourceFile {
    // Zero-length files cannot be mapped on every platform.
    mmap: Option<memmap2::Mmap>,
    path: std::path::PathBuf,
}

impl SourceFile {
    /// # Errors
    ///
    /// - `std::io::Error` if the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path_buf)?;

        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY:
            // - File is opened read-only
            // - The map is only read while the probe runs
            Some(unsafe { memmap2::Mmap::map(&file)? })
        };

        Ok(Self {
            mmap,
            path: path_buf,
        })
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_maps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");

        std::fs::write(&path, "héllo\nworld").unwrap();

        let source = SourceFile::open(&path).unwrap();

        assert_eq!(source.as_slice(), "héllo\nworld".as_bytes());
        assert_eq!(source.path(), path);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");

        std::fs::write(&path, "").unwrap();

        assert!(SourceFile::open(&path).unwrap().as_slice().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(SourceFile::open(dir.path().join("absent.txt")).is_err());
    }
}
