//! Puts the module image on disk exactly once, even with several processes racing.

use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// The file was already there.
    Existing,
    /// Another process finished writing it while this one waited for the lock.
    WrittenByPeer,
    Written,
}

/// Writes `image` to `target` unless the file already exists.
///
/// # Errors
///
/// - [`crate::error::NativeError::ModuleMissing`] if the file is absent and `image` is empty.
/// - [`crate::error::NativeError::LockTimeout`] if another extraction holds the lock too long.
/// - [`crate::error::NativeError::Io`] on any filesystem failure.
pub fn materialize(
    target: &std::path::Path,
    image: &[u8],
    lock_timeout: std::time::Duration,
) -> crate::error::NativeResult<Extraction> {
    if target.is_file() {
        return Ok(Extraction::Existing);
    }

    if image.is_empty() {
        return Err(crate::error::NativeError::ModuleMissing(target.to_path_buf()));
    }

    let dir = target
        .parent()
        .ok_or_else(|| crate::error::NativeError::ModuleMissing(target.to_path_buf()))?;

    std::fs::create_dir_all(dir)?;

    let _lock = crate::lock::ExtractionLock::acquire(
        &crate::module_path::lock_path(target),
        lock_timeout,
    )?;

    if target.is_file() {
        return Ok(Extraction::WrittenByPeer);
    }

    // Same directory, so the rename below cannot cross filesystems.
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;

    staged.write_all(image)?;
    staged.as_file().sync_all()?;
    staged
        .persist(target)
        .map_err(|err| crate::error::NativeError::Io(err.error))?;

    tracing::debug!(path = %target.display(), bytes = image.len(), "native module extracted");

    Ok(Extraction::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);

    #[test]
    fn test_writes_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("1.0").join("x86").join("libscintilla.so");

        assert_eq!(materialize(&target, b"image", TIMEOUT).unwrap(), Extraction::Written);
        assert_eq!(std::fs::read(&target).unwrap(), b"image");
        assert_eq!(materialize(&target, b"other", TIMEOUT).unwrap(), Extraction::Existing);
        assert_eq!(std::fs::read(&target).unwrap(), b"image");
    }

    #[test]
    fn test_no_stray_files_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("libscintilla.so");

        materialize(&target, b"image", TIMEOUT).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();

        names.sort();

        assert_eq!(names, vec!["libscintilla.so", "libscintilla.so.lock"]);
    }

    #[test]
    fn test_abandoned_lock_still_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("libscintilla.so");

        std::fs::write(crate::module_path::lock_path(&target), "424242").unwrap();

        assert_eq!(materialize(&target, b"image", TIMEOUT).unwrap(), Extraction::Written);
        assert_eq!(std::fs::read(&target).unwrap(), b"image");
    }

    #[test]
    fn test_rechecks_after_waiting_for_peer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("libscintilla.so");
        let lock_path = crate::module_path::lock_path(&target);
        let locked = std::sync::Barrier::new(2);

        std::fs::write(&lock_path, "424242").unwrap();

        let result = std::thread::scope(|scope| {
            scope.spawn(|| {
                let lock = crate::lock::ExtractionLock::acquire(&lock_path, TIMEOUT).unwrap();

                assert_eq!(lock.recovered_from(), Some("424242"));
                locked.wait();

                std::thread::sleep(std::time::Duration::from_millis(250));
                std::fs::write(&target, b"peer image").unwrap();
                drop(lock);
            });

            locked.wait();

            materialize(&target, b"image", std::time::Duration::from_secs(5))
        });

        assert_eq!(result.unwrap(), Extraction::WrittenByPeer);
        assert_eq!(std::fs::read(&target).unwrap(), b"peer image");
    }

    #[test]
    fn test_missing_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("libscintilla.so");

        assert!(matches!(
            materialize(&target, &[], TIMEOUT),
            Err(crate::error::NativeError::ModuleMissing(path)) if path == target
        ));
    }

    #[test]
    fn test_lock_timeout_is_distinct_from_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("libscintilla.so");
        let _held = crate::lock::ExtractionLock::acquire(
            &crate::module_path::lock_path(&target),
            TIMEOUT,
        )
        .unwrap();

        assert!(matches!(
            materialize(&target, b"image", std::time::Duration::from_millis(50)),
            Err(crate::error::NativeError::LockTimeout { .. })
        ));
        assert!(!target.exists());
    }
}
