/// A loaded engine module and its resolved entry point.
///
/// The library stays open for as long as the module lives, which keeps the
/// entry point valid.
#[derive(Debug)]
pub struct NativeModule {
    path: std::path::PathBuf,
    entry: bridge_core::dispatch::DirectFunction,
    _library: libloading::Library,
}

static MODULE: std::sync::OnceLock<NativeModule> = std::sync::OnceLock::new();
static INIT: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

impl NativeModule {
    /// Opens the module at `path` and resolves `symbol`.
    ///
    /// # Errors
    ///
    /// - [`crate::error::NativeError::Load`] if the file cannot be loaded as a library.
    /// - [`crate::error::NativeError::MissingEntryPoint`] if it does not export `symbol`.
    pub fn open(path: &std::path::Path, symbol: &str) -> crate::error::NativeResult<Self> {
        // SAFETY: loading runs the module's initializers. The module is the
        // engine build this crate is configured for.
        let library = unsafe { libloading::Library::new(path) }.map_err(|source| {
            crate::error::NativeError::Load {
                path: path.to_path_buf(),
                source,
            }
        })?;

        // SAFETY: the configured symbol is the engine's direct entry point,
        // whose signature is `DirectFunction`.
        let entry = unsafe {
            library.get::<bridge_core::dispatch::DirectFunction>(symbol.as_bytes())
        }
        .map(|function| *function)
        .map_err(|source| crate::error::NativeError::MissingEntryPoint {
            symbol: symbol.to_owned(),
            source,
        })?;

        tracing::debug!(path = %path.display(), symbol, "native module loaded");

        Ok(Self {
            path: path.to_path_buf(),
            entry,
            _library: library,
        })
    }

    /// The process-wide module. The first successful call extracts `image` if
    /// needed and loads it; every later call returns that module and ignores
    /// its arguments. A failed attempt leaves the slot empty for the next caller.
    ///
    /// # Errors
    ///
    /// Any extraction or loading error from the initializing call.
    pub fn global(
        config: &crate::config::NativeConfig,
        image: &[u8],
    ) -> crate::error::NativeResult<&'static Self> {
        if let Some(module) = MODULE.get() {
            return Ok(module);
        }

        let _init = INIT.lock();

        if let Some(module) = MODULE.get() {
            return Ok(module);
        }

        let path = crate::module_path::resolve(config);

        crate::extract::materialize(&path, image, config.lock_timeout())?;

        let module = Self::open(&path, &config.entry_symbol)?;

        Ok(MODULE.get_or_init(|| module))
    }

    /// The module if [`NativeModule::global`] already succeeded.
    #[must_use]
    pub fn get() -> Option<&'static Self> {
        MODULE.get()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn entry(&self) -> bridge_core::dispatch::DirectFunction {
        self.entry
    }

    /// A dispatcher bound to one engine instance on the calling thread.
    ///
    /// # Safety
    ///
    /// `handle` must identify a live engine instance created by this module
    /// that outlives the returned dispatcher.
    #[must_use]
    pub unsafe fn dispatcher(
        &self,
        handle: bridge_core::EngineHandle,
    ) -> bridge_core::DirectDispatcher {
        // SAFETY: forwarded from this function's contract.
        unsafe { bridge_core::DirectDispatcher::new(self.entry, handle) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A small system library with a known export, copied around as a stand-in
    /// for the engine module.
    #[cfg(target_os = "linux")]
    fn stand_in_image() -> Option<Vec<u8>> {
        [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
    }

    /// Next to the test binary, since the temp dir may be mounted `noexec`.
    #[cfg(target_os = "linux")]
    fn loadable_dir() -> tempfile::TempDir {
        let exe = std::env::current_exe().unwrap();

        tempfile::tempdir_in(exe.parent().unwrap()).unwrap()
    }

    #[test]
    fn test_open_rejects_non_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-library.bin");

        std::fs::write(&path, b"definitely not an object file").unwrap();

        assert!(matches!(
            NativeModule::open(&path, "Scintilla_DirectFunction"),
            Err(crate::error::NativeError::Load { path: reported, .. }) if reported == path
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_reports_missing_entry_point() {
        let Some(image) = stand_in_image() else {
            return;
        };
        let dir = loadable_dir();
        let path = dir.path().join("libstandin.so");

        std::fs::write(&path, image).unwrap();

        assert!(matches!(
            NativeModule::open(&path, "Scintilla_DirectFunction"),
            Err(crate::error::NativeError::MissingEntryPoint { symbol, .. })
                if symbol == "Scintilla_DirectFunction"
        ));
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_global_failure_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::NativeConfig {
            module_dir: dir.path().to_path_buf(),
            ..crate::config::NativeConfig::default()
        };

        assert!(matches!(
            NativeModule::global(&config, &[]),
            Err(crate::error::NativeError::ModuleMissing(_))
        ));
        assert!(NativeModule::get().is_none());
    }

    // Every use of the process-wide slot lives in this one test, so the
    // steps cannot interleave with each other.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_global_binds_once() {
        let empty = tempfile::tempdir().unwrap();
        let missing = crate::config::NativeConfig {
            module_dir: empty.path().to_path_buf(),
            ..crate::config::NativeConfig::default()
        };

        assert!(matches!(
            NativeModule::global(&missing, &[]),
            Err(crate::error::NativeError::ModuleMissing(_))
        ));
        assert!(NativeModule::get().is_none());

        let Some(image) = stand_in_image() else {
            return;
        };
        let dir = loadable_dir();
        let config = crate::config::NativeConfig {
            module_dir: dir.path().to_path_buf(),
            module_name: "libstandin.so".to_owned(),
            entry_symbol: "cos".to_owned(),
            ..crate::config::NativeConfig::default()
        };

        let module = NativeModule::global(&config, &image).unwrap();

        assert_eq!(module.path(), crate::module_path::resolve(&config));
        assert_eq!(std::fs::read(module.path()).unwrap(), image);
        assert!(NativeModule::get().is_some_and(|got| std::ptr::eq(got, module)));

        // Later calls ignore their arguments, even ones that could not load.
        let again = NativeModule::global(&missing, &[]).unwrap();

        assert!(std::ptr::eq(again, module));
        assert!(std::ptr::fn_addr_eq(again.entry(), module.entry()));

        let mut instance = 0u8;
        let handle =
            bridge_core::EngineHandle::new(std::ptr::addr_of_mut!(instance).cast()).unwrap();
        let dispatcher = unsafe { module.dispatcher(handle) };

        assert_eq!(dispatcher.handle(), handle);
        assert!(dispatcher.affinity().check().is_ok());
    }
}
