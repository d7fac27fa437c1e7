//! Where the native module lives and how it is loaded.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. `SCI_BRIDGE_MODULE_DIR` overrides `module_dir`.

/// Environment variable that replaces [`NativeConfig::module_dir`].
pub const MODULE_DIR_ENV: &str = "SCI_BRIDGE_MODULE_DIR";

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeConfig {
    /// Root of the extraction tree.
    pub module_dir: std::path::PathBuf,
    /// Version directory under `module_dir`, so builds never share a module file.
    pub version: String,
    pub module_name: String,
    pub entry_symbol: String,
    /// How long to wait for another process's extraction to finish.
    pub lock_timeout_ms: u64,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            module_dir: std::env::temp_dir().join("sci-bridge"),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            module_name: format!(
                "{}scintilla{}",
                std::env::consts::DLL_PREFIX,
                std::env::consts::DLL_SUFFIX
            ),
            entry_symbol: "Scintilla_DirectFunction".to_owned(),
            lock_timeout_ms: 5000,
        }
    }
}

impl NativeConfig {
    /// Reads a TOML file. Missing fields keep their defaults; the env override is applied.
    ///
    /// # Errors
    ///
    /// - [`crate::error::NativeError::Io`] if the file cannot be read.
    /// - [`crate::error::NativeError::Config`] if it is not a valid config.
    pub fn load(path: &std::path::Path) -> crate::error::NativeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents).map_err(|source| crate::error::NativeError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config.with_env_override(std::env::var_os(MODULE_DIR_ENV)))
    }

    /// Defaults plus the env override, or the file at `path` when one is given.
    ///
    /// # Errors
    ///
    /// Same as [`NativeConfig::load`].
    pub fn load_or_default(path: Option<&std::path::Path>) -> crate::error::NativeResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default().with_env_override(std::env::var_os(MODULE_DIR_ENV))),
        }
    }

    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown fields.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Replaces `module_dir` with `value` unless it is unset or empty.
    #[must_use]
    pub fn with_env_override(mut self, value: Option<std::ffi::OsString>) -> Self {
        if let Some(dir) = value
            && !dir.is_empty()
        {
            tracing::debug!(dir = ?dir, "module dir overridden from environment");
            self.module_dir = dir.into();
        }

        self
    }

    #[inline]
    #[must_use]
    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }
}
