pub type NativeResult<T> = Result<T, NativeError>;

#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    /// Another process held the extraction lock for longer than the configured wait.
    #[error("timed out after {waited:?} waiting for extraction lock {path}")]
    LockTimeout {
        path: std::path::PathBuf,
        waited: std::time::Duration,
    },

    /// The module is not on disk and there are no bytes to extract it from.
    #[error("native module {0} is missing and no embedded image is available")]
    ModuleMissing(std::path::PathBuf),

    #[error("failed to load native module {path}: {source}")]
    Load {
        path: std::path::PathBuf,
        source: libloading::Error,
    },

    #[error("native module does not export {symbol}: {source}")]
    MissingEntryPoint {
        symbol: String,
        source: libloading::Error,
    },
}
