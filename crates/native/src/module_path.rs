/// `<module_dir>/<version>/<arch>/<module_name>`.
#[must_use]
pub fn resolve(config: &crate::config::NativeConfig) -> std::path::PathBuf {
    config
        .module_dir
        .join(&config.version)
        .join(std::env::consts::ARCH)
        .join(&config.module_name)
}

/// The extraction lock sits next to the module it guards.
#[must_use]
pub fn lock_path(module: &std::path::Path) -> std::path::PathBuf {
    let mut name = module.file_name().unwrap_or_default().to_os_string();

    name.push(".lock");
    module.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_layout() {
        let config = crate::config::NativeConfig {
            module_dir: "/cache".into(),
            version: "1.2.3".to_owned(),
            module_name: "libscintilla.so".to_owned(),
            ..crate::config::NativeConfig::default()
        };
        let expected = std::path::Path::new("/cache")
            .join("1.2.3")
            .join(std::env::consts::ARCH)
            .join("libscintilla.so");

        assert_eq!(resolve(&config), expected);
        assert_eq!(
            lock_path(&expected),
            expected.with_file_name("libscintilla.so.lock")
        );
    }
}
