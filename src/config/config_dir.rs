use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use tracing::debug;

use super::error::ConfigResult;

pub fn find_config_file(use_local: bool) -> PathBuf {
    if use_local {
        return PathBuf::from("./config.toml");
    }

    #[cfg(unix)]
    let home = std::env::var_os("HOME");
    #[cfg(windows)]
    let home = std::env::var_os("APPDATA");

    #[cfg(any(unix, windows))]
    if let Some(path) = home.and_then(|home| user_config_file(Path::new(&home))) {
        return path;
    }

    PathBuf::from("./config.toml")
}

/// `<home>/.config/<app>/config.toml` on unix, `<appdata>/<app>/config.toml` elsewhere,
/// if it exists.
fn user_config_file(home: &Path) -> Option<PathBuf> {
    let mut path = home.to_path_buf();

    if cfg!(unix) {
        path = path.join(".config");
    }

    path = path.join(crate::APPLICATION_NAME).join("config.toml");
    path.exists().then_some(path)
}

pub fn read_config(use_local: bool) -> ConfigResult<Vec<u8>> {
    read_config_at(&find_config_file(use_local))
}

pub fn read_config_at(filename: &Path) -> ConfigResult<Vec<u8>> {
    tracing::trace!("looking for config at: {}", filename.display());
    if !filename.exists() {
        return Err(crate::config::error::ConfigError::ConfigNotFound);
    }

    let filename = filename.canonicalize()?;
    debug!("using {} as configuration file", filename.display());

    let mut fd = File::open(filename)?;
    let mut buf = Vec::new();
    fd.read_to_end(&mut buf)?;

    Ok(buf)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_find_config_file_local() {
        let path = find_config_file(true);
        assert_eq!(path, PathBuf::from("./config.toml"));
    }

    #[test]
    fn test_user_config_file_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app_dir = temp_dir.path().to_path_buf();
        if cfg!(unix) {
            app_dir = app_dir.join(".config");
        }
        let app_dir = app_dir.join(crate::APPLICATION_NAME);
        fs::create_dir_all(&app_dir).unwrap();
        let config_file = app_dir.join("config.toml");
        fs::write(&config_file, "dummy = true").unwrap();

        assert_eq!(user_config_file(temp_dir.path()), Some(config_file));
    }

    #[test]
    fn test_user_config_file_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(user_config_file(temp_dir.path()), None);
    }

    #[test]
    fn test_read_config_success() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, b"foo = 'bar'").unwrap();

        let result = read_config_at(&file_path);

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), b"foo = 'bar'");
    }

    #[test]
    fn test_read_config_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_config_at(&temp_dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound)));
    }
}
