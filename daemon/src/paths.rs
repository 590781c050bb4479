/// Canonical file paths for Mindfulness data files.
///
/// All files live under %APPDATA%\Mindfulness\:
///   - config.toml        Daemon configuration, editable by the user.
///   - applications.json  The persisted application catalog.
///   - mindfulness.log    Append-only daemon log.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "Mindfulness";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CATALOG_FILE_NAME: &str = "applications.json";
pub const LOG_FILE_NAME: &str = "mindfulness.log";

/// Returns the Mindfulness application data directory: %APPDATA%\Mindfulness\
///
/// Falls back to the current working directory when APPDATA is unset
/// (non-Windows development machines).
pub fn app_data_dir() -> PathBuf {
    match std::env::var("APPDATA") {
        Ok(appdata) => PathBuf::from(appdata).join(APP_DIR_NAME),
        Err(_) => PathBuf::from(".").join(APP_DIR_NAME),
    }
}

/// Returns the full path to the config file: %APPDATA%\Mindfulness\config.toml
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the catalog file: %APPDATA%\Mindfulness\applications.json
pub fn catalog_file_path() -> PathBuf {
    app_data_dir().join(CATALOG_FILE_NAME)
}

/// Returns the full path to the log file: %APPDATA%\Mindfulness\mindfulness.log
pub fn log_file_path() -> PathBuf {
    app_data_dir().join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_mindfulness() {
        let dir = app_data_dir();
        assert_eq!(dir.file_name().unwrap(), "Mindfulness");
    }

    #[test]
    fn config_file_path_has_correct_name() {
        let path = config_file_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
    }

    #[test]
    fn catalog_file_path_has_correct_name() {
        let path = catalog_file_path();
        assert_eq!(path.file_name().unwrap(), CATALOG_FILE_NAME);
    }

    #[test]
    fn all_files_share_same_parent_dir() {
        assert_eq!(config_file_path().parent(), catalog_file_path().parent());
        assert_eq!(config_file_path().parent(), log_file_path().parent());
    }
}
