use std::fs;
use std::path::{Path, PathBuf};

/// Nearest directory, starting at `start` and walking up, that holds a
/// deployment: a `.env` file or a `config/` directory with an auth
/// configuration file.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|path| is_project_root(path))
        .map(Path::to_path_buf)
}

fn is_project_root(path: &Path) -> bool {
    if path.join(".env").is_file() {
        return true;
    }
    let Ok(entries) = fs::read_dir(path.join("config")) else {
        return false;
    };
    entries.filter_map(|entry| entry.ok()).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.starts_with("config.auth.") && name.ends_with(".yaml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_directory_marks_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("config")).unwrap();
        fs::write(root.join("config").join("config.auth.dev.yaml"), "").unwrap();

        let nested = root.join("data").join("logs");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(root.to_path_buf()));
    }

    #[test]
    fn test_env_file_marks_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".env"), "AUTH_ENABLED=false").unwrap();

        assert!(is_project_root(temp_dir.path()));
    }

    #[test]
    fn test_unrelated_config_is_not_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("config")).unwrap();
        fs::write(root.join("config").join("config.system.dev.yaml"), "").unwrap();

        assert!(!is_project_root(root));
    }
}
