//! Private key path helpers
//!
//! Path expansion takes the home directory as an argument instead of reading
//! the environment, so callers decide what `~` means.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolve a leading `~` against `home` and normalize the path lexically.
///
/// `.` components are dropped and `..` folds into its parent. Symlinks are not
/// followed, so two spellings of the same file compare equal without touching disk.
pub fn expand_path(path: &str, home: &Path) -> PathBuf {
    let expanded = if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    };
    normalize(&expanded)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `path` (after expansion) names an existing regular file
pub fn key_exists(path: &str, home: &Path) -> bool {
    expand_path(path, home).is_file()
}

/// Whether two key paths refer to the same file after expansion
pub fn same_key(a: &str, b: &str, home: &Path) -> bool {
    expand_path(a, home) == expand_path(b, home)
}

/// Render a path under `home` with a leading `~` for display and storage
pub fn contract_home(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}

/// Private keys in an SSH directory: regular files with a `<name>.pub` sibling
pub fn discover_keys(ssh_dir: &Path) -> Result<Vec<PathBuf>> {
    if !ssh_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    for entry in fs::read_dir(ssh_dir)
        .with_context(|| format!("Failed to read SSH directory: {:?}", ssh_dir))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_some_and(|ext| ext == "pub") {
            continue;
        }

        let mut public = path.clone().into_os_string();
        public.push(".pub");
        if Path::new(&public).is_file() {
            keys.push(path);
        }
    }
    keys.sort();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_tilde() {
        let home = Path::new("/home/dev");
        assert_eq!(expand_path("~/.ssh/id_work", home), PathBuf::from("/home/dev/.ssh/id_work"));
        assert_eq!(expand_path("~", home), PathBuf::from("/home/dev"));
    }

    #[test]
    fn test_expand_leaves_other_users_alone() {
        let home = Path::new("/home/dev");
        assert_eq!(expand_path("~other/key", home), PathBuf::from("~other/key"));
        assert_eq!(expand_path("/etc/ssh/key", home), PathBuf::from("/etc/ssh/key"));
    }

    #[test]
    fn test_expand_normalizes() {
        let home = Path::new("/home/dev");
        assert_eq!(
            expand_path("~/.ssh/./old/../id_work", home),
            PathBuf::from("/home/dev/.ssh/id_work")
        );
        assert_eq!(expand_path("/../key", home), PathBuf::from("/key"));
        assert_eq!(expand_path("../key", home), PathBuf::from("../key"));
    }

    #[test]
    fn test_same_key() {
        let home = Path::new("/home/dev");
        assert!(same_key("~/.ssh/id", "/home/dev/.ssh/id", home));
        assert!(same_key("~/.ssh//id", "/home/dev/.ssh/./id", home));
        assert!(!same_key("~/.ssh/id", "/home/dev/.ssh/id2", home));
    }

    #[test]
    fn test_contract_home() {
        let home = Path::new("/home/dev");
        assert_eq!(contract_home(Path::new("/home/dev/.ssh/id"), home), "~/.ssh/id");
        assert_eq!(contract_home(Path::new("/opt/key"), home), "/opt/key");
    }

    #[test]
    fn test_key_exists() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path();
        fs::create_dir_all(home.join(".ssh")).unwrap();
        fs::write(home.join(".ssh/id_work"), "key").unwrap();

        assert!(key_exists("~/.ssh/id_work", home));
        assert!(!key_exists("~/.ssh/id_missing", home));
        // Directories are not keys
        assert!(!key_exists("~/.ssh", home));
    }

    #[test]
    fn test_discover_keys() {
        let temp_dir = TempDir::new().unwrap();
        let ssh_dir = temp_dir.path();
        for name in ["id_work", "id_work.pub", "id_personal", "id_personal.pub", "config", "known_hosts"] {
            fs::write(ssh_dir.join(name), "").unwrap();
        }

        let keys = discover_keys(ssh_dir).unwrap();
        assert_eq!(keys, vec![ssh_dir.join("id_personal"), ssh_dir.join("id_work")]);
    }

    #[test]
    fn test_discover_keys_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_keys(&temp_dir.path().join("nope")).unwrap().is_empty());
    }
}
