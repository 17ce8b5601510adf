//! Loading and saving the SSH config file.
//!
//! Saving never leaves a half-written config behind:
//! 1. The current on-disk content is copied to `<config>.bak`.
//! 2. The new content is written to a temporary file next to the config.
//! 3. The temporary file is renamed over the config.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{ConfigError, Result};
use crate::parser::parse;

/// Suffix appended to the config file name for the backup copy
pub const BACKUP_SUFFIX: &str = ".bak";

/// A parsed config file bound to its location on disk
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    document: Document,
    existed: bool,
}

/// Result of [`ConfigFile::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file did not exist and was created
    Created,
    /// The file was replaced; its previous content is in `backup`
    Updated { backup: PathBuf },
    /// On-disk content already matched; nothing was written
    Unchanged,
}

/// Read and parse the config at `path`.
///
/// A missing file yields an empty document. The content does not have to be
/// UTF-8; undecodable lines are carried through unchanged.
pub fn parse_config(path: &Path) -> Result<ConfigFile> {
    let (bytes, existed) = match fs::read(path) {
        Ok(bytes) => (bytes, true),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "ssh config does not exist, starting empty");
            (Vec::new(), false)
        }
        Err(e) => return Err(ConfigError::io("read", path, e)),
    };

    Ok(ConfigFile {
        path: path.to_path_buf(),
        document: parse(&bytes),
        existed,
    })
}

/// Backup location for a config path: same directory, `.bak` appended
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

impl ConfigFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path_for(&self.path)
    }

    /// Whether the file existed when it was read
    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Persist the document, backing up the previous content first
    pub fn save(&self) -> Result<SaveOutcome> {
        let target = resolve_symlink(&self.path)?;
        let content = self.document.render();

        let current = match fs::read(&target) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(ConfigError::io("read", &target, e)),
        };

        let outcome = match current {
            Some(bytes) if bytes == content => {
                debug!(path = %target.display(), "ssh config unchanged, skipping write");
                return Ok(SaveOutcome::Unchanged);
            }
            Some(_) => {
                let backup = self.backup_path();
                fs::copy(&target, &backup)
                    .map_err(|e| ConfigError::io("write backup", &backup, e))?;
                info!(backup = %backup.display(), "backed up ssh config");
                SaveOutcome::Updated { backup }
            }
            None => {
                ensure_parent_dir(&target)?;
                SaveOutcome::Created
            }
        };

        write_atomic(&target, &content)?;
        info!(path = %target.display(), "wrote ssh config");
        Ok(outcome)
    }
}

/// Follow a symlinked config so the link itself is preserved on replace
fn resolve_symlink(path: &Path) -> Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = fs::read_link(path).map_err(|e| ConfigError::io("read link", path, e))?;
            let target = match path.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target,
            };
            debug!(link = %path.display(), target = %target.display(), "ssh config is a symlink");
            Ok(target)
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|e| ConfigError::io("create directory", parent, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
            .map_err(|e| ConfigError::io("set permissions on", parent, e))?;
    }
    Ok(())
}

/// Write to a sibling temp file, then rename it over `path`.
///
/// The temp file is created exclusively with mode 0600 on unix, takes the
/// permissions of the file it replaces before any content is written, and is
/// removed if any step fails.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path);

    let result = write_temp(&temp_path, path, content).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| ConfigError::io("replace", path, e))
    });

    if result.is_err() {
        if let Err(e) = fs::remove_file(&temp_path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %temp_path.display(), error = %e, "failed to remove temp file");
            }
        }
    }
    result
}

fn write_temp(temp_path: &Path, original: &Path, content: &[u8]) -> Result<()> {
    let mut file = create_temp(temp_path)?;
    if let Ok(meta) = fs::metadata(original) {
        file.set_permissions(meta.permissions())
            .map_err(|e| ConfigError::io("set permissions on", temp_path, e))?;
    }
    file.write_all(content)
        .map_err(|e| ConfigError::io("write temp file", temp_path, e))?;
    file.sync_all()
        .map_err(|e| ConfigError::io("sync temp file", temp_path, e))?;
    Ok(())
}

/// Create a temp file that must not already exist, readable by the owner only
fn create_temp(temp_path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(temp_path)
        .map_err(|e| ConfigError::io("create temp file", temp_path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let config = parse_config(&temp_dir.path().join("config")).unwrap();
        assert!(config.document().is_empty());
        assert!(!config.existed());
    }

    #[test]
    fn test_non_utf8_config_is_edited_losslessly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        let original: &[u8] = b"# Jos\xe9's laptop\nHost *\n  IdentityFile ~/.ssh/id\n";
        fs::write(&path, original).unwrap();

        let mut config = parse_config(&path).unwrap();
        assert!(config.existed());
        assert_eq!(config.document().active_identity_file("a.com"), Some("~/.ssh/id".to_string()));
        config.document_mut().activate_key("a.com", "/k").unwrap();
        config.save().unwrap();

        let written = fs::read(&path).unwrap();
        assert!(written.ends_with(original), "{:?}", written);
        assert!(written.starts_with(b"Host a.com\n    IdentityFile /k\n"));
        assert_eq!(fs::read(config.backup_path()).unwrap(), original);
    }

    #[test]
    fn test_parse_unreadable_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be read as a file
        let err = parse_config(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path_for(Path::new("/home/u/.ssh/config")),
            PathBuf::from("/home/u/.ssh/config.bak")
        );
    }

    #[test]
    fn test_fresh_file_creation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".ssh/config");

        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("github.com", "~/.ssh/id_work").unwrap();
        assert_eq!(config.save().unwrap(), SaveOutcome::Created);

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Host github.com\n    IdentityFile ~/.ssh/id_work\n");
        assert!(!config.backup_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".ssh/config");
        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("a", "/k").unwrap();
        config.save().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn test_backup_holds_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        let original = "Host *\n  IdentityFile ~/.ssh/id_default\n";
        fs::write(&path, original).unwrap();
        fs::write(backup_path_for(&path), "stale backup").unwrap();

        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("x.com", "/k").unwrap();
        let outcome = config.save().unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Updated {
                backup: config.backup_path()
            }
        );
        assert_eq!(fs::read_to_string(config.backup_path()).unwrap(), original);
        let reparsed = parse_config(&path).unwrap();
        assert_eq!(
            reparsed.document().active_identity_file("x.com"),
            Some("/k".to_string())
        );
    }

    #[test]
    fn test_backup_tracks_on_disk_content_at_save_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "Host a\n  IdentityFile /a\n").unwrap();

        let mut config = parse_config(&path).unwrap();
        // Someone edits the file between read and save
        fs::write(&path, "# edited\nHost a\n  IdentityFile /a\n").unwrap();
        config.document_mut().activate_key("a", "/b").unwrap();
        config.save().unwrap();

        assert_eq!(
            fs::read_to_string(config.backup_path()).unwrap(),
            "# edited\nHost a\n  IdentityFile /a\n"
        );
    }

    #[test]
    fn test_unchanged_save_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "Host a\n  IdentityFile /a\n").unwrap();

        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("a", "/a").unwrap();
        assert_eq!(config.save().unwrap(), SaveOutcome::Unchanged);
        assert!(!config.backup_path().exists());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "Host a\n").unwrap();

        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("a", "/k").unwrap();
        config.save().unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{:?}", names);
    }

    #[test]
    fn test_failed_replace_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // Renaming a file over a non-empty directory fails
        let target = temp_dir.path().join("config");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "x").unwrap();

        assert!(write_atomic(&target, b"Host a\n").is_err());
        assert!(!temp_path_for(&target).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_file_is_private_before_write() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join(".config.tmp");
        let file = create_temp(&temp_path).unwrap();

        let meta = file.metadata().unwrap();
        assert_eq!(meta.len(), 0);
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_stale_temp_file_is_not_reused() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("config");
        fs::write(&target, "Host a\n").unwrap();
        fs::write(temp_path_for(&target), "left over").unwrap();

        let err = write_atomic(&target, b"Host b\n").unwrap_err();
        assert!(matches!(err, ConfigError::Io { action: "create temp file", .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "Host a\n");

        // The failed attempt clears the stale file so the next save goes through
        assert!(!temp_path_for(&target).exists());
        write_atomic(&target, b"Host b\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "Host b\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_config_keeps_link() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("dotfiles-config");
        let link = temp_dir.path().join("config");
        fs::write(&real, "Host *\n  IdentityFile /d\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut config = parse_config(&link).unwrap();
        config.document_mut().activate_key("a", "/k").unwrap();
        config.save().unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(fs::read_to_string(&real).unwrap().starts_with("Host a\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "Host *\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let mut config = parse_config(&path).unwrap();
        config.document_mut().activate_key("a", "/k").unwrap();
        config.save().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
