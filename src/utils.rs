//! Utility functions for path manipulation

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a caller-supplied folder against the download root
///
/// The folder must stay inside `root`: absolute paths, drive prefixes and `..`
/// components are rejected. Empty folders and `.` components are allowed and
/// resolve to the root itself.
///
/// # Examples
///
/// ```
/// use media_dl::utils::resolve_destination;
/// use std::path::Path;
///
/// let dir = resolve_destination(Path::new("downloads"), "music/albums").unwrap();
/// assert_eq!(dir, Path::new("downloads/music/albums"));
///
/// assert!(resolve_destination(Path::new("downloads"), "../etc").is_err());
/// assert!(resolve_destination(Path::new("downloads"), "/etc").is_err());
/// ```
pub fn resolve_destination(root: &Path, folder: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(folder).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::invalid_request(
                    "folder",
                    format!("'{}' must not contain '..'", folder),
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::invalid_request(
                    "folder",
                    format!("'{}' must be relative to the download directory", folder),
                ));
            }
        }
    }

    Ok(resolved)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_folder_resolves_under_root() {
        let dir = resolve_destination(Path::new("/data/downloads"), "a/b/c").unwrap();
        assert_eq!(dir, PathBuf::from("/data/downloads/a/b/c"));
    }

    #[test]
    fn test_empty_and_dot_resolve_to_root() {
        let root = Path::new("downloads");
        assert_eq!(resolve_destination(root, "").unwrap(), root);
        assert_eq!(resolve_destination(root, ".").unwrap(), root);
        assert_eq!(
            resolve_destination(root, "./music").unwrap(),
            root.join("music")
        );
    }

    #[test]
    fn test_parent_components_rejected() {
        let root = Path::new("downloads");
        for folder in ["..", "../x", "music/../../x", "a/.."] {
            let err = resolve_destination(root, folder).unwrap_err();
            match err {
                Error::InvalidRequest { field, .. } => assert_eq!(field, "folder"),
                other => panic!("Expected InvalidRequest for {folder}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_absolute_folder_rejected() {
        assert!(resolve_destination(Path::new("downloads"), "/etc/passwd").is_err());
    }

    #[test]
    fn test_folder_with_spaces_and_unicode() {
        let dir = resolve_destination(Path::new("downloads"), "My Music/Café").unwrap();
        assert_eq!(dir, PathBuf::from("downloads/My Music/Café"));
    }
}
