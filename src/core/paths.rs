//! Shared path manipulation utilities.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Make a path absolute against the current directory and resolve `.`/`..`
/// syntactically.
///
/// Symlinks are deliberately left in place: the recorded path of a deleted
/// directory must be the path the user swept, not wherever a link pointed.
pub fn absolutize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Sibling of `path` whose file name carries an extra suffix, e.g.
/// `delete_log.json` -> `delete_log.json.tmp`.
pub fn with_name_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(suffix);
    path.with_file_name(name)
}

/// Whether `name` is exactly one plain path component (no separators, not
/// `.` or `..`, not empty).
pub fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}
