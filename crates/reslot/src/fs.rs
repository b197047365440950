//! Filesystem seam used by the scanner, the remapper and the resource updaters.

use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io};
use walkdir::WalkDir;

/// File operations the engine needs from its host.
///
/// Relative paths are always relative to a mod root and may use either
/// separator; implementations normalize them.
pub trait ModFs {
    /// Every file and directory below `root`, relative to it, `/` separated.
    fn list_all_paths(&self, root: &Utf8Path) -> io::Result<Vec<String>>;

    /// Moves `from` to `to` (both relative to `root`), creating missing parent
    /// directories. A missing source is an error.
    fn rename_path(&self, root: &Utf8Path, from: &str, to: &str) -> io::Result<()>;

    fn read_text(&self, path: &Utf8Path) -> io::Result<String>;

    fn write_text(&self, path: &Utf8Path, content: &str) -> io::Result<()>;

    fn exists(&self, path: &Utf8Path) -> bool;

    fn create_dir_all(&self, path: &Utf8Path) -> io::Result<()>;

    /// Removes a file or a whole directory tree below `root`.
    fn delete_path(&self, root: &Utf8Path, relative: &str) -> io::Result<()>;
}

/// Joins a relative mod path onto a root, accepting `\` separators.
pub fn join_relative(root: &Utf8Path, relative: &str) -> Utf8PathBuf {
    let mut path = root.to_path_buf();
    for part in relative.split(['/', '\\']).filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

/// [`ModFs`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl ModFs for LocalFs {
    fn list_all_paths(&self, root: &Utf8Path) -> io::Result<Vec<String>> {
        if !root.as_std_path().is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mod directory not found: {}", root),
            ));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root.as_std_path()).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(root.as_std_path())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let relative = Utf8Path::from_path(relative).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path: {:?}", entry.path()),
                )
            })?;
            paths.push(relative.as_str().replace('\\', "/"));
        }

        Ok(paths)
    }

    fn rename_path(&self, root: &Utf8Path, from: &str, to: &str) -> io::Result<()> {
        let source = join_relative(root, from);
        let target = join_relative(root, to);

        if !source.as_std_path().exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("source does not exist: {}", source),
            ));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent.as_std_path())?;
        }

        fs::rename(source.as_std_path(), target.as_std_path())
    }

    fn read_text(&self, path: &Utf8Path) -> io::Result<String> {
        fs::read_to_string(path.as_std_path())
    }

    fn write_text(&self, path: &Utf8Path, content: &str) -> io::Result<()> {
        fs::write(path.as_std_path(), content)
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    fn create_dir_all(&self, path: &Utf8Path) -> io::Result<()> {
        fs::create_dir_all(path.as_std_path())
    }

    fn delete_path(&self, root: &Utf8Path, relative: &str) -> io::Result<()> {
        let path = join_relative(root, relative);
        if path.as_std_path().is_dir() {
            fs::remove_dir_all(path.as_std_path())
        } else {
            fs::remove_file(path.as_std_path())
        }
    }
}
