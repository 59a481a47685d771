use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::codec::EXPORT_FILE_GLOB;
use crate::error::{Error, Result};
use crate::models::{derive_label, Class, File, Folder};

/// A single entry below an import root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the import root.
    pub path: PathBuf,
    pub is_dir: bool,
}

impl TreeEntry {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }
}

/// Lists the entries of a directory tree.
///
/// Implementations return every entry below `root` (never `root` itself)
/// with paths relative to it. `excludes` is a pruning hint; entries it
/// matches are filtered again by [`plan_import`], so returning them is
/// harmless.
pub trait TreeSource {
    fn entries(&self, root: &Path, excludes: &ExcludeSet) -> Result<Vec<TreeEntry>>;
}

/// [`TreeSource`] backed by the live filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirSource;

impl TreeSource for WalkDirSource {
    fn entries(&self, root: &Path, excludes: &ExcludeSet) -> Result<Vec<TreeEntry>> {
        let metadata = fs::metadata(root).map_err(|e| Error::io(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::io(root, io::Error::other("not a directory")));
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match entry.path().strip_prefix(root) {
                Ok(relative) => !excludes.is_excluded(relative),
                Err(_) => true,
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(root, e))?;
            let relative = entry.path().strip_prefix(root).map_err(|_| {
                Error::Internal(format!(
                    "{} is not below import root {}",
                    entry.path().display(),
                    root.display()
                ))
            })?;
            entries.push(TreeEntry {
                path: relative.to_path_buf(),
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(entries)
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}

/// Glob patterns excluded from a directory import.
///
/// A pattern matches when it matches either the entry's path relative to the
/// import root or its file name alone, so `target` and `docs/*.tmp` both work.
/// Exported config files are always excluded.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    set: GlobSet,
}

impl ExcludeSet {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new(EXPORT_FILE_GLOB)?);
        for pattern in patterns {
            let pattern = pattern.as_ref().trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.set.is_match(relative)
            || relative
                .file_name()
                .is_some_and(|name| self.set.is_match(Path::new(name)))
    }

    /// True if the entry or any of its parent directories is excluded.
    fn prunes(&self, relative: &Path) -> bool {
        relative
            .ancestors()
            .filter(|a| !a.as_os_str().is_empty())
            .any(|a| self.is_excluded(a))
    }
}

/// Turns a flat list of tree entries into the folders and files of a class.
///
/// Excluded entries and everything below an excluded directory are dropped.
/// Both lists are sorted by path, component by component, which is the
/// order of a depth-first walk with siblings sorted by name.
pub fn plan_import<I>(entries: I, excludes: &ExcludeSet) -> Result<(Vec<Folder>, Vec<File>)>
where
    I: IntoIterator<Item = TreeEntry>,
{
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in entries {
        if excludes.prunes(&entry.path) {
            tracing::debug!("Excluding {}", entry.path.display());
            continue;
        }
        if entry.is_dir {
            dirs.push(entry.path);
        } else {
            files.push(entry.path);
        }
    }

    dirs.sort();
    dirs.dedup();
    files.sort();
    files.dedup();

    let folders = dirs
        .iter()
        .map(|p| destination(p).map(Folder::new))
        .collect::<Result<Vec<_>>>()?;
    let files = files
        .iter()
        .map(|p| destination(p).map(File::new))
        .collect::<Result<Vec<_>>>()?;

    Ok((folders, files))
}

/// Renders a relative path as a forward-slash separated destination.
fn destination(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .filter(|p| !p.contains('\\'))
                    .ok_or_else(|| Error::InvalidPath(relative.to_path_buf()))?;
                parts.push(part);
            }
            _ => {
                return Err(Error::Internal(format!(
                    "{} is not a plain relative path",
                    relative.display()
                )))
            }
        }
    }
    if parts.is_empty() {
        return Err(Error::Internal("empty relative path".into()));
    }
    Ok(parts.join("/"))
}

/// Name of the root as given. Only `.`, `..` and similar paths without a
/// final component are resolved, so a symlinked root keeps the link's name.
fn root_name(root: &Path) -> Result<String> {
    let resolved;
    let name = match root.file_name() {
        Some(name) => name,
        None => {
            resolved = fs::canonicalize(root).map_err(|e| Error::io(root, e))?;
            resolved
                .file_name()
                .ok_or_else(|| Error::InvalidPath(resolved.clone()))?
        }
    };
    name.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidPath(root.to_path_buf()))
}

impl Class {
    /// Replaces the folders and files of this class with the structure of
    /// the directory tree at `root`.
    ///
    /// The root itself is not recorded. An empty name is taken from the root
    /// directory's name and an empty label is derived from the name. Scripts
    /// are cleared and every imported entry has an empty template. On error
    /// the class is not modified.
    pub fn import_from_directory<S: AsRef<str>>(
        &mut self,
        root: impl AsRef<Path>,
        exclude: &[S],
    ) -> Result<()> {
        self.import_from_source(&WalkDirSource, root.as_ref(), exclude)
    }

    /// Same as [`Class::import_from_directory`] with an explicit tree source.
    pub fn import_from_source<T, S>(&mut self, source: &T, root: &Path, exclude: &[S]) -> Result<()>
    where
        T: TreeSource + ?Sized,
        S: AsRef<str>,
    {
        let excludes = ExcludeSet::new(exclude)?;
        let entries = source.entries(root, &excludes)?;
        let (folders, files) = plan_import(entries, &excludes)?;

        let name = if self.name.is_empty() {
            root_name(root)?
        } else {
            self.name.clone()
        };
        let label = if self.label.is_empty() {
            derive_label(&name)
        } else {
            self.label.clone()
        };
        if label.trim().is_empty() {
            return Err(Error::Validation(format!(
                "cannot derive a label from class name '{name}'"
            )));
        }
        self.name = name;
        self.label = label;

        tracing::debug!(
            "Imported {} folders and {} files from {}",
            folders.len(),
            files.len(),
            root.display()
        );
        self.folders = folders;
        self.files = files;
        self.scripts = Vec::new();
        Ok(())
    }
}
