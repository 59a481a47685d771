use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Class;

/// Extension of config documents, both imported and exported.
pub const CONFIG_EXTENSION: &str = "toml";

/// Prefix of every exported config file name.
pub const EXPORT_FILE_PREFIX: &str = "proji-";

pub(crate) const EXPORT_FILE_GLOB: &str = "proji-*.toml";

impl Class {
    /// Overwrites this class with the contents of the config document at
    /// `path`.
    ///
    /// `name` and `label` are required. On any error the class is reset to
    /// the empty state rather than left partially populated.
    pub fn import_from_config(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match read_config(path) {
            Ok(class) => {
                tracing::debug!("Imported class '{}' from {}", class.name, path.display());
                *self = class;
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Parses a config document held in memory.
    pub fn from_config_str(content: &str) -> Result<Self> {
        parse_config(content, Path::new("<string>"))
    }

    /// Renders this class as a config document.
    pub fn to_config_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// The file name [`Class::export`] writes to.
    pub fn export_file_name(&self) -> Result<String> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(
                "cannot export a class without a name".into(),
            ));
        }
        let stem: String = self
            .name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '-' } else { c })
            .collect();
        Ok(format!("{}{}.{}", EXPORT_FILE_PREFIX, stem, CONFIG_EXTENSION))
    }

    /// Writes this class as a config document into `destination_dir` and
    /// returns the path of the written file. An existing file of the same
    /// name is overwritten.
    pub fn export(&self, destination_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = destination_dir.as_ref().join(self.export_file_name()?);
        let content = self.to_config_string()?;
        fs::write(&path, content).map_err(|e| Error::io(&path, e))?;

        tracing::debug!("Exported class '{}' to {}", self.name, path.display());
        Ok(path)
    }
}

fn read_config(path: &Path) -> Result<Class> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONFIG_EXTENSION));
    if !supported {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> Result<Class> {
    let parsed: Class = toml::from_str(content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    parsed.validate()?;

    // Rebuild the collections through the model so duplicate destinations
    // collapse to their first occurrence.
    let mut class = Class::new(parsed.name, parsed.label, parsed.is_default);
    for folder in parsed.folders {
        let destination = folder.destination.clone();
        if !class.add_folder(folder) {
            tracing::debug!("Dropping duplicate folder {}", destination);
        }
    }
    for file in parsed.files {
        let destination = file.destination.clone();
        if !class.add_file(file) {
            tracing::debug!("Dropping duplicate file {}", destination);
        }
    }
    class.scripts = parsed.scripts;

    Ok(class)
}
