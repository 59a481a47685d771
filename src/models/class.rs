use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Script, ScriptKind};
use crate::error::{Error, Result};

/// A reusable project template.
///
/// A class is constructed empty, populated from either a directory or a
/// config document, and then handed to a [`StorageService`] for persistence.
/// The three collections are always present; "no folders" is an empty
/// `Vec`, so exports always produce well-formed (possibly empty) sections.
///
/// Serialization of this type is the config document wire format: the field
/// names below are the keys other tools read and write.
///
/// [`StorageService`]: crate::storage::StorageService
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Human readable name, used for display and for the export file name.
    pub name: String,
    /// Short unique key used to look the class up.
    pub label: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub scripts: Vec<Script>,
}

/// A folder created relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Forward-slash separated path relative to the project root.
    pub destination: String,
    /// Path to a template folder. Empty means no template.
    #[serde(default)]
    pub template: String,
}

/// A file created relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Forward-slash separated path relative to the project root.
    pub destination: String,
    /// Path to a content template. Empty means the file is created empty.
    #[serde(default)]
    pub template: String,
}

impl Folder {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            template: String::new(),
        }
    }
}

impl File {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            template: String::new(),
        }
    }

    pub fn with_template(destination: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            template: template.into(),
        }
    }
}

impl Class {
    pub fn new(name: impl Into<String>, label: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            is_default,
            folders: Vec::new(),
            files: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// True when the class has no folders, files or scripts, whatever its
    /// name and label.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty() && self.scripts.is_empty()
    }

    /// Adds a folder unless one with the same destination already exists.
    pub fn add_folder(&mut self, folder: Folder) -> bool {
        if self
            .folders
            .iter()
            .any(|f| same_destination(&f.destination, &folder.destination))
        {
            return false;
        }
        self.folders.push(folder);
        true
    }

    /// Adds a file unless one with the same destination already exists.
    pub fn add_file(&mut self, file: File) -> bool {
        if self
            .files
            .iter()
            .any(|f| same_destination(&f.destination, &file.destination))
        {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Adds a script, rejecting an exec number already taken within its kind.
    pub fn add_script(&mut self, script: Script) -> Result<()> {
        if script.exec_number == 0 {
            return Err(Error::Validation(format!(
                "script '{}' has exec number 0, exec numbers start at 1",
                script.name
            )));
        }
        if self
            .scripts
            .iter()
            .any(|s| s.kind == script.kind && s.exec_number == script.exec_number)
        {
            return Err(duplicate_exec_number(&script));
        }
        self.scripts.push(script);
        Ok(())
    }

    /// Scripts of one kind, sorted into execution order.
    pub fn scripts_in_exec_order(&self, kind: ScriptKind) -> Vec<&Script> {
        let mut scripts: Vec<&Script> = self.scripts.iter().filter(|s| s.kind == kind).collect();
        scripts.sort_by_key(|s| s.exec_number);
        scripts
    }

    /// Checks the invariants a class must hold before it is stored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("class name must not be empty".into()));
        }
        if self.label.trim().is_empty() {
            return Err(Error::Validation("class label must not be empty".into()));
        }

        for destination in self
            .folders
            .iter()
            .map(|f| &f.destination)
            .chain(self.files.iter().map(|f| &f.destination))
        {
            check_destination(destination)?;
        }

        let mut seen = HashSet::new();
        for script in &self.scripts {
            if script.exec_number == 0 {
                return Err(Error::Validation(format!(
                    "script '{}' has exec number 0, exec numbers start at 1",
                    script.name
                )));
            }
            if !seen.insert((script.kind, script.exec_number)) {
                return Err(duplicate_exec_number(script));
            }
        }
        Ok(())
    }

    /// Resets every field to the empty state.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Derives a short label from a class name.
///
/// Multi-word names use the first letter of each word, single words their
/// first three characters. Words are separated by anything that is not
/// alphanumeric. A name without any alphanumeric character falls back to
/// its own first three characters, so a non-blank name never yields an
/// empty label.
pub fn derive_label(name: &str) -> String {
    let words: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    match words.as_slice() {
        [] => name.trim().chars().take(3).collect::<String>().to_lowercase(),
        [word] => word.chars().take(3).collect::<String>().to_lowercase(),
        words => words
            .iter()
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_lowercase(),
    }
}

fn same_destination(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// A destination is a forward-slash path below the project root. One
/// trailing `/` is allowed on folders.
fn check_destination(destination: &str) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(Error::Validation(format!("destination '{destination}' {reason}")))
    };

    if destination.starts_with('/') {
        return invalid("must be relative to the project root");
    }
    if destination.contains('\\') {
        return invalid("must use '/' as separator");
    }
    let trimmed = destination.strip_suffix('/').unwrap_or(destination);
    if trimmed.is_empty() {
        return invalid("must not be empty");
    }
    for part in trimmed.split('/') {
        match part {
            "" => return invalid("must not contain empty components"),
            "." | ".." => return invalid("must not contain '.' or '..'"),
            _ => {}
        }
    }
    Ok(())
}

fn duplicate_exec_number(script: &Script) -> Error {
    Error::Validation(format!(
        "duplicate exec number {} for {} scripts (script '{}')",
        script.exec_number, script.kind, script.name
    ))
}
