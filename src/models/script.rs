use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A lifecycle script attached to a class.
///
/// Scripts of the same [`ScriptKind`] run in ascending `exec_number` order.
/// Gaps between exec numbers are fine, duplicates within a kind are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// File name of the script to run.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ScriptKind,
    /// 1-based position within the scripts of the same kind.
    pub exec_number: u32,
    #[serde(default)]
    pub run_as_sudo: bool,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Script {
    pub fn new(name: impl Into<String>, kind: ScriptKind, exec_number: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            exec_number,
            run_as_sudo: false,
            args: Vec::new(),
        }
    }
}

/// The hook point a script runs at.
///
/// - `Pre`: Before the project's folders and files are created
/// - `Post`: After the project has been created
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Pre,
    Post,
}

impl ScriptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl FromStr for ScriptKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(Error::Validation(format!(
                "unknown script type '{}', expected 'pre' or 'post'",
                other
            ))),
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
