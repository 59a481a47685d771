//! Conversions between a [`Class`](crate::models::Class) and the outside
//! world: a live directory tree on one side, a config document on the other.
//!
//! Both conversions are inherent methods on `Class`:
//! [`import_from_directory`](crate::models::Class::import_from_directory),
//! [`import_from_config`](crate::models::Class::import_from_config) and
//! [`export`](crate::models::Class::export).

mod codec;
mod directory;

pub use codec::{CONFIG_EXTENSION, EXPORT_FILE_PREFIX};
pub use directory::{plan_import, ExcludeSet, TreeEntry, TreeSource, WalkDirSource};
