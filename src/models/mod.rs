//! Domain models for proji.
//!
//! # Core Concepts
//!
//! - [`Class`]: A reusable project template made of folders, files and
//!   lifecycle scripts. Classes are identified by their short, unique label.
//! - [`Folder`] / [`File`]: Entries created relative to the project root,
//!   optionally seeded from a content template.
//! - [`Script`]: A lifecycle hook run before or after a project is created,
//!   ordered by its exec number within its [`ScriptKind`].
//! - [`Status`]: A standalone lookup record used to annotate project state.

mod class;
mod script;
mod status;

pub use class::*;
pub use script::*;
pub use status::*;
