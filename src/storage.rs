//! The persistence boundary consumed by the command layer.

use crate::error::Result;
use crate::models::{Class, CreateStatusInput, Status, UpdateStatusInput};

/// Durable storage for classes and statuses.
///
/// Classes are stored together with all of their folders, files and scripts
/// as one unit, and are always handed back fully populated. The label is the
/// primary external key of a class; lookups by name are accepted as well.
pub trait StorageService {
    /// Stores a new class. Fails with a conflict if its label or name is
    /// already taken, or if it is a default class and another default class
    /// exists.
    fn save_class(&self, class: &Class) -> Result<()>;

    /// Stores a class, atomically replacing a stored class with the same label.
    fn replace_class(&self, class: &Class) -> Result<()>;

    /// Loads a class by label or name. A label match wins over a name match.
    fn load_class(&self, name_or_label: &str) -> Result<Class>;

    /// Loads every stored class, ordered by name.
    fn load_all_classes(&self) -> Result<Vec<Class>>;

    /// Removes a class and everything it owns.
    fn delete_class(&self, name_or_label: &str) -> Result<()>;

    fn save_status(&self, input: CreateStatusInput) -> Result<Status>;

    fn load_status(&self, id: i64) -> Result<Status>;

    fn load_status_by_title(&self, title: &str) -> Result<Status>;

    /// Loads every stored status, ordered by id.
    fn load_all_statuses(&self) -> Result<Vec<Status>>;

    fn update_status(&self, id: i64, input: UpdateStatusInput) -> Result<Status>;

    fn delete_status(&self, id: i64) -> Result<()>;
}
