use serde::{Deserialize, Serialize};

/// A lookup record used to annotate the state of a project.
///
/// Statuses live next to classes in the same store but have no relationship
/// to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub title: String,
    pub comment: String,
}

/// Input for creating a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStatusInput {
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

/// Input for updating an existing status. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusInput {
    pub title: Option<String>,
    pub comment: Option<String>,
}
