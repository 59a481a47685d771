mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::storage::StorageService;

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`StorageService`].
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parent = path
            .parent()
            .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::configure(conn)
    }

    pub fn open_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("database lock poisoned".into()))
    }

    /// Writes a class and all of its children inside one transaction.
    fn write_class(&self, class: &Class, replace: bool) -> Result<()> {
        class.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut created_at = None;
        if replace {
            created_at = tx
                .query_row(
                    "SELECT created_at FROM classes WHERE label = ?",
                    [&class.label],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            if created_at.is_some() {
                delete_class_rows(&tx, &class.label)?;
                tracing::debug!("Replacing class with label '{}'", class.label);
            }
        }

        check_class_conflicts(&tx, class)?;
        insert_class(&tx, class, created_at)?;
        tx.commit()?;

        tracing::info!("Saved class '{}' ({})", class.name, class.label);
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl StorageService for Database {
    // ============================================================
    // Class operations
    // ============================================================

    fn save_class(&self, class: &Class) -> Result<()> {
        self.write_class(class, false)
    }

    fn replace_class(&self, class: &Class) -> Result<()> {
        self.write_class(class, true)
    }

    fn load_class(&self, name_or_label: &str) -> Result<Class> {
        let mut conn = self.conn()?;
        // A read transaction keeps the class and its children consistent.
        let tx = conn.transaction()?;

        let (id, mut class) = find_class(&tx, name_or_label)?
            .ok_or_else(|| Error::not_found("class", name_or_label))?;
        load_children(&tx, &id, &mut class)?;
        Ok(class)
    }

    fn load_all_classes(&self) -> Result<Vec<Class>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = {
            let mut stmt =
                tx.prepare("SELECT id, name, label, is_default FROM classes ORDER BY name")?;
            let rows = stmt
                .query_map([], class_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut classes = Vec::with_capacity(rows.len());
        for (id, mut class) in rows {
            load_children(&tx, &id, &mut class)?;
            classes.push(class);
        }
        Ok(classes)
    }

    fn delete_class(&self, name_or_label: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (_, class) = find_class(&tx, name_or_label)?
            .ok_or_else(|| Error::not_found("class", name_or_label))?;
        delete_class_rows(&tx, &class.label)?;
        tx.commit()?;

        tracing::info!("Deleted class '{}' ({})", class.name, class.label);
        Ok(())
    }

    // ============================================================
    // Status operations
    // ============================================================

    fn save_status(&self, input: CreateStatusInput) -> Result<Status> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("status title must not be empty".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if find_status_by_title(&tx, &input.title)?.is_some() {
            return Err(title_taken(&input.title));
        }

        tx.execute(
            "INSERT INTO statuses (title, comment) VALUES (?, ?)",
            (&input.title, &input.comment),
        )
        .map_err(|e| unique_violation_as_conflict(e, &input.title))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Status {
            id,
            title: input.title,
            comment: input.comment,
        })
    }

    fn load_status(&self, id: i64) -> Result<Status> {
        let conn = self.conn()?;
        find_status(&conn, id)?.ok_or_else(|| Error::not_found("status", id))
    }

    fn load_status_by_title(&self, title: &str) -> Result<Status> {
        let conn = self.conn()?;
        find_status_by_title(&conn, title)?.ok_or_else(|| Error::not_found("status", title))
    }

    fn load_all_statuses(&self) -> Result<Vec<Status>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, title, comment FROM statuses ORDER BY id")?;

        let statuses = stmt
            .query_map([], status_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(statuses)
    }

    fn update_status(&self, id: i64, input: UpdateStatusInput) -> Result<Status> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = find_status(&tx, id)?.ok_or_else(|| Error::not_found("status", id))?;

        let title = input.title.unwrap_or(existing.title);
        let comment = input.comment.unwrap_or(existing.comment);

        if title.trim().is_empty() {
            return Err(Error::Validation("status title must not be empty".into()));
        }
        if let Some(other) = find_status_by_title(&tx, &title)? {
            if other.id != id {
                return Err(title_taken(&title));
            }
        }

        tx.execute(
            "UPDATE statuses SET title = ?, comment = ? WHERE id = ?",
            (&title, &comment, id),
        )
        .map_err(|e| unique_violation_as_conflict(e, &title))?;
        tx.commit()?;

        Ok(Status { id, title, comment })
    }

    fn delete_status(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM statuses WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(Error::not_found("status", id));
        }
        Ok(())
    }
}

// ============================================================
// Class helpers
// ============================================================

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<(String, Class)> {
    Ok((
        row.get(0)?,
        Class::new(
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ),
    ))
}

fn find_class(conn: &Connection, name_or_label: &str) -> Result<Option<(String, Class)>> {
    let found = conn
        .query_row(
            "SELECT id, name, label, is_default FROM classes
             WHERE label = ?1 OR name = ?1
             ORDER BY label = ?1 DESC LIMIT 1",
            [name_or_label],
            class_from_row,
        )
        .optional()?;
    Ok(found)
}

fn load_children(conn: &Connection, class_id: &str, class: &mut Class) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT destination, template FROM class_folders WHERE class_id = ? ORDER BY position",
    )?;
    class.folders = stmt
        .query_map([class_id], |row| {
            Ok(Folder {
                destination: row.get(0)?,
                template: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT destination, template FROM class_files WHERE class_id = ? ORDER BY position",
    )?;
    class.files = stmt
        .query_map([class_id], |row| {
            Ok(File {
                destination: row.get(0)?,
                template: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT name, kind, exec_number, run_as_sudo, args
         FROM class_scripts WHERE class_id = ? ORDER BY position",
    )?;
    class.scripts = stmt
        .query_map([class_id], |row| {
            let kind: String = row.get(1)?;
            let args: String = row.get(4)?;
            Ok(Script {
                name: row.get(0)?,
                kind: kind.parse().map_err(|_| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        Type::Text,
                        format!("unknown script kind '{}'", kind).into(),
                    )
                })?,
                exec_number: row.get(2)?,
                run_as_sudo: row.get(3)?,
                args: serde_json::from_str(&args).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                })?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(())
}

fn check_class_conflicts(conn: &Connection, class: &Class) -> Result<()> {
    let exists = |sql: &str, value: &str| -> Result<bool> {
        Ok(conn
            .query_row(sql, [value], |_| Ok(()))
            .optional()?
            .is_some())
    };

    if exists("SELECT 1 FROM classes WHERE label = ?", &class.label)? {
        return Err(Error::Conflict(format!(
            "a class with label '{}' already exists",
            class.label
        )));
    }
    if exists("SELECT 1 FROM classes WHERE name = ?", &class.name)? {
        return Err(Error::Conflict(format!(
            "a class named '{}' already exists",
            class.name
        )));
    }
    if class.is_default {
        let current: Option<String> = conn
            .query_row(
                "SELECT label FROM classes WHERE is_default = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(current) = current {
            return Err(Error::Conflict(format!(
                "class '{}' is already the default class",
                current
            )));
        }
    }
    Ok(())
}

fn insert_class(conn: &Connection, class: &Class, created_at: Option<String>) -> Result<()> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let created_at = created_at.unwrap_or_else(|| now.clone());

    conn.execute(
        "INSERT INTO classes (id, name, label, is_default, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            &id,
            &class.name,
            &class.label,
            class.is_default,
            &created_at,
            &now,
        ),
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO class_folders (class_id, position, destination, template)
         VALUES (?, ?, ?, ?)",
    )?;
    for (position, folder) in class.folders.iter().enumerate() {
        stmt.execute((&id, position as i64, &folder.destination, &folder.template))?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO class_files (class_id, position, destination, template)
         VALUES (?, ?, ?, ?)",
    )?;
    for (position, file) in class.files.iter().enumerate() {
        stmt.execute((&id, position as i64, &file.destination, &file.template))?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO class_scripts (class_id, position, name, kind, exec_number, run_as_sudo, args)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;
    for (position, script) in class.scripts.iter().enumerate() {
        stmt.execute((
            &id,
            position as i64,
            &script.name,
            script.kind.as_str(),
            script.exec_number,
            script.run_as_sudo,
            serde_json::to_string(&script.args)?,
        ))?;
    }

    Ok(())
}

/// Deletes the class with `label` and its children. Children are removed
/// explicitly so no rows are orphaned even without foreign key enforcement.
fn delete_class_rows(conn: &Connection, label: &str) -> Result<()> {
    for table in ["class_folders", "class_files", "class_scripts"] {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE class_id IN (SELECT id FROM classes WHERE label = ?)",
                table
            ),
            [label],
        )?;
    }
    conn.execute("DELETE FROM classes WHERE label = ?", [label])?;
    Ok(())
}

// ============================================================
// Status helpers
// ============================================================

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get(0)?,
        title: row.get(1)?,
        comment: row.get(2)?,
    })
}

fn title_taken(title: &str) -> Error {
    Error::Conflict(format!("a status titled '{}' already exists", title))
}

/// The title check runs before every write, so a UNIQUE violation here means
/// another connection claimed the title first.
fn unique_violation_as_conflict(err: rusqlite::Error, title: &str) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            title_taken(title)
        }
        other => other.into(),
    }
}

fn find_status(conn: &Connection, id: i64) -> Result<Option<Status>> {
    let status = conn
        .query_row(
            "SELECT id, title, comment FROM statuses WHERE id = ?",
            [id],
            status_from_row,
        )
        .optional()?;
    Ok(status)
}

fn find_status_by_title(conn: &Connection, title: &str) -> Result<Option<Status>> {
    let status = conn
        .query_row(
            "SELECT id, title, comment FROM statuses WHERE title = ?",
            [title],
            status_from_row,
        )
        .optional()?;
    Ok(status)
}
