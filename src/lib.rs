//! Class template engine and storage for proji.
//!
//! A [`Class`](models::Class) is a reusable project skeleton: folders, files
//! and lifecycle scripts. Classes are imported from a directory tree or a
//! config document ([`template`]), exported back to config documents, and
//! persisted through a [`StorageService`](storage::StorageService), whose
//! SQLite implementation lives in [`db`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod storage;
pub mod template;

pub use error::{Error, Result};
