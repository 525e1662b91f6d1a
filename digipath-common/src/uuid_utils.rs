//! UUID utilities
//!
//! Identifiers are stored as hyphenated TEXT columns. A stored id that fails
//! to parse indicates a corrupted row.

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse an id read back from a TEXT column
pub fn from_column(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Stored id '{}' is not a UUID: {}", s, e)))
}
