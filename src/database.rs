//! Database initialization and table definitions
//!
//! All records are stored in an embedded redb database as JSON-serialized
//! strings. Each entity has a main table keyed by id plus, where lookups need
//! it, a small index table mapping a unique secondary key (endpoint slug,
//! API-key secret, email, session token) back to the record. Index tables are
//! written in the same transaction as the records they point at, which is
//! also what enforces the global uniqueness of form endpoints and key
//! secrets under concurrent writes.

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::AppError;

/// User accounts, keyed by user id.
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Unique email index: email -> user id.
pub const TABLE_USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails_v1");

/// Bearer session tokens: token -> user id.
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

/// Projects, keyed by project id.
pub const TABLE_PROJECTS: TableDefinition<&str, &str> = TableDefinition::new("projects_v1");

/// Form definitions, keyed by form id.
pub const TABLE_FORMS: TableDefinition<&str, &str> = TableDefinition::new("forms_v1");

/// Unique endpoint slug index: endpoint -> form id.
///
/// Checked inside the write transaction that saves a form, so two concurrent
/// saves deriving the same slug cannot both succeed.
pub const TABLE_FORM_ENDPOINTS: TableDefinition<&str, &str> =
    TableDefinition::new("form_endpoints_v1");

/// API keys, keyed by key id.
pub const TABLE_API_KEYS: TableDefinition<&str, &str> = TableDefinition::new("api_keys_v1");

/// Unique secret index: secret -> key id. Used by the public submit gate.
pub const TABLE_KEY_SECRETS: TableDefinition<&str, &str> = TableDefinition::new("key_secrets_v1");

/// Submissions under composite key "{form_id}:{timestamp_micros}:{id}".
///
/// The timestamp suffix keeps a form's submissions contiguous and in
/// chronological order, so per-form listing is a single range query.
pub const TABLE_SUBMISSIONS: TableDefinition<&str, &str> = TableDefinition::new("submissions_v1");

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,
}

/// Creates or opens the database file and ensures all tables exist.
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_USER_EMAILS)?;
        write_txn.open_table(TABLE_SESSIONS)?;
        write_txn.open_table(TABLE_PROJECTS)?;
        write_txn.open_table(TABLE_FORMS)?;
        write_txn.open_table(TABLE_FORM_ENDPOINTS)?;
        write_txn.open_table(TABLE_API_KEYS)?;
        write_txn.open_table(TABLE_KEY_SECRETS)?;
        write_txn.open_table(TABLE_SUBMISSIONS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Reads and deserializes a JSON record from any readable table.
pub fn read_json<T, R>(table: &R, key: &str) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Collects every record in a table that matches a predicate.
pub fn scan_json<T, R, F>(table: &R, mut keep: F) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
    F: FnMut(&T) -> bool,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        let record: T = serde_json::from_str(value.value())?;
        if keep(&record) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Range bounds covering every composite "{prefix}:{suffix}" key.
///
/// '{' sorts after ':' and after every digit, so "{prefix}:{{" is an
/// exclusive upper bound for the whole prefix.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (format!("{prefix}:"), format!("{prefix}:{{"))
}
