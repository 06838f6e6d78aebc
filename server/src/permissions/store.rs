//! Department permission flags stored one row per department.
//!
//! Stored flag objects are versioned. Every read passes them through
//! [`merge_defaults`]; a row written under an older schema, or missing a
//! flag, is rewritten in place with the merged flags.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{documents, now_timestamp};
use crate::error::ApiError;
use crate::resources::Collection;

/// Schema version written with every stored flag object.
/// 1: myRequirements, manageLocation, myCalendar
/// 2: adds allEvents, taggedDepartments
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Flags a client must always send on `set`.
pub const REQUIRED_FLAGS: &[&str] = &["myRequirements", "manageLocation", "myCalendar"];

/// Flags a client may omit on `set`; they default to false.
pub const OPTIONAL_FLAGS: &[&str] = &["allEvents", "taggedDepartments"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionFlags {
    pub my_requirements: bool,
    pub manage_location: bool,
    pub my_calendar: bool,
    pub all_events: bool,
    pub tagged_departments: bool,
}

impl PermissionFlags {
    pub fn all_granted() -> Self {
        Self {
            my_requirements: true,
            manage_location: true,
            my_calendar: true,
            all_events: true,
            tagged_departments: true,
        }
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        match name {
            "myRequirements" => self.my_requirements = value,
            "manageLocation" => self.manage_location = value,
            "myCalendar" => self.my_calendar = value,
            "allEvents" => self.all_events = value,
            "taggedDepartments" => self.tagged_departments = value,
            _ => {}
        }
    }
}

/// Public identity of the user who last changed a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdaterInfo {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// `updatedBy` is a bare user id on single reads and a resolved user on `get_all`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpdatedBy {
    Id(String),
    User(UpdaterInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPermissions {
    pub department: String,
    pub permissions: PermissionFlags,
    pub updated_by: Option<UpdatedBy>,
    pub updated_at: Option<String>,
}

impl DepartmentPermissions {
    fn defaults_for(department: &str) -> Self {
        Self {
            department: department.to_string(),
            permissions: PermissionFlags::default(),
            updated_by: None,
            updated_at: None,
        }
    }
}

/// Merge a stored flag object with defaults.
///
/// Returns the merged flags and whether the stored row must be rewritten:
/// any flag absent or non-boolean, or a schema version below current.
pub fn merge_defaults(stored: &Value, schema_version: i64) -> (PermissionFlags, bool) {
    let mut flags = PermissionFlags::default();
    let mut needs_backfill = schema_version < CURRENT_SCHEMA_VERSION;

    for name in REQUIRED_FLAGS.iter().chain(OPTIONAL_FLAGS) {
        match stored.get(*name).and_then(Value::as_bool) {
            Some(value) => flags.set_flag(name, value),
            None => needs_backfill = true,
        }
    }

    (flags, needs_backfill)
}

/// Validate a client flag object.
pub fn validate(payload: &Value) -> Result<PermissionFlags, ApiError> {
    let Some(object) = payload.as_object() else {
        return Err(ApiError::validation("Permissions must be an object"));
    };

    let mut flags = PermissionFlags::default();

    for name in REQUIRED_FLAGS {
        match object.get(*name) {
            Some(Value::Bool(value)) => flags.set_flag(name, *value),
            Some(_) => {
                return Err(ApiError::validation(format!("{} must be a boolean", name)))
            }
            None => return Err(ApiError::validation(format!("{} is required", name))),
        }
    }

    for name in OPTIONAL_FLAGS {
        match object.get(*name) {
            Some(Value::Bool(value)) => flags.set_flag(name, *value),
            None => {}
            Some(_) => {
                return Err(ApiError::validation(format!("{} must be a boolean", name)))
            }
        }
    }

    Ok(flags)
}

struct StoredRow {
    department: String,
    permissions: String,
    schema_version: i64,
    updated_by: Option<String>,
    updated_at: String,
}

fn load_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        department: row.get(0)?,
        permissions: row.get(1)?,
        schema_version: row.get(2)?,
        updated_by: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Decode a stored row, backfilling it when the merge reports missing flags.
fn materialize(conn: &Connection, row: StoredRow) -> Result<DepartmentPermissions, ApiError> {
    // A corrupt flag object is treated like an empty one and gets rewritten.
    let stored: Value = serde_json::from_str(&row.permissions).unwrap_or(Value::Null);
    let (flags, needs_backfill) = merge_defaults(&stored, row.schema_version);

    if needs_backfill {
        conn.execute(
            "UPDATE department_permissions SET permissions = ?1, schema_version = ?2 WHERE department = ?3",
            params![
                serde_json::to_string(&flags)?,
                CURRENT_SCHEMA_VERSION,
                row.department
            ],
        )?;
        tracing::debug!(
            department = %row.department,
            from_version = row.schema_version,
            "Backfilled department permissions"
        );
    }

    Ok(DepartmentPermissions {
        department: row.department,
        permissions: flags,
        updated_by: row.updated_by.map(UpdatedBy::Id),
        updated_at: Some(row.updated_at),
    })
}

/// Stored permissions for `department`, or all-false defaults.
/// Never creates a record for an unknown department.
pub fn get(conn: &Connection, department: &str) -> Result<DepartmentPermissions, ApiError> {
    let row = conn
        .query_row(
            "SELECT department, permissions, schema_version, updated_by, updated_at
             FROM department_permissions WHERE department = ?1",
            [department],
            load_row,
        )
        .optional()?;

    match row {
        Some(row) => materialize(conn, row),
        None => Ok(DepartmentPermissions::defaults_for(department)),
    }
}

/// Every stored department, sorted by name, with updaters resolved.
pub fn get_all(conn: &Connection) -> Result<Vec<DepartmentPermissions>, ApiError> {
    let rows = {
        let mut stmt = conn.prepare(
            "SELECT department, permissions, schema_version, updated_by, updated_at
             FROM department_permissions ORDER BY department ASC",
        )?;
        let rows = stmt
            .query_map([], load_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut record = materialize(conn, row)?;
        record.updated_by = match record.updated_by.take() {
            Some(UpdatedBy::Id(user_id)) => resolve_updater(conn, &user_id)?.map(UpdatedBy::User),
            other => other,
        };
        out.push(record);
    }

    Ok(out)
}

fn resolve_updater(conn: &Connection, user_id: &str) -> Result<Option<UpdaterInfo>, ApiError> {
    let user = documents::find_by_id(conn, Collection::Users.name(), user_id)?;
    Ok(user.map(|doc| UpdaterInfo {
        id: doc.id.clone(),
        name: doc.str_field("name").map(str::to_string),
        email: doc.str_field("email").map(str::to_string),
    }))
}

fn upsert(
    conn: &Connection,
    department: &str,
    flags: PermissionFlags,
    updated_by: &str,
) -> Result<DepartmentPermissions, ApiError> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO department_permissions (department, permissions, schema_version, updated_by, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(department) DO UPDATE SET
            permissions = excluded.permissions,
            schema_version = excluded.schema_version,
            updated_by = excluded.updated_by,
            updated_at = excluded.updated_at",
        params![
            department,
            serde_json::to_string(&flags)?,
            CURRENT_SCHEMA_VERSION,
            updated_by,
            now
        ],
    )?;

    Ok(DepartmentPermissions {
        department: department.to_string(),
        permissions: flags,
        updated_by: Some(UpdatedBy::Id(updated_by.to_string())),
        updated_at: Some(now),
    })
}

/// Validate and store `payload` as the flags for `department`.
pub fn set(
    conn: &Connection,
    department: &str,
    payload: &Value,
    updated_by: &str,
) -> Result<DepartmentPermissions, ApiError> {
    check_department(department)?;
    let flags = validate(payload)?;
    upsert(conn, department, flags, updated_by)
}

/// Grant every flag to `department`.
pub fn reset(
    conn: &Connection,
    department: &str,
    updated_by: &str,
) -> Result<DepartmentPermissions, ApiError> {
    check_department(department)?;
    upsert(conn, department, PermissionFlags::all_granted(), updated_by)
}

fn check_department(department: &str) -> Result<(), ApiError> {
    if department.trim().is_empty() {
        return Err(ApiError::validation("Department name cannot be empty"));
    }
    Ok(())
}
