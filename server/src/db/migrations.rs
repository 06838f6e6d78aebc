use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Tracked through the SQLite user_version pragma.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Document collections and department permissions

CREATE TABLE documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX idx_documents_collection_created ON documents(collection, created_at);

CREATE TABLE department_permissions (
    department TEXT PRIMARY KEY,
    permissions TEXT NOT NULL,
    schema_version INTEGER NOT NULL DEFAULT 1,
    updated_by TEXT,
    updated_at TEXT NOT NULL
);
",
        ),
        M::up(
            "-- Migration 2: Expiry lookups for the cleanup sweep

CREATE INDEX idx_documents_expires_at
    ON documents(json_extract(body, '$.expiresAt'))
    WHERE json_extract(body, '$.expiresAt') IS NOT NULL;
",
        ),
    ])
}
