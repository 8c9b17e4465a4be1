//! SQL schema for the signal store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS samples (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lat             REAL    NOT NULL,
    lng             REAL    NOT NULL,
    carrier         TEXT    NOT NULL DEFAULT 'Unknown',
    network_type    TEXT    NOT NULL DEFAULT 'Unknown',
    signal_strength REAL,            -- dBm
    download_speed  REAL,            -- Mbps
    upload_speed    REAL,            -- Mbps
    client_id       TEXT UNIQUE,     -- idempotency key; NULLs never conflict
    created_at      INTEGER NOT NULL -- epoch seconds
);

CREATE INDEX IF NOT EXISTS samples_carrier_idx ON samples(carrier, network_type);
CREATE INDEX IF NOT EXISTS samples_network_idx ON samples(network_type);
CREATE INDEX IF NOT EXISTS samples_created_idx ON samples(created_at);

PRAGMA user_version = 1;
";
