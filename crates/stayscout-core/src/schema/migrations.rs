/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cleaned listings (the relational source of truth for indexing).
-- listing_id comes from the source dataset and is the pagination key;
-- the INTEGER PRIMARY KEY gives us ordered, indexed range scans.
CREATE TABLE IF NOT EXISTS listings_clean (
    listing_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    host_since TEXT NOT NULL,
    host_location TEXT NOT NULL,
    host_response_time TEXT NOT NULL,
    host_response_rate REAL NOT NULL,
    host_acceptance_rate REAL NOT NULL,
    host_is_superhost INTEGER NOT NULL,
    host_total_listings_count INTEGER NOT NULL,
    host_has_profile_pic INTEGER NOT NULL,
    host_identity_verified INTEGER NOT NULL,
    district TEXT NOT NULL,
    city TEXT NOT NULL,
    property_type TEXT NOT NULL,
    room_type TEXT NOT NULL,
    accommodates INTEGER NOT NULL,
    bedrooms INTEGER NOT NULL,
    price REAL NOT NULL,
    minimum_nights INTEGER NOT NULL,
    maximum_nights INTEGER NOT NULL,
    text_reviews TEXT NOT NULL,
    loaded_at TEXT NOT NULL
);
";

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
