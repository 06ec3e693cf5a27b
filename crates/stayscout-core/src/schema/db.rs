use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;
use crate::model::Listing;

use super::migrations::MIGRATIONS;

/// A database connection with queries for cleaned listings.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

const LISTING_COLUMNS: &str = "listing_id, name, host_since, host_location, host_response_time,
        host_response_rate, host_acceptance_rate, host_is_superhost,
        host_total_listings_count, host_has_profile_pic, host_identity_verified,
        district, city, property_type, room_type, accommodates, bedrooms,
        price, minimum_nights, maximum_nights, text_reviews";

// Listing queries
impl Database {
    /// Insert a single cleaned listing.
    pub fn insert_listing(&self, listing: &Listing) -> Result<()> {
        Self::insert_listing_on(&self.conn, listing)
    }

    fn insert_listing_on(conn: &Connection, listing: &Listing) -> Result<()> {
        conn.execute(
            "INSERT INTO listings_clean (
                listing_id, name, host_since, host_location, host_response_time,
                host_response_rate, host_acceptance_rate, host_is_superhost,
                host_total_listings_count, host_has_profile_pic, host_identity_verified,
                district, city, property_type, room_type, accommodates, bedrooms,
                price, minimum_nights, maximum_nights, text_reviews, loaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            rusqlite::params![
                listing.listing_id,
                listing.name,
                listing.host_since,
                listing.host_location,
                listing.host_response_time,
                listing.host_response_rate,
                listing.host_acceptance_rate,
                listing.host_is_superhost,
                listing.host_total_listings_count,
                listing.host_has_profile_pic,
                listing.host_identity_verified,
                listing.district,
                listing.city,
                listing.property_type,
                listing.room_type,
                listing.accommodates,
                listing.bedrooms,
                listing.price,
                listing.minimum_nights,
                listing.maximum_nights,
                listing.text_reviews,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace the entire cleaned table with the given listings.
    ///
    /// The cleaning step is a one-shot full reload, so prior contents
    /// are dropped inside the same transaction.
    pub fn replace_listings(&mut self, listings: &[Listing]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM listings_clean", [])?;
        for listing in listings {
            Self::insert_listing_on(&tx, listing)?;
        }
        tx.commit()?;
        Ok(listings.len())
    }

    /// Fetch the next page of listings beyond the watermark.
    ///
    /// Returns up to `limit` rows with `listing_id` strictly greater
    /// than `after` (or the first `limit` rows when `after` is `None`),
    /// in ascending id order. An empty result means the backlog is
    /// drained; it is not an error.
    pub fn fetch_page(&self, after: Option<i64>, limit: u32) -> Result<Vec<Listing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS}
             FROM listings_clean
             WHERE listing_id > ?1
             ORDER BY listing_id
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![after.unwrap_or(i64::MIN), i64::from(limit)],
                Self::row_to_listing,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Total number of cleaned listings.
    pub fn count_listings(&self) -> Result<i64> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM listings_clean", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of listings not yet covered by the watermark.
    pub fn count_after(&self, after: Option<i64>) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM listings_clean WHERE listing_id > ?1",
            rusqlite::params![after.unwrap_or(i64::MIN)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<Listing> {
        Ok(Listing {
            listing_id: row.get(0)?,
            name: row.get(1)?,
            host_since: row.get(2)?,
            host_location: row.get(3)?,
            host_response_time: row.get(4)?,
            host_response_rate: row.get(5)?,
            host_acceptance_rate: row.get(6)?,
            host_is_superhost: row.get(7)?,
            host_total_listings_count: row.get(8)?,
            host_has_profile_pic: row.get(9)?,
            host_identity_verified: row.get(10)?,
            district: row.get(11)?,
            city: row.get(12)?,
            property_type: row.get(13)?,
            room_type: row.get(14)?,
            accommodates: row.get(15)?,
            bedrooms: row.get(16)?,
            price: row.get(17)?,
            minimum_nights: row.get(18)?,
            maximum_nights: row.get(19)?,
            text_reviews: row.get(20)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::listing;

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_listing_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let original = listing(7);
        db.insert_listing(&original).unwrap();

        let rows = db.fetch_page(None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], original);
    }

    #[test]
    fn test_fetch_page_orders_and_bounds() {
        let db = Database::open_in_memory().unwrap();
        // Insert out of order; ids are sparse on purpose.
        for id in [9, 5, 7] {
            db.insert_listing(&listing(id)).unwrap();
        }

        let first = db.fetch_page(None, 2).unwrap();
        let ids: Vec<i64> = first.iter().map(|l| l.listing_id).collect();
        assert_eq!(ids, vec![5, 7]);

        let next = db.fetch_page(Some(7), 2).unwrap();
        let ids: Vec<i64> = next.iter().map(|l| l.listing_id).collect();
        assert_eq!(ids, vec![9]);
    }

    #[test]
    fn test_fetch_page_empty_beyond_watermark() {
        let db = Database::open_in_memory().unwrap();
        for id in [5, 7, 9] {
            db.insert_listing(&listing(id)).unwrap();
        }
        let page = db.fetch_page(Some(9), 100).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_replace_listings_drops_prior_contents() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_listing(&listing(1)).unwrap();

        let loaded = db.replace_listings(&[listing(10), listing(11)]).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(db.count_listings().unwrap(), 2);
        assert!(db.fetch_page(None, 10).unwrap()[0].listing_id == 10);
    }

    #[test]
    fn test_count_after() {
        let db = Database::open_in_memory().unwrap();
        for id in [5, 7, 9] {
            db.insert_listing(&listing(id)).unwrap();
        }
        assert_eq!(db.count_after(None).unwrap(), 3);
        assert_eq!(db.count_after(Some(5)).unwrap(), 2);
        assert_eq!(db.count_after(Some(9)).unwrap(), 0);
    }
}
