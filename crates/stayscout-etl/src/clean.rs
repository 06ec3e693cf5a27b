//! One-shot cleaning and loading of the raw listings CSV.
//!
//! Reads the raw export, applies the documented fills and type fixes,
//! and replaces the `listings_clean` table wholesale. After this step
//! every attribute the text synthesizer consumes has a defined value.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use stayscout_core::{Database, Listing};

use crate::error::EtlResult;
use crate::text::format_number;

/// One raw CSV row, before cleaning. Unlisted columns are ignored.
#[derive(Debug, Deserialize)]
struct RawListing {
    listing_id: i64,
    name: Option<String>,
    host_since: Option<String>,
    host_location: Option<String>,
    host_response_time: Option<String>,
    host_response_rate: Option<f64>,
    host_acceptance_rate: Option<f64>,
    host_is_superhost: Option<String>,
    host_total_listings_count: Option<f64>,
    host_has_profile_pic: Option<String>,
    host_identity_verified: Option<String>,
    district: Option<String>,
    city: Option<String>,
    property_type: Option<String>,
    room_type: Option<String>,
    accommodates: Option<f64>,
    bedrooms: Option<f64>,
    price: Option<f64>,
    minimum_nights: Option<f64>,
    maximum_nights: Option<f64>,
    review_scores_rating: Option<f64>,
    review_scores_accuracy: Option<f64>,
    review_scores_cleanliness: Option<f64>,
    review_scores_checkin: Option<f64>,
    review_scores_communication: Option<f64>,
    review_scores_location: Option<f64>,
    review_scores_value: Option<f64>,
}

/// Map a `"t"`/`"f"` source flag to a boolean.
///
/// The source only documents `"t"` and `"f"`; anything else (including
/// a missing value) maps to `false` as the explicit default.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("t"))
}

/// A text field with a per-field default for missing or blank values.
fn text_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

/// Render a review score, or the placeholder for unrated listings.
fn score_or_placeholder(score: Option<f64>) -> String {
    score.map_or_else(|| "not rated yet".to_string(), format_number)
}

/// Compose the human-readable rating summary from the seven
/// review-score columns.
fn compose_text_reviews(raw: &RawListing) -> String {
    format!(
        "Overall Ratings: {}, Accuracy: {}, Cleanliness: {}, Checkin: {}, \
         Communication: {}, Location: {}, Value: {}",
        score_or_placeholder(raw.review_scores_rating),
        score_or_placeholder(raw.review_scores_accuracy),
        score_or_placeholder(raw.review_scores_cleanliness),
        score_or_placeholder(raw.review_scores_checkin),
        score_or_placeholder(raw.review_scores_communication),
        score_or_placeholder(raw.review_scores_location),
        score_or_placeholder(raw.review_scores_value),
    )
}

fn clean_record(raw: RawListing) -> Listing {
    let text_reviews = compose_text_reviews(&raw);
    Listing {
        listing_id: raw.listing_id,
        name: text_or(raw.name, Listing::NO_NAME),
        host_since: text_or(raw.host_since, Listing::UNKNOWN),
        host_location: text_or(raw.host_location, Listing::UNKNOWN),
        // The source fills the host response columns with zero.
        host_response_time: text_or(raw.host_response_time, "0"),
        host_response_rate: raw.host_response_rate.unwrap_or(0.0),
        host_acceptance_rate: raw.host_acceptance_rate.unwrap_or(0.0),
        host_is_superhost: parse_flag(raw.host_is_superhost.as_deref()),
        host_total_listings_count: raw.host_total_listings_count.unwrap_or(0.0) as i64,
        host_has_profile_pic: parse_flag(raw.host_has_profile_pic.as_deref()),
        host_identity_verified: parse_flag(raw.host_identity_verified.as_deref()),
        district: text_or(raw.district, Listing::UNKNOWN),
        city: text_or(raw.city, Listing::UNKNOWN),
        property_type: raw.property_type.unwrap_or_default(),
        room_type: raw.room_type.unwrap_or_default(),
        accommodates: raw.accommodates.unwrap_or(0.0) as i64,
        bedrooms: raw.bedrooms.unwrap_or(0.0) as i64,
        price: raw.price.unwrap_or(0.0),
        minimum_nights: raw.minimum_nights.unwrap_or(0.0) as i64,
        maximum_nights: raw.maximum_nights.unwrap_or(0.0) as i64,
        text_reviews,
    }
}

/// Clean every row readable from the given CSV source.
///
/// Records are decoded lossily so legacy single-byte encodings in free
/// text fields do not abort the load.
pub fn clean_reader<R: Read>(reader: R) -> EtlResult<Vec<Listing>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = csv::StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());

    let mut listings = Vec::new();
    for result in rdr.byte_records() {
        let record = csv::StringRecord::from_byte_record_lossy(result?);
        let raw: RawListing = record.deserialize(Some(&headers))?;
        listings.push(clean_record(raw));
    }
    Ok(listings)
}

/// Clean the raw CSV at `path`.
pub fn clean_csv(path: impl AsRef<Path>) -> EtlResult<Vec<Listing>> {
    let file = std::fs::File::open(path.as_ref()).map_err(stayscout_core::Error::Io)?;
    clean_reader(file)
}

/// Clean the raw CSV and replace the `listings_clean` table with the
/// result. Returns the number of rows loaded.
pub fn load_csv(db: &mut Database, path: impl AsRef<Path>) -> EtlResult<usize> {
    let listings = clean_csv(path)?;
    let loaded = db.replace_listings(&listings)?;
    log::info!("Loaded {loaded} cleaned listings");
    Ok(loaded)
}
