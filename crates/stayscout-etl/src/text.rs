//! Embedding-text synthesis.
//!
//! Renders one cleaned listing into the fixed-schema string that is
//! fed to the embedding service. The rendering is a pure function of
//! the record: the same listing always produces byte-identical text,
//! across calls and across process restarts, so re-embedding an
//! unchanged row yields the same input.

use stayscout_core::Listing;

/// Render a listing into its embedding input.
///
/// The field order, labels, and `" | "` separator are fixed. Labels
/// are always emitted; the cleaning step guarantees every attribute
/// has a defined (possibly placeholder) value, so no field renders as
/// an undefined token.
#[must_use]
pub fn embedding_text(listing: &Listing) -> String {
    let parts = [
        format!("Listing name: {}", listing.name),
        format!("District: {}", listing.district),
        format!("City: {}", listing.city),
        format!("Property type: {}", listing.property_type),
        format!("Room type: {}", listing.room_type),
        format!("Price: {}", format_number(listing.price)),
        format!("Accommodates: {} guests", listing.accommodates),
        format!("Bedrooms: {}", listing.bedrooms),
        format!("Minimum Nights to stay: {}", listing.minimum_nights),
        format!("Maximum Nights to stay: {}", listing.maximum_nights),
        format!("Reviews: {}", listing.text_reviews),
    ];
    parts.join(" | ")
}

/// Render a float without a trailing `.0` for whole values.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
