use serde::{Deserialize, Serialize};

/// One cleaned short-term rental listing.
///
/// Every field is defined: the cleaning step fills missing source
/// values with the documented defaults, so nothing downstream ever
/// renders an undefined token. `listing_id` is assigned by the source
/// dataset, is unique, and increases monotonically; it doubles as the
/// pagination and checkpoint key for the indexing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: i64,
    pub name: String,
    pub host_since: String,
    pub host_location: String,
    pub host_response_time: String,
    pub host_response_rate: f64,
    pub host_acceptance_rate: f64,
    pub host_is_superhost: bool,
    pub host_total_listings_count: i64,
    pub host_has_profile_pic: bool,
    pub host_identity_verified: bool,
    pub district: String,
    pub city: String,
    pub property_type: String,
    pub room_type: String,
    pub accommodates: i64,
    pub bedrooms: i64,
    pub price: f64,
    pub minimum_nights: i64,
    pub maximum_nights: i64,
    /// Pre-synthesized human-readable rating summary, composed from
    /// the seven review-score columns during cleaning.
    pub text_reviews: String,
}

impl Listing {
    /// Default placeholder for a listing with no name in the source.
    pub const NO_NAME: &'static str = "no name provided";

    /// Default placeholder for unknown location fields.
    pub const UNKNOWN: &'static str = "unknown";
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Listing;

    /// A fully-populated listing for tests, with the given id.
    pub fn listing(id: i64) -> Listing {
        Listing {
            listing_id: id,
            name: format!("Test flat {id}"),
            host_since: "2019-04-01".to_string(),
            host_location: "Paris, France".to_string(),
            host_response_time: "within an hour".to_string(),
            host_response_rate: 0.97,
            host_acceptance_rate: 0.88,
            host_is_superhost: true,
            host_total_listings_count: 2,
            host_has_profile_pic: true,
            host_identity_verified: true,
            district: "Le Marais".to_string(),
            city: "Paris".to_string(),
            property_type: "Entire apartment".to_string(),
            room_type: "Entire place".to_string(),
            accommodates: 4,
            bedrooms: 2,
            price: 120.0,
            minimum_nights: 2,
            maximum_nights: 30,
            text_reviews: "Overall Ratings: 4.8, Accuracy: 4.9, Cleanliness: 4.7, \
                           Checkin: 4.9, Communication: 5, Location: 4.8, Value: 4.6"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_serializes_to_flat_map() {
        let listing = test_support::listing(42);
        let value = serde_json::to_value(&listing).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map["listing_id"], 42);
        assert_eq!(map["city"], "Paris");
        assert!(map["host_is_superhost"].is_boolean());
    }
}
