use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceSort {
    Asc,
    Desc,
}

/// Traveler-facing flight search. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightSearchQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Departure on or after this day
    pub date: Option<NaiveDate>,
    pub sort: Option<PriceSort>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_deserialization() {
        let json = r#"
            {
                "origin": "Jakarta",
                "date": "2024-12-25",
                "sort": "desc"
            }
        "#;
        let query: FlightSearchQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(query.origin.as_deref(), Some("Jakarta"));
        assert_eq!(query.destination, None);
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(query.sort, Some(PriceSort::Desc));
    }
}
