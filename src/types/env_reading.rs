//! Raw environment readings as returned page by page by the data-mart.

use crate::api::error::FarmDataError;
use crate::types::de;
use serde::{Deserialize, Serialize};

/// One sensor measurement, before any type conversion.
///
/// Timestamps and values are kept as the text the API returned; they are parsed when
/// the readings of several seasons are reshaped together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvReading {
    #[serde(rename = "measDate", deserialize_with = "de::text")]
    pub measured_at: String,
    #[serde(rename = "fldCode", deserialize_with = "de::text")]
    pub field_code: String,
    #[serde(rename = "sectCode", deserialize_with = "de::text")]
    pub section_code: String,
    #[serde(rename = "fatrCode", deserialize_with = "de::text")]
    pub attribute_code: String,
    #[serde(rename = "senVal", default, deserialize_with = "de::optional_text")]
    pub value: Option<String>,
}

/// A row of the paginated env-data response: a reading plus the page count of the
/// whole season, repeated on every row.
#[derive(Debug, Deserialize)]
pub(crate) struct EnvRow {
    #[serde(flatten)]
    pub reading: EnvReading,
    #[serde(rename = "totalPage", default, deserialize_with = "de::optional_text")]
    pub total_page: Option<String>,
}

/// One page of readings for a season.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvPage {
    pub readings: Vec<EnvReading>,
    /// Total number of pages for the season. Zero when the season has no readings.
    pub total_pages: u32,
}

impl EnvPage {
    pub fn new(readings: Vec<EnvReading>, total_pages: u32) -> Self {
        Self {
            readings,
            total_pages,
        }
    }

    /// Builds a page from decoded rows, taking the page count from the first row.
    pub(crate) fn from_rows(season_id: i64, rows: Vec<EnvRow>) -> Result<Self, FarmDataError> {
        let Some(first) = rows.first() else {
            return Ok(EnvPage::default());
        };
        let raw = first.total_page.clone().unwrap_or_default();
        let total_pages = de::parse_integer(&raw)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| FarmDataError::InvalidPagination {
                season_id,
                value: raw.clone(),
            })?;
        Ok(EnvPage {
            readings: rows.into_iter().map(|row| row.reading).collect(),
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_decode_mixed_types() {
        let json = r#"[
            {"measDate": "2021-03-01 13:00:00", "fldCode": 1, "sectCode": "S1",
             "fatrCode": "CI", "senVal": "412.5", "totalPage": "3.0"},
            {"measDate": "2021-03-01 14:00:00", "fldCode": "1", "sectCode": 2,
             "fatrCode": "TI", "senVal": 21, "totalPage": 3},
            {"measDate": "2021-03-01 15:00:00", "fldCode": "1", "sectCode": "S1",
             "fatrCode": "TI", "senVal": null}
        ]"#;
        let rows: Vec<EnvRow> = serde_json::from_str(json).unwrap();
        let page = EnvPage::from_rows(7, rows).unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.readings.len(), 3);
        assert_eq!(page.readings[0].field_code, "1");
        assert_eq!(page.readings[1].section_code, "2");
        assert_eq!(page.readings[1].value.as_deref(), Some("21"));
        assert_eq!(page.readings[2].value, None);
    }

    #[test]
    fn test_empty_page_has_no_pages() {
        let page = EnvPage::from_rows(7, Vec::new()).unwrap();
        assert_eq!(page.total_pages, 0);
        assert!(page.readings.is_empty());
    }

    #[test]
    fn test_malformed_total_page_is_rejected() {
        let json = r#"[{"measDate": "2021-03-01 13:00:00", "fldCode": "1", "sectCode": "1",
                        "fatrCode": "CI", "senVal": "1", "totalPage": "many"}]"#;
        let rows: Vec<EnvRow> = serde_json::from_str(json).unwrap();
        let err = EnvPage::from_rows(42, rows).unwrap_err();
        assert!(matches!(
            err,
            FarmDataError::InvalidPagination { season_id: 42, .. }
        ));
    }
}
