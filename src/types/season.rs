//! Crop-season records and the region / crop selection applied to them before any
//! environment data is fetched.

use crate::types::de;
use serde::{Deserialize, Serialize};

/// One crop-growing period at one farm, as listed by the data-mart for a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRecord {
    /// Region (address) name of the farm.
    #[serde(rename = "addressName")]
    pub region: String,
    /// Crop variety grown during the season.
    #[serde(rename = "itemName")]
    pub crop: String,
    /// Upstream crop-season serial number.
    #[serde(rename = "croppingSerlNo", deserialize_with = "de::integer")]
    pub season_id: i64,
}

/// Region names in first-seen order, without duplicates.
pub fn distinct_regions(records: &[SeasonRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.region.as_str()))
}

/// Crop names in first-seen order, without duplicates.
pub fn distinct_crops(records: &[SeasonRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.crop.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Region and crop filters applied to a season list.
///
/// An empty region list selects the region of the first record, and an empty crop
/// list selects the crop of the first record left after region filtering. This
/// mirrors what an analyst gets when they do not touch the filters.
///
/// # Examples
///
/// ```
/// use farm_env_viz::{SeasonRecord, SeasonSelection};
///
/// let records = vec![
///     SeasonRecord { region: "Jeonnam".into(), crop: "Tomato".into(), season_id: 1 },
///     SeasonRecord { region: "Jeonnam".into(), crop: "Paprika".into(), season_id: 2 },
///     SeasonRecord { region: "Gyeongnam".into(), crop: "Tomato".into(), season_id: 3 },
/// ];
///
/// let selected = SeasonSelection::new()
///     .crops(vec!["Tomato".to_string()])
///     .apply(&records)
///     .unwrap();
/// assert_eq!(SeasonSelection::season_ids(&selected), vec![1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSelection {
    regions: Vec<String>,
    crops: Vec<String>,
}

impl SeasonSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    pub fn crops(mut self, crops: Vec<String>) -> Self {
        self.crops = crops;
        self
    }

    /// Filters `records`, returning `None` when nothing matches.
    pub fn apply(&self, records: &[SeasonRecord]) -> Option<Vec<SeasonRecord>> {
        let first = records.first()?;
        let regions = if self.regions.is_empty() {
            vec![first.region.clone()]
        } else {
            self.regions.clone()
        };
        let in_region: Vec<&SeasonRecord> = records
            .iter()
            .filter(|r| regions.contains(&r.region))
            .collect();

        let crops = if self.crops.is_empty() {
            vec![in_region.first()?.crop.clone()]
        } else {
            self.crops.clone()
        };
        let selected: Vec<SeasonRecord> = in_region
            .into_iter()
            .filter(|r| crops.contains(&r.crop))
            .cloned()
            .collect();

        if selected.is_empty() {
            None
        } else {
            Some(selected)
        }
    }

    /// Season ids of the given records, in order, without duplicates.
    pub fn season_ids(records: &[SeasonRecord]) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::with_capacity(records.len());
        for record in records {
            if !ids.contains(&record.season_id) {
                ids.push(record.season_id);
            }
        }
        ids
    }

    pub(crate) fn describe(&self) -> String {
        let show = |values: &[String]| {
            if values.is_empty() {
                "<default>".to_string()
            } else {
                values.join(", ")
            }
        };
        format!("regions [{}], crops [{}]", show(&self.regions), show(&self.crops))
    }
}
