//! Turns the season tables of several crop seasons into one time-indexed table with
//! a column per sensor attribute.
//!
//! The steps are kept separate so each can be reused and tested on its own:
//! [`concat_seasons`] stacks the raw tables, [`reshape`] parses timestamps and values,
//! [`pivot_by_attribute`] spreads attribute codes into described columns.

use crate::env_data::error::EnvDataError;
use crate::env_data::season_fetcher::readings_to_frame;
use crate::env_data::{FATR_CODE, FLD_CODE, MEAS_DATE, SECT_CODE, SEN_VAL};
use crate::types::attribute::{describe_code, Attribute};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M%S",
    "%Y/%m/%d %H:%M:%S",
];

// Resolved attribute description, only used while pivoting.
const ATTRIBUTE: &str = "attribute";

/// Concatenates, reshapes and pivots season tables in one go.
pub fn aggregate(frames: &[DataFrame]) -> Result<DataFrame, EnvDataError> {
    let raw = concat_seasons(frames)?;
    let long = reshape(&raw)?;
    pivot_by_attribute(long)
}

/// Stacks season tables vertically. No tables gives an empty season table.
pub fn concat_seasons(frames: &[DataFrame]) -> Result<DataFrame, EnvDataError> {
    let Some((first, rest)) = frames.split_first() else {
        return readings_to_frame(&[]);
    };
    let mut combined = first.select([MEAS_DATE, FLD_CODE, SECT_CODE, FATR_CODE, SEN_VAL])?;
    for frame in rest {
        combined.vstack_mut(&frame.select([MEAS_DATE, FLD_CODE, SECT_CODE, FATR_CODE, SEN_VAL])?)?;
    }
    Ok(combined)
}

/// Parses a timestamp as reported by the data-mart.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Projects a raw table to the five reading columns, parsing `meas_date` into a
/// datetime and `sen_val` into `f64`. Missing values stay null; anything that does
/// not parse is an error.
pub fn reshape(raw: &DataFrame) -> Result<DataFrame, EnvDataError> {
    let dates = str_column(raw, MEAS_DATE)?;
    let fields = str_column(raw, FLD_CODE)?;
    let sections = str_column(raw, SECT_CODE)?;
    let codes = str_column(raw, FATR_CODE)?;
    let values = str_column(raw, SEN_VAL)?;

    let mut timestamps: Vec<NaiveDateTime> = Vec::with_capacity(raw.height());
    let mut numbers: Vec<Option<f64>> = Vec::with_capacity(raw.height());

    for ((date, code), value) in dates.into_iter().zip(codes).zip(values) {
        let date = date.unwrap_or_default();
        let code = code.unwrap_or_default();
        let timestamp =
            parse_timestamp(date).ok_or_else(|| EnvDataError::InvalidTimestamp {
                value: date.to_string(),
                attribute: code.to_string(),
            })?;
        let number = match value.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse::<f64>().map_err(|_| {
                EnvDataError::InvalidSensorValue {
                    value: text.to_string(),
                    attribute: code.to_string(),
                    measured_at: date.to_string(),
                }
            })?),
        };
        timestamps.push(timestamp);
        numbers.push(number);
    }

    let meas_date =
        DatetimeChunked::from_naive_datetime(MEAS_DATE.into(), timestamps, TimeUnit::Milliseconds)
            .into_series();

    let frame = DataFrame::new(vec![
        Column::from(meas_date),
        Column::from(fields.clone().into_series()),
        Column::from(sections.clone().into_series()),
        Column::from(codes.clone().into_series()),
        Column::new(SEN_VAL.into(), numbers),
    ])?;
    Ok(frame)
}

/// Pivots a reshaped table: one row per timestamp with at least one value
/// (ascending), one column per attribute, duplicate `(timestamp, attribute)` readings
/// averaged. Codes are resolved to descriptions before grouping, so spellings of
/// one code (`CI`, `ci`) share a column; unknown codes keep their raw name.
/// Timestamps and attributes without any value are dropped.
pub fn pivot_by_attribute(mut long: DataFrame) -> Result<DataFrame, EnvDataError> {
    // description -> smallest canonical code, which fixes the column order
    let mut columns: BTreeMap<String, String> = BTreeMap::new();
    let mut descriptions: Vec<Option<String>> = Vec::with_capacity(long.height());
    for code in str_column(&long, FATR_CODE)? {
        let Some(code) = code else {
            descriptions.push(None);
            continue;
        };
        let (description, order_key) = match Attribute::from_code(code) {
            Some(attribute) => (attribute.description().to_string(), attribute.code().to_string()),
            None => {
                if !columns.contains_key(code) {
                    debug!("No description for attribute code '{}', keeping it as column name", code);
                }
                (describe_code(code), code.to_string())
            }
        };
        columns
            .entry(description.clone())
            .and_modify(|key| {
                if order_key < *key {
                    *key = order_key.clone();
                }
            })
            .or_insert(order_key);
        descriptions.push(Some(description));
    }
    long.with_column(Column::new(ATTRIBUTE.into(), descriptions))?;

    let means = long
        .lazy()
        .group_by([col(MEAS_DATE), col(ATTRIBUTE)])
        .agg([col(SEN_VAL).mean()])
        .filter(col(SEN_VAL).is_not_null())
        .collect()?;

    let present: BTreeSet<&str> = str_column(&means, ATTRIBUTE)?.into_iter().flatten().collect();
    let mut ordered: Vec<(&String, &String)> = columns
        .iter()
        .filter(|(description, _)| present.contains(description.as_str()))
        .map(|(description, key)| (key, description))
        .collect();
    ordered.sort();

    let index = means.column(MEAS_DATE)?.unique()?;
    let mut wide = DataFrame::new(vec![index])?.lazy();

    for (_, description) in ordered {
        let column = means
            .clone()
            .lazy()
            .filter(col(ATTRIBUTE).eq(lit(description.as_str())))
            .select([col(MEAS_DATE), col(SEN_VAL).alias(description.as_str())]);
        wide = wide.left_join(column, col(MEAS_DATE), col(MEAS_DATE));
    }

    let frame = wide
        .sort([MEAS_DATE], SortMultipleOptions::default())
        .collect()?;
    Ok(frame)
}

fn str_column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a StringChunked, EnvDataError> {
    let column = frame
        .column(name)
        .map_err(|e| EnvDataError::ColumnNotFound(name.to_string(), e))?;
    Ok(column.str()?)
}
