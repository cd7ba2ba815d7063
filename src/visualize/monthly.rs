//! Builds the monthly figure: one panel per calendar month, showing every reading of
//! the target column against its hour of day plus a per-hour box summary, on a
//! y range shared by all panels.

use crate::env_data::MEAS_DATE;
use crate::types::month::Month;
use crate::visualize::box_stats::BoxStats;
use crate::visualize::error::VisualizeError;
use chrono::{DateTime, NaiveDateTime, Timelike};
use log::warn;
use polars::prelude::*;
use std::collections::BTreeMap;

pub const HOURS_PER_DAY: u32 = 24;
/// Panels a single rendered page can hold.
pub const MAX_PANELS_PER_PAGE: usize = 8;

/// What happens to months that do not fit on the first page of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Continue on further pages of the same grid.
    #[default]
    Paginate,
    /// Drop them.
    Truncate,
}

/// Panel grid of one figure page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    rows: usize,
    columns: usize,
    overflow: Overflow,
}

impl Default for GridLayout {
    /// Three rows of two panels, paginated.
    fn default() -> Self {
        Self {
            rows: 3,
            columns: 2,
            overflow: Overflow::Paginate,
        }
    }
}

impl GridLayout {
    pub fn new(rows: usize, columns: usize, overflow: Overflow) -> Result<Self, VisualizeError> {
        let panels = rows * columns;
        if panels == 0 || panels > MAX_PANELS_PER_PAGE {
            return Err(VisualizeError::InvalidGrid {
                rows,
                columns,
                max: MAX_PANELS_PER_PAGE,
            });
        }
        Ok(Self {
            rows,
            columns,
            overflow,
        })
    }

    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    pub fn panels_per_page(&self) -> usize {
        self.rows * self.columns
    }
}

/// Box summary of the readings taken during one hour of day.
#[derive(Debug, Clone, PartialEq)]
pub struct HourBox {
    pub hour: u32,
    pub stats: BoxStats,
}

/// One month of readings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthPanel {
    pub month: Month,
    /// `(hour of day, value)` for every non-null reading of the month.
    pub points: Vec<(u32, f64)>,
    /// Hours without readings have no box.
    pub boxes: Vec<HourBox>,
}

impl MonthPanel {
    fn new(month: Month, points: Vec<(u32, f64)>) -> Self {
        let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (hour, value) in &points {
            by_hour.entry(*hour).or_default().push(*value);
        }
        let boxes = by_hour
            .into_iter()
            .filter_map(|(hour, values)| {
                BoxStats::from_values(&values).map(|stats| HourBox { hour, stats })
            })
            .collect();
        Self {
            month,
            points,
            boxes,
        }
    }

    /// `YYYY-MM`.
    pub fn label(&self) -> String {
        self.month.to_string()
    }

    pub fn box_for_hour(&self, hour: u32) -> Option<&BoxStats> {
        self.boxes.iter().find(|b| b.hour == hour).map(|b| &b.stats)
    }
}

/// Panels laid out on one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FigurePage {
    pub panels: Vec<MonthPanel>,
}

/// Monthly distribution figure for one table column.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyFigure {
    pub title: String,
    pub column: String,
    /// Minimum and maximum of the column over the whole table; every panel uses it.
    pub y_range: (f64, f64),
    pub layout: GridLayout,
    pub pages: Vec<FigurePage>,
    /// Months left out by [`Overflow::Truncate`].
    pub dropped_months: Vec<Month>,
}

impl MonthlyFigure {
    pub fn panels(&self) -> impl Iterator<Item = &MonthPanel> {
        self.pages.iter().flat_map(|page| page.panels.iter())
    }

    pub fn panel_count(&self) -> usize {
        self.pages.iter().map(|page| page.panels.len()).sum()
    }
}

/// Builds the monthly figure for `column` of a reshaped table.
///
/// Months run contiguously from the first to the last timestamp of the table, so a
/// month without readings still gets its (empty) panel.
pub fn render_monthly(
    table: &DataFrame,
    column: &str,
    layout: GridLayout,
) -> Result<MonthlyFigure, VisualizeError> {
    let observations = observations(table, column)?;
    let y_range = global_range(observations.iter().filter_map(|(_, v)| *v))
        .ok_or_else(|| VisualizeError::NoValues(column.to_string()))?;

    let mut by_month: BTreeMap<Month, Vec<(u32, f64)>> = BTreeMap::new();
    for (timestamp, _) in &observations {
        by_month.entry(Month::of(timestamp)).or_default();
    }
    // Non-empty: a value exists, so a timestamp does.
    let first = by_month.keys().next().copied();
    let last = by_month.keys().next_back().copied();
    if let (Some(first), Some(last)) = (first, last) {
        for month in Month::range_inclusive(first, last) {
            by_month.entry(month).or_default();
        }
    }
    for (timestamp, value) in &observations {
        if let Some(value) = value {
            if let Some(points) = by_month.get_mut(&Month::of(timestamp)) {
                points.push((timestamp.hour(), *value));
            }
        }
    }

    let mut panels: Vec<MonthPanel> = by_month
        .into_iter()
        .map(|(month, points)| MonthPanel::new(month, points))
        .collect();

    let per_page = layout.panels_per_page();
    let mut dropped_months = Vec::new();
    if layout.overflow() == Overflow::Truncate && panels.len() > per_page {
        dropped_months = panels.split_off(per_page).into_iter().map(|p| p.month).collect();
        warn!(
            "Only {} of {} months fit the {}x{} grid; dropped {:?}",
            per_page,
            per_page + dropped_months.len(),
            layout.rows(),
            layout.columns(),
            dropped_months.iter().map(Month::to_string).collect::<Vec<_>>()
        );
    }

    let pages = panels
        .chunks(per_page)
        .map(|chunk| FigurePage {
            panels: chunk.to_vec(),
        })
        .collect();

    Ok(MonthlyFigure {
        title: format!("Monthly {} Data Plots", column),
        column: column.to_string(),
        y_range,
        layout,
        pages,
        dropped_months,
    })
}

/// Minimum and maximum of the finite values, if any.
pub fn global_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// `(timestamp, value)` rows of `column`; rows without a timestamp are skipped.
fn observations(
    table: &DataFrame,
    column: &str,
) -> Result<Vec<(NaiveDateTime, Option<f64>)>, VisualizeError> {
    let timestamps = table
        .column(MEAS_DATE)
        .map_err(|e| VisualizeError::ColumnNotFound(MEAS_DATE.to_string(), e))?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    let values = table
        .column(column)
        .map_err(|e| VisualizeError::ColumnNotFound(column.to_string(), e))?
        .cast(&DataType::Float64)?;

    let rows = timestamps
        .i64()?
        .into_iter()
        .zip(values.f64()?)
        .filter_map(|(millis, value)| {
            let timestamp = DateTime::from_timestamp_millis(millis?)?.naive_utc();
            Some((timestamp, value))
        })
        .collect();
    Ok(rows)
}
