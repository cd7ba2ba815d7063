//! This module provides the main entry point of the crate. [`FarmEnv`] ties a
//! [`FarmDataSource`] to the season cache and exposes the pipeline: season listing
//! and selection, concurrent per-season fetching, aggregation into a time-indexed
//! table, and monthly figure building.

use crate::api::client::FarmDataClient;
use crate::api::config::ClientConfig;
use crate::api::source::FarmDataSource;
use crate::env_data::aggregator::aggregate;
use crate::env_data::error::EnvDataError;
use crate::env_data::season_cache::SeasonCache;
use crate::env_data::season_fetcher::SeasonFetcher;
use crate::error::FarmEnvError;
use crate::types::attribute::Attribute;
use crate::types::season::{SeasonRecord, SeasonSelection};
use crate::visualize::monthly::{render_monthly, GridLayout, MonthlyFigure};
use bon::bon;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{info, warn};
use polars::prelude::DataFrame;
use std::sync::Arc;

/// A season that could not be fetched during a lenient multi-season fetch.
#[derive(Debug)]
pub struct SeasonFailure {
    pub season_id: i64,
    pub error: EnvDataError,
}

/// Result of [`FarmEnv::fetch_env_for_seasons_lenient`]: the table built from every
/// season that could be fetched, and the seasons that could not.
#[derive(Debug)]
pub struct PartialEnvTable {
    pub table: DataFrame,
    pub failures: Vec<SeasonFailure>,
}

impl PartialEnvTable {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The main client struct for fetching and visualizing crop-season environment data.
///
/// Season tables are cached in memory (LRU, [`ClientConfig::cache_capacity`] seasons),
/// so revisiting a season costs no requests.
///
/// # Examples
///
/// ```no_run
/// use farm_env_viz::{Attribute, FarmEnv, FarmEnvError};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), FarmEnvError> {
/// let farm_env = FarmEnv::connect()?;
///
/// let figure = farm_env
///     .visualize()
///     .years(&[2020, 2021])
///     .column(Attribute::InternalCo2.description())
///     .call()
///     .await?;
///
/// for (page, html) in figure.to_html_pages().into_iter().enumerate() {
///     std::fs::write(format!("co2-{page}.html"), html).unwrap();
/// }
/// # Ok(())
/// # }
/// ```
pub struct FarmEnv<S: FarmDataSource = FarmDataClient> {
    source: Arc<S>,
    fetcher: SeasonFetcher<S>,
    max_concurrency: usize,
}

impl FarmEnv<FarmDataClient> {
    /// Creates a client talking to the data-mart over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`FarmEnvError::Upstream`] when no service key is configured or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, FarmEnvError> {
        let client = FarmDataClient::new(config)?;
        Ok(Self::new(client, config))
    }

    /// Creates a client from the default config file and environment variables.
    /// See [`ClientConfig::load`].
    pub fn connect() -> Result<Self, FarmEnvError> {
        let config = ClientConfig::load(None)?;
        Self::from_config(&config)
    }
}

#[bon]
impl<S: FarmDataSource> FarmEnv<S> {
    /// Wraps any [`FarmDataSource`], sizing the cache and fan-out from `config`.
    pub fn new(source: S, config: &ClientConfig) -> Self {
        let source = Arc::new(source);
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            fetcher: SeasonFetcher::new(
                source.clone(),
                SeasonCache::new(config.cache_capacity),
                max_concurrency,
            ),
            source,
            max_concurrency,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Season ids currently held by the cache, least recently used first.
    pub async fn cached_seasons(&self) -> Vec<i64> {
        self.fetcher.cache().cached_ids().await
    }

    /// Drops every cached season table.
    pub async fn clear_cache(&self) {
        self.fetcher.cache().clear().await;
    }

    /// Lists the crop seasons of every year in `years`, in year order.
    ///
    /// # Errors
    ///
    /// Returns [`FarmEnvError::Upstream`] if any year cannot be listed.
    pub async fn list_seasons(&self, years: &[i32]) -> Result<Vec<SeasonRecord>, FarmEnvError> {
        let per_year: Vec<Vec<SeasonRecord>> = stream::iter(years.iter().copied())
            .map(|year| self.source.list_seasons(year))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;
        let seasons: Vec<SeasonRecord> = per_year.into_iter().flatten().collect();
        info!("Listed {} crop seasons for years {:?}", seasons.len(), years);
        Ok(seasons)
    }

    /// Lists the seasons of `years` and keeps those matching the region and crop
    /// filters. Without a filter, the first listed region (or crop) is used.
    ///
    /// # Errors
    ///
    /// Returns [`FarmEnvError::EmptySelection`] when no season matches, and
    /// [`FarmEnvError::Upstream`] if listing fails.
    #[builder]
    pub async fn select_seasons(
        &self,
        years: &[i32],
        regions: Option<Vec<String>>,
        crops: Option<Vec<String>>,
    ) -> Result<Vec<SeasonRecord>, FarmEnvError> {
        let selection = SeasonSelection::new()
            .regions(regions.unwrap_or_default())
            .crops(crops.unwrap_or_default());
        let seasons = self.list_seasons(years).await?;
        selection
            .apply(&seasons)
            .ok_or_else(|| FarmEnvError::EmptySelection {
                years: years.to_vec(),
                selection: selection.describe(),
            })
    }

    /// Raw readings of one season: columns `meas_date`, `fld_code`, `sect_code`,
    /// `fatr_code` and `sen_val`, as text.
    ///
    /// The first call fetches every page of the season concurrently; later calls
    /// are answered from the cache without any request.
    pub async fn fetch_env_for_season(&self, season_id: i64) -> Result<DataFrame, FarmEnvError> {
        Ok(self.fetcher.fetch(season_id).await?)
    }

    /// Time-indexed table of the readings of all `season_ids`: a `meas_date`
    /// datetime column (unique, ascending) plus one column per attribute
    /// description, duplicates averaged.
    ///
    /// # Errors
    ///
    /// Fails if any season fails to fetch, or if a timestamp or value cannot be
    /// parsed. Use [`FarmEnv::fetch_env_for_seasons_lenient`] to keep the seasons
    /// that did succeed.
    pub async fn fetch_env_for_seasons(&self, season_ids: &[i64]) -> Result<DataFrame, FarmEnvError> {
        let frames = self.fetcher.fetch_all(season_ids).await?;
        let table = aggregate(&frames)?;
        info!(
            "Aggregated {} seasons into {} timestamps x {} attributes",
            frames.len(),
            table.height(),
            table.width().saturating_sub(1)
        );
        Ok(table)
    }

    /// Like [`FarmEnv::fetch_env_for_seasons`], but seasons that fail to fetch are
    /// reported instead of failing the whole table.
    ///
    /// # Errors
    ///
    /// Parse failures in the fetched readings are still errors.
    pub async fn fetch_env_for_seasons_lenient(
        &self,
        season_ids: &[i64],
    ) -> Result<PartialEnvTable, FarmEnvError> {
        let mut frames = Vec::new();
        let mut failures = Vec::new();
        for (season_id, result) in self.fetcher.fetch_each(season_ids).await {
            match result {
                Ok(frame) => frames.push(frame),
                Err(error) => {
                    warn!("Skipping season {}: {}", season_id, error);
                    failures.push(SeasonFailure { season_id, error });
                }
            }
        }
        failures.sort_by_key(|failure| failure.season_id);
        let table = aggregate(&frames)?;
        Ok(PartialEnvTable { table, failures })
    }

    /// Builds the monthly figure of one column of an aggregated table.
    ///
    /// * `.table(&DataFrame)`: **Required.** Output of [`FarmEnv::fetch_env_for_seasons`].
    /// * `.column(&str)`: **Required.** Attribute description, e.g. `"내부CO2"`.
    /// * `.layout(GridLayout)`: Optional. Defaults to 3 × 2 panels, paginated.
    #[builder]
    pub fn render_monthly(
        &self,
        table: &DataFrame,
        column: &str,
        layout: Option<GridLayout>,
    ) -> Result<MonthlyFigure, FarmEnvError> {
        Ok(render_monthly(table, column, layout.unwrap_or_default())?)
    }

    /// Runs the whole pipeline: select seasons, fetch and aggregate their readings,
    /// build the monthly figure.
    ///
    /// * `.years(&[i32])`: **Required.**
    /// * `.regions(Vec<String>)` / `.crops(Vec<String>)`: Optional filters, see
    ///   [`FarmEnv::select_seasons`].
    /// * `.column(&str)`: Optional. Defaults to the internal CO2 description.
    /// * `.layout(GridLayout)`: Optional.
    #[builder]
    pub async fn visualize(
        &self,
        years: &[i32],
        regions: Option<Vec<String>>,
        crops: Option<Vec<String>>,
        column: Option<&str>,
        layout: Option<GridLayout>,
    ) -> Result<MonthlyFigure, FarmEnvError> {
        let seasons = self
            .select_seasons()
            .years(years)
            .maybe_regions(regions)
            .maybe_crops(crops)
            .call()
            .await?;
        let season_ids = SeasonSelection::season_ids(&seasons);
        let table = self.fetch_env_for_seasons(&season_ids).await?;
        let column = column.unwrap_or(Attribute::InternalCo2.description());
        Ok(render_monthly(&table, column, layout.unwrap_or_default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::FarmDataError;
    use crate::env_data::MEAS_DATE;
    use crate::types::env_reading::{EnvPage, EnvReading};
    use crate::visualize::error::VisualizeError;
    use crate::visualize::monthly::Overflow;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeDataMart {
        seasons: HashMap<i32, Vec<SeasonRecord>>,
        pages: HashMap<i64, Vec<Vec<EnvReading>>>,
        broken: HashSet<i64>,
        delay: Option<Duration>,
        page_calls: AtomicUsize,
    }

    impl FakeDataMart {
        fn page_calls(&self) -> usize {
            self.page_calls.load(Ordering::SeqCst)
        }
    }

    impl FarmDataSource for FakeDataMart {
        async fn list_seasons(&self, year: i32) -> Result<Vec<SeasonRecord>, FarmDataError> {
            Ok(self.seasons.get(&year).cloned().unwrap_or_default())
        }

        async fn list_env_readings(
            &self,
            season_id: i64,
            page: u32,
        ) -> Result<EnvPage, FarmDataError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.broken.contains(&season_id) {
                return Err(FarmDataError::InvalidPagination {
                    season_id,
                    value: "garbage".to_string(),
                });
            }
            let pages = self.pages.get(&season_id).cloned().unwrap_or_default();
            let readings = pages.get(page as usize - 1).cloned().unwrap_or_default();
            Ok(EnvPage::new(readings, pages.len() as u32))
        }
    }

    fn reading(at: &str, code: &str, value: f64) -> EnvReading {
        EnvReading {
            measured_at: at.to_string(),
            field_code: "1".to_string(),
            section_code: "1".to_string(),
            attribute_code: code.to_string(),
            value: Some(value.to_string()),
        }
    }

    fn record(region: &str, crop: &str, season_id: i64) -> SeasonRecord {
        SeasonRecord {
            region: region.to_string(),
            crop: crop.to_string(),
            season_id,
        }
    }

    fn data_mart() -> FakeDataMart {
        let mut mart = FakeDataMart::default();
        mart.seasons.insert(
            2021,
            vec![
                record("Jeonnam", "Tomato", 101),
                record("Jeonnam", "Tomato", 102),
                record("Gyeongnam", "Paprika", 103),
            ],
        );
        mart.pages.insert(
            101,
            vec![
                vec![
                    reading("2021-03-01 10:00:00", "CI", 400.0),
                    reading("2021-03-01 10:00:00", "CI", 420.0),
                    reading("2021-03-01 11:00:00", "CI", 450.0),
                ],
                vec![
                    reading("2021-04-02 10:00:00", "CI", 500.0),
                    reading("2021-04-02 10:00:00", "TI", 21.0),
                ],
            ],
        );
        mart.pages.insert(
            102,
            vec![vec![
                reading("2021-03-01 10:00:00", "CI", 380.0),
                reading("2021-05-03 14:00:00", "CI", 610.0),
            ]],
        );
        mart.pages.insert(
            103,
            vec![vec![reading("2021-06-01 09:00:00", "CI", 300.0)]],
        );
        mart
    }

    fn config() -> ClientConfig {
        ClientConfig::builder().max_concurrency(4).cache_capacity(8).build()
    }

    #[tokio::test]
    async fn test_two_seasons_cost_one_request_per_page() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());

        let table = farm_env.fetch_env_for_seasons(&[101, 102]).await?;

        assert_eq!(farm_env.source().page_calls(), 3);
        // 03-01 10h, 03-01 11h, 04-02 10h, 05-03 14h
        assert_eq!(table.height(), 4);
        let co2: Vec<Option<f64>> = table
            .column("내부CO2")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(co2, vec![Some(400.0), Some(450.0), Some(500.0), Some(610.0)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_season_fetch_is_memoized() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());

        let first = farm_env.fetch_env_for_season(101).await?;
        let calls = farm_env.source().page_calls();
        let second = farm_env.fetch_env_for_season(101).await?;

        assert!(first.equals_missing(&second));
        assert_eq!(first.height(), 5);
        assert_eq!(farm_env.source().page_calls(), calls);
        assert_eq!(farm_env.cached_seasons().await, vec![101]);

        farm_env.clear_cache().await;
        farm_env.fetch_env_for_season(101).await?;
        assert_eq!(farm_env.source().page_calls(), calls * 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_fetches_of_one_season_share_requests() -> Result<(), FarmEnvError> {
        let mart = FakeDataMart {
            delay: Some(Duration::from_millis(30)),
            ..data_mart()
        };
        let farm_env = FarmEnv::new(mart, &config());

        let (a, b) = tokio::join!(
            farm_env.fetch_env_for_season(101),
            farm_env.fetch_env_for_season(101)
        );
        assert!(a?.equals_missing(&b?));
        assert_eq!(farm_env.source().page_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_one_failing_season_fails_the_aggregate() {
        let mart = FakeDataMart {
            broken: HashSet::from([103]),
            ..data_mart()
        };
        let farm_env = FarmEnv::new(mart, &config());

        let err = farm_env
            .fetch_env_for_seasons(&[101, 103])
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_lenient_fetch_reports_failed_seasons() -> Result<(), FarmEnvError> {
        let mart = FakeDataMart {
            broken: HashSet::from([103]),
            ..data_mart()
        };
        let farm_env = FarmEnv::new(mart, &config());

        let partial = farm_env
            .fetch_env_for_seasons_lenient(&[101, 102, 103])
            .await?;

        assert!(!partial.is_complete());
        assert_eq!(partial.failures.len(), 1);
        assert_eq!(partial.failures[0].season_id, 103);
        assert_eq!(partial.table.height(), 4);
        // The failed season is retried next time rather than cached.
        assert_eq!(farm_env.cached_seasons().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_fetched_once() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());
        farm_env.fetch_env_for_seasons(&[102, 102, 102]).await?;
        assert_eq!(farm_env.source().page_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_index_is_sorted_and_unique() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());
        let table = farm_env.fetch_env_for_seasons(&[103, 102, 101]).await?;

        let index = table
            .column(MEAS_DATE)
            .unwrap()
            .cast(&polars::prelude::DataType::Int64)
            .unwrap();
        let index: Vec<i64> = index.i64().unwrap().into_iter().flatten().collect();
        let unique: BTreeSet<i64> = index.iter().copied().collect();
        assert_eq!(unique.len(), index.len());
        assert!(index.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[tokio::test]
    async fn test_select_seasons_defaults_and_empty_selection() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());

        let selected = farm_env.select_seasons().years(&[2021]).call().await?;
        assert_eq!(SeasonSelection::season_ids(&selected), vec![101, 102]);

        let err = farm_env
            .select_seasons()
            .years(&[2021])
            .regions(vec!["Jeju".to_string()])
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, FarmEnvError::EmptySelection { .. }));

        let err = farm_env
            .select_seasons()
            .years(&[1999])
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, FarmEnvError::EmptySelection { ref years, .. } if years == &[1999]));
        Ok(())
    }

    #[tokio::test]
    async fn test_rendering_a_missing_column_is_an_error() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());
        let table = farm_env.fetch_env_for_seasons(&[101]).await?;

        let err = farm_env
            .render_monthly()
            .table(&table)
            .column("외부풍속")
            .call()
            .unwrap_err();
        assert!(matches!(
            err,
            FarmEnvError::Visualize(VisualizeError::ColumnNotFound(ref name, _)) if name == "외부풍속"
        ));

        let err = farm_env
            .visualize()
            .years(&[2021])
            .column("외부풍속")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, FarmEnvError::Visualize(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_visualize_runs_the_whole_pipeline() -> Result<(), FarmEnvError> {
        let farm_env = FarmEnv::new(data_mart(), &config());

        let figure = farm_env.visualize().years(&[2021]).call().await?;

        assert_eq!(figure.column, "내부CO2");
        assert_eq!(figure.y_range, (400.0, 610.0));
        let labels: Vec<String> = figure.panels().map(|p| p.label()).collect();
        assert_eq!(labels, ["2021-03", "2021-04", "2021-05"]);

        let truncated = farm_env
            .render_monthly()
            .table(&farm_env.fetch_env_for_seasons(&[101]).await?)
            .column("내부CO2")
            .layout(GridLayout::new(1, 1, Overflow::Truncate)?)
            .call()?;
        assert_eq!(truncated.panel_count(), 1);
        assert_eq!(truncated.dropped_months.len(), 1);
        Ok(())
    }
}
