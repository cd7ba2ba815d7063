//! Fetches every page of a season's environment readings and assembles them into a
//! season table. Results are memoized through [`SeasonCache`].

use crate::api::source::FarmDataSource;
use crate::env_data::error::EnvDataError;
use crate::env_data::season_cache::SeasonCache;
use crate::env_data::{FATR_CODE, FLD_CODE, MEAS_DATE, SECT_CODE, SEN_VAL};
use crate::types::env_reading::{EnvPage, EnvReading};
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

pub struct SeasonFetcher<S> {
    source: Arc<S>,
    cache: SeasonCache,
    max_concurrency: usize,
}

impl<S: FarmDataSource> SeasonFetcher<S> {
    pub fn new(source: Arc<S>, cache: SeasonCache, max_concurrency: usize) -> Self {
        Self {
            source,
            cache,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &SeasonCache {
        &self.cache
    }

    /// Season table for `season_id`, from the cache or fetched page by page.
    pub async fn fetch(&self, season_id: i64) -> Result<DataFrame, EnvDataError> {
        self.cache
            .get_or_try_fetch(season_id, || self.fetch_uncached(season_id))
            .await
    }

    /// Fetches several seasons concurrently. Fails on the first season that fails.
    /// Duplicate ids are fetched once.
    pub async fn fetch_all(&self, season_ids: &[i64]) -> Result<Vec<DataFrame>, EnvDataError> {
        let unique: BTreeSet<i64> = season_ids.iter().copied().collect();
        stream::iter(unique)
            .map(|season_id| self.fetch(season_id))
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await
    }

    /// Fetches several seasons concurrently, reporting each season's outcome.
    pub async fn fetch_each(
        &self,
        season_ids: &[i64],
    ) -> Vec<(i64, Result<DataFrame, EnvDataError>)> {
        let unique: BTreeSet<i64> = season_ids.iter().copied().collect();
        stream::iter(unique)
            .map(|season_id| async move { (season_id, self.fetch(season_id).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }

    async fn fetch_uncached(&self, season_id: i64) -> Result<DataFrame, EnvDataError> {
        let started = Instant::now();

        // The first page doubles as page-count discovery.
        let first = self.source.list_env_readings(season_id, 1).await?;
        let total_pages = first.total_pages;
        debug!("Season {} has {} pages", season_id, total_pages);

        let mut readings = first.readings;
        if total_pages > 1 {
            let pages: Vec<EnvPage> = stream::iter(2..=total_pages)
                .map(|page| self.source.list_env_readings(season_id, page))
                .buffer_unordered(self.max_concurrency)
                .try_collect()
                .await?;
            for page in pages {
                readings.extend(page.readings);
            }
        }

        let frame = readings_to_frame(&readings)?;
        info!(
            "Fetched {} readings over {} pages for season {} in {:.2?}",
            frame.height(),
            total_pages,
            season_id,
            started.elapsed()
        );
        Ok(frame)
    }
}

/// Season table with the raw text columns of `readings`.
pub fn readings_to_frame(readings: &[EnvReading]) -> Result<DataFrame, EnvDataError> {
    let frame = df!(
        MEAS_DATE => readings.iter().map(|r| r.measured_at.clone()).collect::<Vec<_>>(),
        FLD_CODE => readings.iter().map(|r| r.field_code.clone()).collect::<Vec<_>>(),
        SECT_CODE => readings.iter().map(|r| r.section_code.clone()).collect::<Vec<_>>(),
        FATR_CODE => readings.iter().map(|r| r.attribute_code.clone()).collect::<Vec<_>>(),
        SEN_VAL => readings.iter().map(|r| r.value.clone()).collect::<Vec<_>>(),
    )?;
    Ok(frame)
}
