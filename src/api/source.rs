use crate::api::error::FarmDataError;
use crate::types::env_reading::EnvPage;
use crate::types::season::SeasonRecord;
use std::future::Future;

/// The two data-mart operations the pipeline consumes.
///
/// [`crate::FarmDataClient`] implements this over HTTP. Any other implementation
/// (a recorded fixture, an in-memory double) can be handed to
/// [`crate::FarmEnv::new`] instead.
pub trait FarmDataSource: Send + Sync + 'static {
    /// All crop seasons registered for `year`.
    fn list_seasons(
        &self,
        year: i32,
    ) -> impl Future<Output = Result<Vec<SeasonRecord>, FarmDataError>> + Send;

    /// Page `page` (1-based) of a season's environment readings. Every page
    /// reports the season's total page count.
    fn list_env_readings(
        &self,
        season_id: i64,
        page: u32,
    ) -> impl Future<Output = Result<EnvPage, FarmDataError>> + Send;
}
