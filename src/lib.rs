mod api;
mod env_data;
mod error;
mod farm_env;
mod types;
mod utils;
mod visualize;

pub use error::FarmEnvError;
pub use farm_env::*;

pub use api::client::FarmDataClient;
pub use api::config::*;
pub use api::error::FarmDataError;
pub use api::source::FarmDataSource;

pub use types::attribute::{describe_code, Attribute};
pub use types::env_reading::{EnvPage, EnvReading};
pub use types::month::Month;
pub use types::season::{distinct_crops, distinct_regions, SeasonRecord, SeasonSelection};

pub use env_data::aggregator::{aggregate, concat_seasons, parse_timestamp, pivot_by_attribute, reshape};
pub use env_data::error::EnvDataError;
pub use env_data::season_cache::SeasonCache;
pub use env_data::season_fetcher::{readings_to_frame, SeasonFetcher};
pub use env_data::{FATR_CODE, FLD_CODE, MEAS_DATE, SECT_CODE, SEN_VAL};

pub use visualize::box_stats::BoxStats;
pub use visualize::error::VisualizeError;
pub use visualize::monthly::*;

pub use utils::get_config_path;
