pub mod aggregator;
pub mod error;
pub mod season_cache;
pub mod season_fetcher;

/// Measurement timestamp. Raw text in season tables, a datetime after reshaping.
pub const MEAS_DATE: &str = "meas_date";
pub const FLD_CODE: &str = "fld_code";
pub const SECT_CODE: &str = "sect_code";
pub const FATR_CODE: &str = "fatr_code";
pub const SEN_VAL: &str = "sen_val";
