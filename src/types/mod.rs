pub mod attribute;
pub(crate) mod de;
pub mod env_reading;
pub mod month;
pub mod season;
