pub mod box_stats;
pub mod error;
pub mod monthly;
pub mod render;
