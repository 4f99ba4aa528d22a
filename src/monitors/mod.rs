pub mod sample;
pub mod thresholds;
