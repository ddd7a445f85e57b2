//! Analysis module - windowed consumption and cost rollups

mod window;

pub use window::{round2, Summary, WindowSummarizer};
