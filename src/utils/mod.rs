pub mod linalg;
pub mod stats;

pub use stats::ColumnStatistics;
