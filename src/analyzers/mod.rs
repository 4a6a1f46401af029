pub mod query_engine;
pub mod statistics;
pub mod summary;

pub use query_engine::{
    Bucket, Correlation, Extreme, Histogram, MonthlyMean, PercentileExtremes, QueryEngine,
    Selection, UndefinedReason, YearMonth,
};
pub use summary::ColumnSummary;
