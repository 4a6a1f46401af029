use crate::analyzers::statistics::{mean, percentile_sorted, sample_std, sorted_copy};
use crate::models::Pollutant;
use serde::Serialize;

/// Descriptive statistics of one pollutant column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub pollutant: Pollutant,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

pub fn summarize(pollutant: Pollutant, values: impl IntoIterator<Item = f64>) -> ColumnSummary {
    let sorted = sorted_copy(values);

    ColumnSummary {
        pollutant,
        count: sorted.len(),
        mean: mean(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied(),
        q25: percentile_sorted(&sorted, 25.0),
        median: percentile_sorted(&sorted, 50.0),
        q75: percentile_sorted(&sorted, 75.0),
        max: sorted.last().copied(),
    }
}

impl ColumnSummary {
    /// Fixed-width table row; absent statistics print as `-`.
    pub fn table_row(&self) -> String {
        let cell = |v: Option<f64>| match v {
            Some(v) => format!("{:>10.2}", v),
            None => format!("{:>10}", "-"),
        };

        format!(
            "{:<6} {:>8} {} {} {} {} {} {} {}",
            self.pollutant.column_name(),
            self.count,
            cell(self.mean),
            cell(self.std),
            cell(self.min),
            cell(self.q25),
            cell(self.median),
            cell(self.q75),
            cell(self.max)
        )
    }

    pub fn table_header() -> String {
        format!(
            "{:<6} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        let summary = summarize(Pollutant::So2, [4.0, 1.0, 3.0, 2.0]);

        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(2.5));
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.q25, Some(1.75));
        assert_eq!(summary.median, Some(2.5));
        assert_eq!(summary.q75, Some(3.25));
        assert_eq!(summary.max, Some(4.0));
        assert!((summary.std.unwrap() - 1.290994).abs() < 1e-6);
    }

    #[test]
    fn test_summarize_empty_column() {
        let summary = summarize(Pollutant::O3, std::iter::empty::<f64>());

        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.max, None);
        assert!(summary.table_row().contains('-'));
    }
}
