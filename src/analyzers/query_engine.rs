use crate::analyzers::statistics::{self, PearsonOutcome};
use crate::analyzers::summary::{self, ColumnSummary};
use crate::error::{ProcessingError, Result};
use crate::models::{Dataset, Pollutant};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Calendar month key used by the monthly aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(timestamp: NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Months from `self` to `later`; negative when `later` is earlier.
    pub fn months_until(self, later: YearMonth) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + (later.month as i64 - self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:04}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub month: YearMonth,
    pub mean: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
}

/// Equal-width histogram of the present values of one pollutant.
///
/// Each bucket covers `[lower, upper)` except the last, which also holds the
/// maximum. When fewer than two distinct values exist the histogram is a
/// single zero-width bucket at that value holding every observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub pollutant: Pollutant,
    pub bucket_width: f64,
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extreme {
    pub timestamp: NaiveDateTime,
    pub station: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileExtremes {
    pub pollutant: Pollutant,
    pub percentile: f64,
    /// `None` when the pollutant has no present values.
    pub threshold: Option<f64>,
    pub records: Vec<Extreme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum UndefinedReason {
    TooFewPairs { pairs: usize },
    ZeroVariance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Correlation {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Correlation {
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            Correlation::Defined(r) => Some(*r),
            Correlation::Undefined(_) => None,
        }
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Defined(r) => write!(f, "{:.2}", r),
            Correlation::Undefined(UndefinedReason::TooFewPairs { pairs }) => {
                write!(f, "undefined ({} paired observations)", pairs)
            }
            Correlation::Undefined(UndefinedReason::ZeroVariance) => {
                write!(f, "undefined (constant series)")
            }
        }
    }
}

/// Station and inclusive time window restricting a dataset.
///
/// An empty station set applies no station filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub stations: BTreeSet<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Selection {
    pub fn new(
        stations: impl IntoIterator<Item = impl Into<String>>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self> {
        let selection = Self {
            stations: stations.into_iter().map(Into::into).collect(),
            start,
            end,
        };
        selection.check_range()?;
        Ok(selection)
    }

    /// Whole calendar days: 00:00 on `start` through the last hour of `end`.
    pub fn for_dates(
        stations: impl IntoIterator<Item = impl Into<String>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self> {
        let midnight = NaiveTime::default();
        let last_hour = NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(midnight);
        Self::new(stations, start.and_time(midnight), end.and_time(last_hour))
    }

    pub fn check_range(&self) -> Result<()> {
        if self.start > self.end {
            return Err(ProcessingError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn includes_station(&self, station: &str) -> bool {
        self.stations.is_empty() || self.stations.contains(station)
    }
}

/// Read-only queries over one [`Dataset`].
pub struct QueryEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> QueryEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Mean per calendar month over the dataset's full time span. Months
    /// without a present value keep their slot with `mean: None`.
    pub fn monthly_mean(&self, pollutant: Pollutant) -> Result<Vec<MonthlyMean>> {
        self.dataset.require_column(pollutant)?;

        let Some((first, last)) = self.dataset.time_span() else {
            return Ok(Vec::new());
        };
        let first_month = YearMonth::of(first);
        let span = first_month.months_until(YearMonth::of(last)) as usize + 1;

        let mut sums = vec![(0.0f64, 0usize); span];
        for record in self.dataset {
            if let Some(value) = record.value(pollutant) {
                let slot = first_month.months_until(YearMonth::of(record.timestamp)) as usize;
                sums[slot].0 += value;
                sums[slot].1 += 1;
            }
        }

        let mut month = first_month;
        let mut result = Vec::with_capacity(span);
        for (sum, samples) in sums {
            result.push(MonthlyMean {
                month,
                mean: (samples > 0).then(|| sum / samples as f64),
                samples,
            });
            month = month.next();
        }

        debug!(%pollutant, months = result.len(), "monthly means computed");
        Ok(result)
    }

    pub fn distribution(&self, pollutant: Pollutant, bucket_count: usize) -> Result<Histogram> {
        self.dataset.require_column(pollutant)?;
        if bucket_count == 0 {
            return Err(ProcessingError::InvalidParameter(
                "bucket count must be positive".to_string(),
            ));
        }

        let values: Vec<f64> = self.dataset.values(pollutant).collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let histogram = if values.is_empty() {
            Histogram {
                pollutant,
                bucket_width: 0.0,
                buckets: Vec::new(),
            }
        } else if min == max {
            Histogram {
                pollutant,
                bucket_width: 0.0,
                buckets: vec![Bucket {
                    lower_bound: min,
                    upper_bound: max,
                    count: values.len(),
                }],
            }
        } else {
            // Halving keeps the span finite even when `max - min` exceeds f64::MAX
            let half_span = max / 2.0 - min / 2.0;
            let k = bucket_count as f64;
            let mut counts = vec![0usize; bucket_count];
            for value in &values {
                let position = (value / 2.0 - min / 2.0) / half_span;
                let slot = ((position * k).floor() as usize).min(bucket_count - 1);
                counts[slot] += 1;
            }

            let edge = |i: usize| {
                if i == bucket_count {
                    max
                } else {
                    let t = i as f64 / k;
                    min * (1.0 - t) + max * t
                }
            };
            let buckets = counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| Bucket {
                    lower_bound: edge(i),
                    upper_bound: edge(i + 1),
                    count,
                })
                .collect();
            let width = half_span / k * 2.0;

            Histogram {
                pollutant,
                bucket_width: width,
                buckets,
            }
        };

        debug!(%pollutant, buckets = histogram.buckets.len(), values = values.len(), "histogram built");
        Ok(histogram)
    }

    /// Records whose value is strictly above the `percentile`-th percentile, in time order.
    pub fn percentile_extremes(
        &self,
        pollutant: Pollutant,
        percentile: f64,
    ) -> Result<PercentileExtremes> {
        self.dataset.require_column(pollutant)?;
        if !(0.0..=100.0).contains(&percentile) {
            return Err(ProcessingError::InvalidParameter(format!(
                "percentile must be within 0..=100, got {}",
                percentile
            )));
        }

        let sorted = statistics::sorted_copy(self.dataset.values(pollutant));
        let threshold = statistics::percentile_sorted(&sorted, percentile);

        let records = match threshold {
            Some(limit) => self
                .dataset
                .iter()
                .filter_map(|r| {
                    r.value(pollutant)
                        .filter(|v| *v > limit)
                        .map(|value| Extreme {
                            timestamp: r.timestamp,
                            station: r.station.clone(),
                            value,
                        })
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(PercentileExtremes {
            pollutant,
            percentile,
            threshold,
            records,
        })
    }

    /// Pearson coefficient over records where both pollutants are present.
    pub fn correlation(&self, a: Pollutant, b: Pollutant) -> Result<Correlation> {
        self.dataset.require_column(a)?;
        self.dataset.require_column(b)?;

        let pairs: Vec<(f64, f64)> = self
            .dataset
            .iter()
            .filter_map(|r| Some((r.value(a)?, r.value(b)?)))
            .collect();

        let result = match statistics::pearson(&pairs) {
            PearsonOutcome::Coefficient(r) => Correlation::Defined(r),
            PearsonOutcome::TooFewPairs(pairs) => {
                Correlation::Undefined(UndefinedReason::TooFewPairs { pairs })
            }
            PearsonOutcome::ZeroVariance => Correlation::Undefined(UndefinedReason::ZeroVariance),
        };

        debug!(%a, %b, pairs = pairs.len(), result = %result, "correlation computed");
        Ok(result)
    }

    /// New dataset holding the records inside `selection`.
    pub fn filter_by_selection(&self, selection: &Selection) -> Result<Dataset> {
        selection.check_range()?;

        let records = self.dataset.records();
        let from = records.partition_point(|r| r.timestamp < selection.start);
        let to = records.partition_point(|r| r.timestamp <= selection.end);

        let kept = records[from..to.max(from)]
            .iter()
            .filter(|r| selection.includes_station(&r.station))
            .cloned()
            .collect();

        Ok(Dataset::from_sorted_subset(kept, self.dataset.columns().clone()))
    }

    /// Distinct calendar days with at least one value strictly above `threshold`, ascending.
    pub fn exceedance_days(&self, pollutant: Pollutant, threshold: f64) -> Result<Vec<NaiveDate>> {
        self.dataset.require_column(pollutant)?;
        if !threshold.is_finite() {
            return Err(ProcessingError::InvalidParameter(format!(
                "threshold must be a finite number, got {}",
                threshold
            )));
        }

        let mut days: Vec<NaiveDate> = Vec::new();
        for record in self.dataset.iter().filter(|r| r.exceeds(pollutant, threshold)) {
            // Records are time-ordered, so equal days are adjacent
            if days.last() != Some(&record.date()) {
                days.push(record.date());
            }
        }
        Ok(days)
    }

    pub fn count_exceedance_days(&self, pollutant: Pollutant, threshold: f64) -> Result<usize> {
        let count = self.exceedance_days(pollutant, threshold)?.len();
        debug!(%pollutant, threshold, days = count, "exceedance days counted");
        Ok(count)
    }

    /// Descriptive statistics for every pollutant column in the dataset.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.dataset
            .columns()
            .iter()
            .map(|&pollutant| summary::summarize(pollutant, self.dataset.values(pollutant)))
            .collect()
    }

    pub fn stations(&self) -> Vec<String> {
        self.dataset.stations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AirQualityRecord;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn dataset(rows: &[(&str, NaiveDateTime, Option<f64>, Option<f64>)]) -> Dataset {
        let records = rows.iter().map(|(station, timestamp, pm25, pm10)| {
            let mut record = AirQualityRecord::new(station.to_string(), *timestamp);
            record.set_value(Pollutant::Pm25, *pm25);
            record.set_value(Pollutant::Pm10, *pm10);
            record
        });
        Dataset::from_records(records, [Pollutant::Pm25, Pollutant::Pm10])
    }

    #[test]
    fn test_monthly_mean_keeps_empty_months() {
        let data = dataset(&[
            ("A", ts(2016, 11, 1, 0), Some(10.0), None),
            ("A", ts(2016, 11, 2, 0), Some(20.0), None),
            ("A", ts(2016, 11, 3, 0), None, None),
            ("A", ts(2016, 12, 5, 0), None, Some(1.0)),
            ("A", ts(2017, 1, 31, 23), Some(40.0), None),
        ]);

        let means = QueryEngine::new(&data).monthly_mean(Pollutant::Pm25).unwrap();
        let labels: Vec<String> = means.iter().map(|m| m.month.to_string()).collect();

        assert_eq!(labels, vec!["2016-11", "2016-12", "2017-01"]);
        assert_eq!(means[0].mean, Some(15.0));
        assert_eq!(means[0].samples, 2);
        assert_eq!(means[1].mean, None);
        assert_eq!(means[2].mean, Some(40.0));
    }

    #[test]
    fn test_monthly_mean_empty_dataset() {
        let data = dataset(&[]);
        assert!(QueryEngine::new(&data)
            .monthly_mean(Pollutant::Pm25)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_distribution_buckets() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(0.0), None),
            ("A", ts(2016, 1, 1, 1), Some(2.0), None),
            ("A", ts(2016, 1, 1, 2), Some(5.0), None),
            ("A", ts(2016, 1, 1, 3), Some(10.0), None),
            ("A", ts(2016, 1, 1, 4), None, None),
        ]);

        let histogram = QueryEngine::new(&data)
            .distribution(Pollutant::Pm25, 2)
            .unwrap();

        assert_eq!(histogram.bucket_width, 5.0);
        assert_eq!(
            histogram.buckets,
            vec![
                Bucket {
                    lower_bound: 0.0,
                    upper_bound: 5.0,
                    count: 2
                },
                Bucket {
                    lower_bound: 5.0,
                    upper_bound: 10.0,
                    count: 2
                },
            ]
        );
        assert_eq!(histogram.total(), 4);
    }

    #[test]
    fn test_distribution_spanning_full_float_range() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), None, Some(-1e308)),
            ("A", ts(2016, 1, 1, 1), None, Some(1e308)),
        ]);

        let histogram = QueryEngine::new(&data)
            .distribution(Pollutant::Pm10, 2)
            .unwrap();

        assert_eq!(
            histogram.buckets,
            vec![
                Bucket {
                    lower_bound: -1e308,
                    upper_bound: 0.0,
                    count: 1
                },
                Bucket {
                    lower_bound: 0.0,
                    upper_bound: 1e308,
                    count: 1
                },
            ]
        );
        assert_eq!(histogram.bucket_width, 1e308);
        assert!(histogram
            .buckets
            .iter()
            .all(|b| b.lower_bound.is_finite() && b.upper_bound.is_finite()));
    }

    #[test]
    fn test_distribution_degenerate_and_invalid() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(7.0), None),
            ("A", ts(2016, 1, 1, 1), Some(7.0), None),
        ]);
        let engine = QueryEngine::new(&data);

        let histogram = engine.distribution(Pollutant::Pm25, 30).unwrap();
        assert_eq!(histogram.buckets.len(), 1);
        assert_eq!(histogram.buckets[0].lower_bound, 7.0);
        assert_eq!(histogram.buckets[0].count, 2);

        let empty = engine.distribution(Pollutant::Pm10, 30).unwrap();
        assert!(empty.buckets.is_empty());

        assert!(engine
            .distribution(Pollutant::Pm25, 0)
            .unwrap_err()
            .is_invalid_parameter());
        assert!(engine
            .distribution(Pollutant::So2, 10)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_percentile_extremes() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(4.0), None),
            ("B", ts(2016, 1, 1, 1), Some(1.0), None),
            ("A", ts(2016, 1, 1, 2), Some(3.0), None),
            ("B", ts(2016, 1, 1, 3), Some(2.0), None),
        ]);
        let engine = QueryEngine::new(&data);

        let extremes = engine.percentile_extremes(Pollutant::Pm25, 50.0).unwrap();
        assert_eq!(extremes.threshold, Some(2.5));
        let picked: Vec<(NaiveDateTime, f64)> = extremes
            .records
            .iter()
            .map(|e| (e.timestamp, e.value))
            .collect();
        assert_eq!(picked, vec![(ts(2016, 1, 1, 0), 4.0), (ts(2016, 1, 1, 2), 3.0)]);

        let none = engine.percentile_extremes(Pollutant::Pm25, 100.0).unwrap();
        assert!(none.records.is_empty());

        assert!(engine
            .percentile_extremes(Pollutant::Pm25, 120.0)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_correlation_undefined_cases() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(10.0), Some(50.0)),
            ("A", ts(2016, 1, 1, 1), Some(20.0), Some(50.0)),
            ("A", ts(2016, 1, 1, 2), Some(30.0), Some(50.0)),
        ]);
        let engine = QueryEngine::new(&data);

        assert_eq!(
            engine.correlation(Pollutant::Pm25, Pollutant::Pm10).unwrap(),
            Correlation::Undefined(UndefinedReason::ZeroVariance)
        );

        let sparse = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(10.0), Some(1.0)),
            ("A", ts(2016, 1, 1, 1), Some(20.0), None),
        ]);
        assert_eq!(
            QueryEngine::new(&sparse)
                .correlation(Pollutant::Pm25, Pollutant::Pm10)
                .unwrap(),
            Correlation::Undefined(UndefinedReason::TooFewPairs { pairs: 1 })
        );
    }

    #[test]
    fn test_correlation_is_symmetric() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(1.0), Some(2.3)),
            ("A", ts(2016, 1, 1, 1), Some(2.0), Some(3.9)),
            ("A", ts(2016, 1, 1, 2), Some(3.5), Some(5.1)),
            ("A", ts(2016, 1, 1, 3), None, Some(9.9)),
            ("A", ts(2016, 1, 1, 4), Some(8.0), Some(7.7)),
        ]);
        let engine = QueryEngine::new(&data);

        let ab = engine.correlation(Pollutant::Pm25, Pollutant::Pm10).unwrap();
        let ba = engine.correlation(Pollutant::Pm10, Pollutant::Pm25).unwrap();
        assert_eq!(ab, ba);
        assert!(ab.coefficient().unwrap() > 0.8);
    }

    #[test]
    fn test_filter_by_selection() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(1.0), None),
            ("B", ts(2016, 1, 1, 1), Some(2.0), None),
            ("A", ts(2016, 1, 2, 0), Some(3.0), None),
            ("A", ts(2016, 1, 3, 0), Some(4.0), None),
        ]);
        let engine = QueryEngine::new(&data);

        let selection = Selection::new(["A"], ts(2016, 1, 1, 0), ts(2016, 1, 2, 0)).unwrap();
        let filtered = engine.filter_by_selection(&selection).unwrap();
        let values: Vec<f64> = filtered.values(Pollutant::Pm25).collect();
        assert_eq!(values, vec![1.0, 3.0]);

        let everyone = Selection::new(Vec::<String>::new(), ts(2016, 1, 1, 1), ts(2016, 1, 3, 0)).unwrap();
        assert_eq!(engine.filter_by_selection(&everyone).unwrap().len(), 3);

        // Original dataset is untouched
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        assert!(matches!(
            Selection::new(["A"], ts(2016, 2, 1, 0), ts(2016, 1, 1, 0)),
            Err(ProcessingError::InvalidRange { .. })
        ));

        let data = dataset(&[("A", ts(2016, 1, 1, 0), Some(1.0), None)]);
        let inverted = Selection {
            stations: BTreeSet::new(),
            start: ts(2016, 2, 1, 0),
            end: ts(2016, 1, 1, 0),
        };
        assert!(matches!(
            QueryEngine::new(&data).filter_by_selection(&inverted),
            Err(ProcessingError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_selection_for_dates_covers_whole_days() {
        let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let selection = Selection::for_dates(["A"], start, start).unwrap();
        assert_eq!(selection.start, ts(2016, 1, 1, 0));
        assert_eq!(selection.end, ts(2016, 1, 1, 23));
    }

    #[test]
    fn test_exceedance_days_count_days_not_hours() {
        let data = dataset(&[
            ("A", ts(2016, 1, 1, 0), Some(80.0), None),
            ("A", ts(2016, 1, 1, 1), Some(90.0), None),
            ("A", ts(2016, 1, 2, 0), Some(75.0), None),
            ("A", ts(2016, 1, 3, 5), Some(76.0), None),
        ]);
        let engine = QueryEngine::new(&data);

        assert_eq!(engine.count_exceedance_days(Pollutant::Pm25, 75.0).unwrap(), 2);
        assert_eq!(engine.count_exceedance_days(Pollutant::Pm25, 74.0).unwrap(), 3);
        assert_eq!(engine.count_exceedance_days(Pollutant::Pm25, 100.0).unwrap(), 0);
        assert!(engine
            .count_exceedance_days(Pollutant::Pm25, f64::NAN)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_year_month_arithmetic() {
        let dec = YearMonth {
            year: 2016,
            month: 12,
        };
        assert_eq!(
            dec.next(),
            YearMonth {
                year: 2017,
                month: 1
            }
        );
        assert_eq!(dec.months_until(dec.next().next()), 2);
        assert_eq!(dec.to_string(), "2016-12");
    }
}
