use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::error::{ProcessingError, Result};
use crate::models::{AirQualityRecord, Pollutant};

/// Immutable, time-ordered set of observations.
///
/// Records are sorted ascending by timestamp and no two records share a
/// timestamp. `columns` lists the pollutant columns the source schema carried,
/// whether or not any cell in them held a value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    records: Vec<AirQualityRecord>,
    columns: BTreeSet<Pollutant>,
}

impl Dataset {
    /// Build a dataset from records in input order: the first record for each
    /// timestamp is kept, later duplicates are dropped, then the survivors are
    /// sorted by timestamp.
    pub fn from_records(
        records: impl IntoIterator<Item = AirQualityRecord>,
        columns: impl IntoIterator<Item = Pollutant>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut records: Vec<AirQualityRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.timestamp))
            .collect();
        // Stable sort keeps equal keys in input order, though dedup leaves none
        records.sort_by_key(|r| r.timestamp);

        Self {
            records,
            columns: columns.into_iter().collect(),
        }
    }

    /// Subset constructor for callers that already hold an ordered, unique subsequence.
    pub(crate) fn from_sorted_subset(
        records: Vec<AirQualityRecord>,
        columns: BTreeSet<Pollutant>,
    ) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { records, columns }
    }

    pub fn records(&self) -> &[AirQualityRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AirQualityRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &BTreeSet<Pollutant> {
        &self.columns
    }

    pub fn has_column(&self, pollutant: Pollutant) -> bool {
        self.columns.contains(&pollutant)
    }

    /// Fails with `InvalidParameter` when the source had no column for `pollutant`.
    pub fn require_column(&self, pollutant: Pollutant) -> Result<()> {
        if self.has_column(pollutant) {
            Ok(())
        } else {
            Err(ProcessingError::InvalidParameter(format!(
                "column '{}' is not present in the dataset",
                pollutant
            )))
        }
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.first_timestamp()?, self.last_timestamp()?))
    }

    /// Present (non-absent) values of one pollutant, in timestamp order.
    pub fn values(&self, pollutant: Pollutant) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().filter_map(move |r| r.value(pollutant))
    }

    /// Distinct station names, sorted.
    pub fn stations(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.station.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a AirQualityRecord;
    type IntoIter = std::slice::Iter<'a, AirQualityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
