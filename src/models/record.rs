use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;

/// One hourly observation from a monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityRecord {
    pub station: String,
    pub timestamp: NaiveDateTime,

    // Indexed by `Pollutant::index`; `None` is an absent measurement
    values: [Option<f64>; Pollutant::COUNT],
}

/// Compose the canonical hourly timestamp. `None` when the parts do not name a real calendar hour.
pub fn timestamp_from_parts(year: i32, month: u32, day: u32, hour: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)
}

impl AirQualityRecord {
    pub fn new(station: String, timestamp: NaiveDateTime) -> Self {
        Self {
            station,
            timestamp,
            values: [None; Pollutant::COUNT],
        }
    }

    pub fn builder() -> AirQualityRecordBuilder {
        AirQualityRecordBuilder::new()
    }

    pub fn value(&self, pollutant: Pollutant) -> Option<f64> {
        self.values[pollutant.index()]
    }

    /// Non-finite values are stored as absent.
    pub fn set_value(&mut self, pollutant: Pollutant, value: Option<f64>) {
        self.values[pollutant.index()] = value.filter(|v| v.is_finite());
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn has_value(&self, pollutant: Pollutant) -> bool {
        self.value(pollutant).is_some()
    }

    pub fn available_pollutants(&self) -> Vec<Pollutant> {
        Pollutant::ALL
            .into_iter()
            .filter(|p| self.has_value(*p))
            .collect()
    }

    pub fn exceeds(&self, pollutant: Pollutant, threshold: f64) -> bool {
        self.value(pollutant).is_some_and(|v| v > threshold)
    }
}

#[derive(Default)]
pub struct AirQualityRecordBuilder {
    station: Option<String>,
    timestamp: Option<NaiveDateTime>,
    values: [Option<f64>; Pollutant::COUNT],
}

impl AirQualityRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn hour(mut self, year: i32, month: u32, day: u32, hour: u32) -> Self {
        self.timestamp = timestamp_from_parts(year, month, day, hour);
        self
    }

    pub fn value(mut self, pollutant: Pollutant, value: f64) -> Self {
        self.values[pollutant.index()] = Some(value);
        self
    }

    pub fn build(self) -> Result<AirQualityRecord> {
        let station = self
            .station
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProcessingError::MissingData("station".to_string()))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| ProcessingError::MissingData("timestamp".to_string()))?;

        let mut record = AirQualityRecord::new(station, timestamp);
        for pollutant in Pollutant::ALL {
            record.set_value(pollutant, self.values[pollutant.index()]);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_from_parts() {
        let ts = timestamp_from_parts(2016, 2, 29, 23).unwrap();
        assert_eq!(ts.to_string(), "2016-02-29 23:00:00");

        assert!(timestamp_from_parts(2017, 2, 29, 0).is_none());
        assert!(timestamp_from_parts(2016, 13, 1, 0).is_none());
        assert!(timestamp_from_parts(2016, 1, 1, 24).is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let record = AirQualityRecord::builder()
            .station("Dingling")
            .hour(2016, 1, 1, 5)
            .value(Pollutant::Pm25, 80.0)
            .value(Pollutant::Co, 1200.0)
            .build()
            .unwrap();

        assert_eq!(record.station, "Dingling");
        assert_eq!(record.value(Pollutant::Pm25), Some(80.0));
        assert_eq!(record.value(Pollutant::Pm10), None);
        assert_eq!(
            record.available_pollutants(),
            vec![Pollutant::Pm25, Pollutant::Co]
        );
        assert!(record.exceeds(Pollutant::Pm25, 75.0));
        assert!(!record.exceeds(Pollutant::Pm25, 80.0));
        assert!(!record.exceeds(Pollutant::So2, 0.0));
    }

    #[test]
    fn test_builder_requires_identity() {
        assert!(AirQualityRecord::builder().hour(2016, 1, 1, 0).build().is_err());
        assert!(AirQualityRecord::builder().station("A").build().is_err());
        assert!(AirQualityRecord::builder()
            .station("A")
            .hour(2016, 2, 30, 0)
            .build()
            .is_err());
    }

    #[test]
    fn test_non_finite_values_are_absent() {
        let record = AirQualityRecord::builder()
            .station("A")
            .hour(2016, 1, 1, 0)
            .value(Pollutant::So2, f64::NAN)
            .value(Pollutant::No2, f64::INFINITY)
            .build()
            .unwrap();

        assert!(!record.has_value(Pollutant::So2));
        assert!(!record.has_value(Pollutant::No2));
    }
}
