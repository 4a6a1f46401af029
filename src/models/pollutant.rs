use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;

/// Pollutants measured by the monitoring stations, in input column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "O3")]
    O3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::So2,
        Pollutant::No2,
        Pollutant::Co,
        Pollutant::O3,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "PM2.5" => Some(Pollutant::Pm25),
            "PM10" => Some(Pollutant::Pm10),
            "SO2" => Some(Pollutant::So2),
            "NO2" => Some(Pollutant::No2),
            "CO" => Some(Pollutant::Co),
            "O3" => Some(Pollutant::O3),
            _ => None,
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::So2 => "SO2",
            Pollutant::No2 => "NO2",
            Pollutant::Co => "CO",
            Pollutant::O3 => "O3",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "Fine particulate matter (PM2.5)",
            Pollutant::Pm10 => "Particulate matter (PM10)",
            Pollutant::So2 => "Sulphur dioxide",
            Pollutant::No2 => "Nitrogen dioxide",
            Pollutant::Co => "Carbon monoxide",
            Pollutant::O3 => "Ozone",
        }
    }

    pub fn units(&self) -> &'static str {
        "µg/m³"
    }

    /// Slot of this pollutant in per-record value arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Pollutant {
    type Err = ProcessingError;

    /// Accepts the column spelling as well as loose user input such as `pm25` or `no2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(pollutant) = Self::from_column(trimmed) {
            return Ok(pollutant);
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "PM25" => Ok(Pollutant::Pm25),
            "PM10" => Ok(Pollutant::Pm10),
            "SO2" => Ok(Pollutant::So2),
            "NO2" => Ok(Pollutant::No2),
            "CO" => Ok(Pollutant::Co),
            "O3" => Ok(Pollutant::O3),
            _ => Err(ProcessingError::UnknownPollutant(s.to_string())),
        }
    }
}
