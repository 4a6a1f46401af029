use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_END_DATE, DEFAULT_EXTREME_PERCENTILE, DEFAULT_HISTOGRAM_BINS,
    DEFAULT_INPUT_FILE, DEFAULT_START_DATE, DEFAULT_STATIONS, DEFAULT_THRESHOLD, ENV_PREFIX,
};
use chrono::NaiveDate;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Defaults for the dashboard questions, layered from built-ins, an optional
/// TOML file and `AIRQ_*` environment variables (later sources win).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DashboardConfig {
    pub input_path: PathBuf,

    pub default_stations: Vec<String>,

    #[validate(length(min = 1))]
    pub default_pollutant: String,

    #[validate(range(min = 0.0))]
    pub threshold: f64,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(range(min = 1, max = 1000))]
    pub histogram_bins: usize,

    #[validate(range(min = 0.0, max = 100.0))]
    pub extreme_percentile: f64,
}

impl DashboardConfig {
    /// Load configuration. `path` names a TOML file; when `None` the default
    /// file name is tried and silently skipped if absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("input_path", DEFAULT_INPUT_FILE)?
            .set_default(
                "default_stations",
                DEFAULT_STATIONS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )?
            .set_default("default_pollutant", "PM2.5")?
            .set_default("threshold", DEFAULT_THRESHOLD)?
            .set_default("start_date", DEFAULT_START_DATE)?
            .set_default("end_date", DEFAULT_END_DATE)?
            .set_default("histogram_bins", DEFAULT_HISTOGRAM_BINS as i64)?
            .set_default("extreme_percentile", DEFAULT_EXTREME_PERCENTILE)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("default_stations"),
            )
            .build()?;

        let config: DashboardConfig = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field-level validation plus the cross-field date order.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if self.start_date > self.end_date {
            return Err(ProcessingError::InvalidParameter(format!(
                "configured start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}
