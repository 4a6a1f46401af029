/// Input file layout
pub const FIELD_DELIMITER: u8 = b';';
pub const STATION_COLUMN: &str = "station";
pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";
pub const DAY_COLUMN: &str = "day";
pub const HOUR_COLUMN: &str = "hour";
pub const TIME_COLUMNS: [&str; 4] = [YEAR_COLUMN, MONTH_COLUMN, DAY_COLUMN, HOUR_COLUMN];

/// Dashboard defaults
pub const DEFAULT_INPUT_FILE: &str = "merged_data.csv";
pub const DEFAULT_CONFIG_FILE: &str = "airq.toml";
pub const DEFAULT_THRESHOLD: f64 = 75.0; // µg/m³, daily PM2.5 guideline used by the dashboard
pub const DEFAULT_STATIONS: [&str; 2] = ["Dingling", "Changping"];
pub const DEFAULT_START_DATE: &str = "2016-01-01";
pub const DEFAULT_END_DATE: &str = "2017-12-31";
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;
pub const DEFAULT_EXTREME_PERCENTILE: f64 = 95.0;

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const ENV_PREFIX: &str = "AIRQ";
