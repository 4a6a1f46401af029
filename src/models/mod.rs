pub mod dataset;
pub mod pollutant;
pub mod record;

pub use dataset::Dataset;
pub use pollutant::Pollutant;
pub use record::{timestamp_from_parts, AirQualityRecord, AirQualityRecordBuilder};
