pub mod analyzers;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod readers;
pub mod utils;

pub use analyzers::QueryEngine;
pub use error::{ProcessingError, Result};
pub use models::{AirQualityRecord, Dataset, Pollutant};
pub use readers::DatasetLoader;
