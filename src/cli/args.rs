use crate::models::Pollutant;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airq-processor")]
#[command(about = "Air-quality station data: monthly trends, distributions, correlations and exceedance days")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Input ';'-delimited CSV [default: from config, then merged_data.csv]"
    )]
    pub input: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Configuration file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Descriptive statistics for every pollutant column
    Summary,

    /// List the stations present in the input
    Stations,

    /// Monthly mean concentration over the whole time span
    Monthly {
        #[arg(
            short,
            long = "pollutant",
            help = "Pollutant column (repeatable) [default: from config]"
        )]
        pollutants: Vec<Pollutant>,
    },

    /// Histogram of one pollutant plus the records above a percentile
    Distribution {
        #[arg(short, long, help = "Pollutant column [default: SO2]")]
        pollutant: Option<Pollutant>,

        #[arg(short, long, help = "Number of equal-width buckets [default: from config]")]
        bins: Option<usize>,

        #[arg(long, help = "Percentile for the extreme values list [default: from config]")]
        percentile: Option<f64>,

        #[arg(long, default_value = "10", help = "Maximum extreme records to print")]
        show: usize,
    },

    /// Pearson correlation between two pollutants
    Correlation {
        #[arg(short = 'x', long, default_value = "CO")]
        first: Pollutant,

        #[arg(short = 'y', long, default_value = "PM10")]
        second: Pollutant,
    },

    /// Count days on which a pollutant exceeded a threshold at the selected stations
    Exceedance {
        #[arg(
            short,
            long,
            value_delimiter = ',',
            help = "Stations to include [default: from config]"
        )]
        stations: Vec<String>,

        #[arg(long, conflicts_with = "stations", help = "Ignore the station filter")]
        all_stations: bool,

        #[arg(long, help = "First day, YYYY-MM-DD [default: from config]")]
        start: Option<NaiveDate>,

        #[arg(long, help = "Last day, inclusive, YYYY-MM-DD [default: from config]")]
        end: Option<NaiveDate>,

        #[arg(short, long, help = "Pollutant column [default: from config]")]
        pollutant: Option<Pollutant>,

        #[arg(short, long, help = "Threshold in µg/m³ [default: from config]")]
        threshold: Option<f64>,
    },
}
