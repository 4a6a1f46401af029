use crate::analyzers::{ColumnSummary, Correlation, QueryEngine, Selection};
use crate::cli::args::{Cli, Commands, OutputFormat};
use crate::config::DashboardConfig;
use crate::models::{Dataset, Pollutant};
use crate::readers::{DatasetLoader, LoadReport};
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref()).context("initialising logging")?;

    let config = DashboardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let input = cli.input.clone().unwrap_or_else(|| config.input_path.clone());

    let progress = ProgressReporter::new_spinner(
        &format!("Loading {}...", input.display()),
        cli.format == OutputFormat::Json,
    );
    let (dataset, report) = match DatasetLoader::new().load_path_with_report(&input) {
        Ok(loaded) => loaded,
        Err(e) => {
            progress.abandon();
            return Err(e).with_context(|| format!("loading {}", input.display()));
        }
    };
    progress.finish_with_message(&format!("Loaded {} records", dataset.len()));

    let engine = QueryEngine::new(&dataset);
    let format = cli.format;

    match cli.command {
        Commands::Summary => summary(&engine, &report, format),

        Commands::Stations => {
            let stations = engine.stations();
            emit(format, &stations, || stations.join("\n"))
        }

        Commands::Monthly { pollutants } => {
            let pollutants = if pollutants.is_empty() {
                vec![default_pollutant(&config)?]
            } else {
                pollutants
            };
            monthly(&engine, &pollutants, format)
        }

        Commands::Distribution {
            pollutant,
            bins,
            percentile,
            show,
        } => distribution(
            &engine,
            pollutant.unwrap_or(Pollutant::So2),
            bins.unwrap_or(config.histogram_bins),
            percentile.unwrap_or(config.extreme_percentile),
            show,
            format,
        ),

        Commands::Correlation { first, second } => {
            let correlation = engine.correlation(first, second)?;
            emit(
                format,
                &json!({
                    "first": first,
                    "second": second,
                    "coefficient": correlation.coefficient(),
                    "result": correlation,
                }),
                || {
                    let strength = correlation_strength(&correlation)
                        .map(|s| format!(" ({})", s))
                        .unwrap_or_default();
                    format!(
                        "Correlation coefficient between {} and {}: {}{}",
                        first, second, correlation, strength
                    )
                },
            )
        }

        Commands::Exceedance {
            stations,
            all_stations,
            start,
            end,
            pollutant,
            threshold,
        } => {
            let stations = if all_stations {
                Vec::new()
            } else if stations.is_empty() {
                config.default_stations.clone()
            } else {
                stations
            };
            let start = start.unwrap_or(config.start_date);
            let end = end.unwrap_or(config.end_date);
            if start > end {
                bail!("start date {} must not be after end date {}", start, end);
            }

            let pollutant = match pollutant {
                Some(p) => p,
                None => default_pollutant(&config)?,
            };
            let threshold = threshold.unwrap_or(config.threshold);

            for station in &stations {
                if !dataset.iter().any(|r| &r.station == station) {
                    warn!(%station, "selected station has no records");
                }
            }

            let selection = Selection::for_dates(stations.iter().cloned(), start, end)?;
            exceedance(&engine, &selection, pollutant, threshold, format)
        }
    }
}

fn default_pollutant(config: &DashboardConfig) -> Result<Pollutant> {
    config
        .default_pollutant
        .parse()
        .context("configured default_pollutant")
}

fn emit<T, F>(format: OutputFormat, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

fn summary(engine: &QueryEngine<'_>, report: &LoadReport, format: OutputFormat) -> Result<()> {
    let dataset: &Dataset = engine.dataset();
    let columns = engine.describe();
    let span = dataset.time_span();

    emit(
        format,
        &json!({
            "records": dataset.len(),
            "rows_read": report.rows_read,
            "rows_dropped": report.rows_dropped(),
            "coerced_cells": report.coerced_cells,
            "missing_columns": report.missing_columns,
            "first_timestamp": span.map(|(first, _)| first),
            "last_timestamp": span.map(|(_, last)| last),
            "stations": engine.stations(),
            "columns": columns,
        }),
        || {
            let range = match span {
                Some((first, last)) => format!("{} to {}", first, last),
                None => "no records".to_string(),
            };
            let mut lines = vec![
                report.summary(),
                format!("Time range: {}", range),
                format!("Stations: {}", engine.stations().join(", ")),
                String::new(),
                ColumnSummary::table_header(),
            ];
            lines.extend(columns.iter().map(ColumnSummary::table_row));
            lines.join("\n")
        },
    )
}

fn monthly(engine: &QueryEngine<'_>, pollutants: &[Pollutant], format: OutputFormat) -> Result<()> {
    let series = pollutants
        .iter()
        .map(|&p| engine.monthly_mean(p).map(|means| (p, means)))
        .collect::<crate::error::Result<Vec<_>>>()?;

    emit(format, &series, || {
        let mut header = format!("{:<8}", "month");
        for pollutant in pollutants {
            header.push_str(&format!(" {:>10}", pollutant.column_name()));
        }

        let months = series.first().map(|(_, m)| m.len()).unwrap_or(0);
        let mut lines = vec![header];
        for i in 0..months {
            let mut line = format!("{:<8}", series[0].1[i].month);
            for (_, means) in &series {
                match means[i].mean {
                    Some(mean) => line.push_str(&format!(" {:>10.2}", mean)),
                    None => line.push_str(&format!(" {:>10}", "-")),
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    })
}

fn distribution(
    engine: &QueryEngine<'_>,
    pollutant: Pollutant,
    bins: usize,
    percentile: f64,
    show: usize,
    format: OutputFormat,
) -> Result<()> {
    let histogram = engine.distribution(pollutant, bins)?;
    let extremes = engine.percentile_extremes(pollutant, percentile)?;

    emit(
        format,
        &json!({ "histogram": histogram, "extremes": extremes }),
        || {
            let mut lines = vec![format!(
                "Distribution of {} ({}), {} values",
                pollutant.display_name(),
                pollutant.units(),
                histogram.total()
            )];
            let peak = histogram.buckets.iter().map(|b| b.count).max().unwrap_or(0);
            for bucket in &histogram.buckets {
                let bar_len = if peak == 0 { 0 } else { bucket.count * 40 / peak };
                lines.push(format!(
                    "{:>10.2} - {:>10.2} {:>8} {}",
                    bucket.lower_bound,
                    bucket.upper_bound,
                    bucket.count,
                    "#".repeat(bar_len)
                ));
            }

            match extremes.threshold {
                Some(limit) => {
                    lines.push(format!(
                        "\n{} records above the {}th percentile ({:.2}):",
                        extremes.records.len(),
                        percentile,
                        limit
                    ));
                    for extreme in extremes.records.iter().take(show) {
                        lines.push(format!(
                            "  {} {:<14} {:.2}",
                            extreme.timestamp, extreme.station, extreme.value
                        ));
                    }
                }
                None => lines.push(format!("\nNo {} values to rank", pollutant)),
            }
            lines.join("\n")
        },
    )
}

fn exceedance(
    engine: &QueryEngine<'_>,
    selection: &Selection,
    pollutant: Pollutant,
    threshold: f64,
    format: OutputFormat,
) -> Result<()> {
    let selected = engine.filter_by_selection(selection)?;
    let days = QueryEngine::new(&selected).exceedance_days(pollutant, threshold)?;
    info!(
        records = selected.len(),
        days = days.len(),
        "exceedance query evaluated"
    );

    let station_label = if selection.stations.is_empty() {
        "all stations".to_string()
    } else {
        selection
            .stations
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    emit(
        format,
        &json!({
            "pollutant": pollutant,
            "threshold": threshold,
            "stations": selection.stations,
            "start": selection.start,
            "end": selection.end,
            "records": selected.len(),
            "exceedance_days": days.len(),
            "days": days,
        }),
        || {
            format!(
                "Days with {} above {} {} at {} from {} to {}: {} days",
                pollutant,
                threshold,
                pollutant.units(),
                station_label,
                selection.start.date(),
                selection.end.date(),
                days.len()
            )
        },
    )
}

fn correlation_strength(correlation: &Correlation) -> Option<&'static str> {
    correlation.coefficient().map(|r| match r.abs() {
        r if r >= 0.7 => "strong",
        r if r >= 0.3 => "moderate",
        _ => "weak",
    })
}
