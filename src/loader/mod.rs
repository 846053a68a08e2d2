use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::filters::{DayFilter, FilterSelection, MonthFilter};

pub const COL_START_TIME: &str = "Start Time";
pub const COL_START_STATION: &str = "Start Station";
pub const COL_END_STATION: &str = "End Station";
pub const COL_TRIP_DURATION: &str = "Trip Duration";
pub const COL_USER_TYPE: &str = "User Type";
pub const COL_GENDER: &str = "Gender";
pub const COL_BIRTH_YEAR: &str = "Birth Year";

pub const COL_MONTH: &str = "month";
pub const COL_DAY_OF_WEEK: &str = "day_of_week";
pub const COL_HOUR: &str = "hour";

const COL_WEEKDAY_NUM: &str = "weekday_num";

const REQUIRED_COLUMNS: [&str; 5] = [
    COL_START_TIME,
    COL_START_STATION,
    COL_END_STATION,
    COL_TRIP_DURATION,
    COL_USER_TYPE,
];

/// Fatal dataset failures. These propagate to the session driver uncaught.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no trip data for {city} at {}", path.display())]
    MissingFile {
        city: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read trip data from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("column '{column}' is missing from {}", path.display())]
    MissingColumn { column: String, path: PathBuf },
}

/// Load the selected city's trips, derive the calendar columns from
/// `Start Time`, and apply the month/day filters.
///
/// Month filters use calendar numbering for all twelve months; a month with
/// no coverage in the source data simply yields an empty frame.
pub fn load_trips(catalog: &Catalog, selection: &FilterSelection) -> Result<DataFrame, LoadError> {
    let path = catalog.path_for(selection.city);
    std::fs::metadata(path).map_err(|source| LoadError::MissingFile {
        city: selection.city.to_string(),
        path: path.to_path_buf(),
        source,
    })?;

    let spinner = loading_spinner(&format!("Loading {} trips...", selection.city));
    let df = read_city_csv(path);
    spinner.finish_and_clear();
    let df = df?;
    info!("Read {} trips for {} from {}", df.height(), selection.city, path.display());

    for column in REQUIRED_COLUMNS {
        if !df.get_column_names().contains(&column) {
            return Err(LoadError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    let filtered = derive_and_filter(df, selection).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "{} trips remain after filtering (month: {}, day: {})",
        filtered.height(),
        selection.month,
        selection.day
    );
    Ok(filtered)
}

fn read_city_csv(path: &Path) -> Result<DataFrame, LoadError> {
    let read = |path: &Path| -> PolarsResult<DataFrame> {
        let df = CsvReader::from_path(path)?
            .has_header(true)
            .with_try_parse_dates(true)
            .finish()?;
        // Re-parse by hand if the reader left the timestamps as plain text.
        let needs_parse = matches!(
            df.column(COL_START_TIME).map(|s| s.dtype().clone()),
            Ok(DataType::String)
        );
        if needs_parse {
            parse_start_time(df)
        } else {
            Ok(df)
        }
    };
    read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_start_time(df: DataFrame) -> PolarsResult<DataFrame> {
    df.lazy()
        .with_columns([col(COL_START_TIME).str().to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                format: Some("%Y-%m-%d %H:%M:%S".to_string()),
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        )])
        .collect()
}

/// Add `month`, `day_of_week` and `hour` columns, then narrow to the
/// requested month and day. Derivation happens before filtering so the
/// remaining rows always satisfy the selection exactly.
fn derive_and_filter(df: DataFrame, selection: &FilterSelection) -> PolarsResult<DataFrame> {
    let mut lazy = df.lazy().with_columns([
        col(COL_START_TIME).dt().month().cast(DataType::UInt32).alias(COL_MONTH),
        col(COL_START_TIME)
            .dt()
            .weekday()
            .cast(DataType::UInt32)
            .alias(COL_WEEKDAY_NUM),
        col(COL_START_TIME).dt().hour().cast(DataType::UInt32).alias(COL_HOUR),
    ]);

    if let MonthFilter::Month(month) = selection.month {
        lazy = lazy.filter(col(COL_MONTH).eq(lit(month.number_from_month())));
    }
    if let DayFilter::Day(day) = selection.day {
        lazy = lazy.filter(col(COL_WEEKDAY_NUM).eq(lit(day.number_from_monday())));
    }

    let mut df = lazy.collect()?;
    let day_names: StringChunked = df
        .column(COL_WEEKDAY_NUM)?
        .u32()?
        .into_iter()
        .map(|number| number.map(weekday_name))
        .collect();
    let mut day_names = day_names.into_series();
    day_names.rename(COL_DAY_OF_WEEK);
    df.with_column(day_names)?;
    df.drop(COL_WEEKDAY_NUM)
}

/// ISO weekday number (monday = 1) to the title-cased day name.
fn weekday_name(number: u32) -> &'static str {
    match number {
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        7 => "Sunday",
        _ => "unknown",
    }
}

fn loading_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}").unwrap());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
