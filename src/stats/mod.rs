use std::time::Instant;

use anyhow::Result;
use chrono::Month;
use polars::prelude::*;

use crate::filters::City;
use crate::loader::{
    COL_BIRTH_YEAR, COL_DAY_OF_WEEK, COL_END_STATION, COL_GENDER, COL_HOUR, COL_MONTH,
    COL_START_STATION, COL_TRIP_DURATION, COL_USER_TYPE,
};

const COUNT_COL: &str = "trip_count";
const NO_DATA_LINE: &str = "No trips match the current filters.\n";

/// Most frequent month, day and start hour.
///
/// Ties between equally frequent values resolve arbitrarily.
pub fn render_time_stats(df: &DataFrame) -> Result<String> {
    let start = Instant::now();
    let mut out = String::from("\n⏰ Calculating the most frequent times of travel...\n\n");
    if df.height() == 0 {
        out.push_str(NO_DATA_LINE);
        out.push_str(&footer(start));
        return Ok(out);
    }

    if let Some((month, trips)) = numeric_counts(df, COL_MONTH)?.into_iter().next() {
        out.push_str(&format!(
            "Most common month: {} ({} trips)\n",
            month_name(month),
            trips
        ));
    }
    if let Some((day, trips)) = category_counts(df, COL_DAY_OF_WEEK)?.into_iter().next() {
        out.push_str(&format!("Most common day: {} ({} trips)\n", day, trips));
    }
    if let Some((hour, trips)) = numeric_counts(df, COL_HOUR)?.into_iter().next() {
        out.push_str(&format!("Most common start hour: {} ({} trips)\n", hour, trips));
    }

    out.push_str(&footer(start));
    Ok(out)
}

/// Most popular start station, end station, and (start, end) pair.
pub fn render_station_stats(df: &DataFrame) -> Result<String> {
    let start = Instant::now();
    let mut out = String::from("\n🚉 Calculating the most popular stations and trip...\n\n");
    if df.height() == 0 {
        out.push_str(NO_DATA_LINE);
        out.push_str(&footer(start));
        return Ok(out);
    }

    if let Some((station, trips)) = category_counts(df, COL_START_STATION)?.into_iter().next() {
        out.push_str(&format!("Most common start station: {} ({} trips)\n", station, trips));
    }
    if let Some((station, trips)) = category_counts(df, COL_END_STATION)?.into_iter().next() {
        out.push_str(&format!("Most common end station: {} ({} trips)\n", station, trips));
    }

    let pairs = value_counts(df, &[COL_START_STATION, COL_END_STATION])?;
    if pairs.height() > 0 {
        let from = display_value(&pairs.column(COL_START_STATION)?.get(0)?);
        let to = display_value(&pairs.column(COL_END_STATION)?.get(0)?);
        let trips = pairs.column(COUNT_COL)?.cast(&DataType::Int64)?.i64()?.get(0);
        if let Some(trips) = trips {
            out.push_str(&format!(
                "Most frequent trip: {} -> {} ({} trips)\n",
                from, to, trips
            ));
        }
    }

    out.push_str(&footer(start));
    Ok(out)
}

/// Total and mean trip duration, in seconds.
pub fn render_duration_stats(df: &DataFrame) -> Result<String> {
    let start = Instant::now();
    let mut out = String::from("\n🕑 Calculating trip duration...\n\n");
    if df.height() == 0 {
        out.push_str(NO_DATA_LINE);
        out.push_str(&footer(start));
        return Ok(out);
    }

    let durations = df.column(COL_TRIP_DURATION)?.cast(&DataType::Float64)?;
    let durations = durations.f64()?;
    match (durations.sum(), durations.mean()) {
        (Some(total), Some(mean)) => {
            out.push_str(&format!(
                "Total travel time: {:.0} seconds ({})\n",
                total,
                humanize_seconds(total as i64)
            ));
            out.push_str(&format!("Mean travel time: {:.1} seconds\n", mean));
        }
        _ => out.push_str("No trip durations recorded for these trips.\n"),
    }

    out.push_str(&footer(start));
    Ok(out)
}

/// Trip counts per user type, and (outside Washington) gender counts and
/// birth-year extremes. Washington's export has no demographic columns, so
/// fixed notices stand in for those sections.
pub fn render_user_stats(df: &DataFrame, city: City) -> Result<String> {
    let start = Instant::now();
    let mut out = String::from("\n👥 Calculating user stats...\n\n");
    if df.height() == 0 {
        out.push_str(NO_DATA_LINE);
        out.push_str(&footer(start));
        return Ok(out);
    }

    out.push_str("Trips by user type:\n");
    push_breakdown(&mut out, &category_counts(df, COL_USER_TYPE)?);

    if city.has_demographics() {
        out.push_str("\nTrips by gender:\n");
        push_breakdown(&mut out, &category_counts(df, COL_GENDER)?);

        let years = df.column(COL_BIRTH_YEAR)?.cast(&DataType::Float64)?;
        let years = years.f64()?;
        match (years.min(), years.max()) {
            (Some(earliest), Some(latest)) => {
                out.push_str(&format!("\nEarliest birth year: {}\n", earliest as i32));
                out.push_str(&format!("Most recent birth year: {}\n", latest as i32));
                if let Some((year, _)) = numeric_year_mode(df)? {
                    out.push_str(&format!("Most common birth year: {}\n", year));
                }
            }
            _ => out.push_str("\nNo birth year values recorded for these trips.\n"),
        }
    } else {
        out.push_str("\nThere is no gender data in the Washington dataset.\n");
        out.push_str("There is no birth year data in the Washington dataset.\n");
    }

    out.push_str(&footer(start));
    Ok(out)
}

/// Category labels with trip counts, most frequent first. Null entries
/// (e.g. blank gender cells) are dropped before counting.
pub fn category_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, i64)>> {
    let counts = value_counts(df, &[column])?;
    let labels = counts.column(column)?;
    let totals = counts.column(COUNT_COL)?.cast(&DataType::Int64)?;
    let totals = totals.i64()?;
    let mut result = Vec::with_capacity(counts.height());
    for idx in 0..counts.height() {
        if let Some(trips) = totals.get(idx) {
            result.push((display_value(&labels.get(idx)?), trips));
        }
    }
    Ok(result)
}

/// Like [`category_counts`] for a `u32` column such as `month` or `hour`.
pub fn numeric_counts(df: &DataFrame, column: &str) -> Result<Vec<(u32, i64)>> {
    let counts = value_counts(df, &[column])?;
    let values = counts.column(column)?.u32()?;
    let totals = counts.column(COUNT_COL)?.cast(&DataType::Int64)?;
    let totals = totals.i64()?;
    let mut result = Vec::with_capacity(counts.height());
    for idx in 0..counts.height() {
        if let (Some(value), Some(trips)) = (values.get(idx), totals.get(idx)) {
            result.push((value, trips));
        }
    }
    Ok(result)
}

/// Group-by-count over the given key columns, highest count first.
fn value_counts(df: &DataFrame, columns: &[&str]) -> PolarsResult<DataFrame> {
    let keys: Vec<Expr> = columns.iter().map(|name| col(name)).collect();
    df.clone()
        .lazy()
        .select(keys.clone())
        .drop_nulls(None)
        .group_by(keys)
        .agg([count().alias(COUNT_COL)])
        .sort(
            COUNT_COL,
            SortOptions {
                descending: true,
                nulls_last: true,
                ..Default::default()
            },
        )
        .collect()
}

fn numeric_year_mode(df: &DataFrame) -> Result<Option<(i32, i64)>> {
    let years = df.column(COL_BIRTH_YEAR)?.cast(&DataType::Float64)?;
    let frame = DataFrame::new(vec![years])?;
    let counts = value_counts(&frame, &[COL_BIRTH_YEAR])?;
    if counts.height() == 0 {
        return Ok(None);
    }
    let year = counts.column(COL_BIRTH_YEAR)?.f64()?.get(0);
    let trips = counts.column(COUNT_COL)?.cast(&DataType::Int64)?.i64()?.get(0);
    Ok(year.zip(trips).map(|(year, trips)| (year as i32, trips)))
}

fn push_breakdown(out: &mut String, counts: &[(String, i64)]) {
    if counts.is_empty() {
        out.push_str("  (none recorded)\n");
    }
    for (label, trips) in counts {
        out.push_str(&format!("  {}: {}\n", label, trips));
    }
}

fn display_value(value: &AnyValue) -> String {
    match value {
        AnyValue::String(text) => (*text).to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        other => other.to_string(),
    }
}

fn month_name(number: u32) -> &'static str {
    Month::try_from(number as u8).map(|month| month.name()).unwrap_or("unknown")
}

fn humanize_seconds(total_seconds: i64) -> String {
    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        format!("{}m {}s", total_seconds / 60, total_seconds % 60)
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    }
}

fn footer(start: Instant) -> String {
    format!("\nComputed in {}ms\n{:-<40}\n", start.elapsed().as_millis(), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn travel_fixture() -> DataFrame {
        df!(
            COL_MONTH => &[3u32, 3, 3, 4, 5],
            COL_DAY_OF_WEEK => &["Monday", "Monday", "Tuesday", "Monday", "Friday"],
            COL_HOUR => &[8u32, 8, 9, 10, 8],
        )
        .unwrap()
    }

    fn empty_fixture() -> DataFrame {
        df!(
            COL_MONTH => Vec::<u32>::new(),
            COL_DAY_OF_WEEK => Vec::<String>::new(),
            COL_HOUR => Vec::<u32>::new(),
            COL_TRIP_DURATION => Vec::<i64>::new(),
            COL_START_STATION => Vec::<String>::new(),
            COL_END_STATION => Vec::<String>::new(),
            COL_USER_TYPE => Vec::<String>::new(),
        )
        .unwrap()
    }

    #[test]
    fn time_stats_report_the_modes() {
        let out = render_time_stats(&travel_fixture()).unwrap();
        assert!(out.contains("Most common month: March (3 trips)"), "got: {out}");
        assert!(out.contains("Most common day: Monday (3 trips)"), "got: {out}");
        assert!(out.contains("Most common start hour: 8 (3 trips)"), "got: {out}");
    }

    #[test]
    fn time_stats_tie_reports_one_of_the_tied_values() {
        // Two months tie; either is an acceptable mode.
        let df = df!(
            COL_MONTH => &[1u32, 2],
            COL_DAY_OF_WEEK => &["Monday", "Monday"],
            COL_HOUR => &[8u32, 8],
        )
        .unwrap();
        let out = render_time_stats(&df).unwrap();
        assert!(
            out.contains("Most common month: January (1 trips)")
                || out.contains("Most common month: February (1 trips)"),
            "got: {out}"
        );
    }

    #[test]
    fn station_stats_report_modes_and_pair() {
        let df = df!(
            COL_START_STATION => &["A", "A", "A", "B"],
            COL_END_STATION => &["B", "B", "C", "B"],
        )
        .unwrap();
        let out = render_station_stats(&df).unwrap();
        assert!(out.contains("Most common start station: A (3 trips)"), "got: {out}");
        assert!(out.contains("Most common end station: B (3 trips)"), "got: {out}");
        assert!(out.contains("Most frequent trip: A -> B (2 trips)"), "got: {out}");
    }

    #[test]
    fn duration_stats_sum_and_mean() {
        let df = df!(COL_TRIP_DURATION => &[100i64, 200, 300]).unwrap();
        let out = render_duration_stats(&df).unwrap();
        assert!(out.contains("Total travel time: 600 seconds"), "got: {out}");
        assert!(out.contains("Mean travel time: 200.0 seconds"), "got: {out}");
    }

    #[test]
    fn user_stats_with_demographics() {
        let df = df!(
            COL_USER_TYPE => &["Subscriber", "Subscriber", "Customer"],
            COL_GENDER => &[Some("Male"), None, Some("Female")],
            COL_BIRTH_YEAR => &[Some(1984.0), Some(1984.0), Some(2000.0)],
        )
        .unwrap();
        let out = render_user_stats(&df, City::Chicago).unwrap();
        assert!(out.contains("Subscriber: 2"), "got: {out}");
        assert!(out.contains("Customer: 1"), "got: {out}");
        assert!(out.contains("Male: 1"), "got: {out}");
        assert!(out.contains("Female: 1"), "got: {out}");
        assert!(out.contains("Earliest birth year: 1984"), "got: {out}");
        assert!(out.contains("Most recent birth year: 2000"), "got: {out}");
        assert!(out.contains("Most common birth year: 1984"), "got: {out}");
    }

    #[test]
    fn washington_user_stats_substitute_fixed_notices() {
        let df = df!(COL_USER_TYPE => &["Subscriber", "Customer", "Customer"]).unwrap();
        let out = render_user_stats(&df, City::Washington).unwrap();
        assert!(out.contains("Customer: 2"), "got: {out}");
        assert!(out.contains("There is no gender data in the Washington dataset."));
        assert!(out.contains("There is no birth year data in the Washington dataset."));
        assert!(!out.contains("Trips by gender"), "got: {out}");
        assert!(!out.contains("birth year:"), "got: {out}");
    }

    #[test]
    fn empty_frames_report_no_data_everywhere() {
        let df = empty_fixture();
        for out in [
            render_time_stats(&df).unwrap(),
            render_station_stats(&df).unwrap(),
            render_duration_stats(&df).unwrap(),
            render_user_stats(&df, City::Chicago).unwrap(),
        ] {
            assert!(out.contains("No trips match the current filters."), "got: {out}");
        }
    }

    #[test]
    fn category_counts_drop_nulls_and_sort_descending() {
        let df = df!(
            COL_GENDER => &[Some("Male"), Some("Female"), Some("Male"), None],
        )
        .unwrap();
        let counts = category_counts(&df, COL_GENDER).unwrap();
        assert_eq!(counts, vec![("Male".to_string(), 2), ("Female".to_string(), 1)]);
    }
}
