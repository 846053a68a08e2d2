use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::info;

use crate::catalog::Catalog;
use crate::filters::{collect_filters, confirm};
use crate::loader;
use crate::paginate;
use crate::plotting::TripPlotter;
use crate::stats;

/// Drives the interactive loop: filters, load, raw data, the four reports,
/// optional plots, restart. Nothing carries over between iterations.
pub struct Session {
    catalog: Catalog,
}

impl Session {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Run session iterations until the user declines to restart.
    /// A dataset load failure is fatal and propagates out.
    pub fn run<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<()> {
        loop {
            self.run_once(input, output)?;
            if !confirm(input, output, "\nWould you like to restart? (yes/no)")? {
                writeln!(output, "Goodbye!")?;
                break;
            }
        }
        Ok(())
    }

    fn run_once<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<()> {
        let selection = collect_filters(input, output)?;
        info!(
            "Exploring {} trips (month: {}, day: {})",
            selection.city, selection.month, selection.day
        );

        let df = loader::load_trips(&self.catalog, &selection)?;

        paginate::page_raw_data(input, output, &df)?;
        write!(output, "{}", stats::render_time_stats(&df)?)?;
        write!(output, "{}", stats::render_station_stats(&df)?)?;
        write!(output, "{}", stats::render_duration_stats(&df)?)?;
        write!(output, "{}", stats::render_user_stats(&df, selection.city)?)?;

        if confirm(input, output, "\nWould you like to see these statistics as plots? (yes/no)")? {
            let plotter = TripPlotter::new();
            write!(output, "{}", plotter.render_all(&df)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::City;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    const FIXTURE_CSV: &str = "\
Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
2017-03-06 08:01:00,2017-03-06 08:14:00,776,Station A,Station B,Subscriber,Male,1984
2017-03-06 08:30:00,2017-03-06 08:35:00,300,Station A,Station C,Subscriber,Female,1990
2017-03-07 09:15:00,2017-03-07 09:17:00,100,Station B,Station C,Customer,Male,1984
2017-04-10 10:00:00,2017-04-10 10:03:00,200,Station A,Station B,Subscriber,Female,
2017-05-12 08:45:00,2017-05-12 08:50:00,300,Station C,Station B,Customer,Male,1975
2017-03-13 17:20:00,2017-03-13 17:28:00,500,Station D,Station B,Subscriber,Female,1990
2017-06-01 08:05:00,2017-06-01 08:11:00,400,Station A,Station C,Subscriber,Male,1984
2017-01-02 12:00:00,2017-01-02 12:02:00,120,Station B,Station A,Customer,,2000
";

    fn fixture_session(name: &str) -> (Session, PathBuf) {
        let path = std::env::temp_dir().join(format!("bikeshare-session-{}-{}", std::process::id(), name));
        std::fs::write(&path, FIXTURE_CSV).unwrap();
        let catalog = Catalog::with_data_dir(Path::new(".")).with_source(City::Chicago, &path);
        (Session::new(catalog), path)
    }

    #[test]
    fn march_session_reports_the_expected_modes() {
        // March rows: Mar 6 (Mon, 8h), Mar 6 (Mon, 8h), Mar 7 (Tue, 9h),
        // Mar 13 (Mon, 17h).
        let (session, _path) = fixture_session("march.csv");
        let mut input = Cursor::new("chicago\nmarch\nall\nno\nno\nno\n");
        let mut output = Vec::new();
        session.run(&mut input, &mut output).unwrap();
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("Most common month: March (4 trips)"), "got: {transcript}");
        assert!(transcript.contains("Most common day: Monday (3 trips)"), "got: {transcript}");
        assert!(transcript.contains("Most common start hour: 8 (2 trips)"), "got: {transcript}");
        assert!(transcript.contains("Goodbye!"));
    }

    #[test]
    fn invalid_filter_input_reprompts_within_the_session() {
        let (session, _path) = fixture_session("reprompt.csv");
        let mut input = Cursor::new("boston\nchicago\nall\nall\nno\nno\nno\n");
        let mut output = Vec::new();
        session.run(&mut input, &mut output).unwrap();
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("'boston' is not a valid city"), "got: {transcript}");
        assert!(transcript.contains("Most common month:"), "got: {transcript}");
    }

    #[test]
    fn restart_runs_a_second_iteration() {
        let (session, _path) = fixture_session("restart.csv");
        let mut input = Cursor::new(
            "chicago\nmarch\nall\nno\nno\nyes\nchicago\nall\nall\nno\nno\nno\n",
        );
        let mut output = Vec::new();
        session.run(&mut input, &mut output).unwrap();
        let transcript = String::from_utf8(output).unwrap();
        assert_eq!(transcript.matches("Hello! Let's explore").count(), 2);
        assert!(transcript.contains("Goodbye!"));
    }

    #[test]
    fn missing_data_file_is_fatal() {
        let catalog = Catalog::with_data_dir(Path::new("/nonexistent-bikeshare-dir"));
        let session = Session::new(catalog);
        let mut input = Cursor::new("chicago\nall\nall\n");
        let mut output = Vec::new();
        let error = session.run(&mut input, &mut output).unwrap_err();
        assert!(error.to_string().contains("no trip data"), "got: {error}");
    }

    #[test]
    fn uncovered_month_still_completes_with_no_data_notices() {
        let (session, _path) = fixture_session("july.csv");
        let mut input = Cursor::new("chicago\njuly\nall\nno\nno\nno\n");
        let mut output = Vec::new();
        session.run(&mut input, &mut output).unwrap();
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("No trips match the current filters."), "got: {transcript}");
        assert!(transcript.contains("Goodbye!"));
    }
}
