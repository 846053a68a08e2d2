use std::fmt;
use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use chrono::{Month, Weekday};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

/// The three cities with published trip data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum City {
    Chicago,
    NewYorkCity,
    Washington,
}

impl City {
    pub const ALL: [City; 3] = [City::Chicago, City::NewYorkCity, City::Washington];

    pub fn name(self) -> &'static str {
        match self {
            City::Chicago => "chicago",
            City::NewYorkCity => "new york city",
            City::Washington => "washington",
        }
    }

    /// Whether this city's export carries the `Gender` and `Birth Year` columns.
    /// Washington's does not.
    pub fn has_demographics(self) -> bool {
        !matches!(self, City::Washington)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Month constraint: a specific calendar month, or no constraint at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthFilter {
    All,
    Month(Month),
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => f.write_str("all"),
            MonthFilter::Month(month) => f.write_str(month.name()),
        }
    }
}

/// Day-of-week constraint, or no constraint at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    All,
    Day(Weekday),
}

impl DayFilter {
    /// Title-cased English day name, as stored in the derived day column.
    pub fn day_name(weekday: Weekday) -> &'static str {
        match weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}

impl fmt::Display for DayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayFilter::All => f.write_str("all"),
            DayFilter::Day(day) => f.write_str(Self::day_name(*day)),
        }
    }
}

/// The validated (city, month, day) triple for one session iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSelection {
    pub city: City,
    pub month: MonthFilter,
    pub day: DayFilter,
}

const MONTHS: [(&str, Month); 12] = [
    ("january", Month::January),
    ("february", Month::February),
    ("march", Month::March),
    ("april", Month::April),
    ("may", Month::May),
    ("june", Month::June),
    ("july", Month::July),
    ("august", Month::August),
    ("september", Month::September),
    ("october", Month::October),
    ("november", Month::November),
    ("december", Month::December),
];

const DAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Parse a city choice, case-insensitively.
pub fn parse_city(input: &str) -> Result<City, String> {
    let normalized = input.trim().to_lowercase();
    City::ALL
        .into_iter()
        .find(|city| city.name() == normalized)
        .ok_or_else(|| reject("city", input, City::ALL.iter().map(|c| c.name())))
}

/// Parse a month choice: "all" or one of the twelve month names.
pub fn parse_month(input: &str) -> Result<MonthFilter, String> {
    let normalized = input.trim().to_lowercase();
    if normalized == "all" {
        return Ok(MonthFilter::All);
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, month)| MonthFilter::Month(*month))
        .ok_or_else(|| {
            reject(
                "month",
                input,
                ["all"].into_iter().chain(MONTHS.iter().map(|(name, _)| *name)),
            )
        })
}

/// Parse a day choice: "all" or one of the seven day names.
pub fn parse_day(input: &str) -> Result<DayFilter, String> {
    let normalized = input.trim().to_lowercase();
    if normalized == "all" {
        return Ok(DayFilter::All);
    }
    DAYS.iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, day)| DayFilter::Day(*day))
        .ok_or_else(|| {
            reject(
                "day",
                input,
                ["all"].into_iter().chain(DAYS.iter().map(|(name, _)| *name)),
            )
        })
}

/// Build the rejection message for an invalid entry, with a fuzzy
/// "did you mean" hint when one of the accepted values scores.
fn reject<'a>(field: &str, input: &str, valid: impl IntoIterator<Item = &'a str>) -> String {
    let shown = input.trim();
    if shown.is_empty() {
        return format!("Please enter a {}.", field);
    }
    let base = format!("'{}' is not a valid {}.", shown, field);
    match closest_match(shown, valid) {
        Some(candidate) => format!("{} Did you mean '{}'?", base, candidate),
        None => format!("{} Try again!", base),
    }
}

fn closest_match<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let matcher = SkimMatcherV2::default();
    candidates
        .into_iter()
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(candidate, input)
                .map(|score| (score, candidate))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, candidate)| candidate)
}

/// One prompt field: pending until its parser accepts a line, then validated.
/// Invalid entries print the parser's message and re-prompt indefinitely.
struct Field<T> {
    name: &'static str,
    prompt: &'static str,
    parse: fn(&str) -> Result<T, String>,
}

impl<T> Field<T> {
    fn resolve<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<T> {
        loop {
            write!(output, "{}", self.prompt)?;
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                bail!("input ended while waiting for a {}", self.name);
            }
            match (self.parse)(line.trim()) {
                Ok(value) => return Ok(value),
                Err(message) => writeln!(output, "{}", message)?,
            }
        }
    }
}

/// Prompt for city, month and day in sequence, re-prompting each field until
/// it validates. Only EOF on the input stream aborts.
pub fn collect_filters<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<FilterSelection> {
    writeln!(output, "🚲 Hello! Let's explore some US bikeshare data!")?;
    let city = Field {
        name: "city",
        prompt: "Enter a city (chicago, new york city, washington): ",
        parse: parse_city,
    }
    .resolve(input, output)?;
    let month = Field {
        name: "month",
        prompt: "Choose a month to analyze, or 'all': ",
        parse: parse_month,
    }
    .resolve(input, output)?;
    let day = Field {
        name: "day",
        prompt: "Choose a day of the week, or 'all': ",
        parse: parse_day,
    }
    .resolve(input, output)?;
    writeln!(output, "{:-<40}", "")?;
    debug!("Filters selected: city={}, month={}, day={}", city, month, day);
    Ok(FilterSelection { city, month, day })
}

/// Ask a yes/no question. Only a case-insensitive "yes" is affirmative;
/// anything else, including EOF, declines.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    writeln!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    Ok(line.trim().eq_ignore_ascii_case("yes"))
}
