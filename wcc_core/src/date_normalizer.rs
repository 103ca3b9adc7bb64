//! Turns the provider's free text pickup dates into calendar dates.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::error::{Error, Result};

/// What the provider lists for a material without any scheduled pickups.
///
/// This is literal text of the provider and must be checked against the live service.
pub static NO_PICKUPS_SENTINEL: &str = "Ingen planlagte tømninger";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Dates(Vec<NaiveDate>),
    /// The provider explicitly says there are no pickups; the material is dropped.
    NoSchedule,
}

fn date_regex() -> &'static Regex {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    DATE_REGEX.get_or_init(|| {
        Regex::new(
            r"(?x)
                (?P<day>\d{2}) # the day
                -
                (?P<month>\d{2}) # the month
                -
                (?P<year>\d{4}) # the year
            ",
        )
        .expect("the date regex is valid")
    })
}

/// Normalize the raw date strings of a single material.
pub fn normalize(raw_dates: &[String], sentinel: &str) -> Result<Normalized> {
    if let [only] = raw_dates {
        if only.trim() == sentinel {
            return Ok(Normalized::NoSchedule);
        }
    }
    raw_dates
        .iter()
        .map(|raw| parse_date(raw))
        .collect::<Result<Vec<NaiveDate>>>()
        .map(Normalized::Dates)
}

/// Find the first `DD-MM-YYYY` date anywhere in the text.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    date_regex()
        .captures(raw)
        .and_then(date_from_captures)
        .ok_or_else(|| Error::MalformedDate {
            raw: raw.to_string(),
        })
}

fn date_from_captures(captures: Captures) -> Option<NaiveDate> {
    let day: u32 = captures["day"].parse().ok()?;
    let month: u32 = captures["month"].parse().ok()?;
    let year: i32 = captures["year"].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
