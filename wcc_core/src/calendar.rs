//! Builds the iCalendar document from the normalized pickup dates.

use chrono::{Datelike, Duration, NaiveDate};
use ical::{
    generator::{Emitter, IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_param, ical_property,
    parser::ical::component::IcalAlarm,
};
use sha2::{Digest, Sha256};

static PROD_ID: [&str; 2] = ["Tømmekalender", "waste-calendar"];
static UID_DOMAIN: &str = "waste-calendar";
static DATE_FORMAT: &str = "%Y%m%d";

/// The reminder fires at this time of day, one day before the pickup.
const REMINDER_HOUR: u32 = 20;

/// All pickup dates of a single material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSchedule {
    pub material: String,
    pub dates: Vec<NaiveDate>,
}

impl MaterialSchedule {
    pub fn new(material: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            material: material.into(),
            dates,
        }
    }
}

/// Serialize the calendar of the given schedules, with CRLF line endings.
pub fn assemble(schedules: &[MaterialSchedule]) -> Vec<u8> {
    build_calendar(schedules)
        .generate()
        .replace("\r\n", "\n")
        .replace('\n', "\r\n")
        .into_bytes()
}

/// Build the calendar with one event per material and date.
pub fn build_calendar(schedules: &[MaterialSchedule]) -> IcalCalendar {
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(prod_id())
        .build();
    for schedule in schedules {
        for date in &schedule.dates {
            calendar.events.push(get_event(&schedule.material, *date));
        }
    }
    calendar
}

/// Build an all day event with a reminder on the evening before.
fn get_event(material: &str, date: NaiveDate) -> IcalEvent {
    let mut event = IcalEvent::new();
    let stamp = january_first_utc(date);
    event.properties = vec![
        ical_property!("UID", uid(material, &date)),
        ical_property!("DTSTAMP", stamp.clone()),
        ical_property!("CREATED", stamp),
        ical_property!(
            "DTSTART",
            date.format(DATE_FORMAT).to_string(),
            ical_param!("VALUE", "DATE")
        ),
        ical_property!(
            "DTEND",
            (date + Duration::days(1)).format(DATE_FORMAT).to_string(),
            ical_param!("VALUE", "DATE")
        ),
        ical_property!("SUMMARY", escape_text(material)),
        ical_property!("TRANSP", "TRANSPARENT"),
        ical_property!("CLASS", "PUBLIC"),
    ];
    event.alarms.push(get_alarm(material, date));
    event
}

fn get_alarm(material: &str, date: NaiveDate) -> IcalAlarm {
    let mut alarm = IcalAlarm::new();
    alarm.properties = vec![
        ical_property!("ACTION", "DISPLAY"),
        ical_property!("DESCRIPTION", escape_text(material)),
        ical_property!("TRIGGER", reminder_trigger()),
    ];
    alarm
}

/// Duration before the start of the all day event at which the reminder fires.
fn reminder_trigger() -> String {
    format!("-PT{}H", 24 - REMINDER_HOUR)
}

/// Escape a TEXT value so provider strings can't break out of their content line.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.replace("\r\n", "\n").chars() {
        match character {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' | '\r' => escaped.push_str("\\n"),
            _ => escaped.push(character),
        }
    }
    escaped
}

/// Events are stamped with the start of their year so that regenerating them changes nothing.
fn january_first_utc(date: NaiveDate) -> String {
    format!("{:04}0101T000000Z", date.year())
}

fn prod_id() -> String {
    let mut strings: Vec<String> = Vec::from(PROD_ID).into_iter().map(String::from).collect();
    strings.splice(0..0, [String::from("-")]);
    strings.join("//")
}

/// Get a unique id for the pickup of a material on a specific date.
///
/// Changing this function is a breaking change!
pub fn uid(material: &str, date: &NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hasher.update(b"\n");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    format!("{}@{UID_DOMAIN}", hex::encode(hasher.finalize()))
}
