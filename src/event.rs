use anyhow::Context;

use crate::{duration::Duration, rule::RawRule, value::TimeValue};

/// The recurrence metadata of a calendar event.
///
/// This is what a calendar parser hands over. The methods here are read on
/// every query, and are assumed to return the same values for the lifetime
/// of the event.
pub trait Event {
    /// The first start of this event.
    fn start(&self) -> &TimeValue;

    /// The first end of this event, if it has an explicit one.
    fn end(&self) -> Option<&TimeValue>;

    /// The length of each occurrence. Used only when there is no end.
    fn duration(&self) -> Option<&Duration>;

    /// The recurrence rules (`RRULE`) of this event.
    fn rrules(&self) -> &[RawRule];

    /// The exception dates (`EXDATE`) of this event.
    fn exdates(&self) -> &[TimeValue];

    /// Additional dates (`RDATE`) on which this event occurs.
    fn rdates(&self) -> &[TimeValue] {
        &[]
    }

    /// The time zone identifier of this event.
    fn tzid(&self) -> Option<&str>;
}

/// An owned event, typically deserialized from JSON.
///
/// Only `start` is required:
///
/// ```
/// use occur::{Event, EventData};
///
/// let event: EventData = r#"{
///     "start": "2014-01-27T16:00:00[America/Los_Angeles]",
///     "duration": "PT1H",
///     "rrules": [{"frequency": "WEEKLY", "by_day": ["MO", "WE", "FR"]}]
/// }"#
/// .parse()?;
/// assert_eq!(event.tzid(), None);
/// assert_eq!(event.start().tzid(), Some("America/Los_Angeles"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventData {
    pub start: TimeValue,
    #[serde(default)]
    pub end: Option<TimeValue>,
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub rrules: Vec<RawRule>,
    #[serde(default)]
    pub exdates: Vec<TimeValue>,
    #[serde(default)]
    pub rdates: Vec<TimeValue>,
    #[serde(default)]
    pub tzid: Option<String>,
}

impl EventData {
    /// Creates a one-off event starting at `start`.
    pub fn new(start: impl Into<TimeValue>) -> EventData {
        EventData {
            start: start.into(),
            end: None,
            duration: None,
            rrules: vec![],
            exdates: vec![],
            rdates: vec![],
            tzid: None,
        }
    }
}

impl Event for EventData {
    fn start(&self) -> &TimeValue {
        &self.start
    }

    fn end(&self) -> Option<&TimeValue> {
        self.end.as_ref()
    }

    fn duration(&self) -> Option<&Duration> {
        self.duration.as_ref()
    }

    fn rrules(&self) -> &[RawRule] {
        &self.rrules
    }

    fn exdates(&self) -> &[TimeValue] {
        &self.exdates
    }

    fn rdates(&self) -> &[TimeValue] {
        &self.rdates
    }

    fn tzid(&self) -> Option<&str> {
        self.tzid.as_deref()
    }
}

impl std::str::FromStr for EventData {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<EventData> {
        serde_json::from_str(s).context("invalid event data")
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn parse_minimal() {
        let event: EventData = r#"{"start": "2014-01-27"}"#.parse().unwrap();
        assert_eq!(*event.start(), TimeValue::Date(date(2014, 1, 27)));
        assert!(event.end().is_none());
        assert!(event.duration().is_none());
        assert!(event.rrules().is_empty());
        assert!(event.exdates().is_empty());
        assert!(event.rdates().is_empty());
        assert!(event.tzid().is_none());
    }

    #[test]
    fn parse_full() {
        let event: EventData = r#"{
            "start": "20140203T160000",
            "end": "20140203T170000",
            "tzid": "America/Los_Angeles",
            "rrules": [{"frequency": "MONTHLY", "interval": 2}],
            "exdates": ["20140403T160000"],
            "rdates": ["2014-02-14T12:00:00Z"]
        }"#
        .parse()
        .unwrap();
        assert_eq!(event.tzid(), Some("America/Los_Angeles"));
        assert_eq!(event.rrules()[0].frequency, "MONTHLY");
        assert_eq!(event.rrules()[0].interval, Some(2));
        assert_eq!(event.exdates().len(), 1);
        assert_eq!(event.rdates().len(), 1);
    }

    #[test]
    fn parse_errors() {
        let err = r#"{"end": "2014-01-27"}"#.parse::<EventData>().unwrap_err();
        assert_eq!(err.to_string(), "invalid event data");
        assert!(format!("{err:#}").contains("missing field `start`"));
        assert!(r#"{"start": "2014-01-27", "summary": "x"}"#
            .parse::<EventData>()
            .is_err());
    }

    #[test]
    fn new_one_off() {
        let event = EventData::new(date(2014, 1, 27).at(9, 0, 0, 0));
        assert_eq!(event.start().to_string(), "2014-01-27T09:00:00");
        assert!(event.rrules().is_empty());
    }
}
