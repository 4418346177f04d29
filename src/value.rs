use {
    anyhow::Context,
    jiff::{
        Timestamp, Zoned, civil, fmt,
        tz::{Offset, TimeZone},
    },
};

/// A time value as handed over by a calendar parser.
///
/// Calendar data expresses points in time in a few different shapes. This
/// enumerates every shape we know how to resolve into an absolute instant.
/// See [`TimeResolver::to_instant`](crate::TimeResolver::to_instant) for how
/// each shape is interpreted.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TimeValue {
    /// An absolute instant, e.g., `20140114T180000Z`.
    Instant(Timestamp),
    /// A wall clock datetime with an optional time zone identifier (the
    /// `TZID` parameter) and the offset it was written with (UTC when none
    /// was written).
    DateTime { datetime: civil::DateTime, tzid: Option<String>, offset: Offset },
    /// A calendar date, e.g., an all-day event.
    Date(civil::Date),
    /// Text that has not been interpreted yet, e.g., an `EXDATE` handed
    /// over verbatim.
    Text(String),
}

impl TimeValue {
    /// Creates a wall clock datetime in the time zone with the given
    /// identifier.
    pub fn zoned(datetime: civil::DateTime, tzid: &str) -> TimeValue {
        TimeValue::DateTime {
            datetime,
            tzid: Some(tzid.to_string()),
            offset: Offset::UTC,
        }
    }

    /// Creates a wall clock datetime with no time zone and no offset.
    pub fn floating(datetime: civil::DateTime) -> TimeValue {
        TimeValue::DateTime { datetime, tzid: None, offset: Offset::UTC }
    }

    /// Returns the time zone identifier embedded in this value, if any.
    pub fn tzid(&self) -> Option<&str> {
        match *self {
            TimeValue::DateTime { ref tzid, .. } => tzid.as_deref(),
            _ => None,
        }
    }

    /// Returns true when this value is a date without a time, including
    /// text that parses as one.
    pub(crate) fn is_date(&self) -> bool {
        match *self {
            TimeValue::Date(_) => true,
            TimeValue::Text(ref text) => matches!(
                TimeValue::parse_structured(text),
                Ok(TimeValue::Date(_)),
            ),
            _ => false,
        }
    }

    /// Returns this value in the time zone `tzid` if it's a wall clock
    /// datetime without a time zone of its own.
    ///
    /// Any other value is returned as is.
    pub fn or_zone(&self, tzid: &str) -> TimeValue {
        match *self {
            TimeValue::DateTime { datetime, tzid: None, offset } => {
                TimeValue::DateTime {
                    datetime,
                    tzid: Some(tzid.to_string()),
                    offset,
                }
            }
            ref value => value.clone(),
        }
    }

    /// Interprets text as one of the structured shapes.
    ///
    /// This accepts RFC 3339, RFC 9557 and ISO 8601 datetimes in both the
    /// extended (`2014-01-27T16:00:00`) and basic (`20140127T160000`)
    /// formats:
    ///
    /// * A value with a `Z` or numeric offset and no time zone name is an
    /// instant.
    /// * A value with a time zone annotation, e.g.,
    /// `2014-02-03T16:00:00[America/Los_Angeles]`, is a wall clock datetime
    /// carrying that identifier.
    /// * A value with a time but no offset is a floating wall clock datetime.
    /// * A value with only a date is a date.
    pub(crate) fn parse_structured(s: &str) -> anyhow::Result<TimeValue> {
        let pieces = fmt::temporal::Pieces::parse(s)
            .with_context(|| format!("unrecognized time value `{s}`"))?;
        let date = pieces.date();
        let Some(time) = pieces.time() else {
            anyhow::ensure!(
                pieces.offset().is_none()
                    && pieces.time_zone_annotation().is_none(),
                "date `{s}` cannot carry an offset or time zone",
            );
            return Ok(TimeValue::Date(date));
        };
        let datetime = date.to_datetime(time);
        let offset = match pieces.offset() {
            None => None,
            Some(fmt::temporal::PiecesOffset::Zulu) => Some(Offset::UTC),
            Some(fmt::temporal::PiecesOffset::Numeric(ref off)) => {
                Some(off.offset())
            }
            Some(unk) => {
                anyhow::bail!("unrecognized parsed offset: {unk:?}")
            }
        };
        if let Some(ann) = pieces.time_zone_annotation() {
            let value = match *ann.kind() {
                fmt::temporal::TimeZoneAnnotationKind::Named(ref name) => {
                    TimeValue::DateTime {
                        datetime,
                        tzid: Some(name.as_str().to_string()),
                        offset: offset.unwrap_or(Offset::UTC),
                    }
                }
                fmt::temporal::TimeZoneAnnotationKind::Offset(off) => {
                    let offset = offset.unwrap_or(off);
                    let ts = offset.to_timestamp(datetime).with_context(
                        || format!("`{s}` is out of the supported range"),
                    )?;
                    TimeValue::Instant(ts)
                }
                ref unk => {
                    anyhow::bail!("unrecognized time zone annotation: {unk:?}")
                }
            };
            return Ok(value);
        }
        let Some(offset) = offset else {
            return Ok(TimeValue::floating(datetime));
        };
        let ts = offset.to_timestamp(datetime).with_context(|| {
            format!("`{s}` is out of the supported range")
        })?;
        Ok(TimeValue::Instant(ts))
    }
}

impl From<Timestamp> for TimeValue {
    fn from(ts: Timestamp) -> TimeValue {
        TimeValue::Instant(ts)
    }
}

impl From<Zoned> for TimeValue {
    fn from(zdt: Zoned) -> TimeValue {
        TimeValue::Instant(zdt.timestamp())
    }
}

impl<'a> From<&'a Zoned> for TimeValue {
    fn from(zdt: &'a Zoned) -> TimeValue {
        TimeValue::Instant(zdt.timestamp())
    }
}

impl From<civil::DateTime> for TimeValue {
    fn from(dt: civil::DateTime) -> TimeValue {
        TimeValue::floating(dt)
    }
}

impl From<civil::Date> for TimeValue {
    fn from(date: civil::Date) -> TimeValue {
        TimeValue::Date(date)
    }
}

impl From<String> for TimeValue {
    fn from(text: String) -> TimeValue {
        TimeValue::Text(text)
    }
}

impl<'a> From<&'a str> for TimeValue {
    fn from(text: &'a str) -> TimeValue {
        TimeValue::Text(text.to_string())
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            TimeValue::Instant(ts) => write!(f, "{ts}"),
            TimeValue::DateTime { datetime, ref tzid, offset } => {
                write!(f, "{datetime}")?;
                if offset != Offset::UTC {
                    write!(f, "{offset}")?;
                }
                if let Some(ref tzid) = *tzid {
                    write!(f, "[{tzid}]")?;
                }
                Ok(())
            }
            TimeValue::Date(date) => write!(f, "{date}"),
            TimeValue::Text(ref text) => write!(f, "{text}"),
        }
    }
}

impl std::str::FromStr for TimeValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<TimeValue> {
        TimeValue::parse_structured(s)
    }
}

impl serde::Serialize for TimeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TimeValue {
    #[inline]
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<TimeValue, D::Error> {
        use serde::de;

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = TimeValue;

            fn expecting(
                &self,
                f: &mut core::fmt::Formatter,
            ) -> core::fmt::Result {
                f.write_str("a datetime or date string")
            }

            // Text we can't interpret is kept verbatim instead of being
            // rejected. Whether it's an error depends on how the value is
            // used, and that's decided when it gets resolved.
            #[inline]
            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> Result<TimeValue, E> {
                Ok(TimeValue::parse_structured(value)
                    .unwrap_or_else(|_| TimeValue::Text(value.to_string())))
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// Returns the midnight instant of the given date in `tz`.
pub(crate) fn midnight(
    date: civil::Date,
    tz: &TimeZone,
) -> anyhow::Result<Timestamp> {
    let zdt = date.to_zoned(tz.clone()).with_context(|| {
        format!("midnight of {date} is out of the supported range")
    })?;
    Ok(zdt.timestamp())
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;

    fn parse(s: &str) -> TimeValue {
        s.parse().unwrap()
    }

    #[test]
    fn parse_shapes() {
        assert_eq!(
            parse("20140114T180000Z"),
            TimeValue::Instant("2014-01-14T18:00:00Z".parse().unwrap()),
        );
        assert_eq!(
            parse("2014-01-27T12:55:21-08:00"),
            TimeValue::Instant("2014-01-27T20:55:21Z".parse().unwrap()),
        );
        assert_eq!(
            parse("2014-02-03T16:00:00[America/Los_Angeles]"),
            TimeValue::zoned(
                datetime(2014, 2, 3, 16, 0, 0, 0),
                "America/Los_Angeles",
            ),
        );
        assert_eq!(
            parse("20140203T160000"),
            TimeValue::floating(datetime(2014, 2, 3, 16, 0, 0, 0)),
        );
        assert_eq!(
            parse("2014-01-27T12:55:21[-08:00]"),
            TimeValue::Instant("2014-01-27T20:55:21Z".parse().unwrap()),
        );
        assert_eq!(parse("2014-01-27"), TimeValue::Date(date(2014, 1, 27)));
        assert_eq!(parse("20140127"), TimeValue::Date(date(2014, 1, 27)));
    }

    #[test]
    fn parse_keeps_written_offset_next_to_annotation() {
        let value = parse("2014-01-27T12:55:21+00:00[America/Los_Angeles]");
        assert_eq!(
            value,
            TimeValue::DateTime {
                datetime: datetime(2014, 1, 27, 12, 55, 21, 0),
                tzid: Some("America/Los_Angeles".to_string()),
                offset: Offset::UTC,
            },
        );
        assert_eq!(value.tzid(), Some("America/Los_Angeles"));
    }

    #[test]
    fn or_zone_only_touches_floating_values() {
        let floating = parse("20140203T160000");
        assert_eq!(
            floating.or_zone("America/Los_Angeles"),
            TimeValue::zoned(
                datetime(2014, 2, 3, 16, 0, 0, 0),
                "America/Los_Angeles",
            ),
        );
        let zoned = parse("2014-02-03T16:00:00[Europe/Amsterdam]");
        assert_eq!(zoned.or_zone("America/Los_Angeles"), zoned);
        let instant = parse("20140114T180000Z");
        assert_eq!(instant.or_zone("America/Los_Angeles"), instant);
    }

    #[test]
    fn dates() {
        assert!(parse("2014-01-27").is_date());
        assert!(TimeValue::Text("20140127".to_string()).is_date());
        assert!(!parse("20140127T000000").is_date());
        assert!(!TimeValue::Text("someday".to_string()).is_date());
    }

    #[test]
    fn parse_errors() {
        insta::assert_snapshot!(
            "tomorrow-ish".parse::<TimeValue>().unwrap_err().to_string(),
            @"unrecognized time value `tomorrow-ish`",
        );
    }

    #[test]
    fn display() {
        let values = [
            parse("20140114T180000Z"),
            parse("2014-02-03T16:00:00[America/Los_Angeles]"),
            parse("2014-02-03T16:00:00"),
            parse("2014-01-27"),
            TimeValue::from("next week"),
        ];
        insta::assert_snapshot!(
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n"),
            @r"
        2014-01-14T18:00:00Z
        2014-02-03T16:00:00[America/Los_Angeles]
        2014-02-03T16:00:00
        2014-01-27
        next week
        ",
        );
    }

    #[test]
    fn deserialize_keeps_unrecognized_text() {
        let values: Vec<TimeValue> =
            serde_json::from_str(r#"["2014-01-28", "not a date"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                TimeValue::Date(date(2014, 1, 28)),
                TimeValue::Text("not a date".to_string()),
            ],
        );
    }
}
