use std::sync::Arc;

use jiff::{Timestamp, civil::DateTime, tz::TimeZone};

use crate::{
    error::Error,
    timezone::{TimezoneOffset, ZoneSource, strip_quotes},
    value::{self, TimeValue},
};

/// Resolves time zone identifiers and time values into absolute instants.
///
/// A resolver is cheap to clone and may be shared freely across threads.
/// By default, it consults Jiff's bundled copy of the IANA Time Zone
/// Database.
#[derive(Clone, Debug)]
pub struct TimeResolver {
    zones: Arc<dyn ZoneSource>,
}

impl TimeResolver {
    /// Creates a resolver that looks up time zones in the given source.
    pub fn new<S: ZoneSource + 'static>(zones: S) -> TimeResolver {
        TimeResolver { zones: Arc::new(zones) }
    }

    /// Looks up a time zone by identifier, ignoring one layer of
    /// surrounding quotes.
    pub fn time_zone(&self, tzid: &str) -> Option<TimeZone> {
        self.zones.lookup(strip_quotes(tzid))
    }

    /// Returns the offset from UTC in effect for `tzid` at `moment`.
    ///
    /// When `moment` is `None`, the current time is used. (See
    /// [`now`](crate::now).) This returns `None` if the identifier doesn't
    /// correspond to a known time zone.
    pub fn timezone_offset_at(
        &self,
        tzid: &str,
        moment: Option<Timestamp>,
    ) -> Option<TimezoneOffset> {
        let tz = self.time_zone(tzid)?;
        let moment = moment.unwrap_or_else(crate::now);
        Some(TimezoneOffset::at(&tz, moment))
    }

    /// Resolves any supported time value into an absolute instant.
    ///
    /// * An instant is returned unchanged.
    /// * A wall clock datetime carrying a known time zone identifier is
    /// interpreted in that zone. The offset used is the one in effect at
    /// that wall clock time, so a value just after a DST transition gets
    /// the post-transition offset. This differs from taking the offset in
    /// effect at the start of the value's date only on days with a
    /// transition. A wall clock time in a gap moves forward and one in a
    /// fold takes the earlier offset. Otherwise, the offset the value was
    /// written with is used.
    /// * A date is midnight UTC.
    /// * Text is parsed into one of the above.
    pub fn to_instant(&self, value: &TimeValue) -> Result<Timestamp, Error> {
        match *value {
            TimeValue::Instant(ts) => Ok(ts),
            TimeValue::DateTime { datetime, ref tzid, offset } => {
                if let Some(tzid) = tzid.as_deref() {
                    if let Some(tz) = self.time_zone(tzid) {
                        return Ok(tz
                            .to_ambiguous_timestamp(datetime)
                            .compatible()?);
                    }
                    log::debug!(
                        "unknown time zone `{tzid}` on `{value}`, \
                         using its written offset `{offset}`",
                    );
                }
                Ok(offset.to_timestamp(datetime)?)
            }
            TimeValue::Date(date) => {
                value::midnight(date, &TimeZone::UTC).map_err(|err| {
                    Error::UnsupportedTimeValue(format!("{err:#}"))
                })
            }
            TimeValue::Text(ref text) => {
                let parsed = TimeValue::parse_structured(text).map_err(|err| {
                    Error::UnsupportedTimeValue(format!("{err:#}"))
                })?;
                self.to_instant(&parsed)
            }
        }
    }

    /// Converts a raw occurrence, as produced by recurrence expansion, into
    /// a pair of absolute instants.
    ///
    /// When `tzid` names a known time zone, both `raw_start` and `raw_end`
    /// are interpreted as wall clock times in that zone. Each is converted
    /// on its own, so an occurrence spanning a DST transition gets a
    /// different offset for its start and its end. Wall clock times that
    /// fall in a gap are moved forward by the length of the gap, and those
    /// that fall in a fold resolve to the earlier instant.
    ///
    /// Otherwise, both values are treated as UTC and a diagnostic saying
    /// why is attached to the result.
    pub fn convert_occurrence_to_zoned(
        &self,
        raw_start: DateTime,
        raw_end: DateTime,
        tzid: Option<&str>,
    ) -> Result<Resolved<(Timestamp, Timestamp)>, Error> {
        let (tz, diagnostic) = self.frame(tzid);
        let start = tz.to_ambiguous_timestamp(raw_start).compatible()?;
        let end = tz.to_ambiguous_timestamp(raw_end).compatible()?;
        Ok(Resolved { value: (start, end), diagnostic })
    }

    /// Returns the frame in which raw occurrences for `tzid` are expanded,
    /// along with a diagnostic when it had to fall back to UTC.
    pub(crate) fn frame(
        &self,
        tzid: Option<&str>,
    ) -> (TimeZone, Option<Diagnostic>) {
        match tzid {
            None => (TimeZone::UTC, Some(Diagnostic::MissingTimeZone)),
            Some(tzid) => match self.time_zone(tzid) {
                Some(tz) => (tz, None),
                None => (
                    TimeZone::UTC,
                    Some(Diagnostic::UnknownTimeZone {
                        tzid: strip_quotes(tzid).to_string(),
                    }),
                ),
            },
        }
    }
}

impl Default for TimeResolver {
    fn default() -> TimeResolver {
        TimeResolver::new(jiff::tz::db().clone())
    }
}

/// A value along with an optional note about how it was degraded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub diagnostic: Option<Diagnostic>,
}

/// Why a time zone could not be used and UTC was used instead.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Diagnostic {
    /// The event has no time zone identifier.
    MissingTimeZone,
    /// The event's time zone identifier isn't in the time zone database.
    UnknownTimeZone { tzid: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Diagnostic::MissingTimeZone => {
                write!(f, "no time zone given, treating times as UTC")
            }
            Diagnostic::UnknownTimeZone { ref tzid } => write!(
                f,
                "unknown time zone `{tzid}`, treating times as UTC",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::{
        civil::{date, datetime},
        tz::Offset,
    };

    use crate::timezone::StaticZones;

    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn offset(tzid: &str, moment: &str) -> Option<String> {
        TimeResolver::default()
            .timezone_offset_at(tzid, Some(ts(moment)))
            .map(|o| o.to_string())
    }

    #[test]
    fn offsets_at_moments() {
        let la = "America/Los_Angeles";
        assert_eq!(offset(la, "2014-01-01T00:00:00Z").unwrap(), "-08:00");
        assert_eq!(offset(la, "2014-05-01T00:00:00Z").unwrap(), "-07:00");
        assert_eq!(
            offset("Europe/Amsterdam", "2014-01-01T00:00:00Z").unwrap(),
            "+01:00",
        );
        assert_eq!(offset("GMT", "2014-01-01T00:00:00Z").unwrap(), "+00:00");
        assert_eq!(
            offset("\"America/Los_Angeles\"", "2014-01-01T00:00:00Z").unwrap(),
            "-08:00",
        );
        assert_eq!(offset("Foo/Bar", "2014-01-01T00:00:00Z"), None);
    }

    #[test]
    fn offsets_around_fall_back() {
        let la = "America/Los_Angeles";
        assert_eq!(offset(la, "2014-11-02T08:59:59Z").unwrap(), "-07:00");
        assert_eq!(offset(la, "2014-11-02T09:01:00Z").unwrap(), "-08:00");
    }

    #[test]
    fn offset_defaults_to_now() {
        let resolver = TimeResolver::default();
        assert!(resolver.timezone_offset_at("UTC", None).is_some());
        assert!(resolver.timezone_offset_at("Foo/Bar", None).is_none());
    }

    #[test]
    fn to_instant_shapes() {
        let r = TimeResolver::default();
        let instant = ts("2014-01-14T18:00:00Z");
        assert_eq!(r.to_instant(&TimeValue::Instant(instant)).unwrap(), instant);

        // The written offset is ignored in favor of the time zone.
        let value = TimeValue::DateTime {
            datetime: datetime(2014, 1, 27, 12, 55, 21, 0),
            tzid: Some("America/Los_Angeles".to_string()),
            offset: Offset::UTC,
        };
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-01-27T20:55:21Z"));

        let value = TimeValue::DateTime {
            datetime: datetime(2014, 1, 27, 12, 55, 21, 0),
            tzid: None,
            offset: Offset::constant(-5),
        };
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-01-27T17:55:21Z"));

        let value = TimeValue::Date(date(2014, 1, 27));
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-01-27T00:00:00Z"));

        let value = TimeValue::from("2014-01-27T12:55:21-08:00");
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-01-27T20:55:21Z"));
    }

    #[test]
    fn to_instant_uses_offset_at_the_value_itself() {
        let r = TimeResolver::default();
        // Daylight saving time starts on 2014-03-09 in Los Angeles, so noon
        // that day is already at -07:00 even though midnight was at -08:00.
        let value = TimeValue::zoned(
            datetime(2014, 3, 9, 12, 0, 0, 0),
            "America/Los_Angeles",
        );
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-03-09T19:00:00Z"));
    }

    #[test]
    fn to_instant_unknown_zone_uses_written_offset() {
        let r = TimeResolver::default();
        let value = TimeValue::DateTime {
            datetime: datetime(2014, 1, 27, 12, 0, 0, 0),
            tzid: Some("Foo/Bar".to_string()),
            offset: Offset::constant(2),
        };
        assert_eq!(r.to_instant(&value).unwrap(), ts("2014-01-27T10:00:00Z"));
    }

    #[test]
    fn to_instant_rejects_unrecognized_text() {
        let r = TimeResolver::default();
        let err = r.to_instant(&TimeValue::from("someday")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTimeValue(_)));
        assert!(
            err.to_string().starts_with(
                "unsupported time value: unrecognized time value `someday`"
            ),
            "{err}",
        );
    }

    #[test]
    fn convert_in_zone() {
        let r = TimeResolver::default();
        let got = r
            .convert_occurrence_to_zoned(
                datetime(2014, 2, 3, 16, 0, 0, 0),
                datetime(2014, 2, 3, 17, 0, 0, 0),
                Some("America/Los_Angeles"),
            )
            .unwrap();
        assert_eq!(got.diagnostic, None);
        assert_eq!(
            got.value,
            (ts("2014-02-04T00:00:00Z"), ts("2014-02-04T01:00:00Z")),
        );
    }

    #[test]
    fn convert_across_transition_uses_two_offsets() {
        let r = TimeResolver::default();
        let got = r
            .convert_occurrence_to_zoned(
                datetime(2014, 3, 8, 12, 0, 0, 0),
                datetime(2014, 3, 9, 12, 0, 0, 0),
                Some("America/Los_Angeles"),
            )
            .unwrap();
        assert_eq!(
            got.value,
            (ts("2014-03-08T20:00:00Z"), ts("2014-03-09T19:00:00Z")),
        );
    }

    #[test]
    fn convert_gap_and_fold() {
        let r = TimeResolver::default();
        // 02:30 doesn't exist on 2014-03-09 and 01:30 happens twice on
        // 2014-11-02.
        let got = r
            .convert_occurrence_to_zoned(
                datetime(2014, 3, 9, 2, 30, 0, 0),
                datetime(2014, 11, 2, 1, 30, 0, 0),
                Some("America/Los_Angeles"),
            )
            .unwrap();
        assert_eq!(
            got.value,
            (ts("2014-03-09T10:30:00Z"), ts("2014-11-02T08:30:00Z")),
        );
    }

    #[test]
    fn convert_falls_back_to_utc() {
        let r = TimeResolver::default();
        let (start, end) =
            (datetime(2014, 2, 3, 16, 0, 0, 0), datetime(2014, 2, 3, 17, 0, 0, 0));

        let got = r.convert_occurrence_to_zoned(start, end, None).unwrap();
        assert_eq!(got.diagnostic, Some(Diagnostic::MissingTimeZone));
        assert_eq!(
            got.value,
            (ts("2014-02-03T16:00:00Z"), ts("2014-02-03T17:00:00Z")),
        );

        let got = r
            .convert_occurrence_to_zoned(start, end, Some("'Foo/Bar'"))
            .unwrap();
        insta::assert_snapshot!(
            got.diagnostic.unwrap(),
            @"unknown time zone `Foo/Bar`, treating times as UTC",
        );
        assert_eq!(got.value.0, ts("2014-02-03T16:00:00Z"));
    }

    #[test]
    fn custom_zone_source() {
        let zones = StaticZones::new()
            .with("Test/Plus3", TimeZone::fixed(Offset::constant(3)));
        let r = TimeResolver::new(zones);
        let got = r.timezone_offset_at("test/plus3", Some(Timestamp::UNIX_EPOCH));
        assert_eq!(got.unwrap().to_string(), "+03:00");
        assert!(r.timezone_offset_at("America/Los_Angeles", None).is_none());
    }
}
