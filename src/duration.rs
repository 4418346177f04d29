use anyhow::Context;

/// The length of an event, expressed in whole units.
///
/// Calendar data describes the length of an event either with an explicit
/// end or with a duration like `PT1H`. This is the latter, broken down by
/// unit. A duration marked as `past` points backwards in time.
///
/// A `Duration` parses from an ISO 8601 duration (`PT1H30M`, `-P1W`) or
/// from Jiff's "friendly" format (`1h30m`, `1 week ago`). Years and months
/// are rejected since they don't have a fixed length in seconds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Serialize)]
pub struct Duration {
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub days: i64,
    pub weeks: i64,
    pub past: bool,
}

impl Duration {
    /// Returns the signed number of seconds in this duration.
    ///
    /// Days and weeks are always 24 and 168 hours respectively. The result
    /// is negative when this duration is in the past.
    pub fn seconds(&self) -> i64 {
        let total = self
            .seconds
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.hours.saturating_mul(3_600))
            .saturating_add(self.days.saturating_mul(86_400))
            .saturating_add(self.weeks.saturating_mul(604_800));
        if self.past { total.saturating_neg() } else { total }
    }

    /// Returns this duration as a signed absolute duration.
    pub fn to_signed_duration(&self) -> jiff::SignedDuration {
        jiff::SignedDuration::from_secs(self.seconds())
    }

    fn from_span(span: jiff::Span) -> anyhow::Result<Duration> {
        anyhow::ensure!(
            span.get_years() == 0 && span.get_months() == 0,
            "duration `{span}` has calendar units (years or months), \
             which have no fixed length",
        );
        anyhow::ensure!(
            span.get_milliseconds() == 0
                && span.get_microseconds() == 0
                && span.get_nanoseconds() == 0,
            "duration `{span}` has units smaller than a second",
        );
        Ok(Duration {
            seconds: span.get_seconds().abs(),
            minutes: span.get_minutes().abs(),
            hours: i64::from(span.get_hours()).abs(),
            days: i64::from(span.get_days()).abs(),
            weeks: i64::from(span.get_weeks()).abs(),
            past: span.is_negative(),
        })
    }
}

/// Returns the signed number of seconds in the given duration, or `0` when
/// there is no duration.
pub fn compute_duration_seconds(duration: Option<&Duration>) -> i64 {
    duration.map_or(0, |d| d.seconds())
}

impl std::str::FromStr for Duration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Duration> {
        let span = parse_iso_or_friendly(s)?;
        Duration::from_span(span)
            .with_context(|| format!("invalid event duration `{s}`"))
    }
}

impl<'de> serde::Deserialize<'de> for Duration {
    #[inline]
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        use serde::de;

        #[derive(serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Units {
            #[serde(default)]
            seconds: i64,
            #[serde(default)]
            minutes: i64,
            #[serde(default)]
            hours: i64,
            #[serde(default)]
            days: i64,
            #[serde(default)]
            weeks: i64,
            #[serde(default)]
            past: bool,
        }

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Duration;

            fn expecting(
                &self,
                f: &mut core::fmt::Formatter,
            ) -> core::fmt::Result {
                f.write_str("a duration string or a map of duration units")
            }

            #[inline]
            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> Result<Duration, E> {
                value.parse().map_err(|err| de::Error::custom(format!("{err:#}")))
            }

            fn visit_map<A: de::MapAccess<'de>>(
                self,
                map: A,
            ) -> Result<Duration, A::Error> {
                let units: Units = serde::Deserialize::deserialize(
                    de::value::MapAccessDeserializer::new(map),
                )?;
                Ok(Duration {
                    seconds: units.seconds,
                    minutes: units.minutes,
                    hours: units.hours,
                    days: units.days,
                    weeks: units.weeks,
                    past: units.past,
                })
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Parses either an ISO 8601 duration or a "friendly" duration into a
/// `Span`.
///
/// The two formats have non-overlapping prefixes. Aside from an optional
/// sign, an ISO 8601 duration always starts with a `P` or `p`.
fn parse_iso_or_friendly(s: &str) -> anyhow::Result<jiff::Span> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        anyhow::bail!(
            "an empty string is not a valid duration, \
             expected either a ISO 8601 or Jiff's 'friendly' format",
        );
    }
    let mut first = bytes[0];
    if first == b'+' || first == b'-' {
        if bytes.len() == 1 {
            anyhow::bail!(
                "found nothing after sign `{s}`, \
                 which is not a valid duration, \
                 expected either a ISO 8601 or Jiff's 'friendly' format",
            );
        }
        first = bytes[1];
    }
    if first == b'P' || first == b'p' {
        Ok(jiff::fmt::temporal::SpanParser::new().parse_span(bytes)?)
    } else {
        Ok(jiff::fmt::friendly::SpanParser::new().parse_span(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_per_unit() {
        let d = Duration { hours: 1, ..Duration::default() };
        assert_eq!(compute_duration_seconds(Some(&d)), 3_600);

        let d = Duration {
            seconds: 1,
            minutes: 1,
            hours: 1,
            days: 1,
            weeks: 1,
            past: false,
        };
        assert_eq!(d.seconds(), 1 + 60 + 3_600 + 86_400 + 604_800);

        let d = Duration { days: 2, past: true, ..Duration::default() };
        assert_eq!(compute_duration_seconds(Some(&d)), -172_800);

        assert_eq!(compute_duration_seconds(None), 0);
        assert_eq!(compute_duration_seconds(Some(&Duration::default())), 0);
    }

    #[test]
    fn parse() {
        let d: Duration = "PT1H30M".parse().unwrap();
        assert_eq!(d, Duration { hours: 1, minutes: 30, ..Duration::default() });

        let d: Duration = "-P1W".parse().unwrap();
        assert_eq!(d, Duration { weeks: 1, past: true, ..Duration::default() });
        assert_eq!(d.seconds(), -604_800);

        let d: Duration = "2 days ago".parse().unwrap();
        assert_eq!(d, Duration { days: 2, past: true, ..Duration::default() });

        let d: Duration = "45m".parse().unwrap();
        assert_eq!(d.seconds(), 2_700);
    }

    #[test]
    fn parse_errors() {
        insta::assert_snapshot!(
            "P1M".parse::<Duration>().unwrap_err(),
            @"invalid event duration `P1M`",
        );
        insta::assert_snapshot!(
            "".parse::<Duration>().unwrap_err(),
            @"an empty string is not a valid duration, expected either a ISO 8601 or Jiff's 'friendly' format",
        );
        insta::assert_snapshot!(
            "-".parse::<Duration>().unwrap_err(),
            @"found nothing after sign `-`, which is not a valid duration, expected either a ISO 8601 or Jiff's 'friendly' format",
        );
    }

    #[test]
    fn deserialize_string_or_map() {
        let d: Duration = serde_json::from_str(r#""PT15M""#).unwrap();
        assert_eq!(d.seconds(), 900);

        let d: Duration =
            serde_json::from_str(r#"{"hours": 2, "past": true}"#).unwrap();
        assert_eq!(d.seconds(), -7_200);

        assert!(serde_json::from_str::<Duration>(r#"{"fortnights": 1}"#)
            .is_err());
    }
}
