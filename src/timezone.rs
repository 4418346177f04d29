use jiff::{
    Timestamp,
    tz::{Offset, TimeZone, TimeZoneDatabase},
};

/// A read-only source of time zones keyed by IANA identifier.
///
/// This is the seam through which all time zone lookups flow. The default
/// implementation is Jiff's process-wide database, which is loaded once and
/// never mutated, so any number of threads may resolve events concurrently.
/// Tests can substitute a [`StaticZones`] for deterministic behavior.
pub trait ZoneSource: std::fmt::Debug + Send + Sync {
    /// Look up the time zone with the given identifier, returning `None`
    /// if it isn't known.
    fn lookup(&self, name: &str) -> Option<TimeZone>;
}

impl ZoneSource for TimeZoneDatabase {
    fn lookup(&self, name: &str) -> Option<TimeZone> {
        match self.get(name) {
            Ok(tz) => Some(tz),
            Err(err) => {
                log::debug!("time zone lookup for `{name}` failed: {err}");
                None
            }
        }
    }
}

/// A fixed, in-memory set of named time zones.
///
/// Names are matched case insensitively, like Jiff's own database.
#[derive(Clone, Debug, Default)]
pub struct StaticZones {
    zones: Vec<(String, TimeZone)>,
}

impl StaticZones {
    /// Creates an empty set of time zones.
    pub fn new() -> StaticZones {
        StaticZones::default()
    }

    /// Adds a time zone under the given name, replacing any existing zone
    /// with the same name.
    pub fn with(mut self, name: &str, tz: TimeZone) -> StaticZones {
        self.zones.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.zones.push((name.to_string(), tz));
        self
    }
}

impl ZoneSource for StaticZones {
    fn lookup(&self, name: &str) -> Option<TimeZone> {
        self.zones
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, tz)| tz.clone())
    }
}

/// The offset from UTC in effect for a time zone at a particular moment.
///
/// This prints as a signed `HH:MM` offset, e.g., `-08:00` or `+05:30`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct TimezoneOffset {
    offset: Offset,
}

impl TimezoneOffset {
    /// Resolves the offset of `tz` at the given instant.
    pub fn at(tz: &TimeZone, moment: Timestamp) -> TimezoneOffset {
        TimezoneOffset { offset: tz.to_offset(moment) }
    }

    /// Returns the signed number of whole minutes from UTC.
    pub fn minutes(&self) -> i32 {
        self.offset.seconds() / 60
    }

    /// Returns the underlying Jiff offset.
    pub fn get(&self) -> Offset {
        self.offset
    }
}

impl From<Offset> for TimezoneOffset {
    fn from(offset: Offset) -> TimezoneOffset {
        TimezoneOffset { offset }
    }
}

impl std::fmt::Display for TimezoneOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let minutes = self.minutes();
        let sign = if minutes < 0 { '-' } else { '+' };
        let minutes = minutes.unsigned_abs();
        write!(f, "{sign}{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

impl serde::Serialize for TimezoneOffset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Strips one leading and one trailing quote character (`"` or `'`).
///
/// Calendar producers frequently emit quoted `TZID` parameters, e.g.,
/// `TZID="America/Los_Angeles"`.
pub(crate) fn strip_quotes(tzid: &str) -> &str {
    let tzid = tzid.strip_prefix(['"', '\'']).unwrap_or(tzid);
    tzid.strip_suffix(['"', '\'']).unwrap_or(tzid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_print_hours_and_minutes() {
        let pst = TimezoneOffset::from(Offset::constant(-8));
        assert_eq!(pst.to_string(), "-08:00");
        assert_eq!(pst.minutes(), -480);

        let ist = TimezoneOffset::from(Offset::from_seconds(19_800).unwrap());
        assert_eq!(ist.to_string(), "+05:30");

        let nfld = TimezoneOffset::from(Offset::from_seconds(-12_600).unwrap());
        assert_eq!(nfld.to_string(), "-03:30");

        assert_eq!(TimezoneOffset::from(Offset::UTC).to_string(), "+00:00");
    }

    #[test]
    fn quotes_are_stripped_once() {
        assert_eq!(strip_quotes("\"America/Los_Angeles\""), "America/Los_Angeles");
        assert_eq!(strip_quotes("'Europe/Paris'"), "Europe/Paris");
        assert_eq!(strip_quotes("Europe/Paris"), "Europe/Paris");
        assert_eq!(strip_quotes("\"\"UTC\"\""), "\"UTC\"");
    }

    #[test]
    fn static_zones_are_case_insensitive() {
        let zones = StaticZones::new()
            .with("Test/Fixed", TimeZone::fixed(Offset::constant(3)))
            .with("test/fixed", TimeZone::fixed(Offset::constant(4)));
        let tz = zones.lookup("TEST/FIXED").unwrap();
        assert_eq!(tz.to_offset(Timestamp::UNIX_EPOCH), Offset::constant(4));
        assert!(zones.lookup("Test/Other").is_none());
    }

    #[test]
    fn jiff_database_lookup() {
        let db = jiff::tz::db();
        assert!(db.lookup("America/Los_Angeles").is_some());
        assert!(db.lookup("Foo/Bar").is_none());
    }
}
