use {
    anyhow::Context,
    jiff::civil::{Date, Weekday},
};

/// Returns the start of the week that the given date resides in.
///
/// The starting point of the week is determined by `start`.
pub(crate) fn first_of_week(start: Weekday, date: Date) -> anyhow::Result<Date> {
    if start == date.weekday() {
        return Ok(date);
    }
    date.nth_weekday(-1, start).with_context(|| {
        format!(
            "failed to find first day of week containing \
             {date}, for weeks starting on {start:?}",
        )
    })
}

/// Returns the end of the week that the given date resides in.
///
/// The starting point of the week is determined by `start`.
pub(crate) fn last_of_week(start: Weekday, date: Date) -> anyhow::Result<Date> {
    let last = start.wrapping_sub(1);
    if last == date.weekday() {
        return Ok(date);
    }
    date.nth_weekday(1, last).with_context(|| {
        format!(
            "failed to find last day of week containing \
             {date}, for weeks starting on {start:?}",
        )
    })
}

#[cfg(test)]
mod tests {
    use jiff::civil::{Weekday::*, date};

    use super::*;

    #[test]
    fn monday_weeks() {
        // 2014-01-29 is a Wednesday.
        let d = date(2014, 1, 29);
        assert_eq!(first_of_week(Monday, d).unwrap(), date(2014, 1, 27));
        assert_eq!(last_of_week(Monday, d).unwrap(), date(2014, 2, 2));

        let monday = date(2014, 1, 27);
        assert_eq!(first_of_week(Monday, monday).unwrap(), monday);
        let sunday = date(2014, 2, 2);
        assert_eq!(last_of_week(Monday, sunday).unwrap(), sunday);
    }

    #[test]
    fn sunday_weeks() {
        let d = date(2014, 1, 29);
        assert_eq!(first_of_week(Sunday, d).unwrap(), date(2014, 1, 26));
        assert_eq!(last_of_week(Sunday, d).unwrap(), date(2014, 2, 1));
    }

    #[test]
    fn boundaries() {
        // -9999-01-01 is a Monday.
        assert!(first_of_week(Monday, Date::MIN).is_ok());
        assert!(first_of_week(Tuesday, Date::MIN).is_err());
        // 9999-12-31 is a Friday.
        assert!(last_of_week(Saturday, Date::MAX).is_ok());
        assert!(last_of_week(Monday, Date::MAX).is_err());
    }
}
