use std::cmp::Ordering;

use jiff::{
    Span, Timestamp,
    civil::{DateTime, Weekday},
    tz::TimeZone,
};

use crate::{
    error::Error,
    rule::{Frequency, RecurrenceRule, weekday_code},
    week::{first_of_week, last_of_week},
};

/// A recurrence rule anchored at a starting point in a local frame.
///
/// This enumerates the raw local datetimes of a single rule. Each datetime
/// is a wall clock time in the frame's time zone. Converting them to
/// absolute instants is left to the caller.
#[derive(Clone, Debug)]
pub(crate) struct Recurrence {
    freq: Frequency,
    civil_start: DateTime,
    tz: TimeZone,
    until: Option<Timestamp>,
    stop: Option<Timestamp>,
    begin: Option<Timestamp>,
    count: Option<u32>,
    interval: Span,
    step: i64,
    by_month: Box<[i8]>,
    // can be negative
    by_month_day: Box<[i8]>,
    by_week_day: Box<[ByWeekday]>,
    week_start: Weekday,
    limit: usize,
}

impl Recurrence {
    pub(crate) fn new(
        rule: &RecurrenceRule,
        start: DateTime,
        tz: TimeZone,
    ) -> Recurrence {
        fn sorted<T: Clone + Ord>(slice: &[T]) -> Box<[T]> {
            let mut vec = slice.to_vec();
            vec.sort();
            vec.dedup();
            vec.into_boxed_slice()
        }

        Recurrence {
            freq: rule.frequency,
            civil_start: start,
            tz,
            until: rule.until,
            stop: None,
            begin: None,
            count: rule.count,
            interval: rule.interval_span(),
            step: i64::from(rule.interval.max(1)),
            by_month: sorted(rule.by_month.as_deref().unwrap_or(&[])),
            by_month_day: sorted(rule.by_month_day.as_deref().unwrap_or(&[])),
            by_week_day: sorted(&rule.by_week_day()),
            week_start: rule.week_start,
            limit: usize::MAX,
        }
    }

    /// Stops iteration at the last datetime at or before the given instant.
    pub(crate) fn stop(mut self, stop: Timestamp) -> Recurrence {
        self.stop = Some(stop);
        self
    }

    /// Skips whole periods that end well before the given instant.
    ///
    /// Datetimes before `begin` may still be yielded. This has no effect on
    /// a recurrence with a count, since that must be counted from its first
    /// datetime.
    pub(crate) fn skip_to(mut self, begin: Timestamp) -> Recurrence {
        self.begin = Some(begin);
        self
    }

    /// Sets the number of candidates that may be examined before iteration
    /// fails.
    pub(crate) fn limit(mut self, limit: usize) -> Recurrence {
        self.limit = limit;
        self
    }

    /// Returns an iterator over all datetimes in this recurrence, in
    /// ascending order.
    pub(crate) fn iter(&self) -> RecurrenceIter<'_> {
        let skipped = self.skipped_attempts();
        RecurrenceIter {
            rec: self,
            set: RecurrenceSet::new(),
            cur: Some((skipped, self.civil_start)),
            resume: skipped > 0,
            emitted: 0,
            examined: 0,
            failed: false,
        }
    }

    /// Returns the index of the last attempt whose period, along with every
    /// period before it, lies entirely before `begin`.
    ///
    /// Two whole intervals are kept as slack, which covers periods that
    /// straddle a calendar boundary and offset changes in the frame.
    fn skipped_attempts(&self) -> i64 {
        if self.count.is_some() {
            return 0;
        }
        let Some(begin) = self.begin else { return 0 };
        let begin = self.tz.to_datetime(begin);
        if begin <= self.civil_start {
            return 0;
        }
        let (start, end) = (self.civil_start.date(), begin.date());
        let years = i64::from(end.year()) - i64::from(start.year());
        let days = || {
            start.until(end).map_or(0, |span| i64::from(span.get_days()))
        };
        let units = match self.freq {
            Frequency::Yearly => years,
            Frequency::Monthly => {
                years * 12 + i64::from(end.month()) - i64::from(start.month())
            }
            Frequency::Weekly => days() / 7,
            Frequency::Daily => days(),
        };
        (units / self.step).saturating_sub(2).max(0)
    }

    /// Converts a wall clock datetime in this frame to an instant.
    ///
    /// Gaps resolve forward and folds resolve to the earlier offset.
    fn instant(&self, dt: DateTime) -> Option<Timestamp> {
        self.tz.to_ambiguous_timestamp(dt).compatible().ok()
    }

    /// Returns the earliest instant at which anything is allowed to be
    /// emitted, if there is such a bound.
    fn bound(&self) -> Option<Timestamp> {
        match (self.until, self.stop) {
            (Some(until), Some(stop)) => Some(until.min(stop)),
            (until, stop) => until.or(stop),
        }
    }
}

/// An expander for a single period of a recurrence.
#[derive(Clone, Debug)]
struct Expander<'a> {
    /// The recurrence we are expanding.
    rec: &'a Recurrence,
    /// The "current" datetime we are expanding.
    ///
    /// How this datetime is used depends on the frequency we are expanding
    /// for.
    cur: DateTime,
}

impl<'a> Expander<'a> {
    /// Expand into the set provided.
    fn expand(&self, set: &mut RecurrenceSet) {
        match self.rec.freq {
            Frequency::Yearly => self.yearly(set),
            Frequency::Monthly => self.monthly(set),
            Frequency::Weekly => self.weekly(set),
            Frequency::Daily => self.daily(set),
        }
        set.canonicalize();
    }

    /// Populate `set` with datetimes according to this rule at a YEARLY
    /// frequency.
    fn yearly(&self, set: &mut RecurrenceSet) {
        set.insert(self.cur);
        if self.has_by_week_day() {
            if self.has_by_month() {
                self.expand_by_month(set);
                self.expand_by_week_day_monthly(set);
            } else {
                self.expand_by_week_day_yearly(set);
            }
            self.limit_by_month_day(set);
        } else if self.has_by_month() {
            self.expand_by_month(set);
            self.expand_by_month_day(set);
        } else if self.has_by_month_day() {
            set.expand(|dt| {
                (1..=12).filter_map(move |month| {
                    dt.with().month(month).day(1).build().ok()
                })
            });
            self.expand_by_month_day(set);
        }
    }

    /// Populate `set` with datetimes according to this rule at a MONTHLY
    /// frequency.
    fn monthly(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_by_month(self.cur) {
            return;
        }
        set.insert(self.cur);
        if self.has_by_week_day() {
            self.expand_by_week_day_monthly(set);
            self.limit_by_month_day(set);
        } else {
            self.expand_by_month_day(set);
        }
    }

    /// Populate `set` with datetimes according to this rule at a WEEKLY
    /// frequency.
    fn weekly(&self, set: &mut RecurrenceSet) {
        // N.B. BYMONTHDAY is not allowed here and BYDAY cannot have a
        // numeric weekday. A week can straddle two months, so BYMONTH is
        // applied to each day after expansion.
        set.insert(self.cur);
        self.expand_by_week_day_weekly(set);
        self.limit_by_month(set);
    }

    /// Populate `set` with datetimes according to this rule at a DAILY
    /// frequency.
    fn daily(&self, set: &mut RecurrenceSet) {
        // N.B. BYDAY cannot have a numeric weekday.
        if !self.satisfies_by_month(self.cur) {
            return;
        }
        if !self.satisfies_by_month_day(self.cur) {
            return;
        }
        if !self.satisfies_by_week_day(self.cur) {
            return;
        }
        set.insert(self.cur);
    }

    fn has_by_month(&self) -> bool {
        !self.rec.by_month.is_empty()
    }

    fn has_by_month_day(&self) -> bool {
        !self.rec.by_month_day.is_empty()
    }

    fn has_by_week_day(&self) -> bool {
        !self.rec.by_week_day.is_empty()
    }

    /// Returns true if and only if the given datetime satisfies the
    /// BYMONTH rule.
    fn satisfies_by_month(&self, dt: DateTime) -> bool {
        !self.has_by_month() || self.rec.by_month.contains(&dt.month())
    }

    /// Returns true if and only if the given datetime satisfies the
    /// BYMONTHDAY rule.
    fn satisfies_by_month_day(&self, dt: DateTime) -> bool {
        if !self.has_by_month_day() {
            return true;
        }
        let positive = dt.day();
        // Minus 1 because -1 is the last day of month, and the days of the
        // month are 1-indexed.
        let negative = positive - 1 - dt.days_in_month();
        self.rec.by_month_day.binary_search(&positive).is_ok()
            || self.rec.by_month_day.binary_search(&negative).is_ok()
    }

    /// Returns true only if the weekday for the given datetime is allowed by
    /// this recurrence rule.
    ///
    /// # Panics
    ///
    /// This panics when this is a numbered weekday. In effect, this shouldn't
    /// be used in contexts where BYDAY can contain numbered weekdays. That
    /// limits this to WEEKLY and DAILY frequencies.
    fn satisfies_by_week_day(&self, dt: DateTime) -> bool {
        if !self.has_by_week_day() {
            return true;
        }
        let wd = dt.weekday();
        self.rec.by_week_day.iter().any(|bywd| bywd.is_match(wd))
    }

    /// Removes any element in the given set whose month is
    /// inconsistent with the BYMONTH rule.
    fn limit_by_month(&self, set: &mut RecurrenceSet) {
        if !self.has_by_month() {
            return;
        }
        set.retain(|dt| self.satisfies_by_month(*dt));
    }

    /// Removes any element in the given set whose day of the month is
    /// inconsistent with the BYMONTHDAY rule.
    fn limit_by_month_day(&self, set: &mut RecurrenceSet) {
        if !self.has_by_month_day() {
            return;
        }
        set.retain(|dt| self.satisfies_by_month_day(*dt));
    }

    fn expand_by_month(&self, set: &mut RecurrenceSet) {
        if !self.has_by_month() {
            return;
        }
        set.expand(|dt| self.iter_by_month(dt))
    }

    fn expand_by_month_day(&self, set: &mut RecurrenceSet) {
        if !self.has_by_month_day() {
            return;
        }
        set.expand(|dt| self.iter_by_month_day(dt))
    }

    fn expand_by_week_day_yearly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_yearly(dt))
    }

    fn expand_by_week_day_monthly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_monthly(dt))
    }

    fn expand_by_week_day_weekly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_weekly(dt))
    }

    /// Returns an iterator over the BYMONTH values in this recurrence rule.
    ///
    /// The values returned are datetimes with each of the corresponding
    /// months. The other parts of the datetime are copied from `dt`.
    fn iter_by_month(&self, dt: DateTime) -> impl Iterator<Item = DateTime> {
        // When a later expansion picks the day, any day that exists in
        // every month works. Otherwise, the day comes from the starting
        // point, and months without that day are skipped.
        let day = if self.has_by_week_day() || self.has_by_month_day() {
            1
        } else {
            self.rec.civil_start.day()
        };
        self.rec.by_month.iter().copied().filter_map(move |month| {
            dt.with().month(month).day(day).build().ok()
        })
    }

    /// Returns an iterator over the BYMONTHDAY values in this recurrence rule.
    ///
    /// This handles any negative month day values according to the number of
    /// days of the month in `dt`.
    fn iter_by_month_day(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let days_in_month = dt.days_in_month();
        self.rec.by_month_day.iter().copied().filter_map(move |mut day| {
            if day.is_negative() {
                // Add 1 because -1 is the last day of month, and the days of
                // the month are 1-indexed.
                day = days_in_month.checked_add(day + 1)?;
            }
            dt.with().day(day).build().ok()
        })
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a YEARLY frequency.
    ///
    /// Negative numbered weekdays count back from the end of the year of
    /// `dt`. Positive ones count forward from its beginning.
    fn iter_by_week_day_yearly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let start = dt.first_of_year();
        let end = dt.last_of_year();
        self.rec
            .by_week_day
            .iter()
            .copied()
            .flat_map(move |weekday| weekday.iter_yearly(start, end))
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a MONTHLY frequency.
    ///
    /// Negative numbered weekdays count back from the end of the month of
    /// `dt`. Positive ones count forward from its beginning.
    fn iter_by_week_day_monthly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let start = dt.first_of_month();
        let end = dt.last_of_month();
        self.rec
            .by_week_day
            .iter()
            .copied()
            .flat_map(move |weekday| weekday.iter_monthly(start, end))
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a WEEKLY frequency.
    ///
    /// The week is the one containing `dt`, with weeks starting on the
    /// rule's WKST.
    fn iter_by_week_day_weekly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let Ok(start) = first_of_week(self.rec.week_start, dt.date()) else {
            return Either::Left(std::iter::empty());
        };
        let Ok(end) = last_of_week(self.rec.week_start, dt.date()) else {
            return Either::Left(std::iter::empty());
        };
        let Ok(start) = dt.with().date(start).build() else {
            return Either::Left(std::iter::empty());
        };
        let Ok(end) = dt.with().date(end).build() else {
            return Either::Left(std::iter::empty());
        };

        Either::Right(
            self.rec
                .by_week_day
                .iter()
                .copied()
                .flat_map(move |weekday| weekday.iter_weekly(start, end)),
        )
    }
}

/// An iterator over the raw local datetimes of a [`Recurrence`].
///
/// Every period stepped over and every candidate examined counts against
/// the recurrence's limit. Once it's exceeded, an error is yielded and
/// iteration stops.
#[derive(Clone, Debug)]
pub(crate) struct RecurrenceIter<'r> {
    rec: &'r Recurrence,
    /// The set of datetimes that we should drain and emit before
    /// incrementing by our interval and refilling the set.
    set: RecurrenceSet,
    /// The interval index along with the current datetime.
    ///
    /// In order to get the next datetime, the interval index should be
    /// incremented by one and then multiplied by the frequency `Span`. This
    /// is done instead of just adding to the previous datetime to avoid
    /// cases where we go from 2025-03-31 -> 2025-04-30 -> 2025-05-30 instead
    /// of 2025-03-31 -> 2025-04-30 -> 2025-05-31.
    ///
    /// When this is `None`, iteration has ceased.
    cur: Option<(i64, DateTime)>,
    /// Set when `cur` is a skipped attempt rather than one to expand.
    resume: bool,
    emitted: u32,
    examined: usize,
    failed: bool,
}

impl<'r> RecurrenceIter<'r> {
    fn expand(&mut self) {
        let Some((_, cur)) = self.cur else { return };
        Expander { rec: self.rec, cur }.expand(&mut self.set);
    }

    fn is_done(&self) -> bool {
        self.failed || (self.cur.is_none() && self.set.is_empty())
    }

    fn finish(&mut self) {
        self.set.clear();
        self.cur = None;
    }

    /// Counts one more unit of work, returning an error when the limit has
    /// been exceeded.
    fn tick(&mut self) -> Result<(), Error> {
        self.examined = self.examined.saturating_add(1);
        if self.examined > self.rec.limit {
            log::debug!(
                "recurrence from {start} exceeded candidate limit of {limit}",
                start = self.rec.civil_start,
                limit = self.rec.limit,
            );
            self.failed = true;
            self.finish();
            return Err(Error::ExpansionLimitExceeded { limit: self.rec.limit });
        }
        Ok(())
    }

    /// Returns the earliest wall clock time at which a datetime generated
    /// for the period containing `dt` could occur.
    fn period_floor(&self, dt: DateTime) -> Option<DateTime> {
        let floor = match self.rec.freq {
            Frequency::Yearly => dt.first_of_year(),
            Frequency::Monthly => dt.first_of_month(),
            Frequency::Weekly => {
                let date = first_of_week(self.rec.week_start, dt.date()).ok()?;
                dt.with().date(date).build().ok()?
            }
            Frequency::Daily => dt,
        };
        Some(floor.start_of_day())
    }

    fn increment(&mut self) -> Result<Option<(i64, DateTime)>, Error> {
        let Some((mut attempt, orig)) = self.cur else { return Ok(None) };
        let rec = self.rec;
        loop {
            self.tick()?;
            let Some(next_attempt) = attempt.checked_add(1) else {
                return Ok(None);
            };
            attempt = next_attempt;
            let Ok(interval) = rec.interval.checked_mul(attempt) else {
                return Ok(None);
            };
            let Ok(next) = rec.civil_start.checked_add(interval) else {
                return Ok(None);
            };
            // Nothing in the period of `next` can come before the start of
            // that period. Once that is past every bound, no later period
            // can produce anything either. This bounds our work even when
            // the recurrence set stays empty.
            if let Some(bound) = rec.bound() {
                let Some(floor) = self.period_floor(next) else {
                    return Ok(None);
                };
                let Ok(floor) = rec.tz.to_ambiguous_timestamp(floor).earlier()
                else {
                    return Ok(None);
                };
                if floor > bound {
                    return Ok(None);
                }
            }
            // In cases where we add N years or N months, the day number can
            // change. For example, in Jiff, 2024-02-29 + 1 year = 2025-02-28.
            // But RFC 5545 wants us to treat it like 2025-02-29, which
            // is invalid and thus ignore such things. So we assume the
            // "constraining" behavior of Jiff occurs when the result's day
            // number is not equal to the one we started with.
            //
            // We track the number of attempts and multiply our `Span`
            // instead of adding to the previous datetime, since constraining
            // is infectious: once at 2025-02-28, adding 3 years will never
            // get back to a leap day.
            //
            // The exception is when expansion picks the day itself (instead
            // of taking it from the start). Then the constrained datetime
            // only serves to identify the period.
            match rec.freq {
                Frequency::Yearly if next.day() != orig.day() => {
                    if rec.by_month.is_empty()
                        && rec.by_month_day.is_empty()
                        && rec.by_week_day.is_empty()
                    {
                        continue;
                    }
                }
                Frequency::Monthly if next.day() != orig.day() => {
                    if rec.by_week_day.is_empty() && rec.by_month_day.is_empty()
                    {
                        continue;
                    }
                }
                _ => {}
            }
            return Ok(Some((attempt, next)));
        }
    }

    /// Pops the next datetime from the current set that passes every
    /// constraint, or `None` when the set is exhausted.
    ///
    /// When a constraint implies that nothing after the popped datetime can
    /// be emitted either, iteration is finished.
    fn pop(&mut self) -> Result<Option<DateTime>, Error> {
        let rec = self.rec;
        while let Some(dt) = self.set.pop() {
            self.tick()?;
            // For simplicity of implementation, the expander may create
            // datetimes before our starting point. Since this can generally
            // only happen in the first period, we just filter them here.
            if dt < rec.civil_start {
                continue;
            }
            let Some(instant) = rec.instant(dt) else {
                self.finish();
                return Ok(None);
            };
            if rec.bound().is_some_and(|bound| instant > bound) {
                // Since we always move forward in time, we'll never be able
                // to return any other datetime.
                self.finish();
                return Ok(None);
            }
            self.emitted = self.emitted.saturating_add(1);
            if rec.count.is_some_and(|count| self.emitted >= count) {
                self.finish();
            }
            return Ok(Some(dt));
        }
        Ok(None)
    }

    fn step(&mut self) -> Result<Option<DateTime>, Error> {
        if std::mem::take(&mut self.resume) {
            self.cur = self.increment()?;
        }
        while !self.is_done() {
            if let Some(dt) = self.pop()? {
                return Ok(Some(dt));
            }
            if self.is_done() {
                break;
            }
            self.expand();
            self.cur = self.increment()?;
        }
        Ok(None)
    }
}

impl<'r> Iterator for RecurrenceIter<'r> {
    type Item = Result<DateTime, Error>;

    fn next(&mut self) -> Option<Result<DateTime, Error>> {
        if self.failed {
            return None;
        }
        self.step().transpose()
    }
}

impl<'r> std::iter::FusedIterator for RecurrenceIter<'r> {}

/// The datetimes generated for the current period, kept in descending order
/// so that the earliest can be popped off the end.
#[derive(Clone, Debug)]
struct RecurrenceSet {
    civil: Vec<DateTime>,
}

impl RecurrenceSet {
    fn new() -> RecurrenceSet {
        RecurrenceSet { civil: vec![] }
    }

    fn is_empty(&self) -> bool {
        self.civil.is_empty()
    }

    fn insert(&mut self, dt: DateTime) {
        self.civil.push(dt);
    }

    fn clear(&mut self) {
        self.civil.clear();
    }

    fn retain(&mut self, predicate: impl FnMut(&mut DateTime) -> bool) {
        self.civil.retain_mut(predicate);
    }

    fn expand<E, I>(&mut self, expand: E)
    where
        E: Fn(DateTime) -> I,
        I: Iterator<Item = DateTime>,
    {
        // We're going to replace every datetime in the set at this point
        // with its expansion provided by the closure. So record how many
        // datetimes we have now. At the end, we'll drain them in one swoop.
        let len = self.civil.len();
        for i in 0..len {
            self.civil.extend(expand(self.civil[i]));
        }
        self.civil.drain(..len);
    }

    fn canonicalize(&mut self) {
        self.civil.sort_by(|dt1, dt2| dt1.cmp(dt2).reverse());
        self.civil.dedup();
    }

    fn pop(&mut self) -> Option<DateTime> {
        self.civil.pop()
    }
}

/// A type describing "day of week" inputs.
///
/// This implements `Ord` even though the actual order of weekdays cannot be
/// determined unless the _start_ of the week is known. We implement it only
/// to make it easy to sort and de-duplicate collections containing a
/// `ByWeekday`. We never rely on its ordering for generating datetimes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ByWeekday {
    Any(Weekday),
    Numbered { nth: i8, weekday: Weekday },
}

impl ByWeekday {
    /// Returns true if and only if the given weekday matches this one.
    ///
    /// # Panics
    ///
    /// This panics when this is a numbered weekday. Rule construction
    /// rejects numbered weekdays at every frequency where this is used.
    fn is_match(&self, wd: Weekday) -> bool {
        match *self {
            ByWeekday::Any(weekday) => weekday == wd,
            _ => unreachable!(),
        }
    }

    /// Return an iterator of weekdays, at yearly frequency, within the given
    /// range of datetimes.
    ///
    /// Generally speaking, `start` should be the first day of a year and `end`
    /// should be the last day of that same year.
    ///
    /// When this is a numbered weekday, then a positive number is interpreted
    /// relative to the start and a negative number is interpreted relative to
    /// the end. Either way, the iterator returned yields at most one element
    /// (but may yield zero).
    fn iter_yearly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                Either::Left(iter_weekdays_between(weekday, start, end))
            }
            ByWeekday::Numbered { nth, weekday } => {
                let nth = if start.weekday() != weekday {
                    nth
                } else if nth == 1 {
                    return Either::Right(Some(start).into_iter());
                } else if nth == -1 {
                    return Either::Right(Some(end).into_iter());
                } else {
                    nth - nth.signum()
                };
                let from = if nth < 0 { end } else { start };
                let found = from
                    .nth_weekday(i32::from(nth), weekday)
                    .ok()
                    .filter(|dt| start <= *dt && *dt <= end);
                Either::Right(found.into_iter())
            }
        }
    }

    /// Return an iterator of weekdays, at monthly frequency, within the given
    /// range of datetimes.
    ///
    /// Generally speaking, `start` should be the first day of a month and
    /// `end` should be the last day of that same month.
    fn iter_monthly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                Either::Left(iter_weekdays_between(weekday, start, end))
            }
            ByWeekday::Numbered { nth, weekday } => Either::Right(
                start.nth_weekday_of_month(nth, weekday).ok().into_iter(),
            ),
        }
    }

    /// Return an iterator of weekdays, at weekly frequency, within the given
    /// range of datetimes.
    ///
    /// # Panics
    ///
    /// When this `ByWeekday` is `Numbered`. RFC 5545 doesn't permit that
    /// construction at anything other than YEARLY and MONTHLY frequency.
    fn iter_weekly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                iter_weekdays_between(weekday, start, end)
            }
            // Prevented by recurrence rule construction.
            ByWeekday::Numbered { .. } => unreachable!(),
        }
    }
}

impl Ord for ByWeekday {
    fn cmp(&self, rhs: &ByWeekday) -> Ordering {
        match (*self, *rhs) {
            (ByWeekday::Any(lhs), ByWeekday::Any(rhs)) => {
                lhs.to_monday_one_offset().cmp(&rhs.to_monday_one_offset())
            }
            (
                ByWeekday::Numbered { nth: lhs_nth, weekday: lhs_weekday },
                ByWeekday::Numbered { nth: rhs_nth, weekday: rhs_weekday },
            ) => {
                let lhs = (lhs_nth, lhs_weekday.to_monday_one_offset());
                let rhs = (rhs_nth, rhs_weekday.to_monday_one_offset());
                lhs.cmp(&rhs)
            }
            (ByWeekday::Any(_), ByWeekday::Numbered { .. }) => Ordering::Less,
            (ByWeekday::Numbered { .. }, ByWeekday::Any(_)) => {
                Ordering::Greater
            }
        }
    }
}

impl PartialOrd for ByWeekday {
    fn partial_cmp(&self, rhs: &ByWeekday) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl std::fmt::Display for ByWeekday {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ByWeekday::Any(weekday) => f.write_str(weekday_code(weekday)),
            ByWeekday::Numbered { nth, weekday } => {
                write!(f, "{nth}{}", weekday_code(weekday))
            }
        }
    }
}

/// A simple `Either` type for easy construction of `impl Iterator`.
///
/// Specifically, this is useful when it's supremely annoying to write a
/// single iterator chain when it would be more naturally written using case
/// analysis.
enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R, I> Iterator for Either<L, R>
where
    L: Iterator<Item = I>,
    R: Iterator<Item = I>,
{
    type Item = I;

    fn next(&mut self) -> Option<I> {
        match *self {
            Either::Left(ref mut it) => it.next(),
            Either::Right(ref mut it) => it.next(),
        }
    }
}

/// Returns an iterator for every weekday between `start` and `end` (inclusive).
fn iter_weekdays_between(
    weekday: Weekday,
    start: DateTime,
    end: DateTime,
) -> impl Iterator<Item = DateTime> {
    (start.weekday() == weekday).then_some(start).into_iter().chain({
        let mut cur = start.nth_weekday(1, weekday).ok();
        std::iter::from_fn(move || {
            let next = cur.take()?;
            if next > end {
                return None;
            }
            cur = next.nth_weekday(1, weekday).ok();
            Some(next)
        })
    })
}
