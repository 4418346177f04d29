use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use jiff::{SignedDuration, Timestamp, civil::DateTime};

use crate::{
    config::Config,
    duration::compute_duration_seconds,
    error::Error,
    event::Event,
    expand::Recurrence,
    occurrence::Occurrence,
    resolve::{Diagnostic, TimeResolver},
    rule::{RecurrenceRule, RuleTranslator},
    value::TimeValue,
};

/// The canonical recurrence description of an event.
///
/// Every time value has been resolved to an absolute instant and every rule
/// has been translated. This is rebuilt from the event on every query.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Descriptor {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub rules: Vec<RecurrenceRule>,
    /// Sorted and deduplicated.
    pub exceptions: Vec<Timestamp>,
    /// Sorted and deduplicated.
    pub additions: Vec<Timestamp>,
}

/// The occurrences of a single event.
///
/// A schedule is usually obtained from a [`Scheduler`], which hands out one
/// schedule per event.
pub struct Schedule<E> {
    event: Arc<E>,
    resolver: TimeResolver,
    config: Config,
}

impl<E: Event> Schedule<E> {
    /// Creates a schedule for `event`.
    pub fn new(
        event: Arc<E>,
        resolver: TimeResolver,
        config: Config,
    ) -> Schedule<E> {
        Schedule { event, resolver, config }
    }

    /// Returns the event this schedule is for.
    pub fn event(&self) -> &Arc<E> {
        &self.event
    }

    /// Returns the time zone identifier occurrences are computed in.
    ///
    /// This is the event's own identifier, falling back to the one embedded
    /// in its start.
    pub fn tzid(&self) -> Option<&str> {
        self.event.tzid().or_else(|| self.event.start().tzid())
    }

    /// Builds the canonical description of this schedule's event.
    ///
    /// Wall clock values without a time zone of their own are interpreted
    /// in the event's time zone. When the event has no end, each occurrence
    /// lasts for the event's duration (which may be zero or negative).
    pub fn descriptor(&self) -> Result<Descriptor, Error> {
        let start_time = self.to_instant(self.event.start())?;
        let end_time = match self.event.end() {
            Some(end) => self.to_instant(end)?,
            None => {
                let secs = compute_duration_seconds(self.event.duration());
                start_time.checked_add(SignedDuration::from_secs(secs))?
            }
        };
        let translator = RuleTranslator::new(&self.resolver);
        let rules = self
            .event
            .rrules()
            .iter()
            .map(|raw| translator.translate(raw))
            .collect::<Result<Vec<RecurrenceRule>, Error>>()?;
        let exceptions = self.to_instants(self.event.exdates())?;
        let additions = self.to_instants(self.event.rdates())?;
        Ok(Descriptor { start_time, end_time, rules, exceptions, additions })
    }

    /// Returns every occurrence starting within `begin` and `end`
    /// (inclusive), in ascending order.
    pub fn occurrences_between(
        &self,
        begin: impl Into<TimeValue>,
        end: impl Into<TimeValue>,
    ) -> Result<Vec<Occurrence<E>>, Error> {
        let begin = self.resolver.to_instant(&begin.into())?;
        let end = self.resolver.to_instant(&end.into())?;
        self.occurrences(Window::Between { begin, end })
    }

    /// Like [`Schedule::occurrences_between`], but also includes
    /// occurrences that started before `begin` and are still going on at
    /// `begin`.
    pub fn occurrences_spanning(
        &self,
        begin: impl Into<TimeValue>,
        end: impl Into<TimeValue>,
    ) -> Result<Vec<Occurrence<E>>, Error> {
        let begin = self.resolver.to_instant(&begin.into())?;
        let end = self.resolver.to_instant(&end.into())?;
        self.occurrences(Window::Spanning { begin, end })
    }

    /// Returns every occurrence of the event, in ascending order.
    ///
    /// This fails with [`Error::UnboundedRecurrence`] when any rule has
    /// neither a count nor an until bound.
    pub fn all_occurrences(&self) -> Result<Vec<Occurrence<E>>, Error> {
        self.occurrences(Window::All)
    }

    fn occurrences(&self, window: Window) -> Result<Vec<Occurrence<E>>, Error> {
        let desc = self.descriptor()?;
        if matches!(window, Window::All)
            && !desc.rules.iter().all(|rule| rule.is_bounded())
        {
            return Err(Error::UnboundedRecurrence);
        }

        // Dates are midnight UTC, so all-day events are expanded in UTC
        // too. Otherwise their exceptions would no longer line up.
        let all_day = self.event.start().is_date();
        let tzid = if all_day { None } else { self.tzid() };
        let (frame, diagnostic) = self.resolver.frame(tzid);
        match diagnostic {
            None => {}
            Some(Diagnostic::MissingTimeZone) if all_day => {}
            Some(diag @ Diagnostic::MissingTimeZone) => {
                log::debug!("event starting at {}: {diag}", desc.start_time);
            }
            Some(diag @ Diagnostic::UnknownTimeZone { .. }) => {
                log::warn!("event starting at {}: {diag}", desc.start_time);
            }
        }
        let raw_start = frame.to_datetime(desc.start_time);
        let length = frame.to_datetime(desc.end_time).duration_since(raw_start);

        let mut found = vec![];
        if desc.rules.is_empty() {
            found.push((desc.start_time, desc.end_time));
        }
        for rule in desc.rules.iter() {
            let mut rec = Recurrence::new(rule, raw_start, frame.clone())
                .limit(self.config.get_max_candidates());
            if let Some(stop) = window.stop() {
                rec = rec.stop(stop);
            }
            if let Some(begin) = window.earliest_start(length) {
                rec = rec.skip_to(begin);
            }
            for result in rec.iter() {
                let raw = result?;
                log::trace!("rule `{rule}` produced raw occurrence {raw}");
                found.push(self.convert(raw, length, tzid)?);
            }
        }
        for &addition in desc.additions.iter() {
            found.push(self.convert(frame.to_datetime(addition), length, tzid)?);
        }

        found.retain(|&(start, end)| {
            desc.exceptions.binary_search(&start).is_err()
                && window.contains(start, end)
        });
        found.sort();
        found.dedup();
        log::debug!(
            "found {len} occurrences for event starting at {start} in {window}",
            len = found.len(),
            start = desc.start_time,
        );
        Ok(found
            .into_iter()
            .map(|(start, end)| Occurrence::new(start, end, &self.event))
            .collect())
    }

    /// Converts a raw occurrence starting at `raw` into absolute instants.
    fn convert(
        &self,
        raw: DateTime,
        length: SignedDuration,
        tzid: Option<&str>,
    ) -> Result<(Timestamp, Timestamp), Error> {
        let raw_end = raw.checked_add(length)?;
        let resolved =
            self.resolver.convert_occurrence_to_zoned(raw, raw_end, tzid)?;
        Ok(resolved.value)
    }

    fn to_instant(&self, value: &TimeValue) -> Result<Timestamp, Error> {
        match self.tzid() {
            None => self.resolver.to_instant(value),
            Some(tzid) => self.resolver.to_instant(&value.or_zone(tzid)),
        }
    }

    fn to_instants(&self, values: &[TimeValue]) -> Result<Vec<Timestamp>, Error> {
        let mut instants = values
            .iter()
            .map(|value| self.to_instant(value))
            .collect::<Result<Vec<Timestamp>, Error>>()?;
        instants.sort();
        instants.dedup();
        Ok(instants)
    }
}

impl<E> std::fmt::Debug for Schedule<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Which occurrences a query asks for.
#[derive(Clone, Copy, Debug)]
enum Window {
    /// Occurrences starting in `begin..=end`.
    Between { begin: Timestamp, end: Timestamp },
    /// Like `Between`, plus those that started earlier but end after
    /// `begin`.
    Spanning { begin: Timestamp, end: Timestamp },
    All,
}

impl Window {
    /// The instant after which no occurrence can start.
    fn stop(&self) -> Option<Timestamp> {
        match *self {
            Window::Between { end, .. } | Window::Spanning { end, .. } => {
                Some(end)
            }
            Window::All => None,
        }
    }

    /// The earliest instant at which an occurrence lasting `length` could
    /// start and still be part of this window.
    fn earliest_start(&self, length: SignedDuration) -> Option<Timestamp> {
        match *self {
            Window::Between { begin, .. } => Some(begin),
            Window::Spanning { begin, .. } => {
                begin.checked_sub(length.max(SignedDuration::ZERO)).ok()
            }
            Window::All => None,
        }
    }

    fn contains(&self, start: Timestamp, end: Timestamp) -> bool {
        match *self {
            Window::Between { begin, end: stop } => {
                begin <= start && start <= stop
            }
            Window::Spanning { begin, end: stop } => {
                start <= stop && (begin <= start || end > begin)
            }
            Window::All => true,
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Window::Between { begin, end } => write!(f, "[{begin}, {end}]"),
            Window::Spanning { begin, end } => {
                write!(f, "[{begin}, {end}] (spanning)")
            }
            Window::All => write!(f, "all time"),
        }
    }
}

/// Hands out one [`Schedule`] per event.
///
/// Events are identified by the address of their `Arc`. A schedule stays
/// memoized for as long as any handle to it is alive, and since a schedule
/// holds on to its event, an event address can't be reused in the meantime.
/// This assumes the recurrence fields of an event never change after it's
/// been created.
pub struct Scheduler<E> {
    resolver: TimeResolver,
    config: Config,
    schedules: Mutex<HashMap<usize, Weak<Schedule<E>>>>,
}

impl<E: Event> Scheduler<E> {
    /// Creates a scheduler whose schedules use the given resolver and
    /// configuration.
    pub fn new(resolver: TimeResolver, config: Config) -> Scheduler<E> {
        Scheduler { resolver, config, schedules: Mutex::new(HashMap::new()) }
    }

    /// Returns the schedule for `event`, creating it if necessary.
    pub fn schedule(&self, event: &Arc<E>) -> Arc<Schedule<E>> {
        let key = Arc::as_ptr(event) as usize;
        let mut schedules =
            self.schedules.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(schedule) = schedules.get(&key).and_then(Weak::upgrade) {
            return schedule;
        }
        schedules.retain(|_, schedule| schedule.strong_count() > 0);
        let schedule = Arc::new(Schedule::new(
            Arc::clone(event),
            self.resolver.clone(),
            self.config,
        ));
        schedules.insert(key, Arc::downgrade(&schedule));
        log::trace!("created schedule for event at {key:#x}");
        schedule
    }
}

/// Uses Jiff's bundled time zone database and a configuration read from the
/// environment. (See [`Config::from_env`].)
impl<E: Event> Default for Scheduler<E> {
    fn default() -> Scheduler<E> {
        Scheduler::new(TimeResolver::default(), Config::from_env())
    }
}

impl<E> std::fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
