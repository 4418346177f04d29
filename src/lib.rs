/*!
Resolve recurring calendar events into concrete occurrences.

Given an event's recurrence metadata (rules, exception dates, start and end
or duration, and an optional time zone identifier), this crate produces the
time ordered list of occurrences within a requested window. Every occurrence
is resolved to an absolute instant, with daylight saving time handled
separately for its start and its end.

The entry point is a [`Scheduler`], which hands out one memoized
[`Schedule`] per event:

```
use std::sync::Arc;

use occur::{EventData, Scheduler};

let event: EventData = r#"{
    "start": "2014-01-27",
    "rrules": [{"frequency": "DAILY"}],
    "exdates": ["2014-01-28"]
}"#
.parse()?;
let event = Arc::new(event);

let scheduler = Scheduler::default();
let schedule = scheduler.schedule(&event);
let occurrences = schedule.occurrences_between(
    jiff::civil::date(2014, 1, 27),
    jiff::civil::date(2014, 1, 29),
)?;
let starts: Vec<String> =
    occurrences.iter().map(|o| o.start_time().to_string()).collect();
assert_eq!(starts, ["2014-01-27T00:00:00Z", "2014-01-29T00:00:00Z"]);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

use std::sync::LazyLock;

use {anyhow::Context, jiff::Timestamp};

pub use crate::{
    config::Config,
    duration::{Duration, compute_duration_seconds},
    error::Error,
    event::{Event, EventData},
    occurrence::Occurrence,
    resolve::{Diagnostic, Resolved, TimeResolver},
    rule::{
        ByDay, Frequency, RawRule, RecurrenceRule, RecurrenceRuleBuilder,
        RuleTranslator, aggregate_by_day, build_recurrence_rule,
        parse_by_day_token,
    },
    schedule::{Descriptor, Schedule, Scheduler},
    timezone::{StaticZones, TimezoneOffset, ZoneSource},
    value::TimeValue,
};

mod config;
mod duration;
mod error;
mod event;
mod expand;
pub mod logger;
mod occurrence;
mod resolve;
mod rule;
mod schedule;
mod timezone;
mod value;
mod week;

/// A pinned "current time," read once from `OCCUR_NOW`.
///
/// When the environment variable isn't set (or is invalid), this is `None`
/// and the system clock is consulted on every call to [`now`].
static NOW: LazyLock<Option<Timestamp>> =
    LazyLock::new(|| match read_env_occur_now() {
        Ok(Some(ts)) => {
            log::trace!(
                "pinning current time to `{ts}` from `OCCUR_NOW` \
                 environment variable",
            );
            Some(ts)
        }
        Ok(None) => {
            log::trace!(
                "`OCCUR_NOW` environment variable not set, using \
                 system clock",
            );
            None
        }
        Err(err) => {
            log::warn!(
                "reading `OCCUR_NOW` failed, using system clock: {err:#}",
            );
            None
        }
    });

/// Returns the current time.
///
/// This is the default moment used when resolving time zone offsets. It can
/// be pinned by setting the `OCCUR_NOW` environment variable to an RFC 3339
/// timestamp, which is useful for reproducible output.
pub fn now() -> Timestamp {
    NOW.unwrap_or_else(Timestamp::now)
}

fn read_env_occur_now() -> anyhow::Result<Option<Timestamp>> {
    let Some(val) = std::env::var_os("OCCUR_NOW") else { return Ok(None) };
    let Some(val) = val.to_str() else {
        anyhow::bail!(
            "`OCCUR_NOW` environment variable is not valid UTF-8: {val:?}"
        )
    };
    val.parse::<Timestamp>()
        .context(
            "`OCCUR_NOW` environment variable is not a valid RFC 3339 \
             timestamp",
        )
        .map(Some)
}
