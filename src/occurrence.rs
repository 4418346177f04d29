use std::sync::{Arc, Weak};

use jiff::{SignedDuration, Timestamp};

/// A single resolved occurrence of a recurring event.
///
/// Equality, ordering and hashing consider only the start and end instants.
/// Occurrences order by start first. The event an occurrence came from is
/// referenced weakly, so holding an occurrence doesn't keep its event alive.
pub struct Occurrence<E> {
    start_time: Timestamp,
    end_time: Timestamp,
    event: Weak<E>,
}

impl<E> Occurrence<E> {
    /// Creates a new occurrence of `event`.
    pub fn new(
        start_time: Timestamp,
        end_time: Timestamp,
        event: &Arc<E>,
    ) -> Occurrence<E> {
        Occurrence { start_time, end_time, event: Arc::downgrade(event) }
    }

    /// Returns the instant at which this occurrence starts.
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Returns the instant at which this occurrence ends.
    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    /// Returns the elapsed time between the start and the end.
    ///
    /// This is negative for an event whose duration points into the past.
    pub fn duration(&self) -> SignedDuration {
        self.end_time.duration_since(self.start_time)
    }

    /// Returns the event this occurrence came from, if it's still alive.
    pub fn event(&self) -> Option<Arc<E>> {
        self.event.upgrade()
    }
}

impl<E> Clone for Occurrence<E> {
    fn clone(&self) -> Occurrence<E> {
        Occurrence {
            start_time: self.start_time,
            end_time: self.end_time,
            event: self.event.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Occurrence<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Occurrence")
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .finish_non_exhaustive()
    }
}

/// Prints this occurrence as an ISO 8601 time interval, e.g.,
/// `2014-01-27T16:00:00Z/2014-01-27T17:00:00Z`.
impl<E> std::fmt::Display for Occurrence<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.start_time, self.end_time)
    }
}

impl<E> PartialEq for Occurrence<E> {
    fn eq(&self, rhs: &Occurrence<E>) -> bool {
        (self.start_time, self.end_time) == (rhs.start_time, rhs.end_time)
    }
}

impl<E> Eq for Occurrence<E> {}

impl<E> PartialOrd for Occurrence<E> {
    fn partial_cmp(&self, rhs: &Occurrence<E>) -> Option<std::cmp::Ordering> {
        Some(self.cmp(rhs))
    }
}

impl<E> Ord for Occurrence<E> {
    fn cmp(&self, rhs: &Occurrence<E>) -> std::cmp::Ordering {
        (self.start_time, self.end_time).cmp(&(rhs.start_time, rhs.end_time))
    }
}

impl<E> std::hash::Hash for Occurrence<E> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.start_time.hash(state);
        self.end_time.hash(state);
    }
}

impl<E> serde::Serialize for Occurrence<E> {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("Occurrence", 2)?;
        s.serialize_field("start_time", &self.start_time)?;
        s.serialize_field("end_time", &self.end_time)?;
        s.end()
    }
}
