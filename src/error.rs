/// The error type for all fallible operations in this crate.
///
/// Every variant is fatal for the query that produced it. Notably, an
/// unknown time zone identifier is *not* represented here. Time zone lookup
/// failures degrade gracefully instead (see
/// [`TimeResolver::convert_occurrence_to_zoned`](crate::TimeResolver::convert_occurrence_to_zoned)).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A recurrence rule record could not be translated. For example, an
    /// unrecognized frequency or weekday code.
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
    /// A time value could not be interpreted as any supported shape.
    #[error("unsupported time value: {0}")]
    UnsupportedTimeValue(String),
    /// Every occurrence was requested, but at least one rule has neither a
    /// `COUNT` nor an `UNTIL` bound.
    #[error(
        "cannot enumerate all occurrences of a recurrence without \
         a count or until bound (use a bounded window instead)"
    )]
    UnboundedRecurrence,
    /// The expansion engine examined more candidates than permitted.
    #[error(
        "recurrence expansion exceeded the limit of {limit} candidates \
         (narrow the requested window)"
    )]
    ExpansionLimitExceeded { limit: usize },
    /// Datetime arithmetic overflowed the range supported by Jiff.
    #[error(transparent)]
    Time(#[from] jiff::Error),
}

impl Error {
    /// Converts a validation error (built with `anyhow`) into an invalid
    /// rule error, keeping its full context chain in the message.
    pub(crate) fn invalid_rule(err: anyhow::Error) -> Error {
        Error::InvalidRule(format!("{err:#}"))
    }
}
