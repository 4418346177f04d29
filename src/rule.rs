use std::sync::LazyLock;

use {
    anyhow::Context,
    jiff::{Span, Timestamp, ToSpan, civil::Weekday},
    regex::Regex,
};

use crate::{
    error::Error, expand::ByWeekday, resolve::TimeResolver, value::TimeValue,
};

/// A recurrence rule as handed over by a calendar parser.
///
/// Every field is kept in its raw, uninterpreted form. This corresponds to
/// a single `RRULE` property, e.g.,
/// `FREQ=MONTHLY;INTERVAL=2;BYDAY=1SA;COUNT=5`.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct RawRule {
    pub frequency: String,
    pub interval: Option<i32>,
    pub by_month: Option<Vec<i8>>,
    pub by_month_day: Option<Vec<String>>,
    pub by_day: Option<Vec<String>>,
    pub until: Option<TimeValue>,
    pub count: Option<u32>,
    pub week_start: Option<String>,
}

/// The canonical form of a single recurrence rule.
///
/// This is what a [`RawRule`] becomes after translation. Every value has
/// been interpreted and checked against the structural constraints of RFC
/// 5545. For example, numbered weekdays only appear at monthly or yearly
/// frequency.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: i32,
    pub by_month: Option<Vec<i8>>,
    pub by_month_day: Option<Vec<i8>>,
    pub by_day: Option<ByDay>,
    pub until: Option<Timestamp>,
    pub count: Option<u32>,
    #[serde(serialize_with = "serialize_weekday")]
    pub week_start: Weekday,
}

impl RecurrenceRule {
    /// Returns a builder for constructing a `RecurrenceRule`.
    ///
    /// The frequency is the only thing required to create a rule.
    pub fn builder(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder::new(freq)
    }

    /// Returns true when this rule has a finite number of occurrences.
    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    /// Returns the span between consecutive periods of this rule.
    pub(crate) fn interval_span(&self) -> Span {
        // Validated on construction.
        self.frequency.to_span(self.interval).unwrap_or_else(|_| 1.day())
    }

    /// Returns every BYDAY value of this rule in the form used for
    /// expansion.
    pub(crate) fn by_week_day(&self) -> Vec<ByWeekday> {
        self.by_day.as_ref().map(|d| d.by_week_days()).unwrap_or_default()
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "FREQ={};INTERVAL={}", self.frequency, self.interval)?;
        if let Some(ref months) = self.by_month {
            write!(f, ";BYMONTH=")?;
            write_list(f, months.iter())?;
        }
        if let Some(ref days) = self.by_month_day {
            write!(f, ";BYMONTHDAY=")?;
            write_list(f, days.iter())?;
        }
        if let Some(ref by_day) = self.by_day {
            write!(f, ";BYDAY={by_day}")?;
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.strftime("%Y%m%dT%H%M%SZ"))?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        if self.week_start != Weekday::Monday {
            write!(f, ";WKST={}", weekday_code(self.week_start))?;
        }
        Ok(())
    }
}

/// A builder for constructing a valid recurrence rule.
#[derive(Clone, Debug)]
pub struct RecurrenceRuleBuilder {
    freq: Frequency,
    interval: i32,
    by_month: Option<Vec<i8>>,
    by_month_day: Option<Vec<i8>>,
    by_day: Option<ByDay>,
    until: Option<Timestamp>,
    count: Option<u32>,
    week_start: Weekday,
}

impl RecurrenceRuleBuilder {
    fn new(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder {
            freq,
            interval: 1,
            by_month: None,
            by_month_day: None,
            by_day: None,
            until: None,
            count: None,
            week_start: Weekday::Monday,
        }
    }

    pub fn build(&self) -> anyhow::Result<RecurrenceRule> {
        fn sort_and_dedup<T: Clone + Ord>(slice: &[T]) -> Vec<T> {
            let mut vec = slice.to_vec();
            vec.sort();
            vec.dedup();
            vec
        }

        anyhow::ensure!(
            self.interval >= 1,
            "interval value of `{}` is invalid \
             (interval must be greater than or equal to 1)",
            self.interval,
        );
        for &v in self.by_month.iter().flatten() {
            anyhow::ensure!(
                1 <= v && v <= 12,
                "invalid 'by month' value `{v}` \
                 (values must be in range 1..=12)",
            );
        }
        for &v in self.by_month_day.iter().flatten() {
            anyhow::ensure!(
                (-31 <= v && v <= -1) || (1 <= v && v <= 31),
                "invalid 'by day of the month' value `{v}` \
                 (values must be in range 1..=31 or -31..=-1)",
            );
        }
        let by_week_day =
            self.by_day.as_ref().map(|d| d.by_week_days()).unwrap_or_default();
        for &v in by_week_day.iter() {
            let nth = match v {
                ByWeekday::Any(_) => continue,
                ByWeekday::Numbered { nth, .. } => nth,
            };
            anyhow::ensure!(
                matches!(self.freq, Frequency::Yearly | Frequency::Monthly),
                "numbered weekday `{v}` is only allowed at \
                 yearly or monthly frequencies",
            );
            // It's yearly when the frequency is yearly and BYMONTH isn't
            // set. Otherwise, it's monthly.
            if matches!(self.freq, Frequency::Yearly)
                && self.by_month.as_ref().is_none_or(|m| m.is_empty())
            {
                anyhow::ensure!(
                    (-53 <= nth && nth <= -1) || (1 <= nth && nth <= 53),
                    "invalid numbered 'by week day' value `{v}` \
                     (values must be in range 1..=53 or -53..=-1)",
                );
            } else {
                anyhow::ensure!(
                    (-5 <= nth && nth <= -1) || (1 <= nth && nth <= 5),
                    "invalid numbered 'by week day' value `{v}` \
                     (values must be in range 1..=5 or -5..=-1)",
                );
            }
        }
        if self.by_month_day.as_ref().is_some_and(|d| !d.is_empty()) {
            anyhow::ensure!(
                !matches!(self.freq, Frequency::Weekly),
                "'by day of the month' cannot be used with weekly frequency",
            );
        }
        if let Some(count) = self.count {
            anyhow::ensure!(
                count >= 1,
                "count value of `{count}` is invalid \
                 (count must be greater than or equal to 1)",
            );
        }
        self.freq.to_span(self.interval).with_context(|| {
            format!(
                "could not convert {freq} interval of `{interval}` to \
                 time span",
                freq = self.freq.as_str(),
                interval = self.interval,
            )
        })?;

        Ok(RecurrenceRule {
            frequency: self.freq,
            interval: self.interval,
            by_month: self
                .by_month
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(sort_and_dedup),
            by_month_day: self
                .by_month_day
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(sort_and_dedup),
            by_day: self.by_day.clone().filter(|d| !d.is_empty()),
            until: self.until,
            count: self.count,
            week_start: self.week_start,
        })
    }

    pub fn interval(&mut self, increment: i32) -> &mut RecurrenceRuleBuilder {
        self.interval = increment;
        self
    }

    pub fn by_month(
        &mut self,
        months: impl IntoIterator<Item = i8>,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_month.get_or_insert_with(Vec::new).extend(months);
        self
    }

    pub fn by_month_day(
        &mut self,
        days: impl IntoIterator<Item = i8>,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_month_day.get_or_insert_with(Vec::new).extend(days);
        self
    }

    pub fn by_day(&mut self, by_day: ByDay) -> &mut RecurrenceRuleBuilder {
        self.by_day = Some(by_day);
        self
    }

    pub fn until(&mut self, until: Timestamp) -> &mut RecurrenceRuleBuilder {
        self.until = Some(until);
        self
    }

    pub fn count(&mut self, count: u32) -> &mut RecurrenceRuleBuilder {
        self.count = Some(count);
        self
    }

    pub fn week_start(
        &mut self,
        weekday: Weekday,
    ) -> &mut RecurrenceRuleBuilder {
        self.week_start = weekday;
        self
    }
}

/// How often a recurrence rule repeats.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn to_span(&self, interval: i32) -> anyhow::Result<Span> {
        let base = match *self {
            Frequency::Yearly => 1.year(),
            Frequency::Monthly => 1.month(),
            Frequency::Weekly => 1.week(),
            Frequency::Daily => 1.day(),
        };
        Ok(base.checked_mul(i64::from(interval))?)
    }

    /// Returns the name of this frequency as it appears in an `RRULE`.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Frequency> {
        let freq = match s {
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            unk => anyhow::bail!("unknown frequency: `{unk}`"),
        };
        Ok(freq)
    }
}

/// The BYDAY part of a recurrence rule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ByDay {
    /// Every occurrence of each weekday in the period, e.g., `BYDAY=MO,WE`.
    Weekdays(Vec<Weekday>),
    /// Weekdays at particular positions in the period, e.g., `BYDAY=1SA`
    /// for the first Saturday or `BYDAY=-1FR` for the last Friday.
    ///
    /// A position of `0` means every such weekday in the period. Weekdays
    /// are kept in the order they were first seen.
    Positions(Vec<(Weekday, Vec<i8>)>),
}

impl ByDay {
    fn is_empty(&self) -> bool {
        match *self {
            ByDay::Weekdays(ref days) => days.is_empty(),
            ByDay::Positions(ref days) => days.is_empty(),
        }
    }

    fn by_week_days(&self) -> Vec<ByWeekday> {
        match *self {
            ByDay::Weekdays(ref days) => {
                days.iter().copied().map(ByWeekday::Any).collect()
            }
            ByDay::Positions(ref days) => days
                .iter()
                .flat_map(|&(weekday, ref positions)| {
                    positions.iter().map(move |&nth| {
                        if nth == 0 {
                            ByWeekday::Any(weekday)
                        } else {
                            ByWeekday::Numbered { nth, weekday }
                        }
                    })
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for ByDay {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let tokens: Vec<String> = match *self {
            ByDay::Weekdays(ref days) => {
                days.iter().map(|&wd| weekday_code(wd).to_string()).collect()
            }
            ByDay::Positions(ref days) => days
                .iter()
                .flat_map(|&(wd, ref positions)| {
                    positions.iter().map(move |&nth| {
                        if nth == 0 {
                            weekday_code(wd).to_string()
                        } else {
                            format!("{nth}{}", weekday_code(wd))
                        }
                    })
                })
                .collect(),
        };
        write_list(f, tokens.iter())
    }
}

impl serde::Serialize for ByDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Translates raw recurrence rules into their canonical form.
///
/// A translator borrows a [`TimeResolver`], which is used to resolve the
/// `UNTIL` part of a rule into an absolute instant.
#[derive(Clone, Copy, Debug)]
pub struct RuleTranslator<'r> {
    resolver: &'r TimeResolver,
}

impl<'r> RuleTranslator<'r> {
    /// Creates a new translator that resolves times with the given resolver.
    pub fn new(resolver: &'r TimeResolver) -> RuleTranslator<'r> {
        RuleTranslator { resolver }
    }

    /// Translates a single raw rule.
    ///
    /// This fails with [`Error::InvalidRule`] when the frequency is unknown,
    /// a weekday token or month day is malformed or any value violates the
    /// structural constraints of RFC 5545. It fails with
    /// [`Error::UnsupportedTimeValue`] when `until` can't be interpreted.
    pub fn translate(&self, raw: &RawRule) -> Result<RecurrenceRule, Error> {
        let freq = raw
            .frequency
            .parse::<Frequency>()
            .map_err(Error::invalid_rule)?;
        let mut builder = RecurrenceRule::builder(freq);
        builder.interval(raw.interval.unwrap_or(1));
        if let Some(ref months) = raw.by_month {
            builder.by_month(months.iter().copied());
        }
        if let Some(ref days) = raw.by_month_day {
            let days = days
                .iter()
                .map(|day| parse_month_day(day))
                .collect::<anyhow::Result<Vec<i8>>>()
                .map_err(Error::invalid_rule)?;
            builder.by_month_day(days);
        }
        if let Some(ref tokens) = raw.by_day {
            if !tokens.is_empty() {
                builder.by_day(aggregate_by_day(tokens)?);
            }
        }
        if let Some(ref until) = raw.until {
            builder.until(self.resolver.to_instant(until)?);
        }
        if let Some(count) = raw.count {
            builder.count(count);
        }
        if let Some(ref wkst) = raw.week_start {
            let weekday = parse_weekday_code(wkst).map_err(Error::invalid_rule)?;
            builder.week_start(weekday);
        }
        let rule = builder.build().map_err(Error::invalid_rule)?;
        log::trace!("translated recurrence rule {raw:?} into `{rule}`");
        Ok(rule)
    }
}

/// Translates a single raw rule with the given resolver.
///
/// This is a convenience for `RuleTranslator::new(resolver).translate(raw)`.
pub fn build_recurrence_rule(
    raw: &RawRule,
    resolver: &TimeResolver,
) -> Result<RecurrenceRule, Error> {
    RuleTranslator::new(resolver).translate(raw)
}

/// Parses a single BYDAY token like `MO`, `1SA` or `-1FR`.
///
/// The position returned is `0` when the token doesn't have one.
pub fn parse_by_day_token(token: &str) -> Result<(Weekday, i8), Error> {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        // OK because the pattern is a constant.
        Regex::new(r"^([+-]?[0-9]{1,2})?([A-Z]{2})$").unwrap()
    });

    let caps = RE
        .captures(token)
        .with_context(|| {
            format!(
                "unrecognized weekday token `{token}` (expected an optional \
                 position followed by a two letter weekday code, e.g., `1SA`)"
            )
        })
        .map_err(Error::invalid_rule)?;
    let weekday = parse_weekday_code(&caps[2]).map_err(Error::invalid_rule)?;
    let position = match caps.get(1) {
        None => 0,
        Some(m) => m
            .as_str()
            .parse::<i8>()
            .with_context(|| {
                format!("invalid position in weekday token `{token}`")
            })
            .map_err(Error::invalid_rule)?,
    };
    Ok((weekday, position))
}

/// Parses and groups a list of BYDAY tokens.
///
/// When no token has a position, the result is the set of weekdays.
/// Otherwise, the positions of each weekday are collected together, with
/// a token that has no position contributing a position of `0`.
pub fn aggregate_by_day<T: AsRef<str>>(tokens: &[T]) -> Result<ByDay, Error> {
    let mut days: Vec<(Weekday, Vec<i8>)> = vec![];
    for token in tokens.iter() {
        let (weekday, position) = parse_by_day_token(token.as_ref())?;
        match days.iter_mut().find(|(wd, _)| *wd == weekday) {
            Some((_, positions)) => {
                if !positions.contains(&position) {
                    positions.push(position);
                }
            }
            None => days.push((weekday, vec![position])),
        }
    }
    if days.iter().all(|(_, positions)| positions.iter().all(|&p| p == 0)) {
        return Ok(ByDay::Weekdays(days.into_iter().map(|(wd, _)| wd).collect()));
    }
    Ok(ByDay::Positions(days))
}

fn parse_month_day(day: &str) -> anyhow::Result<i8> {
    day.trim().parse::<i8>().with_context(|| {
        format!("invalid 'by day of the month' value `{day}`")
    })
}

fn parse_weekday_code(code: &str) -> anyhow::Result<Weekday> {
    let weekday = match code {
        "SU" => Weekday::Sunday,
        "MO" => Weekday::Monday,
        "TU" => Weekday::Tuesday,
        "WE" => Weekday::Wednesday,
        "TH" => Weekday::Thursday,
        "FR" => Weekday::Friday,
        "SA" => Weekday::Saturday,
        unk => anyhow::bail!("unrecognized weekday code `{unk}`"),
    };
    Ok(weekday)
}

pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sunday => "SU",
        Weekday::Monday => "MO",
        Weekday::Tuesday => "TU",
        Weekday::Wednesday => "WE",
        Weekday::Thursday => "TH",
        Weekday::Friday => "FR",
        Weekday::Saturday => "SA",
    }
}

fn serialize_weekday<S>(wd: &Weekday, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(weekday_code(*wd))
}

fn write_list<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter,
    items: impl Iterator<Item = T>,
) -> std::fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawRule {
        serde_json::from_str(json).unwrap()
    }

    fn translate(json: &str) -> Result<RecurrenceRule, Error> {
        build_recurrence_rule(&raw(json), &TimeResolver::default())
    }

    fn expect_err(json: &str) -> Error {
        match translate(json) {
            Err(err) => err,
            Ok(ok) => {
                panic!("expected recurrence rule error, but got:\n{ok:?}")
            }
        }
    }

    #[test]
    fn by_day_tokens() {
        assert_eq!(parse_by_day_token("SA").unwrap(), (Weekday::Saturday, 0));
        assert_eq!(parse_by_day_token("1SA").unwrap(), (Weekday::Saturday, 1));
        assert_eq!(parse_by_day_token("-1FR").unwrap(), (Weekday::Friday, -1));
        assert_eq!(parse_by_day_token("+2MO").unwrap(), (Weekday::Monday, 2));
        assert_eq!(
            parse_by_day_token("-53TH").unwrap(),
            (Weekday::Thursday, -53),
        );

        insta::assert_snapshot!(
            parse_by_day_token("XX").unwrap_err(),
            @"invalid recurrence rule: unrecognized weekday code `XX`",
        );
        insta::assert_snapshot!(
            parse_by_day_token("mo").unwrap_err(),
            @"invalid recurrence rule: unrecognized weekday token `mo` (expected an optional position followed by a two letter weekday code, e.g., `1SA`)",
        );
        insta::assert_snapshot!(
            parse_by_day_token("1 SA").unwrap_err(),
            @"invalid recurrence rule: unrecognized weekday token `1 SA` (expected an optional position followed by a two letter weekday code, e.g., `1SA`)",
        );
    }

    #[test]
    fn aggregate_plain_weekdays() {
        let by_day = aggregate_by_day(&["MO", "WE", "FR", "MO"]).unwrap();
        assert_eq!(
            by_day,
            ByDay::Weekdays(vec![
                Weekday::Monday,
                Weekday::Wednesday,
                Weekday::Friday,
            ]),
        );
        assert_eq!(by_day.to_string(), "MO,WE,FR");
    }

    #[test]
    fn aggregate_positions() {
        let by_day = aggregate_by_day(&["1SA"]).unwrap();
        assert_eq!(by_day, ByDay::Positions(vec![(Weekday::Saturday, vec![1])]));

        let by_day = aggregate_by_day(&["1SU", "-1SU", "MO"]).unwrap();
        assert_eq!(
            by_day,
            ByDay::Positions(vec![
                (Weekday::Sunday, vec![1, -1]),
                (Weekday::Monday, vec![0]),
            ]),
        );
        assert_eq!(by_day.to_string(), "1SU,-1SU,MO");
    }

    #[test]
    fn translate_defaults() {
        let rule = translate(r#"{"frequency": "DAILY"}"#).unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.by_month, None);
        assert_eq!(rule.by_month_day, None);
        assert_eq!(rule.by_day, None);
        assert_eq!(rule.until, None);
        assert_eq!(rule.count, None);
        assert_eq!(rule.week_start, Weekday::Monday);
        assert!(!rule.is_bounded());
    }

    #[test]
    fn translate_every_part() {
        let rule = translate(
            r#"{
                "frequency": "MONTHLY",
                "interval": 2,
                "by_month": [3, 1],
                "by_month_day": ["15", "-1"],
                "until": "2015-01-01T00:00:00Z",
                "count": 5,
                "week_start": "SU"
            }"#,
        )
        .unwrap();
        insta::assert_snapshot!(
            rule,
            @"FREQ=MONTHLY;INTERVAL=2;BYMONTH=1,3;BYMONTHDAY=-1,15;UNTIL=20150101T000000Z;COUNT=5;WKST=SU",
        );
        assert!(rule.is_bounded());

        let rule = translate(
            r#"{"frequency": "MONTHLY", "by_day": ["1SA"], "count": 2}"#,
        )
        .unwrap();
        insta::assert_snapshot!(rule, @"FREQ=MONTHLY;INTERVAL=1;BYDAY=1SA;COUNT=2");
    }

    #[test]
    fn translate_until_in_zone() {
        let rule = translate(
            r#"{
                "frequency": "WEEKLY",
                "until": "2014-03-01T00:00:00[America/Los_Angeles]"
            }"#,
        )
        .unwrap();
        assert_eq!(
            rule.until,
            Some("2014-03-01T08:00:00Z".parse().unwrap()),
        );
    }

    #[test]
    fn frequency_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "daily"}"#),
            @"invalid recurrence rule: unknown frequency: `daily`",
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "HOURLY"}"#),
            @"invalid recurrence rule: unknown frequency: `HOURLY`",
        );
        insta::assert_snapshot!(
            expect_err(r#"{}"#),
            @"invalid recurrence rule: unknown frequency: ``",
        );
    }

    #[test]
    fn interval_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "DAILY", "interval": 0}"#),
            @"invalid recurrence rule: interval value of `0` is invalid (interval must be greater than or equal to 1)",
        );
    }

    #[test]
    fn by_month_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "YEARLY", "by_month": [13]}"#),
            @"invalid recurrence rule: invalid 'by month' value `13` (values must be in range 1..=12)",
        );
    }

    #[test]
    fn by_month_day_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "MONTHLY", "by_month_day": ["x"]}"#),
            @"invalid recurrence rule: invalid 'by day of the month' value `x`: invalid digit found in string",
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "MONTHLY", "by_month_day": ["0"]}"#),
            @"invalid recurrence rule: invalid 'by day of the month' value `0` (values must be in range 1..=31 or -31..=-1)",
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "WEEKLY", "by_month_day": ["1"]}"#),
            @"invalid recurrence rule: 'by day of the month' cannot be used with weekly frequency",
        );
    }

    #[test]
    fn by_week_day_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "WEEKLY", "by_day": ["1MO"]}"#),
            @"invalid recurrence rule: numbered weekday `1MO` is only allowed at yearly or monthly frequencies",
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "MONTHLY", "by_day": ["6MO"]}"#),
            @"invalid recurrence rule: invalid numbered 'by week day' value `6MO` (values must be in range 1..=5 or -5..=-1)",
        );
        insta::assert_snapshot!(
            expect_err(
                r#"{"frequency": "YEARLY", "by_month": [1], "by_day": ["6MO"]}"#
            ),
            @"invalid recurrence rule: invalid numbered 'by week day' value `6MO` (values must be in range 1..=5 or -5..=-1)",
        );
        // 20 is fine at yearly frequency without BYMONTH.
        assert!(
            translate(r#"{"frequency": "YEARLY", "by_day": ["20MO"]}"#)
                .is_ok()
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "YEARLY", "by_day": ["54MO"]}"#),
            @"invalid recurrence rule: invalid numbered 'by week day' value `54MO` (values must be in range 1..=53 or -53..=-1)",
        );
    }

    #[test]
    fn count_and_week_start_errors() {
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "DAILY", "count": 0}"#),
            @"invalid recurrence rule: count value of `0` is invalid (count must be greater than or equal to 1)",
        );
        insta::assert_snapshot!(
            expect_err(r#"{"frequency": "DAILY", "week_start": "XX"}"#),
            @"invalid recurrence rule: unrecognized weekday code `XX`",
        );
    }

    #[test]
    fn until_errors() {
        let err = expect_err(r#"{"frequency": "DAILY", "until": "whenever"}"#);
        assert!(matches!(err, Error::UnsupportedTimeValue(_)), "{err}");
    }
}
