//! Raw candidate generation (RFC 5545 §3.3.10 subset).
//!
//! A rule is expanded period by period: the `k`-th period sits `k * interval`
//! frequency units after the period holding the anchor. Each period yields
//! its candidate days (the conjunction of every BY* filter), crossed with the
//! time-of-day set. Expansion never steps from the anchor to reach a window:
//! the first relevant period and the number of earlier candidates are derived
//! arithmetically wherever the per-period candidate count is constant.
//!
//! Frequencies outside DAILY..YEARLY are unrepresentable here; RRULE text
//! carrying one is rejected by the parser before it reaches the engine.

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, SubsecRound, TimeDelta, Timelike, Utc};
use kairos_core::config::DEFAULT_SAFETY_CAP;
use kairos_rfc::{Frequency, RecurrenceRule, Weekday};

use super::calendar::{
    clamped_date, days_in_month, days_in_year, iso_weeks_in_year, month_index,
    resolve_signed_index, week_start_of, year_month_from_index,
};

/// ## Summary
/// Produces the raw candidate start times of one rule anchored at one instant.
///
/// An expander holds no state between calls: every [`RuleExpander::expand`]
/// recomputes its starting point from the rule, the anchor, and the window.
#[derive(Debug, Clone)]
pub struct RuleExpander<'a> {
    plan: Option<Plan<'a>>,
    anchor: DateTime<Utc>,
    safety_cap: usize,
}

impl<'a> RuleExpander<'a> {
    /// Creates an expander. A missing rule describes a single occurrence at `anchor`.
    #[must_use]
    pub fn new(rule: Option<&'a RecurrenceRule>, anchor: DateTime<Utc>) -> Self {
        Self {
            plan: rule.map(|rule| Plan::new(rule, anchor)),
            anchor,
            safety_cap: DEFAULT_SAFETY_CAP,
        }
    }

    /// Overrides the hard cap on candidates a single expansion may yield.
    #[must_use]
    pub fn with_safety_cap(mut self, safety_cap: usize) -> Self {
        self.safety_cap = safety_cap;
        self
    }

    #[must_use]
    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// ## Summary
    /// Lazily yields the raw candidates in `[window_start, window_end]`, in
    /// increasing order.
    ///
    /// Candidates before `window_start` still consume the rule's `count`; the
    /// iterator is seeded with the number of such candidates in earlier periods.
    #[must_use]
    pub fn expand(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> RawCandidates<'_> {
        let Some(plan) = &self.plan else {
            return RawCandidates {
                plan: None,
                pending: VecDeque::from([self.anchor]),
                period: 0,
                window_start,
                window_end,
                counted: 0,
                already_counted: 0,
                emitted: 0,
                safety_cap: self.safety_cap,
                finished: false,
            };
        };

        let period = if window_start > self.anchor {
            plan.period_containing(window_start)
        } else {
            0
        };
        let already_counted = if plan.rule.count.is_some() {
            plan.count_in_periods_before(period, plan.rule.count)
        } else {
            0
        };
        tracing::trace!(
            rule = %plan.rule,
            anchor = %self.anchor,
            period,
            already_counted,
            "Fast-forwarded expansion"
        );

        RawCandidates {
            plan: Some(plan),
            pending: VecDeque::new(),
            period,
            window_start,
            window_end,
            counted: already_counted,
            already_counted,
            emitted: 0,
            safety_cap: self.safety_cap,
            finished: false,
        }
    }

    /// ## Summary
    /// Counts raw candidates in `[anchor, instant)`, ignoring `count` and `until`.
    #[must_use]
    pub fn count_before(&self, instant: DateTime<Utc>) -> u32 {
        let Some(plan) = &self.plan else {
            return u32::from(self.anchor < instant);
        };
        if instant <= self.anchor {
            return 0;
        }
        let period = plan.period_containing(instant);
        let earlier = plan.count_in_periods_before(period, None);
        let current = plan
            .candidates(period)
            .map_or(0, |c| len_u64(c.iter().filter(|c| **c < instant)));
        u32::try_from(earlier.saturating_add(current)).unwrap_or(u32::MAX)
    }

    /// ## Summary
    /// Returns true if `instant` is a raw candidate of the series, honoring
    /// `count` and `until`.
    #[must_use]
    pub fn is_candidate(&self, instant: DateTime<Utc>) -> bool {
        self.expand(instant, instant).next() == Some(instant)
    }

    /// ## Summary
    /// Returns the raw candidate falling within the whole second holding
    /// `instant`, honoring `count` and `until`.
    ///
    /// Exception dates are stored at second precision while candidates keep
    /// the anchor's sub-second part; this recovers the exact candidate.
    #[must_use]
    pub fn candidate_in_second(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let second = instant.trunc_subsecs(0);
        let last = second + TimeDelta::seconds(1) - TimeDelta::nanoseconds(1);
        self.expand(second, last).next()
    }

    /// ## Summary
    /// Returns the last raw candidate strictly before `instant`, honoring
    /// `count` and `until`.
    #[must_use]
    pub fn last_before(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Some(plan) = &self.plan else {
            return (self.anchor < instant).then_some(self.anchor);
        };
        let bound = match plan.rule.until {
            Some(until) if until < instant => until + TimeDelta::nanoseconds(1),
            _ => instant,
        };
        if bound <= self.anchor {
            return None;
        }

        let upper = plan.period_containing(bound);
        let (period, last) = (0..=upper).rev().find_map(|k| {
            plan.candidates(k)?
                .into_iter()
                .rfind(|c| *c < bound)
                .map(|c| (k, c))
        })?;

        if let Some(count) = plan.rule.count
            && self.count_before(last) >= count
        {
            return plan.nth_candidate(count, period);
        }
        Some(last)
    }
}

/// ## Summary
/// Lazy, finite sequence of raw candidate start times.
///
/// Terminates at the first candidate past `until`, past `count`, or past the
/// window end, or once the safety cap has been yielded.
#[derive(Debug)]
pub struct RawCandidates<'s> {
    plan: Option<&'s Plan<'s>>,
    pending: VecDeque<DateTime<Utc>>,
    period: u64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    counted: u64,
    already_counted: u64,
    emitted: usize,
    safety_cap: usize,
    finished: bool,
}

impl RawCandidates<'_> {
    /// Candidates counted toward `count` before the first expanded period.
    #[must_use]
    pub fn already_counted(&self) -> u64 {
        self.already_counted
    }

    fn finish(&mut self, reason: &'static str) {
        tracing::trace!(reason, emitted = self.emitted, "Expansion finished");
        self.finished = true;
    }

    fn refill(&mut self) {
        let Some(plan) = self.plan else {
            self.finish("single occurrence consumed");
            return;
        };
        let Some(start) = plan.period_start(self.period) else {
            self.finish("date range exhausted");
            return;
        };
        let start = start.and_time(NaiveTime::MIN).and_utc();
        if start > self.window_end {
            self.finish("past window end");
            return;
        }
        if plan.rule.until.is_some_and(|until| start > until) {
            self.finish("past until");
            return;
        }
        match plan.candidates(self.period) {
            Some(candidates) => self.pending.extend(candidates),
            None => self.finish("date range exhausted"),
        }
        self.period += 1;
    }
}

impl Iterator for RawCandidates<'_> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some(candidate) = self.pending.pop_front() else {
                self.refill();
                continue;
            };

            if let Some(plan) = self.plan {
                if plan.rule.until.is_some_and(|until| candidate > until) {
                    self.finish("past until");
                    break;
                }
                self.counted += 1;
                if plan
                    .rule
                    .count
                    .is_some_and(|count| self.counted > u64::from(count))
                {
                    self.finish("count reached");
                    break;
                }
            }
            if candidate > self.window_end {
                self.finish("past window end");
                break;
            }
            if candidate < self.window_start {
                continue;
            }
            if self.emitted >= self.safety_cap {
                tracing::debug!(safety_cap = self.safety_cap, "Safety cap reached");
                self.finish("safety cap");
                break;
            }

            self.emitted += 1;
            return Some(candidate);
        }
        None
    }
}

/// Rule and anchor, pre-digested for period arithmetic.
#[derive(Debug, Clone)]
struct Plan<'a> {
    rule: &'a RecurrenceRule,
    anchor: DateTime<Utc>,
    anchor_date: NaiveDate,
    interval: i64,
    times: Vec<NaiveTime>,
}

impl<'a> Plan<'a> {
    fn new(rule: &'a RecurrenceRule, anchor: DateTime<Utc>) -> Self {
        let interval = if rule.interval == 0 {
            tracing::warn!(rule = %rule, "Non-positive interval reached the engine, treating as 1");
            1
        } else {
            i64::from(rule.interval)
        };
        Self {
            rule,
            anchor,
            anchor_date: anchor.date_naive(),
            interval,
            times: time_of_day_set(rule, anchor.time()),
        }
    }

    /// First day of the `k`-th period.
    fn period_start(&self, k: u64) -> Option<NaiveDate> {
        let units = i64::try_from(k).ok()?.checked_mul(self.interval)?;
        match self.rule.frequency {
            Frequency::Daily => self
                .anchor_date
                .checked_add_signed(TimeDelta::try_days(units)?),
            Frequency::Weekly => week_start_of(self.anchor_date, self.rule.week_start)
                .checked_add_signed(TimeDelta::try_weeks(units)?),
            Frequency::Monthly => {
                let (year, month) =
                    year_month_from_index(month_index(self.anchor_date).checked_add(units)?)?;
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Frequency::Yearly => {
                let year = self
                    .anchor_date
                    .year()
                    .checked_add(i32::try_from(units).ok()?)?;
                NaiveDate::from_ymd_opt(year, 1, 1)
            }
        }
    }

    /// Index of the period whose unit holds `instant`, rounded down to an
    /// interval boundary. Every earlier period ends before `instant`.
    fn period_containing(&self, instant: DateTime<Utc>) -> u64 {
        let date = instant.date_naive();
        let units = match self.rule.frequency {
            Frequency::Daily => (date - self.anchor_date).num_days(),
            Frequency::Weekly => (week_start_of(date, self.rule.week_start)
                - week_start_of(self.anchor_date, self.rule.week_start))
            .num_days()
            .div_euclid(7),
            Frequency::Monthly => month_index(date) - month_index(self.anchor_date),
            Frequency::Yearly => i64::from(date.year()) - i64::from(self.anchor_date.year()),
        };
        if units <= 0 {
            0
        } else {
            u64::try_from(units / self.interval).unwrap_or(0)
        }
    }

    /// Candidate days of the `k`-th period, ascending.
    fn period_days(&self, k: u64) -> Option<Vec<NaiveDate>> {
        let start = self.period_start(k)?;
        let rule = self.rule;
        let days: Vec<NaiveDate> = match rule.frequency {
            Frequency::Daily => vec![start],
            Frequency::Weekly if rule.by_weekday.is_empty() => {
                let offset = (i64::from(self.anchor_date.weekday().num_days_from_sunday())
                    - i64::from(rule.week_start.number_from_sunday()))
                .rem_euclid(7);
                start
                    .checked_add_signed(TimeDelta::days(offset))
                    .into_iter()
                    .collect()
            }
            Frequency::Weekly => start.iter_days().take(7).collect(),
            Frequency::Monthly if rule.has_day_filters() => start
                .iter_days()
                .take_while(|d| d.month() == start.month())
                .collect(),
            Frequency::Monthly => clamped_date(start.year(), start.month(), self.anchor_date.day())
                .into_iter()
                .collect(),
            Frequency::Yearly if rule.has_day_filters() => start
                .iter_days()
                .take_while(|d| d.year() == start.year())
                .collect(),
            Frequency::Yearly if !rule.by_month.is_empty() => rule
                .by_month
                .iter()
                .filter_map(|m| clamped_date(start.year(), u32::from(*m), self.anchor_date.day()))
                .collect(),
            Frequency::Yearly => clamped_date(
                start.year(),
                self.anchor_date.month(),
                self.anchor_date.day(),
            )
            .into_iter()
            .collect(),
        };
        Some(days.into_iter().filter(|d| self.day_matches(*d)).collect())
    }

    /// Conjunction of every configured day-level filter.
    fn day_matches(&self, date: NaiveDate) -> bool {
        let rule = self.rule;

        if !rule.by_month.is_empty()
            && !u8::try_from(date.month()).is_ok_and(|m| rule.by_month.contains(&m))
        {
            return false;
        }
        if !rule.by_weekday.is_empty()
            && !rule.by_weekday.contains(&Weekday::from_chrono(date.weekday()))
        {
            return false;
        }
        if !rule.by_month_day.is_empty() {
            let len = days_in_month(date.year(), date.month());
            if !rule
                .by_month_day
                .iter()
                .any(|md| resolve_signed_index(i32::from(*md), len) == Some(date.day()))
            {
                return false;
            }
        }
        if !rule.by_year_day.is_empty() {
            let len = days_in_year(date.year());
            if !rule
                .by_year_day
                .iter()
                .any(|yd| resolve_signed_index(i32::from(*yd), len) == Some(date.ordinal()))
            {
                return false;
            }
        }
        if !rule.by_week_number.is_empty() {
            let iso = date.iso_week();
            let len = iso_weeks_in_year(iso.year());
            if !rule
                .by_week_number
                .iter()
                .any(|wn| resolve_signed_index(i32::from(*wn), len) == Some(iso.week()))
            {
                return false;
            }
        }
        true
    }

    /// Candidates of the `k`-th period that are not before the anchor, ascending.
    fn candidates(&self, k: u64) -> Option<Vec<DateTime<Utc>>> {
        let days = self.period_days(k)?;
        Some(
            days.iter()
                .flat_map(|day| self.times.iter().map(move |t| day.and_time(*t).and_utc()))
                .filter(|c| *c >= self.anchor)
                .collect(),
        )
    }

    /// Candidates per period for every period after the first, when constant.
    fn uniform_cardinality(&self) -> Option<u64> {
        let rule = self.rule;
        let days = match rule.frequency {
            Frequency::Daily | Frequency::Monthly => {
                (!rule.has_day_filters() && rule.by_month.is_empty()).then_some(1)
            }
            Frequency::Weekly => (rule.by_month.is_empty()
                && rule.by_month_day.is_empty()
                && rule.by_year_day.is_empty()
                && rule.by_week_number.is_empty())
            .then(|| rule.by_weekday.len().max(1)),
            Frequency::Yearly => (!rule.has_day_filters()).then(|| {
                if rule.by_month.is_empty() {
                    1
                } else {
                    rule.by_month.iter().filter(|m| (1..=12).contains(*m)).count()
                }
            }),
        }?;
        u64::try_from(days)
            .ok()?
            .checked_mul(len_u64(self.times.iter()))
    }

    /// Counts candidates in periods `0..period`.
    ///
    /// Closed form when every period after the first has the same number of
    /// candidates; otherwise periods are enumerated, stopping early once the
    /// total exceeds `limit`.
    fn count_in_periods_before(&self, period: u64, limit: Option<u32>) -> u64 {
        if period == 0 {
            return 0;
        }
        let first = self.candidates(0).map_or(0, |c| len_u64(c.iter()));
        if let Some(per_period) = self.uniform_cardinality() {
            return first.saturating_add((period - 1).saturating_mul(per_period));
        }

        let mut total = first;
        for k in 1..period {
            if limit.is_some_and(|limit| total > u64::from(limit)) {
                break;
            }
            let Some(candidates) = self.candidates(k) else {
                break;
            };
            total = total.saturating_add(len_u64(candidates.iter()));
        }
        total
    }

    /// The `n`-th candidate overall (1-based), searching no further than `upper` periods.
    fn nth_candidate(&self, n: u32, upper: u64) -> Option<DateTime<Utc>> {
        let mut remaining = u64::from(n);
        if remaining == 0 {
            return None;
        }

        let first = self.candidates(0)?;
        let first_len = len_u64(first.iter());
        if remaining <= first_len {
            return first.get(usize::try_from(remaining - 1).ok()?).copied();
        }
        remaining -= first_len;

        if let Some(per_period) = self.uniform_cardinality().filter(|n| *n > 0) {
            let k = 1 + (remaining - 1) / per_period;
            let index = (remaining - 1) % per_period;
            return self.candidates(k)?.get(usize::try_from(index).ok()?).copied();
        }

        for k in 1..=upper {
            let candidates = self.candidates(k)?;
            let len = len_u64(candidates.iter());
            if remaining <= len {
                return candidates.get(usize::try_from(remaining - 1).ok()?).copied();
            }
            remaining -= len;
        }
        None
    }
}

/// Times of day a candidate day expands into: `by_hour × by_minute × by_second`,
/// each defaulting to the anchor's own component. Ascending.
fn time_of_day_set(rule: &RecurrenceRule, anchor: NaiveTime) -> Vec<NaiveTime> {
    let pick = |set: &std::collections::BTreeSet<u8>, default: u32| -> Vec<u32> {
        if set.is_empty() {
            vec![default]
        } else {
            set.iter().map(|v| u32::from(*v)).collect()
        }
    };
    let hours = pick(&rule.by_hour, anchor.hour());
    let minutes = pick(&rule.by_minute, anchor.minute());
    let seconds = pick(&rule.by_second, anchor.second());

    let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
    for hour in &hours {
        for minute in &minutes {
            for second in &seconds {
                if let Some(time) =
                    NaiveTime::from_hms_nano_opt(*hour, *minute, *second, anchor.nanosecond())
                {
                    times.push(time);
                }
            }
        }
    }
    times
}

fn len_u64<I: Iterator>(iter: I) -> u64 {
    u64::try_from(iter.count()).unwrap_or(u64::MAX)
}
