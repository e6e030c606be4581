use chrono::{DateTime, Utc};
use kairos_rfc::RecurrenceRule;
use kairos_service::recurrence::RuleExpander;
use rrule::RRuleSet;

/// A rule whose expansion must agree with the `rrule` crate.
///
/// Only rules where RFC 5545 and the engine share semantics belong here:
/// day-of-month clamping (Jan 31 + 1 month) is deliberately excluded.
pub struct RuleCase {
    pub name: &'static str,
    pub dtstart: &'static str,
    pub rrule: &'static str,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: u16,
}

#[expect(clippy::too_many_lines)]
pub fn rule_cases() -> Vec<RuleCase> {
    vec![
        RuleCase {
            name: "daily_basic",
            dtstart: "2012-02-01T09:30:00+00:00",
            rrule: "FREQ=DAILY;COUNT=3",
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-02T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "weekly_basic",
            dtstart: "1997-09-02T09:00:00+00:00",
            rrule: "FREQ=WEEKLY;COUNT=3;BYDAY=TU,TH",
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-04T09:00:00+00:00",
                "1997-09-09T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "weekly_interval_wkst_mo",
            dtstart: "1997-08-05T09:00:00+00:00",
            rrule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO",
            expected: Some(&[
                "1997-08-05T09:00:00+00:00",
                "1997-08-10T09:00:00+00:00",
                "1997-08-19T09:00:00+00:00",
                "1997-08-24T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "weekly_interval_wkst_su",
            dtstart: "1997-08-05T09:00:00+00:00",
            rrule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU",
            expected: Some(&[
                "1997-08-05T09:00:00+00:00",
                "1997-08-17T09:00:00+00:00",
                "1997-08-19T09:00:00+00:00",
                "1997-08-31T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "monthly_basic",
            dtstart: "2012-01-01T09:00:00+00:00",
            rrule: "FREQ=MONTHLY;COUNT=3;BYMONTHDAY=1",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2012-02-01T09:00:00+00:00",
                "2012-03-01T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "monthly_last_day_leap",
            dtstart: "2024-01-31T09:00:00+00:00",
            rrule: "FREQ=MONTHLY;COUNT=4;BYMONTHDAY=-1",
            expected: Some(&[
                "2024-01-31T09:00:00+00:00",
                "2024-02-29T09:00:00+00:00",
                "2024-03-31T09:00:00+00:00",
                "2024-04-30T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "monthly_friday_13th",
            dtstart: "1998-02-13T09:00:00+00:00",
            rrule: "FREQ=MONTHLY;COUNT=5;BYDAY=FR;BYMONTHDAY=13",
            expected: Some(&[
                "1998-02-13T09:00:00+00:00",
                "1998-03-13T09:00:00+00:00",
                "1998-11-13T09:00:00+00:00",
                "1999-08-13T09:00:00+00:00",
                "2000-10-13T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "monthly_selected_months",
            dtstart: "2026-01-01T08:00:00+00:00",
            rrule: "FREQ=MONTHLY;COUNT=6;BYMONTH=1,6;BYMONTHDAY=1,15",
            expected: Some(&[
                "2026-01-01T08:00:00+00:00",
                "2026-01-15T08:00:00+00:00",
                "2026-06-01T08:00:00+00:00",
                "2026-06-15T08:00:00+00:00",
                "2027-01-01T08:00:00+00:00",
                "2027-01-15T08:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "yearly_basic",
            dtstart: "2012-01-01T09:00:00+00:00",
            rrule: "FREQ=YEARLY;COUNT=3",
            expected: Some(&[
                "2012-01-01T09:00:00+00:00",
                "2013-01-01T09:00:00+00:00",
                "2014-01-01T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "yearly_every_day_in_january",
            dtstart: "1998-01-01T09:00:00+00:00",
            rrule: "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            expected: None,
            expected_len: Some(93),
            limit: 500,
        },
        RuleCase {
            name: "yearly_by_year_day",
            dtstart: "1997-01-01T09:00:00+00:00",
            rrule: "FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200",
            expected: Some(&[
                "1997-01-01T09:00:00+00:00",
                "1997-04-10T09:00:00+00:00",
                "1997-07-19T09:00:00+00:00",
                "2000-01-01T09:00:00+00:00",
                "2000-04-09T09:00:00+00:00",
                "2000-07-18T09:00:00+00:00",
                "2003-01-01T09:00:00+00:00",
                "2003-04-10T09:00:00+00:00",
                "2003-07-19T09:00:00+00:00",
                "2006-01-01T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "yearly_week_number",
            dtstart: "1997-05-12T09:00:00+00:00",
            rrule: "FREQ=YEARLY;COUNT=3;BYWEEKNO=20;BYDAY=MO",
            expected: Some(&[
                "1997-05-12T09:00:00+00:00",
                "1998-05-11T09:00:00+00:00",
                "1999-05-17T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "daily_by_hour_and_minute",
            dtstart: "2024-01-01T09:00:00+00:00",
            rrule: "FREQ=DAILY;COUNT=6;BYHOUR=9,17;BYMINUTE=0,30",
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-01T09:30:00+00:00",
                "2024-01-01T17:00:00+00:00",
                "2024-01-01T17:30:00+00:00",
                "2024-01-02T09:00:00+00:00",
                "2024-01-02T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
        },
        RuleCase {
            name: "daily_interval_until",
            dtstart: "2026-03-01T07:15:00+00:00",
            rrule: "FREQ=DAILY;INTERVAL=3;UNTIL=20260401T000000Z",
            expected: None,
            expected_len: Some(11),
            limit: 100,
        },
    ]
}

/// Expansion computed by the `rrule` crate.
pub fn reference_dates(case: &RuleCase) -> Vec<DateTime<Utc>> {
    let dtstart = parse_rfc3339(case.dtstart);
    let text = format!(
        "DTSTART:{}\nRRULE:{}",
        dtstart.format("%Y%m%dT%H%M%SZ"),
        case.rrule
    );
    let set: RRuleSet = text
        .parse()
        .unwrap_or_else(|err| panic!("Case {} is not a valid rrule set: {err}", case.name));
    set.all(case.limit)
        .dates
        .iter()
        .map(|date| date.with_timezone(&Utc))
        .collect()
}

/// Expansion computed by the engine, optionally restricted to a window.
pub fn engine_dates(
    case: &RuleCase,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<DateTime<Utc>> {
    let rule: RecurrenceRule = case
        .rrule
        .parse()
        .unwrap_or_else(|err| panic!("Case {} failed to parse: {err}", case.name));
    let anchor = parse_rfc3339(case.dtstart);
    let (window_start, window_end) = window.unwrap_or((anchor, DateTime::<Utc>::MAX_UTC));
    RuleExpander::new(Some(&rule), anchor)
        .with_safety_cap(usize::from(case.limit))
        .expand(window_start, window_end)
        .collect()
}

pub fn assert_case(case: &RuleCase) {
    let reference = reference_dates(case);
    let actual = engine_dates(case, None);
    assert_eq!(actual, reference, "Case {} diverges from rrule", case.name);

    if let Some(expected) = case.expected {
        let expected: Vec<DateTime<Utc>> = expected.iter().map(|v| parse_rfc3339(v)).collect();
        assert_eq!(actual, expected, "Case {} did not match", case.name);
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            actual.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }
}

pub fn parse_rfc3339(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|err| panic!("Failed to parse rfc3339 value {value}: {err}"))
        .with_timezone(&Utc)
}
