//! Schedule grammar parser and next-run calculator.
//!
//! Grammar: `["e "] (<int><unit> | <wkd> <HHMM>)` where `unit` is one of
//! `s m h d w`, `wkd` a case-insensitive three-letter weekday, and `HHMM` a
//! zero-padded 24-hour time. The leading `e ` marks the schedule repeating.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};

use crate::error::ParseError;
use crate::types::{Schedule, ScheduleKind, ScheduleSpec};

/// Parse a raw schedule string into a [`Schedule`] descriptor.
///
/// Rejection happens here, before any job row is created; every variant of
/// [`ParseError`] names the offending token.
pub fn parse(text: &str) -> Result<Schedule, ParseError> {
    let mut rest = text.trim();

    let kind = if let Some(stripped) = rest.strip_prefix("e ") {
        rest = stripped.trim_start();
        ScheduleKind::Repeating
    } else {
        ScheduleKind::SingleRun
    };

    if rest.is_empty() {
        return Err(ParseError::Empty);
    }

    // A token starting with a digit can only be an interval; anything wrong
    // with it is reported as a bad interval rather than falling through to
    // the weekday form.
    if !rest.contains(char::is_whitespace) && rest.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(Schedule {
            kind,
            spec: parse_interval(rest)?,
        });
    }

    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(ParseError::FieldCount(rest.to_string()));
    }

    let weekday = parse_weekday(fields[0])?;
    let (hour, minute) = parse_time_of_day(fields[1])?;

    Ok(Schedule {
        kind,
        spec: ScheduleSpec::WeekdayTime {
            weekday,
            hour,
            minute,
        },
    })
}

/// Parse `<int><unit>` into an interval spec. The magnitude must be a
/// positive integer immediately followed by a single unit suffix.
fn parse_interval(token: &str) -> Result<ScheduleSpec, ParseError> {
    if !token.is_ascii() || token.len() < 2 {
        return Err(ParseError::BadInterval(token.to_string()));
    }

    let (magnitude, unit) = token.split_at(token.len() - 1);
    let unit_secs: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        "w" => 60 * 60 * 24 * 7,
        _ => return Err(ParseError::BadInterval(token.to_string())),
    };

    let n: u64 = magnitude
        .parse()
        .map_err(|_| ParseError::BadInterval(token.to_string()))?;
    if n == 0 {
        return Err(ParseError::BadInterval(token.to_string()));
    }

    // The total must survive the multiply and stay representable as a
    // chrono duration, or next-run arithmetic has nothing to work with.
    let secs = n
        .checked_mul(unit_secs)
        .ok_or_else(|| ParseError::BadInterval(token.to_string()))?;
    if i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .is_none()
    {
        return Err(ParseError::BadInterval(token.to_string()));
    }

    Ok(ScheduleSpec::Interval { secs })
}

fn parse_weekday(token: &str) -> Result<Weekday, ParseError> {
    match token.to_ascii_lowercase().as_str() {
        "sun" => Ok(Weekday::Sun),
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        _ => Err(ParseError::BadWeekday(token.to_string())),
    }
}

/// Parse a 4-digit `HHMM` token with hour 0–23 and minute 0–59.
fn parse_time_of_day(token: &str) -> Result<(u8, u8), ParseError> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::BadTimeOfDay(token.to_string()));
    }

    let hour: u8 = token[..2]
        .parse()
        .map_err(|_| ParseError::BadTimeOfDay(token.to_string()))?;
    let minute: u8 = token[2..]
        .parse()
        .map_err(|_| ParseError::BadTimeOfDay(token.to_string()))?;

    if hour > 23 || minute > 59 {
        return Err(ParseError::BadTimeOfDay(token.to_string()));
    }

    Ok((hour, minute))
}

/// Compute the next local execution time for `schedule` relative to `from`.
///
/// Interval schedules yield `from + interval` unconditionally (no drift
/// correction against a fixed origin). Weekday schedules yield the next
/// instant strictly after `from` whose weekday and time of day match.
///
/// Returns `None` when the result is not representable: the local wall-clock
/// time falls in a DST gap, or the interval overflows the datetime range.
pub fn next_run(schedule: &Schedule, from: DateTime<Local>) -> Option<DateTime<Local>> {
    match schedule.spec {
        ScheduleSpec::Interval { secs } => {
            let delta = Duration::try_seconds(i64::try_from(secs).ok()?)?;
            from.checked_add_signed(delta)
        }

        ScheduleSpec::WeekdayTime {
            weekday,
            hour,
            minute,
        } => {
            // Candidate on the current calendar date, then walk forward
            // day by day until the weekday matches.
            let mut date = from.date_naive();
            while date.weekday() != weekday {
                date = date.succ_opt()?;
            }

            let mut candidate = local_instant(date, hour, minute)?;
            if candidate <= from {
                match schedule.kind {
                    // Repeating schedules push exactly one week.
                    ScheduleKind::Repeating => {
                        date = date + Duration::days(7);
                        candidate = local_instant(date, hour, minute)?;
                    }
                    // Single-run schedules advance week by week until the
                    // instant is in the future.
                    ScheduleKind::SingleRun => {
                        while candidate <= from {
                            date = date + Duration::days(7);
                            candidate = local_instant(date, hour, minute)?;
                        }
                    }
                }
            }
            Some(candidate)
        }
    }
}

fn local_instant(date: NaiveDate, hour: u8, minute: u8) -> Option<DateTime<Local>> {
    Local
        .with_ymd_and_hms(
            date.year(),
            date.month(),
            date.day(),
            hour as u32,
            minute as u32,
            0,
        )
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("unambiguous local time")
    }

    // --- parser ---

    #[test]
    fn parses_interval_units() {
        for (text, secs) in [
            ("10s", 10),
            ("15m", 900),
            ("2h", 7200),
            ("1d", 86_400),
            ("1w", 604_800),
        ] {
            let s = parse(text).expect(text);
            assert_eq!(s.kind, ScheduleKind::SingleRun);
            assert_eq!(s.spec, ScheduleSpec::Interval { secs });
        }
    }

    #[test]
    fn repeating_marker_sets_kind() {
        let s = parse("e 15m").expect("parse failed");
        assert_eq!(s.kind, ScheduleKind::Repeating);
        assert_eq!(s.spec, ScheduleSpec::Interval { secs: 900 });
    }

    #[test]
    fn parses_weekday_time_case_insensitive() {
        let s = parse("MON 0900").expect("parse failed");
        assert_eq!(
            s.spec,
            ScheduleSpec::WeekdayTime {
                weekday: Weekday::Mon,
                hour: 9,
                minute: 0
            }
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let s = parse("  e fri 2359  ").expect("parse failed");
        assert_eq!(s.kind, ScheduleKind::Repeating);
        assert_eq!(
            s.spec,
            ScheduleSpec::WeekdayTime {
                weekday: Weekday::Fri,
                hour: 23,
                minute: 59
            }
        );
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(parse("e tue 0630").unwrap(), parse("e tue 0630").unwrap());
        assert_eq!(parse("45s").unwrap(), parse("45s").unwrap());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        // Repeating marker with nothing after it.
        assert_eq!(parse("e "), Err(ParseError::Empty));
    }

    #[test]
    fn malformed_interval_is_rejected() {
        assert!(matches!(parse("15x"), Err(ParseError::BadInterval(_))));
        assert!(matches!(parse("15"), Err(ParseError::BadInterval(_))));
        assert!(matches!(parse("0s"), Err(ParseError::BadInterval(_))));
    }

    #[test]
    fn oversized_interval_is_rejected() {
        // Multiply overflow in the magnitude * unit step.
        assert!(matches!(
            parse("10000000000000000000w"),
            Err(ParseError::BadInterval(_))
        ));
        // Fits in u64 but exceeds what a chrono duration can carry.
        assert!(matches!(
            parse("99999999999w"),
            Err(ParseError::BadInterval(_))
        ));
    }

    #[test]
    fn garbage_text_is_rejected() {
        assert!(matches!(parse("abcd"), Err(ParseError::FieldCount(_))));
        assert!(matches!(
            parse("mon 0900 extra"),
            Err(ParseError::FieldCount(_))
        ));
    }

    #[test]
    fn bad_weekday_names_the_token() {
        assert_eq!(
            parse("funday 0900"),
            Err(ParseError::BadWeekday("funday".to_string()))
        );
    }

    #[test]
    fn out_of_range_time_is_rejected() {
        assert!(matches!(parse("mon 2460"), Err(ParseError::BadTimeOfDay(_))));
        assert!(matches!(parse("mon 1260"), Err(ParseError::BadTimeOfDay(_))));
        assert!(matches!(parse("mon 900"), Err(ParseError::BadTimeOfDay(_))));
        assert!(matches!(parse("mon 9am"), Err(ParseError::BadTimeOfDay(_))));
    }

    // --- calculator ---

    #[test]
    fn interval_next_run_is_exactly_from_plus_interval() {
        let s = parse("15m").unwrap();
        let from = local(2026, 8, 26, 12, 0);
        let next = next_run(&s, from).expect("next run");
        assert_eq!(next - from, Duration::seconds(900));
    }

    #[test]
    fn unrepresentable_interval_yields_no_next_run() {
        // Not constructible through parse; guards direct construction.
        let s = Schedule {
            kind: ScheduleKind::SingleRun,
            spec: ScheduleSpec::Interval { secs: u64::MAX },
        };
        assert_eq!(next_run(&s, local(2026, 8, 26, 12, 0)), None);
    }

    #[test]
    fn weekday_parsed_on_wednesday_lands_on_upcoming_monday() {
        let s = parse("mon 0900").unwrap();
        // 2026-08-26 is a Wednesday.
        let from = local(2026, 8, 26, 12, 0);
        let next = next_run(&s, from).expect("next run");
        assert_eq!(next, local(2026, 8, 31, 9, 0));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn same_day_earlier_time_pushes_a_week() {
        // Evaluated on a Wednesday after 09:00, "wed 0900" has already passed.
        let s = parse("wed 0900").unwrap();
        let from = local(2026, 8, 26, 12, 0);
        let next = next_run(&s, from).expect("next run");
        assert_eq!(next, local(2026, 9, 2, 9, 0));
    }

    #[test]
    fn same_day_later_time_stays_on_that_day() {
        let s = parse("wed 2330").unwrap();
        let from = local(2026, 8, 26, 12, 0);
        let next = next_run(&s, from).expect("next run");
        assert_eq!(next, local(2026, 8, 26, 23, 30));
    }

    #[test]
    fn candidate_equal_to_from_is_advanced() {
        let s = parse("e wed 1200").unwrap();
        let from = local(2026, 8, 26, 12, 0);
        let next = next_run(&s, from).expect("next run");
        assert_eq!(next, local(2026, 9, 2, 12, 0));
    }

    #[test]
    fn weekday_result_always_matches_request_and_is_future() {
        let from = local(2026, 8, 26, 18, 45);
        for day in ["sun", "mon", "tue", "wed", "thu", "fri", "sat"] {
            let s = parse(&format!("{day} 0715")).unwrap();
            let next = next_run(&s, from).expect("next run");
            assert!(next > from, "{day}: {next} not after {from}");
            assert_eq!(next.hour(), 7, "{day}");
            assert_eq!(next.minute(), 15, "{day}");
            let ScheduleSpec::WeekdayTime { weekday, .. } = s.spec else {
                unreachable!()
            };
            assert_eq!(next.weekday(), weekday, "{day}");
        }
    }
}
