//! Minimal 5-field cron expression parsing and matching.
//!
//! Supports the subset the schedule trigger needs: `*`, numbers, ranges
//! (`a-b`), steps (`*/n`, `a-b/n`), and comma lists, over the standard
//! `minute hour day-of-month month day-of-week` fields. Day-of-week uses
//! 0-6 with both 0 and 7 accepted as Sunday.
//!
//! Matching is at minute resolution. Following traditional cron, when both
//! day-of-month and day-of-week are restricted the date matches if either
//! field matches.

use chrono::{Datelike, Timelike};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// CronSchedule
// ---------------------------------------------------------------------------

/// A parsed cron expression. Each field is a bitmask of permitted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minutes: u64,
    hours: u32,
    days_of_month: u32,
    months: u16,
    days_of_week: u8,
    /// Whether day-of-month / day-of-week were `*` in the source expression
    /// (needed for the either-matches rule).
    dom_is_wildcard: bool,
    dow_is_wildcard: bool,
}

impl CronSchedule {
    /// Parse a 5-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, CoreError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CoreError::Validation(format!(
                "Cron expression must have 5 fields (minute hour day month weekday), got {}",
                fields.len()
            )));
        }

        let minutes = parse_field(fields[0], 0, 59)?;
        let hours = parse_field(fields[1], 0, 23)?;
        let days_of_month = parse_field(fields[2], 1, 31)?;
        let months = parse_field(fields[3], 1, 12)?;
        // Accept 7 as Sunday by folding it into 0.
        let mut days_of_week = parse_field(fields[4], 0, 7)?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            minutes,
            hours: hours as u32,
            days_of_month: days_of_month as u32,
            months: months as u16,
            days_of_week: days_of_week as u8,
            dom_is_wildcard: fields[2] == "*",
            dow_is_wildcard: fields[4] == "*",
        })
    }

    /// Whether the schedule fires at the given instant (minute resolution).
    pub fn matches(&self, at: Timestamp) -> bool {
        if self.minutes & (1 << at.minute()) == 0 {
            return false;
        }
        if self.hours & (1 << at.hour()) == 0 {
            return false;
        }
        if self.months & (1 << at.month()) == 0 {
            return false;
        }

        let dom_match = self.days_of_month & (1 << at.day()) != 0;
        let dow_match = self.days_of_week & (1 << at.weekday().num_days_from_sunday()) != 0;

        match (self.dom_is_wildcard, self.dow_is_wildcard) {
            // Both restricted: traditional cron fires when either matches.
            (false, false) => dom_match || dow_match,
            _ => dom_match && dow_match,
        }
    }
}

/// Parse one cron field into a bitmask of permitted values.
fn parse_field(field: &str, min: u32, max: u32) -> Result<u64, CoreError> {
    let mut mask: u64 = 0;

    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| invalid(field))?;
                if step == 0 {
                    return Err(invalid(field));
                }
                (r, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            let lo: u32 = a.parse().map_err(|_| invalid(field))?;
            let hi: u32 = b.parse().map_err(|_| invalid(field))?;
            (lo, hi)
        } else {
            let v: u32 = range.parse().map_err(|_| invalid(field))?;
            // A bare value with a step (e.g. "5/15") means "from 5 to max".
            if step > 1 { (v, max) } else { (v, v) }
        };

        if lo < min || hi > max || lo > hi {
            return Err(invalid(field));
        }

        let mut v = lo;
        while v <= hi {
            mask |= 1 << v;
            v += step;
        }
    }

    Ok(mask)
}

fn invalid(field: &str) -> CoreError {
    CoreError::Validation(format!("Invalid cron field: '{field}'"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn every_minute_matches_always() {
        let c = CronSchedule::parse("* * * * *").unwrap();
        assert!(c.matches(at(2025, 6, 15, 12, 34)));
        assert!(c.matches(at(2025, 1, 1, 0, 0)));
    }

    #[test]
    fn fixed_time_matches_only_that_minute() {
        // 09:00 every Monday
        let c = CronSchedule::parse("0 9 * * 1").unwrap();
        // 2025-06-16 is a Monday.
        assert!(c.matches(at(2025, 6, 16, 9, 0)));
        assert!(!c.matches(at(2025, 6, 16, 9, 1)));
        assert!(!c.matches(at(2025, 6, 17, 9, 0))); // Tuesday
    }

    #[test]
    fn step_values() {
        let c = CronSchedule::parse("*/15 * * * *").unwrap();
        assert!(c.matches(at(2025, 6, 15, 3, 0)));
        assert!(c.matches(at(2025, 6, 15, 3, 45)));
        assert!(!c.matches(at(2025, 6, 15, 3, 20)));
    }

    #[test]
    fn ranges_and_lists() {
        let c = CronSchedule::parse("0 9-17 * * 1,2,3,4,5").unwrap();
        // 2025-06-18 is a Wednesday.
        assert!(c.matches(at(2025, 6, 18, 9, 0)));
        assert!(c.matches(at(2025, 6, 18, 17, 0)));
        assert!(!c.matches(at(2025, 6, 18, 18, 0)));
        // 2025-06-21 is a Saturday.
        assert!(!c.matches(at(2025, 6, 21, 12, 0)));
    }

    #[test]
    fn seven_is_sunday() {
        let with_seven = CronSchedule::parse("0 0 * * 7").unwrap();
        let with_zero = CronSchedule::parse("0 0 * * 0").unwrap();
        // 2025-06-15 is a Sunday.
        assert!(with_seven.matches(at(2025, 6, 15, 0, 0)));
        assert!(with_zero.matches(at(2025, 6, 15, 0, 0)));
    }

    #[test]
    fn dom_and_dow_either_matches_when_both_restricted() {
        // "on the 1st, or any Monday"
        let c = CronSchedule::parse("0 0 1 * 1").unwrap();
        assert!(c.matches(at(2025, 7, 1, 0, 0))); // 1st (a Tuesday)
        assert!(c.matches(at(2025, 7, 7, 0, 0))); // a Monday, not the 1st
        assert!(!c.matches(at(2025, 7, 2, 0, 0))); // Wednesday the 2nd
    }

    #[test]
    fn monthly_first_day() {
        let c = CronSchedule::parse("30 6 1 * *").unwrap();
        assert!(c.matches(at(2025, 3, 1, 6, 30)));
        assert!(!c.matches(at(2025, 3, 2, 6, 30)));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronSchedule::parse("* * * *").is_err());
        assert!(CronSchedule::parse("* * * * * *").is_err());
        assert!(CronSchedule::parse("").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(CronSchedule::parse("60 * * * *").is_err());
        assert!(CronSchedule::parse("* 24 * * *").is_err());
        assert!(CronSchedule::parse("* * 0 * *").is_err());
        assert!(CronSchedule::parse("* * * 13 *").is_err());
        assert!(CronSchedule::parse("* * * * 8").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(CronSchedule::parse("not a cron at all x").is_err());
        assert!(CronSchedule::parse("a b c d e").is_err());
        assert!(CronSchedule::parse("*/0 * * * *").is_err());
        assert!(CronSchedule::parse("5-2 * * * *").is_err());
    }
}
