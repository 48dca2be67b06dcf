//! Recurrence expansion: template schedule -> ordered calendar dates.
//!
//! Expansion is pure and re-derivable; the resulting sequence is never
//! cached as authoritative state.

use chrono::{Datelike, Months, NaiveDate};

use crate::models::{TaskRow, WeekdaySet};

/// A template without an explicit `end_date` expands this far past its
/// `start_date`.
pub const DEFAULT_HORIZON_MONTHS: u32 = 3;

/// Expands a schedule into every occurrence date in `[start, end]`,
/// inclusive of both endpoints.
///
/// A non-empty weekday set wins over a month interval; with neither, the
/// schedule degrades to a one-month interval. `end < start` and weekday
/// sets matching no day in range yield empty sequences, not errors.
pub fn expand(
    start: NaiveDate,
    end: NaiveDate,
    days: Option<&WeekdaySet>,
    interval_months: Option<u32>,
) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }

    match days {
        Some(set) if !set.is_empty() => start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| set.contains(date.weekday()))
            .collect(),
        _ => {
            // Each step is computed from `start`, not from the previous
            // (possibly month-end-clamped) result, so Jan 31 + 2x1 month
            // lands on Mar 31 rather than drifting to Mar 28.
            let interval = interval_months.unwrap_or(1).max(1);
            let mut dates = Vec::new();
            for step in 0u32.. {
                let Some(months) = interval.checked_mul(step) else {
                    break;
                };
                let Some(date) = start.checked_add_months(Months::new(months)) else {
                    break;
                };
                if date > end {
                    break;
                }
                dates.push(date);
            }
            dates
        }
    }
}

/// The implied end of a template whose `end_date` is unset.
pub fn default_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(DEFAULT_HORIZON_MONTHS))
        .unwrap_or(start)
}

/// Expands a template row over its own `[start_date, end_date]` range.
/// Rows without a `start_date` expand to nothing.
pub fn expand_template(template: &TaskRow) -> Vec<NaiveDate> {
    let Some(start) = template.start_date else {
        return Vec::new();
    };
    let end = template.end_date.unwrap_or_else(|| default_end(start));
    expand(
        start,
        end,
        template.days_selected.as_ref(),
        template.recurrence_interval,
    )
}
