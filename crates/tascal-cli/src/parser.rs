use anyhow::{anyhow, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime, Weekday};
use tascal_core::models::WeekdaySet;

pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    match date_str.to_lowercase().as_str() {
        "today" => Ok(Local::now().date_naive()),
        "tomorrow" => Ok(Local::now().date_naive() + Duration::days(1)),
        _ => NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| anyhow!("Failed to parse date '{}': {}", date_str, e)),
    }
}

pub fn parse_time(time_str: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M:%S"))
        .map_err(|e| anyhow!("Failed to parse time '{}': {}", time_str, e))
}

/// Parses a comma-separated weekday list like `mon,wed,fri`.
pub fn parse_weekdays(days_str: &str) -> Result<WeekdaySet> {
    days_str
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Weekday>()
                .map_err(|_| anyhow!("Unknown weekday '{}'", part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date("2026-02-09").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
        );
        assert!(parse_date("02/09/2026").is_err());
    }

    #[test]
    fn parses_weekday_lists() {
        let days = parse_weekdays("mon, wed,FRI").unwrap();
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Wed));
        assert!(days.contains(Weekday::Fri));
        assert_eq!(days.len(), 3);
        assert!(parse_weekdays("mon,funday").is_err());
    }

    #[test]
    fn parses_times() {
        assert_eq!(
            parse_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time("9 o'clock").is_err());
    }
}
