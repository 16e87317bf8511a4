//! Small English-grammar helpers used throughout the narrative: list
//! joining, ordinal suffixes, date and duration phrasing.
//!
//! The exact wording is part of the output contract, so these stay literal.

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// "12 Mar 2015" style dates.
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Join items as "a", "a and b", or "a, b and c" (no Oxford comma).
pub fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// English ordinal: 1st, 2nd, 3rd, 4th... with 11th-13th always "th".
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// "1 admission" / "3 admissions" style counts.
pub fn count_noun(n: usize, singular: &str) -> String {
    unit(n as i64, singular)
}

fn unit(n: i64, singular: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}s", n, singular)
    }
}

/// Phrase a duration in days the way the narrative does: weeks under 30
/// days, months under a year, then years with a months remainder.
pub fn duration_phrase(days: i64) -> String {
    if days < 30 {
        unit((days / 7).max(1), "week")
    } else if days < 365 {
        unit(days / 30, "month")
    } else {
        let years = days / 365;
        let months = (days % 365) / 30;
        if months == 0 {
            unit(years, "year")
        } else {
            format!("{} and {}", unit(years, "year"), unit(months, "month"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_list_three_items_no_oxford_comma() {
        let items = vec![
            "non-compliance".to_string(),
            "relapse".to_string(),
            "police involvement".to_string(),
        ];
        assert_eq!(join_list(&items), "non-compliance, relapse and police involvement");
    }

    #[test]
    fn test_join_list_two_items() {
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(join_list(&items), "a and b");
    }

    #[test]
    fn test_join_list_one_item() {
        assert_eq!(join_list(&["a".to_string()]), "a");
    }

    #[test]
    fn test_join_list_empty() {
        assert_eq!(join_list(&[]), "");
    }

    #[test]
    fn test_ordinal_basic_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(33), "33rd");
    }

    #[test]
    fn test_ordinal_teens_always_th() {
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(111), "111th");
        assert_eq!(ordinal(112), "112th");
    }

    #[test]
    fn test_duration_weeks_under_30_days() {
        assert_eq!(duration_phrase(5), "1 week");
        assert_eq!(duration_phrase(7), "1 week");
        assert_eq!(duration_phrase(14), "2 weeks");
        assert_eq!(duration_phrase(29), "4 weeks");
    }

    #[test]
    fn test_duration_months_under_a_year() {
        assert_eq!(duration_phrase(30), "1 month");
        assert_eq!(duration_phrase(90), "3 months");
        assert_eq!(duration_phrase(364), "12 months");
    }

    #[test]
    fn test_duration_years() {
        assert_eq!(duration_phrase(365), "1 year");
        assert_eq!(duration_phrase(730), "2 years");
        assert_eq!(duration_phrase(365 + 70), "1 year and 2 months");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(
            format_date(NaiveDate::from_ymd_opt(2015, 3, 12).unwrap()),
            "12 Mar 2015"
        );
        assert_eq!(
            format_date(NaiveDate::from_ymd_opt(2009, 11, 3).unwrap()),
            "3 Nov 2009"
        );
    }
}
