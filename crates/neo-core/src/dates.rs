use thiserror::Error;
use time::{Date, Month, OffsetDateTime};

const MONTHS: [(&str, Month); 12] = [
    ("january", Month::January),
    ("february", Month::February),
    ("march", Month::March),
    ("april", Month::April),
    ("may", Month::May),
    ("june", Month::June),
    ("july", Month::July),
    ("august", Month::August),
    ("september", Month::September),
    ("october", Month::October),
    ("november", Month::November),
    ("december", Month::December),
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {input:?}: {reason}")]
pub struct DateError {
    pub input: String,
    pub reason: String,
}

impl DateError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Number { value: u32, digits: usize },
    Month(Month),
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Current local calendar date, falling back to UTC when the local offset
/// cannot be determined.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Parses the date formats people commonly type. Numeric dates without a
/// four-digit leading year are read month first; the day and month swap when
/// the first number cannot be a month.
pub fn parse_date(input: &str) -> Result<Date, DateError> {
    let tokens = tokenize(input)?;
    let (year, month, day) = match tokens.as_slice() {
        [Token::Number { value, digits: 8 }] => {
            let month = month_from_number(input, value / 100 % 100)?;
            (value / 10_000, month, value % 100)
        }
        [a, b, c] if tokens.iter().any(|token| matches!(token, Token::Month(_))) => {
            named_month_parts(input, [*a, *b, *c])?
        }
        [
            Token::Number {
                value: first,
                digits: first_digits,
            },
            Token::Number { value: second, .. },
            Token::Number {
                value: third,
                digits: third_digits,
            },
        ] => {
            if *first_digits == 4 {
                (*first, month_from_number(input, *second)?, *third)
            } else {
                let year = expand_year(*third, *third_digits);
                if *first > 12 && *second <= 12 {
                    (year, month_from_number(input, *second)?, *first)
                } else {
                    (year, month_from_number(input, *first)?, *second)
                }
            }
        }
        _ => return Err(DateError::new(input, "unrecognized date format")),
    };
    let year = i32::try_from(year).map_err(|_| DateError::new(input, "year out of range"))?;
    let day = u8::try_from(day).map_err(|_| DateError::new(input, "day out of range"))?;
    Date::from_calendar_date(year, month, day).map_err(|err| DateError::new(input, err.to_string()))
}

fn tokenize(input: &str) -> Result<Vec<Token>, DateError> {
    let mut tokens = Vec::new();
    let parts = input
        .trim()
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '-' | '.'))
        .filter(|part| !part.is_empty());
    for part in parts {
        if part.contains(':') && !part.contains(['T', 't']) {
            continue;
        }
        let part = strip_time_suffix(part);
        if part.chars().all(|c| c.is_ascii_digit()) {
            let value = part
                .parse::<u32>()
                .map_err(|_| DateError::new(input, "number out of range"))?;
            tokens.push(Token::Number {
                value,
                digits: part.len(),
            });
            continue;
        }
        let lower = part.to_ascii_lowercase();
        if is_weekday(&lower) {
            continue;
        }
        match month_from_name(&lower) {
            Some(month) => tokens.push(Token::Month(month)),
            None => return Err(DateError::new(input, format!("unexpected token {part:?}"))),
        }
    }
    if tokens.is_empty() {
        return Err(DateError::new(input, "empty date"));
    }
    Ok(tokens)
}

fn strip_time_suffix(part: &str) -> &str {
    match part.find(['T', 't']) {
        Some(index) if index > 0 && part[..index].chars().all(|c| c.is_ascii_digit()) => {
            &part[..index]
        }
        _ => part,
    }
}

fn is_weekday(lower: &str) -> bool {
    lower.len() >= 3 && WEEKDAYS.iter().any(|day| day.starts_with(lower))
}

fn month_from_name(lower: &str) -> Option<Month> {
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|(name, _)| name.starts_with(lower))
        .map(|(_, month)| *month)
}

fn month_from_number(input: &str, value: u32) -> Result<Month, DateError> {
    u8::try_from(value)
        .ok()
        .and_then(|value| Month::try_from(value).ok())
        .ok_or_else(|| DateError::new(input, format!("month {value} out of range")))
}

fn expand_year(value: u32, digits: usize) -> u32 {
    if digits <= 2 { 2000 + value } else { value }
}

fn named_month_parts(input: &str, tokens: [Token; 3]) -> Result<(u32, Month, u32), DateError> {
    let mut month = None;
    let mut numbers = Vec::new();
    for token in tokens {
        match token {
            Token::Month(found) if month.is_none() => month = Some(found),
            Token::Month(_) => return Err(DateError::new(input, "more than one month name")),
            Token::Number { value, digits } => numbers.push((value, digits)),
        }
    }
    let month = month.ok_or_else(|| DateError::new(input, "missing month"))?;
    let [(a, a_digits), (b, b_digits)] = numbers.as_slice() else {
        return Err(DateError::new(input, "expected a day and a year"));
    };
    let (year, day) = if *a_digits == 4 {
        (*a, *b)
    } else if *b_digits == 4 {
        (*b, *a)
    } else {
        (expand_year(*b, *b_digits), *a)
    };
    Ok((year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(input: &str) -> String {
        format_date(parse_date(input).unwrap())
    }

    #[test]
    fn iso_and_compact_forms() {
        assert_eq!(normalized("2024-03-01"), "2024-03-01");
        assert_eq!(normalized("2024/3/1"), "2024-03-01");
        assert_eq!(normalized("20240301"), "2024-03-01");
        assert_eq!(normalized("2024-03-01T10:15:00"), "2024-03-01");
        assert_eq!(normalized(" 2024-03-01 10:15:00 "), "2024-03-01");
    }

    #[test]
    fn numeric_forms_read_month_first() {
        assert_eq!(normalized("3/1/2024"), "2024-03-01");
        assert_eq!(normalized("03-01-2024"), "2024-03-01");
        assert_eq!(normalized("3.1.2024"), "2024-03-01");
        assert_eq!(normalized("3/1/24"), "2024-03-01");
    }

    #[test]
    fn day_first_when_month_is_impossible() {
        assert_eq!(normalized("25/12/2023"), "2023-12-25");
    }

    #[test]
    fn month_names() {
        assert_eq!(normalized("March 1, 2024"), "2024-03-01");
        assert_eq!(normalized("Mar 1 2024"), "2024-03-01");
        assert_eq!(normalized("1 March 2024"), "2024-03-01");
        assert_eq!(normalized("Friday, March 1, 2024"), "2024-03-01");
        assert_eq!(normalized("2024 Sept 9"), "2024-09-09");
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert!(parse_date("").is_err());
        assert!(parse_date("not a date").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("13/13/2024").is_err());
        assert!(parse_date("2024-03").is_err());
        let err = parse_date("yesterday").unwrap_err();
        assert_eq!(err.input, "yesterday");
    }

    #[test]
    fn format_pads_components() {
        let date = Date::from_calendar_date(987, Month::July, 4).unwrap();
        assert_eq!(format_date(date), "0987-07-04");
    }
}
