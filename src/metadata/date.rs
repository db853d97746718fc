//! Partially known release dates.

use std::fmt;

use serde::Serialize;

use super::Completeness;

/// A release date whose components may each be unknown.
///
/// `is_guessed` marks dates inferred from weak evidence (a year in a file
/// name, say). A guessed date counts for no more than no date at all when
/// merging; see [`Completeness`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Date {
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub is_guessed: bool,
}

impl Date {
    pub fn new(year: Option<u16>, month: Option<u8>, day: Option<u8>) -> Self {
        Self {
            year,
            month: month.filter(|m| (1..=12).contains(m)),
            day: day.filter(|d| (1..=31).contains(d)),
            is_guessed: false,
        }
    }

    pub fn year(year: u16) -> Self {
        Self::new(Some(year), None, None)
    }

    pub fn guessed(mut self) -> Self {
        self.is_guessed = true;
        self
    }

    /// Parse a `YYYYMMDD` header field. Any component that is not all
    /// digits (`1995????`, `19950 00`) is left unknown.
    pub fn from_yyyymmdd(text: &str) -> Option<Self> {
        fn digits(s: Option<&str>) -> Option<&str> {
            s.filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        }
        let year = digits(text.get(0..4)).and_then(|y| y.parse().ok());
        let month = digits(text.get(4..6)).and_then(|m| m.parse().ok());
        let day = digits(text.get(6..8)).and_then(|d| d.parse().ok());
        let date = Self::new(year, month, day);
        date.year.map(|_| date)
    }

    /// Number of known components.
    pub fn known(&self) -> u32 {
        u32::from(self.year.is_some()) + u32::from(self.month.is_some()) + u32::from(self.day.is_some())
    }
}

impl Completeness for Date {
    fn completeness(&self) -> u32 {
        if self.is_guessed { 0 } else { 1 + self.known() }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(y) => write!(f, "{y:04}")?,
            None => f.write_str("????")?,
        }
        match self.month {
            Some(m) => write!(f, "-{m:02}")?,
            None => f.write_str("-??")?,
        }
        match self.day {
            Some(d) => write!(f, "-{d:02}")?,
            None => f.write_str("-??")?,
        }
        if self.is_guessed {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_header_dates() {
        assert_eq!(Date::from_yyyymmdd("19941122"), Some(Date::new(Some(1994), Some(11), Some(22))));
        let partial = Date::from_yyyymmdd("1995????").unwrap();
        assert_eq!(partial.known(), 1);
        assert_eq!(partial.to_string(), "1995-??-??");
        assert_eq!(Date::from_yyyymmdd("????0101"), None);
        assert_eq!(Date::from_yyyymmdd("19951399").unwrap().month, None);
    }

    #[test]
    fn guessed_ranks_with_nothing() {
        let guessed = Date::new(Some(1998), Some(3), Some(1)).guessed();
        assert_eq!(guessed.completeness(), 0);
        assert!(Date::year(1998).completeness() > guessed.completeness());
        assert!(Date::new(Some(1998), Some(3), None).completeness() > Date::year(1998).completeness());
    }
}
