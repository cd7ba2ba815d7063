use chrono::{Datelike, NaiveDateTime};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month, ordered chronologically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn of(datetime: &NaiveDateTime) -> Self {
        Self(datetime.year(), datetime.month())
    }

    pub fn succ(self) -> Self {
        if self.1 >= 12 {
            Self(self.0 + 1, 1)
        } else {
            Self(self.0, self.1 + 1)
        }
    }

    /// Every month from `start` to `end`, both included.
    pub fn range_inclusive(start: Month, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            current = current.succ();
        }
        months
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_crosses_year_boundary() {
        let months = Month::range_inclusive(Month(2020, 11), Month(2021, 2));
        let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, ["2020-11", "2020-12", "2021-01", "2021-02"]);
        assert!(Month::range_inclusive(Month(2021, 2), Month(2021, 1)).is_empty());
    }
}
