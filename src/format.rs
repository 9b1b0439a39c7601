//! Display formatting helpers shared by the table and the info line.

/// Number formatting with the user's grouping preference from config.
#[derive(Debug, Clone, Default)]
pub struct NumberFormat {
    separator: Option<char>,
}

impl NumberFormat {
    pub fn new(separator: Option<char>) -> Self {
        Self { separator }
    }

    /// Build from the config value: the first character of the string,
    /// or no grouping when it is empty.
    pub fn from_grouping(grouping: &str) -> Self {
        Self::new(grouping.chars().next())
    }

    /// Format a count, grouping digits in threes from the right.
    pub fn format(&self, n: u64) -> String {
        let digits = n.to_string();
        let Some(sep) = self.separator else {
            return digits;
        };

        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(sep);
            }
            out.push(c);
        }
        out
    }
}

/// Format how long ago an epoch timestamp was, relative to `now_epoch`.
/// Timestamps in the future (clock skew on the producer) render as "now".
pub fn age(now_epoch: i64, then_epoch: i64) -> String {
    let secs = match now_epoch.checked_sub(then_epoch) {
        Some(d) if d > 0 => d as u64,
        _ => return "now".to_string(),
    };

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs == 0 {
            format!("{}m", mins)
        } else {
            format!("{}m {}s", mins, secs)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, mins)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours == 0 {
            format!("{}d", days)
        } else {
            format!("{}d {}h", days, hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        let fmt = NumberFormat::new(Some(','));
        assert_eq!(fmt.format(0), "0");
        assert_eq!(fmt.format(999), "999");
        assert_eq!(fmt.format(1000), "1,000");
        assert_eq!(fmt.format(1234567), "1,234,567");
    }

    #[test]
    fn test_no_grouping() {
        let fmt = NumberFormat::new(None);
        assert_eq!(fmt.format(1234567), "1234567");
        assert_eq!(NumberFormat::from_grouping("").format(1000), "1000");
    }

    #[test]
    fn test_from_grouping_takes_first_char() {
        assert_eq!(NumberFormat::from_grouping(".").format(1000), "1.000");
        assert_eq!(NumberFormat::from_grouping(" ").format(1000), "1 000");
    }

    #[test]
    fn test_age_boundaries() {
        assert_eq!(age(100, 100), "now");
        assert_eq!(age(100, 200), "now");
        assert_eq!(age(159, 100), "59s");
        assert_eq!(age(100 + 60, 100), "1m");
        assert_eq!(age(100 + 90, 100), "1m 30s");
        assert_eq!(age(100 + 3600, 100), "1h");
        assert_eq!(age(100 + 3660, 100), "1h 1m");
        assert_eq!(age(100 + 86400, 100), "1d");
        assert_eq!(age(100 + 90000, 100), "1d 1h");
    }
}
