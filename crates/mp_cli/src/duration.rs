use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A duration written like `30s`, `5m`, `1h15m` or `1d`. A bare number is
/// taken as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3600),
        'd' => Some(86400),
        _ => None,
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("Duration must include a number".to_string());
        }
        let too_long = || format!("Duration is too long: {}", s);
        let mut total: u64 = 0;
        let mut pending: Option<u64> = None;

        for c in s.chars().filter(|c| !c.is_whitespace()) {
            if let Some(digit) = c.to_digit(10) {
                let value = pending
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u64::from(digit)))
                    .ok_or_else(too_long)?;
                pending = Some(value);
                continue;
            }

            let unit = unit_seconds(c).ok_or_else(|| format!("Invalid duration unit: {}", c))?;
            let value = pending.take().ok_or_else(|| format!("Unit '{}' has no number", c))?;
            total = value
                .checked_mul(unit)
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or_else(too_long)?;
        }

        // A trailing bare number counts as seconds
        let total = match pending {
            Some(seconds) => total.checked_add(seconds).ok_or_else(too_long)?,
            None => total,
        };
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs())
    }
}

impl From<HumanDuration> for Duration {
    fn from(d: HumanDuration) -> Self {
        d.0
    }
}
