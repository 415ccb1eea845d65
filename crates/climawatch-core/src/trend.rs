//! Three-state trend over the two most recent samples.

use serde::{Deserialize, Serialize};

use crate::window::Sample;

/// Short-term direction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Self::Increasing => "Increasing",
            Self::Decreasing => "Decreasing",
            Self::Stable => "Stable",
        }
    }

    /// Single-character arrow for compact displays.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Increasing => "↑",
            Self::Decreasing => "↓",
            Self::Stable => "→",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Compare the last sample against the one before it.
///
/// Fewer than two samples, equal values, or an incomparable (NaN) pair all
/// yield [`Trend::Stable`].
pub fn classify(samples: &[Sample]) -> Trend {
    match samples {
        [.., prev, last] => {
            if last.value > prev.value {
                Trend::Increasing
            } else if last.value < prev.value {
                Trend::Decreasing
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as u64, v))
            .collect()
    }

    #[test]
    fn test_empty_and_single_are_stable() {
        assert_eq!(classify(&[]), Trend::Stable);
        assert_eq!(classify(&series(&[42.0])), Trend::Stable);
    }

    #[test]
    fn test_increasing_then_stable() {
        let mut s = series(&[20.0, 21.5]);
        assert_eq!(classify(&s), Trend::Increasing);
        s.push(Sample::new(2, 21.5));
        assert_eq!(classify(&s), Trend::Stable);
    }

    #[test]
    fn test_decreasing() {
        assert_eq!(classify(&series(&[5.0, 9.0, 3.2])), Trend::Decreasing);
    }

    #[test]
    fn test_only_last_two_matter() {
        assert_eq!(classify(&series(&[100.0, 0.0, 1.0])), Trend::Increasing);
    }

    #[test]
    fn test_idempotent() {
        let s = series(&[1.0, 2.0]);
        assert_eq!(classify(&s), classify(&s));
    }

    #[test]
    fn test_display() {
        assert_eq!(Trend::Increasing.to_string(), "Increasing");
        assert_eq!(Trend::default(), Trend::Stable);
    }
}
