//! Uniform frame-position selection.
//!
//! [`SamplingPolicy`] decides which source frame indices a sampling run
//! visits. Both policies are pure integer arithmetic: the same `(total,
//! count)` pair always yields the same positions.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How selected positions are spread across a video of `total` frames.
///
/// When `total <= count` both policies select every frame `0..total`.
/// They only differ when `total` is not a multiple of `count`:
///
/// | total | count | `EvenSpacing` | `FixedInterval` |
/// |------:|------:|---------------|-----------------|
/// | 70 | 7 | 0, 10, 20, 30, 40, 50, 60 | 0, 10, 20, 30, 40, 50, 60 |
/// | 20 | 7 | 0, 2, 5, 8, 11, 14, 17 | 0, 2, 4, 6, 8, 10, 12 |
///
/// # Example
///
/// ```
/// use vidsift::SamplingPolicy;
///
/// let positions = SamplingPolicy::EvenSpacing.positions(70, 7);
/// assert_eq!(positions, vec![0, 10, 20, 30, 40, 50, 60]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingPolicy {
    /// Position `i` is `floor(i * total / count)`. This is the default.
    #[default]
    EvenSpacing,
    /// Step by `max(1, total / count)` from zero, clamped to the last frame.
    FixedInterval,
}

impl SamplingPolicy {
    /// Select the source frame indices to visit.
    ///
    /// The result is strictly increasing, starts at 0 when non-empty, and
    /// holds `min(total, count)` entries. A `count` of zero yields nothing.
    pub fn positions(self, total: u64, count: u64) -> Vec<u64> {
        if total == 0 || count == 0 {
            return Vec::new();
        }

        if total <= count {
            return (0..total).collect();
        }

        match self {
            SamplingPolicy::EvenSpacing => (0..count)
                .map(|i| ((i as u128 * total as u128) / count as u128) as u64)
                .collect(),
            SamplingPolicy::FixedInterval => {
                let interval = (total / count).max(1);
                (0..count)
                    .map(|i| i.saturating_mul(interval).min(total - 1))
                    .collect()
            }
        }
    }
}

impl Display for SamplingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SamplingPolicy::EvenSpacing => write!(f, "even"),
            SamplingPolicy::FixedInterval => write!(f, "interval"),
        }
    }
}

impl FromStr for SamplingPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "even" | "even-spacing" | "uniform" => Ok(SamplingPolicy::EvenSpacing),
            "interval" | "fixed-interval" | "step" => Ok(SamplingPolicy::FixedInterval),
            other => Err(format!("unknown sampling policy: {other}")),
        }
    }
}
