//! Rank bounds and the arithmetic done inside them.
//!
//! Ranks live in a closed integer range `[min, max]`. The defaults are
//! [`MIN_RANK`] and [`MAX_RANK`]; a process can install different bounds once
//! at startup with [`RankBounds::install`], usually from the environment via
//! [`RankBounds::from_env`].

use crate::{error::Result, Error, Rank};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::OnceLock;

/// Lowest rank a record may hold by default.
pub const MIN_RANK: Rank = 0;

/// Highest rank a record may hold by default (`2^30 - 1`).
pub const MAX_RANK: Rank = (1 << 30) - 1;

/// Rank handed out for `middle`, and for `first`/`last` in an empty group.
pub const MEDIAN_RANK: Rank = MIN_RANK + half_ceil(MAX_RANK - MIN_RANK);

/// Environment variable overriding the lower bound.
pub const MIN_RANK_VAR: &str = "RANKED_MIN_RANK";

/// Environment variable overriding the upper bound.
pub const MAX_RANK_VAR: &str = "RANKED_MAX_RANK";

static GLOBAL: OnceLock<RankBounds> = OnceLock::new();

/// `ceil(delta / 2)` for signed deltas.
pub const fn half_ceil(delta: Rank) -> Rank {
    delta.div_euclid(2) + delta.rem_euclid(2)
}

/// Inclusive range every persisted rank must fall in.
///
/// Always satisfies `min < max` with `max - min` representable as a [`Rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct RankBounds {
    min: Rank,
    max: Rank,
}

#[derive(Deserialize)]
struct RawBounds {
    min: Rank,
    max: Rank,
}

impl TryFrom<RawBounds> for RankBounds {
    type Error = Error;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl Default for RankBounds {
    fn default() -> Self {
        Self {
            min: MIN_RANK,
            max: MAX_RANK,
        }
    }
}

impl RankBounds {
    /// Create bounds, rejecting an empty or inverted range and spans too
    /// wide to subtract.
    pub fn new(min: Rank, max: Rank) -> Result<Self> {
        match max.checked_sub(min) {
            Some(span) if span > 0 => Ok(Self { min, max }),
            _ => Err(Error::InvalidBounds { min, max }),
        }
    }

    pub fn min(&self) -> Rank {
        self.min
    }

    pub fn max(&self) -> Rank {
        self.max
    }

    /// `max - min`.
    pub fn span(&self) -> Rank {
        self.max - self.min
    }

    /// Number of distinct ranks inside the bounds.
    pub fn capacity(&self) -> usize {
        usize::try_from(self.span())
            .ok()
            .and_then(|span| span.checked_add(1))
            .unwrap_or(usize::MAX)
    }

    /// Load bounds from `RANKED_MIN_RANK` / `RANKED_MAX_RANK`.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let min = read_var(MIN_RANK_VAR)?.unwrap_or(MIN_RANK);
        let max = read_var(MAX_RANK_VAR)?.unwrap_or(MAX_RANK);

        Self::new(min, max)
    }

    /// Install process-wide bounds. Fails if bounds were already installed
    /// or already read through [`RankBounds::global`].
    pub fn install(self) -> Result<()> {
        GLOBAL
            .set(self)
            .map_err(|_| Error::InvalidConfig("rank bounds already installed".into()))?;
        tracing::info!(min = self.min, max = self.max, "installed rank bounds");
        Ok(())
    }

    /// The process-wide bounds, or the defaults if none were installed.
    pub fn global() -> Self {
        *GLOBAL.get_or_init(Self::default)
    }

    /// `min + ceil((max - min) / 2)`.
    pub fn median(&self) -> Rank {
        self.min + half_ceil(self.span())
    }

    /// Whether `rank` lies inside the bounds.
    pub fn contains(&self, rank: Rank) -> bool {
        (self.min..=self.max).contains(&rank)
    }

    /// Rank halfway from `from` toward `to`, rounded up.
    ///
    /// `to` may lie on either side of `from`. The result always lies between
    /// the two, so it is computed wide and never overflows.
    pub fn midpoint(from: Rank, to: Rank) -> Rank {
        let delta = i128::from(to) - i128::from(from);
        let mid = i128::from(from) + delta.div_euclid(2) + delta.rem_euclid(2);
        mid as Rank
    }

    /// Rank of slot `k` when the range is cut into `slots` equal steps.
    ///
    /// Slots `1..slots` are strictly increasing. When the span is shorter
    /// than `slots` steps they are packed from `min` one apart instead, which
    /// stays inside the bounds as long as `slots - 1 <= capacity()`.
    pub fn slot(&self, k: usize, slots: usize) -> Rank {
        let span = self.span();
        if (span as u128) < slots as u128 {
            return self.min.saturating_add(k as Rank - 1).min(self.max);
        }

        let step = span as f64 / slots as f64;
        let offset = (step * k as f64).ceil() as Rank;
        self.min.saturating_add(offset).min(self.max)
    }
}

fn read_var(name: &str) -> Result<Option<Rank>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{name} must be an integer, got {raw:?}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(Error::InvalidConfig(format!("{name} is not valid unicode")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants() {
        assert_eq!(MIN_RANK, 0);
        assert_eq!(MAX_RANK, 1_073_741_823);
        assert_eq!(MEDIAN_RANK, 536_870_912);
        assert_eq!(RankBounds::default().median(), MEDIAN_RANK);
    }

    #[test]
    fn half_ceil_rounds_toward_positive() {
        assert_eq!(half_ceil(3), 2);
        assert_eq!(half_ceil(4), 2);
        assert_eq!(half_ceil(-3), -1);
        assert_eq!(half_ceil(-4), -2);
        assert_eq!(half_ceil(0), 0);
        assert_eq!(half_ceil(1), 1);
        assert_eq!(half_ceil(-1), 0);
    }

    #[test]
    fn midpoint_between_neighbors() {
        assert_eq!(RankBounds::midpoint(100, 200), 150);
        assert_eq!(RankBounds::midpoint(100, 101), 101);
        assert_eq!(RankBounds::midpoint(100, 100), 100);
        assert_eq!(RankBounds::midpoint(MIN_RANK, 10), 5);
        // toward the lower bound from the current first
        assert_eq!(RankBounds::midpoint(101, MIN_RANK), 51);
        assert_eq!(RankBounds::midpoint(1, MIN_RANK), 1);
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(matches!(
            RankBounds::new(5, 5),
            Err(Error::InvalidBounds { min: 5, max: 5 })
        ));
        assert!(RankBounds::new(10, 0).is_err());
        assert!(RankBounds::new(-10, 10).is_ok());
    }

    #[test]
    fn rejects_spans_that_overflow() {
        assert!(matches!(
            RankBounds::new(Rank::MIN, Rank::MAX),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(RankBounds::new(Rank::MIN, 0).is_err());

        let widest = RankBounds::new(Rank::MIN + 1, 0).unwrap();
        assert_eq!(widest.span(), Rank::MAX);
        assert!(widest.contains(widest.median()));
        assert!(widest.contains(widest.slot(1, 3)));
        assert!(widest.contains(widest.slot(2, 3)));
    }

    #[test]
    fn midpoint_of_extreme_ranks() {
        assert_eq!(RankBounds::midpoint(Rank::MIN, Rank::MAX), 0);
        assert_eq!(RankBounds::midpoint(Rank::MAX, Rank::MIN), 0);
        assert_eq!(RankBounds::midpoint(Rank::MAX, Rank::MAX), Rank::MAX);
    }

    #[test]
    fn slots_are_packed_when_span_is_short() {
        let bounds = RankBounds::new(0, 4).unwrap();
        assert_eq!(bounds.capacity(), 5);

        let slots: Vec<_> = (1..6).map(|k| bounds.slot(k, 6)).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);

        // exactly one step per slot still spaces evenly
        let slots: Vec<_> = (1..4).map(|k| bounds.slot(k, 4)).collect();
        assert_eq!(slots, vec![1, 2, 3]);
    }

    #[test]
    fn slots_are_evenly_spaced() {
        let bounds = RankBounds::new(0, 100).unwrap();
        let slots: Vec<_> = (1..4).map(|k| bounds.slot(k, 4)).collect();
        assert_eq!(slots, vec![25, 50, 75]);

        let bounds = RankBounds::new(0, 10).unwrap();
        assert_eq!(bounds.slot(1, 3), 4);
        assert_eq!(bounds.slot(2, 3), 7);
    }

    #[test]
    fn contains_is_inclusive() {
        let bounds = RankBounds::default();
        assert!(bounds.contains(MIN_RANK));
        assert!(bounds.contains(MAX_RANK));
        assert!(!bounds.contains(MAX_RANK + 1));
        assert!(!bounds.contains(-1));
    }

    #[test]
    fn bounds_serialization() {
        let bounds = RankBounds::new(-100, 100).unwrap();
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"min":-100,"max":100}"#);
        let parsed: RankBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(bounds, parsed);
    }

    #[test]
    fn deserialization_validates() {
        let inverted = serde_json::from_str::<RankBounds>(r#"{"min":5,"max":1}"#);
        let err = inverted.unwrap_err().to_string();
        assert!(err.contains("invalid rank bounds"), "{err}");

        let wide = format!(r#"{{"min":{},"max":{}}}"#, Rank::MIN, Rank::MAX);
        assert!(serde_json::from_str::<RankBounds>(&wide).is_err());
    }
}
