use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid rules: {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Point values for a graded ATS pick
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtsPoints {
    pub win: f64,
    pub push: f64,
    pub loss: f64,
}

impl Default for AtsPoints {
    fn default() -> Self {
        // Reference rules: full point for a cover, half for a push
        Self {
            win: 1.0,
            push: 0.5,
            loss: 0.0,
        }
    }
}

/// Parlay sizing and payout schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayRules {
    pub min_legs: usize,
    /// Points awarded on a hit, keyed by effective (non-push) leg count.
    /// Must be monotonically increasing with leg count.
    pub points_by_legs: BTreeMap<usize, f64>,
}

impl Default for ParlayRules {
    fn default() -> Self {
        let mut points_by_legs = BTreeMap::new();
        points_by_legs.insert(3, 5.0);
        points_by_legs.insert(4, 8.0);
        points_by_legs.insert(5, 12.0);
        points_by_legs.insert(6, 18.0);
        points_by_legs.insert(7, 25.0);
        Self {
            min_legs: 3,
            points_by_legs,
        }
    }
}

impl ParlayRules {
    /// Payout points for a hit with the given effective leg count: the
    /// largest table entry at or below the count. Counts above the table's
    /// top entry pay the top rate; counts below `min_legs` pay nothing.
    pub fn points_for_legs(&self, effective_legs: usize) -> Option<f64> {
        if effective_legs < self.min_legs {
            return None;
        }
        self.points_by_legs
            .range(..=effective_legs)
            .next_back()
            .map(|(_, points)| *points)
    }
}

/// What happens to a submission that arrives after lock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LatePolicy {
    /// Late submissions are refused outright
    Reject,
    /// Late submissions are accepted with a capped per-minute deduction
    Penalize { points_per_minute: f64, cap: f64 },
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self::Penalize {
            points_per_minute: 0.1,
            cap: 5.0,
        }
    }
}

impl LatePolicy {
    /// Penalty points for a submission this many minutes late
    pub fn penalty(&self, minutes_late: u32) -> f64 {
        match *self {
            LatePolicy::Reject => 0.0,
            LatePolicy::Penalize {
                points_per_minute,
                cap,
            } => (minutes_late as f64 * points_per_minute).min(cap),
        }
    }
}

/// What happens to a weekly pot when the top score is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotTiePolicy {
    /// Split evenly across tied contestants, largest-remainder on the cents
    Split,
    /// Leave the pot unclaimed and roll the amount into the mega pot
    RollToMega,
}

impl Default for PotTiePolicy {
    fn default() -> Self {
        Self::Split
    }
}

/// Prize pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotRules {
    pub tie_policy: PotTiePolicy,
    /// Default weekly pot size in cents when one is not explicitly funded
    pub weekly_amount_cents: i64,
}

impl Default for PotRules {
    fn default() -> Self {
        Self {
            tie_policy: PotTiePolicy::Split,
            weekly_amount_cents: 52_000, // $520
        }
    }
}

/// The complete house-rules contract injected into the graders. Every
/// scoring constant lives here so a rule change never touches grading logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseRules {
    pub ats: AtsPoints,
    pub parlay: ParlayRules,
    pub late_policy: LatePolicy,
    pub pot: PotRules,
}

impl HouseRules {
    /// Load rules from a JSON file, falling back to the reference defaults
    /// when the path does not exist
    pub fn load(path: &str) -> Result<Self, RulesError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| RulesError::Io {
            path: path.to_string(),
            source: e,
        })?;
        let rules: HouseRules = serde_json::from_str(&text).map_err(|e| RulesError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Structural validation: reject tables a grader could not apply sanely
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.ats.win < self.ats.push || self.ats.push < self.ats.loss {
            return Err(RulesError::Invalid {
                field: "ats".into(),
                message: format!(
                    "point values must satisfy win >= push >= loss, got {}/{}/{}",
                    self.ats.win, self.ats.push, self.ats.loss
                ),
            });
        }

        if self.parlay.min_legs < 2 {
            return Err(RulesError::Invalid {
                field: "parlay.min_legs".into(),
                message: format!("must be at least 2, got {}", self.parlay.min_legs),
            });
        }

        if !self.parlay.points_by_legs.contains_key(&self.parlay.min_legs) {
            return Err(RulesError::Invalid {
                field: "parlay.points_by_legs".into(),
                message: format!("missing entry for min_legs = {}", self.parlay.min_legs),
            });
        }

        // The payout schedule must increase with leg count
        let mut prev: Option<(usize, f64)> = None;
        for (&legs, &points) in &self.parlay.points_by_legs {
            if points <= 0.0 {
                return Err(RulesError::Invalid {
                    field: "parlay.points_by_legs".into(),
                    message: format!("{} legs pays {}, must be > 0", legs, points),
                });
            }
            if let Some((prev_legs, prev_points)) = prev {
                if points <= prev_points {
                    return Err(RulesError::Invalid {
                        field: "parlay.points_by_legs".into(),
                        message: format!(
                            "{} legs pays {} but {} legs pays {}; schedule must increase",
                            prev_legs, prev_points, legs, points
                        ),
                    });
                }
            }
            prev = Some((legs, points));
        }

        if let LatePolicy::Penalize {
            points_per_minute,
            cap,
        } = self.late_policy
        {
            if points_per_minute < 0.0 || cap < 0.0 {
                return Err(RulesError::Invalid {
                    field: "late_policy".into(),
                    message: format!(
                        "points_per_minute and cap must be >= 0, got {} / {}",
                        points_per_minute, cap
                    ),
                });
            }
        }

        if self.pot.weekly_amount_cents < 0 {
            return Err(RulesError::Invalid {
                field: "pot.weekly_amount_cents".into(),
                message: format!("must be >= 0, got {}", self.pot.weekly_amount_cents),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_validate() {
        HouseRules::default().validate().expect("defaults are valid");
    }

    #[test]
    fn default_parlay_table_lookup() {
        let rules = ParlayRules::default();
        assert_eq!(rules.points_for_legs(3), Some(5.0));
        assert_eq!(rules.points_for_legs(5), Some(12.0));
        // Below the minimum there is no payout entry
        assert_eq!(rules.points_for_legs(2), None);
        // Above the table top, pay the top rate
        assert_eq!(rules.points_for_legs(9), Some(25.0));
    }

    #[test]
    fn rejects_non_monotonic_parlay_table() {
        let mut rules = HouseRules::default();
        rules.parlay.points_by_legs.insert(4, 4.0); // below the 3-leg rate

        let err = rules.validate().unwrap_err();
        match err {
            RulesError::Invalid { field, .. } => assert_eq!(field, "parlay.points_by_legs"),
            other => panic!("expected Invalid, got: {other}"),
        }
    }

    #[test]
    fn rejects_push_worth_more_than_win() {
        let mut rules = HouseRules::default();
        rules.ats.push = 2.0;

        let err = rules.validate().unwrap_err();
        match err {
            RulesError::Invalid { field, .. } => assert_eq!(field, "ats"),
            other => panic!("expected Invalid, got: {other}"),
        }
    }

    #[test]
    fn late_penalty_is_capped() {
        let policy = LatePolicy::Penalize {
            points_per_minute: 0.1,
            cap: 5.0,
        };
        assert!((policy.penalty(10) - 1.0).abs() < 1e-9);
        assert!((policy.penalty(500) - 5.0).abs() < 1e-9);
        assert_eq!(LatePolicy::Reject.penalty(10), 0.0);
    }

    #[test]
    fn rules_round_trip_through_json() {
        let rules = HouseRules::default();
        let json = serde_json::to_string(&rules).unwrap();
        let back: HouseRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back.parlay.min_legs, rules.parlay.min_legs);
        assert_eq!(back.pot.weekly_amount_cents, 52_000);
        assert_eq!(back.pot.tie_policy, PotTiePolicy::Split);
    }

    #[test]
    fn empty_json_object_uses_defaults() {
        let rules: HouseRules = serde_json::from_str("{}").unwrap();
        assert_eq!(rules.parlay.min_legs, 3);
        assert!((rules.ats.win - 1.0).abs() < f64::EPSILON);
    }
}
