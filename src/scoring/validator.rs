use crate::models::{AtsPick, Game, Parlay, ParlayLeg, ParlayStatus};
use crate::rules::{HouseRules, LatePolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Submission failures surfaced to the contestant. All are recoverable by
/// fixing the request and resubmitting.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("expected one ATS pick for each of {expected} games, got {got}")]
    IncompletePicks { expected: usize, got: usize },

    #[error("two ATS picks submitted for game {game_id}")]
    DuplicateAtsPick { game_id: String },

    #[error("parlay needs at least {min} legs, got {got}")]
    InsufficientParlayLegs { got: usize, min: usize },

    #[error("parlay references game {game_id} more than once")]
    DuplicateGameInParlay { game_id: String },

    #[error("submissions for week {week} locked at {lock_time}")]
    SubmissionLocked { week: u8, lock_time: DateTime<Utc> },

    #[error("no lock time recorded for week {week}; sync the week first")]
    LockTimeUnknown { week: u8 },

    #[error("pick references unknown game {game_id}")]
    UnknownGame { game_id: String },

    #[error("team {team} is not playing in game {game_id}")]
    UnknownTeam { team: String, game_id: String },

    #[error("no usable line for game {game_id} at pick time")]
    InconsistentLineData { game_id: String },

    #[error("submission for week {week} was changed concurrently; retry with the latest version")]
    ConcurrentSubmission { week: u8 },
}

/// One chosen side of one game, as it arrives from the submitting client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickChoice {
    pub game_id: String,
    pub team: String,
}

/// A submission that passed validation, with lines frozen. This is the
/// only place live lines are captured into picks and legs.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub contestant_id: String,
    pub week: u8,
    pub picks: Vec<AtsPick>,
    pub parlay: Parlay,
    pub late: bool,
    pub minutes_late: u32,
}

/// Validate a week's submission against the lock clock and completeness
/// rules, freezing `spread_at_pick` / `ml_at_pick` from the live lines.
///
/// Pure decision function: reports lateness but never computes a penalty
/// value, and persists nothing. The caller holds the submission critical
/// section across the single `now` read, this call, and the store write.
#[allow(clippy::too_many_arguments)]
pub fn validate_submission(
    contestant_id: &str,
    week: u8,
    picks: &[PickChoice],
    parlay_legs: &[PickChoice],
    games: &[Game],
    now: DateTime<Utc>,
    lock_time: DateTime<Utc>,
    rules: &HouseRules,
) -> Result<ValidatedSubmission, SubmitError> {
    let (late, minutes_late) = lateness(now, lock_time);
    if late && rules.late_policy == LatePolicy::Reject {
        return Err(SubmitError::SubmissionLocked { week, lock_time });
    }

    let games_by_id: HashMap<&str, &Game> = games.iter().map(|g| (g.id.as_str(), g)).collect();

    // Exactly one ATS pick per game in the week
    if picks.len() != games.len() {
        return Err(SubmitError::IncompletePicks {
            expected: games.len(),
            got: picks.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut frozen_picks = Vec::with_capacity(picks.len());
    for choice in picks {
        let game = lookup(&games_by_id, choice)?;
        if !seen.insert(game.id.clone()) {
            return Err(SubmitError::DuplicateAtsPick {
                game_id: game.id.clone(),
            });
        }

        // Freeze the live spread; a missing or non-finite line fails the
        // submission rather than defaulting to zero
        let spread = game
            .spread_current
            .filter(|s| s.is_finite())
            .ok_or_else(|| SubmitError::InconsistentLineData {
                game_id: game.id.clone(),
            })?;

        frozen_picks.push(AtsPick {
            contestant_id: contestant_id.to_string(),
            game_id: game.id.clone(),
            week,
            team: choice.team.clone(),
            spread_at_pick: spread,
            result: None,
            points_earned: None,
        });
    }

    if parlay_legs.len() < rules.parlay.min_legs {
        return Err(SubmitError::InsufficientParlayLegs {
            got: parlay_legs.len(),
            min: rules.parlay.min_legs,
        });
    }

    let mut seen_legs = HashSet::new();
    let mut frozen_legs = Vec::with_capacity(parlay_legs.len());
    for choice in parlay_legs {
        let game = lookup(&games_by_id, choice)?;
        if !seen_legs.insert(game.id.clone()) {
            return Err(SubmitError::DuplicateGameInParlay {
                game_id: game.id.clone(),
            });
        }

        let ml = if choice.team == game.home_team {
            game.ml_home_current
        } else {
            game.ml_away_current
        };
        let ml = ml.ok_or_else(|| SubmitError::InconsistentLineData {
            game_id: game.id.clone(),
        })?;

        frozen_legs.push(ParlayLeg {
            game_id: game.id.clone(),
            team: choice.team.clone(),
            ml_at_pick: ml,
        });
    }

    Ok(ValidatedSubmission {
        contestant_id: contestant_id.to_string(),
        week,
        picks: frozen_picks,
        parlay: Parlay {
            contestant_id: contestant_id.to_string(),
            week,
            legs: frozen_legs,
            status: ParlayStatus::Pending,
            points_earned: None,
        },
        late,
        minutes_late,
    })
}

fn lookup<'a>(
    games_by_id: &HashMap<&str, &'a Game>,
    choice: &PickChoice,
) -> Result<&'a Game, SubmitError> {
    let game = games_by_id
        .get(choice.game_id.as_str())
        .ok_or_else(|| SubmitError::UnknownGame {
            game_id: choice.game_id.clone(),
        })?;
    if choice.team != game.home_team && choice.team != game.away_team {
        return Err(SubmitError::UnknownTeam {
            team: choice.team.clone(),
            game_id: game.id.clone(),
        });
    }
    Ok(game)
}

/// Whether `now` is past the lock, and by how many whole-or-partial
/// minutes (ceiling)
fn lateness(now: DateTime<Utc>, lock_time: DateTime<Utc>) -> (bool, u32) {
    let secs = (now - lock_time).num_seconds();
    if secs <= 0 {
        return (false, 0);
    }
    (true, (secs as u64).div_ceil(60) as u32)
}
