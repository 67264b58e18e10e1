pub mod ats;
pub mod parlay;
pub mod payouts;
pub mod standings;
pub mod validator;

use thiserror::Error;

/// Data-integrity failures during grading. These are logged and the
/// affected record is excluded from aggregation; they never abort a
/// settlement run.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("game {game_id} is final but is missing a score")]
    MissingFinalScore { game_id: String },

    #[error("pick references team {team}, which is not playing in game {game_id}")]
    TeamNotInGame { team: String, game_id: String },
}
