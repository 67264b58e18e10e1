use crate::models::{AtsPick, Game, PickResult};
use crate::rules::AtsPoints;
use crate::scoring::GradeError;

/// Result of grading one ATS pick. `Pending` is a legitimate state, not an
/// error: grading is idempotent and safe to call until the game finalizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtsGrade {
    Pending,
    Graded { result: PickResult, points: f64 },
}

/// Grade an against-the-spread pick for a game.
///
/// The spread is stored home-team-relative (negative = home favored), so
/// the cover test is a single adjusted margin:
///
///   adjusted_home_margin = (home_score - away_score) + spread_at_pick
///
/// A home pick wins when the adjusted margin is positive, an away pick
/// when it is negative, and exactly zero is a push for either side. A
/// fractional spread (e.g. -2.5) can never land on zero, so pushes only
/// arise from integer spreads; no special casing is needed.
pub fn grade_ats_pick(
    pick: &AtsPick,
    game: &Game,
    points: &AtsPoints,
) -> Result<AtsGrade, GradeError> {
    if !game.is_final() {
        return Ok(AtsGrade::Pending);
    }

    let margin = game
        .home_margin()
        .ok_or_else(|| GradeError::MissingFinalScore {
            game_id: game.id.clone(),
        })?;

    let picked_home = if pick.team == game.home_team {
        true
    } else if pick.team == game.away_team {
        false
    } else {
        return Err(GradeError::TeamNotInGame {
            team: pick.team.clone(),
            game_id: game.id.clone(),
        });
    };

    let adjusted_home_margin = margin as f64 + pick.spread_at_pick;

    let result = if adjusted_home_margin == 0.0 {
        PickResult::Push
    } else if (adjusted_home_margin > 0.0) == picked_home {
        PickResult::Win
    } else {
        PickResult::Loss
    };

    let earned = match result {
        PickResult::Win => points.win,
        PickResult::Push => points.push,
        PickResult::Loss => points.loss,
    };

    Ok(AtsGrade::Graded {
        result,
        points: earned,
    })
}
