use crate::models::{Game, LegOutcome, Parlay, ParlayLeg, ParlayStatus};
use crate::rules::ParlayRules;
use crate::scoring::GradeError;
use std::collections::HashMap;

/// Result of a parlay grading pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParlayGrade {
    /// At least one referenced game has not finalized
    Pending,
    Graded {
        status: ParlayStatus,
        points: f64,
        /// Legs remaining after pushes are removed
        effective_legs: usize,
    },
}

/// Outcome of a single leg, derived as a moneyline result: the team with
/// the strictly higher final score wins; equal scores are a push.
pub fn leg_outcome(leg: &ParlayLeg, game: &Game) -> Result<LegOutcome, GradeError> {
    let margin = game
        .home_margin()
        .ok_or_else(|| GradeError::MissingFinalScore {
            game_id: game.id.clone(),
        })?;

    let picked_home = if leg.team == game.home_team {
        true
    } else if leg.team == game.away_team {
        false
    } else {
        return Err(GradeError::TeamNotInGame {
            team: leg.team.clone(),
            game_id: game.id.clone(),
        });
    };

    Ok(if margin == 0 {
        LegOutcome::Push
    } else if (margin > 0) == picked_home {
        LegOutcome::Win
    } else {
        LegOutcome::Loss
    })
}

/// Grade a parlay against the week's games, all-or-nothing.
///
/// A pushed leg (tied moneyline game) is removed without busting the
/// parlay; if the remaining legs fall below the configured minimum the
/// parlay is no-contest. Any single loss busts the whole thing. A hit pays
/// the schedule rate for the effective leg count — a 4-leg parlay with one
/// push pays the 3-leg rate.
pub fn grade_parlay(
    parlay: &Parlay,
    games_by_id: &HashMap<String, Game>,
    rules: &ParlayRules,
) -> Result<ParlayGrade, GradeError> {
    // Blocked until every referenced game is final
    for leg in &parlay.legs {
        match games_by_id.get(&leg.game_id) {
            Some(game) if game.is_final() => {}
            _ => return Ok(ParlayGrade::Pending),
        }
    }

    let mut effective_legs = 0usize;
    let mut any_loss = false;

    for leg in &parlay.legs {
        let game = &games_by_id[&leg.game_id];
        match leg_outcome(leg, game)? {
            LegOutcome::Win => effective_legs += 1,
            LegOutcome::Loss => {
                effective_legs += 1;
                any_loss = true;
            }
            LegOutcome::Push => {} // removed from the parlay
        }
    }

    // A loss busts regardless of how many legs pushed out
    if any_loss {
        return Ok(ParlayGrade::Graded {
            status: ParlayStatus::Busted,
            points: 0.0,
            effective_legs,
        });
    }

    if effective_legs < rules.min_legs {
        return Ok(ParlayGrade::Graded {
            status: ParlayStatus::NoContest,
            points: 0.0,
            effective_legs,
        });
    }

    let points = rules.points_for_legs(effective_legs).unwrap_or(0.0);
    Ok(ParlayGrade::Graded {
        status: ParlayStatus::Hit,
        points,
        effective_legs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use chrono::Utc;

    fn final_game(id: &str, home: &str, away: &str, home_score: u32, away_score: u32) -> Game {
        Game {
            id: id.into(),
            home_team: home.into(),
            away_team: away.into(),
            kickoff_time: Utc::now(),
            status: GameStatus::Final,
            week: 18,
            home_score: Some(home_score),
            away_score: Some(away_score),
            spread_current: None,
            total_current: None,
            ml_home_current: None,
            ml_away_current: None,
            possession: None,
            yard_line: None,
            down: None,
            distance: None,
            quarter: None,
            time_remaining: None,
            is_redzone: false,
        }
    }

    fn games(list: Vec<Game>) -> HashMap<String, Game> {
        list.into_iter().map(|g| (g.id.clone(), g)).collect()
    }

    fn leg(game_id: &str, team: &str) -> ParlayLeg {
        ParlayLeg {
            game_id: game_id.into(),
            team: team.into(),
            ml_at_pick: -110,
        }
    }

    fn parlay(legs: Vec<ParlayLeg>) -> Parlay {
        Parlay {
            contestant_id: "c1".into(),
            week: 18,
            legs,
            status: ParlayStatus::Pending,
            points_earned: None,
        }
    }

    #[test]
    fn all_legs_win_hits_at_the_three_leg_rate() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            final_game("g3", "SF", "SEA", 17, 14),
        ]);
        let p = parlay(vec![leg("g1", "KC"), leg("g2", "PHI"), leg("g3", "SF")]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(
            graded,
            ParlayGrade::Graded {
                status: ParlayStatus::Hit,
                points: 5.0,
                effective_legs: 3,
            }
        );
    }

    #[test]
    fn single_loss_busts_the_whole_parlay() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            final_game("g3", "SF", "SEA", 14, 17), // SF loses
            final_game("g4", "GB", "CHI", 28, 3),
        ]);
        let p = parlay(vec![
            leg("g1", "KC"),
            leg("g2", "PHI"),
            leg("g3", "SF"),
            leg("g4", "GB"),
        ]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(
            graded,
            ParlayGrade::Graded {
                status: ParlayStatus::Busted,
                points: 0.0,
                effective_legs: 4,
            }
        );
    }

    #[test]
    fn push_leg_drops_three_leg_parlay_to_no_contest() {
        // Two wins plus a tied game: effective legs fall to 2, below the
        // 3-leg minimum
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            final_game("g3", "SF", "SEA", 20, 20), // tie -> push
        ]);
        let p = parlay(vec![leg("g1", "KC"), leg("g2", "PHI"), leg("g3", "SF")]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(
            graded,
            ParlayGrade::Graded {
                status: ParlayStatus::NoContest,
                points: 0.0,
                effective_legs: 2,
            }
        );
    }

    #[test]
    fn push_in_four_leg_parlay_pays_three_leg_rate() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            final_game("g3", "SF", "SEA", 20, 20), // push
            final_game("g4", "GB", "CHI", 28, 3),
        ]);
        let p = parlay(vec![
            leg("g1", "KC"),
            leg("g2", "PHI"),
            leg("g3", "SF"),
            leg("g4", "GB"),
        ]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(
            graded,
            ParlayGrade::Graded {
                status: ParlayStatus::Hit,
                points: 5.0,
                effective_legs: 3,
            }
        );
    }

    #[test]
    fn push_plus_loss_is_still_a_bust() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 20, 20),  // push
            final_game("g2", "PHI", "DAL", 10, 30), // PHI loses
            final_game("g3", "SF", "SEA", 17, 14),
        ]);
        let p = parlay(vec![leg("g1", "KC"), leg("g2", "PHI"), leg("g3", "SF")]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        match graded {
            ParlayGrade::Graded { status, points, .. } => {
                assert_eq!(status, ParlayStatus::Busted);
                assert_eq!(points, 0.0);
            }
            ParlayGrade::Pending => panic!("all games final, must grade"),
        }
    }

    #[test]
    fn pending_until_every_leg_is_final() {
        let mut g3 = final_game("g3", "SF", "SEA", 17, 14);
        g3.status = GameStatus::InProgress;
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            g3,
        ]);
        let p = parlay(vec![leg("g1", "KC"), leg("g2", "PHI"), leg("g3", "SF")]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(graded, ParlayGrade::Pending);
    }

    #[test]
    fn missing_game_record_leaves_parlay_pending() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
        ]);
        let p = parlay(vec![leg("g1", "KC"), leg("g2", "PHI"), leg("g9", "SF")]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(graded, ParlayGrade::Pending);
    }

    #[test]
    fn away_leg_wins_on_road_upset() {
        let game = final_game("g1", "KC", "BUF", 21, 24);
        let outcome = leg_outcome(&leg("g1", "BUF"), &game).unwrap();
        assert_eq!(outcome, LegOutcome::Win);
        let outcome = leg_outcome(&leg("g1", "KC"), &game).unwrap();
        assert_eq!(outcome, LegOutcome::Loss);
    }

    #[test]
    fn five_leg_hit_pays_the_five_leg_rate() {
        let games = games(vec![
            final_game("g1", "KC", "BUF", 24, 21),
            final_game("g2", "PHI", "DAL", 30, 10),
            final_game("g3", "SF", "SEA", 17, 14),
            final_game("g4", "GB", "CHI", 28, 3),
            final_game("g5", "DET", "MIN", 31, 27),
        ]);
        let p = parlay(vec![
            leg("g1", "KC"),
            leg("g2", "PHI"),
            leg("g3", "SF"),
            leg("g4", "GB"),
            leg("g5", "DET"),
        ]);

        let graded = grade_parlay(&p, &games, &ParlayRules::default()).unwrap();
        assert_eq!(
            graded,
            ParlayGrade::Graded {
                status: ParlayStatus::Hit,
                points: 12.0,
                effective_legs: 5,
            }
        );
    }
}
