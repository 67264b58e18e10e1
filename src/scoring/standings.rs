use crate::models::{AtsPick, Parlay, ParlayStatus, PickResult, Standing, WeekSubmission};
use std::collections::BTreeMap;

/// Recompute season standings from scratch over every graded pick, parlay,
/// and submission record.
///
/// Always derives totals fresh; nothing here increments a running counter,
/// so the pass is idempotent and safe to re-run after any grading pass.
/// Ungraded picks and pending parlays simply contribute nothing yet.
pub fn recompute_standings(
    picks: &[AtsPick],
    parlays: &[Parlay],
    submissions: &[WeekSubmission],
) -> Vec<Standing> {
    fn entry<'a>(map: &'a mut BTreeMap<String, Standing>, id: &str) -> &'a mut Standing {
        map.entry(id.to_string()).or_insert_with(|| Standing {
            contestant_id: id.to_string(),
            ats_wins: 0,
            ats_losses: 0,
            ats_pushes: 0,
            ats_points: 0.0,
            parlays_hit: 0,
            parlays_busted: 0,
            parlay_points: 0.0,
            penalty_points: 0.0,
            total_points: 0.0,
            rank: 0,
        })
    }

    // BTreeMap keeps the accumulation order deterministic
    let mut by_contestant: BTreeMap<String, Standing> = BTreeMap::new();

    for pick in picks {
        let standing = entry(&mut by_contestant, &pick.contestant_id);
        match pick.result {
            Some(PickResult::Win) => standing.ats_wins += 1,
            Some(PickResult::Loss) => standing.ats_losses += 1,
            Some(PickResult::Push) => standing.ats_pushes += 1,
            None => {}
        }
        standing.ats_points += pick.points_earned.unwrap_or(0.0);
    }

    for parlay in parlays {
        let standing = entry(&mut by_contestant, &parlay.contestant_id);
        match parlay.status {
            ParlayStatus::Hit => standing.parlays_hit += 1,
            ParlayStatus::Busted => standing.parlays_busted += 1,
            ParlayStatus::Pending | ParlayStatus::NoContest => {}
        }
        standing.parlay_points += parlay.points_earned.unwrap_or(0.0);
    }

    for submission in submissions {
        let standing = entry(&mut by_contestant, &submission.contestant_id);
        standing.penalty_points += submission.late_penalty;
    }

    let mut standings: Vec<Standing> = by_contestant
        .into_values()
        .map(|mut s| {
            s.total_points = s.ats_points + s.parlay_points - s.penalty_points;
            s
        })
        .collect();

    // Sort descending by total; equal totals keep contestant-id order so
    // output is stable across runs
    standings.sort_by(|a, b| {
        b.total_points
            .partial_cmp(&a.total_points)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.contestant_id.cmp(&b.contestant_id))
    });

    assign_ranks(&mut standings);
    standings
}

/// Two point totals that differ by less than this are the same score.
/// Totals are sums of halves and tenths, so accumulated float error is far
/// smaller than any real scoring difference.
pub const POINTS_EPSILON: f64 = 1e-9;

/// Standard competition ranking: rank = 1 + number of contestants strictly
/// ahead, so ties share a rank and the next distinct total skips (1,1,3).
fn assign_ranks(standings: &mut [Standing]) {
    let mut current_rank = 0u32;
    let mut prev_total = f64::INFINITY;
    for (index, standing) in standings.iter_mut().enumerate() {
        if prev_total - standing.total_points > POINTS_EPSILON {
            current_rank = index as u32 + 1;
            prev_total = standing.total_points;
        }
        standing.rank = current_rank;
    }
}

/// Aggregated points for one week: ATS + parlay - late penalty, per
/// contestant. Used to fill `WeekSubmission::week_points` and to pick the
/// weekly pot winner.
pub fn weekly_totals(
    week: u8,
    picks: &[AtsPick],
    parlays: &[Parlay],
    submissions: &[WeekSubmission],
) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for pick in picks.iter().filter(|p| p.week == week) {
        *totals.entry(pick.contestant_id.clone()).or_default() +=
            pick.points_earned.unwrap_or(0.0);
    }
    for parlay in parlays.iter().filter(|p| p.week == week) {
        *totals.entry(parlay.contestant_id.clone()).or_default() +=
            parlay.points_earned.unwrap_or(0.0);
    }
    for submission in submissions.iter().filter(|s| s.week == week) {
        *totals.entry(submission.contestant_id.clone()).or_default() -= submission.late_penalty;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded_pick(contestant: &str, game: &str, result: PickResult, points: f64) -> AtsPick {
        AtsPick {
            contestant_id: contestant.into(),
            game_id: game.into(),
            week: 1,
            team: "KC".into(),
            spread_at_pick: -2.5,
            result: Some(result),
            points_earned: Some(points),
        }
    }

    fn graded_parlay(contestant: &str, status: ParlayStatus, points: f64) -> Parlay {
        Parlay {
            contestant_id: contestant.into(),
            week: 1,
            legs: Vec::new(),
            status,
            points_earned: Some(points),
        }
    }

    fn submission(contestant: &str, penalty: f64) -> WeekSubmission {
        WeekSubmission {
            contestant_id: contestant.into(),
            week: 1,
            submitted_at: chrono::Utc::now(),
            late: penalty > 0.0,
            minutes_late: 0,
            late_penalty: penalty,
            week_points: None,
            version: 1,
        }
    }

    #[test]
    fn totals_combine_ats_parlay_and_penalty() {
        let picks = vec![
            graded_pick("alice", "g1", PickResult::Win, 1.0),
            graded_pick("alice", "g2", PickResult::Push, 0.5),
            graded_pick("alice", "g3", PickResult::Loss, 0.0),
        ];
        let parlays = vec![graded_parlay("alice", ParlayStatus::Hit, 5.0)];
        let submissions = vec![submission("alice", 0.5)];

        let standings = recompute_standings(&picks, &parlays, &submissions);
        assert_eq!(standings.len(), 1);
        let alice = &standings[0];
        assert_eq!(alice.ats_wins, 1);
        assert_eq!(alice.ats_pushes, 1);
        assert_eq!(alice.ats_losses, 1);
        assert!((alice.ats_points - 1.5).abs() < 1e-9);
        assert_eq!(alice.parlays_hit, 1);
        assert!((alice.total_points - 6.0).abs() < 1e-9);
        assert_eq!(alice.rank, 1);
    }

    #[test]
    fn recompute_is_idempotent() {
        let picks = vec![
            graded_pick("alice", "g1", PickResult::Win, 1.0),
            graded_pick("bob", "g1", PickResult::Loss, 0.0),
        ];
        let parlays = vec![graded_parlay("bob", ParlayStatus::Busted, 0.0)];
        let submissions = vec![submission("alice", 0.0), submission("bob", 0.0)];

        let first = recompute_standings(&picks, &parlays, &submissions);
        let second = recompute_standings(&picks, &parlays, &submissions);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.contestant_id, b.contestant_id);
            assert_eq!(a.rank, b.rank);
            assert!((a.total_points - b.total_points).abs() < 1e-12);
        }
    }

    #[test]
    fn tied_totals_share_a_rank_and_the_next_skips() {
        let picks = vec![
            graded_pick("alice", "g1", PickResult::Win, 1.0),
            graded_pick("bob", "g1", PickResult::Win, 1.0),
            graded_pick("carol", "g1", PickResult::Push, 0.5),
        ];

        let standings = recompute_standings(&picks, &[], &[]);
        let ranks: Vec<(String, u32)> = standings
            .iter()
            .map(|s| (s.contestant_id.clone(), s.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![
                ("alice".to_string(), 1),
                ("bob".to_string(), 1),
                ("carol".to_string(), 3),
            ]
        );
    }

    #[test]
    fn ungraded_records_contribute_nothing() {
        let mut pick = graded_pick("alice", "g1", PickResult::Win, 1.0);
        pick.result = None;
        pick.points_earned = None;
        let pending = Parlay {
            contestant_id: "alice".into(),
            week: 1,
            legs: Vec::new(),
            status: ParlayStatus::Pending,
            points_earned: None,
        };

        let standings = recompute_standings(&[pick], &[pending], &[]);
        let alice = &standings[0];
        assert_eq!(alice.ats_wins, 0);
        assert_eq!(alice.parlays_hit, 0);
        assert_eq!(alice.total_points, 0.0);
    }

    #[test]
    fn no_contest_counts_as_neither_hit_nor_bust() {
        let parlays = vec![graded_parlay("alice", ParlayStatus::NoContest, 0.0)];
        let standings = recompute_standings(&[], &parlays, &[]);
        assert_eq!(standings[0].parlays_hit, 0);
        assert_eq!(standings[0].parlays_busted, 0);
    }

    #[test]
    fn weekly_totals_filter_by_week() {
        let mut other_week = graded_pick("alice", "g9", PickResult::Win, 1.0);
        other_week.week = 2;
        let picks = vec![graded_pick("alice", "g1", PickResult::Win, 1.0), other_week];
        let submissions = vec![submission("alice", 0.3)];

        let totals = weekly_totals(1, &picks, &[], &submissions);
        assert!((totals["alice"] - 0.7).abs() < 1e-9);
    }
}
