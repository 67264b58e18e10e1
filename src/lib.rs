pub mod api;
pub mod data;
pub mod models;
pub mod rules;
pub mod scoring;
pub mod store;

pub use api::*;
pub use models::*;
pub use rules::HouseRules;
pub use scoring::*;
pub use store::{ContestStore, StoreError};

use anyhow::{Context, Result};
use api::espn::ScoreboardClient;
use chrono::{DateTime, Utc};
use scoring::ats::{grade_ats_pick, AtsGrade};
use scoring::parlay::{grade_parlay, ParlayGrade};
use scoring::payouts::{settle_mega_pot, settle_weekly_pot};
use scoring::standings::{recompute_standings, weekly_totals};
use scoring::validator::{validate_submission, PickChoice, SubmitError};
use std::collections::HashMap;

/// Pull one week of games from the feed into the store and make sure the
/// week has a lock deadline (defaulting to the earliest kickoff).
/// Returns the number of games upserted.
pub async fn sync_week(
    store: &mut ContestStore,
    client: &ScoreboardClient,
    year: Option<u16>,
    week: Option<u8>,
    season_type: Option<u8>,
) -> Result<usize> {
    let games = client
        .fetch_week(year, week, season_type)
        .await
        .context("Failed to fetch the scoreboard")?;
    let count = games.len();

    let week_number = games.first().map(|g| g.week);
    let earliest_kickoff = games.iter().map(|g| g.kickoff_time).min();

    let taken_at = Utc::now();
    for game in games {
        store.append_line_snapshot(LineSnapshot {
            game_id: game.id.clone(),
            taken_at,
            spread: game.spread_current,
            total: game.total_current,
            ml_home: game.ml_home_current,
            ml_away: game.ml_away_current,
        });
        store.upsert_game(game);
    }

    if let (Some(week), Some(kickoff)) = (week_number, earliest_kickoff) {
        if store.lock_time(week).is_none() {
            store.set_week_lock(week, kickoff);
            tracing::info!(week, lock_time = %kickoff, "week lock set to earliest kickoff");
        }
    }

    Ok(count)
}

/// Accept a contestant's week submission: validate against the lock clock,
/// apply the late policy, and persist under compare-and-set.
///
/// The caller must hold exclusive access to the store across this call so
/// the `now` read, the lock check, and the write form one critical
/// section; the version check turns any race that slips past it into a
/// retryable conflict.
#[allow(clippy::too_many_arguments)]
pub fn submit_week(
    store: &mut ContestStore,
    rules: &HouseRules,
    contestant_id: &str,
    week: u8,
    picks: &[PickChoice],
    parlay_legs: &[PickChoice],
    now: DateTime<Utc>,
    expected_version: Option<u32>,
) -> Result<WeekSubmission, SubmitError> {
    let lock_time = store
        .lock_time(week)
        .ok_or(SubmitError::LockTimeUnknown { week })?;
    let games = store.week_games(week);

    let validated = validate_submission(
        contestant_id,
        week,
        picks,
        parlay_legs,
        &games,
        now,
        lock_time,
        rules,
    )?;

    let late_penalty = if validated.late {
        rules.late_policy.penalty(validated.minutes_late)
    } else {
        0.0
    };

    store
        .apply_submission(&validated, now, late_penalty, expected_version)
        .map_err(|_| SubmitError::ConcurrentSubmission { week })?;

    let submission = store
        .submission(contestant_id, week)
        .cloned()
        .ok_or(SubmitError::ConcurrentSubmission { week })?;
    Ok(submission)
}

/// What one grading pass touched
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct GradeSummary {
    pub picks_graded: usize,
    pub picks_pending: usize,
    pub parlays_graded: usize,
    pub parlays_pending: usize,
    pub submissions_totaled: usize,
    /// Records skipped over data-integrity errors (logged, not fatal)
    pub integrity_errors: usize,
}

/// Grade everything gradeable for a week. Safe to run any number of
/// times: outcomes are a pure function of the frozen lines and final
/// scores, so a re-run writes the same values it wrote before.
pub fn grade_week(store: &mut ContestStore, week: u8, rules: &HouseRules) -> GradeSummary {
    let games_by_id: HashMap<String, Game> = store
        .week_games(week)
        .into_iter()
        .map(|g| (g.id.clone(), g))
        .collect();

    let mut summary = GradeSummary::default();

    for pick in store.picks.iter_mut().filter(|p| p.week == week) {
        let Some(game) = games_by_id.get(&pick.game_id) else {
            tracing::error!(game_id = %pick.game_id, "pick references a game the store has never seen");
            summary.integrity_errors += 1;
            continue;
        };
        match grade_ats_pick(pick, game, &rules.ats) {
            Ok(AtsGrade::Graded { result, points }) => {
                pick.result = Some(result);
                pick.points_earned = Some(points);
                summary.picks_graded += 1;
            }
            Ok(AtsGrade::Pending) => summary.picks_pending += 1,
            Err(err) => {
                // Excluded from aggregation rather than crashing the run
                tracing::error!(game_id = %pick.game_id, %err, "pick excluded from grading");
                summary.integrity_errors += 1;
            }
        }
    }

    for parlay in store.parlays.iter_mut().filter(|p| p.week == week) {
        match grade_parlay(parlay, &games_by_id, &rules.parlay) {
            Ok(ParlayGrade::Graded { status, points, .. }) => {
                parlay.status = status;
                parlay.points_earned = Some(points);
                summary.parlays_graded += 1;
            }
            Ok(ParlayGrade::Pending) => summary.parlays_pending += 1,
            Err(err) => {
                tracing::error!(contestant = %parlay.contestant_id, %err, "parlay excluded from grading");
                summary.integrity_errors += 1;
            }
        }
    }

    // Fill in weekly totals for contestants whose week is fully graded
    let totals = weekly_totals(week, &store.picks, &store.parlays, &store.submissions);
    for submission in store.submissions.iter_mut().filter(|s| s.week == week) {
        let all_picks_graded = store
            .picks
            .iter()
            .filter(|p| p.week == week && p.contestant_id == submission.contestant_id)
            .all(|p| p.result.is_some());
        let parlay_settled = store
            .parlays
            .iter()
            .filter(|p| p.week == week && p.contestant_id == submission.contestant_id)
            .all(|p| p.status != ParlayStatus::Pending);
        if all_picks_graded && parlay_settled {
            submission.week_points = totals.get(&submission.contestant_id).copied();
            summary.submissions_totaled += 1;
        }
    }

    summary
}

/// Recompute season standings from every stored record and persist them.
/// Pure aggregation over the graded data; running it twice with no new
/// grades yields identical standings.
pub fn recompute_season(store: &mut ContestStore) -> Vec<Standing> {
    let standings = recompute_standings(&store.picks, &store.parlays, &store.submissions);
    store.standings = standings.clone();
    standings
}

/// Settle the weekly pot once the week is fully graded. A unique winner is
/// paid; a tied pot splits or rolls into the mega pot per the rules.
pub fn settle_week(
    store: &mut ContestStore,
    week: u8,
    rules: &HouseRules,
    now: DateTime<Utc>,
) -> Result<Vec<Payout>> {
    let ungraded = store
        .submissions
        .iter()
        .filter(|s| s.week == week && s.week_points.is_none())
        .count();
    if ungraded > 0 {
        anyhow::bail!(
            "week {} has {} submissions still ungraded; run grading first",
            week,
            ungraded
        );
    }

    let pot = store.ensure_weekly_pot(week, rules.pot.weekly_amount_cents);
    if let Some(settled_at) = pot.settled_at {
        anyhow::bail!("weekly pot for week {} already settled at {}", week, settled_at);
    }

    let totals = weekly_totals(week, &store.picks, &store.parlays, &store.submissions);
    let settlement = settle_weekly_pot(&pot, &totals, &rules.pot, now);

    store.append_payouts(&pot.key(), settlement.payouts.clone())?;
    store.mark_pot_settled(week, PotKind::Weekly, now);
    if settlement.rollover_cents > 0 {
        let mega = store.add_to_mega_pot(settlement.rollover_cents);
        tracing::info!(
            week,
            rolled_cents = settlement.rollover_cents,
            mega_cents = mega.amount_cents,
            "weekly pot rolled into the mega pot"
        );
    }

    Ok(settlement.payouts)
}

/// Settle the mega pot at season end: recompute standings, pay the top
/// total, stamp the pot settled.
pub fn settle_season(
    store: &mut ContestStore,
    now: DateTime<Utc>,
) -> Result<Vec<Payout>> {
    recompute_season(store);

    let pot = store
        .mega_pot()
        .cloned()
        .context("no mega pot exists; fund it or roll a weekly pot first")?;
    if let Some(settled_at) = pot.settled_at {
        anyhow::bail!("mega pot already settled at {}", settled_at);
    }

    let payouts = settle_mega_pot(&pot, &store.standings, now);
    store.append_payouts(&pot.key(), payouts.clone())?;
    store.mark_pot_settled(pot.week, PotKind::Mega, now);

    Ok(payouts)
}
