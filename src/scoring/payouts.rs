use crate::models::{Payout, Pot, PotKind, Standing};
use crate::rules::{PotRules, PotTiePolicy};
use crate::scoring::standings::POINTS_EPSILON;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Outcome of settling a weekly pot
#[derive(Debug, Clone)]
pub struct WeeklySettlement {
    pub payouts: Vec<Payout>,
    /// Amount left unclaimed under the RollToMega policy (or when nobody
    /// posted a score); the caller adds it to the mega pot
    pub rollover_cents: i64,
}

/// Split a pot evenly across recipients in cents, distributing the
/// remainder one cent at a time so the total always comes out exact.
/// Recipients are ordered by id so the extra cents land deterministically.
pub fn split_pot_cents(amount_cents: i64, recipients: &[String]) -> Vec<(String, i64)> {
    if recipients.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<String> = recipients.to_vec();
    ordered.sort();

    let n = ordered.len() as i64;
    let base = amount_cents / n;
    let remainder = amount_cents % n;

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let extra = if (i as i64) < remainder { 1 } else { 0 };
            (id, base + extra)
        })
        .collect()
}

/// Contestants holding the top score, within scoring epsilon
fn top_scorers(totals: &BTreeMap<String, f64>) -> Vec<String> {
    let best = totals.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    if best == f64::NEG_INFINITY {
        return Vec::new();
    }
    totals
        .iter()
        .filter(|(_, total)| (best - **total).abs() <= POINTS_EPSILON)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Settle one weekly pot against the week's point totals.
///
/// A unique winner takes the whole pot. A tied top score either splits it
/// (largest-remainder cents) or rolls the full amount into the mega pot,
/// per the configured tie policy. Pure function: the caller owns the
/// append-only payout ledger and the refuse-if-already-settled check.
pub fn settle_weekly_pot(
    pot: &Pot,
    week_totals: &BTreeMap<String, f64>,
    rules: &PotRules,
    now: DateTime<Utc>,
) -> WeeklySettlement {
    let winners = top_scorers(week_totals);

    if winners.is_empty() {
        return WeeklySettlement {
            payouts: Vec::new(),
            rollover_cents: pot.amount_cents,
        };
    }

    if winners.len() > 1 && rules.tie_policy == PotTiePolicy::RollToMega {
        return WeeklySettlement {
            payouts: Vec::new(),
            rollover_cents: pot.amount_cents,
        };
    }

    let payouts = split_pot_cents(pot.amount_cents, &winners)
        .into_iter()
        .map(|(contestant_id, amount_cents)| Payout {
            contestant_id,
            pot_key: pot.key(),
            kind: PotKind::Weekly,
            amount_cents,
            paid_at: now,
        })
        .collect();

    WeeklySettlement {
        payouts,
        rollover_cents: 0,
    }
}

/// Settle the mega pot at season end: the season's top `total_points`
/// takes it, splitting on ties. There is nothing left to roll into, so
/// ties always split here regardless of the weekly tie policy.
pub fn settle_mega_pot(pot: &Pot, standings: &[Standing], now: DateTime<Utc>) -> Vec<Payout> {
    let winners: Vec<String> = standings
        .iter()
        .filter(|s| s.rank == 1)
        .map(|s| s.contestant_id.clone())
        .collect();

    split_pot_cents(pot.amount_cents, &winners)
        .into_iter()
        .map(|(contestant_id, amount_cents)| Payout {
            contestant_id,
            pot_key: pot.key(),
            kind: PotKind::Mega,
            amount_cents,
            paid_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pot(kind: PotKind, amount_cents: i64) -> Pot {
        Pot {
            season: 2025,
            week: 18,
            kind,
            amount_cents,
            rolled_over: false,
            settled_at: None,
        }
    }

    fn totals(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(id, total)| (id.to_string(), *total))
            .collect()
    }

    #[test]
    fn unique_winner_takes_the_whole_pot() {
        let pot = pot(PotKind::Weekly, 52_000);
        let totals = totals(&[("alice", 12.5), ("bob", 11.0), ("carol", 9.5)]);

        let settlement =
            settle_weekly_pot(&pot, &totals, &PotRules::default(), Utc::now());
        assert_eq!(settlement.rollover_cents, 0);
        assert_eq!(settlement.payouts.len(), 1);
        assert_eq!(settlement.payouts[0].contestant_id, "alice");
        assert_eq!(settlement.payouts[0].amount_cents, 52_000);
    }

    #[test]
    fn two_way_tie_splits_520_into_260_each() {
        let pot = pot(PotKind::Weekly, 52_000);
        let totals = totals(&[("alice", 12.5), ("bob", 12.5), ("carol", 9.5)]);

        let settlement =
            settle_weekly_pot(&pot, &totals, &PotRules::default(), Utc::now());
        assert_eq!(settlement.payouts.len(), 2);
        for payout in &settlement.payouts {
            assert_eq!(payout.amount_cents, 26_000); // $260.00, no remainder
        }
        let disbursed: i64 = settlement.payouts.iter().map(|p| p.amount_cents).sum();
        assert_eq!(disbursed, 52_000);
    }

    #[test]
    fn odd_cents_distribute_largest_remainder() {
        // $1.00 across three winners: 34 + 33 + 33
        let pot = pot(PotKind::Weekly, 100);
        let totals = totals(&[("alice", 5.0), ("bob", 5.0), ("carol", 5.0)]);

        let settlement =
            settle_weekly_pot(&pot, &totals, &PotRules::default(), Utc::now());
        let mut amounts: Vec<i64> = settlement.payouts.iter().map(|p| p.amount_cents).collect();
        amounts.sort();
        assert_eq!(amounts, vec![33, 33, 34]);
        assert_eq!(amounts.iter().sum::<i64>(), 100);
    }

    #[test]
    fn roll_to_mega_policy_leaves_tied_pot_unclaimed() {
        let pot = pot(PotKind::Weekly, 52_000);
        let totals = totals(&[("alice", 12.5), ("bob", 12.5)]);
        let rules = PotRules {
            tie_policy: PotTiePolicy::RollToMega,
            ..PotRules::default()
        };

        let settlement = settle_weekly_pot(&pot, &totals, &rules, Utc::now());
        assert!(settlement.payouts.is_empty());
        assert_eq!(settlement.rollover_cents, 52_000);
    }

    #[test]
    fn unique_winner_is_paid_even_under_roll_to_mega() {
        let pot = pot(PotKind::Weekly, 52_000);
        let totals = totals(&[("alice", 12.5), ("bob", 11.0)]);
        let rules = PotRules {
            tie_policy: PotTiePolicy::RollToMega,
            ..PotRules::default()
        };

        let settlement = settle_weekly_pot(&pot, &totals, &rules, Utc::now());
        assert_eq!(settlement.payouts.len(), 1);
        assert_eq!(settlement.rollover_cents, 0);
    }

    #[test]
    fn empty_week_rolls_the_pot_over() {
        let pot = pot(PotKind::Weekly, 52_000);
        let settlement = settle_weekly_pot(
            &pot,
            &BTreeMap::new(),
            &PotRules::default(),
            Utc::now(),
        );
        assert!(settlement.payouts.is_empty());
        assert_eq!(settlement.rollover_cents, 52_000);
    }

    #[test]
    fn near_equal_totals_from_penalty_arithmetic_still_tie() {
        // 0.1-per-minute penalties leave float dust; the tie must survive it
        let pot = pot(PotKind::Weekly, 52_000);
        let mut totals = BTreeMap::new();
        totals.insert("alice".to_string(), 1.0 + 0.5 - 0.1 - 0.1 - 0.1);
        totals.insert("bob".to_string(), 1.5 - 0.3);

        let settlement =
            settle_weekly_pot(&pot, &totals, &PotRules::default(), Utc::now());
        assert_eq!(settlement.payouts.len(), 2, "dusty totals must still tie");
    }

    #[test]
    fn mega_pot_goes_to_rank_one_split_on_tie() {
        let pot = pot(PotKind::Mega, 180_000);
        let standing = |id: &str, total: f64, rank: u32| Standing {
            contestant_id: id.into(),
            ats_wins: 0,
            ats_losses: 0,
            ats_pushes: 0,
            ats_points: 0.0,
            parlays_hit: 0,
            parlays_busted: 0,
            parlay_points: 0.0,
            penalty_points: 0.0,
            total_points: total,
            rank,
        };
        let standings = vec![
            standing("alice", 88.0, 1),
            standing("bob", 88.0, 1),
            standing("carol", 70.5, 3),
        ];

        let payouts = settle_mega_pot(&pot, &standings, Utc::now());
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts.iter().map(|p| p.amount_cents).sum::<i64>(), 180_000);
        assert!(payouts.iter().all(|p| p.kind == PotKind::Mega));
    }

    #[test]
    fn split_is_deterministic_by_contestant_id() {
        let recipients = vec!["zed".to_string(), "amy".to_string(), "mel".to_string()];
        let split = split_pot_cents(101, &recipients);
        // Sorted order: amy, mel, zed; amy and mel get the extra cents
        assert_eq!(
            split,
            vec![
                ("amy".to_string(), 34),
                ("mel".to_string(), 34),
                ("zed".to_string(), 33),
            ]
        );
    }
}
