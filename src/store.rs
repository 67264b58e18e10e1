use crate::models::{
    AtsPick, Game, LineSnapshot, Parlay, Payout, Pot, PotKind, Standing, WeekLock, WeekSubmission,
};
use crate::scoring::validator::ValidatedSubmission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse store file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("submission for contestant {contestant_id} week {week} was changed concurrently")]
    SubmissionConflict { contestant_id: String, week: u8 },

    #[error("pot {pot_key} has already been settled")]
    PotAlreadySettled { pot_key: String },
}

/// Every record of one contest season, persisted as a single JSON
/// document. Natural unique keys: Game by id, AtsPick by
/// (contestant, game), Parlay and WeekSubmission by (contestant, week),
/// Pot by (week, kind). The payout ledger is append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContestStore {
    pub season: u16,
    pub games: Vec<Game>,
    #[serde(default)]
    pub line_snapshots: Vec<LineSnapshot>,
    pub week_locks: Vec<WeekLock>,
    pub picks: Vec<AtsPick>,
    pub parlays: Vec<Parlay>,
    pub submissions: Vec<WeekSubmission>,
    pub standings: Vec<Standing>,
    pub pots: Vec<Pot>,
    pub payouts: Vec<Payout>,
}

impl ContestStore {
    pub fn new(season: u16) -> Self {
        Self {
            season,
            ..Self::default()
        }
    }

    /// Load the store from a JSON file, starting fresh if the file does
    /// not exist yet
    pub fn load(path: &str, season: u16) -> Result<Self, StoreError> {
        if !std::path::Path::new(path).exists() {
            return Ok(Self::new(season));
        }
        let json = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_string(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| StoreError::Parse {
            path: path.to_string(),
            source: e,
        })
    }

    /// Save the store to a JSON file
    pub fn save(&self, path: &str) -> Result<(), StoreError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: path.to_string(),
                    source: e,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| StoreError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| StoreError::Io {
            path: path.to_string(),
            source: e,
        })
    }

    /// Upsert a game snapshot from the feed, keyed by id. The feed owns
    /// the game record outright; the engine never edits line fields.
    pub fn upsert_game(&mut self, game: Game) {
        match self.games.iter_mut().find(|g| g.id == game.id) {
            Some(existing) => *existing = game,
            None => self.games.push(game),
        }
    }

    /// Append a point-in-time line record. The snapshot history only
    /// grows; nothing edits or removes entries.
    pub fn append_line_snapshot(&mut self, snapshot: LineSnapshot) {
        self.line_snapshots.push(snapshot);
    }

    pub fn week_games(&self, week: u8) -> Vec<Game> {
        self.games.iter().filter(|g| g.week == week).cloned().collect()
    }

    pub fn lock_time(&self, week: u8) -> Option<DateTime<Utc>> {
        self.week_locks
            .iter()
            .find(|l| l.week == week)
            .map(|l| l.lock_time)
    }

    /// Record the lock deadline for a week, replacing any previous value
    pub fn set_week_lock(&mut self, week: u8, lock_time: DateTime<Utc>) {
        match self.week_locks.iter_mut().find(|l| l.week == week) {
            Some(existing) => existing.lock_time = lock_time,
            None => self.week_locks.push(WeekLock { week, lock_time }),
        }
    }

    pub fn submission(&self, contestant_id: &str, week: u8) -> Option<&WeekSubmission> {
        self.submissions
            .iter()
            .find(|s| s.contestant_id == contestant_id && s.week == week)
    }

    /// Persist a validated submission under compare-and-set semantics.
    ///
    /// `expected_version` is the submission version the client last saw
    /// (`None` for a first submission). A mismatch means another
    /// submission landed in between; the caller surfaces it as a
    /// retryable conflict instead of overwriting. Replaces the
    /// contestant's picks and parlay for the week atomically with the
    /// submission record.
    pub fn apply_submission(
        &mut self,
        validated: &ValidatedSubmission,
        submitted_at: DateTime<Utc>,
        late_penalty: f64,
        expected_version: Option<u32>,
    ) -> Result<u32, StoreError> {
        let contestant_id = &validated.contestant_id;
        let week = validated.week;

        let current_version = self.submission(contestant_id, week).map(|s| s.version);
        if current_version != expected_version {
            return Err(StoreError::SubmissionConflict {
                contestant_id: contestant_id.clone(),
                week,
            });
        }
        let new_version = current_version.unwrap_or(0) + 1;

        self.picks
            .retain(|p| !(p.contestant_id == *contestant_id && p.week == week));
        self.picks.extend(validated.picks.iter().cloned());

        self.parlays
            .retain(|p| !(p.contestant_id == *contestant_id && p.week == week));
        self.parlays.push(validated.parlay.clone());

        let record = WeekSubmission {
            contestant_id: contestant_id.clone(),
            week,
            submitted_at,
            late: validated.late,
            minutes_late: validated.minutes_late,
            late_penalty,
            week_points: None,
            version: new_version,
        };
        self.submissions
            .retain(|s| !(s.contestant_id == *contestant_id && s.week == week));
        self.submissions.push(record);

        Ok(new_version)
    }

    pub fn pot(&self, week: u8, kind: PotKind) -> Option<&Pot> {
        self.pots.iter().find(|p| p.week == week && p.kind == kind)
    }

    /// Fetch or create the weekly pot for a week at the configured
    /// default funding level
    pub fn ensure_weekly_pot(&mut self, week: u8, default_amount_cents: i64) -> Pot {
        if let Some(pot) = self.pot(week, PotKind::Weekly) {
            return pot.clone();
        }
        let pot = Pot {
            season: self.season,
            week,
            kind: PotKind::Weekly,
            amount_cents: default_amount_cents,
            rolled_over: false,
            settled_at: None,
        };
        self.pots.push(pot.clone());
        pot
    }

    /// Add rolled-over cents to the season's mega pot, creating it on
    /// first use. The mega pot is keyed to week 0 since it spans the
    /// whole season.
    pub fn add_to_mega_pot(&mut self, cents: i64) -> &Pot {
        let index = match self.pots.iter().position(|p| p.kind == PotKind::Mega) {
            Some(index) => index,
            None => {
                self.pots.push(Pot {
                    season: self.season,
                    week: 0,
                    kind: PotKind::Mega,
                    amount_cents: 0,
                    rolled_over: false,
                    settled_at: None,
                });
                self.pots.len() - 1
            }
        };
        let mega = &mut self.pots[index];
        mega.amount_cents += cents;
        if cents > 0 {
            mega.rolled_over = true;
        }
        mega
    }

    pub fn mega_pot(&self) -> Option<&Pot> {
        self.pots.iter().find(|p| p.kind == PotKind::Mega)
    }

    pub fn payouts_for_pot(&self, pot_key: &str) -> Vec<&Payout> {
        self.payouts
            .iter()
            .filter(|p| p.pot_key == pot_key)
            .collect()
    }

    /// Append payouts to the ledger, refusing a second disbursement of
    /// the same pot. Historical payout records are never mutated.
    pub fn append_payouts(&mut self, pot_key: &str, payouts: Vec<Payout>) -> Result<(), StoreError> {
        if !self.payouts_for_pot(pot_key).is_empty() {
            return Err(StoreError::PotAlreadySettled {
                pot_key: pot_key.to_string(),
            });
        }
        self.payouts.extend(payouts);
        Ok(())
    }

    /// Stamp a pot as settled so a re-run of the settlement pass cannot
    /// disburse or roll it over a second time
    pub fn mark_pot_settled(&mut self, week: u8, kind: PotKind, now: DateTime<Utc>) {
        if let Some(pot) = self
            .pots
            .iter_mut()
            .find(|p| p.week == week && p.kind == kind)
        {
            pot.settled_at = Some(now);
        }
    }
}
