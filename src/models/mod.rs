use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a game is in its lifecycle, as reported by the score feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

/// Represents an NFL game for one contest week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home_team: String, // abbreviation, e.g. "KC"
    pub away_team: String, // abbreviation, e.g. "BUF"
    pub kickoff_time: DateTime<Utc>,
    pub status: GameStatus,
    pub week: u8,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Live spread from the feed, home-team-relative (negative = home favored).
    /// Transient: grading always uses the value frozen on the pick.
    pub spread_current: Option<f64>,
    /// Live over/under total from the feed. Transient, display only.
    pub total_current: Option<f64>,
    /// Live American moneylines from the feed. Transient: parlay legs
    /// grade against the value frozen on the leg.
    pub ml_home_current: Option<i32>,
    pub ml_away_current: Option<i32>,
    // In-game situation from the feed (display only, never graded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yard_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<String>,
    #[serde(default)]
    pub is_redzone: bool,
}

impl Game {
    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }

    /// Final margin from the home team's perspective, once both scores exist
    pub fn home_margin(&self) -> Option<i64> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => Some(h as i64 - a as i64),
            _ => None,
        }
    }
}

/// Point-in-time record of a game's lines, appended on every feed sync.
/// Immutable audit trail; grading reads only the values frozen onto picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub game_id: String,
    pub taken_at: DateTime<Utc>,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    pub ml_home: Option<i32>,
    pub ml_away: Option<i32>,
}

/// Outcome of a graded against-the-spread pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickResult {
    Win,
    Push,
    Loss,
}

/// One contestant's against-the-spread pick for one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsPick {
    pub contestant_id: String,
    pub game_id: String,
    pub week: u8,
    pub team: String,
    /// Spread frozen at submission, home-team-relative. This is the
    /// authoritative line for grading, not the game's live spread.
    pub spread_at_pick: f64,
    pub result: Option<PickResult>,
    pub points_earned: Option<f64>,
}

/// Outcome of a single parlay leg, derived as a moneyline result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegOutcome {
    Win,
    Push,
    Loss,
}

/// One pick within a parlay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayLeg {
    pub game_id: String,
    pub team: String,
    /// American moneyline odds frozen at submission (e.g., -110, +150)
    pub ml_at_pick: i32,
}

/// Parlay-wide status after grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParlayStatus {
    Pending,
    Hit,
    Busted,
    /// Pushed legs dropped the parlay below the minimum leg count
    NoContest,
}

/// One contestant's parlay for one week; graded all-or-nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parlay {
    pub contestant_id: String,
    pub week: u8,
    pub legs: Vec<ParlayLeg>,
    pub status: ParlayStatus,
    pub points_earned: Option<f64>,
}

/// Lock deadline for one week's submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekLock {
    pub week: u8,
    pub lock_time: DateTime<Utc>,
}

/// Submission bookkeeping for one (contestant, week)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekSubmission {
    pub contestant_id: String,
    pub week: u8,
    pub submitted_at: DateTime<Utc>,
    pub late: bool,
    pub minutes_late: u32,
    /// Points deducted under the late policy; decided by the submission
    /// path, never by the validator
    pub late_penalty: f64,
    /// ATS points + parlay points - penalty, filled in by grading
    pub week_points: Option<f64>,
    /// Bumped on every accepted submission; used for compare-and-set so a
    /// concurrent resubmission conflicts instead of silently overwriting
    pub version: u32,
}

/// Season-to-date totals for one contestant, derived by the aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub contestant_id: String,
    pub ats_wins: u32,
    pub ats_losses: u32,
    pub ats_pushes: u32,
    pub ats_points: f64,
    pub parlays_hit: u32,
    pub parlays_busted: u32,
    pub parlay_points: f64,
    pub penalty_points: f64,
    pub total_points: f64,
    /// Standard competition rank: ties share a rank, next distinct skips
    pub rank: u32,
}

/// Which prize pool a pot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotKind {
    Weekly,
    Mega,
}

/// A prize pool for (season, week). Amounts are integer cents so splits
/// never lose money to rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pot {
    pub season: u16,
    pub week: u8,
    pub kind: PotKind,
    pub amount_cents: i64,
    /// Set once an unclaimed weekly amount was rolled into the mega pot
    pub rolled_over: bool,
    /// Set when the pot was disbursed (or rolled over); a settled pot is
    /// never settled again
    pub settled_at: Option<DateTime<Utc>>,
}

impl Pot {
    /// Stable identifier used to key the payout ledger
    pub fn key(&self) -> String {
        let kind = match self.kind {
            PotKind::Weekly => "weekly",
            PotKind::Mega => "mega",
        };
        format!("{}-{}-{}", self.season, self.week, kind)
    }
}

/// Append-only record of a disbursement to one contestant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub contestant_id: String,
    pub pot_key: String,
    pub kind: PotKind,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
}

impl Payout {
    /// Format the payout as a readable string
    pub fn format(&self) -> String {
        format!(
            "{} | {} | ${}.{:02}",
            self.contestant_id,
            self.pot_key,
            self.amount_cents / 100,
            self.amount_cents % 100
        )
    }
}
