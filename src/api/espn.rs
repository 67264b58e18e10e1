use crate::models::{Game, GameStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

const SCOREBOARD_BASE_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

/// Scoreboard response from the ESPN site API
#[derive(Debug, Deserialize)]
struct Scoreboard {
    week: Option<WeekInfo>,
    #[serde(default)]
    events: Vec<ScoreboardEvent>,
}

#[derive(Debug, Deserialize)]
struct WeekInfo {
    number: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardEvent {
    id: String,
    date: Option<String>,
    status: Option<EventStatus>,
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct EventStatus {
    #[serde(rename = "type")]
    kind: Option<StatusType>,
}

#[derive(Debug, Deserialize)]
struct StatusType {
    name: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
    #[serde(default)]
    odds: Vec<OddsEntry>,
    situation: Option<Situation>,
    status: Option<CompetitionStatus>,
}

#[derive(Debug, Deserialize)]
struct Competitor {
    #[serde(rename = "homeAway")]
    home_away: Option<String>,
    score: Option<String>,
    team: Option<TeamInfo>,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    abbreviation: Option<String>,
}

/// Betting line attached to a competition (e.g., details = "KC -3.5")
#[derive(Debug, Deserialize)]
struct OddsEntry {
    details: Option<String>,
    #[serde(rename = "overUnder")]
    over_under: Option<f64>,
    #[serde(rename = "homeTeamOdds")]
    home_team_odds: Option<TeamOdds>,
    #[serde(rename = "awayTeamOdds")]
    away_team_odds: Option<TeamOdds>,
}

#[derive(Debug, Deserialize)]
struct TeamOdds {
    favorite: Option<bool>,
    #[serde(rename = "moneyLine")]
    money_line: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Situation {
    possession: Option<String>,
    #[serde(rename = "yardLine")]
    yard_line: Option<u32>,
    down: Option<u32>,
    distance: Option<u32>,
    #[serde(rename = "isRedZone")]
    is_red_zone: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CompetitionStatus {
    period: Option<u32>,
    #[serde(rename = "displayClock")]
    display_clock: Option<String>,
}

pub struct ScoreboardClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for ScoreboardClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreboardClient {
    pub fn new() -> Self {
        Self {
            base_url: SCOREBOARD_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different scoreboard endpoint (tests, proxies)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch one week of NFL games with scores, status, and lines
    pub async fn fetch_week(
        &self,
        year: Option<u16>,
        week: Option<u8>,
        season_type: Option<u8>,
    ) -> Result<Vec<Game>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(year) = year {
            query.push(("dates", year.to_string()));
        }
        if let Some(week) = week {
            query.push(("week", week.to_string()));
        }
        if let Some(season_type) = season_type {
            query.push(("seasontype", season_type.to_string()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .context("Failed to fetch the ESPN scoreboard")?;

        if !response.status().is_success() {
            anyhow::bail!("ESPN scoreboard returned error: {}", response.status());
        }

        let scoreboard: Scoreboard = response
            .json()
            .await
            .context("Failed to parse ESPN scoreboard response")?;

        let week_number = scoreboard
            .week
            .and_then(|w| w.number)
            .or(week)
            .unwrap_or(1);

        Ok(scoreboard
            .events
            .into_iter()
            .filter_map(|event| convert_event(event, week_number))
            .collect())
    }
}

/// Convert one scoreboard event into a Game, skipping events missing the
/// fields a contest game cannot do without
fn convert_event(event: ScoreboardEvent, week: u8) -> Option<Game> {
    let competition = event.competitions.into_iter().next()?;

    let mut home: Option<Competitor> = None;
    let mut away: Option<Competitor> = None;
    for competitor in competition.competitors {
        match competitor.home_away.as_deref() {
            Some("home") => home = Some(competitor),
            Some("away") => away = Some(competitor),
            _ => {}
        }
    }
    let (home, away) = match (home, away) {
        (Some(h), Some(a)) => (h, a),
        _ => {
            tracing::warn!(event_id = %event.id, "scoreboard event missing home/away competitor");
            return None;
        }
    };

    let home_team = home.team.and_then(|t| t.abbreviation)?;
    let away_team = away.team.and_then(|t| t.abbreviation)?;

    let kickoff_time = event.date.as_deref().and_then(parse_kickoff)?;

    let status_name = event
        .status
        .and_then(|s| s.kind)
        .and_then(|k| k.name.or(k.state));
    let status = normalize_status(status_name.as_deref());

    let odds = competition.odds.into_iter().next();
    let (spread_current, total_current, ml_home, ml_away) = match odds {
        Some(entry) => {
            let favorite_is_home = entry
                .home_team_odds
                .as_ref()
                .and_then(|o| o.favorite)
                .or_else(|| entry.away_team_odds.as_ref().and_then(|o| o.favorite.map(|f| !f)));
            let spread = entry
                .details
                .as_deref()
                .and_then(|d| parse_spread(d, favorite_is_home, &home_team));
            (
                spread,
                entry.over_under,
                entry.home_team_odds.and_then(|o| o.money_line),
                entry.away_team_odds.and_then(|o| o.money_line),
            )
        }
        None => (None, None, None, None),
    };

    let situation = competition.situation;
    let comp_status = competition.status;

    Some(Game {
        id: event.id,
        home_team,
        away_team,
        kickoff_time,
        status,
        week,
        home_score: home.score.and_then(|s| s.parse().ok()),
        away_score: away.score.and_then(|s| s.parse().ok()),
        spread_current,
        total_current,
        ml_home_current: ml_home,
        ml_away_current: ml_away,
        possession: situation.as_ref().and_then(|s| s.possession.clone()),
        yard_line: situation.as_ref().and_then(|s| s.yard_line),
        down: situation.as_ref().and_then(|s| s.down),
        distance: situation.as_ref().and_then(|s| s.distance),
        quarter: comp_status
            .as_ref()
            .and_then(|s| s.period)
            .map(|p| p.to_string()),
        time_remaining: comp_status.and_then(|s| s.display_clock),
        is_redzone: situation
            .and_then(|s| s.is_red_zone)
            .unwrap_or(false),
    })
}

/// Parse the home-relative spread out of an odds details string.
///
/// Examples: "KC -3.5", "DAL -7", "Pick", "Even". The quoted spread is
/// relative to the favorite; it converts to home perspective as negative
/// when the favorite is the home team. When the feed does not say who the
/// favorite is, the leading abbreviation decides.
pub fn parse_spread(details: &str, favorite_is_home: Option<bool>, home_team: &str) -> Option<f64> {
    let mut parts = details.split_whitespace();
    let first = parts.next()?;
    match parts.next() {
        None => {
            // A pick'em line is a real spread of zero, not a missing line
            if first.eq_ignore_ascii_case("pick") || first.eq_ignore_ascii_case("even") {
                Some(0.0)
            } else {
                None
            }
        }
        Some(token) => {
            let value: f64 = token.parse().ok()?;
            let home_favored = favorite_is_home.unwrap_or(first == home_team);
            if home_favored {
                Some(-value.abs())
            } else {
                Some(value.abs())
            }
        }
    }
}

/// Collapse ESPN's status vocabulary onto the three states the contest
/// tracks. Final is checked first: "final" itself contains "in".
pub fn normalize_status(name: Option<&str>) -> GameStatus {
    let Some(name) = name else {
        return GameStatus::Scheduled;
    };
    let normalized = name.to_lowercase();
    if normalized.contains("final") {
        GameStatus::Final
    } else if normalized.contains("in")
        || normalized.contains("start")
        || normalized.contains("halftime")
    {
        GameStatus::InProgress
    } else {
        GameStatus::Scheduled
    }
}

/// ESPN dates come as RFC 3339, sometimes without seconds ("2025-01-19T18:00Z")
fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}
