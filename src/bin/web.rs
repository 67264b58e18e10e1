use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use megapicks::espn::ScoreboardClient;
use megapicks::rules::HouseRules;
use megapicks::scoring::validator::{PickChoice, SubmitError};
use megapicks::store::ContestStore;
use megapicks::{
    grade_week, recompute_season, settle_season, settle_week, submit_week, sync_week,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

struct App {
    store: ContestStore,
    rules: HouseRules,
    feed: ScoreboardClient,
    store_path: String,
}

// Shared state: the write lock is the submission critical section, so the
// lock check and the store write see one authoritative clock read
type SharedState = Arc<RwLock<App>>;

#[derive(Debug, Deserialize)]
struct WeekQuery {
    week: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct SyncQuery {
    week: Option<u8>,
    year: Option<u16>,
    season_type: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    contestant_id: String,
    week: u8,
    picks: Vec<PickChoice>,
    parlay_legs: Vec<PickChoice>,
    /// Version the client last saw; omit on first submission
    expected_version: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    accepted: bool,
    late: bool,
    minutes_late: u32,
    late_penalty: f64,
    version: u32,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn submit_error_status(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::ConcurrentSubmission { .. } => StatusCode::CONFLICT,
        SubmitError::SubmissionLocked { .. } => StatusCode::FORBIDDEN,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn games(State(state): State<SharedState>, Query(query): Query<WeekQuery>) -> Response {
    let app = state.read().await;
    let games = match query.week {
        Some(week) => app.store.week_games(week),
        None => app.store.games.clone(),
    };
    Json(games).into_response()
}

async fn sync_games(State(state): State<SharedState>, Query(query): Query<SyncQuery>) -> Response {
    let mut guard = state.write().await;
    let app = &mut *guard;

    let count = match sync_week(
        &mut app.store,
        &app.feed,
        query.year,
        query.week,
        query.season_type,
    )
    .await
    {
        Ok(count) => count,
        Err(err) => {
            return error_response(StatusCode::BAD_GATEWAY, format!("feed sync failed: {err}"))
        }
    };

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    Json(serde_json::json!({ "upserted": count })).into_response()
}

async fn submit_picks(
    State(state): State<SharedState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let mut guard = state.write().await;
    let app = &mut *guard;

    // The single authoritative clock read for this submission
    let now = Utc::now();

    let submission = match submit_week(
        &mut app.store,
        &app.rules,
        &request.contestant_id,
        request.week,
        &request.picks,
        &request.parlay_legs,
        now,
        request.expected_version,
    ) {
        Ok(submission) => submission,
        Err(err) => return error_response(submit_error_status(&err), err.to_string()),
    };

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }

    Json(SubmitResponse {
        accepted: true,
        late: submission.late,
        minutes_late: submission.minutes_late,
        late_penalty: submission.late_penalty,
        version: submission.version,
    })
    .into_response()
}

async fn grade(State(state): State<SharedState>, Query(query): Query<WeekQuery>) -> Response {
    let Some(week) = query.week else {
        return error_response(StatusCode::BAD_REQUEST, "week query param required".into());
    };

    let mut guard = state.write().await;
    let app = &mut *guard;
    let summary = grade_week(&mut app.store, week, &app.rules);

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    Json(summary).into_response()
}

async fn standings(State(state): State<SharedState>) -> Response {
    // Recomputation takes the write lock so it can never run concurrently
    // with itself or with grading for the same season
    let mut guard = state.write().await;
    let app = &mut *guard;
    let standings = recompute_season(&mut app.store);

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    Json(standings).into_response()
}

async fn settle_weekly(State(state): State<SharedState>, Query(query): Query<WeekQuery>) -> Response {
    let Some(week) = query.week else {
        return error_response(StatusCode::BAD_REQUEST, "week query param required".into());
    };

    let mut guard = state.write().await;
    let app = &mut *guard;
    let payouts = match settle_week(&mut app.store, week, &app.rules, Utc::now()) {
        Ok(payouts) => payouts,
        Err(err) => return error_response(StatusCode::CONFLICT, err.to_string()),
    };

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    Json(payouts).into_response()
}

async fn settle_mega(State(state): State<SharedState>) -> Response {
    let mut guard = state.write().await;
    let app = &mut *guard;
    let payouts = match settle_season(&mut app.store, Utc::now()) {
        Ok(payouts) => payouts,
        Err(err) => return error_response(StatusCode::CONFLICT, err.to_string()),
    };

    if let Err(err) = app.store.save(&app.store_path) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    Json(payouts).into_response()
}

async fn payouts(State(state): State<SharedState>) -> Response {
    let app = state.read().await;
    Json(app.store.payouts.clone()).into_response()
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let store_path =
        std::env::var("MEGAPICKS_STORE").unwrap_or_else(|_| "data/contest.json".to_string());
    let rules_path =
        std::env::var("MEGAPICKS_RULES").unwrap_or_else(|_| "config/rules.json".to_string());
    let season: u16 = std::env::var("MEGAPICKS_SEASON")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2025);
    let addr = std::env::var("MEGAPICKS_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let rules = match HouseRules::load(&rules_path) {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("Error loading house rules: {}", err);
            std::process::exit(1);
        }
    };
    let store = match ContestStore::load(&store_path, season) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Error loading store: {}", err);
            std::process::exit(1);
        }
    };

    println!("Season {} loaded from {}", store.season, store_path);
    println!("  - {} games", store.games.len());
    println!("  - {} submissions", store.submissions.len());
    println!("  - {} payouts on the ledger", store.payouts.len());

    let state: SharedState = Arc::new(RwLock::new(App {
        store,
        rules,
        feed: ScoreboardClient::new(),
        store_path,
    }));

    let app = Router::new()
        .route("/api/games", get(games))
        .route("/api/games/sync", post(sync_games))
        .route("/api/picks", post(submit_picks))
        .route("/api/grade", post(grade))
        .route("/api/standings", get(standings))
        .route("/api/settle/week", post(settle_weekly))
        .route("/api/settle/season", post(settle_mega))
        .route("/api/payouts", get(payouts))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    println!("\nStarting web server at http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    axum::serve(listener, app).await.unwrap();
}
