//! Account and round API handlers.
//!
//! All routes are scoped to an account: a round can only be driven through
//! the account that dealt it.
//!
//! # Examples
//!
//! Deal a round:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/accounts/7/sessions
//! ```
//!
//! Stand:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/accounts/7/sessions/0b9c.../stand
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use blackjack::{AccountId, BlackjackError, Card, ErrorKind, Outcome, SessionId};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{AppState, request_id::RequestId};
use crate::{logging::log_performance, metrics};

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Error body shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable kind, e.g. `session_not_found`
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: AccountId,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustBalanceRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: SessionId,
    pub player_cards: Vec<String>,
    /// The dealer's hole card stays hidden until stand
    pub dealer_up_card: Option<String>,
    pub player_total: u32,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HitResponse {
    pub session_id: SessionId,
    pub player_cards: Vec<String>,
    pub player_total: u32,
    pub finished: bool,
    pub outcome: Option<Outcome>,
    pub balance: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StandResponse {
    pub session_id: SessionId,
    pub dealer_cards: Vec<String>,
    pub dealer_total: u32,
    pub player_total: u32,
    pub outcome: Outcome,
    pub delta: i64,
    pub balance: i64,
}

fn card_label(card: &Card) -> String {
    format!("{}/{}", card.rank(), card.suit())
}

fn card_labels(cards: &[Card]) -> Vec<String> {
    cards.iter().map(card_label).collect()
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::BalanceOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::EmptyDeck | ErrorKind::InvalidDeck => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: BlackjackError, request_id: &RequestId) -> (StatusCode, Json<ErrorResponse>) {
    let kind = err.kind();
    let status = status_for(kind);
    if status.is_server_error() {
        tracing::warn!(request_id = %request_id, error = %err, kind = %kind, "Request failed");
    } else {
        tracing::debug!(request_id = %request_id, error = %err, kind = %kind, "Request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: kind.as_str().to_string(),
            message: err.client_message(),
        }),
    )
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Open an account and credit the starting grant.
///
/// # Response
///
/// Returns `201 Created` with the new balance:
/// ```json
/// { "account_id": 7, "balance": 1000 }
/// ```
///
/// # Errors
///
/// - `503 Service Unavailable`: Durable store unreachable
/// - `504 Gateway Timeout`: Request deadline exceeded
pub async fn open_account(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
) -> ApiResult<(StatusCode, Json<BalanceResponse>)> {
    let balance = state
        .service
        .open_account(account_id, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;

    Ok((
        StatusCode::CREATED,
        Json(BalanceResponse {
            account_id,
            balance,
        }),
    ))
}

/// Current balance of an account. Unknown accounts read as 0.
pub async fn get_balance(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
) -> ApiResult<Json<BalanceResponse>> {
    let start = Instant::now();
    let balance = state
        .service
        .get_balance(account_id, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;
    log_performance("get_balance", elapsed_ms(start), None);

    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

/// Administrative balance correction.
///
/// # Request Body
///
/// ```json
/// { "delta": -250 }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: The delta would overflow the balance
/// - `503 Service Unavailable`: Durable store unreachable
pub async fn adjust_balance(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
    Json(request): Json<AdjustBalanceRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    let balance = state
        .service
        .adjust_balance(account_id, request.delta, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;

    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

/// Deal a new round.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// {
///   "session_id": "6f1c...",
///   "player_cards": ["10/♥", "7/♠"],
///   "dealer_up_card": "6/♣",
///   "player_total": 17,
///   "balance": 1000
/// }
/// ```
pub async fn new_session(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(account_id): Path<AccountId>,
) -> ApiResult<(StatusCode, Json<NewSessionResponse>)> {
    let start = Instant::now();
    let view = state
        .service
        .new_session(account_id, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;
    metrics::active_sessions(state.service.active_sessions());
    log_performance(
        "new_session",
        elapsed_ms(start),
        Some(&format!("account={account_id}")),
    );

    Ok((
        StatusCode::CREATED,
        Json(NewSessionResponse {
            session_id: view.session_id,
            player_cards: card_labels(&view.player_cards),
            dealer_up_card: view.dealer_up_card.as_ref().map(card_label),
            player_total: view.player_total,
            balance: view.balance,
        }),
    ))
}

/// Draw a card. A bust finishes and settles the round in the same call.
///
/// # Errors
///
/// - `404 Not Found`: Unknown session, or owned by another account
/// - `409 Conflict`: Round already finished
/// - `504 Gateway Timeout`: Deadline passed; a bust is still settled
pub async fn hit(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((account_id, session_id)): Path<(AccountId, SessionId)>,
) -> ApiResult<Json<HitResponse>> {
    let start = Instant::now();
    let view = state
        .service
        .hit(session_id, account_id, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;
    if let Some(outcome) = view.outcome {
        metrics::rounds_settled_total(outcome);
    }
    log_performance(
        "hit",
        elapsed_ms(start),
        Some(&format!("session={session_id}")),
    );

    Ok(Json(HitResponse {
        session_id: view.session_id,
        player_cards: card_labels(&view.player_cards),
        player_total: view.player_total,
        finished: view.finished,
        outcome: view.outcome,
        balance: view.balance,
    }))
}

/// Stand: the dealer plays out and the round is settled.
///
/// # Response
///
/// ```json
/// {
///   "session_id": "6f1c...",
///   "dealer_cards": ["6/♣", "5/♦", "9/♣"],
///   "dealer_total": 20,
///   "player_total": 17,
///   "outcome": "lose",
///   "delta": -100,
///   "balance": 900
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Unknown session, or owned by another account
/// - `409 Conflict`: Round already finished
/// - `503 Service Unavailable`: Settlement could not be written
/// - `504 Gateway Timeout`: Deadline passed. If the round was already
///   played out it is still settled.
pub async fn stand(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((account_id, session_id)): Path<(AccountId, SessionId)>,
) -> ApiResult<Json<StandResponse>> {
    let start = Instant::now();
    let view = state
        .service
        .stand(session_id, account_id, state.deadline())
        .await
        .map_err(|e| error_response(e, &request_id))?;
    metrics::rounds_settled_total(view.outcome);
    log_performance(
        "stand",
        elapsed_ms(start),
        Some(&format!("session={session_id} outcome={}", view.outcome)),
    );

    Ok(Json(StandResponse {
        session_id: view.session_id,
        dealer_cards: card_labels(&view.dealer_cards),
        dealer_total: view.dealer_total,
        player_total: view.player_total,
        outcome: view.outcome,
        delta: view.delta,
        balance: view.balance,
    }))
}
