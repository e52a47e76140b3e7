//! JSON web API over the ban ledger.
//!
//! Read-only listings under `/bans`, plus the one write surface:
//! `/bans/edit/:id/:token`, which takes the token minted at the end of a ban
//! dialog.

use axum::{
    Form, Json, Router,
    extract::{MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info};

use crate::config::WebConfig;
use crate::db::{BanRecord, DbError, Persistence};
use crate::telemetry::spans;

const DEFAULT_EXPIRED_COUNT: u32 = 10;

#[derive(Clone)]
struct AppState {
    db: Arc<dyn Persistence>,
}

/// Build the router.
pub fn router(db: Arc<dyn Persistence>) -> Router {
    Router::new()
        .route("/bans", get(active_bans))
        .route("/bans/all", get(all_bans))
        .route("/bans/expired", get(expired_bans))
        .route("/bans/expired/:count", get(expired_bans_count))
        .route("/bans/edit/:id/:token", get(edit_ban).post(post_edit_ban))
        .route_layer(middleware::from_fn(trace_request))
        .with_state(AppState { db })
}

/// Serve the API on `bind:port` until the listener fails.
pub async fn serve(config: &WebConfig, db: Arc<dyn Persistence>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Web API listening");
    axum::serve(listener, router(db)).await
}

async fn trace_request(matched: Option<MatchedPath>, request: Request, next: Next) -> Response {
    let route = matched
        .as_ref()
        .map_or("unmatched", MatchedPath::as_str)
        .to_owned();
    let method = request.method().clone();

    async move {
        let response = next.run(request).await;
        debug!(method = %method, status = response.status().as_u16(), "Request served");
        response
    }
    .instrument(spans::web(&route))
    .await
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    Internal(DbError),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::BanNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                error!(error = %err, "Ledger query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiResult<T> = Result<T, ApiError>;

/// One ledger row as rendered to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BanView {
    mask: String,
    mode: String,
    set_by: String,
    set_at: String,
    reason: String,
    expiry: ExpiryView,
    #[serde(skip_serializing_if = "Option::is_none")]
    unset: Option<UnsetView>,
}

#[derive(Debug, Serialize)]
struct ExpiryView {
    when: Option<String>,
    expired: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnsetView {
    unset_by: Option<String>,
    unset_at: Option<String>,
}

/// How a listing renders its rows.
#[derive(Clone, Copy)]
struct Rendering {
    show_unset: bool,
    /// Mark every row expired instead of comparing against the clock.
    all_expired: bool,
}

impl BanView {
    fn new(ban: &BanRecord, rendering: Rendering, now: i64) -> Self {
        Self {
            mask: ban.mask.clone(),
            mode: ban.mode.clone(),
            set_by: nick_of(&ban.set_by).to_owned(),
            set_at: iso(ban.set_at),
            reason: ban.reason.clone(),
            expiry: ExpiryView {
                when: ban.expire_at.map(iso),
                expired: rendering.all_expired || ban.is_expired(now),
            },
            unset: rendering.show_unset.then(|| UnsetView {
                unset_by: ban.unset_by.as_deref().map(|by| nick_of(by).to_owned()),
                unset_at: ban.unset_at.map(iso),
            }),
        }
    }
}

fn nick_of(hostmask: &str) -> &str {
    hostmask.split_once('!').map_or(hostmask, |(nick, _)| nick)
}

fn iso(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn by_channel(bans: &[BanRecord], rendering: Rendering) -> BTreeMap<String, Vec<BanView>> {
    let now = Utc::now().timestamp();
    let mut grouped: BTreeMap<String, Vec<BanView>> = BTreeMap::new();
    for ban in bans {
        grouped
            .entry(ban.channel.clone())
            .or_default()
            .push(BanView::new(ban, rendering, now));
    }
    grouped
}

async fn active_bans(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, Vec<BanView>>>> {
    let bans = state.db.get_active_bans().await?;
    Ok(Json(by_channel(
        &bans,
        Rendering {
            show_unset: false,
            all_expired: false,
        },
    )))
}

async fn all_bans(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, Vec<BanView>>>> {
    let bans = state.db.get_all_bans().await?;
    Ok(Json(by_channel(
        &bans,
        Rendering {
            show_unset: true,
            all_expired: false,
        },
    )))
}

async fn expired_bans(state: State<AppState>) -> ApiResult<Json<BTreeMap<String, Vec<BanView>>>> {
    recently_expired(state, DEFAULT_EXPIRED_COUNT).await
}

async fn expired_bans_count(
    state: State<AppState>,
    Path(count): Path<u32>,
) -> ApiResult<Json<BTreeMap<String, Vec<BanView>>>> {
    recently_expired(state, count).await
}

async fn recently_expired(
    State(state): State<AppState>,
    count: u32,
) -> ApiResult<Json<BTreeMap<String, Vec<BanView>>>> {
    let mut bans = state.db.get_recently_expired_bans(count).await?;
    bans.sort_by(|a, b| (&a.channel, a.unset_at).cmp(&(&b.channel, b.unset_at)));
    Ok(Json(by_channel(
        &bans,
        Rendering {
            show_unset: true,
            all_expired: true,
        },
    )))
}

#[derive(Debug, Serialize)]
struct EditView {
    ban: BanView,
    message: Option<String>,
}

impl EditView {
    fn new(ban: &BanRecord, message: Option<String>) -> Self {
        let rendering = Rendering {
            show_unset: true,
            all_expired: false,
        };
        Self {
            ban: BanView::new(ban, rendering, Utc::now().timestamp()),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EditForm {
    expire_at: Option<String>,
    reason: Option<String>,
}

async fn edit_ban(
    State(state): State<AppState>,
    Path((id, token)): Path<(i64, String)>,
) -> ApiResult<Json<EditView>> {
    let ban = state.db.get_ban_with_auth(id, &token).await?;
    Ok(Json(EditView::new(&ban, None)))
}

async fn post_edit_ban(
    State(state): State<AppState>,
    Path((id, token)): Path<(i64, String)>,
    Form(form): Form<EditForm>,
) -> ApiResult<(StatusCode, Json<EditView>)> {
    let ban = state.db.get_ban_with_auth(id, &token).await?;

    let expire_at = match form.expire_at.as_deref() {
        None => ban.expire_at,
        Some(raw) => match parse_time_string(raw, Utc::now()) {
            Ok(expire_at) => expire_at,
            Err(_) => {
                let message = format!("Invalid expiration timestamp or relative date '{raw}'");
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(EditView::new(&ban, Some(message))),
                ));
            }
        },
    };
    let reason = form.reason.unwrap_or_else(|| ban.reason.clone());

    state.db.update_ban(id, expire_at, &reason).await?;
    info!(id, channel = %ban.channel, mask = %ban.mask, "Ban details updated");

    let updated = BanRecord {
        expire_at,
        reason,
        ..ban
    };
    Ok((
        StatusCode::OK,
        Json(EditView::new(&updated, Some("ban details updated".to_owned()))),
    ))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("invalid relative date part: '{0}'")]
    RelativePart(String),
    #[error("unknown time unit: '{0}'")]
    Unit(String),
    #[error("unrecognized timestamp: '{0}'")]
    Timestamp(String),
    #[error("date out of range")]
    OutOfRange,
}

/// Parse an expiry as typed into the edit form, returning a unix timestamp
/// or `None` for `never`.
///
/// Accepts `never`, an RFC 3339 timestamp, `YYYY-MM-DD[ HH:MM[:SS]]` (UTC),
/// or a relative offset from `now` such as `+1d 12h`.
pub fn parse_time_string(raw: &str, now: DateTime<Utc>) -> Result<Option<i64>, TimeParseError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("never") {
        return Ok(None);
    }
    if let Some(relative) = raw.strip_prefix('+') {
        return parse_relative(relative, now).map(|at| Some(at.timestamp()));
    }
    parse_absolute(raw).map(|at| Some(at.timestamp()))
}

fn parse_absolute(raw: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(TimeParseError::Timestamp(raw.to_owned()))
}

enum Offset {
    Seconds(i64),
    Months(u32),
}

fn unit_offset(unit: &str, count: u32) -> Result<Offset, TimeParseError> {
    let count_i = i64::from(count);
    let offset = match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Offset::Seconds(count_i),
        "m" | "min" | "mins" | "minute" | "minutes" => Offset::Seconds(count_i * 60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Offset::Seconds(count_i * 3600),
        "d" | "day" | "days" => Offset::Seconds(count_i * 86400),
        "w" | "wk" | "wks" | "week" | "weeks" => Offset::Seconds(count_i * 7 * 86400),
        "mo" | "month" | "months" => Offset::Months(count),
        "y" | "yr" | "yrs" | "year" | "years" => Offset::Months(
            count.checked_mul(12).ok_or(TimeParseError::OutOfRange)?,
        ),
        other => return Err(TimeParseError::Unit(other.to_owned())),
    };
    Ok(offset)
}

fn parse_relative(relative: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeParseError> {
    let mut parts = relative.split_whitespace().peekable();
    if parts.peek().is_none() {
        return Err(TimeParseError::RelativePart(relative.to_owned()));
    }

    let mut at = now;
    for part in parts {
        let split = part
            .find(|c: char| !c.is_ascii_digit())
            .filter(|&i| i > 0)
            .ok_or_else(|| TimeParseError::RelativePart(part.to_owned()))?;
        let (digits, unit) = part.split_at(split);
        let count: u32 = digits
            .parse()
            .map_err(|_| TimeParseError::RelativePart(part.to_owned()))?;

        at = match unit_offset(unit, count)? {
            Offset::Seconds(secs) => at.checked_add_signed(TimeDelta::seconds(secs)),
            Offset::Months(months) => at.checked_add_months(Months::new(months)),
        }
        .ok_or(TimeParseError::OutOfRange)?;
    }
    Ok(at)
}
