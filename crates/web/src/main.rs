mod metrics;
mod models;
mod source;

use anyhow::Result;
use askama::Template;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use common::address::{is_valid_address, normalize_address, screen_bulk_addresses};
use common::client::{ApiError, BulkEntry, DashboardApi, Session};
use common::format::shorten_address;
use common::metrics::{derive_summary, filter_wallets};
use common::types::TimeRange;
use models::{SummaryView, TopWalletRow, TrendRow, WalletRowView, WalletStats};
use serde::Deserialize;
use source::DataSource;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState<S> {
    pub source: S,
    pub default_range: TimeRange,
    pub top_wallets_limit: u32,
    pub wallet_page_size: u32,
}

// --- Cookie session ---
//
// The SSO service issues the bearer token; the dashboard only stores it, in
// an HttpOnly cookie, and presents it on every upstream call. No server-side
// session state.

const SESSION_COOKIE_NAME: &str = "walletscope_session";

fn encode_session_cookie(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(token)
}

fn decode_session_cookie(value: &str) -> Option<Session> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    let token = String::from_utf8(bytes).ok()?;
    if token.is_empty() {
        None
    } else {
        Some(Session::new(token))
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_str.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_COOKIE_NAME)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(decode_session_cookie)
    })
}

/// Redirects to /login when no session cookie is present; htmx requests get
/// an HX-Redirect instead so the whole page navigates, not just the partial.
async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(session) = session_from_headers(request.headers()) else {
        return login_redirect(request.headers());
    };
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn login_redirect(headers: &HeaderMap) -> Response {
    let is_htmx = headers.get("HX-Request").is_some();
    if is_htmx {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("HX-Redirect", "/login")
            .body(Body::from("Session expired. Please log in again."))
            .unwrap()
    } else {
        Redirect::to("/login").into_response()
    }
}

// --- Templates ---

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    range: String,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/summary.html")]
struct SummaryTemplate {
    view: SummaryView,
    per_user: models::PerUserView,
}

#[derive(Template)]
#[template(path = "partials/trends.html")]
struct TrendsTemplate {
    rows: Vec<TrendRow>,
}

#[derive(Template)]
#[template(path = "partials/top_wallets.html")]
struct TopWalletsTemplate {
    rows: Vec<TopWalletRow>,
}

#[derive(Template)]
#[template(path = "partials/wallets.html")]
struct WalletsTemplate {
    stats: WalletStats,
    rows: Vec<WalletRowView>,
    query: String,
    notice: Option<String>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/error.html")]
struct ErrorTemplate {
    message: String,
}

/// Upstream failures: an expired token walks the user back to /login, any
/// other error renders an inline fragment instead of breaking the page.
fn api_error_response(err: &ApiError, headers: &HeaderMap) -> Response {
    if err.is_unauthorized() {
        return login_redirect(headers);
    }
    tracing::error!(error = %err, "upstream api failure");
    (
        StatusCode::BAD_GATEWAY,
        Html(
            ErrorTemplate {
                message: err.to_string(),
            }
            .to_string(),
        ),
    )
        .into_response()
}

// --- Handlers ---

#[derive(Deserialize)]
struct RangeParams {
    range: Option<String>,
}

#[derive(Deserialize)]
struct WindowParams {
    window: Option<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn index<S>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse
where
    S: DataSource + Send + Sync + 'static,
{
    Html(
        DashboardTemplate {
            range: state.default_range.as_str().to_string(),
        }
        .to_string(),
    )
}

async fn summary_partial<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(params): Query<RangeParams>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    ::metrics::counter!("walletscope_partial_requests_total", "panel" => "summary").increment(1);
    let range = parse_range(params.range.as_deref(), state.default_range);
    let series = match state.source.global_timeseries(&session, range).await {
        Ok(series) => series,
        Err(e) => return api_error_response(&e, &headers),
    };
    let latest = match state.source.summary(&session).await {
        Ok(latest) => latest,
        Err(e) => return api_error_response(&e, &headers),
    };
    let view = models::summary_view(&derive_summary(&series), range);
    let per_user = models::per_user_view(&latest);
    Html(SummaryTemplate { view, per_user }.to_string()).into_response()
}

async fn trends_partial<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(params): Query<RangeParams>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    ::metrics::counter!("walletscope_partial_requests_total", "panel" => "trends").increment(1);
    let range = parse_range(params.range.as_deref(), state.default_range);
    match state.source.global_timeseries(&session, range).await {
        Ok(series) => {
            let rows = models::trend_rows(&series, 14);
            Html(TrendsTemplate { rows }.to_string()).into_response()
        }
        Err(e) => api_error_response(&e, &headers),
    }
}

async fn top_wallets_partial<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(params): Query<WindowParams>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    ::metrics::counter!("walletscope_partial_requests_total", "panel" => "top_wallets")
        .increment(1);
    let window = parse_range(params.window.as_deref(), state.default_range);
    match state
        .source
        .top_wallets(&session, window, state.top_wallets_limit)
        .await
    {
        Ok(rankings) => {
            let rows = models::top_wallet_rows(&rankings, Utc::now());
            Html(TopWalletsTemplate { rows }.to_string()).into_response()
        }
        Err(e) => api_error_response(&e, &headers),
    }
}

async fn wallets_partial<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    ::metrics::counter!("walletscope_partial_requests_total", "panel" => "wallets").increment(1);
    let query = params.q.unwrap_or_default();
    render_wallets(&state, &session, &headers, &query, None, None).await
}

/// Every wallet-console action re-renders the same panel, so listing,
/// filtering and the add/bulk/remove outcomes share one renderer.
async fn render_wallets<S>(
    state: &AppState<S>,
    session: &Session,
    headers: &HeaderMap,
    query: &str,
    notice: Option<String>,
    error: Option<String>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    match state
        .source
        .list_wallets(session, state.wallet_page_size, 0)
        .await
    {
        Ok(page) => {
            let filtered = filter_wallets(&page.wallets, query);
            let stats = models::wallet_stats(&page.wallets);
            let rows = models::wallet_rows(&filtered, Utc::now());
            Html(
                WalletsTemplate {
                    stats,
                    rows,
                    query: query.to_string(),
                    notice,
                    error,
                }
                .to_string(),
            )
            .into_response()
        }
        Err(e) => api_error_response(&e, headers),
    }
}

#[derive(Deserialize)]
struct AddWalletForm {
    address: String,
    label: Option<String>,
}

async fn add_wallet<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(form): Form<AddWalletForm>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    let trimmed = form.address.trim();
    if !is_valid_address(trimmed) {
        return render_wallets(
            &state,
            &session,
            &headers,
            "",
            None,
            Some(format!("Invalid address format: {trimmed}")),
        )
        .await;
    }
    let address = normalize_address(trimmed);
    let label = form
        .label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    // The API gets the final say on the address; the format check above only
    // spares it the obviously malformed ones.
    let activity_note = match state.source.validate_wallet(&session, &address).await {
        Ok(check) if !check.valid => {
            let error = check
                .error
                .unwrap_or_else(|| "Address rejected by the analytics API".to_string());
            return render_wallets(&state, &session, &headers, "", None, Some(error)).await;
        }
        Ok(check) if !check.has_activity => " (no trading activity yet)",
        Ok(_) => "",
        Err(e) if e.is_unauthorized() => return api_error_response(&e, &headers),
        Err(ApiError::Api { message, .. }) => {
            return render_wallets(&state, &session, &headers, "", None, Some(message)).await;
        }
        Err(e) => return api_error_response(&e, &headers),
    };

    match state.source.register_wallet(&session, &address, label).await {
        Ok(outcome) => {
            let short = shorten_address(&outcome.address);
            let notice = if outcome.is_new {
                format!("Added {short}{activity_note}")
            } else {
                format!("{short} was already tracked")
            };
            render_wallets(&state, &session, &headers, "", Some(notice), None).await
        }
        Err(e) if e.is_unauthorized() => api_error_response(&e, &headers),
        Err(ApiError::Api { message, .. }) => {
            render_wallets(&state, &session, &headers, "", None, Some(message)).await
        }
        Err(e) => api_error_response(&e, &headers),
    }
}

#[derive(Deserialize)]
struct BulkImportForm {
    addresses: String,
}

async fn bulk_import<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(form): Form<BulkImportForm>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    let lines: Vec<&str> = form.addresses.lines().collect();
    let screen = screen_bulk_addresses(&lines);
    if screen.valid.is_empty() {
        let error = if screen.invalid.is_empty() {
            "No addresses supplied".to_string()
        } else {
            format!(
                "No valid addresses; {} line(s) failed format screening",
                screen.invalid.len()
            )
        };
        return render_wallets(&state, &session, &headers, "", None, Some(error)).await;
    }

    let entries: Vec<BulkEntry> = screen
        .valid
        .iter()
        .map(|address| BulkEntry {
            address: address.clone(),
            label: None,
        })
        .collect();

    match state.source.register_bulk(&session, entries).await {
        Ok(outcome) => {
            let mut notice = format!("Imported {} of {} wallets", outcome.successful, outcome.total);
            if !screen.invalid.is_empty() {
                notice.push_str(&format!(
                    ", {} line(s) failed format screening",
                    screen.invalid.len()
                ));
            }
            if outcome.failed > 0 {
                notice.push_str(&format!(", {} rejected upstream", outcome.failed));
            }
            render_wallets(&state, &session, &headers, "", Some(notice), None).await
        }
        Err(e) if e.is_unauthorized() => api_error_response(&e, &headers),
        Err(ApiError::Api { message, .. }) => {
            render_wallets(&state, &session, &headers, "", None, Some(message)).await
        }
        Err(e) => api_error_response(&e, &headers),
    }
}

async fn remove_wallet<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Path(wallet_id): Path<i64>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    match state.source.remove_wallet(&session, wallet_id).await {
        Ok(outcome) => {
            let notice = outcome.address.map_or_else(
                || "Wallet removed".to_string(),
                |a| format!("Removed {}", shorten_address(&a)),
            );
            render_wallets(&state, &session, &headers, "", Some(notice), None).await
        }
        Err(e) if e.is_unauthorized() => api_error_response(&e, &headers),
        Err(ApiError::Api { message, .. }) => {
            render_wallets(&state, &session, &headers, "", None, Some(message)).await
        }
        Err(e) => api_error_response(&e, &headers),
    }
}

fn parse_range(raw: Option<&str>, fallback: TimeRange) -> TimeRange {
    raw.and_then(TimeRange::parse).unwrap_or(fallback)
}

// --- Auth handlers ---

async fn login_form() -> impl IntoResponse {
    Html(LoginTemplate { error: None }.to_string())
}

#[derive(Deserialize)]
struct LoginForm {
    token: String,
}

async fn login_submit<S>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<LoginForm>,
) -> Response
where
    S: DataSource + Send + Sync + 'static,
{
    let token = form.token.trim();
    if token.is_empty() {
        return Html(
            LoginTemplate {
                error: Some("Paste an API token".to_string()),
            }
            .to_string(),
        )
        .into_response();
    }

    // Verify the token against the API before trusting it with a cookie.
    let session = Session::new(token);
    match state.source.summary(&session).await {
        Ok(_) => {
            ::metrics::counter!("walletscope_logins_total", "outcome" => "ok").increment(1);
            let cookie = format!(
                "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800",
                encode_session_cookie(token)
            );
            Response::builder()
                .status(StatusCode::SEE_OTHER)
                .header(header::SET_COOKIE, cookie)
                .header(header::LOCATION, "/")
                .body(Body::empty())
                .unwrap()
                .into_response()
        }
        Err(e) if e.is_unauthorized() => {
            ::metrics::counter!("walletscope_logins_total", "outcome" => "rejected").increment(1);
            Html(
                LoginTemplate {
                    error: Some("Token rejected by the analytics API".to_string()),
                }
                .to_string(),
            )
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "login verification failed");
            Html(
                LoginTemplate {
                    error: Some(format!("Could not reach the analytics API: {e}")),
                }
                .to_string(),
            )
            .into_response()
        }
    }
}

async fn logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::SET_COOKIE, cookie)
        .header(header::LOCATION, "/login")
        .body(Body::empty())
        .unwrap()
}

// --- Router ---

pub fn create_router_with_state<S>(state: Arc<AppState<S>>) -> Router
where
    S: DataSource + Send + Sync + 'static,
{
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/login", get(login_form).post(login_submit::<S>))
        .route("/logout", get(logout));

    // Everything else needs the session cookie
    let protected_routes = Router::new()
        .route("/", get(index::<S>))
        .route("/partials/summary", get(summary_partial::<S>))
        .route("/partials/trends", get(trends_partial::<S>))
        .route("/partials/top-wallets", get(top_wallets_partial::<S>))
        .route("/partials/wallets", get(wallets_partial::<S>))
        .route("/wallets", post(add_wallet::<S>))
        .route("/wallets/bulk", post(bulk_import::<S>))
        .route("/wallets/{wallet_id}/remove", post(remove_wallet::<S>))
        .layer(middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes).with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    let _prom = metrics::install_prometheus(config.observability.prometheus_port)?;
    metrics::describe();

    let api = DashboardApi::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    );
    let state = Arc::new(AppState {
        source: api,
        default_range: config.dashboard.range(),
        top_wallets_limit: config.dashboard.top_wallets_limit,
        wallet_page_size: config.dashboard.wallet_page_size,
    });

    let app = create_router_with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
    tracing::info!("walletscope dashboard listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
