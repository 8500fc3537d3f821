use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::export::{export_csv, ExportOutcome};
use crate::html;
use crate::lead_sync::LeadSyncService;
use crate::linkedin_client::{LinkedInClient, Paging, TimeWindow};
use crate::linkedin_models::LeadsPayload;
use crate::oauth::{generate_state, OAuthClient};
use crate::session::{
    cookie_key, removal_cookie, session_cookie, state_cookie, AuthSession, SessionStore,
    UserSession, OAUTH_STATE_COOKIE, SESSION_COOKIE,
};
use crate::webhook_publisher::{PublishOutcome, WebhookPublisher};
use axum::{
    extract::{FromRef, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// LinkedIn REST client (token passed per call).
    pub linkedin: LinkedInClient,
    /// Authorization-code flow client.
    pub oauth: OAuthClient,
    pub lead_sync: LeadSyncService,
    pub publisher: WebhookPublisher,
    /// Logged-in sessions, keyed by the id in the session cookie.
    pub sessions: SessionStore,
    /// Signs the session and OAuth state cookies.
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let linkedin = LinkedInClient::new(&config)?;

        Ok(Self {
            oauth: OAuthClient::new(&config)?,
            lead_sync: LeadSyncService::new(linkedin.clone()),
            linkedin,
            publisher: WebhookPublisher::new(&config)?,
            sessions: SessionStore::new(config.session_ttl()),
            cookie_key: cookie_key(config.secret_key.as_deref()),
            config: Arc::new(config),
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Builds the application router with its middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/login", get(login))
        .route("/login/authorized", get(authorized))
        .route("/logout", get(logout))
        .route("/chat", get(chat).post(chat))
        .route("/ads_accounts", get(ads_accounts))
        .route("/sync_leads", get(sync_leads).post(sync_leads))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(1024 * 1024)),
        )
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "linkedin-lead-sync",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub async fn index() -> Result<Html<String>, AppError> {
    Ok(Html(html::index_page()?))
}

/// GET /login
///
/// Redirects to the LinkedIn consent screen. The `state` sent along is
/// remembered in a signed cookie and checked on the callback.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    let oauth_state = generate_state();
    let url = state.oauth.authorize_url(&oauth_state)?;

    tracing::debug!("Redirecting to LinkedIn authorization");
    Ok((jar.add(state_cookie(oauth_state)), Redirect::to(&url)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /login/authorized
///
/// OAuth callback: checks state, exchanges the code, loads the profile and
/// opens a session.
pub async fn authorized(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        tracing::warn!(
            "Authorization denied: {} ({})",
            error,
            params.error_description.unwrap_or_default()
        );
        return Err(AppError::OAuth(format!("Error received: {}", error)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::OAuth("Missing authorization code.".to_string()))?;

    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected_state.is_none() || expected_state != params.state {
        return Err(AppError::OAuth("Invalid OAuth state.".to_string()));
    }

    let access_token = state.oauth.exchange_code(&code).await?;

    let profile = state
        .linkedin
        .fetch_profile(&access_token)
        .await
        .context("Fetching member profile")?;

    let email = match state.linkedin.fetch_primary_email(&access_token).await {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!("Could not fetch member email: {}", e);
            None
        }
    };

    let display_name = profile.display_name();
    tracing::info!(
        "{}, {} logged in with email: {}",
        profile.id,
        display_name,
        email.as_deref().unwrap_or("unknown")
    );

    let session_id = state
        .sessions
        .create(UserSession {
            access_token,
            user_id: profile.id,
            display_name,
            email,
        })
        .await;

    let jar = jar
        .remove(removal_cookie(OAUTH_STATE_COOKIE))
        .add(session_cookie(session_id));

    Ok((jar, Redirect::to("/ads_accounts")))
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value()).await;
        tracing::info!("Session closed");
    }

    (jar.remove(removal_cookie(SESSION_COOKIE)), Redirect::to("/"))
}

/// GET|POST /chat
pub async fn chat(_auth: AuthSession) -> &'static str {
    "Protected route, restricted to logged-in users only!"
}

/// GET /ads_accounts
///
/// Lists the active ad accounts. A LinkedIn failure is logged and shown as
/// an empty list.
pub async fn ads_accounts(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Html<String>, AppError> {
    let accounts = match state
        .linkedin
        .list_ad_accounts(&auth.user.access_token)
        .await
    {
        Ok(accounts) => accounts,
        Err(e) => {
            tracing::error!("Failed to retrieve ad accounts: {}", e);
            Vec::new()
        }
    };

    tracing::debug!("Ads accounts data: {:?}", accounts);
    Ok(Html(html::ads_accounts_page(
        &auth.user.display_name,
        &accounts,
    )?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncLeadsParams {
    #[serde(default)]
    pub account_id: Option<String>,
    /// Window start, epoch ms.
    #[serde(default)]
    pub start: Option<i64>,
    /// Window end (exclusive), epoch ms.
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub start_index: Option<u32>,
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json") && !accept.contains("text/html"))
        .unwrap_or(false)
}

/// GET|POST /sync_leads
///
/// Fetches, flattens and forwards the leads of one account, then renders
/// them. Export and webhook failures are logged and never fail the request.
pub async fn sync_leads(
    State(state): State<AppState>,
    auth: AuthSession,
    headers: HeaderMap,
    Form(params): Form<SyncLeadsParams>,
) -> Result<Response, AppError> {
    let account_id = params
        .account_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| state.config.cmt_account_id.clone())
        .ok_or_else(|| AppError::BadRequest("Account ID not provided".to_string()))?;
    tracing::debug!("Selected account_id: {}", account_id);

    let default_window = TimeWindow::last_days(state.config.lead_lookback_days).ok_or_else(|| {
        AppError::InternalError(format!(
            "Lookback of {} day(s) is out of range",
            state.config.lead_lookback_days
        ))
    })?;
    let window = TimeWindow {
        start: params.start.unwrap_or(default_window.start),
        end: params.end.unwrap_or(default_window.end),
    };
    let defaults = Paging::default();
    let paging = Paging {
        count: params.count.unwrap_or(defaults.count),
        start: params.start_index.unwrap_or(defaults.start),
    };

    let records = state
        .lead_sync
        .sync(&auth.user.access_token, &account_id, window, paging)
        .await?;

    let export_path = state.config.export_path.as_ref().map(PathBuf::from);
    let export_records = records.clone();
    match tokio::task::spawn_blocking(move || {
        export_csv(export_path.as_deref(), &export_records)
    })
    .await
    {
        Ok(ExportOutcome::Written { path, rows }) => {
            tracing::debug!("Exported {} row(s) to {}", rows, path.display())
        }
        Ok(outcome) => tracing::debug!("CSV export outcome: {:?}", outcome),
        Err(e) => tracing::error!("CSV export task failed: {}", e),
    }

    match state.publisher.publish(&records).await {
        PublishOutcome::Failed { status, message } => {
            tracing::warn!(
                "Webhook delivery failed (status {:?}): {}",
                status,
                message
            )
        }
        outcome => tracing::debug!("Webhook outcome: {:?}", outcome),
    }

    if wants_json(&headers) {
        return Ok(Json(LeadsPayload { data: &records }).into_response());
    }

    Ok(Html(html::sync_result_page(&account_id, &records)?).into_response())
}
