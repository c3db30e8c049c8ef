// HTTP request handlers - dashboard layout surface and sign-in
use crate::application::dashboard_service::{CatalogEntry, Dispatched};
use crate::domain::dashboard::{DashboardEvent, MeasureReason, TierView};
use crate::domain::layout::LayoutItem;
use crate::domain::session::{Session, HOME_PATH, SIGN_IN_PATH};
use crate::domain::widget::WidgetKind;
use crate::infrastructure::http_response::{ApiError, ApiResponse};
use crate::presentation::app_state::AppState;
use crate::presentation::auth_guard::SESSION_COOKIE;
use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Active tier as seen by the renderer; `ready` is false until a width is known.
#[derive(Debug, Serialize)]
pub struct DashboardReply {
    pub ready: bool,
    #[serde(flatten)]
    pub view: Option<TierView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
}

impl DashboardReply {
    fn from_view(view: Option<TierView>) -> Self {
        Self {
            ready: view.is_some(),
            view,
            added: None,
        }
    }
}

impl From<Dispatched> for DashboardReply {
    fn from(dispatched: Dispatched) -> Self {
        Self {
            added: dispatched.transition.added,
            ..Self::from_view(dispatched.view)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewportRequest {
    pub width: Option<u32>,
    #[serde(default = "default_reason")]
    pub reason: MeasureReason,
}

fn default_reason() -> MeasureReason {
    MeasureReason::Resize
}

#[derive(Debug, Deserialize)]
pub struct AddWidgetRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    pub layout: Vec<LayoutItem>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub repeat_password: Option<String>,
}

/// Signed-in user; `access_token` is for clients that send `Authorization: Bearer`.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub access_token: String,
    pub user_email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            user_email: session.user_email,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignUpReply {
    pub confirmation_required: bool,
    pub session: Option<SessionInfo>,
}

fn session_cookie(session: &Session) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Entry point; the session guard has already redirected by this point, this
/// only covers requests that bypass it.
pub async fn home(session: Option<Extension<Session>>) -> Redirect {
    match session {
        Some(_) => Redirect::to(HOME_PATH),
        None => Redirect::to(SIGN_IN_PATH),
    }
}

pub async fn sign_in_page() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success(
        "POST /auth/signin with {email, password}, or /auth/signup to register",
    ))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionInfo>>), ApiError> {
    let session = state.sessions.sign_in(&request.email, &request.password).await?;
    let jar = jar.add(session_cookie(&session));
    Ok((jar, Json(ApiResponse::success(session.into()))))
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SignUpReply>>), ApiError> {
    if request
        .repeat_password
        .as_ref()
        .is_some_and(|repeat| *repeat != request.password)
    {
        return Err(ApiError::BadRequest("passwords do not match".to_string()));
    }

    let mut jar = jar;
    let reply = match state.sessions.sign_up(&request.email, &request.password).await? {
        Some(session) => {
            jar = jar.add(session_cookie(&session));
            SignUpReply {
                confirmation_required: false,
                session: Some(session.into()),
            }
        }
        None => SignUpReply {
            confirmation_required: true,
            session: None,
        },
    };
    Ok((jar, Json(ApiResponse::success(reply))))
}

pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    session: Option<Extension<Session>>,
) -> Result<(CookieJar, Json<ApiResponse<()>>), ApiError> {
    if let Some(Extension(session)) = session {
        state.sessions.sign_out(&session).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(ApiResponse::success(()))))
}

/// Current arrangement of the active breakpoint
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<DashboardReply> {
    let view = state.dashboard_service.view().await;
    Ok(Json(ApiResponse::success(DashboardReply::from_view(view))))
}

pub async fn widget_catalog(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CatalogEntry>> {
    Ok(Json(ApiResponse::success(state.dashboard_service.catalog())))
}

/// Container was measured (resize, orientation change, tab visible again)
pub async fn update_viewport(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewportRequest>,
) -> ApiResult<DashboardReply> {
    let dispatched = state
        .dashboard_service
        .dispatch(DashboardEvent::Measured {
            width: request.width,
            reason: request.reason,
        })
        .await?;
    Ok(Json(ApiResponse::success(dispatched.into())))
}

pub async fn add_widget(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWidgetRequest>,
) -> ApiResult<DashboardReply> {
    let kind = request
        .kind
        .parse::<WidgetKind>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let dispatched = state
        .dashboard_service
        .dispatch(DashboardEvent::AddWidget {
            kind,
            title: request.title.filter(|t| !t.trim().is_empty()),
        })
        .await?;
    Ok(Json(ApiResponse::success(dispatched.into())))
}

pub async fn remove_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DashboardReply> {
    let dispatched = state
        .dashboard_service
        .dispatch(DashboardEvent::RemoveWidget { id })
        .await?;
    Ok(Json(ApiResponse::success(dispatched.into())))
}

/// Drag or resize finished on the active breakpoint
pub async fn update_layout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LayoutRequest>,
) -> ApiResult<DashboardReply> {
    let dispatched = state
        .dashboard_service
        .dispatch(DashboardEvent::LayoutChanged {
            items: request.layout,
        })
        .await?;
    Ok(Json(ApiResponse::success(dispatched.into())))
}

pub async fn clear_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<DashboardReply> {
    let dispatched = state.dashboard_service.dispatch(DashboardEvent::Clear).await?;
    Ok(Json(ApiResponse::success(dispatched.into())))
}
