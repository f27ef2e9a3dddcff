//! HTTP surface of the tracker.
//!
//! Every route is a thin adapter: it pulls fields out of the JSON body, runs
//! one operation against the database and answers with JSON. Failures are
//! always a 400 carrying a short string.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::commands::auth::{self, Challenge, Verification};
use crate::commands::board::{self, ProjectNode};
use crate::commands::{projects, team, tickets};
use crate::db::Database;
use crate::error::{self, require, Error};
use crate::models::{
    Credential, Member, MemberUpdate, NewMember, NewTicket, Project, ProjectUpdate, Ticket,
    TicketUpdate,
};

/// Shared handle passed to every handler. The database is reached through
/// the mutex, one request at a time.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    hash_cost: u32,
}

impl AppState {
    pub fn new(db: Database, hash_cost: u32) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            hash_cost,
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db.lock().map_err(|_| {
            warn!("database handle poisoned");
            ApiError::bad_request("unable to complete request")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn bad_request(message: &'static str) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        warn!(error = %err, "request failed");
        ApiError::bad_request(err.wire_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.message)).into_response()
    }
}

/// Logs `err` and answers with `message` instead of the generic wording.
/// Validation failures keep their own message.
fn reject(err: Error, message: &'static str) -> ApiError {
    match err {
        Error::Validation(_) => ApiError::from(err),
        other => {
            warn!(error = %other, "request failed");
            ApiError::bad_request(message)
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs password hashing off the async workers. Callers take the database
/// handle only before or after, never across this await.
async fn blocking<T, F>(work: F) -> error::Result<T>
where
    F: FnOnce() -> error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

// Request bodies. Field names are part of the wire contract.

#[derive(Debug, Default, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTeamRequest {
    pub old_email: Option<String>,
    pub new_first: Option<String>,
    pub new_last: Option<String>,
    pub new_phone: Option<String>,
    pub new_email: Option<String>,
    pub new_position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTeamRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPasswordRequest {
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contributor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProjectRequest {
    pub project: Option<String>,
    pub new_name: Option<String>,
    pub new_description: Option<String>,
    pub new_contributor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectRequest {
    pub project_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicketRequest {
    pub project_name: Option<String>,
    pub ticket_title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time: Option<String>,
    pub assigned_devs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTicketRequest {
    pub ticket: Option<String>,
    pub new_ticket_title: Option<String>,
    pub new_author: Option<String>,
    pub new_description: Option<String>,
    pub new_status: Option<String>,
    pub new_priority: Option<String>,
    pub new_type: Option<String>,
    pub new_time: Option<String>,
    pub new_assigned_devs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTicketRequest {
    pub ticket_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub ticket_title: Option<String>,
    pub user: Option<String>,
    pub date: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub ticket_name: Option<String>,
    pub del_text: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/signin", post(signin))
        .route("/register", post(register))
        .route("/edit_team", put(edit_team))
        .route("/delete_team", delete(delete_team))
        .route("/edit_password", put(edit_password))
        .route("/profile/:id", get(profile))
        .route("/team", get(list_team))
        .route("/projects", get(list_board).put(add_project))
        .route("/edit_project", put(edit_project))
        .route("/delete_project", delete(delete_project))
        .route("/tickets", put(add_ticket))
        .route("/edit_ticket", put(edit_ticket))
        .route("/delete_ticket", delete(delete_ticket))
        .route("/comments", put(add_comment))
        .route("/delete_comment", put(delete_comment))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until SIGINT or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("could not register signal handlers, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn root() -> Json<&'static str> {
    Json("it is working!")
}

// Team

async fn signin(State(state): State<AppState>, Json(req): Json<SigninRequest>) -> ApiResult<Member> {
    let email = require(req.email.as_deref(), "email")?;
    let password = require(req.password.as_deref(), "password")?.to_string();

    let challenge = {
        let db = state.db()?;
        auth::challenge(&db, email).map_err(|err| reject(err, "wrong cridentials"))?
    };
    let verification = blocking(move || auth::check_password(&password, &challenge))
        .await
        .map_err(|err| reject(err, "wrong cridentials"))?;

    let db = state.db()?;
    let member = auth::admit(&db, email, verification).map_err(|err| reject(err, "wrong cridentials"))?;
    match member {
        Some(member) => Ok(Json(member)),
        None => Err(ApiError::bad_request("unable to get user")),
    }
}

async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> ApiResult<Member> {
    let profile = NewMember {
        first_name: req.first_name.unwrap_or_default(),
        last_name: req.last_name.unwrap_or_default(),
        phone: req.phone,
        email: req.email.unwrap_or_default(),
    };
    let password = auth::validate_registration(&profile, req.password.as_deref())?.to_string();
    let cost = state.hash_cost;
    let hash = blocking(move || auth::hash_password(&password, cost))
        .await
        .map_err(|err| reject(err, "unable to register"))?;

    let db = state.db()?;
    let member = auth::register_hashed(&db, &profile, &hash).map_err(|err| reject(err, "unable to register"))?;
    Ok(Json(member))
}

async fn edit_team(State(state): State<AppState>, Json(req): Json<EditTeamRequest>) -> ApiResult<Vec<Member>> {
    let update = MemberUpdate {
        first_name: req.new_first,
        last_name: req.new_last,
        phone: req.new_phone,
        email: req.new_email,
        position: req.new_position,
    };
    let db = state.db()?;
    Ok(Json(team::edit(&db, req.old_email.as_deref(), &update)?))
}

async fn delete_team(State(state): State<AppState>, Json(req): Json<DeleteTeamRequest>) -> ApiResult<Vec<Member>> {
    let db = state.db()?;
    Ok(Json(team::remove(&db, req.email.as_deref())?))
}

/// A wrong old password is not an error here: nothing changes and the
/// answer is an empty list.
async fn edit_password(
    State(state): State<AppState>,
    Json(req): Json<EditPasswordRequest>,
) -> ApiResult<Vec<Credential>> {
    let email = require(req.email.as_deref(), "email")?;
    let old_password = require(req.old_password.as_deref(), "oldPassword")?;
    let new_password = require(req.new_password.as_deref(), "newPassword")?;

    let current = {
        let db = state.db()?;
        Challenge::Hash(auth::stored_hash(&db, email)?)
    };
    let (old_password, new_password) = (old_password.to_string(), new_password.to_string());
    let cost = state.hash_cost;
    let hash = blocking(move || match auth::check_password(&old_password, &current)? {
        Verification::Valid => auth::hash_password(&new_password, cost).map(Some),
        Verification::Invalid => Ok(None),
    })
    .await?;

    match hash {
        Some(hash) => {
            let db = state.db()?;
            Ok(Json(auth::store_rotation(&db, email, &hash)?))
        }
        None => {
            info!(email, "password rotation rejected");
            Ok(Json(Vec::new()))
        }
    }
}

async fn profile(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Member> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("error getting user"))?;
    let db = state.db()?;
    match team::get(&db, id) {
        Ok(member) => Ok(Json(member)),
        Err(err @ Error::NotFound(_)) => Err(ApiError::from(err)),
        Err(err) => Err(reject(err, "error getting user")),
    }
}

async fn list_team(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let db = state.db()?;
    Ok(Json(team::list(&db)?))
}

// Projects

async fn list_board(State(state): State<AppState>) -> ApiResult<Vec<ProjectNode>> {
    let db = state.db()?;
    Ok(Json(board::projects_with_tickets(&db)?))
}

async fn add_project(State(state): State<AppState>, Json(req): Json<NewProjectRequest>) -> ApiResult<&'static str> {
    let db = state.db()?;
    projects::create(
        &db,
        req.name.as_deref(),
        req.description.as_deref(),
        req.contributor.as_deref(),
    )?;
    Ok(Json("project added success"))
}

async fn edit_project(State(state): State<AppState>, Json(req): Json<EditProjectRequest>) -> ApiResult<Vec<Project>> {
    let update = ProjectUpdate {
        name: req.new_name,
        description: req.new_description,
        contributors: req.new_contributor,
    };
    let db = state.db()?;
    Ok(Json(projects::rename(&db, req.project.as_deref(), &update)?))
}

async fn delete_project(
    State(state): State<AppState>,
    Json(req): Json<DeleteProjectRequest>,
) -> ApiResult<Vec<Project>> {
    let db = state.db()?;
    Ok(Json(projects::delete(&db, req.project_name.as_deref())?))
}

// Tickets

async fn add_ticket(State(state): State<AppState>, Json(req): Json<NewTicketRequest>) -> ApiResult<&'static str> {
    let ticket = NewTicket {
        project_name: req.project_name.unwrap_or_default(),
        ticket_title: req.ticket_title.unwrap_or_default(),
        author: req.author,
        description: req.description,
        status: req.status,
        priority: req.priority,
        kind: req.kind,
        time: req.time,
        assigned_devs: req.assigned_devs,
    };
    let db = state.db()?;
    tickets::create(&db, &ticket)?;
    Ok(Json("ticket added success"))
}

async fn edit_ticket(State(state): State<AppState>, Json(req): Json<EditTicketRequest>) -> ApiResult<Vec<Ticket>> {
    let update = TicketUpdate {
        ticket_title: req.new_ticket_title,
        author: req.new_author,
        description: req.new_description,
        status: req.new_status,
        priority: req.new_priority,
        kind: req.new_type,
        time: req.new_time,
        assigned_devs: req.new_assigned_devs,
    };
    let db = state.db()?;
    Ok(Json(tickets::edit(&db, req.ticket.as_deref(), &update)?))
}

async fn delete_ticket(
    State(state): State<AppState>,
    Json(req): Json<DeleteTicketRequest>,
) -> ApiResult<Vec<Ticket>> {
    let db = state.db()?;
    Ok(Json(tickets::delete(&db, req.ticket_name.as_deref())?))
}

async fn add_comment(State(state): State<AppState>, Json(req): Json<CommentRequest>) -> ApiResult<&'static str> {
    let db = state.db()?;
    tickets::add_comment(
        &db,
        req.ticket_title.as_deref(),
        req.user.as_deref(),
        req.date.as_deref(),
        req.comment.as_deref(),
    )?;
    Ok(Json("comment success"))
}

async fn delete_comment(
    State(state): State<AppState>,
    Json(req): Json<DeleteCommentRequest>,
) -> ApiResult<Vec<Ticket>> {
    let db = state.db()?;
    Ok(Json(tickets::delete_comment(
        &db,
        req.ticket_name.as_deref(),
        req.del_text.as_deref(),
    )?))
}
