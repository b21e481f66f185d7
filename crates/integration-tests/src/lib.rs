//! Integration test harness for QuickMart.
//!
//! Spins up an in-process fake of the Supabase REST, auth and Realtime
//! endpoints and, optionally, the storefront router on top of it. No
//! external services are needed.
//!
//! # Fake Supabase
//!
//! [`FakeSupabase`] serves:
//!
//! - `POST /auth/v1/token?grant_type=password|refresh_token`
//! - `POST /auth/v1/signup`, `POST /auth/v1/logout`, `GET /auth/v1/user`
//! - `GET/POST/PATCH/DELETE /rest/v1/{table}` with `eq.`, `in.()`, `order`
//!   and `limit` filters over in-memory JSON rows
//!
//! - `GET /realtime/v1/websocket` speaking the Phoenix channel protocol:
//!   joins and heartbeats are acknowledged, and product changes pushed with
//!   [`FakeSupabase::push_product_change`] go to every open socket
//!
//! Writes to `products` and `orders` require a user access token, mirroring
//! row-level security.
//!
//! # Example
//!
//! ```rust,ignore
//! let fake = FakeSupabase::start().await;
//! fake.seed_user("owner@quickmart.in", "secret-pass", "Owner");
//! let app = TestApp::spawn(&fake, Some("owner@quickmart.in")).await;
//! app.sign_in("owner@quickmart.in", "secret-pass").await;
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use quickmart_storefront::config::{StorefrontConfig, SupabaseConfig};
use quickmart_storefront::services::RestCatalog;
use quickmart_storefront::state::AppState;
use quickmart_storefront::supabase::SupabaseClient;

/// Project key the fake accepts.
pub const ANON_KEY: &str = "fake-anon-key-for-integration-tests-only";

/// Lifetime of issued access tokens, in seconds.
const TOKEN_TTL: i64 = 3600;

// =============================================================================
// Fake state
// =============================================================================

#[derive(Debug, Clone)]
struct FakeUser {
    id: Uuid,
    email: String,
    password: String,
    name: Option<String>,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "user_metadata": { "name": self.name },
        })
    }
}

#[derive(Debug, Default)]
struct FakeState {
    users: Vec<FakeUser>,
    /// access token -> user id
    access_tokens: HashMap<String, Uuid>,
    /// refresh token -> user id
    refresh_tokens: HashMap<String, Uuid>,
    tables: HashMap<String, Vec<Value>>,
    next_product_id: i64,
    /// Issue tokens that are already expired.
    issue_expired: bool,
    require_confirmation: bool,
    fail_table_reads: Vec<String>,
    signed_out: Vec<String>,
    request_log: Vec<String>,
    /// Topic of every Realtime join, in order.
    realtime_joins: Vec<String>,
    reject_realtime_joins: bool,
}

impl FakeState {
    fn table(&mut self, name: &str) -> &mut Vec<Value> {
        self.tables.entry(name.to_string()).or_default()
    }

    fn issue_session(&mut self, user: &FakeUser) -> Value {
        let access = format!("access-{}", Uuid::new_v4());
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.insert(access.clone(), user.id);
        self.refresh_tokens.insert(refresh.clone(), user.id);

        let expires_in = if self.issue_expired { 0 } else { TOKEN_TTL };
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
            "expires_in": expires_in,
            "expires_at": Utc::now().timestamp() + expires_in,
            "user": user.to_json(),
        })
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Sent to every open Realtime socket.
#[derive(Debug, Clone)]
enum RealtimeEvent {
    Frame(String),
    Disconnect,
}

#[derive(Clone)]
struct RealtimeHub {
    state: Shared,
    events: broadcast::Sender<RealtimeEvent>,
}

/// In-process fake Supabase project.
pub struct FakeSupabase {
    url: String,
    state: Shared,
    events: broadcast::Sender<RealtimeEvent>,
    task: JoinHandle<()>,
}

impl Drop for FakeSupabase {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeSupabase {
    /// Start the fake on an ephemeral port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState {
            next_product_id: 1,
            ..FakeState::default()
        }));
        let (events, _) = broadcast::channel(64);

        let realtime = Router::new()
            .route("/realtime/v1/websocket", get(realtime_socket))
            .with_state(RealtimeHub {
                state: Arc::clone(&state),
                events: events.clone(),
            });

        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/user", get(current_user))
            .route(
                "/rest/v1/{table}",
                get(select_rows)
                    .post(insert_row)
                    .patch(update_rows)
                    .delete(delete_rows),
            )
            .with_state(Arc::clone(&state))
            .merge(realtime);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            events,
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Project URL (`http://127.0.0.1:port`).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Supabase settings pointing at this fake.
    #[must_use]
    pub fn supabase_config(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: url::Url::parse(&self.url).unwrap(),
            anon_key: SecretString::from(ANON_KEY),
        }
    }

    /// Storefront settings pointing at this fake.
    #[must_use]
    pub fn storefront_config(&self, owner_email: Option<&str>) -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            supabase: self.supabase_config(),
            owner_email: owner_email.map(|e| quickmart_core::Email::parse(e).unwrap()),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Backend clients pointing at this fake.
    #[must_use]
    pub fn client(&self) -> SupabaseClient {
        SupabaseClient::new(&self.supabase_config())
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    /// Register an auth user (no profile row). Returns the user id.
    pub fn seed_user(&self, email: &str, password: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.push(FakeUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
        });
        id
    }

    /// Insert a profile row.
    pub fn seed_profile(&self, id: Uuid, name: &str, role: &str) {
        self.lock().table("profiles").push(json!({
            "id": id,
            "name": name,
            "role": role,
            "created_at": Utc::now(),
        }));
    }

    /// Insert a product row. Returns its id.
    pub fn seed_product(&self, name: &str, price: f64, category: &str, emoji: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_product_id;
        state.next_product_id += 1;
        state.table("products").push(json!({
            "id": id,
            "name": name,
            "price": price,
            "category": category,
            "emoji": emoji,
            "created_at": Utc::now(),
        }));
        id
    }

    /// Insert an order row.
    pub fn seed_order(&self, user_id: Uuid, items: Value, total: f64) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().table("orders").push(json!({
            "id": id,
            "user_id": user_id,
            "items": items,
            "total": total,
            "created_at": Utc::now(),
        }));
        id
    }

    // -------------------------------------------------------------------------
    // Knobs and inspection
    // -------------------------------------------------------------------------

    /// Rows currently stored in `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().table(table).clone()
    }

    /// Make reads of `table` fail with a 500.
    pub fn fail_reads(&self, table: &str) {
        self.lock().fail_table_reads.push(table.to_string());
    }

    /// Let reads of every table succeed again.
    pub fn heal_reads(&self) {
        self.lock().fail_table_reads.clear();
    }

    /// Sign-up returns a bare user (email confirmation required).
    pub fn require_confirmation(&self, required: bool) {
        self.lock().require_confirmation = required;
    }

    /// Issue sessions that are already expired.
    pub fn issue_expired_tokens(&self, expired: bool) {
        self.lock().issue_expired = expired;
    }

    /// Forget every refresh token, so refreshes fail.
    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    /// Access tokens that were signed out.
    #[must_use]
    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.lock().signed_out.clone()
    }

    /// `METHOD path?query` of every REST request, in order.
    #[must_use]
    pub fn request_log(&self) -> Vec<String> {
        self.lock().request_log.clone()
    }

    // -------------------------------------------------------------------------
    // Realtime
    // -------------------------------------------------------------------------

    /// Topics joined over Realtime so far, one entry per join.
    #[must_use]
    pub fn realtime_joins(&self) -> Vec<String> {
        self.lock().realtime_joins.clone()
    }

    /// Answer Realtime joins with an error reply.
    pub fn reject_realtime_joins(&self, reject: bool) {
        self.lock().reject_realtime_joins = reject;
    }

    /// Broadcast a `postgres_changes` event for the `products` table
    /// (`kind` is `INSERT`, `UPDATE` or `DELETE`).
    pub fn push_product_change(&self, kind: &str) {
        let frame = json!({
            "topic": "realtime:products_changes",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": kind,
                    "schema": "public",
                    "table": "products",
                    "commit_timestamp": Utc::now(),
                },
                "ids": [1],
            },
            "ref": null,
        });
        // No receivers just means no socket is open
        let _ = self.events.send(RealtimeEvent::Frame(frame.to_string()));
    }

    /// Close every open Realtime socket without a close frame.
    pub fn drop_realtime_connections(&self) {
        let _ = self.events.send(RealtimeEvent::Disconnect);
    }
}

// =============================================================================
// Auth endpoints
// =============================================================================

fn auth_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": "invalid_grant", "error_description": message })),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn has_project_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

async fn token(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if !has_project_key(&headers) {
        return auth_error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    let mut state = state.lock().unwrap();

    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let user = state
                .users
                .iter()
                .find(|u| u.email == email && u.password == password)
                .cloned();
            match user {
                Some(user) => Json(state.issue_session(&user)).into_response(),
                None => auth_error(StatusCode::BAD_REQUEST, "Invalid login credentials"),
            }
        }
        Some("refresh_token") => {
            let refresh = body["refresh_token"].as_str().unwrap_or_default();
            let user = state
                .refresh_tokens
                .remove(refresh)
                .and_then(|id| state.users.iter().find(|u| u.id == id).cloned());
            match user {
                Some(user) => {
                    // Refreshed sessions are always fresh
                    let expired = std::mem::replace(&mut state.issue_expired, false);
                    let session = state.issue_session(&user);
                    state.issue_expired = expired;
                    Json(session).into_response()
                }
                None => auth_error(StatusCode::BAD_REQUEST, "Invalid Refresh Token"),
            }
        }
        _ => auth_error(StatusCode::BAD_REQUEST, "unsupported grant_type"),
    }
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();

    if state.users.iter().any(|u| u.email == email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "User already registered" })),
        )
            .into_response();
    }

    let user = FakeUser {
        id: Uuid::new_v4(),
        email,
        password: body["password"].as_str().unwrap_or_default().to_string(),
        name: body["data"]["name"].as_str().map(str::to_string),
    };
    state.users.push(user.clone());

    if state.require_confirmation {
        Json(user.to_json()).into_response()
    } else {
        Json(state.issue_session(&user)).into_response()
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> StatusCode {
    let mut state = state.lock().unwrap();
    match bearer(&headers) {
        Some(token) if state.access_tokens.remove(&token).is_some() => {
            state.signed_out.push(token);
            StatusCode::NO_CONTENT
        }
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    let user = bearer(&headers)
        .and_then(|t| state.access_tokens.get(&t).copied())
        .and_then(|id| state.users.iter().find(|u| u.id == id));
    match user {
        Some(user) => Json(user.to_json()).into_response(),
        None => auth_error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}

// =============================================================================
// REST endpoints
// =============================================================================

fn rest_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
        .into_response()
}

/// Comparable text for a JSON cell, as it appears in a filter.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filters(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, filter)| {
        let cell = cell_text(&row[column.as_str()]);
        if let Some(expected) = filter.strip_prefix("eq.") {
            cell == expected
        } else if let Some(list) = filter
            .strip_prefix("in.(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            list.split(',').any(|v| v == cell)
        } else {
            true
        }
    })
}

/// Split the query into column filters and `order`/`limit`.
fn parse_query(pairs: &[(String, String)]) -> (Vec<(String, String)>, Option<String>, Option<usize>) {
    let mut filters = Vec::new();
    let mut order = None;
    let mut limit = None;
    for (key, value) in pairs {
        match key.as_str() {
            "select" => {}
            "order" => order = Some(value.clone()),
            "limit" => limit = value.parse().ok(),
            _ => filters.push((key.clone(), value.clone())),
        }
    }
    (filters, order, limit)
}

fn sort_rows(rows: &mut [Value], order: &str) {
    let (column, direction) = order.split_once('.').unwrap_or((order, "asc"));
    rows.sort_by(|a, b| {
        let ordering = match (&a[column], &b[column]) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&y.as_f64().unwrap_or_default()),
            (x, y) => cell_text(x).cmp(&cell_text(y)),
        };
        if direction == "desc" {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn log_request(state: &mut FakeState, method: &str, table: &str, pairs: &[(String, String)]) {
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    state.request_log.push(format!("{method} /{table}?{query}"));
}

/// Whether the request carries a signed-in user's token.
fn is_user_request(state: &FakeState, headers: &HeaderMap) -> bool {
    bearer(headers).is_some_and(|t| state.access_tokens.contains_key(&t))
}

fn requires_user(table: &str) -> bool {
    matches!(table, "products" | "orders")
}

async fn select_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    if !has_project_key(&headers) {
        return rest_error(StatusCode::UNAUTHORIZED, "PGRST301", "No API key found");
    }
    let mut state = state.lock().unwrap();
    log_request(&mut state, "GET", &table, &pairs);

    if state.fail_table_reads.contains(&table) {
        return rest_error(StatusCode::INTERNAL_SERVER_ERROR, "XX000", "simulated outage");
    }

    let (filters, order, limit) = parse_query(&pairs);
    let mut rows: Vec<Value> = state
        .table(&table)
        .iter()
        .filter(|row| matches_filters(row, &filters))
        .cloned()
        .collect();
    if let Some(order) = order {
        sort_rows(&mut rows, &order);
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    Json(rows).into_response()
}

async fn insert_row(
    State(state): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.lock().unwrap();
    log_request(&mut state, "POST", &table, &pairs);

    if requires_user(&table) && !is_user_request(&state, &headers) {
        return rest_error(
            StatusCode::FORBIDDEN,
            "42501",
            "new row violates row-level security policy",
        );
    }

    let mut row = body;
    match table.as_str() {
        "products" => {
            let id = state.next_product_id;
            state.next_product_id += 1;
            row.insert("id".to_string(), json!(id));
        }
        "orders" => {
            row.insert("id".to_string(), json!(Uuid::new_v4()));
        }
        "profiles" => {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            if state.table("profiles").iter().any(|p| p["id"] == id) {
                return rest_error(
                    StatusCode::CONFLICT,
                    "23505",
                    "duplicate key value violates unique constraint \"profiles_pkey\"",
                );
            }
        }
        _ => {}
    }
    row.entry("created_at".to_string())
        .or_insert_with(|| json!(Utc::now()));

    let row = Value::Object(row);
    state.table(&table).push(row.clone());
    (StatusCode::CREATED, Json(row)).into_response()
}

async fn update_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.lock().unwrap();
    log_request(&mut state, "PATCH", &table, &pairs);

    if !is_user_request(&state, &headers) {
        return rest_error(StatusCode::UNAUTHORIZED, "42501", "permission denied");
    }

    let (filters, _, _) = parse_query(&pairs);
    let mut updated = Vec::new();
    for row in state.table(&table).iter_mut() {
        if matches_filters(row, &filters)
            && let Value::Object(fields) = row
        {
            for (key, value) in &body {
                fields.insert(key.clone(), value.clone());
            }
            updated.push(row.clone());
        }
    }

    match updated.as_slice() {
        [row] => Json(row.clone()).into_response(),
        _ => rest_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        ),
    }
}

async fn delete_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    log_request(&mut state, "DELETE", &table, &pairs);

    if requires_user(&table) && !is_user_request(&state, &headers) {
        return StatusCode::FORBIDDEN;
    }

    let (filters, _, _) = parse_query(&pairs);
    state
        .table(&table)
        .retain(|row| !matches_filters(row, &filters));
    StatusCode::NO_CONTENT
}

// =============================================================================
// Realtime endpoint
// =============================================================================

async fn realtime_socket(
    State(hub): State<RealtimeHub>,
    Query(query): Query<HashMap<String, String>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    if query.get("apikey").map(String::as_str) != Some(ANON_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    upgrade.on_upgrade(move |socket| serve_realtime(hub, socket))
}

/// Reply to a Phoenix frame from the client, if it needs one.
fn realtime_reply(state: &Shared, frame: &Value) -> Option<Value> {
    let status = match frame["event"].as_str()? {
        "phx_join" => {
            let mut state = state.lock().unwrap();
            let topic = frame["topic"].as_str().unwrap_or_default().to_string();
            state.realtime_joins.push(topic);
            if state.reject_realtime_joins { "error" } else { "ok" }
        }
        "heartbeat" => "ok",
        _ => return None,
    };
    Some(json!({
        "topic": frame["topic"],
        "event": "phx_reply",
        "payload": { "status": status, "response": {} },
        "ref": frame["ref"],
    }))
}

async fn serve_realtime(hub: RealtimeHub, mut socket: WebSocket) {
    let mut events = hub.events.subscribe();
    loop {
        tokio::select! {
            message = socket.recv() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                    _ => break,
                };
                let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                let Some(reply) = realtime_reply(&hub.state, &frame) else {
                    continue;
                };
                if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(RealtimeEvent::Frame(frame)) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Ok(RealtimeEvent::Disconnect) | Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

// =============================================================================
// Storefront under test
// =============================================================================

/// The storefront router served on an ephemeral port, with a cookie-keeping
/// client.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    task: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestApp {
    /// Start the storefront against `fake`. Waits for the first catalog
    /// snapshot.
    pub async fn spawn(fake: &FakeSupabase, owner_email: Option<&str>) -> Self {
        let config = fake.storefront_config(owner_email);
        let supabase = SupabaseClient::new(&config.supabase);
        let catalog = RestCatalog::new(supabase.rest().clone());
        let state = AppState::with_catalog(config, supabase, catalog);

        // Returns once a snapshot taken after startup is published
        tokio::time::timeout(Duration::from_secs(5), state.catalog().refresh())
            .await
            .unwrap();

        let app = quickmart_storefront::router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
            task,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` without following redirects.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// POST a form to `path` without following redirects.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// GET `path` and return the body, asserting a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.unwrap()
    }

    /// Sign in through the login form.
    pub async fn sign_in(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/auth/login", &[("email", email), ("password", password)])
            .await
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
