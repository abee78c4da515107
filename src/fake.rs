// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! A loopback stand-in for the activities API.

use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

use crate::api::Transport;

pub(crate) const USERNAME: &str = "mrodriguez";
pub(crate) const PASSWORD: &str = "watercolor-2024";

/// Ways `/check-auth` can misbehave.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Fault {
    /// Answers 503 with no body.
    Unavailable,
    /// Answers 200 with something that is not JSON.
    Garbled,
    /// Claims the token is good but names no user.
    Anonymous,
}

struct Activity {
    max_participants: i64,
    participants: Vec<String>,
}

#[derive(Default)]
struct Shared {
    sessions: Mutex<HashMap<String, String>>,
    activities: Mutex<BTreeMap<String, Activity>>,
    requests: AtomicUsize,
    issued: AtomicUsize,
    fail_activities: AtomicBool,
    garble_activities: AtomicBool,
    garble_login: AtomicBool,
    check_auth_fault: Mutex<Option<Fault>>,
}

impl Shared {
    fn hit(&self) {
        _ = self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn user(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }
}

fn rejection(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn login(
    State(shared): State<Arc<Shared>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    shared.hit();
    let (Some(username), Some(password)) = (query.get("username"), query.get("password")) else {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "Missing credentials");
    };
    if username != USERNAME || password != PASSWORD {
        return rejection(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    if shared.garble_login.load(Ordering::SeqCst) {
        return "<html>maintenance</html>".into_response();
    }

    let token = format!("token-{}", shared.issued.fetch_add(1, Ordering::SeqCst));
    _ = shared
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(token.clone(), username.clone());
    Json(json!({ "token": token, "username": username })).into_response()
}

async fn logout(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.hit();
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        _ = shared
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
    Json(json!({ "message": "Logged out successfully" })).into_response()
}

async fn check_auth(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.hit();
    let fault = *shared
        .check_auth_fault
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    match fault {
        Some(Fault::Unavailable) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Some(Fault::Garbled) => return "<html>maintenance</html>".into_response(),
        Some(Fault::Anonymous) => return Json(json!({ "authenticated": true })).into_response(),
        None => {}
    }

    let body = match shared.user(&headers) {
        Some(username) => json!({ "authenticated": true, "username": username }),
        None => json!({ "authenticated": false }),
    };
    Json(body).into_response()
}

async fn activities(State(shared): State<Arc<Shared>>) -> Response {
    shared.hit();
    if shared.fail_activities.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if shared.garble_activities.load(Ordering::SeqCst) {
        return "<html>maintenance</html>".into_response();
    }

    let activities = shared
        .activities
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let body: serde_json::Map<String, Value> = activities
        .iter()
        .map(|(name, activity)| {
            (
                name.clone(),
                json!({
                    "description": format!("All about {name}"),
                    "schedule": "Fridays, 3:30 PM - 5:00 PM",
                    "max_participants": activity.max_participants,
                    "participants": activity.participants,
                }),
            )
        })
        .collect();
    Json(Value::Object(body)).into_response()
}

fn enroll(
    shared: &Shared,
    headers: &HeaderMap,
    name: &str,
    query: &HashMap<String, String>,
    add: bool,
) -> Response {
    shared.hit();
    if shared.user(headers).is_none() {
        return rejection(StatusCode::UNAUTHORIZED, "Authentication required");
    }
    let Some(email) = query.get("email") else {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "Missing email");
    };

    let mut activities = shared
        .activities
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let Some(activity) = activities.get_mut(name) else {
        return rejection(StatusCode::NOT_FOUND, "Activity not found");
    };

    let position = activity.participants.iter().position(|p| p == email);
    match (add, position) {
        (true, Some(_)) => rejection(StatusCode::BAD_REQUEST, "Student is already signed up"),
        (true, None) => {
            activity.participants.push(email.clone());
            Json(json!({ "message": format!("Signed up {email} for {name}") })).into_response()
        }
        (false, None) => rejection(
            StatusCode::BAD_REQUEST,
            "Student is not signed up for this activity",
        ),
        (false, Some(idx)) => {
            _ = activity.participants.remove(idx);
            Json(json!({ "message": format!("Unregistered {email} from {name}") })).into_response()
        }
    }
}

async fn signup(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    enroll(&shared, &headers, &name, &query, true)
}

async fn unregister(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    enroll(&shared, &headers, &name, &query, false)
}

/// A running fake. The server task lives as long as the test's runtime.
pub(crate) struct Api {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Api {
    /// Starts a fake whose roster holds a single activity, "Chess Club", with
    /// room for four and `a@x.com` already signed up.
    pub(crate) async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        _ = shared
            .activities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                "Chess Club".to_owned(),
                Activity {
                    max_participants: 4,
                    participants: vec!["a@x.com".to_owned()],
                },
            );

        let app = Router::new()
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/check-auth", get(check_auth))
            .route("/activities", get(activities))
            .route("/activities/{name}/signup", post(signup))
            .route("/activities/{name}/unregister", delete(unregister))
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local address");
        drop(tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        }));

        Self { addr, shared }
    }

    pub(crate) fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("fake URL")
    }

    pub(crate) fn transport(&self) -> Arc<Transport> {
        Arc::new(Transport::new(self.url()).expect("transport"))
    }

    /// How many requests the fake has answered.
    pub(crate) fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    /// Forgets every issued token, as a server restart would.
    pub(crate) fn expire_sessions(&self) {
        self.shared
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub(crate) fn fail_activities(&self, fail: bool) {
        self.shared.fail_activities.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn garble_activities(&self, garble: bool) {
        self.shared.garble_activities.store(garble, Ordering::SeqCst);
    }

    /// Makes successful logins answer with a body that is not JSON.
    pub(crate) fn garble_login(&self, garble: bool) {
        self.shared.garble_login.store(garble, Ordering::SeqCst);
    }

    pub(crate) fn break_check_auth(&self, fault: Option<Fault>) {
        *self
            .shared
            .check_auth_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = fault;
    }
}

/// A URL nothing is listening on.
pub(crate) async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local address");
    drop(listener);
    Url::parse(&format!("http://{addr}/")).expect("closed URL")
}

pub(crate) async fn unreachable() -> Arc<Transport> {
    Arc::new(Transport::new(unreachable_url().await).expect("transport"))
}
