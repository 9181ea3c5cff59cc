//! A stand-in bouncer server for tests. It records every request and answers from a
//! [`Behaviour`] the test can tweak between calls.

use crate::{
    api::BouncerClient,
    auth::{
        AuthStore,
        file_store::{MemorySessionStore, SessionStorage, StoredEntries},
    },
    config::RuntimeConfiguration,
    error::{BouncerResult, RemoveSessionFileSnafu},
    routes::router,
    state::BouncerState,
};
use axum::{
    Router,
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use snafu::ResultExt;
use std::{io, path::PathBuf, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::{Mutex, MutexGuard},
};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub cookie: Option<String>,
    pub json: Option<Value>,
    /// Multipart fields as (name, text) pairs, in order.
    pub fields: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct Behaviour {
    pub login_status: StatusCode,
    pub send_cookie: bool,
    pub logout_status: StatusCode,
    pub session_valid: bool,
    pub users: Value,
    pub add_status: StatusCode,
    pub decrypt_body: String,
    pub password_response: (StatusCode, String),
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            login_status: StatusCode::OK,
            send_cookie: true,
            logout_status: StatusCode::OK,
            session_valid: true,
            users: json!([{"id": 1, "name": "A", "graduationYear": 2025, "roles": ["TA"]}]),
            add_status: StatusCode::OK,
            decrypt_body: "Ada Lovelace".to_string(),
            password_response: (StatusCode::OK, "Password updated successfully".to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    recorded: Mutex<Vec<Recorded>>,
    behaviour: Mutex<Behaviour>,
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    base_url: String,
    shared: Arc<Shared>,
}

impl MockBackend {
    pub const SESSION_COOKIE: &'static str = "session_id=mock-session";

    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new().fallback(answer).with_state(shared.clone());
        let base_url = serve(app).await;

        Self { base_url, shared }
    }

    /// Points at a port nothing listens on.
    pub async fn unreachable() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        Self {
            base_url: format!("http://{addr}"),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn behaviour(&self) -> MutexGuard<'_, Behaviour> {
        self.shared.behaviour.lock().await
    }

    pub async fn recorded(&self) -> Vec<Recorded> {
        self.shared.recorded.lock().await.clone()
    }

    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.shared
            .recorded
            .lock()
            .await
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn client(&self) -> BouncerClient {
        let config = RuntimeConfiguration::for_tests(self.base_url.clone(), PathBuf::new());
        BouncerClient::new(config.api_config()).expect("client builds")
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn record(request: Request) -> Recorded {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut recorded = Recorded {
        method,
        path,
        cookie,
        json: None,
        fields: vec![],
    };

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &()).await.expect("multipart");
        while let Some(field) = multipart.next_field().await.expect("field") {
            let name = field.name().unwrap_or_default().to_string();
            let text = field.text().await.expect("field text");
            recorded.fields.push((name, text));
        }
    } else {
        let bytes = Bytes::from_request(request, &()).await.expect("body");
        if !bytes.is_empty() {
            recorded.json = serde_json::from_slice(&bytes).ok();
        }
    }

    recorded
}

async fn answer(State(shared): State<Arc<Shared>>, request: Request) -> Response {
    let recorded = record(request).await;
    let method = recorded.method.clone();
    let path = recorded.path.clone();
    let has_session = recorded.cookie.as_deref() == Some(MockBackend::SESSION_COOKIE);
    shared.recorded.lock().await.push(recorded);

    let behaviour = shared.behaviour.lock().await;
    let authorised = has_session && behaviour.session_valid;

    match (method.as_str(), path.as_str()) {
        ("POST", "/login") => {
            if behaviour.login_status != StatusCode::OK {
                return (behaviour.login_status, "Invalid credentials").into_response();
            }
            let mut response = "Login successful".into_response();
            if behaviour.send_cookie {
                response.headers_mut().append(
                    header::SET_COOKIE,
                    HeaderValue::from_static("session_id=mock-session; Path=/; HttpOnly"),
                );
            }
            response
        }
        _ if !authorised => (StatusCode::UNAUTHORIZED, "Not authenticated").into_response(),
        ("POST", "/logout") => (behaviour.logout_status, "Logout successful").into_response(),
        ("GET", "/api/users") => Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(behaviour.users.to_string()))
            .expect("response"),
        ("POST", "/api/users") => (behaviour.add_status, "{}").into_response(),
        ("PUT" | "DELETE", p) if p.starts_with("/api/users/") => StatusCode::OK.into_response(),
        ("POST", "/api/bulk-decrypt" | "/api/single-decrypt") => {
            behaviour.decrypt_body.clone().into_response()
        }
        ("POST", "/admin/pass") => behaviour.password_response.clone().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The console itself, wired to a [`MockBackend`], plus an HTTP client that doesn't follow
/// redirects so tests can see where the console sends the browser.
pub struct Console {
    pub base_url: String,
    pub state: BouncerState,
    pub http: reqwest::Client,
}

impl Console {
    /// `restore` decides whether session restoration has already run when the console starts.
    pub async fn start(backend: &MockBackend, restore: bool) -> Self {
        let console = Self::unrestored(backend, Arc::new(MemorySessionStore::default())).await;
        if restore {
            console.state.restore_session().await;
        }
        console
    }

    /// A restored, logged-out console persisting to `storage`.
    pub async fn with_storage(backend: &MockBackend, storage: Arc<dyn SessionStorage>) -> Self {
        let console = Self::unrestored(backend, storage).await;
        console.state.restore_session().await;
        console
    }

    async fn unrestored(backend: &MockBackend, storage: Arc<dyn SessionStorage>) -> Self {
        let config =
            RuntimeConfiguration::for_tests(backend.base_url().to_string(), PathBuf::new());
        let state = BouncerState::new(config, AuthStore::new(storage)).expect("state");

        let base_url = serve(router(state.clone())).await;
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("client");

        Self {
            base_url,
            state,
            http,
        }
    }

    /// A console that is already logged in to the backend.
    pub async fn logged_in(backend: &MockBackend) -> Self {
        let console = Self::start(backend, true).await;
        console
            .state
            .auth()
            .write()
            .await
            .login(MockBackend::SESSION_COOKIE.to_string().into())
            .await
            .expect("login");
        console
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http.get(self.url(path)).send().await.expect("get")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("post")
    }
}

/// Saves fine, but can never be cleared.
#[derive(Debug)]
pub struct BrokenSessionStore;

#[async_trait]
impl SessionStorage for BrokenSessionStore {
    async fn load(&self) -> BouncerResult<Option<StoredEntries>> {
        Ok(None)
    }

    async fn save(&self, _entries: &StoredEntries) -> BouncerResult<()> {
        Ok(())
    }

    async fn clear(&self) -> BouncerResult<()> {
        Err(io::Error::other("read-only disk")).context(RemoveSessionFileSnafu {
            path: PathBuf::from("session.json"),
        })
    }
}

pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
