use crate::{
    api::BouncerClient,
    auth::{
        AuthStore,
        gate::{GateTransition, SessionGate},
    },
    config::RuntimeConfiguration,
    error::{BouncerError, BouncerResult},
    maud_conveniences::render_nav,
    routes::View,
};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use maud::{DOCTYPE, Markup, html};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub struct BouncerState {
    config: RuntimeConfiguration,
    client: BouncerClient,
    auth: Arc<RwLock<AuthStore>>,
}

impl BouncerState {
    pub fn new(config: RuntimeConfiguration, auth: AuthStore) -> BouncerResult<Self> {
        let client = BouncerClient::new(config.api_config())?;

        Ok(Self {
            config,
            client,
            auth: Arc::new(RwLock::new(auth)),
        })
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub const fn client(&self) -> &BouncerClient {
        &self.client
    }

    pub const fn auth(&self) -> &Arc<RwLock<AuthStore>> {
        &self.auth
    }

    /// Reads the persisted session without holding the store lock during I/O, so requests
    /// that arrive meanwhile see the loading page rather than block.
    pub async fn restore_session(&self) {
        let storage = self.auth.read().await.storage();
        let loaded = storage.load().await;
        self.auth.write().await.finish_restore(loaded);
    }

    /// Runs the session gate for one mount of a guarded view. `Ok` carries the token to fetch
    /// with; `Err` is the response to send instead (loading page or redirect to login).
    pub async fn mount_guarded(&self) -> Result<SecretString, Response> {
        let mut gate = SessionGate::new();
        let store = self.auth.read().await;

        let transition = gate.poll(&store);
        trace!(phase = ?gate.phase(), "session gate polled");

        match transition {
            GateTransition::Proceed(token) => Ok(token),
            GateTransition::RedirectToLogin => {
                debug!("not logged in, sending to login");
                Err(Redirect::to(View::Login.path()).into_response())
            }
            // every request is a fresh mount with a fresh gate, so `Settled` never comes back
            // here; it only shares the loading arm to keep the match total
            GateTransition::Wait | GateTransition::Settled => {
                Err(self.render(false, render_restoring()).into_response())
            }
        }
    }

    /// If the backend says our session is dead, forget it locally too. Returns whether it did.
    pub async fn fail_closed(&self, error: &BouncerError) -> bool {
        if !error.is_session_rejection() {
            return false;
        }

        warn!(?error, "bouncer server rejected the session, logging out locally");
        if let Err(e) = self.auth.write().await.logout().await {
            error!(?e, "unable to clear persisted session");
        }
        true
    }

    #[allow(clippy::unused_self)]
    pub fn render(&self, logged_in: bool, markup: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    title { "Disco Bouncer" }
                }
                body class="bg-gray-900 min-h-screen flex flex-col items-center text-white" {
                    (render_nav(logged_in))
                    (markup)
                }
            }
        }
    }
}

/// The session token of a guarded view. Extracting it runs the session gate, so a handler
/// taking `Guarded` only ever runs once the user is known to be logged in.
pub struct Guarded(pub SecretString);

impl FromRequestParts<BouncerState> for Guarded {
    type Rejection = Response;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &BouncerState,
    ) -> Result<Self, Self::Rejection> {
        state.mount_guarded().await.map(Self)
    }
}

fn render_restoring() -> Markup {
    html! {
        meta http-equiv="refresh" content="1" {}
        div class="bg-gray-800 p-8 rounded shadow-md max-w-md w-full text-center text-gray-300" {
            "Loading..."
        }
    }
}
