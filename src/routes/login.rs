use crate::{
    error::{BouncerError, BouncerResult},
    maud_conveniences::{error_alert, form_submit_button, simple_form_element, title},
    routes::{
        View,
        dashboard::{Notice, Overlay, show_dashboard},
    },
    state::BouncerState,
};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub async fn get_login(State(state): State<BouncerState>) -> Response {
    if state.auth().read().await.is_authenticated() {
        return Redirect::to(View::Dashboard.path()).into_response();
    }

    render_login(&state, None, None, None).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: SecretString,
}

pub async fn post_login(
    State(state): State<BouncerState>,
    Form(LoginForm { username, password }): Form<LoginForm>,
) -> Response {
    let failure = match state.client().login(&username, &password).await {
        Ok(token) => match state.auth().write().await.login(token).await {
            Ok(()) => {
                info!(?username, "logged in to bouncer server");
                return Redirect::to(View::Dashboard.path()).into_response();
            }
            Err(e) => e,
        },
        Err(e) => e,
    };

    warn!(?username, ?failure, "login failed");
    let message = match &failure {
        // avoid giving extra details for security reasons :)
        BouncerError::InvalidCredentials => {
            "Username/password not found or password incorrect".to_string()
        }
        other => other.to_string(),
    };

    (
        failure.status_code(),
        render_login(&state, Some(&username), Some(&password), Some(&message)),
    )
        .into_response()
}

/// The entered values go back into the form so a failed attempt doesn't wipe them.
fn render_login(
    state: &BouncerState,
    username: Option<&str>,
    password: Option<&SecretString>,
    error: Option<&str>,
) -> Markup {
    state.render(
        false,
        html! {
            div class="bg-gray-800 shadow-md rounded px-8 pt-6 pb-8 mb-4 w-full max-w-sm" {
                (title("Login"))
                @if let Some(error) = error {
                    (error_alert(error))
                }

                form method="post" action=(View::Login.path()) {
                    (simple_form_element("username", "Username", true, None, username))
                    (simple_form_element("password", "Password", true, Some("password"), password.map(|p| p.expose_secret())))
                    (form_submit_button(Some("Login")))
                }
            }
        },
    )
}

/// A session file that can't be removed is an error rather than a redirect: the next start
/// would restore it.
pub async fn post_logout(State(state): State<BouncerState>) -> BouncerResult<Response> {
    let Some(token) = state.auth().read().await.token().cloned() else {
        return Ok(Redirect::to(View::Login.path()).into_response());
    };

    match state.client().logout(&token).await {
        Ok(()) => {
            state.auth().write().await.logout().await?;
            Ok(Redirect::to(View::Login.path()).into_response())
        }
        Err(e) => {
            if state.fail_closed(&e).await {
                return Ok(Redirect::to(View::Login.path()).into_response());
            }
            let notice = Notice::Error(format!("Logout failed: {e}"));
            Ok(show_dashboard(&state, &token, Overlay::None, Some(notice)).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{BrokenSessionStore, Console, MockBackend, location};
    use reqwest::StatusCode;
    use secrecy::ExposeSecret;
    use std::sync::Arc;

    #[tokio::test]
    async fn good_credentials_store_the_token_and_go_to_the_dashboard() {
        let backend = MockBackend::start().await;
        let console = Console::start(&backend, true).await;

        let response = console
            .post_form("/login", &[("username", "admin"), ("password", "hunter22")])
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/"));

        let auth = console.state.auth().read().await;
        assert!(auth.is_authenticated());
        assert_eq!(
            auth.token().map(|t| t.expose_secret().to_string()).as_deref(),
            Some(MockBackend::SESSION_COOKIE)
        );
        assert_eq!(backend.count("POST", "/login").await, 1);
    }

    #[tokio::test]
    async fn bad_credentials_stay_on_the_form() {
        let backend = MockBackend::start().await;
        backend.behaviour().await.login_status = StatusCode::UNAUTHORIZED;
        let console = Console::start(&backend, true).await;

        let response = console
            .post_form("/login", &[("username", "admin"), ("password", "wrong")])
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(location(&response).is_none());
        let html = response.text().await.unwrap();
        assert!(html.contains("action=\"/login\""));
        assert!(html.contains("value=\"admin\""));
        assert!(html.contains("value=\"wrong\""));
        assert!(!console.state.auth().read().await.is_authenticated());
        // one attempt, no retries
        assert_eq!(backend.count("POST", "/login").await, 1);
    }

    #[tokio::test]
    async fn unreachable_server_stays_on_the_form() {
        let backend = MockBackend::unreachable().await;
        let console = Console::start(&backend, true).await;

        let response = console
            .post_form("/login", &[("username", "admin"), ("password", "pw")])
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.text().await.unwrap().contains("Unable to reach the bouncer server"));
        assert!(!console.state.auth().read().await.is_authenticated());
    }

    #[tokio::test]
    async fn login_page_skips_ahead_when_logged_in() {
        let backend = MockBackend::start().await;
        let console = Console::logged_in(&backend).await;

        let response = console.get("/login").await;

        assert_eq!(location(&response), Some("/"));
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let backend = MockBackend::start().await;
        let console = Console::logged_in(&backend).await;

        let response = console.post_form("/logout", &[]).await;

        assert_eq!(location(&response), Some("/login"));
        assert!(!console.state.auth().read().await.is_authenticated());
        let storage = console.state.auth().read().await.storage();
        assert_eq!(storage.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_logout_is_reported_and_keeps_the_session() {
        let backend = MockBackend::start().await;
        backend.behaviour().await.logout_status = StatusCode::INTERNAL_SERVER_ERROR;
        let console = Console::logged_in(&backend).await;

        let response = console.post_form("/logout", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.text().await.unwrap().contains("Logout failed"));
        assert!(console.state.auth().read().await.is_authenticated());
    }

    #[tokio::test]
    async fn session_that_cannot_be_cleared_is_an_error() {
        let backend = MockBackend::start().await;
        let console = Console::with_storage(&backend, Arc::new(BrokenSessionStore)).await;
        console
            .state
            .auth()
            .write()
            .await
            .login(MockBackend::SESSION_COOKIE.to_string().into())
            .await
            .unwrap();

        let response = console.post_form("/logout", &[]).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(location(&response).is_none());
        assert!(response.text().await.unwrap().contains("Unable to remove session file"));
        assert!(!console.state.auth().read().await.is_authenticated());
    }
}
