use crate::{
    error::BouncerError,
    maud_conveniences::{
        error_alert, errors_list, form_submit_button, simple_form_element, subtitle,
        success_alert, title,
    },
    routes::View,
    state::{BouncerState, Guarded},
};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bitflags::bitflags;
use maud::{Markup, html};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// The shortest password the bouncer server accepts, in bytes (it checks `len`, not runes).
pub const MIN_PASSWORD_LEN: usize = 8;

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct PasswordValidationError: u8 {
        const EMPTY_CURRENT =   0b0000_0001;
        const TOO_SHORT =       0b0000_0010;
        const DIDNT_MATCH =     0b0000_0100;
        const SAME_AS_CURRENT = 0b0000_1000;
    }
}

impl PasswordValidationError {
    pub fn as_nice_list(&self) -> impl Iterator<Item = &'static str> {
        self.iter().filter_map(|e| match e {
            Self::EMPTY_CURRENT => Some("Current password was empty"),
            Self::TOO_SHORT => Some("New password must be at least 8 characters"),
            Self::DIDNT_MATCH => Some("Provided passwords didn't match"),
            Self::SAME_AS_CURRENT => Some("New password was same as the current one"),
            _ => None,
        })
    }

    pub fn check(current: &str, new: &str, confirmed: &str) -> Self {
        let mut errors = Self::empty();
        if current.is_empty() {
            errors |= Self::EMPTY_CURRENT;
        }
        if new.len() < MIN_PASSWORD_LEN {
            errors |= Self::TOO_SHORT;
        }
        if new != confirmed {
            errors |= Self::DIDNT_MATCH;
        }
        if !current.is_empty() && new == current {
            errors |= Self::SAME_AS_CURRENT;
        }
        errors
    }
}

enum Outcome {
    Changed,
    Invalid(PasswordValidationError),
    Failed(String),
}

pub async fn get_manage_user(State(state): State<BouncerState>, _: Guarded) -> Markup {
    render_manage_user(&state, None)
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    current_password: SecretString,
    new_password: SecretString,
    confirmed_password: SecretString,
}

pub async fn post_change_password(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Form(ChangePasswordForm {
        current_password,
        new_password,
        confirmed_password,
    }): Form<ChangePasswordForm>,
) -> Response {
    let errors = PasswordValidationError::check(
        current_password.expose_secret(),
        new_password.expose_secret(),
        confirmed_password.expose_secret(),
    );
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            render_manage_user(&state, Some(Outcome::Invalid(errors))),
        )
            .into_response();
    }

    let e = match state
        .client()
        .change_password(&token, &current_password, &new_password)
        .await
    {
        Ok(()) => {
            info!("changed admin password");
            return render_manage_user(&state, Some(Outcome::Changed)).into_response();
        }
        Err(e) => e,
    };

    if state.fail_closed(&e).await {
        return Redirect::to(View::Login.path()).into_response();
    }

    let status = e.status_code();
    let message = match e {
        BouncerError::InvalidCredentials => "Current password is incorrect".to_string(),
        BouncerError::UnexpectedStatus { status, body, .. }
            if status == StatusCode::BAD_REQUEST && !body.is_empty() =>
        {
            body
        }
        other => other.to_string(),
    };

    (status, render_manage_user(&state, Some(Outcome::Failed(message)))).into_response()
}

fn render_manage_user(state: &BouncerState, outcome: Option<Outcome>) -> Markup {
    state.render(
        true,
        html! {
            div class="bg-gray-800 shadow-md rounded px-8 pt-6 pb-8 mb-4 w-full max-w-md" {
                (title("Manage User"))
                @match &outcome {
                    Some(Outcome::Changed) => { (success_alert("Password changed")) }
                    Some(Outcome::Invalid(errors)) => { (errors_list(errors.as_nice_list())) }
                    Some(Outcome::Failed(message)) => { (error_alert(message)) }
                    None => {}
                }

                (subtitle("Change Password"))
                form method="post" action="/manage-user/password" {
                    (simple_form_element("current_password", "Current Password", true, Some("password"), None))
                    (simple_form_element("new_password", "New Password", true, Some("password"), None))
                    (simple_form_element("confirmed_password", "Confirm Password", true, Some("password"), None))
                    (form_submit_button(Some("Change Password")))
                }

                form method="post" action="/logout" class="mt-8" {
                    button type="submit" class="bg-red-600 hover:bg-red-800 font-bold py-2 px-4 rounded" {"Logout"}
                }
            }
        },
    )
}
