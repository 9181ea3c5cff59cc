use crate::{
    maud_conveniences::title,
    routes::{
        dashboard::get_dashboard,
        decrypt::{post_bulk_decrypt, post_single_decrypt},
        login::{get_login, post_login, post_logout},
        manage_user::{get_manage_user, post_change_password},
        same_origin::reject_cross_site,
        students::{post_add_student, post_delete_student, post_edit_student, post_upload_students},
    },
    state::BouncerState,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    middleware,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{MethodRouter, get, post},
};
use maud::html;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod dashboard;
pub mod decrypt;
pub mod login;
pub mod manage_user;
pub mod same_origin;
pub mod students;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    ManageUser,
    Login,
}

/// Every path a browser can land on, and the view it shows.
pub const VIEW_TABLE: [(&str, View); 5] = [
    ("/", View::Dashboard),
    ("/home", View::Dashboard),
    ("/index.html", View::Dashboard),
    ("/manage-user", View::ManageUser),
    ("/login", View::Login),
];

impl View {
    pub fn resolve(path: &str) -> Option<Self> {
        VIEW_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, view)| *view)
    }

    /// Where links and redirects to this view point.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::ManageUser => "/manage-user",
            Self::Login => "/login",
        }
    }

    fn method_router(self) -> MethodRouter<BouncerState> {
        match self {
            Self::Dashboard => get(get_dashboard),
            Self::ManageUser => get(get_manage_user),
            Self::Login => get(get_login).post(post_login),
        }
    }
}

pub fn router(state: BouncerState) -> Router {
    let views = VIEW_TABLE
        .into_iter()
        .fold(Router::new(), |router, (path, view)| {
            router.route(path, view.method_router())
        });

    views
        .route("/logout", post(post_logout))
        .route("/students", post(post_add_student))
        .route("/students/upload", post(post_upload_students))
        .route("/students/{id}", post(post_edit_student))
        .route("/students/{id}/delete", post(post_delete_student))
        .route("/decrypt/bulk", post(post_bulk_decrypt))
        .route("/decrypt/single", post(post_single_decrypt))
        .route("/manage-user/password", post(post_change_password))
        .fallback(not_found)
        .layer(middleware::from_fn(reject_cross_site))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(State(state): State<BouncerState>, uri: Uri) -> impl IntoResponse {
    let logged_in = state.auth().read().await.is_authenticated();
    // paths only match exactly, but `/home/` is close enough to point at
    let near_miss = View::resolve(uri.path().trim_end_matches('/')).map(View::path);
    debug!(path = %uri.path(), ?near_miss, "no view for path");

    (
        StatusCode::NOT_FOUND,
        state.render(
            logged_in,
            html! {
                div class="bg-gray-800 p-8 rounded shadow-md max-w-md w-full text-center" {
                    (title("Not Found"))
                    @if let Some(path) = near_miss {
                        p class="mb-4" { "Did you mean " a href=(path) class="underline" {(path)} "?" }
                    }
                    a href=(View::Dashboard.path()) class="underline" {"Back to the students"}
                }
            },
        ),
    )
}
