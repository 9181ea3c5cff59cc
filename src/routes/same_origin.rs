//! The console acts with one process-wide backend session, so any page the admin has open
//! could otherwise post a form here and have it relayed. Browsers label where a request came
//! from; anything that changes state must come from the console's own pages.

use crate::maud_conveniences::error_alert;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};

const SEC_FETCH_SITE: &str = "sec-fetch-site";

pub async fn reject_cross_site(request: Request, next: Next) -> Response {
    let safe = matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if !safe && !is_same_origin(request.headers()) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            origin = ?request.headers().get(header::ORIGIN),
            "refusing cross-site request"
        );
        return (
            StatusCode::FORBIDDEN,
            Html(error_alert("Cross-site request refused").into_string()),
        )
            .into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

/// Requests with neither header come from non-browser clients, which can't be driven by
/// another site.
fn is_same_origin(headers: &HeaderMap) -> bool {
    let site_ok = headers
        .get(SEC_FETCH_SITE)
        .is_none_or(|site| matches!(site.to_str(), Ok("same-origin" | "none")));

    let origin_ok = headers
        .get(header::ORIGIN)
        .is_none_or(|origin| origin_matches_host(origin, headers.get(header::HOST)));

    site_ok && origin_ok
}

fn origin_matches_host(origin: &HeaderValue, host: Option<&HeaderValue>) -> bool {
    let Some(host) = host.and_then(|h| h.to_str().ok()) else {
        return false;
    };

    origin
        .to_str()
        .ok()
        .and_then(|origin| origin.split_once("://"))
        .is_some_and(|(_, authority)| authority.eq_ignore_ascii_case(host))
}
