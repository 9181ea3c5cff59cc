use crate::{
    error::MissingDecryptInputSnafu,
    routes::{
        dashboard::{Notice, Overlay, show_dashboard, show_failure},
        students::read_csv_upload,
    },
    state::{BouncerState, Guarded},
};
use axum::{
    Form,
    extract::{Multipart, State},
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub async fn post_bulk_decrypt(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    multipart: Multipart,
) -> Response {
    let result = match read_csv_upload(multipart).await {
        Ok(upload) => state.client().bulk_decrypt(&token, upload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(decrypted) => {
            info!("bulk decrypt done");
            let notice = Notice::Decrypted(decrypted.trim().to_string());
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        Err(e) => show_failure(&state, &token, e, Overlay::BulkDecrypt).await,
    }
}

#[derive(Deserialize)]
pub struct SingleDecryptForm {
    student_id: String,
    encryption_code: SecretString,
}

pub async fn post_single_decrypt(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Form(SingleDecryptForm {
        student_id,
        encryption_code,
    }): Form<SingleDecryptForm>,
) -> Response {
    let student_id = student_id.trim().to_string();
    let result = if student_id.is_empty() || encryption_code.expose_secret().trim().is_empty() {
        MissingDecryptInputSnafu.fail()
    } else {
        state
            .client()
            .single_decrypt(&token, &student_id, &encryption_code)
            .await
    };

    match result {
        Ok(decrypted) => {
            info!(?student_id, "single decrypt done");
            let notice = Notice::Decrypted(decrypted.trim().to_string());
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        // the key is never echoed back into the page
        Err(e) => show_failure(&state, &token, e, Overlay::SingleDecrypt { student_id }).await,
    }
}
