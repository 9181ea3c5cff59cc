use crate::{
    api::CsvUpload,
    data::student::StudentForm,
    error::{BouncerResult, EmptyUploadSnafu, MissingUploadSnafu, MultipartSnafu, NotCsvSnafu},
    routes::dashboard::{Notice, Overlay, show_dashboard, show_failure},
    state::{BouncerState, Guarded},
};
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::Response,
};
use snafu::ResultExt;

pub async fn post_add_student(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Form(form): Form<StudentForm>,
) -> Response {
    let result = match form.to_new_student() {
        Ok(student) => state
            .client()
            .add_student(&token, &student)
            .await
            .map(|()| student.name),
        Err(e) => Err(e),
    };

    match result {
        Ok(name) => {
            info!(?name, "added student");
            let notice = Notice::Success(format!("Added {name}"));
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        Err(e) => show_failure(&state, &token, e, Overlay::AddSingle(form)).await,
    }
}

pub async fn post_edit_student(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Path(id): Path<i64>,
    Form(form): Form<StudentForm>,
) -> Response {
    let result = match form.to_new_student() {
        Ok(student) => state.client().update_student(&token, id, &student).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!(?id, "updated student");
            let notice = Notice::Success(format!("Saved {}", form.name.trim()));
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        Err(e) => {
            let overlay = Overlay::Edit {
                id,
                form: Some(form),
            };
            show_failure(&state, &token, e, overlay).await
        }
    }
}

pub async fn post_delete_student(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Path(id): Path<i64>,
) -> Response {
    match state.client().delete_student(&token, id).await {
        Ok(()) => {
            info!(?id, "deleted student");
            let notice = Notice::Success(format!("Deleted student {id}"));
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        Err(e) => show_failure(&state, &token, e, Overlay::None).await,
    }
}

pub async fn post_upload_students(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    multipart: Multipart,
) -> Response {
    let result = match read_csv_upload(multipart).await {
        Ok(upload) => state.client().upload_students(&token, upload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("uploaded students CSV");
            let notice = Notice::Success("Uploaded students".to_string());
            show_dashboard(&state, &token, Overlay::None, Some(notice)).await
        }
        Err(e) => show_failure(&state, &token, e, Overlay::BulkUpload).await,
    }
}

/// Pulls the `csv` field out of an upload form. Empty files and anything recognisably binary
/// are turned away here rather than sent on.
pub async fn read_csv_upload(mut multipart: Multipart) -> BouncerResult<CsvUpload> {
    const FIELD: &str = "csv";

    while let Some(field) = multipart.next_field().await.context(MultipartSnafu)? {
        if field.name() != Some(FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field.bytes().await.context(MultipartSnafu)?;

        snafu::ensure!(!bytes.is_empty(), EmptyUploadSnafu);
        if let Some(kind) = infer::get(&bytes) {
            return NotCsvSnafu {
                mime: kind.mime_type(),
            }
            .fail();
        }

        return Ok(CsvUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    MissingUploadSnafu { field: FIELD }.fail()
}
