use crate::{
    data::student::{Role, StudentForm, StudentRecord},
    error::BouncerError,
    maud_conveniences::{
        checkbox, error_alert, file_input, form_submit_button, render_table, simple_form_element,
        subtitle, success_alert, title,
    },
    routes::View,
    state::{BouncerState, Guarded},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use secrecy::SecretString;
use serde::Deserialize;

/// The one overlay form open above the student table, together with whatever the user had
/// typed into it.
#[derive(Debug, Clone, Default)]
pub enum Overlay {
    #[default]
    None,
    AddSingle(StudentForm),
    BulkUpload,
    BulkDecrypt,
    SingleDecrypt {
        student_id: String,
    },
    /// `form` is `None` until the user has submitted once, then the form starts from the record.
    Edit {
        id: i64,
        form: Option<StudentForm>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    AddSingle,
    BulkUpload,
    BulkDecrypt,
    SingleDecrypt,
    Edit,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    overlay: Option<OverlayKind>,
    id: Option<i64>,
}

impl DashboardQuery {
    fn into_overlay(self) -> Overlay {
        match (self.overlay, self.id) {
            (None, _) => Overlay::None,
            (Some(OverlayKind::AddSingle), _) => Overlay::AddSingle(StudentForm::default()),
            (Some(OverlayKind::BulkUpload), _) => Overlay::BulkUpload,
            (Some(OverlayKind::BulkDecrypt), _) => Overlay::BulkDecrypt,
            (Some(OverlayKind::SingleDecrypt), _) => Overlay::SingleDecrypt {
                student_id: String::new(),
            },
            (Some(OverlayKind::Edit), Some(id)) => Overlay::Edit { id, form: None },
            (Some(OverlayKind::Edit), None) => Overlay::None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Notice {
    Success(String),
    Error(String),
    /// What a decrypt call came back with.
    Decrypted(String),
}

pub async fn get_dashboard(
    State(state): State<BouncerState>,
    Guarded(token): Guarded,
    Query(query): Query<DashboardQuery>,
) -> Response {
    show_dashboard(&state, &token, query.into_overlay(), None).await
}

/// Fetches the student list afresh and renders the dashboard around it.
pub async fn show_dashboard(
    state: &BouncerState,
    token: &SecretString,
    mut overlay: Overlay,
    mut notice: Option<Notice>,
) -> Response {
    let students = match state.client().list_students(token).await {
        Ok(students) => students,
        Err(e) => {
            if state.fail_closed(&e).await {
                return Redirect::to(View::Login.path()).into_response();
            }
            warn!(?e, "unable to fetch students");
            notice = Some(Notice::Error(format!("Unable to load students: {e}")));
            vec![]
        }
    };

    if let Overlay::Edit { id, form: None } = overlay {
        match students.iter().find(|s| s.id == id) {
            Some(record) => {
                overlay = Overlay::Edit {
                    id,
                    form: Some(StudentForm::from_record(record)),
                };
            }
            None => {
                if notice.is_none() {
                    notice = Some(Notice::Error(format!("No student with ID {id}")));
                }
                overlay = Overlay::None;
            }
        }
    }

    state
        .render(
            true,
            html! {
                div class="mx-auto bg-gray-800 p-8 rounded shadow-md max-w-5xl w-full flex flex-col space-y-4" {
                    div class="flex flex-row items-center justify-between" {
                        (title("Students"))
                        (render_actions())
                    }
                    @if let Some(notice) = &notice {
                        (render_notice(notice))
                    }
                    (render_overlay(&overlay))
                    (render_students(&students))
                }
            },
        )
        .into_response()
}

/// After a failed action: dead sessions go to login, anything else is shown inline with the
/// overlay still open, under the error's status code.
pub async fn show_failure(
    state: &BouncerState,
    token: &SecretString,
    error: BouncerError,
    overlay: Overlay,
) -> Response {
    if state.fail_closed(&error).await {
        return Redirect::to(View::Login.path()).into_response();
    }

    let status = error.status_code();
    let mut response =
        show_dashboard(state, token, overlay, Some(Notice::Error(error.to_string()))).await;
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

fn render_actions() -> Markup {
    const BUTTON: &str = "bg-blue-600 hover:bg-blue-800 font-bold py-2 px-4 rounded";

    html! {
        div class="flex flex-row space-x-2" {
            a href="/?overlay=add_single" class=(BUTTON) {"Add Student"}
            a href="/?overlay=bulk_upload" class=(BUTTON) {"Bulk Upload"}
            a href="/?overlay=bulk_decrypt" class=(BUTTON) {"Bulk Decrypt"}
            a href="/?overlay=single_decrypt" class=(BUTTON) {"Single Decrypt"}
        }
    }
}

fn render_notice(notice: &Notice) -> Markup {
    match notice {
        Notice::Success(message) => success_alert(message),
        Notice::Error(message) => error_alert(message),
        Notice::Decrypted(result) => html! {
            div class="bg-gray-700 rounded p-4" {
                (subtitle("Decrypted"))
                pre id="decrypt_result" class="whitespace-pre-wrap text-gray-200" {(result)}
            }
        },
    }
}

pub fn render_students(students: &[StudentRecord]) -> Markup {
    if students.is_empty() {
        return html! {
            p class="italic text-gray-400" {"No students yet."}
        };
    }

    render_table(
        ["Name", "Graduation Year", "Roles", ""],
        students
            .iter()
            .map(|student| {
                [
                    html! {(student.name)},
                    html! {(student.graduation_year_display())},
                    html! {(student.roles_display())},
                    render_row_actions(student),
                ]
            })
            .collect(),
    )
}

fn render_row_actions(student: &StudentRecord) -> Markup {
    html! {
        div class="flex flex-row space-x-2" {
            a href={"/?overlay=edit&id=" (student.id)} class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded" {"Edit"}
            form method="post" action={"/students/" (student.id) "/delete"} {
                button type="submit" class="bg-red-600 hover:bg-red-800 font-bold py-1 px-3 rounded" {"Delete"}
            }
        }
    }
}

fn render_overlay(overlay: &Overlay) -> Markup {
    let body = match overlay {
        Overlay::None => return html! {},
        Overlay::AddSingle(form) => html! {
            (subtitle("Add Student"))
            form method="post" action="/students" {
                (student_fields(form))
                (form_submit_button(Some("Add Student")))
            }
        },
        Overlay::Edit { id, form } => {
            let form = form.clone().unwrap_or_default();
            html! {
                (subtitle(html! {"Edit " (form.name)}))
                form method="post" action={"/students/" (id)} {
                    (student_fields(&form))
                    (form_submit_button(Some("Save")))
                }
            }
        }
        Overlay::BulkUpload => html! {
            (subtitle("Bulk Upload"))
            p class="text-gray-400 mb-4" {"CSV with one student per row; the server does the parsing."}
            form method="post" action="/students/upload" enctype="multipart/form-data" {
                (file_input("csv", "Students CSV"))
                (form_submit_button(Some("Upload")))
            }
        },
        Overlay::BulkDecrypt => html! {
            (subtitle("Bulk Decrypt"))
            p class="text-gray-400 mb-4" {"CSV of student ID and key pairs."}
            form method="post" action="/decrypt/bulk" enctype="multipart/form-data" {
                (file_input("csv", "IDs and Keys CSV"))
                (form_submit_button(Some("Decrypt")))
            }
        },
        Overlay::SingleDecrypt { student_id } => html! {
            (subtitle("Single Decrypt"))
            form method="post" action="/decrypt/single" {
                (simple_form_element("student_id", "Student ID", true, None, Some(student_id)))
                (simple_form_element("encryption_code", "Encryption Key", true, Some("password"), None))
                (form_submit_button(Some("Decrypt")))
            }
        },
    };

    html! {
        div id="overlay" class="bg-gray-700 rounded shadow-xl p-4" {
            (body)
            a href=(View::Dashboard.path()) class="text-gray-300 underline" {"Cancel"}
        }
    }
}

fn student_fields(form: &StudentForm) -> Markup {
    html! {
        (simple_form_element("name", "Name", true, None, Some(&form.name)))
        (simple_form_element("graduation_year", "Graduation Year (blank for pre-core or professors)", false, None, Some(&form.graduation_year)))
        div class="mb-4" {
            span class="block text-sm font-bold mb-2 text-gray-300" {"Roles"}
            @for role in Role::ALL {
                (checkbox(role.form_field(), role.display_name(), form.has_role(role)))
            }
        }
    }
}
