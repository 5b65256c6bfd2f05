use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::auth::{require_student, Caller};
use crate::io::{read_cv_field, store_cv};
use crate::models::StudentData;
use crate::profile::{refresh_completion, StudentPatch};
use crate::state::AppState;
use crate::{proceeds, Payload};

pub async fn read_profile(State(state): State<AppState>, caller: Caller) -> Payload<StudentData> {
    proceeds(require_student(&state, &caller).await?)
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<StudentPatch>, JsonRejection>,
) -> Payload<StudentData> {
    let Json(patch) = body?;
    let mut student = require_student(&state, &caller).await?;
    patch.apply(&mut student);
    state.store.save_student(&student).await?;
    proceeds(student)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvUploaded {
    pub cv_url: String,
}

pub async fn upload_cv(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Payload<CvUploaded> {
    let mut student = require_student(&state, &caller).await?;
    let upload = read_cv_field(&mut multipart).await?;
    let file_name = store_cv(&state.uploads_dir(), &upload).await?;

    let cv_url = format!("{}/uploads/{}", state.config.api_url, file_name);
    student.cv_url = Some(cv_url.clone());
    refresh_completion(&mut student);
    state.store.save_student(&student).await?;
    log::debug!(
        "Student {} uploaded a CV, completion now {}",
        student.id,
        student.profile_completion
    );
    proceeds(CvUploaded { cv_url })
}
