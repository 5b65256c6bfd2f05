//! Student ↔ company matching.
//!
//! A pair without a stored row counts as `pending`. Students change the
//! status of their own pairs by company id; companies change rows that
//! already exist for them by match id.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_company, require_student, Caller};
use crate::models::{CompanyData, CompanyMatch, MatchStatus, StudentData};
use crate::state::AppState;
use crate::store::Store;
use crate::{proceeds, Error, Payload};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyWithStatus {
    #[serde(flatten)]
    pub company: CompanyData,
    pub match_status: MatchStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedStudent {
    pub match_id: Uuid,
    pub match_status: MatchStatus,
    pub updated_at: DateTime<Utc>,
    pub student: StudentData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: MatchStatus,
}

pub async fn set_match_status(
    store: &dyn Store,
    student_id: Uuid,
    company_id: Uuid,
    status: MatchStatus,
) -> Result<CompanyMatch, Error> {
    if store.find_company(company_id).await?.is_none() {
        return Err(Error::not_found("Company not found"));
    }
    let row = store.upsert_match(student_id, company_id, status).await?;
    log::debug!(
        "Match {} (student {}, company {}) set to {:?}",
        row.id,
        student_id,
        company_id,
        status
    );
    Ok(row)
}

pub async fn set_company_match_status(
    store: &dyn Store,
    company_id: Uuid,
    match_id: Uuid,
    status: MatchStatus,
) -> Result<CompanyMatch, Error> {
    store
        .update_company_match(company_id, match_id, status)
        .await?
        .ok_or_else(|| Error::not_found("Match not found"))
}

pub async fn list_matches_for_student(
    store: &dyn Store,
    student_id: Uuid,
) -> Result<Vec<CompanyWithStatus>, Error> {
    let statuses: HashMap<Uuid, MatchStatus> = store
        .matches_for_student(student_id)
        .await?
        .into_iter()
        .map(|m| (m.company_id, m.match_status))
        .collect();
    let companies = store.list_companies().await?;
    Ok(companies
        .into_iter()
        .map(|company| CompanyWithStatus {
            match_status: statuses.get(&company.id).copied().unwrap_or_default(),
            company,
        })
        .collect())
}

pub async fn list_matches_for_company(
    store: &dyn Store,
    company_id: Uuid,
) -> Result<Vec<MatchedStudent>, Error> {
    let rows = store.matches_for_company(company_id).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let student = match store.find_student(row.student_id).await? {
            Some(student) => student,
            None => continue,
        };
        out.push(MatchedStudent {
            match_id: row.id,
            match_status: row.match_status,
            updated_at: row.updated_at,
            student,
        });
    }
    Ok(out)
}

pub async fn student_matches(
    State(state): State<AppState>,
    caller: Caller,
) -> Payload<Vec<CompanyWithStatus>> {
    let student = require_student(&state, &caller).await?;
    proceeds(list_matches_for_student(state.store.as_ref(), student.id).await?)
}

pub async fn student_set_status(
    State(state): State<AppState>,
    caller: Caller,
    company_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<StatusCode, Error> {
    let Path(company_id) = company_id?;
    let Json(change) = body?;
    let student = require_student(&state, &caller).await?;
    set_match_status(state.store.as_ref(), student.id, company_id, change.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn company_matches(
    State(state): State<AppState>,
    caller: Caller,
) -> Payload<Vec<MatchedStudent>> {
    let company_id = require_company(&state, &caller).await?;
    proceeds(list_matches_for_company(state.store.as_ref(), company_id).await?)
}

pub async fn company_set_status(
    State(state): State<AppState>,
    caller: Caller,
    match_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<StatusCode, Error> {
    let company_id = require_company(&state, &caller).await?;
    let Path(match_id) = match_id?;
    let Json(change) = body?;
    set_company_match_status(state.store.as_ref(), company_id, match_id, change.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
