use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{require_student, Caller};
use crate::models::{Appointment, AppointmentStatus, AppointmentType};
use crate::state::AppState;
use crate::store::Store;
use crate::{proceeds, Error, Payload};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAppointment {
    pub advisor_name: Option<String>,
    pub advisor_email: Option<String>,
    pub date: Option<String>,
    pub duration: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    pub notes: Option<String>,
}

const REQUIRED: &str = "advisorName, advisorEmail, date, duration, type required";

fn required(value: Option<String>) -> Result<String, Error> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation(REQUIRED))
}

/// Accepts RFC 3339, a bare local date-time (taken as UTC) or a date.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub async fn create_appointment(
    store: &dyn Store,
    student_id: Uuid,
    input: NewAppointment,
) -> Result<Appointment, Error> {
    let advisor_name = required(input.advisor_name)?;
    let advisor_email = required(input.advisor_email)?;
    let raw_date = required(input.date)?;
    let duration = input
        .duration
        .filter(|d| *d > 0)
        .ok_or_else(|| Error::validation(REQUIRED))?;
    let kind = input.kind.ok_or_else(|| Error::validation(REQUIRED))?;
    let date = parse_date(&raw_date)
        .ok_or_else(|| Error::validation(format!("Invalid date: {}", raw_date)))?;

    let appointment = Appointment {
        id: Uuid::new_v4(),
        student_id,
        advisor_name,
        advisor_email,
        date,
        duration,
        kind,
        status: AppointmentStatus::Scheduled,
        notes: input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };
    store.insert_appointment(&appointment).await?;
    Ok(appointment)
}

pub async fn list_appointments(
    store: &dyn Store,
    student_id: Uuid,
) -> Result<Vec<Appointment>, Error> {
    store.appointments_for_student(student_id).await
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> Payload<Vec<Appointment>> {
    let student = require_student(&state, &caller).await?;
    proceeds(list_appointments(state.store.as_ref(), student.id).await?)
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<NewAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), Error> {
    let Json(input) = body?;
    let student = require_student(&state, &caller).await?;
    let appointment = create_appointment(state.store.as_ref(), student.id, input).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}
