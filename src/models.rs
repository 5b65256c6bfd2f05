use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Company,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "journey_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JourneyStatus {
    #[default]
    Profile,
    Matching,
    Internship,
    Integration,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Matched,
    Rejected,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Support,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Housing,
    Language,
    Integration,
    Community,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Housing => "housing",
            ResourceCategory::Language => "language",
            ResourceCategory::Integration => "integration",
            ResourceCategory::Community => "community",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserData {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AcademicBackground {
    pub degree: String,
    pub field: String,
    pub university: String,
    pub graduation_year: Option<i32>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(flatten)]
    pub academic_background: AcademicBackground,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub profile_completion: i32,
    pub cv_url: Option<String>,
    pub journey_status: JourneyStatus,
    pub updated_at: DateTime<Utc>,
}

impl StudentData {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    pub id: Uuid,
    pub name: String,
    pub industry: String,
    pub location: String,
    pub logo: Option<String>,
    pub match_score: i32,
    pub description: String,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMatch {
    pub id: Uuid,
    pub student_id: Uuid,
    pub company_id: Uuid,
    pub match_status: MatchStatus,
    pub updated_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    #[serde(skip)]
    pub student_id: Uuid,
    pub advisor_name: String,
    pub advisor_email: String,
    pub date: DateTime<Utc>,
    pub duration: i32,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub content: String,
    pub read: bool,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub category: ResourceCategory,
    pub description: String,
    pub content: String,
    pub link: Option<String>,
    pub updated_at: DateTime<Utc>,
}
