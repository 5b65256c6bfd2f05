//! Profile completion scoring and partial profile updates.
//!
//! Completion is a presence-only score over seven weighted rules. It is
//! recomputed on every write to a student record and never on read.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{AcademicBackground, JourneyStatus, StudentData, UserData};

const NAME_WEIGHT: u8 = 10;
const EMAIL_WEIGHT: u8 = 10;
const DEGREE_AND_FIELD_WEIGHT: u8 = 20;
const UNIVERSITY_WEIGHT: u8 = 10;
const SKILLS_WEIGHT: u8 = 15;
const INTERESTS_WEIGHT: u8 = 10;
const CV_WEIGHT: u8 = 25;

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn profile_completion(student: &StudentData) -> u8 {
    let academic = &student.academic_background;
    let mut completion: u8 = 0;
    if filled(&student.first_name) && filled(&student.last_name) {
        completion += NAME_WEIGHT;
    }
    if filled(&student.email) {
        completion += EMAIL_WEIGHT;
    }
    if filled(&academic.degree) && filled(&academic.field) {
        completion += DEGREE_AND_FIELD_WEIGHT;
    }
    if filled(&academic.university) {
        completion += UNIVERSITY_WEIGHT;
    }
    if !student.skills.is_empty() {
        completion += SKILLS_WEIGHT;
    }
    if !student.interests.is_empty() {
        completion += INTERESTS_WEIGHT;
    }
    if student.cv_url.as_deref().map(filled).unwrap_or(false) {
        completion += CV_WEIGHT;
    }
    completion.min(100)
}

/// Stores the freshly computed completion on the record.
pub fn refresh_completion(student: &mut StudentData) {
    student.profile_completion = profile_completion(student) as i32;
    student.updated_at = Utc::now();
}

/// Trims entries, drops blanks and keeps the first occurrence of duplicates.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|seen| seen == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Fresh student record created next to a newly registered user.
pub fn new_student(user: &UserData) -> StudentData {
    let mut student = StudentData {
        id: Uuid::new_v4(),
        user_id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        phone: None,
        avatar_url: None,
        academic_background: AcademicBackground::default(),
        skills: Vec::new(),
        interests: Vec::new(),
        profile_completion: 0,
        cv_url: None,
        journey_status: JourneyStatus::Profile,
        updated_at: Utc::now(),
    };
    refresh_completion(&mut student);
    student
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicPatch {
    pub degree: Option<String>,
    pub field: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
}

/// Body of `PATCH /api/students/me`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub academic_background: Option<AcademicPatch>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub cv_url: Option<String>,
    pub journey_status: Option<JourneyStatus>,
}

impl StudentPatch {
    pub fn apply(self, student: &mut StudentData) {
        if let Some(first_name) = self.first_name {
            student.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = self.last_name {
            student.last_name = last_name.trim().to_string();
        }
        if let Some(email) = self.email {
            student.email = email.trim().to_string();
        }
        if let Some(phone) = self.phone {
            student.phone = non_blank(phone);
        }
        if let Some(avatar_url) = self.avatar_url {
            student.avatar_url = non_blank(avatar_url);
        }
        if let Some(academic) = self.academic_background {
            let current = &mut student.academic_background;
            if let Some(degree) = academic.degree {
                current.degree = degree.trim().to_string();
            }
            if let Some(field) = academic.field {
                current.field = field.trim().to_string();
            }
            if let Some(university) = academic.university {
                current.university = university.trim().to_string();
            }
            if academic.graduation_year.is_some() {
                current.graduation_year = academic.graduation_year;
            }
        }
        if let Some(skills) = self.skills {
            student.skills = normalize_tags(skills);
        }
        if let Some(interests) = self.interests {
            student.interests = normalize_tags(interests);
        }
        if let Some(cv_url) = self.cv_url {
            student.cv_url = non_blank(cv_url);
        }
        if let Some(journey_status) = self.journey_status {
            student.journey_status = journey_status;
        }
        refresh_completion(student);
    }
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
