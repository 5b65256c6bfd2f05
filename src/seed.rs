//! Demo data inserted into an empty store.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::models::{
    AcademicBackground, Appointment, AppointmentStatus, AppointmentType, CompanyData,
    JourneyStatus, MatchStatus, Message, Resource, ResourceCategory, Role, UserData,
};
use crate::profile::{new_student, refresh_completion};
use crate::store::Store;
use crate::Error;

pub const DEMO_PASSWORD: &str = "demo123";

/// Seeds the store unless it already has users. Returns whether it did.
pub async fn seed_if_empty(store: &dyn Store, hash_rounds: u32) -> Result<bool, Error> {
    if store.count_users().await? > 0 {
        log::info!("Store already seeded, skipping");
        return Ok(false);
    }
    log::info!("No users found, seeding demo data...");
    let password_hash = hash_password(DEMO_PASSWORD, hash_rounds)?;

    let companies = vec![
        company(
            "TechCorp",
            "Technology",
            "Paris, France",
            92,
            "Leading tech company specializing in web applications",
            &["React", "TypeScript", "3+ years experience"],
        ),
        company(
            "InnovateLab",
            "Software",
            "Lyon, France",
            85,
            "Innovative software solutions for businesses",
            &["JavaScript", "Node.js", "Team collaboration"],
        ),
        company(
            "DataFlow",
            "Data Analytics",
            "Marseille, France",
            78,
            "Data analytics and business intelligence",
            &["Python", "SQL", "Data visualization"],
        ),
    ];
    for c in &companies {
        store.insert_company(c).await?;
    }

    let mut students = Vec::new();
    for (email, first, last) in [
        ("student@boarding.com", "Demo", "Student"),
        ("o.zouglah03@gmail.com", "Omar", "Zouglah"),
    ] {
        let account = user(email, first, last, &password_hash, None);
        store.insert_user(&account).await?;

        let mut student = new_student(&account);
        student.academic_background = AcademicBackground {
            degree: "Bachelor".into(),
            field: "Computer Science".into(),
            university: "University Example".into(),
            graduation_year: Some(2024),
        };
        student.skills = vec!["React".into(), "TypeScript".into(), "Node.js".into()];
        student.interests = vec!["Web Development".into(), "AI".into()];
        student.journey_status = JourneyStatus::Matching;
        refresh_completion(&mut student);
        store.insert_student(&student).await?;
        students.push(student);
    }

    for (c, email) in companies
        .iter()
        .zip(["company@techcorp.com", "company@innovatelab.com"])
    {
        let admin = user(email, &c.name, "Admin", &password_hash, Some(c.id));
        store.insert_user(&admin).await?;
    }

    for (i, student) in students.iter().enumerate() {
        for (j, c) in companies.iter().enumerate() {
            let status = if i == 0 && j == 0 {
                MatchStatus::Matched
            } else {
                MatchStatus::Pending
            };
            store.upsert_match(student.id, c.id, status).await?;
        }
    }

    let demo = &students[0];
    store
        .insert_appointment(&Appointment {
            id: Uuid::new_v4(),
            student_id: demo.id,
            advisor_name: "Sarah Johnson".into(),
            advisor_email: "sarah.johnson@boarding.com".into(),
            date: Utc::now() + Duration::days(2),
            duration: 30,
            kind: AppointmentType::Consultation,
            status: AppointmentStatus::Scheduled,
            notes: None,
        })
        .await?;

    store
        .insert_message(&Message {
            id: Uuid::new_v4(),
            sender_id: "advisor-1".into(),
            sender_name: "Sarah Johnson".into(),
            recipient_id: demo.id.to_string(),
            recipient_name: demo.full_name(),
            content: format!(
                "Hello! I noticed your profile is {}% complete. Would you like to schedule a call to discuss your career goals?",
                demo.profile_completion
            ),
            read: true,
            created_at: Utc::now(),
        })
        .await?;

    for (title, category, description, content) in [
        (
            "Finding Housing in France",
            ResourceCategory::Housing,
            "Complete guide to finding student accommodation",
            "Guide content here...",
        ),
        (
            "French Language Basics",
            ResourceCategory::Language,
            "Essential French phrases for daily life",
            "Language content here...",
        ),
    ] {
        store
            .insert_resource(&Resource {
                id: Uuid::new_v4(),
                title: title.into(),
                category,
                description: description.into(),
                content: content.into(),
                link: None,
                updated_at: Utc::now(),
            })
            .await?;
    }

    log::info!("Seed completed: users, students, companies, matches, appointments, messages, resources");
    Ok(true)
}

fn company(
    name: &str,
    industry: &str,
    location: &str,
    match_score: i32,
    description: &str,
    requirements: &[&str],
) -> CompanyData {
    CompanyData {
        id: Uuid::new_v4(),
        name: name.into(),
        industry: industry.into(),
        location: location.into(),
        logo: None,
        match_score,
        description: description.into(),
        requirements: requirements.iter().map(|r| r.to_string()).collect(),
    }
}

fn user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
    company_id: Option<Uuid>,
) -> UserData {
    UserData {
        id: Uuid::new_v4(),
        email: email.into(),
        password_hash: password_hash.into(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        role: if company_id.is_some() {
            Role::Company
        } else {
            Role::Student
        },
        company_id,
        created_at: Utc::now(),
    }
}
