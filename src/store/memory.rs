use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{email_taken, Store, StoreResult};
use crate::err::Error;
use crate::models::{
    Appointment, CompanyData, CompanyMatch, MatchStatus, Message, Resource, StudentData, UserData,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserData>,
    students: Vec<StudentData>,
    companies: Vec<CompanyData>,
    matches: HashMap<(Uuid, Uuid), CompanyMatch>,
    appointments: Vec<Appointment>,
    messages: Vec<Message>,
    resources: Vec<Resource>,
}

/// Process-local store. Every operation runs inside one critical section.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| Error::InternalError {
            kind: "LockPoisoned",
            message: "memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserData>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserData>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &UserData) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(email_taken());
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn insert_student(&self, student: &StudentData) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if tables.students.iter().any(|s| s.user_id == student.user_id) {
            return Err(Error::Conflict {
                message: "Student profile already exists for this user".to_string(),
            });
        }
        tables.students.push(student.clone());
        Ok(())
    }

    async fn find_student(&self, id: Uuid) -> StoreResult<Option<StudentData>> {
        Ok(self.lock()?.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_user(&self, user_id: Uuid) -> StoreResult<Option<StudentData>> {
        Ok(self
            .lock()?
            .students
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn save_student(&self, student: &StudentData) -> StoreResult<()> {
        let mut tables = self.lock()?;
        match tables.students.iter_mut().find(|s| s.id == student.id) {
            Some(existing) => {
                *existing = student.clone();
                Ok(())
            }
            None => Err(Error::not_found("Student profile not found")),
        }
    }

    async fn insert_company(&self, company: &CompanyData) -> StoreResult<()> {
        self.lock()?.companies.push(company.clone());
        Ok(())
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyData>> {
        Ok(self.lock()?.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn list_companies(&self) -> StoreResult<Vec<CompanyData>> {
        let mut companies = self.lock()?.companies.clone();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn upsert_match(
        &self,
        student_id: Uuid,
        company_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<CompanyMatch> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let row = tables
            .matches
            .entry((student_id, company_id))
            .and_modify(|m| {
                m.match_status = status;
                m.updated_at = now;
            })
            .or_insert_with(|| CompanyMatch {
                id: Uuid::new_v4(),
                student_id,
                company_id,
                match_status: status,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn update_company_match(
        &self,
        company_id: Uuid,
        match_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<Option<CompanyMatch>> {
        let mut tables = self.lock()?;
        let row = tables
            .matches
            .values_mut()
            .find(|m| m.id == match_id && m.company_id == company_id);
        Ok(row.map(|m| {
            m.match_status = status;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn matches_for_student(&self, student_id: Uuid) -> StoreResult<Vec<CompanyMatch>> {
        Ok(self
            .lock()?
            .matches
            .values()
            .filter(|m| m.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn matches_for_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMatch>> {
        let mut rows: Vec<CompanyMatch> = self
            .lock()?
            .matches
            .values()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        self.lock()?.appointments.push(appointment.clone());
        Ok(())
    }

    async fn appointments_for_student(&self, student_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = self
            .lock()?
            .appointments
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rows)
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.lock()?.messages.push(message.clone());
        Ok(())
    }

    async fn messages_for(&self, participant: &str) -> StoreResult<Vec<Message>> {
        let mut rows: Vec<Message> = self
            .lock()?
            .messages
            .iter()
            .filter(|m| m.sender_id == participant || m.recipient_id == participant)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()> {
        self.lock()?.resources.push(resource.clone());
        Ok(())
    }

    async fn list_resources(&self) -> StoreResult<Vec<Resource>> {
        let mut rows = self.lock()?.resources.clone();
        rows.sort_by(|a, b| {
            a.category
                .as_str()
                .cmp(b.category.as_str())
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(rows)
    }
}
