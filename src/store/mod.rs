//! Record storage.
//!
//! Handlers talk to a [`Store`]; `PgStore` backs it with PostgreSQL and
//! `MemoryStore` keeps everything in process for demo mode and tests. Both
//! enforce email uniqueness and the one-match-per-pair rule themselves.

use async_trait::async_trait;
use uuid::Uuid;

use crate::err::Error;
use crate::models::{
    Appointment, CompanyData, CompanyMatch, MatchStatus, Message, Resource, StudentData, UserData,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, Error>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn count_users(&self) -> StoreResult<i64>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserData>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserData>>;
    /// Fails with `Conflict` when the email is already taken.
    async fn insert_user(&self, user: &UserData) -> StoreResult<()>;

    async fn insert_student(&self, student: &StudentData) -> StoreResult<()>;
    async fn find_student(&self, id: Uuid) -> StoreResult<Option<StudentData>>;
    async fn find_student_by_user(&self, user_id: Uuid) -> StoreResult<Option<StudentData>>;
    async fn save_student(&self, student: &StudentData) -> StoreResult<()>;

    async fn insert_company(&self, company: &CompanyData) -> StoreResult<()>;
    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyData>>;
    /// All companies ordered by name.
    async fn list_companies(&self) -> StoreResult<Vec<CompanyData>>;

    /// Find-or-create the match row for the pair and set its status.
    async fn upsert_match(
        &self,
        student_id: Uuid,
        company_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<CompanyMatch>;
    /// Updates a match only if it belongs to `company_id`.
    async fn update_company_match(
        &self,
        company_id: Uuid,
        match_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<Option<CompanyMatch>>;
    async fn matches_for_student(&self, student_id: Uuid) -> StoreResult<Vec<CompanyMatch>>;
    /// Most recently updated first.
    async fn matches_for_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMatch>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()>;
    /// Ordered by date ascending.
    async fn appointments_for_student(&self, student_id: Uuid) -> StoreResult<Vec<Appointment>>;

    async fn insert_message(&self, message: &Message) -> StoreResult<()>;
    /// Messages sent or received by `participant`, oldest first.
    async fn messages_for(&self, participant: &str) -> StoreResult<Vec<Message>>;

    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()>;
    /// Ordered by category name, then title.
    async fn list_resources(&self) -> StoreResult<Vec<Resource>>;
}

pub(crate) fn email_taken() -> Error {
    Error::Conflict {
        message: "An account with this email already exists".to_string(),
    }
}
