use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{email_taken, Store, StoreResult};
use crate::err::Error;
use crate::models::{
    Appointment, CompanyData, CompanyMatch, MatchStatus, Message, Resource, StudentData, UserData,
};

pub struct PgStore {
    pg: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pg = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(Error::from)?;
        sqlx::migrate!("./migrations").run(&pg).await?;
        log::info!("Connected to PostgreSQL, migrations applied");
        Ok(Self { pg })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn count_users(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pg)
            .await?;
        Ok(count)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserData>> {
        let user = sqlx::query_as::<_, UserData>("SELECT * FROM users WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserData>> {
        let user = sqlx::query_as::<_, UserData>(
            "SELECT * FROM users WHERE email = lower($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pg)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &UserData) -> StoreResult<()> {
        let res = sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, company_id, created_at) \
             VALUES ($1, lower($2), $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.company_id)
        .bind(user.created_at)
        .execute(&self.pg)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict { .. } => email_taken(),
            other => other,
        })?;

        if res.rows_affected() < 1 {
            return Err(Error::InternalError {
                kind: "DatabaseError",
                message: "Could not save user to database!".to_string(),
            });
        }
        Ok(())
    }

    async fn insert_student(&self, student: &StudentData) -> StoreResult<()> {
        let academic = &student.academic_background;
        sqlx::query(
            "INSERT INTO students (id, user_id, first_name, last_name, email, phone, avatar_url, \
             degree, field, university, graduation_year, skills, interests, profile_completion, \
             cv_url, journey_status, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(student.id)
        .bind(student.user_id)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.avatar_url)
        .bind(&academic.degree)
        .bind(&academic.field)
        .bind(&academic.university)
        .bind(academic.graduation_year)
        .bind(&student.skills)
        .bind(&student.interests)
        .bind(student.profile_completion)
        .bind(&student.cv_url)
        .bind(student.journey_status)
        .bind(student.updated_at)
        .execute(&self.pg)
        .await?;
        Ok(())
    }

    async fn find_student(&self, id: Uuid) -> StoreResult<Option<StudentData>> {
        let student =
            sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE id = $1 LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(student)
    }

    async fn find_student_by_user(&self, user_id: Uuid) -> StoreResult<Option<StudentData>> {
        let student =
            sqlx::query_as::<_, StudentData>("SELECT * FROM students WHERE user_id = $1 LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(student)
    }

    async fn save_student(&self, student: &StudentData) -> StoreResult<()> {
        let academic = &student.academic_background;
        let res = sqlx::query(
            "UPDATE students SET first_name = $2, last_name = $3, email = $4, phone = $5, \
             avatar_url = $6, degree = $7, field = $8, university = $9, graduation_year = $10, \
             skills = $11, interests = $12, profile_completion = $13, cv_url = $14, \
             journey_status = $15, updated_at = $16 WHERE id = $1",
        )
        .bind(student.id)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.avatar_url)
        .bind(&academic.degree)
        .bind(&academic.field)
        .bind(&academic.university)
        .bind(academic.graduation_year)
        .bind(&student.skills)
        .bind(&student.interests)
        .bind(student.profile_completion)
        .bind(&student.cv_url)
        .bind(student.journey_status)
        .bind(student.updated_at)
        .execute(&self.pg)
        .await?;

        if res.rows_affected() < 1 {
            return Err(Error::not_found("Student profile not found"));
        }
        Ok(())
    }

    async fn insert_company(&self, company: &CompanyData) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO companies (id, name, industry, location, logo, match_score, description, requirements) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.industry)
        .bind(&company.location)
        .bind(&company.logo)
        .bind(company.match_score)
        .bind(&company.description)
        .bind(&company.requirements)
        .execute(&self.pg)
        .await?;
        Ok(())
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<CompanyData>> {
        let company =
            sqlx::query_as::<_, CompanyData>("SELECT * FROM companies WHERE id = $1 LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(company)
    }

    async fn list_companies(&self) -> StoreResult<Vec<CompanyData>> {
        let companies = sqlx::query_as::<_, CompanyData>("SELECT * FROM companies ORDER BY name")
            .fetch_all(&self.pg)
            .await?;
        Ok(companies)
    }

    async fn upsert_match(
        &self,
        student_id: Uuid,
        company_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<CompanyMatch> {
        let row = sqlx::query_as::<_, CompanyMatch>(
            "INSERT INTO company_matches (id, student_id, company_id, match_status, updated_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (student_id, company_id) \
             DO UPDATE SET match_status = EXCLUDED.match_status, updated_at = now() \
             RETURNING id, student_id, company_id, match_status, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(company_id)
        .bind(status)
        .fetch_one(&self.pg)
        .await?;
        Ok(row)
    }

    async fn update_company_match(
        &self,
        company_id: Uuid,
        match_id: Uuid,
        status: MatchStatus,
    ) -> StoreResult<Option<CompanyMatch>> {
        let row = sqlx::query_as::<_, CompanyMatch>(
            "UPDATE company_matches SET match_status = $3, updated_at = now() \
             WHERE id = $1 AND company_id = $2 \
             RETURNING id, student_id, company_id, match_status, updated_at",
        )
        .bind(match_id)
        .bind(company_id)
        .bind(status)
        .fetch_optional(&self.pg)
        .await?;
        Ok(row)
    }

    async fn matches_for_student(&self, student_id: Uuid) -> StoreResult<Vec<CompanyMatch>> {
        let rows = sqlx::query_as::<_, CompanyMatch>(
            "SELECT * FROM company_matches WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }

    async fn matches_for_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMatch>> {
        let rows = sqlx::query_as::<_, CompanyMatch>(
            "SELECT * FROM company_matches WHERE company_id = $1 ORDER BY updated_at DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO appointments (id, student_id, advisor_name, advisor_email, date, duration, kind, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(appointment.id)
        .bind(appointment.student_id)
        .bind(&appointment.advisor_name)
        .bind(&appointment.advisor_email)
        .bind(appointment.date)
        .bind(appointment.duration)
        .bind(appointment.kind)
        .bind(appointment.status)
        .bind(&appointment.notes)
        .execute(&self.pg)
        .await?;
        Ok(())
    }

    async fn appointments_for_student(&self, student_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let rows = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE student_id = $1 ORDER BY date ASC",
        )
        .bind(student_id)
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, sender_name, recipient_id, recipient_name, content, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(message.id)
        .bind(&message.sender_id)
        .bind(&message.sender_name)
        .bind(&message.recipient_id)
        .bind(&message.recipient_name)
        .bind(&message.content)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pg)
        .await?;
        Ok(())
    }

    async fn messages_for(&self, participant: &str) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE sender_id = $1 OR recipient_id = $1 \
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(participant)
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }

    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO resources (id, title, category, description, content, link, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(resource.id)
        .bind(&resource.title)
        .bind(resource.category)
        .bind(&resource.description)
        .bind(&resource.content)
        .bind(&resource.link)
        .bind(resource.updated_at)
        .execute(&self.pg)
        .await?;
        Ok(())
    }

    async fn list_resources(&self) -> StoreResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources ORDER BY category::text ASC, title ASC",
        )
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }
}
