//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{User, CreateUserRequest};
use crate::utils::errors::CampusGateError;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, CampusGateError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, is_campus_student, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, full_name, email, is_campus_student, created_at
            "#
        )
        .bind(request.full_name)
        .bind(request.email)
        .bind(request.is_campus_student)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, CampusGateError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, full_name, email, is_campus_student, created_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
