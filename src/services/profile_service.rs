use sqlx::PgPool;

use crate::error::Result;
use crate::models::profile::Profile;

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates or updates the caller's profile row. Unlike session
    /// persistence this is not best-effort: a failed upsert is an error the
    /// caller must see, since the profile is the system of record.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
        role: &str,
        resume_url: Option<&str>,
    ) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, email, full_name, role, resume_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                role = EXCLUDED.role,
                resume_url = COALESCE(EXCLUDED.resume_url, profiles.resume_url),
                updated_at = NOW()
            RETURNING user_id, email, full_name, role, resume_url, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(resume_url)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id, role, "Profile upserted");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, email, full_name, role, resume_url, created_at, updated_at
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }
}
