use sqlx::PgPool;

use crate::models::user_profile::UserProfile;

/// Column list for `user_profiles` queries.
const COLUMNS: &str = "id, email, name, avatar_url, created_at, updated_at";

/// Provides access to user profiles.
pub struct UserProfileRepo;

impl UserProfileRepo {
    /// Insert a profile or refresh name and avatar of an existing one, keyed
    /// by email. A blank avatar URL is stored as NULL.
    pub async fn upsert(
        pool: &PgPool,
        email: &str,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<UserProfile, sqlx::Error> {
        let avatar_url = avatar_url.map(str::trim).filter(|a| !a.is_empty());
        let query = format!(
            "INSERT INTO user_profiles (email, name, avatar_url) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET \
                name = EXCLUDED.name, \
                avatar_url = EXCLUDED.avatar_url, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(email)
            .bind(name)
            .bind(avatar_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_profiles WHERE email = $1");
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }
}
