use sqlx::{types::Json, PgExecutor};
use uuid::Uuid;

use crate::domain::aggregates::{Address, Role, User};

use super::PageParams;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
}

/// Profile fields a customer may change. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub addresses: Option<Vec<Address>>,
    pub profile_picture: Option<String>,
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn find_by_email<'e>(db: impl PgExecutor<'e>, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(db).await
}

pub async fn find_by_google_id<'e>(db: impl PgExecutor<'e>, google_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = $1").bind(google_id).fetch_optional(db).await
}

pub async fn email_exists<'e>(db: impl PgExecutor<'e>, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)").bind(email).fetch_one(db).await
}

pub async fn create<'e>(db: impl PgExecutor<'e>, u: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, username, password_hash, google_id, first_name, last_name, phone_number, profile_picture, addresses, role, is_blocked, referral_balance, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '[]'::jsonb, $10, FALSE, 0, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&u.email).bind(&u.username).bind(&u.password_hash).bind(&u.google_id)
    .bind(&u.first_name).bind(&u.last_name).bind(&u.phone_number).bind(&u.profile_picture).bind(u.role)
    .fetch_one(db).await
}

/// Creates the admin account unless the email is already taken.
pub async fn insert_admin_if_missing<'e>(db: impl PgExecutor<'e>, email: &str, password_hash: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (id, email, username, password_hash, addresses, role, is_blocked, referral_balance, created_at, updated_at) \
         VALUES ($1, $2, 'admin', $3, '[]'::jsonb, 'admin', FALSE, 0, NOW(), NOW()) ON CONFLICT (email) DO NOTHING",
    )
    .bind(Uuid::now_v7()).bind(email).bind(password_hash)
    .execute(db).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn link_google<'e>(db: impl PgExecutor<'e>, id: Uuid, google_id: &str, picture: Option<&str>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET google_id = $2, profile_picture = COALESCE(profile_picture, $3), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(google_id).bind(picture)
    .fetch_one(db).await
}

pub async fn update_profile<'e>(db: impl PgExecutor<'e>, id: Uuid, p: &ProfileUpdate) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name), \
         phone_number = COALESCE($4, phone_number), addresses = COALESCE($5, addresses), \
         profile_picture = COALESCE($6, profile_picture), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(&p.first_name).bind(&p.last_name).bind(&p.phone_number)
    .bind(p.addresses.as_ref().map(Json)).bind(&p.profile_picture)
    .fetch_optional(db).await
}

pub async fn push_address<'e>(db: impl PgExecutor<'e>, id: Uuid, address: &Address) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("UPDATE users SET addresses = addresses || $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(Json(vec![address]))
        .fetch_optional(db).await
}

/// Sets the block flag, or flips it when `is_blocked` is `None`.
pub async fn set_blocked<'e>(db: impl PgExecutor<'e>, id: Uuid, is_blocked: Option<bool>) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("UPDATE users SET is_blocked = COALESCE($2, NOT is_blocked), updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(is_blocked)
        .fetch_optional(db).await
}

pub async fn list(db: &sqlx::PgPool, page: &PageParams) -> Result<(Vec<User>, i64), sqlx::Error> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(db).await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(db).await?;
    Ok((users, total))
}
