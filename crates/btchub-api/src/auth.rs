use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use btchub_db::Database;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use tracing::{info, warn};

use btchub_types::api::{AuthResponse, Claims, LoginRequest, MessageResponse, RegisterRequest, UserResponse};

use crate::convert;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::SESSION_COOKIE;
use crate::state::{AppState, with_db};

const TOKEN_TTL_DAYS: i64 = 30;

fn valid_username(name: &str) -> bool {
    (3..=32).contains(&name.chars().count())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string())
}

/// Create the moderator account at startup so its name cannot be claimed
/// through registration. Without a password the account is locked: its hash
/// is of random bytes, so nobody can log in as it.
pub fn ensure_admin_account(
    db: &Database,
    username: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    if db.get_user_by_username(username)?.is_some() {
        return Ok(());
    }

    let password = match password {
        Some(p) => p.to_string(),
        None => {
            warn!(%username, "admin account created without a password; login is disabled");
            let bytes: [u8; 32] = rand::rng().random();
            bytes.iter().map(|b| format!("{b:02x}")).collect()
        }
    };

    let id = db.create_user(username, &hash_password(&password)?)?;
    info!(%username, id, "admin account created");
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    if !valid_username(&req.username) {
        return Err(ApiError::bad_request(
            "Username must be 3-32 characters of letters, digits, '_' or '-'",
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }

    let taken = || ApiError::Conflict("Username already exists".into());
    // Case variants of the moderator name would pass for it in the forum.
    if req.username.eq_ignore_ascii_case(&state.admin_username) {
        return Err(taken());
    }

    let username = req.username.clone();
    if with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .is_some()
    {
        return Err(taken());
    }

    // Hash password with Argon2id
    let password_hash = hash_password(&req.password)?;

    let username = req.username;
    let user = with_db(&state, move |db| {
        let id = db.create_user(&username, &password_hash)?;
        db.record_login(id, chrono::Utc::now())?;
        db.get_user_by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", id))
    })
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent registration of the same name.
        ApiError::Internal(e) if btchub_db::is_constraint_violation(&e) => taken(),
        other => other,
    })?;

    info!(user = %user.username, "registered");
    let token = create_token(&state.jwt_secret, user.id, &user.username)?;
    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            user: convert::user(user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let username = req.username.clone();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {e}", user.id))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let id = user.id;
    let user = with_db(&state, move |db| {
        db.record_login(id, chrono::Utc::now())?;
        db.get_user_by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)?;
    Ok((
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            user: convert::user(user),
            token,
        }),
    ))
}

/// Tokens are stateless, so logging out only drops the cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = with_db(&state, move |db| db.get_user_by_id(claims.sub))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(convert::user(user)))
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::verify_token;

    #[test]
    fn username_rules() {
        assert!(valid_username("satoshi"));
        assert!(valid_username("Hodl_My-Beer21"));
        assert!(!valid_username("ab"));
        assert!(!valid_username("has space"));
        assert!(!valid_username(&"x".repeat(33)));
    }

    #[test]
    fn admin_account_is_seeded_once() {
        let db = Database::open_in_memory().unwrap();
        ensure_admin_account(&db, "HodlMyBeer21", Some("letmein!")).unwrap();
        let admin = db.get_user_by_username("HodlMyBeer21").unwrap().unwrap();

        let hash = PasswordHash::new(&admin.password).unwrap();
        assert!(Argon2::default().verify_password(b"letmein!", &hash).is_ok());

        // Existing account is left alone.
        ensure_admin_account(&db, "HodlMyBeer21", Some("changed!")).unwrap();
        let again = db.get_user_by_username("HodlMyBeer21").unwrap().unwrap();
        assert_eq!(again.id, admin.id);
        assert_eq!(again.password, admin.password);
    }

    #[test]
    fn admin_account_without_password_is_locked() {
        let db = Database::open_in_memory().unwrap();
        ensure_admin_account(&db, "mod", None).unwrap();
        let admin = db.get_user_by_username("mod").unwrap().unwrap();
        let hash = PasswordHash::new(&admin.password).unwrap();
        assert!(Argon2::default().verify_password(b"", &hash).is_err());
    }

    #[test]
    fn token_round_trip_and_wrong_secret() {
        let token = create_token("secret", 7, "satoshi").unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "satoshi");

        assert!(verify_token("other", &token).is_err());
    }
}
