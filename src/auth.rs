use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{Config, SESSION_COOKIE};
use crate::core::errors::{internal_error, ApiError};
use crate::core::helpers::{hash_password, now_iso, new_id, sanitize_text, verify_password};
use crate::models::models::{User, UserView};
use crate::users::{
    build_user_view, find_user_by_email, find_user_by_username, validate_email,
    validate_full_name, validate_password, validate_username,
};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Contents of the signed session credential. Nothing is stored
/// server-side; the token is self-contained and lapses at `exp`.
#[derive(Serialize, Deserialize, Debug)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// The caller's resolved identity, produced once per request and passed
/// into handlers. Holds the full stored record; responses must go through
/// the projection types.
pub struct AuthContext {
    pub user: User,
}

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

fn sign_claims(claims: &Claims, secret: &str) -> anyhow::Result<String> {
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let mut m = mac(secret);
    m.update(body.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(m.finalize().into_bytes());
    Ok(format!("{}.{}", body, sig))
}

fn verify_token(token: &str, secret: &str, now: i64) -> Result<Claims, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid token".to_string());

    let (body, sig) = token.split_once('.').ok_or_else(invalid)?;
    let sig_bytes = URL_SAFE_NO_PAD.decode(sig).map_err(|_| invalid())?;

    let mut m = mac(secret);
    m.update(body.as_bytes());
    m.verify_slice(&sig_bytes).map_err(|_| invalid())?;

    let claims_bytes = URL_SAFE_NO_PAD.decode(body).map_err(|_| invalid())?;
    let claims: Claims = serde_json::from_slice(&claims_bytes).map_err(|_| invalid())?;

    if claims.exp <= now {
        return Err(ApiError::Unauthorized("Token expired".to_string()));
    }
    Ok(claims)
}

/// Issue a fresh session cookie for `user_id`: `HttpOnly`,
/// `SameSite=Strict`, `Secure` in production, fixed TTL.
pub fn issue_session(user_id: &str, config: &Config) -> anyhow::Result<Cookie<'static>> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.session_ttl_minutes * 60,
    };
    let token = sign_claims(&claims, &config.session_secret)?;

    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.production)
        .max_age(CookieDuration::minutes(config.session_ttl_minutes))
        .finish())
}

/// Overwrite the session cookie with an immediately-expiring blank one.
/// Idempotent: clearing an absent session is fine.
pub fn revoke_session(config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.production)
        .max_age(CookieDuration::ZERO)
        .finish()
}

/// Resolve the request's session cookie to the caller's identity.
///
/// Fails before any data access: missing cookie, bad signature or
/// structure, expiry, and a subject that no longer exists all map to 401.
pub fn authenticate(req: &HttpRequest, state: &AppState) -> Result<AuthContext, ApiError> {
    let cookie = req
        .cookie(SESSION_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let now = chrono::Utc::now().timestamp();
    let claims = verify_token(cookie.value(), &state.config.session_secret, now)?;

    let user: User = state
        .store
        .get_json(&crate::config::user_key(&claims.sub))
        .map_err(internal_error("authenticate"))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(AuthContext { user })
}

// === Handlers ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let full_name = body.full_name.as_deref().unwrap_or("").trim().to_string();
    let username = sanitize_text(body.username.as_deref().unwrap_or("").trim());
    let email = body.email.as_deref().unwrap_or("").trim().to_string();
    let password = body.password.as_deref().unwrap_or("");

    validate_full_name(&full_name)?;
    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(password)?;

    let store = &state.store;
    if find_user_by_username(store, &username)
        .map_err(internal_error("signup"))?
        .is_some()
    {
        return Err(ApiError::Conflict("username is already taken".to_string()));
    }
    if find_user_by_email(store, &email)
        .map_err(internal_error("signup"))?
        .is_some()
    {
        return Err(ApiError::Conflict("Email is already taken".to_string()));
    }

    let user = User {
        id: new_id(),
        username,
        full_name,
        email,
        password: hash_password(password).map_err(internal_error("signup"))?,
        bio: None,
        link: None,
        profile_img: None,
        followers: Vec::new(),
        following: Vec::new(),
        liked_posts: Vec::new(),
        created_at: now_iso(),
    };

    store
        .set_json(&crate::config::user_key(&user.id), &user)
        .map_err(internal_error("signup"))?;

    let mut users = store
        .get_list(crate::config::USERS_LIST_KEY)
        .map_err(internal_error("signup"))?;
    users.push(user.id.clone());
    store
        .set_json(crate::config::USERS_LIST_KEY, &users)
        .map_err(internal_error("signup"))?;

    let cookie = issue_session(&user.id, &state.config).map_err(internal_error("signup"))?;
    let view = build_user_view(store, &user).map_err(internal_error("signup"))?;

    Ok(HttpResponse::Created().cookie(cookie).json(serde_json::json!({
        "message": "User registered successfully",
        "user": view,
    })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

    // Identifier may be a username or an email; exact match either way.
    let user = match (body.username.as_deref(), body.email.as_deref()) {
        (Some(username), _) if !username.is_empty() => {
            find_user_by_username(&state.store, username).map_err(internal_error("login"))?
        }
        (_, Some(email)) if !email.is_empty() => {
            find_user_by_email(&state.store, email).map_err(internal_error("login"))?
        }
        _ => return Err(ApiError::BadRequest("Username or Email is required".to_string())),
    };

    let user = user.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(password, &user.password) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let cookie = issue_session(&user.id, &state.config).map_err(internal_error("login"))?;

    Ok(HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "message": "Logged in successfully",
        "user": { "id": user.id, "username": user.username, "email": user.email },
    })))
}

pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok()
        .cookie(revoke_session(&state.config))
        .json(serde_json::json!({ "message": "Logged out successfully" })))
}

/// GET /api/auth/user: the caller's own profile with populated
/// follower/following summaries.
pub async fn current_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let ctx = authenticate(&req, &state)?;
    let view: UserView =
        build_user_view(&state.store, &ctx.user).map_err(internal_error("current_user"))?;
    Ok(HttpResponse::Ok().json(view))
}
