use std::env;

use tracing::warn;

/// Maximum length of a post body or comment, in characters.
pub const MAX_TEXT_LENGTH: usize = 500;
/// Maximum length of a profile bio.
pub const MAX_BIO_LENGTH: usize = 200;
/// Maximum size of an uploaded image, measured over the whole base64 data
/// URL as received. The payload is never decoded server-side.
pub const MAX_IMAGE_BASE64_LEN: usize = 5 * 1024 * 1024;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 15;
pub const MIN_FULL_NAME_LENGTH: usize = 6;
pub const MAX_FULL_NAME_LENGTH: usize = 30;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 30;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Name of the session cookie presented on every authenticated request.
pub const SESSION_COOKIE: &str = "jwt";

// === Store key layout ===

pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn notification_key(id: &str) -> String {
    format!("notification:{}", id)
}

pub fn notifications_list_key(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

pub fn media_key(id: &str) -> String {
    format!("media:{}", id)
}

/// Process configuration, read from the environment exactly once in `main`
/// and threaded through `AppState`. Nothing else touches `std::env`.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let session_secret = match env::var("FLOCK_SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!("FLOCK_SESSION_SECRET not set, using an insecure development secret");
                "flock-dev-secret".to_string()
            }
        };

        Self {
            port: env_or("FLOCK_PORT", 3000),
            session_secret,
            session_ttl_minutes: env_or("FLOCK_SESSION_TTL_MINUTES", 60),
            production: env::var("FLOCK_PRODUCTION").map(|v| v == "true").unwrap_or(false),
        }
    }

    /// Fixed configuration for in-process tests: no env reads, no warnings.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            session_secret: "test-secret".to_string(),
            session_ttl_minutes: 60,
            production: false,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
