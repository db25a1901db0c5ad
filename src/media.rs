//! Media collaborator: validates incoming base64 image data URLs and owns
//! their storage lifecycle. Everything above this module handles opaque
//! media ids only.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{media_key, MAX_IMAGE_BASE64_LEN};
use crate::core::db::Store;
use crate::core::errors::ApiError;
use crate::core::helpers::new_id;

fn data_url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^data:image/[a-z]+;base64,.+$").expect("Regex should compile")
    })
}

/// Validate and persist an image, returning its media id.
///
/// The size cap applies to the data URL as received; the payload is never
/// decoded server-side.
pub fn store_image(store: &Store, data_url: &str) -> Result<String, ApiError> {
    if data_url.is_empty() {
        return Err(ApiError::BadRequest("Image is required".to_string()));
    }
    if !data_url_regex().is_match(data_url) {
        return Err(ApiError::BadRequest(
            "Invalid image format. Must be a base64-encoded image".to_string(),
        ));
    }
    if data_url.len() > MAX_IMAGE_BASE64_LEN {
        return Err(ApiError::BadRequest("Image must not exceed 5MB".to_string()));
    }

    let id = new_id();
    store
        .set_json(&media_key(&id), &data_url)
        .map_err(|e| ApiError::internal("store_image", e))?;
    Ok(id)
}

pub fn fetch(store: &Store, media_id: &str) -> anyhow::Result<Option<String>> {
    store.get_json::<String>(&media_key(media_id))
}

/// Best-effort release of a stored image. A failure is logged and
/// swallowed; the owning record has already moved on.
pub fn release(store: &Store, media_id: &str) {
    if let Err(e) = store.delete(&media_key(media_id)) {
        tracing::warn!("Error releasing media {}: {:#}", media_id, e);
    }
}
