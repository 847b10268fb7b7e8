//! The typed boundary to the blog's counter API.
//!
//! The server owns every count. These calls exist to move its numbers in
//! and out; nothing returned here is cached as a correctness source, only
//! echoed into UI state by the callers.

use crate::utils::hit_counter_api;

#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("request failed: {0:?}")]
    Request(fetch_happen::Error),
    #[error("server returned {0}")]
    Http(String),
    #[error("server rejected the mutation")]
    Rejected,
    #[error("malformed response: {0:?}")]
    Decode(fetch_happen::Error),
}

/// Authoritative like state for one post, as the server last reported it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: u32,
}

/// Authoritative view counters for one post.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct ViewStatus {
    pub view_count: u32,
    pub unique_views: u32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewCountedWire {
    success: bool,
    view_count: u32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeToggledWire {
    success: bool,
    liked: bool,
    like_count: u32,
}

/// Count one view. Returns the post's new view count.
pub async fn record_view(slug: &str) -> Result<u32, EngagementError> {
    let response = hit_counter_api(
        fetch_happen::Method::POST,
        &format!("/api/posts/{slug}/view"),
        None::<()>,
    )
    .await
    .map_err(EngagementError::Request)?;

    if !response.ok() {
        return Err(EngagementError::Http(response.status().to_string()));
    }

    let counted: ViewCountedWire = response.json().await.map_err(EngagementError::Decode)?;
    if !counted.success {
        return Err(EngagementError::Rejected);
    }
    Ok(counted.view_count)
}

pub async fn view_status(slug: &str) -> Result<ViewStatus, EngagementError> {
    let response = hit_counter_api(
        fetch_happen::Method::GET,
        &format!("/api/posts/{slug}/view"),
        None::<()>,
    )
    .await
    .map_err(EngagementError::Request)?;

    if !response.ok() {
        return Err(EngagementError::Http(response.status().to_string()));
    }

    response.json().await.map_err(EngagementError::Decode)
}

/// Flip the caller's like for a post. The response carries the server's
/// post-toggle truth, which overwrites whatever the UI guessed.
pub async fn toggle_like(slug: &str) -> Result<LikeStatus, EngagementError> {
    let response = hit_counter_api(
        fetch_happen::Method::POST,
        &format!("/api/posts/{slug}/like"),
        None::<()>,
    )
    .await
    .map_err(EngagementError::Request)?;

    if !response.ok() {
        return Err(EngagementError::Http(response.status().to_string()));
    }

    let toggled: LikeToggledWire = response.json().await.map_err(EngagementError::Decode)?;
    if !toggled.success {
        return Err(EngagementError::Rejected);
    }
    Ok(LikeStatus {
        liked: toggled.liked,
        like_count: toggled.like_count,
    })
}

pub async fn like_status(slug: &str) -> Result<LikeStatus, EngagementError> {
    let response = hit_counter_api(
        fetch_happen::Method::GET,
        &format!("/api/posts/{slug}/like"),
        None::<()>,
    )
    .await
    .map_err(EngagementError::Request)?;

    if !response.ok() {
        return Err(EngagementError::Http(response.status().to_string()));
    }

    response.json().await.map_err(EngagementError::Decode)
}
