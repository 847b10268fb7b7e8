//! Search-as-you-type suggestions.
//!
//! The page wraps [`search_suggestions`] in a `DebouncedFunction` from
//! `simmer` so a typing burst costs one request, not one per keystroke.

use wasm_bindgen::prelude::*;

use crate::engagement::EngagementError;
use crate::utils::hit_counter_api;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    pub slug: String,
    pub title: String,
}

pub async fn fetch_suggestions(query: &str) -> Result<Vec<SearchSuggestion>, EngagementError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let encoded = String::from(js_sys::encode_uri_component(query));
    let response = hit_counter_api(
        fetch_happen::Method::GET,
        &format!("/api/search?q={encoded}"),
        None::<()>,
    )
    .await
    .map_err(EngagementError::Request)?;

    if !response.ok() {
        return Err(EngagementError::Http(response.status().to_string()));
    }

    response.json().await.map_err(EngagementError::Decode)
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub async fn search_suggestions(query: String) -> Result<JsValue, JsValue> {
    let suggestions = fetch_suggestions(&query)
        .await
        .map_err(|e| JsValue::from_str(&format!("Request error: {e}")))?;

    serde_wasm_bindgen::to_value(&suggestions)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e:?}")))
}
