use serde::{Deserialize, Serialize};

/// The shape returned by `ListPages` (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub language: String,
    pub collection: Option<String>,
    #[serde(rename = "isTemplate", default)]
    pub is_template: bool,
    #[serde(rename = "hasAssets", default)]
    pub has_assets: bool,
}

/// The shape returned by `GetPageContent` / `GetTemplate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub text: String,
    #[serde(rename = "collectionId", skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    pub slug: String,
}

/// Minimal description of a target needed to construct a client: the wiki
/// base URI and resolved credential. Discovery/credential resolution itself
/// lives in the `wikitarget-controller` crate, which owns the `kube::Client`
/// and secret lookups; this stays decoupled from Kubernetes entirely.
#[derive(Debug, Clone)]
pub struct TargetEndpoint {
    pub uri: String,
    pub token: Option<String>,
    /// Preserves the inherited default of `true` when unset upstream
    /// (spec.md Q1 / SPEC_FULL.md §D) — callers should prefer setting this
    /// explicitly for anything beyond local development.
    pub insecure_skip_tls_verify: bool,
}
