//! Thin adapter over a remote wiki's REST API.
//!
//! The client never issues update or delete requests — `CreatePage` is the
//! only mutating operation it exposes, matching the "no overwrite"
//! invariant (I1) that the rest of the system is built around.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{CreatePageRequest, CreatedPage, PageContent, PageSummary, TargetEndpoint};

use tracing::instrument;

#[derive(Clone)]
pub struct WikiClient {
    http: reqwest::Client,
    base_uri: String,
    token: Option<String>,
}

impl WikiClient {
    pub fn new(endpoint: &TargetEndpoint) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(endpoint.insecure_skip_tls_verify)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(Error::Transport)?;

        Ok(Self {
            http,
            base_uri: endpoint.uri.trim_end_matches('/').to_string(),
            token: endpoint.token.clone(),
        })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Lists pages, optionally constrained to a single collection
    /// (spec.md §4.1).
    #[instrument(skip(self), fields(base_uri = %self.base_uri, collection))]
    pub async fn list_pages(&self, collection: Option<&str>) -> Result<Vec<PageSummary>> {
        let mut req = self.authed(self.http.get(format!("{}/api/pages", self.base_uri)));
        if let Some(collection) = collection {
            req = req.query(&[("collection", collection)]);
        }

        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json::<Vec<PageSummary>>().await?)
    }

    /// Fetches the current revision body of a page (spec.md §4.1).
    #[instrument(skip(self), fields(base_uri = %self.base_uri))]
    pub async fn get_page_content(&self, page_id: &str) -> Result<PageContent> {
        let resp = self
            .authed(
                self.http
                    .get(format!("{}/api/pages/{page_id}", self.base_uri)),
            )
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<PageContent>().await?)
    }

    /// Creates a new page. Never updates an existing one — callers are
    /// responsible for uniquifying titles before calling this (spec.md I1,
    /// implemented in `translationjob-controller`).
    #[instrument(skip(self, req), fields(base_uri = %self.base_uri, title = %req.title))]
    pub async fn create_page(&self, req: CreatePageRequest) -> Result<CreatedPage> {
        let resp = self
            .authed(self.http.post(format!("{}/api/pages", self.base_uri)))
            .json(&req)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<CreatedPage>().await?)
    }

    /// Fetches a named template as auxiliary translation context
    /// (spec.md §4.1, optional helper).
    #[instrument(skip(self), fields(base_uri = %self.base_uri))]
    pub async fn get_template(&self, template_ref: &str) -> Result<PageContent> {
        let resp = self
            .authed(
                self.http
                    .get(format!("{}/api/templates/{template_ref}", self.base_uri)),
            )
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<PageContent>().await?)
    }
}
