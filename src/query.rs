//! Search and generic resource fetches.
//!
//! Both operations issue a single GET and decode the body as JSON. Non-2xx
//! responses become [`crate::error::QpiError::Http`].

use tracing::debug;

use crate::client::QuickPin;
use crate::error::{check_status, Result};
use crate::models::SearchQuery;

pub(crate) const SEARCH_PATH: &str = "api/search/";

impl QuickPin {
    /// `GET /api/search/` with the query's parameters.
    pub async fn search(&self, query: &SearchQuery) -> Result<serde_json::Value> {
        let url = self.endpoint(SEARCH_PATH)?;
        let params = query.to_params();
        debug!(%url, query = %query.query, "searching");
        self.get_json(url, &params).await
    }

    /// `GET <resource>` with `page` and `rpp` parameters.
    ///
    /// `resource` is resolved against the base URL (see [`QuickPin::endpoint`]).
    pub async fn get(&self, resource: &str, page: u32, rpp: u32) -> Result<serde_json::Value> {
        let url = self.endpoint(resource)?;
        let params = [("page", page.to_string()), ("rpp", rpp.to_string())];
        debug!(%url, page, rpp, "fetching resource");
        self.get_json(url, &params).await
    }

    async fn get_json(
        &self,
        url: url::Url,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        let response = self.http().get(url).query(params).send().await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
