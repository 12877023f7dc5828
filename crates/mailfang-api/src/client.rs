//! HTTP client for the mailfang API.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::model::{EmailCounts, EmailListRecord, EmailListResponse, EmailRecord};

/// Client for the mailfang HTTP API.
///
/// Every endpoint is resolved against an explicit base URL such as
/// `http://localhost:3000`. Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Creates a client sharing an existing HTTP client.
    #[must_use]
    pub const fn with_http_client(base_url: Url, http_client: Client) -> Self {
        Self {
            base_url,
            http_client,
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists all messages, newest first.
    ///
    /// Like every JSON endpoint, returns `None` when the server answers with
    /// no content.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn inbox(
        &self,
        page: u32,
        search: Option<&str>,
    ) -> Result<Option<EmailListResponse>> {
        let url = self.list_url(&["api", "emails"], page, search)?;
        self.get_json(url).await
    }

    /// Lists unread messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn unread(
        &self,
        page: u32,
        search: Option<&str>,
    ) -> Result<Option<EmailListResponse>> {
        let url = self.list_url(&["api", "emails", "unread"], page, search)?;
        self.get_json(url).await
    }

    /// Lists messages that carry attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn with_attachments(
        &self,
        page: u32,
        search: Option<&str>,
    ) -> Result<Option<EmailListResponse>> {
        let url = self.list_url(&["api", "emails", "with-attachments"], page, search)?;
        self.get_json(url).await
    }

    /// Lists messages delivered to one envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn inbox_for_recipient(
        &self,
        recipient: &str,
        page: u32,
        search: Option<&str>,
    ) -> Result<Option<EmailListResponse>> {
        let url = self.list_url(&["api", "emails", "inbox", recipient], page, search)?;
        self.get_json(url).await
    }

    /// Fetches the sidebar counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn sidebar(&self) -> Result<Option<EmailCounts>> {
        let url = self.endpoint(&["api", "emails", "sidebar"])?;
        self.get_json(url).await
    }

    /// Fetches the global counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn counts(&self) -> Result<Option<EmailCounts>> {
        let url = self.endpoint(&["api", "counts"])?;
        self.get_json(url).await
    }

    /// Fetches one message. The server marks it read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn email(&self, id: &str) -> Result<Option<EmailRecord>> {
        let url = self.endpoint(&["api", "emails", id])?;
        self.get_json(url).await
    }

    /// Returns the first message of the inbox, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn first_email(&self) -> Result<Option<EmailListRecord>> {
        let response = self.inbox(1, None).await?;
        Ok(response.and_then(|page| page.emails.into_iter().next()))
    }

    /// Deletes one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn delete_email(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "emails", id])?;
        self.execute(self.http_client.delete(url)).await?;
        Ok(())
    }

    /// Deletes every message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn delete_all(&self) -> Result<()> {
        let url = self.endpoint(&["api", "emails"])?;
        self.execute(self.http_client.delete(url)).await?;
        Ok(())
    }

    /// Returns the download URL of an attachment. No request is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn attachment_url(&self, id: &str) -> Result<Url> {
        self.endpoint(&["api", "attachments", id])
    }

    /// Downloads the raw RFC 5322 source of a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn raw_email(&self, id: &str) -> Result<String> {
        let url = self.endpoint(&["api", "emails", id, "raw"])?;
        self.get_text(url).await
    }

    /// Fetches the sanitized HTML rendering of a message.
    ///
    /// With `allow_remote_content` unset the server strips remote images and
    /// stylesheets.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn rendered_email(&self, id: &str, allow_remote_content: bool) -> Result<String> {
        let mut url = self.endpoint(&["api", "emails", id, "rendered"])?;
        url.query_pairs_mut().append_pair(
            "allow_remote_content",
            if allow_remote_content { "true" } else { "false" },
        );
        self.get_text(url).await
    }

    /// Resolves path segments against the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn list_url(&self, segments: &[&str], page: u32, search: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            if let Some(search) = search.filter(|s| !s.is_empty()) {
                query.append_pair("search", search);
            }
        }
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(%status, url = %response.url(), "API response");

        if !status.is_success() {
            warn!(%status, url = %response.url(), "API request failed");
            return Err(Error::status(status));
        }

        Ok(response)
    }

    /// GETs a JSON body. `None` when the server answers with no content.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let request = self
            .http_client
            .get(url)
            .header(CONTENT_TYPE, "application/json");
        let response = self.execute(request).await?;

        if is_empty(&response) {
            debug!(url = %response.url(), "no content");
            return Ok(None);
        }

        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self.execute(self.http_client.get(url)).await?;
        Ok(response.text().await?)
    }
}

/// True for responses that carry no body by contract.
fn is_empty(response: &Response) -> bool {
    response.status() == StatusCode::NO_CONTENT
        || response
            .headers()
            .get(CONTENT_LENGTH)
            .is_some_and(|len| len.as_bytes() == b"0")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_list_url() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.list_url(&["api", "emails"], 1, None).unwrap().as_str(),
            "http://localhost:3000/api/emails?page=1"
        );
        assert_eq!(
            c.list_url(&["api", "emails", "unread"], 2, Some("hello world&more"))
                .unwrap()
                .as_str(),
            "http://localhost:3000/api/emails/unread?page=2&search=hello+world%26more"
        );
    }

    #[test]
    fn test_empty_search_is_omitted() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.list_url(&["api", "emails"], 1, Some("")).unwrap().as_str(),
            "http://localhost:3000/api/emails?page=1"
        );
    }

    #[test]
    fn test_segments_are_encoded() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.list_url(&["api", "emails", "inbox", "a b/c@x.com"], 1, None)
                .unwrap()
                .as_str(),
            "http://localhost:3000/api/emails/inbox/a%20b%2Fc@x.com?page=1"
        );
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let c = client("http://example.com/mailfang/");
        assert_eq!(
            c.attachment_url("att1").unwrap().as_str(),
            "http://example.com/mailfang/api/attachments/att1"
        );
    }

    #[test]
    fn test_attachment_url() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.attachment_url("abc").unwrap().as_str(),
            "http://localhost:3000/api/attachments/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let c = client("mailto:someone@example.com");
        assert!(matches!(
            c.attachment_url("abc"),
            Err(Error::InvalidBaseUrl(_))
        ));
    }
}
