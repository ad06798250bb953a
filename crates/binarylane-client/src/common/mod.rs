//! Common utilities for the BinaryLane API client
//!
//! Provides the authenticated HTTP wrapper shared by every endpoint.

pub mod query;

use crate::error::BinaryLaneError;
use crate::models::Paginated;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Page size requested when draining list endpoints
pub const PAGE_SIZE: u32 = 100;

/// HTTP client wrapper with bearer authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.build_url(path))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
    }

    /// Map non-success statuses onto the error taxonomy, keeping 404 distinguishable
    async fn check_status(
        response: Response,
        method: &Method,
        path: &str,
    ) -> Result<Response, BinaryLaneError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(BinaryLaneError::NotFound(format!(
                "{} {} - {}",
                method, path, body
            ))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                BinaryLaneError::Authentication(format!("{} {}: {} - {}", method, path, status, body)),
            ),
            _ => Err(BinaryLaneError::Api(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            ))),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BinaryLaneError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(
                "Failed to decode response body: {} - Response (first 500 chars): {}",
                e,
                text.chars().take(500).collect::<String>()
            );
            BinaryLaneError::Serialization(e)
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BinaryLaneError> {
        debug!("GET {}", path);

        let response = self.request(Method::GET, path).send().await?;
        let response = Self::check_status(response, &Method::GET, path).await?;
        Self::decode(response).await
    }

    /// Send a JSON body and decode the JSON response (POST / PUT)
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, BinaryLaneError> {
        debug!("{} {}", method, path);

        let response = self.request(method.clone(), path).json(body).send().await?;
        let response = Self::check_status(response, &method, path).await?;
        Self::decode(response).await
    }

    /// Send a request whose response body is ignored (DELETE, membership changes)
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), BinaryLaneError> {
        debug!("{} {}", method, path);

        let mut request = self.request(method.clone(), path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::check_status(response, &method, path).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint, concatenating items in API order.
    ///
    /// `query` is appended to every page request; the page cursor is managed here.
    pub async fn fetch_all_pages<P>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<P::Item>, BinaryLaneError>
    where
        P: Paginated + DeserializeOwned,
    {
        let mut all_results = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let page_str = page_number.to_string();
            let per_page = PAGE_SIZE.to_string();
            let mut params: Vec<(&str, &str)> = vec![("page", &page_str), ("per_page", &per_page)];
            params.extend_from_slice(query);

            let url = format!("{}?{}", path, query::build_query_string(&params));
            debug!("Fetching page {} of {}", page_number, path);

            let page: P = self.get(&url).await?;
            let has_next = page.has_next();
            all_results.extend(page.into_items());

            if !has_next {
                break;
            }
            page_number += 1;
        }

        Ok(all_results)
    }
}
