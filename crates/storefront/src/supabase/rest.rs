//! `PostgREST` client.
//!
//! Requests go to `{url}/rest/v1/{table}` with the project key in the
//! `apikey` header and `Authorization: Bearer <user token or anon key>`.
//! Filters use the `column=op.value` query syntax.

use std::fmt::Display;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{SupabaseError, retry_after, truncate_body};

/// Media type asking `PostgREST` for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Client for the REST API of one project.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl RestClient {
    /// Create a new REST client.
    ///
    /// `base_url` is the REST root, e.g. `https://abc.supabase.co/rest/v1`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String, anon_key: SecretString) -> Self {
        Self {
            inner: Arc::new(RestClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                anon_key,
            }),
        }
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn table<'a>(&'a self, table: &'a str) -> TableQuery<'a> {
        TableQuery {
            client: self,
            table,
            params: Vec::new(),
            token: None,
        }
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        token: Option<&SecretString>,
    ) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.inner.anon_key);
        self.inner
            .client
            .request(method, format!("{}/{table}", self.inner.base_url))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }
}

/// A query under construction.
///
/// Filters, ordering and limits are appended as query parameters; the
/// terminal methods (`fetch`, `insert`, `update`, `delete`) send it.
#[must_use]
pub struct TableQuery<'a> {
    client: &'a RestClient,
    table: &'a str,
    params: Vec<(String, String)>,
    token: Option<&'a SecretString>,
}

impl<'a> TableQuery<'a> {
    /// Columns to return (`select=`).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    /// `column = value`.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// `column in (values...)`.
    pub fn in_list<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.params.push((column.to_string(), format!("in.({joined})")));
        self
    }

    /// Sort by `column`.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    /// Cap the number of rows returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    /// Send the request as the signed-in user instead of anonymously.
    pub const fn with_token(mut self, token: Option<&'a SecretString>) -> Self {
        self.token = token;
        self
    }

    /// Fetch all matching rows.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the request fails or the rows cannot be parsed.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
        let request = self
            .client
            .request(Method::GET, self.table, self.token)
            .query(&self.params);
        send_json(request).await
    }

    /// Fetch the first matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the request fails or the row cannot be parsed.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, SupabaseError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the insert is rejected or the row cannot be parsed.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn insert<B, T>(self, body: &B) -> Result<T, SupabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .request(Method::POST, self.table, self.token)
            .query(&self.params)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(body);
        send_json(request).await
    }

    /// Update the single row matched by the filters and return it.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::NotFound` if no row matched.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn update<B, T>(self, body: &B) -> Result<T, SupabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .request(Method::PATCH, self.table, self.token)
            .query(&self.params)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(body);
        send_json(request).await
    }

    /// Delete the rows matched by the filters.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the delete is rejected.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), SupabaseError> {
        let request = self
            .client
            .request(Method::DELETE, self.table, self.token)
            .query(&self.params)
            .header("Prefer", "return=minimal");
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SupabaseError::RateLimited(retry_after(&response)));
        }
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        tracing::warn!(
            status = %status,
            body = %truncate_body(&body),
            "REST delete returned non-success status"
        );
        Err(SupabaseError::from_status(status, &body))
    }

    #[cfg(test)]
    fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Send a request and parse a JSON response body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, SupabaseError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SupabaseError::RateLimited(retry_after(&response)));
    }

    // Read the body as text first for better error diagnostics
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = %status,
            body = %truncate_body(&body),
            "Supabase API returned non-success status"
        );
        return Err(SupabaseError::from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate_body(&body),
            "Failed to parse Supabase response"
        );
        SupabaseError::Parse(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestClient {
        RestClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:54321/rest/v1/".to_string(),
            SecretString::from("anon"),
        )
    }

    fn pairs<'q>(query: &'q TableQuery<'_>) -> Vec<(&'q str, &'q str)> {
        query
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_filters_use_postgrest_syntax() {
        let client = client();
        let query = client
            .table("orders")
            .select("*")
            .eq("user_id", "abc")
            .order("created_at", false);

        assert_eq!(
            pairs(&query),
            [
                ("select", "*"),
                ("user_id", "eq.abc"),
                ("order", "created_at.desc")
            ]
        );
    }

    #[test]
    fn test_in_list_joins_values() {
        let client = client();
        let query = client.table("profiles").in_list("id", [1, 2, 3]).limit(5);
        assert_eq!(pairs(&query), [("id", "in.(1,2,3)"), ("limit", "5")]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().inner.base_url, "http://127.0.0.1:54321/rest/v1");
    }
}
