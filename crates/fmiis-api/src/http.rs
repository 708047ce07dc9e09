//! `reqwest` implementation of [`StaffApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use fmiis_core::config::ApiConfig;
use fmiis_core::error::{AppError, ErrorKind};
use fmiis_core::result::AppResult;
use fmiis_entity::employee::EmployeeList;
use fmiis_entity::{Employee, Identity, Notification};

use crate::client::StaffApi;
use crate::routes;
use crate::types::{LoginRequest, MarkSeenRequest, SendNotificationRequest, WhoamiResponse};

/// HTTP client for the backend REST API.
///
/// Keeps a cookie store so the session cookie set by `/login` is sent on
/// every following request.
#[derive(Debug, Clone)]
pub struct HttpStaffApi {
    /// Underlying HTTP client.
    client: Client,
    /// Base URL including the API prefix.
    base: Url,
}

impl HttpStaffApi {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let raw = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.prefix.trim_matches('/')
        );
        let base = Url::parse(raw.trim_end_matches('/')).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid API base URL: {raw}"),
                e,
            )
        })?;
        if base.cannot_be_a_base() {
            return Err(AppError::configuration(format!(
                "API base URL cannot carry paths: {raw}"
            )));
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self { client, base })
    }

    /// Full URL for a route's path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, %url, "API request");
        self.client.request(method, url)
    }

    /// Send a request and map non-success statuses to errors.
    async fn execute(&self, builder: RequestBuilder) -> AppResult<reqwest::Response> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = self.execute(builder).await?;
        response.json::<T>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Failed to decode response: {e}"),
                e,
            )
        })
    }
}

#[async_trait]
impl StaffApi for HttpStaffApi {
    async fn login(&self, email: &str, password: &str) -> AppResult<Identity> {
        let body = LoginRequest { email, password };
        self.execute_json(self.request(Method::POST, routes::LOGIN).json(&body))
            .await
    }

    async fn logout(&self) -> AppResult<()> {
        self.execute(self.request(Method::POST, routes::LOGOUT))
            .await
            .map(|_| ())
    }

    async fn whoami(&self) -> AppResult<Identity> {
        let response: WhoamiResponse = self
            .execute_json(self.request(Method::GET, routes::WHOAMI))
            .await?;
        Ok(response.into_identity())
    }

    async fn notifications(&self, email: &str) -> AppResult<Vec<Notification>> {
        let response: Option<Vec<Notification>> = self
            .execute_json(self.request(Method::GET, &routes::notifications(email)))
            .await?;
        Ok(response.unwrap_or_default())
    }

    async fn mark_notification_seen(&self, notification_id: &str, email: &str) -> AppResult<()> {
        let body = MarkSeenRequest { email };
        self.execute(
            self.request(Method::POST, &routes::mark_seen(notification_id))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    async fn send_notification(
        &self,
        request: &SendNotificationRequest,
    ) -> AppResult<Notification> {
        self.execute_json(
            self.request(Method::POST, routes::SEND_NOTIFICATION)
                .json(request),
        )
        .await
    }

    async fn employees(&self) -> AppResult<Vec<Employee>> {
        let list: EmployeeList = self
            .execute_json(self.request(Method::GET, routes::EMPLOYEES))
            .await?;
        Ok(list.employees)
    }
}

/// Map a transport-level failure (DNS, connect, timeout, TLS) to an error.
fn map_transport_error(err: reqwest::Error) -> AppError {
    let message = if err.is_timeout() {
        "Request timed out".to_string()
    } else if err.is_connect() {
        "Failed to connect to backend".to_string()
    } else {
        format!("Request failed: {err}")
    };
    AppError::with_source(ErrorKind::ServiceUnavailable, message, err)
}

/// Map a non-success HTTP status to an error.
fn status_error(status: StatusCode, body: &str) -> AppError {
    let detail = extract_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED => AppError::authentication(detail),
        StatusCode::FORBIDDEN => AppError::authorization(detail),
        StatusCode::NOT_FOUND => AppError::not_found(detail),
        s if s.is_client_error() => AppError::validation(detail),
        _ => AppError::service_unavailable(detail),
    }
}

/// Pull a `message` or `error` field out of a JSON error body.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(String::from)
}
