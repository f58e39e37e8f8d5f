//! `reqwest` implementation of [`ContentSource`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{ApiError, CardFilters, ContentSource, Me};
use crate::auth::Credentials;
use crate::domain::{CardId, Domain};

pub struct HttpContentSource {
  base_url: String,
  client: reqwest::Client,
  credentials: Arc<dyn Credentials>,
}

impl HttpContentSource {
  /// `base_url` is the backend origin, e.g. `http://localhost:8080`
  pub fn new(base_url: &str, credentials: Arc<dyn Credentials>) -> Result<Self, ApiError> {
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    Ok(Self {
      base_url,
      client: reqwest::Client::new(),
      credentials,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    let full = format!("{}{}", self.base_url, path);
    Url::parse(&full).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", full, e)))
  }

  /// Send one request and decode the body leniently.
  ///
  /// 204 and bodies that are not JSON come back as `Value::Null`.
  async fn request(
    &self,
    method: Method,
    path: &str,
    query: &[(&'static str, String)],
    body: Option<Value>,
  ) -> Result<Value, ApiError> {
    let url = self.url(path)?;
    tracing::debug!("{} {}", method, url);

    let mut request = self.client.request(method, url);
    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(&body);
    }
    if let Some(token) = self.credentials.credential() {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
      self.credentials.on_unauthorized();
      return Err(ApiError::Unauthorized);
    }
    if status == StatusCode::NO_CONTENT {
      return Ok(Value::Null);
    }

    let text = response.text().await?;
    let data = parse_body(&text);

    if status == StatusCode::FORBIDDEN {
      return Err(ApiError::Forbidden(
        error_message(&data).unwrap_or_else(|| "Forbidden".to_string()),
      ));
    }
    if !status.is_success() {
      return Err(ApiError::Server {
        status: status.as_u16(),
        message: error_message(&data).unwrap_or_else(|| "Request failed".to_string()),
      });
    }

    Ok(data)
  }

  async fn post_flag(
    &self,
    domain: Domain,
    id: &CardId,
    action: &str,
    body: Value,
  ) -> Result<(), ApiError> {
    let path = format!("{}/{}", card_path(domain, id)?, action);
    self.request(Method::POST, &path, &[], Some(body)).await?;
    Ok(())
  }
}

/// Only all-digit ids go into a URL path
fn card_path(domain: Domain, id: &CardId) -> Result<String, ApiError> {
  if !id.is_server_id() {
    return Err(ApiError::LocalCardId(id.clone()));
  }
  Ok(format!("/api/{}/{}", domain, id))
}

fn parse_body(text: &str) -> Value {
  if text.trim().is_empty() {
    return Value::Null;
  }
  serde_json::from_str(text).unwrap_or(Value::Null)
}

/// `message`, then `error`, as long as it is a non-empty string
fn error_message(data: &Value) -> Option<String> {
  ["message", "error"]
    .iter()
    .filter_map(|field| data.get(*field).and_then(Value::as_str))
    .find(|msg| !msg.is_empty())
    .map(str::to_string)
}

#[async_trait]
impl ContentSource for HttpContentSource {
  async fn fetch_cards(&self, domain: Domain, filters: &CardFilters) -> Result<Value, ApiError> {
    let path = format!("/api/{}", domain);
    self
      .request(Method::GET, &path, &filters.query_pairs(domain), None)
      .await
  }

  async fn fetch_card_detail(&self, domain: Domain, id: &CardId) -> Result<Value, ApiError> {
    let path = card_path(domain, id)?;
    self.request(Method::GET, &path, &[], None).await
  }

  async fn fetch_topics(&self, domain: Domain) -> Result<Vec<String>, ApiError> {
    if domain.topic_param().is_none() {
      return Ok(Vec::new());
    }

    let path = format!("/api/{}/topics", domain);
    let data = self.request(Method::GET, &path, &[], None).await?;
    match serde_json::from_value(data) {
      Ok(topics) => Ok(topics),
      Err(e) => {
        tracing::debug!("Ignoring malformed topic list: {}", e);
        Ok(Vec::new())
      }
    }
  }

  async fn fetch_me(&self) -> Result<Me, ApiError> {
    let data = self.request(Method::GET, "/api/me", &[], None).await?;
    serde_json::from_value(data).map_err(|e| ApiError::UnexpectedBody(e.to_string()))
  }

  async fn post_answer(&self, domain: Domain, id: &CardId, correct: bool) -> Result<(), ApiError> {
    self
      .post_flag(domain, id, "answer", json!({ "correct": correct }))
      .await
  }

  async fn post_known(&self, domain: Domain, id: &CardId, known: bool) -> Result<(), ApiError> {
    self
      .post_flag(domain, id, "known", json!({ "known": known }))
      .await
  }

  async fn post_favorite(
    &self,
    domain: Domain,
    id: &CardId,
    favorite: bool,
  ) -> Result<(), ApiError> {
    self
      .post_flag(domain, id, "favorite", json!({ "favorite": favorite }))
      .await
  }
}
