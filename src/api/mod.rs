//! Remote content source: the backend that owns card content and the
//! server-side progress flags.

pub mod client;
pub mod models;

use serde_json::Value;

use crate::domain::{CardId, Domain};

pub use client::HttpContentSource;
pub use models::{CardFilters, Me};

/// Errors talking to the backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("{message} (status {status})")]
  Server { status: u16, message: String },

  #[error("Invalid API URL: {0}")]
  InvalidUrl(String),

  #[error("Unexpected response body: {0}")]
  UnexpectedBody(String),

  #[error("Not a server card id: {0}")]
  LocalCardId(CardId),
}

impl ApiError {
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, ApiError::Unauthorized)
  }
}

/// Operations the study core needs from the backend.
///
/// Card listings come back as raw JSON so that each card kind decodes its
/// own wire shape and a malformed body can be reported as such.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
  /// Cards matching `filters`, with server progress flags
  async fn fetch_cards(&self, domain: Domain, filters: &CardFilters) -> Result<Value, ApiError>;

  async fn fetch_card_detail(&self, domain: Domain, id: &CardId) -> Result<Value, ApiError>;

  /// Topic names for the filter selector; empty for domains without topics
  async fn fetch_topics(&self, domain: Domain) -> Result<Vec<String>, ApiError>;

  async fn fetch_me(&self) -> Result<Me, ApiError>;

  async fn post_answer(&self, domain: Domain, id: &CardId, correct: bool) -> Result<(), ApiError>;

  async fn post_known(&self, domain: Domain, id: &CardId, known: bool) -> Result<(), ApiError>;

  async fn post_favorite(&self, domain: Domain, id: &CardId, favorite: bool)
  -> Result<(), ApiError>;
}
