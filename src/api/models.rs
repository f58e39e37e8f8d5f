use serde::Deserialize;

use crate::config;
use crate::domain::Domain;
use crate::domain::lenient;

/// Server-side deck filters picked in the study view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilters {
  /// Free-text search
  pub query: String,
  /// CEFR tag for vocabulary, level for grammar; `ALL` means any
  pub level: Option<String>,
  /// Topic (lesson) id, vocabulary only; `ALL` means any
  pub topic: Option<String>,
}

impl CardFilters {
  pub fn with_query(mut self, query: impl Into<String>) -> Self {
    self.query = query.into();
    self
  }

  pub fn with_level(mut self, level: impl Into<String>) -> Self {
    self.level = Some(level.into());
    self
  }

  pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
    self.topic = Some(topic.into());
    self
  }

  /// Request parameters for `domain`, in the order the endpoint documents
  /// them. Blank values and the `ALL` sentinel are left out.
  pub fn query_pairs(&self, domain: Domain) -> Vec<(&'static str, String)> {
    let query = trimmed(Some(&self.query)).map(|q| ("q", q));
    let level = selected(self.level.as_deref()).map(|l| (domain.level_param(), l));
    let topic = domain
      .topic_param()
      .and_then(|param| selected(self.topic.as_deref()).map(|t| (param, t)));

    let ordered = match domain {
      Domain::Vocabulary => [query, level, topic],
      Domain::Grammar => [level, query, topic],
    };
    ordered.into_iter().flatten().collect()
  }
}

fn trimmed(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

fn selected(value: Option<&str>) -> Option<String> {
  trimmed(value).filter(|v| !v.eq_ignore_ascii_case(config::FILTER_ALL))
}

/// Body of `GET /api/me`; only the id matters here
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Me {
  #[serde(deserialize_with = "lenient::string_or_number")]
  pub id: String,
}
