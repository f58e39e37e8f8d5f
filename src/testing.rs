//! Test utilities: an on-disk progress store in a temp dir and a
//! recording in-memory content source.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

use crate::api::{ApiError, CardFilters, ContentSource, Me};
use crate::db::ProgressStore;
use crate::domain::{CardId, Domain};

/// Temporary directory holding a progress database.
///
/// The directory (and the database file) is removed on drop.
pub struct TestEnv {
    pub temp: TempDir,
    pub store: ProgressStore,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let store = ProgressStore::open(&temp.path().join("progress.db"))?;
        Ok(Self { temp, store })
    }

    /// A second handle on the same database file, as after a restart
    pub fn reopen(&self) -> rusqlite::Result<ProgressStore> {
        ProgressStore::open(&self.temp.path().join("progress.db"))
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// One call received by [`MockSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchCards(Domain, Vec<(&'static str, String)>),
    Answer(Domain, CardId, bool),
    Known(Domain, CardId, bool),
    Favorite(Domain, CardId, bool),
}

impl Call {
    fn is_post(&self) -> bool {
        !matches!(self, Call::FetchCards(..))
    }
}

/// In-memory [`ContentSource`] that records every call
#[derive(Default)]
pub struct MockSource {
    cards: Mutex<HashMap<Domain, Value>>,
    topics: Vec<String>,
    me: Option<String>,
    fail_fetches: AtomicBool,
    fail_posts: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_me(mut self, id: &str) -> Self {
        self.me = Some(id.to_string());
        self
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_cards(self, domain: Domain, body: Value) -> Self {
        self.set_cards(domain, body);
        self
    }

    /// Body returned by the next `fetch_cards` for `domain`
    pub fn set_cards(&self, domain: Domain, body: Value) {
        self.cards.lock().unwrap().insert(domain, body);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Outbound writes only, in the order received
    pub fn posts(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_post).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn post_result(&self) -> Result<(), ApiError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            Err(ApiError::Server {
                status: 503,
                message: "Service unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn fetch_cards(&self, domain: Domain, filters: &CardFilters) -> Result<Value, ApiError> {
        self.record(Call::FetchCards(domain, filters.query_pairs(domain)));
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ApiError::Server {
                status: 500,
                message: "Request failed".to_string(),
            });
        }
        Ok(self
            .cards
            .lock()
            .unwrap()
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    async fn fetch_card_detail(&self, domain: Domain, id: &CardId) -> Result<Value, ApiError> {
        let cards = self.cards.lock().unwrap();
        cards
            .get(&domain)
            .and_then(Value::as_array)
            .and_then(|items| {
                items
                    .iter()
                    .find(|item| item["id"].to_string().trim_matches('"') == id.as_str())
            })
            .cloned()
            .ok_or(ApiError::Server {
                status: 404,
                message: "Not found".to_string(),
            })
    }

    async fn fetch_topics(&self, domain: Domain) -> Result<Vec<String>, ApiError> {
        if domain.topic_param().is_none() {
            return Ok(Vec::new());
        }
        Ok(self.topics.clone())
    }

    async fn fetch_me(&self) -> Result<Me, ApiError> {
        match &self.me {
            Some(id) => Ok(Me { id: id.clone() }),
            None => Err(ApiError::Unauthorized),
        }
    }

    async fn post_answer(&self, domain: Domain, id: &CardId, correct: bool) -> Result<(), ApiError> {
        self.record(Call::Answer(domain, id.clone(), correct));
        self.post_result()
    }

    async fn post_known(&self, domain: Domain, id: &CardId, known: bool) -> Result<(), ApiError> {
        self.record(Call::Known(domain, id.clone(), known));
        self.post_result()
    }

    async fn post_favorite(
        &self,
        domain: Domain,
        id: &CardId,
        favorite: bool,
    ) -> Result<(), ApiError> {
        self.record(Call::Favorite(domain, id.clone(), favorite));
        self.post_result()
    }
}
