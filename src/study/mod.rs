//! Study session controller for one card kind.
//!
//! `StudyDeck` owns the merged deck and wires the pieces together: loads go
//! through the token guard and merge engine, grades go through the
//! scheduler, get persisted locally, then get queued for best-effort sync.

pub mod loader;

use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;

use crate::api::{CardFilters, ContentSource};
use crate::auth::UserIdentity;
use crate::config;
use crate::db::{LogOnError, ProgressStore, StoreKey};
use crate::deck::{Deck, DeckStats, merge};
use crate::domain::card::now_millis;
use crate::domain::{
  Card, CardId, CardKind, Domain, Grade, Grammar, QuizDirection, SchedulingState,
};
use crate::srs::{QuizChoices, next_card, quiz_choices, review_queue, schedule_at};
use crate::sync::SyncQueue;

pub use loader::{ContentLoadError, LoadGuard, LoadOutcome, LoadResult, decode_cards};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudyError {
  #[error("Card {0} is not in the deck")]
  CardNotFound(CardId),

  #[error("{0} cards cannot be marked favorite")]
  FavoriteUnsupported(Domain),

  #[error("Card {0} has no quiz")]
  NoQuiz(CardId),
}

/// Result of grading one card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Review {
  pub srs: SchedulingState,
  /// Reported to the server as a correct answer
  pub correct: bool,
  /// Card was promoted to known by this review
  pub promoted: bool,
}

pub struct StudyDeck<K: CardKind> {
  source: Arc<dyn ContentSource>,
  store: ProgressStore,
  key: StoreKey,
  sync: SyncQueue,
  guard: LoadGuard,
  deck: Deck<K>,
  filters: CardFilters,
  due_only: bool,
  new_limit: usize,
  last_error: Option<String>,
}

impl<K: CardKind> StudyDeck<K> {
  pub fn new(
    source: Arc<dyn ContentSource>,
    store: ProgressStore,
    identity: &UserIdentity,
    sync: SyncQueue,
  ) -> Self {
    Self {
      source,
      store,
      key: StoreKey::for_kind::<K>(identity),
      sync,
      guard: LoadGuard::default(),
      deck: Deck::default(),
      filters: CardFilters::default(),
      due_only: true,
      new_limit: config::DEFAULT_NEW_CARD_LIMIT,
      last_error: None,
    }
  }

  pub fn with_settings(mut self, due_only: bool, new_limit: usize) -> Self {
    self.due_only = due_only;
    self.new_limit = new_limit;
    self
  }

  // ==================== Accessors ====================

  pub fn deck(&self) -> &Deck<K> {
    &self.deck
  }

  pub fn card(&self, id: &CardId) -> Option<&Card<K>> {
    self.deck.get(id)
  }

  pub fn key(&self) -> &StoreKey {
    &self.key
  }

  pub fn filters(&self) -> &CardFilters {
    &self.filters
  }

  /// Message of the last failed load, cleared by the next applied one
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn due_only(&self) -> bool {
    self.due_only
  }

  pub fn set_due_only(&mut self, due_only: bool) {
    self.due_only = due_only;
  }

  pub fn new_limit(&self) -> usize {
    self.new_limit
  }

  pub fn set_new_limit(&mut self, new_limit: usize) {
    self.new_limit = new_limit;
  }

  // ==================== Loading ====================

  /// Begin fetching cards for `filters`.
  ///
  /// The returned future owns everything it needs; pass its output to
  /// [`StudyDeck::apply`]. Starting another load makes this one stale.
  pub fn start_load(
    &mut self,
    filters: CardFilters,
  ) -> impl Future<Output = LoadResult<K>> + Send + use<K> {
    self.filters = filters.clone();
    let token = self.guard.issue();
    let source = Arc::clone(&self.source);

    async move {
      let result = match source.fetch_cards(K::DOMAIN, &filters).await {
        Ok(body) => decode_cards::<K>(body),
        Err(e) => Err(ContentLoadError::from(e)),
      };
      LoadResult { token, result }
    }
  }

  pub fn apply(&mut self, loaded: LoadResult<K>) -> LoadOutcome {
    self.apply_at(loaded, now_millis())
  }

  /// Apply a finished load if it is still the latest one.
  ///
  /// On success the deck is rebuilt and every loaded card's locally owned
  /// entry is written back, so first-seen state sticks. On failure the deck
  /// is cleared and the store is left alone.
  pub fn apply_at(&mut self, loaded: LoadResult<K>, now: DateTime<Utc>) -> LoadOutcome {
    if !self.guard.is_current(loaded.token) {
      tracing::debug!("Discarding stale {} load #{}", K::DOMAIN, loaded.token);
      return LoadOutcome::Stale;
    }

    match loaded.result {
      Ok(remote) => {
        let local = self.store.read(&self.key);
        self.deck = merge(remote, &local, now);
        self.last_error = None;

        let entries = self
          .deck
          .cards()
          .iter()
          .map(|card| (card.id.clone(), card.persisted_entry()));
        self
          .store
          .upsert_entries(&self.key, entries)
          .log_warn(&format!("Saving {} progress", K::DOMAIN));

        tracing::info!("Loaded {} {} cards", self.deck.len(), K::DOMAIN);
        LoadOutcome::Applied(self.deck.len())
      }
      Err(e) => {
        tracing::warn!("Loading {} cards failed: {}", K::DOMAIN, e);
        self.deck = Deck::default();
        self.last_error = Some(e.to_string());
        LoadOutcome::Failed(e)
      }
    }
  }

  /// Start and apply a load in one go
  pub async fn load(&mut self, filters: CardFilters) -> LoadOutcome {
    let pending = self.start_load(filters);
    let loaded = pending.await;
    self.apply(loaded)
  }

  /// Load again with the current filters
  pub async fn reload(&mut self) -> LoadOutcome {
    self.load(self.filters.clone()).await
  }

  /// Topic names for the filter selector; empty on failure
  pub async fn topics(&self) -> Vec<String> {
    self
      .source
      .fetch_topics(K::DOMAIN)
      .await
      .log_warn_default(&format!("Loading {} topics", K::DOMAIN))
  }

  // ==================== Selection ====================

  pub fn current_card(&self) -> Option<&Card<K>> {
    self.current_card_at(now_millis())
  }

  pub fn current_card_at(&self, now: DateTime<Utc>) -> Option<&Card<K>> {
    next_card(self.deck.cards(), self.due_only, self.new_limit, now)
  }

  /// Due cards for the "review today" panel
  pub fn review_queue(&self) -> Vec<&Card<K>> {
    review_queue(self.deck.cards(), config::REVIEW_QUEUE_LIMIT, now_millis())
  }

  pub fn stats(&self) -> DeckStats {
    DeckStats::compute(self.deck.cards(), now_millis())
  }

  pub fn quiz_choices<R: Rng + ?Sized>(
    &self,
    id: &CardId,
    direction: QuizDirection,
    rng: &mut R,
  ) -> Result<QuizChoices, StudyError> {
    let card = self.require(id)?;
    Ok(quiz_choices(card, self.deck.cards(), direction, rng))
  }

  // ==================== Reviews ====================

  pub fn grade(&mut self, id: &CardId, grade: Grade) -> Result<Review, StudyError> {
    self.grade_at(id, grade, now_millis())
  }

  /// Schedule, persist, then queue the answer (and a known promotion when
  /// a positive grade leaves the card mastered).
  pub fn grade_at(
    &mut self,
    id: &CardId,
    grade: Grade,
    now: DateTime<Utc>,
  ) -> Result<Review, StudyError> {
    let card = self
      .deck
      .get_mut(id)
      .ok_or_else(|| StudyError::CardNotFound(id.clone()))?;

    card.srs = schedule_at(&card.srs, grade, now);
    let correct = grade.is_positive();
    let promoted = correct && card.is_mastered();
    if promoted {
      card.known = true;
    }
    let srs = card.srs;
    let entry = card.persisted_entry();

    self
      .store
      .save_entry(&self.key, id, entry)
      .log_warn(&format!("Saving progress for {} card {}", K::DOMAIN, id));

    self.sync.record_answer(K::DOMAIN, id, correct);
    if promoted {
      tracing::debug!("{} card {} mastered", K::DOMAIN, id);
      self.sync.set_known(K::DOMAIN, id, true);
    }

    Ok(Review {
      srs,
      correct,
      promoted,
    })
  }

  /// Grade a multiple choice answer: correct is "good", wrong is "again"
  pub fn answer_quiz(
    &mut self,
    id: &CardId,
    quiz: &QuizChoices,
    choice: &str,
  ) -> Result<Review, StudyError> {
    self.grade(id, Grade::from_quiz(quiz.is_correct(choice)))
  }

  // ==================== Flags ====================

  /// Flip `known` locally and queue the change; returns the new value
  pub fn toggle_known(&mut self, id: &CardId) -> Result<bool, StudyError> {
    let card = self
      .deck
      .get_mut(id)
      .ok_or_else(|| StudyError::CardNotFound(id.clone()))?;
    card.known = !card.known;
    let known = card.known;

    self.sync.set_known(K::DOMAIN, id, known);
    Ok(known)
  }

  pub fn toggle_favorite(&mut self, id: &CardId) -> Result<bool, StudyError> {
    if !K::SUPPORTS_FAVORITE {
      return Err(StudyError::FavoriteUnsupported(K::DOMAIN));
    }

    let card = self
      .deck
      .get_mut(id)
      .ok_or_else(|| StudyError::CardNotFound(id.clone()))?;
    card.favorite = !card.favorite;
    let favorite = card.favorite;

    self.sync.set_favorite(K::DOMAIN, id, favorite);
    Ok(favorite)
  }

  /// Forget all local scheduling state for this user and domain
  pub fn reset_progress(&mut self) {
    self.reset_progress_at(now_millis());
  }

  pub fn reset_progress_at(&mut self, now: DateTime<Utc>) {
    self
      .store
      .clear(&self.key)
      .log_warn(&format!("Clearing {} progress", K::DOMAIN));

    for card in self.deck.iter_mut() {
      card.srs = SchedulingState::new(now);
    }
    tracing::info!("Reset {} progress for {}", K::DOMAIN, self.key);
  }

  fn require(&self, id: &CardId) -> Result<&Card<K>, StudyError> {
    self
      .deck
      .get(id)
      .ok_or_else(|| StudyError::CardNotFound(id.clone()))
  }
}

impl StudyDeck<Grammar> {
  /// Answer the grammar point's own quiz by option index
  pub fn answer_fixed_quiz(&mut self, id: &CardId, option: usize) -> Result<Review, StudyError> {
    let quiz = self
      .require(id)?
      .content
      .quiz
      .as_ref()
      .ok_or_else(|| StudyError::NoQuiz(id.clone()))?;
    let correct = quiz.is_correct(option);
    self.grade(id, Grade::from_quiz(correct))
  }
}
