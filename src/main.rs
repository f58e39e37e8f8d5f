use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learn_srs::api::{CardFilters, ContentSource, HttpContentSource};
use learn_srs::auth::{self, Session};
use learn_srs::config;
use learn_srs::db::ProgressStore;
use learn_srs::domain::{CardKind, Grammar, Vocabulary};
use learn_srs::study::{LoadOutcome, StudyDeck};
use learn_srs::sync::SyncQueue;

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "learn_srs=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cfg = config::load();

  let store = ProgressStore::open(&cfg.db_path).expect("Failed to open progress store");
  let session = Arc::new(Session::new(cfg.api_token.clone()));
  let source: Arc<dyn ContentSource> = Arc::new(
    HttpContentSource::new(&cfg.api_url, session.clone()).expect("Invalid API URL"),
  );
  let (sync, worker) = SyncQueue::spawn(source.clone());

  if !session.is_authenticated() {
    tracing::warn!("No API token configured; requests are sent unauthenticated");
  }
  let identity = auth::resolve_identity(source.as_ref()).await;
  tracing::info!("Using progress of {:?} from {}", identity, cfg.db_path.display());

  let mut vocabulary: StudyDeck<Vocabulary> =
    StudyDeck::new(source.clone(), store.clone(), &identity, sync.clone())
      .with_settings(cfg.due_only, cfg.new_card_limit);
  let mut grammar: StudyDeck<Grammar> = StudyDeck::new(source, store, &identity, sync)
    .with_settings(cfg.due_only, cfg.new_card_limit);

  summarize(&mut vocabulary).await;
  summarize(&mut grammar).await;

  let topics = vocabulary.topics().await;
  if !topics.is_empty() {
    tracing::info!("Vocabulary topics: {}", topics.join(", "));
  }

  // Last queue handles live in the decks
  drop(vocabulary);
  drop(grammar);
  match worker.await {
    Ok(report) => tracing::debug!("Sync finished: {} sent, {} failed", report.sent, report.failed),
    Err(e) => tracing::error!("Sync worker crashed: {}", e),
  }
}

async fn summarize<K: CardKind>(deck: &mut StudyDeck<K>) {
  match deck.load(CardFilters::default()).await {
    LoadOutcome::Applied(_) => {
      let stats = deck.stats();
      tracing::info!(
        "{}: {} cards, {} due, {} new, {} learned, {} mastered, {} known",
        K::DOMAIN,
        stats.total,
        stats.due,
        stats.new,
        stats.learned,
        stats.mastered,
        stats.known
      );
      match deck.current_card() {
        Some(card) => tracing::info!("Next {} card: {} (due {})", K::DOMAIN, card.id, card.srs.due),
        None => tracing::info!("No {} cards to study", K::DOMAIN),
      }
    }
    LoadOutcome::Stale => {}
    LoadOutcome::Failed(e) => tracing::error!("Could not load {} cards: {}", K::DOMAIN, e),
  }
}
