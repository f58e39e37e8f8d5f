use chrono::{DateTime, Utc};

use super::Deck;
use crate::db::ProgressMap;
use crate::domain::{Card, CardKind, PersistedEntry, RemoteCard};

/// Build the deck from a server snapshot and the locally stored entries.
///
/// Server cards define membership, content and flags. A stored entry only
/// contributes the locally owned fields: scheduling state, first-seen time
/// and cached content. Stored entries for cards missing from the snapshot
/// are ignored here and left in the store.
pub fn merge<K: CardKind>(
  server_cards: Vec<RemoteCard<K::Wire>>,
  local: &ProgressMap,
  now: DateTime<Utc>,
) -> Deck<K> {
  let cards = server_cards
    .into_iter()
    .map(|remote| {
      let entry = local.get(&remote.id);
      merge_card(Card::from_remote(remote, now), entry)
    })
    .collect();

  Deck::new(cards)
}

fn merge_card<K: CardKind>(mut card: Card<K>, entry: Option<&PersistedEntry>) -> Card<K> {
  let Some(entry) = entry else {
    return card;
  };

  if let Some(srs) = entry.srs.filter(|s| s.is_well_formed()) {
    card.srs = srs;
  }
  if let Some(created_at) = entry.created_at {
    card.created_at = created_at;
  }
  K::apply_cached(&mut card.content, entry);

  card
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{
    CardId, Example, Grade, Grammar, RemoteCard, SchedulingState, Vocabulary,
  };
  use crate::srs::schedule_at;
  use chrono::{Duration, TimeZone};
  use serde::de::DeserializeOwned;
  use serde_json::{Value, json};

  fn t0() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
  }

  fn remote<W: DeserializeOwned>(value: Value) -> Vec<RemoteCard<W>> {
    serde_json::from_value(value).unwrap()
  }

  fn vocab_snapshot() -> Value {
    json!([
      { "id": 1, "word": "cat", "meaning": "con mèo", "example": "The cat sleeps.",
        "known": true, "correctCount": 4, "wrongCount": 1 },
      { "id": 2, "word": "dog", "meaning": "con chó", "favorite": true },
      { "id": 3, "word": "bird", "meaning": "con chim" }
    ])
  }

  fn stored(reps: u32, interval: u32, due: DateTime<Utc>, created: DateTime<Utc>) -> PersistedEntry {
    PersistedEntry::new(
      SchedulingState {
        reps,
        ease: 2.36,
        interval,
        due,
        lapses: 1,
      },
      created,
    )
  }

  #[test]
  fn test_fresh_cards_get_default_state() {
    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &ProgressMap::new(), t0());
    assert_eq!(deck.len(), 3);
    for card in deck.cards() {
      assert_eq!(card.srs, SchedulingState::new(t0()));
      assert_eq!(card.created_at, t0());
    }
  }

  #[test]
  fn test_server_fields_come_from_server() {
    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &ProgressMap::new(), t0());
    let cat = deck.get(&CardId::from("1")).unwrap();
    assert!(cat.known);
    assert_eq!(cat.correct_count, 4);
    assert_eq!(cat.wrong_count, 1);
    assert_eq!(cat.content.examples[0].en, "The cat sleeps.");
    assert!(deck.get(&CardId::from("2")).unwrap().favorite);
  }

  #[test]
  fn test_local_state_overrides_only_local_fields() {
    let mut local = ProgressMap::new();
    let due = t0() + Duration::days(4);
    let created = t0() - Duration::days(30);
    local.insert(CardId::from("1"), stored(2, 4, due, created));

    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    let cat = deck.get(&CardId::from("1")).unwrap();
    assert_eq!(cat.srs.reps, 2);
    assert_eq!(cat.srs.interval, 4);
    assert_eq!(cat.srs.due, due);
    assert_eq!(cat.created_at, created);
    // known comes from the server even though local says nothing about it
    assert!(cat.known);
    assert_eq!(cat.content.word, "cat");
  }

  #[test]
  fn test_cached_examples_replace_server_examples_when_present() {
    let mut local = ProgressMap::new();
    local.insert(
      CardId::from("1"),
      PersistedEntry {
        examples: Some(vec![
          Example { en: "A cat.".to_string(), vi: "Một con mèo.".to_string() },
          Example { en: "Two cats.".to_string(), vi: "Hai con mèo.".to_string() },
        ]),
        ..Default::default()
      },
    );
    local.insert(
      CardId::from("2"),
      PersistedEntry {
        examples: Some(vec![]),
        ..Default::default()
      },
    );

    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    assert_eq!(deck.get(&CardId::from("1")).unwrap().content.examples.len(), 2);
    // an empty cache never wipes what the server sent
    assert!(deck.get(&CardId::from("2")).unwrap().content.examples.is_empty());
    // and an entry without srs still yields the default state
    assert_eq!(
      deck.get(&CardId::from("1")).unwrap().srs,
      SchedulingState::new(t0())
    );
  }

  #[test]
  fn test_ill_formed_local_state_is_replaced_by_default() {
    let mut local = ProgressMap::new();
    let mut entry = stored(3, 9, t0(), t0());
    if let Some(srs) = entry.srs.as_mut() {
      srs.ease = 0.4;
    }
    local.insert(CardId::from("3"), entry);

    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    assert_eq!(
      deck.get(&CardId::from("3")).unwrap().srs,
      SchedulingState::new(t0())
    );
  }

  #[test]
  fn test_local_only_cards_are_dropped() {
    let mut local = ProgressMap::new();
    local.insert(CardId::from("99"), stored(5, 20, t0(), t0()));

    let deck: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    assert_eq!(deck.len(), 3);
    assert!(deck.get(&CardId::from("99")).is_none());
    // the entry itself is untouched
    assert!(local.contains_key(&CardId::from("99")));
  }

  #[test]
  fn test_merge_is_idempotent() {
    let mut local = ProgressMap::new();
    local.insert(CardId::from("2"), stored(1, 1, t0(), t0() - Duration::days(1)));

    let first: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    let second: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, t0());
    assert_eq!(first, second);
  }

  #[test]
  fn test_graded_state_survives_next_merge() {
    let first: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &ProgressMap::new(), t0());
    let card = first.get(&CardId::from("3")).unwrap();
    let graded = schedule_at(&card.srs, Grade::Good, t0());

    let mut local = ProgressMap::new();
    local.insert(card.id.clone(), PersistedEntry::new(graded, card.created_at));

    let later = t0() + Duration::minutes(5);
    let second: Deck<Vocabulary> = merge(remote(vocab_snapshot()), &local, later);
    let merged = second.get(&CardId::from("3")).unwrap();
    assert_eq!(merged.srs, graded);
    assert_eq!(merged.created_at, t0());
  }

  #[test]
  fn test_grammar_merge() {
    let snapshot = json!([
      { "id": 10, "level": "B1", "title": "Past perfect", "meaning": "Quá khứ hoàn thành",
        "quiz": { "question": "?", "options": ["a", "b"], "correct": 1, "explain": "" } },
      { "id": 11, "title": "Articles", "known": true }
    ]);
    let mut local = ProgressMap::new();
    local.insert(CardId::from("10"), stored(5, 12, t0(), t0()));

    let deck: Deck<Grammar> = merge(remote(snapshot), &local, t0());
    let perfect = deck.get(&CardId::from("10")).unwrap();
    assert_eq!(perfect.srs.reps, 5);
    assert!(perfect.is_mastered());
    let articles = deck.get(&CardId::from("11")).unwrap();
    assert_eq!(articles.content.level, "A1");
    assert!(articles.is_mastered());
  }

  #[test]
  fn test_empty_snapshot_gives_empty_deck() {
    let mut local = ProgressMap::new();
    local.insert(CardId::from("1"), stored(1, 1, t0(), t0()));
    let deck: Deck<Grammar> = merge(Vec::new(), &local, t0());
    assert!(deck.is_empty());
  }
}
