//! Study pool selection and quiz choice sampling.
//!
//! The pool mixes every due card with a budget of new cards; the card shown
//! next is the earliest-due one. Level/topic/search filtering already
//! happened server side, so everything here works on the deck as given.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::config;
use crate::domain::{Card, CardKind, QuizDirection};

/// Cards whose due time has passed
pub fn due_cards<K: CardKind>(deck: &[Card<K>], now: DateTime<Utc>) -> Vec<&Card<K>> {
  deck.iter().filter(|c| c.srs.is_due(now)).collect()
}

/// Cards never successfully reviewed
pub fn new_cards<K: CardKind>(deck: &[Card<K>]) -> Vec<&Card<K>> {
  deck.iter().filter(|c| c.srs.is_new()).collect()
}

/// Due cards plus up to `new_limit - due` new cards not already due.
///
/// Falls back to the whole deck when that leaves nothing, so the learner is
/// never shown an empty screen while cards exist.
pub fn study_pool<K: CardKind>(
  deck: &[Card<K>],
  new_limit: usize,
  now: DateTime<Utc>,
) -> Vec<&Card<K>> {
  let mut pool = due_cards(deck, now);
  let remaining = new_limit.saturating_sub(pool.len());

  if remaining > 0 {
    let extra: Vec<&Card<K>> = new_cards(deck)
      .into_iter()
      .filter(|c| !c.srs.is_due(now))
      .take(remaining)
      .collect();
    pool.extend(extra);
  }

  if pool.is_empty() {
    deck.iter().collect()
  } else {
    pool
  }
}

/// Card to present next: the earliest due in the pool (or the whole deck
/// when `due_only` is off). Ties go to the card earlier in the deck.
pub fn next_card<K: CardKind>(
  deck: &[Card<K>],
  due_only: bool,
  new_limit: usize,
  now: DateTime<Utc>,
) -> Option<&Card<K>> {
  if due_only {
    study_pool(deck, new_limit, now)
      .into_iter()
      .min_by_key(|c| c.srs.due)
  } else {
    deck.iter().min_by_key(|c| c.srs.due)
  }
}

/// Due cards for the "review today" panel, in deck order
pub fn review_queue<K: CardKind>(
  deck: &[Card<K>],
  limit: usize,
  now: DateTime<Utc>,
) -> Vec<&Card<K>> {
  deck.iter().filter(|c| c.srs.is_due(now)).take(limit).collect()
}

/// Multiple choice options for one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizChoices {
  pub choices: Vec<String>,
  pub answer: String,
}

impl QuizChoices {
  pub fn is_correct(&self, choice: &str) -> bool {
    choice == self.answer
  }
}

/// Correct answer plus up to [`config::DISTRACTOR_COUNT`] answers sampled
/// without replacement from other cards, shuffled together.
///
/// Answer texts are distinct: other cards sharing the correct answer (or each
/// other's) are sampled once at most. Small decks just yield fewer distractors.
pub fn quiz_choices<K: CardKind, R: Rng + ?Sized>(
  card: &Card<K>,
  deck: &[Card<K>],
  direction: QuizDirection,
  rng: &mut R,
) -> QuizChoices {
  let answer = K::answer_text(&card.content, direction).to_string();

  let mut others: Vec<&str> = Vec::new();
  for c in deck.iter().filter(|c| c.id != card.id) {
    let text = K::answer_text(&c.content, direction);
    if text != answer && !others.contains(&text) {
      others.push(text);
    }
  }
  let mut choices: Vec<String> = others
    .choose_multiple(rng, config::DISTRACTOR_COUNT)
    .map(|text| text.to_string())
    .collect();

  choices.push(answer.clone());
  choices.shuffle(rng);

  QuizChoices { choices, answer }
}
