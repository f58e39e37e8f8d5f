//! Deck statistics for the dashboard panels

use chrono::{DateTime, Utc};

use crate::domain::{Card, CardKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeckStats {
  pub total: usize,
  /// Due now
  pub due: usize,
  /// Never successfully reviewed
  pub new: usize,
  /// Reviewed successfully at least once
  pub learned: usize,
  /// Meets the card kind's mastery rule
  pub mastered: usize,
  /// Flagged known on the server
  pub known: usize,
  pub correct_answers: u64,
  pub wrong_answers: u64,
}

impl DeckStats {
  pub fn compute<K: CardKind>(cards: &[Card<K>], now: DateTime<Utc>) -> Self {
    cards.iter().fold(Self::default(), |mut stats, card| {
      stats.total += 1;
      if card.srs.is_due(now) {
        stats.due += 1;
      }
      if card.srs.is_new() {
        stats.new += 1;
      } else {
        stats.learned += 1;
      }
      if card.is_mastered() {
        stats.mastered += 1;
      }
      if card.known {
        stats.known += 1;
      }
      stats.correct_answers += u64::from(card.correct_count);
      stats.wrong_answers += u64::from(card.wrong_count);
      stats
    })
  }

  /// Share of server-recorded answers that were correct
  pub fn accuracy(&self) -> f64 {
    let attempts = self.correct_answers + self.wrong_answers;
    if attempts > 0 {
      self.correct_answers as f64 / attempts as f64
    } else {
      0.0
    }
  }
}
