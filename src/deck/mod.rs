//! The in-memory deck: server cards merged with local scheduling state.

pub mod merge;
pub mod stats;

use crate::domain::{Card, CardId, CardKind};

pub use merge::merge;
pub use stats::DeckStats;

/// Cards loaded for one (user, filter set). Rebuilt wholesale on every
/// content load; only per-card fields change in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck<K: CardKind> {
  cards: Vec<Card<K>>,
}

impl<K: CardKind> Default for Deck<K> {
  fn default() -> Self {
    Self { cards: Vec::new() }
  }
}

impl<K: CardKind> Deck<K> {
  pub fn new(cards: Vec<Card<K>>) -> Self {
    Self { cards }
  }

  pub fn cards(&self) -> &[Card<K>] {
    &self.cards
  }

  pub fn len(&self) -> usize {
    self.cards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cards.is_empty()
  }

  pub fn get(&self, id: &CardId) -> Option<&Card<K>> {
    self.cards.iter().find(|c| &c.id == id)
  }

  pub fn get_mut(&mut self, id: &CardId) -> Option<&mut Card<K>> {
    self.cards.iter_mut().find(|c| &c.id == id)
  }

  pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Card<K>> {
    self.cards.iter_mut()
  }
}
