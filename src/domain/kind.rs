//! The two study domains and what differs between them.
//!
//! Vocabulary words and grammar points share one scheduler, merge and
//! selection path. Everything that is domain specific (content shape, wire
//! shape, storage namespace, mastery rule) hangs off [`CardKind`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;

use super::card::{Card, Example, PersistedEntry};
use super::lenient;
use crate::config;

/// Backend content area; also the path segment of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
  Vocabulary,
  Grammar,
}

impl Domain {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Vocabulary => "vocabulary",
      Self::Grammar => "grammar",
    }
  }

  /// Query parameter carrying the CEFR level filter
  pub fn level_param(&self) -> &'static str {
    match self {
      Self::Vocabulary => "cefr",
      Self::Grammar => "level",
    }
  }

  /// Query parameter carrying the topic filter, if the domain has topics
  pub fn topic_param(&self) -> Option<&'static str> {
    match self {
      Self::Vocabulary => Some("lessonId"),
      Self::Grammar => None,
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which side of the card is the prompt in quiz mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizDirection {
  /// Show the word/title, ask for the meaning
  #[default]
  Forward,
  /// Show the meaning, ask for the word/title
  Reverse,
}

pub trait CardKind: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
  type Content: Clone + fmt::Debug + PartialEq + Send + Sync;
  /// Content fields exactly as the backend sends them
  type Wire: DeserializeOwned + Send;

  const DOMAIN: Domain;
  const STORAGE_PREFIX: &'static str;
  const SUPPORTS_FAVORITE: bool;

  fn content_from_wire(wire: Self::Wire) -> Self::Content;

  /// Text a quiz expects as the answer for this card
  fn answer_text(content: &Self::Content, direction: QuizDirection) -> &str;

  /// Mastery rule; a positive grade on a mastered card promotes it to
  /// "known" on the server.
  fn is_mastered(card: &Card<Self>) -> bool;

  /// Overlay locally cached content on freshly fetched content
  fn apply_cached(_content: &mut Self::Content, _entry: &PersistedEntry) {}
}

fn or_default_level(level: Option<String>) -> String {
  level
    .filter(|l| !l.trim().is_empty())
    .unwrap_or_else(|| config::DEFAULT_LEVEL.to_string())
}

// ==================== Vocabulary ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary;

#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyContent {
  pub word: String,
  pub meaning: String,
  pub examples: Vec<Example>,
  pub pronunciation: String,
  pub pos: String,
  pub cefr: String,
  pub topic: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VocabularyWire {
  pub word: Option<String>,
  pub meaning: Option<String>,
  pub example: Option<String>,
  pub pronunciation: Option<String>,
  pub pos: Option<String>,
  pub cefr: Option<String>,
  pub topic: Option<String>,
}

impl CardKind for Vocabulary {
  type Content = VocabularyContent;
  type Wire = VocabularyWire;

  const DOMAIN: Domain = Domain::Vocabulary;
  const STORAGE_PREFIX: &'static str = config::VOCABULARY_STORAGE_PREFIX;
  const SUPPORTS_FAVORITE: bool = true;

  fn content_from_wire(wire: VocabularyWire) -> VocabularyContent {
    let examples = wire
      .example
      .filter(|e| !e.is_empty())
      .map(|en| vec![Example { en, vi: String::new() }])
      .unwrap_or_default();

    VocabularyContent {
      word: wire.word.unwrap_or_default(),
      meaning: wire.meaning.unwrap_or_default(),
      examples,
      pronunciation: wire.pronunciation.unwrap_or_default(),
      pos: wire.pos.unwrap_or_default(),
      cefr: or_default_level(wire.cefr),
      topic: wire.topic.unwrap_or_default(),
    }
  }

  fn answer_text(content: &VocabularyContent, direction: QuizDirection) -> &str {
    match direction {
      QuizDirection::Forward => &content.meaning,
      QuizDirection::Reverse => &content.word,
    }
  }

  fn is_mastered(card: &Card<Self>) -> bool {
    card.srs.reps >= config::VOCABULARY_KNOWN_REPS
  }

  fn apply_cached(content: &mut VocabularyContent, entry: &PersistedEntry) {
    if let Some(examples) = &entry.examples {
      if !examples.is_empty() {
        content.examples = examples.clone();
      }
    }
  }
}

// ==================== Grammar ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GrammarForm {
  pub subject: String,
  pub verb: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommonMistake {
  pub wrong: String,
  pub right: String,
  pub note: Option<String>,
}

/// Fixed multiple choice question attached to a grammar point
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GrammarQuiz {
  pub question: String,
  pub options: Vec<String>,
  /// Index into `options`
  pub correct: usize,
  pub explain: Option<String>,
}

impl GrammarQuiz {
  pub fn is_correct(&self, option: usize) -> bool {
    option == self.correct && option < self.options.len()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrammarContent {
  pub level: String,
  pub title: String,
  pub meaning: String,
  pub summary: String,
  pub rules: Vec<String>,
  pub forms: Vec<GrammarForm>,
  pub common_mistakes: Vec<CommonMistake>,
  pub examples: Vec<Example>,
  pub quiz: Option<GrammarQuiz>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrammarWire {
  pub level: Option<String>,
  pub title: Option<String>,
  pub meaning: Option<String>,
  pub summary: Option<String>,
  #[serde(deserialize_with = "lenient::vec_or_empty")]
  pub rules: Vec<String>,
  #[serde(deserialize_with = "lenient::vec_or_empty")]
  pub forms: Vec<GrammarForm>,
  #[serde(deserialize_with = "lenient::vec_or_empty")]
  pub common_mistakes: Vec<CommonMistake>,
  #[serde(deserialize_with = "lenient::vec_or_empty")]
  pub examples: Vec<Example>,
  #[serde(deserialize_with = "lenient::opt_or_none")]
  pub quiz: Option<GrammarQuiz>,
}

impl CardKind for Grammar {
  type Content = GrammarContent;
  type Wire = GrammarWire;

  const DOMAIN: Domain = Domain::Grammar;
  const STORAGE_PREFIX: &'static str = config::GRAMMAR_STORAGE_PREFIX;
  const SUPPORTS_FAVORITE: bool = false;

  fn content_from_wire(wire: GrammarWire) -> GrammarContent {
    GrammarContent {
      level: or_default_level(wire.level),
      title: wire.title.unwrap_or_default(),
      meaning: wire.meaning.unwrap_or_default(),
      summary: wire.summary.unwrap_or_default(),
      rules: wire.rules,
      forms: wire.forms,
      common_mistakes: wire.common_mistakes,
      examples: wire.examples,
      quiz: wire.quiz,
    }
  }

  fn answer_text(content: &GrammarContent, direction: QuizDirection) -> &str {
    match direction {
      QuizDirection::Forward => &content.meaning,
      QuizDirection::Reverse => &content.title,
    }
  }

  // Server "known" wins, otherwise enough reps or a long enough interval
  fn is_mastered(card: &Card<Self>) -> bool {
    card.known
      || card.srs.reps >= config::GRAMMAR_MASTERED_REPS
      || card.srs.interval >= config::GRAMMAR_MASTERED_INTERVAL_DAYS
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::card::{RemoteCard, SchedulingState};
  use chrono::Utc;
  use serde_json::json;

  fn vocab_card(reps: u32, known: bool) -> Card<Vocabulary> {
    let remote: RemoteCard<VocabularyWire> =
      serde_json::from_value(json!({ "id": 1, "word": "run", "known": known })).unwrap();
    let mut card = Card::from_remote(remote, Utc::now());
    card.srs.reps = reps;
    card
  }

  fn grammar_card(reps: u32, interval: u32, known: bool) -> Card<Grammar> {
    let remote: RemoteCard<GrammarWire> =
      serde_json::from_value(json!({ "id": 2, "title": "Present simple", "known": known }))
        .unwrap();
    let mut card = Card::from_remote(remote, Utc::now());
    card.srs = SchedulingState {
      reps,
      interval,
      ..card.srs
    };
    card
  }

  // Domain tests

  #[test]
  fn test_domain_params() {
    assert_eq!(Domain::Vocabulary.as_str(), "vocabulary");
    assert_eq!(Domain::Grammar.as_str(), "grammar");
    assert_eq!(Domain::Vocabulary.level_param(), "cefr");
    assert_eq!(Domain::Grammar.level_param(), "level");
    assert_eq!(Domain::Vocabulary.topic_param(), Some("lessonId"));
    assert_eq!(Domain::Grammar.topic_param(), None);
  }

  // Vocabulary tests

  #[test]
  fn test_vocabulary_from_wire_full() {
    let remote: RemoteCard<VocabularyWire> = serde_json::from_value(json!({
      "id": 10,
      "word": "apple",
      "meaning": "quả táo",
      "example": "I eat an apple.",
      "pronunciation": "/ˈæp.əl/",
      "pos": "noun",
      "cefr": "A2",
      "topic": "food",
      "known": true,
      "favorite": false,
      "correctCount": 3,
      "wrongCount": 1
    }))
    .unwrap();
    let card: Card<Vocabulary> = Card::from_remote(remote, Utc::now());

    assert_eq!(card.id.as_str(), "10");
    assert_eq!(card.content.word, "apple");
    assert_eq!(card.content.cefr, "A2");
    assert_eq!(card.content.examples.len(), 1);
    assert_eq!(card.content.examples[0].en, "I eat an apple.");
    assert_eq!(card.content.examples[0].vi, "");
    assert!(card.known);
    assert_eq!(card.correct_count, 3);
    assert_eq!(card.wrong_count, 1);
    assert!(card.srs.is_new());
  }

  #[test]
  fn test_vocabulary_from_wire_defaults() {
    let remote: RemoteCard<VocabularyWire> =
      serde_json::from_value(json!({ "id": "5", "cefr": "", "example": null })).unwrap();
    let card: Card<Vocabulary> = Card::from_remote(remote, Utc::now());
    assert_eq!(card.content.word, "");
    assert_eq!(card.content.cefr, "A1");
    assert!(card.content.examples.is_empty());
    assert!(!card.known);
    assert!(!card.favorite);
  }

  #[test]
  fn test_vocabulary_answer_text() {
    let mut card = vocab_card(0, false);
    card.content.meaning = "chạy".to_string();
    assert_eq!(Vocabulary::answer_text(&card.content, QuizDirection::Forward), "chạy");
    assert_eq!(Vocabulary::answer_text(&card.content, QuizDirection::Reverse), "run");
  }

  #[test]
  fn test_vocabulary_mastery_is_three_reps() {
    assert!(!vocab_card(2, false).is_mastered());
    assert!(vocab_card(3, false).is_mastered());
    // server flag alone does not count for vocabulary
    assert!(!vocab_card(0, true).is_mastered());
  }

  #[test]
  fn test_vocabulary_apply_cached_examples() {
    let mut content = vocab_card(0, false).content;
    let entry = PersistedEntry {
      examples: Some(vec![
        Example { en: "Run!".to_string(), vi: "Chạy!".to_string() },
        Example { en: "I run daily.".to_string(), vi: String::new() },
      ]),
      ..Default::default()
    };
    Vocabulary::apply_cached(&mut content, &entry);
    assert_eq!(content.examples.len(), 2);

    // empty cache keeps server examples
    let mut content = vocab_card(0, false).content;
    content.examples = vec![Example { en: "server".to_string(), vi: String::new() }];
    let entry = PersistedEntry { examples: Some(vec![]), ..Default::default() };
    Vocabulary::apply_cached(&mut content, &entry);
    assert_eq!(content.examples[0].en, "server");
  }

  // Grammar tests

  #[test]
  fn test_grammar_from_wire_full() {
    let remote: RemoteCard<GrammarWire> = serde_json::from_value(json!({
      "id": 3,
      "level": "B1",
      "title": "Present perfect",
      "meaning": "Hiện tại hoàn thành",
      "summary": "have/has + V3",
      "rules": ["Use for experiences"],
      "forms": [{ "subject": "I/You/We/They", "verb": "have done" }],
      "commonMistakes": [{ "wrong": "I have went", "right": "I have gone" }],
      "examples": [{ "en": "I have seen it.", "vi": "Tôi đã thấy nó." }],
      "quiz": { "question": "Pick one", "options": ["a", "b"], "correct": 1, "explain": "b" },
      "lastReviewedAt": "2024-01-01T00:00:00Z"
    }))
    .unwrap();
    let card: Card<Grammar> = Card::from_remote(remote, Utc::now());

    assert_eq!(card.content.level, "B1");
    assert_eq!(card.content.rules.len(), 1);
    assert_eq!(card.content.forms[0].verb, "have done");
    assert_eq!(card.content.common_mistakes[0].note, None);
    assert_eq!(card.content.examples[0].vi, "Tôi đã thấy nó.");
    assert_eq!(card.last_reviewed_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    let quiz = card.content.quiz.unwrap();
    assert!(quiz.is_correct(1));
    assert!(!quiz.is_correct(0));
  }

  #[test]
  fn test_grammar_from_wire_tolerates_bad_lists() {
    let remote: RemoteCard<GrammarWire> = serde_json::from_value(json!({
      "id": 4,
      "rules": "not a list",
      "forms": null,
      "quiz": "nope"
    }))
    .unwrap();
    let card: Card<Grammar> = Card::from_remote(remote, Utc::now());
    assert!(card.content.rules.is_empty());
    assert!(card.content.forms.is_empty());
    assert!(card.content.quiz.is_none());
    assert_eq!(card.content.level, "A1");
  }

  #[test]
  fn test_grammar_quiz_out_of_range_option() {
    let quiz = GrammarQuiz {
      question: "?".to_string(),
      options: vec!["x".to_string()],
      correct: 3,
      explain: None,
    };
    assert!(!quiz.is_correct(3));
  }

  #[test]
  fn test_grammar_mastery_rule() {
    assert!(!grammar_card(4, 6, false).is_mastered());
    assert!(grammar_card(5, 0, false).is_mastered());
    assert!(grammar_card(1, 7, false).is_mastered());
    assert!(grammar_card(0, 0, true).is_mastered());
  }

  #[test]
  fn test_grammar_answer_text() {
    let mut card = grammar_card(0, 0, false);
    card.content.meaning = "Thì hiện tại đơn".to_string();
    assert_eq!(Grammar::answer_text(&card.content, QuizDirection::Forward), "Thì hiện tại đơn");
    assert_eq!(Grammar::answer_text(&card.content, QuizDirection::Reverse), "Present simple");
  }
}
