pub mod card;
pub mod kind;
pub mod lenient;
pub mod review;

pub use card::{Card, CardId, Example, PersistedEntry, RemoteCard, SchedulingState, ServerProgress};
pub use kind::{
  CardKind, CommonMistake, Domain, Grammar, GrammarContent, GrammarForm, GrammarQuiz, QuizDirection,
  Vocabulary, VocabularyContent,
};
pub use review::{Grade, InvalidGrade};
