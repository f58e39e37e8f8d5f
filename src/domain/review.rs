use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Recall quality reported by the learner for one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
  Again,
  Hard,
  Good,
  Easy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid grade '{0}' (expected again, hard, good or easy)")]
pub struct InvalidGrade(pub String);

impl Grade {
  pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  /// Only "good" and "easy" count as a correct answer for the server.
  /// "hard" keeps the card scheduled but is reported as a miss.
  pub fn is_positive(&self) -> bool {
    matches!(self, Self::Good | Self::Easy)
  }

  /// Quiz answers map onto the two extreme grades
  pub fn from_quiz(correct: bool) -> Self {
    if correct { Self::Good } else { Self::Again }
  }

  /// Keyboard shortcut mapping used by the flashcard view (1-4)
  pub fn from_key(key: char) -> Option<Self> {
    match key {
      '1' => Some(Self::Again),
      '2' => Some(Self::Hard),
      '3' => Some(Self::Good),
      '4' => Some(Self::Easy),
      _ => None,
    }
  }
}

impl FromStr for Grade {
  type Err = InvalidGrade;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "again" => Ok(Self::Again),
      "hard" => Ok(Self::Hard),
      "good" => Ok(Self::Good),
      "easy" => Ok(Self::Easy),
      other => Err(InvalidGrade(other.to_string())),
    }
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
