pub mod card_selector;
pub mod sm2;

pub use card_selector::{
  QuizChoices, due_cards, new_cards, next_card, quiz_choices, review_queue, study_pool,
};
pub use sm2::{schedule, schedule_at};
