use chrono::{DateTime, Duration, Utc};

use crate::config::{
  AGAIN_EASE_PENALTY, AGAIN_REQUEUE_MINUTES, EASY_BONUS, EASY_FIRST_INTERVAL_DAYS,
  HARD_EASE_PENALTY, HARD_INTERVAL_FACTOR, MIN_EASE,
};
use crate::domain::card::{due_after_days, now_millis};
use crate::domain::{Grade, SchedulingState};

/// Next scheduling state for a card graded now
pub fn schedule(state: &SchedulingState, grade: Grade) -> SchedulingState {
  schedule_at(state, grade, now_millis())
}

/// Next scheduling state for a card graded at `now`.
///
/// "again" resets the streak and re-queues the card within the session;
/// the other grades move it out by whole days.
pub fn schedule_at(state: &SchedulingState, grade: Grade, now: DateTime<Utc>) -> SchedulingState {
  let SchedulingState {
    mut reps,
    mut ease,
    mut interval,
    mut lapses,
    ..
  } = *state;

  match grade {
    Grade::Again => {
      lapses = lapses.saturating_add(1);
      reps = 0;
      ease = (ease - AGAIN_EASE_PENALTY).max(MIN_EASE);
      interval = 0;
      return SchedulingState {
        reps,
        ease,
        interval,
        lapses,
        due: now + Duration::minutes(AGAIN_REQUEUE_MINUTES),
      };
    }
    Grade::Hard => {
      ease = (ease - HARD_EASE_PENALTY).max(MIN_EASE);
      interval = if interval > 0 {
        scale(interval, HARD_INTERVAL_FACTOR).max(1)
      } else {
        1
      };
      reps = reps.max(1);
    }
    Grade::Good => {
      reps = reps.saturating_add(1);
      interval = if interval == 0 {
        1
      } else {
        scale(interval, ease).max(1)
      };
    }
    Grade::Easy => {
      reps = reps.saturating_add(1);
      ease += EASY_BONUS;
      interval = if interval > 0 {
        scale(interval, ease + EASY_BONUS)
      } else {
        EASY_FIRST_INTERVAL_DAYS
      };
    }
  }

  SchedulingState {
    reps,
    ease,
    interval,
    lapses,
    due: due_after_days(now, interval),
  }
}

fn scale(days: u32, factor: f64) -> u32 {
  // float -> int casts saturate, so runaway ease cannot wrap
  (f64::from(days) * factor).round() as u32
}
