//! Like/dislike counters for moments.
//!
//! Two buckets instead of an open palette. The viewer's own choice
//! (`UserAction`) is held in memory by the feed view and resets on reload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    #[default]
    None,
    Liked,
    Disliked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    Like,
    Dislike,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub like_count: i64,
    pub dislike_count: i64,
    pub user_action: UserAction,
}

impl LikeState {
    pub fn new(like_count: i64, dislike_count: i64) -> Self {
        Self {
            like_count,
            dislike_count,
            user_action: UserAction::None,
        }
    }

    fn clamped(mut self) -> Self {
        self.like_count = self.like_count.max(0);
        self.dislike_count = self.dislike_count.max(0);
        self
    }
}

pub fn apply_like_dislike(state: LikeState, action: VoteAction) -> LikeState {
    let mut next = state;

    match (action, state.user_action) {
        (VoteAction::Like, UserAction::Liked) => {
            next.like_count -= 1;
            next.user_action = UserAction::None;
        }
        (VoteAction::Like, previous) => {
            next.like_count += 1;
            next.user_action = UserAction::Liked;
            if previous == UserAction::Disliked {
                next.dislike_count -= 1;
            }
        }
        (VoteAction::Dislike, UserAction::Disliked) => {
            next.dislike_count -= 1;
            next.user_action = UserAction::None;
        }
        (VoteAction::Dislike, previous) => {
            next.dislike_count += 1;
            next.user_action = UserAction::Disliked;
            if previous == UserAction::Liked {
                next.like_count -= 1;
            }
        }
    }

    next.clamped()
}
