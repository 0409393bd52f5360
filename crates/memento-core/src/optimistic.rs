//! Two-phase local update around a remote write.
//!
//! `begin` runs a pure transition and keeps the state it started from. The
//! caller renders `optimistic()` right away, performs the write, and then
//! `settle`s with the outcome: the backend's answer on success, the snapshot
//! on failure.

#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate<T> {
    before: T,
    after: T,
}

impl<T: Clone> PendingUpdate<T> {
    pub fn begin<F>(current: &T, transition: F) -> Self
    where
        F: FnOnce(&T) -> T,
    {
        Self {
            before: current.clone(),
            after: transition(current),
        }
    }

    pub fn optimistic(&self) -> &T {
        &self.after
    }

    pub fn snapshot(&self) -> &T {
        &self.before
    }

    /// Resolve against the remote result. `Err` rolls back to the snapshot.
    pub fn settle<E>(self, result: Result<T, E>) -> T {
        match result {
            Ok(authoritative) => authoritative,
            Err(_) => self.before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{LikeState, VoteAction, apply_like_dislike};
    use crate::reactions::{ReactionMap, apply_reaction};
    use uuid::Uuid;

    #[test]
    fn failed_write_reverts_and_retry_reproduces() {
        let me = Uuid::new_v4();
        let start = apply_reaction(&ReactionMap::new(), me, "👍");

        let pending = PendingUpdate::begin(&start, |s| apply_reaction(s, me, "😂"));
        let shown = pending.optimistic().clone();
        assert_eq!(shown.reaction_of(me), Some("😂"));

        let reverted = pending.settle::<&str>(Err("permission denied"));
        assert_eq!(reverted, start);

        let retry = PendingUpdate::begin(&reverted, |s| apply_reaction(s, me, "😂"));
        assert_eq!(retry.optimistic(), &shown);
    }

    #[test]
    fn success_adopts_backend_state() {
        let pending = PendingUpdate::begin(&LikeState::new(1, 0), |s| apply_like_dislike(*s, VoteAction::Like));
        assert_eq!(pending.optimistic().like_count, 2);

        // Someone else liked in the meantime.
        let from_server = LikeState { like_count: 3, ..*pending.optimistic() };
        let settled = pending.settle::<()>(Ok(from_server));
        assert_eq!(settled.like_count, 3);
    }
}
