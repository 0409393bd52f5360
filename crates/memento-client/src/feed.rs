use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use memento_core::feed::{LikeState, UserAction, VoteAction, apply_like_dislike};
use memento_core::optimistic::PendingUpdate;
use memento_types::events::GatewayEvent;
use memento_types::models::Moment;

use crate::SyncOutcome;
use crate::backend::PortalBackend;
use crate::error::ClientError;

/// The moments feed, newest first.
///
/// Counters come from the server. Which way *I* voted is only remembered
/// for as long as this view lives: `load` forgets it.
pub struct FeedView<B> {
    backend: B,
    moments: Vec<Moment>,
    my_votes: HashMap<Uuid, UserAction>,
    error: Option<String>,
    cancel: CancellationToken,
}

impl<B: PortalBackend> FeedView<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            moments: Vec::new(),
            my_votes: HashMap::new(),
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.moments = self.backend.fetch_moments().await?;
        self.my_votes.clear();
        Ok(())
    }

    pub fn moments(&self) -> &[Moment] {
        &self.moments
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn unmount_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Counters plus my vote for one moment.
    pub fn like_state(&self, moment_id: Uuid) -> Option<LikeState> {
        let moment = self.moments.iter().find(|m| m.id == moment_id)?;
        Some(LikeState {
            user_action: self.my_votes.get(&moment_id).copied().unwrap_or_default(),
            ..moment.like_state()
        })
    }

    pub async fn vote(&mut self, moment_id: Uuid, action: VoteAction) -> SyncOutcome {
        let Some(current) = self.like_state(moment_id) else {
            return SyncOutcome::Missing;
        };

        let pending = PendingUpdate::begin(&current, |s| apply_like_dislike(*s, action));
        self.show(moment_id, *pending.optimistic());

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Feed view unmounted, dropping vote result for {}", moment_id);
                return SyncOutcome::Discarded;
            }
            result = self.backend.vote(moment_id, action, current.user_action) => result,
        };

        let outcome = match &result {
            Ok(_) => SyncOutcome::Confirmed,
            Err(e) => {
                warn!("Vote on {} failed: {}", moment_id, e);
                self.error = Some(format!("Couldn't save your vote: {}", e));
                SyncOutcome::Reverted
            }
        };
        self.show(moment_id, pending.settle(result));
        outcome
    }

    pub fn apply_event(&mut self, event: &GatewayEvent) {
        if let GatewayEvent::MomentUpsert { moment } = event {
            match self.moments.iter_mut().find(|m| m.id == moment.id) {
                Some(held) => *held = moment.clone(),
                None => self.moments.insert(0, moment.clone()),
            }
        }
    }

    fn show(&mut self, moment_id: Uuid, state: LikeState) {
        if let Some(moment) = self.moments.iter_mut().find(|m| m.id == moment_id) {
            moment.like_count = state.like_count;
            moment.dislike_count = state.dislike_count;
        }
        self.my_votes.insert(moment_id, state.user_action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, moment};

    async fn loaded(likes: i64, dislikes: i64) -> (FeedView<FakeBackend>, Uuid) {
        let post = moment(Uuid::new_v4(), "graduation day", likes, dislikes);
        let id = post.id;
        let backend = FakeBackend::new(Uuid::new_v4());
        backend.seed_moments(vec![post]);
        let mut view = FeedView::new(backend);
        view.load().await.unwrap();
        (view, id)
    }

    #[tokio::test]
    async fn like_then_switch_to_dislike() {
        let (mut view, id) = loaded(2, 1).await;

        assert_eq!(view.vote(id, VoteAction::Like).await, SyncOutcome::Confirmed);
        let state = view.like_state(id).unwrap();
        assert_eq!((state.like_count, state.dislike_count), (3, 1));
        assert_eq!(state.user_action, UserAction::Liked);

        view.vote(id, VoteAction::Dislike).await;
        let state = view.like_state(id).unwrap();
        assert_eq!((state.like_count, state.dislike_count), (2, 2));
        assert_eq!(state.user_action, UserAction::Disliked);

        view.vote(id, VoteAction::Dislike).await;
        assert_eq!(view.like_state(id).unwrap(), LikeState::new(2, 1));
    }

    #[tokio::test]
    async fn failure_reverts_counts_and_my_vote() {
        let (mut view, id) = loaded(0, 0).await;
        view.vote(id, VoteAction::Like).await;

        view.backend().set_failing(true);
        assert_eq!(view.vote(id, VoteAction::Dislike).await, SyncOutcome::Reverted);
        let state = view.like_state(id).unwrap();
        assert_eq!((state.like_count, state.dislike_count), (1, 0));
        assert_eq!(state.user_action, UserAction::Liked);
        assert!(view.error().is_some());
    }

    #[tokio::test]
    async fn reload_forgets_my_votes() {
        let (mut view, id) = loaded(0, 0).await;
        view.vote(id, VoteAction::Like).await;
        assert_eq!(view.like_state(id).unwrap().user_action, UserAction::Liked);

        view.load().await.unwrap();
        let state = view.like_state(id).unwrap();
        assert_eq!(state.like_count, 1);
        assert_eq!(state.user_action, UserAction::None);
    }

    #[tokio::test]
    async fn unmount_discards_vote() {
        let (mut view, id) = loaded(0, 0).await;
        view.backend().hold_writes(true);
        view.unmount();
        assert_eq!(view.vote(id, VoteAction::Like).await, SyncOutcome::Discarded);
    }

    #[tokio::test]
    async fn upsert_replaces_or_prepends() {
        let (mut view, id) = loaded(0, 0).await;
        let mut updated = view.moments()[0].clone();
        updated.comment_count = 4;
        view.apply_event(&GatewayEvent::MomentUpsert { moment: updated });
        assert_eq!(view.moments()[0].comment_count, 4);

        let fresh = moment(Uuid::new_v4(), "new", 0, 0);
        view.apply_event(&GatewayEvent::MomentUpsert { moment: fresh.clone() });
        assert_eq!(view.moments()[0].id, fresh.id);
        assert_eq!(view.moments()[1].id, id);
    }
}
