//! Emoji reaction state for chat messages.
//!
//! A reaction map goes from symbol to the set of users who picked it. A user
//! holds at most one symbol per message: picking a new one moves them, picking
//! the same one again clears them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Symbols offered by the chat reaction picker.
pub const REACTION_PALETTE: [&str; 6] = ["👍", "❤️", "😂", "😮", "😢", "🙏"];

pub fn is_palette_symbol(symbol: &str) -> bool {
    REACTION_PALETTE.contains(&symbol)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionMap(BTreeMap<String, BTreeSet<Uuid>>);

impl ReactionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbol `actor` currently holds, if any.
    pub fn reaction_of(&self, actor: Uuid) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, actors)| actors.contains(&actor))
            .map(|(symbol, _)| symbol.as_str())
    }

    pub fn count(&self, symbol: &str) -> usize {
        self.0.get(symbol).map_or(0, BTreeSet::len)
    }

    pub fn actors(&self, symbol: &str) -> impl Iterator<Item = Uuid> + '_ {
        self.0.get(symbol).into_iter().flatten().copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (symbol, count) pairs, most popular first. Ties keep symbol order.
    pub fn summary(&self) -> Vec<(&str, usize)> {
        let mut groups: Vec<(&str, usize)> = self
            .0
            .iter()
            .map(|(symbol, actors)| (symbol.as_str(), actors.len()))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups
    }

    fn remove_actor(&mut self, symbol: &str, actor: Uuid) {
        if let Some(actors) = self.0.get_mut(symbol) {
            actors.remove(&actor);
            if actors.is_empty() {
                self.0.remove(symbol);
            }
        }
    }

    /// Drop empty entries and move anyone listed under several symbols to a
    /// single one. Maps read back from storage or the wire go through this
    /// before the engine touches them.
    pub fn normalized(mut self) -> Self {
        let mut seen = BTreeSet::new();
        for actors in self.0.values_mut() {
            actors.retain(|actor| seen.insert(*actor));
        }
        self.0.retain(|_, actors| !actors.is_empty());
        self
    }
}

impl FromIterator<(String, Vec<Uuid>)> for ReactionMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Uuid>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(symbol, actors)| (symbol, actors.into_iter().collect()))
                .collect(),
        )
    }
}

/// Toggle `actor`'s reaction to `symbol`.
///
/// Same symbol as the one held: cleared. Different or none: the actor moves to
/// `symbol`. Other actors are untouched and emptied entries are pruned.
pub fn apply_reaction(state: &ReactionMap, actor: Uuid, symbol: &str) -> ReactionMap {
    let mut next = state.clone();
    let old = next.reaction_of(actor).map(str::to_owned);

    if let Some(old) = &old {
        next.remove_actor(old, actor);
    }

    if old.as_deref() != Some(symbol) {
        next.0.entry(symbol.to_owned()).or_default().insert(actor);
    }

    next
}
