//! Chunk → entity membership.
//!
//! All sets live behind a single `RwLock`, which makes a cross-chunk
//! [`ChunkMembership::transfer`] and a whole-chunk [`ChunkMembership::take`]
//! atomic with respect to every reader. A key is present only while its set
//! is non-empty.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::key::ChunkKey;
use crate::record::EntityId;

/// Identities currently located in one chunk.
pub type MemberSet = HashSet<EntityId, FxBuildHasher>;

#[derive(Default)]
pub struct ChunkMembership {
    chunks: RwLock<BTreeMap<ChunkKey, MemberSet>>,
}

impl ChunkMembership {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `id` was already a member.
    pub fn add(&self, key: ChunkKey, id: EntityId) -> bool {
        self.chunks.write().entry(key).or_default().insert(id)
    }

    /// Returns `false` if `id` was not a member.
    pub fn remove(&self, key: ChunkKey, id: EntityId) -> bool {
        remove_member(&mut self.chunks.write(), key, id)
    }

    /// Move `id` from one chunk to another in a single step.
    ///
    /// Nothing changes unless `id` is currently in `from`; a `false` return
    /// means the entity was taken or removed from `from` by someone else.
    pub fn transfer(&self, id: EntityId, from: ChunkKey, to: ChunkKey) -> bool {
        let mut chunks = self.chunks.write();
        if !remove_member(&mut chunks, from, id) {
            return false;
        }
        chunks.entry(to).or_default().insert(id);
        true
    }

    /// Remove and return the whole set for `key` (empty if untracked).
    pub fn take(&self, key: ChunkKey) -> MemberSet {
        self.chunks.write().remove(&key).unwrap_or_default()
    }

    #[must_use]
    pub fn snapshot(&self, key: ChunkKey) -> MemberSet {
        self.chunks.read().get(&key).cloned().unwrap_or_default()
    }

    /// Snapshot several chunks under one read lock, in the order given.
    #[must_use]
    pub fn snapshot_many(&self, keys: &[ChunkKey]) -> Vec<MemberSet> {
        let chunks = self.chunks.read();
        keys.iter()
            .map(|key| chunks.get(key).cloned().unwrap_or_default())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: ChunkKey, id: EntityId) -> bool {
        self.chunks
            .read()
            .get(&key)
            .is_some_and(|members| members.contains(&id))
    }

    /// Tracked chunk keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<ChunkKey> {
        self.chunks.read().keys().copied().collect()
    }

    /// Number of tracked chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Total memberships across all chunks.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.chunks.read().values().map(MemberSet::len).sum()
    }

    pub fn clear(&self) {
        self.chunks.write().clear();
    }
}

fn remove_member(chunks: &mut BTreeMap<ChunkKey, MemberSet>, key: ChunkKey, id: EntityId) -> bool {
    let Some(members) = chunks.get_mut(&key) else {
        return false;
    };
    let removed = members.remove(&id);
    if members.is_empty() {
        chunks.remove(&key);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DimensionId;

    const A: ChunkKey = ChunkKey::new(DimensionId::OVERWORLD, 0, 0);
    const B: ChunkKey = ChunkKey::new(DimensionId::OVERWORLD, 1, 0);

    #[test]
    fn empty_sets_are_dropped_on_remove() {
        let index = ChunkMembership::new();
        assert!(index.add(A, 1));
        assert!(!index.add(A, 1));
        assert!(index.add(A, 2));

        assert!(index.remove(A, 1));
        assert_eq!(index.keys(), vec![A]);
        assert!(index.remove(A, 2));
        assert!(index.is_empty());
        assert!(!index.remove(A, 2));
    }

    #[test]
    fn transfer_requires_membership_in_source() {
        let index = ChunkMembership::new();
        index.add(A, 5);

        assert!(index.transfer(5, A, B));
        assert!(!index.contains(A, 5));
        assert!(index.contains(B, 5));
        assert_eq!(index.keys(), vec![B]);

        // 5 is no longer in A, so nothing may be added to the destination
        assert!(!index.transfer(5, A, ChunkKey::new(DimensionId::OVERWORLD, 9, 9)));
        assert_eq!(index.keys(), vec![B]);
        assert_eq!(index.member_count(), 1);
    }

    #[test]
    fn take_empties_the_key() {
        let index = ChunkMembership::new();
        index.add(A, 1);
        index.add(A, 2);
        index.add(B, 3);

        let taken = index.take(A);
        assert_eq!(taken.len(), 2);
        assert!(taken.contains(&1) && taken.contains(&2));
        assert!(index.take(A).is_empty());
        assert_eq!(index.keys(), vec![B]);
    }

    #[test]
    fn snapshots_are_detached_copies() {
        let index = ChunkMembership::new();
        index.add(A, 1);

        let before = index.snapshot(A);
        index.add(A, 2);
        assert_eq!(before.len(), 1);

        let both = index.snapshot_many(&[B, A]);
        assert!(both[0].is_empty());
        assert_eq!(both[1].len(), 2);
        assert!(index.snapshot(B).is_empty());
    }
}
