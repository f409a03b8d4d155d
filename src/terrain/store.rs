//! Chunk ownership - the active set and per-LOD-tier pools
//!
//! A chunk instance is always in exactly one place: the active map or one
//! tier's free list. Moves between the two happen by value, so the
//! disjointness invariant is structural rather than checked. Violations of
//! the indexing invariants (duplicate coordinate, releasing an unknown
//! coordinate) indicate corrupted bookkeeping and fail fast.

use crate::terrain::chunk::Chunk;
use ahash::AHashMap;
use glam::IVec2;

pub struct ChunkStore {
    active: AHashMap<IVec2, Chunk>,
    pools: Vec<Vec<Chunk>>,
}

impl ChunkStore {
    pub fn new(tiers: usize) -> Self {
        Self {
            active: AHashMap::new(),
            pools: (0..tiers.max(1)).map(|_| Vec::new()).collect(),
        }
    }

    /// Stock every tier pool with idle template instances.
    pub fn prewarm(&mut self, per_tier: usize) {
        for pool in &mut self.pools {
            for _ in 0..per_tier {
                pool.push(Chunk::new());
            }
        }
    }

    pub fn tier_count(&self) -> usize {
        self.pools.len()
    }

    /// Take an instance for the tier: reuse a pooled one if available,
    /// otherwise allocate fresh.
    pub fn borrow(&mut self, tier: usize) -> Chunk {
        assert!(tier < self.pools.len(), "unknown LOD tier {tier}");
        self.pools[tier].pop().unwrap_or_default()
    }

    /// Put an instance that never reached the active set back into its
    /// tier's pool (e.g. a build superseded mid-flight).
    pub fn return_to_pool(&mut self, mut chunk: Chunk) {
        chunk.visible = false;
        let tier = chunk.tier().min(self.pools.len() - 1);
        self.pools[tier].push(chunk);
    }

    /// Insert a fully generated chunk into the active set.
    pub fn insert_active(&mut self, coord: IVec2, chunk: Chunk) {
        let previous = self.active.insert(coord, chunk);
        assert!(previous.is_none(), "duplicate active chunk at {coord:?}");
    }

    /// Remove a chunk from the active set and park it in its tier's pool.
    pub fn release(&mut self, coord: IVec2) {
        let chunk = self
            .active
            .remove(&coord)
            .unwrap_or_else(|| panic!("released chunk {coord:?} is not active"));
        log::trace!("released chunk {coord:?} to tier {} pool", chunk.tier());
        self.return_to_pool(chunk);
    }

    pub fn contains(&self, coord: IVec2) -> bool {
        self.active.contains_key(&coord)
    }

    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.active.get(&coord)
    }

    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut Chunk> {
        self.active.get_mut(&coord)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn active_coords(&self) -> Vec<IVec2> {
        self.active.keys().copied().collect()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (&IVec2, &Chunk)> {
        self.active.iter()
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (&IVec2, &mut Chunk)> {
        self.active.iter_mut()
    }

    pub fn pooled_len(&self, tier: usize) -> usize {
        self.pools.get(tier).map_or(0, Vec::len)
    }

    /// Total instances owned by the store, active and pooled.
    pub fn total_instances(&self) -> usize {
        self.active.len() + self.pools.iter().map(Vec::len).sum::<usize>()
    }
}
