//! Chunked procedural terrain streaming.
//!
//! The engine keeps a sparse set of generated terrain tiles alive around a
//! moving viewpoint: tiles are meshed from a deterministic fractal height
//! field, classified into LOD tiers by distance, reused through per-tier
//! pools instead of being destroyed, and culled against the view frustum
//! without leaving the active set. Generation work is spread across
//! scheduler ticks so a single update never blows the frame budget.

pub mod terrain;
