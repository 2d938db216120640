use serde::{Deserialize, Serialize};

use crate::address::Geometry;
use crate::config::{LevelConfig, LevelName};
use crate::lru_set::LruSet;

/// Whatever sits below a cache level and resolves its misses
///
/// Implementations are handed the level that missed, so that they can act on it while the miss is
/// being resolved. The inclusive L2 path uses this to invalidate lines from the requesting L1 at
/// the moment the L2 evicts them, before the L1 fills its own line
pub trait NextLevel {
    /// Resolves a miss in `requester` for `address`, returning the latency in cycles
    ///
    /// # Arguments
    ///
    /// * `requester`: The level which missed
    /// * `address`: The original address of the access, not aligned to a block
    ///
    /// returns: u32
    fn resolve_miss(&mut self, requester: &mut CacheLevel, address: u32) -> u32;
}

/// Main memory. It is never missed, every access costs the same fixed latency
#[derive(Debug, Copy, Clone)]
pub struct MainMemory {
    pub latency: u32,
}

impl NextLevel for MainMemory {
    fn resolve_miss(&mut self, _requester: &mut CacheLevel, _address: u32) -> u32 {
        self.latency
    }
}

/// How a level resolved an access
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Hit,
    Miss,
    /// The level is absent and the access went straight to the next level
    Bypass,
}

/// The result of a single access to a level
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Access {
    /// Total latency in cycles, including everything below this level
    pub latency: u32,
    pub outcome: Outcome,
    /// Block address of the line evicted to make room for the missed one
    pub evicted: Option<u32>,
}

/// Running counters for one level
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Accesses which reached this level
    pub references: u64,
    pub misses: u64,
    /// Cycles spent below this level resolving misses. The level's own hit time isn't included
    pub penalty_cycles: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.references - self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        ratio(self.misses, self.references)
    }

    pub fn average_miss_penalty(&self) -> f64 {
        ratio(self.penalty_cycles, self.misses)
    }

    /// Average cycles per reference: every reference pays the hit time, misses also pay their
    /// penalty
    pub fn average_access_time(&self, hit_time: u32) -> f64 {
        if self.references == 0 {
            return 0.0;
        }
        hit_time as f64 + ratio(self.penalty_cycles, self.references)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// One level of the hierarchy: a set of [`LruSet`]s addressed through the level's geometry,
/// along with its configuration and counters
///
/// A level configured with 0 sets is absent. Accesses to it are passed straight through to the
/// next level and it records nothing
#[derive(Debug, Clone)]
pub struct CacheLevel {
    name: LevelName,
    config: LevelConfig,
    geometry: Option<Geometry>,
    sets: Vec<LruSet>,
    stats: CacheStats,
}

impl CacheLevel {
    /// Creates a level from an already validated configuration
    pub fn new(name: LevelName, config: LevelConfig, block_size: u32) -> Self {
        let geometry = config.is_present().then(|| Geometry::new(block_size, config.sets));
        let sets = (0..config.sets).map(|_| LruSet::new(config.associativity as usize)).collect();
        Self {
            name,
            config,
            geometry,
            sets,
            stats: CacheStats::default(),
        }
    }

    /// Resolves one access at this level, cascading to `next` on a miss
    ///
    /// On a hit the block becomes the most recently used in its set and the access costs the hit
    /// time. On a miss the next level is asked for the block using the original address, its
    /// latency is charged as penalty, and the block is filled into the set, evicting the least
    /// recently used block if the set is full
    ///
    /// # Arguments
    ///
    /// * `address`: The address of the access
    /// * `next`: The level below, which resolves misses
    ///
    /// returns: Access
    pub fn access<N: NextLevel>(&mut self, address: u32, next: &mut N) -> Access {
        let Some(geometry) = self.geometry else {
            return Access {
                latency: next.resolve_miss(self, address),
                outcome: Outcome::Bypass,
                evicted: None,
            };
        };
        self.stats.references += 1;
        let parts = geometry.decompose(address);
        let set_index = parts.set_index as usize;
        if self.sets[set_index].promote(parts.tag) {
            return Access { latency: self.config.hit_time, outcome: Outcome::Hit, evicted: None };
        }
        self.stats.misses += 1;
        // The next level may invalidate lines in this level while resolving the miss, so the set is
        // only filled afterwards
        let child_latency = next.resolve_miss(self, address);
        self.stats.penalty_cycles += child_latency as u64;
        let evicted = self.sets[set_index]
            .insert(parts.tag)
            .map(|tag| geometry.compose(tag, parts.set_index));
        if let Some(victim) = evicted {
            tracing::trace!(level = %self.name, address, victim, "evicted block");
        }
        Access {
            latency: self.config.hit_time + child_latency,
            outcome: Outcome::Miss,
            evicted,
        }
    }

    /// Removes the block containing `address` if it is resident
    ///
    /// returns: bool, whether a block was removed
    pub fn invalidate(&mut self, address: u32) -> bool {
        let Some(geometry) = self.geometry else {
            return false;
        };
        let parts = geometry.decompose(address);
        self.sets[parts.set_index as usize].remove(parts.tag)
    }

    /// Whether the block containing `address` is resident. Doesn't update recency
    pub fn contains(&self, address: u32) -> bool {
        match self.geometry {
            Some(geometry) => {
                let parts = geometry.decompose(address);
                self.sets[parts.set_index as usize].contains(parts.tag)
            }
            None => false,
        }
    }

    /// Block addresses of every resident line, set by set, most recently used first within a set
    pub fn resident_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.geometry.into_iter().flat_map(move |geometry| {
            self.sets.iter().enumerate().flat_map(move |(index, set)| {
                set.iter().map(move |tag| geometry.compose(tag, index as u32))
            })
        })
    }

    /// Number of resident lines. Useful for analysing cache performance or debugging
    pub fn resident_lines(&self) -> usize {
        self.sets.iter().map(LruSet::len).sum()
    }

    pub fn set(&self, index: usize) -> Option<&LruSet> {
        self.sets.get(index)
    }

    pub fn name(&self) -> LevelName {
        self.name
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
