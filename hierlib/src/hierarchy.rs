use serde::{Deserialize, Serialize};

use crate::cache::{CacheLevel, CacheStats, MainMemory, NextLevel};
use crate::config::{HierarchyConfig, LevelName};
use crate::error::ConfigError;

/// The kind of a memory access, deciding which L1 it goes to
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum AccessKind {
    Instruction,
    Data,
}

/// Counters of every level at one point in time
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub icache: CacheStats,
    pub dcache: CacheStats,
    pub l2: CacheStats,
}

impl HierarchyStats {
    pub fn level(&self, name: LevelName) -> &CacheStats {
        match name {
            LevelName::ICache => &self.icache,
            LevelName::DCache => &self.dcache,
            LevelName::L2Cache => &self.l2,
        }
    }
}

/// Split instruction and data L1 caches sharing one unified L2, backed by main memory
///
/// Both L1s miss into the same L2 instance, so instruction and data misses compete for the same
/// L2 sets and are counted together in the L2 statistics
///
/// When inclusive, every line resident in either L1 is also resident in the L2. An L2 eviction
/// immediately invalidates the evicted line from both L1s, each of which may or may not hold it
pub struct CacheHierarchy {
    config: HierarchyConfig,
    icache: CacheLevel,
    dcache: CacheLevel,
    l2: CacheLevel,
    memory: MainMemory,
}

/// The path below an L1: the shared L2 and main memory
///
/// `sibling` is the other L1, which the inclusion protocol must also purge on L2 evictions. An
/// absent L2 never evicts, so inclusion does nothing without one
struct L2Path<'a> {
    l2: &'a mut CacheLevel,
    sibling: &'a mut CacheLevel,
    memory: MainMemory,
    inclusive: bool,
}

impl NextLevel for L2Path<'_> {
    fn resolve_miss(&mut self, requester: &mut CacheLevel, address: u32) -> u32 {
        let access = self.l2.access(address, &mut self.memory);
        if let (true, Some(victim)) = (self.inclusive, access.evicted) {
            let requester_held = requester.invalidate(victim);
            let sibling_held = self.sibling.invalidate(victim);
            tracing::trace!(victim, requester_held, sibling_held, "back-invalidated L2 victim");
        }
        access.latency
    }
}

impl CacheHierarchy {
    /// Builds a hierarchy from a configuration, rejecting it if it is invalid
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(?config, "building cache hierarchy");
        Ok(Self {
            config: *config,
            icache: CacheLevel::new(LevelName::ICache, config.icache, config.block_size),
            dcache: CacheLevel::new(LevelName::DCache, config.dcache, config.block_size),
            l2: CacheLevel::new(LevelName::L2Cache, config.l2, config.block_size),
            memory: MainMemory { latency: config.memory_latency },
        })
    }

    /// Fetches an instruction through the I$, returning the latency in cycles
    pub fn fetch_instruction(&mut self, address: u32) -> u32 {
        let mut path = L2Path {
            l2: &mut self.l2,
            sibling: &mut self.dcache,
            memory: self.memory,
            inclusive: self.config.inclusive,
        };
        self.icache.access(address, &mut path).latency
    }

    /// Accesses data through the D$, returning the latency in cycles
    pub fn access_data(&mut self, address: u32) -> u32 {
        let mut path = L2Path {
            l2: &mut self.l2,
            sibling: &mut self.icache,
            memory: self.memory,
            inclusive: self.config.inclusive,
        };
        self.dcache.access(address, &mut path).latency
    }

    pub fn access(&mut self, kind: AccessKind, address: u32) -> u32 {
        match kind {
            AccessKind::Instruction => self.fetch_instruction(address),
            AccessKind::Data => self.access_data(address),
        }
    }

    pub fn snapshot_statistics(&self) -> HierarchyStats {
        HierarchyStats {
            icache: self.icache.stats(),
            dcache: self.dcache.stats(),
            l2: self.l2.stats(),
        }
    }

    /// Checks every line resident in an L1 is also resident in the L2
    ///
    /// Always holds for an inclusive hierarchy with an L2. A non-inclusive one is free to break it
    pub fn check_inclusion(&self) -> bool {
        self.icache
            .resident_blocks()
            .chain(self.dcache.resident_blocks())
            .all(|block| self.l2.contains(block))
    }

    pub fn level(&self, name: LevelName) -> &CacheLevel {
        match name {
            LevelName::ICache => &self.icache,
            LevelName::DCache => &self.dcache,
            LevelName::L2Cache => &self.l2,
        }
    }

    pub fn icache(&self) -> &CacheLevel {
        &self.icache
    }

    pub fn dcache(&self) -> &CacheLevel {
        &self.dcache
    }

    pub fn l2(&self) -> &CacheLevel {
        &self.l2
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }
}
