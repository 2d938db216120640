use std::fmt;
use std::io::BufRead;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::config::{HierarchyConfig, LevelName};
use crate::error::{ConfigError, TraceError};
use crate::hierarchy::{AccessKind, CacheHierarchy};
use crate::trace::TraceReader;

/// The simulator feeds accesses to a cache hierarchy and keeps totals over everything it has seen.
///
/// It supports calling simulate multiple times, and will update the time taken to simulate and the
/// results accordingly
pub struct Simulator {
    hierarchy: CacheHierarchy,
    instruction_references: u64,
    data_references: u64,
    total_cycles: u64,
    simulation_time: Duration,
}

/// The result of a simulation. Can be serialised as the JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub total_references: u64,
    pub instruction_references: u64,
    pub data_references: u64,
    pub total_cycles: u64,
    pub average_cycles: f64,
    pub inclusive: bool,
    pub caches: Vec<LevelReport>,
}

/// The result for an individual level, with the rates derived from its counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub name: LevelName,
    pub present: bool,
    pub hit_time: u32,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub miss_rate: f64,
    pub average_miss_penalty: f64,
    pub average_access_time: f64,
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A hierarchy configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            hierarchy: CacheHierarchy::new(config)?,
            instruction_references: 0,
            data_references: 0,
            total_cycles: 0,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Simulates a single access, returning its latency in cycles
    pub fn access(&mut self, kind: AccessKind, address: u32) -> u32 {
        match kind {
            AccessKind::Instruction => self.instruction_references += 1,
            AccessKind::Data => self.data_references += 1,
        }
        let latency = self.hierarchy.access(kind, address);
        self.total_cycles += latency as u64;
        latency
    }

    /// Simulates every access of a text trace
    ///
    /// Reading stops at the first malformed line. Accesses before it have already been simulated
    /// and stay counted
    ///
    /// # Arguments
    ///
    /// * `reader`: The trace, one `<address> <I|D>` access per line
    ///
    /// returns: Result<SimulationResult, TraceError>
    pub fn simulate<R: BufRead>(&mut self, reader: R) -> Result<SimulationResult, TraceError> {
        let start = Instant::now();
        let replayed = self.replay(reader);
        self.simulation_time += start.elapsed();
        let accesses = replayed?;
        let result = self.result();
        tracing::info!(
            accesses,
            total_references = result.total_references,
            total_cycles = result.total_cycles,
            "trace simulated"
        );
        Ok(result)
    }

    fn replay<R: BufRead>(&mut self, reader: R) -> Result<u64, TraceError> {
        let mut accesses = 0;
        for record in TraceReader::new(reader) {
            let record = record?;
            self.access(record.kind, record.address);
            accesses += 1;
        }
        Ok(accesses)
    }

    /// Builds the result from the totals and the hierarchy's counters so far
    pub fn result(&self) -> SimulationResult {
        let stats = self.hierarchy.snapshot_statistics();
        let total_references = self.instruction_references + self.data_references;
        let average_cycles = if total_references == 0 {
            0.0
        } else {
            self.total_cycles as f64 / total_references as f64
        };
        let caches = LevelName::ALL
            .iter()
            .map(|name| {
                let level = self.hierarchy.level(*name);
                let stats = *stats.level(*name);
                LevelReport {
                    name: *name,
                    present: level.is_present(),
                    hit_time: level.config().hit_time,
                    stats,
                    miss_rate: stats.miss_rate(),
                    average_miss_penalty: stats.average_miss_penalty(),
                    average_access_time: stats.average_access_time(level.config().hit_time),
                }
            })
            .collect();
        SimulationResult {
            total_references,
            instruction_references: self.instruction_references,
            data_references: self.data_references,
            total_cycles: self.total_cycles,
            average_cycles,
            inclusive: self.hierarchy.config().inclusive,
            caches,
        }
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of resident lines for each level
    pub fn get_resident_line_counts(&self) -> Vec<(LevelName, usize)> {
        LevelName::ALL
            .iter()
            .map(|name| (*name, self.hierarchy.level(*name).resident_lines()))
            .collect()
    }

    pub fn hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }
}

/// The plain text report
impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Statistics")?;
        writeln!(f, "  Total references: {:>12} (instruction {}, data {})",
                 self.total_references, self.instruction_references, self.data_references)?;
        writeln!(f, "  Total cycles:     {:>12}", self.total_cycles)?;
        writeln!(f, "  Average cycles:   {:>12.2}", self.average_cycles)?;
        writeln!(f, "  Inclusive:        {:>12}", self.inclusive)?;
        writeln!(f, "{:<8} {:>12} {:>12} {:>9} {:>14} {:>13} {:>13}",
                 "level", "references", "misses", "miss rate", "penalties", "avg penalty", "avg access")?;
        for cache in &self.caches {
            if !cache.present {
                writeln!(f, "{:<8} {:>12}", cache.name.to_string(), "absent")?;
                continue;
            }
            writeln!(f, "{:<8} {:>12} {:>12} {:>8.2}% {:>14} {:>13.2} {:>13.2}",
                     cache.name.to_string(),
                     cache.stats.references,
                     cache.stats.misses,
                     cache.miss_rate * 100.0,
                     cache.stats.penalty_cycles,
                     cache.average_miss_penalty,
                     cache.average_access_time)?;
        }
        Ok(())
    }
}
