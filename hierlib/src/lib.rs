//! # HierLib
//!
//! Hierlib is a library for trace-driven simulation of a two level cache hierarchy
//!
//! It models split instruction and data L1 caches backed by a unified L2 and main memory, with
//! LRU replacement in every set and optional inclusion between the L2 and the L1s. Each access
//! reports its latency in cycles, and every level keeps reference, miss and penalty counters

/// Splitting addresses into tag, set index and block offset
pub mod address;

/// Contains a single cache level, the trait for the level below it, and the level counters
pub mod cache;

/// Contains definitions for the JSON configuration format, and its validation
pub mod config;

/// Error types reported by the library
pub mod error;

/// Contains the three level hierarchy and the inclusion protocol between its levels
pub mod hierarchy;

/// Opening trace files for fast sequential reads
pub mod io;

/// The recency ordered set used by every level
pub mod lru_set;

/// Contains the simulator used to run a trace through a hierarchy, and the report it produces
pub mod simulator;

/// Parsing the text trace format
pub mod trace;

#[cfg(test)]
mod test;

/// Contains utilities for running tests and benchmarks.
pub mod util;
