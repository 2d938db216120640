use std::fmt::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{HierarchyConfig, LevelConfig};
use crate::hierarchy::AccessKind;
use crate::trace::TraceRecord;

/// Hierarchies exercised by the scenario tests and the benchmarks
pub fn sample_configs() -> Vec<(&'static str, HierarchyConfig)> {
    vec![
        ("direct_mapped", HierarchyConfig {
            icache: LevelConfig::new(64, 1, 1),
            dcache: LevelConfig::new(64, 1, 1),
            l2: LevelConfig::new(512, 1, 10),
            inclusive: false,
            block_size: 64,
            memory_latency: 100,
        }),
        ("alpha_like", HierarchyConfig {
            icache: LevelConfig::new(512, 2, 2),
            dcache: LevelConfig::new(256, 4, 2),
            l2: LevelConfig::new(1024, 8, 10),
            inclusive: true,
            block_size: 64,
            memory_latency: 100,
        }),
        ("tiny_inclusive", HierarchyConfig {
            icache: LevelConfig::new(8, 2, 1),
            dcache: LevelConfig::new(8, 2, 1),
            l2: LevelConfig::new(4, 4, 8),
            inclusive: true,
            block_size: 16,
            memory_latency: 50,
        }),
        ("no_l1", HierarchyConfig {
            icache: LevelConfig::ABSENT,
            dcache: LevelConfig::ABSENT,
            l2: LevelConfig::new(256, 16, 12),
            inclusive: false,
            block_size: 32,
            memory_latency: 80,
        }),
    ]
}

/// Generates a deterministic trace resembling a program: instructions mostly run sequentially and
/// loop back, while data accesses mix a small hot stack region with a larger heap working set
///
/// # Arguments
///
/// * `accesses`: Number of records to generate
/// * `seed`: Any value, the same seed always gives the same trace
///
/// returns: Vec<TraceRecord>
pub fn synthetic_records(accesses: usize, seed: u64) -> Vec<TraceRecord> {
    const TEXT_BASE: u32 = 0x0040_0000;
    const STACK_TOP: u32 = 0x7fff_f000;
    const HEAP_BASE: u32 = 0x1000_0000;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pc = TEXT_BASE;
    let mut loop_start = TEXT_BASE;
    let mut records = Vec::with_capacity(accesses);
    while records.len() < accesses {
        if rng.random_ratio(1, 3) {
            let address = if rng.random_ratio(1, 4) {
                HEAP_BASE + (rng.random_range(0..512 * 1024u32) & !3)
            } else {
                STACK_TOP - (rng.random_range(0..2048u32) & !3)
            };
            records.push(TraceRecord { kind: AccessKind::Data, address });
            continue;
        }
        records.push(TraceRecord { kind: AccessKind::Instruction, address: pc });
        pc = match rng.random_range(0..64u32) {
            0..=5 => loop_start,
            6 => {
                loop_start = TEXT_BASE + (rng.random_range(0..256 * 1024u32) & !3);
                loop_start
            }
            _ => pc + 4,
        };
    }
    records
}

/// The same trace as [`synthetic_records`], in the text trace format
pub fn synthetic_trace(accesses: usize, seed: u64) -> String {
    let mut out = String::with_capacity(accesses * 13);
    for record in synthetic_records(accesses, seed) {
        // Writing to a String can't fail
        let _ = writeln!(out, "{record}");
    }
    out
}
