use thiserror::Error;

use crate::config::LevelName;

/// Rejected configurations. These are reported when the hierarchy is built, before any access is
/// simulated
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("block size must be a non-zero power of two, got {0}")]
    BlockSize(u32),
    #[error("{level} set count must be zero or a power of two, got {sets}")]
    SetCount { level: LevelName, sets: u32 },
    #[error("{level} is present ({sets} sets) but has an associativity of 0")]
    ZeroAssociativity { level: LevelName, sets: u32 },
    #[error("{level} needs {bits} index and offset bits, more than a 32-bit address has")]
    AddressWidth { level: LevelName, bits: u32 },
    #[error("an access missing every level costs {l1_hit_time} + {l2_hit_time} + {memory_latency} cycles, more than fits in 32 bits")]
    LatencyOverflow { l1_hit_time: u32, l2_hit_time: u32, memory_latency: u32 },
    #[error("couldn't parse level configuration {input:?}, expected sets:assoc:hit_time")]
    LevelSyntax { input: String },
}

/// Problems with a trace, reported with the 1-based line number they occurred on
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: expected `<hex address> <I|D>`, found {content:?}")]
    Malformed { line: usize, content: String },
    #[error("line {line}: address {address} doesn't fit in 32 bits")]
    AddressOutOfRange { line: usize, address: String },
    #[error("couldn't read the trace: {0}")]
    Io(#[from] std::io::Error),
}

/// Any error the library can report
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid trace: {0}")]
    Trace(#[from] TraceError),
    #[error("couldn't parse the configuration file: {0}")]
    ConfigFile(#[from] serde_json::Error),
    #[error("couldn't read {path}: {source}")]
    File { path: String, source: std::io::Error },
}
