use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};

/// Identifies one of the three levels of the hierarchy
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    ICache,
    DCache,
    L2Cache,
}

impl LevelName {
    pub const ALL: [LevelName; 3] = [LevelName::ICache, LevelName::DCache, LevelName::L2Cache];
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LevelName::ICache => "icache",
            LevelName::DCache => "dcache",
            LevelName::L2Cache => "l2cache",
        })
    }
}

/// The configuration of a single cache level. A level with 0 sets is absent
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelConfig {
    pub sets: u32,
    #[serde(alias = "assoc")]
    pub associativity: u32,
    #[serde(alias = "hitTime")]
    pub hit_time: u32,
}

impl LevelConfig {
    pub const ABSENT: LevelConfig = LevelConfig { sets: 0, associativity: 0, hit_time: 0 };

    pub fn new(sets: u32, associativity: u32, hit_time: u32) -> Self {
        Self { sets, associativity, hit_time }
    }

    pub fn is_present(&self) -> bool {
        self.sets != 0
    }

    /// Number of blocks the level can hold
    pub fn lines(&self) -> u64 {
        self.sets as u64 * self.associativity as u64
    }
}

/// Parses the command line form `sets:assoc:hit_time`
///
/// # Examples
///
/// ```
/// use hierlib::config::LevelConfig;
/// let level: LevelConfig = "256:4:1".parse().unwrap();
/// assert_eq!(level, LevelConfig::new(256, 4, 1));
/// ```
impl FromStr for LevelConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || ConfigError::LevelSyntax { input: s.to_string() };
        let mut fields = s.trim().split(':').map(|field| field.trim().parse::<u32>());
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(Ok(sets)), Some(Ok(associativity)), Some(Ok(hit_time)), None) => {
                Ok(Self::new(sets, associativity, hit_time))
            }
            _ => Err(syntax()),
        }
    }
}

impl fmt::Display for LevelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.sets, self.associativity, self.hit_time)
    }
}

/// The configuration of the whole hierarchy, usually resulting from parsing JSON
///
/// Missing fields take their defaults, which leave every level absent. Unknown fields are
/// rejected, so a misspelt level can't silently load as absent
///
/// `inclusive` has no effect without an L2: an absent L2 never holds, and so never evicts, a line
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HierarchyConfig {
    pub icache: LevelConfig,
    pub dcache: LevelConfig,
    #[serde(alias = "l2cache")]
    pub l2: LevelConfig,
    pub inclusive: bool,
    #[serde(alias = "blocksize", alias = "blockSize")]
    pub block_size: u32,
    #[serde(alias = "memspeed", alias = "memSpeed")]
    pub memory_latency: u32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            icache: LevelConfig::ABSENT,
            dcache: LevelConfig::ABSENT,
            l2: LevelConfig::ABSENT,
            inclusive: false,
            block_size: 64,
            memory_latency: 100,
        }
    }
}

impl HierarchyConfig {
    pub fn level(&self, name: LevelName) -> &LevelConfig {
        match name {
            LevelName::ICache => &self.icache,
            LevelName::DCache => &self.dcache,
            LevelName::L2Cache => &self.l2,
        }
    }

    /// Checks the configuration can be simulated
    ///
    /// Sizes are never rounded: a block size or set count that isn't a power of two would give a
    /// fractional number of index or offset bits, so it is rejected instead
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        for name in LevelName::ALL {
            let level = self.level(name);
            if !level.is_present() {
                continue;
            }
            if !level.sets.is_power_of_two() {
                return Err(ConfigError::SetCount { level: name, sets: level.sets });
            }
            if level.associativity == 0 {
                return Err(ConfigError::ZeroAssociativity { level: name, sets: level.sets });
            }
            let bits = self.block_size.trailing_zeros() + level.sets.trailing_zeros();
            if bits > u32::BITS {
                return Err(ConfigError::AddressWidth { level: name, bits });
            }
        }
        self.worst_case_latency()?;
        Ok(())
    }

    /// Latency of an access missing every present level, which must fit the u32 latencies
    /// accesses report
    pub fn worst_case_latency(&self) -> Result<u32, ConfigError> {
        let l1_hit_time = [self.icache, self.dcache]
            .iter()
            .filter(|level| level.is_present())
            .map(|level| level.hit_time)
            .max()
            .unwrap_or(0);
        let l2_hit_time = if self.l2.is_present() { self.l2.hit_time } else { 0 };
        l1_hit_time
            .checked_add(l2_hit_time)
            .and_then(|latency| latency.checked_add(self.memory_latency))
            .ok_or(ConfigError::LatencyOverflow {
                l1_hit_time,
                l2_hit_time,
                memory_latency: self.memory_latency,
            })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Reads a JSON configuration file. The result is not validated yet
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::File { path: path.to_string(), source })?;
        Ok(Self::from_reader(BufReader::new(file))?)
    }
}
