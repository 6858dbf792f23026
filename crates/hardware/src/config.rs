//! Configuration system for the out-of-order core simulator.
//!
//! This module defines all configuration structures used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline widths, queue sizes, and replay/serialization tuning.
//! 2. **Structures:** Hierarchical config for the OoO core and the MMU page walker.
//! 3. **Validation:** Rejection of parameter sets the engine cannot run with.
//!
//! Configuration is supplied as JSON or built with `Config::default()`.

use serde::Deserialize;

use crate::common::constants::SERIALIZE_LEVEL_MAX;
use crate::common::error::ConfigError;

/// Default configuration constants for the simulator.
///
/// These values define the baseline core when not explicitly overridden.
mod defaults {
    /// Instructions delivered by the front end per fetch bucket.
    pub const FETCH_WIDTH: usize = 4;

    /// Maximum operations renamed per cycle.
    pub const ISSUE_WIDTH: usize = 4;

    /// Maximum operations committed per cycle.
    pub const RETIRE_WIDTH: usize = 4;

    /// Width used when charging stall slots to a cause.
    pub const REALISTIC_WIDTH: usize = 4;

    /// Capacity of the decoded instruction queue between fetch and rename.
    pub const INST_QUEUE_SIZE: usize = 32;

    /// Capacity shared by the ROB and the retiring ROB.
    pub const MAX_ROB_SIZE: usize = 128;

    /// Minimum cycles between execution completion and commit.
    pub const RETIRE_DELAY: u64 = 2;

    /// Physical register budget (0 means unlimited).
    pub const TOTAL_REGS: i64 = 0;

    /// Whether memory-ordering replays are honored.
    pub const MEMORY_REPLAY: bool = true;

    /// Serialization budget armed after replays that arrive too close together.
    pub const SERIALIZE: u32 = 0;

    /// Initial serialization level (2 = same logical register only).
    pub const SERIALIZE_LEVEL: u8 = 2;

    /// Instruction distance between replays considered forward progress.
    pub const FORWARD_PROGRESS_THRESHOLD: u64 = 200;

    /// Cycles between retire-lock samples.
    pub const LOCK_CHECK_INTERVAL: u64 = 100_000;

    /// Parallel page table walkers.
    pub const PTW_COUNT: usize = 4;

    /// Entries in the private L1 TLB (PTE cache).
    pub const L1TLB_ENTRIES: usize = 64;

    /// L1 TLB probe latency in cycles.
    pub const L1TLB_LATENCY: u64 = 1;

    /// Backing memory read latency in cycles.
    pub const MEMORY_LATENCY: u64 = 20;

    /// Physical page number of the root page table (0x8000_0000).
    pub const ROOT_PPN: u64 = 0x80000;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use o3sim_core::config::Config;
///
/// let json = r#"{
///     "core": { "max_rob_size": 64, "retire_width": 2, "serialize": 16 },
///     "mmu": { "ptw_count": 8 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.core.max_rob_size, 64);
/// assert_eq!(config.core.fetch_width, 4);
/// assert_eq!(config.mmu.ptw_count, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Out-of-order core parameters
    #[serde(default)]
    pub core: CoreConfig,
    /// Address translation parameters
    #[serde(default)]
    pub mmu: MmuConfig,
}

impl Config {
    /// Parses a JSON configuration and validates it.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Arguments
    ///
    /// * `json` - Configuration text.
    ///
    /// # Returns
    ///
    /// The parsed configuration, or the parse or validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section for values the engine cannot run with.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is usable, otherwise the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core.validate()?;
        self.mmu.validate()
    }
}

/// Out-of-order core configuration (per hardware thread).
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Instructions per fetch bucket
    #[serde(default = "CoreConfig::default_fetch_width")]
    pub fetch_width: usize,

    /// Maximum renames per cycle
    #[serde(default = "CoreConfig::default_issue_width")]
    pub issue_width: usize,

    /// Maximum commits per cycle
    #[serde(default = "CoreConfig::default_retire_width")]
    pub retire_width: usize,

    /// Stall slots charged per stalled cycle
    #[serde(default = "CoreConfig::default_realistic_width")]
    pub realistic_width: usize,

    /// Decoded instruction queue capacity
    #[serde(default = "CoreConfig::default_inst_queue_size")]
    pub inst_queue_size: usize,

    /// Combined ROB + retiring ROB capacity
    #[serde(default = "CoreConfig::default_max_rob_size")]
    pub max_rob_size: usize,

    /// Cycles between execution completion and commit
    #[serde(default = "CoreConfig::default_retire_delay")]
    pub retire_delay: u64,

    /// Physical register budget; 0 means unlimited
    #[serde(default = "CoreConfig::default_total_regs")]
    pub total_regs: i64,

    /// Take the register at execution start instead of at rename
    #[serde(default)]
    pub late_alloc_register: bool,

    /// Honor replay requests from the memory consistency layer
    #[serde(default = "CoreConfig::default_memory_replay")]
    pub memory_replay: bool,

    /// Serialization budget armed after thrashing replays (0 disables)
    #[serde(default = "CoreConfig::default_serialize")]
    pub serialize: u32,

    /// Initial serialization level (0 full, 1 loads after stores, 2 same register)
    #[serde(default = "CoreConfig::default_serialize_level")]
    pub serialize_level: u8,

    /// Instruction gap between replays that counts as forward progress
    #[serde(default = "CoreConfig::default_forward_progress_threshold")]
    pub forward_progress_threshold: u64,

    /// Cycles between retire-lock samples
    #[serde(default = "CoreConfig::default_lock_check_interval")]
    pub lock_check_interval: u64,
}

impl CoreConfig {
    /// Returns the default fetch width.
    fn default_fetch_width() -> usize {
        defaults::FETCH_WIDTH
    }

    /// Returns the default issue width.
    fn default_issue_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    /// Returns the default retire width.
    fn default_retire_width() -> usize {
        defaults::RETIRE_WIDTH
    }

    /// Returns the default realistic width.
    fn default_realistic_width() -> usize {
        defaults::REALISTIC_WIDTH
    }

    /// Returns the default instruction queue size.
    fn default_inst_queue_size() -> usize {
        defaults::INST_QUEUE_SIZE
    }

    /// Returns the default ROB capacity.
    fn default_max_rob_size() -> usize {
        defaults::MAX_ROB_SIZE
    }

    /// Returns the default retire delay.
    fn default_retire_delay() -> u64 {
        defaults::RETIRE_DELAY
    }

    /// Returns the default register budget.
    fn default_total_regs() -> i64 {
        defaults::TOTAL_REGS
    }

    /// Returns whether replays are honored by default.
    fn default_memory_replay() -> bool {
        defaults::MEMORY_REPLAY
    }

    /// Returns the default serialization budget.
    fn default_serialize() -> u32 {
        defaults::SERIALIZE
    }

    /// Returns the default serialization level.
    fn default_serialize_level() -> u8 {
        defaults::SERIALIZE_LEVEL
    }

    /// Returns the default forward progress threshold.
    fn default_forward_progress_threshold() -> u64 {
        defaults::FORWARD_PROGRESS_THRESHOLD
    }

    /// Returns the default lock check interval.
    fn default_lock_check_interval() -> u64 {
        defaults::LOCK_CHECK_INTERVAL
    }

    /// Checks core parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rob_size < 2 {
            return Err(ConfigError::RobTooSmall(self.max_rob_size));
        }
        for (name, width) in [
            ("fetch_width", self.fetch_width),
            ("issue_width", self.issue_width),
            ("retire_width", self.retire_width),
            ("realistic_width", self.realistic_width),
        ] {
            if width == 0 {
                return Err(ConfigError::ZeroWidth(name));
            }
        }
        if self.lock_check_interval == 0 {
            return Err(ConfigError::ZeroWidth("lock_check_interval"));
        }
        if self.inst_queue_size < self.fetch_width {
            return Err(ConfigError::InstQueueTooSmall {
                queue: self.inst_queue_size,
                fetch: self.fetch_width,
            });
        }
        if self.serialize_level > SERIALIZE_LEVEL_MAX {
            return Err(ConfigError::SerializeLevel(self.serialize_level));
        }
        Ok(())
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            fetch_width: defaults::FETCH_WIDTH,
            issue_width: defaults::ISSUE_WIDTH,
            retire_width: defaults::RETIRE_WIDTH,
            realistic_width: defaults::REALISTIC_WIDTH,
            inst_queue_size: defaults::INST_QUEUE_SIZE,
            max_rob_size: defaults::MAX_ROB_SIZE,
            retire_delay: defaults::RETIRE_DELAY,
            total_regs: defaults::TOTAL_REGS,
            late_alloc_register: false,
            memory_replay: defaults::MEMORY_REPLAY,
            serialize: defaults::SERIALIZE,
            serialize_level: defaults::SERIALIZE_LEVEL,
            forward_progress_threshold: defaults::FORWARD_PROGRESS_THRESHOLD,
            lock_check_interval: defaults::LOCK_CHECK_INTERVAL,
        }
    }
}

/// Address translation configuration.
///
/// Specifies the walker pool size, the private L1 TLB, probe latencies,
/// and the root of the SV48 page table.
#[derive(Debug, Clone, Deserialize)]
pub struct MmuConfig {
    /// Number of parallel page table walkers
    #[serde(default = "MmuConfig::default_ptw_count")]
    pub ptw_count: usize,

    /// L1 TLB (PTE cache) entry count
    #[serde(default = "MmuConfig::default_l1tlb_entries")]
    pub l1tlb_entries: usize,

    /// L1 TLB probe latency
    #[serde(default = "MmuConfig::default_l1tlb_latency")]
    pub l1tlb_latency: u64,

    /// Backing memory read latency
    #[serde(default = "MmuConfig::default_memory_latency")]
    pub memory_latency: u64,

    /// Root page table physical page number
    #[serde(default = "MmuConfig::default_root_ppn")]
    pub root_ppn: u64,
}

impl MmuConfig {
    /// Returns the default walker count.
    fn default_ptw_count() -> usize {
        defaults::PTW_COUNT
    }

    /// Returns the default L1 TLB entry count.
    fn default_l1tlb_entries() -> usize {
        defaults::L1TLB_ENTRIES
    }

    /// Returns the default L1 TLB latency.
    fn default_l1tlb_latency() -> u64 {
        defaults::L1TLB_LATENCY
    }

    /// Returns the default memory latency.
    fn default_memory_latency() -> u64 {
        defaults::MEMORY_LATENCY
    }

    /// Returns the default root page table PPN.
    fn default_root_ppn() -> u64 {
        defaults::ROOT_PPN
    }

    /// Checks MMU parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ptw_count == 0 {
            return Err(ConfigError::NoWalkers);
        }
        if self.l1tlb_entries == 0 {
            return Err(ConfigError::ZeroWidth("l1tlb_entries"));
        }
        Ok(())
    }
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            ptw_count: defaults::PTW_COUNT,
            l1tlb_entries: defaults::L1TLB_ENTRIES,
            l1tlb_latency: defaults::L1TLB_LATENCY,
            memory_latency: defaults::MEMORY_LATENCY,
            root_ppn: defaults::ROOT_PPN,
        }
    }
}
