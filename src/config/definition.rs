//! Configuration Structures
//!
//! These structures are deserialized from the TOML files in the quest
//! configuration directory. Every key is optional.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_POINTS: i64 = 12;
pub const DEFAULT_CURRENCY_TYPE: &str = "CURRENCY";
pub const DEFAULT_BASE_CURRENCY: i64 = 1;
pub const DEFAULT_BOUNTY_BONUS: f64 = 1.5;
pub const DEFAULT_INTERVAL_MIN: i64 = 20;
pub const DEFAULT_INTERVAL_MAX: i64 = 40;
pub const DEFAULT_TIME_LIMIT_MS: i64 = 3_600_000;
pub const DEFAULT_MIN_AMOUNT: u32 = 16;
pub const DEFAULT_MAX_AMOUNT: u32 = 256;
pub const DEFAULT_MATERIAL_LEVEL: u32 = 1;

pub const DEFAULT_COMPLETION_MESSAGE: &str =
    "Quest complete! Rating: %rating% (reward x%multiplier%) earned %points% quest points + %currency% currency";
pub const DEFAULT_ANNOUNCEMENT: &str =
    "[Bounty] Collect %material% x%amount% - great rewards for whoever delivers!";

/// Complete configuration snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestConfig {
    pub rewards: RewardSettings,
    pub time_bands: Vec<TimeBand>,
    pub materials: MaterialPools,
    pub bounty: BountySettings,
    pub tasks: TaskSettings,
}

// ============================================================================
// rewards.toml
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    /// Base quest points before multipliers
    pub points: i64,
    pub currency: CurrencySettings,
    pub completion_message: String,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            points: DEFAULT_BASE_POINTS,
            currency: CurrencySettings::default(),
            completion_message: DEFAULT_COMPLETION_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Catalog type of the currency items
    #[serde(rename = "type")]
    pub currency_type: String,
    /// Base currency before multipliers
    pub amount: i64,
    /// `stack-N` -> catalog item id; `stack-N` is worth 64^N units
    pub stacks: BTreeMap<String, String>,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        let mut stacks = BTreeMap::new();
        stacks.insert("stack-0".to_string(), "stardust-0".to_string());
        stacks.insert("stack-1".to_string(), "stardust-1".to_string());
        Self {
            currency_type: DEFAULT_CURRENCY_TYPE.to_string(),
            amount: DEFAULT_BASE_CURRENCY,
            stacks,
        }
    }
}

// ============================================================================
// time_bands.toml
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimeBandsFile {
    #[serde(default)]
    pub band: Vec<TimeBand>,
}

/// Elapsed-time threshold mapped to a multiplier and rating label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBand {
    pub display: String,
    /// Absent or negative means unlimited (always matches)
    #[serde(default)]
    pub max_elapsed_ms: Option<i64>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl TimeBand {
    pub fn new(display: &str, max_elapsed_ms: Option<i64>, multiplier: f64) -> Self {
        Self {
            display: display.to_string(),
            max_elapsed_ms,
            multiplier,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_elapsed_ms.map_or(true, |max| max < 0)
    }

    pub fn matches(&self, elapsed_ms: i64) -> bool {
        match self.max_elapsed_ms {
            Some(max) if max >= 0 => elapsed_ms <= max,
            _ => true,
        }
    }
}

/// Bands shipped with a fresh install, best first
pub fn default_time_bands() -> Vec<TimeBand> {
    vec![
        TimeBand::new("Ultra Extreme+", Some(300_000), 2.0),
        TimeBand::new("Extreme", Some(600_000), 1.8),
        TimeBand::new("Master", Some(900_000), 1.5),
        TimeBand::new("Normal", Some(1_200_000), 1.2),
        TimeBand::new("Adequate", Some(1_800_000), 1.0),
        TimeBand::new("Poor", None, 0.8),
    ]
}

// ============================================================================
// materials.toml
// ============================================================================

/// catalog type -> catalog id -> entry
pub type MaterialPools = BTreeMap<String, BTreeMap<String, MaterialSpec>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMaterialsFile {
    #[serde(default)]
    pub materials: MaterialPools,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSpec {
    pub min: u32,
    pub max: u32,
    pub material_level: u32,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_AMOUNT,
            max: DEFAULT_MAX_AMOUNT,
            material_level: DEFAULT_MATERIAL_LEVEL,
        }
    }
}

// ============================================================================
// bounty.toml
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBountyFile {
    #[serde(default)]
    pub bounty: BountySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BountySettings {
    /// Minutes
    pub interval_min: i64,
    /// Minutes
    pub interval_max: i64,
    pub bounty_bonus: f64,
    /// `MATERIAL`, `KILL` or `BOTH`
    pub allowed_types: String,
    pub announcement: String,
}

impl Default for BountySettings {
    fn default() -> Self {
        Self {
            interval_min: DEFAULT_INTERVAL_MIN,
            interval_max: DEFAULT_INTERVAL_MAX,
            bounty_bonus: DEFAULT_BOUNTY_BONUS,
            allowed_types: "MATERIAL".to_string(),
            announcement: DEFAULT_ANNOUNCEMENT.to_string(),
        }
    }
}

/// Which objective types the publisher may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedTypes {
    Material,
    Kill,
    Both,
}

impl AllowedTypes {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MATERIAL" => Some(AllowedTypes::Material),
            "KILL" => Some(AllowedTypes::Kill),
            "BOTH" => Some(AllowedTypes::Both),
            _ => None,
        }
    }
}

// ============================================================================
// tasks.toml
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    pub material: TaskLimits,
    pub kill: TaskLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLimits {
    /// Zero or negative disables expiry
    pub default_time_limit_ms: i64,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            default_time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }
}

impl QuestConfig {
    /// Configuration with the shipped defaults and no materials
    pub fn with_defaults() -> Self {
        Self {
            time_bands: default_time_bands(),
            ..Self::default()
        }
    }
}
