//! Quest Configuration
//!
//! TOML configuration for material pools, rewards, time bands, bounty
//! publication and deadlines. Reloaded as a unit.

pub mod defaults;
pub mod definition;
pub mod store;

pub use definition::{
    AllowedTypes, BountySettings, CurrencySettings, MaterialPools, MaterialSpec, QuestConfig,
    RewardSettings, TaskLimits, TaskSettings, TimeBand,
};
pub use store::{ConfigError, ConfigStore, HotReloadEvent};
