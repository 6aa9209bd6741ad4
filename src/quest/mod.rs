//! Quest Engine
//!
//! Timed material-collection objectives for individual players, plus
//! server-wide bounties published on a randomized schedule. Rewards scale
//! with material tier, quantity, bounty status and completion speed.

pub mod collaborators;
pub mod currency;
pub mod generator;
pub mod objective;
pub mod reward;
pub mod scheduler;
pub mod service;

pub use collaborators::{
    Broadcaster, Catalog, HeldItem, LoggingBroadcaster, LoggingIssuer, PassthroughCatalog,
    RewardIssuer,
};
pub use currency::CurrencyStack;
pub use generator::{GenerationContext, GeneratorRegistry, MaterialGenerator, ObjectiveGenerator};
pub use objective::{Objective, ObjectiveStatus, ObjectiveType, PlayerId, ReleaseMethod};
pub use reward::{RewardCalculation, RewardDistributor};
pub use scheduler::BountyScheduler;
pub use service::{BountyEntry, QuestService, Submission};
