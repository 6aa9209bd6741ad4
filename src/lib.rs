//! Quest engine: timed collection objectives, randomized server-wide
//! bounties, multi-factor rewards and durable progression.

pub mod config;
pub mod db;
pub mod quest;
