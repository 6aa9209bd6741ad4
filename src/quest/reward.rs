//! Reward Calculation and Distribution
//!
//! Rewards are `base x level multiplier x bounty multiplier x time
//! multiplier`, applied separately to quest points and currency.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::collaborators::{Broadcaster, RewardIssuer};
use super::currency::{self, CurrencyStack};
use super::objective::{Objective, PlayerId, ReleaseMethod};
use crate::config::{BountySettings, QuestConfig, RewardSettings, TimeBand};

/// Used when no time band matches
pub const FALLBACK_TIME_MULTIPLIER: f64 = 0.8;
pub const FALLBACK_RATING: &str = "Poor";

/// Outcome of a reward calculation
#[derive(Debug, Clone, PartialEq)]
pub struct RewardCalculation {
    pub points: i64,
    pub currency_type: String,
    /// Currency units before decomposition into stacks
    pub currency_amount: i64,
    pub level_multiplier: f64,
    pub bounty_multiplier: f64,
    pub time_multiplier: f64,
    /// Display label of the matched time band
    pub rating: String,
}

impl RewardCalculation {
    /// Combined multiplier applied to every base value
    pub fn multiplier(&self) -> f64 {
        self.level_multiplier * self.bounty_multiplier * self.time_multiplier
    }
}

/// First band (best first) whose threshold covers `elapsed_ms`
pub fn rate_time(elapsed_ms: i64, bands: &[TimeBand]) -> (f64, String) {
    bands
        .iter()
        .find(|band| band.matches(elapsed_ms))
        .map(|band| (band.multiplier, band.display.clone()))
        .unwrap_or_else(|| (FALLBACK_TIME_MULTIPLIER, FALLBACK_RATING.to_string()))
}

/// Pure reward calculation for an objective completed after `elapsed_ms`
pub fn calculate(
    objective: &Objective,
    rewards: &RewardSettings,
    bands: &[TimeBand],
    bounty: &BountySettings,
    elapsed_ms: i64,
) -> RewardCalculation {
    let level_multiplier = objective.level as f64 * objective.difficulty as f64;
    let bounty_multiplier = match objective.release_method {
        ReleaseMethod::Bounty => bounty.bounty_bonus,
        ReleaseMethod::Normal => 1.0,
    };
    let (time_multiplier, rating) = rate_time(elapsed_ms, bands);

    let multiplier = level_multiplier * bounty_multiplier * time_multiplier;

    RewardCalculation {
        points: (rewards.points as f64 * multiplier).round() as i64,
        currency_type: rewards.currency.currency_type.clone(),
        currency_amount: (rewards.currency.amount as f64 * multiplier).round() as i64,
        level_multiplier,
        bounty_multiplier,
        time_multiplier,
        rating,
    }
}

/// Fill the completion message template
pub fn format_completion_message(template: &str, calc: &RewardCalculation) -> String {
    template
        .replace("%rating%", &calc.rating)
        .replace("%multiplier%", &format!("{:.2}", calc.multiplier()))
        .replace("%points%", &calc.points.to_string())
        .replace("%currency%", &calc.currency_amount.to_string())
}

/// Hands out points and currency for completed objectives
pub struct RewardDistributor {
    issuer: Arc<dyn RewardIssuer>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl RewardDistributor {
    pub fn new(issuer: Arc<dyn RewardIssuer>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            issuer,
            broadcaster,
        }
    }

    /// Calculate and issue rewards to `player_id`.
    ///
    /// Issuance failures are logged and never stop the remaining rewards.
    pub fn distribute(
        &self,
        player_id: PlayerId,
        objective: &Objective,
        config: &QuestConfig,
        elapsed_ms: i64,
    ) -> RewardCalculation {
        let calc = calculate(
            objective,
            &config.rewards,
            &config.time_bands,
            &config.bounty,
            elapsed_ms,
        );

        if calc.points > 0 {
            if let Err(e) = self.issuer.issue_points(player_id, calc.points) {
                error!("Failed to issue {} quest points to {}: {}", calc.points, player_id, e);
            }
        }

        if calc.currency_amount > 0 {
            let stacks = currency::decompose(calc.currency_amount as u64, &config.rewards.currency.stacks);
            if stacks.is_empty() {
                warn!(
                    "Currency reward of {} could not be expressed with the configured stacks",
                    calc.currency_amount
                );
            }
            for stack in &stacks {
                self.issue_stack(player_id, &calc.currency_type, stack);
            }
        }

        let message = format_completion_message(&config.rewards.completion_message, &calc);
        self.broadcaster.send_to(player_id, &message);

        debug!(
            "Rewarded {} for {}: {} points, {} currency (x{:.2})",
            player_id,
            objective.id,
            calc.points,
            calc.currency_amount,
            calc.multiplier()
        );

        calc
    }

    fn issue_stack(&self, player_id: PlayerId, currency_type: &str, stack: &CurrencyStack) {
        if let Err(e) = self
            .issuer
            .issue_currency(player_id, currency_type, &stack.item_id, stack.count)
        {
            error!(
                "Failed to issue {}x {} to {}: {}",
                stack.count, stack.item_id, player_id, e
            );
        }
    }
}
