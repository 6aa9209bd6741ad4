//! Quest Service
//!
//! Owns every in-memory objective and wires generation, progress tracking,
//! completion, bounty publication and claims together.
//!
//! Player objectives live in a `DashMap` so unrelated players never
//! contend. The bounty list is a single `Mutex`-guarded sequence. Updates
//! compute a new objective copy and swap it into place under the guard;
//! reward issuance and store writes happen after the guard is released.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::collaborators::{Broadcaster, Catalog, HeldItem};
use super::generator::{BOUNTY_CEILING, GenerationContext, GeneratorRegistry};
use super::objective::{Objective, ObjectiveStatus, ObjectiveType, PlayerId, ReleaseMethod};
use super::reward::RewardDistributor;
use super::scheduler::{BountyScheduler, PublishCallback};
use crate::config::{AllowedTypes, ConfigError, ConfigStore, QuestConfig};
use crate::db::ProgressionStore;

/// A published bounty and the players who already claimed it
#[derive(Debug, Clone)]
pub struct BountyEntry {
    pub objective: Objective,
    pub claimed_by: HashSet<PlayerId>,
}

impl BountyEntry {
    fn new(objective: Objective) -> Self {
        Self {
            objective,
            claimed_by: HashSet::new(),
        }
    }

    /// Complete, still open, and not yet claimed by `player_id`
    fn claimable_by(&self, player_id: PlayerId, now: DateTime<Utc>) -> bool {
        self.objective.is_open_at(now)
            && self.objective.is_completed()
            && !self.claimed_by.contains(&player_id)
    }
}

/// Result of handing in a held item
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Objective state after the submission
    pub objective: Objective,
    /// Items consumed from the player's hand
    pub submitted: u32,
}

/// Fill the bounty announcement template
pub fn format_announcement(template: &str, objective: &Objective) -> String {
    template
        .replace("%material%", objective.display_name())
        .replace("%amount%", &objective.required_amount.to_string())
}

pub struct QuestService {
    config: Arc<ConfigStore>,
    store: Arc<ProgressionStore>,
    generators: GeneratorRegistry,
    rewards: RewardDistributor,
    scheduler: BountyScheduler,
    broadcaster: Arc<dyn Broadcaster>,
    catalog: Arc<dyn Catalog>,
    player_objectives: DashMap<PlayerId, Vec<Objective>>,
    bounties: Mutex<Vec<BountyEntry>>,
}

impl QuestService {
    pub fn new(
        config: Arc<ConfigStore>,
        store: Arc<ProgressionStore>,
        generators: GeneratorRegistry,
        rewards: RewardDistributor,
        scheduler: BountyScheduler,
        broadcaster: Arc<dyn Broadcaster>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            config,
            store,
            generators,
            rewards,
            scheduler,
            broadcaster,
            catalog,
            player_objectives: DashMap::new(),
            bounties: Mutex::new(Vec::new()),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn initialize(self: &Arc<Self>) {
        self.start_bounty_scheduler().await;
        info!("Quest service initialized");
    }

    /// Stop publishing and drop all in-memory objectives.
    ///
    /// Player objectives are not persisted.
    pub async fn shutdown(&self) {
        self.stop_bounty_scheduler().await;

        let players = self.player_objectives.len();
        self.player_objectives.clear();
        self.bounties.lock().await.clear();

        info!("Quest service shut down, discarded objectives of {} players", players);
    }

    /// Stop the scheduler, reload configuration and restart the scheduler
    /// with the new intervals. A failed reload keeps the old configuration.
    pub async fn reload(self: &Arc<Self>) -> Result<(), ConfigError> {
        self.stop_bounty_scheduler().await;

        let result = self.config.load_all().await;
        if let Err(ref e) = result {
            warn!("Quest configuration reload failed, keeping previous: {}", e);
        }

        self.start_bounty_scheduler().await;
        result
    }

    /// Restart the scheduler against the current snapshot, for callers
    /// that already reloaded the configuration
    pub async fn restart_bounty_scheduler(self: &Arc<Self>) -> bool {
        self.stop_bounty_scheduler().await;
        self.start_bounty_scheduler().await
    }

    /// Start (or restart) periodic bounty publication
    pub async fn start_bounty_scheduler(self: &Arc<Self>) -> bool {
        let config = self.config.current().await;
        let service: Weak<Self> = Arc::downgrade(self);

        let callback: PublishCallback = Arc::new(move || {
            let service = service.clone();
            Box::pin(async move {
                if let Some(service) = service.upgrade() {
                    service.publish_bounty().await;
                }
            })
        });

        self.scheduler
            .start(config.bounty.interval_min, config.bounty.interval_max, callback)
            .await
    }

    pub async fn stop_bounty_scheduler(&self) {
        self.scheduler.stop().await;
    }

    pub async fn is_scheduler_running(&self) -> bool {
        self.scheduler.is_running().await
    }

    // ========================================================================
    // Player objectives
    // ========================================================================

    /// Generate and store a new objective for `player_id`.
    ///
    /// Returns `None` if the player already holds an open objective of this
    /// type or nothing could be generated.
    pub async fn accept_normal(
        &self,
        player_id: PlayerId,
        objective_type: ObjectiveType,
    ) -> Option<Objective> {
        if self.active_objective(player_id, objective_type).is_some() {
            debug!(
                "Player {} already has an active {} objective",
                player_id,
                objective_type.as_str()
            );
            return None;
        }

        let ceiling = self.store.get_ceiling(player_id).await;
        let config = self.config.current().await;
        let now = Utc::now();

        let ctx = GenerationContext {
            player_id: Some(player_id),
            release_method: ReleaseMethod::Normal,
            ceiling,
            config: &config,
            now,
        };
        let Some(objective) = self
            .generators
            .generate(objective_type, &ctx, &mut rand::thread_rng())
        else {
            warn!(
                "No {} objective available for player {} at tier {}",
                objective_type.as_str(),
                player_id,
                ceiling
            );
            return None;
        };

        // Re-check under the entry lock; another accept may have raced us
        let mut objectives = self.player_objectives.entry(player_id).or_default();
        if objectives
            .iter()
            .any(|o| o.objective_type == objective_type && o.is_open_at(now))
        {
            return None;
        }
        objectives.push(objective.clone());

        info!(
            "Player {} accepted {} x{} (level {}, difficulty {})",
            player_id,
            objective.material_key,
            objective.required_amount,
            objective.level,
            objective.difficulty
        );

        Some(objective)
    }

    /// Open objectives held by `player_id`
    pub fn active_objectives(&self, player_id: PlayerId) -> Vec<Objective> {
        self.active_objectives_at(player_id, Utc::now())
    }

    pub fn active_objectives_at(&self, player_id: PlayerId, now: DateTime<Utc>) -> Vec<Objective> {
        self.player_objectives
            .get(&player_id)
            .map(|list| list.iter().filter(|o| o.is_open_at(now)).cloned().collect())
            .unwrap_or_default()
    }

    /// The player's open objective of one type
    pub fn active_objective(
        &self,
        player_id: PlayerId,
        objective_type: ObjectiveType,
    ) -> Option<Objective> {
        let now = Utc::now();
        self.player_objectives.get(&player_id).and_then(|list| {
            list.iter()
                .find(|o| o.objective_type == objective_type && o.is_open_at(now))
                .cloned()
        })
    }

    /// Add `amount` progress towards `material_key`.
    ///
    /// The player's own objective takes precedence over the bounty. Player
    /// objectives complete (and pay out) the moment they fill up; bounties
    /// wait for a claim. Returns whether anything matched.
    pub async fn update_progress(&self, player_id: PlayerId, material_key: &str, amount: u32) -> bool {
        self.apply_progress(player_id, material_key, amount).await.is_some()
    }

    /// Add at most the remaining amount to the first matching objective.
    ///
    /// The absorbed amount is decided under the same guard that swaps the
    /// objective, so concurrent submitters never over-count. Returns the
    /// updated objective and the amount absorbed.
    async fn apply_progress(
        &self,
        player_id: PlayerId,
        material_key: &str,
        amount: u32,
    ) -> Option<(Objective, u32)> {
        let now = Utc::now();

        let player_match: Option<(Objective, u32)> = {
            match self.player_objectives.get_mut(&player_id) {
                Some(mut list) => list
                    .iter()
                    .position(|o| {
                        o.objective_type == ObjectiveType::Material
                            && o.material_key == material_key
                            && o.is_open_at(now)
                    })
                    .map(|idx| {
                        let current = &list[idx];
                        let applied = amount.min(current.remaining());
                        let mut updated = current.with_progress(current.current_amount + applied);
                        if updated.is_completed() {
                            updated = updated.with_status(ObjectiveStatus::Completed);
                        }
                        list[idx] = updated.clone();
                        (updated, applied)
                    }),
                None => None,
            }
        };

        if let Some((objective, applied)) = player_match {
            if objective.status == ObjectiveStatus::Completed {
                self.finish(player_id, &objective, now).await;
            }
            return Some((objective, applied));
        }

        let mut bounties = self.bounties.lock().await;
        let entry = bounties.iter_mut().find(|e| {
            e.objective.objective_type == ObjectiveType::Material
                && e.objective.material_key == material_key
                && e.objective.is_open_at(now)
                && !e.objective.is_completed()
        })?;

        let current = &entry.objective;
        let applied = amount.min(current.remaining());
        entry.objective = current.with_progress(current.current_amount + applied);
        debug!(
            "Bounty {} progress {}/{} (by {})",
            entry.objective.id,
            entry.objective.current_amount,
            entry.objective.required_amount,
            player_id
        );
        Some((entry.objective.clone(), applied))
    }

    /// Explicitly complete a full player objective
    pub async fn complete_quest(&self, player_id: PlayerId, objective_id: Uuid) -> bool {
        let now = Utc::now();

        let completed = {
            let Some(mut list) = self.player_objectives.get_mut(&player_id) else {
                return false;
            };
            let Some(idx) = list.iter().position(|o| o.id == objective_id) else {
                return false;
            };
            let objective = &list[idx];
            if objective.status != ObjectiveStatus::Active || !objective.is_completed() {
                return false;
            }
            let done = objective.with_status(ObjectiveStatus::Completed);
            list[idx] = done.clone();
            done
        };

        self.finish(player_id, &completed, now).await;
        true
    }

    /// Hand in a held item against the matching objective.
    ///
    /// Submits at most what the objective still needs.
    pub async fn submit_held_item(&self, player_id: PlayerId, item: &HeldItem) -> Option<Submission> {
        if item.amount == 0 {
            return None;
        }
        let material_key = self.catalog.catalog_key(item)?;

        let (objective, submitted) = self
            .apply_progress(player_id, &material_key, item.amount)
            .await?;
        if submitted == 0 {
            return None;
        }
        Some(Submission { objective, submitted })
    }

    /// Pay out and log one completion
    async fn finish(&self, player_id: PlayerId, objective: &Objective, now: DateTime<Utc>) {
        let config = self.config.current().await;
        let calc = self
            .rewards
            .distribute(player_id, objective, &config, objective.elapsed_ms_at(now));
        self.store.record_completion(player_id, objective).await;

        info!(
            "Player {} completed {} {} ({}, {} points)",
            player_id,
            objective.release_method.as_str(),
            objective.material_key,
            calc.rating,
            calc.points
        );
    }

    // ========================================================================
    // Bounties
    // ========================================================================

    /// Open bounty objectives
    pub async fn active_bounties(&self) -> Vec<Objective> {
        let now = Utc::now();
        self.bounties
            .lock()
            .await
            .iter()
            .filter(|e| e.objective.is_open_at(now))
            .map(|e| e.objective.clone())
            .collect()
    }

    /// Generate a new bounty, replacing the active one, and announce it
    pub async fn publish_bounty(&self) -> Option<Objective> {
        let config = self.config.current().await;
        let now = Utc::now();

        let objective = {
            let mut rng = rand::thread_rng();
            let objective_type = pick_bounty_type(&config, &mut rng);
            let ctx = GenerationContext {
                player_id: None,
                release_method: ReleaseMethod::Bounty,
                ceiling: BOUNTY_CEILING,
                config: &config,
                now,
            };
            self.generators.generate(objective_type, &ctx, &mut rng)
        };

        let Some(objective) = objective else {
            warn!("No bounty objective could be generated, skipping publication");
            return None;
        };

        {
            let mut bounties = self.bounties.lock().await;
            let evicted = bounties.len();
            bounties.retain(|e| e.objective.status != ObjectiveStatus::Active);
            if evicted > bounties.len() {
                debug!("Evicted {} previous bounties", evicted - bounties.len());
            }
            bounties.push(BountyEntry::new(objective.clone()));
        }

        self.broadcaster
            .send_to_all(&format_announcement(&config.bounty.announcement, &objective));

        info!(
            "Published bounty {} x{}",
            objective.material_key, objective.required_amount
        );

        Some(objective)
    }

    /// Claim the reward of a completed bounty. Each player may claim a
    /// given bounty once.
    pub async fn claim_bounty(&self, player_id: PlayerId, objective_id: Uuid) -> bool {
        let now = Utc::now();

        let objective = {
            let mut bounties = self.bounties.lock().await;
            let Some(entry) = bounties.iter_mut().find(|e| e.objective.id == objective_id) else {
                return false;
            };
            if !entry.claimable_by(player_id, now) {
                return false;
            }
            entry.claimed_by.insert(player_id);
            entry.objective.clone()
        };

        self.finish(player_id, &objective, now).await;
        true
    }

    /// Claim every completed bounty the player has not claimed yet
    pub async fn claim_all_completed_bounties(&self, player_id: PlayerId) -> usize {
        let now = Utc::now();

        let claimed: Vec<Objective> = {
            let mut bounties = self.bounties.lock().await;
            bounties
                .iter_mut()
                .filter(|e| e.claimable_by(player_id, now))
                .map(|e| {
                    e.claimed_by.insert(player_id);
                    e.objective.clone()
                })
                .collect()
        };

        for objective in &claimed {
            self.finish(player_id, objective, now).await;
        }
        claimed.len()
    }

    // ========================================================================
    // Progression
    // ========================================================================

    pub async fn ceiling(&self, player_id: PlayerId) -> u32 {
        self.store.get_ceiling(player_id).await
    }

    /// Raise the player's ceiling to `level`. Never lowers it.
    pub async fn raise_ceiling(&self, player_id: PlayerId, level: u32) -> u32 {
        let current = self.store.get_ceiling(player_id).await;
        if level <= current {
            return current;
        }

        self.store.set_ceiling(player_id, level).await;
        info!("Player {} ceiling raised {} -> {}", player_id, current, level);
        level
    }
}

/// Objective type for the next bounty
fn pick_bounty_type(config: &QuestConfig, rng: &mut impl Rng) -> ObjectiveType {
    let allowed = AllowedTypes::from_str(&config.bounty.allowed_types).unwrap_or_else(|| {
        warn!(
            "Unknown bounty allowed_types {:?}, using MATERIAL",
            config.bounty.allowed_types
        );
        AllowedTypes::Material
    });

    match allowed {
        AllowedTypes::Material => ObjectiveType::Material,
        AllowedTypes::Kill => ObjectiveType::Kill,
        AllowedTypes::Both => {
            if rng.gen_bool(0.5) {
                ObjectiveType::Material
            } else {
                ObjectiveType::Kill
            }
        }
    }
}
