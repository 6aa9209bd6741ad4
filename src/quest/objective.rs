//! Objective Model
//!
//! One quest instance and its lifecycle state. Objectives are treated as
//! values: progress produces a new copy instead of mutating in place, so a
//! reader holding a clone never sees a half-applied update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a player across the engine
pub type PlayerId = Uuid;

/// Kind of objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectiveType {
    /// Hand in a number of a catalog material
    Material,
    /// Kill a number of monsters (no generator yet)
    Kill,
}

impl ObjectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::Material => "MATERIAL",
            ObjectiveType::Kill => "KILL",
        }
    }
}

/// How an objective came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReleaseMethod {
    /// Accepted by a player, owned by that player
    Normal,
    /// Published by the server, shared by every player
    Bounty,
}

impl ReleaseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseMethod::Normal => "NORMAL",
            ReleaseMethod::Bounty => "BOUNTY",
        }
    }
}

/// Stored lifecycle status of an objective.
///
/// `Expired` exists for completeness; expiry is normally derived through
/// [`Objective::is_expired`] and never written by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectiveStatus {
    Active,
    Completed,
    Expired,
}

/// A single quest instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    /// Owning player; `None` for server-wide bounties
    pub player_id: Option<PlayerId>,
    pub objective_type: ObjectiveType,
    pub release_method: ReleaseMethod,
    /// `<catalogType>:<catalogId>`
    pub material_key: String,
    /// Display name resolved once at generation time
    pub material_name: Option<String>,
    pub required_amount: u32,
    pub current_amount: u32,
    pub start_time: DateTime<Utc>,
    /// Milliseconds; zero or negative means no expiry
    pub time_limit_ms: i64,
    /// Material tier
    pub level: u32,
    /// 1..=32
    pub difficulty: u32,
    pub status: ObjectiveStatus,
}

impl Objective {
    /// Check if the required amount has been reached
    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.required_amount
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.time_limit_ms > 0 && self.elapsed_ms_at(now) > self.time_limit_ms
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_ms_at(Utc::now())
    }

    pub fn elapsed_ms_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_milliseconds()
    }

    /// Active and not yet expired at `now`
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ObjectiveStatus::Active && !self.is_expired_at(now)
    }

    pub fn is_bounty(&self) -> bool {
        self.release_method == ReleaseMethod::Bounty
    }

    /// Items still needed before the objective is complete
    pub fn remaining(&self) -> u32 {
        self.required_amount.saturating_sub(self.current_amount)
    }

    /// Copy with a new progress value, clamped to `required_amount`.
    ///
    /// Progress never goes backwards: a lower value keeps the current one.
    pub fn with_progress(&self, new_amount: u32) -> Self {
        let current_amount = new_amount
            .max(self.current_amount)
            .min(self.required_amount);
        Self {
            current_amount,
            material_name: self.material_name.clone(),
            material_key: self.material_key.clone(),
            ..*self
        }
    }

    /// Copy with a different status
    pub fn with_status(&self, status: ObjectiveStatus) -> Self {
        Self {
            status,
            material_name: self.material_name.clone(),
            material_key: self.material_key.clone(),
            ..*self
        }
    }

    /// Name shown to players: cached display name, else the catalog id
    pub fn display_name(&self) -> &str {
        if let Some(ref name) = self.material_name {
            return name;
        }
        self.material_key
            .split_once(':')
            .map(|(_, id)| id)
            .unwrap_or(&self.material_key)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample(required: u32, current: u32) -> Objective {
        Objective {
            id: Uuid::new_v4(),
            player_id: Some(Uuid::new_v4()),
            objective_type: ObjectiveType::Material,
            release_method: ReleaseMethod::Normal,
            material_key: "MM_DROPS:wolf_pelt".to_string(),
            material_name: None,
            required_amount: required,
            current_amount: current,
            start_time: Utc::now(),
            time_limit_ms: 3_600_000,
            level: 1,
            difficulty: 1,
            status: ObjectiveStatus::Active,
        }
    }

    #[test]
    fn test_with_progress_clamps() {
        let obj = sample(10, 7);
        let updated = obj.with_progress(12);
        assert_eq!(updated.current_amount, 10);
        assert!(updated.is_completed());
        // Source copy is untouched
        assert_eq!(obj.current_amount, 7);
        assert_eq!(updated.id, obj.id);
    }

    #[test]
    fn test_with_progress_never_decreases() {
        let obj = sample(10, 7);
        assert_eq!(obj.with_progress(3).current_amount, 7);
    }

    #[test]
    fn test_expiry_is_derived() {
        let mut obj = sample(10, 0);
        obj.time_limit_ms = 1000;
        let t0 = obj.start_time;

        assert!(!obj.is_expired_at(t0 + Duration::milliseconds(500)));
        assert!(obj.is_expired_at(t0 + Duration::milliseconds(2000)));
        assert_eq!(obj.status, ObjectiveStatus::Active);
        assert_eq!(obj.elapsed_ms_at(t0 + Duration::milliseconds(2000)), 2000);
    }

    #[test]
    fn test_no_time_limit_never_expires() {
        let mut obj = sample(10, 0);
        obj.time_limit_ms = -1;
        assert!(!obj.is_expired_at(obj.start_time + Duration::days(365)));
    }

    #[test]
    fn test_display_name_falls_back_to_catalog_id() {
        let mut obj = sample(10, 0);
        assert_eq!(obj.display_name(), "wolf_pelt");
        obj.material_name = Some("Fine Wolf Pelt".to_string());
        assert_eq!(obj.display_name(), "Fine Wolf Pelt");
    }

    #[test]
    fn test_log_names() {
        assert_eq!(ObjectiveType::Material.as_str(), "MATERIAL");
        assert_eq!(ObjectiveType::Kill.as_str(), "KILL");
        assert_eq!(ReleaseMethod::Normal.as_str(), "NORMAL");
        assert_eq!(ReleaseMethod::Bounty.as_str(), "BOUNTY");
    }
}
