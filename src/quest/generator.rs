//! Objective Generators
//!
//! One generator per objective type, looked up by type. Adding a new kind
//! of objective means registering another generator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use tracing::{debug, warn};
use uuid::Uuid;

use super::collaborators::Catalog;
use super::objective::{Objective, ObjectiveStatus, ObjectiveType, PlayerId, ReleaseMethod};
use crate::config::{MaterialSpec, QuestConfig};

pub const MIN_DIFFICULTY: u32 = 1;
pub const MAX_DIFFICULTY: u32 = 32;
/// Bounties are equally attractive regardless of the amount asked
pub const BOUNTY_FIXED_DIFFICULTY: u32 = 16;
/// Tier ceiling applied to bounties, which are not gated per player
pub const BOUNTY_CEILING: u32 = 1;

/// Rescale `amount` from `[min, max]` onto `[1, 32]`
pub fn calculate_difficulty(amount: u32, min: u32, max: u32) -> u32 {
    if min >= max {
        return MIN_DIFFICULTY;
    }
    let amount = amount.clamp(min, max);
    let ratio = (amount - min) as f64 / (max - min) as f64;
    let scaled = MIN_DIFFICULTY + (ratio * (MAX_DIFFICULTY - MIN_DIFFICULTY) as f64).round() as u32;
    scaled.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Everything a generator needs to build one objective
pub struct GenerationContext<'a> {
    /// `None` for bounties
    pub player_id: Option<PlayerId>,
    pub release_method: ReleaseMethod,
    /// The player's unlocked material tier
    pub ceiling: u32,
    pub config: &'a QuestConfig,
    pub now: DateTime<Utc>,
}

/// Manufactures objectives of a single type
pub trait ObjectiveGenerator: Send + Sync {
    fn objective_type(&self) -> ObjectiveType;

    /// `None` means no objective is available right now
    fn generate(&self, ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> Option<Objective>;
}

/// Collect-N-of-a-material objectives drawn from the configured pools
pub struct MaterialGenerator {
    catalog: Arc<dyn Catalog>,
}

impl MaterialGenerator {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn resolve_name(&self, key: &str) -> Option<String> {
        match self.catalog.resolve_display_name(key) {
            Ok(name) => name,
            Err(e) => {
                warn!("Display name lookup for {} failed: {}", key, e);
                None
            }
        }
    }
}

impl ObjectiveGenerator for MaterialGenerator {
    fn objective_type(&self) -> ObjectiveType {
        ObjectiveType::Material
    }

    fn generate(&self, ctx: &GenerationContext<'_>, rng: &mut dyn RngCore) -> Option<Objective> {
        let ceiling = match ctx.release_method {
            ReleaseMethod::Normal => ctx.ceiling,
            ReleaseMethod::Bounty => BOUNTY_CEILING,
        };

        let pool: Vec<(String, &MaterialSpec)> = ctx
            .config
            .materials
            .iter()
            .flat_map(|(catalog_type, entries)| {
                entries
                    .iter()
                    .map(move |(id, spec)| (format!("{}:{}", catalog_type, id), spec))
            })
            .filter(|(_, spec)| spec.material_level <= ceiling && spec.min >= 1 && spec.min <= spec.max)
            .collect();

        if pool.is_empty() {
            debug!("No materials available at tier {}", ceiling);
            return None;
        }

        let (key, spec) = &pool[rng.gen_range(0..pool.len())];
        let required_amount = rng.gen_range(spec.min..=spec.max);

        let difficulty = match ctx.release_method {
            ReleaseMethod::Normal => calculate_difficulty(required_amount, spec.min, spec.max),
            ReleaseMethod::Bounty => BOUNTY_FIXED_DIFFICULTY,
        };

        Some(Objective {
            id: Uuid::new_v4(),
            player_id: ctx.player_id,
            objective_type: ObjectiveType::Material,
            release_method: ctx.release_method,
            material_name: self.resolve_name(key),
            material_key: key.clone(),
            required_amount,
            current_amount: 0,
            start_time: ctx.now,
            time_limit_ms: ctx.config.tasks.material.default_time_limit_ms,
            level: spec.material_level,
            difficulty,
            status: ObjectiveStatus::Active,
        })
    }
}

/// Type -> generator lookup
pub struct GeneratorRegistry {
    generators: HashMap<ObjectiveType, Box<dyn ObjectiveGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Registry with every generator that exists today
    pub fn with_defaults(catalog: Arc<dyn Catalog>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MaterialGenerator::new(catalog)));
        registry
    }

    /// Add a generator, replacing any previous one for the same type
    pub fn register(&mut self, generator: Box<dyn ObjectiveGenerator>) {
        let objective_type = generator.objective_type();
        if self.generators.insert(objective_type, generator).is_some() {
            warn!("Replacing generator for {}", objective_type.as_str());
        }
    }

    pub fn supports(&self, objective_type: ObjectiveType) -> bool {
        self.generators.contains_key(&objective_type)
    }

    pub fn generate(
        &self,
        objective_type: ObjectiveType,
        ctx: &GenerationContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<Objective> {
        let Some(generator) = self.generators.get(&objective_type) else {
            debug!("No generator for {} objectives", objective_type.as_str());
            return None;
        };
        generator.generate(ctx, rng)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaterialPools;
    use crate::quest::collaborators::testing::FixedCatalog;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn pools(entries: &[(&str, &str, u32, u32, u32)]) -> MaterialPools {
        let mut pools: MaterialPools = BTreeMap::new();
        for (catalog_type, id, min, max, level) in entries {
            pools.entry(catalog_type.to_string()).or_default().insert(
                id.to_string(),
                MaterialSpec {
                    min: *min,
                    max: *max,
                    material_level: *level,
                },
            );
        }
        pools
    }

    fn context<'a>(config: &'a QuestConfig, release_method: ReleaseMethod, ceiling: u32) -> GenerationContext<'a> {
        GenerationContext {
            player_id: match release_method {
                ReleaseMethod::Normal => Some(Uuid::new_v4()),
                ReleaseMethod::Bounty => None,
            },
            release_method,
            ceiling,
            config,
            now: Utc::now(),
        }
    }

    fn catalog() -> Arc<FixedCatalog> {
        let mut catalog = FixedCatalog::default();
        catalog.names.insert("DROPS:pelt".to_string(), "Wolf Pelt".to_string());
        Arc::new(catalog)
    }

    #[test]
    fn test_difficulty_boundaries() {
        assert_eq!(calculate_difficulty(16, 16, 256), 1);
        assert_eq!(calculate_difficulty(256, 16, 256), 32);
        assert_eq!(calculate_difficulty(5, 5, 5), 1);
        assert_eq!(calculate_difficulty(500, 5, 5), 1);
        assert_eq!(calculate_difficulty(0, 16, 256), 1);
        assert_eq!(calculate_difficulty(1000, 16, 256), 32);
        // Midpoint lands in the middle of the range
        assert_eq!(calculate_difficulty(136, 16, 256), 17);
    }

    #[test]
    fn test_normal_objective_respects_ranges() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "pelt", 10, 20, 1)]);
        let generator = MaterialGenerator::new(catalog());
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let ctx = context(&config, ReleaseMethod::Normal, 1);
            let objective = generator.generate(&ctx, &mut rng).unwrap();
            assert!((10..=20).contains(&objective.required_amount));
            assert_eq!(
                objective.difficulty,
                calculate_difficulty(objective.required_amount, 10, 20)
            );
            assert_eq!(objective.material_key, "DROPS:pelt");
            assert_eq!(objective.material_name.as_deref(), Some("Wolf Pelt"));
            assert_eq!(objective.current_amount, 0);
            assert_eq!(objective.status, ObjectiveStatus::Active);
            assert_eq!(objective.player_id, ctx.player_id);
            assert_eq!(objective.time_limit_ms, 3_600_000);
        }
    }

    #[test]
    fn test_ceiling_filters_materials() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "pelt", 1, 5, 1), ("DROPS", "fang", 1, 5, 3)]);
        let generator = MaterialGenerator::new(catalog());
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..30 {
            let objective = generator
                .generate(&context(&config, ReleaseMethod::Normal, 2), &mut rng)
                .unwrap();
            assert_eq!(objective.material_key, "DROPS:pelt");
            assert_eq!(objective.level, 1);
        }

        let mut saw_fang = false;
        for _ in 0..60 {
            let objective = generator
                .generate(&context(&config, ReleaseMethod::Normal, 3), &mut rng)
                .unwrap();
            saw_fang |= objective.level == 3;
        }
        assert!(saw_fang);
    }

    #[test]
    fn test_bounty_uses_fixed_difficulty_and_base_tier() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "pelt", 1, 500, 1), ("DROPS", "fang", 1, 5, 2)]);
        let generator = MaterialGenerator::new(catalog());
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..30 {
            // A high ceiling is ignored for bounties
            let objective = generator
                .generate(&context(&config, ReleaseMethod::Bounty, 10), &mut rng)
                .unwrap();
            assert_eq!(objective.difficulty, BOUNTY_FIXED_DIFFICULTY);
            assert_eq!(objective.material_key, "DROPS:pelt");
            assert!(objective.player_id.is_none());
            assert!(objective.is_bounty());
        }
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "fang", 1, 5, 4)]);
        let generator = MaterialGenerator::new(catalog());
        let mut rng = StdRng::seed_from_u64(1);

        assert!(generator.generate(&context(&config, ReleaseMethod::Normal, 1), &mut rng).is_none());

        config.materials.clear();
        assert!(generator.generate(&context(&config, ReleaseMethod::Normal, 9), &mut rng).is_none());
    }

    #[test]
    fn test_catalog_failure_does_not_abort_generation() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "pelt", 1, 5, 1)]);
        let catalog = FixedCatalog {
            broken: vec!["DROPS:pelt".to_string()],
            ..Default::default()
        };
        let generator = MaterialGenerator::new(Arc::new(catalog));
        let mut rng = StdRng::seed_from_u64(5);

        let objective = generator
            .generate(&context(&config, ReleaseMethod::Normal, 1), &mut rng)
            .unwrap();
        assert!(objective.material_name.is_none());
        assert_eq!(objective.display_name(), "pelt");
    }

    #[test]
    fn test_registry_has_no_kill_generator() {
        let mut config = QuestConfig::with_defaults();
        config.materials = pools(&[("DROPS", "pelt", 1, 5, 1)]);
        let registry = GeneratorRegistry::with_defaults(catalog());
        let mut rng = StdRng::seed_from_u64(9);

        assert!(registry.supports(ObjectiveType::Material));
        assert!(!registry.supports(ObjectiveType::Kill));

        let ctx = context(&config, ReleaseMethod::Normal, 1);
        assert!(registry.generate(ObjectiveType::Kill, &ctx, &mut rng).is_none());
        assert!(registry.generate(ObjectiveType::Material, &ctx, &mut rng).is_some());
    }
}
