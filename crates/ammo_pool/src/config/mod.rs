//! Configuration system
//!
//! Serde-backed configuration for pools, the physics world, the settlement
//! protocol, projectiles and emitters. Files are TOML or RON, picked by
//! extension. Every section has defaults so partial files are accepted.

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::{Transform2D, Vec2};
use crate::physics::{CollisionLayers, WritePolicy};

/// File formats, picked by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            Ok(Self::Toml)
        } else if path.ends_with(".ron") {
            Ok(Self::Ron)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Check semantic constraints after parsing
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        let config = match format {
            ConfigFormat::Toml => Self::from_toml_str(&contents)?,
            ConfigFormat::Ron => Self::from_ron_str(&contents)?,
        };
        log::info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a RON document
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Parsed values violate a constraint
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default parked position, far outside any play area
pub const DEFAULT_PARKED_POSITION: [f32; 2] = [-100_000.0, -100_000.0];

/// Physics world settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Whether teleports land immediately or at a step boundary
    pub write_policy: WritePolicy,
    /// Step boundaries a deferred teleport waits before landing
    pub teleport_latency_steps: u32,
    /// Speed below which an idle body starts counting towards sleep (0 disables sleep)
    pub sleep_speed_threshold: f32,
    /// Seconds of rest before a body falls asleep
    pub sleep_delay: f32,
    /// Fixed physics step in seconds
    pub fixed_timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::Immediate,
            teleport_latency_steps: 1,
            sleep_speed_threshold: 0.1,
            sleep_delay: 0.5,
            fixed_timestep: 1.0 / 60.0,
        }
    }
}

/// Launch settlement protocol settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Maximum distance between reported and expected position counted as settled
    pub tolerance: f32,
    /// Step boundaries to wait before revealing an unsettled entity anyway
    pub max_steps: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            max_steps: 2,
        }
    }
}

/// One pool's setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Unique pool name
    pub name: String,
    /// Fixed number of entities
    pub capacity: usize,
    /// Where released entities are parked
    pub parked: Transform2D,
}

impl PoolConfig {
    /// Pool config with default parking
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            ..Self::default()
        }
    }

    /// Set the parked transform
    pub fn with_parked(mut self, parked: Transform2D) -> Self {
        self.parked = parked;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("pool name must not be empty".to_string()));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(format!(
                "pool '{}' must have a positive capacity",
                self.name
            )));
        }
        if !self.parked.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "pool '{}' has a non-finite parked transform",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "projectiles".to_string(),
            capacity: 64,
            parked: Transform2D::from_position(Vec2::new(
                DEFAULT_PARKED_POSITION[0],
                DEFAULT_PARKED_POSITION[1],
            )),
        }
    }
}

/// Projectile behaviour settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Seconds a projectile lives after activation
    pub lifetime: f32,
    /// Damage handed to the hit hook
    pub damage: f32,
    /// Fraction of the way velocity turns toward the target each step (0 disables homing)
    pub homing_strength: f32,
    /// Lifetime fraction where the fade-out starts
    pub fade_start: f32,
    /// Lifetime fraction where opacity reaches zero
    pub fade_end: f32,
    /// Radius used for hit tests
    pub collision_radius: f32,
    /// Layers a projectile counts as hits
    pub collision_mask: CollisionLayers,
    /// Body mass
    pub mass: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            lifetime: 2.0,
            damage: 1.0,
            homing_strength: 0.0,
            fade_start: 0.6,
            fade_end: 0.9,
            collision_radius: 2.0,
            collision_mask: CollisionLayers::ENEMY | CollisionLayers::ENVIRONMENT,
            mass: 1.0,
        }
    }
}

impl ProjectileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.lifetime > 0.0 && self.lifetime.is_finite()) {
            return Err(ConfigError::Invalid("projectile lifetime must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.homing_strength) {
            return Err(ConfigError::Invalid("homing_strength must be within 0..=1".to_string()));
        }
        if !(0.0 <= self.fade_start && self.fade_start < self.fade_end && self.fade_end <= 1.0) {
            return Err(ConfigError::Invalid(
                "fade window must satisfy 0 <= fade_start < fade_end <= 1".to_string(),
            ));
        }
        if self.collision_radius < 0.0 {
            return Err(ConfigError::Invalid("collision_radius must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Emission driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Pool the emitter draws from
    pub pool: String,
    /// Fixed-rate triggers per second (0 disables the timer)
    pub fire_rate: f32,
    /// Launch speed in units per second
    pub speed: f32,
    /// Launches per trigger
    pub burst_count: u32,
    /// Total angle covered by one burst, in degrees
    pub spread_degrees: f32,
    /// Aim direction in degrees when no target is given
    pub base_direction_degrees: f32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            pool: "projectiles".to_string(),
            fire_rate: 4.0,
            speed: 300.0,
            burst_count: 1,
            spread_degrees: 0.0,
            base_direction_degrees: 0.0,
        }
    }
}

impl EmitterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.burst_count == 0 {
            return Err(ConfigError::Invalid(format!(
                "emitter for '{}' must launch at least one projectile per burst",
                self.pool
            )));
        }
        if !(self.speed.is_finite() && self.spread_degrees.is_finite() && self.fire_rate >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "emitter for '{}' has invalid speed, spread or rate",
                self.pool
            )));
        }
        Ok(())
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics world
    pub physics: PhysicsConfig,
    /// Launch settlement
    pub settlement: SettlementConfig,
    /// Projectile behaviour
    pub projectile: ProjectileConfig,
    /// Pools to create at startup
    pub pools: Vec<PoolConfig>,
    /// Emitters to create at startup
    pub emitters: Vec<EmitterConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            settlement: SettlementConfig::default(),
            projectile: ProjectileConfig::default(),
            pools: vec![PoolConfig::default()],
            emitters: vec![EmitterConfig::default()],
        }
    }
}

impl Config for SimulationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.physics.fixed_timestep > 0.0 && self.physics.fixed_timestep.is_finite()) {
            return Err(ConfigError::Invalid("fixed_timestep must be positive".to_string()));
        }
        if self.settlement.tolerance < 0.0 || self.settlement.max_steps == 0 {
            return Err(ConfigError::Invalid(
                "settlement needs a non-negative tolerance and at least one step".to_string(),
            ));
        }
        self.projectile.validate()?;

        for (index, pool) in self.pools.iter().enumerate() {
            pool.validate()?;
            if self.pools[..index].iter().any(|other| other.name == pool.name) {
                return Err(ConfigError::Invalid(format!("duplicate pool name '{}'", pool.name)));
            }
        }

        for emitter in &self.emitters {
            emitter.validate()?;
            if !self.pools.iter().any(|pool| pool.name == emitter.pool) {
                return Err(ConfigError::Invalid(format!(
                    "emitter references unknown pool '{}'",
                    emitter.pool
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parked_default_is_not_origin() {
        let pool = PoolConfig::default();
        assert_ne!(pool.parked.position, Vec2::zeros());
    }

    #[test]
    fn test_toml_partial_document() {
        let toml_src = r#"
            [settlement]
            tolerance = 0.5
            max_steps = 3

            [[pools]]
            name = "bullets"
            capacity = 8

            [[emitters]]
            pool = "bullets"
            burst_count = 3
            spread_degrees = 30.0
        "#;

        let config = SimulationConfig::from_toml_str(toml_src).expect("valid toml");
        assert_eq!(config.settlement.max_steps, 3);
        assert_eq!(config.pools[0].capacity, 8);
        assert_eq!(config.pools[0].parked, PoolConfig::default().parked);
        assert_eq!(config.emitters[0].burst_count, 3);
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SimulationConfig::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let parsed = SimulationConfig::from_ron_str(&text).expect("valid ron");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = SimulationConfig::default();
        config.pools[0].capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let mut config = SimulationConfig::default();
        config.pools.push(PoolConfig::default());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_emitter_unknown_pool_rejected() {
        let mut config = SimulationConfig::default();
        config.emitters[0].pool = "missing".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_extension_checked_before_reading() {
        let result = SimulationConfig::load_from_file("no_such_dir/settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));

        let result = SimulationConfig::default().save_to_file("no_such_dir/settings.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_with_known_extension_is_io_error() {
        let result = SimulationConfig::load_from_file("no_such_dir/settings.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
