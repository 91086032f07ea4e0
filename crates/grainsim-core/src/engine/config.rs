use crate::core::contact::model::{CoarseGraining, SettingValue};
use crate::core::models::ids::WallId;
use crate::core::models::particle::GROUP_ALL;
use crate::core::models::wall::Wall;
use crate::core::sph::SphKernel;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const CHECK_TIMESTEP_COMMAND: &str = "check/timestep/sph";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Illegal {command} command: expected at least {expected} arguments, found {found}")]
    NotEnoughArguments {
        command: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Illegal {command} command: unknown keyword '{keyword}', use keyword 'warn'")]
    UnknownKeyword {
        command: &'static str,
        keyword: String,
    },

    #[error("Illegal {command} command: keyword '{keyword}' requires a value")]
    MissingValue {
        command: &'static str,
        keyword: String,
    },

    #[error("Illegal {command} command: '{value}' is not a valid value for '{keyword}' (expected yes or no)")]
    InvalidValue {
        command: &'static str,
        keyword: String,
        value: String,
    },

    #[error("Illegal {command} command: cannot read {name} from '{value}'")]
    InvalidNumber {
        command: &'static str,
        name: &'static str,
        value: String,
    },

    #[error("Illegal {command} command: the sample interval must be at least 1")]
    ZeroInterval { command: &'static str },

    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Wall id {0} is used by more than one wall")]
    DuplicateWallId(WallId),
}

/// Wall contacts are keyed by wall id, so ids must be unique.
pub fn check_unique_wall_ids(walls: &[Wall]) -> Result<(), ConfigError> {
    match walls.iter().map(|w| w.id).duplicates().next() {
        Some(id) => Err(ConfigError::DuplicateWallId(id)),
        None => Ok(()),
    }
}

/// Parsed arguments of the `check/timestep/sph` diagnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckTimestepArgs {
    pub sample_interval: u64,
    pub courant_fraction_limit: f64,
    pub warn: bool,
}

impl CheckTimestepArgs {
    /// Parses `<sampleInterval> <courantFractionLimit> [warn yes|no]`.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        const COMMAND: &str = CHECK_TIMESTEP_COMMAND;

        if args.len() < 2 {
            return Err(ConfigError::NotEnoughArguments {
                command: COMMAND,
                expected: 2,
                found: args.len(),
            });
        }

        let interval = args[0].as_ref();
        let sample_interval: u64 = interval.parse().map_err(|_| ConfigError::InvalidNumber {
            command: COMMAND,
            name: "sample interval",
            value: interval.to_string(),
        })?;
        if sample_interval == 0 {
            return Err(ConfigError::ZeroInterval { command: COMMAND });
        }

        let limit = args[1].as_ref();
        let courant_fraction_limit = limit
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| ConfigError::InvalidNumber {
                command: COMMAND,
                name: "Courant fraction limit",
                value: limit.to_string(),
            })?;

        let mut warn = true;
        let mut rest = args[2..].iter().map(AsRef::as_ref);
        while let Some(keyword) = rest.next() {
            if keyword != "warn" {
                return Err(ConfigError::UnknownKeyword {
                    command: COMMAND,
                    keyword: keyword.to_string(),
                });
            }
            warn = match rest.next() {
                Some("yes") => true,
                Some("no") => false,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        command: COMMAND,
                        keyword: keyword.to_string(),
                        value: other.to_string(),
                    });
                }
                None => {
                    return Err(ConfigError::MissingValue {
                        command: COMMAND,
                        keyword: keyword.to_string(),
                    });
                }
            };
        }

        Ok(Self {
            sample_interval,
            courant_fraction_limit,
            warn,
        })
    }
}

/// Where the stability scan takes smoothing lengths from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmoothingMode {
    /// Each particle carries its own smoothing length.
    #[default]
    PerParticle,
    /// Smoothing lengths come from the per-type `sl` material property.
    PerType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub args: CheckTimestepArgs,
    pub kernel: SphKernel,
    pub smoothing: SmoothingMode,
    pub group_bit: u32,
}

impl MonitorConfig {
    pub fn new(args: CheckTimestepArgs) -> Self {
        Self {
            args,
            kernel: SphKernel::default(),
            smoothing: SmoothingMode::default(),
            group_bit: GROUP_ALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactConfig {
    pub styles: Vec<String>,
    pub settings: HashMap<String, SettingValue>,
    pub coarse_graining: CoarseGraining,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub dt: f64,
    pub skin: f64,
    pub steps: u64,
    pub workers: usize,
    pub contact: ContactConfig,
    pub monitor: Option<MonitorConfig>,
    pub walls: Vec<Wall>,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    dt: Option<f64>,
    skin: Option<f64>,
    steps: Option<u64>,
    workers: Option<usize>,
    contact: ContactConfig,
    monitor: Option<MonitorConfig>,
    walls: Vec<Wall>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }
    pub fn skin(mut self, skin: f64) -> Self {
        self.skin = Some(skin);
        self
    }
    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn contact_styles<S: Into<String>>(mut self, styles: impl IntoIterator<Item = S>) -> Self {
        self.contact.styles = styles.into_iter().map(Into::into).collect();
        self
    }
    pub fn contact_setting(mut self, key: &str, value: SettingValue) -> Self {
        self.contact.settings.insert(key.to_string(), value);
        self
    }
    pub fn coarse_graining(mut self, factor: f64) -> Self {
        self.contact.coarse_graining = CoarseGraining(factor);
        self
    }
    pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = Some(monitor);
        self
    }
    pub fn wall(mut self, wall: Wall) -> Self {
        self.walls.push(wall);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let dt = self.dt.ok_or(ConfigError::MissingParameter("dt"))?;
        let skin = self.skin.ok_or(ConfigError::MissingParameter("skin"))?;
        positive("dt", dt)?;
        positive("skin", skin)?;
        positive("coarse_graining", self.contact.coarse_graining.0)?;

        let workers = self.workers.unwrap_or(1);
        if workers == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "workers",
                reason: "at least one worker is required".to_string(),
            });
        }
        check_unique_wall_ids(&self.walls)?;

        Ok(SimulationConfig {
            dt,
            skin,
            steps: self.steps.unwrap_or(1),
            workers,
            contact: self.contact,
            monitor: self.monitor,
            walls: self.walls,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive number, got {}", value),
        })
    }
}
