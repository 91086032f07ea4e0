use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use grainsim::core::contact::model::SettingValue;
use grainsim::core::models::wall::Wall;
use grainsim::core::sph::SphKernel;
use grainsim::engine::config::{
    CheckTimestepArgs, MonitorConfig, SimulationConfig, SimulationConfigBuilder, SmoothingMode,
};
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSimulationSection {
    dt: Option<f64>,
    skin: Option<f64>,
    steps: Option<u64>,
    workers: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialContactSection {
    #[serde(default)]
    styles: Vec<String>,
    #[serde(default)]
    settings: BTreeMap<String, SettingValue>,
    coarse_graining: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialWall {
    id: u32,
    #[serde(rename = "type")]
    wall_type: Option<usize>,
    point: [f64; 3],
    normal: [f64; 3],
    angular_velocity: Option<[f64; 3]>,
}

impl PartialWall {
    fn into_wall(self) -> Result<Wall> {
        let wall = Wall::new(
            self.id,
            Point3::from(self.point),
            Vector3::from(self.normal),
        )
        .ok_or_else(|| CliError::Config(format!("Wall {} has a zero-length normal", self.id)))?;
        let wall = match self.wall_type {
            Some(t) => wall.with_wall_type(t),
            None => wall,
        };
        Ok(match self.angular_velocity {
            Some(w) => wall.with_angular_velocity(Vector3::from(w)),
            None => wall,
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCheckTimestepSection {
    #[serde(default)]
    args: Vec<String>,
    kernel: Option<SphKernel>,
    smoothing: Option<SmoothingMode>,
    group: Option<u32>,
}

/// The run configuration file as written by the user; everything is optional
/// until merged with the command line.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialRunConfig {
    #[serde(default)]
    simulation: PartialSimulationSection,
    #[serde(default)]
    contact: PartialContactSection,
    #[serde(default)]
    walls: Vec<PartialWall>,
    check_timestep: Option<PartialCheckTimestepSection>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| CliError::parsing(path, e))
    }

    fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<SimulationConfig> {
        if let Some(raw) = &args.check_timestep {
            let section = self.check_timestep.get_or_insert_with(Default::default);
            section.args = raw.clone();
        }

        let sim = self.simulation;
        let mut builder = SimulationConfigBuilder::new()
            .dt(sim.dt.ok_or_else(|| missing("simulation.dt"))?)
            .skin(sim.skin.ok_or_else(|| missing("simulation.skin"))?)
            .contact_styles(self.contact.styles);

        if let Some(steps) = args.steps.or(sim.steps) {
            builder = builder.steps(steps);
        }
        if let Some(workers) = args.workers.or(sim.workers) {
            builder = builder.workers(workers);
        }
        if let Some(factor) = self.contact.coarse_graining {
            builder = builder.coarse_graining(factor);
        }
        for (key, value) in self.contact.settings {
            builder = builder.contact_setting(&key, value);
        }
        for wall in self.walls {
            builder = builder.wall(wall.into_wall()?);
        }
        if let Some(section) = self.check_timestep {
            builder = builder.monitor(monitor_config(section)?);
        }

        builder
            .build()
            .map_err(|e| CliError::Config(format!("Failed to build simulation config: {}", e)))
    }
}

fn monitor_config(section: PartialCheckTimestepSection) -> Result<MonitorConfig> {
    let args = CheckTimestepArgs::parse(&section.args).map_err(|e| CliError::Config(e.to_string()))?;
    let mut monitor = MonitorConfig::new(args);
    if let Some(kernel) = section.kernel {
        monitor.kernel = kernel;
    }
    if let Some(smoothing) = section.smoothing {
        monitor.smoothing = smoothing;
    }
    if let Some(group) = section.group {
        monitor.group_bit = group;
    }
    Ok(monitor)
}

fn missing(key: &str) -> CliError {
    CliError::Config(format!("Missing required setting '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[simulation]
dt = 0.01
skin = 0.1
steps = 5
workers = 2

[contact]
styles = ["epsd2"]
coarse-graining = 1.0

[contact.settings]
torsionTorque = true

[[walls]]
id = 1
point = [0.0, 0.0, 0.0]
normal = [0.0, 0.0, 2.0]
angular-velocity = [0.0, 0.0, 0.0]

[check-timestep]
args = ["10", "0.1", "warn", "yes"]
kernel = "wendland"
smoothing = "per-type"
"#;

    fn run_args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("sim.toml"),
            particles: PathBuf::from("particles.csv"),
            materials: PathBuf::from("materials.toml"),
            output: None,
            workers: None,
            steps: None,
            check_timestep: None,
        }
    }

    #[test]
    fn full_file_merges_into_simulation_config() {
        let partial = PartialRunConfig::from_toml_str(FULL_CONFIG).unwrap();
        let config = partial.merge_with_cli(&run_args()).unwrap();

        assert_eq!(config.dt, 0.01);
        assert_eq!(config.skin, 0.1);
        assert_eq!(config.steps, 5);
        assert_eq!(config.workers, 2);
        assert_eq!(config.contact.styles, vec!["epsd2".to_string()]);
        assert_eq!(
            config.contact.settings.get("torsionTorque"),
            Some(&SettingValue::Flag(true))
        );
        assert_eq!(config.walls.len(), 1);
        assert!((config.walls[0].normal.z - 1.0).abs() < 1e-12);

        let monitor = config.monitor.unwrap();
        assert_eq!(monitor.args.sample_interval, 10);
        assert!(monitor.args.warn);
        assert_eq!(monitor.kernel, SphKernel::Wendland);
        assert_eq!(monitor.smoothing, SmoothingMode::PerType);
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let partial = PartialRunConfig::from_toml_str(FULL_CONFIG).unwrap();
        let args = RunArgs {
            workers: Some(7),
            steps: Some(1),
            check_timestep: Some(vec!["3".into(), "0.5".into(), "warn".into(), "no".into()]),
            ..run_args()
        };
        let config = partial.merge_with_cli(&args).unwrap();

        assert_eq!(config.workers, 7);
        assert_eq!(config.steps, 1);
        let monitor = config.monitor.unwrap();
        assert_eq!(monitor.args.sample_interval, 3);
        assert!(!monitor.args.warn);
        assert_eq!(monitor.kernel, SphKernel::Wendland);
    }

    #[test]
    fn monitor_is_optional() {
        let partial =
            PartialRunConfig::from_toml_str("[simulation]\ndt = 0.001\nskin = 0.05\n").unwrap();
        let config = partial.merge_with_cli(&run_args()).unwrap();
        assert!(config.monitor.is_none());
        assert!(config.walls.is_empty());
        assert_eq!(config.steps, 1);
    }

    #[test]
    fn missing_timestep_is_reported_by_key() {
        let partial = PartialRunConfig::from_toml_str("[simulation]\nskin = 0.05\n").unwrap();
        let err = partial.merge_with_cli(&run_args()).unwrap_err();
        assert!(err.to_string().contains("simulation.dt"));
    }

    #[test]
    fn bad_check_timestep_arguments_are_rejected() {
        let partial = PartialRunConfig::from_toml_str(
            "[simulation]\ndt = 0.01\nskin = 0.1\n[check-timestep]\nargs = [\"10\", \"0.1\", \"warn\", \"maybe\"]\n",
        )
        .unwrap();
        let err = partial.merge_with_cli(&run_args()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn zero_wall_normal_is_rejected() {
        let partial = PartialRunConfig::from_toml_str(
            "[simulation]\ndt = 0.01\nskin = 0.1\n[[walls]]\nid = 4\npoint = [0.0, 0.0, 0.0]\nnormal = [0.0, 0.0, 0.0]\n",
        )
        .unwrap();
        let err = partial.merge_with_cli(&run_args()).unwrap_err();
        assert!(err.to_string().contains("Wall 4"));
    }

    #[test]
    fn walls_sharing_an_id_are_rejected() {
        let partial = PartialRunConfig::from_toml_str(
            "[simulation]\ndt = 0.01\nskin = 0.1\n\
             [[walls]]\nid = 1\npoint = [0.0, 0.0, 0.0]\nnormal = [0.0, 0.0, 1.0]\n\
             [[walls]]\nid = 1\npoint = [0.0, 0.0, 0.9]\nnormal = [0.0, 0.0, -1.0]\n",
        )
        .unwrap();
        let err = partial.merge_with_cli(&run_args()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("Wall id 1"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PartialRunConfig::from_toml_str("[simulation]\ndelta-t = 0.1\n").is_err());
    }

    #[test]
    fn from_file_reports_parse_errors_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[simulation\ndt = 1").unwrap();
        let err = PartialRunConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }
}
