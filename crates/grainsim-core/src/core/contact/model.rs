use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::ContactError;
use super::data::{CollisionData, ContactData, ForceData};
use super::flags::{Capabilities, TouchFlags};
use crate::core::properties::registry::PropertyRegistry;

/// A model-specific configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Real(f64),
}

impl SettingValue {
    fn kind(&self) -> &'static str {
        match self {
            SettingValue::Flag(_) => "a boolean",
            SettingValue::Real(_) => "a number",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Unknown contact model setting '{0}'")]
    UnknownSetting(String),
    #[error("Setting '{key}' expects {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("Setting '{key}' is declared by both '{first}' and '{second}'")]
    Conflict {
        key: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone)]
struct DeclaredSetting {
    owner: String,
    value: SettingValue,
}

/// Configuration keys declared by the active contact models.
///
/// Models declare keys with defaults in `register_settings`; user values are
/// applied afterwards and must match a declared key and its type.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    declared: BTreeMap<String, DeclaredSetting>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_flag(&mut self, owner: &str, key: &str, default: bool) -> Result<(), SettingsError> {
        self.declare(owner, key, SettingValue::Flag(default))
    }

    pub fn declare_real(&mut self, owner: &str, key: &str, default: f64) -> Result<(), SettingsError> {
        self.declare(owner, key, SettingValue::Real(default))
    }

    fn declare(&mut self, owner: &str, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        if let Some(existing) = self.declared.get(key) {
            if existing.owner != owner {
                return Err(SettingsError::Conflict {
                    key: key.to_string(),
                    first: existing.owner.clone(),
                    second: owner.to_string(),
                });
            }
        }
        self.declared.insert(
            key.to_string(),
            DeclaredSetting {
                owner: owner.to_string(),
                value,
            },
        );
        Ok(())
    }

    /// Overrides declared defaults with user-supplied values.
    pub fn apply(&mut self, user: &HashMap<String, SettingValue>) -> Result<(), SettingsError> {
        for (key, value) in user {
            let declared = self
                .declared
                .get_mut(key)
                .ok_or_else(|| SettingsError::UnknownSetting(key.clone()))?;
            if std::mem::discriminant(&declared.value) != std::mem::discriminant(value) {
                return Err(SettingsError::TypeMismatch {
                    key: key.clone(),
                    expected: declared.value.kind(),
                });
            }
            declared.value = *value;
        }
        Ok(())
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.declared.get(key)?.value {
            SettingValue::Flag(b) => Some(b),
            SettingValue::Real(_) => None,
        }
    }

    pub fn real(&self, key: &str) -> Option<f64> {
        match self.declared.get(key)?.value {
            SettingValue::Real(r) => Some(r),
            SettingValue::Flag(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }
}

/// Coarse-graining factor; `1.0` means the particles are the real ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseGraining(pub f64);

impl CoarseGraining {
    pub const OFF: CoarseGraining = CoarseGraining(1.0);

    pub fn is_active(&self) -> bool {
        self.0 > 1.0
    }
}

impl Default for CoarseGraining {
    fn default() -> Self {
        Self::OFF
    }
}

/// Read-only facts about the host simulation that models validate against.
#[derive(Debug, Clone, Copy)]
pub struct ModelEnvironment<'a> {
    pub coarse_graining: CoarseGraining,
    pub settings: &'a Settings,
}

/// A pairwise contact law plugged into the force pipeline.
///
/// The dispatcher only invokes hooks whose bit is present in
/// [`capabilities`](ContactModel::capabilities). A model never holds a
/// reference into the history store; it remembers the offset it was given by
/// [`HistorySetup`](super::history::HistorySetup) at construction and reads
/// `contact_history[offset..]` of whatever row it is handed.
pub trait ContactModel: Send + Sync {
    /// Unique style name, e.g. `epsd2`.
    fn style(&self) -> &'static str;

    /// Unique numeric identifier of the style.
    fn id(&self) -> u32;

    fn capabilities(&self) -> Capabilities;

    /// The touch marker this model sets while a pair is in contact.
    fn touch_flag(&self) -> TouchFlags;

    /// Declares model-specific configuration keys.
    fn register_settings(&self, _settings: &mut Settings) -> Result<(), SettingsError> {
        Ok(())
    }

    /// Resolves required material properties and validates the host environment.
    fn connect_to_properties(
        &mut self,
        _registry: &mut PropertyRegistry<'_>,
        _env: &ModelEnvironment<'_>,
    ) -> Result<(), ContactError> {
        Ok(())
    }

    /// Evaluates one touching pair; called exactly once per pair and step.
    fn collision(
        &self,
        _cdata: &mut CollisionData<'_>,
        _i_forces: &mut ForceData,
        _j_forces: &mut ForceData,
    ) -> Result<(), ContactError> {
        Ok(())
    }

    /// Resets this model's state for a listed pair that is not touching.
    fn no_collision(
        &self,
        _cdata: &mut ContactData<'_>,
        _i_forces: &mut ForceData,
        _j_forces: &mut ForceData,
    ) {
    }

    fn begin_pass(&mut self) {}

    fn end_pass(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overrides_declared_defaults() {
        let mut settings = Settings::new();
        settings.declare_flag("cohesion", "tangential_reduce", false).unwrap();
        settings.declare_real("cohesion", "limit", 0.5).unwrap();

        let user = HashMap::from([
            ("tangential_reduce".to_string(), SettingValue::Flag(true)),
            ("limit".to_string(), SettingValue::Real(2.0)),
        ]);
        settings.apply(&user).unwrap();

        assert_eq!(settings.flag("tangential_reduce"), Some(true));
        assert_eq!(settings.real("limit"), Some(2.0));
        assert_eq!(settings.real("tangential_reduce"), None);
    }

    #[test]
    fn apply_rejects_undeclared_keys() {
        let mut settings = Settings::new();
        let user = HashMap::from([("bogus".to_string(), SettingValue::Flag(true))]);
        assert_eq!(
            settings.apply(&user),
            Err(SettingsError::UnknownSetting("bogus".to_string()))
        );
    }

    #[test]
    fn apply_rejects_type_mismatch() {
        let mut settings = Settings::new();
        settings.declare_flag("m", "enabled", false).unwrap();
        let user = HashMap::from([("enabled".to_string(), SettingValue::Real(1.0))]);
        assert!(matches!(
            settings.apply(&user),
            Err(SettingsError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn same_key_from_two_models_conflicts() {
        let mut settings = Settings::new();
        settings.declare_flag("a", "shared", false).unwrap();
        assert!(matches!(
            settings.declare_flag("b", "shared", true),
            Err(SettingsError::Conflict { .. })
        ));
    }

    #[test]
    fn setting_values_deserialize_from_toml_scalars() {
        #[derive(Deserialize)]
        struct Wrapper {
            settings: HashMap<String, SettingValue>,
        }
        let w: Wrapper = toml::from_str("[settings]\nflag = true\nreal = 0.25\n").unwrap();
        assert_eq!(w.settings["flag"], SettingValue::Flag(true));
        assert_eq!(w.settings["real"], SettingValue::Real(0.25));
    }

    #[test]
    fn coarse_graining_is_active_only_above_one() {
        assert!(!CoarseGraining::OFF.is_active());
        assert!(!CoarseGraining::default().is_active());
        assert!(CoarseGraining(2.0).is_active());
    }
}
