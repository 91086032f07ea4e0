use phf::{Map, phf_map};

use super::history::HistorySetup;
use super::model::ContactModel;
use super::rolling::{self, RollingEpsd2};

/// Which slot of the contact pipeline a style plugs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCategory {
    Normal,
    Tangential,
    Cohesion,
    Rolling,
    Surface,
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelCategory::Normal => "normal",
            ModelCategory::Tangential => "tangential",
            ModelCategory::Cohesion => "cohesion",
            ModelCategory::Rolling => "rolling",
            ModelCategory::Surface => "surface",
        };
        f.write_str(name)
    }
}

/// Registration record of a contact model style.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub id: u32,
    pub category: ModelCategory,
    /// Number of persistent history values the model reserves per contact.
    pub history_values: usize,
    pub build: fn(&mut HistorySetup) -> Box<dyn ContactModel>,
}

pub static CONTACT_MODELS: Map<&'static str, ModelDescriptor> = phf_map! {
    "epsd2" => ModelDescriptor {
        id: rolling::MODEL_ID,
        category: ModelCategory::Rolling,
        history_values: rolling::HISTORY_VALUES,
        build: RollingEpsd2::boxed,
    },
};

pub fn lookup(style: &str) -> Option<&'static ModelDescriptor> {
    CONTACT_MODELS.get(style)
}

/// Registered styles sorted by id.
pub fn registered() -> Vec<(&'static str, &'static ModelDescriptor)> {
    let mut styles: Vec<_> = CONTACT_MODELS.entries().map(|(k, v)| (*k, v)).collect();
    styles.sort_by_key(|(_, d)| d.id);
    styles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsd2_is_registered_as_rolling_model() {
        let descriptor = lookup("epsd2").unwrap();
        assert_eq!(descriptor.category, ModelCategory::Rolling);
        assert_eq!(descriptor.history_values, 3);
    }

    #[test]
    fn descriptor_history_width_matches_what_the_model_reserves() {
        for (style, descriptor) in registered() {
            let mut setup = HistorySetup::new();
            let model = (descriptor.build)(&mut setup);
            assert_eq!(model.style(), style);
            assert_eq!(model.id(), descriptor.id);
            assert_eq!(setup.width(), descriptor.history_values);
        }
    }

    #[test]
    fn unknown_style_is_not_found() {
        assert!(lookup("hertz/bogus").is_none());
    }

    #[test]
    fn registered_ids_are_unique() {
        let styles = registered();
        let mut ids: Vec<u32> = styles.iter().map(|(_, d)| d.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), styles.len());
    }
}
