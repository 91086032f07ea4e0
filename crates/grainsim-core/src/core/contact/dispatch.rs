use itertools::Itertools;
use tracing::{debug, info};

use super::ContactError;
use super::data::{CollisionData, ContactData, ForceData};
use super::flags::{Capabilities, TouchFlags};
use super::history::HistorySetup;
use super::model::{ContactModel, ModelEnvironment, Settings, SettingsError};
use super::styles;
use crate::core::properties::registry::PropertyRegistry;

/// The active contact models of a simulation and the history layout they share.
///
/// Every hook is gated on the model's capability mask, so the dispatcher
/// works for any mix of styles without knowing which ones are present.
pub struct ModelSet {
    models: Vec<Box<dyn ContactModel>>,
    layout: HistorySetup,
    capabilities: Capabilities,
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("styles", &self.styles().collect::<Vec<_>>())
            .field("history", &self.layout.names())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl ModelSet {
    /// Builds the models registered under `styles`, in order.
    pub fn from_styles<S: AsRef<str>>(style_names: &[S]) -> Result<Self, ContactError> {
        let mut layout = HistorySetup::new();
        let mut models = Vec::with_capacity(style_names.len());

        for style in style_names {
            let style = style.as_ref();
            let descriptor =
                styles::lookup(style).ok_or_else(|| ContactError::UnknownStyle(style.to_string()))?;
            models.push((descriptor.build)(&mut layout));
        }

        Self::from_models(models, layout)
    }

    /// Wraps models built by the caller against `layout`.
    pub fn from_models(
        models: Vec<Box<dyn ContactModel>>,
        layout: HistorySetup,
    ) -> Result<Self, ContactError> {
        if let Some(style) = models.iter().map(|m| m.style()).duplicates().next() {
            return Err(ContactError::DuplicateStyle(style.to_string()));
        }
        if let Some(id) = models.iter().map(|m| m.id()).duplicates().next() {
            return Err(ContactError::DuplicateId(id));
        }

        let capabilities = models
            .iter()
            .fold(Capabilities::empty(), |acc, m| acc | m.capabilities());

        info!(
            styles = %models.iter().map(|m| m.style()).join(","),
            history_width = layout.width(),
            "Contact models constructed."
        );

        Ok(Self {
            models,
            layout,
            capabilities,
        })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn styles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.iter().map(|m| m.style())
    }

    pub fn history_layout(&self) -> &HistorySetup {
        &self.layout
    }

    pub fn history_width(&self) -> usize {
        self.layout.width()
    }

    /// Union of the capability masks of all models.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Touch markers owned by all models together.
    pub fn touch_mask(&self) -> TouchFlags {
        self.models
            .iter()
            .fold(TouchFlags::empty(), |acc, m| acc | m.touch_flag())
    }

    pub fn register_settings(&self, settings: &mut Settings) -> Result<(), SettingsError> {
        for model in &self.models {
            model.register_settings(settings)?;
        }
        Ok(())
    }

    pub fn connect_to_properties(
        &mut self,
        registry: &mut PropertyRegistry<'_>,
        env: &ModelEnvironment<'_>,
    ) -> Result<(), ContactError> {
        for model in self
            .models
            .iter_mut()
            .filter(|m| m.capabilities().contains(Capabilities::CONNECT_TO_PROPERTIES))
        {
            debug!(style = model.style(), "Connecting contact model to properties.");
            model.connect_to_properties(registry, env)?;
        }
        Ok(())
    }

    pub fn begin_pass(&mut self) {
        for model in &mut self.models {
            model.begin_pass();
        }
    }

    pub fn end_pass(&mut self) {
        for model in &mut self.models {
            model.end_pass();
        }
    }

    pub fn collision(
        &self,
        cdata: &mut CollisionData<'_>,
        i_forces: &mut ForceData,
        j_forces: &mut ForceData,
    ) -> Result<(), ContactError> {
        if !self.capabilities.contains(Capabilities::COLLISION) {
            return Ok(());
        }
        for model in self
            .models
            .iter()
            .filter(|m| m.capabilities().contains(Capabilities::COLLISION))
        {
            model.collision(cdata, i_forces, j_forces)?;
        }
        Ok(())
    }

    pub fn no_collision(
        &self,
        cdata: &mut ContactData<'_>,
        i_forces: &mut ForceData,
        j_forces: &mut ForceData,
    ) {
        if !self.capabilities.contains(Capabilities::NO_COLLISION) {
            return;
        }
        for model in self
            .models
            .iter()
            .filter(|m| m.capabilities().contains(Capabilities::NO_COLLISION))
        {
            model.no_collision(cdata, i_forces, j_forces);
        }
    }
}
