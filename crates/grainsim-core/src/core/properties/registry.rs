use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::PropertyError;
use super::table::{
    MaterialPropertyTable, PerTypePairMatrix, PerTypeVector, Property, PropertyKind,
};

/// Construction function turning the global material table into one resolved property.
///
/// The second argument names the caller for error messages.
pub type PropertyFactory = fn(&MaterialPropertyTable, &str) -> Result<Property, PropertyError>;

/// Name-based resolution of per-type material properties for contact models.
///
/// Models register how a property is built, then connect to it by name. Each
/// property is constructed at most once; later connections share the same
/// `Arc`. Resolution only happens during initialization.
pub struct PropertyRegistry<'a> {
    table: &'a MaterialPropertyTable,
    factories: HashMap<String, PropertyFactory>,
    resolved: HashMap<String, Property>,
}

impl<'a> PropertyRegistry<'a> {
    pub fn new(table: &'a MaterialPropertyTable) -> Self {
        Self {
            table,
            factories: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn table(&self) -> &MaterialPropertyTable {
        self.table
    }

    /// Associates `name` with a factory. Re-registering an existing name keeps the first factory.
    pub fn register_property(&mut self, name: &str, factory: PropertyFactory) {
        self.factories.entry(name.to_string()).or_insert(factory);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolves a registered or globally defined property.
    pub fn connect(&mut self, name: &str, caller: &str) -> Result<Property, PropertyError> {
        if let Some(property) = self.resolved.get(name) {
            return Ok(property.clone());
        }

        let property = match self.factories.get(name) {
            Some(factory) => factory(self.table, caller)?,
            None => self
                .table
                .lookup(name)
                .ok_or_else(|| PropertyError::Unresolved {
                    name: name.to_string(),
                    caller: caller.to_string(),
                })?,
        };

        debug!(property = name, caller, kind = %property.kind(), "Connected material property.");
        self.resolved.insert(name.to_string(), property.clone());
        Ok(property)
    }

    pub fn connect_per_type_pair(
        &mut self,
        name: &str,
        caller: &str,
    ) -> Result<Arc<PerTypePairMatrix>, PropertyError> {
        match self.connect(name, caller)? {
            Property::PerTypePair(m) => Ok(m),
            other => Err(wrong_kind(name, caller, PropertyKind::PerTypePair, &other)),
        }
    }

    pub fn connect_per_type(
        &mut self,
        name: &str,
        caller: &str,
    ) -> Result<Arc<PerTypeVector>, PropertyError> {
        match self.connect(name, caller)? {
            Property::PerType(v) => Ok(v),
            other => Err(wrong_kind(name, caller, PropertyKind::PerType, &other)),
        }
    }

    pub fn connect_scalar(&mut self, name: &str, caller: &str) -> Result<f64, PropertyError> {
        match self.connect(name, caller)? {
            Property::Scalar(s) => Ok(s),
            other => Err(wrong_kind(name, caller, PropertyKind::Scalar, &other)),
        }
    }
}

fn wrong_kind(name: &str, caller: &str, expected: PropertyKind, found: &Property) -> PropertyError {
    PropertyError::WrongKind {
        name: name.to_string(),
        caller: caller.to_string(),
        expected,
        found: found.kind(),
    }
}
