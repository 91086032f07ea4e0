use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::PropertyError;

/// Per-type scalar values, addressed by 1-based particle type.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTypeVector {
    values: Vec<f64>,
}

impl PerTypeVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn n_types(&self) -> usize {
        self.values.len()
    }

    /// Value for `particle_type` (1..=ntypes). Panics on type 0 or out of range.
    #[inline]
    pub fn get(&self, particle_type: usize) -> f64 {
        self.values[particle_type - 1]
    }

    pub fn try_get(&self, particle_type: usize) -> Option<f64> {
        particle_type
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx))
            .copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Per-type-pair scalar values stored row-major, addressed by 1-based types.
#[derive(Debug, Clone, PartialEq)]
pub struct PerTypePairMatrix {
    n_types: usize,
    values: Vec<f64>,
}

impl PerTypePairMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let n_types = rows.len();
        if rows.iter().any(|row| row.len() != n_types) {
            return None;
        }
        Some(Self {
            n_types,
            values: rows.iter().flatten().copied().collect(),
        })
    }

    /// Builds the matrix `f(a[i], a[j])` from a per-type vector.
    pub fn from_mixing(vector: &PerTypeVector, mix: impl Fn(f64, f64) -> f64) -> Self {
        let n_types = vector.n_types();
        let values = (1..=n_types)
            .flat_map(|i| (1..=n_types).map(move |j| (i, j)))
            .map(|(i, j)| mix(vector.get(i), vector.get(j)))
            .collect();
        Self { n_types, values }
    }

    pub fn n_types(&self) -> usize {
        self.n_types
    }

    /// Value for the pair (`itype`, `jtype`), both 1-based. Panics on type 0 or out of range.
    #[inline]
    pub fn get(&self, itype: usize, jtype: usize) -> f64 {
        self.values[(itype - 1) * self.n_types + (jtype - 1)]
    }

    pub fn is_symmetric(&self) -> bool {
        (1..=self.n_types).all(|i| (i..=self.n_types).all(|j| self.get(i, j) == self.get(j, i)))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A resolved material property in one of the shapes the registry hands out.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Scalar(f64),
    PerType(Arc<PerTypeVector>),
    PerTypePair(Arc<PerTypePairMatrix>),
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::Scalar(_) => PropertyKind::Scalar,
            Property::PerType(_) => PropertyKind::PerType,
            Property::PerTypePair(_) => PropertyKind::PerTypePair,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar,
    PerType,
    PerTypePair,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKind::Scalar => write!(f, "scalar"),
            PropertyKind::PerType => write!(f, "per-type"),
            PropertyKind::PerTypePair => write!(f, "per-type-pair"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaterialFile {
    #[serde(rename = "n-types")]
    n_types: usize,
    #[serde(default)]
    scalar: HashMap<String, f64>,
    #[serde(default, rename = "per-type")]
    per_type: HashMap<String, Vec<f64>>,
    #[serde(default, rename = "per-type-pair")]
    per_type_pair: HashMap<String, Vec<Vec<f64>>>,
}

/// Globally defined material properties, indexed by particle type (1..=ntypes).
///
/// The table is immutable once loaded. Shapes are validated against `n-types`
/// up front, so a lookup either yields a complete property or fails.
#[derive(Debug, Clone, Default)]
pub struct MaterialPropertyTable {
    n_types: usize,
    scalars: HashMap<String, f64>,
    per_type: HashMap<String, Arc<PerTypeVector>>,
    per_type_pair: HashMap<String, Arc<PerTypePairMatrix>>,
}

impl MaterialPropertyTable {
    pub fn new(n_types: usize) -> Self {
        Self {
            n_types,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, PropertyError> {
        let content = std::fs::read_to_string(path).map_err(|e| PropertyError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            PropertyError::Toml { source, .. } => PropertyError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PropertyError> {
        let file: MaterialFile = toml::from_str(content).map_err(|e| PropertyError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;

        let mut table = Self::new(file.n_types);
        for (name, value) in file.scalar {
            table.define_scalar(&name, value);
        }
        for (name, values) in file.per_type {
            table.define_per_type(&name, values)?;
        }
        for (name, rows) in file.per_type_pair {
            table.define_per_type_pair(&name, &rows)?;
        }
        Ok(table)
    }

    pub fn n_types(&self) -> usize {
        self.n_types
    }

    pub fn define_scalar(&mut self, name: &str, value: f64) {
        self.scalars.insert(name.to_string(), value);
    }

    pub fn define_per_type(&mut self, name: &str, values: Vec<f64>) -> Result<(), PropertyError> {
        if values.len() != self.n_types {
            return Err(PropertyError::Shape {
                name: name.to_string(),
                expected: self.n_types,
                found: values.len(),
            });
        }
        self.per_type
            .insert(name.to_string(), Arc::new(PerTypeVector::new(values)));
        Ok(())
    }

    pub fn define_per_type_pair(
        &mut self,
        name: &str,
        rows: &[Vec<f64>],
    ) -> Result<(), PropertyError> {
        let shape_error = |found: usize| PropertyError::Shape {
            name: name.to_string(),
            expected: self.n_types,
            found,
        };
        if rows.len() != self.n_types {
            return Err(shape_error(rows.len()));
        }
        let matrix = PerTypePairMatrix::from_rows(rows).ok_or_else(|| {
            let bad = rows
                .iter()
                .map(Vec::len)
                .find(|&len| len != self.n_types)
                .unwrap_or(0);
            shape_error(bad)
        })?;
        self.per_type_pair.insert(name.to_string(), Arc::new(matrix));
        Ok(())
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    pub fn per_type(&self, name: &str) -> Option<Arc<PerTypeVector>> {
        self.per_type.get(name).cloned()
    }

    pub fn per_type_pair(&self, name: &str) -> Option<Arc<PerTypePairMatrix>> {
        self.per_type_pair.get(name).cloned()
    }

    /// Looks a name up in every shape; used for properties that were never registered.
    pub fn lookup(&self, name: &str) -> Option<Property> {
        if let Some(m) = self.per_type_pair(name) {
            return Some(Property::PerTypePair(m));
        }
        if let Some(v) = self.per_type(name) {
            return Some(Property::PerType(v));
        }
        self.scalar(name).map(Property::Scalar)
    }
}
