use super::PropertyError;
use super::table::{MaterialPropertyTable, Property};

pub const COEFF_ROLL_FRICT: &str = "coeffRollFrict";

/// Builds the per-type-pair rolling friction coefficient matrix.
///
/// Coefficients must be non-negative and symmetric in the two types.
pub fn create_coeff_roll_frict(
    table: &MaterialPropertyTable,
    caller: &str,
) -> Result<Property, PropertyError> {
    let matrix = table
        .per_type_pair(COEFF_ROLL_FRICT)
        .ok_or_else(|| PropertyError::Unresolved {
            name: COEFF_ROLL_FRICT.to_string(),
            caller: caller.to_string(),
        })?;

    if let Some(&bad) = matrix.values().iter().find(|&&v| v < 0.0 || !v.is_finite()) {
        return Err(PropertyError::InvalidValue {
            name: COEFF_ROLL_FRICT.to_string(),
            reason: format!("coefficients must be finite and non-negative, found {bad}"),
        });
    }
    if !matrix.is_symmetric() {
        return Err(PropertyError::InvalidValue {
            name: COEFF_ROLL_FRICT.to_string(),
            reason: "matrix must be symmetric".to_string(),
        });
    }

    Ok(Property::PerTypePair(matrix))
}
