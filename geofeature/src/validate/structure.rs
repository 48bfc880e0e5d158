//! Contrôles structurels d'une feature (sans interprétation des coordonnées)

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Vérifie la structure d'une feature, dans l'ordre, au premier échec
///
/// 1. la feature est un objet
/// 2. `type` vaut "Feature"
/// 3. `geometry` est présent
/// 4. `geometry` est un objet avec `type` et `coordinates`
pub fn check(feature: Value, index: usize) -> Result<Map<String, Value>, ValidationError> {
    let Value::Object(object) = feature else {
        return Err(ValidationError::NotAnObject { index });
    };

    match object.get("type") {
        Some(Value::String(t)) if t == "Feature" => {}
        other => {
            return Err(ValidationError::WrongType {
                index,
                found: other.map_or_else(|| "nothing".to_string(), Value::to_string),
            })
        }
    }

    let Some(geometry) = object.get("geometry") else {
        return Err(ValidationError::MissingGeometry { index });
    };

    let Some(geometry) = geometry.as_object() else {
        return Err(ValidationError::GeometryNotAnObject { index });
    };

    if !geometry.contains_key("type") || !geometry.contains_key("coordinates") {
        return Err(ValidationError::IncompleteGeometry { index });
    }

    Ok(object)
}
