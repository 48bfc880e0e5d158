//! Chargement d'un document GeoJSON et contrôle de forme de la collection

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::DocumentError;
use crate::types::FeatureCollection;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Charge et contrôle une FeatureCollection depuis un fichier
///
/// Le fichier est entièrement matérialisé en mémoire.
///
/// # Errors
///
/// `NotFound` si le fichier n'existe pas, `Parse` si le JSON est invalide
/// (avec ligne/colonne), `Shape` si le document n'est pas une FeatureCollection.
pub fn load(path: &Path) -> Result<FeatureCollection, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "Read GeoJSON document");
    from_slice(&bytes)
}

/// Parse une FeatureCollection depuis des octets UTF-8
pub fn from_slice(bytes: &[u8]) -> Result<FeatureCollection, DocumentError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let root: Value = serde_json::from_slice(bytes).map_err(|e| DocumentError::from_json(&e))?;
    from_value(root)
}

/// Contrôle la forme d'un document déjà parsé
pub fn from_value(root: Value) -> Result<FeatureCollection, DocumentError> {
    let Value::Object(mut root) = root else {
        return Err(DocumentError::Shape(
            "GeoJSON root must be a JSON object".to_string(),
        ));
    };

    match root.get("type") {
        Some(Value::String(t)) if t == "FeatureCollection" => {}
        Some(other) => {
            return Err(DocumentError::Shape(format!(
                "GeoJSON type must be 'FeatureCollection', got {}",
                other
            )))
        }
        None => {
            return Err(DocumentError::Shape(
                "GeoJSON type must be 'FeatureCollection', got nothing".to_string(),
            ))
        }
    }

    match root.remove("features") {
        Some(Value::Array(features)) => Ok(FeatureCollection { features }),
        Some(_) => Err(DocumentError::Shape(
            "'features' must be an array".to_string(),
        )),
        None => Err(DocumentError::Shape(
            "FeatureCollection has no 'features' member".to_string(),
        )),
    }
}
