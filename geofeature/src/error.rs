//! Types d'erreurs pour le crate geofeature

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs fatales au niveau du document (le fichier entier est rejeté)
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Fichier introuvable
    #[error("GeoJSON file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Erreur d'I/O lors de la lecture
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON syntaxiquement invalide
    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// JSON valide mais pas une FeatureCollection
    #[error("Invalid GeoJSON structure: {0}")]
    Shape(String),
}

impl DocumentError {
    /// Construit une erreur de parsing depuis serde_json (avec position)
    pub fn from_json(err: &serde_json::Error) -> Self {
        Self::Parse {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Rejet d'une feature individuelle. Jamais fatal pour le lot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Feature {index}: feature must be a JSON object")]
    NotAnObject { index: usize },

    #[error("Feature {index}: feature type must be 'Feature', got {found}")]
    WrongType { index: usize, found: String },

    #[error("Feature {index}: feature must have a 'geometry' field")]
    MissingGeometry { index: usize },

    #[error("Feature {index}: geometry must be a JSON object")]
    GeometryNotAnObject { index: usize },

    #[error("Feature {index}: geometry must have 'type' and 'coordinates' fields")]
    IncompleteGeometry { index: usize },

    /// La géométrie n'a pas pu être construite depuis ses coordonnées
    #[error("Feature {index}: geometry construction failed: {reason}")]
    Construction { index: usize, reason: String },

    /// Géométrie construite mais topologiquement invalide
    #[error("Feature {index}: invalid geometry: {reason}")]
    InvalidGeometry { index: usize, reason: String },
}

impl ValidationError {
    /// Index de la feature dans la collection d'origine
    pub fn index(&self) -> usize {
        match self {
            Self::NotAnObject { index }
            | Self::WrongType { index, .. }
            | Self::MissingGeometry { index }
            | Self::GeometryNotAnObject { index }
            | Self::IncompleteGeometry { index }
            | Self::Construction { index, .. }
            | Self::InvalidGeometry { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MissingGeometry { index: 4 };
        assert_eq!(err.index(), 4);
        assert!(err.to_string().contains("geometry"));
        assert!(err.to_string().starts_with("Feature 4:"));

        let err = ValidationError::InvalidGeometry {
            index: 0,
            reason: "Self-intersection[1 1]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Feature 0: invalid geometry: Self-intersection[1 1]"
        );
    }

    #[test]
    fn test_parse_error_keeps_position() {
        let json_err = serde_json::from_str::<serde_json::Value>("{\n  \"type\": }").unwrap_err();
        match DocumentError::from_json(&json_err) {
            DocumentError::Parse { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
