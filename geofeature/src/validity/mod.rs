//! Oracle de validité géométrique (modèle OGC simplifié)
//!
//! La géométrie GeoJSON est d'abord désérialisée avec `geojson`, puis ses
//! positions sont contrôlées telles quelles (fermeture et taille des rings :
//! `geo` referme les rings implicitement, l'information serait perdue).
//! Elle est ensuite convertie en types `geo` pour les contrôles topologiques.

mod positions;
mod topology;

use std::fmt;

use geo::Coord;
use serde_json::Value;

use crate::error::ValidationError;

/// Nature d'un défaut de validité
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    InvalidCoordinate,
    TooFewPoints,
    RingNotClosed,
    RingSelfIntersection,
    SelfIntersection,
    HoleOutsideShell,
    NestedHoles,
}

impl ProblemKind {
    fn label(&self) -> &'static str {
        match self {
            Self::InvalidCoordinate => "Invalid Coordinate",
            Self::TooFewPoints => "Too few points in geometry component",
            Self::RingNotClosed => "Ring not closed",
            Self::RingSelfIntersection => "Ring Self-intersection",
            Self::SelfIntersection => "Self-intersection",
            Self::HoleOutsideShell => "Hole lies outside shell",
            Self::NestedHoles => "Holes are nested",
        }
    }
}

/// Défaut de validité localisé, ex: `Self-intersection[0.5 0.5]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub at: Option<Coord>,
}

impl Problem {
    pub(crate) fn at(kind: ProblemKind, at: Coord) -> Self {
        Self { kind, at: Some(at) }
    }

    pub(crate) fn unlocated(kind: ProblemKind) -> Self {
        Self { kind, at: None }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at {
            Some(c) => write!(f, "{}[{} {}]", self.kind.label(), c.x, c.y),
            None => f.write_str(self.kind.label()),
        }
    }
}

/// Résultat négatif d'un contrôle : géométrie non constructible ou invalide
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Defect {
    Malformed(String),
    Invalid(Problem),
}

impl From<Problem> for Defect {
    fn from(problem: Problem) -> Self {
        Self::Invalid(problem)
    }
}

/// Construit la géométrie et explique pourquoi elle est invalide, le cas échéant
///
/// `Ok(None)` : géométrie valide.
pub fn explain(geometry: &Value) -> Result<Option<Problem>, String> {
    let parsed: geojson::Geometry =
        serde_json::from_value(geometry.clone()).map_err(|e| e.to_string())?;

    match positions::check(&parsed.value) {
        Ok(()) => {}
        Err(Defect::Malformed(reason)) => return Err(reason),
        Err(Defect::Invalid(problem)) => return Ok(Some(problem)),
    }

    let geometry = geo::Geometry::<f64>::try_from(parsed).map_err(|e| e.to_string())?;
    Ok(topology::explain(&geometry))
}

/// Contrôle de validité d'une géométrie de feature
pub fn check_geometry(geometry: &Value, index: usize) -> Result<(), ValidationError> {
    match explain(geometry) {
        Ok(None) => Ok(()),
        Ok(Some(problem)) => Err(ValidationError::InvalidGeometry {
            index,
            reason: problem.to_string(),
        }),
        Err(reason) => Err(ValidationError::Construction { index, reason }),
    }
}
