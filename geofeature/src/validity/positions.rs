//! Contrôles sur les positions brutes (avant conversion en types geo)

use geo::Coord;
use geojson::Value;

use super::{Defect, Problem, ProblemKind};

/// Parcourt toutes les positions d'une géométrie GeoJSON
pub(crate) fn check(value: &Value) -> Result<(), Defect> {
    match value {
        Value::Point(p) => coord(p).map(|_| ()),
        Value::MultiPoint(points) => points.iter().try_for_each(|p| coord(p).map(|_| ())),
        Value::LineString(line) => line_string(line),
        Value::MultiLineString(lines) => lines.iter().try_for_each(|l| line_string(l)),
        Value::Polygon(rings) => polygon(rings),
        Value::MultiPolygon(polygons) => polygons.iter().try_for_each(|p| polygon(p)),
        Value::GeometryCollection(geometries) => {
            geometries.iter().try_for_each(|g| check(&g.value))
        }
    }
}

/// Convertit une position en coordonnée 2D finie
fn coord(position: &[f64]) -> Result<Coord, Defect> {
    let (Some(&x), Some(&y)) = (position.first(), position.get(1)) else {
        return Err(Defect::Malformed(format!(
            "position must have at least two coordinates, got {}",
            position.len()
        )));
    };

    let c = Coord { x, y };
    if !x.is_finite() || !y.is_finite() {
        return Err(Problem::at(ProblemKind::InvalidCoordinate, c).into());
    }
    Ok(c)
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>, Defect> {
    positions.iter().map(|p| coord(p)).collect()
}

/// Nombre de points distincts consécutifs
fn distinct_points(coords: &[Coord]) -> usize {
    let mut count = 0;
    let mut previous: Option<Coord> = None;
    for &c in coords {
        if previous != Some(c) {
            count += 1;
        }
        previous = Some(c);
    }
    count
}

fn line_string(positions: &[Vec<f64>]) -> Result<(), Defect> {
    let coords = coords(positions)?;
    // Une linestring vide est une géométrie vide valide
    if let Some(&first) = coords.first() {
        if distinct_points(&coords) < 2 {
            return Err(Problem::at(ProblemKind::TooFewPoints, first).into());
        }
    }
    Ok(())
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<(), Defect> {
    if rings.is_empty() {
        return Err(Defect::Malformed(
            "polygon must have at least one ring".to_string(),
        ));
    }
    rings.iter().try_for_each(|ring| linear_ring(ring))
}

fn linear_ring(positions: &[Vec<f64>]) -> Result<(), Defect> {
    let coords = coords(positions)?;

    let (Some(&first), Some(&last)) = (coords.first(), coords.last()) else {
        return Err(Problem::unlocated(ProblemKind::TooFewPoints).into());
    };

    if coords.len() < 4 {
        return Err(Problem::at(ProblemKind::TooFewPoints, first).into());
    }
    if first != last {
        return Err(Problem::at(ProblemKind::RingNotClosed, first).into());
    }
    // Le point de fermeture ne compte pas
    if distinct_points(&coords[..coords.len() - 1]) < 3 {
        return Err(Problem::at(ProblemKind::TooFewPoints, first).into());
    }
    Ok(())
}
