//! Contrôles topologiques (auto-intersections, trous, recouvrements)

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, Geometry, Intersects, Line, LineString, MultiPolygon, Polygon};

use super::{Problem, ProblemKind};

/// Premier défaut topologique trouvé, `None` si la géométrie est valide
///
/// Points et linestrings sont déjà couverts par le contrôle des positions :
/// une linestring qui se recoupe reste valide au sens OGC.
pub(crate) fn explain(geometry: &Geometry) -> Option<Problem> {
    match geometry {
        Geometry::Polygon(polygon) => check_polygon(polygon),
        Geometry::MultiPolygon(multi) => check_multi_polygon(multi),
        Geometry::GeometryCollection(collection) => collection.iter().find_map(explain),
        _ => None,
    }
}

/// Segments non dégénérés d'un ring, dans l'ordre
fn edges(ring: &LineString) -> Vec<Line> {
    ring.lines().filter(|l| l.start != l.end).collect()
}

fn check_polygon(polygon: &Polygon) -> Option<Problem> {
    let rings: Vec<Vec<Line>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(edges)
        .collect();

    if let Some(problem) = rings.iter().find_map(|r| ring_self_intersection(r)) {
        return Some(problem);
    }

    for (i, a) in rings.iter().enumerate() {
        for b in &rings[i + 1..] {
            if let Some(problem) = rings_cross(a, b) {
                return Some(problem);
            }
        }
    }

    let shell = Polygon::new(polygon.exterior().clone(), vec![]);
    for hole in polygon.interiors() {
        if let Some(outside) = hole.coords().find(|c| !shell.intersects(*c)) {
            return Some(Problem::at(ProblemKind::HoleOutsideShell, *outside));
        }
    }

    let holes = polygon.interiors();
    for (i, outer) in holes.iter().enumerate() {
        let outer = Polygon::new(outer.clone(), vec![]);
        for (j, inner) in holes.iter().enumerate() {
            if i == j {
                continue;
            }
            if let Some(nested) = inner.coords().find(|c| outer.contains(*c)) {
                return Some(Problem::at(ProblemKind::NestedHoles, *nested));
            }
        }
    }

    None
}

/// Auto-intersection d'un ring
///
/// Deux segments consécutifs partagent un sommet ; le premier et le dernier
/// aussi (point de fermeture).
fn ring_self_intersection(edges: &[Line]) -> Option<Problem> {
    let n = edges.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { intersection }) => {
                    return Some(Problem::at(ProblemKind::SelfIntersection, intersection.start));
                }
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper,
                }) => {
                    if is_proper {
                        return Some(Problem::at(ProblemKind::SelfIntersection, intersection));
                    }
                    if !adjacent {
                        return Some(Problem::at(
                            ProblemKind::RingSelfIntersection,
                            intersection,
                        ));
                    }
                }
            }
        }
    }
    None
}

/// Croisement ou recouvrement entre deux rings distincts
///
/// Un contact en un point isolé est autorisé.
fn rings_cross(a: &[Line], b: &[Line]) -> Option<Problem> {
    for &ea in a {
        for &eb in b {
            match line_intersection(ea, eb) {
                Some(LineIntersection::Collinear { intersection }) => {
                    return Some(Problem::at(ProblemKind::SelfIntersection, intersection.start));
                }
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper: true,
                }) => {
                    return Some(Problem::at(ProblemKind::SelfIntersection, intersection));
                }
                _ => {}
            }
        }
    }
    None
}

fn check_multi_polygon(multi: &MultiPolygon) -> Option<Problem> {
    if let Some(problem) = multi.iter().find_map(check_polygon) {
        return Some(problem);
    }

    let polygons = &multi.0;
    for (i, a) in polygons.iter().enumerate() {
        for b in &polygons[i + 1..] {
            if let Some(problem) = rings_cross(&edges(a.exterior()), &edges(b.exterior())) {
                return Some(problem);
            }
            if let Some(problem) = vertex_inside(a, b).or_else(|| vertex_inside(b, a)) {
                return Some(problem);
            }
        }
    }
    None
}

/// Sommet de l'extérieur de `inner` strictement à l'intérieur de `outer`
fn vertex_inside(inner: &Polygon, outer: &Polygon) -> Option<Problem> {
    inner
        .exterior()
        .coords()
        .find(|c| outer.contains(*c))
        .map(|c| Problem::at(ProblemKind::SelfIntersection, *c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord};

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    #[test]
    fn test_valid_square() {
        assert_eq!(explain(&Geometry::Polygon(square(0.0, 0.0, 1.0))), None);
    }

    #[test]
    fn test_ring_touching_itself() {
        // Deux boucles reliées par un sommet commun (1,1)
        let figure_eight = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let problem = explain(&Geometry::Polygon(figure_eight)).unwrap();
        assert_eq!(problem.kind, ProblemKind::RingSelfIntersection);
        assert_eq!(problem.at, Some(Coord { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn test_spike_is_self_intersection() {
        let spike = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let problem = explain(&Geometry::Polygon(spike)).unwrap();
        assert!(matches!(
            problem.kind,
            ProblemKind::SelfIntersection | ProblemKind::RingSelfIntersection
        ));
    }

    #[test]
    fn test_hole_outside_shell() {
        let shell = square(0.0, 0.0, 1.0);
        let hole = square(5.0, 5.0, 1.0);
        let polygon = Polygon::new(shell.exterior().clone(), vec![hole.exterior().clone()]);

        let problem = explain(&Geometry::Polygon(polygon)).unwrap();
        assert_eq!(problem.kind, ProblemKind::HoleOutsideShell);
    }

    #[test]
    fn test_hole_crossing_shell() {
        let shell = square(0.0, 0.0, 2.0);
        let hole = square(1.0, 1.0, 2.0);
        let polygon = Polygon::new(shell.exterior().clone(), vec![hole.exterior().clone()]);

        let problem = explain(&Geometry::Polygon(polygon)).unwrap();
        assert_eq!(problem.kind, ProblemKind::SelfIntersection);
    }

    #[test]
    fn test_nested_holes() {
        let shell = square(0.0, 0.0, 10.0);
        let big = square(1.0, 1.0, 8.0);
        let small = square(3.0, 3.0, 2.0);
        let polygon = Polygon::new(
            shell.exterior().clone(),
            vec![big.exterior().clone(), small.exterior().clone()],
        );

        let problem = explain(&Geometry::Polygon(polygon)).unwrap();
        assert_eq!(problem.kind, ProblemKind::NestedHoles);
    }

    #[test]
    fn test_overlapping_multi_polygon() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        let problem = explain(&Geometry::MultiPolygon(multi)).unwrap();
        assert_eq!(problem.kind, ProblemKind::SelfIntersection);
    }

    #[test]
    fn test_multi_polygon_parts_sharing_an_edge() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        assert!(explain(&Geometry::MultiPolygon(multi)).is_some());
    }

    #[test]
    fn test_multi_polygon_contained_part() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(2.0, 2.0, 1.0)]);
        let problem = explain(&Geometry::MultiPolygon(multi)).unwrap();
        assert_eq!(problem.kind, ProblemKind::SelfIntersection);
    }

    #[test]
    fn test_multi_polygon_touching_at_corner_is_valid() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(1.0, 1.0, 1.0)]);
        assert_eq!(explain(&Geometry::MultiPolygon(multi)), None);
    }

    #[test]
    fn test_island_in_hole_is_valid() {
        let shell = square(0.0, 0.0, 10.0);
        let hole = square(2.0, 2.0, 6.0);
        let with_hole = Polygon::new(shell.exterior().clone(), vec![hole.exterior().clone()]);
        let island = square(4.0, 4.0, 1.0);

        let multi = MultiPolygon::new(vec![with_hole, island]);
        assert_eq!(explain(&Geometry::MultiPolygon(multi)), None);
    }
}
