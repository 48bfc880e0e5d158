//! Types de données pour le crate geofeature

use serde_json::{Map, Value};

/// Document GeoJSON chargé en mémoire
///
/// Les features restent des valeurs JSON brutes : chacune est validée
/// individuellement, y compris celles qui ne sont même pas des objets.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    /// Features dans l'ordre du fichier
    pub features: Vec<Value>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Une feature ayant passé la validation
///
/// Ne peut être construite que par le `Validator` : le contenu est celui du
/// fichier, inchangé.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    object: Map<String, Value>,
}

impl Feature {
    pub(crate) fn new(object: Map<String, Value>) -> Self {
        Self { object }
    }

    /// Géométrie brute (absente si `null`)
    pub fn geometry(&self) -> Option<&Value> {
        self.object.get("geometry").filter(|g| !g.is_null())
    }

    /// Propriétés de la feature (`None` si absentes ou non-objet)
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.object.get("properties").and_then(Value::as_object)
    }

    /// Accès à une propriété
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties().and_then(|p| p.get(key))
    }

    /// Type de géométrie déclaré (ex: "Point")
    pub fn geometry_type(&self) -> Option<&str> {
        self.geometry()
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

/// Feature rejetée par la validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Index dans la collection d'origine
    pub index: usize,
    /// Raison lisible
    pub reason: String,
}

/// Résultat de la validation d'une feature
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(Feature),
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Partition d'une collection en features acceptées et rejetées
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Features valides, ordre d'origine conservé
    pub accepted: Vec<Feature>,
    /// Rejets, ordre d'origine conservé
    pub rejected: Vec<Rejection>,
}

impl Partition {
    /// Nombre total de features examinées
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// Raisons des rejets, dans l'ordre
    pub fn reasons(&self) -> Vec<String> {
        self.rejected.iter().map(|r| r.reason.clone()).collect()
    }
}

impl FromIterator<ValidationOutcome> for Partition {
    fn from_iter<I: IntoIterator<Item = ValidationOutcome>>(iter: I) -> Self {
        let mut partition = Partition::default();
        for outcome in iter {
            match outcome {
                ValidationOutcome::Accepted(feature) => partition.accepted.push(feature),
                ValidationOutcome::Rejected(rejection) => partition.rejected.push(rejection),
            }
        }
        partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(value: Value) -> Feature {
        match value {
            Value::Object(object) => Feature::new(object),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_feature_accessors() {
        let f = feature(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
            "properties": {"name": "A"}
        }));
        assert_eq!(f.geometry_type(), Some("Point"));
        assert_eq!(f.property("name"), Some(&json!("A")));
        assert_eq!(f.property("missing"), None);
    }

    #[test]
    fn test_null_geometry_and_properties() {
        let f = feature(json!({"type": "Feature", "geometry": null, "properties": null}));
        assert!(f.geometry().is_none());
        assert!(f.properties().is_none());
    }

    #[test]
    fn test_partition_from_outcomes() {
        let outcomes = vec![
            ValidationOutcome::Accepted(feature(json!({"type": "Feature"}))),
            ValidationOutcome::Rejected(Rejection {
                index: 1,
                reason: "bad".to_string(),
            }),
        ];
        let partition: Partition = outcomes.into_iter().collect();
        assert_eq!(partition.total(), 2);
        assert_eq!(partition.accepted.len(), 1);
        assert_eq!(partition.reasons(), vec!["bad".to_string()]);
    }
}
