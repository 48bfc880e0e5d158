//! Insertion des features validées

use geofeature::Feature;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::IngestionResult;
use crate::error::IngestError;
use crate::store::{Connection, NewRow};

/// Propriétés portant un nom, par ordre de priorité
const NAME_KEYS: [&str; 3] = ["name", "NAME", "id"];

/// Nom d'affichage d'une feature
///
/// Première chaîne non vide parmi `name`, `NAME` et `id` ; les nombres sont
/// acceptés, les autres types ignorés. À défaut : `Feature_<index>`, avec
/// l'index dans la séquence validée.
pub fn display_name(feature: &Feature, index: usize) -> String {
    NAME_KEYS
        .iter()
        .filter_map(|key| match feature.property(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_else(|| format!("Feature_{index}"))
}

/// Ligne écartée avant insertion
#[derive(Debug, PartialEq, Eq)]
enum Unfit {
    /// Géométrie absente : ignorée sans être comptée comme échec
    MissingGeometry(String),
    Unserializable(String),
}

/// Prépare la ligne à insérer
fn to_row(feature: &Feature, index: usize) -> Result<NewRow, Unfit> {
    let name = display_name(feature, index);
    let Some(geometry) = feature.geometry() else {
        return Err(Unfit::MissingGeometry(name));
    };
    let geometry = serde_json::to_string(geometry)
        .map_err(|e| Unfit::Unserializable(format!("{name}: failed to serialize geometry: {e}")))?;
    Ok(NewRow { name, geometry })
}

/// Insère toutes les features dans une seule transaction
///
/// Un échec de ligne est consigné et n'arrête pas le lot ; seuls l'ouverture
/// et le commit de la transaction sont fatals.
///
/// # Errors
///
/// `IngestError::Transaction` si la transaction ne peut être ouverte,
/// `IngestError::Commit` si le commit final échoue.
pub async fn insert_all<C: Connection + ?Sized>(
    connection: &mut C,
    features: &[Feature],
) -> Result<IngestionResult, IngestError> {
    connection.begin().await.map_err(IngestError::Transaction)?;

    let mut result = IngestionResult::default();
    for (index, feature) in features.iter().enumerate() {
        let row = match to_row(feature, index) {
            Ok(row) => row,
            Err(Unfit::MissingGeometry(name)) => {
                warn!(index, name = %name, "Feature without geometry skipped");
                result.record_skipped();
                continue;
            }
            Err(Unfit::Unserializable(reason)) => {
                warn!(index, "{reason}");
                result.record_failed(reason);
                continue;
            }
        };

        match connection.insert_row(&row).await {
            Ok(()) => {
                debug!(index, name = %row.name, "Feature inserted");
                result.record_inserted();
            }
            Err(e) => {
                warn!(index, name = %row.name, error = %e, "Feature insertion failed");
                result.record_failed(format!("{}: {e}", row.name));
            }
        }
    }

    connection.commit().await.map_err(IngestError::Commit)?;

    info!(
        attempted = result.attempted,
        inserted = result.inserted,
        skipped = result.skipped,
        "Batch committed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use geofeature::Validator;
    use serde_json::json;

    /// Connexion en mémoire ; échoue sur les noms listés dans `reject`
    #[derive(Default)]
    struct Recorder {
        reject: Vec<String>,
        fail_commit: bool,
        rows: Vec<NewRow>,
        events: Vec<&'static str>,
    }

    #[async_trait]
    impl Connection for Recorder {
        async fn ensure_schema(&mut self) -> Result<(), StoreError> {
            self.events.push("schema");
            Ok(())
        }
        async fn begin(&mut self) -> Result<(), StoreError> {
            self.events.push("begin");
            Ok(())
        }
        async fn insert_row(&mut self, row: &NewRow) -> Result<(), StoreError> {
            if self.reject.contains(&row.name) {
                return Err(StoreError::Backend("invalid GeoJSON representation".into()));
            }
            self.rows.push(row.clone());
            Ok(())
        }
        async fn commit(&mut self) -> Result<(), StoreError> {
            self.events.push("commit");
            if self.fail_commit {
                return Err(StoreError::Backend("connection reset".into()));
            }
            Ok(())
        }
        async fn ping(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn feature(properties: Value) -> Feature {
        Validator::StructuralOnly
            .validate(
                json!({
                    "type": "Feature",
                    "properties": properties,
                    "geometry": {"type": "Point", "coordinates": [100.0, 0.0]}
                }),
                0,
            )
            .unwrap()
    }

    #[test]
    fn test_display_name_priority() {
        assert_eq!(display_name(&feature(json!({"name": "X", "NAME": "Y"})), 0), "X");
        assert_eq!(display_name(&feature(json!({"name": "", "NAME": "Y"})), 0), "Y");
        assert_eq!(display_name(&feature(json!({"id": 42})), 0), "42");
        assert_eq!(display_name(&feature(json!({"name": null, "id": "a-1"})), 0), "a-1");
        assert_eq!(display_name(&feature(json!({"name": " ", "NAME": "Y"})), 0), " ");
    }

    #[test]
    fn test_display_name_fallback_uses_index() {
        assert_eq!(display_name(&feature(json!({})), 3), "Feature_3");
        assert_eq!(display_name(&feature(json!({"name": ["a"]})), 7), "Feature_7");
        assert_eq!(display_name(&feature(Value::Null), 1), "Feature_1");
    }

    #[test]
    fn test_geometry_is_serialized_unchanged() {
        let row = to_row(&feature(json!({"name": "P"})), 0).unwrap();
        let geometry: Value = serde_json::from_str(&row.geometry).unwrap();
        assert_eq!(geometry, json!({"type": "Point", "coordinates": [100.0, 0.0]}));
    }

    #[tokio::test]
    async fn test_row_failure_does_not_stop_batch() {
        let features = vec![
            feature(json!({"name": "a"})),
            feature(json!({"name": "b"})),
            feature(json!({"name": "c"})),
        ];
        let mut connection = Recorder {
            reject: vec!["b".to_string()],
            ..Default::default()
        };

        let result = insert_all(&mut connection, &features).await.unwrap();

        assert_eq!(result.attempted, 3);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.insertion_failures.len(), 1);
        assert!(result.insertion_failures[0].starts_with("b: "));
        assert_eq!(connection.events, vec!["begin", "commit"]);
        let names: Vec<&str> = connection.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_commit_failure_is_fatal() {
        let mut connection = Recorder {
            fail_commit: true,
            ..Default::default()
        };
        let err = insert_all(&mut connection, &[feature(json!({}))])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "commit");
    }
}
