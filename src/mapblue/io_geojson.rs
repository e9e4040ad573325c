// Primitives for reading the GeoJSON answers of the lookup service.

use serde::{Deserialize, Serialize};

use crate::mapblue::{io_common::block_id_from_js, *};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct BlockProperties {
    name: Option<String>,
    over18: u64,
    black: f64,
    hispanic: f64,
    #[serde(rename = "otherRace")]
    other_race: f64,
    unmarried: f64,
    childless: f64,
}

/// Reads all the blocks of a FeatureCollection.
///
/// An empty object stands for a viewport without blocks. One malformed
/// feature makes the whole collection fail.
pub fn read_feature_collection(js: &JSValue) -> MapResult<Vec<FetchedBlock>> {
    let obj = match js.as_object() {
        Some(obj) => obj,
        None => whatever!("expected a GeoJSON object, got {}", js),
    };
    if obj.is_empty() {
        return Ok(vec![]);
    }
    let features = match obj.get("features").and_then(|f| f.as_array()) {
        Some(features) => features,
        None => whatever!("missing features in GeoJSON FeatureCollection"),
    };
    let mut res: Vec<FetchedBlock> = Vec::new();
    for (position, feature) in features.iter().enumerate() {
        let block = read_feature(position, feature)?;
        debug!("read_feature_collection: {:?}", block.demographics);
        res.push(block);
    }
    Ok(res)
}

fn read_feature(position: usize, feature: &JSValue) -> MapResult<FetchedBlock> {
    let id = feature
        .get("id")
        .and_then(block_id_from_js)
        .context(MalformedFeatureSnafu {
            position,
            reason: "missing id",
        })?;
    let props_js = feature
        .get("properties")
        .context(MalformedFeatureSnafu {
            position,
            reason: "missing properties",
        })?;
    let props: BlockProperties = match serde_json::from_value(props_js.clone()) {
        Ok(props) => props,
        Err(e) => {
            return MalformedFeatureSnafu {
                position,
                reason: e.to_string(),
            }
            .fail()
        }
    };
    Ok(FetchedBlock {
        demographics: BlockDemographics {
            id,
            name: props.name,
            over18: props.over18,
            black: props.black,
            hispanic: props.hispanic,
            other_race: props.other_race,
            unmarried: props.unmarried,
            childless: props.childless,
        },
        geometry: feature.get("geometry").cloned().unwrap_or(JSValue::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(id: JSValue, over18: JSValue) -> JSValue {
        json!({
            "id": id,
            "type": "Feature",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[-86.157712, 39.776782], [-86.157671, 39.777967],
                                  [-86.155858, 39.777954], [-86.157712, 39.776782]]]]
            },
            "properties": {
                "name": "Block 1004",
                "over18": over18,
                "black": 40,
                "hispanic": 10,
                "otherRace": 5,
                "unmarried": 20,
                "childless": 15
            }
        })
    }

    #[test]
    fn reads_features() {
        let js = json!({
            "type": "FeatureCollection",
            "features": [feature(json!("181570003001004"), json!(100)), feature(json!(42), json!(0))]
        });
        let blocks = read_feature_collection(&js).unwrap();
        assert_eq!(blocks.len(), 2);
        let d = &blocks[0].demographics;
        assert_eq!(d.id, BlockId::new("181570003001004"));
        assert_eq!(d.name.as_deref(), Some("Block 1004"));
        assert_eq!(d.over18, 100);
        assert_eq!(d.other_race, 5.0);
        assert_eq!(blocks[1].demographics.id, BlockId::new("42"));
        assert_eq!(blocks[0].geometry["type"], json!("MultiPolygon"));
    }

    #[test]
    fn empty_answer() {
        assert_eq!(read_feature_collection(&json!({})).unwrap().len(), 0);
    }

    #[test]
    fn malformed_features() {
        let js = json!({
            "type": "FeatureCollection",
            "features": [feature(json!("1"), json!(100)), feature(json!(null), json!(3))]
        });
        assert!(matches!(
            read_feature_collection(&js),
            Err(MapError::MalformedFeature { position: 1, .. })
        ));
        let js = json!({
            "type": "FeatureCollection",
            "features": [feature(json!("1"), json!(-4))]
        });
        assert!(matches!(
            read_feature_collection(&js),
            Err(MapError::MalformedFeature { position: 0, .. })
        ));
        assert!(read_feature_collection(&json!([1, 2])).is_err());
        assert!(read_feature_collection(&json!({"type": "FeatureCollection"})).is_err());
    }
}
