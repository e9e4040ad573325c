// Serving blocks from a local GeoJSON file.

use std::fs;

use geo::{coord, BoundingRect, Coord, Intersects, MultiPoint, Rect};

use crate::mapblue::{io_geojson::read_feature_collection, *};

/// A block source that answers from a FeatureCollection loaded in memory.
///
/// A block is returned when the bounding box of its geometry intersects the
/// requested viewport. Blocks without geometry are always returned.
pub struct FileSource {
    blocks: Vec<(FetchedBlock, Option<Rect<f64>>)>,
}

/// Collects all the positions of a GeoJSON `coordinates` array, whatever its
/// nesting depth.
fn collect_coords(js: &JSValue, acc: &mut Vec<Coord<f64>>) {
    if let Some(items) = js.as_array() {
        match items.as_slice() {
            [JSValue::Number(x), JSValue::Number(y), ..] => {
                if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
                    acc.push(coord! { x: x, y: y });
                }
            }
            _ => {
                for item in items.iter() {
                    collect_coords(item, acc);
                }
            }
        }
    }
}

pub fn geometry_bbox(geometry: &JSValue) -> Option<Rect<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    collect_coords(&geometry["coordinates"], &mut coords);
    MultiPoint::from(coords).bounding_rect()
}

fn bounds_rect(bounds: &Bounds) -> Rect<f64> {
    Rect::new(
        coord! { x: bounds.lon1, y: bounds.lat1 },
        coord! { x: bounds.lon2, y: bounds.lat2 },
    )
}

impl FileSource {
    pub fn new(blocks: Vec<FetchedBlock>) -> FileSource {
        let blocks = blocks
            .into_iter()
            .map(|b| {
                let bbox = geometry_bbox(&b.geometry);
                (b, bbox)
            })
            .collect();
        FileSource { blocks }
    }

    pub fn open(path: &str) -> MapResult<FileSource> {
        info!("Reading blocks from {:?}", path);
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        let blocks = read_feature_collection(&js)?;
        info!("Read {} blocks from {:?}", blocks.len(), path);
        Ok(FileSource::new(blocks))
    }
}

impl BlockSource for FileSource {
    fn fetch(&self, bounds: &Bounds) -> MapResult<Vec<FetchedBlock>> {
        let query = bounds_rect(bounds);
        let res: Vec<FetchedBlock> = self
            .blocks
            .iter()
            .filter(|(_, bbox)| bbox.map(|r| r.intersects(&query)).unwrap_or(true))
            .map(|(b, _)| b.clone())
            .collect();
        debug!("fetch: {} of {} blocks in {}", res.len(), self.blocks.len(), bounds);
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetched(id: &str, geometry: JSValue) -> FetchedBlock {
        FetchedBlock {
            demographics: BlockDemographics {
                id: BlockId::new(id),
                name: None,
                over18: 10,
                black: 1.0,
                hispanic: 1.0,
                other_race: 1.0,
                unmarried: 1.0,
                childless: 1.0,
            },
            geometry,
        }
    }

    fn square(lon: f64, lat: f64) -> JSValue {
        json!({
            "type": "Polygon",
            "coordinates": [[[lon, lat], [lon + 0.001, lat], [lon + 0.001, lat + 0.001], [lon, lat]]]
        })
    }

    #[test]
    fn bbox_of_nested_coordinates() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [[[[-86.157712, 39.776782], [-86.155858, 39.777954], [-86.157712, 39.776782]]],
                            [[[-86.154092, 39.776702], [-86.155905, 39.776742], [-86.154092, 39.776702]]]]
        });
        let bbox = geometry_bbox(&geometry).unwrap();
        assert_eq!(bbox.min(), coord! { x: -86.157712, y: 39.776702 });
        assert_eq!(bbox.max(), coord! { x: -86.154092, y: 39.777954 });
        assert_eq!(geometry_bbox(&JSValue::Null), None);
    }

    #[test]
    fn fetch_filters_by_viewport() {
        let source = FileSource::new(vec![
            fetched("in", square(-86.16, 39.767)),
            fetched("out", square(-80.0, 30.0)),
            fetched("nowhere", JSValue::Null),
        ]);
        let bounds = Bounds {
            lat1: 39.772,
            lon1: -86.155,
            lat2: 39.765,
            lon2: -86.17,
        };
        let ids: Vec<String> = source
            .fetch(&bounds)
            .unwrap()
            .iter()
            .map(|b| b.demographics.id.to_string())
            .collect();
        assert_eq!(ids, vec!["in".to_string(), "nowhere".to_string()]);
    }
}
