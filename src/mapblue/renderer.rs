// A renderer that accumulates the styled blocks and writes them as GeoJSON.

use std::collections::HashMap;

use serde_json::json;

use crate::mapblue::*;

pub struct GeoJsonRenderer {
    viewport: Bounds,
    // Features in the order they were added.
    features: Vec<(BlockId, JSValue)>,
    styles: HashMap<BlockId, BlockStyle>,
}

fn outline_name(outline: Outline) -> &'static str {
    match outline {
        Outline::Selected => "selected",
        Outline::Plain => "plain",
        Outline::Hidden => "hidden",
    }
}

fn style_to_json(style: &BlockStyle) -> JSValue {
    json!({
        "fillColor": style.fill_color.to_string(),
        "fillOpacity": style.fill_opacity,
        "stroke": style.outline != Outline::Hidden,
        "outline": outline_name(style.outline),
        "weight": style.stroke_weight,
    })
}

impl GeoJsonRenderer {
    pub fn new(viewport: Bounds) -> GeoJsonRenderer {
        GeoJsonRenderer {
            viewport,
            features: Vec::new(),
            styles: HashMap::new(),
        }
    }

    /// Moves the map.
    pub fn set_viewport(&mut self, viewport: Bounds) {
        self.viewport = viewport;
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn style(&self, id: &BlockId) -> Option<&BlockStyle> {
        self.styles.get(id)
    }

    /// The styled FeatureCollection, with the statistics of every block from the session.
    pub fn to_geojson(&self, session: &MapSession) -> MapResult<JSValue> {
        let mut features: Vec<JSValue> = Vec::new();
        for (id, geometry) in self.features.iter() {
            let d = session.demographics(id).context(SessionSnafu {})?;
            let s = session.stats(id).context(SessionSnafu {})?;
            let selected = session.is_selected(id).context(SessionSnafu {})?;
            let style = self.styles.get(id).map(style_to_json).unwrap_or(JSValue::Null);
            features.push(json!({
                "id": id.to_string(),
                "type": "Feature",
                "geometry": geometry,
                "properties": {
                    "name": d.name,
                    "over18": d.over18,
                    "black": d.black,
                    "hispanic": d.hispanic,
                    "otherRace": d.other_race,
                    "unmarried": d.unmarried,
                    "childless": d.childless,
                    "white": s.white,
                    "blackPct": s.black_pct,
                    "hispanicPct": s.hispanic_pct,
                    "otherRacePct": s.other_race_pct,
                    "whitePct": s.white_pct,
                    "unmarriedPct": s.unmarried_pct,
                    "childlessPct": s.childless_pct,
                    "demPct": s.dem_share,
                    "demVotes": s.dem_votes,
                    "repVotes": s.rep_votes,
                    "netVotes": s.net_votes,
                    "clicked": selected,
                },
                "style": style,
            }));
        }
        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }
}

impl Renderer for GeoJsonRenderer {
    type Geometry = JSValue;

    fn viewport_bounds(&self) -> Bounds {
        self.viewport
    }

    fn add_features(&mut self, features: Vec<(BlockId, JSValue)>) {
        debug!("add_features: adding {} features", features.len());
        self.features.extend(features);
    }

    fn clear_features(&mut self) {
        self.features.clear();
        self.styles.clear();
    }

    fn set_feature_style(&mut self, id: &BlockId, style: &BlockStyle) {
        self.styles.insert(id.clone(), style.clone());
    }
}
