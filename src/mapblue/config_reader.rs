use std::fs;

use serde::{Deserialize, Serialize};

use crate::mapblue::*;

/// The Indiana State House.
pub const DEFAULT_CENTER: (f64, f64) = (39.768732, -86.162612);
pub const DEFAULT_LAT_SPAN: f64 = 0.008;
pub const DEFAULT_LON_SPAN: f64 = 0.016;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub url: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub url: Option<String>,
    /// The size of the viewport around a geocoded address.
    #[serde(rename = "latSpan")]
    pub lat_span: Option<f64>,
    #[serde(rename = "lonSpan")]
    pub lon_span: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoefficientsConfig {
    pub black: Option<f64>,
    pub hispanic: Option<f64>,
    #[serde(rename = "otherRace")]
    pub other_race: Option<f64>,
    pub unmarried: Option<f64>,
    pub childless: Option<f64>,
    pub constant: Option<f64>,
}

impl CoefficientsConfig {
    /// Overrides the given coefficients with the values that are set.
    pub fn apply_to(&self, base: &RegressionCoefficients) -> RegressionCoefficients {
        RegressionCoefficients {
            black: self.black.unwrap_or(base.black),
            hispanic: self.hispanic.unwrap_or(base.hispanic),
            other_race: self.other_race.unwrap_or(base.other_race),
            unmarried: self.unmarried.unwrap_or(base.unmarried),
            childless: self.childless.unwrap_or(base.childless),
            constant: self.constant.unwrap_or(base.constant),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CoefficientsConfig::default()
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(rename = "opacityMode")]
    pub opacity_mode: Option<String>,
    #[serde(rename = "minOpacity")]
    pub min_opacity: Option<f64>,
    #[serde(rename = "demColor")]
    pub dem_color: Option<String>,
    #[serde(rename = "repColor")]
    pub rep_color: Option<String>,
    #[serde(rename = "neutralColor")]
    pub neutral_color: Option<String>,
    #[serde(rename = "strokeWeight")]
    pub stroke_weight: Option<u32>,
}

pub fn read_opacity_mode(mode: &str) -> MapResult<OpacityMode> {
    match mode {
        "share" => Ok(OpacityMode::Share),
        "count" => Ok(OpacityMode::Count),
        x => whatever!("unknown opacity mode: {:?} (expected share or count)", x),
    }
}

impl StyleConfig {
    pub fn rules(&self) -> MapResult<StyleRules> {
        let defaults = StyleRules::default_rules();
        let rules = StyleRules {
            opacity_mode: match &self.opacity_mode {
                Some(mode) => read_opacity_mode(mode.as_str())?,
                None => defaults.opacity_mode,
            },
            min_opacity: self.min_opacity.unwrap_or(defaults.min_opacity),
            dem_color: self.dem_color.clone().map(Color).unwrap_or(defaults.dem_color),
            rep_color: self.rep_color.clone().map(Color).unwrap_or(defaults.rep_color),
            neutral_color: self
                .neutral_color
                .clone()
                .map(Color)
                .unwrap_or(defaults.neutral_color),
            stroke_weight: self.stroke_weight.unwrap_or(defaults.stroke_weight),
        };
        rules.check().context(SessionSnafu {})?;
        Ok(rules)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CenterConfig {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "latSpan")]
    pub lat_span: Option<f64>,
    #[serde(rename = "lonSpan")]
    pub lon_span: Option<f64>,
}

/// One action of the user on the map.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SessionStep {
    Viewport {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },
    Click {
        id: JSValue,
    },
    Hover {
        id: JSValue,
    },
    Coefficients(CoefficientsConfig),
    Geocode {
        address: String,
    },
    Reload,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub lookup: Option<LookupConfig>,
    pub geocoder: Option<GeocoderConfig>,
    pub coefficients: Option<CoefficientsConfig>,
    pub style: Option<StyleConfig>,
    pub center: Option<CenterConfig>,
    pub steps: Option<Vec<SessionStep>>,
}

impl SessionConfig {
    pub fn coefficients(&self) -> RegressionCoefficients {
        let defaults = RegressionCoefficients::DEFAULT_COEFFICIENTS;
        match &self.coefficients {
            Some(c) => c.apply_to(&defaults),
            None => defaults,
        }
    }

    pub fn initial_viewport(&self) -> Bounds {
        match &self.center {
            Some(c) => Bounds::around(
                c.lat,
                c.lon,
                c.lat_span.unwrap_or(DEFAULT_LAT_SPAN),
                c.lon_span.unwrap_or(DEFAULT_LON_SPAN),
            ),
            None => Bounds::around(
                DEFAULT_CENTER.0,
                DEFAULT_CENTER.1,
                DEFAULT_LAT_SPAN,
                DEFAULT_LON_SPAN,
            ),
        }
    }

    /// The span of the viewport opened around a geocoded address.
    pub fn geocoder_span(&self) -> (f64, f64) {
        let g = self.geocoder.as_ref();
        (
            g.and_then(|g| g.lat_span).unwrap_or(DEFAULT_LAT_SPAN),
            g.and_then(|g| g.lon_span).unwrap_or(DEFAULT_LON_SPAN),
        )
    }
}

pub fn read_config(path: &str) -> MapResult<SessionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SessionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> MapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let text = r#"{
            "lookup": { "url": "http://localhost:8080/" },
            "coefficients": { "black": 0.5, "otherRace": 0.2 },
            "style": { "opacityMode": "count", "minOpacity": 0.2 },
            "center": { "lat": 40.0, "lon": -86.0 },
            "steps": [
                { "action": "viewport", "lat1": 39.772, "lon1": -86.155, "lat2": 39.765, "lon2": -86.170 },
                { "action": "click", "id": 42 },
                { "action": "hover", "id": "42" },
                { "action": "coefficients", "constant": 0.3 },
                { "action": "geocode", "address": "200 W Washington St" },
                { "action": "reload" }
            ]
        }"#;
        let config: SessionConfig = serde_json::from_str(text).unwrap();
        let c = config.coefficients();
        assert_eq!(c.black, 0.5);
        assert_eq!(c.other_race, 0.2);
        assert_eq!(c.constant, RegressionCoefficients::DEFAULT_COEFFICIENTS.constant);
        let rules = config.style.clone().unwrap().rules().unwrap();
        assert_eq!(rules.opacity_mode, OpacityMode::Count);
        assert_eq!(rules.min_opacity, 0.2);
        let steps = config.steps.clone().unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(
            steps[3],
            SessionStep::Coefficients(CoefficientsConfig {
                constant: Some(0.3),
                ..CoefficientsConfig::default()
            })
        );
        assert_eq!(steps[5], SessionStep::Reload);
        let v = config.initial_viewport();
        assert!((v.lat1 - 40.004).abs() < 1e-9);
    }

    #[test]
    fn empty_config() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(
            config.coefficients(),
            RegressionCoefficients::DEFAULT_COEFFICIENTS
        );
        assert_eq!(
            config.initial_viewport(),
            Bounds::around(39.768732, -86.162612, 0.008, 0.016)
        );
        assert_eq!(config.geocoder_span(), (0.008, 0.016));
    }

    #[test]
    fn bad_style() {
        let style = StyleConfig {
            opacity_mode: Some("density".to_string()),
            ..StyleConfig::default()
        };
        assert!(style.rules().is_err());
        let style = StyleConfig {
            min_opacity: Some(-0.5),
            ..StyleConfig::default()
        };
        assert!(matches!(style.rules(), Err(MapError::Session { .. })));
    }

    #[test]
    fn unknown_action() {
        let res: Result<SessionStep, _> = serde_json::from_str(r#"{ "action": "zoom" }"#);
        assert!(res.is_err());
    }
}
