// Client for the address geocoder.

use reqwest::blocking::Client;
use reqwest::Url;

use crate::mapblue::*;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

pub struct Geocoder {
    url: String,
    client: Client,
}

/// Reads the first candidate of a geocoder answer, as (latitude, longitude).
///
/// The answer is a JSON array of candidates with `lat` and `lon` fields, as
/// numbers or as strings.
pub fn read_geocoder_response(address: &str, body: &str) -> MapResult<(f64, f64)> {
    let js: JSValue = match serde_json::from_str(body) {
        Ok(js) => js,
        Err(e) => {
            return InvalidGeocoderResponseSnafu {
                reason: e.to_string(),
            }
            .fail()
        }
    };
    let candidates = js.as_array().context(InvalidGeocoderResponseSnafu {
        reason: "expected a list of candidates",
    })?;
    let first = candidates
        .first()
        .context(AddressNotFoundSnafu { address })?;
    let lat = read_coordinate(first.get("lat")).context(InvalidGeocoderResponseSnafu {
        reason: "missing latitude",
    })?;
    let lon = read_coordinate(first.get("lon")).context(InvalidGeocoderResponseSnafu {
        reason: "missing longitude",
    })?;
    Ok((lat, lon))
}

fn read_coordinate(x: Option<&JSValue>) -> Option<f64> {
    match x {
        Some(JSValue::Number(n)) => n.as_f64(),
        Some(JSValue::String(s)) => s.parse::<f64>().ok(),
        _ => None,
    }
}

impl Geocoder {
    pub fn new(url: &str) -> MapResult<Geocoder> {
        let client = Client::builder()
            .user_agent(concat!("mapblue/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(LookupRequestSnafu { url })?;
        Ok(Geocoder {
            url: url.to_string(),
            client,
        })
    }

    pub fn locate(&self, address: &str) -> MapResult<(f64, f64)> {
        let url = Url::parse_with_params(&self.url, &[("q", address), ("format", "json")])
            .ok()
            .context(InvalidUrlSnafu {
                url: self.url.as_str(),
            })?;
        info!("Geocoding {:?}", address);
        let response = self
            .client
            .get(url.clone())
            .send()
            .context(LookupRequestSnafu { url: url.as_str() })?;
        let status = response.status();
        if !status.is_success() {
            return LookupStatusSnafu {
                url: url.as_str(),
                status: status.as_u16(),
            }
            .fail();
        }
        let body = response
            .text()
            .context(LookupRequestSnafu { url: url.as_str() })?;
        read_geocoder_response(address, body.as_str())
    }
}
