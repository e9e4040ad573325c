// Client for the block lookup service.

use reqwest::blocking::Client;
use reqwest::Url;

use crate::mapblue::{io_common::bounds_query, io_geojson::read_feature_collection, *};

pub const DEFAULT_LOOKUP_URL: &str = "http://mapblue.org/lookup";

pub struct LookupClient {
    url: String,
    client: Client,
}

/// The full request URL for a viewport.
pub fn lookup_url(base: &str, bounds: &Bounds) -> MapResult<Url> {
    Url::parse_with_params(base, &bounds_query(bounds))
        .ok()
        .context(InvalidUrlSnafu { url: base })
}

impl LookupClient {
    pub fn new(url: &str) -> MapResult<LookupClient> {
        // Fails early on a bad URL rather than at the first fetch.
        lookup_url(url, &Bounds::around(0.0, 0.0, 0.0, 0.0))?;
        let client = Client::builder()
            .gzip(true)
            .deflate(true)
            .build()
            .context(LookupRequestSnafu { url })?;
        Ok(LookupClient {
            url: url.to_string(),
            client,
        })
    }
}

impl BlockSource for LookupClient {
    fn fetch(&self, bounds: &Bounds) -> MapResult<Vec<FetchedBlock>> {
        let url = lookup_url(&self.url, bounds)?;
        info!("Fetching blocks from {}", url);
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
        debug!("fetch: received {} bytes", body.len());
        let js: JSValue = serde_json::from_str(body.as_str()).context(ParsingJsonSnafu {})?;
        read_feature_collection(&js)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_bounds() {
        let bounds = Bounds {
            lat1: 39.772,
            lon1: -86.155,
            lat2: 39.765,
            lon2: -86.17,
        };
        let url = lookup_url(DEFAULT_LOOKUP_URL, &bounds).unwrap();
        assert_eq!(
            url.as_str(),
            "http://mapblue.org/lookup?lat1=39.772&lon1=-86.155&lat2=39.765&lon2=-86.17"
        );
    }

    #[test]
    fn bad_url() {
        assert!(matches!(
            LookupClient::new("not a url"),
            Err(MapError::InvalidUrl { .. })
        ));
    }
}
