use std::fs;

use crate::mapblue::*;

/// Reads the textual form of a block id. The lookup service sends either
/// strings or numbers.
pub fn block_id_from_js(js: &JSValue) -> Option<BlockId> {
    match js {
        JSValue::String(s) => Some(BlockId(s.clone())),
        JSValue::Number(n) => Some(BlockId(n.to_string())),
        _ => None,
    }
}

/// Parses `lat1,lon1,lat2,lon2`.
pub fn parse_bounds(text: &str) -> MapResult<Bounds> {
    let values: Vec<f64> = text
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .ok()
        .context(ParsingBoundsSnafu { text })?;
    match values.as_slice() {
        [lat1, lon1, lat2, lon2] => Ok(Bounds {
            lat1: *lat1,
            lon1: *lon1,
            lat2: *lat2,
            lon2: *lon2,
        }),
        _ => ParsingBoundsSnafu { text }.fail(),
    }
}

/// The query string sent to the lookup service.
pub fn bounds_query(bounds: &Bounds) -> [(&'static str, String); 4] {
    [
        ("lat1", bounds.lat1.to_string()),
        ("lon1", bounds.lon1.to_string()),
        ("lat2", bounds.lat2.to_string()),
        ("lon2", bounds.lon2.to_string()),
    ]
}

/// Writes to the given path, or to the standard output if the path is `stdout`.
pub fn write_output(path: &str, contents: &str) -> MapResult<()> {
    if path == "stdout" {
        println!("{}", contents);
        Ok(())
    } else {
        info!("Writing {}", path);
        fs::write(path, contents).context(WritingOutputSnafu { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_from_strings_and_numbers() {
        assert_eq!(block_id_from_js(&json!("42")), Some(BlockId::new("42")));
        assert_eq!(block_id_from_js(&json!(42)), Some(BlockId::new("42")));
        assert_eq!(block_id_from_js(&json!(null)), None);
        assert_eq!(block_id_from_js(&json!({"a": 1})), None);
    }

    #[test]
    fn bounds_from_text() {
        let b = parse_bounds("39.772, -86.155,39.765,-86.17").unwrap();
        assert_eq!(b.lat1, 39.772);
        assert_eq!(b.lon2, -86.17);
        assert!(parse_bounds("39.772,-86.155,39.765").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }

    #[test]
    fn query_order() {
        let b = parse_bounds("1,2,3,4").unwrap();
        let q = bounds_query(&b);
        let keys: Vec<&str> = q.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["lat1", "lon1", "lat2", "lon2"]);
        assert_eq!(q[3].1, "4");
    }
}
