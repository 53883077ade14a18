//! Parsing of circumvention settings responses into bridge configurations.
//!
//! The discovery service replies with
//! `{"settings": [{"bridges": {"type": ..., "source": ..., "bridge_strings": [...]}}]}`.
//! Parsing walks the JSON tree field by field; a missing field and a
//! wrongly-typed field surface as distinct errors, and the optional
//! `bridge_strings` degrades to empty without failing the record.

use serde::Serialize;
use serde_json::Value;

use crate::error::ParseError;

/// One bridge configuration returned by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeConfig {
    /// Transport name, e.g. "obfs4" or "snowflake".
    #[serde(rename = "type")]
    pub transport_type: String,
    /// Provenance tag assigned by the discovery service.
    pub source: String,
    /// Bridge lines for the transport. Empty when the service returned none.
    pub bridge_strings: Vec<String>,
}

/// Parse a raw response body into bridge configurations.
///
/// All-or-nothing: any malformed record fails the whole response. Output
/// order matches the order of the `settings` array.
pub fn parse_settings(bytes: &[u8]) -> Result<Vec<BridgeConfig>, ParseError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let settings = root
        .get("settings")
        .ok_or(ParseError::MissingField("settings"))?;
    let settings = settings
        .as_array()
        .ok_or(ParseError::WrongType("settings"))?;
    settings.iter().map(parse_entry).collect()
}

fn parse_entry(entry: &Value) -> Result<BridgeConfig, ParseError> {
    let bridges = entry
        .get("bridges")
        .ok_or(ParseError::MissingField("bridges"))?;
    let bridge_strings = bridges
        .get("bridge_strings")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    Ok(BridgeConfig {
        transport_type: text_field(bridges, "type")?,
        source: text_field(bridges, "source")?,
        bridge_strings,
    })
}

fn text_field(node: &Value, field: &'static str) -> Result<String, ParseError> {
    node.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ParseError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = r#"{"settings":[
        {"bridges":{"type":"obfs4","source":"x","bridge_strings":["a","b"]}},
        {"bridges":{"type":"snowflake","source":"y"}}
    ]}"#;

    #[test]
    fn parses_records_in_order() {
        let bridges = parse_settings(TWO_RECORDS.as_bytes()).unwrap();
        assert_eq!(bridges.len(), 2);
        assert_eq!(bridges[0].transport_type, "obfs4");
        assert_eq!(bridges[0].source, "x");
        assert_eq!(bridges[0].bridge_strings, vec!["a", "b"]);
        assert_eq!(bridges[1].transport_type, "snowflake");
        assert_eq!(bridges[1].source, "y");
        assert!(bridges[1].bridge_strings.is_empty());
    }

    #[test]
    fn is_pure_over_input_bytes() {
        let first = parse_settings(TWO_RECORDS.as_bytes()).unwrap();
        let second = parse_settings(TWO_RECORDS.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_settings_is_empty_result() {
        let bridges = parse_settings(br#"{"settings":[]}"#).unwrap();
        assert!(bridges.is_empty());
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            parse_settings(b"not json"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn missing_settings() {
        assert!(matches!(
            parse_settings(br#"{"other": []}"#),
            Err(ParseError::MissingField("settings"))
        ));
    }

    #[test]
    fn settings_not_an_array() {
        assert!(matches!(
            parse_settings(br#"{"settings": {}}"#),
            Err(ParseError::WrongType("settings"))
        ));
    }

    #[test]
    fn missing_bridges_node() {
        assert!(matches!(
            parse_settings(br#"{"settings":[{"other":{}}]}"#),
            Err(ParseError::MissingField("bridges"))
        ));
    }

    #[test]
    fn missing_type_or_source() {
        assert!(matches!(
            parse_settings(br#"{"settings":[{"bridges":{"source":"x"}}]}"#),
            Err(ParseError::MissingField("type"))
        ));
        assert!(matches!(
            parse_settings(br#"{"settings":[{"bridges":{"type":"obfs4"}}]}"#),
            Err(ParseError::MissingField("source"))
        ));
    }

    #[test]
    fn non_text_type_is_missing() {
        assert!(matches!(
            parse_settings(br#"{"settings":[{"bridges":{"type":4,"source":"x"}}]}"#),
            Err(ParseError::MissingField("type"))
        ));
    }

    #[test]
    fn non_array_bridge_strings_degrades_to_empty() {
        let bridges = parse_settings(
            br#"{"settings":[{"bridges":{"type":"obfs4","source":"x","bridge_strings":"oops"}}]}"#,
        )
        .unwrap();
        assert_eq!(bridges.len(), 1);
        assert!(bridges[0].bridge_strings.is_empty());
    }
}
