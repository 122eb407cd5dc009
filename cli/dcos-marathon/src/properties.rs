//! `key=value` property overrides for `app update`.

use serde_json::{Map, Value};

use crate::error::CliError;

/// Parse property arguments into a JSON object.
///
/// Values are read as JSON first, then as JSON with surrounding single
/// quotes removed, and finally kept as plain strings.
pub fn parse_properties(properties: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut parsed = Map::new();
    for property in properties {
        let Some((key, raw)) = property.split_once('=') else {
            return Err(CliError::usage(format!(
                "Error parsing property '{}': expected <key>=<value>",
                property
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::usage(format!(
                "Error parsing property '{}': key cannot be empty",
                property
            )));
        }

        if parsed.insert(key.to_string(), parse_value(raw)).is_some() {
            return Err(CliError::usage(format!(
                "Property '{}' specified multiple times",
                key
            )));
        }
    }
    Ok(parsed)
}

fn parse_value(raw: &str) -> Value {
    if let Ok(value) = serde_json::from_str(raw) {
        return value;
    }

    let unquoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    serde_json::from_str(unquoted).unwrap_or_else(|_| Value::String(unquoted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn props(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("cpus=1", "cpus", json!(1))]
    #[case("mem=20.5", "mem", json!(20.5))]
    #[case("cmd='sleep 100'", "cmd", json!("sleep 100"))]
    #[case("cmd=sleep 100", "cmd", json!("sleep 100"))]
    #[case(r#"cpus="a string""#, "cpus", json!("a string"))]
    #[case(r#"env='{"key":"/value"}'"#, "env", json!({ "key": "/value" }))]
    #[case("args=[\"a\",\"b\"]", "args", json!(["a", "b"]))]
    #[case("labels.x=a=b", "labels.x", json!("a=b"))]
    #[case("cmd=", "cmd", json!(""))]
    fn parses_values(#[case] arg: &str, #[case] key: &str, #[case] expected: Value) {
        let parsed = parse_properties(&props(&[arg])).unwrap();
        assert_eq!(parsed[key], expected);
    }

    #[test]
    fn rejects_property_without_equals() {
        let err = parse_properties(&props(&["instances"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error parsing property 'instances': expected <key>=<value>"
        );
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_properties(&props(&["cpus=1", "cpus=2"])).unwrap_err();
        assert_eq!(err.to_string(), "Property 'cpus' specified multiple times");
    }

    #[test]
    fn keeps_every_key() {
        let parsed = parse_properties(&props(&["cpus=1", "mem=20", "cmd='sleep 100'"])).unwrap();
        assert_eq!(
            Value::Object(parsed),
            json!({ "cpus": 1, "mem": 20, "cmd": "sleep 100" })
        );
    }
}
