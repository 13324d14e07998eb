use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a completed command. JSON output wraps `data` in the same
/// `{"success": true, ...}` envelope the gateway API uses.
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut envelope = json!({ "success": true, "message": message });
            if let Some(data) = data {
                envelope["data"] = data;
            }
            print_json(&envelope)
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            Ok(())
        }
    }
}

/// Report a failed check (unknown user, rejected token). Text goes to stderr.
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => print_json(&json!({
            "success": false,
            "error": message,
            "error_code": error_code,
        })),
        OutputFormat::Text => {
            match error_code {
                Some(code) => eprintln!("Error [{}]: {}", code, message),
                None => eprintln!("Error: {}", message),
            }
            Ok(())
        }
    }
}

/// Nothing to list, e.g. an empty group file or a group with no organisms.
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut body = Map::new();
            body.insert(collection_name.to_string(), Value::Array(Vec::new()));
            print_json(&Value::Object(body))
        }
        OutputFormat::Text => {
            println!("{}", message);
            Ok(())
        }
    }
}

/// Print `label: value` rows, padded to the widest label
pub fn output_rows(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("{:width$}  {}", label, value, width = width);
    }
}
