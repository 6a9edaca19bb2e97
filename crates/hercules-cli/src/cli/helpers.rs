use super::CliError;
use hercules_core::domain::{Metadata, ParamValue, format_values};
use hercules_core::grid::GridHit;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt};

/// Logs go to stderr so command output stays machine readable. Defaults to
/// warnings only; set `RUST_LOG` (e.g. `hercules_core=debug`) to widen it.
pub(super) fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Splits `key=value`; the value is read as JSON when it parses, else kept
/// as a string.
pub(super) fn parse_metadata(pairs: &[String]) -> Result<Metadata, CliError> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(CliError::Usage(format!(
                "metadata entry '{pair}' must have the form key=value"
            )));
        };
        if key.is_empty() {
            return Err(CliError::Usage(format!(
                "metadata entry '{pair}' has an empty key"
            )));
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

/// Numbers stay numeric; anything else is a text label.
pub(super) fn parse_exact_values(raw: &[String]) -> Vec<ParamValue> {
    raw.iter()
        .map(|value| match value.parse::<f64>() {
            Ok(number) => ParamValue::Number(number),
            Err(_) => ParamValue::Text(value.clone()),
        })
        .collect()
}

pub(super) fn parse_all<T: FromStr>(raw: &[String], what: &str) -> Result<Vec<T>, CliError> {
    raw.iter()
        .map(|value| {
            value.parse::<T>().map_err(|_| {
                CliError::Usage(format!("'{value}' is not a valid {what}"))
            })
        })
        .collect()
}

pub(super) fn render_hit(hit: &GridHit) -> String {
    format!("{}\t{}", format_values(&hit.parameters), hit.path.display())
}
