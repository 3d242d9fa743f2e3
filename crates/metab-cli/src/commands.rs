use anyhow::{Context, Result};
use comfy_table::Table;
use metab_cli::pipeline::{RunReport, run_clean, run_harmonize, run_pipeline};
use metab_ingest::{PipelineConfig, load_config};
use metab_output::HARMONIZED_DATA;
use serde_json::Value;
use tracing::info_span;

use crate::cli::{CleanArgs, ConfigArgs};
use crate::summary::apply_table_style;

fn load(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = load_config(&args.config)
        .with_context(|| format!("load configuration {}", args.config.display()))?;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

pub fn run_all(args: &ConfigArgs) -> Result<RunReport> {
    let config = load(args)?;
    let _guard = info_span!("run", config = %args.config.display()).entered();
    run_pipeline(&config)
}

pub fn run_harmonize_only(args: &ConfigArgs) -> Result<RunReport> {
    let config = load(args)?;
    let _guard = info_span!("run", config = %args.config.display()).entered();
    run_harmonize(&config)
}

pub fn run_clean_only(args: &CleanArgs) -> Result<RunReport> {
    let config = load(&args.config)?;
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.output_dir.join(HARMONIZED_DATA));
    let _guard = info_span!("run", input = %input.display()).entered();
    run_clean(&config, &input)
}

/// `(dotted.key, value)` rows for every leaf of a serialised configuration.
pub fn config_rows(value: &Value) -> Vec<(String, String)> {
    fn walk(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, rows);
                }
            }
            Value::Null => rows.push((prefix.to_string(), "None".to_string())),
            Value::String(text) => rows.push((prefix.to_string(), text.clone())),
            other => rows.push((prefix.to_string(), other.to_string())),
        }
    }
    let mut rows = Vec::new();
    walk("", value, &mut rows);
    rows
}

pub fn show_config(args: &ConfigArgs) -> Result<()> {
    let config = load(args)?;
    let value = serde_json::to_value(&config).context("serialise configuration")?;
    let mut table = Table::new();
    table.set_header(vec!["Option", "Value"]);
    apply_table_style(&mut table);
    for (key, value) in config_rows(&value) {
        table.add_row(vec![key, value]);
    }
    println!("Configuration: {}", args.config.display());
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rows_flatten_nested_values() {
        let value = serde_json::json!({
            "output_dir": "processed",
            "qc": { "nSD": 5.0, "filter_row_missing_rate_threshold": null },
            "grouping": { "groups": [] }
        });
        let rows = config_rows(&value);
        assert!(rows.contains(&("output_dir".to_string(), "processed".to_string())));
        assert!(rows.contains(&("qc.nSD".to_string(), "5.0".to_string())));
        assert!(rows.contains(&(
            "qc.filter_row_missing_rate_threshold".to_string(),
            "None".to_string()
        )));
        assert!(rows.contains(&("grouping.groups".to_string(), "[]".to_string())));
    }

    #[test]
    fn test_config_rows_render() {
        let value = serde_json::json!({
            "normalizer": { "action": "log" },
            "inputs": { "qc_file": null, "meta_file": "input/meta_data.csv" }
        });
        let rendered: String = config_rows(&value)
            .iter()
            .map(|(key, value)| format!("{key} = {value}\n"))
            .collect();
        insta::assert_snapshot!(rendered, @r"
        inputs.meta_file = input/meta_data.csv
        inputs.qc_file = None
        normalizer.action = log
        ");
    }
}
