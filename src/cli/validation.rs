use crate::cli::args::CliArgs;
use crate::engine::{split_filter_csv, FilterSpec};
use crate::runner::MAX_DEPTH_LIMIT;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(max_depth) = args.max_depth {
        if max_depth == 0 || max_depth > MAX_DEPTH_LIMIT {
            return Err(format!(
                "invalid max-depth, expected 1..={MAX_DEPTH_LIMIT}"
            ));
        }
    }
    if let Some(raw) = args.filter_status.as_deref() {
        FilterSpec::parse::<String>(&split_filter_csv(raw), &[])
            .map_err(|e| format!("invalid --filter-status '{raw}': {e}"))?;
    }
    if let Some(raw) = args.filter_size.as_deref() {
        FilterSpec::parse::<String>(&[], &split_filter_csv(raw))
            .map_err(|e| format!("invalid --filter-size '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    if let Some(placeholder) = args.placeholder.as_deref() {
        if placeholder.is_empty() {
            return Err("invalid placeholder, expected a non-empty token".to_string());
        }
    }
    Ok(())
}
