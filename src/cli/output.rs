//! Output formatting for CLI results

use anyhow::Result;
use colorful::Colorful;

use crate::core::pipeline::ModelInfo;
use crate::core::service::{ClassificationResponse, Outcome};
use crate::core::SpeciesCatalog;

/// Format one response for the terminal
pub fn format_response(response: &ClassificationResponse, top: usize) -> String {
    let mut output = String::new();

    match &response.outcome {
        Outcome::Success { prediction } => {
            output.push_str(&format!(
                "{} {} {}\n",
                "✓".green(),
                response.source.as_str().bold(),
                format!("({} ms)", response.elapsed_ms).as_str().dim()
            ));
            for (rank, entry) in prediction.top_n(top).iter().enumerate() {
                let line = format!(
                    "  {}. {:<20} {:<24} {:>6.2}%",
                    rank + 1,
                    entry.common_name,
                    entry.scientific_name,
                    entry.confidence_percent()
                );
                if rank == 0 {
                    output.push_str(&format!("{}\n", line.as_str().cyan()));
                } else {
                    output.push_str(&format!("{}\n", line));
                }
            }
        }
        Outcome::Failure { error } => {
            output.push_str(&format!(
                "{} {} {}\n",
                "✗".red(),
                response.source.as_str().bold(),
                format!("({} ms)", response.elapsed_ms).as_str().dim()
            ));
            output.push_str(&format!(
                "  {}: {}\n",
                error.kind.name().yellow(),
                error.message
            ));
        }
    }

    output
}

/// One compact JSON object per response
pub fn format_response_json(response: &ClassificationResponse) -> Result<String> {
    Ok(serde_json::to_string(response)?)
}

pub fn print_summary(succeeded: usize, failed: usize) {
    let total = succeeded + failed;
    if failed == 0 {
        println!("{}", format!("Classified {} file(s)", total).as_str().green());
    } else {
        println!(
            "{}",
            format!("Classified {} of {} file(s), {} failed", succeeded, total, failed)
                .as_str()
                .yellow()
        );
    }
}

pub fn format_species(catalog: &SpeciesCatalog) -> String {
    let mut output = format!("Species catalog {}\n\n", catalog.version().bold());
    for entry in catalog.entries() {
        output.push_str(&format!(
            "  {} {} ({})\n",
            format!("{}.", entry.index).as_str().dim(),
            entry.common_name.as_str().cyan(),
            entry.scientific_name
        ));
        output.push_str(&format!("     {}\n", entry.description));
        output.push_str(&format!("     Habitat: {}\n", entry.habitat));
        output.push_str(&format!("     Call:    {}\n", entry.call_descriptor));
    }
    output
}

pub fn format_species_json(catalog: &SpeciesCatalog) -> Result<String> {
    Ok(serde_json::to_string_pretty(catalog)?)
}

pub fn format_model_info(info: &ModelInfo) -> String {
    let mut output = String::new();
    let status = if info.loaded { "loaded".green() } else { "not loaded".red() };
    output.push_str(&format!("Model:          {} ({})\n", info.model_type, status));
    output.push_str(&format!("Loaded at:      {}\n", info.loaded_at.to_rfc3339()));
    output.push_str(&format!("Weights:        v{} [{}]\n", info.format_version, info.checksum));
    output.push_str(&format!("Catalog:        {} ({} species)\n", info.catalog_version, info.species_count));
    output.push_str(&format!("Features:       {}\n", info.feature_type));
    output.push_str(&format!("Sample rate:    {} Hz\n", info.working_sample_rate));
    output.push_str(&format!("Species:        {}\n", info.supported_species.join(", ")));
    output
}

pub fn format_model_info_json(info: &ModelInfo) -> Result<String> {
    Ok(serde_json::to_string_pretty(info)?)
}
