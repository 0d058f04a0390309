//! # Helioviewer Request Analytics Entry Point
//!
//! Prepares the request logs of every product and draws their charts.
//!
//! ## Modes
//! - **Prepare:** parse each product's log (plus legacy log) into artifacts under the derived directory.
//! - **Analyze:** topicality, duration and request-count charts per product, plus data-source usage.
//! - **Compare:** daily usage of helioviewer.org movies, embeds and JHelioviewer movies.
//!
//! A mode number given as the first argument runs that mode once without the menu.
//! Set `RUST_LOG=info` for progress output.

use std::{
    error::Error,
    io::{BufRead, Write, stdin, stdout},
};

use hv_analysis::{
    analysis::{
        requests::run_request_analysis,
        service_comparison::run_service_comparison,
        sources::run_source_analysis,
    },
    config::PipelineConfig,
    prepare::job::run_preparation,
    utils::{artifacts::ArtifactStore, style::AnnotationConfig},
};
use log::{error, info};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    info!("Helioviewer request analytics");

    let annotations = AnnotationConfig::helioviewer();

    // Scripted run: one step, non-zero exit if any part of it failed.
    if let Some(choice) = std::env::args().nth(1) {
        let failures = run_choice(choice.trim(), &annotations).unwrap_or(0);
        if failures > 0 {
            return Err(format!("{} step(s) failed, see log", failures).into());
        }
        return Ok(());
    }

    while let Some(choice) = prompt_menu() {
        if run_choice(&choice, &annotations).is_none() {
            break;
        }
    }
    Ok(())
}

/// Runs one menu entry and returns the number of failed steps; `None` means exit.
fn run_choice(choice: &str, annotations: &AnnotationConfig) -> Option<usize> {
    let failures = match choice {
        "1" => {
            let failed = prepare_all();
            println!("\n Preparation completed. Returning to menu...\n");
            failed
        }
        "2" | "" => {
            let failed = analyze_all(annotations);
            println!("\n Analysis completed. Returning to menu...\n");
            failed
        }
        "3" => {
            let failed = compare_services(annotations);
            println!("\n Comparison completed. Returning to menu...\n");
            failed
        }
        "4" | "q" => {
            println!("Exiting. Goodbye!");
            return None;
        }
        other => {
            println!("Unrecognized option '{}', please try again.", other);
            0
        }
    };
    Some(failures)
}

/// Reads one menu choice; `None` once stdin is closed.
fn prompt_menu() -> Option<String> {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│     SELECT ANALYSIS STEP                    │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Prepare all request logs                │");
    println!("│  2) Analyze all products                    │");
    println!("│  3) Compare services                        │");
    println!("│  4) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    print!("Select [1/2/3/4] (default: 2): ");
    let _ = stdout().flush();

    let choice = read_choice(&mut stdin().lock());
    if choice.is_none() {
        println!("\nNo more input. Goodbye!");
    }
    choice
}

fn read_choice(reader: &mut impl BufRead) -> Option<String> {
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

// One failing product is logged and the others still run.
fn prepare_all() -> usize {
    let mut failed = 0;
    for config in PipelineConfig::all() {
        let store = ArtifactStore::new(&config.derived_dir);
        match run_preparation(&config, &store) {
            Ok(prepared) => println!("  {:<28} {:>10} records", config.data_analyzed(), prepared.len()),
            Err(e) => {
                error!("Preparing {} failed: {}", config.data_analyzed(), e);
                failed += 1;
            }
        }
    }
    failed
}

fn analyze_all(annotations: &AnnotationConfig) -> usize {
    let mut failed = 0;
    for config in PipelineConfig::all() {
        match run_request_analysis(&config, annotations) {
            Ok(written) => info!("{}: {} charts written", config.data_type(), written.len()),
            Err(e) => {
                error!("Analyzing {} failed: {}", config.data_type(), e);
                failed += 1;
            }
        }
        if let Err(e) = run_source_analysis(&config) {
            error!("Source usage of {} failed: {}", config.data_analyzed(), e);
            failed += 1;
        }
    }
    failed
}

fn compare_services(annotations: &AnnotationConfig) -> usize {
    match run_service_comparison(&PipelineConfig::hvorg_movies(), annotations) {
        Ok(written) => {
            info!("Service comparison: {} files written", written.len());
            0
        }
        Err(e) => {
            error!("Service comparison failed: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn closed_input_ends_the_menu() {
        let mut input = Cursor::new("3\n\n");
        assert_eq!(read_choice(&mut input).as_deref(), Some("3"));
        // an empty line still selects the default
        assert_eq!(read_choice(&mut input).as_deref(), Some(""));
        assert_eq!(read_choice(&mut input), None);
    }
}
