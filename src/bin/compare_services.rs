//! Service comparison only: reads the prepared request times of
//! helioviewer.org movies, embeds and JHelioviewer movies and writes the
//! fractional usage chart, the daily scatter plots and the usage page.
//!
//! Usage: `compare_services [derived_dir] [image_dir]`

use std::error::Error;

use hv_analysis::{
    analysis::service_comparison::run_service_comparison,
    config::PipelineConfig,
    utils::style::AnnotationConfig,
};
use log::info;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("=== SERVICE COMPARISON START ===");

    let mut base = PipelineConfig::hvorg_movies();
    let mut args = std::env::args().skip(1);
    if let Some(derived) = args.next() {
        base.derived_dir = derived.into();
    }
    if let Some(image) = args.next() {
        base.image_dir = image.into();
    }
    info!("Artifacts from {:?}, images to {:?}", base.derived_dir, base.image_dir);

    let written = run_service_comparison(&base, &AnnotationConfig::helioviewer())?;
    for path in &written {
        println!("  wrote {}", path.display());
    }

    println!("=== SERVICE COMPARISON DONE ===");
    Ok(())
}
