//! Locations, file names and per-product pipeline presets.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::aggregate::restriction::Restriction;
use crate::prepare::derive::TopicalityReference;
use crate::prepare::records::TableLayout;
use crate::utils::style::{self, sanitize_file_stem};

pub const DEFAULT_SOURCE_DIR: &str = "~/Data/hvanalysis/source";
pub const DEFAULT_DERIVED_DIR: &str = "~/Data/hvanalysis/derived";
pub const DEFAULT_IMAGE_DIR: &str = "~/hvp/hv-analysis/img";

/// Data-source description served by the Helioviewer API.
pub const DATA_SOURCES_FILE: &str = "getDataSources.json";

pub const HISTOGRAM_BINS: usize = 100;
pub const BINS_PER_DAY: usize = 24;
pub const DAILY_COUNT_BINS: usize = 60;
pub const SHORT_TOPICALITY_DAYS: f64 = 30.0;
pub const SHORT_DURATION_DAYS: f64 = 2.0;
pub const LONG_DURATION_DAYS: f64 = 30.0;

/// Image sub-directory of the service comparison charts.
pub const COMPARISON_APPLICATION: &str = "service_comparison";

/// Events marked on the fractional usage chart.
pub const COMPARISON_EVENTS: &[&str] = &["bigbreak", "shutdown2013", "hvorg3", "newjhv", "comet_ison", "flare_flurry2017"];

/// Helioviewer.org was rebuilt around this date; usage is compared on either side.
pub fn down_time() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 7, 1).unwrap_or(NaiveDate::MIN)
}

/// Replaces a leading `~` with `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    Helioviewer,
    JHelioviewer,
}

impl Application {
    pub fn name(&self) -> &'static str {
        match self {
            Application::Helioviewer => "helioviewer.org",
            Application::JHelioviewer => "JHelioviewer",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Application::Helioviewer => "hvorg",
            Application::JHelioviewer => "jhv",
        }
    }

    /// Events marked on the daily request chart.
    pub fn daily_events(&self) -> &'static [&'static str] {
        match self {
            Application::Helioviewer => &[
                "repair",
                "shutdown2013",
                "bigbreak",
                "hvorg3",
                "june7_event",
                "comet_ison",
                "flare_flurry2017",
            ],
            Application::JHelioviewer => &[
                "repair",
                "shutdown2013",
                "bigbreak",
                "newjhv",
                "june7_event",
                "comet_ison",
                "flare_flurry2017",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Movie,
    Screenshot,
    Embed,
}

impl Product {
    pub fn name(&self) -> &'static str {
        match self {
            Product::Movie => "movie",
            Product::Screenshot => "screenshot",
            Product::Embed => "embed",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Product::Movie => "movies",
            Product::Screenshot => "screenshots",
            Product::Embed => "embeds",
        }
    }
}

/// Everything one preparation + analysis run needs to know about a product.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub application: Application,
    pub product: Product,
    pub layout: TableLayout,
    pub input_file: String,
    pub legacy_file: Option<String>,
    /// Data-source document; `None` skips the source usage matrix.
    pub data_sources_file: Option<String>,
    pub restriction: Restriction,
    pub topicality: TopicalityReference,
    /// Symbol of the daily count in labels, e.g. `n_hvm`.
    pub count_symbol: &'static str,
    /// Symbol of the observation instant topicality is measured against.
    pub observation_symbol: &'static str,
    pub source_dir: PathBuf,
    pub derived_dir: PathBuf,
    pub image_dir: PathBuf,
    pub format: ImageFormat,
}

impl PipelineConfig {
    fn preset(application: Application, product: Product, layout: TableLayout, input_file: &str) -> Self {
        Self {
            application,
            product,
            layout,
            input_file: input_file.to_string(),
            legacy_file: None,
            data_sources_file: None,
            restriction: Restriction::Observable,
            topicality: TopicalityReference::End,
            count_symbol: style::Q_HVORG_MOVIE,
            observation_symbol: style::T_END,
            source_dir: expand_home(DEFAULT_SOURCE_DIR),
            derived_dir: expand_home(DEFAULT_DERIVED_DIR),
            image_dir: expand_home(DEFAULT_IMAGE_DIR),
            format: ImageFormat::default(),
        }
    }

    pub fn hvorg_movies() -> Self {
        Self {
            legacy_file: Some("movies_legacy.csv".to_string()),
            data_sources_file: Some(DATA_SOURCES_FILE.to_string()),
            ..Self::preset(Application::Helioviewer, Product::Movie, TableLayout::Window, "movies.csv")
        }
    }

    pub fn hvorg_screenshots() -> Self {
        Self {
            legacy_file: Some("screenshots_legacy.csv".to_string()),
            data_sources_file: Some(DATA_SOURCES_FILE.to_string()),
            observation_symbol: style::T_SCREENSHOT,
            ..Self::preset(Application::Helioviewer, Product::Screenshot, TableLayout::Point, "screenshots.csv")
        }
    }

    pub fn hvorg_embeds() -> Self {
        Self {
            count_symbol: style::Q_HVORG_EMBED,
            ..Self::preset(Application::Helioviewer, Product::Embed, TableLayout::TimestampOnly, "embed.csv")
        }
    }

    /// JHelioviewer movies from the request statistics log (timestamps only).
    pub fn jhv_movies() -> Self {
        Self {
            count_symbol: style::Q_JHV_MOVIE,
            ..Self::preset(
                Application::JHelioviewer,
                Product::Movie,
                TableLayout::TimestampOnly,
                "jhv_request_statistics.csv",
            )
        }
    }

    /// Presets run by "prepare all" / "analyze all".
    pub fn all() -> Vec<Self> {
        vec![
            Self::hvorg_movies(),
            Self::hvorg_screenshots(),
            Self::hvorg_embeds(),
            Self::jhv_movies(),
        ]
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_topicality(mut self, reference: TopicalityReference) -> Self {
        self.topicality = reference;
        self.observation_symbol = match reference {
            TopicalityReference::Start => style::T_START,
            TopicalityReference::End => style::T_END,
        };
        self
    }

    pub fn with_dirs(mut self, source: impl AsRef<Path>, derived: impl AsRef<Path>, image: impl AsRef<Path>) -> Self {
        self.source_dir = source.as_ref().to_path_buf();
        self.derived_dir = derived.as_ref().to_path_buf();
        self.image_dir = image.as_ref().to_path_buf();
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Artifact prefix, e.g. `hvorg_movie`.
    pub fn service(&self) -> String {
        format!("{}_{}", self.application.short_name(), self.product.name())
    }

    /// e.g. `helioviewer.org movies`.
    pub fn data_analyzed(&self) -> String {
        format!("{} {}", self.application.name(), self.product.plural())
    }

    /// e.g. `helioviewer.org movies (observable)`; restriction only shown where it applies.
    pub fn data_type(&self) -> String {
        match self.layout {
            TableLayout::Window => format!("{} ({})", self.data_analyzed(), self.restriction),
            TableLayout::Point | TableLayout::TimestampOnly => self.data_analyzed(),
        }
    }

    pub fn input_path(&self) -> PathBuf {
        self.source_dir.join(&self.input_file)
    }

    pub fn legacy_path(&self) -> Option<PathBuf> {
        self.legacy_file.as_ref().map(|f| self.source_dir.join(f))
    }

    pub fn data_sources_path(&self) -> Option<PathBuf> {
        self.data_sources_file.as_ref().map(|f| self.source_dir.join(f))
    }

    pub fn image_subdir(&self) -> PathBuf {
        self.image_dir.join(self.application.name())
    }

    /// `<image_dir>/<application>/<sanitized title>.<ext>`.
    pub fn image_path(&self, title: &str) -> PathBuf {
        image_path(&self.image_subdir(), title, self.format)
    }
}

pub fn image_path(dir: &Path, title: &str, format: ImageFormat) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_file_stem(title), format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_expansion() {
        let Some(home) = std::env::var_os("HOME").map(PathBuf::from) else {
            return;
        };
        assert_eq!(expand_home("~/Data/x"), home.join("Data/x"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("/tmp/~x"), PathBuf::from("/tmp/~x"));
        assert_eq!(expand_home("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn presets_name_their_artifacts() {
        let names: Vec<String> = PipelineConfig::all().iter().map(PipelineConfig::service).collect();
        assert_eq!(names, vec!["hvorg_movie", "hvorg_screenshot", "hvorg_embed", "jhv_movie"]);
    }

    #[test]
    fn overrides_and_paths() {
        let cfg = PipelineConfig::hvorg_movies()
            .with_dirs("/src", "/derived", "/img")
            .with_format(ImageFormat::Svg)
            .with_restriction(Restriction::PositiveRequestedDuration)
            .with_topicality(TopicalityReference::Start);

        assert_eq!(cfg.input_path(), PathBuf::from("/src/movies.csv"));
        assert_eq!(cfg.legacy_path(), Some(PathBuf::from("/src/movies_legacy.csv")));
        assert_eq!(cfg.observation_symbol, style::T_START);
        assert_eq!(cfg.data_type(), "helioviewer.org movies (positive requested duration)");

        let p = cfg.image_path("a title");
        assert_eq!(p.parent(), Some(Path::new("/img/helioviewer.org")));
        assert_eq!(p.extension().and_then(|e| e.to_str()), Some("svg"));
        assert_eq!(PipelineConfig::hvorg_embeds().data_type(), "helioviewer.org embeds");
    }

    #[test]
    fn down_time_date() {
        assert_eq!(down_time().to_string(), "2015-07-01");
    }
}
