//! Preparation through analysis on small request logs written to a temp dir.

use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;

use hv_analysis::aggregate::bucket::{BucketWidth, bucket_counts, counts};
use hv_analysis::aggregate::restriction::Restriction;
use hv_analysis::analysis::requests::analyze_requests;
use hv_analysis::analysis::service_comparison::{analyze_comparison, comparison_configs, display_name};
use hv_analysis::analysis::sources::analyze_sources;
use hv_analysis::charts::dashboard::write_usage_dashboard;
use hv_analysis::config::PipelineConfig;
use hv_analysis::error::AnalysisError;
use hv_analysis::prepare::job::{Prepared, load_prepared, run_preparation};
use hv_analysis::utils::artifacts::{ArtifactStore, REQUEST_TIME};
use hv_analysis::utils::style::AnnotationConfig;

const MOVIES: &str = "\
id,timestamp,StartDate,EndDate,DataSourceID
1,2015-06-28 10:00:00,2015-06-27 00:00:00,2015-06-28 00:00:00,\"10,11\"
2,2015-06-29 10:00:00,2015-06-29 00:00:00,2015-06-29 06:00:00,10
3,2015-07-02 09:00:00,2015-06-01 00:00:00,2015-06-30 00:00:00,11
4,garbage,2015-06-01 00:00:00,2015-06-30 00:00:00,11
5,2015-06-29 03:00:00,2015-06-29 00:00:00,2015-06-29 06:00:00,10
";

const MOVIES_LEGACY: &str = "\
id,timestamp,StartDate,EndDate,DataSourceID
1,2015-06-30 10:00:00,2015-06-29 00:00:00,2015-06-30 00:00:00,10
";

const DATA_SOURCES: &str = r#"{
  "SDO": {
    "AIA": {
      "171": {"sourceId": 10, "nickname": "AIA 171"},
      "193": {"sourceId": 11, "nickname": "AIA 193"}
    }
  }
}"#;

const EMBEDS: &str = "\
id,timestamp
1,2015-06-28 09:00:00
2,2015-06-29 12:00:00
3,2015-06-30 12:00:00
4,2015-07-01 12:00:00
5,2015-07-02 18:00:00
";

const JHV: &str = "\
timestamp
2015-06-28 08:00:00
2015-06-29 12:00:00
2015-06-30 12:00:00
2015-06-30 13:00:00
2015-07-02 19:00:00
";

struct Workspace {
    _dir: TempDir,
    base: PipelineConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source");
        fs::create_dir_all(&source).unwrap();
        for (name, body) in [
            ("movies.csv", MOVIES),
            ("movies_legacy.csv", MOVIES_LEGACY),
            ("getDataSources.json", DATA_SOURCES),
            ("embed.csv", EMBEDS),
            ("jhv_request_statistics.csv", JHV),
        ] {
            fs::write(source.join(name), body).unwrap();
        }
        let base = PipelineConfig::hvorg_movies().with_dirs(
            &source,
            dir.path().join("derived"),
            dir.path().join("img"),
        );
        Workspace { _dir: dir, base }
    }

    fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.base.derived_dir)
    }

    fn configs(&self) -> [PipelineConfig; 3] {
        comparison_configs(&self.base)
    }

    fn prepare_all(&self) {
        for config in self.configs() {
            run_preparation(&config, &self.store()).expect("preparation");
        }
    }
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, m, d).unwrap()
}

#[test]
fn movies_prepare_with_legacy_and_reload() {
    let ws = Workspace::new();
    let movies = &ws.configs()[0];

    let prepared = run_preparation(movies, &ws.store()).unwrap();
    let Prepared::Window(derived) = &prepared else {
        panic!("movies have observation windows");
    };
    // five current rows (one unparseable) plus one legacy row
    assert_eq!(derived.len(), 5);
    assert_eq!(derived.dropped, 1);
    assert_eq!(derived.durations[1], 6.0 * 3_600.0);
    assert_eq!(derived.topicality_end[1], 4.0 * 3_600.0);

    let reloaded = load_prepared(movies, &ws.store()).unwrap();
    let Prepared::Window(back) = &reloaded else {
        panic!("reloaded layout changed");
    };
    assert_eq!(back.request_times, derived.request_times);
    assert_eq!(back.durations, derived.durations);
    assert_eq!(back.topicality_start, derived.topicality_start);
    assert_eq!(back.midpoints, derived.midpoints);
}

#[test]
fn restrictions_and_buckets_on_prepared_movies() {
    let ws = Workspace::new();
    let movies = &ws.configs()[0];
    run_preparation(movies, &ws.store()).unwrap();
    let Prepared::Window(derived) = load_prepared(movies, &ws.store()).unwrap() else {
        panic!("movies have observation windows");
    };

    // record 5 was requested while its window was still open
    let observable = Restriction::Observable.apply(&derived, movies.topicality);
    let positive = Restriction::PositiveRequestedDuration.apply(&derived, movies.topicality);
    assert_eq!(observable.len(), 4);
    assert_eq!(positive.len(), 5);
    assert!(observable.topicality.iter().all(|&t| t >= 0.0));
    assert!(positive.topicality.contains(&(-3.0 * 3_600.0)));

    let daily = bucket_counts(&derived.request_times, BucketWidth::Day);
    assert_eq!(daily.first().map(|b| b.date()), Some(day(6, 28)));
    assert_eq!(counts(&daily), vec![1, 2, 1, 0, 1]);

    let quarters = bucket_counts(&derived.request_times, BucketWidth::Quarter);
    assert_eq!(counts(&quarters), vec![4, 1]);
    assert_eq!(quarters[1].date(), day(7, 1));
}

#[test]
fn analysis_plans_every_chart() {
    let ws = Workspace::new();
    let movies = &ws.configs()[0];
    run_preparation(movies, &ws.store()).unwrap();
    let prepared = load_prepared(movies, &ws.store()).unwrap();

    let analysis = analyze_requests(movies, &prepared, &AnnotationConfig::helioviewer());
    assert_eq!(analysis.restricted, Some(4));
    let names = analysis.names();
    assert!(names.contains(&"topicality"));
    assert!(names.contains(&"duration_2 d"));
    assert!(names.contains(&"histogram_number_per_day"));
    assert_eq!(analysis.daily.map(|d| d.total), Some(5));
}

#[test]
fn source_usage_is_ranked() {
    let ws = Workspace::new();
    let movies = &ws.configs()[0];
    run_preparation(movies, &ws.store()).unwrap();

    let store = ws.store();
    let service = movies.service();
    let nicknames = store.load_nicknames(&service).unwrap();
    assert_eq!(nicknames, vec![(10, "AIA 171".to_string()), (11, "AIA 193".to_string())]);

    let usage = store.load_source_usage(&service, &nicknames).unwrap();
    // every row of the merged log, including the one with a bad timestamp
    assert_eq!(usage.rows.len(), 6);
    let chart = analyze_sources(movies, &usage).unwrap();
    assert_eq!(
        chart.bars,
        vec![("AIA 171".to_string(), 4), ("AIA 193".to_string(), 3)]
    );
}

#[test]
fn services_compared_over_their_common_days() {
    let ws = Workspace::new();
    ws.prepare_all();

    let services: Vec<_> = ws
        .configs()
        .iter()
        .map(|c| (display_name(c), ws.store().load_instants(&c.service(), REQUEST_TIME).unwrap()))
        .collect();
    let comparison = analyze_comparison(&services, day(7, 1), &AnnotationConfig::helioviewer()).unwrap();

    assert_eq!(comparison.usage.first_day(), Some(day(6, 28)));
    assert_eq!(comparison.usage.last_day(), Some(day(7, 2)));
    assert_eq!((comparison.days_before, comparison.days_after), (3, 2));
    assert_eq!(comparison.usage.column("helioviewer.org movie"), Some(&[1, 2, 1, 0, 1][..]));
    assert_eq!(comparison.usage.column("JHelioviewer movie"), Some(&[0, 1, 2, 0, 0][..]));
    // first and last embed requests fall outside the common range
    assert_eq!(comparison.usage.column("helioviewer.org embed"), Some(&[0, 1, 1, 1, 0][..]));

    let page = ws.base.image_dir.join("service_comparison").join("daily_usage.html");
    write_usage_dashboard(&comparison.usage, "daily service usage", &page).unwrap();
    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("helioviewer.org embed"));
}

#[test]
fn missing_log_is_reported() {
    let ws = Workspace::new();
    let screenshots = PipelineConfig::hvorg_screenshots().with_dirs(
        &ws.base.source_dir,
        &ws.base.derived_dir,
        &ws.base.image_dir,
    );
    let err = run_preparation(&screenshots, &ws.store()).unwrap_err();
    assert!(matches!(err, AnalysisError::Io { ref path, .. } if path.ends_with("screenshots.csv")));
    assert!(!ws.store().exists("hvorg_screenshot", REQUEST_TIME));
}
