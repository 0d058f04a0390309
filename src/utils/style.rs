//! Chart styling constants, calendar events and label formatting.
//!
//! The event and reference-line tables are built once into an `AnnotationConfig`
//! and handed to whatever draws charts. Nothing here is mutable after construction.

use chrono::{DateTime, Utc};
use log::warn;
use plotters::style::RGBColor;

use crate::prepare::derive::TimeUnit;
use crate::prepare::timestamps::parse_instant;

pub const RED: RGBColor = RGBColor(214, 39, 40);
pub const BLACK: RGBColor = RGBColor(0, 0, 0);
pub const ORANGE: RGBColor = RGBColor(255, 127, 14);
pub const BLUE: RGBColor = RGBColor(31, 119, 180);
pub const GREEN: RGBColor = RGBColor(44, 160, 44);
pub const MAGENTA: RGBColor = RGBColor(191, 0, 191);
pub const GREY: RGBColor = RGBColor(127, 127, 127);
pub const PURPLE: RGBColor = RGBColor(148, 103, 189);

/// Series colours in draw order.
pub const PALETTE: [RGBColor; 4] = [BLUE, ORANGE, GREEN, PURPLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Dash and gap lengths as fractions of the line's extent; `None` for solid.
    pub fn pattern(&self) -> Option<(f64, f64)> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some((0.03, 0.015)),
            LineStyle::Dotted => Some((0.006, 0.012)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventStyle {
    pub color: RGBColor,
    pub line: LineStyle,
    /// Fill opacity for interval spans.
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Project,
    SolarPhysics,
}

impl EventCategory {
    pub fn name(&self) -> &'static str {
        match self {
            EventCategory::Project => "project",
            EventCategory::SolarPhysics => "solar physics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSpan {
    Instant(DateTime<Utc>),
    Interval(DateTime<Utc>, DateTime<Utc>),
}

impl EventSpan {
    pub fn start(&self) -> DateTime<Utc> {
        match *self {
            EventSpan::Instant(t) => t,
            EventSpan::Interval(s, _) => s,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match *self {
            EventSpan::Instant(t) => t,
            EventSpan::Interval(_, e) => e,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEvent {
    pub key: &'static str,
    pub label: &'static str,
    pub category: EventCategory,
    pub span: EventSpan,
    pub style: EventStyle,
}

const PROJECT_SPAN: EventStyle = EventStyle { color: GREY, line: LineStyle::Solid, alpha: 0.3 };
const PROJECT_MARK: EventStyle = EventStyle { color: RED, line: LineStyle::Dotted, alpha: 1.0 };
const MISSION_MARK: EventStyle = EventStyle { color: BLUE, line: LineStyle::Dashed, alpha: 1.0 };
const SOLAR_MARK: EventStyle = EventStyle { color: BLACK, line: LineStyle::Dashed, alpha: 1.0 };
const TRANSIT_MARK: EventStyle = EventStyle { color: MAGENTA, line: LineStyle::Dotted, alpha: 1.0 };

// key, label, category, start, end (None for a single instant), style
type EventLiteral = (&'static str, &'static str, EventCategory, &'static str, Option<&'static str>, EventStyle);

const HELIOVIEWER_EVENTS: &[EventLiteral] = &[
    ("sdo_launch", "SDO launch", EventCategory::Project, "2010-02-11", None, MISSION_MARK),
    ("sdo_first_light", "SDO first light", EventCategory::SolarPhysics, "2010-04-21", None, MISSION_MARK),
    ("x2_flare_2011feb", "X2.2 flare", EventCategory::SolarPhysics, "2011-02-15", None, SOLAR_MARK),
    ("june7_event", "7 June 2011 eruption", EventCategory::SolarPhysics, "2011-06-07", None, SOLAR_MARK),
    ("x69_flare_2011aug", "X6.9 flare", EventCategory::SolarPhysics, "2011-08-09", None, SOLAR_MARK),
    ("repair", "server repair", EventCategory::Project, "2011-10-25", Some("2011-11-08"), PROJECT_SPAN),
    ("x54_flare_2012mar", "X5.4 flare", EventCategory::SolarPhysics, "2012-03-07", None, SOLAR_MARK),
    ("transit_of_venus", "transit of Venus", EventCategory::SolarPhysics, "2012-06-05", None, TRANSIT_MARK),
    ("shutdown2013", "US government shutdown", EventCategory::Project, "2013-10-01", Some("2013-10-17"), PROJECT_SPAN),
    ("comet_ison", "comet ISON", EventCategory::SolarPhysics, "2013-11-28", None, SOLAR_MARK),
    ("bigbreak", "service outage", EventCategory::Project, "2015-06-05", Some("2015-09-09"), PROJECT_SPAN),
    ("hvorg3", "helioviewer.org 3.0", EventCategory::Project, "2015-09-09", None, PROJECT_MARK),
    ("mercury_transit2016", "transit of Mercury", EventCategory::SolarPhysics, "2016-05-09", None, TRANSIT_MARK),
    ("newjhv", "new JHelioviewer", EventCategory::Project, "2017-05-01", None, PROJECT_MARK),
    ("eclipse2017", "total eclipse", EventCategory::SolarPhysics, "2017-08-21", None, TRANSIT_MARK),
    ("flare_flurry2017", "September 2017 flares", EventCategory::SolarPhysics, "2017-09-06", None, SOLAR_MARK),
    ("mercury_transit2019", "transit of Mercury", EventCategory::SolarPhysics, "2019-11-11", None, TRANSIT_MARK),
    ("eclipse2024", "total eclipse", EventCategory::SolarPhysics, "2024-04-08", None, TRANSIT_MARK),
    ("gannon_storm2024", "May 2024 storm", EventCategory::SolarPhysics, "2024-05-10", None, SOLAR_MARK),
];

/// Immutable calendar of events, sorted by start instant then key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    events: Vec<AnnotationEvent>,
}

impl EventTable {
    pub fn new(mut events: Vec<AnnotationEvent>) -> Self {
        events.sort_by(|a, b| a.span.start().cmp(&b.span.start()).then_with(|| a.key.cmp(b.key)));
        Self { events }
    }

    /// Curated project and solar-physics events.
    pub fn helioviewer() -> Self {
        let events = HELIOVIEWER_EVENTS
            .iter()
            .filter_map(|&(key, label, category, start, end, style)| {
                let span = match (parse_instant(start), end.map(parse_instant)) {
                    (Some(s), None) => EventSpan::Instant(s),
                    (Some(s), Some(Some(e))) => EventSpan::Interval(s, e),
                    _ => {
                        warn!("event `{}` has an unparseable date, skipped", key);
                        return None;
                    }
                };
                Some(AnnotationEvent { key, label, category, span, style })
            })
            .collect();
        Self::new(events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationEvent> {
        self.events.iter()
    }

    /// Events whose instant, or whole interval, lies in `[from, to]`.
    pub fn within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&AnnotationEvent> {
        self.events
            .iter()
            .filter(|e| from <= e.span.start() && e.span.end() <= to)
            .collect()
    }

    /// Named events in chronological order; unknown keys are skipped.
    pub fn select(&self, keys: &[&str]) -> Vec<&AnnotationEvent> {
        self.events.iter().filter(|e| keys.contains(&e.key)).collect()
    }

    /// `select` restricted to `[from, to]`.
    pub fn select_within(&self, keys: &[&str], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&AnnotationEvent> {
        self.within(from, to).into_iter().filter(|e| keys.contains(&e.key)).collect()
    }
}

/// A characteristic timescale marked on duration and topicality charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceLine {
    pub seconds: f64,
    pub label: &'static str,
    pub color: RGBColor,
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLines {
    lines: Vec<ReferenceLine>,
}

impl ReferenceLines {
    pub fn new(mut lines: Vec<ReferenceLine>) -> Self {
        lines.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
        Self { lines }
    }

    pub fn standard() -> Self {
        const HOUR: f64 = 3_600.0;
        const DAY: f64 = 86_400.0;
        Self::new(vec![
            ReferenceLine { seconds: HOUR, label: "1 h", color: RED, line: LineStyle::Dotted },
            ReferenceLine { seconds: 3.0 * HOUR, label: "3 h", color: BLACK, line: LineStyle::Dotted },
            ReferenceLine { seconds: 6.0 * HOUR, label: "6 h", color: ORANGE, line: LineStyle::Dotted },
            ReferenceLine { seconds: DAY, label: "1 d", color: RED, line: LineStyle::Dashed },
            ReferenceLine { seconds: 7.0 * DAY, label: "7 d", color: BLACK, line: LineStyle::Dashed },
            ReferenceLine { seconds: 28.0 * DAY, label: "28 d", color: ORANGE, line: LineStyle::Dashed },
            ReferenceLine { seconds: 365.0 * DAY, label: "365 d", color: ORANGE, line: LineStyle::Solid },
        ])
    }

    pub fn all(&self) -> &[ReferenceLine] {
        &self.lines
    }

    /// Lines with `lo <= seconds <= hi`, ascending.
    pub fn relevant(&self, lo_seconds: f64, hi_seconds: f64) -> Vec<&ReferenceLine> {
        self.lines
            .iter()
            .filter(|l| lo_seconds <= l.seconds && l.seconds <= hi_seconds)
            .collect()
    }
}

/// Everything the chart layer overlays, built once per process.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationConfig {
    pub events: EventTable,
    pub reference_lines: ReferenceLines,
}

impl AnnotationConfig {
    pub fn helioviewer() -> Self {
        Self {
            events: EventTable::helioviewer(),
            reference_lines: ReferenceLines::standard(),
        }
    }
}

pub const T_REQUEST: &str = "T_request";
pub const T_START: &str = "T_start";
pub const T_END: &str = "T_end";
pub const T_SCREENSHOT: &str = "T_sdate";

/// (symbol, words)
pub const DURATION: (&str, &str) = ("t_duration", "duration");
pub const TOPICALITY: (&str, &str) = ("t_topicality", "topicality");

pub const Q_HVORG_MOVIE: &str = "n_hvm";
pub const Q_HVORG_EMBED: &str = "n_hve";
pub const Q_JHV_MOVIE: &str = "n_jhvm";

/// `"topicality t_topicality (d)"`
pub fn quantity_label(words: &str, symbol: &str, unit: TimeUnit) -> String {
    format!("{} {} ({})", words, symbol, unit.name())
}

/// `"number of movies [1234 total]"`
pub fn count_label(n: usize, data_type: &str) -> String {
    format!("number of {} [{} total]", data_type, n)
}

/// `"[812 days]"`
pub fn total_label(n: usize, suffix: &str) -> String {
    format!("[{} {}]", n, suffix)
}

/// `"t_duration = T_end - T_start"`
pub fn difference_subtitle(symbol: &str, later: &str, earlier: &str) -> String {
    format!("{} = {} - {}", symbol, later, earlier)
}

/// Replaces every run of non-word characters with `_`.
pub fn sanitize_file_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).unwrap()
    }

    #[test]
    fn literal_table_parses_completely() {
        let table = EventTable::helioviewer();
        assert_eq!(table.len(), HELIOVIEWER_EVENTS.len());
        let starts: Vec<_> = table.iter().map(|e| e.span.start()).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn within_requires_whole_interval() {
        let table = EventTable::helioviewer();
        let keys: Vec<_> = table
            .within(at("2013-10-05"), at("2013-12-31"))
            .iter()
            .map(|e| e.key)
            .collect();
        // shutdown2013 starts before the range
        assert_eq!(keys, vec!["comet_ison"]);

        let keys: Vec<_> = table
            .within(at("2013-10-01"), at("2013-12-31"))
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["shutdown2013", "comet_ison"]);
    }

    #[test]
    fn within_bounds_are_inclusive() {
        let table = EventTable::helioviewer();
        let hits = table.within(at("2011-06-07"), at("2011-06-07"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "june7_event");
    }

    #[test]
    fn select_is_chronological_and_skips_unknown() {
        let table = EventTable::helioviewer();
        let keys: Vec<_> = table
            .select(&["flare_flurry2017", "nope", "comet_ison", "june7_event"])
            .iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["june7_event", "comet_ison", "flare_flurry2017"]);
    }

    #[test]
    fn relevant_reference_lines() {
        let lines = ReferenceLines::standard();
        let labels: Vec<_> = lines.relevant(0.0, 30.0 * 86_400.0).iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["1 h", "3 h", "6 h", "1 d", "7 d", "28 d"]);
        assert!(lines.relevant(0.0, 1.0).is_empty());
    }

    #[test]
    fn file_stems_lose_punctuation_runs() {
        assert_eq!(
            sanitize_file_stem("helioviewer.org movies (observable)/topicality_30 d"),
            "helioviewer_org_movies_observable_topicality_30_d"
        );
        assert_eq!(sanitize_file_stem("a  b"), "a_b");
    }

    #[test]
    fn labels() {
        assert_eq!(quantity_label(TOPICALITY.1, TOPICALITY.0, TimeUnit::Day), "topicality t_topicality (d)");
        assert_eq!(count_label(12, "movies"), "number of movies [12 total]");
        assert_eq!(total_label(3, "days"), "[3 days]");
        assert_eq!(difference_subtitle(DURATION.0, T_END, T_START), "t_duration = T_end - T_start");
    }
}
