use std::sync::{Arc, Mutex};

use image::RgbImage;

use super::world::{span_conf, test_config};
use crate::config::SessionConfig;
use crate::errors::NavigationError;
use crate::geometry::Rect;
use crate::perception::{OcrEngine, Perception, RawSpan, TemplateMatcher};

struct StaticOcr(Vec<RawSpan>);

impl OcrEngine for StaticOcr {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<RawSpan>, NavigationError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct StaticMatcher {
    result: Option<(Rect, f32)>,
    last_needle: Mutex<Option<(u32, u32)>>,
}

impl TemplateMatcher for StaticMatcher {
    fn locate(
        &self,
        _haystack: &RgbImage,
        needle: &RgbImage,
        _region: Option<Rect>,
    ) -> Result<Option<(Rect, f32)>, NavigationError> {
        *self.last_needle.lock().unwrap() = Some(needle.dimensions());
        Ok(self.result)
    }
}

fn perception_with(
    spans: Vec<RawSpan>,
    matcher: StaticMatcher,
    config: SessionConfig,
) -> (Perception, Arc<StaticMatcher>) {
    let matcher = Arc::new(matcher);
    let perception = Perception::new(
        Arc::new(StaticOcr(spans)),
        matcher.clone(),
        Arc::new(config),
    );
    (perception, matcher)
}

#[test]
fn scan_filters_by_confidence_but_keeps_the_raw_count() {
    super::init_tracing();
    let spans = vec![
        span_conf("Visible", Rect::new(0, 0, 10, 10), 0.95),
        span_conf("Faint", Rect::new(20, 20, 30, 30), 0.5),
    ];
    let (perception, _) = perception_with(spans, StaticMatcher::default(), test_config());

    let scan = perception.scan(&RgbImage::new(100, 100)).unwrap();
    assert_eq!(scan.raw_span_count, 2);
    assert!(!scan.is_blank_frame());
    assert_eq!(scan.observations.len(), 1);
    assert_eq!(scan.observations[0].text, "Visible");
}

#[test]
fn scan_reduces_quads_to_axis_aligned_rects() {
    let (perception, _) = perception_with(
        vec![span_conf("T", Rect::new(3, 4, 20, 12), 0.9)],
        StaticMatcher::default(),
        test_config(),
    );
    let scan = perception.scan(&RgbImage::new(100, 100)).unwrap();
    assert_eq!(scan.observations[0].bounds, Rect::new(3, 4, 20, 12));
}

#[test]
fn blank_engine_result_is_distinct_from_no_confident_spans() {
    let (blank, _) = perception_with(vec![], StaticMatcher::default(), test_config());
    let scan = blank.scan(&RgbImage::new(100, 100)).unwrap();
    assert!(scan.is_blank_frame());

    let (faint, _) = perception_with(
        vec![span_conf("x", Rect::new(0, 0, 5, 5), 0.1)],
        StaticMatcher::default(),
        test_config(),
    );
    let scan = faint.scan(&RgbImage::new(100, 100)).unwrap();
    assert!(!scan.is_blank_frame());
    assert!(scan.observations.is_empty());
}

#[test]
fn template_is_rescaled_to_the_session_resolution() {
    let mut config = test_config();
    config.viewport_width = 1920;
    config.reference_width = 3840;
    let matcher = StaticMatcher {
        result: Some((Rect::new(10, 10, 20, 20), 0.9)),
        ..StaticMatcher::default()
    };
    let (perception, matcher) = perception_with(vec![], matcher, config);

    let template = RgbImage::new(64, 32);
    let found = perception
        .match_template(&RgbImage::new(1920, 1080), &template, None)
        .unwrap();
    assert_eq!(found, Some(Rect::new(10, 10, 20, 20)));
    assert_eq!(*matcher.last_needle.lock().unwrap(), Some((32, 16)));
}

#[test]
fn template_is_passed_through_at_the_reference_resolution() {
    let matcher = StaticMatcher {
        result: Some((Rect::new(0, 0, 8, 8), 0.9)),
        ..StaticMatcher::default()
    };
    let (perception, matcher) = perception_with(vec![], matcher, test_config());

    perception
        .match_template(&RgbImage::new(100, 100), &RgbImage::new(8, 8), None)
        .unwrap();
    assert_eq!(*matcher.last_needle.lock().unwrap(), Some((8, 8)));
}

#[test]
fn weak_template_matches_are_suppressed() {
    let matcher = StaticMatcher {
        result: Some((Rect::new(0, 0, 8, 8), 0.4)),
        ..StaticMatcher::default()
    };
    let (perception, _) = perception_with(vec![], matcher, test_config());

    let found = perception
        .match_template(&RgbImage::new(100, 100), &RgbImage::new(8, 8), None)
        .unwrap();
    assert_eq!(found, None);
}
