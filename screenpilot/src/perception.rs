//! Collaborator traits and the perception adapter.
//!
//! The raw sensors (screenshot capture, OCR, template matching) and the
//! pointer are external collaborators; this module defines the seams they
//! plug into and wraps OCR/template output into the confidence-filtered
//! primitives the recognizer and navigator consume.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::config::SessionConfig;
use crate::errors::NavigationError;
use crate::geometry::{Rect, TextObservation};

/// One raw OCR result before confidence filtering: the engine's
/// quadrilateral, the recognized text and a confidence in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct RawSpan {
    pub quad: [(i32, i32); 4],
    pub text: String,
    pub confidence: f32,
}

/// Captures an RGB image of the application's client area.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self) -> Result<RgbImage, NavigationError>;
}

/// External OCR engine.
pub trait OcrEngine: Send + Sync {
    /// Detect all text spans in the image. An empty result is a valid
    /// outcome, not an error.
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawSpan>, NavigationError>;
}

/// External template matcher with normalized-correlation semantics.
pub trait TemplateMatcher: Send + Sync {
    /// Find the best match of `needle` inside `haystack` (restricted to
    /// `region` when given). Returns the match rectangle in haystack
    /// coordinates and its confidence, or `None` when nothing matched at all.
    /// The needle is already scaled to the current resolution by the caller.
    fn locate(
        &self,
        haystack: &RgbImage,
        needle: &RgbImage,
        region: Option<Rect>,
    ) -> Result<Option<(Rect, f32)>, NavigationError>;
}

/// Executes a click at absolute screen coordinates. Implementations are
/// expected to add human-like cursor movement and press/release delays.
pub trait PointerDriver: Send + Sync {
    fn click(&self, x: i32, y: i32) -> Result<(), NavigationError>;
}

/// Result of one OCR pass over an image.
///
/// `raw_span_count` is the number of spans the engine returned before
/// confidence filtering. Zero raw spans means the engine saw nothing at all
/// (almost always a frame captured mid-transition) and is a distinct signal
/// from "no span was confident enough".
#[derive(Debug, Clone, Default)]
pub struct OcrScan {
    pub observations: Vec<TextObservation>,
    pub raw_span_count: usize,
}

impl OcrScan {
    /// True when the OCR engine itself returned zero spans.
    pub fn is_blank_frame(&self) -> bool {
        self.raw_span_count == 0
    }
}

/// Wraps the OCR and template-matching collaborators into the two
/// confidence-filtered queries used by everything above.
#[derive(Clone)]
pub struct Perception {
    ocr: Arc<dyn OcrEngine>,
    matcher: Arc<dyn TemplateMatcher>,
    config: Arc<SessionConfig>,
}

impl Perception {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        matcher: Arc<dyn TemplateMatcher>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            ocr,
            matcher,
            config,
        }
    }

    /// Run OCR over `image` and keep only confident observations, reducing
    /// each quadrilateral to an axis-aligned rectangle.
    pub fn scan(&self, image: &RgbImage) -> Result<OcrScan, NavigationError> {
        let spans = self.ocr.detect(image)?;
        let raw_span_count = spans.len();
        let observations: Vec<TextObservation> = spans
            .into_iter()
            .filter(|s| s.confidence >= self.config.confidence_threshold)
            .map(|s| TextObservation {
                bounds: Rect::from_quad(s.quad),
                text: s.text,
                confidence: s.confidence,
            })
            .collect();
        debug!(
            raw = raw_span_count,
            confident = observations.len(),
            "ocr scan"
        );
        Ok(OcrScan {
            observations,
            raw_span_count,
        })
    }

    /// Match `template` inside `image` (restricted to `region` when given).
    ///
    /// The template is authored at the reference resolution and rescaled to
    /// the session's viewport width before matching. Returns `None` when the
    /// best match falls below the confidence threshold.
    pub fn match_template(
        &self,
        image: &RgbImage,
        template: &RgbImage,
        region: Option<Rect>,
    ) -> Result<Option<Rect>, NavigationError> {
        let needle = self.scale_template(template);
        let Some((rect, confidence)) = self.matcher.locate(image, &needle, region)? else {
            return Ok(None);
        };
        if confidence < self.config.confidence_threshold {
            debug!(%rect, confidence, "template match below threshold");
            return Ok(None);
        }
        Ok(Some(rect))
    }

    fn scale_template(&self, template: &RgbImage) -> RgbImage {
        let ratio = self.config.viewport_width as f64 / self.config.reference_width as f64;
        if (ratio - 1.0).abs() < f64::EPSILON {
            return template.clone();
        }
        let width = ((template.width() as f64 * ratio).round() as u32).max(1);
        let height = ((template.height() as f64 * ratio).round() as u32).max(1);
        imageops::resize(template, width, height, FilterType::Triangle)
    }
}
