//! Determines which screen the application is currently showing.
//!
//! Cold path: full-frame OCR scan tested against every screen's anchor.
//! Warm path: once a screen's anchor rectangle is cached, confirmation only
//! OCRs a small crop around it.

use std::sync::Arc;
use std::thread;

use image::imageops;
use image::RgbImage;
use tracing::{debug, instrument, warn};

use crate::cache::AnchorCache;
use crate::config::SessionConfig;
use crate::errors::NavigationError;
use crate::geometry::Rect;
use crate::graph::{ScreenDefinition, ScreenGraph};
use crate::perception::{OcrScan, Perception, ScreenCapture};

/// Matches screenshots against the screen graph's anchors and maintains the
/// anchor cache as a side effect of every fresh full-frame recognition.
pub struct StateRecognizer {
    graph: Arc<ScreenGraph>,
    perception: Perception,
    capture: Arc<dyn ScreenCapture>,
    cache: AnchorCache,
    config: Arc<SessionConfig>,
}

impl StateRecognizer {
    pub fn new(
        graph: Arc<ScreenGraph>,
        perception: Perception,
        capture: Arc<dyn ScreenCapture>,
        cache: AnchorCache,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            graph,
            perception,
            capture,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &AnchorCache {
        &self.cache
    }

    /// Determine the current screen from a full-frame scan.
    ///
    /// Screens are tested in definition order and the first whose anchor
    /// matches any observation wins; anchors are authored to be mutually
    /// exclusive. On a match, the anchor rectangle and every edge trigger
    /// visible in the same frame are recorded and the screen's cache document
    /// persisted. `Ok(None)` means no screen matched.
    #[instrument(level = "debug", skip(self))]
    pub fn recognize_current_screen(&mut self) -> Result<Option<String>, NavigationError> {
        let scan = self.scan_full_frame()?;
        if scan.is_blank_frame() {
            warn!("ocr still blank after retries, treating as unknown screen");
            return Ok(None);
        }

        let graph = Arc::clone(&self.graph);
        for screen in graph.all_screens() {
            let Some(anchor) = scan
                .observations
                .iter()
                .find(|o| screen.anchor_matches(&o.text))
            else {
                continue;
            };
            debug!(screen = %screen.name, bounds = %anchor.bounds, "recognized current screen");
            self.record_positions(screen, anchor.bounds, &scan)?;
            return Ok(Some(screen.name.clone()));
        }

        debug!("no screen anchor matched the current frame");
        Ok(None)
    }

    /// Cheap check that the current screen is `name`.
    ///
    /// With no cached anchor rectangle this falls back to a full
    /// recognition. With one, only a crop around the cached rectangle
    /// (expanded by the configured margin) is OCRed: exactly one confident
    /// observation passing the screen's match mode confirms; zero is a plain
    /// miss; more than one is an ambiguous crop and counts as a miss for
    /// this attempt.
    pub fn confirm_screen(&mut self, name: &str) -> Result<bool, NavigationError> {
        let screen = self.graph.get(name)?.clone();

        let Some(anchor) = self.cache.anchor_rect(name) else {
            return Ok(self.recognize_current_screen()?.as_deref() == Some(name));
        };

        let crop_rect = anchor
            .expand(self.config.crop_margin)
            .clamp_to(self.config.viewport_width, self.config.viewport_height);
        let frame = self.capture.capture()?;
        let crop = crop_image(&frame, crop_rect);
        let scan = self.perception.scan(&crop)?;
        match scan.observations.as_slice() {
            [] => Ok(false),
            [only] => Ok(screen.anchor_matches(&only.text)),
            many => {
                warn!(
                    screen = %name,
                    observations = many.len(),
                    "ambiguous confirmation crop, widen the margin or raise the threshold"
                );
                Ok(false)
            }
        }
    }

    /// Find the rectangle of an exact text on the current frame, if visible.
    pub fn find_text(&self, text: &str) -> Result<Option<Rect>, NavigationError> {
        let frame = self.capture.capture()?;
        let scan = self.perception.scan(&frame)?;
        Ok(scan
            .observations
            .iter()
            .find(|o| o.text == text)
            .map(|o| o.bounds))
    }

    /// Find an image template on the current frame, if visible.
    pub fn locate_template(&self, template: &RgbImage) -> Result<Option<Rect>, NavigationError> {
        let frame = self.capture.capture()?;
        self.perception.match_template(&frame, template, None)
    }

    /// Resolve the rectangle to click for one edge trigger: the cached one
    /// when available, otherwise a fresh full-frame lookup that is recorded
    /// for next time.
    pub fn resolve_trigger(
        &mut self,
        screen: &str,
        trigger_text: &str,
    ) -> Result<Option<Rect>, NavigationError> {
        if let Some(rect) = self.cache.trigger_rect(screen, trigger_text) {
            return Ok(Some(rect));
        }
        let Some(rect) = self.find_text(trigger_text)? else {
            return Ok(None);
        };
        if self.cache.record_trigger(screen, trigger_text, rect) {
            self.cache.persist(screen)?;
        }
        Ok(Some(rect))
    }

    /// Capture and scan the full viewport, re-capturing when the OCR engine
    /// returns zero raw spans. Such frames are grabbed mid-transition; they
    /// are retried, not reported as "no screen matched".
    fn scan_full_frame(&self) -> Result<OcrScan, NavigationError> {
        let mut attempt = 0;
        loop {
            let frame = self.capture.capture()?;
            let scan = self.perception.scan(&frame)?;
            if !scan.is_blank_frame() || attempt >= self.config.blank_frame_retries {
                return Ok(scan);
            }
            attempt += 1;
            debug!(attempt, "blank ocr frame, retrying capture");
            thread::sleep(self.config.blank_frame_delay);
        }
    }

    fn record_positions(
        &mut self,
        screen: &ScreenDefinition,
        anchor: Rect,
        scan: &OcrScan,
    ) -> Result<(), NavigationError> {
        if !self.cache.is_position_known(screen) {
            debug!(screen = %screen.name, "first full observation of this screen");
        }
        let mut changed = self.cache.record_anchor(&screen.name, anchor);
        for edge in &screen.edges {
            // Best effort: triggers not visible in this frame stay
            // unrecorded until a later pass.
            let Some(obs) = scan
                .observations
                .iter()
                .find(|o| o.text == edge.trigger_text)
            else {
                continue;
            };
            changed |= self
                .cache
                .record_trigger(&screen.name, &edge.trigger_text, obs.bounds);
        }
        if changed {
            self.cache.persist(&screen.name)?;
        }
        Ok(())
    }
}

fn crop_image(frame: &RgbImage, rect: Rect) -> RgbImage {
    let width = rect.width().max(1) as u32;
    let height = rect.height().max(1) as u32;
    imageops::crop_imm(frame, rect.x1 as u32, rect.y1 as u32, width, height).to_image()
}
