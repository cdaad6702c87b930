//! Route planning and the screen-by-screen transition loop.
//!
//! Navigation is an explicit bounded state machine: plan a route, advance
//! one confirmed screen at a time, and on divergence fall back toward the
//! home screen a counted number of times before reporting failure.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbImage;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::errors::NavigationError;
use crate::geometry::Rect;
use crate::graph::ScreenGraph;
use crate::perception::PointerDriver;
use crate::recognizer::StateRecognizer;

/// Drives the application from the current screen to a target screen.
///
/// `home_templates` are image templates of the home affordance (the button
/// that returns to the root screen from almost anywhere), tried in order
/// during divergence recovery; the original UI renders it in two color
/// variants depending on the backdrop.
pub struct Navigator {
    graph: Arc<ScreenGraph>,
    recognizer: StateRecognizer,
    pointer: Arc<dyn PointerDriver>,
    home_templates: Vec<RgbImage>,
    config: Arc<SessionConfig>,
}

impl Navigator {
    pub fn new(
        graph: Arc<ScreenGraph>,
        recognizer: StateRecognizer,
        pointer: Arc<dyn PointerDriver>,
        home_templates: Vec<RgbImage>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            graph,
            recognizer,
            pointer,
            home_templates,
            config,
        }
    }

    pub fn recognizer(&mut self) -> &mut StateRecognizer {
        &mut self.recognizer
    }

    /// Bring the application to `target`.
    ///
    /// Plans the route, truncates it at the current screen when already
    /// partway along it, and otherwise recovers by returning toward the home
    /// screen before replanning. Recovery is attempted at most
    /// `recovery_attempts` times; exhausting the budget is a
    /// [`NavigationError::NavigationFailed`].
    #[instrument(level = "info", skip(self))]
    pub fn navigate_to(&mut self, target: &str) -> Result<(), NavigationError> {
        let route = self.graph.find_path(target)?;
        debug!(?route, "planned route");

        let mut recoveries = 0u32;
        loop {
            let current = self.recognizer.recognize_current_screen()?;
            let position = current
                .as_deref()
                .and_then(|c| route.iter().position(|s| s == c));

            let Some(position) = position else {
                if recoveries >= self.config.recovery_attempts {
                    return Err(NavigationError::NavigationFailed(format!(
                        "could not return to '{}' within {} attempts while navigating to '{target}'",
                        self.graph.home(),
                        recoveries
                    )));
                }
                recoveries += 1;
                info!(
                    current = current.as_deref().unwrap_or("<unknown>"),
                    attempt = recoveries,
                    "off route, returning toward home"
                );
                self.return_toward_home()?;
                continue;
            };

            // Skip the screens already behind us.
            let remaining = route[position..].to_vec();
            for pair in remaining.windows(2) {
                self.advance_one_step(&pair[0], &pair[1])?;
            }
            info!(target, "navigation complete");
            return Ok(());
        }
    }

    /// Perform the single transition from `from` to one of its neighbors.
    ///
    /// While still on `from`, clicks the edge's trigger and waits; succeeds
    /// as soon as `to` confirms. The game's animation pacing is the natural
    /// bound, but the loop is capped so a dead button surfaces as
    /// [`NavigationError::NavigationStuck`] instead of spinning forever.
    #[instrument(level = "debug", skip(self))]
    pub fn advance_one_step(&mut self, from: &str, to: &str) -> Result<(), NavigationError> {
        let edge = self
            .graph
            .get(from)?
            .edges
            .iter()
            .find(|e| e.target == to)
            .ok_or_else(|| {
                NavigationError::UnknownScreen(format!(
                    "route expects an edge from '{from}' to '{to}' that the graph does not define"
                ))
            })?
            .clone();

        for _ in 0..self.config.max_step_iterations {
            if self.recognizer.confirm_screen(from)? {
                match self.recognizer.resolve_trigger(from, &edge.trigger_text)? {
                    Some(rect) => self.click_rect(rect)?,
                    None => {
                        debug!(trigger = %edge.trigger_text, "trigger text not visible yet")
                    }
                }
                thread::sleep(self.config.click_delay);
            }
            if self.recognizer.confirm_screen(to)? {
                debug!(from, to, "transition confirmed");
                return Ok(());
            }
            thread::sleep(self.config.confirm_interval);
        }
        Err(NavigationError::NavigationStuck {
            goal: format!("{from} -> {to}"),
            iterations: self.config.max_step_iterations,
        })
    }

    /// Repeatedly confirm `name`, sleeping `interval` between attempts.
    /// Returns on the first success; `false` after the budget is spent
    /// (non-fatal, the caller decides what to do next).
    pub fn confirm_loop(
        &mut self,
        name: &str,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<bool, NavigationError> {
        for attempt in 0..max_attempts {
            if self.recognizer.confirm_screen(name)? {
                return Ok(true);
            }
            if attempt + 1 < max_attempts {
                thread::sleep(interval);
            }
        }
        Ok(false)
    }

    /// Repeat an idempotent-safe action until `name` confirms, e.g.
    /// dismissing a reward popup by clicking blank space. The occurrence of
    /// the target screen, not the number of clicks, defines success.
    pub fn confirm_and_repeat<F>(&mut self, name: &str, mut action: F) -> Result<(), NavigationError>
    where
        F: FnMut(&mut Navigator) -> Result<(), NavigationError>,
    {
        for _ in 0..self.config.max_step_iterations {
            action(self)?;
            thread::sleep(self.config.click_delay);
            if self.recognizer.confirm_screen(name)? {
                return Ok(());
            }
        }
        Err(NavigationError::NavigationStuck {
            goal: name.to_string(),
            iterations: self.config.max_step_iterations,
        })
    }

    /// Click a uniformly random point inside `rect` (viewport coordinates).
    /// The jitter avoids literal pixel-repeat clicks.
    pub fn click_rect(&self, rect: Rect) -> Result<(), NavigationError> {
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(rect.x1..=rect.x2);
        let y = rng.gen_range(rect.y1..=rect.y2);
        let (ox, oy) = self.config.window_origin;
        debug!(x, y, "click");
        self.pointer.click(x + ox, y + oy)
    }

    /// Find `text` on the current frame and click it. `Ok(false)` when the
    /// text is not visible.
    pub fn click_text(&mut self, text: &str) -> Result<bool, NavigationError> {
        match self.recognizer.find_text(text)? {
            Some(rect) => {
                self.click_rect(rect)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Find an image template on the current frame and click it. `Ok(false)`
    /// when it does not match.
    pub fn click_template(&mut self, template: &RgbImage) -> Result<bool, NavigationError> {
        match self.recognizer.locate_template(template)? {
            Some(rect) => {
                self.click_rect(rect)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Click somewhere in the lower-center band of the viewport, where no
    /// interactive control lives on any screen.
    pub fn click_blank(&self) -> Result<(), NavigationError> {
        let w = self.config.viewport_width as i32;
        let h = self.config.viewport_height as i32;
        self.click_rect(Rect::new(w / 4, h * 4 / 5, w * 3 / 4, h * 9 / 10))
    }

    /// Dismiss a "tap blank space to close" popup when its caption is
    /// visible. `Ok(false)` when no such popup is showing.
    pub fn dismiss_popup(&mut self, caption: &str) -> Result<bool, NavigationError> {
        if self.recognizer.find_text(caption)?.is_some() {
            self.click_blank()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// One recovery attempt: click the template-matched home affordance and
    /// wait for the home screen to confirm.
    fn return_toward_home(&mut self) -> Result<bool, NavigationError> {
        let home = self.graph.home().to_string();
        let mut clicked = false;
        for template in &self.home_templates {
            if let Some(rect) = self.recognizer.locate_template(template)? {
                self.click_rect(rect)?;
                clicked = true;
                break;
            }
        }
        if !clicked {
            warn!("home affordance not found on screen");
        }
        self.confirm_loop(&home, self.config.confirm_attempts, self.config.recovery_backoff)
    }
}
