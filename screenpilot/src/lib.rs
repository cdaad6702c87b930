//! Visual state navigation for pixel-driven UI automation
//!
//! This crate drives a non-introspectable application (typically a game
//! client) through its UI using only screen pixels as ground truth. It keeps
//! a belief about which screen the application is currently showing, plans a
//! route through a static screen graph, and advances one screen at a time,
//! re-recognizing after every click and recovering when the application
//! diverges from the planned route.
//!
//! Screenshot capture, OCR, template matching and the pointer are external
//! collaborators plugged in behind the traits in [`perception`].

pub mod cache;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod graph;
pub mod navigator;
pub mod perception;
pub mod recognizer;
#[cfg(test)]
mod tests;

pub use cache::AnchorCache;
pub use config::SessionConfig;
pub use errors::NavigationError;
pub use geometry::{Rect, TextObservation};
pub use graph::{MatchMode, ScreenDefinition, ScreenEdge, ScreenGraph};
pub use navigator::Navigator;
pub use perception::{
    OcrEngine, OcrScan, Perception, PointerDriver, RawSpan, ScreenCapture, TemplateMatcher,
};
pub use recognizer::StateRecognizer;
