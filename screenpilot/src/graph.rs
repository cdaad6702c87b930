//! The static screen graph: which screens exist, how each one is recognized,
//! and which click leads where.
//!
//! The graph is authored once (typically as a single JSON table), validated
//! at load time and read-only afterwards. Structural defects (duplicate
//! names, edges to undefined screens, no root) fail fast with
//! [`NavigationError::InvalidGraph`] rather than at first use.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::NavigationError;

/// How a screen's anchor text is tested against an OCR observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The observation's text must equal the anchor text.
    #[default]
    Exact,
    /// The anchor text must be a substring of the observation's text.
    Contains,
}

/// A directed edge: clicking `trigger_text`'s on-screen location while on the
/// owning screen is expected to transition toward `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenEdge {
    pub target: String,
    pub trigger_text: String,
}

/// One distinguishable, named UI state and how to leave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenDefinition {
    /// Unique identifier, also used as the cache document name.
    pub name: String,
    /// The text whose presence anywhere on screen identifies this screen.
    pub anchor_text: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub edges: Vec<ScreenEdge>,
}

impl ScreenDefinition {
    /// Test an observed text against this screen's anchor.
    pub fn anchor_matches(&self, text: &str) -> bool {
        match self.match_mode {
            MatchMode::Exact => text == self.anchor_text,
            MatchMode::Contains => text.contains(&self.anchor_text),
        }
    }
}

/// Validated, read-only lookup structure over the authored screen list.
///
/// Definition order is significant: recognition tests screens in this order
/// and takes the first match, so anchors must be authored to be mutually
/// exclusive.
#[derive(Debug)]
pub struct ScreenGraph {
    screens: Vec<ScreenDefinition>,
    index: HashMap<String, usize>,
    roots: Vec<String>,
}

impl ScreenGraph {
    /// Build and validate a graph from the authored definitions.
    pub fn new(screens: Vec<ScreenDefinition>) -> Result<Self, NavigationError> {
        let mut index = HashMap::new();
        for (i, screen) in screens.iter().enumerate() {
            if index.insert(screen.name.clone(), i).is_some() {
                return Err(NavigationError::InvalidGraph(format!(
                    "duplicate screen name '{}'",
                    screen.name
                )));
            }
        }

        let mut has_incoming: HashSet<&str> = HashSet::new();
        for screen in &screens {
            for edge in &screen.edges {
                if !index.contains_key(&edge.target) {
                    return Err(NavigationError::InvalidGraph(format!(
                        "screen '{}' has an edge to undefined screen '{}'",
                        screen.name, edge.target
                    )));
                }
                has_incoming.insert(edge.target.as_str());
            }
        }

        let roots: Vec<String> = screens
            .iter()
            .filter(|s| !has_incoming.contains(s.name.as_str()))
            .map(|s| s.name.clone())
            .collect();
        if roots.is_empty() {
            return Err(NavigationError::InvalidGraph(
                "no root screen (every screen has an incoming edge)".to_string(),
            ));
        }

        debug!(
            screens = screens.len(),
            roots = roots.len(),
            "screen graph loaded"
        );
        Ok(Self {
            screens,
            index,
            roots,
        })
    }

    /// Load a graph from its JSON table (an array of screen definitions).
    pub fn from_json(json: &str) -> Result<Self, NavigationError> {
        let screens: Vec<ScreenDefinition> = serde_json::from_str(json)
            .map_err(|e| NavigationError::InvalidGraph(format!("malformed graph JSON: {e}")))?;
        Self::new(screens)
    }

    pub fn get(&self, name: &str) -> Result<&ScreenDefinition, NavigationError> {
        self.index
            .get(name)
            .map(|&i| &self.screens[i])
            .ok_or_else(|| NavigationError::UnknownScreen(name.to_string()))
    }

    pub fn neighbors_of(&self, name: &str) -> Result<&[ScreenEdge], NavigationError> {
        Ok(&self.get(name)?.edges)
    }

    pub fn all_screens(&self) -> &[ScreenDefinition] {
        &self.screens
    }

    /// Screens with no incoming edge, in definition order. The first one is
    /// the conventional home screen.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// The conventional home screen (first root in definition order).
    pub fn home(&self) -> &str {
        &self.roots[0]
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.roots.iter().any(|r| r == name)
    }

    /// Compute the screen sequence from a root to `target`, inclusive.
    ///
    /// Walks backwards from `target`, at each step taking the first screen in
    /// definition order with an edge into the frontier, until a root is
    /// reached. A cycle or dead end is a graph-authoring defect and fails
    /// with [`NavigationError::NoPathFound`].
    pub fn find_path(&self, target: &str) -> Result<Vec<String>, NavigationError> {
        self.get(target)?;

        let mut chain = vec![target.to_string()];
        let mut visited: HashSet<String> = HashSet::from([target.to_string()]);
        let mut frontier = target.to_string();
        while !self.is_root(&frontier) {
            let parent = self
                .screens
                .iter()
                .find(|s| s.edges.iter().any(|e| e.target == frontier))
                .ok_or_else(|| {
                    NavigationError::NoPathFound(format!(
                        "'{frontier}' has no incoming edge and is not a root"
                    ))
                })?;
            if !visited.insert(parent.name.clone()) {
                return Err(NavigationError::NoPathFound(format!(
                    "cycle through '{}' while tracing '{target}' back to a root",
                    parent.name
                )));
            }
            chain.push(parent.name.clone());
            frontier = parent.name.clone();
        }
        chain.reverse();
        Ok(chain)
    }
}
