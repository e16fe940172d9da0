//! Enumerations and static display data for the matrix.
//!
//! This module defines the four Eisenhower quadrants, the categories an
//! analysis suggestion can fall into, and the per-quadrant display
//! configuration shared by every front end.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One of the four Eisenhower quadrants a task is filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuadrantType {
    /// Urgent & important.
    #[value(alias = "now")]
    DoNow,
    /// Urgent & not important.
    #[value(alias = "later")]
    DoLater,
    /// Important & not urgent.
    Delegate,
    /// Neither urgent nor important.
    Eliminate,
}

impl QuadrantType {
    /// All quadrants in board order (top-left, top-right, bottom-left, bottom-right).
    pub const ALL: [QuadrantType; 4] = [
        QuadrantType::DoNow,
        QuadrantType::DoLater,
        QuadrantType::Delegate,
        QuadrantType::Eliminate,
    ];

    /// Wire name, as stored on disk and sent to the analysis service.
    pub fn as_str(self) -> &'static str {
        match self {
            QuadrantType::DoNow => "DO_NOW",
            QuadrantType::DoLater => "DO_LATER",
            QuadrantType::Delegate => "DELEGATE",
            QuadrantType::Eliminate => "ELIMINATE",
        }
    }

    /// Static display configuration for this quadrant.
    pub fn config(self) -> &'static QuadrantConfig {
        match self {
            QuadrantType::DoNow => &QUADRANTS[0],
            QuadrantType::DoLater => &QUADRANTS[1],
            QuadrantType::Delegate => &QUADRANTS[2],
            QuadrantType::Eliminate => &QUADRANTS[3],
        }
    }

    /// Position of this quadrant in [`QuadrantType::ALL`].
    pub fn index(self) -> usize {
        match self {
            QuadrantType::DoNow => 0,
            QuadrantType::DoLater => 1,
            QuadrantType::Delegate => 2,
            QuadrantType::Eliminate => 3,
        }
    }
}

impl fmt::Display for QuadrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config().label)
    }
}

/// Presentation data for a quadrant. Pure configuration, no behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantConfig {
    pub quadrant: QuadrantType,
    pub label: &'static str,
    pub sublabel: &'static str,
    /// Accent colour as a `#rrggbb` hex string.
    pub accent: &'static str,
}

/// Display configuration for every quadrant, in board order.
pub static QUADRANTS: [QuadrantConfig; 4] = [
    QuadrantConfig {
        quadrant: QuadrantType::DoNow,
        label: "Do Now",
        sublabel: "Urgent & Important",
        accent: "#166534",
    },
    QuadrantConfig {
        quadrant: QuadrantType::DoLater,
        label: "Do Later",
        sublabel: "Urgent & Not Important",
        accent: "#1e40af",
    },
    QuadrantConfig {
        quadrant: QuadrantType::Delegate,
        label: "Delegate",
        sublabel: "Important & Not Urgent",
        accent: "#854d0e",
    },
    QuadrantConfig {
        quadrant: QuadrantType::Eliminate,
        label: "Eliminate",
        sublabel: "Not Urgent & Not Important",
        accent: "#991b1b",
    },
];

/// Category of an analysis suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionKind {
    /// A quadrant holds too many tasks.
    Bloat,
    /// Several tasks look related.
    Group,
    /// A task has no labels.
    Tag,
    /// Due date and quadrant disagree.
    Urgent,
}

impl SuggestionKind {
    /// Wire name used in the response schema.
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionKind::Bloat => "BLOAT",
            SuggestionKind::Group => "GROUP",
            SuggestionKind::Tag => "TAG",
            SuggestionKind::Urgent => "URGENT",
        }
    }
}
