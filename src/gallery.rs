//! Background gallery: category queries, candidates and single selection
//!
//! The gallery is a small state machine:
//!
//! ```text
//! Idle ──choose category──▶ Loading ──▶ Populated | Empty | Error
//!   ▲                          │
//!   └──── (any state) ─────────┘  choosing another category restarts Loading
//! ```
//!
//! Rendering is declarative: [`GalleryView`] is derived from the state every
//! time it changes instead of patching thumbnails in place.

use crate::error::{PreviewError, Result};
use crate::tokens::RequestToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder text for a query that returned nothing
pub const EMPTY_MESSAGE: &str = "No images found.";

/// Placeholder text for a failed query
pub const ERROR_MESSAGE: &str = "Error loading backgrounds.";

/// Background categories offered by the category menu, plus free-form queries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundCategory {
    Landscape,
    Interior,
    Nature,
    Abstract,
    Beach,
    Technology,
    Mountains,
    Office,
    Sky,
    Urban,
    Forest,
    Room,
    Studio,
    Flowers,
    Art,
    #[serde(untagged)]
    Custom(String),
}

impl BackgroundCategory {
    /// The menu entries, in menu order
    pub const KNOWN: [BackgroundCategory; 15] = [
        Self::Landscape,
        Self::Interior,
        Self::Nature,
        Self::Abstract,
        Self::Beach,
        Self::Technology,
        Self::Mountains,
        Self::Office,
        Self::Sky,
        Self::Urban,
        Self::Forest,
        Self::Room,
        Self::Studio,
        Self::Flowers,
        Self::Art,
    ];

    /// Query string sent to the backgrounds endpoint
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Landscape => "landscape",
            Self::Interior => "interior",
            Self::Nature => "nature",
            Self::Abstract => "abstract",
            Self::Beach => "beach",
            Self::Technology => "technology",
            Self::Mountains => "mountains",
            Self::Office => "office",
            Self::Sky => "sky",
            Self::Urban => "urban",
            Self::Forest => "forest",
            Self::Room => "room",
            Self::Studio => "studio",
            Self::Flowers => "flowers",
            Self::Art => "art",
            Self::Custom(query) => query,
        }
    }

    /// Menu label ("Landscape", "Technology", ...)
    #[must_use]
    pub fn label(&self) -> String {
        let query = self.query();
        let mut chars = query.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Parse a menu value; blank input means no category was chosen
    #[must_use]
    pub fn from_choice(choice: &str) -> Option<Self> {
        choice.parse().ok()
    }
}

impl FromStr for BackgroundCategory {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PreviewError::invalid_config("background category is empty"));
        }
        Ok(Self::KNOWN
            .into_iter()
            .find(|category| category.query().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Self::Custom(trimmed.to_string())))
    }
}

impl fmt::Display for BackgroundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query())
    }
}

/// One selectable background
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCandidate {
    pub url: String,
    pub selected: bool,
}

/// State of the gallery for the active category
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryState {
    /// No category chosen yet
    #[default]
    Idle,
    /// Query in flight; earlier thumbnails are already cleared
    Loading { category: BackgroundCategory },
    /// Candidates for `category`; at most one is selected
    Populated {
        category: BackgroundCategory,
        candidates: Vec<BackgroundCandidate>,
    },
    /// The query returned no URLs
    Empty { category: BackgroundCategory },
    /// The query failed
    Error {
        category: BackgroundCategory,
        message: String,
    },
}

/// Gallery controller state plus the token of the query it is waiting for
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    state: GalleryState,
    pending: Option<RequestToken>,
}

impl Gallery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    /// Enter `Loading` for `category`, dropping current thumbnails
    pub fn begin_query(&mut self, category: BackgroundCategory, token: RequestToken) {
        self.state = GalleryState::Loading { category };
        self.pending = Some(token);
    }

    /// Apply a query result; results for anything but the pending token are ignored
    ///
    /// Returns whether the result was applied.
    pub fn finish_query(&mut self, token: RequestToken, result: &Result<Vec<String>>) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        let GalleryState::Loading { category } = &self.state else {
            return false;
        };
        let category = category.clone();
        self.pending = None;

        self.state = match result {
            Ok(urls) if urls.is_empty() => GalleryState::Empty { category },
            Ok(urls) => GalleryState::Populated {
                category,
                candidates: urls
                    .iter()
                    .map(|url| BackgroundCandidate {
                        url: url.clone(),
                        selected: false,
                    })
                    .collect(),
            },
            Err(error) => GalleryState::Error {
                category,
                message: error.to_string(),
            },
        };
        true
    }

    /// Activate the thumbnail at `index`
    ///
    /// Deselects whatever was selected, selects `index` and returns its URL.
    /// Activating the already selected candidate is allowed.
    ///
    /// # Errors
    /// `NoSuchCandidate` when the gallery is not populated or `index` is out of range.
    pub fn activate(&mut self, index: usize) -> Result<String> {
        let GalleryState::Populated { candidates, .. } = &mut self.state else {
            return Err(PreviewError::NoSuchCandidate(index));
        };
        if index >= candidates.len() {
            return Err(PreviewError::NoSuchCandidate(index));
        }
        for (position, candidate) in candidates.iter_mut().enumerate() {
            candidate.selected = position == index;
        }
        candidates
            .get(index)
            .map(|candidate| candidate.url.clone())
            .ok_or(PreviewError::NoSuchCandidate(index))
    }

    /// Index of the selected candidate, if any
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        match &self.state {
            GalleryState::Populated { candidates, .. } => {
                candidates.iter().position(|candidate| candidate.selected)
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn view(&self, thumbnail_width: u32) -> GalleryView {
        GalleryView::render(&self.state, thumbnail_width)
    }
}

/// A thumbnail as presented to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailView {
    pub index: usize,
    pub url: String,
    pub width: u32,
    pub selected: bool,
}

/// Presentation of the gallery, derived from [`GalleryState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryView {
    /// Nothing to show
    Hidden,
    /// Query in flight
    Loading,
    Thumbnails(Vec<ThumbnailView>),
    /// Explanatory text instead of thumbnails
    Placeholder(&'static str),
}

impl GalleryView {
    #[must_use]
    pub fn render(state: &GalleryState, thumbnail_width: u32) -> Self {
        match state {
            GalleryState::Idle => Self::Hidden,
            GalleryState::Loading { .. } => Self::Loading,
            GalleryState::Populated { candidates, .. } => Self::Thumbnails(
                candidates
                    .iter()
                    .enumerate()
                    .map(|(index, candidate)| ThumbnailView {
                        index,
                        url: candidate.url.clone(),
                        width: thumbnail_width,
                        selected: candidate.selected,
                    })
                    .collect(),
            ),
            GalleryState::Empty { .. } => Self::Placeholder(EMPTY_MESSAGE),
            GalleryState::Error { .. } => Self::Placeholder(ERROR_MESSAGE),
        }
    }

    #[must_use]
    pub fn thumbnails(&self) -> &[ThumbnailView] {
        match self {
            Self::Thumbnails(thumbnails) => thumbnails,
            _ => &[],
        }
    }
}
