//! Board records and the request shapes that create or mutate them.
//!
//! Request types carry `Option` fields so that "absent" is distinguishable
//! from "present"; each one validates into the resolved record the store
//! accepts ([`NewIdea`], [`IdeaUpdate`], [`NewConnection`]).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BoardError, Result};

/// Default canvas x coordinate for a new idea.
pub const DEFAULT_X: i64 = 200;
/// Default canvas y coordinate for a new idea.
pub const DEFAULT_Y: i64 = 200;
/// Default depth for a new idea.
pub const DEFAULT_Z: i64 = 0;
/// Default note width.
pub const DEFAULT_WIDTH: i64 = 200;
/// Default note height.
pub const DEFAULT_HEIGHT: i64 = 100;

/// A note on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: i64,
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub width: i64,
    pub height: i64,
}

/// An [`Idea`] with the cluster label derived for it in one list call.
///
/// Serializes flat: `{id, text, x, y, z, width, height, cluster}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredIdea {
    #[serde(flatten)]
    pub idea: Idea,
    pub cluster: i32,
}

/// Body of a create-idea request. Only `text` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateIdeaRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub height: Option<i64>,
}

impl CreateIdeaRequest {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Validate the request and fill in default geometry.
    ///
    /// Fails with [`BoardError::Validation`] when `text` is absent or blank.
    /// The stored text is trimmed.
    pub fn into_new_idea(self) -> Result<NewIdea> {
        let text = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BoardError::validation("Idea text is required"))?
            .to_string();

        Ok(NewIdea {
            text,
            x: self.x.unwrap_or(DEFAULT_X),
            y: self.y.unwrap_or(DEFAULT_Y),
            z: DEFAULT_Z,
            width: self.width.unwrap_or(DEFAULT_WIDTH),
            height: self.height.unwrap_or(DEFAULT_HEIGHT),
        })
    }
}

/// A validated idea ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdea {
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub width: i64,
    pub height: i64,
}

/// Partial update of an idea.
///
/// The set of updatable fields is closed: anything outside
/// `{x, y, width, height, text}` is rejected during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdeaUpdate {
    #[serde(default, deserialize_with = "round_coordinate")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "round_coordinate")]
    pub height: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

impl IdeaUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn position(x: i64, y: i64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.text.is_none()
    }

    /// Reject empty updates and blank text; trims supplied text.
    pub fn validate(mut self) -> Result<Self> {
        if self.is_empty() {
            return Err(BoardError::validation(
                "At least one of x, y, width, height, text is required",
            ));
        }
        if let Some(text) = self.text.take() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(BoardError::validation("Text is required"));
            }
            self.text = Some(trimmed.to_string());
        }
        Ok(self)
    }

    /// Apply the supplied fields to `idea`, leaving the others untouched.
    pub fn apply_to(&self, idea: &mut Idea) {
        if let Some(x) = self.x {
            idea.x = x;
        }
        if let Some(y) = self.y {
            idea.y = y;
        }
        if let Some(width) = self.width {
            idea.width = width;
        }
        if let Some(height) = self.height {
            idea.height = height;
        }
        if let Some(text) = &self.text {
            idea.text = text.clone();
        }
    }
}

/// A directed edge between two notes, anchored at named border points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    #[serde(rename = "fromId")]
    pub source_id: i64,
    #[serde(rename = "toId")]
    pub target_id: i64,
    #[serde(rename = "fromPos")]
    pub source_point: String,
    #[serde(rename = "toPos")]
    pub target_point: String,
}

/// Body of a create-connection request. All four fields are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConnectionRequest {
    #[serde(default, rename = "fromId")]
    pub source_id: Option<i64>,
    #[serde(default, rename = "toId")]
    pub target_id: Option<i64>,
    #[serde(default, rename = "fromPos")]
    pub source_point: Option<String>,
    #[serde(default, rename = "toPos")]
    pub target_point: Option<String>,
}

impl CreateConnectionRequest {
    pub fn new(
        source_id: i64,
        target_id: i64,
        source_point: impl Into<String>,
        target_point: impl Into<String>,
    ) -> Self {
        Self {
            source_id: Some(source_id),
            target_id: Some(target_id),
            source_point: Some(source_point.into()),
            target_point: Some(target_point.into()),
        }
    }

    /// Fails with [`BoardError::Validation`] naming the first missing field.
    pub fn into_new_connection(self) -> Result<NewConnection> {
        let missing = |field: &str| BoardError::validation(format!("Missing field: {field}"));
        let anchor = |value: Option<String>, field: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| missing(field))
        };

        Ok(NewConnection {
            source_id: self.source_id.ok_or_else(|| missing("fromId"))?,
            target_id: self.target_id.ok_or_else(|| missing("toId"))?,
            source_point: anchor(self.source_point, "fromPos")?,
            target_point: anchor(self.target_point, "toPos")?,
        })
    }
}

/// A validated connection ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnection {
    pub source_id: i64,
    pub target_id: i64,
    pub source_point: String,
    pub target_point: String,
}

/// Canvas geometry arrives as any JSON number (drag positions are often
/// fractional) and is stored rounded to the nearest integer.
fn round_coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    const LIMIT: f64 = 9.0e15;
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(v) if v.is_finite() && v.abs() < LIMIT => Ok(Some(v.round() as i64)),
        Some(v) => Err(serde::de::Error::custom(format!(
            "coordinate out of range: {v}"
        ))),
    }
}
