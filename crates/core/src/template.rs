//! Template lifecycle enums and create/update input validation.
//!
//! Validation is pure: it inspects the request shape only and reports every
//! offending field at once, so the admin UI can highlight all of them in a
//! single round trip.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tags::normalize_tags;

// ---------------------------------------------------------------------------
// Status / visibility
// ---------------------------------------------------------------------------

/// Lifecycle status of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Draft,
    Published,
    Archived,
}

impl TemplateStatus {
    pub const ALL: [TemplateStatus; 3] = [Self::Draft, Self::Published, Self::Archived];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for TemplateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CoreError::invalid_field("status", format!("Unknown status '{s}'")))
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who can see a published template in the public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub const ALL: [Visibility; 2] = [Self::Public, Self::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| {
            CoreError::invalid_field("visibility", format!("Unknown visibility '{s}'"))
        })
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// A slug is non-empty and contains only `a-z`, `0-9` and `-`.
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Borrowed view over the mutable fields shared by create and update bodies.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFields<'a> {
    pub name: &'a str,
    pub status: &'a str,
    pub visibility: &'a str,
    pub tags: &'a [String],
}

/// Parsed, validated form of [`TemplateFields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTemplateFields {
    pub name: String,
    pub status: TemplateStatus,
    pub visibility: Visibility,
    /// Normalized tag slugs (trimmed, deduplicated, first-seen order).
    pub tags: Vec<String>,
}

/// Validate a create body. The slug must match the slug charset exactly.
pub fn validate_create(slug: &str, fields: TemplateFields<'_>) -> Result<ValidTemplateFields, CoreError> {
    let mut invalid = Vec::new();
    if !is_valid_slug(slug) {
        invalid.push("slug");
    }
    collect_field_errors(&fields, &mut invalid);
    finish(fields, invalid)
}

/// Validate an update body. The slug comes from the path and is immutable.
pub fn validate_update(fields: TemplateFields<'_>) -> Result<ValidTemplateFields, CoreError> {
    let mut invalid = Vec::new();
    collect_field_errors(&fields, &mut invalid);
    finish(fields, invalid)
}

fn collect_field_errors(fields: &TemplateFields<'_>, invalid: &mut Vec<&'static str>) {
    if fields.name.trim().is_empty() {
        invalid.push("name");
    }
    if fields.status.parse::<TemplateStatus>().is_err() {
        invalid.push("status");
    }
    if fields.visibility.parse::<Visibility>().is_err() {
        invalid.push("visibility");
    }
    // One bad tag fails the whole field, reported once.
    if fields.tags.iter().any(|t| !is_valid_slug(t.trim())) {
        invalid.push("tags[]");
    }
}

fn finish(
    fields: TemplateFields<'_>,
    invalid: Vec<&'static str>,
) -> Result<ValidTemplateFields, CoreError> {
    if !invalid.is_empty() {
        return Err(CoreError::Validation {
            fields: invalid.into_iter().map(String::from).collect(),
            message: "invalid template input".into(),
        });
    }

    Ok(ValidTemplateFields {
        name: fields.name.trim().to_string(),
        status: fields.status.parse()?,
        visibility: fields.visibility.parse()?,
        tags: normalize_tags(fields.tags),
    })
}
