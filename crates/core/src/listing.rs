//! Sort keys and pagination for template listings.
//!
//! Sort keys map to fixed `ORDER BY` fragments. Caller-supplied sort text is
//! only ever used to pick one of these; it is never interpolated.

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Page size used when the caller omits `limit` or passes a non-positive one.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Normalized `LIMIT`/`OFFSET` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// `limit <= 0` falls back to the default, `offset < 0` to zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l,
            _ => DEFAULT_LIST_LIMIT,
        };
        let offset = offset.unwrap_or(0).max(0);
        Self { limit, offset }
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Which listing a query is for. Each has its own default sort and its own
/// ordering for `popular`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Admin,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Updated,
    Newest,
    Popular,
    Name,
}

impl SortKey {
    /// Resolve the `sort` query parameter. Unknown or missing values fall
    /// back to the listing's default.
    pub fn resolve(raw: Option<&str>, kind: ListingKind) -> Self {
        match raw.map(str::trim) {
            Some("updated") => Self::Updated,
            Some("newest") => Self::Newest,
            Some("popular") => Self::Popular,
            Some("name") => Self::Name,
            _ => Self::default_for(kind),
        }
    }

    pub fn default_for(kind: ListingKind) -> Self {
        match kind {
            ListingKind::Admin => Self::Updated,
            ListingKind::Public => Self::Newest,
        }
    }

    /// `ORDER BY` body for a query aliasing `templates` as `t`.
    ///
    /// Every ordering ends with `t.id` so pages never overlap.
    pub fn order_by(self, kind: ListingKind) -> &'static str {
        match (self, kind) {
            (Self::Updated, _) => "t.updated_at DESC, t.id DESC",
            (Self::Newest, _) => "t.published_at DESC NULLS LAST, t.created_at DESC, t.id DESC",
            (Self::Popular, ListingKind::Admin) => "t.usage_count DESC, t.updated_at DESC, t.id DESC",
            (Self::Popular, ListingKind::Public) => {
                "t.usage_count DESC, t.published_at DESC NULLS LAST, t.id DESC"
            }
            (Self::Name, _) => "t.name ASC, t.id ASC",
        }
    }
}
