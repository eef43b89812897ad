use serde::{Deserialize, Serialize};

/// Page window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Rows to skip (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        PageLimits::default().resolve(None, None)
    }
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Apply this window to an already ordered sequence.
    pub fn window<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Clamping policy turning raw `limit`/`offset` parameters into a [`Pagination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Absent limit → `default_limit`; otherwise clamped to `[1, max_limit]`.
    /// Negative offsets become 0.
    pub fn resolve(&self, limit: Option<i64>, offset: Option<i64>) -> Pagination {
        let max = i64::from(self.max_limit.max(1));
        let limit = match limit {
            None => self.default_limit.clamp(1, self.max_limit.max(1)),
            Some(l) => l.clamp(1, max) as u32,
        };
        let offset = offset.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32;
        Pagination { limit, offset }
    }
}
