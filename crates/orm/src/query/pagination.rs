//! Query Builder pagination operations

use super::builder::QueryBuilder;

impl<T> QueryBuilder<T> {
    /// Add LIMIT clause
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    /// Alias of [`limit`](Self::limit)
    pub fn take(self, count: u64) -> Self {
        self.limit(count)
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: u64) -> Self {
        self.offset = Some(count);
        self
    }

    /// Alias of [`offset`](Self::offset)
    pub fn skip(self, count: u64) -> Self {
        self.offset(count)
    }

    /// LIMIT + OFFSET for a 1-based page number
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.offset((page - 1).saturating_mul(per_page)).limit(per_page)
    }
}
