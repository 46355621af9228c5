//! Paged result shape.

/// One page of results plus the total the database reported for the whole query.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectListResult<T> {
    pub current_page: Vec<T>,
    /// Total matching rows, independent of `current_page.len()`.
    pub virtual_total: i64,
}

impl<T> ObjectListResult<T> {
    pub fn new(current_page: Vec<T>, virtual_total: i64) -> Self {
        Self {
            current_page,
            virtual_total,
        }
    }

    pub fn len(&self) -> usize {
        self.current_page.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_page.is_empty()
    }

    /// Number of pages of `rows_per_page` needed for `virtual_total` rows.
    pub fn page_count(&self, rows_per_page: i64) -> i64 {
        if rows_per_page <= 0 || self.virtual_total <= 0 {
            return 0;
        }
        (self.virtual_total + rows_per_page - 1) / rows_per_page
    }
}

impl<T> Default for ObjectListResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl<T> IntoIterator for ObjectListResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.current_page.into_iter()
    }
}
