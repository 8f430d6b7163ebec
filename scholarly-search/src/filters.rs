//! Filters applicable to hybrid search and paper listing (§4.A).

use chrono::{DateTime, Utc};

/// Optional filters applied to both the vector and lexical branches before
/// ranking, so a chunk excluded by a filter never appears in either
/// candidate list.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub categories: Option<Vec<String>>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub arxiv_ids: Option<Vec<String>>,
}

impl SearchFilters {
    #[must_use]
    pub fn matches_categories(&self, chunk_categories: &[String]) -> bool {
        match &self.categories {
            None => true,
            Some(wanted) => wanted.iter().any(|c| chunk_categories.contains(c)),
        }
    }

    #[must_use]
    pub fn matches_date(&self, published: Option<DateTime<Utc>>) -> bool {
        match published {
            None => self.published_after.is_none() && self.published_before.is_none(),
            Some(date) => {
                self.published_after.map_or(true, |after| date >= after)
                    && self.published_before.map_or(true, |before| date <= before)
            }
        }
    }

    #[must_use]
    pub fn matches_arxiv_id(&self, arxiv_id: &str) -> bool {
        match &self.arxiv_ids {
            None => true,
            Some(ids) => ids.iter().any(|id| id == arxiv_id),
        }
    }
}
