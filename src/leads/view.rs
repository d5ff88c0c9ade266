use crate::storage::{CategoryFilter, Lead};

/// Active search text and category selector for the filtered view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    pub category: CategoryFilter,
}

impl FilterCriteria {
    pub fn new(query: impl Into<String>, category: CategoryFilter) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    pub fn apply(&self, leads: &[Lead]) -> Vec<Lead> {
        apply(leads, &self.query, self.category)
    }
}

/// Derives the filtered view of `leads`, keeping repository order.
///
/// A lead matches when the lower-cased query is a substring of its title, its
/// URL or any tag (an empty query matches everything) and its category passes
/// `category`.
pub fn apply(leads: &[Lead], query: &str, category: CategoryFilter) -> Vec<Lead> {
    let needle = query.to_lowercase();
    leads
        .iter()
        .filter(|lead| category.matches(lead.category) && matches_query(lead, &needle))
        .cloned()
        .collect()
}

/// `needle` must already be lower-cased.
fn matches_query(lead: &Lead, needle: &str) -> bool {
    needle.is_empty()
        || lead.title.to_lowercase().contains(needle)
        || lead.url.to_lowercase().contains(needle)
        || lead.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Category;
    use pretty_assertions::assert_eq;

    fn lead(url: &str, title: &str, tags: &[&str], category: Category) -> Lead {
        Lead {
            url: url.into(),
            title: title.into(),
            timestamp: 0,
            visits: 0,
            category,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            notes: String::new(),
            reading_time: None,
            broken: None,
        }
    }

    fn sample() -> Vec<Lead> {
        vec![
            lead("https://a.com", "Foo", &["x"], Category::General),
            lead("https://b.com", "Bar", &[], Category::General),
        ]
    }

    #[test]
    fn test_query_matches_title_case_insensitively() {
        let view = apply(&sample(), "foo", CategoryFilter::All);
        assert_eq!(view, vec![sample()[0].clone()]);
    }

    #[test]
    fn test_empty_query_returns_all_in_order() {
        assert_eq!(apply(&sample(), "", CategoryFilter::All), sample());
    }

    #[test]
    fn test_query_matches_url_and_tags() {
        let leads = sample();
        assert_eq!(apply(&leads, "B.COM", CategoryFilter::All).len(), 1);
        assert_eq!(apply(&leads, "x", CategoryFilter::All)[0].url, "https://a.com");
    }

    #[test]
    fn test_category_and_query_intersect() {
        let leads = vec![
            lead("https://github.com/a", "rust", &[], Category::Documentation),
            lead("https://news.com/a", "rust news", &[], Category::News),
            lead("https://github.com/b", "go", &[], Category::Documentation),
        ];

        let view = apply(&leads, "rust", CategoryFilter::Only(Category::Documentation));
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].url, "https://github.com/a");

        let all_docs = apply(&leads, "", CategoryFilter::Only(Category::Documentation));
        assert_eq!(all_docs.len(), 2);
    }

    #[test]
    fn test_no_matches_yields_empty_view() {
        assert!(apply(&sample(), "zzz", CategoryFilter::All).is_empty());
        assert!(apply(&sample(), "", CategoryFilter::Only(Category::Media)).is_empty());
    }

    #[test]
    fn test_criteria_apply_delegates() {
        let criteria = FilterCriteria::new("BAR", CategoryFilter::All);
        assert_eq!(criteria.apply(&sample())[0].url, "https://b.com");
    }
}
