//! List screens: text search, date ranges and page slicing.
//!
//! Tables are small, so every list endpoint loads the rows for one entity
//! and narrows them here before slicing out the requested page.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

/// Rows that take part in the free-text search box
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

/// Blank query matches everything; otherwise any field must contain the
/// trimmed query, ignoring case.
pub fn matches_query<T: Searchable>(item: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Case-insensitive equality for optional text filters (bairro, cidade, ...)
pub fn matches_text(value: Option<&str>, filter: Option<&str>) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(wanted) => value
            .map(|v| v.trim().to_lowercase() == wanted.to_lowercase())
            .unwrap_or(false),
    }
}

/// Equality for optional exact filters (ids, enums)
pub fn matches_eq<T: PartialEq>(value: Option<T>, filter: Option<T>) -> bool {
    match filter {
        None => true,
        Some(wanted) => value == Some(wanted),
    }
}

/// Inclusive date range; either end may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Rows without a date only pass an unbounded range
    pub fn contains_opt(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(d) => self.contains(d),
            None => self.is_unbounded(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Common query-string parameters of every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl ListParams {
    pub fn query(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }

    pub fn page_request(&self, config: &PaginationConfig) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(0), config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// Page 0 becomes 1, per_page 0 becomes the default, oversize is capped
    pub fn new(page: usize, per_page: usize, config: &PaginationConfig) -> Self {
        let per_page = match per_page {
            0 => config.default_per_page,
            n => n.min(config.max_per_page),
        };
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Saturates for absurd page numbers; the page past the end is empty
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Offset for a SQL `OFFSET` bind
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset()).unwrap_or(i64::MAX)
    }

    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.per_page).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn from_parts(items: Vec<T>, request: PageRequest, total_items: usize) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages: total_items.div_ceil(request.per_page),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Slice one page out of an already filtered list
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_items = items.len();
    let page_items: Vec<T> = items
        .into_iter()
        .skip(request.offset())
        .take(request.per_page)
        .collect();
    Page::from_parts(page_items, request, total_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        nome: String,
        bairro: String,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.nome.as_str(), self.bairro.as_str()]
        }
    }

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_per_page: 10,
            max_per_page: 50,
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { nome: "Maria José".into(), bairro: "Boa Viagem".into() },
            Row { nome: "JOÃO Silva".into(), bairro: "Casa Amarela".into() },
            Row { nome: "Ana".into(), bairro: "Várzea".into() },
        ]
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let rows = rows();
        let hits: Vec<&Row> = rows.iter().filter(|r| matches_query(*r, "joão")).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].nome, "JOÃO Silva");

        let hits = rows.iter().filter(|r| matches_query(*r, "VÁRZ")).count();
        assert_eq!(hits, 1);

        let hits = rows.iter().filter(|r| matches_query(*r, "zzz")).count();
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_blank_query_matches_all() {
        let rows = rows();
        assert!(rows.iter().all(|r| matches_query(r, "")));
        assert!(rows.iter().all(|r| matches_query(r, "   ")));
    }

    #[test]
    fn test_pages_are_full_except_last() {
        let items: Vec<u32> = (1..=23).collect();
        let cfg = config();

        let first = paginate(items.clone(), PageRequest::new(1, 10, &cfg));
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 23);

        let second = paginate(items.clone(), PageRequest::new(2, 10, &cfg));
        assert_eq!(second.items, (11..=20).collect::<Vec<_>>());

        let last = paginate(items.clone(), PageRequest::new(3, 10, &cfg));
        assert_eq!(last.items, vec![21, 22, 23]);

        let past_end = paginate(items, PageRequest::new(4, 10, &cfg));
        assert!(past_end.items.is_empty());
    }

    #[test]
    fn test_page_request_normalization() {
        let cfg = config();
        assert_eq!(PageRequest::new(0, 0, &cfg), PageRequest { page: 1, per_page: 10 });
        assert_eq!(PageRequest::new(2, 500, &cfg).per_page, 50);

        let empty: Page<u32> = paginate(Vec::new(), PageRequest::new(1, 10, &cfg));
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_huge_page_number_is_an_empty_page() {
        let cfg = config();
        let request = PageRequest::new(usize::MAX, 10, &cfg);
        assert_eq!(request.offset(), usize::MAX);
        assert_eq!(request.sql_offset(), i64::MAX);

        let page = paginate((1..=5).collect::<Vec<u32>>(), request);
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 5);
        assert_eq!(page.page, usize::MAX);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let range = DateRange::new(Some(d("2024-01-01")), Some(d("2024-01-31")));

        assert!(range.contains(d("2024-01-01")));
        assert!(range.contains(d("2024-01-31")));
        assert!(!range.contains(d("2024-02-01")));
        assert!(!range.contains_opt(None));
        assert!(DateRange::default().contains_opt(None));
    }

    #[test]
    fn test_text_filters() {
        assert!(matches_text(Some("Recife"), Some("recife")));
        assert!(!matches_text(None, Some("Recife")));
        assert!(matches_text(None, None));
        assert!(matches_text(Some("Olinda"), Some("  ")));
        assert!(matches_eq(Some(3), None));
        assert!(!matches_eq(None, Some(3)));
    }
}
