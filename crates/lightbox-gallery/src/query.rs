//! Search, filtering, sorting, and pagination over the merged view.

use serde::{Deserialize, Serialize};

use lightbox_core::{CategoryFilter, ImageRecord, Pagination, SortOrder, Timestamp};

/// One gallery read request. Stages compose in a fixed order:
/// search, then category filter, then sort, then paginate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryQuery {
    /// 1-indexed page.
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub filter: CategoryFilter,
    pub sort: SortOrder,
}

impl Default for GalleryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            filter: CategoryFilter::default(),
            sort: SortOrder::default(),
        }
    }
}

impl GalleryQuery {
    pub fn page(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    pub fn with_search(search: &str) -> Self {
        Self {
            search: Some(search.to_string()),
            ..Self::default()
        }
    }

    pub fn with_filter(filter: CategoryFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// One page of gallery records plus its window metadata.
///
/// `degraded` is set when a configured remote source could not be
/// consulted and the page was served from local tiers alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPage {
    pub records: Vec<ImageRecord>,
    pub pagination: Pagination,
    pub degraded: bool,
}

/// Runs the query pipeline over an already merged, deduplicated record
/// set. `now` anchors the `recent` filter; `max_limit` caps the page size
/// a caller can request.
pub fn run_query(
    records: Vec<ImageRecord>,
    query: &GalleryQuery,
    now: Timestamp,
    max_limit: usize,
) -> GalleryPage {
    let mut records = records;

    if let Some(search) = &query.search {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            records.retain(|r| {
                r.prompt.to_lowercase().contains(&needle)
                    || r.negative_prompt.to_lowercase().contains(&needle)
            });
        }
    }

    records.retain(|r| query.filter.matches(r, now));

    query.sort.apply(&mut records);

    let limit = query.limit.clamp(1, max_limit.max(1));
    let page = query.page.max(1);
    let total = records.len();

    let records: Vec<ImageRecord> = records
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    GalleryPage {
        records,
        pagination: Pagination::new(page, limit, total),
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightbox_core::ImageId;

    fn make_record(id: &str, created_at: i64) -> ImageRecord {
        ImageRecord {
            id: ImageId(id.to_string()),
            url: format!("file:///images/{}.png", id),
            thumbnail_url: format!("file:///thumbs/{}.png", id),
            prompt: format!("prompt for {}", id),
            negative_prompt: String::new(),
            width: 1024,
            height: 1024,
            steps: 4,
            guidance_scale: 7.5,
            seed: -1,
            style: None,
            is_favorite: false,
            created_at: Timestamp(created_at),
            file_size_bytes: 2048,
            source: None,
        }
    }

    fn run(records: Vec<ImageRecord>, query: &GalleryQuery) -> GalleryPage {
        run_query(records, query, Timestamp(1_000_000), 50)
    }

    // =========================================================================
    // Search
    // =========================================================================

    #[test]
    fn test_search_is_case_insensitive() {
        let mut fox = make_record("fox", 300);
        fox.prompt = "Red Fox in morning light".to_string();
        let records = vec![fox, make_record("other", 200)];

        let page = run(records, &GalleryQuery::with_search("red"));
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "fox");
    }

    #[test]
    fn test_search_covers_negative_prompt() {
        let mut rec = make_record("a", 300);
        rec.negative_prompt = "blurry, low quality".to_string();
        let records = vec![rec, make_record("b", 200)];

        let page = run(records, &GalleryQuery::with_search("BLURRY"));
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "a");
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let records = vec![make_record("a", 300), make_record("b", 200)];
        let page = run(records, &GalleryQuery::with_search("   "));
        assert_eq!(page.records.len(), 2);
    }

    // =========================================================================
    // Category filters
    // =========================================================================

    #[test]
    fn test_favorites_filter() {
        let mut fav = make_record("fav", 300);
        fav.is_favorite = true;
        let records = vec![fav, make_record("plain", 200)];

        let page = run(records, &GalleryQuery::with_filter(CategoryFilter::Favorites));
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "fav");
    }

    #[test]
    fn test_recent_filter_uses_seven_day_window() {
        let now = Timestamp(10 * 86_400);
        let fresh = make_record("fresh", now.0 - 3 * 86_400);
        let stale = make_record("stale", now.0 - 8 * 86_400);

        let page = run_query(
            vec![fresh, stale],
            &GalleryQuery::with_filter(CategoryFilter::Recent),
            now,
            50,
        );
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "fresh");
    }

    #[test]
    fn test_high_resolution_needs_both_edges() {
        let mut wide = make_record("wide", 300);
        wide.width = 1920;
        wide.height = 720;
        let mut square = make_record("square", 200);
        square.width = 1024;
        square.height = 1024;

        let page = run(
            vec![wide, square],
            &GalleryQuery::with_filter(CategoryFilter::HighResolution),
        );
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "square");
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    #[test]
    fn test_sort_newest_first_is_default() {
        let records = vec![
            make_record("old", 100),
            make_record("new", 300),
            make_record("mid", 200),
        ];
        let page = run(records, &GalleryQuery::default());
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_by_prompt_ignores_case() {
        let mut a = make_record("a", 100);
        a.prompt = "zebra".to_string();
        let mut b = make_record("b", 200);
        b.prompt = "Apple".to_string();

        let query = GalleryQuery {
            sort: SortOrder::PromptAsc,
            ..GalleryQuery::default()
        };
        let page = run(vec![a, b], &query);
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_sort_by_resolution() {
        let mut small = make_record("small", 100);
        small.width = 512;
        small.height = 512;
        let mut large = make_record("large", 200);
        large.width = 2048;
        large.height = 2048;

        let query = GalleryQuery {
            sort: SortOrder::ResolutionDesc,
            ..GalleryQuery::default()
        };
        let page = run(vec![small, large], &query);
        assert_eq!(page.records[0].id.as_str(), "large");
        assert_eq!(page.records[1].id.as_str(), "small");
    }

    #[test]
    fn test_equal_sort_keys_keep_input_order() {
        let records = vec![
            make_record("first", 100),
            make_record("second", 100),
            make_record("third", 100),
        ];
        let page = run(records, &GalleryQuery::default());
        let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    #[test]
    fn test_pagination_slices_second_page() {
        // 45 records, newest first after the default sort: r0 (t=450) .. r44.
        let records: Vec<ImageRecord> = (0..45)
            .map(|i| make_record(&format!("r{}", i), 450 - 10 * i as i64))
            .collect();

        let page = run(records, &GalleryQuery::page(2, 20));
        assert_eq!(page.records.len(), 20);
        assert_eq!(page.records[0].id.as_str(), "r20");
        assert_eq!(page.records[19].id.as_str(), "r39");
        assert_eq!(page.pagination.total, 45);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_more);
    }

    #[test]
    fn test_pagination_past_the_end_is_empty() {
        let records = vec![make_record("a", 100)];
        let page = run(records, &GalleryQuery::page(5, 20));
        assert!(page.records.is_empty());
        assert_eq!(page.pagination.total, 1);
        assert!(!page.pagination.has_more);
    }

    #[test]
    fn test_limit_is_capped() {
        let records: Vec<ImageRecord> = (0..80)
            .map(|i| make_record(&format!("r{}", i), 800 - i as i64))
            .collect();

        let page = run_query(records, &GalleryQuery::page(1, 500), Timestamp(1_000), 50);
        assert_eq!(page.records.len(), 50);
        assert_eq!(page.pagination.limit, 50);
    }

    #[test]
    fn test_zero_page_and_limit_are_normalized() {
        let records = vec![make_record("a", 100), make_record("b", 200)];
        let page = run(records, &GalleryQuery::page(0, 0));
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, 1);
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_stages_compose_in_order() {
        let mut fav_fox = make_record("fav_fox", 100);
        fav_fox.prompt = "red fox".to_string();
        fav_fox.is_favorite = true;
        let mut plain_fox = make_record("plain_fox", 300);
        plain_fox.prompt = "red fox".to_string();
        let mut fav_owl = make_record("fav_owl", 200);
        fav_owl.prompt = "night owl".to_string();
        fav_owl.is_favorite = true;

        let query = GalleryQuery {
            search: Some("fox".to_string()),
            filter: CategoryFilter::Favorites,
            ..GalleryQuery::default()
        };
        let page = run(vec![fav_fox, plain_fox, fav_owl], &query);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id.as_str(), "fav_fox");
    }
}
