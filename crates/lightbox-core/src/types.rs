use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LightboxError, Result};

// =============================================================================
// Defaults & bounds
// =============================================================================

/// Default width and height for generated images, in pixels.
pub const DEFAULT_DIMENSION: u32 = 1024;
/// Default number of inference steps.
pub const DEFAULT_STEPS: u32 = 4;
/// Upper bound on inference steps accepted from callers.
pub const MAX_STEPS: u32 = 8;
/// Default guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;
/// Seed value meaning "pick a random seed".
pub const RANDOM_SEED: i64 = -1;
/// Minimum edge length for a record to count as high resolution.
pub const HIGH_RES_MIN_EDGE: u32 = 1024;
/// Window for the `recent` category filter, in days.
pub const RECENT_WINDOW_DAYS: i64 = 7;

// =============================================================================
// Enums
// =============================================================================

/// The storage source a merged record came from.
///
/// Order of durability is fixed: the structured database first, then the
/// JSON file store, then the in-process memory cache. `Remote` is only ever
/// produced by the merge step when a remote page participates in a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Optional network source, highest merge priority.
    Remote,
    /// SQLite structured store, largest capacity.
    Database,
    /// Durable JSON file store.
    File,
    /// In-process cache, fastest and most volatile.
    Memory,
}

impl SourceTier {
    /// Stable lowercase label, used in logs and storage breakdowns.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Remote => "remote",
            SourceTier::Database => "database",
            SourceTier::File => "file",
            SourceTier::Memory => "memory",
        }
    }
}

/// Sort comparators for the merged record view.
///
/// Prompt ordering is case-insensitive. All sorts are stable: records that
/// compare equal keep their input order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest `created_at` first (default).
    #[default]
    NewestFirst,
    /// Oldest `created_at` first.
    OldestFirst,
    /// Prompt A to Z.
    PromptAsc,
    /// Prompt Z to A.
    PromptDesc,
    /// Smallest pixel count first.
    ResolutionAsc,
    /// Largest pixel count first.
    ResolutionDesc,
}

impl SortOrder {
    /// Sorts `records` in place according to this comparator.
    pub fn apply(&self, records: &mut [ImageRecord]) {
        match self {
            SortOrder::NewestFirst => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => records.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::PromptAsc => {
                records.sort_by(|a, b| a.prompt.to_lowercase().cmp(&b.prompt.to_lowercase()))
            }
            SortOrder::PromptDesc => {
                records.sort_by(|a, b| b.prompt.to_lowercase().cmp(&a.prompt.to_lowercase()))
            }
            SortOrder::ResolutionAsc => {
                records.sort_by(|a, b| a.resolution().cmp(&b.resolution()))
            }
            SortOrder::ResolutionDesc => {
                records.sort_by(|a, b| b.resolution().cmp(&a.resolution()))
            }
        }
    }
}

/// Category filters applied to the merged record view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    /// No filtering (default).
    #[default]
    All,
    /// Favorite flag set. Callers overlay favorites-list membership onto the
    /// flag before filtering, so either representation qualifies a record.
    Favorites,
    /// Created within the last `RECENT_WINDOW_DAYS` days of `now`.
    Recent,
    /// Width and height both at least `HIGH_RES_MIN_EDGE`.
    HighResolution,
}

impl CategoryFilter {
    /// Whether `record` passes this filter, evaluated at `now`.
    pub fn matches(&self, record: &ImageRecord, now: Timestamp) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Favorites => record.is_favorite,
            CategoryFilter::Recent => {
                now.0 - record.created_at.0 <= RECENT_WINDOW_DAYS * 86_400
            }
            CategoryFilter::HighResolution => record.is_high_resolution(),
        }
    }
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unique identifier for an image record.
///
/// Ids are caller-supplied when a record arrives from the remote source and
/// generated locally otherwise. Compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// UTC calendar day key, e.g. `2026-08-26`. Daily counters reset when
    /// this key changes.
    pub fn day_key(&self) -> String {
        self.to_datetime().format("%Y-%m-%d").to_string()
    }

    /// UTC calendar month key, e.g. `2026-08`.
    pub fn month_key(&self) -> String {
        self.to_datetime().format("%Y-%m").to_string()
    }

    /// ISO week key, e.g. `2026-W35`. Uses the ISO week year, which can
    /// differ from the calendar year around January 1.
    pub fn week_key(&self) -> String {
        let week = self.to_datetime().iso_week();
        format!("{}-W{:02}", week.year(), week.week())
    }

    /// Start of the next UTC day, when daily usage counters reset.
    pub fn next_utc_midnight(&self) -> Timestamp {
        let day = self.0.div_euclid(86_400);
        Timestamp((day + 1) * 86_400)
    }
}

// =============================================================================
// Generation parameters
// =============================================================================

/// Immutable snapshot of the parameters that produced an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f64,
    pub seed: i64,
    pub style: Option<String>,
}

/// Caller-facing input for a new record, with every optional attribute
/// carrying an explicit default.
///
/// Defaults: 1024x1024, 4 steps (capped at `MAX_STEPS`), guidance 7.5,
/// seed -1 (random), no style, zero file size, `created_at` now, and a fresh
/// UUID id. The thumbnail URL falls back to the full-size URL.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordDraft {
    pub id: Option<ImageId>,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub seed: Option<i64>,
    pub style: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub created_at: Option<Timestamp>,
}

impl RecordDraft {
    /// Resolves every default and produces a full record.
    ///
    /// Infallible: schema validation happens at the adapter boundary via
    /// [`ImageRecord::validate`], not here.
    pub fn into_record(self) -> ImageRecord {
        let thumbnail_url = self.thumbnail_url.unwrap_or_else(|| self.url.clone());
        ImageRecord {
            id: self.id.unwrap_or_else(ImageId::generate),
            url: self.url,
            thumbnail_url,
            prompt: self.prompt,
            negative_prompt: self.negative_prompt.unwrap_or_default(),
            width: self.width.unwrap_or(DEFAULT_DIMENSION),
            height: self.height.unwrap_or(DEFAULT_DIMENSION),
            steps: self.steps.unwrap_or(DEFAULT_STEPS).min(MAX_STEPS),
            guidance_scale: self.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
            seed: self.seed.unwrap_or(RANDOM_SEED),
            style: self.style,
            is_favorite: false,
            created_at: self.created_at.unwrap_or_else(Timestamp::now),
            file_size_bytes: self.file_size_bytes.unwrap_or(0),
            source: None,
        }
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// A generated image and its metadata, as held by every storage tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub url: String,
    pub thumbnail_url: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f64,
    pub seed: i64,
    pub style: Option<String>,
    pub is_favorite: bool,
    pub created_at: Timestamp,
    pub file_size_bytes: u64,
    /// Which tier this copy was read from. Assigned by the merge step,
    /// never persisted.
    #[serde(skip)]
    pub source: Option<SourceTier>,
}

impl ImageRecord {
    /// Schema check applied by every adapter before persisting.
    pub fn validate(&self) -> Result<()> {
        if self.id.0.trim().is_empty() {
            return Err(LightboxError::InvalidRecord("empty id".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(LightboxError::InvalidRecord("empty url".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(LightboxError::InvalidRecord(format!(
                "zero dimension: {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Total pixel count, the key for resolution sorting.
    pub fn resolution(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_high_resolution(&self) -> bool {
        self.width >= HIGH_RES_MIN_EDGE && self.height >= HIGH_RES_MIN_EDGE
    }

    /// Snapshot of the parameters that produced this record.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            width: self.width,
            height: self.height,
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            seed: self.seed,
            style: self.style.clone(),
        }
    }
}

/// One entry in the append-only generation history.
///
/// Entries are never mutated after creation; the log supports only append,
/// bulk deletion, and full clearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub image_id: ImageId,
    pub params: GenerationParams,
    pub created_at: Timestamp,
}

impl HistoryEntry {
    pub fn for_record(record: &ImageRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_id: record.id.clone(),
            params: record.params(),
            created_at: record.created_at,
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Page window descriptor shared by local and remote reads.
///
/// Pages are 1-indexed; `total_pages` is `ceil(total / limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages,
            has_more: page < total_pages,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn make_record(id: &str, created_at: i64) -> ImageRecord {
        RecordDraft {
            id: Some(ImageId(id.to_string())),
            url: format!("https://img.example/{id}.png"),
            prompt: format!("prompt for {id}"),
            created_at: Some(Timestamp(created_at)),
            ..Default::default()
        }
        .into_record()
    }

    #[test]
    fn test_source_tier_serialization() {
        let tier = SourceTier::Database;
        let json = serde_json::to_string(&tier).unwrap();
        assert_eq!(json, "\"database\"");

        let deserialized: SourceTier = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, SourceTier::Database);
    }

    #[test]
    fn test_source_tier_labels() {
        assert_eq!(SourceTier::Remote.as_str(), "remote");
        assert_eq!(SourceTier::Database.as_str(), "database");
        assert_eq!(SourceTier::File.as_str(), "file");
        assert_eq!(SourceTier::Memory.as_str(), "memory");
    }

    #[test]
    fn test_sort_order_default() {
        assert_eq!(SortOrder::default(), SortOrder::NewestFirst);
    }

    #[test]
    fn test_category_filter_default() {
        assert_eq!(CategoryFilter::default(), CategoryFilter::All);
    }

    #[test]
    fn test_image_id_generate_unique() {
        let a = ImageId::generate();
        let b = ImageId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_image_id_display() {
        let id = ImageId("img-42".to_string());
        assert_eq!(id.to_string(), "img-42");
    }

    #[test]
    fn test_timestamp_to_datetime_roundtrip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        let dt = ts.to_datetime();
        // Precision is seconds, so compare timestamps
        assert_eq!(dt.timestamp(), now.timestamp());
    }

    #[test]
    fn test_timestamp_day_and_month_keys() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 26, 12, 30, 0).unwrap();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.day_key(), "2026-08-26");
        assert_eq!(ts.month_key(), "2026-08");
    }

    #[test]
    fn test_pagination_rounds_pages_up() {
        let p = Pagination::new(2, 20, 45);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_more);

        let p = Pagination::new(3, 20, 45);
        assert!(!p.has_more);
    }

    #[test]
    fn test_pagination_empty_total() {
        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_more);
    }

    #[test]
    fn test_timestamp_week_key_groups_days() {
        let wed = Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 8, 26, 8, 0, 0).unwrap());
        let thu = Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 8, 27, 8, 0, 0).unwrap());
        let later = Timestamp(wed.0 + 8 * 86_400);
        assert_eq!(wed.week_key(), thu.week_key());
        assert_ne!(wed.week_key(), later.week_key());
        assert!(wed.week_key().starts_with("2026-W"));
    }

    #[test]
    fn test_timestamp_next_utc_midnight() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 26, 23, 59, 59).unwrap();
        let ts = Timestamp::from_datetime(dt);
        let reset = ts.next_utc_midnight();
        assert_eq!(reset.day_key(), "2026-08-27");
        assert_eq!(reset.0 % 86_400, 0);
    }

    #[test]
    fn test_draft_defaults() {
        let record = RecordDraft {
            url: "https://img.example/a.png".to_string(),
            prompt: "a red fox".to_string(),
            ..Default::default()
        }
        .into_record();

        assert_eq!(record.width, DEFAULT_DIMENSION);
        assert_eq!(record.height, DEFAULT_DIMENSION);
        assert_eq!(record.steps, DEFAULT_STEPS);
        assert_eq!(record.guidance_scale, DEFAULT_GUIDANCE_SCALE);
        assert_eq!(record.seed, RANDOM_SEED);
        assert_eq!(record.style, None);
        assert_eq!(record.negative_prompt, "");
        assert_eq!(record.thumbnail_url, record.url);
        assert_eq!(record.file_size_bytes, 0);
        assert!(!record.is_favorite);
        assert!(record.source.is_none());
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn test_draft_steps_capped() {
        let record = RecordDraft {
            url: "https://img.example/a.png".to_string(),
            prompt: "p".to_string(),
            steps: Some(50),
            ..Default::default()
        }
        .into_record();
        assert_eq!(record.steps, MAX_STEPS);
    }

    #[test]
    fn test_draft_respects_explicit_values() {
        let record = RecordDraft {
            id: Some(ImageId("explicit".to_string())),
            url: "https://img.example/b.png".to_string(),
            thumbnail_url: Some("https://img.example/b_thumb.png".to_string()),
            prompt: "castle".to_string(),
            negative_prompt: Some("blurry".to_string()),
            width: Some(512),
            height: Some(768),
            steps: Some(6),
            guidance_scale: Some(3.5),
            seed: Some(1234),
            style: Some("cinematic".to_string()),
            file_size_bytes: Some(2048),
            created_at: Some(Timestamp(1_700_000_000)),
        }
        .into_record();

        assert_eq!(record.id.as_str(), "explicit");
        assert_eq!(record.thumbnail_url, "https://img.example/b_thumb.png");
        assert_eq!(record.negative_prompt, "blurry");
        assert_eq!((record.width, record.height), (512, 768));
        assert_eq!(record.steps, 6);
        assert_eq!(record.guidance_scale, 3.5);
        assert_eq!(record.seed, 1234);
        assert_eq!(record.style.as_deref(), Some("cinematic"));
        assert_eq!(record.file_size_bytes, 2048);
        assert_eq!(record.created_at, Timestamp(1_700_000_000));
    }

    #[test]
    fn test_record_validate_ok() {
        assert!(make_record("a", 0).validate().is_ok());
    }

    #[test]
    fn test_record_validate_empty_id() {
        let mut record = make_record("a", 0);
        record.id = ImageId("  ".to_string());
        assert!(matches!(
            record.validate(),
            Err(LightboxError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_record_validate_empty_url() {
        let mut record = make_record("a", 0);
        record.url = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_record_validate_zero_dimension() {
        let mut record = make_record("a", 0);
        record.height = 0;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_record_source_tag_not_serialized() {
        let mut record = make_record("a", 0);
        record.source = Some(SourceTier::Memory);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("source").is_none());

        let back: ImageRecord = serde_json::from_value(value).unwrap();
        assert!(back.source.is_none());
    }

    #[test]
    fn test_category_filter_favorites() {
        let now = Timestamp::now();
        let mut record = make_record("a", now.0);
        assert!(!CategoryFilter::Favorites.matches(&record, now));
        record.is_favorite = true;
        assert!(CategoryFilter::Favorites.matches(&record, now));
    }

    #[test]
    fn test_category_filter_recent() {
        let now = Timestamp(1_700_000_000);
        let fresh = make_record("fresh", now.0 - 86_400);
        let stale = make_record("stale", now.0 - 8 * 86_400);
        assert!(CategoryFilter::Recent.matches(&fresh, now));
        assert!(!CategoryFilter::Recent.matches(&stale, now));
    }

    #[test]
    fn test_category_filter_high_resolution() {
        let now = Timestamp::now();
        let mut record = make_record("a", now.0);
        assert!(CategoryFilter::HighResolution.matches(&record, now));
        record.height = HIGH_RES_MIN_EDGE - 1;
        assert!(!CategoryFilter::HighResolution.matches(&record, now));
    }

    #[test]
    fn test_sort_order_created_at() {
        let mut records = vec![make_record("a", 10), make_record("b", 30), make_record("c", 20)];
        SortOrder::NewestFirst.apply(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        SortOrder::OldestFirst.apply(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_order_prompt_case_insensitive() {
        let mut records = vec![make_record("1", 0), make_record("2", 0), make_record("3", 0)];
        records[0].prompt = "banana".to_string();
        records[1].prompt = "Apple".to_string();
        records[2].prompt = "cherry".to_string();

        SortOrder::PromptAsc.apply(&mut records);
        let prompts: Vec<&str> = records.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["Apple", "banana", "cherry"]);

        SortOrder::PromptDesc.apply(&mut records);
        let prompts: Vec<&str> = records.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["cherry", "banana", "Apple"]);
    }

    #[test]
    fn test_sort_order_resolution() {
        let mut records = vec![make_record("small", 0), make_record("big", 0)];
        records[0].width = 512;
        records[0].height = 512;
        records[1].width = 2048;
        records[1].height = 2048;

        SortOrder::ResolutionDesc.apply(&mut records);
        assert_eq!(records[0].id.as_str(), "big");

        SortOrder::ResolutionAsc.apply(&mut records);
        assert_eq!(records[0].id.as_str(), "small");
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut records = vec![
            make_record("first", 100),
            make_record("second", 100),
            make_record("third", 100),
        ];
        SortOrder::NewestFirst.apply(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_history_entry_for_record() {
        let record = make_record("a", 42);
        let entry = HistoryEntry::for_record(&record);
        assert_eq!(entry.image_id, record.id);
        assert_eq!(entry.params.prompt, record.prompt);
        assert_eq!(entry.created_at, Timestamp(42));
    }
}
