//! Priority merge across tier snapshots.

use std::collections::HashSet;

use lightbox_core::{ImageId, ImageRecord, SortOrder, SourceTier};

/// Collapses per-tier snapshots into one deduplicated view.
///
/// `sources` must be in descending priority order. The first copy seen for
/// an id wins and is tagged with the tier it came from; copies of the same
/// id in lower tiers are dropped even when their fields differ. The result
/// comes back newest creation first, the default order for gallery reads.
/// The walk and the sort are both deterministic, so the same input always
/// produces the same output.
pub fn merge_sources(sources: Vec<(SourceTier, Vec<ImageRecord>)>) -> Vec<ImageRecord> {
    let mut seen: HashSet<ImageId> = HashSet::new();
    let mut merged: Vec<ImageRecord> = Vec::new();

    for (tier, records) in sources {
        for mut record in records {
            if seen.insert(record.id.clone()) {
                record.source = Some(tier);
                merged.push(record);
            }
        }
    }

    SortOrder::NewestFirst.apply(&mut merged);
    merged
}
