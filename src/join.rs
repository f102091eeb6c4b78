//! Inner join of two indicators on (country_code, year).

use crate::models::{JoinedDataset, JoinedRecord, LongDataset, RecordKey};
use ahash::AHashMap;

/// Pair `left` and `right` on (country_code, year).
///
/// Only keys present on both sides survive. The country name comes from the
/// left side. A key that repeats on either side yields every pairing for that
/// key, ordered by left input order, then right input order.
pub fn join(left: &LongDataset, right: &LongDataset) -> JoinedDataset {
    let mut index: AHashMap<RecordKey, Vec<usize>> = AHashMap::new();
    for (i, r) in right.iter().enumerate() {
        index.entry(r.key()).or_default().push(i);
    }

    let rights = right.records();
    let mut records = Vec::new();
    for l in left {
        let Some(matches) = index.get(&l.key()) else {
            continue;
        };
        for &i in matches {
            let r = &rights[i];
            if !(l.value.is_finite() && r.value.is_finite()) {
                continue;
            }
            records.push(JoinedRecord {
                country_name: l.country_name.clone(),
                country_code: l.country_code.clone(),
                year: l.year,
                left: l.value,
                right: r.value,
            });
        }
    }

    log::debug!(
        "join {} x {}: {} + {} -> {} rows",
        left.value_column(),
        right.value_column(),
        left.len(),
        right.len(),
        records.len()
    );

    JoinedDataset {
        left_column: left.value_column().to_string(),
        right_column: right.value_column().to_string(),
        records,
    }
}
