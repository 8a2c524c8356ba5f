//! Grouping and batching of pending rows before dispatch (`spec.md` §4.3
//! "Grouping"): group by `(cafeId, kind)`, then split `Store`/`Unstore`
//! groups into batches of up to `MAX_BATCH` distinct targets per RPC.
//! `StoreThread`/`UnstoreThread`/`Inbox`/`PublishPeer` rows dispatch one at
//! a time.

use std::collections::BTreeMap;

use cafe_store::Request;
use cafe_types::{CafeId, RequestKind};

/// One unit of dispatch work: either a batch of `Store`/`Unstore` rows for
/// the same cafe, or a single row for every other kind.
#[derive(Debug, Clone)]
pub struct DispatchGroup {
    pub cafe_id: CafeId,
    pub kind: RequestKind,
    pub rows: Vec<Request>,
}

/// The six `RequestKind` variants, in a fixed order, used only as a
/// `BTreeMap` key discriminant here — `RequestKind` itself lives in
/// `cafe-types` and deliberately doesn't carry an `Ord` impl on the wire
/// type, so we rank it locally instead of orphan-impling one.
fn kind_rank(kind: RequestKind) -> u8 {
    match kind {
        RequestKind::Store => 0,
        RequestKind::Unstore => 1,
        RequestKind::StoreThread => 2,
        RequestKind::UnstoreThread => 3,
        RequestKind::Inbox => 4,
        RequestKind::PublishPeer => 5,
    }
}

/// Group `rows` (already filtered to due-for-dispatch) by `(cafeId, kind)`
/// and split batchable kinds into chunks of at most `max_batch`.
pub fn group_for_dispatch(rows: Vec<Request>, max_batch: usize) -> Vec<DispatchGroup> {
    let mut by_key: BTreeMap<(CafeId, u8), (RequestKind, Vec<Request>)> = BTreeMap::new();
    for row in rows {
        let key = (row.cafe_id.clone(), kind_rank(row.kind));
        by_key.entry(key).or_insert_with(|| (row.kind, Vec::new())).1.push(row);
    }

    let mut groups = Vec::new();
    for ((cafe_id, _), (kind, mut rows)) in by_key {
        if kind.is_batchable() {
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            for chunk in rows.chunks(max_batch.max(1)) {
                groups.push(DispatchGroup { cafe_id: cafe_id.clone(), kind, rows: chunk.to_vec() });
            }
        } else {
            for row in rows {
                groups.push(DispatchGroup { cafe_id: cafe_id.clone(), kind, rows: vec![row] });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_types::{RequestId, RequestStatus, TargetId};
    use chrono::Utc;

    fn row(cafe: &str, kind: RequestKind, n: u64) -> Request {
        Request {
            id: RequestId(n, 0),
            target_id: TargetId(format!("t{n}")),
            cafe_id: CafeId(cafe.to_string()),
            kind,
            created_at: Utc::now(),
            attempts: 0,
            status: RequestStatus::Pending,
        }
    }

    #[test]
    fn batches_store_rows_up_to_max_batch() {
        let rows: Vec<_> = (0..5).map(|n| row("cafe1", RequestKind::Store, n)).collect();
        let groups = group_for_dispatch(rows, 2);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[2].rows.len(), 1);
    }

    #[test]
    fn store_thread_rows_are_never_batched() {
        let rows: Vec<_> = (0..3).map(|n| row("cafe1", RequestKind::StoreThread, n)).collect();
        let groups = group_for_dispatch(rows, 50);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.rows.len() == 1));
    }

    #[test]
    fn groups_are_separate_per_cafe() {
        let rows = vec![row("cafe1", RequestKind::Store, 0), row("cafe2", RequestKind::Store, 1)];
        let groups = group_for_dispatch(rows, 50);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn store_and_unstore_are_separate_groups() {
        let rows = vec![row("cafe1", RequestKind::Store, 0), row("cafe1", RequestKind::Unstore, 1)];
        let groups = group_for_dispatch(rows, 50);
        assert_eq!(groups.len(), 2);
    }
}
