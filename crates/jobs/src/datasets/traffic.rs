use anyhow::Result;
use gitpulse_core::{
    merge::merge_traffic,
    models::RepoTarget,
    records::{Clones, DailyCount, DatasetKind, Record, Views},
    store,
};

use crate::{JobContext, SyncStatus, remote};

/// A traffic series served under `traffic/<KIND>`.
pub trait TrafficSeries: DatasetKind {
    const KIND: &'static str;

    fn from_list(list: Vec<DailyCount>) -> Self;

    fn list_mut(&mut self) -> &mut Vec<DailyCount>;
}

impl TrafficSeries for Clones {
    const KIND: &'static str = "clones";

    fn from_list(list: Vec<DailyCount>) -> Self { Self { list } }

    fn list_mut(&mut self) -> &mut Vec<DailyCount> { &mut self.list }
}

impl TrafficSeries for Views {
    const KIND: &'static str = "views";

    fn from_list(list: Vec<DailyCount>) -> Self { Self { list } }

    fn list_mut(&mut self) -> &mut Vec<DailyCount> { &mut self.list }
}

pub async fn sync<T: TrafficSeries>(ctx: &JobContext, target: &RepoTarget) -> Result<SyncStatus> {
    let (stored, fresh) = tokio::try_join!(
        store::load::<T>(ctx.store.as_ref(), target.repo_id),
        remote::fetch_traffic(ctx, target, T::KIND),
    )?;
    let Some(mut record) = stored else {
        let record = Record::new(target, T::from_list(fresh));
        store::save(ctx.store.as_ref(), &target.org_name, &record).await?;
        return Ok(SyncStatus::Created);
    };
    if fresh.is_empty() {
        return Ok(SyncStatus::Unchanged);
    }
    let merged = merge_traffic(std::mem::take(record.data.list_mut()), fresh);
    if let Some(dropped) = merged.dropped_uncovered() {
        tracing::warn!(
            "Discarding stored {} entry {} ({}) for {:?}: not present in the fresh window",
            T::KIND,
            dropped.date,
            dropped.count,
            target
        );
    }
    *record.data.list_mut() = merged.list;
    store::save(ctx.store.as_ref(), &target.org_name, &record).await?;
    Ok(SyncStatus::Merged)
}
