//! Low-performer and top-performer selection
//!
//! Creative generation only needs the worst campaigns and a handful of
//! reference creatives, so both lists are bounded top-K selections over grouped
//! rows rather than full sorts:
//!
//! - [`low_ctr_campaigns`]: current-window rows below the CTR threshold, grouped
//!   by campaign, highest spend first
//! - [`top_performers`]: creative types clearing both the CTR and ROAS floors,
//!   best ROAS first (CTR breaks ties)
//!
//! Selection keeps a min-heap of the K best groups: O(N log K).

use crate::comparison::Period;
use crate::dataset::{CleanTable, Record};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

/// Aggregated current-window performance of one underperforming campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPerformance {
    /// Campaign identifier
    pub campaign_name: String,
    /// Rows aggregated
    pub rows: usize,
    /// Mean per-row CTR
    pub mean_ctr: f64,
    /// Mean per-row ROAS
    pub mean_roas: f64,
    /// Total spend
    pub spend: f64,
    /// Total impressions
    pub impressions: u64,
}

/// Aggregated performance of one creative type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativePerformance {
    /// Creative format
    pub creative_type: String,
    /// Rows aggregated
    pub rows: usize,
    /// Mean per-row CTR
    pub mean_ctr: f64,
    /// Mean per-row ROAS
    pub mean_roas: f64,
    /// Total spend
    pub spend: f64,
    /// Total revenue
    pub revenue: f64,
}

#[allow(clippy::cast_precision_loss)]
fn mean(rows: &[&Record], f: impl Fn(&Record) -> f64) -> f64 {
    if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| f(r)).sum::<f64>() / rows.len() as f64
    }
}

/// Campaigns whose current-window rows fall below `low_ctr_threshold`,
/// highest spend first, at most `limit`.
#[must_use]
pub fn low_ctr_campaigns(
    table: &CleanTable,
    window: &Period,
    low_ctr_threshold: f64,
    limit: usize,
) -> Vec<CampaignPerformance> {
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in table.records() {
        if window.contains(record.date) && record.ctr < low_ctr_threshold {
            groups.entry(record.campaign_name.as_str()).or_default().push(record);
        }
    }

    let candidates: Vec<CampaignPerformance> = groups
        .into_iter()
        .map(|(campaign, rows)| CampaignPerformance {
            campaign_name: campaign.to_string(),
            rows: rows.len(),
            mean_ctr: mean(&rows, |r| r.ctr),
            mean_roas: mean(&rows, |r| r.roas),
            spend: rows.iter().map(|r| r.spend).sum(),
            impressions: rows.iter().map(|r| r.impressions).sum(),
        })
        .collect();

    let selected = top_k_by(candidates, limit, |c| c.spend);
    tracing::debug!(
        selected = selected.len(),
        threshold = low_ctr_threshold,
        "low-CTR campaigns selected"
    );
    selected
}

/// Creative types with mean CTR ≥ `low_ctr_threshold` and mean ROAS ≥
/// `low_roas_threshold`, best ROAS first, at most `limit`.
#[must_use]
pub fn top_performers(
    table: &CleanTable,
    low_ctr_threshold: f64,
    low_roas_threshold: f64,
    limit: usize,
) -> Vec<CreativePerformance> {
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in table.records() {
        groups.entry(record.creative_type.as_str()).or_default().push(record);
    }

    let candidates: Vec<CreativePerformance> = groups
        .into_iter()
        .map(|(creative_type, rows)| CreativePerformance {
            creative_type: creative_type.to_string(),
            rows: rows.len(),
            mean_ctr: mean(&rows, |r| r.ctr),
            mean_roas: mean(&rows, |r| r.roas),
            spend: rows.iter().map(|r| r.spend).sum(),
            revenue: rows.iter().map(|r| r.revenue).sum(),
        })
        .filter(|c| c.mean_ctr >= low_ctr_threshold && c.mean_roas >= low_roas_threshold)
        .collect();

    top_k_by(candidates, limit, |c| (c.mean_roas, c.mean_ctr))
}

/// Heap entry ordered by key, earlier input first on ties.
struct Ranked<K> {
    key: K,
    index: usize,
}

impl<K: PartialOrd> PartialEq for Ranked<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd> Eq for Ranked<K> {}

impl<K: PartialOrd> Ord for Ranked<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .partial_cmp(&other.key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl<K: PartialOrd> PartialOrd for Ranked<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` items with the largest key, largest first.
fn top_k_by<T, K: PartialOrd>(items: Vec<T>, k: usize, key: impl Fn(&T) -> K) -> Vec<T> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked<K>>> = BinaryHeap::with_capacity(k + 1);
    for (index, item) in items.iter().enumerate() {
        let ranked = Ranked {
            key: key(item),
            index,
        };
        if heap.len() < k {
            heap.push(Reverse(ranked));
        } else if heap.peek().is_some_and(|Reverse(worst)| ranked > *worst) {
            heap.pop();
            heap.push(Reverse(ranked));
        }
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    heap.into_sorted_vec()
        .into_iter()
        .filter_map(|Reverse(ranked)| slots[ranked.index].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::PeriodWindows;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_top_k_by_orders_and_bounds() {
        let items = vec![3.0, 9.0, 1.0, 7.0, 5.0];
        assert_eq!(top_k_by(items.clone(), 3, |v| *v), vec![9.0, 7.0, 5.0]);
        assert_eq!(top_k_by(items.clone(), 10, |v| *v).len(), 5);
        assert!(top_k_by(items, 0, |v| *v).is_empty());
    }

    #[test]
    fn test_top_k_by_ties_keep_input_order() {
        let items = vec![("a", 1), ("b", 2), ("c", 2), ("d", 2)];
        let top: Vec<&str> = top_k_by(items, 2, |item| item.1)
            .into_iter()
            .map(|item| item.0)
            .collect();
        assert_eq!(top, vec!["b", "c"]);
    }

    #[test]
    fn test_low_ctr_campaigns_by_spend() {
        let table = CleanTable::new(vec![
            // 0.5% CTR, spend 100
            Record::new("Cheap", day(10), "facebook", "image", 100.0, 1000, 5, 50.0),
            // 0.2% CTR, spend 400
            Record::new("Pricey", day(11), "facebook", "image", 400.0, 1000, 2, 50.0),
            // 3% CTR: healthy
            Record::new("Fine", day(11), "facebook", "video", 400.0, 1000, 30, 900.0),
            // Low CTR but in the baseline window
            Record::new("Old", day(2), "facebook", "image", 999.0, 1000, 1, 1.0),
        ]);
        let windows = PeriodWindows::ending_at(day(12), 7).unwrap();

        let low = low_ctr_campaigns(&table, &windows.current, 0.01, 5);
        let names: Vec<&str> = low.iter().map(|c| c.campaign_name.as_str()).collect();
        assert_eq!(names, vec!["Pricey", "Cheap"]);
        assert!((low[0].mean_ctr - 0.002).abs() < 1e-12);

        assert_eq!(low_ctr_campaigns(&table, &windows.current, 0.01, 1).len(), 1);
    }

    #[test]
    fn test_top_performers_filters_floors() {
        let table = CleanTable::new(vec![
            Record::new("A", day(1), "facebook", "video", 100.0, 1000, 30, 400.0),
            Record::new("A", day(1), "facebook", "carousel", 100.0, 1000, 20, 600.0),
            // ROAS below 1
            Record::new("A", day(1), "facebook", "image", 100.0, 1000, 30, 50.0),
            // CTR below 1%
            Record::new("A", day(1), "facebook", "story", 100.0, 1000, 2, 900.0),
        ]);

        let top = top_performers(&table, 0.01, 1.0, 10);
        let types: Vec<&str> = top.iter().map(|c| c.creative_type.as_str()).collect();
        assert_eq!(types, vec!["carousel", "video"]);
    }
}
