//! Sales aggregation by year, month and product.

use std::collections::{BTreeMap, HashMap};

use sales_core::models::{GroupKey, Month, Record};
use serde::Serialize;

/// Number of products reported by a default top-N ranking.
pub const DEFAULT_TOP_N: usize = 5;

// ── GroupTotal ────────────────────────────────────────────────────────────────

/// Sales and quantity totals for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupTotal {
    /// Group label, e.g. `"2023"`, `"March"` or a product name.
    pub key: String,
    pub sales: f64,
    pub quantity: f64,
    /// Number of records folded into this group.
    pub count: u32,
}

impl GroupTotal {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    fn add_record(&mut self, record: &Record) {
        self.sales += record.sales;
        self.quantity += record.quantity;
        self.count += 1;
    }
}

// ── DashboardMetrics ──────────────────────────────────────────────────────────

/// Headline numbers shown above the data table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_sales: f64,
    pub total_quantity: f64,
    /// Best-selling product by sales, if any product is named.
    pub top_product: Option<GroupTotal>,
    pub record_count: usize,
}

// ── SalesAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that totals and groups sales records.
pub struct SalesAggregator;

impl SalesAggregator {
    /// Sum of `sales` over `rows`; `0.0` for no rows.
    pub fn total_sales(rows: &[Record]) -> f64 {
        rows.iter().map(|r| r.sales).sum()
    }

    /// Sum of `quantity` over `rows`.
    pub fn total_quantity(rows: &[Record]) -> f64 {
        rows.iter().map(|r| r.quantity).sum()
    }

    /// Group `rows` by `key` and total each group.
    ///
    /// * `Year` → ascending years
    /// * `Month` → calendar order, January first
    /// * `Product` → order of first appearance
    ///
    /// Rows without a value for `key` (no date, blank product) are left out,
    /// and no group is produced for values absent from the data.
    pub fn group_sum(rows: &[Record], key: GroupKey) -> Vec<GroupTotal> {
        match key {
            GroupKey::Year => Self::aggregate_sorted(rows, |r| r.year, |y| y.to_string()),
            GroupKey::Month => Self::aggregate_sorted(rows, |r| r.month, |m: &Month| {
                m.name().to_string()
            }),
            GroupKey::Product => Self::aggregate_by_product(rows),
        }
    }

    /// The `n` best-selling products, highest first.
    ///
    /// Equal totals keep the order in which the products first appear.
    pub fn top_n(rows: &[Record], n: usize) -> Vec<GroupTotal> {
        let mut products = Self::aggregate_by_product(rows);
        // Stable sort keeps first-encountered order among ties.
        products.sort_by(|a, b| b.sales.total_cmp(&a.sales));
        products.truncate(n);
        products
    }

    /// Headline metrics for `rows`.
    pub fn summary(rows: &[Record]) -> DashboardMetrics {
        DashboardMetrics {
            total_sales: Self::total_sales(rows),
            total_quantity: Self::total_quantity(rows),
            top_product: Self::top_n(rows, 1).into_iter().next(),
            record_count: rows.len(),
        }
    }

    /// Fold a set of groups back into one total.
    pub fn calculate_totals(groups: &[GroupTotal]) -> GroupTotal {
        let mut totals = GroupTotal::new("Total");
        for group in groups {
            totals.sales += group.sales;
            totals.quantity += group.quantity;
            totals.count += group.count;
        }
        totals
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Group by an ordered key; `BTreeMap` yields the groups sorted.
    fn aggregate_sorted<K: Ord>(
        rows: &[Record],
        key_fn: impl Fn(&Record) -> Option<K>,
        label_fn: impl Fn(&K) -> String,
    ) -> Vec<GroupTotal> {
        let mut map: BTreeMap<K, GroupTotal> = BTreeMap::new();

        for record in rows {
            let Some(key) = key_fn(record) else {
                continue;
            };
            map.entry(key)
                .or_insert_with_key(|k| GroupTotal::new(label_fn(k)))
                .add_record(record);
        }

        map.into_values().collect()
    }

    fn aggregate_by_product(rows: &[Record]) -> Vec<GroupTotal> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<GroupTotal> = Vec::new();

        for record in rows.iter().filter(|r| !r.product.is_empty()) {
            let slot = *index.entry(record.product.as_str()).or_insert_with(|| {
                groups.push(GroupTotal::new(record.product.clone()));
                groups.len() - 1
            });
            groups[slot].add_record(record);
        }

        groups
    }
}
