//! Per-upload session state.
//!
//! A [`Session`] pairs the immutable dataset loaded from one spreadsheet with
//! the current year/product selector values. Every interaction, questions
//! included, recomputes its view from the base dataset; nothing is updated
//! incrementally and the dataset is never mutated.

use std::path::{Path, PathBuf};

use sales_core::models::{Dataset, GroupKey, ViewFilter};
use sales_core::settings::ALL;
use sales_core::Result;
use sales_data::aggregator::{DashboardMetrics, GroupTotal, SalesAggregator};
use sales_data::loader::{load_dataset, LoadStats};
use sales_data::query::{answer_question, QueryResult};

/// Loaded spreadsheet plus selector state.
#[derive(Debug, Clone)]
pub struct Session {
    source: Option<PathBuf>,
    dataset: Dataset,
    stats: LoadStats,
    filter: ViewFilter,
}

impl Session {
    /// Load `path` into a new, unfiltered session.
    ///
    /// A spreadsheet without the required columns is rejected here.
    pub fn load(path: &Path) -> Result<Self> {
        let outcome = load_dataset(path)?;
        tracing::debug!(
            rows = outcome.dataset.len(),
            years = ?outcome.dataset.years(),
            "session loaded"
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            dataset: outcome.dataset,
            stats: outcome.stats,
            filter: ViewFilter::default(),
        })
    }

    /// Wrap an already-built dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let stats = LoadStats {
            rows_read: dataset.len(),
            rows_loaded: dataset.len(),
            ..Default::default()
        };
        Self {
            source: None,
            dataset,
            stats,
            filter: ViewFilter::default(),
        }
    }

    // ── Selectors ─────────────────────────────────────────────────────────

    /// Same data with the year selector set (`None` = All).
    pub fn with_year(&self, year: Option<i32>) -> Self {
        let mut next = self.clone();
        next.filter.year = year;
        next
    }

    /// Same data with the product selector set (`None` = All).
    pub fn with_product(&self, product: Option<String>) -> Self {
        if let Some(p) = &product {
            if !self.offers_product(p) {
                tracing::warn!("Product \"{}\" does not occur in the selected year", p);
            }
        }
        let mut next = self.clone();
        next.filter.product = product;
        next
    }

    /// Choices for the year selector: `"All"` then each year present.
    pub fn year_options(&self) -> Vec<String> {
        std::iter::once(ALL.to_string())
            .chain(self.dataset.years().into_iter().map(|y| y.to_string()))
            .collect()
    }

    /// Choices for the product selector: `"All"` then each product in the
    /// year-filtered data.
    pub fn product_options(&self) -> Vec<String> {
        let by_year = self
            .dataset
            .filter(&ViewFilter::new().with_year(self.filter.year));
        std::iter::once(ALL.to_string())
            .chain(by_year.products())
            .collect()
    }

    /// Whether `product` is one of the current [`Session::product_options`].
    pub fn offers_product(&self, product: &str) -> bool {
        self.product_options()
            .iter()
            .skip(1)
            .any(|known| known == product)
    }

    // ── Views ─────────────────────────────────────────────────────────────

    /// Rows passing the current selectors, in original order.
    pub fn view(&self) -> Dataset {
        self.dataset.filter(&self.filter)
    }

    /// Headline metrics for the current view.
    pub fn metrics(&self) -> DashboardMetrics {
        SalesAggregator::summary(self.view().records())
    }

    /// Current view grouped by `key`.
    pub fn breakdown(&self, key: GroupKey) -> Vec<GroupTotal> {
        SalesAggregator::group_sum(self.view().records(), key)
    }

    /// Answer a free-text question against the current view, so answers
    /// agree with the metrics shown for the same selectors.
    pub fn ask(&self, question: &str) -> QueryResult {
        answer_question(question, &self.view())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn load_stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
