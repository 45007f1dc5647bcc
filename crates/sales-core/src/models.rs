use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Calendar month. Ordering follows the calendar, not the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All twelve months in calendar order.
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Full English month name, e.g. `"January"`.
    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Map a 1-based month number to a [`Month`].
    pub fn from_number(n: u32) -> Option<Month> {
        n.checked_sub(1)
            .and_then(|idx| Month::ALL.get(idx as usize).copied())
    }

    /// Case-insensitive lookup by full name.
    pub fn from_name(name: &str) -> Option<Month> {
        let needle = name.trim();
        Month::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One sales transaction read from the spreadsheet.
///
/// `year` and `month` are derived from `date` by [`Record::new`] and are
/// `None` exactly when `date` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<Month>,
    pub product: String,
    pub sales: f64,
    pub quantity: f64,
}

impl Record {
    pub fn new(
        date: Option<NaiveDate>,
        product: impl Into<String>,
        sales: f64,
        quantity: f64,
    ) -> Self {
        Self {
            date,
            year: date.map(|d| d.year()),
            month: date.and_then(|d| Month::from_number(d.month())),
            product: product.into(),
            sales,
            quantity,
        }
    }
}

/// Dimension used when grouping records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Year,
    Month,
    Product,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupKey::Year => "Year",
            GroupKey::Month => "Month",
            GroupKey::Product => "Product",
        };
        f.write_str(s)
    }
}

/// Selector state applied to a [`Dataset`]. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewFilter {
    pub year: Option<i32>,
    pub product: Option<String>,
    pub month: Option<Month>,
}

impl ViewFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_product(mut self, product: Option<String>) -> Self {
        self.product = product;
        self
    }

    pub fn with_month(mut self, month: Option<Month>) -> Self {
        self.month = month;
        self
    }

    /// `true` when no field restricts the view.
    pub fn is_unfiltered(&self) -> bool {
        self.year.is_none() && self.product.is_none() && self.month.is_none()
    }

    /// Returns `true` when `record` passes every set field.
    ///
    /// Records without a date never match a year or month restriction.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(year) = self.year {
            if record.year != Some(year) {
                return false;
            }
        }
        if let Some(product) = &self.product {
            if &record.product != product {
                return false;
            }
        }
        if let Some(month) = self.month {
            if record.month != Some(month) {
                return false;
            }
        }
        true
    }
}

/// Immutable, ordered set of records for one loaded spreadsheet.
///
/// Cloning is cheap; filtering produces a new dataset and leaves the source
/// untouched.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[Record]>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years present in the data, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().filter_map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct non-empty product labels in first-appearance order.
    pub fn products(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.records
            .iter()
            .map(|r| r.product.as_str())
            .filter(|p| !p.is_empty() && seen.insert(*p))
            .map(str::to_string)
            .collect()
    }

    /// Order-preserving subset of records passing `filter`.
    pub fn filter(&self, filter: &ViewFilter) -> Dataset {
        if filter.is_unfiltered() {
            return self.clone();
        }
        Dataset::new(
            self.records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
        )
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Dataset::new(Vec::new())
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Dataset::new(records)
    }
}
