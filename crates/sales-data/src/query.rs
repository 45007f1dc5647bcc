//! Keyword-driven answers to free-text questions about a dataset.
//!
//! A question is lowercased, scanned for years, a product name and a month
//! name, then checked against [`RULES`] in order. The first rule whose
//! keywords all appear handles the question; later rules are never consulted,
//! even when their keywords are present too.

use regex::Regex;
use sales_core::formatting::{format_change, format_currency, percentage_change};
use sales_core::models::{Dataset, GroupKey, Month, ViewFilter};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{GroupTotal, SalesAggregator, DEFAULT_TOP_N};

// ── Intent ────────────────────────────────────────────────────────────────────

/// Which rule produced a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Total,
    Compare,
    Show,
    Top,
    Unknown,
}

// ── QueryEntities ─────────────────────────────────────────────────────────────

/// Values pulled out of the question text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryEntities {
    /// Every `20xx` found, in order of appearance.
    pub years: Vec<i32>,
    /// First known product whose name occurs in the question.
    pub product: Option<String>,
    /// First month (in calendar order) whose name occurs in the question.
    pub month: Option<Month>,
}

impl QueryEntities {
    /// Extract entities from `question`. Matching is case-insensitive.
    ///
    /// Products are tried in the dataset's first-appearance order and months
    /// January to December; only the first hit of each is kept.
    pub fn extract(question: &str, dataset: &Dataset) -> Self {
        let lowered = question.to_lowercase();

        let re = Regex::new(r"20\d{2}").expect("regex is valid");
        let years = re
            .find_iter(&lowered)
            .filter_map(|m| m.as_str().parse::<i32>().ok())
            .collect();

        let product = dataset
            .products()
            .into_iter()
            .find(|p| lowered.contains(&p.to_lowercase()));

        let month = Month::ALL
            .into_iter()
            .find(|m| lowered.contains(&m.name().to_lowercase()));

        Self {
            years,
            product,
            month,
        }
    }

    /// The year used for filtering: the first one mentioned.
    pub fn primary_year(&self) -> Option<i32> {
        self.years.first().copied()
    }
}

// ── Answer ────────────────────────────────────────────────────────────────────

/// Sales for one year in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub sales: f64,
}

/// A rule matched but could not run with what the question provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum QueryWarning {
    /// Comparison needs exactly two years; `found` were mentioned.
    CompareNeedsTwoYears { found: usize },
    /// "show" needs "month" or "year" to pick the grouping.
    ShowNeedsDimension,
}

/// Computed outcome of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Total {
        value: f64,
        filter: ViewFilter,
    },
    Comparison {
        first: YearTotal,
        second: YearTotal,
        /// `(second - first) / first * 100`, or `0` when `first` is zero.
        change_pct: f64,
    },
    Series {
        dimension: GroupKey,
        filter: ViewFilter,
        points: Vec<GroupTotal>,
    },
    Ranking {
        year: Option<i32>,
        entries: Vec<GroupTotal>,
    },
    Warning {
        warning: QueryWarning,
    },
    Unrecognized,
}

impl Answer {
    /// User-facing text for this answer.
    pub fn message(&self) -> String {
        match self {
            Answer::Total { value, filter } => {
                format!("Total sales{}: {}", describe_scope(filter), format_currency(*value))
            }
            Answer::Comparison {
                first,
                second,
                change_pct,
            } => format!(
                "Sales in {}: {} | Sales in {}: {} | Change: {}",
                first.year,
                format_currency(first.sales),
                second.year,
                format_currency(second.sales),
                format_change(*change_pct),
            ),
            Answer::Series {
                dimension,
                filter,
                points,
            } => {
                let header = format!("Sales by {}{}", dimension, describe_scope(filter));
                if points.is_empty() {
                    return format!("{header}: no matching sales");
                }
                let lines: Vec<String> = points
                    .iter()
                    .map(|p| format!("  {}: {}", p.key, format_currency(p.sales)))
                    .collect();
                format!("{header}:\n{}", lines.join("\n"))
            }
            Answer::Ranking { year, entries } => {
                let scope = year.map(|y| format!(" in {y}")).unwrap_or_default();
                if entries.is_empty() {
                    return format!("Top products{scope}: no matching sales");
                }
                let lines: Vec<String> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("  {}. {}: {}", i + 1, e.key, format_currency(e.sales)))
                    .collect();
                format!("Top {} products{scope}:\n{}", entries.len(), lines.join("\n"))
            }
            Answer::Warning { warning } => match warning {
                QueryWarning::CompareNeedsTwoYears { found } => format!(
                    "Please mention exactly two years to compare (found {found})."
                ),
                QueryWarning::ShowNeedsDimension => {
                    "Please say whether to show sales by month or by year.".to_string()
                }
            },
            Answer::Unrecognized => "Sorry, I couldn't understand the question. Try \
                 \"total sales in 2023\", \"compare sales 2022 and 2023\", \
                 \"show sales by month\" or \"top products\"."
                .to_string(),
        }
    }
}

/// `" for Widget in March 2023"` style suffix; empty when unfiltered.
fn describe_scope(filter: &ViewFilter) -> String {
    let mut scope = String::new();
    if let Some(product) = &filter.product {
        scope.push_str(&format!(" for {product}"));
    }
    match (filter.month, filter.year) {
        (Some(m), Some(y)) => scope.push_str(&format!(" in {m} {y}")),
        (Some(m), None) => scope.push_str(&format!(" in {m}")),
        (None, Some(y)) => scope.push_str(&format!(" in {y}")),
        (None, None) => {}
    }
    scope
}

// ── QueryResult ───────────────────────────────────────────────────────────────

/// Full result of one question: the rule that fired, what was extracted and
/// the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub question: String,
    pub intent: Intent,
    pub entities: QueryEntities,
    pub answer: Answer,
}

impl QueryResult {
    pub fn message(&self) -> String {
        self.answer.message()
    }

    /// `true` for unmet-precondition and unrecognised-question responses.
    pub fn is_warning(&self) -> bool {
        matches!(self.answer, Answer::Warning { .. } | Answer::Unrecognized)
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Inputs available to a rule handler.
pub struct QueryContext<'a> {
    /// The question, lowercased.
    pub question: &'a str,
    pub entities: &'a QueryEntities,
    pub dataset: &'a Dataset,
}

/// A keyword predicate paired with the handler it guards.
pub struct Rule {
    pub intent: Intent,
    pub matches: fn(&str) -> bool,
    pub run: fn(&QueryContext<'_>) -> Answer,
}

/// Rules in priority order. The first whose predicate holds wins.
pub const RULES: [Rule; 4] = [
    Rule {
        intent: Intent::Total,
        matches: |q| q.contains("total") && q.contains("sale"),
        run: run_total,
    },
    Rule {
        intent: Intent::Compare,
        matches: |q| q.contains("compare") && q.contains("sale"),
        run: run_compare,
    },
    Rule {
        intent: Intent::Show,
        matches: |q| q.contains("show") && q.contains("sale"),
        run: run_show,
    },
    Rule {
        intent: Intent::Top,
        matches: |q| q.contains("top") || q.contains("best"),
        run: run_top,
    },
];

/// Answer `question` against `dataset`.
pub fn answer_question(question: &str, dataset: &Dataset) -> QueryResult {
    let lowered = question.to_lowercase();
    let entities = QueryEntities::extract(&lowered, dataset);

    let ctx = QueryContext {
        question: &lowered,
        entities: &entities,
        dataset,
    };

    let (intent, answer) = match RULES.iter().find(|rule| (rule.matches)(&lowered)) {
        Some(rule) => (rule.intent, (rule.run)(&ctx)),
        None => (Intent::Unknown, Answer::Unrecognized),
    };

    debug!(
        ?intent,
        years = ?entities.years,
        product = ?entities.product,
        month = ?entities.month,
        "answered question"
    );

    QueryResult {
        question: question.to_string(),
        intent,
        entities,
        answer,
    }
}

fn run_total(ctx: &QueryContext<'_>) -> Answer {
    let filter = ViewFilter::new()
        .with_year(ctx.entities.primary_year())
        .with_product(ctx.entities.product.clone())
        .with_month(ctx.entities.month);
    let view = ctx.dataset.filter(&filter);

    Answer::Total {
        value: SalesAggregator::total_sales(view.records()),
        filter,
    }
}

fn run_compare(ctx: &QueryContext<'_>) -> Answer {
    let [y1, y2] = ctx.entities.years[..] else {
        return Answer::Warning {
            warning: QueryWarning::CompareNeedsTwoYears {
                found: ctx.entities.years.len(),
            },
        };
    };

    let year_sales = |year: i32| {
        let view = ctx.dataset.filter(&ViewFilter::new().with_year(Some(year)));
        SalesAggregator::total_sales(view.records())
    };
    let (s1, s2) = (year_sales(y1), year_sales(y2));

    Answer::Comparison {
        first: YearTotal { year: y1, sales: s1 },
        second: YearTotal { year: y2, sales: s2 },
        change_pct: percentage_change(s1, s2),
    }
}

fn run_show(ctx: &QueryContext<'_>) -> Answer {
    let dimension = if ctx.question.contains("month") {
        GroupKey::Month
    } else if ctx.question.contains("year") {
        GroupKey::Year
    } else {
        return Answer::Warning {
            warning: QueryWarning::ShowNeedsDimension,
        };
    };

    // The extracted month is not applied here.
    let filter = ViewFilter::new()
        .with_year(ctx.entities.primary_year())
        .with_product(ctx.entities.product.clone());
    let view = ctx.dataset.filter(&filter);

    Answer::Series {
        dimension,
        points: SalesAggregator::group_sum(view.records(), dimension),
        filter,
    }
}

fn run_top(ctx: &QueryContext<'_>) -> Answer {
    // Only the year narrows a ranking; product and month are ignored.
    let year = ctx.entities.primary_year();
    let view = ctx.dataset.filter(&ViewFilter::new().with_year(year));

    Answer::Ranking {
        year,
        entries: SalesAggregator::top_n(view.records(), DEFAULT_TOP_N),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sales_core::models::Record;

    fn rec(date: &str, product: &str, sales: f64) -> Record {
        Record::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            product,
            sales,
            1.0,
        )
    }

    /// 2022 sums to 100, 2023 to 250.
    fn two_year_dataset() -> Dataset {
        Dataset::new(vec![
            rec("2022-01-10", "Widget", 60.0),
            rec("2022-03-05", "Gadget", 40.0),
            rec("2023-01-20", "Widget", 150.0),
            rec("2023-03-14", "Gadget", 70.0),
            rec("2023-07-01", "Laptop Stand", 30.0),
        ])
    }

    fn total_value(result: &QueryResult) -> f64 {
        match &result.answer {
            Answer::Total { value, .. } => *value,
            other => panic!("expected total, got {other:?}"),
        }
    }

    // ── entity extraction ─────────────────────────────────────────────────────

    #[test]
    fn test_extract_years_in_order() {
        let e = QueryEntities::extract("compare 2023 with 2021 and 1999", &Dataset::default());
        assert_eq!(e.years, vec![2023, 2021]);
        assert_eq!(e.primary_year(), Some(2023));
    }

    #[test]
    fn test_extract_product_case_insensitive() {
        let e = QueryEntities::extract("How did WIDGET do?", &two_year_dataset());
        assert_eq!(e.product.as_deref(), Some("Widget"));
    }

    #[test]
    fn test_extract_product_first_in_dataset_order() {
        let e = QueryEntities::extract("gadget versus widget", &two_year_dataset());
        assert_eq!(e.product.as_deref(), Some("Widget"));
    }

    #[test]
    fn test_extract_month_calendar_priority() {
        let e = QueryEntities::extract("march or january?", &Dataset::default());
        assert_eq!(e.month, Some(Month::January));
    }

    #[test]
    fn test_extract_nothing() {
        let e = QueryEntities::extract("hello", &two_year_dataset());
        assert_eq!(e, QueryEntities::default());
    }

    // ── Total ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_total_sales_for_year() {
        let result = answer_question("total sales in 2023", &two_year_dataset());
        assert_eq!(result.intent, Intent::Total);
        assert!((total_value(&result) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_sales_all_rows() {
        let result = answer_question("What are the TOTAL SALES?", &two_year_dataset());
        assert!((total_value(&result) - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_applies_product_and_month() {
        let result = answer_question("total widget sales in january 2023", &two_year_dataset());
        assert!((total_value(&result) - 150.0).abs() < 1e-9);
        assert_eq!(result.message(), "Total sales for Widget in January 2023: $150.00");
    }

    #[test]
    fn test_total_wins_over_top() {
        let result = answer_question("total sales of top products", &two_year_dataset());
        assert_eq!(result.intent, Intent::Total);
    }

    // ── Compare ───────────────────────────────────────────────────────────────

    #[test]
    fn test_compare_two_years() {
        let result = answer_question("compare sales 2022 and 2023", &two_year_dataset());
        assert_eq!(result.intent, Intent::Compare);
        match result.answer {
            Answer::Comparison {
                first,
                second,
                change_pct,
            } => {
                assert_eq!(first.year, 2022);
                assert!((first.sales - 100.0).abs() < 1e-9);
                assert_eq!(second.year, 2023);
                assert!((second.sales - 250.0).abs() < 1e-9);
                assert_eq!(format_change(change_pct), "+150.00%");
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_compare_zero_base_reports_zero_change() {
        let ds = Dataset::new(vec![rec("2023-05-05", "Widget", 250.0)]);
        let result = answer_question("compare sales 2022 and 2023", &ds);
        match result.answer {
            Answer::Comparison {
                first, change_pct, ..
            } => {
                assert_eq!(first.sales, 0.0);
                assert_eq!(change_pct, 0.0);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_compare_needs_two_years() {
        let result = answer_question("compare sales for 2023", &two_year_dataset());
        assert_eq!(result.intent, Intent::Compare);
        assert!(result.is_warning());
        assert_eq!(
            result.answer,
            Answer::Warning {
                warning: QueryWarning::CompareNeedsTwoYears { found: 1 }
            }
        );
    }

    #[test]
    fn test_compare_rejects_three_years() {
        let result = answer_question("compare sales 2021 2022 2023", &two_year_dataset());
        assert!(matches!(
            result.answer,
            Answer::Warning {
                warning: QueryWarning::CompareNeedsTwoYears { found: 3 }
            }
        ));
    }

    /// Compare keys on both "compare" and "sale". This phrasing names two
    /// years and reads like a comparison, but it must still fall through.
    #[test]
    fn test_compare_without_sales_keyword_is_unrecognized() {
        let result = answer_question("compare 2022 and 2023", &two_year_dataset());
        assert_eq!(result.intent, Intent::Unknown);
    }

    // ── Show ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_show_by_month_calendar_order() {
        let result = answer_question("show sales by month", &two_year_dataset());
        match result.answer {
            Answer::Series {
                dimension, points, ..
            } => {
                assert_eq!(dimension, GroupKey::Month);
                let keys: Vec<&str> = points.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["January", "March", "July"]);
            }
            other => panic!("expected series, got {other:?}"),
        }
    }

    #[test]
    fn test_show_by_year_with_product_filter() {
        let result = answer_question("show gadget sales per year", &two_year_dataset());
        match result.answer {
            Answer::Series { points, .. } => {
                assert_eq!(points.len(), 2);
                assert!((points[0].sales - 40.0).abs() < 1e-9);
                assert!((points[1].sales - 70.0).abs() < 1e-9);
            }
            other => panic!("expected series, got {other:?}"),
        }
    }

    #[test]
    fn test_show_for_missing_year_is_empty_series() {
        let result = answer_question("show sales by month in 2024", &two_year_dataset());
        match &result.answer {
            Answer::Series { points, .. } => assert!(points.is_empty()),
            other => panic!("expected series, got {other:?}"),
        }
        assert!(!result.is_warning());
    }

    #[test]
    fn test_show_ignores_month_filter() {
        let result = answer_question("show sales by year for march", &two_year_dataset());
        assert_eq!(result.entities.month, Some(Month::March));
        match result.answer {
            Answer::Series { points, .. } => {
                assert!((points[1].sales - 250.0).abs() < 1e-9);
            }
            other => panic!("expected series, got {other:?}"),
        }
    }

    #[test]
    fn test_show_needs_dimension() {
        let result = answer_question("show me the sales", &two_year_dataset());
        assert_eq!(result.intent, Intent::Show);
        assert_eq!(
            result.answer,
            Answer::Warning {
                warning: QueryWarning::ShowNeedsDimension
            }
        );
    }

    // ── Top ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_top_products_ranked() {
        let result = answer_question("top products", &two_year_dataset());
        assert_eq!(result.intent, Intent::Top);
        match result.answer {
            Answer::Ranking { year, entries } => {
                assert!(year.is_none());
                let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
                assert_eq!(keys, vec!["Widget", "Gadget", "Laptop Stand"]);
            }
            other => panic!("expected ranking, got {other:?}"),
        }
    }

    #[test]
    fn test_best_keyword_with_year() {
        let result = answer_question("best sellers in 2022", &two_year_dataset());
        match result.answer {
            Answer::Ranking { year, entries } => {
                assert_eq!(year, Some(2022));
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].key, "Widget");
            }
            other => panic!("expected ranking, got {other:?}"),
        }
    }

    #[test]
    fn test_top_ignores_product_filter() {
        let result = answer_question("is gadget among the top?", &two_year_dataset());
        assert_eq!(result.entities.product.as_deref(), Some("Gadget"));
        match result.answer {
            Answer::Ranking { entries, .. } => assert_eq!(entries.len(), 3),
            other => panic!("expected ranking, got {other:?}"),
        }
    }

    #[test]
    fn test_top_keyword_matches_inside_words() {
        // "laptop" contains "top".
        let result = answer_question("laptop stand numbers", &two_year_dataset());
        assert_eq!(result.intent, Intent::Top);
    }

    // ── Fallback ──────────────────────────────────────────────────────────────

    #[test]
    fn test_unrecognized_question() {
        let result = answer_question("what's the weather like?", &two_year_dataset());
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.answer, Answer::Unrecognized);
        assert!(result.is_warning());
        assert!(result.message().starts_with("Sorry"));
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let intents: Vec<Intent> = RULES.iter().map(|r| r.intent).collect();
        assert_eq!(
            intents,
            vec![Intent::Total, Intent::Compare, Intent::Show, Intent::Top]
        );
    }

    // ── messages ──────────────────────────────────────────────────────────────

    #[test]
    fn test_comparison_message() {
        let result = answer_question("compare sales 2022 and 2023", &two_year_dataset());
        assert_eq!(
            result.message(),
            "Sales in 2022: $100.00 | Sales in 2023: $250.00 | Change: +150.00%"
        );
    }

    #[test]
    fn test_empty_series_message() {
        let result = answer_question("show sales by month in 2024", &two_year_dataset());
        assert_eq!(result.message(), "Sales by Month in 2024: no matching sales");
    }

    #[test]
    fn test_answer_serializes_with_kind_tag() {
        let result = answer_question("total sales in 2023", &two_year_dataset());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["intent"], "total");
        assert_eq!(json["answer"]["kind"], "total");
        assert_eq!(json["answer"]["value"], 250.0);
    }
}
