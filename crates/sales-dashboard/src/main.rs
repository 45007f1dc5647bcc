mod bootstrap;
mod report;

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use sales_core::models::GroupKey;
use sales_core::settings::Settings;
use sales_data::aggregator::{SalesAggregator, DEFAULT_TOP_N};
use sales_runtime::session::Session;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Sales Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Year: {}, Product: {}",
        settings.view,
        settings.year,
        settings.product
    );

    let path = settings.data_file()?;
    let session = Session::load(path).with_context(|| {
        format!(
            "could not load {}; the file needs Date, Product, Sales and Quantity columns",
            path.display()
        )
    })?;
    let session = session
        .with_year(settings.year_selection()?)
        .with_product(settings.product_selection());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_view(&session, &settings, &mut out)
}

/// Write the view named by `settings.view`.
///
/// The view can come from a hand-edited `last_used.json`, so an unknown name
/// is an error rather than a silent no-op.
fn render_view(session: &Session, settings: &Settings, out: &mut impl Write) -> Result<()> {
    match settings.view.as_str() {
        "summary" => write_summary(session, settings.json, out)?,

        "table" => {
            let view = session.view();
            if settings.json {
                serde_json::to_writer_pretty(&mut *out, view.records())?;
                writeln!(out)?;
            } else {
                let source = session
                    .source()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                write!(out, "{}", report::render_header(&source, session.filter()))?;
                write!(out, "{}", report::render_records(view.records(), settings.limit))?;
            }
        }

        "ask" => {
            if settings.question.is_empty() {
                let stdin = std::io::stdin();
                answer_lines(session, stdin.lock(), out, settings.json)?;
            } else {
                for question in &settings.question {
                    write_answer(session, question, out, settings.json)?;
                }
            }
        }

        unknown => bail!("unknown view mode \"{unknown}\"; expected summary, table or ask"),
    }

    Ok(())
}

/// Metrics, yearly and monthly breakdowns and the top products for the
/// current selectors.
fn write_summary(session: &Session, json: bool, out: &mut impl Write) -> Result<()> {
    let view = session.view();
    let metrics = session.metrics();
    let by_year = session.breakdown(GroupKey::Year);
    let by_month = session.breakdown(GroupKey::Month);
    let top = SalesAggregator::top_n(view.records(), DEFAULT_TOP_N);

    if json {
        let doc = serde_json::json!({
            "filter": session.filter(),
            "load": session.load_stats(),
            "metrics": metrics,
            "by_year": by_year,
            "by_month": by_month,
            "top_products": top,
            "year_options": session.year_options(),
            "product_options": session.product_options(),
        });
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        return Ok(());
    }

    let source = session
        .source()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    write!(out, "{}", report::render_header(&source, session.filter()))?;
    writeln!(out)?;
    write!(out, "{}", report::render_metrics(&metrics))?;
    writeln!(out)?;
    write!(out, "{}", report::render_groups("Sales by Year", "Year", &by_year))?;
    writeln!(out)?;
    write!(out, "{}", report::render_groups("Sales by Month", "Month", &by_month))?;
    writeln!(out)?;
    write!(out, "{}", report::render_groups("Top Products", "Product", &top))?;
    Ok(())
}

/// Answer one question per non-blank input line until EOF.
fn answer_lines(
    session: &Session,
    input: impl BufRead,
    out: &mut impl Write,
    json: bool,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        write_answer(session, question, out, json)?;
        out.flush()?;
    }
    Ok(())
}

fn write_answer(session: &Session, question: &str, out: &mut impl Write, json: bool) -> Result<()> {
    let result = session.ask(question);
    if json {
        serde_json::to_writer(&mut *out, &result)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", report::render_answer(&result))?;
    }
    Ok(())
}
