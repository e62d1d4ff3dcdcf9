use crate::aggregator::AggregateReport;
use crate::config::{OutputConfig, ReportFormat};
use crate::types::{DealSet, ReportWriter, Result, Sheet, TrackerError, Workbook};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEAL_TRACKER: &str = "Deal Tracker";
pub const EXECUTIVE_SUMMARY: &str = "Executive Summary";
pub const SECTOR_ANALYSIS: &str = "Sector Analysis";
pub const BUYER_ANALYSIS: &str = "Buyer Analysis";
pub const TECHNOLOGY_TRENDS: &str = "Technology Trends";
pub const GEOGRAPHIC_ANALYSIS: &str = "Geographic Analysis";
pub const MONTHLY_TRENDS: &str = "Monthly Trends";

const NOT_AVAILABLE: &str = "N/A";

/// Lays the deal set and its aggregates out as the seven report sheets.
pub fn build_workbook(
    deals: &DealSet,
    report: &AggregateReport,
    generated_at: DateTime<Utc>,
) -> Workbook {
    Workbook {
        title: format!("M&A Tracker {}", generated_at.format("%Y-%m-%d")),
        sheets: vec![
            deal_sheet(deals),
            summary_sheet(report),
            sector_sheet(report),
            buyer_sheet(report),
            technology_sheet(report),
            geography_sheet(report),
            monthly_sheet(report),
        ],
    }
}

fn deal_sheet(deals: &DealSet) -> Sheet {
    let mut sheet = Sheet::new(
        DEAL_TRACKER,
        &[
            "Date",
            "Headline",
            "Buyer",
            "Buyer Type",
            "Target",
            "Sector",
            "Technologies",
            "Geography",
            "Value (m)",
            "Currency",
            "Value Range",
            "Priority",
            "Alert Reasons",
            "Rationale",
            "Confidence",
            "Needs Review",
            "Source",
            "URL",
        ],
    );

    for deal in deals.iter() {
        let candidate = deal.candidate();
        sheet.push_row(vec![
            candidate.announced_at.format("%Y-%m-%d").to_string(),
            candidate.headline.clone(),
            candidate.buyer.clone().unwrap_or_default(),
            deal.deal.buyer_type.to_string(),
            candidate.target.clone(),
            deal.deal.sector.clone(),
            deal.deal.technologies.iter().cloned().collect::<Vec<_>>().join(", "),
            deal.deal.geography.clone(),
            candidate.value_millions.map(millions).unwrap_or_default(),
            candidate.currency.map(|c| c.to_string()).unwrap_or_default(),
            deal.value_range.clone(),
            deal.priority.to_string(),
            deal.alert_reasons.join("; "),
            candidate.rationale.clone(),
            format!("{:.2}", candidate.confidence),
            if candidate.needs_review { "Yes" } else { "No" }.to_string(),
            candidate.source.clone(),
            candidate.url.clone(),
        ]);
    }

    sheet
}

fn summary_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(EXECUTIVE_SUMMARY, &["Metric", "Value"]);
    let mut metric = |name: &str, value: String| sheet.push_row(vec![name.to_string(), value]);

    metric("Total Deals", report.total_deals.to_string());
    metric("Disclosed Deals", report.disclosed_deals.to_string());
    metric("Total Disclosed Value (m)", millions(report.total_disclosed_value_millions));
    metric(
        "Date Range",
        report
            .date_range
            .map(|r| format!("{} to {}", r.start, r.end))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    );
    metric(
        "Avg Deal Value (m)",
        report
            .average_disclosed_value_millions
            .map(millions)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    );
    metric("Most Active Buyer", or_na(report.most_active_buyer.as_deref()));
    metric(
        "Most Active Buyer Type",
        report
            .most_common_buyer_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    );
    metric("Top Sector", or_na(report.hottest_sector.as_deref()));
    metric("Geographic Focus", or_na(report.geographic_focus.as_deref()));

    for (priority, count) in &report.priority_counts {
        metric(&format!("{} Priority", priority), count.to_string());
    }
    for (label, count) in &report.by_value_range {
        metric(&format!("Value Range: {}", label), count.to_string());
    }

    sheet
}

fn sector_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(
        SECTOR_ANALYSIS,
        &["Sector", "Deals", "Disclosed Deals", "Total Value (m)", "Avg Value (m)"],
    );
    for (sector, summary) in &report.by_sector {
        let average = (summary.disclosed_deals > 0)
            .then(|| millions(summary.total_value_millions / summary.disclosed_deals as f64))
            .unwrap_or_default();
        sheet.push_row(vec![
            sector.clone(),
            summary.deals.to_string(),
            summary.disclosed_deals.to_string(),
            millions(summary.total_value_millions),
            average,
        ]);
    }
    sheet
}

fn buyer_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(
        BUYER_ANALYSIS,
        &["Buyer", "Buyer Type", "Deals", "Total Value (m)", "Sectors"],
    );
    for buyer in &report.buyers {
        sheet.push_row(vec![
            buyer.name.clone(),
            buyer.buyer_type.to_string(),
            buyer.deals.to_string(),
            millions(buyer.total_value_millions),
            buyer.sectors.join(", "),
        ]);
    }
    for (buyer_type, count) in &report.by_buyer_type {
        sheet.push_row(vec![
            format!("All {} buyers", buyer_type),
            buyer_type.clone(),
            count.to_string(),
            String::new(),
            String::new(),
        ]);
    }
    sheet
}

fn technology_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(TECHNOLOGY_TRENDS, &["Technology", "Deals"]);
    for tech in &report.technology_ranking {
        sheet.push_row(vec![tech.keyword.clone(), tech.deals.to_string()]);
    }
    sheet
}

fn geography_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(GEOGRAPHIC_ANALYSIS, &["Region", "Deals"]);
    for (region, count) in &report.by_geography {
        sheet.push_row(vec![region.clone(), count.to_string()]);
    }
    sheet
}

fn monthly_sheet(report: &AggregateReport) -> Sheet {
    let mut sheet = Sheet::new(MONTHLY_TRENDS, &["Month", "Deals", "Total Value (m)"]);
    for (month, summary) in &report.monthly {
        sheet.push_row(vec![
            month.clone(),
            summary.deals.to_string(),
            millions(summary.total_value_millions),
        ]);
    }
    sheet
}

fn millions(value: f64) -> String {
    format!("{:.1}", value)
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// One CSV file per sheet inside a report directory.
pub struct CsvReportWriter;

impl ReportWriter for CsvReportWriter {
    fn format_name(&self) -> &'static str {
        "csv"
    }

    fn write(&self, workbook: &Workbook, destination: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(destination)
            .map_err(|e| anyhow::anyhow!("Cannot create {}: {}", destination.display(), e))?;

        for sheet in &workbook.sheets {
            let path = destination.join(format!("{}.csv", sheet_file_stem(&sheet.name)));
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(&sheet.headers)?;
            for row in &sheet.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        Ok(destination.to_path_buf())
    }
}

/// The whole workbook as a single JSON document.
pub struct JsonReportWriter;

impl ReportWriter for JsonReportWriter {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn write(&self, workbook: &Workbook, destination: &Path) -> anyhow::Result<PathBuf> {
        let path = destination.with_extension("json");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(workbook)?)?;
        Ok(path)
    }
}

pub fn writer_for(format: ReportFormat) -> Box<dyn ReportWriter> {
    match format {
        ReportFormat::Csv => Box::new(CsvReportWriter),
        ReportFormat::Json => Box::new(JsonReportWriter),
    }
}

/// `<location>/<filename_pattern>` with `{date}` replaced by the run date.
pub fn output_path(output: &OutputConfig, now: DateTime<Utc>) -> PathBuf {
    let name = output
        .filename_pattern
        .replace("{date}", &now.format("%Y%m%d").to_string());
    output.location.join(name)
}

pub fn emit(workbook: &Workbook, output: &OutputConfig, now: DateTime<Utc>) -> Result<PathBuf> {
    let writer = writer_for(output.format);
    let destination = output_path(output, now);
    let written = writer.write(workbook, &destination).map_err(TrackerError::Report)?;
    info!("Wrote {} report to {}", writer.format_name(), written.display());
    Ok(written)
}

/// `Executive Summary` -> `executive_summary`
fn sheet_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
