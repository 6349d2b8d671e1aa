use anyhow::{bail, Result};
use marketscout_lib::summary::{CountRow, DatasetSummary};
use marketscout_lib::{CanonicalProduct, RunReport};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::xml_output;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
    Xml,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "table" => Self::Table,
            "json" => Self::Json,
            "csv" => Self::Csv,
            "markdown" | "md" => Self::Markdown,
            "xml" => Self::Xml,
            other => bail!(
                "unknown output format '{}' (expected table, json, csv, markdown or xml)",
                other
            ),
        })
    }
}

#[derive(Tabled, Serialize)]
struct ProductRow {
    #[tabled(rename = "Marketplace")]
    #[serde(rename = "Marketplace")]
    marketplace: String,
    #[tabled(rename = "Category")]
    #[serde(rename = "Category")]
    category: String,
    #[tabled(rename = "Title")]
    #[serde(rename = "Title")]
    title: String,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Currency")]
    #[serde(rename = "Currency")]
    currency: String,
    #[tabled(rename = "Supplier")]
    #[serde(rename = "Supplier")]
    supplier: String,
    #[tabled(rename = "URL")]
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Tabled, Serialize)]
struct CategoryRow {
    #[tabled(rename = "Marketplace")]
    #[serde(rename = "Marketplace")]
    marketplace: String,
    #[tabled(rename = "Category")]
    #[serde(rename = "Category")]
    category: String,
    #[tabled(rename = "Raw")]
    #[serde(rename = "Raw")]
    raw: usize,
    #[tabled(rename = "Accepted")]
    #[serde(rename = "Accepted")]
    accepted: usize,
}

#[derive(Tabled, Serialize)]
struct SummaryRow {
    #[tabled(rename = "Section")]
    #[serde(rename = "Section")]
    section: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Count")]
    #[serde(rename = "Count")]
    count: usize,
}

// -- Row builders --

fn build_product_rows(products: &[CanonicalProduct]) -> Vec<ProductRow> {
    products
        .iter()
        .map(|p| ProductRow {
            marketplace: p.marketplace.clone(),
            category: p.category.clone(),
            title: p.title.clone(),
            price: format_price(p.price_min, p.price_max),
            currency: p.currency.clone().unwrap_or_default(),
            supplier: p.supplier_name.clone().unwrap_or_default(),
            url: p.url.clone().unwrap_or_default(),
        })
        .collect()
}

fn build_category_rows(report: &RunReport) -> Vec<CategoryRow> {
    report
        .categories
        .iter()
        .map(|c| CategoryRow {
            marketplace: c.marketplace.clone(),
            category: c.category.clone(),
            raw: c.raw_count,
            accepted: c.accepted_count,
        })
        .collect()
}

fn build_summary_rows(summary: &DatasetSummary) -> Vec<SummaryRow> {
    let section = |name: &str, rows: &[CountRow]| -> Vec<SummaryRow> {
        rows.iter()
            .map(|r| SummaryRow {
                section: name.to_string(),
                name: r.name.clone(),
                count: r.count,
            })
            .collect()
    };
    let mut rows = section("marketplace", &summary.by_marketplace);
    rows.extend(section("category", &summary.by_category));
    rows.extend(section("supplier", &summary.top_suppliers));
    rows
}

// -- Products --

pub fn print_products(products: &[CanonicalProduct], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(build_product_rows(products), false),
        OutputFormat::Markdown => print_table(build_product_rows(products), true),
        OutputFormat::Csv => print_csv(build_product_rows(products))?,
        OutputFormat::Json => print_json(products),
        OutputFormat::Xml => println!("{}", xml_output::products_to_xml(products)?),
    }
    Ok(())
}

// -- Run report --

pub fn print_run_report(report: &RunReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Xml => println!("{}", xml_output::report_to_xml(report)?),
        OutputFormat::Csv => print_csv(build_category_rows(report))?,
        OutputFormat::Table | OutputFormat::Markdown => {
            print_table(
                build_category_rows(report),
                *format == OutputFormat::Markdown,
            );
            println!();
            println!("Raw candidates:   {}", report.total_raw());
            println!("Accepted:         {}", report.total_accepted());
            println!("Rejected:         {}", report.rejections.len());
            println!("Written (dedup):  {}", report.total_written);
            println!("JSONL:            {}", report.outputs.jsonl.display());
            println!("CSV:              {}", report.outputs.csv.display());
            if !report.skipped_marketplaces.is_empty() {
                println!(
                    "Skipped:          {}",
                    report.skipped_marketplaces.join(", ")
                );
            }
            println!(
                "Elapsed:          {}s",
                (report.finished_at - report.started_at).num_seconds()
            );
        }
    }
    Ok(())
}

// -- Dataset summary --

pub fn print_summary(summary: &DatasetSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Xml => println!("{}", xml_output::summary_to_xml(summary)?),
        OutputFormat::Csv => print_csv(build_summary_rows(summary))?,
        OutputFormat::Table | OutputFormat::Markdown => {
            let markdown = *format == OutputFormat::Markdown;
            println!("Products: {}", summary.total);
            for (title, rows) in [
                ("By marketplace", &summary.by_marketplace),
                ("By category", &summary.by_category),
                ("Top suppliers", &summary.top_suppliers),
            ] {
                println!();
                println!("{}", title);
                print_table(count_rows(rows), markdown);
            }
            println!();
            println!("{}", format_price_stats(summary));
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct NamedCount {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Count")]
    count: usize,
}

fn count_rows(rows: &[CountRow]) -> Vec<NamedCount> {
    rows.iter()
        .map(|r| NamedCount {
            name: r.name.clone(),
            count: r.count,
        })
        .collect()
}

fn format_price_stats(summary: &DatasetSummary) -> String {
    match &summary.price_min {
        Some(s) => format!(
            "price_min: count={} min={} max={} mean={:.2}",
            s.count,
            format_number(s.min),
            format_number(s.max),
            s.mean
        ),
        None => "price_min: no prices".to_string(),
    }
}

// -- Shared printers --

fn print_table<T: Tabled>(rows: Vec<T>, markdown: bool) {
    let mut table = Table::new(rows);
    if markdown {
        table.with(Style::markdown());
    }
    println!("{}", table);
}

fn print_csv<T: Serialize>(rows: Vec<T>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_price(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => format_number(lo),
        (Some(lo), Some(hi)) => format!("{} - {}", format_number(lo), format_number(hi)),
        (Some(v), None) | (None, Some(v)) => format_number(v),
        (None, None) => String::new(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
