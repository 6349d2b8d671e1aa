use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::io::Cursor;

use marketscout_lib::summary::DatasetSummary;
use marketscout_lib::{CanonicalProduct, RunReport};

/// Singularize array field names for XML child elements.
fn singular(field: &str) -> &str {
    match field {
        "categories" => "category",
        "rejections" => "rejection",
        "skipped_marketplaces" => "marketplace",
        "by_marketplace" | "by_category" | "top_suppliers" => "entry",
        _ => field,
    }
}

/// Recursively write a serde_json::Value as XML elements.
fn write_value<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &serde_json::Value,
) -> Result<(), quick_xml::Error> {
    match value {
        // Null fields are omitted entirely.
        serde_json::Value::Null => {}
        serde_json::Value::Bool(b) => {
            write_text(writer, tag, if *b { "true" } else { "false" })?;
        }
        serde_json::Value::Number(n) => {
            write_text(writer, tag, &n.to_string())?;
        }
        serde_json::Value::String(s) => {
            write_text(writer, tag, s)?;
        }
        serde_json::Value::Array(arr) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            let child_tag = singular(tag);
            for item in arr {
                write_value(writer, child_tag, item)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        serde_json::Value::Object(map) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            for (key, val) in map {
                write_value(writer, key, val)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
    }
    Ok(())
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn new_document() -> Result<Writer<Cursor<Vec<u8>>>, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

fn finish(writer: Writer<Cursor<Vec<u8>>>) -> anyhow::Result<String> {
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Serialize a slice of Serialize items into an XML string.
fn items_to_xml<T: Serialize>(root_tag: &str, item_tag: &str, items: &[T]) -> anyhow::Result<String> {
    let mut writer = new_document()?;
    if items.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(root_tag)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(root_tag)))?;
        for item in items {
            let val = serde_json::to_value(item)?;
            write_value(&mut writer, item_tag, &val)?;
        }
        writer.write_event(Event::End(BytesEnd::new(root_tag)))?;
    }
    finish(writer)
}

/// Serialize a single Serialize value as the document root.
fn object_to_xml<T: Serialize>(root_tag: &str, value: &T) -> anyhow::Result<String> {
    let mut writer = new_document()?;
    let val = serde_json::to_value(value)?;
    write_value(&mut writer, root_tag, &val)?;
    finish(writer)
}

pub fn products_to_xml(products: &[CanonicalProduct]) -> anyhow::Result<String> {
    items_to_xml("products", "product", products)
}

pub fn report_to_xml(report: &RunReport) -> anyhow::Result<String> {
    object_to_xml("run", report)
}

pub fn summary_to_xml(summary: &DatasetSummary) -> anyhow::Result<String> {
    object_to_xml("summary", summary)
}
