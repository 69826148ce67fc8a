//! Tab separated input and output for the transform commands.

use std::io::Write;
use std::path::Path;

use udx_core::arrays::datatype::DataType;
use udx_core::arrays::field::{ColumnRole, Field, PhaseSchema};
use udx_core::arrays::record::Record;
use udx_core::arrays::scalar::ScalarValue;
use udx_error::{Result, ResultExt, UdxError};

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .map_err(|e| {
            UdxError::resource("Failed to open input")
                .with_field("path", path.display())
                .with_source(e)
        })
}

fn parse_int(field: Option<&str>, line: u64, column: &str) -> Result<Option<i64>> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e| {
            UdxError::malformed(format!("Invalid integer in column '{column}'"))
                .with_field("line", line)
                .with_field("value", s)
                .with_source(e)
        }),
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Read `doc_id<TAB>text` lines. A missing text column is a NULL document.
pub fn read_documents(path: &Path) -> Result<Vec<Record>> {
    let mut rows = Vec::new();
    for record in reader(path)?.records() {
        let record = record.context_fn(|| format!("Failed to read {}", path.display()))?;
        let line = line_of(&record);
        let doc_id = parse_int(record.get(0), line, "doc_id")?.ok_or_else(|| {
            UdxError::malformed("Document id must not be empty").with_field("line", line)
        })?;
        rows.push(Record::new([
            ScalarValue::Int64(doc_id),
            ScalarValue::from(record.get(1)),
        ]));
    }
    Ok(rows)
}

/// Schema of the rows produced by [`read_series`].
pub fn series_schema(with_offset: bool) -> PhaseSchema {
    let schema = PhaseSchema::default()
        .with_column(Field::new("group", DataType::Utf8, false), ColumnRole::PartitionBy)
        .with_column(Field::new("order", DataType::Int64, false), ColumnRole::OrderBy)
        .with_column(Field::new("value", DataType::Int64, true), ColumnRole::Argument);
    if with_offset {
        schema.with_column(Field::new("offset", DataType::Int64, false), ColumnRole::Argument)
    } else {
        schema
    }
}

/// Read `group<TAB>order<TAB>value` lines, appending `offset` as a constant
/// column when given. An empty value is NULL.
pub fn read_series(path: &Path, offset: Option<i64>) -> Result<Vec<Record>> {
    let mut rows = Vec::new();
    for record in reader(path)?.records() {
        let record = record.context_fn(|| format!("Failed to read {}", path.display()))?;
        let line = line_of(&record);
        if record.len() < 2 {
            return Err(UdxError::malformed("Expected at least group and order columns")
                .with_field("line", line));
        }

        let order = parse_int(record.get(1), line, "order")?
            .ok_or_else(|| UdxError::malformed("Order must not be empty").with_field("line", line))?;
        let mut values = vec![
            ScalarValue::from(record.get(0).unwrap_or_default()),
            ScalarValue::Int64(order),
            ScalarValue::from(parse_int(record.get(2), line, "value")?),
        ];
        if let Some(offset) = offset {
            values.push(ScalarValue::Int64(offset));
        }
        rows.push(Record::new(values));
    }
    Ok(rows)
}

/// Write rows tab separated, NULLs as empty fields.
pub fn write_rows(rows: &[Record], out: impl Write) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(out);
    for row in rows {
        let fields = row.values().iter().map(|v| match v {
            ScalarValue::Null => String::new(),
            v => v.to_string(),
        });
        writer.write_record(fields).context("Failed to write row")?;
    }
    writer.flush()?;
    Ok(())
}
