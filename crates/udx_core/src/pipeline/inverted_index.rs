//! Two phase inverted index.
//!
//! Phase 1 (prepass) turns `(doc_id, text)` rows into per-document term
//! frequencies, partitioned by term and ordered by document. Phase 2 runs
//! once per term and emits the term's postings followed by a summary row
//! carrying the number of documents containing the term.
//!
//! Output rows are `(term, doc_id, term_freq, corp_freq)`. Posting rows have
//! a NULL `corp_freq`, the summary row has NULL `doc_id` and `term_freq`.

use indexmap::IndexMap;
use tracing::trace;
use udx_error::{Result, UdxError};

use super::phase::{MultiPhaseTransform, PhaseProcessor, TransformPhase};
use super::reader::PartitionReader;
use crate::arrays::datatype::DataType;
use crate::arrays::field::{ColumnRole, Field, PhaseSchema};
use crate::arrays::record::{Record, RowSink};
use crate::arrays::scalar::ScalarValue;

pub const INVERTED_INDEX_NAME: &str = "inverted_index";

/// Create the two phase inverted index transform.
pub fn inverted_index() -> MultiPhaseTransform {
    MultiPhaseTransform::new(
        INVERTED_INDEX_NAME,
        vec![Box::new(ForwardIndexPhase), Box::new(InvertedIndexPhase)],
    )
}

/// Input schema accepted by the transform, `(doc_id INT, text VARCHAR)`.
pub fn document_schema() -> PhaseSchema {
    PhaseSchema::arguments([
        Field::new("doc_id", DataType::Int64, false),
        Field::new("text", DataType::Utf8, true),
    ])
}

/// Argument column indices `(doc_id, text)`, validating the shape.
fn document_columns(schema: &PhaseSchema) -> Result<(usize, usize)> {
    let args = schema.argument_columns();
    if !schema.role_types_match(ColumnRole::Argument, &[DataType::is_integer, DataType::is_utf8]) {
        return Err(UdxError::schema(
            "Function expects exactly two arguments (INTEGER, VARCHAR)",
        )
        .with_field("input", schema));
    }
    Ok((args[0], args[1]))
}

/// Column indices `(term_freq, term, doc_id)` of the forward index rows.
fn forward_columns(schema: &PhaseSchema) -> Result<(usize, usize, usize)> {
    let matches = schema.role_types_match(ColumnRole::Argument, &[DataType::is_integer])
        && schema.role_types_match(ColumnRole::PartitionBy, &[DataType::is_utf8])
        && schema.role_types_match(ColumnRole::OrderBy, &[DataType::is_integer]);
    if !matches {
        return Err(UdxError::schema(
            "Function expects an argument (INTEGER) with analytic clause OVER(PBY VARCHAR OBY INTEGER)",
        )
        .with_field("input", schema));
    }
    Ok((
        schema.argument_columns()[0],
        schema.partition_columns()[0],
        schema.order_columns()[0],
    ))
}

fn forward_schema() -> PhaseSchema {
    PhaseSchema::default()
        .with_column(Field::new("term_freq", DataType::Int64, false), ColumnRole::Argument)
        .with_column(Field::new("term", DataType::Utf8, false), ColumnRole::PartitionBy)
        .with_column(Field::new("doc_id", DataType::Int64, false), ColumnRole::OrderBy)
}

fn postings_schema() -> PhaseSchema {
    PhaseSchema::arguments([
        Field::new("term", DataType::Utf8, false),
        Field::new("doc_id", DataType::Int64, true),
        Field::new("term_freq", DataType::Int64, true),
        Field::new("corp_freq", DataType::Int64, true),
    ])
}

/// Extracts terms from documents.
#[derive(Debug, Clone, Copy)]
pub struct ForwardIndexPhase;

impl TransformPhase for ForwardIndexPhase {
    fn name(&self) -> &'static str {
        "forward_index"
    }

    fn is_prepass(&self) -> bool {
        true
    }

    fn output_schema(&self, input: &PhaseSchema) -> Result<PhaseSchema> {
        document_columns(input)?;
        Ok(forward_schema())
    }

    fn create_processor(&self) -> Box<dyn PhaseProcessor> {
        Box::new(ForwardIndexBuilder)
    }
}

/// Emits `(term_freq, term, doc_id)` for every distinct term of every
/// document, in order of first occurrence within the document.
#[derive(Debug, Default)]
pub struct ForwardIndexBuilder;

impl PhaseProcessor for ForwardIndexBuilder {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut dyn RowSink,
    ) -> Result<()> {
        let (doc_col, text_col) = document_columns(reader.schema())?;
        let mut terms: IndexMap<String, i64> = IndexMap::new();

        loop {
            let row = reader.row();
            let doc_id = row
                .get_i64(doc_col)?
                .ok_or_else(|| UdxError::malformed("Document id must not be NULL"))?;

            if let Some(text) = row.get_str(text_col)? {
                for term in text.split_whitespace() {
                    *terms.entry(term.to_lowercase()).or_insert(0) += 1;
                }
            }

            for (term, freq) in terms.drain(..) {
                let out = Record::new([
                    ScalarValue::Int64(freq),
                    ScalarValue::Utf8(term),
                    ScalarValue::Int64(doc_id),
                ]);
                if !writer.write(out)? {
                    return Ok(());
                }
            }

            if !reader.next() {
                return Ok(());
            }
        }
    }
}

/// Groups documents per term.
#[derive(Debug, Clone, Copy)]
pub struct InvertedIndexPhase;

impl TransformPhase for InvertedIndexPhase {
    fn name(&self) -> &'static str {
        "inverted_index"
    }

    fn output_schema(&self, input: &PhaseSchema) -> Result<PhaseSchema> {
        forward_columns(input)?;
        Ok(postings_schema())
    }

    fn create_processor(&self) -> Box<dyn PhaseProcessor> {
        Box::new(InvertedIndexBuilder)
    }
}

/// Emits a term's postings followed by its corpus frequency.
#[derive(Debug, Default)]
pub struct InvertedIndexBuilder;

impl PhaseProcessor for InvertedIndexBuilder {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut dyn RowSink,
    ) -> Result<()> {
        let (freq_col, term_col, doc_col) = forward_columns(reader.schema())?;

        let term = reader
            .row()
            .get_str(term_col)?
            .ok_or_else(|| UdxError::malformed("Term must not be NULL"))?
            .to_string();

        let mut corp_freq: i64 = 0;
        let mut prev_doc: Option<i64> = None;

        loop {
            let row = reader.row();
            if row.get_str(term_col)? != Some(term.as_str()) {
                return Err(UdxError::contract("Partition contains rows for more than one term")
                    .with_field("term", &term));
            }

            let doc_id = row
                .get_i64(doc_col)?
                .ok_or_else(|| UdxError::malformed("Document id must not be NULL"))?;
            if prev_doc.is_some_and(|prev| doc_id < prev) {
                return Err(UdxError::contract("Partition not sorted by document id")
                    .with_field("term", &term)
                    .with_field("doc_id", doc_id));
            }
            prev_doc = Some(doc_id);

            let term_freq = row.get_i64(freq_col)?.ok_or_else(|| {
                UdxError::malformed("Term frequency must not be NULL")
                    .with_field("term", &term)
                    .with_field("doc_id", doc_id)
            })?;

            let out = Record::new([
                ScalarValue::Utf8(term.clone()),
                ScalarValue::Int64(doc_id),
                ScalarValue::Int64(term_freq),
                ScalarValue::Null,
            ]);
            corp_freq += 1;
            if !writer.write(out)? {
                return Ok(());
            }

            if !reader.next() {
                break;
            }
        }

        trace!(%term, corp_freq, "term postings complete");
        writer.write(Record::new([
            ScalarValue::Utf8(term),
            ScalarValue::Null,
            ScalarValue::Null,
            ScalarValue::Int64(corp_freq),
        ]))?;

        Ok(())
    }
}

/// A row of the inverted index output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posting {
    Document {
        term: String,
        doc_id: i64,
        term_freq: i64,
    },
    /// Trailing row of a term's partition.
    Summary { term: String, corp_freq: i64 },
}

impl Posting {
    pub fn from_record(record: &Record) -> Result<Self> {
        if record.arity() != 4 {
            return Err(UdxError::schema("Posting rows have four columns")
                .with_field("arity", record.arity()));
        }

        let term = record
            .get_str(0)?
            .ok_or_else(|| UdxError::malformed("Posting without term"))?
            .to_string();

        match (record.get_i64(1)?, record.get_i64(2)?, record.get_i64(3)?) {
            (Some(doc_id), Some(term_freq), None) => Ok(Posting::Document {
                term,
                doc_id,
                term_freq,
            }),
            (None, None, Some(corp_freq)) => Ok(Posting::Summary { term, corp_freq }),
            _ => Err(UdxError::malformed("Row is neither a posting nor a summary")
                .with_field("row", record)),
        }
    }

    pub fn term(&self) -> &str {
        match self {
            Posting::Document { term, .. } | Posting::Summary { term, .. } => term,
        }
    }
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;
    use crate::pipeline::reader::PartitionRows;
    use crate::record;

    #[test]
    fn forward_index_counts_per_document() {
        let mut reader = PartitionRows::try_new(
            document_schema(),
            vec![record![7_i64, "The cat  saw THE\tdog"], record![8_i64, None::<&str>]],
        )
        .unwrap();
        let mut out = Vec::new();
        ForwardIndexBuilder.process_partition(&mut reader, &mut out).unwrap();

        let expected = vec![
            record![2_i64, "the", 7_i64],
            record![1_i64, "cat", 7_i64],
            record![1_i64, "saw", 7_i64],
            record![1_i64, "dog", 7_i64],
        ];
        assert_eq!(expected, out);
    }

    #[test]
    fn forward_index_null_doc_id() {
        let mut reader =
            PartitionRows::try_new(document_schema(), vec![record![None::<i64>, "a"]]).unwrap();
        let err = ForwardIndexBuilder
            .process_partition(&mut reader, &mut Vec::new())
            .unwrap_err();
        assert_eq!(ErrorKind::MalformedInput, err.kind());
    }

    #[test]
    fn forward_phase_rejects_bad_input() {
        let three_args = document_schema().with_column(
            Field::new("extra", DataType::Int64, false),
            ColumnRole::Argument,
        );
        let err = ForwardIndexPhase.output_schema(&three_args).unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind());

        let swapped = PhaseSchema::arguments([
            Field::new("text", DataType::Utf8, false),
            Field::new("doc_id", DataType::Int64, false),
        ]);
        ForwardIndexPhase.output_schema(&swapped).unwrap_err();
    }

    #[test]
    fn inverted_phase_rejects_unpartitioned_input() {
        let err = InvertedIndexPhase
            .output_schema(&document_schema())
            .unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind());
    }

    #[test]
    fn inverted_builder_single_term() {
        let mut reader = PartitionRows::try_new(
            forward_schema(),
            vec![record![1_i64, "a", 1_i64], record![2_i64, "a", 3_i64]],
        )
        .unwrap();
        let mut out = Vec::new();
        InvertedIndexBuilder.process_partition(&mut reader, &mut out).unwrap();

        let expected = vec![
            record!["a", 1_i64, 1_i64, None::<i64>],
            record!["a", 3_i64, 2_i64, None::<i64>],
            record!["a", None::<i64>, None::<i64>, 2_i64],
        ];
        assert_eq!(expected, out);
    }

    #[test]
    fn inverted_builder_detects_mixed_terms() {
        let mut reader = PartitionRows::try_new(
            forward_schema(),
            vec![record![1_i64, "a", 1_i64], record![1_i64, "b", 2_i64]],
        )
        .unwrap();
        let err = InvertedIndexBuilder
            .process_partition(&mut reader, &mut Vec::new())
            .unwrap_err();
        assert_eq!(ErrorKind::Contract, err.kind());
    }

    #[test]
    fn inverted_builder_detects_unsorted() {
        let mut reader = PartitionRows::try_new(
            forward_schema(),
            vec![record![1_i64, "a", 5_i64], record![1_i64, "a", 2_i64]],
        )
        .unwrap();
        let err = InvertedIndexBuilder
            .process_partition(&mut reader, &mut Vec::new())
            .unwrap_err();
        assert_eq!(ErrorKind::Contract, err.kind());
    }

    #[test]
    fn inverted_builder_null_term_freq() {
        let mut reader = PartitionRows::try_new(
            forward_schema(),
            vec![record![1_i64, "a", 1_i64], record![None::<i64>, "a", 4_i64]],
        )
        .unwrap();
        let mut out = Vec::new();
        let err = InvertedIndexBuilder
            .process_partition(&mut reader, &mut out)
            .unwrap_err();
        assert_eq!(ErrorKind::MalformedInput, err.kind());
        assert_eq!(Some("4"), err.get_field("doc_id"));
        assert_eq!(vec![record!["a", 1_i64, 1_i64, None::<i64>]], out);
    }

    #[test]
    fn posting_from_record() {
        assert_eq!(
            Posting::Document {
                term: "a".to_string(),
                doc_id: 3,
                term_freq: 2
            },
            Posting::from_record(&record!["a", 3_i64, 2_i64, None::<i64>]).unwrap()
        );
        assert_eq!(
            Posting::Summary {
                term: "a".to_string(),
                corp_freq: 2
            },
            Posting::from_record(&record!["a", None::<i64>, None::<i64>, 2_i64]).unwrap()
        );
        Posting::from_record(&record!["a", 1_i64, None::<i64>, 2_i64]).unwrap_err();
    }
}
