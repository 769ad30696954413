//! Streaming conversion that drops rows it cannot read.
//!
//! Quote characters are data here, so a stray quote cannot shift field
//! boundaries.

use std::{fs::File, io::Read, path::Path};

use csv::ByteRecord;
use log::{debug, trace};
use parquet::arrow::ArrowWriter;

use crate::{
    columnar::{self, DEFAULT_MAX_ROW_GROUP_ROWS},
    convert::{ConvertOptions, Outcome},
    data::{self, TypeCandidate, Value},
    error::ConvertResult,
    io_utils::{self, StagedOutput},
    schema::{ColumnSchema, SemanticType},
    table::BatchBuilder,
};

pub(crate) fn convert(
    input: &Path,
    output: &Path,
    schema: &ColumnSchema,
    options: &ConvertOptions,
) -> ConvertResult<Outcome> {
    let mut reader =
        io_utils::open_literal_csv_reader(io_utils::open_input(input)?, options.delimiter);
    let headers = io_utils::read_headers(&mut reader, input, true)?;
    for missing in schema.unmatched_columns(&headers) {
        debug!("Declared column '{missing}' is not in the header; skipping");
    }
    let projection = schema.projection_for(&headers);

    let sample = read_sample(&mut reader, options.sample_rows)?;
    let types = infer_projection(&headers, &projection, &sample);
    debug!(
        "Sampled {} row(s) from '{}' to type {} undeclared column(s)",
        sample.len(),
        input.display(),
        projection.iter().filter(|ty| ty.is_none()).count()
    );

    let staged = StagedOutput::new(output);
    let batch_rows = options.batch_rows.max(1);
    let builder = BatchBuilder::new(&headers, &types, batch_rows);
    let writer = columnar::open_writer(
        staged.create()?,
        builder.schema(),
        DEFAULT_MAX_ROW_GROUP_ROWS,
    )?;
    let mut sink = RowSink {
        types,
        builder,
        writer,
        batch_rows,
        outcome: Outcome {
            columns: headers.len(),
            ..Outcome::default()
        },
    };

    for record in &sample {
        sink.push(record)?;
    }
    drop(sample);

    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        sink.push(&record)?;
    }

    let outcome = sink.finish()?;
    staged.commit()?;
    Ok(outcome)
}

fn read_sample<R: Read>(reader: &mut csv::Reader<R>, limit: usize) -> ConvertResult<Vec<ByteRecord>> {
    let mut sample = Vec::with_capacity(limit.min(DEFAULT_MAX_ROW_GROUP_ROWS));
    let mut record = ByteRecord::new();
    while sample.len() < limit && reader.read_byte_record(&mut record)? {
        sample.push(record.clone());
    }
    Ok(sample)
}

/// Fills undeclared positions from the well-formed rows of the sample.
fn infer_projection(
    headers: &[String],
    projection: &[Option<SemanticType>],
    sample: &[ByteRecord],
) -> Vec<SemanticType> {
    let mut candidates = vec![TypeCandidate::new(); headers.len()];
    for record in sample.iter().filter(|r| r.len() == headers.len()) {
        let Some(fields) = utf8_fields(record) else {
            continue;
        };
        for (idx, field) in fields.into_iter().enumerate() {
            if projection[idx].is_none() {
                candidates[idx].observe(data::strip_enclosing_quotes(field));
            }
        }
    }
    projection
        .iter()
        .zip(&candidates)
        .zip(headers)
        .map(|((declared, candidate), name)| match declared {
            Some(ty) => *ty,
            None => {
                let inferred = candidate.decide();
                debug!("Inferred {inferred} for undeclared column '{name}'");
                inferred
            }
        })
        .collect()
}

fn utf8_fields(record: &ByteRecord) -> Option<Vec<&str>> {
    record
        .iter()
        .map(|field| std::str::from_utf8(field).ok())
        .collect()
}

/// Coerces one record, or `None` if any field does not fit.
fn coerce_row<'r>(record: &'r ByteRecord, types: &[SemanticType]) -> Option<Vec<Value<'r>>> {
    if record.len() != types.len() {
        return None;
    }
    record
        .iter()
        .zip(types)
        .map(|(field, ty)| {
            let text = std::str::from_utf8(field).ok()?;
            data::coerce_literal(text, *ty)
        })
        .collect()
}

struct RowSink {
    types: Vec<SemanticType>,
    builder: BatchBuilder,
    writer: ArrowWriter<File>,
    batch_rows: usize,
    outcome: Outcome,
}

impl RowSink {
    fn push(&mut self, record: &ByteRecord) -> ConvertResult<()> {
        self.outcome.rows_read += 1;
        match coerce_row(record, &self.types) {
            Some(values) => {
                self.builder.append_row(&values);
                self.outcome.rows_written += 1;
                if self.builder.len() >= self.batch_rows {
                    self.flush()?;
                }
            }
            None => trace!(
                "Dropping malformed row at line {}",
                record.position().map(|p| p.line()).unwrap_or_default()
            ),
        }
        Ok(())
    }

    fn flush(&mut self) -> ConvertResult<()> {
        if self.builder.is_empty() {
            return Ok(());
        }
        let batch = self.builder.finish()?;
        self.writer.write(&batch)?;
        Ok(())
    }

    fn finish(mut self) -> ConvertResult<Outcome> {
        self.flush()?;
        self.writer.close()?;
        Ok(self.outcome)
    }
}
