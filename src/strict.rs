use std::path::Path;

use csv::StringRecord;
use log::debug;

use crate::{
    columnar,
    convert::{ConvertOptions, Outcome},
    data::{self, Value},
    error::{ConvertError, ConvertResult},
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
    let mut reader = io_utils::open_csv_reader(io_utils::open_input(input)?, options.delimiter);
    let headers = io_utils::read_headers(&mut reader, input, false)?;
    for missing in schema.unmatched_columns(&headers) {
        debug!("Declared column '{missing}' is not in the header; skipping");
    }

    let records = load_records(&mut reader)?;
    debug!("Loaded {} row(s) from '{}'", records.len(), input.display());
    let types = resolve_types(schema, &headers, &records);

    let mut builder = BatchBuilder::new(&headers, &types, records.len());
    let mut values: Vec<Value<'_>> = Vec::with_capacity(headers.len());
    for (row_idx, record) in records.iter().enumerate() {
        values.clear();
        for (col_idx, ty) in types.iter().enumerate() {
            let raw = record.get(col_idx).unwrap_or_default();
            let value = data::coerce(raw, *ty).ok_or_else(|| ConvertError::Coercion {
                line: record_line(record, row_idx),
                column: headers[col_idx].clone(),
                value: raw.to_string(),
                expected: *ty,
            })?;
            values.push(value);
        }
        builder.append_row(&values);
    }
    let batch = builder.finish()?;

    let staged = StagedOutput::new(output);
    let mut writer = columnar::open_writer(staged.create()?, batch.schema(), batch.num_rows())?;
    writer.write(&batch)?;
    writer.close()?;
    staged.commit()?;

    Ok(Outcome {
        rows_read: batch.num_rows() as u64,
        rows_written: batch.num_rows() as u64,
        columns: headers.len(),
    })
}

fn load_records<R: std::io::Read>(reader: &mut csv::Reader<R>) -> ConvertResult<Vec<StringRecord>> {
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(record_error)?);
    }
    Ok(records)
}

fn resolve_types(
    schema: &ColumnSchema,
    headers: &[String],
    records: &[StringRecord],
) -> Vec<SemanticType> {
    schema
        .projection_for(headers)
        .into_iter()
        .enumerate()
        .map(|(idx, declared)| match declared {
            Some(ty) => ty,
            None => {
                let inferred = data::infer_type(
                    records
                        .iter()
                        .map(|record| record.get(idx).unwrap_or_default()),
                );
                debug!("Inferred {inferred} for undeclared column '{}'", headers[idx]);
                inferred
            }
        })
        .collect()
}

fn record_line(record: &StringRecord, row_idx: usize) -> u64 {
    record
        .position()
        .map(|pos| pos.line())
        .unwrap_or(row_idx as u64 + 2)
}

fn record_error(err: csv::Error) -> ConvertError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        return ConvertError::MalformedRecord {
            line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    ConvertError::Csv(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn ragged_row_is_reported_with_its_line() {
        let input = csv_file("a,b\n1,2\n3\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.parquet");
        let err = convert(
            input.path(),
            &output,
            &ColumnSchema::empty(),
            &ConvertOptions::default(),
        )
        .unwrap_err();
        match err {
            ConvertError::MalformedRecord {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn undeclared_columns_are_inferred_over_every_row() {
        let records = vec![
            StringRecord::from(vec!["1", "1"]),
            StringRecord::from(vec!["2", "2.5"]),
        ];
        let headers = vec!["a".to_string(), "b".to_string()];
        let types = resolve_types(&ColumnSchema::empty(), &headers, &records);
        assert_eq!(types, vec![SemanticType::Integer, SemanticType::Float]);
    }
}
