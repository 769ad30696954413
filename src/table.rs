use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder},
    datatypes::{Field, Schema, SchemaRef},
    error::ArrowError,
    record_batch::RecordBatch,
};

use crate::{data::Value, schema::SemanticType};

pub fn arrow_schema(headers: &[String], types: &[SemanticType]) -> SchemaRef {
    let fields = headers
        .iter()
        .zip(types)
        .map(|(name, ty)| Field::new(name, ty.data_type(), true))
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
}

#[derive(Debug)]
pub enum ColumnBuilder {
    Text(StringBuilder),
    Integer(Int64Builder),
    Float(Float64Builder),
}

impl ColumnBuilder {
    pub fn with_capacity(ty: SemanticType, capacity: usize) -> Self {
        match ty {
            SemanticType::Text => ColumnBuilder::Text(StringBuilder::with_capacity(
                capacity,
                capacity.saturating_mul(16),
            )),
            SemanticType::Integer => ColumnBuilder::Integer(Int64Builder::with_capacity(capacity)),
            SemanticType::Float => ColumnBuilder::Float(Float64Builder::with_capacity(capacity)),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            ColumnBuilder::Text(_) => SemanticType::Text,
            ColumnBuilder::Integer(_) => SemanticType::Integer,
            ColumnBuilder::Float(_) => SemanticType::Float,
        }
    }

    pub fn append(&mut self, value: Value<'_>) {
        match (self, value) {
            (ColumnBuilder::Text(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Integer(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Float(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Text(b), Value::Text(s)) => b.append_value(s),
            (ColumnBuilder::Integer(b), Value::Integer(i)) => b.append_value(i),
            (ColumnBuilder::Float(b), Value::Float(f)) => b.append_value(f),
            (builder, value) => panic!(
                "Value {value:?} does not match {} column",
                builder.semantic_type()
            ),
        }
    }

    pub fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Text(b) => Arc::new(b.finish()),
            ColumnBuilder::Integer(b) => Arc::new(b.finish()),
            ColumnBuilder::Float(b) => Arc::new(b.finish()),
        }
    }
}

/// Accumulates rows for one schema and cuts them into record batches.
#[derive(Debug)]
pub struct BatchBuilder {
    schema: SchemaRef,
    columns: Vec<ColumnBuilder>,
    rows: usize,
}

impl BatchBuilder {
    pub fn new(headers: &[String], types: &[SemanticType], capacity: usize) -> Self {
        let columns = types
            .iter()
            .map(|ty| ColumnBuilder::with_capacity(*ty, capacity))
            .collect();
        Self {
            schema: arrow_schema(headers, types),
            columns,
            rows: 0,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Appends one row; `values` must hold one entry per column.
    pub fn append_row(&mut self, values: &[Value<'_>]) {
        debug_assert_eq!(values.len(), self.columns.len());
        for (builder, value) in self.columns.iter_mut().zip(values) {
            builder.append(*value);
        }
        self.rows += 1;
    }

    /// Drains the builders into a batch, leaving them empty for reuse.
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays = self
            .columns
            .iter_mut()
            .map(ColumnBuilder::finish)
            .collect::<Vec<_>>();
        self.rows = 0;
        RecordBatch::try_new(self.schema(), arrays)
    }
}
