use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// A single column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

/// Ordered collection of columns describing a tuple layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let name_to_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), i))
            .collect();
        Self {
            columns,
            name_to_index,
        }
    }

    /// Shorthand for an `Arc<Schema>` built from (name, type) pairs.
    pub fn shared(columns: Vec<(&str, DataType)>) -> Arc<Self> {
        Arc::new(Self::new(
            columns
                .into_iter()
                .map(|(name, data_type)| Column::new(name, data_type))
                .collect(),
        ))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Bytes needed for the tuple's null bitmap (one bit per column).
    pub fn null_bitmap_size(&self) -> usize {
        (self.column_count() + 7) / 8
    }

    /// Schema consisting of the given columns, in the given order.
    pub fn project(&self, column_indices: &[usize]) -> Option<Schema> {
        let columns = column_indices
            .iter()
            .map(|&i| self.columns.get(i).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(Schema::new(columns))
    }
}
