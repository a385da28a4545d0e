use std::sync::Arc;

use super::{Schema, Value};

/// A materialized row: a schema plus one value per column.
///
/// On disk a tuple is a null bitmap followed by each column's encoding in
/// schema order; null columns are recorded in the bitmap and occupy their
/// filler encoding so offsets stay computable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.column_count(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serializes the tuple. Returns None when a value does not fit its
    /// column type.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let mut bytes = vec![0u8; self.schema.null_bitmap_size()];

        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        for (value, column) in self.values.iter().zip(self.schema.columns()) {
            bytes.extend(value.serialize(column.data_type())?);
        }
        Some(bytes)
    }

    /// Reconstructs a tuple from its serialized form.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Option<Self> {
        let bitmap_size = schema.null_bitmap_size();
        if data.len() < bitmap_size {
            return None;
        }
        let bitmap = &data[..bitmap_size];
        let mut offset = bitmap_size;

        let mut values = Vec::with_capacity(schema.column_count());
        for (i, column) in schema.columns().enumerate() {
            let (value, consumed) = Value::deserialize(&data[offset..], column.data_type())?;
            offset += consumed;
            if bitmap[i / 8] & (1 << (i % 8)) != 0 {
                values.push(Value::Null);
            } else {
                values.push(value);
            }
        }

        Some(Tuple { schema, values })
    }

    /// Extracts the given columns into a new tuple over the projected
    /// schema.
    pub fn project(&self, column_indices: &[usize]) -> Option<Tuple> {
        let schema = Arc::new(self.schema.project(column_indices)?);
        let values = column_indices
            .iter()
            .map(|&i| self.values.get(i).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(Tuple::new(schema, values))
    }

    /// Serializes the given columns back-to-back, the canonical form index
    /// keys are built from.
    pub fn key_bytes(&self, column_indices: &[usize]) -> Option<Vec<u8>> {
        let mut bytes = Vec::new();
        for &i in column_indices {
            let value = self.values.get(i)?;
            let column = self.schema.column(i)?;
            bytes.extend(value.serialize(column.data_type())?);
        }
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::DataType;

    fn sample_schema() -> Arc<Schema> {
        Schema::shared(vec![
            ("id", DataType::Integer),
            ("name", DataType::VarChar(32)),
            ("score", DataType::BigInt),
        ])
    }

    #[test]
    fn test_tuple_round_trip() {
        let schema = sample_schema();
        let tuple = Tuple::new(
            Arc::clone(&schema),
            vec![
                Value::Integer(7),
                Value::Varchar("alice".into()),
                Value::BigInt(1000),
            ],
        );

        let bytes = tuple.to_bytes().unwrap();
        let decoded = Tuple::from_bytes(schema, &bytes).unwrap();
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn test_tuple_round_trip_with_null() {
        let schema = sample_schema();
        let tuple = Tuple::new(
            Arc::clone(&schema),
            vec![Value::Integer(7), Value::Null, Value::BigInt(-1)],
        );

        let bytes = tuple.to_bytes().unwrap();
        let decoded = Tuple::from_bytes(schema, &bytes).unwrap();
        assert!(decoded.value(1).unwrap().is_null());
        assert_eq!(decoded.value(2), Some(&Value::BigInt(-1)));
    }

    #[test]
    fn test_tuple_project() {
        let schema = sample_schema();
        let tuple = Tuple::new(
            schema,
            vec![
                Value::Integer(7),
                Value::Varchar("alice".into()),
                Value::BigInt(1000),
            ],
        );

        let projected = tuple.project(&[2, 0]).unwrap();
        assert_eq!(projected.values(), &[Value::BigInt(1000), Value::Integer(7)]);
        assert_eq!(projected.schema().column(0).unwrap().name(), "score");
    }

    #[test]
    fn test_tuple_key_bytes() {
        let schema = sample_schema();
        let tuple = Tuple::new(
            schema,
            vec![
                Value::Integer(7),
                Value::Varchar("alice".into()),
                Value::BigInt(1000),
            ],
        );

        let key = tuple.key_bytes(&[0]).unwrap();
        assert_eq!(key, 7i32.to_le_bytes().to_vec());
    }
}
