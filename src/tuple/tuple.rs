use crate::common::Result;

use super::{Schema, Value};

/// One row of values.
///
/// Tuples are schema-less in memory; a [`Schema`] is supplied when
/// serializing to or from page storage, where the layout is a null
/// bitmap followed by fixed-width column slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    pub fn value(&self, index: usize) -> &Value {
        &self.values[index]
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Concatenates two tuples, as join executors do for output rows.
    pub fn join(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.values.clone();
        values.extend(right.values.iter().cloned());
        Tuple::new(values)
    }

    /// Serializes this tuple into the schema's fixed-width layout.
    pub fn to_bytes(&self, schema: &Schema) -> Result<Vec<u8>> {
        assert_eq!(self.values.len(), schema.num_columns());

        let mut bytes = vec![0u8; schema.tuple_size()];
        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                bytes[i / 8] |= 1 << (i % 8);
            }
            let offset = schema.column_offset(i);
            let width = schema.column(i).fixed_size();
            value.serialize_into(schema.column(i).data_type(), &mut bytes[offset..offset + width])?;
        }
        Ok(bytes)
    }

    /// Reads a tuple back from the schema's fixed-width layout.
    pub fn from_bytes(schema: &Schema, bytes: &[u8]) -> Tuple {
        assert_eq!(bytes.len(), schema.tuple_size());

        let mut values = Vec::with_capacity(schema.num_columns());
        for i in 0..schema.num_columns() {
            if bytes[i / 8] & (1 << (i % 8)) != 0 {
                values.push(Value::Null);
                continue;
            }
            let offset = schema.column_offset(i);
            let width = schema.column(i).fixed_size();
            values.push(Value::deserialize_from(
                schema.column(i).data_type(),
                &bytes[offset..offset + width],
            ));
        }
        Tuple::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Column, DataType};

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Varchar(8)),
            Column::new("score", DataType::BigInt),
        ])
    }

    #[test]
    fn test_tuple_round_trip() {
        let schema = sample_schema();
        let tuple = Tuple::new(vec![
            Value::Integer(7),
            Value::Varchar("alice".into()),
            Value::BigInt(99),
        ]);

        let bytes = tuple.to_bytes(&schema).unwrap();
        assert_eq!(bytes.len(), schema.tuple_size());
        assert_eq!(Tuple::from_bytes(&schema, &bytes), tuple);
    }

    #[test]
    fn test_tuple_round_trip_with_nulls() {
        let schema = sample_schema();
        let tuple = Tuple::new(vec![Value::Integer(7), Value::Null, Value::Null]);

        let bytes = tuple.to_bytes(&schema).unwrap();
        assert_eq!(Tuple::from_bytes(&schema, &bytes), tuple);
    }

    #[test]
    fn test_tuple_join() {
        let left = Tuple::new(vec![Value::Integer(1)]);
        let right = Tuple::new(vec![Value::Varchar("x".into())]);
        let joined = Tuple::join(&left, &right);
        assert_eq!(joined.num_values(), 2);
        assert_eq!(joined.value(0), &Value::Integer(1));
    }
}
