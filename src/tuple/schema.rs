use std::collections::HashMap;

use super::DataType;

/// A single column in a schema.
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

    pub fn fixed_size(&self) -> usize {
        self.data_type.fixed_size()
    }
}

/// An ordered list of named, typed columns.
///
/// The schema fixes the byte layout of its tuples: a null bitmap
/// (one bit per column, rounded up to whole bytes) followed by one
/// fixed-width slot per column. `tuple_size` is therefore the same for
/// every tuple of the schema.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    /// Byte offset of each column's slot within a serialized tuple
    offsets: Vec<usize>,
    /// Column name -> index
    by_name: HashMap<String, usize>,
    tuple_size: usize,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let bitmap_len = columns.len().div_ceil(8);
        let mut offsets = Vec::with_capacity(columns.len());
        let mut by_name = HashMap::with_capacity(columns.len());

        let mut offset = bitmap_len;
        for (i, column) in columns.iter().enumerate() {
            offsets.push(offset);
            offset += column.fixed_size();
            by_name.insert(column.name.clone(), i);
        }

        Self {
            columns,
            offsets,
            by_name,
            tuple_size: offset,
        }
    }

    /// Builds the schema produced by concatenating two schemas, as join
    /// executors do for their output rows.
    pub fn join(left: &Schema, right: &Schema) -> Self {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Serialized width of one tuple of this schema.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Width of the leading null bitmap.
    pub fn bitmap_size(&self) -> usize {
        self.columns.len().div_ceil(8)
    }

    /// Byte offset of the given column's slot in a serialized tuple.
    pub fn column_offset(&self, index: usize) -> usize {
        self.offsets[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_layout() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::BigInt),
            Column::new("flag", DataType::Boolean),
            Column::new("name", DataType::Varchar(10)),
        ]);

        assert_eq!(schema.num_columns(), 3);
        assert_eq!(schema.bitmap_size(), 1);
        assert_eq!(schema.column_offset(0), 1);
        assert_eq!(schema.column_offset(1), 9);
        assert_eq!(schema.column_offset(2), 10);
        assert_eq!(schema.tuple_size(), 1 + 8 + 1 + 12);
        assert_eq!(schema.index_of("flag"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn test_schema_join() {
        let left = Schema::new(vec![Column::new("a", DataType::Integer)]);
        let right = Schema::new(vec![Column::new("b", DataType::Integer)]);
        let joined = Schema::join(&left, &right);
        assert_eq!(joined.num_columns(), 2);
        assert_eq!(joined.column(1).name(), "b");
    }
}
