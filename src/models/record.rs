use std::sync::Arc;

/// Unmapped cells of one input line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line: u64,
    /// Byte offset of the row in the source file
    pub byte_offset: u64,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, cells: Vec<String>) -> Self {
        Self {
            line,
            byte_offset: 0,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Named cells of one row, in schema order.
///
/// Values are kept as the source text; typed parsing happens where a value
/// is used. A name without a matching value reads as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    line: u64,
    names: Arc<[String]>,
    values: Vec<String>,
}

impl Record {
    pub fn new(line: u64, names: Arc<[String]>, values: Vec<String>) -> Self {
        Self {
            line,
            names,
            values,
        }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
