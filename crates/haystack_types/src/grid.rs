//! Grids: the tabular response shape of every Haystack op

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::dict::Dict;

/// A grid of rows with a column list derived from the rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub meta: Dict,
    pub cols: Vec<String>,
    pub rows: Vec<Dict>,
}

impl Grid {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a grid whose columns are the union of the rows' tag names in
    /// first-seen order.
    pub fn from_dicts(rows: Vec<Dict>) -> Self {
        let mut cols: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.names() {
                if !cols.iter().any(|c| c == name) {
                    cols.push(name.to_string());
                }
            }
        }
        Self {
            meta: Dict::new(),
            cols,
            rows,
        }
    }

    pub fn with_meta(mut self, meta: Dict) -> Self {
        self.meta = meta;
        self
    }

    pub fn has_col(&self, name: &str) -> bool {
        self.cols.iter().any(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<&Dict> {
        self.rows.get(index)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Serialize)]
struct Col<'a> {
    name: &'a str,
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut meta = Dict::new();
        meta.add("ver", "3.0");
        meta.merge(&self.meta);
        let cols: Vec<Col> = self.cols.iter().map(|name| Col { name }).collect();

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("meta", &meta)?;
        map.serialize_entry("cols", &cols)?;
        map.serialize_entry("rows", &self.rows)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_columns_are_union_of_rows() {
        let a: Dict = [("id", Value::str("a")), ("dis", Value::str("A"))].into_iter().collect();
        let b: Dict = [("id", Value::str("b")), ("navId", Value::str("x"))].into_iter().collect();
        let grid = Grid::from_dicts(vec![a, b]);
        assert_eq!(grid.cols, vec!["id", "dis", "navId"]);
        assert_eq!(grid.num_rows(), 2);
        assert!(grid.has_col("navId"));
    }

    #[test]
    fn test_serialize_json_shape() {
        let row: Dict = [("point", Value::Marker)].into_iter().collect();
        let json = serde_json::to_value(Grid::from_dicts(vec![row])).unwrap();
        assert_eq!(json["meta"]["ver"], "3.0");
        assert_eq!(json["cols"][0]["name"], "point");
        assert_eq!(json["rows"][0]["point"], "m:");
    }
}
