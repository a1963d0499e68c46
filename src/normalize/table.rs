//! Uniform row/column representation of catalog responses

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cell of a [`Table`].
///
/// Nested objects and arrays of objects stay structured as sub-tables so
/// one-to-many relations (a feed and its locations) survive intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    /// String, number or boolean
    Scalar(Value),
    /// Array of scalars (or an empty array)
    List(Vec<Value>),
    /// A nested object, held as a one-row table
    Record(Table),
    /// An array of nested objects
    Table(Table),
}

impl Cell {
    /// Build a cell from a JSON value, recursing into nested records.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Object(map) => Cell::Record(Table::from_records(vec![Value::Object(map)])),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                Cell::Table(Table::from_records(items))
            }
            Value::Array(items) => Cell::List(items),
            scalar => Cell::Scalar(scalar),
        }
    }

    /// Convert back to JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Scalar(v) => v.clone(),
            Cell::List(items) => Value::Array(items.clone()),
            Cell::Record(t) => t.to_records().into_iter().next().unwrap_or(Value::Null),
            Cell::Table(t) => Value::Array(t.to_records()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Scalar(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Scalar(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// The nested table of a [`Cell::Record`] or [`Cell::Table`]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Cell::Record(t) | Cell::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Rows of records sharing one set of columns.
///
/// Columns are the union of record keys in first-seen order; a record
/// missing a column holds [`Cell::Null`] there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Unchecked serialized form of a [`Table`]
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TryFrom<RawTable> for Table {
    type Error = String;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let width = raw.columns.len();
        if let Some((i, row)) = raw.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(format!(
                "row {} has {} cells but the table has {} columns",
                i,
                row.len(),
                width
            ));
        }
        Ok(Self {
            columns: raw.columns,
            rows: raw.rows,
        })
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of JSON records.
    ///
    /// Non-object elements become rows with a single `value` column.
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let maps: Vec<Map<String, Value>> = records
            .into_iter()
            .map(|record| match record {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            })
            .collect();

        for map in &maps {
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = maps
            .into_iter()
            .map(|mut map| {
                columns
                    .iter()
                    .map(|c| map.remove(c).map(Cell::from_value).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }

    /// All cells of one column, or `None` if the column does not exist
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|cells| {
            keep(&RowRef {
                columns,
                cells: cells.as_slice(),
            })
        });
    }

    /// Rows as JSON objects, in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|cells| {
                let map: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(cells)
                    .filter(|(_, cell)| !cell.is_null())
                    .map(|(c, cell)| (c.clone(), cell.to_value()))
                    .collect();
                Value::Object(map)
            })
            .collect()
    }

    /// Deserialize every row into `T`.
    pub fn rows_as<T: DeserializeOwned>(&self) -> serde_json::Result<Vec<T>> {
        self.to_records()
            .into_iter()
            .map(serde_json::from_value)
            .collect()
    }

    /// Expand a nested column into one output row per nested row.
    ///
    /// Nested columns are prefixed with `{column}.`; the remaining parent
    /// columns repeat on each output row. Parents whose cell is empty or
    /// null keep one row with null nested values.
    pub fn unnest(&self, column: &str) -> Option<Table> {
        let idx = self.column_index(column)?;

        let mut nested_columns: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(sub) = row.get(idx).and_then(Cell::as_table) {
                for c in sub.columns() {
                    if !nested_columns.contains(c) {
                        nested_columns.push(c.clone());
                    }
                }
            }
        }

        let parent_columns: Vec<(usize, &String)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .collect();

        let mut columns: Vec<String> = parent_columns.iter().map(|(_, c)| (*c).clone()).collect();
        columns.extend(nested_columns.iter().map(|c| format!("{}.{}", column, c)));

        let mut rows = Vec::new();
        for row in &self.rows {
            let parent: Vec<Cell> = parent_columns
                .iter()
                .map(|(i, _)| row.get(*i).cloned().unwrap_or(Cell::Null))
                .collect();

            match row.get(idx).and_then(Cell::as_table) {
                Some(sub) if !sub.is_empty() => {
                    for sub_row in 0..sub.len() {
                        let mut out = parent.clone();
                        out.extend(nested_columns.iter().map(|c| {
                            sub.get(sub_row, c).cloned().unwrap_or(Cell::Null)
                        }));
                        rows.push(out);
                    }
                }
                _ => {
                    let mut out = parent;
                    out.extend(nested_columns.iter().map(|_| Cell::Null));
                    rows.push(out);
                }
            }
        }

        Some(Table { columns, rows })
    }
}

/// Borrowed view of one row, handed to [`Table::retain_rows`] predicates
pub struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl RowRef<'_> {
    pub fn get(&self, name: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.cells.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feeds() -> Table {
        Table::from_records(vec![
            json!({
                "id": "mdb-1",
                "official": true,
                "locations": [
                    {"country_code": "CA", "municipality": "Toronto"},
                    {"country_code": "CA", "municipality": "Mississauga"}
                ]
            }),
            json!({"id": "mdb-2", "official": false, "locations": []}),
            json!({"id": "mdb-3", "latest_dataset": {"id": "mdb-3-202401", "hash": "abc"}}),
        ])
    }

    #[test]
    fn test_columns_union_in_first_seen_order() {
        let table = feeds();
        assert_eq!(
            table.columns(),
            &["id", "official", "locations", "latest_dataset"]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2, "official"), Some(&Cell::Null));
    }

    #[test]
    fn test_nested_records_become_sub_tables() {
        let table = feeds();
        let locations = table.get(0, "locations").and_then(Cell::as_table).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(
            locations.get(1, "municipality").and_then(Cell::as_str),
            Some("Mississauga")
        );

        let latest = table.get(2, "latest_dataset").and_then(Cell::as_table).unwrap();
        assert_eq!(latest.len(), 1);

        // Empty arrays stay lists
        assert_eq!(table.get(1, "locations"), Some(&Cell::List(vec![])));
    }

    #[test]
    fn test_scalar_rows_use_value_column() {
        let table = Table::from_records(vec![json!("a"), json!("b")]);
        assert_eq!(table.columns(), &["value"]);
        assert_eq!(table.get(1, "value").and_then(Cell::as_str), Some("b"));
    }

    #[test]
    fn test_retain_rows() {
        let mut table = feeds();
        table.retain_rows(|row| row.get("official").and_then(Cell::as_bool) == Some(true));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "id").and_then(Cell::as_str), Some("mdb-1"));
    }

    #[test]
    fn test_rows_as_typed() {
        #[derive(Deserialize)]
        struct Row {
            id: String,
            #[serde(default)]
            official: Option<bool>,
        }

        let rows: Vec<Row> = feeds().rows_as().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "mdb-1");
        assert_eq!(rows[2].official, None);
    }

    #[test]
    fn test_unnest_one_to_many() {
        let table = feeds();
        let flat = table.unnest("locations").unwrap();

        assert_eq!(
            flat.columns(),
            &[
                "id",
                "official",
                "latest_dataset",
                "locations.country_code",
                "locations.municipality"
            ]
        );
        // two locations + one empty + one missing
        assert_eq!(flat.len(), 4);
        assert_eq!(flat.get(0, "id").and_then(Cell::as_str), Some("mdb-1"));
        assert_eq!(flat.get(1, "id").and_then(Cell::as_str), Some("mdb-1"));
        assert_eq!(
            flat.get(1, "locations.municipality").and_then(Cell::as_str),
            Some("Mississauga")
        );
        assert_eq!(flat.get(2, "locations.country_code"), Some(&Cell::Null));
    }

    #[test]
    fn test_unnest_unknown_column() {
        assert!(feeds().unnest("nope").is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let table = feeds();
        let json = serde_json::to_string(&table).unwrap();
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let short = json!({
            "columns": ["id", "status"],
            "rows": [[{"kind": "scalar", "value": "mdb-1"}]]
        });
        let err = serde_json::from_value::<Table>(short).unwrap_err();
        assert!(err.to_string().contains("row 0 has 1 cells"));

        let nested = json!({
            "columns": ["locations"],
            "rows": [[{"kind": "table", "value": {"columns": ["a"], "rows": [[]]}}]]
        });
        assert!(serde_json::from_value::<Table>(nested).is_err());
    }
}
