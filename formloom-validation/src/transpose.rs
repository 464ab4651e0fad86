//! Column/row transposition for grouped submissions.
//!
//! Browsers submit a repeated group column-wise: one array per sub-field
//! (`{"qty": [1, 2], "sku": ["a", "b"]}`). The pipeline and the store
//! work row-wise (`[{"qty": 1, "sku": "a"}, {"qty": 2, "sku": "b"}]`).

use serde_json::{Map, Value};

/// Convert a column-oriented group value to rows.
///
/// Returns `None` when the value is not a column map (not an object, or
/// any member is not an array). Columns of unequal length are squared to
/// the longest; missing cells become `Null`.
pub fn transpose_columns(value: &Value) -> Option<Vec<Value>> {
    let columns = value.as_object()?;
    let mut rows_len = 0;
    for column in columns.values() {
        rows_len = rows_len.max(column.as_array()?.len());
    }
    let mut rows = Vec::with_capacity(rows_len);
    for row_index in 0..rows_len {
        let mut row = Map::new();
        for (name, column) in columns {
            let cell = column
                .as_array()
                .and_then(|cells| cells.get(row_index))
                .cloned()
                .unwrap_or(Value::Null);
            row.insert(name.clone(), cell);
        }
        rows.push(Value::Object(row));
    }
    Some(rows)
}

/// Convert row objects back to a column map. Non-object rows contribute
/// `Null` to every column.
pub fn transpose_rows(rows: &[Value]) -> Value {
    let mut names = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for name in map.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
    }
    let mut columns = Map::new();
    for name in names {
        let column: Vec<Value> = rows
            .iter()
            .map(|row| row.get(&name).cloned().unwrap_or(Value::Null))
            .collect();
        columns.insert(name, Value::Array(column));
    }
    Value::Object(columns)
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_columns() -> impl Strategy<Value = serde_json::Value> {
        let names = proptest::collection::btree_set("[a-z]{1,5}", 1..4);
        // Zero-length columns cannot round-trip (names vanish with the rows).
        (names, 1usize..6).prop_map(|(names, len)| {
            let mut columns = Map::new();
            for (c, name) in names.into_iter().enumerate() {
                let cells: Vec<Value> = (0..len).map(|r| Value::from(c * 100 + r)).collect();
                columns.insert(name, Value::Array(cells));
            }
            Value::Object(columns)
        })
    }

    proptest! {
        #[test]
        fn columns_to_rows_and_back(columns in arb_columns()) {
            let rows = transpose_columns(&columns).unwrap();
            prop_assert_eq!(transpose_rows(&rows), columns);
        }
    }
}
