use rusqlite::types::Value;

use crate::engine::sql::values::{csv_cell, plain_cell, type_name, xs_double};

#[test]
fn formats_doubles_canonically() {
    assert_eq!(xs_double(1.5), "1.5E0");
    assert_eq!(xs_double(2.0), "2.0E0");
    assert_eq!(xs_double(0.0), "0.0E0");
    assert_eq!(xs_double(-1234.5), "-1.2345E3");
    assert_eq!(xs_double(0.001), "1.0E-3");
    assert_eq!(xs_double(f64::NAN), "NaN");
    assert_eq!(xs_double(f64::INFINITY), "INF");
    assert_eq!(xs_double(f64::NEG_INFINITY), "-INF");
}

#[test]
fn renders_csv_cells_by_storage_class() {
    assert_eq!(csv_cell(&Value::Null), "null");
    assert_eq!(csv_cell(&Value::Integer(-42)), "-42");
    assert_eq!(csv_cell(&Value::Real(1.5)), "1.5E0");
    assert_eq!(csv_cell(&Value::Text("say \"hi\"".into())), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_cell(&Value::Blob(vec![1, 2, 3])), "AQID");
}

#[test]
fn renders_plain_cells() {
    assert_eq!(plain_cell(&Value::Null), None);
    assert_eq!(plain_cell(&Value::Real(1.5)).as_deref(), Some("1.5"));
    assert_eq!(plain_cell(&Value::Text("a<b".into())).as_deref(), Some("a<b"));
    assert_eq!(type_name(&Value::Blob(vec![])), "BLOB");
}
