use super::*;
use crate::schema::{CategoryNormalization, FieldSpec};

fn airline_schema() -> Schema {
    Schema::new(
        vec![
            FieldSpec::categorical("customer_type"),
            FieldSpec::categorical("class"),
            FieldSpec::numeric("age"),
        ],
        "satisfaction",
    )
}

const AIRLINE_CSV: &str = "\
customer_type,class,age,satisfaction,notes
Loyal Customer,Eco,34,satisfied,a
disloyal customer , business,22,neutral or dissatisfied,b
Loyal Customer,eco plus,NA,satisfied,c
Loyal Customer,Business,61,satisfied,
Loyal Customer,Eco,forty,satisfied,e
Loyal Customer,Business,45,satisfied,f
";

fn frame() -> ReferenceFrame {
    ReferenceFrame::from_reader(AIRLINE_CSV.as_bytes(), airline_schema()).expect("load frame")
}

#[test]
fn test_drops_incomplete_and_unparseable_rows() {
    let frame = frame();
    // row 3 has NA age, row 4 has an empty extra column, row 5 has text age
    assert_eq!(frame.n_rows(), 3);
    assert_eq!(frame.numeric("age"), Some(&[34.0, 22.0, 45.0][..]));
    assert_eq!(frame.target().len(), 3);
}

#[test]
fn test_normalizes_categories_at_load() {
    let frame = frame();
    assert_eq!(
        frame.categorical("customer_type"),
        Some(
            &[
                "Loyal Customer".to_string(),
                "Disloyal Customer".to_string(),
                "Loyal Customer".to_string()
            ][..]
        )
    );
    assert_eq!(frame.categories("class"), vec!["Eco", "Business"]);
}

#[test]
fn test_trim_normalization_keeps_codes() {
    let schema = Schema::new(vec![FieldSpec::categorical("clarity")], "price")
        .with_normalization(CategoryNormalization::Trim);
    let csv = "clarity,price\n VS1,300\nSI2 ,200\n";
    let frame = ReferenceFrame::from_reader(csv.as_bytes(), schema).expect("load frame");
    assert_eq!(frame.categories("clarity"), vec!["VS1", "SI2"]);
}

#[test]
fn test_category_set_is_sorted() {
    let frame = frame();
    let set: Vec<_> = frame.category_set("class").into_iter().collect();
    assert_eq!(set, vec!["Business", "Eco"]);
}

#[test]
fn test_missing_schema_column() {
    let csv = "customer_type,age,satisfaction\nLoyal Customer,30,satisfied\n";
    let err = ReferenceFrame::from_reader(csv.as_bytes(), airline_schema()).unwrap_err();
    assert!(matches!(err, FormcastError::Schema(_)));
    assert!(err.to_string().contains("class"));
}

#[test]
fn test_missing_target_column() {
    let csv = "customer_type,class,age\nLoyal Customer,Eco,30\n";
    let err = ReferenceFrame::from_reader(csv.as_bytes(), airline_schema()).unwrap_err();
    assert!(err.to_string().contains("satisfaction"));
}

#[test]
fn test_no_complete_rows() {
    let csv = "customer_type,class,age,satisfaction\nLoyal Customer,Eco,,satisfied\n";
    let err = ReferenceFrame::from_reader(csv.as_bytes(), airline_schema()).unwrap_err();
    assert!(err.to_string().contains("no complete rows"));
}

#[test]
fn test_record_excludes_target() {
    let frame = frame();
    let record = frame.record(1).expect("row 1");
    assert_eq!(record.field_names(), vec!["customer_type", "class", "age"]);
    assert_eq!(record.get("class"), Some(&Value::Text("Business".to_string())));
    assert_eq!(record.get("age"), Some(&Value::Number(22.0)));
    assert!(frame.record(3).is_none());
}

#[test]
fn test_head_is_bounded() {
    let frame = frame();
    assert_eq!(frame.head(2).len(), 2);
    assert_eq!(frame.head(10).len(), 3);
}

#[test]
fn test_describe_numeric_only() {
    let stats = frame().describe();
    assert_eq!(stats.len(), 1);
    let age = &stats[0];
    assert_eq!(age.name, "age");
    assert_eq!(age.count, 3);
    assert_eq!(age.min, 22.0);
    assert_eq!(age.max, 45.0);
    assert_eq!(age.median, 34.0);
    assert!((age.mean - 33.666_666).abs() < 1e-4);
}

#[test]
fn test_load_from_disk() {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(AIRLINE_CSV.as_bytes()).expect("write csv");
    let frame = ReferenceFrame::load(file.path(), airline_schema()).expect("load");
    assert_eq!(frame.n_rows(), 3);
}

#[test]
fn test_load_missing_file() {
    let err = ReferenceFrame::load("/nonexistent/airline.csv", airline_schema()).unwrap_err();
    assert!(matches!(err, FormcastError::Io(_)));
}
