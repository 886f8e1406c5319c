use super::*;

fn profile(input: &str) -> CsvProfile {
    profile_csv(input.as_bytes()).unwrap()
}

#[test]
fn infers_column_kinds() {
    let p = profile(
        "id,price,active,signup,city\n\
         1,9.99,true,2024-01-05,Lagos\n\
         2,12.50,false,2024-02-11,Berlin\n\
         3,3.00,yes,2024-03-20,Quito\n",
    );

    let kinds: Vec<ColumnKind> = p.columns.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ColumnKind::Integer,
            ColumnKind::Float,
            ColumnKind::Boolean,
            ColumnKind::Date,
            ColumnKind::Text,
        ]
    );
    assert_eq!(p.row_count, 3);
}

#[test]
fn mixed_integer_and_float_widens_to_float() {
    let p = profile("amount\n1\n2.5\n3\n");
    assert_eq!(p.columns[0].kind, ColumnKind::Float);
    assert_eq!(p.columns[0].mean, Some(2.1666666666666665));
}

#[test]
fn non_numeric_value_demotes_to_text() {
    let p = profile("amount\n1\n2\nn/a\n");
    assert_eq!(p.columns[0].kind, ColumnKind::Text);
    assert!(p.columns[0].mean.is_none());
}

#[test]
fn blank_cells_do_not_affect_kind_or_stats() {
    let p = profile("amount\n10\n\n30\n");
    let col = &p.columns[0];
    assert_eq!(col.kind, ColumnKind::Integer);
    assert_eq!(col.non_null, 2);
    assert_eq!(col.min, Some(10.0));
    assert_eq!(col.max, Some(30.0));
    assert_eq!(col.mean, Some(20.0));
}

#[test]
fn ragged_rows_are_tolerated() {
    let p = profile("a,b,c\n1,2\n4,5,6,7\n");
    assert_eq!(p.row_count, 2);
    assert_eq!(p.columns.len(), 3);
    // Short row counts as null for the missing column.
    assert_eq!(p.columns[2].non_null, 1);
}

#[test]
fn empty_input_is_an_error() {
    assert!(profile_csv(b"").is_err());
    assert!(profile_csv(b"   \n  ").is_err());
}

#[test]
fn header_only_file_profiles_zero_rows() {
    let p = profile("a,b\n");
    assert_eq!(p.row_count, 0);
    assert_eq!(p.columns.len(), 2);
    assert_eq!(p.columns[0].kind, ColumnKind::Text);
}

#[test]
fn utf8_bom_is_stripped() {
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(b"name\nvalue\n");
    let p = profile_csv(&bytes).unwrap();
    assert_eq!(p.columns[0].name, "name");
}

#[test]
fn windows_1252_bytes_are_decoded() {
    // 0xE9 is 'e acute' in Windows-1252 and invalid as standalone UTF-8.
    let bytes = b"name\ncaf\xE9\n".to_vec();
    let p = profile_csv(&bytes).unwrap();
    assert_eq!(p.sample_rows[0][0], "café");
}

#[test]
fn prompt_render_truncates_long_cells() {
    let long = "x".repeat(200);
    let p = profile(&format!("note\n{long}\n"));
    let rendered = p.render_prompt();
    assert!(!rendered.contains(&long));
    assert!(rendered.contains('…'));
}

#[test]
fn prompt_render_is_deterministic() {
    let input = "id,amount\n1,10\n2,20\n";
    assert_eq!(profile(input).render_prompt(), profile(input).render_prompt());
    let rendered = profile(input).render_prompt();
    assert!(rendered.contains("Dataset: 2 rows x 2 columns"));
    assert!(rendered.contains("- amount (integer): 2 non-null, 2 distinct, min 10, max 20, mean 15"));
}
