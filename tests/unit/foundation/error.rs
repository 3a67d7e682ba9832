use super::*;

#[test]
fn expression_error_reports_offset() {
    let err = MaterialError::expression(7, "unexpected token");
    assert_eq!(err.to_string(), "expression error at byte 7: unexpected token");
}

#[test]
fn link_error_formats_message() {
    let err = MaterialError::link("'bogus' is neither a keyword nor a known table");
    assert_eq!(
        err.to_string(),
        "link error: 'bogus' is neither a keyword nor a known table"
    );
}

#[test]
fn validation_error_formats_message() {
    let err = MaterialError::validation("vertexParm 2 declares 5 expressions, expected 1 to 4");
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn anyhow_errors_convert() {
    fn fails() -> MaterialResult<()> {
        Err(anyhow::anyhow!("backing store unavailable"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(matches!(err, MaterialError::Other(_)));
    assert_eq!(err.to_string(), "backing store unavailable");
}
