use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn lexes_numbers_idents_and_operators() {
    assert_eq!(
        kinds("0.5 * parm11 + table[time]"),
        vec![
            TokenKind::Number(0.5),
            TokenKind::Star,
            TokenKind::Ident("parm11".to_owned()),
            TokenKind::Plus,
            TokenKind::Ident("table".to_owned()),
            TokenKind::LBracket,
            TokenKind::Ident("time".to_owned()),
            TokenKind::RBracket,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lexes_leading_dot_numbers() {
    assert_eq!(
        kinds(".25"),
        vec![TokenKind::Number(0.25), TokenKind::Eof]
    );
}

#[test]
fn lexes_two_char_operators() {
    assert_eq!(
        kinds("a >= b && c != d"),
        vec![
            TokenKind::Ident("a".to_owned()),
            TokenKind::Ge,
            TokenKind::Ident("b".to_owned()),
            TokenKind::AndAnd,
            TokenKind::Ident("c".to_owned()),
            TokenKind::Ne,
            TokenKind::Ident("d".to_owned()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn tracks_byte_offsets() {
    let tokens = lex("  time ").unwrap();
    assert_eq!(tokens[0].span.start, 2);
    assert_eq!(tokens[0].span.end, 6);
}

#[test]
fn rejects_unexpected_characters() {
    let err = lex("time $ 2").unwrap_err();
    match err {
        MaterialError::Expression { offset, .. } => assert_eq!(offset, 5),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_input_yields_only_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
}
