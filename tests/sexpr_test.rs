// Lexer, numbers and generic tree output
use pcb_kernel::error::{LexError, ParseError};
use pcb_kernel::sexpr::{format_double, format_iu, parse, parse_double, Lexer, NumericScope, TokenKind, Value};

#[test]
fn test_escaped_quote_is_one_string_token() {
    let mut lexer = Lexer::new(r#""a\"b""#);
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Str);
    assert_eq!(token.text, "a\"b");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_numbers_ignore_locale() {
    assert_eq!(format_double(1234.5), "1234.5");
    assert_eq!(format_iu(1_234_500_000), "1234.5");
    assert_eq!(parse_double("1234.5"), Some(1234.5));
    assert_eq!(parse_double("1234,5"), None);
    assert_eq!(format_double(-0.0), "0");
}

#[test]
fn test_numeric_scopes_nest_per_thread() {
    let before = NumericScope::depth();
    {
        let _outer = NumericScope::enter();
        {
            let _inner = NumericScope::enter();
            assert_eq!(NumericScope::depth(), before + 2);
            let other = std::thread::spawn(NumericScope::depth).join().unwrap();
            assert_eq!(other, 0);
        }
        assert_eq!(NumericScope::depth(), before + 1);
    }
    assert_eq!(NumericScope::depth(), before);
}

#[test]
fn test_tree_values() {
    let root = parse("(root atom \"str\" 42 -1.5e3 F.Cu 1.2.3)").unwrap();
    let values: Vec<&Value> = root.args().iter().map(|n| &n.value).collect();
    assert_eq!(
        values,
        vec![
            &Value::Atom("atom".into()),
            &Value::Str("str".into()),
            &Value::Int(42),
            &Value::Double(-1500.0),
            &Value::Atom("F.Cu".into()),
            &Value::Atom("1.2.3".into()),
        ]
    );
}

#[test]
fn test_errors_carry_positions() {
    let err = parse("(a\n  (b \"open").unwrap_err();
    assert!(matches!(err, ParseError::Lex(LexError::UnterminatedString { line: 2, column: 6 })));

    let err = parse("(a (b)").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }));

    let err = parse("(a) (b)").unwrap_err();
    assert_eq!((err.line(), err.column()), (1, 5));
}

#[test]
fn test_generic_document_is_stable() {
    let text = "(design_rules (version 1)\n(rule \"clearance\" (constraint clearance (min 0.2)) (condition \"A.Type == 'Pad'\")))";
    let once = parse(text).unwrap().to_sexpr_string();
    assert_eq!(parse(&once).unwrap(), parse(text).unwrap());
    assert_eq!(parse(&once).unwrap().to_sexpr_string(), once);
}

#[test]
fn test_reparse_keeps_node_kinds() {
    for text in ["(a (x 1.0) (y -0.0))", "(a (x 1e300))", "(a (b) #x)", "(a (b (c 2.50)) 7 \"s\")"] {
        let root = parse(text).unwrap();
        let once = root.to_sexpr_string();
        assert_eq!(parse(&once).unwrap(), root, "{}", once);
    }
}
