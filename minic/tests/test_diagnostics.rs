use minic::{prelude::*, tokens::Pos};

fn failed_phase(source: &str) -> (Phase, Vec<Diagnostic>) {
    match compile_str(source) {
        Err(MinicError::Compile { phase, diagnostics }) => (phase, diagnostics),
        other => panic!("expected a failed phase, got {:?}", other),
    }
}

#[test]
fn test_symbol_errors_stop_before_type_checking() {
    let (phase, diagnostics) = failed_phase(include_str!("programs/errors.mc"));
    assert_eq!(phase, Phase::Symbol);

    let found: Vec<_> = diagnostics.iter().map(|d| (d.message, d.lexeme.as_str(), d.pos)).collect();
    assert_eq!(
        found,
        vec![
            ("Duplicate Definition", "x", Pos::new(2, 5)),
            ("Undefined Symbol", "y", Pos::new(11, 5)),
        ]
    );
}

#[test]
fn test_type_errors() {
    let (phase, diagnostics) = failed_phase("int f(void) { return; } void main(void) { int x; x = f; }");
    assert_eq!(phase, Phase::Type);

    let messages: Vec<_> = diagnostics.iter().map(|d| d.message).collect();
    assert_eq!(messages, vec!["Return Type Does Not Match", "Function Used As Variable"]);
}

#[test]
fn test_lexical_errors_are_positioned() {
    let (phase, diagnostics) = failed_phase("int main(void)\n{\n  return 1 ! 2;\n}");
    assert_eq!(phase, Phase::Lexical);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].lexeme, "!");
    assert_eq!(diagnostics[0].pos, Pos::new(3, 12));
    assert_eq!(diagnostics[0].to_string(), format!("{} '!' at (3,12)", diagnostics[0].message));
}

#[test]
fn test_syntax_errors_collected() {
    let (phase, diagnostics) = failed_phase("int x int y; void main(void) { return }");
    assert_eq!(phase, Phase::Syntax);
    assert!(diagnostics.len() >= 2);
}

#[test]
fn test_missing_main() {
    match compile_str("int f(void) { return 1; }") {
        Err(MinicError::Codegen(_)) => {}
        other => panic!("expected a codegen error, got {:?}", other),
    }
}

#[test]
fn test_oversized_frames_fail_symbol_phase() {
    for source in [
        "int a[2147483647]; void main(void){ }",
        "int a[2000000000]; int b[2000000000]; void main(void){ }",
        "void main(void){ int a[1500000000]; }",
    ] {
        let (phase, diagnostics) = failed_phase(source);
        assert_eq!(phase, Phase::Symbol, "{}", source);
        assert!(diagnostics.iter().all(|d| d.message == "Frame Too Large"), "{:?}", diagnostics);
    }
}
