//! Recursive descent parser.
//!
//! Syntax errors never abort the parse. The offending token is reported and
//! skipped, and parsing carries on so later errors surface in the same run.
mod decl;
mod expr;
mod stmts;

use crate::{
    ast::{Ast, NodeId, NodeKind},
    error::{check_phase, Diagnostic, MinicResult, Phase},
    token_stream::TokenStream,
    tokens::{Token, TokenKind},
};

/// Parse a scanned token sequence into a tree.
pub fn parse(tokens: &[Token]) -> Parsed {
    Parser::new(tokens).parse()
}

pub struct Parser<'a> {
    input: TokenStream<'a>,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            input: TokenStream::new(tokens),
            ast: Ast::new(),
            diagnostics: vec![],
        }
    }

    /// Parse the whole translation unit.
    pub fn parse(mut self) -> Parsed {
        let root = self.parse_declaration_list();
        self.ast.set_root(root);
        log::debug!("parsed {} nodes", self.ast.len());

        Parsed {
            ast: self.ast,
            diagnostics: self.diagnostics,
        }
    }

    /// Consumes the current token if it matches, otherwise reports it and
    /// skips past it.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        match self.input.match_token(kind) {
            Some(token) => Some(token),
            None => {
                self.unexpected("Unexpected Token");
                None
            }
        }
    }

    /// Reports the current token and skips past it.
    fn unexpected(&mut self, message: &'static str) -> Token {
        let token = self.input.current().clone();
        self.error(message, &token);
        self.input.advance()
    }

    fn error(&mut self, message: &'static str, token: &Token) {
        self.diagnostics.push(Diagnostic::report(
            Phase::Syntax,
            message,
            token.lexeme.clone(),
            token.pos,
        ));
    }

    /// Creates a node for the current token and consumes it.
    fn node_here(&mut self, kind: NodeKind) -> NodeId {
        let token = self.input.advance();
        self.ast.add_node(kind, token)
    }
}

/// Output of the parser.
///
/// The tree is complete when no diagnostics were reported, and a best
/// effort partial tree otherwise.
#[derive(Debug)]
pub struct Parsed {
    pub ast: Ast,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    /// Success flag of the syntax phase.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_result(self) -> MinicResult<Ast> {
        check_phase(Phase::Syntax, self.diagnostics)?;
        Ok(self.ast)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ast::MAX_CHILDREN, lex::Lexer};

    pub(super) fn parse_str(source: &str) -> Parsed {
        let tokens = Lexer::new(source).scan().tokens;
        parse(&tokens)
    }

    fn count_invalid(ast: &Ast, head: Option<NodeId>) -> usize {
        ast.siblings(head)
            .map(|id| {
                let own = (ast.kind(id) == NodeKind::Invalid) as usize;
                own + (0..MAX_CHILDREN).map(|slot| count_invalid(ast, ast.child(id, slot))).sum::<usize>()
            })
            .sum()
    }

    #[test]
    fn test_valid_program_has_no_invalid_nodes() {
        let parsed = parse_str(include_str!("../../tests/programs/sort.mc"));
        assert!(parsed.is_ok(), "{:?}", parsed.diagnostics);
        assert_eq!(count_invalid(&parsed.ast, parsed.ast.root()), 0);
    }

    #[test]
    fn test_missing_terminator_terminates() {
        let parsed = parse_str("int x");
        assert!(!parsed.is_ok());
        assert_eq!(parsed.diagnostics[0].message, "Unexpected Token");
    }

    #[test]
    fn test_garbage_terminates() {
        for source in ["int", "int f(", "int f(int", "void f(void) {", "void f(void) { x = ; }", ") ( ] [", "{ { {", "int f(void) { if ( }"] {
            let parsed = parse_str(source);
            assert!(!parsed.is_ok(), "source {:?} parsed cleanly", source);
        }
    }

    #[test]
    fn test_recovery_reports_later_errors() {
        let parsed = parse_str("int x int y; void f(void) { return 1 }");
        assert!(parsed.diagnostics.len() >= 2);
    }
}
