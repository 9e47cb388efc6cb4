//! Statement parsing.
use super::Parser;
use crate::{
    ast::{NodeId, NodeKind, SiblingList},
    tokens::{KeywordKind, TokenKind},
};

impl<'a> Parser<'a> {
    /// Brace delimited block. Local declarations come first, then statements.
    pub(super) fn parse_compound(&mut self) -> Option<NodeId> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let block = self.ast.add_node(NodeKind::Compound, open);

        let mut locals = SiblingList::default();
        while self.input.at(TokenKind::Keyword(KeywordKind::Int)) {
            if let Some(decl) = self.parse_variable() {
                self.ast.append_sibling(&mut locals, decl);
            }
        }
        self.ast.push_child(block, locals.head());

        let stmts = self.parse_statement_list();
        self.ast.push_child(block, stmts);

        self.expect(TokenKind::RightBrace)?;
        Some(block)
    }

    fn parse_statement_list(&mut self) -> Option<NodeId> {
        let mut stmts = SiblingList::default();
        while !self.input.at(TokenKind::RightBrace) && !self.input.at_end() {
            if let Some(stmt) = self.parse_statement() {
                self.ast.append_sibling(&mut stmts, stmt);
            }
        }
        stmts.head()
    }

    /// Parses one statement. Returns `None` for the empty statement
    /// and for statements that failed to parse.
    ///
    /// Always consumes at least one token when not at the end of source.
    fn parse_statement(&mut self) -> Option<NodeId> {
        use KeywordKind as K;
        use TokenKind as T;

        match self.input.kind() {
            T::Keyword(K::If) => self.parse_if(),
            T::Keyword(K::While) => self.parse_while(),
            T::Keyword(K::Return) => self.parse_return(),
            T::LeftBrace => self.parse_compound(),
            T::Semicolon => {
                self.input.advance();
                None
            }
            T::Ident | T::Number | T::LeftParen | T::Plus | T::Minus => {
                let expr = self.parse_expression();
                self.expect(T::Semicolon)?;
                Some(expr)
            }
            T::Keyword(K::Int) | T::Keyword(K::Void) => {
                self.unexpected("Unexpected Declaration");
                None
            }
            _ => {
                self.unexpected("Unexpected Token");
                None
            }
        }
    }

    /// `if ( expr ) stmt [else stmt]`
    fn parse_if(&mut self) -> Option<NodeId> {
        let stmt = self.node_here(NodeKind::If);
        self.expect(TokenKind::LeftParen)?;
        let cond = self.parse_expression();
        self.ast.push_child(stmt, Some(cond));
        self.expect(TokenKind::RightParen)?;

        let then = self.parse_statement();
        self.ast.push_child(stmt, then);

        if self.input.match_token(TokenKind::Keyword(KeywordKind::Else)).is_some() {
            let otherwise = self.parse_statement();
            self.ast.push_child(stmt, otherwise);
        }

        Some(stmt)
    }

    /// `while ( expr ) stmt`
    fn parse_while(&mut self) -> Option<NodeId> {
        let stmt = self.node_here(NodeKind::While);
        self.expect(TokenKind::LeftParen)?;
        let cond = self.parse_expression();
        self.ast.push_child(stmt, Some(cond));
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_statement();
        self.ast.push_child(stmt, body);

        Some(stmt)
    }

    /// `return [expr] ;`
    fn parse_return(&mut self) -> Option<NodeId> {
        let stmt = self.node_here(NodeKind::Return);
        if !self.input.at(TokenKind::Semicolon) {
            let value = self.parse_expression();
            self.ast.push_child(stmt, Some(value));
        }
        self.expect(TokenKind::Semicolon)?;
        Some(stmt)
    }
}
