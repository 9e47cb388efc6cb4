//! Declaration parsing.
use super::Parser;
use crate::{
    ast::{NodeId, NodeKind, SiblingList},
    tokens::{KeywordKind, TokenKind},
};

const INT: TokenKind = TokenKind::Keyword(KeywordKind::Int);
const VOID: TokenKind = TokenKind::Keyword(KeywordKind::Void);

impl<'a> Parser<'a> {
    pub(super) fn parse_declaration_list(&mut self) -> Option<NodeId> {
        let mut decls = SiblingList::default();
        while !self.input.at_end() {
            if let Some(decl) = self.parse_declaration() {
                self.ast.append_sibling(&mut decls, decl);
            }
        }
        decls.head()
    }

    /// Variables and functions share their opening tokens, so scan ahead
    /// for whichever of `;` or `(` comes first.
    fn parse_declaration(&mut self) -> Option<NodeId> {
        match self.input.scan_for(&[TokenKind::Semicolon, TokenKind::LeftParen]) {
            Some(TokenKind::LeftParen) => self.parse_function(),
            Some(_) => self.parse_variable(),
            None => {
                self.unexpected("Unexpected Token");
                None
            }
        }
    }

    /// Variable or array declaration.
    ///
    /// ```text
    /// int x;
    /// int xs[10];
    /// ```
    pub(super) fn parse_variable(&mut self) -> Option<NodeId> {
        self.expect(INT)?;
        let name = self.expect(TokenKind::Ident)?;

        if self.input.match_token(TokenKind::LeftBracket).is_some() {
            let decl = self.ast.add_node(NodeKind::ArrayDecl, name);
            let len = self.expect(TokenKind::Number)?;
            let len = self.ast.add_node(NodeKind::ArrayLen, len);
            self.ast.push_child(decl, Some(len));
            self.expect(TokenKind::RightBracket)?;
            self.expect(TokenKind::Semicolon)?;
            Some(decl)
        } else {
            let decl = self.ast.add_node(NodeKind::VarDecl, name);
            self.expect(TokenKind::Semicolon)?;
            Some(decl)
        }
    }

    /// ```text
    /// int add(int a, int b) { ... }
    /// void sort(int xs[], int len) { ... }
    /// ```
    fn parse_function(&mut self) -> Option<NodeId> {
        let return_type = match self.input.kind() {
            INT => self.node_here(NodeKind::ReturnInt),
            VOID => self.node_here(NodeKind::ReturnVoid),
            _ => {
                self.unexpected("Invalid Return Type");
                return None;
            }
        };
        let name = self.expect(TokenKind::Ident)?;
        let func = self.ast.add_node(NodeKind::FuncDecl, name);
        self.ast.push_child(func, Some(return_type));

        self.expect(TokenKind::LeftParen)?;
        let params = self.parse_params()?;
        self.ast.push_child(func, Some(params));
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_compound()?;
        self.ast.push_child(func, Some(body));

        Some(func)
    }

    /// Either `void` or a comma separated list of parameters.
    fn parse_params(&mut self) -> Option<NodeId> {
        match self.input.kind() {
            VOID => Some(self.node_here(NodeKind::ParamVoid)),
            TokenKind::RightParen => {
                self.unexpected("Missing Parameter List");
                None
            }
            _ => self.parse_param_list(),
        }
    }

    fn parse_param_list(&mut self) -> Option<NodeId> {
        let mut params = SiblingList::default();
        loop {
            self.expect(INT)?;
            let name = self.expect(TokenKind::Ident)?;

            let param = if self.input.match_token(TokenKind::LeftBracket).is_some() {
                self.expect(TokenKind::RightBracket)?;
                self.ast.add_node(NodeKind::ParamArray, name)
            } else {
                self.ast.add_node(NodeKind::ParamInt, name)
            };
            self.ast.append_sibling(&mut params, param);

            if self.input.match_token(TokenKind::Comma).is_none() {
                break;
            }
        }
        params.head()
    }
}

#[cfg(test)]
mod test {
    use super::super::test::parse_str;
    use crate::ast::NodeKind;

    #[test]
    fn test_declaration_disambiguation() {
        let parsed = parse_str("int x; int xs[4]; int f(void) { } void g(int a, int b[]) { }");
        assert!(parsed.is_ok(), "{:?}", parsed.diagnostics);

        let ast = &parsed.ast;
        let kinds: Vec<_> = ast.siblings(ast.root()).map(|id| ast.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::VarDecl, NodeKind::ArrayDecl, NodeKind::FuncDecl, NodeKind::FuncDecl]
        );
    }

    #[test]
    fn test_params() {
        let parsed = parse_str("void g(int a, int b[]) { }");
        let ast = &parsed.ast;
        let func = ast.root().unwrap();
        assert_eq!(ast.kind(ast.child(func, 0).unwrap()), NodeKind::ReturnVoid);

        let params: Vec<_> = ast
            .siblings(ast.child(func, 1))
            .map(|id| (ast.kind(id), ast.node(id).token.lexeme.to_string()))
            .collect();
        assert_eq!(
            params,
            vec![(NodeKind::ParamInt, "a".to_string()), (NodeKind::ParamArray, "b".to_string())]
        );
    }

    #[test]
    fn test_missing_params() {
        let parsed = parse_str("int f() { }");
        assert_eq!(parsed.diagnostics[0].message, "Missing Parameter List");
    }

    #[test]
    fn test_void_variable_rejected() {
        let parsed = parse_str("void x;");
        assert!(!parsed.is_ok());
    }
}
