//! Expression parsing.
//!
//! Precedence, lowest first:
//!
//! ```text
//! expr      = var "=" expr | simple
//! simple    = additive (relop additive)*
//! additive  = [+|-] term ((+|-) term)*
//! term      = factor ((*|/) factor)*
//! factor    = "(" expr ")" | NUM | call | var
//! ```
//!
//! A reference that turns out not to be an assignment target is handed
//! down as the seed of the left-most factor, so it still binds at the
//! correct precedence.
use super::Parser;
use crate::{
    ast::{NodeId, NodeKind, SiblingList},
    tokens::TokenKind,
};

impl<'a> Parser<'a> {
    pub(super) fn parse_expression(&mut self) -> NodeId {
        use TokenKind as T;

        let starts_reference =
            self.input.at(T::Ident) && matches!(self.input.peek_nth(1), T::Eq | T::LeftBracket);

        let lhs = if starts_reference {
            let var = self.parse_var();
            if self.input.at(T::Eq) {
                return self.parse_assignment(var);
            }
            self.parse_simple(Some(var))
        } else {
            self.parse_simple(None)
        };

        if self.input.at(T::Eq) {
            // Not an lvalue. Kept as an assignment so the type checker
            // can report the target.
            return self.parse_assignment(lhs);
        }

        lhs
    }

    /// Right associative `target = expr`.
    fn parse_assignment(&mut self, target: NodeId) -> NodeId {
        let assign = self.node_here(NodeKind::Assign);
        let value = self.parse_expression();
        self.ast.push_child(assign, Some(target));
        self.ast.push_child(assign, Some(value));
        assign
    }

    fn parse_simple(&mut self, seed: Option<NodeId>) -> NodeId {
        let mut lhs = self.parse_additive(seed);
        while self.input.kind().is_relational() {
            lhs = self.parse_binary(NodeKind::RelOp, Some(lhs), Self::parse_additive_unseeded);
        }
        lhs
    }

    fn parse_additive_unseeded(&mut self) -> NodeId {
        self.parse_additive(None)
    }

    fn parse_additive(&mut self, seed: Option<NodeId>) -> NodeId {
        let mut lhs = match seed {
            Some(seed) => self.parse_term(Some(seed)),
            // Unary sign, the missing left operand stands for zero.
            None if self.input.kind().is_additive() => self.parse_binary(NodeKind::AddOp, None, Self::parse_factor_term),
            None => self.parse_term(None),
        };
        while self.input.kind().is_additive() {
            lhs = self.parse_binary(NodeKind::AddOp, Some(lhs), Self::parse_factor_term);
        }
        lhs
    }

    fn parse_factor_term(&mut self) -> NodeId {
        self.parse_term(None)
    }

    fn parse_term(&mut self, seed: Option<NodeId>) -> NodeId {
        let mut lhs = match seed {
            Some(seed) => seed,
            None => self.parse_factor(),
        };
        while self.input.kind().is_multiplicative() {
            lhs = self.parse_binary(NodeKind::MulOp, Some(lhs), Self::parse_factor);
        }
        lhs
    }

    /// Consumes the operator under the cursor and parses its right operand.
    fn parse_binary(&mut self, kind: NodeKind, lhs: Option<NodeId>, rhs: fn(&mut Self) -> NodeId) -> NodeId {
        let op = self.node_here(kind);
        let rhs = rhs(self);
        self.ast.push_child(op, lhs);
        self.ast.push_child(op, Some(rhs));
        op
    }

    fn parse_factor(&mut self) -> NodeId {
        use TokenKind as T;

        match self.input.kind() {
            T::LeftParen => {
                self.input.advance();
                let inner = self.parse_expression();
                self.expect(T::RightParen);
                inner
            }
            T::Number => self.node_here(NodeKind::Num),
            T::Ident if self.input.peek_nth(1) == T::LeftParen => self.parse_call(),
            T::Ident => self.parse_var(),
            _ => {
                let token = self.unexpected("Unexpected Token");
                self.ast.add_node(NodeKind::Invalid, token)
            }
        }
    }

    /// `name` or `name [ expr ]`
    fn parse_var(&mut self) -> NodeId {
        let name = self.input.advance();
        if self.input.match_token(TokenKind::LeftBracket).is_some() {
            let var = self.ast.add_node(NodeKind::ArrayRef, name);
            let index = self.parse_expression();
            self.ast.push_child(var, Some(index));
            self.expect(TokenKind::RightBracket);
            var
        } else {
            self.ast.add_node(NodeKind::VarRef, name)
        }
    }

    /// `name ( args )`
    fn parse_call(&mut self) -> NodeId {
        let call = self.node_here(NodeKind::FuncCall);
        self.expect(TokenKind::LeftParen);

        let mut args = SiblingList::default();
        while !self.input.at(TokenKind::RightParen) && !self.input.at_end() {
            let arg = self.parse_expression();
            self.ast.append_sibling(&mut args, arg);
            if !self.input.at(TokenKind::RightParen) && self.expect(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.ast.push_child(call, args.head());
        self.expect(TokenKind::RightParen);

        call
    }
}

#[cfg(test)]
mod test {
    use super::super::test::parse_str;
    use crate::ast::{Ast, NodeId, NodeKind};

    /// Renders an expression tree in prefix form.
    fn sexpr(ast: &Ast, id: NodeId) -> String {
        let node = ast.node(id);
        let operands: Vec<_> = (0..2).filter_map(|slot| ast.child(id, slot)).map(|c| sexpr(ast, c)).collect();
        match node.kind {
            NodeKind::Num | NodeKind::VarRef => node.token.lexeme.to_string(),
            NodeKind::FuncCall => {
                let args: Vec<_> = ast.siblings(ast.child(id, 0)).map(|c| sexpr(ast, c)).collect();
                format!("{}({})", node.token.lexeme, args.join(","))
            }
            NodeKind::ArrayRef => format!("{}[{}]", node.token.lexeme, operands.join("")),
            NodeKind::AddOp if ast.child(id, 0).is_none() => format!("(u{} {})", node.token.lexeme, operands.join(" ")),
            _ => format!("({} {})", node.token.lexeme, operands.join(" ")),
        }
    }

    fn parse_expr(source: &str) -> String {
        let parsed = parse_str(&format!("void f(void) {{ {}; }}", source));
        assert!(parsed.is_ok(), "{:?}", parsed.diagnostics);
        let ast = &parsed.ast;
        let body = ast.child(ast.root().unwrap(), 2).unwrap();
        sexpr(ast, ast.child(body, 1).unwrap())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(parse_expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(parse_expr("a < b + 1"), "(< a (+ b 1))");
        assert_eq!(parse_expr("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 3"), "(= a (= b 3))");
        assert_eq!(parse_expr("xs[i + 1] = 2"), "(= xs[(+ i 1)] 2)");
    }

    #[test]
    fn test_indexed_reference_keeps_precedence() {
        assert_eq!(parse_expr("xs[0] * 2 + 1"), "(+ (* xs[0] 2) 1)");
        assert_eq!(parse_expr("xs[0] < 3"), "(< xs[0] 3)");
    }

    #[test]
    fn test_unary_sign() {
        assert_eq!(parse_expr("-x * 2"), "(u- (* x 2))");
        assert_eq!(parse_expr("x = -1"), "(= x (u- 1))");
    }

    #[test]
    fn test_calls() {
        assert_eq!(parse_expr("output(f(1, x[2]) + input())"), "output((+ f(1,x[2]) input()))");
    }

    #[test]
    fn test_non_lvalue_assignment_parses() {
        assert_eq!(parse_expr("f() = 1"), "(= f() 1)");
    }

    #[test]
    fn test_missing_operand() {
        let parsed = parse_str("void f(void) { x = 1 + ; }");
        assert!(!parsed.is_ok());
    }
}
