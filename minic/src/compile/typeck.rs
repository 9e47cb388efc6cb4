//! Static type checking.
use super::symbol::{signature, ReturnKind, SymbolKind, SymbolTable};
use crate::{
    ast::{Ast, NodeId, NodeKind, ValueType, MAX_CHILDREN},
    error::{check_phase, Diagnostic, MinicResult, Phase},
};

/// Post-order pass assigning a [`ValueType`] to every expression node.
///
/// Expects every reference to carry its resolved symbol.
pub struct TypeChecker<'a> {
    symbols: &'a SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            diagnostics: vec![],
        }
    }

    pub fn check(mut self, tree: &mut Ast) -> Checked {
        self.check_list(tree, tree.root());
        Checked {
            diagnostics: self.diagnostics,
        }
    }

    fn error(&mut self, tree: &Ast, message: &'static str, id: NodeId) {
        let token = &tree.node(id).token;
        self.diagnostics.push(Diagnostic::report(
            Phase::Type,
            message,
            token.lexeme.clone(),
            token.pos,
        ));
    }

    fn ty(tree: &Ast, id: Option<NodeId>) -> ValueType {
        id.map(|id| tree.node(id).ty).unwrap_or(ValueType::Void)
    }
}

// Visitor
impl<'a> TypeChecker<'a> {
    fn check_list(&mut self, tree: &mut Ast, head: Option<NodeId>) {
        let mut next = head;
        while let Some(id) = next {
            self.check_node(tree, id);
            next = tree.sibling(id);
        }
    }

    fn check_node(&mut self, tree: &mut Ast, id: NodeId) {
        for slot in 0..MAX_CHILDREN {
            let child = tree.child(id, slot);
            self.check_list(tree, child);
        }

        let ty = match tree.kind(id) {
            NodeKind::Num => self.check_num(tree, id),
            NodeKind::VarRef => self.check_var(tree, id),
            NodeKind::ArrayRef => self.check_array_ref(tree, id),
            NodeKind::FuncCall => self.check_call(tree, id),
            NodeKind::AddOp | NodeKind::MulOp | NodeKind::RelOp => self.check_operator(tree, id),
            NodeKind::Assign => self.check_assign(tree, id),
            NodeKind::If | NodeKind::While => {
                self.check_condition(tree, id);
                ValueType::Unknown
            }
            NodeKind::Return => {
                self.check_return(tree, id);
                ValueType::Unknown
            }
            NodeKind::ArrayDecl => {
                self.check_array_len(tree, id);
                ValueType::Unknown
            }
            NodeKind::Invalid => ValueType::Invalid,
            _ => ValueType::Unknown,
        };
        tree.node_mut(id).ty = ty;
    }

    fn check_num(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        if tree.node(id).token.lexeme.parse::<i32>().is_ok() {
            ValueType::Literal
        } else {
            self.error(tree, "Number Out Of Range", id);
            ValueType::Invalid
        }
    }

    fn check_var(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        let Some(symbol) = tree.node(id).symbol else {
            return ValueType::Invalid;
        };
        match self.symbols.get(symbol).kind {
            SymbolKind::Variable => ValueType::Int,
            SymbolKind::Array { .. } => ValueType::Array,
            _ => {
                self.error(tree, "Function Used As Variable", id);
                ValueType::Invalid
            }
        }
    }

    fn check_array_ref(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        let Some(symbol) = tree.node(id).symbol else {
            return ValueType::Invalid;
        };
        let SymbolKind::Array { len } = self.symbols.get(symbol).kind else {
            self.error(tree, "Wrong Array Call", id);
            return ValueType::Invalid;
        };

        let Some(index) = tree.child(id, 0) else {
            return ValueType::Invalid;
        };
        match tree.node(index).ty {
            ValueType::Invalid => ValueType::Invalid,
            ty if !ty.is_scalar() => {
                self.error(tree, "Wrong Index Value Type", index);
                ValueType::Invalid
            }
            ValueType::Literal => {
                // Constant index on a sized array is checked up front.
                let value = tree.node(index).token.lexeme.parse::<i64>().unwrap_or(0);
                match len {
                    Some(len) if value >= len as i64 => {
                        self.error(tree, "Array Index Out Of Range", index);
                        ValueType::Invalid
                    }
                    _ => ValueType::Int,
                }
            }
            _ => ValueType::Int,
        }
    }

    fn check_call(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        let Some(symbol) = tree.node(id).symbol else {
            return ValueType::Invalid;
        };
        let symbols = self.symbols;
        let SymbolKind::Function { ret, params } = &symbols.get(symbol).kind else {
            self.error(tree, "Not A Function", id);
            return ValueType::Invalid;
        };
        let ret_ty = match ret {
            ReturnKind::Int => ValueType::Int,
            ReturnKind::Void => ValueType::Void,
        };

        let mut actual = String::new();
        for arg in tree.siblings(tree.child(id, 0)) {
            match tree.node(arg).ty {
                ValueType::Int | ValueType::Literal => actual.push('I'),
                ValueType::Array => actual.push('A'),
                ValueType::Void => actual.push('V'),
                // Already reported.
                ValueType::Invalid => return ret_ty,
                ValueType::Unknown => {
                    self.error(tree, "Unexpected Value Type", arg);
                    return ret_ty;
                }
            }
        }
        if actual.is_empty() {
            actual.push('V');
        }

        if actual != signature(params) {
            self.error(tree, "Args Type Not Match", id);
        }
        ret_ty
    }

    fn check_operator(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        let mut ty = ValueType::Int;
        // Left operand is absent for a unary sign.
        for operand in [tree.child(id, 0), tree.child(id, 1)].into_iter().flatten() {
            match tree.node(operand).ty {
                ValueType::Invalid => ty = ValueType::Invalid,
                operand_ty if !operand_ty.is_scalar() => {
                    self.error(tree, "Invalid Value Type", operand);
                    ty = ValueType::Invalid;
                }
                _ => {}
            }
        }
        ty
    }

    fn check_assign(&mut self, tree: &Ast, id: NodeId) -> ValueType {
        let (Some(target), Some(value)) = (tree.child(id, 0), tree.child(id, 1)) else {
            return ValueType::Invalid;
        };
        let mut ty = ValueType::Int;

        let target_node = tree.node(target);
        match target_node.ty {
            ValueType::Invalid => ty = ValueType::Invalid,
            ValueType::Int if target_node.kind.is_lvalue() => {}
            _ => {
                self.error(tree, "Left Value Must Be Variable", target);
                ty = ValueType::Invalid;
            }
        }

        match tree.node(value).ty {
            ValueType::Invalid => ty = ValueType::Invalid,
            value_ty if !value_ty.is_scalar() => {
                self.error(tree, "Invalid Right Value", value);
                ty = ValueType::Invalid;
            }
            _ => {}
        }

        ty
    }

    fn check_condition(&mut self, tree: &Ast, id: NodeId) {
        if let Some(cond) = tree.child(id, 0) {
            let ty = tree.node(cond).ty;
            if ty != ValueType::Invalid && !ty.is_scalar() {
                self.error(tree, "Unexpected Condition Type", cond);
            }
        }
    }

    fn check_return(&mut self, tree: &Ast, id: NodeId) {
        let value = tree.child(id, 0);
        let value_ty = Self::ty(tree, value);
        if value_ty == ValueType::Invalid {
            return;
        }
        if let Some(value) = value {
            if !value_ty.is_scalar() {
                self.error(tree, "Invalid Return Value Type", value);
                return;
            }
        }

        let symbols = self.symbols;
        let expected = tree.node(id).symbol.map(|func| &symbols.get(func).kind);
        let matches = match expected {
            Some(SymbolKind::Function { ret: ReturnKind::Int, .. }) => value.is_some(),
            Some(SymbolKind::Function { ret: ReturnKind::Void, .. }) => value.is_none(),
            _ => true,
        };
        if !matches {
            self.error(tree, "Return Type Does Not Match", id);
        }
    }

    fn check_array_len(&mut self, tree: &Ast, id: NodeId) {
        if let Some(len) = tree.child(id, 0) {
            let valid = tree
                .node(len)
                .token
                .lexeme
                .parse::<i32>()
                .map(|len| len > 0)
                .unwrap_or(false);
            if !valid {
                self.error(tree, "Invalid Array Length", len);
            }
        }
    }
}

/// Output of the type checker.
#[derive(Debug)]
pub struct Checked {
    pub diagnostics: Vec<Diagnostic>,
}

impl Checked {
    /// Success flag of the type phase.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_result(self) -> MinicResult<()> {
        check_phase(Phase::Type, self.diagnostics)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{compile::Mapper, lex::Lexer, parsing::parse};

    fn check_str(source: &str) -> Vec<(&'static str, String)> {
        let tokens = Lexer::new(source).scan().into_result().unwrap();
        let mut ast = parse(&tokens).into_result().unwrap();
        let symbols = Mapper::new().build_symbols(&mut ast).into_result().unwrap();
        TypeChecker::new(&symbols)
            .check(&mut ast)
            .diagnostics
            .into_iter()
            .map(|d| (d.message, d.lexeme.to_string()))
            .collect()
    }

    fn messages(source: &str) -> Vec<&'static str> {
        check_str(source).into_iter().map(|(message, _)| message).collect()
    }

    #[test]
    fn test_valid_program() {
        let errors = check_str(include_str!("../../tests/programs/sort.mc"));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_return_mismatch() {
        assert_eq!(
            check_str("int f(void){ return 1; } void g(void){ return f(); }"),
            vec![("Return Type Does Not Match", "return".to_string())]
        );
        assert_eq!(messages("int f(void) { return; }"), vec!["Return Type Does Not Match"]);
        assert_eq!(messages("void f(void) { return output(1); }"), vec!["Invalid Return Value Type"]);
        assert!(messages("void f(void) { return; } int g(void) { return 2; }").is_empty());
    }

    #[test]
    fn test_assignment_target() {
        assert_eq!(messages("int a[3]; void f(void) { a = 1; }"), vec!["Left Value Must Be Variable"]);
        assert_eq!(messages("int f(void) { f() = 1; return 0; }"), vec!["Left Value Must Be Variable"]);
        assert_eq!(messages("int a[3]; void f(void) { int x; x = a; }"), vec!["Invalid Right Value"]);
        assert!(messages("int a[3]; void f(void) { int x; x = a[1] = 2; }").is_empty());
    }

    #[test]
    fn test_operands_must_be_scalar() {
        assert_eq!(messages("int a[3]; void f(void) { output(a + 1); }"), vec!["Invalid Value Type"]);
        assert_eq!(messages("void f(void) { output(1 + output(2)); }"), vec!["Invalid Value Type"]);
    }

    #[test]
    fn test_array_access() {
        assert_eq!(messages("void f(void) { int x; x[0] = 1; }"), vec!["Wrong Array Call"]);
        assert_eq!(messages("int a[3]; void f(void) { a[a] = 1; }"), vec!["Wrong Index Value Type"]);
        assert_eq!(messages("int a[3]; void f(void) { a[3] = 1; }"), vec!["Array Index Out Of Range"]);
        assert!(messages("void f(int a[]) { a[30] = 1; }").is_empty());
    }

    #[test]
    fn test_call_signature() {
        assert_eq!(messages("void f(void) { output(); }"), vec!["Args Type Not Match"]);
        assert_eq!(messages("void f(void) { input(1); }"), vec!["Args Type Not Match"]);
        assert_eq!(
            messages("int a[2]; void g(int x[], int y) { } void f(void) { g(1, a); }"),
            vec!["Args Type Not Match"]
        );
        assert!(messages("int a[2]; void g(int x[], int y) { } void f(void) { g(a, a[0]); }").is_empty());
        assert_eq!(messages("int x; void f(void) { x(); }"), vec!["Not A Function"]);
        assert_eq!(messages("void f(void) { output(f); }"), vec!["Function Used As Variable"]);
    }

    #[test]
    fn test_condition_type() {
        assert_eq!(messages("int a[2]; void f(void) { while (a) { } }"), vec!["Unexpected Condition Type"]);
        assert_eq!(messages("void f(void) { if (output(1)) { } }"), vec!["Unexpected Condition Type"]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(messages("void f(void) { output(2147483648); }"), vec!["Number Out Of Range"]);
        assert_eq!(messages("int a[0];"), vec!["Invalid Array Length"]);
    }
}
