use super::symbol::{Builtin, ParamKind, ReturnKind, Storage, SymbolId, SymbolKind, SymbolTable};
use crate::{
    ast::{Ast, NodeId, NodeKind, MAX_CHILDREN},
    error::{check_phase, Diagnostic, MinicResult, Phase},
    tokens::Token,
};

/// Builds up a symbol table and maps AST nodes to symbols.
///
/// Declarations are inserted into the active scope with an allocated
/// offset, references are resolved against the scope chain and the
/// resolved symbol is attached to the node.
pub struct Mapper {
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper {
    pub fn new() -> Self {
        Mapper {
            // Implicitly the mapper starts with a global scope.
            symbols: SymbolTable::new(),
            diagnostics: vec![],
        }
    }

    pub fn build_symbols(mut self, tree: &mut Ast) -> Mapped {
        let global = self.symbols.global();
        self.map_list(tree, tree.root(), global);
        log::debug!("mapped {} symbols", self.symbols.len());

        Mapped {
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn error(&mut self, message: &'static str, token: &Token) {
        self.diagnostics.push(Diagnostic::report(
            Phase::Symbol,
            message,
            token.lexeme.clone(),
            token.pos,
        ));
    }

    /// Reserves storage for a declaration. A frame that outgrows the
    /// machine is reported at the declaration, which still gets a symbol
    /// so later references resolve.
    fn allocate(&mut self, scope: SymbolId, size: i32, token: &Token) -> i32 {
        match self.symbols.allocate(scope, size) {
            Some(offset) => offset,
            None => {
                self.error("Frame Too Large", token);
                0
            }
        }
    }

    /// Reports a duplicate when `scope` already declares the name.
    fn check_duplicate(&mut self, scope: SymbolId, token: &Token) -> bool {
        if self.symbols.find_member(scope, &token.lexeme).is_some() {
            self.error("Duplicate Definition", token);
            true
        } else {
            false
        }
    }
}

// Visitor
impl Mapper {
    fn map_list(&mut self, tree: &mut Ast, head: Option<NodeId>, scope: SymbolId) {
        let mut next = head;
        while let Some(id) = next {
            self.map_node(tree, id, scope);
            next = tree.sibling(id);
        }
    }

    fn map_children(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId) {
        for slot in 0..MAX_CHILDREN {
            let child = tree.child(id, slot);
            self.map_list(tree, child, scope);
        }
    }

    fn map_node(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId) {
        match tree.kind(id) {
            NodeKind::VarDecl => self.map_var_decl(tree, id, scope, None),
            NodeKind::ArrayDecl => self.map_array_decl(tree, id, scope, None),
            NodeKind::FuncDecl => {
                if scope == self.symbols.global() {
                    self.map_func(tree, id);
                } else {
                    let token = tree.node(id).token.clone();
                    self.error("Nested Declaration", &token);
                }
            }
            NodeKind::Compound => self.map_block(tree, id, scope),
            NodeKind::VarRef | NodeKind::ArrayRef | NodeKind::FuncCall => {
                self.map_reference(tree, id, scope);
                self.map_children(tree, id, scope);
            }
            NodeKind::Return => {
                tree.node_mut(id).symbol = self.symbols.enclosing_function(scope);
                self.map_children(tree, id, scope);
            }
            _ => self.map_children(tree, id, scope),
        }
    }

    /// Scalar variable. Parameters pass their frame offset in `param_offset`.
    fn map_var_decl(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId, param_offset: Option<i32>) {
        let token = tree.node(id).token.clone();
        if self.check_duplicate(scope, &token) {
            return;
        }

        let offset = match param_offset {
            Some(offset) => offset,
            None => self.allocate(scope, 1, &token),
        };
        let symbol = self.symbols.new_symbol(scope, token, SymbolKind::Variable, offset);
        if param_offset.is_some() {
            self.symbols.get_mut(symbol).storage = Storage::Param;
        }
        self.symbols.insert(scope, symbol);
        tree.node_mut(id).symbol = Some(symbol);
    }

    fn map_array_decl(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId, param_offset: Option<i32>) {
        let token = tree.node(id).token.clone();
        if self.check_duplicate(scope, &token) {
            return;
        }

        let (len, offset) = match param_offset {
            // Parameters hold the address of the caller's array.
            Some(offset) => (None, offset),
            None => {
                // Malformed lengths are reported by the type checker.
                let len = tree
                    .child(id, 0)
                    .and_then(|len| tree.node(len).token.lexeme.parse::<u32>().ok())
                    .filter(|len| *len > 0 && *len <= i32::MAX as u32);
                let size = len.map(|len| len as i32).unwrap_or(1);
                (len, self.allocate(scope, size, &token))
            }
        };

        let symbol = self.symbols.new_symbol(scope, token, SymbolKind::Array { len }, offset);
        if param_offset.is_some() {
            self.symbols.get_mut(symbol).storage = Storage::Param;
        }
        self.symbols.insert(scope, symbol);
        tree.node_mut(id).symbol = Some(symbol);
    }

    fn map_func(&mut self, tree: &mut Ast, id: NodeId) {
        let global = self.symbols.global();
        let token = tree.node(id).token.clone();
        if self.check_duplicate(global, &token) {
            return;
        }

        let ret = match tree.child(id, 0).map(|ret| tree.kind(ret)) {
            Some(NodeKind::ReturnVoid) => ReturnKind::Void,
            _ => ReturnKind::Int,
        };
        let params: Vec<NodeId> = tree.siblings(tree.child(id, 1)).collect();
        let param_kinds = params
            .iter()
            .map(|param| match tree.kind(*param) {
                NodeKind::ParamArray => ParamKind::Array,
                NodeKind::ParamVoid => ParamKind::Void,
                _ => ParamKind::Int,
            })
            .collect();

        // Inserted before the body so the function can call itself.
        let func = self.symbols.new_symbol(
            global,
            token,
            SymbolKind::Function {
                ret,
                params: param_kinds,
            },
            0,
        );
        self.symbols.insert(global, func);
        tree.node_mut(id).symbol = Some(func);

        // Parameters sit below the saved frame pointer and return address,
        // the last one closest to the frame base.
        let count = params.len() as i32;
        for (i, param) in params.into_iter().enumerate() {
            let offset = -2 - (count - i as i32);
            match tree.kind(param) {
                NodeKind::ParamInt => self.map_var_decl(tree, param, func, Some(offset)),
                NodeKind::ParamArray => self.map_array_decl(tree, param, func, Some(offset)),
                _ => {}
            }
        }

        let body = tree.child(id, 2);
        self.map_list(tree, body, func);
    }

    fn map_block(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId) {
        let token = tree.node(id).token.clone();
        let block = self.symbols.new_block(scope, token);
        self.map_children(tree, id, block);

        if self.symbols.get(block).members().is_empty() {
            self.symbols.discard(block);
        } else {
            self.symbols.insert(scope, block);
            tree.node_mut(id).symbol = Some(block);
        }
    }

    fn map_reference(&mut self, tree: &mut Ast, id: NodeId, scope: SymbolId) {
        let node = tree.node(id);
        let token = node.token.clone();

        // Built-ins can't be shadowed by calls from nested scopes.
        let lookup_scope = match (node.kind, Builtin::from_name(&token.lexeme)) {
            (NodeKind::FuncCall, Some(_)) => self.symbols.global(),
            _ => scope,
        };

        match self.symbols.lookup(lookup_scope, &token.lexeme) {
            Some(symbol) => tree.node_mut(id).symbol = Some(symbol),
            None => self.error("Undefined Symbol", &token),
        }
    }
}

/// Output of the symbol pass.
#[derive(Debug)]
pub struct Mapped {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl Mapped {
    /// Success flag of the symbol phase.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_result(self) -> MinicResult<SymbolTable> {
        check_phase(Phase::Symbol, self.diagnostics)?;
        Ok(self.symbols)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{lex::Lexer, parsing::parse};

    fn map_str(source: &str) -> (Ast, Mapped) {
        let tokens = Lexer::new(source).scan().into_result().unwrap();
        let mut ast = parse(&tokens).into_result().unwrap();
        let mapped = Mapper::new().build_symbols(&mut ast);
        (ast, mapped)
    }

    fn messages(mapped: &Mapped) -> Vec<&'static str> {
        mapped.diagnostics.iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let (_, mapped) = map_str("int x; int x;");
        assert_eq!(messages(&mapped), vec!["Duplicate Definition"]);

        let (_, mapped) = map_str("void f(int a) { int a; }");
        assert!(mapped.is_ok(), "body block is nested inside the parameter scope");

        let (_, mapped) = map_str("void f(int a, int a) { }");
        assert_eq!(messages(&mapped), vec!["Duplicate Definition"]);

        let (_, mapped) = map_str("int output;");
        assert_eq!(messages(&mapped), vec!["Duplicate Definition"]);
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let (_, mapped) = map_str("int x; void f(void) { int x; { int x; x = 1; } }");
        assert!(mapped.is_ok(), "{:?}", mapped.diagnostics);
    }

    #[test]
    fn test_undefined_symbol() {
        let (_, mapped) = map_str("void f(void) { y = 1; g(); }");
        assert_eq!(messages(&mapped), vec!["Undefined Symbol", "Undefined Symbol"]);
    }

    #[test]
    fn test_block_scope_ends() {
        let (_, mapped) = map_str("void f(void) { { int x; } x = 1; }");
        assert_eq!(messages(&mapped), vec!["Undefined Symbol"]);
    }

    #[test]
    fn test_offsets() {
        let (_, mapped) = map_str(
            "int g; int h[3]; int f(int a, int b[], int c) { int x; { int y[4]; } { int z; } return 0; }",
        );
        let table = mapped.into_result().unwrap();
        let global = table.global();
        let offset_of = |scope, name| table.get(table.lookup(scope, name).unwrap()).offset;

        assert_eq!(offset_of(global, "g"), 0);
        assert_eq!(offset_of(global, "h"), 1);
        assert_eq!(table.get(global).frame_size(), 4);

        let f = table.lookup(global, "f").unwrap();
        assert_eq!(table.get(f).tag(), "F:G:f:I:IAI");
        assert_eq!(offset_of(f, "a"), -5);
        assert_eq!(offset_of(f, "b"), -4);
        assert_eq!(offset_of(f, "c"), -3);
        assert_eq!(table.get(table.lookup(f, "b").unwrap()).tag(), "A:P:b:#");
        assert_eq!(table.get(table.lookup(f, "a").unwrap()).tag(), "V:P:a:1");
        assert_eq!(table.get(f).frame_size(), 6);
    }

    #[test]
    fn test_frame_too_large() {
        let (_, mapped) = map_str("int a[2000000000]; int b[2000000000]; void main(void) { b[0] = 1; }");
        let found: Vec<_> = mapped
            .diagnostics
            .iter()
            .map(|d| (d.message, d.lexeme.as_str(), d.pos.col))
            .collect();
        assert_eq!(found, vec![("Frame Too Large", "a", 5), ("Frame Too Large", "b", 24)]);

        let (_, mapped) = map_str("int a[1000000000]; int b[1000000000]; void main(void) { }");
        assert_eq!(messages(&mapped), vec!["Frame Too Large"]);

        let (_, mapped) = map_str("void f(void) { int a[2147483647]; int x; }");
        assert_eq!(messages(&mapped), vec!["Frame Too Large"]);
    }

    #[test]
    fn test_return_annotated_with_function() {
        let (ast, mapped) = map_str("int f(void) { return 1; }");
        let func = ast.root().unwrap();
        let body = ast.child(func, 2).unwrap();
        let ret = ast.child(body, 1).unwrap();
        assert_eq!(ast.node(ret).symbol, ast.node(func).symbol);
        assert!(mapped.is_ok());
    }

    #[test]
    fn test_builtin_resolves_globally() {
        let (ast, mapped) = map_str("void f(void) { int output; output(1); }");
        assert!(mapped.is_ok());
        let body = ast.child(ast.root().unwrap(), 2).unwrap();
        let call = ast.child(body, 1).unwrap();
        let symbol = ast.node(call).symbol.unwrap();
        assert!(mapped.symbols.get(symbol).is_function());
    }

    #[test]
    fn test_dump() {
        let (ast, mapped) = map_str("int x; void main(void) { x = 1; }");
        let dump = mapped.symbols.dump(&ast).unwrap();
        assert!(dump.contains("|---GLOBAL 1\n"));
        assert!(dump.contains("|---x, V:G:x:1, 0\n"));
        assert!(dump.contains("|---main, F:G:main:V:V, 0\n"));
        assert!(dump.contains("x (1,26) -> V:G:x:1 (1,5)"));
    }
}
