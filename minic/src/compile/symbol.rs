//! Scoped symbol table.
//!
//! Symbols and scopes share one arena. A scope is any symbol that owns
//! members: the global scope, functions (whose members are their
//! parameters and body block) and anonymous blocks.
use std::fmt::{self, Write};

use smol_str::SmolStr;

use crate::{
    ast::{Ast, NodeId, NodeKind, MAX_CHILDREN},
    constants::MAX_FRAME_SIZE,
    tokens::Token,
};

const INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// Root of the scope tree.
    Global,
    /// Anonymous scope of a compound statement.
    Block,
    Variable,
    /// Array with its declared length. Array parameters have no length.
    Array { len: Option<u32> },
    Function { ret: ReturnKind, params: Vec<ParamKind> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Int,
    Void,
}

impl ReturnKind {
    pub fn letter(&self) -> char {
        match self {
            ReturnKind::Int => 'I',
            ReturnKind::Void => 'V',
        }
    }
}

/// One letter of a call signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Array,
    /// Marks an empty parameter list.
    Void,
}

impl ParamKind {
    pub fn letter(&self) -> char {
        match self {
            ParamKind::Int => 'I',
            ParamKind::Array => 'A',
            ParamKind::Void => 'V',
        }
    }
}

/// Encodes parameter kinds as a signature string, `V` for none.
pub fn signature(params: &[ParamKind]) -> String {
    if params.is_empty() {
        "V".to_string()
    } else {
        params.iter().map(ParamKind::letter).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global,
    Local,
    Param,
}

impl Storage {
    pub fn letter(&self) -> char {
        match self {
            Storage::Global => 'G',
            Storage::Local => 'L',
            Storage::Param => 'P',
        }
    }
}

/// Built-in IO functions seeded into the global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Input,
    Output,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "input" => Some(Builtin::Input),
            "output" => Some(Builtin::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub storage: Storage,
    /// Offset from the frame base of the owning function, or from the
    /// global pointer for global storage.
    pub offset: i32,
    /// Declaring token.
    pub token: Token,
    /// Enclosing scope. Only the global scope has none.
    pub parent: Option<SymbolId>,
    /// Members in declaration order. Empty for non-scopes.
    members: Vec<SymbolId>,
    /// Storage allocated by the scope, including nested blocks.
    /// Only kept on functions and the global scope.
    frame_size: i32,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    pub fn frame_size(&self) -> i32 {
        self.frame_size
    }

    pub fn members(&self) -> &[SymbolId] {
        &self.members
    }

    /// Colon joined tag used by the symbol dump.
    ///
    /// ```text
    /// V:G:x:1
    /// A:L:xs:10
    /// A:P:xs:#
    /// F:G:main:I:V
    /// ```
    pub fn tag(&self) -> String {
        let storage = self.storage.letter();
        match &self.kind {
            SymbolKind::Global => "_global".to_string(),
            SymbolKind::Block => "B:_:_:_".to_string(),
            SymbolKind::Variable => format!("V:{}:{}:1", storage, self.name),
            SymbolKind::Array { len: Some(len) } => format!("A:{}:{}:{}", storage, self.name, len),
            SymbolKind::Array { len: None } => format!("A:{}:{}:#", storage, self.name),
            SymbolKind::Function { ret, params } => {
                format!("F:G:{}:{}:{}", self.name, ret.letter(), signature(params))
            }
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    /// Seeded `input` and `output` functions.
    builtins: [SymbolId; 2],
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table holding the global scope and the built-in functions.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: vec![],
            builtins: [SymbolId(0); 2],
        };
        let global = table.push(Symbol {
            name: SmolStr::new("_global"),
            kind: SymbolKind::Global,
            storage: Storage::Global,
            offset: 0,
            token: Token::builtin("_global"),
            parent: None,
            members: vec![],
            frame_size: 0,
        });

        for (slot, (name, ret, params)) in [
            ("input", ReturnKind::Int, vec![]),
            ("output", ReturnKind::Void, vec![ParamKind::Int]),
        ]
        .into_iter()
        .enumerate()
        {
            let builtin = table.new_symbol(global, Token::builtin(name), SymbolKind::Function { ret, params }, 0);
            table.insert(global, builtin);
            table.builtins[slot] = builtin;
        }

        table
    }

    #[inline]
    pub fn global(&self) -> SymbolId {
        SymbolId(0)
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Creates a symbol owned by `scope` without making it visible yet.
    pub fn new_symbol(&mut self, scope: SymbolId, token: Token, kind: SymbolKind, offset: i32) -> SymbolId {
        let storage = match self.get(scope).kind {
            SymbolKind::Global => Storage::Global,
            _ => Storage::Local,
        };
        self.push(Symbol {
            name: token.lexeme.clone(),
            kind,
            storage,
            offset,
            token,
            parent: Some(scope),
            members: vec![],
            frame_size: 0,
        })
    }

    /// Creates an anonymous block under `scope`, not yet inserted.
    pub fn new_block(&mut self, scope: SymbolId, token: Token) -> SymbolId {
        self.new_symbol(scope, token, SymbolKind::Block, 0)
    }

    /// Makes a symbol visible as a member of `scope`.
    pub fn insert(&mut self, scope: SymbolId, id: SymbolId) {
        self.get_mut(scope).members.push(id);
    }

    /// Drops a block that declared nothing.
    ///
    /// # Panics
    ///
    /// Panics when the block is not the most recently created symbol or has members.
    pub fn discard(&mut self, block: SymbolId) {
        assert_eq!(block.index() + 1, self.symbols.len(), "only the newest block can be discarded");
        assert!(self.get(block).members.is_empty(), "block has members");
        self.symbols.pop();
    }

    /// Member of `scope` with the given name, ignoring enclosing scopes.
    pub fn find_member(&self, scope: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(scope)
            .members
            .iter()
            .rev()
            .copied()
            .find(|id| self.get(*id).kind != SymbolKind::Block && self.get(*id).name == name)
    }

    /// Resolve a name by walking from `scope` outward to the global scope.
    pub fn lookup(&self, scope: SymbolId, name: &str) -> Option<SymbolId> {
        self.scope_chain(scope).find_map(|s| self.find_member(s, name))
    }

    /// `scope` followed by its enclosing scopes.
    pub fn scope_chain(&self, scope: SymbolId) -> impl Iterator<Item = SymbolId> + '_ {
        std::iter::successors(Some(scope), move |s| self.get(*s).parent)
    }

    /// Nearest function enclosing `scope`, if any.
    pub fn enclosing_function(&self, scope: SymbolId) -> Option<SymbolId> {
        self.scope_chain(scope).find(|s| self.get(*s).is_function())
    }

    /// Reserves `size` cells in the frame that owns `scope`.
    ///
    /// Blocks have no frame of their own, the request bubbles up to the
    /// nearest function or the global scope. Returns the offset of the
    /// first reserved cell, or `None` when the frame would grow past
    /// [`MAX_FRAME_SIZE`]. A failed request leaves the frame unchanged.
    pub fn allocate(&mut self, scope: SymbolId, size: i32) -> Option<i32> {
        let owner = self
            .scope_chain(scope)
            .find(|s| !matches!(self.get(*s).kind, SymbolKind::Block))
            .unwrap_or_else(|| self.global());
        let frame = &mut self.get_mut(owner).frame_size;
        let offset = *frame;
        *frame = offset.checked_add(size).filter(|end| *end <= MAX_FRAME_SIZE)?;
        Some(offset)
    }

    /// Built-in IO function the symbol stands for.
    pub fn builtin(&self, id: SymbolId) -> Option<Builtin> {
        match self.builtins.iter().position(|builtin| *builtin == id) {
            Some(0) => Some(Builtin::Input),
            Some(_) => Some(Builtin::Output),
            None => None,
        }
    }
}

// Text dump
impl SymbolTable {
    /// Scope tree followed by the reference listing, in the layout of the `.sym` artifact.
    pub fn dump(&self, ast: &Ast) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        writeln!(buf, "-------------------------------------------")?;
        writeln!(buf, "SymTab:      Name      Tag      Memory")?;
        writeln!(buf, "-------------------------------------------")?;
        writeln!(buf, "|---GLOBAL {}", self.get(self.global()).frame_size)?;
        self.dump_scope(&mut buf, self.global(), INDENT)?;
        writeln!(buf, "-------------------------------------------")?;
        writeln!(buf, "-------------------------------------------")?;
        writeln!(buf, "Symbol Reference: ")?;
        writeln!(buf, "-------------------------------------------")?;
        self.dump_references(&mut buf, ast, ast.root(), 0)?;
        writeln!(buf, "-------------------------------------------")?;
        Ok(buf)
    }

    fn dump_scope(&self, buf: &mut String, scope: SymbolId, indent: usize) -> fmt::Result {
        for &id in &self.get(scope).members {
            let symbol = self.get(id);
            if symbol.kind == SymbolKind::Block {
                writeln!(buf, "{:indent$}|--$BLOCK", "", indent = indent)?;
            } else {
                writeln!(
                    buf,
                    "{:indent$}|---{}, {}, {}",
                    "",
                    symbol.name,
                    symbol.tag(),
                    symbol.offset,
                    indent = indent
                )?;
            }
            if !symbol.members.is_empty() {
                self.dump_scope(buf, id, indent + INDENT)?;
            }
        }
        Ok(())
    }

    fn dump_references(&self, buf: &mut String, ast: &Ast, head: Option<NodeId>, indent: usize) -> fmt::Result {
        for id in ast.siblings(head) {
            let node = ast.node(id);
            match (node.kind, node.symbol) {
                (NodeKind::VarRef | NodeKind::ArrayRef | NodeKind::FuncCall, Some(symbol)) => {
                    let symbol = self.get(symbol);
                    writeln!(
                        buf,
                        "{:indent$}|---{} {} -> {} {}",
                        "",
                        node.token.lexeme,
                        node.token.pos,
                        symbol.tag(),
                        symbol.token.pos,
                        indent = indent
                    )?;
                }
                (NodeKind::FuncDecl, Some(symbol)) => {
                    let empty = if self.get(symbol).members.is_empty() { "EMPTY" } else { "" };
                    writeln!(buf, "{:indent$}|---{}:{}", "", node.token.lexeme, empty, indent = indent)?;
                }
                _ => {}
            }

            for slot in 0..MAX_CHILDREN {
                self.dump_references(buf, ast, ast.child(id, slot), INDENT)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::{Pos, TokenKind};

    fn ident(name: &str, row: u32) -> Token {
        Token::new(TokenKind::Ident, name, Pos::new(row, 1))
    }

    #[test]
    fn test_builtins_seeded() {
        let table = SymbolTable::new();
        let input = table.lookup(table.global(), "input").unwrap();
        let output = table.lookup(table.global(), "output").unwrap();
        assert_eq!(table.get(input).tag(), "F:G:input:I:V");
        assert_eq!(table.get(output).tag(), "F:G:output:V:I");
        assert_eq!(table.builtin(input), Some(Builtin::Input));
        assert_eq!(table.builtin(output), Some(Builtin::Output));
    }

    #[test]
    fn test_allocation_bubbles_to_function() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let func = table.new_symbol(
            global,
            ident("main", 1),
            SymbolKind::Function {
                ret: ReturnKind::Int,
                params: vec![],
            },
            0,
        );
        table.insert(global, func);
        let outer = table.new_block(func, ident("{", 1));
        let inner = table.new_block(outer, ident("{", 2));

        assert_eq!(table.allocate(outer, 1), Some(0));
        assert_eq!(table.allocate(inner, 10), Some(1));
        assert_eq!(table.allocate(outer, 1), Some(11));
        assert_eq!(table.get(func).frame_size(), 12);
        assert_eq!(table.get(global).frame_size(), 0);
    }

    #[test]
    fn test_allocation_past_frame_limit() {
        let mut table = SymbolTable::new();
        let global = table.global();

        assert_eq!(table.allocate(global, MAX_FRAME_SIZE), Some(0));
        assert_eq!(table.allocate(global, 1), None);
        assert_eq!(table.allocate(global, i32::MAX), None);
        assert_eq!(table.get(global).frame_size(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let x = table.new_symbol(global, ident("x", 1), SymbolKind::Variable, 0);
        table.insert(global, x);
        let block = table.new_block(global, ident("{", 2));
        table.insert(global, block);
        let shadow = table.new_symbol(block, ident("x", 3), SymbolKind::Variable, 0);
        table.insert(block, shadow);

        assert_eq!(table.lookup(block, "x"), Some(shadow));
        assert_eq!(table.lookup(global, "x"), Some(x));
        assert_eq!(table.find_member(block, "output"), None);
        assert!(table.lookup(block, "output").is_some());
    }

    #[test]
    fn test_discard_empty_block() {
        let mut table = SymbolTable::new();
        let count = table.len();
        let block = table.new_block(table.global(), ident("{", 1));
        table.discard(block);
        assert_eq!(table.len(), count);
    }

    #[test]
    fn test_signature() {
        assert_eq!(signature(&[]), "V");
        assert_eq!(signature(&[ParamKind::Void]), "V");
        assert_eq!(signature(&[ParamKind::Array, ParamKind::Int]), "AI");
    }
}
