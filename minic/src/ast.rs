//! Abstract syntax tree.
//!
//! Nodes live in an arena owned by [`Ast`] and are addressed by [`NodeId`].
//! Repetition (declaration, statement, parameter and argument lists) is
//! expressed as a chain of `sibling` links starting at a list head.
use std::fmt::{self, Write};

use crate::{compile::SymbolId, tokens::Token};

/// Number of ordered child slots per node.
pub const MAX_CHILDREN: usize = 3;

const INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statement and expression tags.
///
/// Child slot layout per tag:
///
/// | tag            | slot 0            | slot 1            | slot 2     |
/// |----------------|-------------------|-------------------|------------|
/// | `ArrayDecl`    | `ArrayLen`        |                   |            |
/// | `FuncDecl`     | return type       | parameter list    | body       |
/// | `Compound`     | local declarations| statement list    |            |
/// | `If`           | condition         | then              | else       |
/// | `While`        | condition         | body              |            |
/// | `Return`       | value             |                   |            |
/// | `Assign`       | target            | value             |            |
/// | operators      | left (optional)   | right             |            |
/// | `ArrayRef`     | index             |                   |            |
/// | `FuncCall`     | argument list     |                   |            |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    VarDecl,
    ArrayDecl,
    ArrayLen,
    FuncDecl,
    ReturnInt,
    ReturnVoid,
    ParamVoid,
    ParamInt,
    ParamArray,
    Compound,
    If,
    While,
    Return,
    Assign,
    RelOp,
    AddOp,
    MulOp,
    FuncCall,
    Num,
    VarRef,
    ArrayRef,
    /// Placeholder produced by syntax error recovery.
    Invalid,
}

impl NodeKind {
    /// Expressions allowed on the left side of an assignment.
    pub fn is_lvalue(&self) -> bool {
        matches!(self, NodeKind::VarRef | NodeKind::ArrayRef)
    }
}

/// Type assigned to an expression node by the type checker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Not yet checked, or not an expression.
    #[default]
    Unknown,
    Int,
    Array,
    Void,
    /// Integer literal.
    Literal,
    Invalid,
}

impl ValueType {
    /// Integer valued, usable as an arithmetic operand.
    pub fn is_scalar(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Literal)
    }
}

impl fmt::Display for ValueType {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueType::Unknown => write!(f, "unknown"),
            ValueType::Int     => write!(f, "int"),
            ValueType::Array   => write!(f, "array"),
            ValueType::Void    => write!(f, "void"),
            ValueType::Literal => write!(f, "literal"),
            ValueType::Invalid => write!(f, "invalid"),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Token the node originates from.
    pub token: Token,
    children: [Option<NodeId>; MAX_CHILDREN],
    /// Next free child slot.
    child_count: usize,
    sibling: Option<NodeId>,
    /// Set once the node is attached as a child or sibling.
    attached: bool,
    pub symbol: Option<SymbolId>,
    pub ty: ValueType,
}

#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    /// Head of the top level declaration list.
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, kind: NodeKind, token: Token) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            token,
            children: [None; MAX_CHILDREN],
            child_count: 0,
            sibling: None,
            attached: false,
            symbol: None,
            ty: ValueType::Unknown,
        });
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// Node in the given child slot.
    #[inline]
    pub fn child(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        self.node(id).children[slot]
    }

    #[inline]
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).sibling
    }

    /// Fill the next child slot. An absent child still takes up its slot.
    ///
    /// # Panics
    ///
    /// Panics when all slots are taken, or the child is already part of the tree.
    pub fn push_child(&mut self, parent: NodeId, child: Option<NodeId>) {
        let slot = self.node(parent).child_count;
        assert!(slot < MAX_CHILDREN, "node {:?} has no free child slot", parent);
        if let Some(child) = child {
            self.attach(child);
        }
        let node = self.node_mut(parent);
        node.children[slot] = child;
        node.child_count += 1;
    }

    /// Append a node to the end of a sibling chain under construction.
    pub fn append_sibling(&mut self, list: &mut SiblingList, node: NodeId) {
        match list.tail {
            None => list.head = Some(node),
            Some(tail) => {
                self.attach(node);
                self.node_mut(tail).sibling = Some(node);
            }
        }
        list.tail = Some(node);
    }

    /// Iterate a sibling chain starting at `head`.
    pub fn siblings(&self, head: Option<NodeId>) -> Siblings<'_> {
        Siblings { ast: self, next: head }
    }

    fn attach(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        assert!(!node.attached, "node {:?} already has a parent", id);
        node.attached = true;
    }
}

/// Sibling chain being built up, remembers its last node.
#[derive(Debug, Default, Clone, Copy)]
pub struct SiblingList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl SiblingList {
    /// First node of the chain, the value stored in a child slot.
    #[inline]
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }
}

pub struct Siblings<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.ast.sibling(current);
        Some(current)
    }
}

// Text dump
impl Ast {
    /// Indented printout of the tree, in the layout of the `.ast` artifact.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        writeln!(buf, "--------------------------------------------")?;
        writeln!(buf, "Abstract Syntax Tree:")?;
        writeln!(buf, "--------------------------------------------")?;
        self.dump_list(&mut buf, self.root, 0)?;
        writeln!(buf, "--------------------------------------------")?;
        Ok(buf)
    }

    fn dump_list(&self, buf: &mut String, head: Option<NodeId>, indent: usize) -> fmt::Result {
        for id in self.siblings(head) {
            self.dump_node(buf, id, indent)?;
        }
        Ok(())
    }

    fn dump_node(&self, buf: &mut String, id: NodeId, indent: usize) -> fmt::Result {
        use NodeKind as N;

        let node = self.node(id);
        let name = node.token.lexeme.as_str();
        let inner = indent + INDENT;
        let nested = indent + INDENT * 2;
        write!(buf, "{:indent$}|---", "", indent = indent)?;

        match node.kind {
            N::VarRef => writeln!(buf, "VAR_CALL: {}", name),
            N::Num => writeln!(buf, "NUM: {}", name),
            N::ArrayLen => writeln!(buf, "ARR_LEN: {}", name),
            N::ParamInt => writeln!(buf, "INT: {}", name),
            N::ParamArray => writeln!(buf, "ARR: {}", name),
            N::ParamVoid => writeln!(buf, "PARAM: void"),
            N::VarDecl => writeln!(buf, "VAR_DECL: {}", name),
            N::ReturnInt | N::ReturnVoid => writeln!(buf, "RETURN_TYPE: {}", name),
            N::Invalid => writeln!(buf, "???{}", name),
            N::ArrayDecl | N::ArrayRef | N::RelOp | N::AddOp | N::MulOp => {
                let label = match node.kind {
                    N::ArrayDecl => "ARR_DECL",
                    N::ArrayRef => "ARR_CALL",
                    N::RelOp => "RELOP",
                    N::AddOp => "ADDOP",
                    _ => "MULOP",
                };
                writeln!(buf, "{}: {}", label, name)?;
                self.dump_children(buf, id, inner)
            }
            N::Assign => {
                writeln!(buf, "ASSIGN: ")?;
                self.dump_children(buf, id, inner)
            }
            N::If => {
                writeln!(buf, "IF_STMT: ")?;
                writeln!(buf, "{:inner$}|---IF_COND: ", "", inner = inner)?;
                self.dump_list(buf, self.child(id, 0), nested)?;
                writeln!(buf, "{:inner$}|---IF_TRUE: ", "", inner = inner)?;
                self.dump_list(buf, self.child(id, 1), nested)?;
                if self.child(id, 2).is_some() {
                    writeln!(buf, "{:inner$}|---IF_FALSE: ", "", inner = inner)?;
                    self.dump_list(buf, self.child(id, 2), nested)?;
                }
                Ok(())
            }
            N::While => {
                writeln!(buf, "ITER_STMT: ")?;
                writeln!(buf, "{:inner$}|---ITER_COND: ", "", inner = inner)?;
                self.dump_list(buf, self.child(id, 0), nested)?;
                writeln!(buf, "{:inner$}|---ITER_BODY: ", "", inner = inner)?;
                self.dump_list(buf, self.child(id, 1), nested)
            }
            N::FuncCall => {
                writeln!(buf, "FUNC_CALL: {}", name)?;
                match self.child(id, 0) {
                    None => writeln!(buf, "{:inner$}|---ARGS: VOID ", "", inner = inner),
                    Some(args) => {
                        writeln!(buf, "{:inner$}|---ARGS: ", "", inner = inner)?;
                        self.dump_list(buf, Some(args), nested)
                    }
                }
            }
            N::FuncDecl => {
                writeln!(buf, "FUNC_DECL: {}", name)?;
                self.dump_list(buf, self.child(id, 0), inner)?;
                match self.child(id, 1) {
                    Some(params) if self.kind(params) != N::ParamVoid => {
                        writeln!(buf, "{:inner$}|---PARAM: ", "", inner = inner)?;
                        self.dump_list(buf, Some(params), nested)?;
                    }
                    _ => writeln!(buf, "{:inner$}|---PARAM: void", "", inner = inner)?,
                }
                match self.child(id, 2) {
                    None => writeln!(buf, "{:inner$}|---FUNC_BODY: EMPTY", "", inner = inner),
                    Some(body) => {
                        writeln!(buf, "{:inner$}|---FUNC_BODY: ", "", inner = inner)?;
                        self.dump_list(buf, Some(body), nested)
                    }
                }
            }
            N::Return => match self.child(id, 0) {
                None => writeln!(buf, "RETURN: void "),
                Some(value) => {
                    writeln!(buf, "RETURN: ")?;
                    self.dump_list(buf, Some(value), inner)
                }
            },
            N::Compound => {
                if self.child(id, 0).is_none() && self.child(id, 1).is_none() {
                    writeln!(buf, "COMP_STMT: EMPTY")
                } else {
                    writeln!(buf, "COMP_STMT: ")?;
                    self.dump_children(buf, id, inner)
                }
            }
        }
    }

    fn dump_children(&self, buf: &mut String, id: NodeId, indent: usize) -> fmt::Result {
        for slot in 0..MAX_CHILDREN {
            self.dump_list(buf, self.child(id, slot), indent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::{Pos, TokenKind};

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Ident, name, Pos::new(1, 1))
    }

    #[test]
    fn test_sibling_chain() {
        let mut ast = Ast::new();
        let a = ast.add_node(NodeKind::VarDecl, ident("a"));
        let b = ast.add_node(NodeKind::VarDecl, ident("b"));
        let c = ast.add_node(NodeKind::VarDecl, ident("c"));

        let mut list = SiblingList::default();
        for id in [a, b, c] {
            ast.append_sibling(&mut list, id);
        }

        assert_eq!(list.head(), Some(a));
        assert_eq!(ast.siblings(list.head()).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(ast.sibling(c), None);
    }

    #[test]
    fn test_absent_child_keeps_slot() {
        let mut ast = Ast::new();
        let op = ast.add_node(NodeKind::AddOp, Token::new(TokenKind::Minus, "-", Pos::new(1, 1)));
        let rhs = ast.add_node(NodeKind::Num, Token::new(TokenKind::Number, "4", Pos::new(1, 2)));
        ast.push_child(op, None);
        ast.push_child(op, Some(rhs));
        assert_eq!(ast.child(op, 0), None);
        assert_eq!(ast.child(op, 1), Some(rhs));
    }

    #[test]
    #[should_panic]
    fn test_node_has_one_parent() {
        let mut ast = Ast::new();
        let a = ast.add_node(NodeKind::Assign, ident("="));
        let b = ast.add_node(NodeKind::Assign, ident("="));
        let x = ast.add_node(NodeKind::VarRef, ident("x"));
        ast.push_child(a, Some(x));
        ast.push_child(b, Some(x));
    }

    #[test]
    fn test_dump_var_decl() {
        let mut ast = Ast::new();
        let x = ast.add_node(NodeKind::VarDecl, ident("x"));
        ast.set_root(Some(x));
        let dump = ast.dump().unwrap();
        assert!(dump.contains("|---VAR_DECL: x\n"));
        assert!(dump.starts_with("-----"));
    }
}
