use std::collections::HashMap;

use super::{
    ir::{Instruction, Opcode, Program},
    symbol::{Builtin, Storage, SymbolId, SymbolKind, SymbolTable},
    CodegenError,
};
use crate::{
    ast::{Ast, NodeId, NodeKind},
    constants::*,
    tokens::TokenKind,
};

/// Index of an emitted instruction, kept to backpatch its displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Code generator.
///
/// Lowers a checked tree into a flat instruction sequence in one depth
/// first pass. Forward jumps are emitted with a placeholder displacement
/// and patched once the target is known.
pub struct CodeGen<'a> {
    symbols: &'a SymbolTable,
    /// Resulting generated code.
    code: Vec<Instruction>,
    /// Entry instruction of each function emitted so far.
    entries: HashMap<SymbolId, usize>,
    /// Next free temporary slot, relative to the frame pointer.
    top: i32,
}

type GenResult = Result<(), CodegenError>;

impl<'a> CodeGen<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            code: vec![],
            entries: HashMap::new(),
            top: 0,
        }
    }

    pub fn compile(mut self, tree: &Ast) -> Result<Program, CodegenError> {
        self.emit_prelude(tree)?;
        log::debug!("generated {} instructions", self.code.len());
        Ok(Program::new(self.code))
    }

    fn emit(&mut self, op: Opcode, r: i32, s: i32, t: i32) -> Label {
        self.code.push(Instruction::new(op, r, s, t));
        Label(self.code.len() - 1)
    }

    fn emit_with(&mut self, op: Opcode, r: i32, s: i32, t: i32, comment: impl Into<String>) -> Label {
        self.code.push(Instruction::new(op, r, s, t).with_comment(comment));
        Label(self.code.len() - 1)
    }

    /// Index the next instruction will be emitted at.
    #[inline]
    fn here(&self) -> usize {
        self.code.len()
    }

    /// Fill in the displacement of an emitted instruction.
    fn patch(&mut self, label: Label, displacement: i32) {
        self.code[label.0].s = displacement;
    }

    /// Patch a pc relative jump to land on the next instruction to be emitted.
    fn patch_to_here(&mut self, label: Label) {
        let displacement = self.here() as i32 - (label.0 as i32 + 1);
        self.patch(label, displacement);
    }

    /// Reserve a temporary slot in the current frame.
    fn push_temp(&mut self, reg: i32, comment: &str) -> GenResult {
        let slot = self.top;
        self.top = slot.checked_add(1).ok_or(CodegenError::FrameTooLarge)?;
        self.emit_with(Opcode::St, reg, slot, FP, comment);
        Ok(())
    }

    /// Release the most recent temporary slot, loading it into `reg`.
    fn pop_temp(&mut self, reg: i32, comment: &str) {
        self.top -= 1;
        let slot = self.top;
        self.emit_with(Opcode::Ld, reg, slot, FP, comment);
    }

    fn symbol_of(&self, tree: &Ast, id: NodeId) -> Result<SymbolId, CodegenError> {
        tree.node(id)
            .symbol
            .ok_or_else(|| CodegenError::Unresolved(tree.node(id).token.lexeme.clone()))
    }
}

/// Recursive visitor
impl<'a> CodeGen<'a> {
    /// Sets up the frame of `main`, calls it, and halts when it returns.
    fn emit_prelude(&mut self, tree: &Ast) -> GenResult {
        let globals = self.symbols.get(self.symbols.global()).frame_size();

        let fp = globals.checked_add(2).ok_or(CodegenError::FrameTooLarge)?;
        self.emit_with(Opcode::Ldc, FP, fp, 0, "Init FP");
        let halt_addr = self.emit_with(Opcode::Ldc, AC, 0, 0, "Addr To Halt");
        self.emit_with(Opcode::St, AC, RETURN_SLOT, FP, "Save Return Address");
        self.emit_with(Opcode::St, FP, SAVED_FP_SLOT, FP, "Save FP");
        let call_main = self.emit_with(Opcode::Ldc, PC, 0, 0, "Call main");

        for decl in tree.siblings(tree.root()) {
            if tree.kind(decl) == NodeKind::FuncDecl {
                self.emit_func(tree, decl)?;
            }
        }

        let main = self
            .symbols
            .find_member(self.symbols.global(), "main")
            .and_then(|main| self.entries.get(&main).copied())
            .ok_or(CodegenError::MissingMain)?;
        self.patch(call_main, main as i32);

        let end = self.emit_with(Opcode::Halt, HALT_END, 0, 0, "Program End");
        self.patch(halt_addr, end.0 as i32);

        Ok(())
    }

    fn emit_func(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        let func = self.symbol_of(tree, id)?;
        let entry = self.here();
        self.entries.insert(func, entry);

        // Temporaries live above the function's locals.
        self.top = self.symbols.get(func).frame_size();

        let body = tree.child(id, 2);
        if let Some(body) = body {
            self.emit_stmt(tree, body)?;
        }

        let last = body
            .and_then(|body| tree.siblings(tree.child(body, 1)).last())
            .map(|last| tree.kind(last));
        if last != Some(NodeKind::Return) {
            self.emit_return(tree, None)?;
        }

        let name = &tree.node(id).token.lexeme;
        let instr = &mut self.code[entry];
        instr.comment = Some(match instr.comment.take() {
            Some(comment) => format!("Ent: {}; {}", name, comment),
            None => format!("Ent: {}", name),
        });

        Ok(())
    }

    fn emit_list(&mut self, tree: &Ast, head: Option<NodeId>) -> GenResult {
        for id in tree.siblings(head) {
            self.emit_stmt(tree, id)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        match tree.kind(id) {
            // Storage was allocated by the symbol pass.
            NodeKind::VarDecl | NodeKind::ArrayDecl => Ok(()),
            NodeKind::Compound => self.emit_list(tree, tree.child(id, 1)),
            NodeKind::If => self.emit_if(tree, id),
            NodeKind::While => self.emit_while(tree, id),
            NodeKind::Return => self.emit_return(tree, tree.child(id, 0)),
            _ => self.emit_expr(tree, id),
        }
    }

    fn emit_if(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        self.emit_operand(tree, tree.child(id, 0))?;
        let jump_else = self.emit_with(Opcode::Jeq, AC, 0, PC, "If: Jump To Else");

        self.emit_list(tree, tree.child(id, 1))?;

        match tree.child(id, 2) {
            Some(otherwise) => {
                let jump_end = self.emit_with(Opcode::Lda, PC, 0, PC, "If: Jump To End");
                self.patch_to_here(jump_else);
                self.emit_list(tree, Some(otherwise))?;
                self.patch_to_here(jump_end);
            }
            None => self.patch_to_here(jump_else),
        }

        Ok(())
    }

    fn emit_while(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        let start = self.here() as i32;
        self.emit_operand(tree, tree.child(id, 0))?;
        let jump_end = self.emit_with(Opcode::Jeq, AC, 0, PC, "While: Jump To End");

        self.emit_list(tree, tree.child(id, 1))?;

        let back = start - (self.here() as i32 + 1);
        self.emit_with(Opcode::Lda, PC, back, PC, "While: Jump To Condition");
        self.patch_to_here(jump_end);

        Ok(())
    }

    /// Restores the caller's frame and jumps to the saved return address.
    /// The return value, if any, is left in the accumulator.
    fn emit_return(&mut self, tree: &Ast, value: Option<NodeId>) -> GenResult {
        if let Some(value) = value {
            self.emit_expr(tree, value)?;
        }
        self.emit_with(Opcode::Lda, BP, 0, FP, "Ret: Save Current FP To BP");
        self.emit_with(Opcode::Ld, FP, SAVED_FP_SLOT, BP, "Ret: Restore FP");
        self.emit_with(Opcode::Ld, PC, RETURN_SLOT, BP, "Ret: Jump Back");
        Ok(())
    }

    fn emit_operand(&mut self, tree: &Ast, id: Option<NodeId>) -> GenResult {
        match id {
            Some(id) => self.emit_expr(tree, id),
            None => Err(CodegenError::MissingOperand),
        }
    }

    /// Evaluates an expression into the accumulator.
    fn emit_expr(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        match tree.kind(id) {
            NodeKind::Num => {
                let lexeme = &tree.node(id).token.lexeme;
                let value = lexeme
                    .parse::<i32>()
                    .map_err(|_| CodegenError::BadLiteral(lexeme.clone()))?;
                self.emit(Opcode::Ldc, AC, value, 0);
                Ok(())
            }
            NodeKind::VarRef => {
                let symbols = self.symbols;
                let symbol = symbols.get(self.symbol_of(tree, id)?);
                let base = base_register(symbol.storage);
                self.emit_with(Opcode::Ld, AC, symbol.offset, base, format!("Load {}", symbol.name));
                Ok(())
            }
            NodeKind::ArrayRef => {
                self.emit_element_addr(tree, id)?;
                self.emit_with(Opcode::Ld, AC, 0, BP, "Load Element");
                Ok(())
            }
            NodeKind::Assign => self.emit_assign(tree, id),
            NodeKind::AddOp | NodeKind::MulOp | NodeKind::RelOp => self.emit_binary(tree, id),
            NodeKind::FuncCall => self.emit_call(tree, id),
            kind => Err(CodegenError::Unsupported(kind)),
        }
    }

    fn emit_assign(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        self.emit_operand(tree, tree.child(id, 1))?;
        self.push_temp(AC, "Assign: Save Value")?;

        let target = tree.child(id, 0).ok_or(CodegenError::MissingOperand)?;
        match tree.kind(target) {
            NodeKind::VarRef => {
                let symbols = self.symbols;
                let symbol = symbols.get(self.symbol_of(tree, target)?);
                let base = base_register(symbol.storage);
                self.emit_with(Opcode::Lda, BP, symbol.offset, base, format!("Assign: Address Of {}", symbol.name));
            }
            NodeKind::ArrayRef => self.emit_element_addr(tree, target)?,
            kind => return Err(CodegenError::Unsupported(kind)),
        }

        self.pop_temp(AC, "Assign: Restore Value");
        self.emit_with(Opcode::St, AC, 0, BP, "Assign End");
        Ok(())
    }

    /// Leaves the address of an indexed element in the base register.
    ///
    /// A negative index halts the machine with the negative offset code.
    fn emit_element_addr(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        self.emit_operand(tree, tree.child(id, 0))?;
        self.emit_with(Opcode::Jge, AC, 1, PC, "Check Negative Array Offset");
        self.emit_with(Opcode::Halt, HALT_NEGATIVE_OFFSET, 0, 0, "Negative Array Offset");

        let symbol = self.symbol_of(tree, id)?;
        self.emit_array_base(symbol);
        self.emit_with(Opcode::Add, BP, BP, AC, "Element Address");
        Ok(())
    }

    /// Loads the base address of an array into the base register.
    fn emit_array_base(&mut self, symbol: SymbolId) {
        let symbols = self.symbols;
        let symbol = symbols.get(symbol);
        let comment = format!("Array Base {}", symbol.name);
        match symbol.storage {
            Storage::Global => self.emit_with(Opcode::Lda, BP, symbol.offset, GP, comment),
            // Parameters hold the caller's address.
            Storage::Param => self.emit_with(Opcode::Ld, BP, symbol.offset, FP, comment),
            Storage::Local => self.emit_with(Opcode::Lda, BP, symbol.offset, FP, comment),
        };
    }

    fn emit_binary(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        let lhs = tree.child(id, 0);
        if let Some(lhs) = lhs {
            self.emit_expr(tree, lhs)?;
            self.push_temp(AC, "Op: Save Left")?;
        }

        self.emit_operand(tree, tree.child(id, 1))?;

        match lhs {
            Some(_) => self.pop_temp(AC1, "Op: Restore Left"),
            // Unary sign, left operand is zero.
            None => {
                self.emit(Opcode::Ldc, AC1, 0, 0);
            }
        }

        let token = &tree.node(id).token;
        let jump = match token.kind {
            TokenKind::Plus => {
                self.emit(Opcode::Add, AC, AC1, AC);
                return Ok(());
            }
            TokenKind::Minus => {
                self.emit(Opcode::Sub, AC, AC1, AC);
                return Ok(());
            }
            TokenKind::Star => {
                self.emit(Opcode::Mul, AC, AC1, AC);
                return Ok(());
            }
            TokenKind::Slash => {
                self.emit(Opcode::Div, AC, AC1, AC);
                return Ok(());
            }
            TokenKind::Lt => Opcode::Jlt,
            TokenKind::LtEq => Opcode::Jle,
            TokenKind::Gt => Opcode::Jgt,
            TokenKind::GtEq => Opcode::Jge,
            TokenKind::EqEq => Opcode::Jeq,
            TokenKind::NotEq => Opcode::Jne,
            _ => return Err(CodegenError::Unsupported(tree.kind(id))),
        };

        // Compare against zero and materialise 0 or 1.
        let op = token.lexeme.clone();
        self.emit_with(Opcode::Sub, AC, AC1, AC, format!("Op: {}", op));
        self.emit(jump, AC, 2, PC);
        self.emit_with(Opcode::Ldc, AC, 0, 0, "False");
        self.emit(Opcode::Lda, PC, 1, PC);
        self.emit_with(Opcode::Ldc, AC, 1, 0, "True");
        Ok(())
    }

    fn emit_call(&mut self, tree: &Ast, id: NodeId) -> GenResult {
        let callee = self.symbol_of(tree, id)?;
        let args = tree.child(id, 0);

        match self.symbols.builtin(callee) {
            Some(Builtin::Input) => {
                self.emit_with(Opcode::In, AC, 0, 0, "Call: input");
                return Ok(());
            }
            Some(Builtin::Output) => {
                self.emit_operand(tree, args)?;
                self.emit_with(Opcode::Out, AC, 0, 0, "Call: output");
                return Ok(());
            }
            None => {}
        }

        let name = self.symbols.get(callee).name.clone();
        let entry = *self
            .entries
            .get(&callee)
            .ok_or_else(|| CodegenError::UnknownFunction(name.clone()))?;

        let saved_top = self.top;

        // Arguments are pushed left to right above the current top.
        for arg in tree.siblings(args) {
            match self.array_symbol(tree, arg) {
                Some(array) => {
                    self.emit_array_base(array);
                    self.push_temp(BP, "Call: Push Array Address")?;
                }
                None => {
                    self.emit_expr(tree, arg)?;
                    self.push_temp(AC, "Call: Push Argument")?;
                }
            }
        }

        // Control returns to the instruction after the jump below.
        let return_addr = self.here() as i32 + 5;
        self.emit_with(Opcode::Ldc, AC, return_addr, 0, "Call: Return Address");
        self.push_temp(AC, "Call: Save Return Address")?;
        self.push_temp(FP, "Call: Save FP")?;
        let frame = self.top;
        self.emit_with(Opcode::Lda, FP, frame, FP, "Call: Modify FP");
        self.emit_with(Opcode::Ldc, PC, entry as i32, 0, format!("Call: Jump To {}", name));

        self.top = saved_top;
        Ok(())
    }

    /// Array symbol for a bare array name passed as an argument.
    fn array_symbol(&self, tree: &Ast, id: NodeId) -> Option<SymbolId> {
        let node = tree.node(id);
        if node.kind != NodeKind::VarRef {
            return None;
        }
        let symbol = node.symbol?;
        match self.symbols.get(symbol).kind {
            SymbolKind::Array { .. } => Some(symbol),
            _ => None,
        }
    }
}

/// Register that storage offsets are relative to.
fn base_register(storage: Storage) -> i32 {
    match storage {
        Storage::Global => GP,
        Storage::Local | Storage::Param => FP,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compile_str;

    fn ops(program: &Program) -> Vec<Opcode> {
        program.instructions.iter().map(|instr| instr.op).collect()
    }

    #[test]
    fn test_prelude() {
        let program = compile_str("int g[3]; void main(void) { }").unwrap();
        let code = &program.instructions;

        assert!(code[0].same_operation(&Instruction::new(Opcode::Ldc, FP, 5, 0)));
        assert_eq!(code[4].op, Opcode::Ldc);
        assert_eq!(code[4].r, PC);
        // main starts right after the prelude
        assert_eq!(code[4].s, 5);

        let end = code.len() - 1;
        assert!(code[end].same_operation(&Instruction::new(Opcode::Halt, 0, 0, 0)));
        assert_eq!(code[1].s, end as i32);
    }

    #[test]
    fn test_synthesized_return() {
        let program = compile_str("void main(void) { }").unwrap();
        assert_eq!(
            ops(&program)[5..],
            [Opcode::Lda, Opcode::Ld, Opcode::Ld, Opcode::Halt]
        );

        // No second return after an explicit one.
        let program = compile_str("int main(void) { return 1; }").unwrap();
        assert_eq!(
            ops(&program)[5..],
            [Opcode::Ldc, Opcode::Lda, Opcode::Ld, Opcode::Ld, Opcode::Halt]
        );
    }

    #[test]
    fn test_backpatched_if() {
        let program = compile_str("void main(void) { if (1) output(1); else output(2); }").unwrap();
        let code = &program.instructions;

        let jeq = code.iter().position(|i| i.op == Opcode::Jeq).unwrap();
        let jmp = code.iter().position(|i| i.op == Opcode::Lda && i.r == PC && i.t == PC).unwrap();

        // else branch starts after the unconditional jump
        assert_eq!(jeq as i32 + 1 + code[jeq].s, jmp as i32 + 1);
        // end of the statement is past the else branch
        let end = (jmp as i32 + 1 + code[jmp].s) as usize;
        assert_eq!(code[end - 1].op, Opcode::Out);
    }

    #[test]
    fn test_loop_jumps_back_to_condition() {
        let program = compile_str("void main(void) { int i; while (i < 3) i = i + 1; }").unwrap();
        let code = &program.instructions;

        let back = code.iter().rposition(|i| i.op == Opcode::Lda && i.r == PC && i.s < 0).unwrap();
        let target = (back as i32 + 1 + code[back].s) as usize;
        // condition starts by loading `i`
        assert_eq!(target, 5);
        assert_eq!(code[target].op, Opcode::Ld);
    }

    #[test]
    fn test_missing_main() {
        match compile_str("void f(void) { }") {
            Err(crate::MinicError::Codegen(CodegenError::MissingMain)) => {}
            other => panic!("expected missing main, got {:?}", other),
        }
    }
}
