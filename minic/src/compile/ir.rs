//! Three-address instructions of the MiniC machine.
use std::{fmt, str::FromStr};

/// Operation codes.
///
/// Instructions come in three families that differ in how their operands
/// are read. See [`Family`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `HALT code` stop the machine. Code `0` is a normal end.
    Halt,
    /// `IN r` read an integer into `r`.
    In,
    /// `OUT r` write the integer in `r`.
    Out,
    /// `ADD r,s,t` r = s + t
    Add,
    /// `SUB r,s,t` r = s - t
    Sub,
    /// `MUL r,s,t` r = s * t
    Mul,
    /// `DIV r,s,t` r = s / t
    Div,
    /// `LD r,d(s)` r = mem[d + s]
    Ld,
    /// `ST r,d(s)` mem[d + s] = r
    St,
    /// `LDA r,d(s)` r = d + s
    Lda,
    /// `LDC r,d(s)` r = d
    Ldc,
    /// `JLT r,d(s)` jump to d + s when r < 0
    Jlt,
    Jle,
    Jeq,
    Jne,
    Jge,
    Jgt,
}

/// How an instruction's operands are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Three register ids, rendered `op r,s,t`.
    Register,
    /// Register, displacement and base register, with a bounds checked
    /// memory access, rendered `op r,d(s)`.
    Memory,
    /// Register, displacement and base register without memory access.
    Address,
}

impl Opcode {
    pub fn family(&self) -> Family {
        use Opcode as O;
        match self {
            O::Halt | O::In | O::Out | O::Add | O::Sub | O::Mul | O::Div => Family::Register,
            O::Ld | O::St => Family::Memory,
            O::Lda | O::Ldc | O::Jlt | O::Jle | O::Jeq | O::Jne | O::Jge | O::Jgt => Family::Address,
        }
    }

    #[rustfmt::skip]
    pub fn mnemonic(&self) -> &'static str {
        use Opcode as O;
        match self {
            O::Halt => "HALT",
            O::In   => "IN",
            O::Out  => "OUT",
            O::Add  => "ADD",
            O::Sub  => "SUB",
            O::Mul  => "MUL",
            O::Div  => "DIV",
            O::Ld   => "LD",
            O::St   => "ST",
            O::Lda  => "LDA",
            O::Ldc  => "LDC",
            O::Jlt  => "JLT",
            O::Jle  => "JLE",
            O::Jeq  => "JEQ",
            O::Jne  => "JNE",
            O::Jge  => "JGE",
            O::Jgt  => "JGT",
        }
    }
}

impl FromStr for Opcode {
    type Err = ();

    #[rustfmt::skip]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Opcode as O;
        match s {
            "HALT" => Ok(O::Halt),
            "IN"   => Ok(O::In),
            "OUT"  => Ok(O::Out),
            "ADD"  => Ok(O::Add),
            "SUB"  => Ok(O::Sub),
            "MUL"  => Ok(O::Mul),
            "DIV"  => Ok(O::Div),
            "LD"   => Ok(O::Ld),
            "ST"   => Ok(O::St),
            "LDA"  => Ok(O::Lda),
            "LDC"  => Ok(O::Ldc),
            "JLT"  => Ok(O::Jlt),
            "JLE"  => Ok(O::Jle),
            "JEQ"  => Ok(O::Jeq),
            "JNE"  => Ok(O::Jne),
            "JGE"  => Ok(O::Jge),
            "JGT"  => Ok(O::Jgt),
            _      => Err(()),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One quadruple.
///
/// For the register family `r`, `s` and `t` are register ids. For the
/// memory and address families `s` holds the displacement and `t` the
/// base register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub r: i32,
    pub s: i32,
    pub t: i32,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(op: Opcode, r: i32, s: i32, t: i32) -> Self {
        Self {
            op,
            r,
            s,
            t,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Same operation and operands, ignoring comments.
    pub fn same_operation(&self, other: &Instruction) -> bool {
        (self.op, self.r, self.s, self.t) == (other.op, other.r, other.s, other.t)
    }
}

/// Outputs instruction as assembly.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op.family() {
            Family::Register => write!(f, "{} {},{},{}", self.op, self.r, self.s, self.t)?,
            Family::Memory | Family::Address => write!(f, "{} {},{}({})", self.op, self.r, self.s, self.t)?,
        }
        if let Some(comment) = &self.comment {
            write!(f, "  # {}", comment)?;
        }
        Ok(())
    }
}

/// Flat instruction sequence. Control flow refers to indices into it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }
}

/// Writes the program in the `.ir` text format, one labelled instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (index, instr) in self.instructions.iter().enumerate() {
            writeln!(f, "{}: {}", index, instr)?;
        }
        Ok(())
    }
}
