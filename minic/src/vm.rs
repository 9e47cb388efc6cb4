//! Virtual machine.
use std::{
    fmt::{self, Write},
    io,
};

use itertools::Itertools;

use crate::{
    compile::{Family, Opcode, Program},
    constants::*,
    cpu::Cpu,
    devices::Devices,
    error::{MinicError, MinicResult},
};

pub struct Vm<D> {
    cpu: Cpu,
    program: Program,
    devices: D,
    /// Instructions executed since the last reset.
    steps: u64,
    conf: VmConf,
}

impl<D: Devices> Vm<D> {
    pub fn new(conf: VmConf, devices: D) -> Self {
        Vm {
            cpu: Cpu::new(conf.memory_size),
            program: Program::default(),
            devices,
            steps: 0,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &VmConf {
        &self.conf
    }

    /// Replace the instruction store and start over from a clean machine.
    pub fn load_program(&mut self, program: Program) {
        self.program = program;
        self.reset();
    }

    /// Zero registers and memory so the program can run again from the top.
    pub fn reset(&mut self) {
        self.cpu.clear();
        self.steps = 0;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn registers(&self) -> &[i32] {
        &self.cpu.registers
    }

    pub fn memory(&self) -> &[i32] {
        &self.cpu.memory
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut D {
        &mut self.devices
    }

    pub fn into_devices(self) -> D {
        self.devices
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// A jump was taken and the program counter moved.
    Jump,
    /// The machine stopped.
    Exit(Exit),
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// `HALT 0` was executed.
    End,
    Fault(Fault),
    /// Program counter left the instruction store. Machine state is kept
    /// as it was before the fetch.
    PcOutOfRange(i32),
    /// The configured step limit ran out.
    StepLimit,
}

impl Exit {
    pub fn is_end(&self) -> bool {
        matches!(self, Exit::End)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exit::End => write!(f, "program end"),
            Exit::Fault(fault) => write!(f, "{}", fault),
            Exit::PcOutOfRange(pc) => write!(f, "PC[{}] is out of range", pc),
            Exit::StepLimit => write!(f, "step limit reached"),
        }
    }
}

/// Runtime fault raised by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    ZeroDivision,
    NegativeArrayOffset,
    MemoryOutOfRange { address: i32 },
    InvalidRegister(i32),
    /// `HALT` with a code other than the known ones.
    Halted(i32),
    /// Input device failed or delivered something that isn't an integer.
    Input(io::ErrorKind),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::ZeroDivision => write!(f, "division by zero"),
            Fault::NegativeArrayOffset => write!(f, "negative array offset"),
            Fault::MemoryOutOfRange { address } => write!(f, "memory address {} is out of range", address),
            Fault::InvalidRegister(id) => write!(f, "invalid register {}", id),
            Fault::Halted(code) => write!(f, "halted with code {}", code),
            Fault::Input(kind) => write!(f, "input failed: {}", kind),
        }
    }
}

/// Interrupts an instruction part way through.
enum Trap {
    Fault(Fault),
    Host(MinicError),
}

impl From<Fault> for Trap {
    fn from(fault: Fault) -> Self {
        Trap::Fault(fault)
    }
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VmConf {
    /// Number of cells in data memory.
    pub memory_size: usize,
    /// Stop with [`Exit::StepLimit`] after this many instructions.
    pub step_limit: Option<u64>,
}

impl Default for VmConf {
    fn default() -> Self {
        Self {
            memory_size: MEM_SIZE,
            step_limit: None,
        }
    }
}

/// Interpreter
impl<D: Devices> Vm<D> {
    /// Run until the machine stops.
    pub fn execute(&mut self) -> MinicResult<Exit> {
        loop {
            if let Flow::Exit(exit) = self.step()? {
                return Ok(exit);
            }
        }
    }

    /// Run at most `step_count` instructions. Returns the flow of the last one.
    pub fn run_steps(&mut self, step_count: usize) -> MinicResult<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
            if let Flow::Exit(_) = flow {
                break;
            }
        }

        Ok(flow)
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Faults are returned as [`Flow::Exit`]. Only failures of the host, like
    /// a broken output stream, are errors.
    pub fn step(&mut self) -> MinicResult<Flow> {
        if let Some(limit) = self.conf.step_limit {
            if self.steps >= limit {
                log::warn!("step limit of {} reached", limit);
                return Ok(Flow::Exit(Exit::StepLimit));
            }
        }

        let pc = self.cpu.pc();
        let Some(instr) = usize::try_from(pc).ok().and_then(|index| self.program.get(index)) else {
            log::error!("{}", self.dump_registers()?);
            log::error!("PC[{}] is out of range", pc);
            return Ok(Flow::Exit(Exit::PcOutOfRange(pc)));
        };
        let (op, r, s, t) = (instr.op, instr.r, instr.s, instr.t);

        self.cpu.registers[PC as usize] = pc + 1;
        self.steps += 1;

        match self.exec(pc, op, r, s, t) {
            Ok(flow) => Ok(flow),
            Err(Trap::Fault(fault)) => {
                log::error!("fault at {}: {}", pc, fault);
                Ok(Flow::Exit(Exit::Fault(fault)))
            }
            Err(Trap::Host(err)) => Err(err),
        }
    }

    fn reg(&self, id: i32) -> Result<i32, Fault> {
        self.cpu.reg(id).ok_or(Fault::InvalidRegister(id))
    }

    fn set_reg(&mut self, id: i32, value: i32) -> Result<(), Fault> {
        let reg = self.cpu.reg_mut(id).ok_or(Fault::InvalidRegister(id))?;
        *reg = value;
        Ok(())
    }

    fn cell(&mut self, address: i32) -> Result<&mut i32, Fault> {
        self.cpu.cell_mut(address).ok_or(Fault::MemoryOutOfRange { address })
    }

    #[rustfmt::skip]
    fn exec(&mut self, pc: i32, op: Opcode, r: i32, s: i32, t: i32) -> Result<Flow, Trap> {
        if op.family() == Family::Register {
            op_trace_rr(pc, op, r, s, t);

            match op {
                // HALT code,0,0
                //
                // Stop the machine. The first operand is the exit code.
                Opcode::Halt => {
                    let exit = match r {
                        HALT_END             => Exit::End,
                        HALT_NEGATIVE_OFFSET => Exit::Fault(Fault::NegativeArrayOffset),
                        code                 => Exit::Fault(Fault::Halted(code)),
                    };
                    return Ok(Flow::Exit(exit));
                }
                // IN r,0,0
                Opcode::In => {
                    self.reg(r)?;
                    let value = self.devices.input().map_err(|err| {
                        log::error!("input: {}", err);
                        Fault::Input(err.kind())
                    })?;
                    self.set_reg(r, value)?;
                }
                // OUT r,0,0
                Opcode::Out => {
                    let value = self.reg(r)?;
                    self.devices
                        .output(value)
                        .map_err(|err| Trap::Host(err.into()))?;
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    let (lhs, rhs) = (self.reg(s)?, self.reg(t)?);
                    let value = match op {
                        Opcode::Add => lhs.wrapping_add(rhs),
                        Opcode::Sub => lhs.wrapping_sub(rhs),
                        Opcode::Mul => lhs.wrapping_mul(rhs),
                        _ if rhs == 0 => return Err(Fault::ZeroDivision.into()),
                        _ => lhs.wrapping_div(rhs),
                    };
                    self.set_reg(r, value)?;
                }
                _ => unreachable!("{} is not a register instruction", op),
            }

            return Ok(Flow::Ok);
        }

        // Effective address d + reg[s], with the base register in `t`.
        let m = s.wrapping_add(self.reg(t)?);
        op_trace_rm(pc, op, r, s, t, m);

        let taken = match op {
            // LD r,d(s)
            //
            // r = mem[d + reg[s]]
            Opcode::Ld => {
                let value = *self.cell(m)?;
                self.set_reg(r, value)?;
                return Ok(Flow::Ok);
            }
            // ST r,d(s)
            //
            // mem[d + reg[s]] = r
            Opcode::St => {
                let value = self.reg(r)?;
                *self.cell(m)? = value;
                return Ok(Flow::Ok);
            }
            Opcode::Lda => {
                self.set_reg(r, m)?;
                // Writing the program counter is an unconditional jump.
                r == PC
            }
            Opcode::Ldc => {
                self.set_reg(r, s)?;
                r == PC
            }
            Opcode::Jlt => self.reg(r)? <  0,
            Opcode::Jle => self.reg(r)? <= 0,
            Opcode::Jeq => self.reg(r)? == 0,
            Opcode::Jne => self.reg(r)? != 0,
            Opcode::Jge => self.reg(r)? >= 0,
            Opcode::Jgt => self.reg(r)? >  0,
            _ => unreachable!("{} is not a memory or address instruction", op),
        };

        if !taken {
            return Ok(Flow::Ok);
        }
        if !matches!(op, Opcode::Lda | Opcode::Ldc) {
            self.cpu.registers[PC as usize] = m;
        }

        Ok(Flow::Jump)
    }
}

/// Troubleshooting
impl<D> Vm<D> {
    /// Registers as a single line, skipping the reserved register.
    pub fn dump_registers(&self) -> Result<String, fmt::Error> {
        let line = self
            .cpu
            .registers
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != 4)
            .map(|(id, value)| format!("({}){}: {}", id, REGISTER_NAMES[id], value))
            .join(" ");
        Ok(line)
    }

    /// Returns the first `count` memory cells as a human readable string.
    pub fn dump_memory(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (address, value) in self.cpu.memory.iter().enumerate().take(count) {
            writeln!(buf, "{:04}: {}", address, value)?;
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_rr(pc: i32, op: Opcode, r: i32, s: i32, t: i32) {
    log::trace!("{:04}: {:4} {},{},{}", pc, op.mnemonic(), r, s, t);
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_rm(pc: i32, op: Opcode, r: i32, d: i32, s: i32, m: i32) {
    log::trace!("{:04}: {:4} {},{}({})  [{}]", pc, op.mnemonic(), r, d, s, m);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_rr(_: i32, _: Opcode, _: i32, _: i32, _: i32) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_rm(_: i32, _: Opcode, _: i32, _: i32, _: i32, _: i32) {}
