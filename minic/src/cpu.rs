//! Register file and data memory.
use crate::constants::*;

/// Core machine state.
///
/// Data memory and the instruction store are separate. The program counter
/// indexes instructions, load and store addresses index `memory`.
#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) registers: [i32; REGISTER_COUNT],
    /// Data memory, one signed word per cell.
    pub(crate) memory: Vec<i32>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(MEM_SIZE)
    }
}

impl Cpu {
    pub fn new(memory_size: usize) -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            memory: vec![0; memory_size],
        }
    }

    /// Zero all registers and memory.
    pub(crate) fn clear(&mut self) {
        self.registers.fill(0);
        self.memory.fill(0);
    }

    #[inline]
    pub(crate) fn pc(&self) -> i32 {
        self.registers[PC as usize]
    }

    /// Register value, or `None` when the id is outside the register file.
    #[inline]
    pub(crate) fn reg(&self, id: i32) -> Option<i32> {
        usize::try_from(id).ok().and_then(|id| self.registers.get(id).copied())
    }

    #[inline]
    pub(crate) fn reg_mut(&mut self, id: i32) -> Option<&mut i32> {
        usize::try_from(id).ok().and_then(move |id| self.registers.get_mut(id))
    }

    /// Memory cell at `address`, or `None` when out of bounds.
    #[inline]
    pub(crate) fn cell_mut(&mut self, address: i32) -> Option<&mut i32> {
        usize::try_from(address).ok().and_then(move |address| self.memory.get_mut(address))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_register_bounds() {
        let mut cpu = Cpu::new(4);
        *cpu.reg_mut(AC).unwrap() = 3;
        assert_eq!(cpu.reg(AC), Some(3));
        assert_eq!(cpu.reg(-1), None);
        assert_eq!(cpu.reg(REGISTER_COUNT as i32), None);
    }

    #[test]
    fn test_memory_bounds() {
        let mut cpu = Cpu::new(4);
        assert!(cpu.cell_mut(3).is_some());
        assert!(cpu.cell_mut(4).is_none());
        assert!(cpu.cell_mut(-1).is_none());
    }
}
