//! IO device interface
use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

/// Hooks to provide IO devices to the virtual machine.
pub trait Devices {
    /// Blocking read of one integer.
    fn input(&mut self) -> io::Result<i32>;

    /// Write one integer.
    fn output(&mut self, value: i32) -> io::Result<()>;
}

/// Console devices. Prompts on stdout and reads a line from stdin per value.
#[derive(Debug, Default)]
pub struct StdDevices;

impl StdDevices {
    pub fn new() -> Self {
        StdDevices
    }
}

impl Devices for StdDevices {
    fn input(&mut self) -> io::Result<i32> {
        let mut stdout = io::stdout();
        write!(stdout, ">> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
        }
        parse_input(&line)
    }

    fn output(&mut self, value: i32) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", value)?;
        stdout.flush()
    }
}

fn parse_input(line: &str) -> io::Result<i32> {
    let line = line.trim();
    line.parse::<i32>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected an integer, got '{}'", line),
        )
    })
}

/// In-memory devices with scripted input and captured output.
#[derive(Debug, Default, Clone)]
pub struct BufferDevices {
    pub input: VecDeque<i32>,
    pub output: Vec<i32>,
}

impl BufferDevices {
    pub fn new(input: impl IntoIterator<Item = i32>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: vec![],
        }
    }
}

impl Devices for BufferDevices {
    fn input(&mut self) -> io::Result<i32> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "input exhausted"))
    }

    fn output(&mut self, value: i32) -> io::Result<()> {
        self.output.push(value);
        Ok(())
    }
}
