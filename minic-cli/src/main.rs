//! Entrypoint for CLI
mod config;
mod error;

use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

use log::{error, info};
use minic::{lex::dump_tokens, prelude::*, IMPL_VERSION};

use crate::{config::Config, error::AppError};

static USAGE: &str = r#"
usage: minic [--config FILE] CMD FILE

commands:
    lex      Scan the source file, writes FILE.token
    parse    Parse the source file, also writes FILE.ast
    check    Resolve symbols and check types, also writes FILE.sym
    compile  Generate instructions, also writes FILE.ir
    run      Execute an instruction file
    debug    Execute an instruction file one step at a time
    go       Compile a source file and execute it

options:
    --config FILE  YAML configuration, defaults to ./minic.yaml when present

examples:
    minic compile sort.mc
    minic run sort.ir
    minic go factorial.mc
"#;

/// Last compiler phase a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Lex,
    Parse,
    Check,
    Compile,
}

enum Cmd {
    /// Run the front end up to the stage and write its artifacts.
    Compile { stage: Stage, filepath: String },
    /// Execute persisted instructions.
    Run { filepath: String },
    /// Execute persisted instructions with a register dump per step.
    Debug { filepath: String },
    /// Compile in memory and execute.
    Go { filepath: String },
}

struct Args {
    cmd: Cmd,
    config: Option<String>,
}

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("failed to initialise logger: {err}");
    }

    let Some(args) = parse_args() else {
        print_usage();
        // FreeBSD EX_USAGE (64)
        process::exit(64)
    };

    let result = Config::load(args.config.as_deref()).and_then(|config| run_cmd(args.cmd, &config));

    match result {
        Ok(Exit::End) => {}
        Ok(exit) => {
            error!("execution stopped: {exit}");
            // EX_SOFTWARE
            process::exit(70)
        }
        Err(err) => {
            error!("{err}");
            process::exit(err.exit_code())
        }
    }
}

fn run_cmd(cmd: Cmd, config: &Config) -> Result<Exit, AppError> {
    match cmd {
        Cmd::Compile { stage, filepath } => {
            compile_file(Path::new(&filepath), stage, true)?;
            Ok(Exit::End)
        }
        Cmd::Run { filepath } => {
            let program = load_file(&filepath)?;
            execute(program, config, false)
        }
        Cmd::Debug { filepath } => {
            let program = load_file(&filepath)?;
            execute(program, config, true)
        }
        Cmd::Go { filepath } => {
            let program = compile_file(Path::new(&filepath), Stage::Compile, config.write_artifacts)?;
            match program {
                Some(program) => execute(program, config, false),
                None => Ok(Exit::End),
            }
        }
    }
}

/// Runs the compiler phases up to `stage`, writing each phase's artifact
/// next to the source file. Artifacts are written even when the phase
/// failed so the partial result can be inspected.
fn compile_file(filepath: &Path, stage: Stage, write: bool) -> Result<Option<Program>, AppError> {
    info!("compiling {}", filepath.display());

    let source = String::from_utf8(fs::read(filepath)?).map_err(MinicError::from)?;
    let artifact = |extension: &str, contents: &str| -> Result<(), AppError> {
        if write {
            let path = artifact_path(filepath, extension);
            fs::write(&path, contents)?;
            info!("wrote {}", path.display());
        }
        Ok(())
    };

    // Lexical analysis
    let scan = Lexer::new(&source).scan();
    artifact("token", &dump_tokens(&scan.tokens))?;
    let tokens = scan.into_result()?;
    if stage == Stage::Lex {
        return Ok(None);
    }

    // Syntactic analysis
    let parsed = parse(&tokens);
    artifact("ast", &parsed.ast.dump()?)?;
    let mut tree = parsed.into_result()?;
    if stage == Stage::Parse {
        return Ok(None);
    }

    // Semantic analysis
    let mapped = Mapper::new().build_symbols(&mut tree);
    artifact("sym", &mapped.symbols.dump(&tree)?)?;
    let symbols = mapped.into_result()?;
    TypeChecker::new(&symbols).check(&mut tree).into_result()?;
    if stage == Stage::Check {
        return Ok(None);
    }

    // Code generation
    let program = CodeGen::new(&symbols).compile(&tree)?;
    artifact("ir", &program.to_string())?;
    info!("{} instructions", program.len());

    Ok(Some(program))
}

fn artifact_path(filepath: &Path, extension: &str) -> PathBuf {
    filepath.with_extension(extension)
}

fn load_file(filepath: &str) -> Result<Program, AppError> {
    let text = String::from_utf8(fs::read(filepath)?).map_err(MinicError::from)?;
    Ok(load(&text)?)
}

fn execute(program: Program, config: &Config, debug: bool) -> Result<Exit, AppError> {
    let mut vm = Vm::new(config.vm.clone(), StdDevices::new());
    vm.load_program(program);

    let exit = if debug {
        loop {
            let pc = vm.registers()[minic::constants::PC as usize];
            if let Some(instr) = usize::try_from(pc).ok().and_then(|index| vm.program().get(index)) {
                println!("{pc}: {instr}");
            }
            let flow = vm.step()?;
            println!("    {}", vm.dump_registers()?);
            if let Flow::Exit(exit) = flow {
                break exit;
            }
        }
    } else {
        vm.execute()?
    };

    info!("{exit} after {} steps", vm.steps());
    if !exit.is_end() {
        error!("{}", vm.dump_registers()?);
    }
    if config.dump_memory > 0 {
        print!("{}", vm.dump_memory(config.dump_memory)?);
    }

    Ok(exit)
}

fn parse_args() -> Option<Args> {
    let mut args = env::args().skip(1);
    let mut config = None;

    let cmd = loop {
        let arg = args.next()?;
        if arg == "--config" {
            config = Some(args.next()?);
        } else {
            break arg;
        }
    };

    let filepath = consume_arg(&mut args)?;
    let cmd = match cmd.as_str() {
        "lex" => Cmd::Compile { stage: Stage::Lex, filepath },
        "parse" => Cmd::Compile { stage: Stage::Parse, filepath },
        "check" => Cmd::Compile { stage: Stage::Check, filepath },
        "compile" => Cmd::Compile { stage: Stage::Compile, filepath },
        "run" => Cmd::Run { filepath },
        "debug" => Cmd::Debug { filepath },
        "go" => Cmd::Go { filepath },
        _ => return None,
    };

    Some(Args { cmd, config })
}

/// Consumes the next argument. Missing arguments end up printing the usage text.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("MiniC v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(artifact_path(Path::new("dir/sort.mc"), "ir"), PathBuf::from("dir/sort.ir"));
        assert_eq!(artifact_path(Path::new("sort"), "token"), PathBuf::from("sort.token"));
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Lex < Stage::Parse);
        assert!(Stage::Check < Stage::Compile);
    }
}
