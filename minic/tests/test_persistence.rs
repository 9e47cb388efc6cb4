use minic::prelude::*;

fn run_program(program: Program, input: &[i32]) -> Vm<BufferDevices> {
    let mut vm = Vm::new(VmConf::default(), BufferDevices::new(input.iter().copied()));
    vm.load_program(program);
    assert_eq!(vm.execute().unwrap(), Exit::End);
    vm
}

/// Written instruction text reloads into an identical program that ends in
/// identical machine state.
fn assert_round_trip(source: &str, input: &[i32]) {
    let program = compile_str(source).unwrap();
    let text = program.to_string();
    let reloaded = match load(&text) {
        Ok(program) => program,
        Err(err) => panic!("{}\n{}", err, text),
    };
    assert_eq!(reloaded, program);

    let direct = run_program(program, input);
    let persisted = run_program(reloaded, input);

    assert_eq!(direct.registers(), persisted.registers());
    assert_eq!(direct.memory(), persisted.memory());
    assert_eq!(direct.devices().output, persisted.devices().output);
}

#[test]
fn test_round_trip_factorial() {
    assert_round_trip(include_str!("programs/factorial.mc"), &[6]);
}

#[test]
fn test_round_trip_sort() {
    assert_round_trip(include_str!("programs/sort.mc"), &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn test_round_trip_gcd() {
    assert_round_trip(include_str!("programs/gcd.mc"), &[21, 14]);
}

#[test]
fn test_text_layout() {
    let text = compile_str("void main(void) { }").unwrap().to_string();
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some("0: LDC 6,2(0)  # Init FP"));
    assert_eq!(lines.next(), Some("1: LDC 0,8(0)  # Addr To Halt"));
    assert_eq!(lines.last(), Some("8: HALT 0,0,0  # Program End"));
}

#[test]
fn test_hand_written_text() {
    let text = "\
# adds two inputs
0: IN 0,0,0
1: IN 1,0,0
2: ADD 0,0,1    # sum
3: OUT 0,0,0
4: HALT 0,0,0
";
    let vm = run_program(load(text).unwrap(), &[2, 40]);
    assert_eq!(vm.devices().output, vec![42]);
}
