use schip::{constants::*, prelude::*};

/// Glyph data for the tests, only the shape of the table matters.
fn test_font() -> Vec<u8> {
    (0..FONT_DATA_LENGTH).map(|i| (i as u8) | 0x80).collect()
}

fn new_vm(cycles_per_step: usize) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        cycles_per_step,
        rng_seed: Some(1),
        ..Chip8Conf::default()
    });
    vm.load_font(&test_font()).unwrap();
    vm.reset();
    vm
}

#[test]
fn test_load_program_leaves_other_memory() {
    let mut vm = new_vm(1);
    let before = vm.ram().to_vec();
    let program = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];

    vm.load_program(&program).unwrap();

    let ram = vm.ram();
    assert_eq!(&ram[MEM_START..MEM_START + program.len()], &program);
    assert_eq!(&ram[..MEM_START], &before[..MEM_START]);
    assert_eq!(
        &ram[MEM_START + program.len()..],
        &before[MEM_START + program.len()..]
    );
}

#[test]
fn test_load_program_from_reader() {
    let mut vm = new_vm(1);
    let program: &[u8] = &[0x60, 0x05, 0x61, 0x03, 0x80, 0x14];

    vm.load_program_from(program).unwrap();
    vm.execute(3);

    assert_eq!(vm.registers()[0], 8);
    assert_eq!(vm.registers()[0xF], 0);
    assert_eq!(vm.pc(), MEM_START + 6);
}

#[test]
#[rustfmt::skip]
fn test_key_wait_across_steps() {
    let mut vm = new_vm(8);
    vm.load_program(&[
        0xF4, 0x0A, // LD v4, K
        0x12, 0x02, // JP 202
    ]).unwrap();

    for _ in 0..5 {
        assert_eq!(vm.step(), Flow::KeyWait);
        assert_eq!(vm.pc(), MEM_START);
    }

    // Releasing a key is not a press.
    vm.set_key(KeyCode::KeyC, false);
    assert_eq!(vm.step(), Flow::KeyWait);

    vm.set_key(KeyCode::KeyC, true);
    vm.step();
    assert_eq!(vm.registers()[4], 0xC);
    assert_eq!(vm.pc(), MEM_START + 2);
}

#[test]
#[rustfmt::skip]
fn test_nested_calls() {
    let mut vm = new_vm(1);
    vm.load_program(&[
        0x22, 0x08, // 200: CALL 208
        0x60, 0x01, // 202: LD v0, 1
        0x12, 0x04, // 204: JP 204
        0x00, 0x00, // 206:
        0x22, 0x0E, // 208: CALL 20E
        0x00, 0xEE, // 20A: RET
        0x00, 0x00, // 20C:
        0x71, 0x01, // 20E: ADD v1, 1
        0x00, 0xEE, // 210: RET
    ]).unwrap();

    vm.execute(2);
    assert_eq!(vm.stack_depth(), 2);
    assert_eq!(vm.pc(), 0x20E);

    vm.execute(4);
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.registers()[0], 1);
    assert_eq!(vm.registers()[1], 1);
    assert_eq!(vm.pc(), 0x204);
}

#[test]
#[rustfmt::skip]
fn test_draw_font_glyph() {
    let mut vm = new_vm(1);
    vm.load_program(&[
        0x60, 0x01, // LD v0, 1
        0xF0, 0x29, // LD F, v0
        0x61, 0x00, // LD v1, 0
        0xD1, 0x15, // DRW v1, v1, 5
    ]).unwrap();

    vm.execute(4);

    assert_eq!(vm.address() as usize, FONT_START + FONT_GLYPH_SIZE);
    // Each glyph row has the high bit set in the test font.
    for row in 0..5 {
        assert_eq!(vm.framebuffer()[row * DISPLAY_WIDTH], 1);
    }
    assert_eq!(vm.registers()[0xF], 0);
}

#[test]
#[rustfmt::skip]
fn test_reset_restores_power_on_state() {
    let mut vm = new_vm(4);
    vm.load_program(&[
        0x00, 0xFF, // HIGH
        0x60, 0x09, // LD v0, 9
        0xF0, 0x15, // LD DT, v0
        0x22, 0x00, // CALL 200
    ]).unwrap();
    vm.set_key(KeyCode::Key1, true);
    vm.step();

    assert_eq!(vm.display_mode(), DisplayMode::Extended);
    assert_ne!(vm.timers(), Timers::default());
    assert_eq!(vm.stack_depth(), 1);
    assert!(vm.key_state(KeyCode::Key1));

    vm.reset();

    assert!(!vm.key_state(KeyCode::Key1));

    assert_eq!(vm.display_mode(), DisplayMode::Standard);
    assert_eq!(vm.timers(), Timers::default());
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.pc(), MEM_START);
    assert_eq!(vm.registers(), &[0; REGISTER_COUNT]);
    assert!(vm.framebuffer().iter().all(|px| *px == 0));
    assert!(vm.ram()[MEM_START..].iter().all(|b| *b == 0));
    assert_eq!(&vm.ram()[..FONT_DATA_LENGTH], &test_font()[..]);
    assert!(vm.dump_keys().unwrap().is_empty());
}
