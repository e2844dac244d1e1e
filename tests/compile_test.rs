mod common;

use common::*;
use ember::lang::ErrorCode;
use ember::mach::{compile, disassemble, float_to_bits, Opcode, Policy};
use indoc::indoc;

#[test]
fn test_opcode_numbers_are_stable() {
    assert_eq!(Opcode::Nop as u8, 0);
    assert_eq!(Opcode::Print as u8, 1);
    assert_eq!(Opcode::LedOn as u8, 2);
    assert_eq!(Opcode::LedOff as u8, 3);
    assert_eq!(Opcode::Delay as u8, 4);
    assert_eq!(Opcode::PushInt as u8, 5);
    assert_eq!(Opcode::Pop as u8, 6);
    assert_eq!(Opcode::Add as u8, 7);
    assert_eq!(Opcode::Sub as u8, 8);
    assert_eq!(Opcode::Mul as u8, 9);
    assert_eq!(Opcode::Div as u8, 10);
    assert_eq!(Opcode::Jump as u8, 11);
    assert_eq!(Opcode::JumpIf as u8, 12);
    assert_eq!(Opcode::PrintNum as u8, 13);
    assert_eq!(Opcode::Store as u8, 14);
    assert_eq!(Opcode::Load as u8, 15);
    assert_eq!(Opcode::Mod as u8, 16);
    assert_eq!(Opcode::Abs as u8, 17);
    assert_eq!(Opcode::Pow as u8, 18);
    assert_eq!(Opcode::Eq as u8, 19);
    assert_eq!(Opcode::Neq as u8, 20);
    assert_eq!(Opcode::Lt as u8, 21);
    assert_eq!(Opcode::Gt as u8, 22);
    assert_eq!(Opcode::Lte as u8, 23);
    assert_eq!(Opcode::Gte as u8, 24);
    assert_eq!(Opcode::PushFloat as u8, 25);
    assert_eq!(Opcode::PushString as u8, 26);
    assert_eq!(Opcode::Max as u8, 27);
    assert_eq!(Opcode::Min as u8, 28);
    assert_eq!(Opcode::Sqrt as u8, 29);
    assert_eq!(Opcode::Input as u8, 30);
    assert_eq!(Opcode::Halt as u8, 255);
}

#[test]
fn test_set_compiles_to_push_store() {
    let program = compile("set a 10\nhalt\n", &Policy::default());
    assert!(program.errors().is_empty());
    let ops: Vec<(u8, u32)> = program.code().iter().map(|i| (i.opcode, i.arg1)).collect();
    assert_eq!(
        ops,
        vec![
            (Opcode::PushInt as u8, 10),
            (Opcode::Store as u8, 0),
            (Opcode::Halt as u8, 0),
        ]
    );
    assert_eq!(program.strings(), ["a"]);
}

#[test]
fn test_if_else_patch_targets() {
    let program = compile(
        indoc! {r#"
            set x 17
            if x % 2 == 0 then
            print "even"
            else
            print "odd"
            endif
            halt
        "#},
        &Policy::default(),
    );
    assert!(program.errors().is_empty());
    let code = program.code();
    // 0 PUSH 17, 1 STORE x, 2 LOAD x, 3 PUSH 2, 4 MOD, 5 PUSH 0, 6 EQ,
    // 7 JUMP_IF else, 8 PRINT even, 9 JUMP endif, 10 PRINT odd, 11 HALT
    assert_eq!(code[7].opcode, Opcode::JumpIf as u8);
    assert_eq!(code[7].arg1, 10);
    assert_eq!(code[9].opcode, Opcode::Jump as u8);
    assert_eq!(code[9].arg1, 11);
}

#[test]
fn test_for_loop_shape() {
    let program = compile("for i = 1 to 3\nendfor\nhalt\n", &Policy::default());
    assert!(program.errors().is_empty());
    let ops: Vec<(u8, u32)> = program.code().iter().map(|i| (i.opcode, i.arg1)).collect();
    assert_eq!(
        ops,
        vec![
            (Opcode::PushInt as u8, 1),
            (Opcode::Store as u8, 0),
            (Opcode::Load as u8, 0),  // loop header
            (Opcode::PushInt as u8, 3),
            (Opcode::Lte as u8, 0),
            (Opcode::JumpIf as u8, 11), // loop exit
            (Opcode::Load as u8, 0),
            (Opcode::PushInt as u8, 1),
            (Opcode::Add as u8, 0),
            (Opcode::Store as u8, 0),
            (Opcode::Jump as u8, 2),
            (Opcode::Halt as u8, 0),
        ]
    );
}

#[test]
fn test_float_step_only_after_float_literal_set() {
    let policy = Policy::default();
    let program = compile("set f 1.5\nfor f = 2 to 4\nendfor\nhalt\n", &policy);
    let has_float_one = program
        .code()
        .iter()
        .any(|i| i.opcode == Opcode::PushFloat as u8 && i.arg1 == float_to_bits(1.0));
    assert!(has_float_one);

    // Float bounds alone do not change the integer step.
    let program = compile("for i = 1.0 to 4.0\nendfor\nhalt\n", &policy);
    let step_is_int = program
        .code()
        .iter()
        .any(|i| i.opcode == Opcode::PushInt as u8 && i.arg1 == 1);
    assert!(step_is_int);
}

#[test]
fn test_compilation_is_deterministic() {
    let source = indoc! {r#"
        set a 1
        set b 2
        print "a"
        if a < b then
        print $a
        endif
        halt
    "#};
    let policy = Policy::default();
    let first = compile(source, &policy);
    let second = compile(source, &policy);
    assert_eq!(first.code(), second.code());
    assert_eq!(first.strings(), second.strings());
    assert_eq!(
        disassemble(first.code(), first.strings()),
        disassemble(second.code(), second.strings())
    );
}

#[test]
fn test_string_literals_are_interned_once() {
    let program = compile(
        "print \"hi\"\nprint \"hi\"\nprint \"ho\"\nhalt\n",
        &Policy::default(),
    );
    assert_eq!(program.strings(), ["hi", "ho"]);
}

#[test]
fn test_trailing_halt_is_appended_once() {
    let program = compile("print \"x\"\n", &Policy::default());
    assert_eq!(program.code().last().unwrap().opcode, Opcode::Halt as u8);

    let program = compile("halt\n", &Policy::default());
    let halts = program
        .code()
        .iter()
        .filter(|i| i.opcode == Opcode::Halt as u8)
        .count();
    assert_eq!(halts, 1);
}

#[test]
fn test_self_nested_intrinsics_are_rejected() {
    // `~..~` and `|..|` close on their own marker, so these cannot be
    // compiled; the whole line must be dropped, not partially emitted.
    let policy = Policy::default();
    for source in [
        "set x sqrt(sqrt(y))\nhalt\n",
        "set x abs()\nhalt\n",
        "set x min(min(a,b),c)\nhalt\n",
    ] {
        let program = compile(source, &policy);
        assert!(!program.errors().is_empty(), "no diagnostic for {:?}", source);
        let ops: Vec<u8> = program.code().iter().map(|i| i.opcode).collect();
        assert_eq!(ops, vec![Opcode::Halt as u8], "partial emission for {:?}", source);
    }
}

#[test]
fn test_bad_loop_bound_skips_line() {
    let program = compile("for i = 1 to sqrt(sqrt(2))\nendfor\nhalt\n", &Policy::default());
    assert!(!program.errors().is_empty());
    // The loop header stops at the bad bound: no comparison, no branch.
    assert!(!program
        .code()
        .iter()
        .any(|i| i.opcode == Opcode::Lte as u8 || i.opcode == Opcode::JumpIf as u8));
}

#[test]
fn test_unknown_command_diagnostic() {
    let program = compile("frobnicate 7\nhalt\n", &Policy::default());
    assert_eq!(program.errors().len(), 1);
    assert_eq!(program.errors()[0].code(), ErrorCode::UnknownCommand);
    assert_eq!(program.errors()[0].line(), Some(1));
}

#[test]
fn test_compilation_continues_past_bad_line() {
    let program = compile(
        "frobnicate\nprint \"still here\"\nhalt\n",
        &Policy::default(),
    );
    assert_eq!(program.errors().len(), 1);
    let host = {
        let mut host = TestHost::default();
        let mut vm = ember::mach::Runtime::new(Policy::default());
        assert!(vm.load(program, &mut host));
        vm.run(&mut host);
        host
    };
    assert_eq!(host.out, vec!["still here"]);
}

#[test]
fn test_if_nesting_limit() {
    let mut source = String::new();
    for _ in 0..17 {
        source.push_str("if 1 then\n");
    }
    for _ in 0..17 {
        source.push_str("endif\n");
    }
    source.push_str("halt\n");
    let program = compile(&source, &Policy::default());
    assert!(program
        .errors()
        .iter()
        .any(|e| e.code() == ErrorCode::NestingTooDeep));
}

#[test]
fn test_for_nesting_limit() {
    let mut source = String::new();
    for i in 0..17 {
        source.push_str(&format!("for v{} = 1 to 2\n", i));
    }
    for _ in 0..17 {
        source.push_str("endfor\n");
    }
    source.push_str("halt\n");
    let program = compile(&source, &Policy::default());
    assert!(program
        .errors()
        .iter()
        .any(|e| e.code() == ErrorCode::NestingTooDeep));
}

#[test]
fn test_unmatched_structure_diagnostics() {
    let program = compile("else\nhalt\n", &Policy::default());
    assert_eq!(program.errors()[0].code(), ErrorCode::ElseWithoutIf);

    let program = compile("endif\nhalt\n", &Policy::default());
    assert_eq!(program.errors()[0].code(), ErrorCode::EndifWithoutIf);

    let program = compile("endfor\nhalt\n", &Policy::default());
    assert_eq!(program.errors()[0].code(), ErrorCode::EndforWithoutFor);

    let program = compile("if 1 then\nhalt\n", &Policy::default());
    assert!(program
        .errors()
        .iter()
        .any(|e| e.code() == ErrorCode::UnclosedBlock));
}

#[test]
fn test_invalid_variable_name_diagnostic() {
    let program = compile("set 9lives 1\nhalt\n", &Policy::default());
    assert_eq!(program.errors()[0].code(), ErrorCode::InvalidVariableName);

    let program = compile("print $not-a-name\nhalt\n", &Policy::default());
    assert_eq!(program.errors()[0].code(), ErrorCode::InvalidVariableName);
}

#[test]
fn test_integer_literal_out_of_range() {
    let program = compile("set x 99999999999\nhalt\n", &Policy::default());
    assert!(program
        .errors()
        .iter()
        .any(|e| e.code() == ErrorCode::LiteralOutOfRange));
}

#[test]
fn test_comments_and_blank_lines() {
    let program = compile(
        indoc! {r#"
            // header comment

            print "one" // trailing comment
            halt
        "#},
        &Policy::default(),
    );
    assert!(program.errors().is_empty());
    assert_eq!(program.code().len(), 2);
}

#[test]
fn test_commands_are_case_insensitive() {
    let mut host = TestHost::default();
    exec_into("PRINT \"loud\"\nHALT\n", Policy::default(), &mut host);
    assert_eq!(host.out, vec!["loud"]);
}

#[test]
fn test_delay_clamped_with_diagnostic() {
    let program = compile("delay 90000\nhalt\n", &Policy::default());
    assert!(program
        .errors()
        .iter()
        .any(|e| e.code() == ErrorCode::DelayTooLong));
    assert_eq!(program.code()[0].arg1, 60_000);
}

#[test]
fn test_listing_round_trip_is_stable() {
    let source = "set a 1\nprint $a\nhalt\n";
    let policy = Policy::default();
    let program = compile(source, &policy);
    let listing = disassemble(program.code(), program.strings());
    assert_eq!(
        listing,
        "0: PUSH 1\n1: STORE a\n2: LOAD a\n3: PRINT_NUM\n4: HALT\n"
    );
}
