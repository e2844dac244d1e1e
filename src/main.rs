//! Script runner: compiles an Ember source file and executes it against
//! the console host.

use clap::{Arg, ArgAction, Command};
use ember::mach::{Ember, StdHost};
use std::process::ExitCode;

fn build_cli() -> Command {
    Command::new("ember")
        .about("Run a sandboxed Ember script")
        .arg(
            Arg::new("script")
                .value_name("SCRIPT")
                .required(true)
                .help("Path to the script file"),
        )
        .arg(
            Arg::new("listing")
                .long("listing")
                .action(ArgAction::SetTrue)
                .help("Print the compiled bytecode instead of running"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .action(ArgAction::SetTrue)
                .help("Print the machine state after the run"),
        )
        .arg(
            Arg::new("max-instructions")
                .long("max-instructions")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("Instruction budget for the run [1000..=1000000]"),
        )
        .arg(
            Arg::new("pins")
                .long("pins")
                .value_name("P,P,...")
                .help("Replace the allowed pin list"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Plain diagnostics"),
        )
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    let path = matches.get_one::<String>("script").unwrap();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("ember: {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut host = StdHost::new(!matches.get_flag("no-color"));
    let mut ember = Ember::new();

    if let Some(limit) = matches.get_one::<u32>("max-instructions") {
        if let Err(e) = ember.set_max_instructions(*limit) {
            eprintln!("ember: {}", e);
            return ExitCode::FAILURE;
        }
    }
    if let Some(pins) = matches.get_one::<String>("pins") {
        match parse_pins(pins) {
            Some(pins) => ember.set_allowed_pins(pins),
            None => {
                eprintln!("ember: invalid pin list: {}", pins);
                return ExitCode::FAILURE;
            }
        }
    }

    let clean = ember.compile(&source, &mut host);

    if matches.get_flag("listing") {
        if let Some(listing) = ember.listing() {
            print!("{}", listing);
        }
        return if clean {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    if !clean {
        return ExitCode::FAILURE;
    }

    let ran = ember.run(&mut host);
    if matches.get_flag("dump") {
        print!("{}", ember.dump_state());
    }
    if ran {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn parse_pins(list: &str) -> Option<Vec<u8>> {
    list.split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect()
}
