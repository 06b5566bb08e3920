//! Entrypoint for CLI
mod fonts;

use std::{env, error::Error, fs, time::Instant};

use log::{error, info, warn};
use schip::{disassemble, prelude::*, IMPL_VERSION};

static USAGE: &str = r#"
usage: schip CMD FILE [CYCLES] [STEPS]

commands:
    run     Run the target ROM file and print the final display
    dis     Disassemble the target ROM into readable assembly

arguments:
    CYCLES  Instructions executed per step (default from config, or 400)
    STEPS   Number of steps to run before stopping (default 600)

environment:
    SCHIP_CONFIG  Path to a YAML file with VM configuration
    RUST_LOG      Log level filter

examples:
    schip run breakout.rom
    schip run breakout.rom 20 120
    schip dis breakout.rom
"#;

const DEFAULT_STEPS: usize = 600;

fn load_config() -> Result<Chip8Conf, Box<dyn Error>> {
    match env::var_os("SCHIP_CONFIG") {
        Some(path) => {
            let file = fs::File::open(&path)?;
            let conf: Chip8Conf = serde_yaml::from_reader(file)?;
            log::debug!("loaded config from {:?}: {:#?}", path, conf);
            Ok(conf)
        }
        None => Ok(Chip8Conf::default()),
    }
}

fn run_bytecode(filepath: &str, cycles: Option<usize>, steps: usize) -> Result<(), Box<dyn Error>> {
    info!("running {filepath}");

    let mut conf = load_config()?;
    if let Some(cycles) = cycles {
        conf.cycles_per_step = cycles;
    }

    let mut vm = Chip8Vm::new(conf);
    vm.load_font(&fonts::FONT)?;
    vm.load_hires_font(&fonts::HIRES_FONT)?;
    vm.reset();
    vm.load_program_from(fs::File::open(filepath)?)?;

    let start = Instant::now();
    let mut steps_run = 0;
    for _ in 0..steps {
        steps_run += 1;
        match vm.step() {
            Flow::Exit => {
                info!("program exited");
                break;
            }
            Flow::KeyWait => {
                // There is no keyboard attached, so nothing will wake the machine.
                warn!("program is waiting for a key press, stopping");
                break;
            }
            _ => {}
        }
    }
    let end = Instant::now();

    println!(
        "{steps_run} steps in {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);
    println!("{}", vm.dump_registers()?);

    if vm.unknown_count() > 0 {
        warn!("skipped {} unsupported instructions", vm.unknown_count());
    }

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), Box<dyn Error>> {
    info!("disassembling {filepath}");

    let bytecode = fs::read(filepath)?;
    let mut buf = String::new();
    disassemble(&bytecode, &mut buf)?;
    print!("{buf}");

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let result = match parse_args() {
        Some(Cmd::Run {
            filepath,
            cycles,
            steps,
        }) => run_bytecode(&filepath, cycles, steps),
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Some(Cmd::Run {
                    filepath: args.next()?,
                    cycles: parse_number(args.next())?,
                    steps: parse_number(args.next())?.unwrap_or(DEFAULT_STEPS),
                }),
                "dis" => Some(Cmd::Dis {
                    filepath: args.next()?,
                }),
                _ => None,
            }
        }
        None => None,
    }
}

/// Parses an optional numeric argument.
///
/// Returns `None` when the argument is present but not a number.
fn parse_number(arg: Option<String>) -> Option<Option<usize>> {
    match arg {
        Some(arg) => arg.parse().ok().map(Some),
        None => Some(None),
    }
}

fn print_usage() {
    println!("SuperCHIP v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        cycles: Option<usize>,
        steps: usize,
    },
    /// Disassemble
    Dis { filepath: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(None), Some(None));
        assert_eq!(parse_number(Some("20".to_string())), Some(Some(20)));
        assert_eq!(parse_number(Some("fast".to_string())), None);
    }

    #[test]
    fn test_builtin_fonts_load() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_font(&fonts::FONT).unwrap();
        vm.load_hires_font(&fonts::HIRES_FONT).unwrap();
        assert_eq!(&vm.ram()[..5], &fonts::FONT[..5]);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = "cycles_per_step: 20\nquirks:\n  add_index_flag: true\n";
        let conf: Chip8Conf = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(conf.cycles_per_step, 20);
        assert!(conf.quirks.add_index_flag);
        assert_eq!(conf.rng_seed, None);
    }
}
