use clap::{Parser as ClapParser, ValueEnum};
use log::info;
use std::process;

use pairvm::{HeapSettings, VM, VMCreateInfo, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Objects on the stack survive a collection
    Roots,
    /// Popped objects are reclaimed
    Unreachable,
    /// Pairs keep their nested objects alive
    Nested,
    /// Unreachable cycles are reclaimed
    Cycle,
    /// Many short-lived allocations
    Churn,
}

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenarios to run in order (all of them if none are given)
    #[arg(value_enum)]
    scenarios: Vec<Scenario>,

    #[arg(long, default_value_t = 256, help = "Maximum number of roots")]
    stack_size: usize,

    #[arg(long, default_value_t = 8, help = "Objects before the first collection")]
    initial_threshold: usize,

    #[arg(long, default_value_t = 2, help = "Survivor multiplier for the next threshold")]
    growth_factor: usize,

    #[arg(long, help = "Lower bound for the threshold [default: initial threshold]")]
    min_threshold: Option<usize>,

    #[arg(long, default_value_t = 1000, help = "Rounds of the churn scenario")]
    iterations: usize,
}

impl Cli {
    fn create_info(&self) -> VMCreateInfo {
        VMCreateInfo {
            stack_size: self.stack_size,
            heap: HeapSettings {
                initial_threshold: self.initial_threshold,
                growth_factor: self.growth_factor,
                min_threshold: self.min_threshold,
                heap_limit: None,
            },
        }
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let cli = Cli::parse();

    let scenarios = if cli.scenarios.is_empty() {
        Scenario::value_variants().to_vec()
    } else {
        cli.scenarios.clone()
    };

    for scenario in scenarios {
        if let Err(err) = run_scenario(scenario, &cli) {
            eprintln!("Error in scenario {:?}: {}", scenario, err);
            process::exit(1);
        }
    }
}

fn run_scenario(scenario: Scenario, cli: &Cli) -> Result<(), VmError> {
    let mut vm = VM::try_new(cli.create_info())?;

    match scenario {
        Scenario::Roots => {
            info!("1: objects on the stack are kept");
            vm.push_scalar(1)?;
            vm.push_scalar(2)?;
            vm.collect();
        }
        Scenario::Unreachable => {
            info!("2: unreachable objects are freed");
            vm.push_scalar(1)?;
            vm.push_scalar(2)?;
            vm.pop()?;
            vm.pop()?;
            vm.collect();
        }
        Scenario::Nested => {
            info!("3: nested objects are reached");
            vm.push_scalar(1)?;
            vm.push_scalar(2)?;
            vm.push_pair()?;
            vm.push_scalar(3)?;
            vm.push_scalar(4)?;
            vm.push_pair()?;
            vm.push_pair()?;
            print!("{}", vm.stack_to_string());
            vm.collect();
        }
        Scenario::Cycle => {
            info!("4: cycles");
            vm.push_scalar(1)?;
            vm.push_scalar(2)?;
            let a = vm.push_pair()?;
            vm.push_scalar(3)?;
            vm.push_scalar(4)?;
            let b = vm.push_pair()?;

            vm.set_tail(a, b)?;
            vm.set_tail(b, a)?;
            println!("{}", vm.render(a)?);

            vm.pop()?;
            vm.pop()?;
            vm.collect();
        }
        Scenario::Churn => {
            info!("5: churn");
            let batch = cli.stack_size.min(20);
            for i in 0..cli.iterations {
                for _ in 0..batch {
                    vm.push_scalar(i as i64)?;
                }
                for _ in 0..batch {
                    vm.pop()?;
                }
            }
        }
    }

    let stats = vm.teardown();
    info!(
        "teardown freed {} of {} objects",
        stats.freed, stats.before
    );
    Ok(())
}
