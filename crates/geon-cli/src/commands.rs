use anyhow::bail;
use colored::Colorize;
use geon_registry::RegistryCall;
use geon_runtime::{DeploymentConfig, Runtime};
use geon_types::Address;
use serde_json::json;

use crate::cli::*;
use crate::scenario::{Scenario, ScenarioReport};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format),
        Command::Selectors => cmd_selectors(cli.format),
        Command::Address(args) => cmd_address(args, cli.format),
        Command::Config => cmd_config(),
    }
}

fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = run_scenario(&args)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    if !report.passed {
        bail!("scenario failed: {} step(s) did not match", report.failures());
    }
    Ok(())
}

fn run_scenario(args: &RunArgs) -> anyhow::Result<ScenarioReport> {
    let config = match &args.config {
        Some(path) => DeploymentConfig::load(path)?,
        None => DeploymentConfig::default(),
    };
    let scenario = Scenario::load(&args.scenario)?;
    let runtime = Runtime::deploy(config)?;
    scenario.run(&runtime)
}

fn print_report(report: &ScenarioReport) {
    if let Some(name) = &report.name {
        println!("Scenario {}", name.bold());
    }
    for step in &report.steps {
        let mark = if step.passed { "✓".green() } else { "✗".red() };
        let result = match (&step.output, &step.error) {
            (Some(output), _) => output.to_string(),
            (None, Some(error)) => format!("{} ({})", error.kind.yellow(), error.message),
            (None, None) => String::new(),
        };
        println!("{} {:>3} {:<12} {:<26} {}", mark, step.index, step.from, step.op.cyan(), result);
        if !step.passed {
            let wanted = step.expected.as_deref().unwrap_or("success");
            println!("      expected {}", wanted.bold());
        }
    }
    let audit = if report.audit.is_balanced() {
        "balanced".green()
    } else {
        "UNBALANCED".red().bold()
    };
    println!("\nCustody {}: {}", audit, report.audit);
    if report.passed {
        println!("{} All {} steps passed.", "✓".green().bold(), report.steps.len());
    }
}

fn cmd_selectors(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = RegistryCall::abi()
                .map(|(signature, selector)| json!({ "signature": signature, "selector": selector.to_string() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for (signature, selector) in RegistryCall::abi() {
                println!("{}  {}", selector.to_string().yellow(), signature);
            }
        }
    }
    Ok(())
}

fn cmd_address(args: AddressArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address = Address::derive(&args.label);
    match format {
        OutputFormat::Json => println!("{}", json!({ "label": args.label, "address": address.to_string() })),
        OutputFormat::Text => println!("{} {}", args.label.bold(), address.to_string().cyan()),
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", DeploymentConfig::default().to_toml_string()?);
    Ok(())
}
