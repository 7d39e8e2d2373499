//! olas-sim - run tokenomics epochs on a simulated ledger

use clap::Parser;
use olas_cli::{Scenario, Simulation, SimulationReport};
use olas_core::{Amount, FixedPoint};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "olas-sim")]
#[command(about = "OLAS tokenomics and treasury simulator", version)]
struct Cli {
    /// Path to the scenario file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override the number of epochs in the scenario
    #[arg(short, long)]
    epochs: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Base units as whole tokens
fn tokens(amount: Amount) -> String {
    FixedPoint::from_raw(amount).to_string()
}

fn display_report(report: &SimulationReport) {
    println!("\n{}", "╔═══════════════════════════════════════════════════╗".cyan());
    println!("{}", "║         OLAS TOKENOMICS SIMULATION                ║".cyan().bold());
    println!("{}", "╚═══════════════════════════════════════════════════╝".cyan());

    for epoch in &report.epochs {
        let point = &epoch.point;
        println!(
            "\n{} {}",
            "Epoch".yellow().bold(),
            point.epoch.to_string().yellow().bold()
        );
        println!("  Revenue:          {} ETH", tokens(point.total_revenue).green());
        println!("  Whitelisted:      {} ETH", tokens(point.whitelisted_revenue));
        println!("  UCF (c / a):      {} ({} / {})", point.ucf, point.ucfc.ucf, point.ucfa.ucf);
        println!("  IDF:              {}", point.idf.to_string().bright_blue());
        println!("  Staker rewards:   {} ETH", tokens(point.staker_rewards));
        println!("  Treasury rewards: {} ETH", tokens(point.treasury_rewards));
        println!(
            "  Top-ups:          {} OLAS owners, {} OLAS stakers",
            tokens(point.owner_top_ups),
            tokens(point.staker_top_ups)
        );
        println!(
            "  New units:        {} components, {} agents, {} owners",
            point.ucfc.num_new_units, point.ucfa.num_new_units, point.num_new_owners
        );
        for payout in &epoch.owner_payouts {
            println!(
                "    {} {} ETH + {} OLAS to {}",
                "→".bright_black(),
                tokens(payout.reward).green(),
                tokens(payout.top_up).green(),
                payout.account
            );
        }
    }

    println!("\n{}", "Stakers".yellow().bold());
    if report.staker_payouts.is_empty() {
        println!("  {}", "no staker payouts".bright_black());
    }
    for payout in &report.staker_payouts {
        println!(
            "  {} ETH + {} OLAS to {}",
            tokens(payout.reward).green(),
            tokens(payout.top_up).green(),
            payout.account
        );
    }

    println!("\n{}", "Treasury".yellow().bold());
    println!("  ETH from services: {}", tokens(report.treasury.eth_from_services));
    println!("  ETH owned:         {}", tokens(report.treasury.eth_owned));
    println!("  OLAS minted:       {}", tokens(report.olas_minted));
    println!();
}

fn run(cli: Cli) -> olas_cli::Result<()> {
    let mut scenario = Scenario::load(&cli.config)?;
    if let Some(epochs) = cli.epochs {
        scenario.epochs = epochs;
    }
    log::info!("Running {} epochs from {:?}", scenario.epochs, cli.config);

    let report = Simulation::new(scenario)?.run()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
