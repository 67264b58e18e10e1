use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use megapicks::data::{save_payouts_to_csv, save_standings_to_csv};
use megapicks::espn::ScoreboardClient;
use megapicks::rules::HouseRules;
use megapicks::store::ContestStore;
use megapicks::{
    grade_week, recompute_season, settle_season, settle_week, sync_week,
};

#[derive(Parser)]
#[command(name = "megapicks", about = "Weekly NFL pick contest settlement engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull a week of games and lines from the score feed
    Sync {
        #[arg(long)]
        week: Option<u8>,
        #[arg(long)]
        year: Option<u16>,
        #[arg(long)]
        season_type: Option<u8>,
    },
    /// Grade a week's picks and parlays against final scores
    Grade { week: u8 },
    /// Recompute and print season standings
    Standings,
    /// Settle the weekly pot for a graded week
    SettleWeek { week: u8 },
    /// Settle the mega pot at season end
    SettleSeason,
    /// Fund the mega pot (seasonal fee pool), amount in cents
    FundMega { cents: i64 },
    /// Export standings and the payout ledger to CSV
    Export {
        #[arg(long, default_value = "standings.csv")]
        standings: String,
        #[arg(long, default_value = "payouts.csv")]
        payouts: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let store_path =
        std::env::var("MEGAPICKS_STORE").unwrap_or_else(|_| "data/contest.json".to_string());
    let rules_path =
        std::env::var("MEGAPICKS_RULES").unwrap_or_else(|_| "config/rules.json".to_string());
    let season: u16 = std::env::var("MEGAPICKS_SEASON")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2025);

    let rules = HouseRules::load(&rules_path).context("Failed to load house rules")?;
    let mut store = ContestStore::load(&store_path, season).context("Failed to load the store")?;

    match cli.command {
        Command::Sync {
            week,
            year,
            season_type,
        } => {
            let client = ScoreboardClient::new();
            let count = sync_week(&mut store, &client, year, week, season_type).await?;
            store.save(&store_path)?;
            println!("Synced {} games into {}", count, store_path);
        }
        Command::Grade { week } => {
            let summary = grade_week(&mut store, week, &rules);
            store.save(&store_path)?;
            println!("Week {} grading pass:", week);
            println!(
                "  - {} picks graded, {} still pending",
                summary.picks_graded, summary.picks_pending
            );
            println!(
                "  - {} parlays graded, {} still pending",
                summary.parlays_graded, summary.parlays_pending
            );
            println!("  - {} weekly totals filled in", summary.submissions_totaled);
            if summary.integrity_errors > 0 {
                eprintln!(
                    "  - {} records excluded over data integrity errors (see logs)",
                    summary.integrity_errors
                );
            }
        }
        Command::Standings => {
            let standings = recompute_season(&mut store);
            store.save(&store_path)?;
            if standings.is_empty() {
                println!("No graded results yet.");
            } else {
                println!("Season {} standings:\n", season);
                for s in &standings {
                    println!(
                        "{:>3}. {} | {:.1} pts | ATS {}-{}-{} | parlays {} hit / {} busted",
                        s.rank,
                        s.contestant_id,
                        s.total_points,
                        s.ats_wins,
                        s.ats_losses,
                        s.ats_pushes,
                        s.parlays_hit,
                        s.parlays_busted
                    );
                }
            }
        }
        Command::SettleWeek { week } => {
            let payouts = settle_week(&mut store, week, &rules, chrono::Utc::now())?;
            store.save(&store_path)?;
            if payouts.is_empty() {
                println!("No unique winner for week {}; pot rolled to the mega pot.", week);
            } else {
                println!("Week {} payouts:\n", week);
                for (i, payout) in payouts.iter().enumerate() {
                    println!("{}. {}", i + 1, payout.format());
                }
            }
        }
        Command::SettleSeason => {
            let payouts = settle_season(&mut store, chrono::Utc::now())?;
            store.save(&store_path)?;
            println!("Mega pot payouts:\n");
            for (i, payout) in payouts.iter().enumerate() {
                println!("{}. {}", i + 1, payout.format());
            }
        }
        Command::FundMega { cents } => {
            let mega = store.add_to_mega_pot(cents).clone();
            store.save(&store_path)?;
            println!(
                "Mega pot now ${}.{:02}",
                mega.amount_cents / 100,
                mega.amount_cents % 100
            );
        }
        Command::Export {
            standings,
            payouts,
        } => {
            let computed = recompute_season(&mut store);
            save_standings_to_csv(&computed, &standings)?;
            save_payouts_to_csv(&store.payouts, &payouts)?;
            store.save(&store_path)?;
            println!("Saved standings to {}", standings);
            println!("Saved payout ledger to {}", payouts);
        }
    }

    Ok(())
}
