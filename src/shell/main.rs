use clap::{Parser, Subcommand};
use pledges::modules::pledges::core::pledge::{DEFAULT_AMOUNT, amount_hint};
use pledges::modules::pledges::use_cases::submit_pledge::command::SubmitPledge;
use pledges::shell::config::AppConfig;
use pledges::shell::state::AppState;
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "pledges", version, about = "Track monthly pledges and their headline stats")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exact count, total, average and projected annual amount.
    Stats,
    /// The (capped) pledge list as the store holds it.
    List,
    /// Submit one pledge, e.g. `pledges submit Alice 12`.
    Submit {
        name: String,
        #[arg(help = amount_hint(), default_value_t = DEFAULT_AMOUNT.to_string())]
        amount: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let mut state = AppState::build(&config).await?;
    state.start().await;

    let output = match cli.command {
        Command::Stats => {
            let view = state.stats.current();
            if let Some(e) = view.error {
                anyhow::bail!("failed to load statistics: {e}");
            }
            serde_json::to_value(view.stats)?
        }
        Command::List => {
            if let Some(e) = state.pledges.last_error().await {
                anyhow::bail!("failed to load pledges: {e}");
            }
            serde_json::to_value(state.pledges.snapshot().await)?
        }
        Command::Submit { name, amount } => {
            let pledge = state
                .submissions
                .submit(SubmitPledge::new(name, amount))
                .await?;
            let stats = state.stats.refresh().await?;
            json!({ "pledge": pledge, "stats": stats })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    state.shutdown();
    Ok(())
}
