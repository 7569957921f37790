use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod flavor;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use flavor::Flavor;
use output::print_test_summary;
use sse_client::Connection;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "Chatroom SSE Integration Testing Tool")]
struct Cli {
    /// Base URL of the chat server (e.g., http://localhost:8081)
    #[arg(long)]
    base_url: String,

    /// Which endpoint pair to exercise
    #[arg(long, value_enum, default_value = "plain")]
    flavor: Flavor,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Check that two listeners register with the server
    ConnectionTest,
    /// Publish one message and check both listeners receive it
    RoundTrip,
    /// Publish a malformed body and check it is rejected without a broadcast
    FormRejection,
    /// Run all scenarios
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let base_url = cli.base_url.trim_end_matches('/').to_string();
    let flavor = cli.flavor;

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let client = reqwest::Client::new();
    let api_client = ApiClient::new(client, base_url.clone());

    let health = api_client.health().await?;
    println!(
        "{} Server is {} ({} subscribers)",
        "✓".green(),
        health.status,
        health.subscribers
    );

    println!(
        "\n{} Establishing {} SSE connections on {}...",
        "→".blue(),
        format!("{:?}", flavor).to_lowercase(),
        flavor.path()
    );
    let mut sse1 = Connection::establish(&base_url, flavor, "Listener 1".to_string()).await?;
    let mut sse2 = Connection::establish(&base_url, flavor, "Listener 2".to_string()).await?;

    println!("{} Listener 1 SSE connection established", "✓".green());
    println!("{} Listener 2 SSE connection established", "✓".green());

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    // Every scenario needs both listeners registered before it publishes
    results.push(scenarios::test_connection(&api_client, &sse1, &sse2).await?);

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {}
        ScenarioChoice::RoundTrip => {
            results.push(
                scenarios::test_round_trip(flavor, &api_client, &mut sse1, &mut sse2).await?,
            );
        }
        ScenarioChoice::FormRejection => {
            results.push(scenarios::test_form_rejection(flavor, &api_client, &mut sse1).await?);
        }
        ScenarioChoice::All => {
            results.push(
                scenarios::test_round_trip(flavor, &api_client, &mut sse1, &mut sse2).await?,
            );
            results.push(scenarios::test_form_rejection(flavor, &api_client, &mut sse1).await?);
        }
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
