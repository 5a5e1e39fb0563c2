use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use weather_service_cli::jobs_api::JobsApiClient;
use weather_service_cli::poller::{JobPoller, PollerConfig};
use weather_service_cli::{utils, AnalysisData};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// City to analyze
    #[arg(short, long)]
    city: String,

    /// Base URL of the dashboard backend
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value_t = 3000)]
    interval_ms: u64,

    /// Give up after this many seconds of polling
    #[arg(short, long, default_value_t = 300)]
    timeout_secs: u64,

    /// Where to write the decoded analysis payload
    #[arg(short, long, default_value = "analysis.json")]
    output: String,

    /// Print autocomplete suggestions for CITY and exit
    #[arg(long)]
    suggest: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let args = Args::parse();
    let client = JobsApiClient::new(&args.server)?;

    if args.suggest {
        let suggestions = client.search_suggestions(&args.city).await?;
        if suggestions.is_empty() {
            println!("No matching cities for '{}'.", args.city);
        }
        for suggestion in &suggestions {
            println!("  {suggestion}");
        }
        return Ok(());
    }

    // 1) Submit the job; current conditions come back right away
    let created = client.submit_job(&args.city).await?;
    println!("✅ Job {} accepted for {}", created.job_id, args.city);
    println!(
        "🌡️ Current conditions:\n{}",
        serde_json::to_string_pretty(&created.current_weather)?
    );

    // 2) Poll until the analysis reaches a terminal state
    let config = PollerConfig {
        interval: Duration::from_millis(args.interval_ms),
        ..PollerConfig::default()
    };
    let poller = JobPoller::new(client, config);
    let mut updates = poller.subscribe();
    poller.set_job_id(Some(created.job_id.clone()));
    println!("🔍 Waiting for the analysis of {} to finish...", args.city);

    let snapshot = tokio::time::timeout(Duration::from_secs(args.timeout_secs), async {
        loop {
            let snap = updates.borrow_and_update().clone();
            if snap.is_terminal() {
                return snap;
            }
            if updates.changed().await.is_err() {
                return poller.snapshot();
            }
        }
    })
    .await
    .map_err(|_| "timed out waiting for the analysis to finish")?;

    poller.set_job_id(None);

    if let Some(message) = snapshot.error {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
    let value = snapshot
        .result
        .ok_or("polling stopped without a result")?;

    // 3) Persist the payload and print a short summary
    utils::save_json(&value, &args.output)?;
    if let Ok(analysis) = serde_json::from_value::<AnalysisData>(value) {
        println!(
            "📊 {} hourly points, {} daily points",
            analysis.hourly_points(),
            analysis.daily_points()
        );
        if let Some(hottest) = analysis.insights.hottest_day {
            println!(
                "🔥 Hottest day in the last year: {} ({}°C)",
                hottest.date, hottest.temp
            );
        }
    }

    Ok(())
}
