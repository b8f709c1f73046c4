use anyhow::Context;
use clap::{Parser, Subcommand};
use crowdsafe_client::{CrowdSafeClient, Progress};
use crowdsafe_core::analysis::{AlertLevel, AnalysisResult};
use crowdsafe_core::dashboard::{DashboardSummary, DEFAULT_WINDOW};
use crowdsafe_core::store::Cursor;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "CrowdSafe command-line client")]
struct Args {
    /// Base URL of the CrowdSafe service
    #[arg(long, default_value = "http://127.0.0.1:9000")]
    endpoint: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local video and analyze it
    Upload { file: PathBuf },
    /// Analyze a video link
    Url { url: String },
    /// Print the dashboard summary once
    Dashboard {
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
    },
    /// Keep the dashboard current from the insert stream
    Watch {
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
    },
    /// List stored analyses, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Continue after this cursor
        #[arg(long)]
        before: Option<Cursor>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let client = CrowdSafeClient::new(args.endpoint);

    match args.command {
        Command::Upload { file } => {
            let result = client
                .analyze_file(&file, report_progress)
                .await
                .with_context(|| format!("analyzing {}", file.display()))?;
            print_result(&result);
        }
        Command::Url { url } => {
            let result = client
                .analyze_url(&url, report_progress)
                .await
                .with_context(|| format!("analyzing {}", url))?;
            print_result(&result);
        }
        Command::Dashboard { window } => {
            let summary = client.dashboard(window).await?;
            print_summary(&summary);
        }
        Command::Watch { window } => watch(&client, window).await?,
        Command::History { limit, before } => {
            let page = client.page(before.as_ref(), limit).await?;
            for row in &page.rows {
                println!(
                    "{}  {:<8} people={:<4} density={:>3.0}%  {}",
                    row.created_at.format("%Y-%m-%d %H:%M"),
                    row.crowd_level,
                    row.total_people,
                    row.average_density * 100.0,
                    row.video_url
                        .as_deref()
                        .or(row.file_path.as_deref())
                        .unwrap_or("-")
                );
            }
            if let Some(cursor) = page.next_cursor {
                println!("more: --before {}", cursor);
            }
        }
    }

    Ok(())
}

async fn watch(client: &CrowdSafeClient, window: usize) -> anyhow::Result<()> {
    client
        .follow_dashboard(window, |feed, inserted| {
            if let Some(record) = inserted {
                println!("New analysis added: {} ({})", record.id, record.crowd_level);
            }
            print_summary(&feed.summary());
            true
        })
        .await?;
    Ok(())
}

fn report_progress(progress: Progress) {
    if progress.is_done() {
        eprintln!("[100%] done");
    } else {
        eprintln!("[{:>3}%] {}", progress.percent, progress.stage().label());
    }
}

fn print_result(result: &AnalysisResult) {
    println!("Video analysis complete!");
    println!("  Total people detected: {}", result.total_people);
    println!("  Crowd level:           {}", result.crowd_level);
    println!(
        "  Average density:       {:.0}%",
        result.average_density * 100.0
    );
    println!(
        "  Zones: safe {} / warning {} / danger {}",
        result.safe_zones, result.warning_zones, result.danger_zones
    );
    println!("  Alert timeline:");
    for alert in &result.alerts {
        let tag = match alert.level {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warn",
            AlertLevel::Danger => "DANGER",
        };
        println!("    {} [{}] {}", alert.time, tag, alert.message);
    }
}

fn print_summary(summary: &DashboardSummary) {
    let [safe, warning, danger] = summary.zone_shares;
    println!(
        "analyses={} people={} density={:.0}% ({:?}) status={} zones safe={:.0}% warning={:.0}% danger={:.0}%",
        summary.analyses,
        summary.total_people,
        summary.average_density * 100.0,
        summary.density_status,
        summary.overall_status,
        safe,
        warning,
        danger
    );
}
