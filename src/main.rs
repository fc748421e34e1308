mod batch;
mod fetch;
mod ids;
mod model;
mod parser;
mod translate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "guide_scraper", about = "IMDb parental guide scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one title (id like tt0111161, bare digits, or a full URL)
    Scrape {
        id: String,
        /// Output JSON path (default: <id>_guide.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape every id found in a source file, with checkpointed resume
    Batch {
        /// File to scan for embedded ids
        #[arg(long)]
        ids_file: PathBuf,
        /// Directory for per-id files, checkpoint and summary
        #[arg(long, default_value = "parental_guides")]
        output_dir: PathBuf,
        /// Base inter-request delay in seconds (a random jitter is added)
        #[arg(long, default_value_t = 3.0)]
        delay: f64,
        /// Explicit resume index; overrides any checkpoint
        #[arg(long, default_value_t = 0)]
        start_index: usize,
    },
    /// Translate category items of persisted guide files
    Translate {
        /// Directory holding *_guide.json files
        #[arg(long, default_value = "parental_guides")]
        dir: PathBuf,
        /// Restrict to one file (name or full path)
        #[arg(long)]
        file: Option<String>,
        /// API base URL (default: OPENAI_API_BASE env or api.openai.com)
        #[arg(long)]
        api_base: Option<String>,
        /// API key (default: OPENAI_API_KEY env)
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// Target language for the translated items
        #[arg(long, default_value = "Simplified Chinese")]
        target_lang: String,
        /// Delay in seconds before each service call
        #[arg(long, default_value_t = 0.5)]
        delay: f64,
        /// Re-translate files that already carry translations
        #[arg(long)]
        force: bool,
        /// List the files that would be processed, no network calls
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape { id, output } => {
            let id = ids::id_from_input(&id)?;
            let fetcher = fetch::Fetcher::new()?;
            let url = fetch::guide_url(&id);
            println!("Scraping: {url}");

            let html = fetcher.fetch(&url).await?;
            let record = parser::extract(&html, &id);

            let path = output.unwrap_or_else(|| PathBuf::from(format!("{id}_guide.json")));
            std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;
            println!("Saved to: {}", path.display());
            print_record_summary(&record);
            Ok(())
        }
        Commands::Batch {
            ids_file,
            output_dir,
            delay,
            start_index,
        } => {
            let ids = ids::extract_ids(&ids_file)?;
            println!("Found {} titles", ids.len());

            let estimated_mins = ids.len() as f64 * (delay + 1.0) / 60.0;
            println!("Estimated time: {estimated_mins:.1} minutes");
            println!("Output directory: {}", output_dir.display());

            let fetcher = fetch::Fetcher::new()?;
            let config = batch::BatchConfig {
                output_dir,
                delay,
                start_index,
            };
            let summary = batch::run(&fetcher, &ids, &config).await?;
            println!(
                "Scrape complete: {} ok, {} failed (of {})",
                summary.success, summary.failed_count, summary.total
            );
            Ok(())
        }
        Commands::Translate {
            dir,
            file,
            api_base,
            api_key,
            model,
            target_lang,
            delay,
            force,
            dry_run,
        } => {
            let config = translate::TranslateConfig {
                guides_dir: dir,
                api_base: api_base
                    .or_else(|| std::env::var("OPENAI_API_BASE").ok())
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key: api_key
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .unwrap_or_default(),
                model,
                target_lang,
                force,
                delay,
                file,
                dry_run,
            };
            translate::run(&config).await
        }
    }
}

fn print_record_summary(record: &model::GuideRecord) {
    let line = |name: &str, cat: &model::CategoryInfo| {
        println!("{name}: {} ({} items)", cat.severity, cat.items.len());
    };
    println!("{}", "=".repeat(50));
    println!("Title: {}", record.title);
    println!("Id: {}", record.id);
    println!("Content Rating: {}", record.content_rating);
    line("Sex & Nudity", &record.sex_nudity);
    line("Violence & Gore", &record.violence_gore);
    line("Profanity", &record.profanity);
    line("Alcohol, Drugs & Smoking", &record.alcohol_drugs_smoking);
    line("Frightening & Intense", &record.frightening_intense);
    println!("Certifications: {} countries", record.certifications.len());
    println!("{}", "=".repeat(50));
}
