use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use meridian_agents::DeskAgent;
use meridian_core::{DraftRequest, LeadSource, NewEnquiry, NewLead};
use meridian_genai::GeminiClient;
use meridian_observability::{init_tracing, AppMetrics};
use meridian_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "desk")]
#[command(about = "Meridian Voyages back-office CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record and list leads and their trip enquiries.
    Enquiry {
        #[command(subcommand)]
        command: EnquiryCommand,
    },
    /// Show the editable draft buffers for one enquiry.
    Session { enquiry_id: i64 },
    /// Generate a fresh itinerary draft for an enquiry.
    Draft {
        enquiry_id: i64,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        structure: String,
        #[arg(long, default_value = "")]
        sightseeing: String,
        /// File with the pasted flight PNR text.
        #[arg(long)]
        pnr_file: Option<PathBuf>,
    },
    /// Save edited draft blocks without finalizing.
    Save {
        enquiry_id: i64,
        #[arg(long)]
        itinerary_file: PathBuf,
        #[arg(long)]
        hotels_file: Option<PathBuf>,
        #[arg(long)]
        price_file: Option<PathBuf>,
    },
    /// Mark the enquiry quoted and write the PDF quotation.
    Finalize {
        enquiry_id: i64,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        itinerary_file: Option<PathBuf>,
        #[arg(long)]
        hotels_file: Option<PathBuf>,
        #[arg(long)]
        price_file: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum EnquiryCommand {
    New {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        travel_date: Option<NaiveDate>,
        #[arg(long)]
        party_size: Option<i64>,
        #[arg(long, default_value = "")]
        budget: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("meridian_cli");
    let cli = Cli::parse();

    let agent = build_agent().await?;

    match cli.command {
        Command::Enquiry { command } => match command {
            EnquiryCommand::New {
                name,
                phone,
                email,
                source,
                destination,
                travel_date,
                party_size,
                budget,
                notes,
            } => {
                let created = agent
                    .create_enquiry(
                        NewLead {
                            name,
                            phone,
                            email,
                            source: source.as_deref().and_then(LeadSource::parse),
                        },
                        NewEnquiry {
                            destination,
                            travel_date,
                            party_size,
                            budget,
                            notes,
                        },
                    )
                    .await?;
                println!("{}", serde_json::to_string_pretty(&created)?);
            }
            EnquiryCommand::List => {
                let enquiries = agent.list_enquiries().await?;
                println!("{}", serde_json::to_string_pretty(&enquiries)?);
            }
        },
        Command::Session { enquiry_id } => {
            let session = agent.open_session(enquiry_id).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Draft {
            enquiry_id,
            start_date,
            structure,
            sightseeing,
            pnr_file,
        } => {
            let flight_pnr = match pnr_file {
                Some(path) => read_block(&path)?,
                None => String::new(),
            };

            let draft = agent
                .request_draft(
                    enquiry_id,
                    DraftRequest {
                        start_date,
                        structure,
                        sightseeing,
                        flight_pnr,
                    },
                )
                .await?;

            eprintln!("draft created using {}", draft.model_id);
            println!("{}", draft.text);
        }
        Command::Save {
            enquiry_id,
            itinerary_file,
            hotels_file,
            price_file,
        } => {
            let session = agent.open_session(enquiry_id).await?;
            let itinerary = read_block(&itinerary_file)?;
            let hotels = read_optional_block(hotels_file.as_deref(), session.hotels)?;
            let price = read_optional_block(price_file.as_deref(), session.price)?;

            agent
                .save_progress(enquiry_id, &itinerary, &hotels, &price)
                .await?;
            println!("enquiry {enquiry_id} saved as work in progress");
        }
        Command::Finalize {
            enquiry_id,
            out,
            itinerary_file,
            hotels_file,
            price_file,
        } => {
            let session = agent.open_session(enquiry_id).await?;
            let itinerary = match itinerary_file {
                Some(path) => read_block(&path)?,
                None => session.itinerary.clone(),
            };
            if itinerary.is_empty() {
                bail!("enquiry {enquiry_id} has no saved draft; pass --itinerary-file");
            }
            let hotels = read_optional_block(hotels_file.as_deref(), session.hotels)?;
            let price = read_optional_block(price_file.as_deref(), session.price)?;

            let bytes = agent
                .finalize(enquiry_id, &itinerary, &hotels, &price)
                .await?;
            fs::write(&out, &bytes)
                .with_context(|| format!("failed writing {}", out.display()))?;
            println!("quotation written to {} ({} bytes)", out.display(), bytes.len());
        }
    }

    Ok(())
}

async fn build_agent() -> Result<DeskAgent<Store>> {
    let database_url = env::var("MERIDIAN_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:meridian_desk.db?mode=rwc".to_string());
    let store = Store::sqlite(&database_url)
        .await
        .with_context(|| format!("failed to open the enquiry database at {database_url}"))?;

    let gemini_key = env::var("GEMINI_API_KEY").unwrap_or_default();
    let mut genai = GeminiClient::new(gemini_key)?;
    if let Ok(base) = env::var("GEMINI_API_BASE") {
        genai = genai.with_base_url(base);
    }

    Ok(DeskAgent::new(
        Arc::new(store),
        genai,
        AppMetrics::shared(),
    ))
}

fn read_block(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    Ok(text.trim_end().to_string())
}

fn read_optional_block(path: Option<&Path>, fallback: String) -> Result<String> {
    match path {
        Some(path) => read_block(path),
        None => Ok(fallback),
    }
}
