use std::sync::Arc;
use std::time::Instant;

use meridian_core::{
    build_draft_prompt, validate_submission, DeskError, DraftRequest, DraftSession, Enquiry,
    EnquiryStatus, EnquiryWithLead, Lead, NewEnquiry, NewLead,
};
use meridian_genai::{GeminiClient, SelectionReason};
use meridian_observability::AppMetrics;
use meridian_render::{PdfRenderer, Quotation, QuotationRenderer};
use meridian_storage::{EnquiryRepository, LeadRepository};
use serde::Serialize;
use tracing::{info, instrument};

/// One successful generation: the raw draft text plus the model discovery
/// settled on for this call.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDraft {
    pub text: String,
    pub model_id: String,
}

/// Owns the per-enquiry draft lifecycle: it decides when generated text is
/// persisted, moves the status along, and assembles the final render
/// request. One writer at a time; every operation is a single synchronous
/// unit of work.
pub struct DeskAgent<S, R = PdfRenderer>
where
    S: LeadRepository + EnquiryRepository,
    R: QuotationRenderer,
{
    store: Arc<S>,
    genai: GeminiClient,
    renderer: R,
    metrics: Arc<AppMetrics>,
}

impl<S> DeskAgent<S>
where
    S: LeadRepository + EnquiryRepository,
{
    pub fn new(store: Arc<S>, genai: GeminiClient, metrics: Arc<AppMetrics>) -> Self {
        Self {
            store,
            genai,
            renderer: PdfRenderer,
            metrics,
        }
    }
}

impl<S, R> DeskAgent<S, R>
where
    S: LeadRepository + EnquiryRepository,
    R: QuotationRenderer,
{
    pub fn with_renderer(
        store: Arc<S>,
        genai: GeminiClient,
        renderer: R,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            genai,
            renderer,
            metrics,
        }
    }

    /// Records a new lead and its enquiry. A fresh Lead row is always
    /// inserted, even when the same phone or email was seen before. If the
    /// enquiry insert fails the lead stays behind as an ignorable orphan.
    #[instrument(skip(self, lead, enquiry))]
    pub async fn create_enquiry(
        &self,
        lead: NewLead,
        enquiry: NewEnquiry,
    ) -> Result<EnquiryWithLead, DeskError> {
        self.metrics.inc_request();
        validate_submission(&lead, &enquiry)?;

        let lead_id = self.store.create_lead(lead).await?;
        let enquiry_id = self.store.create_enquiry(lead_id, enquiry).await?;
        self.metrics.inc_enquiry_created();

        let lead = self.require_lead(lead_id).await?;
        let enquiry = self.require_enquiry(enquiry_id).await?;
        info!(enquiry_id, lead_id, "enquiry recorded");
        Ok(EnquiryWithLead { enquiry, lead })
    }

    pub async fn list_enquiries(&self) -> Result<Vec<EnquiryWithLead>, DeskError> {
        self.metrics.inc_request();
        self.store.list_enquiries().await
    }

    /// Loads the selected enquiry's persisted draft fields into a fresh
    /// editing buffer. Selecting another enquiry means opening another
    /// session; nothing carries over.
    pub async fn open_session(&self, enquiry_id: i64) -> Result<DraftSession, DeskError> {
        self.metrics.inc_request();
        let enquiry = self.require_enquiry(enquiry_id).await?;
        Ok(DraftSession::open(&enquiry))
    }

    /// Runs model discovery and one generation request, then persists the
    /// raw text as the enquiry's itinerary and advances the status.
    /// Discovery is repeated on every call. On any failure nothing is
    /// written and the previous draft fields stay exactly as they were.
    #[instrument(skip(self, request))]
    pub async fn request_draft(
        &self,
        enquiry_id: i64,
        request: DraftRequest,
    ) -> Result<GeneratedDraft, DeskError> {
        self.metrics.inc_request();
        let started = Instant::now();
        let enquiry = self.require_enquiry(enquiry_id).await?;

        let selected = self.genai.discover_model().await?;
        if selected.reason != SelectionReason::PriorityMatch {
            self.metrics.inc_discovery_fallback();
        }

        let prompt = build_draft_prompt(&enquiry, &request);
        let text = match self.genai.generate(&selected.model_id, &prompt).await {
            Ok(text) => text,
            Err(error) => {
                self.metrics.inc_generation_failure();
                return Err(error);
            }
        };

        self.store
            .update_draft(
                enquiry_id,
                &text,
                &enquiry.hotel_text,
                &enquiry.price_text,
                EnquiryStatus::DraftGenerated,
            )
            .await?;

        self.metrics.inc_draft_generated();
        self.metrics.observe_generation_latency(started.elapsed());
        info!(enquiry_id, model = %selected.model_id, "draft generated");

        Ok(GeneratedDraft {
            text,
            model_id: selected.model_id,
        })
    }

    /// Persists all three blocks verbatim. Repeating the call with the
    /// same content is a no-op in effect.
    #[instrument(skip(self, itinerary, hotels, price))]
    pub async fn save_progress(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
    ) -> Result<(), DeskError> {
        self.metrics.inc_request();
        self.store
            .update_draft(
                enquiry_id,
                itinerary,
                hotels,
                price,
                EnquiryStatus::WorkInProgress,
            )
            .await?;
        info!(enquiry_id, "progress saved");
        Ok(())
    }

    /// Same persistence as [`save_progress`] with status `Quoted`, then
    /// renders the quotation and returns the PDF bytes. Finalizing does
    /// not lock the enquiry; a later save moves it back to work in
    /// progress.
    ///
    /// [`save_progress`]: DeskAgent::save_progress
    #[instrument(skip(self, itinerary, hotels, price))]
    pub async fn finalize(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
    ) -> Result<Vec<u8>, DeskError> {
        self.metrics.inc_request();
        let enquiry = self.require_enquiry(enquiry_id).await?;
        let lead = self.require_lead(enquiry.lead_id).await?;

        self.store
            .update_draft(enquiry_id, itinerary, hotels, price, EnquiryStatus::Quoted)
            .await?;

        let quotation = Quotation::build(
            &lead.name,
            &enquiry.destination,
            itinerary,
            hotels,
            price,
        );
        let bytes = self.renderer.render(&quotation)?;
        self.metrics.inc_quote_rendered();
        info!(enquiry_id, bytes = bytes.len(), "quotation rendered");
        Ok(bytes)
    }

    async fn require_enquiry(&self, enquiry_id: i64) -> Result<Enquiry, DeskError> {
        self.store
            .get_enquiry(enquiry_id)
            .await?
            .ok_or_else(|| DeskError::persistence(RowVanished("enquiry", enquiry_id)))
    }

    async fn require_lead(&self, lead_id: i64) -> Result<Lead, DeskError> {
        self.store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| DeskError::persistence(RowVanished("lead", lead_id)))
    }
}

#[derive(Debug)]
struct RowVanished(&'static str, i64);

impl std::fmt::Display for RowVanished {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} does not exist", self.0, self.1)
    }
}

impl std::error::Error for RowVanished {}
