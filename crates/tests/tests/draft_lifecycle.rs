use std::sync::Arc;

use meridian_agents::DeskAgent;
use meridian_core::{
    DeskError, DraftRequest, EnquiryStatus, NewEnquiry, NewLead, DEFAULT_HOTEL_TEXT,
    DEFAULT_PRICE_TEXT,
};
use meridian_genai::GeminiClient;
use meridian_observability::AppMetrics;
use meridian_storage::{EnquiryRepository, MemoryStore};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn agent_over(
    store: Arc<MemoryStore>,
    gemini_base: &str,
) -> DeskAgent<MemoryStore> {
    let genai = GeminiClient::new("test-key")
        .expect("client should build")
        .with_base_url(gemini_base.to_string());
    DeskAgent::new(store, genai, AppMetrics::shared())
}

fn lead(name: &str) -> NewLead {
    NewLead {
        name: name.to_string(),
        phone: String::new(),
        email: String::new(),
        source: None,
    }
}

fn enquiry(destination: &str) -> NewEnquiry {
    NewEnquiry {
        destination: destination.to_string(),
        travel_date: None,
        party_size: Some(2),
        budget: "flexible".to_string(),
        notes: String::new(),
    }
}

async fn mount_catalog(server: &MockServer) {
    let catalog = json!({
        "models": [{"name": "models/gemini-1.5-flash-001", "supportedGenerationMethods": ["generateContent"]}]
    });
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&catalog))
        .mount(server)
        .await;
}

#[tokio::test]
async fn validation_failure_creates_no_records() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), "http://localhost:1");

    let result = agent.create_enquiry(lead("   "), enquiry("Dubai")).await;
    assert!(matches!(result, Err(DeskError::Validation(_))));
    assert!(agent.list_enquiries().await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_draft_persists_text_and_status() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-001:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "candidates": [{"content": {"parts": [{"text": "Day 1: Arrival\nCheck in."}]}}]
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), &server.uri());

    let created = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap();
    let id = created.enquiry.id;

    let draft = agent.request_draft(id, DraftRequest::default()).await.unwrap();
    assert_eq!(draft.model_id, "gemini-1.5-flash-001");

    let stored = store.get_enquiry(id).await.unwrap().unwrap();
    assert_eq!(stored.itinerary_text, "Day 1: Arrival\nCheck in.");
    assert_eq!(stored.status, EnquiryStatus::DraftGenerated);
    assert_eq!(stored.hotel_text, "");
}

#[tokio::test]
async fn failed_generation_leaves_prior_state_untouched() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-001:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), &server.uri());

    let created = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap();
    let id = created.enquiry.id;

    agent
        .save_progress(id, "Day 1: Old draft", "Haveli Stay", "INR 90,000")
        .await
        .unwrap();

    let result = agent.request_draft(id, DraftRequest::default()).await;
    assert!(matches!(result, Err(DeskError::Provider { status: 500, .. })));

    let stored = store.get_enquiry(id).await.unwrap().unwrap();
    assert_eq!(stored.itinerary_text, "Day 1: Old draft");
    assert_eq!(stored.hotel_text, "Haveli Stay");
    assert_eq!(stored.status, EnquiryStatus::WorkInProgress);
}

#[tokio::test]
async fn save_progress_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), "http://localhost:1");

    let created = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap();
    let id = created.enquiry.id;

    agent
        .save_progress(id, "Day 1: X", "Hotel", "Price")
        .await
        .unwrap();
    let first = store.get_enquiry(id).await.unwrap().unwrap();

    agent
        .save_progress(id, "Day 1: X", "Hotel", "Price")
        .await
        .unwrap();
    let second = store.get_enquiry(id).await.unwrap().unwrap();

    assert_eq!(first.itinerary_text, second.itinerary_text);
    assert_eq!(first.hotel_text, second.hotel_text);
    assert_eq!(first.price_text, second.price_text);
    assert_eq!(first.status, second.status);
    assert_eq!(second.status, EnquiryStatus::WorkInProgress);
}

#[tokio::test]
async fn finalize_marks_quoted_and_allows_later_edits() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), "http://localhost:1");

    let created = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap();
    let id = created.enquiry.id;

    let bytes = agent
        .finalize(id, "Day 1: Arrival\nFort visit.", "Haveli Stay", "INR 90,000")
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(
        store.get_enquiry(id).await.unwrap().unwrap().status,
        EnquiryStatus::Quoted
    );

    // Finalizing does not lock the enquiry.
    agent
        .save_progress(id, "Day 1: Arrival (v2)", "Haveli Stay", "INR 95,000")
        .await
        .unwrap();
    assert_eq!(
        store.get_enquiry(id).await.unwrap().unwrap().status,
        EnquiryStatus::WorkInProgress
    );
}

#[tokio::test]
async fn sessions_do_not_leak_between_enquiries() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store.clone(), "http://localhost:1");

    let first = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap()
        .enquiry
        .id;
    let second = agent
        .create_enquiry(lead("Rohit"), enquiry("Bali"))
        .await
        .unwrap()
        .enquiry
        .id;

    agent
        .save_progress(first, "Day 1: Jaipur forts", "Haveli Stay", "INR 90,000")
        .await
        .unwrap();
    agent
        .save_progress(second, "Day 1: Ubud temples", "Rice Terrace Villa", "USD 2,400")
        .await
        .unwrap();

    let session_one = agent.open_session(first).await.unwrap();
    let session_two = agent.open_session(second).await.unwrap();

    assert_eq!(session_one.itinerary, "Day 1: Jaipur forts");
    assert_eq!(session_one.hotels, "Haveli Stay");
    assert_eq!(session_one.price, "INR 90,000");
    assert_eq!(session_two.itinerary, "Day 1: Ubud temples");
    assert_eq!(session_two.hotels, "Rice Terrace Villa");
    assert_eq!(session_two.price, "USD 2,400");
}

#[tokio::test]
async fn fresh_enquiry_session_uses_placeholders() {
    let store = Arc::new(MemoryStore::new());
    let agent = agent_over(store, "http://localhost:1");

    let id = agent
        .create_enquiry(lead("Asha"), enquiry("Jaipur"))
        .await
        .unwrap()
        .enquiry
        .id;

    let session = agent.open_session(id).await.unwrap();
    assert_eq!(session.itinerary, "");
    assert_eq!(session.hotels, DEFAULT_HOTEL_TEXT);
    assert_eq!(session.price, DEFAULT_PRICE_TEXT);
}
