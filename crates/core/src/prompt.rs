use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Enquiry;

/// Consultant inputs for one draft request: trip start, the split-stay
/// structure, headline sightseeing, and pasted flight PNR text the model
/// extracts times from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftRequest {
    pub start_date: Option<NaiveDate>,
    pub structure: String,
    pub sightseeing: String,
    pub flight_pnr: String,
}

/// Builds the prompt for one itinerary draft.
///
/// The `Day X:` header rule is load-bearing: the renderer keys its section
/// headers off lines that start with "Day".
pub fn build_draft_prompt(enquiry: &Enquiry, request: &DraftRequest) -> String {
    let start_date = request
        .start_date
        .map(|date| date.format("%-d %b %Y").to_string())
        .unwrap_or_else(|| "to be confirmed".to_string());
    let party = enquiry
        .party_size
        .map(|count| count.to_string())
        .unwrap_or_else(|| "not specified".to_string());

    format!(
        r#"Act as a Senior Consultant for Meridian Voyages.
Create a structured itinerary for {destination}.

DETAILS:
- Start Date: {start_date}
- Structure: {structure}
- Flight PNR: "{flight_pnr}"
- Highlights: {sightseeing}
- Party Size: {party}
- Client Notes: {notes}

STRICT FORMATTING RULE:
For each day, write the header in this specific format:
"Day X: [Date] - [MAJOR HIGHLIGHT]"

Example:
Day 1: 12 Mar - Arrival & Old Town Walking Tour
(Description...)

Tone: Professional & Exciting."#,
        destination = enquiry.destination,
        start_date = start_date,
        structure = request.structure,
        flight_pnr = request.flight_pnr,
        sightseeing = request.sightseeing,
        party = party,
        notes = enquiry.notes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnquiryStatus;
    use chrono::Utc;

    #[test]
    fn prompt_carries_destination_and_day_rule() {
        let enquiry = Enquiry {
            id: 1,
            lead_id: 1,
            destination: "Masai Mara".to_string(),
            travel_date: None,
            party_size: Some(4),
            budget: String::new(),
            notes: "anniversary trip".to_string(),
            status: EnquiryStatus::New,
            itinerary_text: String::new(),
            hotel_text: String::new(),
            price_text: String::new(),
            created_at: Utc::now(),
        };
        let request = DraftRequest {
            start_date: NaiveDate::from_ymd_opt(2026, 2, 26),
            structure: "3N Mara, 1N Nairobi".to_string(),
            sightseeing: "Great Migration crossing".to_string(),
            flight_pnr: "KQ 311 DEL-NBO 0310/0720".to_string(),
        };

        let prompt = build_draft_prompt(&enquiry, &request);
        assert!(prompt.contains("Masai Mara"));
        assert!(prompt.contains("Day X:"));
        assert!(prompt.contains("3N Mara, 1N Nairobi"));
        assert!(prompt.contains("26 Feb 2026"));
        assert!(prompt.contains("anniversary trip"));
    }

    #[test]
    fn missing_start_date_reads_as_unconfirmed() {
        let enquiry = Enquiry {
            id: 1,
            lead_id: 1,
            destination: "Bali".to_string(),
            travel_date: None,
            party_size: None,
            budget: String::new(),
            notes: String::new(),
            status: EnquiryStatus::New,
            itinerary_text: String::new(),
            hotel_text: String::new(),
            price_text: String::new(),
            created_at: Utc::now(),
        };
        let prompt = build_draft_prompt(&enquiry, &DraftRequest::default());
        assert!(prompt.contains("to be confirmed"));
    }
}
