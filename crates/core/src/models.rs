use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// Placeholder accommodation block shown until the consultant overwrites it.
pub const DEFAULT_HOTEL_TEXT: &str =
    "Option 1: Hilton Garden Inn (BB)\nOption 2: JW Marriott (BB)";

/// Placeholder investment block shown until the consultant overwrites it.
pub const DEFAULT_PRICE_TEXT: &str = "Total Package Cost: INR 1,50,000 + Taxes\n\nIncludes:\n- Daily Breakfast\n- All Transfers\n- Visa Fees";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    WalkIn,
    Referral,
    Website,
    Social,
    Repeat,
}

impl LeadSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "walk-in" | "walk_in" | "walkin" => Some(Self::WalkIn),
            "referral" => Some(Self::Referral),
            "website" | "web" => Some(Self::Website),
            "social" | "instagram" | "facebook" => Some(Self::Social),
            "repeat" | "returning" => Some(Self::Repeat),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::WalkIn => "walk_in",
            Self::Referral => "referral",
            Self::Website => "website",
            Self::Social => "social",
            Self::Repeat => "repeat",
        }
    }
}

/// Lifecycle of an enquiry. Stored as the human-readable strings the office
/// already uses; `Lost` is set manually and has no triggering transition
/// here. Backward transitions are allowed: saving after a finalize moves
/// the enquiry back to `WorkInProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnquiryStatus {
    New,
    DraftGenerated,
    WorkInProgress,
    Quoted,
    Lost,
}

impl EnquiryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::DraftGenerated => "Draft Generated",
            Self::WorkInProgress => "Work in Progress",
            Self::Quoted => "Quoted",
            Self::Lost => "Lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "New" => Some(Self::New),
            "Draft Generated" => Some(Self::DraftGenerated),
            "Work in Progress" => Some(Self::WorkInProgress),
            "Quoted" => Some(Self::Quoted),
            "Lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub source: Option<LeadSource>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub source: Option<LeadSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enquiry {
    pub id: i64,
    pub lead_id: i64,
    pub destination: String,
    pub travel_date: Option<NaiveDate>,
    pub party_size: Option<i64>,
    pub budget: String,
    pub notes: String,
    pub status: EnquiryStatus,
    pub itinerary_text: String,
    pub hotel_text: String,
    pub price_text: String,
    pub created_at: DateTime<Utc>,
}

impl Enquiry {
    /// Draft fields are empty strings by default, never null, so this is
    /// the whole "has a draft" check downstream.
    pub fn has_draft(&self) -> bool {
        !self.itinerary_text.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnquiry {
    pub destination: String,
    pub travel_date: Option<NaiveDate>,
    pub party_size: Option<i64>,
    pub budget: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnquiryWithLead {
    pub enquiry: Enquiry,
    pub lead: Lead,
}

/// The active editing buffers for one selected enquiry.
///
/// Opened from the persisted draft fields and replaced wholesale when a
/// different enquiry is selected, so nothing leaks between enquiries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSession {
    pub enquiry_id: i64,
    pub itinerary: String,
    pub hotels: String,
    pub price: String,
}

impl DraftSession {
    pub fn open(enquiry: &Enquiry) -> Self {
        Self {
            enquiry_id: enquiry.id,
            itinerary: enquiry.itinerary_text.clone(),
            hotels: if enquiry.hotel_text.is_empty() {
                DEFAULT_HOTEL_TEXT.to_string()
            } else {
                enquiry.hotel_text.clone()
            },
            price: if enquiry.price_text.is_empty() {
                DEFAULT_PRICE_TEXT.to_string()
            } else {
                enquiry.price_text.clone()
            },
        }
    }
}

/// Client name and destination are the only required submission fields.
/// A failed validation creates nothing.
pub fn validate_submission(lead: &NewLead, enquiry: &NewEnquiry) -> Result<(), DeskError> {
    if lead.name.trim().is_empty() {
        return Err(DeskError::Validation("client name is required".to_string()));
    }
    if enquiry.destination.trim().is_empty() {
        return Err(DeskError::Validation("destination is required".to_string()));
    }
    Ok(())
}
