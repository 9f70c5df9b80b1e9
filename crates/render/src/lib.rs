pub mod document;
pub mod pdf;

pub use document::{sanitize, ItineraryBlock, Quotation, TERMS_AND_CONDITIONS};
pub use pdf::{PdfRenderer, QuotationRenderer};
