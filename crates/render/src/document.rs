/// Fixed terms block printed on every quotation.
pub const TERMS_AND_CONDITIONS: &str = "\
1. All rates are subject to TCS and GST as per government regulations.
2. Rates are subject to change as per availability.
3. No booking is confirmed until the advance payment is received.
4. Passports must be valid for at least 6 months from the date of return.
5. Final payment is subject to ROE (Rate of Exchange) fluctuations.
6. Standard Hotel Check-in: 14:00 | Check-out: 11:00.
7. Visa issuance is at the sole discretion of the Embassy.";

/// Replaces currency symbols and typographic punctuation with ASCII
/// equivalents and clamps everything else to Latin-1, so the PDF pass can
/// never hit an encoding error.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{20B9}' => out.push_str("Rs."),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItineraryBlock {
    /// A line starting with a "Day" marker, emphasis stripped. Rendered as
    /// a filled section header.
    DayHeader(String),
    Paragraph(String),
}

/// Everything the PDF pass needs, already sanitized and split into blocks.
#[derive(Debug, Clone)]
pub struct Quotation {
    pub client_name: String,
    pub destination: String,
    pub itinerary: Vec<ItineraryBlock>,
    pub hotel_text: String,
    pub price_text: String,
}

impl Quotation {
    pub fn build(
        client_name: &str,
        destination: &str,
        itinerary_text: &str,
        hotel_text: &str,
        price_text: &str,
    ) -> Self {
        let itinerary = itinerary_text
            .lines()
            .filter_map(|raw| {
                let line = sanitize(raw.trim());
                if line.is_empty() {
                    None
                } else if line.starts_with("Day") || line.starts_with("**Day") {
                    Some(ItineraryBlock::DayHeader(line.replace('*', "")))
                } else {
                    Some(ItineraryBlock::Paragraph(line))
                }
            })
            .collect();

        Self {
            client_name: sanitize(client_name.trim()),
            destination: sanitize(destination.trim()),
            itinerary,
            hotel_text: sanitize(hotel_text.trim()),
            price_text: sanitize(price_text.trim()),
        }
    }
}
