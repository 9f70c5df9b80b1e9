use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use meridian_core::DeskError;

use crate::document::{ItineraryBlock, Quotation, TERMS_AND_CONDITIONS};

pub trait QuotationRenderer: Send + Sync {
    fn render(&self, quotation: &Quotation) -> Result<Vec<u8>, DeskError>;
}

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_LEFT: f32 = 40.0;
const MARGIN_RIGHT: f32 = 40.0;
const BODY_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const CONTENT_TOP: f32 = 768.0;
const CONTENT_BOTTOM: f32 = 84.0;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

const TEAL: Rgb = (0.0, 0.4, 0.4);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const BLACK: Rgb = (0.0, 0.0, 0.0);
const DARK_GRAY: Rgb = (0.2, 0.2, 0.2);
const MID_GRAY: Rgb = (0.4, 0.4, 0.4);
const BOX_GRAY: Rgb = (0.96, 0.96, 0.96);
const BOX_CREAM: Rgb = (1.0, 0.988, 0.941);

const COMPANY_NAME: &str = "MERIDIAN VOYAGES";
const COMPANY_TAGLINE: &str = "Journeys Worth Keeping";
const COMPANY_ADDRESS: &str = "14 Marine Drive, Mumbai 400020 | Phone: 022-4000-1188";
const COMPANY_EMAIL: &str = "Email - quotes@meridianvoyages.in";

type Rgb = (f32, f32, f32);

fn real(value: f32) -> Object {
    Object::Real(value)
}

/// Renders a [`Quotation`] into a branded A4 PDF using the built-in
/// Helvetica fonts. Input text is already Latin-1-safe, so the only
/// failure left is the PDF writer itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl QuotationRenderer for PdfRenderer {
    fn render(&self, quotation: &Quotation) -> Result<Vec<u8>, DeskError> {
        let pages = compose(quotation);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_regular,
                "F2" => font_bold,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|error| DeskError::Rendering(error.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|error| DeskError::Rendering(error.to_string()))?;
        Ok(buffer)
    }
}

fn compose(quotation: &Quotation) -> Vec<Vec<Operation>> {
    let mut page = PageComposer::new();

    page.text_at(MARGIN_LEFT, page.y, FONT_BOLD, 20.0, TEAL, "Travel Proposal");
    page.y -= 26.0;
    page.text_at(
        MARGIN_LEFT,
        page.y,
        FONT_REGULAR,
        12.0,
        BLACK,
        &format!("Prepared for: {}", quotation.client_name),
    );
    page.y -= 16.0;
    page.text_at(
        MARGIN_LEFT,
        page.y,
        FONT_REGULAR,
        12.0,
        BLACK,
        &format!("Destination: {}", quotation.destination),
    );
    page.y -= 24.0;

    for block in &quotation.itinerary {
        match block {
            ItineraryBlock::DayHeader(text) => {
                page.ensure_room(34.0);
                page.y -= 6.0;
                page.fill_rect(MARGIN_LEFT, page.y - 4.0, BODY_WIDTH, 16.0, TEAL);
                page.text_at(MARGIN_LEFT + 6.0, page.y, FONT_BOLD, 11.0, WHITE, text);
                page.y -= 20.0;
            }
            ItineraryBlock::Paragraph(text) => {
                for line in wrap(text, 95) {
                    page.ensure_room(14.0);
                    page.text_at(MARGIN_LEFT, page.y, FONT_REGULAR, 10.0, DARK_GRAY, &line);
                    page.y -= 13.0;
                }
                page.y -= 3.0;
            }
        }
    }

    if !quotation.hotel_text.is_empty() {
        page.break_page();
        page.section_header("Accommodation Details");
        page.boxed_text(&quotation.hotel_text, BOX_GRAY);
    }

    page.ensure_room(60.0);
    page.section_header("Investment & Inclusions");
    page.boxed_text(&quotation.price_text, BOX_CREAM);

    page.y -= 14.0;
    page.ensure_room(110.0);
    page.text_at(
        MARGIN_LEFT,
        page.y,
        FONT_BOLD,
        10.0,
        BLACK,
        "Terms & Conditions:",
    );
    page.y -= 14.0;
    for line in wrap(TERMS_AND_CONDITIONS, 100) {
        page.ensure_room(12.0);
        page.text_at(MARGIN_LEFT, page.y, FONT_REGULAR, 9.0, DARK_GRAY, &line);
        page.y -= 11.0;
    }

    page.finish()
}

struct PageComposer {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl PageComposer {
    fn new() -> Self {
        let mut composer = Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: CONTENT_TOP,
        };
        composer.page_chrome();
        composer
    }

    fn page_number(&self) -> usize {
        self.pages.len() + 1
    }

    /// Branding strip, company block and footer drawn on every page.
    fn page_chrome(&mut self) {
        self.fill_rect(0.0, PAGE_HEIGHT - 14.0, PAGE_WIDTH, 14.0, TEAL);

        let name_x = PAGE_WIDTH - MARGIN_RIGHT - text_width(COMPANY_NAME, 12.0);
        self.text_at(name_x, 810.0, FONT_BOLD, 12.0, TEAL, COMPANY_NAME);
        let tagline_x = PAGE_WIDTH - MARGIN_RIGHT - text_width(COMPANY_TAGLINE, 8.0);
        self.text_at(tagline_x, 798.0, FONT_REGULAR, 8.0, MID_GRAY, COMPANY_TAGLINE);

        self.current.push(Operation::new(
            "RG",
            vec![real(0.78), real(0.78), real(0.78)],
        ));
        self.current.push(Operation::new("w", vec![real(0.5)]));
        self.current
            .push(Operation::new("m", vec![real(MARGIN_LEFT), real(64.0)]));
        self.current.push(Operation::new(
            "l",
            vec![real(PAGE_WIDTH - MARGIN_RIGHT), real(64.0)],
        ));
        self.current.push(Operation::new("S", vec![]));

        self.centered_text(52.0, FONT_BOLD, 9.0, BLACK, COMPANY_NAME);
        self.centered_text(42.0, FONT_REGULAR, 8.0, DARK_GRAY, COMPANY_ADDRESS);
        self.centered_text(32.0, FONT_REGULAR, 8.0, DARK_GRAY, COMPANY_EMAIL);

        let page_label = format!("Page {}", self.page_number());
        let label_x = PAGE_WIDTH - MARGIN_RIGHT - text_width(&page_label, 8.0);
        self.text_at(label_x, 32.0, FONT_REGULAR, 8.0, DARK_GRAY, &page_label);
    }

    fn break_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.y = CONTENT_TOP;
        self.page_chrome();
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < CONTENT_BOTTOM {
            self.break_page();
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.current);
        self.pages
    }

    fn section_header(&mut self, title: &str) {
        self.ensure_room(28.0);
        self.text_at(MARGIN_LEFT, self.y, FONT_BOLD, 14.0, TEAL, title);
        self.y -= 20.0;
    }

    /// A filled box behind wrapped text, falling back to plain lines when
    /// the block is taller than a page.
    fn boxed_text(&mut self, text: &str, color: Rgb) {
        let lines = wrap(text, 92);
        let height = lines.len() as f32 * 13.0 + 10.0;

        if height <= CONTENT_TOP - CONTENT_BOTTOM {
            self.ensure_room(height);
            self.fill_rect(MARGIN_LEFT, self.y - height + 14.0, BODY_WIDTH, height, color);
        }

        for line in lines {
            self.ensure_room(14.0);
            self.text_at(MARGIN_LEFT + 6.0, self.y, FONT_REGULAR, 10.0, BLACK, &line);
            self.y -= 13.0;
        }
        self.y -= 12.0;
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.current.push(Operation::new(
            "rg",
            vec![real(color.0), real(color.1), real(color.2)],
        ));
        self.current.push(Operation::new(
            "re",
            vec![real(x), real(y), real(width), real(height)],
        ));
        self.current.push(Operation::new("f", vec![]));
    }

    fn text_at(&mut self, x: f32, y: f32, font: &str, size: f32, color: Rgb, text: &str) {
        self.current.push(Operation::new("BT", vec![]));
        self.current.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), real(size)],
        ));
        self.current.push(Operation::new(
            "rg",
            vec![real(color.0), real(color.1), real(color.2)],
        ));
        self.current
            .push(Operation::new("Td", vec![real(x), real(y)]));
        self.current
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn centered_text(&mut self, y: f32, font: &str, size: f32, color: Rgb, text: &str) {
        let x = (PAGE_WIDTH - text_width(text, size)) / 2.0;
        self.text_at(x, y, font, size, color, text);
    }
}

/// Approximate Helvetica width; good enough for alignment of short lines.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end();
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut line = String::new();
        for word in raw.split_whitespace() {
            if line.is_empty() {
                line = word.to_string();
            } else if line.chars().count() + 1 + word.chars().count() <= max_chars {
                line.push(' ');
                line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}
