//! PDF invoice for a committed sale.
//!
//! Layout is computed first as a list of positioned text runs and rules
//! (millimetres from the top-left of an A4 page), then rendered with
//! printpdf's built-in Helvetica. Long sales continue on extra pages.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use thiserror::Error;

use crate::models::Sale;

/// Content type of PDF downloads.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 20.0;
const QTY_COLUMN_MM: f32 = 110.0;
const RIGHT_MM: f32 = 190.0;
const ROW_STEP_MM: f32 = 8.0;
const BOTTOM_LIMIT_MM: f32 = 270.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Errors from rendering an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A positioned text run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size_pt: f32,
    pub x_mm: f32,
    pub y_mm: f32,
    pub align: Align,
}

/// One page of the invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePage {
    pub texts: Vec<TextRun>,
    /// Y positions of full-width horizontal rules.
    pub rules: Vec<f32>,
}

impl InvoicePage {
    fn text(&mut self, text: impl Into<String>, size_pt: f32, x_mm: f32, y_mm: f32, align: Align) {
        self.texts.push(TextRun {
            text: text.into(),
            size_pt,
            x_mm,
            y_mm,
            align,
        });
    }
}

/// Download name of a sale's invoice.
#[must_use]
pub fn invoice_file_name(sale: &Sale) -> String {
    format!("invoice_{}.pdf", sale.customer.file_stem())
}

/// Lay the invoice out into pages.
#[must_use]
pub fn layout(sale: &Sale) -> Vec<InvoicePage> {
    let mut pages = Vec::new();
    let mut page = InvoicePage::default();

    page.text("Sales Invoice", 22.0, PAGE_WIDTH_MM / 2.0, 20.0, Align::Center);
    page.text(format!("Invoice #: {}", sale.id), 12.0, RIGHT_MM, 30.0, Align::Right);
    page.text(
        format!("Date: {}", sale.created_at.format("%Y-%m-%d")),
        12.0,
        LEFT_MM,
        40.0,
        Align::Left,
    );
    page.text(
        format!("Customer: {}", sale.customer.name()),
        12.0,
        LEFT_MM,
        50.0,
        Align::Left,
    );
    page.text(
        format!("Customer ID: {}", sale.customer.id()),
        12.0,
        LEFT_MM,
        60.0,
        Align::Left,
    );
    page.text("Products:", 14.0, LEFT_MM, 80.0, Align::Left);

    let mut y = 90.0;
    for item in &sale.items {
        if y > BOTTOM_LIMIT_MM {
            pages.push(std::mem::take(&mut page));
            y = 20.0;
        }
        page.text(&item.product_name, 10.0, LEFT_MM, y, Align::Left);
        page.text(
            format!("{} x {}", item.quantity, item.unit_price),
            10.0,
            QTY_COLUMN_MM,
            y,
            Align::Left,
        );
        page.text(
            format!("${:.2}", item.subtotal()),
            10.0,
            RIGHT_MM,
            y,
            Align::Right,
        );
        y += ROW_STEP_MM;
    }

    if y + 10.0 > BOTTOM_LIMIT_MM {
        pages.push(std::mem::take(&mut page));
        y = 20.0;
    }
    page.rules.push(y);
    y += 10.0;
    page.text(format!("Total: {}", sale.total), 16.0, RIGHT_MM, y, Align::Right);

    pages.push(page);
    pages
}

/// Estimated rendered width of `text` in millimetres.
fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)] // invoice strings are short
    let chars = text.chars().count() as f32;
    chars * size_pt * AVG_GLYPH_WIDTH * PT_TO_MM
}

fn draw_page(page: &InvoicePage, layer: &PdfLayerReference, font: &IndirectFontRef) {
    for run in &page.texts {
        let width = text_width_mm(&run.text, run.size_pt);
        let x = match run.align {
            Align::Left => run.x_mm,
            Align::Center => run.x_mm - width / 2.0,
            Align::Right => run.x_mm - width,
        };
        layer.use_text(
            run.text.clone(),
            run.size_pt,
            Mm(x),
            Mm(PAGE_HEIGHT_MM - run.y_mm),
            font,
        );
    }

    layer.set_outline_thickness(0.5);
    for &y in &page.rules {
        let y = Mm(PAGE_HEIGHT_MM - y);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT_MM), y), false),
                (Point::new(Mm(RIGHT_MM), y), false),
            ],
            is_closed: false,
        });
    }
}

/// Render a sale's invoice to PDF bytes.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if the document cannot be written.
pub fn render(sale: &Sale) -> Result<Vec<u8>, InvoiceError> {
    let pages = layout(sale);
    let title = format!("Sales Invoice {}", sale.id);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        draw_page(page, &layer, &font);
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use stockroom_core::{CustomerIdentity, Money, ProductId, SaleId, SaleItemId};

    use super::*;
    use crate::models::SaleItem;

    fn sale(item_count: i32) -> Sale {
        let items: Vec<SaleItem> = (1..=item_count)
            .map(|i| SaleItem {
                id: SaleItemId::new(i),
                product_id: Some(ProductId::new(i)),
                product_name: format!("Item {i}"),
                quantity: 2,
                unit_price: Money::from_cents(150),
            })
            .collect();
        let total = Money::new(items.iter().map(SaleItem::subtotal).sum()).unwrap();
        Sale {
            id: SaleId::new(42),
            customer: CustomerIdentity::new("Ana Pérez", "0102").unwrap(),
            total,
            created_by: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap(),
            items,
        }
    }

    fn all_text(pages: &[InvoicePage]) -> Vec<&str> {
        pages
            .iter()
            .flat_map(|p| p.texts.iter().map(|t| t.text.as_str()))
            .collect()
    }

    #[test]
    fn test_layout_content() {
        let pages = layout(&sale(2));
        assert_eq!(pages.len(), 1);
        let text = all_text(&pages);
        for expected in [
            "Sales Invoice",
            "Invoice #: 42",
            "Date: 2026-03-09",
            "Customer: Ana Pérez",
            "Customer ID: 0102",
            "Products:",
            "Item 1",
            "2 x $1.50",
            "$3.00",
            "Total: $6.00",
        ] {
            assert!(text.contains(&expected), "missing {expected}");
        }
        assert_eq!(pages[0].rules, vec![106.0]);
    }

    #[test]
    fn test_long_sales_add_pages() {
        let pages = layout(&sale(40));
        assert!(pages.len() > 1);
        let item_rows = all_text(&pages)
            .into_iter()
            .filter(|t| t.starts_with("Item "))
            .count();
        assert_eq!(item_rows, 40);
        let last = pages.last().unwrap();
        assert!(last.texts.iter().any(|t| t.text == "Total: $120.00"));
        assert!(
            pages
                .iter()
                .flat_map(|p| &p.texts)
                .all(|t| t.y_mm <= BOTTOM_LIMIT_MM + ROW_STEP_MM)
        );
    }

    #[test]
    fn test_file_name() {
        assert_eq!(invoice_file_name(&sale(1)), "invoice_Ana_Pérez.pdf");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render(&sale(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
