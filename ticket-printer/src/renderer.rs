//! Sale ticket renderer
//!
//! Renders [`Ticket`] data into ESC/POS format for thermal printers.
//! Every ticket ends with a paper feed, a cash drawer pulse and a cut.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::encoding::pad_text;
use crate::error::PrintResult;
use crate::escpos::{self, EscPosBuilder};
use crate::ticket::{Ticket, TicketItem};

/// Characters per line on 58mm paper
pub const DEFAULT_WIDTH: usize = 32;
pub const MIN_WIDTH: usize = 24;
pub const MAX_WIDTH: usize = 64;

/// Blank lines fed before the cut so the last line clears the cutter
pub const DEFAULT_FEED_LINES: u8 = 13;

pub const DEFAULT_FOOTER: &str = "GRACIAS POR SU COMPRA";

const QTY_WIDTH: usize = 4;
const PRICE_WIDTH: usize = 9;
const TOTAL_WIDTH: usize = 9;

/// Sample payload printed on the test page
const TEST_QR_CONTENT: &str = "https://www.example.com";

/// Format a monetary value with exactly two decimals, half away from zero
fn money(value: Decimal) -> String {
    let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value.to_string()
}

/// Sale ticket renderer
pub struct TicketRenderer {
    width: usize,
    feed_lines: u8,
    footer: String,
}

impl TicketRenderer {
    /// Create a renderer for the given paper width in characters
    ///
    /// The width is clamped to 24..=64.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
            feed_lines: DEFAULT_FEED_LINES,
            footer: DEFAULT_FOOTER.to_string(),
        }
    }

    pub fn with_feed_lines(mut self, feed_lines: u8) -> Self {
        self.feed_lines = feed_lines;
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of the product name column
    fn name_width(&self) -> usize {
        self.width - QTY_WIDTH - PRICE_WIDTH - TOTAL_WIDTH
    }

    /// Render a ticket to ESC/POS bytes
    ///
    /// Fails only when the QR payload cannot be encoded; nothing is
    /// produced in that case.
    pub fn render(&self, ticket: &Ticket) -> PrintResult<Vec<u8>> {
        let qr = ticket.qr_payload().map(escpos::qr_code).transpose()?;

        let mut b = EscPosBuilder::new(self.width);

        self.render_header(&mut b, ticket);
        self.render_items(&mut b, &ticket.items);
        self.render_totals(&mut b, ticket);

        // Footer
        b.center();
        b.newline();
        b.line(&self.footer);

        if let Some(qr) = qr {
            b.newline();
            b.raw(&qr);
            b.newline();
        }

        self.render_finish(&mut b);
        Ok(b.build())
    }

    /// Render the diagnostic page printed by the test endpoint
    pub fn render_test_page(&self, model: &str, port: &str) -> PrintResult<Vec<u8>> {
        let mut b = EscPosBuilder::new(self.width);

        b.center();
        b.bold();
        b.line("*** TICKET DE PRUEBA ***");
        b.bold_off();
        b.newline();
        b.line("Impresora configurada correctamente");
        b.line(&format!("Modelo: {}", model));
        b.line(&format!("Puerto: {}", port));
        b.newline();

        b.left();
        b.line("FORMATOS DISPONIBLES:");
        b.sep_single();

        b.bold();
        b.line("Texto en negrita");
        b.bold_off();

        b.double_size();
        b.line("Texto más grande");
        b.reset_size();

        b.underline();
        b.line("Texto subrayado");
        b.underline_off();

        b.center();
        b.line("Texto centrado");
        b.right();
        b.line("Texto a la derecha");
        b.left();
        b.line("Texto a la izquierda");
        b.newline();

        b.center();
        b.line("CÓDIGO QR DE PRUEBA:");
        b.qr_code(TEST_QR_CONTENT)?;
        b.newline();

        self.render_finish(&mut b);
        Ok(b.build())
    }

    fn render_header(&self, b: &mut EscPosBuilder, ticket: &Ticket) {
        // Business name (large, centered)
        b.center();
        b.bold();
        b.double_height();
        b.line(&ticket.business_name);
        b.reset_size();
        b.bold_off();

        for (label, value) in [
            ("", &ticket.address),
            ("Tel: ", &ticket.phone),
            ("RFC: ", &ticket.tax_id),
        ] {
            if !value.trim().is_empty() {
                b.line(&format!("{}{}", label, value.trim()));
            }
        }

        b.left();
        b.sep_single();
        b.line(&format!("Fecha: {}", ticket.date_time));
        b.line(&format!("Ticket #: {}", ticket.ticket_number));
        b.line(&format!("Cajero: {}", ticket.cashier_name));
        b.sep_single();
    }

    fn render_items(&self, b: &mut EscPosBuilder, items: &[TicketItem]) {
        b.bold();
        b.line(&self.header_row());
        b.bold_off();

        for item in items {
            b.line(&self.item_row(item));
        }

        b.sep_single();
    }

    fn render_totals(&self, b: &mut EscPosBuilder, ticket: &Ticket) {
        b.right();
        b.line(&format!("SUBTOTAL: ${}", money(ticket.subtotal)));
        b.line(&format!("IVA: ${}", money(ticket.tax)));
        b.bold();
        b.line(&format!("TOTAL: ${}", money(ticket.total)));
        b.bold_off();

        b.left();
        b.newline();
        b.line(&format!("Forma de pago: {}", ticket.payment_method));
    }

    /// Feed, kick the drawer and cut
    fn render_finish(&self, b: &mut EscPosBuilder) {
        b.feed(self.feed_lines);
        b.open_drawer();
        b.cut();
    }

    fn header_row(&self) -> String {
        format!(
            "{}{}{}{}",
            pad_text("PRODUCTO", self.name_width(), false),
            pad_text("CANT", QTY_WIDTH, true),
            pad_text("PRECIO", PRICE_WIDTH, true),
            pad_text("TOTAL", TOTAL_WIDTH, true),
        )
    }

    /// Only the name is cut to its column; figures too wide for theirs
    /// push the row past the paper width and wrap on the printer.
    fn item_row(&self, item: &TicketItem) -> String {
        format!(
            "{} {:>qty$} {:>price$} {:>total$}",
            pad_text(&item.name, self.name_width(), false),
            item.quantity,
            money(item.unit_price),
            money(item.total),
            qty = QTY_WIDTH - 1,
            price = PRICE_WIDTH - 1,
            total = TOTAL_WIDTH - 1,
        )
    }
}

impl Default for TicketRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn sample_ticket() -> Ticket {
        Ticket {
            business_name: "Tienda X".to_string(),
            address: String::new(),
            phone: "555-1234".to_string(),
            tax_id: String::new(),
            date_time: "2024-03-01 10:15".to_string(),
            ticket_number: "A-001".to_string(),
            cashier_name: "Ana".to_string(),
            items: vec![
                TicketItem {
                    name: "Pan".to_string(),
                    quantity: 2,
                    unit_price: dec("1.50"),
                    total: dec("3.00"),
                },
                TicketItem {
                    name: "Leche".to_string(),
                    quantity: 1,
                    unit_price: dec("2.00"),
                    total: dec("2.00"),
                },
            ],
            subtotal: dec("5.00"),
            tax: dec("0.80"),
            total: dec("5.80"),
            payment_method: "CASH".to_string(),
            qr_content: None,
        }
    }

    #[test]
    fn test_money() {
        assert_eq!(money(dec("3")), "3.00");
        assert_eq!(money(dec("1.5")), "1.50");
        assert_eq!(money(dec("2.345")), "2.35");
        assert_eq!(money(dec("2.355")), "2.36");
        assert_eq!(money(dec("2.344")), "2.34");
        assert_eq!(money(dec("0.125")), "0.13");
        assert_eq!(money(dec("-2.345")), "-2.35");
    }

    #[test]
    fn test_width_clamped() {
        assert_eq!(TicketRenderer::new(10).width(), MIN_WIDTH);
        assert_eq!(TicketRenderer::new(100).width(), MAX_WIDTH);
        assert_eq!(TicketRenderer::new(48).width(), 48);
    }

    #[test]
    fn test_render_ticket() {
        let data = TicketRenderer::default().render(&sample_ticket()).unwrap();

        assert!(data.starts_with(&escpos::init()));
        assert!(data.ends_with(&escpos::cut()));
        assert!(contains(&data, b"Tienda X\n"));
        assert!(contains(&data, b"Tel: 555-1234\n"));
        assert!(!contains(&data, b"RFC:"));
        assert!(contains(&data, b"Fecha: 2024-03-01 10:15\n"));
        assert!(contains(&data, b"Ticket #: A-001\n"));
        assert!(contains(&data, b"Cajero: Ana\n"));
        assert!(contains(&data, b"PRODUCTO  CANT   PRECIO    TOTAL\n"));
        assert!(contains(&data, b"Pan          2     1.50     3.00\n"));
        assert!(contains(&data, b"Leche        1     2.00     2.00\n"));
        assert!(contains(&data, b"SUBTOTAL: $5.00\n"));
        assert!(contains(&data, b"IVA: $0.80\n"));
        assert!(contains(&data, b"TOTAL: $5.80\n"));
        assert!(contains(&data, b"Forma de pago: CASH\n"));
        assert!(contains(&data, b"GRACIAS POR SU COMPRA\n"));
    }

    #[test]
    fn test_render_ends_with_feed_drawer_cut() {
        let data = TicketRenderer::default().render(&sample_ticket()).unwrap();

        let mut tail = escpos::feed_lines(DEFAULT_FEED_LINES);
        tail.extend_from_slice(&escpos::drawer_kick());
        tail.extend_from_slice(&escpos::cut());
        assert!(data.ends_with(&tail));
    }

    #[test]
    fn test_render_long_name_truncated() {
        let mut ticket = sample_ticket();
        ticket.items[0].name = "Pan integral con semillas".to_string();

        let data = TicketRenderer::default().render(&ticket).unwrap();
        assert!(contains(&data, b"Pan integr   2     1.50     3.00\n"));
    }

    #[test]
    fn test_render_wide_figures_not_truncated() {
        let mut ticket = sample_ticket();
        ticket.items[0] = TicketItem {
            name: "Laptop".to_string(),
            quantity: 12345,
            unit_price: dec("1234567.89"),
            total: dec("15240740240.05"),
        };
        ticket.items[1].quantity = 3;
        ticket.items[1].total = dec("123456.78");

        let data = TicketRenderer::default().render(&ticket).unwrap();
        assert!(contains(&data, b"Laptop     12345 1234567.89 15240740240.05\n"));
        assert!(contains(&data, b"Leche        3     2.00 123456.78\n"));
    }

    #[test]
    fn test_render_empty_items() {
        let mut ticket = sample_ticket();
        ticket.items.clear();

        let data = TicketRenderer::default().render(&ticket).unwrap();
        assert!(contains(&data, b"PRODUCTO  CANT   PRECIO    TOTAL\n"));
        assert!(contains(&data, b"TOTAL: $5.80\n"));
        assert!(data.ends_with(&escpos::cut()));
    }

    #[test]
    fn test_render_with_qr() {
        let mut ticket = sample_ticket();
        ticket.qr_content = Some("https://example.com/t/A-001".to_string());

        let data = TicketRenderer::default().render(&ticket).unwrap();
        let qr = escpos::qr_code("https://example.com/t/A-001").unwrap();
        assert!(contains(&data, &qr));
    }

    #[test]
    fn test_render_qr_keeps_surrounding_spaces() {
        let mut ticket = sample_ticket();
        ticket.qr_content = Some(" A-001 ".to_string());

        let data = TicketRenderer::default().render(&ticket).unwrap();
        assert!(contains(&data, &escpos::qr_code(" A-001 ").unwrap()));
    }

    #[test]
    fn test_render_qr_too_long() {
        let mut ticket = sample_ticket();
        ticket.qr_content = Some("x".repeat(300));

        let result = TicketRenderer::default().render(&ticket);
        assert!(matches!(result, Err(PrintError::Encoding(_))));
    }

    #[test]
    fn test_custom_footer_and_feed() {
        let renderer = TicketRenderer::new(32)
            .with_footer("VUELVA PRONTO")
            .with_feed_lines(4);
        let data = renderer.render(&sample_ticket()).unwrap();

        assert!(contains(&data, b"VUELVA PRONTO\n"));
        assert!(!contains(&data, DEFAULT_FOOTER.as_bytes()));
        assert!(contains(&data, &escpos::feed_lines(4)));
    }

    #[test]
    fn test_render_test_page() {
        let data = TicketRenderer::default()
            .render_test_page("DIG-58iiA", "COM1")
            .unwrap();

        assert!(data.starts_with(&escpos::init()));
        assert!(contains(&data, b"Modelo: DIG-58iiA\n"));
        assert!(contains(&data, b"Puerto: COM1\n"));
        assert!(contains(&data, &escpos::underline(true)));
        assert!(contains(&data, &escpos::font_size(1, 1)));
        assert!(contains(&data, &escpos::qr_code(TEST_QR_CONTENT).unwrap()));
        // accented text goes out in the printer code page
        assert!(contains(&data, &[b'm', 0xE1, b's']));

        let mut tail = escpos::drawer_kick();
        tail.extend_from_slice(&escpos::cut());
        assert!(data.ends_with(&tail));
    }
}
