//! Purchase receipt rendered as a PDF.

use chrono::{DateTime, Local};

use super::payment::Plan;
use super::pdf::PdfDocument;

/// File name the receipt is saved under.
pub const RECEIPT_FILENAME: &str = "Text2SQL-Pro-Receipt.pdf";

#[derive(Debug, Clone)]
pub struct Receipt {
    pub plan: Plan,
    pub billed_to: String,
    pub card_last4: String,
    pub issued_at: DateTime<Local>,
}

impl Receipt {
    pub fn new(plan: Plan, billed_to: &str, card_last4: &str) -> Self {
        Self {
            plan,
            billed_to: billed_to.to_string(),
            card_last4: card_last4.to_string(),
            issued_at: Local::now(),
        }
    }

    pub fn to_pdf(&self) -> PdfDocument {
        let mut doc = PdfDocument::new();
        doc.set_font_size(22.0).text("Text2SQL.ai Receipt", 20.0, 20.0);

        doc.set_font_size(12.0).text(
            &format!("Date: {}", self.issued_at.format("%Y-%m-%d %H:%M:%S")),
            20.0,
            30.0,
        );

        doc.set_font_size(16.0).text("Billed To:", 20.0, 45.0);
        doc.set_font_size(12.0).text(&self.billed_to, 20.0, 52.0);

        doc.set_font_size(16.0).text("Payment Details:", 20.0, 65.0);
        doc.set_font_size(12.0)
            .text(&format!("Plan: {}", self.plan.name), 20.0, 72.0)
            .text(
                &format!("Amount Paid: {}", self.plan.amount_display()),
                20.0,
                79.0,
            )
            .text(
                &format!("Payment Method: Card ending in {}", self.card_last4),
                20.0,
                86.0,
            );
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::payment::PRO_PLAN;

    #[test]
    fn test_receipt_contents() {
        let receipt = Receipt::new(PRO_PLAN, "Jane Doe", "4242");
        let text = String::from_utf8(receipt.to_pdf().to_bytes()).unwrap();

        assert!(text.contains("(Text2SQL.ai Receipt)"));
        assert!(text.contains("(Jane Doe)"));
        assert!(text.contains("(Plan: Pro Plan)"));
        assert!(text.contains("(Amount Paid: $19.00)"));
        assert!(text.contains("(Payment Method: Card ending in 4242)"));
    }

    #[test]
    fn test_receipt_keeps_accented_name() {
        let receipt = Receipt::new(PRO_PLAN, "José Müller", "4242");
        let text = String::from_utf8(receipt.to_pdf().to_bytes()).unwrap();

        assert!(text.contains(r"(Jos\351 M\374ller)"));
        assert!(!text.contains("Jos?"));
    }
}
