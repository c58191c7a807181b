//! Payment form and the masked record written to the row store.

use serde::{Deserialize, Serialize};

use super::UpgradeError;

/// Table receiving masked payment metadata.
pub const PAYMENT_TABLE: &str = "mock_payment_details";

/// A subscription plan on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub name: &'static str,
    pub amount_cents: u32,
    pub period: &'static str,
    pub features: &'static [&'static str],
}

impl Plan {
    /// Amount as shown to the user, e.g. `$19.00`.
    pub fn amount_display(&self) -> String {
        format!("${}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }
}

pub const PRO_PLAN: Plan = Plan {
    name: "Pro Plan",
    amount_cents: 1900,
    period: "month",
    features: &[
        "Unlimited messages per month",
        "SQL AI generation & optimization",
        "Support for 12+ database types",
        "API Access (100 requests/month)",
        "Priority email support",
    ],
};

/// Card details as typed into the upgrade form.
#[derive(Clone, Default, Deserialize)]
pub struct PaymentForm {
    pub card_name: String,
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_name", &self.card_name)
            .field("card_number_last4", &self.last4())
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl PaymentForm {
    /// Every field is required.
    pub fn validate(&self) -> Result<(), UpgradeError> {
        let fields = [
            ("card_name", &self.card_name),
            ("card_number", &self.card_number),
            ("expiry", &self.expiry),
            ("cvc", &self.cvc),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(UpgradeError::MissingField(name));
            }
        }
        Ok(())
    }

    /// Last four card digits, ignoring spaces and dashes.
    pub fn last4(&self) -> String {
        let compact: Vec<char> = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        let start = compact.len().saturating_sub(4);
        compact[start..].iter().collect()
    }
}

/// Row written to [`PAYMENT_TABLE`]. Has no field for the CVC or full number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub user_id: String,
    pub card_name: String,
    pub card_number_last4: String,
    pub expiry_date: String,
}

impl PaymentRecord {
    pub fn from_form(user_id: &str, form: &PaymentForm) -> Self {
        Self {
            user_id: user_id.to_string(),
            card_name: form.card_name.trim().to_string(),
            card_number_last4: form.last4(),
            expiry_date: form.expiry.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PaymentForm {
        PaymentForm {
            card_name: "Jane Doe".into(),
            card_number: "4000 1234 5678 4242".into(),
            expiry: "12/29".into(),
            cvc: "123".into(),
        }
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(PRO_PLAN.amount_display(), "$19.00");
    }

    #[test]
    fn test_missing_field_reported() {
        let mut f = form();
        f.expiry = "  ".into();
        assert!(matches!(f.validate(), Err(UpgradeError::MissingField("expiry"))));
        assert!(form().validate().is_ok());
    }

    #[test]
    fn test_last4() {
        assert_eq!(form().last4(), "4242");
        let short = PaymentForm {
            card_number: "42".into(),
            ..form()
        };
        assert_eq!(short.last4(), "42");
    }

    #[test]
    fn test_record_is_masked() {
        let record = PaymentRecord::from_form("u1", &form());
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();

        assert_eq!(value["card_number_last4"], "4242");
        assert!(!keys.iter().any(|k| k.contains("cvc")));
        assert!(!value.to_string().contains("4000 1234"));
        assert!(!value.to_string().contains("123\""));
    }

    #[test]
    fn test_debug_hides_card() {
        let shown = format!("{:?}", form());
        assert!(!shown.contains("5678"));
        assert!(!shown.contains("123"));
    }
}
