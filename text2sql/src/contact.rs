//! Sales contact form.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::notify::Notice;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("not an email address: {0}")]
    InvalidEmail(String),
}

impl ContactError {
    pub fn notice(&self) -> Notice {
        Notice::error("Message Not Sent", self.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    pub message: String,
}

impl ContactForm {
    /// Check required fields. Nothing is forwarded anywhere.
    pub fn submit(&self) -> Result<Notice, ContactError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(ContactError::MissingField(field));
            }
        }
        if !self.email.contains('@') {
            return Err(ContactError::InvalidEmail(self.email.trim().to_string()));
        }

        info!(
            company = self.company.as_deref().unwrap_or(""),
            "contact message received"
        );
        Ok(Notice::success(
            "Message Sent!",
            "Thank you for your message. We will get back to you soon.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            company: None,
            message: "Tell me about Enterprise".into(),
        }
    }

    #[test]
    fn test_submit_succeeds() {
        let notice = form().submit().unwrap();
        assert_eq!(notice.title, "Message Sent!");
    }

    #[test]
    fn test_missing_message() {
        let mut f = form();
        f.message = "  ".into();
        assert_eq!(f.submit().unwrap_err(), ContactError::MissingField("message"));
    }

    #[test]
    fn test_bad_email() {
        let mut f = form();
        f.email = "jane".into();
        assert!(matches!(f.submit(), Err(ContactError::InvalidEmail(_))));
    }
}
