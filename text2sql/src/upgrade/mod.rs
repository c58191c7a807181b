//! Mock Pro upgrade: masked payment record, simulated processing, PDF receipt.

mod payment;
mod pdf;
mod receipt;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Backend, BackendError};
use crate::notify::Notice;

pub use payment::{PaymentForm, PRO_PLAN};

use payment::{PaymentRecord, PAYMENT_TABLE};
use receipt::{Receipt, RECEIPT_FILENAME};

/// Where the user is sent after a successful upgrade.
pub const UPGRADE_REDIRECT: &str = "/chat";

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("You must be logged in to make a payment.")]
    NotSignedIn,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not save receipt: {0:#}")]
    Receipt(anyhow::Error),
}

impl UpgradeError {
    /// Toast shown when the upgrade is abandoned.
    pub fn notice(&self) -> Notice {
        Notice::error("Payment Failed", self.to_string())
    }
}

/// Result of a completed upgrade.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeOutcome {
    pub notice: Notice,
    pub receipt_path: PathBuf,
    pub redirect_to: &'static str,
}

/// Runs the upgrade against the configured backend.
pub struct UpgradeFlow {
    backend: Backend,
    processing_delay: Duration,
    receipt_dir: PathBuf,
}

impl UpgradeFlow {
    pub fn new(backend: Backend, processing_delay: Duration, receipt_dir: PathBuf) -> Self {
        Self {
            backend,
            processing_delay,
            receipt_dir,
        }
    }

    /// Validate, record, wait out the mock processing, then issue the receipt.
    ///
    /// Nothing is written when validation or the session check fails.
    pub async fn submit(&self, form: &PaymentForm) -> Result<UpgradeOutcome, UpgradeError> {
        form.validate()?;

        let session = self
            .backend
            .auth
            .get_session()
            .await?
            .ok_or(UpgradeError::NotSignedIn)?;

        let record = PaymentRecord::from_form(&session.user.id, form);
        let row = serde_json::to_value(&record)
            .map_err(|e| BackendError::InvalidInput(e.to_string()))?;
        if let Err(e) = self.backend.store.insert(PAYMENT_TABLE, row).await {
            warn!(error = %e, "payment record insert failed");
            return Err(e.into());
        }

        tokio::time::sleep(self.processing_delay).await;

        let receipt = Receipt::new(PRO_PLAN, &record.card_name, &record.card_number_last4);
        let receipt_path = receipt
            .to_pdf()
            .save(&self.receipt_dir, RECEIPT_FILENAME)
            .map_err(UpgradeError::Receipt)?;
        info!(user_id = %session.user.id, path = %receipt_path.display(), "upgrade completed");

        Ok(UpgradeOutcome {
            notice: Notice::success(
                "Payment Successful!",
                "Welcome to Text2SQL.ai Pro! Your plan is now active.",
            ),
            receipt_path,
            redirect_to: UPGRADE_REDIRECT,
        })
    }
}
