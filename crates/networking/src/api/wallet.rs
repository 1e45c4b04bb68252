//! Deposit and turnover operations with validation

use crate::BackendClient;
use reconciler_core::{DepositReceipt, DepositRequest, DepositStatus, Error, Money, Result};
use tracing::{info, warn};

/// Submit a bank-transfer deposit
///
/// # Arguments
/// * `client` - Client authenticated as the depositing user
/// * `amount` - Amount in wallet currency, rounded to cents before sending
pub async fn submit_deposit(client: &BackendClient, amount: f64) -> Result<DepositReceipt> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(Error::InvalidData("Deposit amount must be positive".to_string()));
    }

    let rounded = Money::new(amount).round_cents().as_f64();
    if rounded != amount {
        warn!("Rounded deposit amount from {} to {}", amount, rounded);
    }

    info!("Submitting deposit of {}", rounded);
    let receipt = client.submit_deposit(&DepositRequest::bank_transfer(rounded)).await?;

    if receipt.status == DepositStatus::Rejected {
        return Err(Error::ApiError(format!(
            "Deposit {} was rejected on submission",
            receipt.deposit_id
        )));
    }

    Ok(receipt)
}

/// Approve a submitted deposit through the fixture endpoint.
///
/// Approval only starts the settlement; the balance is credited
/// asynchronously and must be polled for.
pub async fn approve_deposit(client: &BackendClient, receipt: &DepositReceipt) -> Result<DepositReceipt> {
    if receipt.status == DepositStatus::Approved {
        return Ok(receipt.clone());
    }

    let approved = client.approve_deposit(receipt.deposit_id).await?;
    if approved.status != DepositStatus::Approved {
        return Err(Error::ApiError(format!(
            "Deposit {} is {:?} after approval",
            approved.deposit_id, approved.status
        )));
    }

    info!("Deposit {} approved", approved.deposit_id);
    Ok(approved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler_core::Language;

    #[tokio::test]
    async fn test_rejects_non_positive_or_non_finite_amount() {
        let client = BackendClient::new("http://127.0.0.1:9", Language::En).unwrap();
        assert!(matches!(submit_deposit(&client, 0.0).await, Err(Error::InvalidData(_))));
        assert!(matches!(submit_deposit(&client, -5.0).await, Err(Error::InvalidData(_))));
        assert!(matches!(submit_deposit(&client, f64::NAN).await, Err(Error::InvalidData(_))));
        assert!(matches!(submit_deposit(&client, f64::INFINITY).await, Err(Error::InvalidData(_))));
        assert!(matches!(submit_deposit(&client, f64::NEG_INFINITY).await, Err(Error::InvalidData(_))));
    }
}
