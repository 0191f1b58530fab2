// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deposit payment status lookup.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::DepositStatus;

#[async_trait]
pub trait PaymentStatusChecker: Send + Sync {
    /// Status of the lead's open deposit, or `None` when there is none.
    async fn open_deposit_status(
        &self,
        org_id: &str,
        lead_id: &str,
    ) -> Result<Option<DepositStatus>, ConciergeError>;
}
