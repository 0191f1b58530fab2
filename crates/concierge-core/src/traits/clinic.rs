// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clinic configuration lookup.

use async_trait::async_trait;

use crate::clinic::ClinicConfig;
use crate::error::ConciergeError;

#[async_trait]
pub trait ClinicConfigProvider: Send + Sync {
    /// Returns `None` when the org has no stored configuration.
    async fn get(&self, org_id: &str) -> Result<Option<ClinicConfig>, ConciergeError>;
}
