// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Availability lookup against the clinic's booking platform.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::{Availability, AvailabilityQuery};

/// Fetches bookable times. May take tens of seconds when the platform is scraped.
#[async_trait]
pub trait AvailabilityFetcher: Send + Sync {
    async fn fetch(&self, query: AvailabilityQuery) -> Result<Availability, ConciergeError>;
}
