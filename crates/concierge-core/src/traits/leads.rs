// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead record persistence.

use async_trait::async_trait;

use crate::error::ConciergeError;
use crate::types::{Lead, QualificationSnapshot, SelectedAppointment};

/// Read and write the structured booking facts attached to a lead.
#[async_trait]
pub trait LeadsRepository: Send + Sync {
    /// Returns `None` when the lead does not exist.
    async fn get(&self, org_id: &str, lead_id: &str) -> Result<Option<Lead>, ConciergeError>;

    /// Replaces the stored preferences. `notes`, when given, replaces the notes field.
    async fn update_preferences(
        &self,
        org_id: &str,
        lead_id: &str,
        preferences: &QualificationSnapshot,
        notes: Option<&str>,
    ) -> Result<(), ConciergeError>;

    async fn update_email(
        &self,
        org_id: &str,
        lead_id: &str,
        email: &str,
    ) -> Result<(), ConciergeError>;

    /// `None` clears a previously selected appointment.
    async fn set_selected_appointment(
        &self,
        org_id: &str,
        lead_id: &str,
        appointment: Option<SelectedAppointment>,
    ) -> Result<(), ConciergeError>;
}
