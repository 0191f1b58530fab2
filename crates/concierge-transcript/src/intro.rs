// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Write as _;

use concierge_core::TurnRequest;

/// The first user turn of a conversation: lead facts followed by the
/// opening message. Empty fields are omitted; metadata is key-sorted.
pub fn format_intro_message(request: &TurnRequest, conversation_id: &str) -> String {
    let mut out = String::from("Lead introduction:\n");
    let _ = writeln!(out, "Conversation ID: {conversation_id}");
    let optional = [
        ("Org ID", request.org_id.as_str()),
        ("Lead ID", request.lead_id.as_str()),
    ];
    for (label, value) in optional {
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    let _ = writeln!(out, "Channel: {}", request.channel);
    for (label, value) in [
        ("Source", request.source.as_str()),
        ("From", request.from.as_str()),
        ("To", request.to.as_str()),
    ] {
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    if !request.metadata.is_empty() {
        out.push_str("Metadata:\n");
        for (key, value) in &request.metadata {
            let _ = writeln!(out, "- {key}: {value}");
        }
    }
    let _ = write!(out, "Message: {}", request.intro);
    out
}
