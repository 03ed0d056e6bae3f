//! One-line diagnostic frame summaries, in the style of the scattered
//! `Display` impls this stack's headers are grounded on. Gated behind a
//! cheap boolean the caller checks before formatting, so "print frames"
//! costs nothing when disabled.

use crate::dispatcher::DispatchOutcome;

/// Renders one line describing a dispatch outcome: ethertype, and whether a
/// response was emitted, consumed silently, or dropped (with why).
pub fn summarize(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Replied { ether_type, response } => {
            format!("{ether_type} -> replied ({} bytes)", response.len())
        }
        DispatchOutcome::Consumed { ether_type } => {
            format!("{ether_type} -> consumed, no response")
        }
        DispatchOutcome::Dropped { reason } => {
            format!("dropped: {reason}")
        }
    }
}
