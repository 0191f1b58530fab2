// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic deposit-agreement detection.

use concierge_core::{Message, Role};

use crate::patterns::{AFFIRMATIVE, ASK, KEYWORD, NEGATIVE};

/// The nearest non-system turn before `index`.
fn previous_turn(history: &[Message], index: usize) -> Option<&Message> {
    history[..index].iter().rev().find(|m| m.role != Role::System)
}

/// What the latest user message says about paying a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agreement {
    /// Explicit agreement: collect without asking the classifier.
    Agreed,
    /// A refusal, or an affirmative answering something other than a
    /// deposit ask. Never collect this turn.
    Declined,
    /// Nothing deterministic either way.
    Undecided,
}

/// Classifies the latest user message.
///
/// A refusal phrase always wins. An affirmative counts when it names the
/// deposit itself, or when it is a bare "yes" answering an assistant deposit
/// ask; any other affirmative answers a different question.
pub fn latest_turn_verdict(history: &[Message]) -> Agreement {
    let Some(index) = history.iter().rposition(Message::is_user) else {
        return Agreement::Undecided;
    };
    let msg = history[index].content.trim();
    if msg.is_empty() {
        return Agreement::Undecided;
    }
    if NEGATIVE.is_match(msg) {
        return Agreement::Declined;
    }
    if !AFFIRMATIVE.is_match(msg) {
        return Agreement::Undecided;
    }
    let answers_ask = previous_turn(history, index)
        .is_some_and(|prev| prev.is_assistant() && ASK.is_match(&prev.content));
    if KEYWORD.is_match(msg) || answers_ask {
        Agreement::Agreed
    } else {
        Agreement::Declined
    }
}

/// Whether the latest user message explicitly agrees to pay a deposit.
pub fn latest_turn_agreed(history: &[Message]) -> bool {
    latest_turn_verdict(history) == Agreement::Agreed
}

/// Whether any assistant deposit ask was followed by an affirmative reply.
pub fn conversation_has_deposit_agreement(history: &[Message]) -> bool {
    history.iter().enumerate().any(|(i, msg)| {
        if !msg.is_assistant() || !ASK.is_match(&msg.content) {
            return false;
        }
        history[i + 1..]
            .iter()
            .find(|m| m.role != Role::System)
            .filter(|m| m.is_user())
            .map(|m| m.content.trim())
            .is_some_and(|reply| {
                !reply.is_empty() && !NEGATIVE.is_match(reply) && AFFIRMATIVE.is_match(reply)
            })
    })
}

/// Whether the last `lookback` non-empty, non-system turns mention a deposit.
pub fn should_attempt_classification(history: &[Message], lookback: usize) -> bool {
    history
        .iter()
        .rev()
        .filter(|m| m.role != Role::System)
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .take(lookback)
        .any(|c| KEYWORD.is_match(c) || ASK.is_match(c))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn deposit_ask() -> Message {
        Message::assistant("To hold your spot we take a refundable deposit of $50. Want the link?")
    }

    #[test]
    fn bare_yes_after_deposit_ask() {
        let history = vec![Message::system("ctx"), deposit_ask(), Message::user("yes")];
        assert!(latest_turn_agreed(&history));
    }

    #[test]
    fn bare_yes_skips_system_turns_only() {
        let history = vec![
            deposit_ask(),
            Message::system("[SYSTEM] availability context"),
            Message::user("Sure!"),
        ];
        assert!(latest_turn_agreed(&history));

        let history = vec![
            deposit_ask(),
            Message::user("what times do you have?"),
            Message::assistant("We have Tuesday at 3pm."),
            Message::user("yes"),
        ];
        assert!(!latest_turn_agreed(&history));
    }

    #[test]
    fn keyword_affirmative_needs_no_ask() {
        let history = vec![Message::user("ok I'll pay the deposit")];
        assert!(latest_turn_agreed(&history));
    }

    #[test]
    fn refusals_win() {
        let history = vec![deposit_ask(), Message::user("yes but maybe later")];
        assert!(!latest_turn_agreed(&history));
        let history = vec![deposit_ask(), Message::user("nope")];
        assert!(!latest_turn_agreed(&history));
    }

    #[test]
    fn verdict_separates_refusals_from_silence() {
        let refusal = vec![deposit_ask(), Message::user("not now, thanks")];
        assert_eq!(latest_turn_verdict(&refusal), Agreement::Declined);

        let other_question = vec![
            Message::user("how much is the deposit?"),
            Message::assistant("It's $50. Would Tuesday at 3pm work?"),
            Message::user("yes"),
        ];
        assert_eq!(latest_turn_verdict(&other_question), Agreement::Declined);

        let question = vec![deposit_ask(), Message::user("is it refundable?")];
        assert_eq!(latest_turn_verdict(&question), Agreement::Undecided);
        assert_eq!(latest_turn_verdict(&[]), Agreement::Undecided);
    }

    #[test]
    fn earlier_agreement_is_remembered() {
        let history = vec![
            deposit_ask(),
            Message::user("yeah let's do it"),
            Message::assistant("Great, sending the link now."),
            Message::user("thanks!"),
        ];
        assert!(conversation_has_deposit_agreement(&history));
        assert!(!latest_turn_agreed(&history));

        let declined = vec![deposit_ask(), Message::user("no thanks")];
        assert!(!conversation_has_deposit_agreement(&declined));
    }

    #[test]
    fn classification_gating_window() {
        let mut history = vec![deposit_ask()];
        for i in 0..8 {
            history.push(Message::user(format!("message {i}")));
        }
        assert!(!should_attempt_classification(&history, 8));
        assert!(should_attempt_classification(&history, 9));
        assert!(should_attempt_classification(&[Message::user("can I pay now")], 8));
    }

    proptest! {
        #[test]
        fn negative_phrase_always_wins(
            affirmative in prop::sample::select(vec!["yes", "sure", "okay", "let's do it", "I'll pay"]),
            negative in prop::sample::select(vec!["not now", "maybe later", "skip", "no thanks", "nope", "no deposit"]),
            negative_first in any::<bool>(),
        ) {
            let text = if negative_first {
                format!("{negative}, {affirmative}")
            } else {
                format!("{affirmative} {negative}")
            };
            let history = vec![deposit_ask(), Message::user(text)];
            prop_assert_eq!(latest_turn_verdict(&history), Agreement::Declined);
        }

        #[test]
        fn bare_yes_requires_preceding_ask(
            opener in prop::sample::select(vec![
                "What days work for you?",
                "Great choice! May I have your full name?",
                "We offer Botox and filler.",
            ]),
            reply in prop::sample::select(vec!["yes", "yeah", "sure", "ok", "absolutely"]),
        ) {
            let history = vec![Message::system("ctx"), Message::assistant(opener), Message::user(reply)];
            prop_assert_eq!(latest_turn_verdict(&history), Agreement::Declined);
        }
    }
}
