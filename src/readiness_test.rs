use super::*;

use crate::store::{ChatRole, StoredMessage};

fn heuristic() -> KeywordHeuristic {
    KeywordHeuristic::new(8, vec!["brief".into(), "project".into(), "shoot".into(), "submit".into()])
}

fn user(content: &str) -> StoredMessage {
    StoredMessage::new(ChatRole::User, content)
}

fn assistant(content: &str) -> StoredMessage {
    StoredMessage::new(ChatRole::Assistant, content)
}

/// A conversation that satisfies every readiness condition.
fn ready_history() -> Vec<StoredMessage> {
    vec![
        user("Hi, I need product photos"),
        assistant("Of course. What are you shooting?"),
        user("Ceramic vases, about 20 pieces"),
        assistant("Lovely. Do you have a deadline for this project?"),
        user("End of next month"),
        assistant("Noted. Where can we reach you?"),
        user("anna@studio.se"),
        assistant("Thank you. I believe we have enough for a brief."),
    ]
}

#[test]
fn ready_when_all_conditions_met() {
    let signal = heuristic().assess(&ready_history());
    assert!(signal.ready);
    assert!(signal.has_email);
    assert!(signal.has_project_context);
    assert_eq!(signal.message_count, 8);
}

#[test]
fn not_ready_below_message_minimum() {
    let mut history = ready_history();
    history.truncate(6);
    let signal = heuristic().assess(&history);
    assert!(!signal.ready);
    // The underlying facts still register even below the depth floor.
    assert!(signal.has_project_context);
    assert_eq!(signal.message_count, 6);
}

#[test]
fn not_ready_without_contact_token() {
    let history: Vec<StoredMessage> = ready_history()
        .into_iter()
        .map(|m| {
            if m.content.contains('@') {
                StoredMessage::new(m.role, "you can call me")
            } else {
                m
            }
        })
        .collect();
    assert!(!heuristic().assess(&history).ready);
}

#[test]
fn not_ready_without_assistant_keyword() {
    let history = vec![
        user("Hi"),
        assistant("Hello there."),
        user("I make vases"),
        assistant("How nice."),
        user("Lots of them"),
        assistant("Indeed."),
        user("anna@studio.se"),
        assistant("Thank you."),
    ];
    assert!(!heuristic().assess(&history).ready);
}

#[test]
fn contact_token_in_assistant_turn_does_not_count() {
    let history = vec![
        user("Hi"),
        assistant("Email us at hello@example.com about your project brief."),
        user("ok"),
        assistant("Any time."),
        user("sure"),
        assistant("Great."),
        user("fine"),
        assistant("Good."),
    ];
    assert!(!heuristic().assess(&history).ready);
}

#[test]
fn keyword_match_is_case_insensitive() {
    let mut history = ready_history();
    for m in &mut history {
        if m.role == ChatRole::Assistant {
            m.content = m.content.to_uppercase();
        }
    }
    assert!(heuristic().assess(&history).ready);
}

#[test]
fn empty_keyword_entries_are_ignored() {
    let h = KeywordHeuristic::new(1, vec!["  ".into(), String::new(), "brief".into()]);
    let history = vec![user("a@b.c"), assistant("here is your brief")];
    assert!(h.assess(&history).ready);
}

#[test]
fn empty_history_is_not_ready() {
    let signal = heuristic().assess(&[]);
    assert!(!signal.ready);
    assert_eq!(signal.message_count, 0);
}
