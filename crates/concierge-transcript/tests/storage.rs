// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge cache, archive writer and transcript persistence.

use std::sync::Arc;

use concierge_core::{ConciergeError, Deadline, KnowledgeRetriever, Message};
use concierge_test_utils::{InMemoryArchive, InMemoryHistory, InMemoryKnowledgeSource};
use concierge_transcript::{ArchiveWriter, TranscriptManager, VersionedKnowledgeCache};

// ---- Knowledge cache ----

#[tokio::test]
async fn unchanged_versions_are_served_from_cache() {
    let source = Arc::new(InMemoryKnowledgeSource::new());
    source.add("clinic_a", "Botox results last three to four months.");
    let cache = VersionedKnowledgeCache::new(source.clone());

    let first = cache.query("clinic_a", "how long does botox last", 3).await.unwrap();
    assert_eq!(first.len(), 1);
    let loads = source.document_loads();

    let second = cache.query("clinic_a", "botox", 3).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(source.document_loads(), loads);
    assert_eq!(cache.cached_version("clinic_a").await, Some(1));
}

#[tokio::test]
async fn version_bump_reloads_the_clinic() {
    let source = Arc::new(InMemoryKnowledgeSource::new());
    source.add("clinic_a", "Botox starts at $12 per unit.");
    let cache = VersionedKnowledgeCache::new(source.clone());
    cache.query("clinic_a", "botox price", 3).await.unwrap();

    source.add("clinic_a", "Botox touch-ups are free within two weeks.");
    let docs = cache.query("clinic_a", "botox", 5).await.unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(cache.cached_version("clinic_a").await, Some(2));
}

#[tokio::test]
async fn shared_documents_reach_every_clinic() {
    let source = Arc::new(InMemoryKnowledgeSource::new());
    source.add("", "Parking is free behind the building.");
    source.add("clinic_a", "Filler appointments take an hour.");
    let cache = VersionedKnowledgeCache::new(source.clone());

    let docs = cache.query("clinic_a", "is parking free", 3).await.unwrap();
    assert_eq!(docs, vec!["Parking is free behind the building.".to_string()]);

    let other = cache.query("clinic_b", "parking", 3).await.unwrap();
    assert_eq!(other.len(), 1);
    assert!(cache.query("clinic_b", "filler", 3).await.unwrap().is_empty());
}

// ---- Archive writer ----

#[tokio::test]
async fn archive_creates_once_then_touches() {
    let archive = Arc::new(InMemoryArchive::new());
    let writer = ArchiveWriter::new(archive.clone());

    writer
        .append("conv_1", "org_1", &[Message::user("hi"), Message::assistant("hello")])
        .await
        .unwrap();
    writer
        .append("conv_1", "org_1", &[Message::user("thanks")])
        .await
        .unwrap();

    assert_eq!(archive.create_calls(), 1);
    assert_eq!(archive.touches(), 1);
    assert_eq!(archive.messages("conv_1").len(), 3);
}

#[tokio::test]
async fn lost_insert_race_uses_the_winning_record() {
    let archive = Arc::new(InMemoryArchive::new());
    archive.race_on_create();
    let writer = ArchiveWriter::new(archive.clone());

    let id = writer.ensure("conv_race", "org_1").await.unwrap();

    assert_eq!(id, "rec_conv_race");
    assert_eq!(archive.create_calls(), 1);
}

#[tokio::test]
async fn conflicts_are_retried_a_bounded_number_of_times() {
    let archive = Arc::new(InMemoryArchive::new());
    archive.fail_creates(2);
    let writer = ArchiveWriter::new(archive.clone());
    assert!(writer.ensure("conv_ok", "org_1").await.is_ok());
    assert_eq!(archive.create_calls(), 3);

    let stubborn = Arc::new(InMemoryArchive::new());
    stubborn.fail_creates(5);
    let writer = ArchiveWriter::new(stubborn.clone());
    let err = writer.ensure("conv_bad", "org_1").await.unwrap_err();
    assert!(matches!(err, ConciergeError::Conflict(_)));
    assert_eq!(stubborn.create_calls(), 3);
}

#[tokio::test]
async fn empty_appends_do_not_create_records() {
    let archive = Arc::new(InMemoryArchive::new());
    let writer = ArchiveWriter::new(archive.clone());
    writer.append("conv_1", "org_1", &[]).await.unwrap();
    assert_eq!(archive.create_calls(), 0);
}

// ---- Transcript manager ----

#[tokio::test]
async fn saves_keep_the_system_prompt_pinned() {
    let store = Arc::new(InMemoryHistory::new());
    let manager = TranscriptManager::new(store.clone(), 4);
    let mut messages = vec![Message::system("prompt")];
    for i in 0..6 {
        messages.push(Message::user(format!("question {i}")));
        messages.push(Message::assistant(format!("answer {i}")));
    }

    manager
        .save("conv_trim", &messages, &Deadline::unbounded())
        .await
        .unwrap();
    let stored = manager.load("conv_trim", &Deadline::unbounded()).await.unwrap();

    assert_eq!(stored.len(), 4);
    assert_eq!(stored[0].content, "prompt");
    assert_eq!(stored.last().unwrap().content, "answer 5");
}

#[tokio::test]
async fn unknown_conversations_are_reported() {
    let manager = TranscriptManager::new(Arc::new(InMemoryHistory::new()), 20);
    let err = manager
        .load("conv_missing", &Deadline::unbounded())
        .await
        .unwrap_err();
    assert!(matches!(err, ConciergeError::UnknownConversation(_)));
}
