//! Session indexes stay private to their session

mod common;

use common::{read_to_string, BagOfWords, ScriptedGenerator, Workspace, JANE_DOE};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use resumebuddy::index::IndexScope;
use resumebuddy::rag::{AnswerFrame, AnswerPipeline};
use resumebuddy::types::{AskRequest, FileKind, SessionId, UploadedFile};
use resumebuddy::{IndexMissing, RagError};

const SECRET: &str = "Morgan Lee negotiated a confidential acquisition of a robotics startup.";

fn secret_upload() -> Vec<UploadedFile> {
    vec![UploadedFile::new("morgan_private.md", SECRET, FileKind::Resume)]
}

#[tokio::test]
async fn test_concurrent_upload_never_reaches_shared_request() {
    let workspace = Workspace::new();
    workspace.add_document("jane_doe.md", JANE_DOE);

    let store = Arc::new(workspace.store(Arc::new(BagOfWords::new(1024))));
    store.build_from_corpus_files(&workspace.corpus_dir()).await.unwrap();

    let generator = Arc::new(ScriptedGenerator::answering(&["ok"]));
    let pipeline = Arc::new(AnswerPipeline::new(store.clone(), generator.clone()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            let request = if i % 2 == 0 {
                AskRequest::new("Who negotiated an acquisition?").with_files(secret_upload())
            } else {
                AskRequest::new("Who negotiated an acquisition?")
            };
            let answer = pipeline.answer(&request).await.unwrap();
            let uploaded = request.files.is_some();
            let frames: Vec<AnswerFrame> = answer.frames.collect().await;
            (uploaded, frames)
        }));
    }

    for task in tasks {
        let (uploaded, frames) = task.await.unwrap();
        let sources = match frames.last() {
            Some(AnswerFrame::Sources(sources)) => sources.clone(),
            other => panic!("expected sources frame, got {:?}", other),
        };
        if uploaded {
            assert_eq!(sources, vec!["morgan_private".to_string()]);
        } else {
            assert!(!sources.contains(&"morgan_private".to_string()));
        }
    }

    // only the four upload requests saw the private document
    let leaked = generator
        .prompts()
        .iter()
        .filter(|p| p.contains("[morgan_private]"))
        .count();
    assert_eq!(leaked, 4);

    let shared = store.load(&IndexScope::Shared).await.unwrap();
    assert_eq!(shared.sources(), vec!["jane_doe".to_string()]);
    assert!(!read_to_string(&workspace.artifact_path()).contains("Morgan"));
}

#[tokio::test]
async fn test_sessions_cannot_read_each_other() {
    let workspace = Workspace::new();
    let store = workspace.store(Arc::new(BagOfWords::new(1024)));

    let alice = SessionId::from("alice");
    let bob = SessionId::from("bob");

    let alice_files = secret_upload();
    let bob_files = [UploadedFile::new("bob_cv.md", "Bob writes firmware.", FileKind::Resume)];
    let (a, b) = tokio::join!(
        store.build_from_uploaded_files(&alice, &alice_files),
        store.build_from_uploaded_files(&bob, &bob_files),
    );
    assert_ok!(a);
    assert_ok!(b);

    let alice_index = store.load(&IndexScope::Session(alice)).await.unwrap();
    let bob_index = store.load(&IndexScope::Session(bob)).await.unwrap();
    assert_eq!(alice_index.sources(), vec!["morgan_private".to_string()]);
    assert_eq!(bob_index.sources(), vec!["bob_cv".to_string()]);
}

#[tokio::test]
async fn test_session_index_survives_cache_loss_on_same_instance() {
    let workspace = Workspace::new();
    let session = SessionId::from("s-42");

    workspace
        .store(Arc::new(BagOfWords::new(1024)))
        .build_from_uploaded_files(&session, &secret_upload())
        .await
        .unwrap();

    // new store: empty cache, same instance directory
    let restarted = workspace.store(Arc::new(BagOfWords::new(1024)));
    let index = restarted.load(&IndexScope::Session(session)).await.unwrap();
    assert_eq!(index.sources(), vec!["morgan_private".to_string()]);

    // a different instance directory has nothing
    let elsewhere = Workspace::new();
    let result = elsewhere
        .store(Arc::new(BagOfWords::new(1024)))
        .load(&IndexScope::Session(SessionId::from("s-42")))
        .await;
    let err = assert_err!(result);
    assert!(matches!(
        err,
        RagError::NotFound(IndexMissing::SessionExpired { .. })
    ));
}
