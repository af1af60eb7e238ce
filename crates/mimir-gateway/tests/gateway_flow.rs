//! End-to-end tests for the gateway over the in-memory cache.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    clippy::float_cmp,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use mimir_cache::{Cache, MemoryCache};
use mimir_core::telemetry::init_test_tracing;
use mimir_core::{
    CacheConfig, ChatCompletionRequest, ChatCompletionResponse, Choice, Error, Message, Usage,
};
use mimir_embeddings::HashEmbedder;
use mimir_gateway::{CACHE_HEADER, CacheOutcome, Lookup, SIMILARITY_HEADER, SemanticGateway};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn response(text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("resp-{text}"),
        object: "chat.completion".to_owned(),
        created: 1_700_000_000,
        model: "gpt-4o".to_owned(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(text),
            finish_reason: Some("stop".to_owned()),
            logprobs: None,
        }],
        usage: Usage::default(),
        system_fingerprint: None,
    }
}

fn ask(question: &str) -> ChatCompletionRequest {
    ChatCompletionRequest::new("gpt-4o", vec![Message::user(question)])
}

fn gateway() -> SemanticGateway<HashEmbedder> {
    init_test_tracing();
    let config = CacheConfig::default();
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&config));
    SemanticGateway::new(cache, HashEmbedder::new(256), config)
}

#[tokio::test]
async fn test_miss_then_record_then_hit() {
    let gateway = gateway();
    let request = ask("What is the capital of France?");

    let Lookup::Miss { embedding } = gateway.lookup(&request).await.unwrap() else {
        panic!("empty cache must miss");
    };
    gateway
        .record(request.clone(), response("Paris"), embedding)
        .await
        .unwrap();

    // Same words, different casing and punctuation embed identically
    let repeat = ask("what is the capital of france");
    match gateway.lookup(&repeat).await.unwrap() {
        Lookup::Hit {
            response,
            similarity,
        } => {
            assert_eq!(response.first_text().as_deref(), Some("Paris"));
            assert!(similarity > 0.999);
        }
        other => panic!("expected a hit, got {other:?}"),
    }

    let stats = gateway.stats().await;
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.total_hits, 1);
    assert_eq!(stats.total_misses, 1);
    assert!((stats.estimated_saved - 0.001).abs() < 1e-12);
}

#[tokio::test]
async fn test_unrelated_prompt_misses() {
    let gateway = gateway();
    let request = ask("How do I reverse a linked list?");
    let Lookup::Miss { embedding } = gateway.lookup(&request).await.unwrap() else {
        panic!("empty cache must miss");
    };
    gateway
        .record(request, response("Iterate and flip pointers"), embedding)
        .await
        .unwrap();

    let lookup = gateway
        .lookup(&ask("Recommend pizza toppings for a party"))
        .await
        .unwrap();
    assert!(matches!(lookup, Lookup::Miss { .. }));
}

#[tokio::test]
async fn test_respond_calls_upstream_once() {
    let gateway = gateway();
    let upstream_calls = AtomicUsize::new(0);
    let upstream = |request: &ChatCompletionRequest| {
        upstream_calls.fetch_add(1, Ordering::SeqCst);
        let model = request.model.clone();
        async move {
            let mut answer = response("Paris");
            answer.model = model;
            Ok(answer)
        }
    };

    let (first, first_status) = gateway
        .respond(ask("What is the capital of France?"), upstream)
        .await
        .unwrap();
    let (second, second_status) = gateway
        .respond(ask("What is the capital of France?"), upstream)
        .await
        .unwrap();

    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first_status.outcome, CacheOutcome::Miss);
    assert_eq!(second_status.outcome, CacheOutcome::Hit);
    assert_eq!(first, second);
    assert_eq!(
        second_status.header_pairs(),
        vec![
            (CACHE_HEADER, "HIT".to_owned()),
            (SIMILARITY_HEADER, "1.0000".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_streaming_requests_are_never_cached() {
    let gateway = gateway();
    let request = ask("Tell me a story").with_stream(true);

    for _ in 0..2 {
        let (_, status) = gateway
            .respond(request.clone(), |_| async { Ok(response("Once upon a time")) })
            .await
            .unwrap();
        assert_eq!(status.outcome, CacheOutcome::Bypass);
    }

    let stats = gateway.stats().await;
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.total_hits + stats.total_misses, 0);
}

#[tokio::test]
async fn test_upstream_failure_is_returned_and_not_cached() {
    let gateway = gateway();

    let error = gateway
        .respond(ask("Is the backend up?"), |_| async {
            Err(Error::Backend("upstream returned 502".to_owned()))
        })
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Backend(_)));
    assert_eq!(gateway.cache().size().await, 0);
}

#[tokio::test]
async fn test_cleanup_task_from_config_interval() {
    let config = CacheConfig {
        cleanup_interval_seconds: 1,
        ..CacheConfig::default()
    };
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&config));
    let gateway = SemanticGateway::new(cache, HashEmbedder::new(16), config);

    let task = gateway.start_cleanup();
    assert!(task.is_running());
    task.stop().await;
}
