use kvcache_locality::{
    CacheLocalityIndex, ChunkedTokenDatabase, EngineMetadata, LocalityConfig, MemoryStore,
    TokenDatabase, TokenDatabaseConfig,
};
use std::sync::Arc;

fn database(chunk_size: usize) -> ChunkedTokenDatabase {
    ChunkedTokenDatabase::new(
        TokenDatabaseConfig { chunk_size },
        EngineMetadata::new("meta-llama/Llama-2-7b-chat-hf"),
    )
    .unwrap()
}

/// Two replicas registered different prompt prefixes; a new request that
/// extends one of them should find that replica for the shared chunks only.
#[tokio::test]
async fn test_router_finds_warm_replica() {
    let db = database(16);
    let system_prompt: Vec<u32> = (1000..1064).collect();

    let mut first_request = system_prompt.clone();
    first_request.extend(2000..2030);
    let other_prompt: Vec<u32> = (5000..5048).collect();

    // Population side: each replica records the chunks it computed.
    let store = MemoryStore::new();
    for chunk in db.process_tokens(&first_request) {
        store.set(chunk.key.to_store_key(), "10.1.0.7:8000");
    }
    for chunk in db.process_tokens(&other_prompt) {
        store.set(chunk.key.to_store_key(), "10.1.0.8:8000");
    }

    let mut new_request = system_prompt.clone();
    new_request.extend(3000..3020);
    let chunks = db.process_tokens(&new_request);
    assert_eq!(chunks.len(), 6);

    let keys: Vec<_> = chunks.iter().map(|c| c.key.clone()).collect();
    let index = CacheLocalityIndex::new(Arc::new(store));
    let pods = index.lookup(&keys).await.unwrap();

    // 64 shared tokens = 4 full chunks.
    for key in &keys[..4] {
        assert_eq!(pods[key], vec!["10.1.0.7".to_string()]);
    }
    for key in &keys[4..] {
        assert!(!pods.contains_key(key));
    }
}

#[tokio::test]
async fn test_config_driven_pipeline() {
    let config: LocalityConfig = serde_json::from_str(
        r#"{"chunk_size": 4, "lookup_timeout_ms": 1000, "metadata": {"model_name": "m"}}"#,
    )
    .unwrap();
    config.validate().unwrap();

    let db = config.build_token_database().unwrap();
    let keys = db.keys(&[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(keys.len(), 2);
    assert_eq!(
        keys[1].to_store_key(),
        "vllm@m@1@0@dd38454c5cf02d7e95e2e66b843b532d1adc4a0fc168cb986d44a5e2e46c72bb"
    );

    let index = config.build_index().await.unwrap();
    assert!(index.lookup(&keys).await.unwrap().is_empty());
    assert_eq!(index.stats().misses, 2);
}
