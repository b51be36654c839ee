//! Ingest a one-record corpus, reload the index and answer a question from it.

use async_trait::async_trait;
use lexrag_common::config::AppConfig;
use lexrag_common::embeddings::HashingEmbedder;
use lexrag_common::errors::Result;
use lexrag_common::{Embedder, GenerationOptions, Generator};
use lexrag_context::{QueryEngine, QueryOverrides};
use lexrag_ingestion::IngestionPipeline;
use lexrag_search::{Retriever, VectorIndex};
use serde_json::json;
use std::sync::{Arc, Mutex};

struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Consideration is the legal detriment or benefit each party exchanges.\n".to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn test_consideration_question_cites_record_source() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("data.jsonl");
    std::fs::write(
        &records,
        "{\"query\": \"What is consideration?\", \"response\": \"Consideration is a legal detriment/benefit exchanged in a contract.\"}\n",
    )
    .unwrap();

    let mut config = AppConfig::default();
    config.ingestion.pdf_dir = None;
    config.ingestion.records_path = Some(records);
    config.ingestion.chunk_size = 500;
    config.ingestion.chunk_overlap = 50;
    config.embedding.dimension = 256;
    config.retrieval.top_k = 1;
    config.index.path = dir.path().join("vectorstore").join("index.json");

    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(256));
    let report = IngestionPipeline::new(config.clone(), embedder.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 1);

    let index = VectorIndex::load(&config.index.path, embedder.as_ref()).unwrap();
    let retriever = Retriever::new(Arc::new(index), embedder);

    let hits = retriever.retrieve("What is consideration?", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].text.starts_with("Query: What is consideration?\nResponse: "));

    let generator = Arc::new(EchoGenerator {
        prompts: Mutex::new(Vec::new()),
    });
    let engine = QueryEngine::from_config(&config, retriever, generator.clone()).unwrap();
    let response = engine
        .query("What is consideration?", Some("en"), QueryOverrides::default())
        .await
        .unwrap();

    assert_eq!(
        response.result,
        "Consideration is the legal detriment or benefit each party exchanges."
    );
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0]["source"], json!("JSONL"));

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("legal detriment/benefit"));
}
