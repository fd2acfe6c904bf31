//! # Offline Reply Example
//!
//! Answers customer messages end to end with the in-memory index and the mock
//! providers, so it runs with **zero API keys**.
//!
//! Run: `cargo run --example offline_reply`

use std::sync::Arc;

use replykit_rag::mock::{MockEmbeddingService, MockGenerationService};
use replykit_rag::{Document, InMemoryVectorIndex, RagConfig, RagOrchestrator, SelectionPolicy, VectorIndex};
use replykit_telemetry::{LogFormat, init_telemetry};

const DIM: usize = 64;

const EXCHANGES: &[(&str, &str, &str)] = &[
    (
        "t1",
        "My package was supposed to arrive yesterday and it's still not here",
        "We're sorry for the delay! Please DM us your order number and we'll look into it.",
    ),
    (
        "t2",
        "I was charged twice for the same order",
        "That's not the experience we want for you. Please reach out via the link so we can review the charges.",
    ),
    (
        "t3",
        "How do I return a gift without the giver finding out?",
        "Gift returns never notify the sender. You can start one from Your Orders.",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(LogFormat::Pretty)?;

    // -- 1. Seed the index with historical exchanges ----------------------
    // Stored vectors are the mock's hash embeddings of the customer text.
    let hasher = MockEmbeddingService::new(DIM);
    let index = Arc::new(InMemoryVectorIndex::new(DIM));
    for (id, customer, reply) in EXCHANGES {
        index.upsert(&Document::exchange(*id, *customer, hasher.hashed(customer), *reply)).await?;
    }
    println!("Indexed {} exchanges", index.len().await);

    // -- 2. Route the demo questions near a known exchange ----------------
    let embedder = MockEmbeddingService::new(DIM)
        .with_vector("Where is my order? It's late", hasher.hashed(EXCHANGES[0].1))
        .with_vector("You billed me two times!", hasher.hashed(EXCHANGES[1].1));

    let generator = Arc::new(MockGenerationService::new(
        "Sorry about that! Please DM us your order details and we'll take care of it.",
    ));

    let orchestrator = RagOrchestrator::builder()
        .config(RagConfig::builder().top_k(2).selection(SelectionPolicy::Top(2)).build()?)
        .embedding_service(Arc::new(embedder))
        .vector_index(index)
        .generation_service(generator.clone())
        .build()?;

    // -- 3. Answer ---------------------------------------------------------
    for question in ["Where is my order? It's late", "You billed me two times!"] {
        let result = orchestrator.answer(question).await?;
        let (customer, company) = result.retrieval.as_pair();
        println!("\nCustomer:      {question}");
        println!("Reply:         {}", result.text);
        println!("Grounded on:   {customer}");
        println!("Agent replied: {company}");
        println!("Distance:      {:.4}", result.retrieval.distance);
    }

    // -- 4. Show the prompt the generator received ------------------------
    if let Some(prompt) = generator.last_prompt() {
        println!("\n--- last prompt ---\n{prompt}");
    }

    // An empty message never reaches the providers.
    let err = orchestrator.answer("   ").await.err();
    println!("\nEmpty input: {}", err.map(|e| e.to_string()).unwrap_or_default());

    Ok(())
}
