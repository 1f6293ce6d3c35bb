//! Live PubMed round trip through the bundled specification.
//!
//! Run with: cargo test --package bioconnect-connectors --test test_pubmed_live -- --ignored --nocapture

use std::sync::Arc;

use bioconnect_connectors::sources;
use bioconnect_connectors::{Connector, Document, HttpTransport};

#[tokio::test]
#[ignore] // Requires network access
async fn test_pubmed_search_kras() {
    let transport = Arc::new(HttpTransport::new().expect("HTTP client"));
    let pubmed = sources::bundled("pubmed")
        .expect("bundled pubmed")
        .connector(transport)
        .expect("pubmed connector");

    let result = pubmed
        .search("KRAS[tiab] AND pancreatic cancer[tiab]", 5)
        .await
        .expect("PubMed search failed");

    println!("Found {} of {} papers", result.document_ids.len(), result.total_results);
    assert!(!result.document_ids.is_empty(), "Should find at least one paper");

    let pmid = &result.document_ids[0];
    let record = pubmed.get_by_id(pmid).await.expect("PubMed fetch failed");
    let doc = Document::from_record(pubmed.name(), pmid, record).expect("document");

    println!("Title: {:?}", doc.title);
    println!("Authors: {}", doc.authors.len());
    assert_eq!(&doc.id, pmid);
    assert!(doc.title.is_some());
}
