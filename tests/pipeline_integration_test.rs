use catalog_indexer::config::CommitConfig;
use catalog_indexer::models::CatalogRecord;
use catalog_indexer::pipeline::IndexPipeline;
use catalog_indexer::store::{IndexStore, InMemoryStore};
use serde_json::json;
use std::sync::Arc;

/// Helper to wrap a JSON value as a catalog record
fn record(value: serde_json::Value) -> CatalogRecord {
    CatalogRecord::from_json(value).unwrap()
}

fn pipeline(store: Arc<InMemoryStore>, batch_size: usize) -> IndexPipeline {
    IndexPipeline::new(
        store,
        CommitConfig {
            batch_size,
            commit_within_ms: 300_000,
        },
    )
}

/// The full denormalization flow: an author, a work, and two editions
/// arrive in one run; the work document absorbs edition fields and the
/// author's name, and the author document is enriched from the work.
#[tokio::test]
async fn test_full_catalog_run() {
    let store = Arc::new(InMemoryStore::new());

    let records = vec![
        record(json!({
            "key": "/authors/OL23919A",
            "name": "J. K. Rowling",
            "alternate_names": ["Joanne Rowling"],
            "birth_date": "31 July 1965",
        })),
        record(json!({
            "key": "/works/OL82563W",
            "title": "Harry Potter and the Philosopher's Stone",
            "subjects": ["Magic", "Wizards"],
            "subject_places": ["England"],
            "covers": [8739161],
            "authors": [{"author": {"key": "/authors/OL23919A"}}],
            "last_modified": {"type": "/type/datetime", "value": "2010-04-01T12:00:00"},
        })),
        record(json!({
            "key": "/books/OL22856696M",
            "title": "Harry Potter and the Sorcerer's Stone",
            "works": [{"key": "/works/OL82563W"}],
            "publish_date": "October 1, 1998",
            "publishers": ["Scholastic"],
            "isbn_10": ["0590353403"],
            "languages": [{"key": "/languages/eng"}],
            "covers": [8739161],
        })),
        record(json!({
            "key": "/books/OL7353617M",
            "title": "Harry Potter à l'école des sorciers",
            "works": [{"key": "/works/OL82563W"}],
            "publish_date": "1999",
            "publishers": ["Gallimard"],
            "languages": [{"key": "/languages/fre"}],
            "ocaid": "harrypotterlecole0000rowl",
            "ia_collection": ["inlibrary", "printdisabled"],
        })),
    ];

    let summary = pipeline(store.clone(), 250).run(records).await.unwrap();
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.works_indexed, 1);
    assert_eq!(summary.authors_indexed, 1);
    assert!(summary.unclassified_keys.is_empty());
    assert!(summary.commit.skipped_keys.is_empty());

    let work = store
        .get_document("/works/OL82563W")
        .await
        .unwrap()
        .unwrap();

    // Work fields survive, edition fields fold in
    assert_eq!(
        work.get("title"),
        Some(&json!("Harry Potter and the Philosopher's Stone"))
    );
    assert_eq!(work.get("edition_count"), Some(&json!(2)));
    assert_eq!(work.get("first_publish_year"), Some(&json!(1998)));
    assert_eq!(work.get("publisher"), Some(&json!(["Scholastic", "Gallimard"])));
    assert_eq!(work.get("language"), Some(&json!(["eng", "fre"])));

    // Differing edition title becomes an alternative title
    let alt = work.get("alternative_title").unwrap().as_array().unwrap();
    assert!(alt.contains(&json!("Harry Potter and the Sorcerer's Stone")));

    // ISBN reconciliation adds the 13-digit counterpart
    let isbns = work.get("isbns").unwrap().as_array().unwrap();
    assert!(isbns.contains(&json!("0590353403")));
    assert!(isbns.contains(&json!("9780590353403")));

    // Fulltext flags from the scanned edition
    assert_eq!(work.get("has_fulltext"), Some(&json!(true)));
    assert_eq!(work.get("ebook_count_i"), Some(&json!(1)));
    assert_eq!(work.get("ia"), Some(&json!(["harrypotterlecole0000rowl"])));
    assert_eq!(work.get("public_scan_b"), Some(&json!(false)));

    // Cover selection: the work's own cover matches an edition
    assert_eq!(work.get("cover_i"), Some(&json!(8739161)));
    assert_eq!(work.get("cover_edition_key"), Some(&json!("OL22856696M")));

    // Denormalized author name
    assert_eq!(work.get("author_name"), Some(&json!(["J. K. Rowling"])));
    assert_eq!(
        work.get("author_facet"),
        Some(&json!(["/authors/OL23919A J. K. Rowling"]))
    );

    // Seed set covers the work, subjects, author, and editions
    let seed = work.get("seed").unwrap().as_array().unwrap();
    assert!(seed.contains(&json!("/works/OL82563W")));
    assert!(seed.contains(&json!("/subjects/magic")));
    assert!(seed.contains(&json!("/subjects/place:england")));
    assert!(seed.contains(&json!("/authors/OL23919A")));
    assert!(seed.contains(&json!("/books/OL22856696M")));
    assert!(seed.contains(&json!("/books/OL7353617M")));

    // The author was enriched against the committed work
    let author = store
        .get_document("/authors/OL23919A")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(author.get("name"), Some(&json!("J. K. Rowling")));
    assert_eq!(author.get("work_count"), Some(&json!(1)));
    assert_eq!(
        author.get("top_work"),
        Some(&json!("Harry Potter and the Philosopher's Stone"))
    );
    let top_subjects = author.get("top_subjects").unwrap().as_array().unwrap();
    assert!(top_subjects.contains(&json!("Magic")));
    assert!(top_subjects.contains(&json!("England")));
}

/// A standalone edition with no work reference gets a synthetic work
/// document under a substituted key.
#[tokio::test]
async fn test_orphan_edition_synthesizes_work() {
    let store = Arc::new(InMemoryStore::new());
    let summary = pipeline(store.clone(), 250)
        .run(vec![record(json!({
            "key": "/books/OL5822655M",
            "title": "Local pamphlet",
            "publish_date": "1972",
        }))])
        .await
        .unwrap();

    assert_eq!(summary.works_indexed, 1);
    let work = store
        .get_document("/works/OL5822655M")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(work.get("title"), Some(&json!("Local pamphlet")));
    assert_eq!(work.get("edition_count"), Some(&json!(1)));
    assert_eq!(work.get("publish_year"), Some(&json!([1972])));
}

/// Input order between a work and its editions must not matter: editions
/// arriving first accumulate against a shell that the later work record
/// replaces.
#[tokio::test]
async fn test_edition_first_ordering() {
    let store = Arc::new(InMemoryStore::new());
    pipeline(store.clone(), 250)
        .run(vec![
            record(json!({
                "key": "/books/OL1M",
                "title": "Early Edition",
                "works": [{"key": "/works/OL1W"}],
                "publish_date": "2001",
            })),
            record(json!({
                "key": "/works/OL1W",
                "title": "The Real Title",
                "subjects": ["History"],
            })),
        ])
        .await
        .unwrap();

    let work = store.get_document("/works/OL1W").await.unwrap().unwrap();
    assert_eq!(work.get("title"), Some(&json!("The Real Title")));
    assert_eq!(work.get("subject"), Some(&json!(["History"])));
    assert_eq!(work.get("edition_count"), Some(&json!(1)));
    assert_eq!(work.get("first_publish_year"), Some(&json!(2001)));
    let alt = work.get("alternative_title").unwrap().as_array().unwrap();
    assert!(alt.contains(&json!("Early Edition")));
}

/// A document the store rejects is retried individually, recorded as
/// skipped, and never blocks its batch peers.
#[tokio::test]
async fn test_rejected_document_is_isolated() {
    let store = Arc::new(InMemoryStore::new());
    store.reject_key("/works/OL2W");

    let summary = pipeline(store.clone(), 3)
        .run(vec![
            record(json!({"key": "/works/OL1W", "title": "First"})),
            record(json!({"key": "/works/OL2W", "title": "Second"})),
            record(json!({"key": "/works/OL3W", "title": "Third"})),
        ])
        .await
        .unwrap();

    assert_eq!(summary.commit.skipped_keys, vec!["/works/OL2W".to_string()]);
    assert!(store.get_document("/works/OL1W").await.unwrap().is_some());
    assert!(store.get_document("/works/OL2W").await.unwrap().is_none());
    assert!(store.get_document("/works/OL3W").await.unwrap().is_some());
}

/// An already-indexed authored work refetched for an incremental fold
/// keeps exactly one copy of its denormalized author fields; re-injection
/// replaces them instead of appending.
#[tokio::test]
async fn test_author_names_stable_across_runs() {
    let store = Arc::new(InMemoryStore::new());

    pipeline(store.clone(), 250)
        .run(vec![
            record(json!({
                "key": "/authors/OL1A",
                "name": "Jane Writer",
            })),
            record(json!({
                "key": "/works/OL1W",
                "title": "First Novel",
                "authors": [{"author": {"key": "/authors/OL1A"}}],
            })),
        ])
        .await
        .unwrap();

    pipeline(store.clone(), 250)
        .run(vec![record(json!({
            "key": "/books/OL1M",
            "works": [{"key": "/works/OL1W"}],
            "publishers": ["Alpha Press"],
        }))])
        .await
        .unwrap();

    let work = store.get_document("/works/OL1W").await.unwrap().unwrap();
    assert_eq!(work.get("author_name"), Some(&json!(["Jane Writer"])));
    assert_eq!(
        work.get("author_facet"),
        Some(&json!(["/authors/OL1A Jane Writer"]))
    );
    assert_eq!(work.get("edition_count"), Some(&json!(1)));
}

/// Re-running an edition against an already-indexed work continues the
/// fold from the indexed state instead of resetting counters.
#[tokio::test]
async fn test_incremental_update_of_indexed_work() {
    let store = Arc::new(InMemoryStore::new());

    pipeline(store.clone(), 250)
        .run(vec![
            record(json!({"key": "/works/OL1W", "title": "Growing Work"})),
            record(json!({
                "key": "/books/OL1M",
                "works": [{"key": "/works/OL1W"}],
                "publishers": ["Alpha Press"],
            })),
        ])
        .await
        .unwrap();

    pipeline(store.clone(), 250)
        .run(vec![record(json!({
            "key": "/books/OL2M",
            "works": [{"key": "/works/OL1W"}],
            "publishers": ["Beta Press"],
        }))])
        .await
        .unwrap();

    let work = store.get_document("/works/OL1W").await.unwrap().unwrap();
    assert_eq!(work.get("edition_count"), Some(&json!(2)));
    assert_eq!(work.get("title"), Some(&json!("Growing Work")));
    let publishers = work.get("publisher").unwrap().as_array().unwrap();
    assert!(publishers.contains(&json!("Alpha Press")));
    assert!(publishers.contains(&json!("Beta Press")));
    let seed = work.get("seed").unwrap().as_array().unwrap();
    assert!(seed.contains(&json!("/books/OL1M")));
    assert!(seed.contains(&json!("/books/OL2M")));
}
