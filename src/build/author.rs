use crate::error::Result;
use crate::models::{AuthorAggregate, AuthorRecord};
use crate::store::{FacetCount, IndexStore, QueryRequest};
use serde_json::Value;

const FACET_FIELDS: [&str; 4] = ["subject_facet", "time_facet", "person_facet", "place_facet"];
const TOP_SUBJECTS: usize = 10;

/// Builds base author documents from author records.
pub struct AuthorBuilder;

impl AuthorBuilder {
    pub fn from_record(record: &AuthorRecord) -> AuthorAggregate {
        AuthorAggregate {
            key: record.key.clone(),
            doc_type: "author".to_string(),
            name: record.name.clone(),
            alternate_names: record.alternate_names.clone(),
            birth_date: record.birth_date.clone(),
            death_date: record.death_date.clone(),
            date: record.date.clone(),
            work_count: None,
            top_work: None,
            top_subjects: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Fill in the work-derived fields of an author document from the indexed
/// works that name it.
///
/// Issues one query filtered by `author_key`, asking for the single top
/// result by edition count plus faceted subject/time/person/place counts.
/// Must run strictly after the referenced works are committed and visible
/// to queries; scheduling that barrier is the pipeline's job.
pub async fn enrich_author(author: &mut AuthorAggregate, store: &dyn IndexStore) -> Result<()> {
    let request = QueryRequest::new()
        .filter("author_key", author.key.clone())
        .fields(&["title", "subtitle"])
        .facets(&FACET_FIELDS)
        .facet_mincount(1)
        .sort("edition_count desc")
        .rows(1);
    let response = store.query(&request).await?;

    author.work_count = Some(response.num_found);
    if let Some(top) = response.docs.first() {
        if let Some(title) = top.get("title").and_then(Value::as_str) {
            let top_work = match top.get("subtitle").and_then(Value::as_str) {
                Some(subtitle) => format!("{title}: {subtitle}"),
                None => title.to_string(),
            };
            author.top_work = Some(top_work);
        }
    }

    // Rank facet values across all four dimensions combined
    let mut all_subjects: Vec<FacetCount> = FACET_FIELDS
        .iter()
        .filter_map(|field| response.facets.get(*field))
        .flatten()
        .cloned()
        .collect();
    all_subjects.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    author.top_subjects = all_subjects
        .into_iter()
        .take(TOP_SUBJECTS)
        .map(|f| f.value)
        .collect();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogRecord;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn author_record(value: serde_json::Value) -> AuthorRecord {
        CatalogRecord::from_json(value).unwrap().decode().unwrap()
    }

    #[test]
    fn test_base_document_from_record() {
        let author = AuthorBuilder::from_record(&author_record(json!({
            "key": "/authors/OL1A",
            "name": "Octavia E. Butler",
            "alternate_names": ["Octavia Estelle Butler"],
            "birth_date": "1947",
            "death_date": "2006",
        })));

        assert_eq!(author.key, "/authors/OL1A");
        assert_eq!(author.doc_type, "author");
        assert_eq!(author.name.as_deref(), Some("Octavia E. Butler"));
        assert_eq!(author.work_count, None);
    }

    #[tokio::test]
    async fn test_enrich_sets_work_count_top_work_and_subjects() {
        let store = InMemoryStore::new();
        for (key, count, title, subtitle, subjects) in [
            ("/works/OL1W", 9, "Kindred", None, vec!["Fiction", "Time travel"]),
            ("/works/OL2W", 4, "Dawn", Some("Xenogenesis"), vec!["Fiction"]),
            ("/works/OL3W", 2, "Fledgling", None, vec!["Vampires"]),
        ] {
            let mut doc = json!({
                "key": key,
                "type": "work",
                "title": title,
                "author_key": ["/authors/OL1A"],
                "edition_count": count,
                "subject_facet": subjects,
            });
            if let Some(subtitle) = subtitle {
                doc["subtitle"] = json!(subtitle);
            }
            store
                .upsert_document(doc.as_object().cloned().unwrap())
                .await
                .unwrap();
        }

        let mut author = AuthorBuilder::from_record(&author_record(json!({
            "key": "/authors/OL1A",
            "name": "Octavia E. Butler",
        })));
        enrich_author(&mut author, &store).await.unwrap();

        assert_eq!(author.work_count, Some(3));
        assert_eq!(author.top_work.as_deref(), Some("Kindred"));
        // Fiction counted twice, the rest once
        assert_eq!(author.top_subjects[0], "Fiction");
        assert!(author.top_subjects.contains(&"Time travel".to_string()));
        assert!(author.top_subjects.len() <= 10);
    }

    #[tokio::test]
    async fn test_enrich_includes_subtitle_in_top_work() {
        let store = InMemoryStore::new();
        store
            .upsert_document(
                json!({
                    "key": "/works/OL2W",
                    "title": "Dawn",
                    "subtitle": "Xenogenesis",
                    "author_key": ["/authors/OL2A"],
                    "edition_count": 4,
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let mut author = AuthorBuilder::from_record(&author_record(json!({
            "key": "/authors/OL2A",
        })));
        enrich_author(&mut author, &store).await.unwrap();

        assert_eq!(author.top_work.as_deref(), Some("Dawn: Xenogenesis"));
    }
}
