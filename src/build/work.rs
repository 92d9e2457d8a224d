use crate::error::Result;
use crate::fields::{reconcile, sanitize, str_to_key};
use crate::models::{
    datetimestr_to_int, short_key, EditionRecord, WorkAggregate, WorkRecord,
};
use crate::store::{FilterOp, IndexStore, QueryRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})$").unwrap());
static RE_NOT_AZ: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z]").unwrap());

/// Append preserving first-seen order, skipping duplicates.
fn push_uniq(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Publishers named "s.n." (sine nomine) appear under endless punctuation
/// variants; they all normalize to one value.
fn is_sine_nomine(publisher: &str) -> bool {
    RE_NOT_AZ.replace_all(publisher, "").to_lowercase() == "sn"
}

/// Coerce a string-or-list field into a string list, logging and dropping
/// anything else.
fn coerce_string_list(value: &Value, field: &str, edition_key: &str) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => {
            tracing::warn!(field, edition = edition_key, "Unexpected type; dropping field");
            Vec::new()
        }
    }
}

/// The central reducer over work aggregates.
///
/// Stateless: every operation takes the aggregate it transforms. The
/// builder does not deduplicate editions; re-folding the same edition
/// double-counts, and deduplicating the input stream is the caller's
/// responsibility.
pub struct WorkBuilder;

impl WorkBuilder {
    /// Create a fresh aggregate from a work record. Subject/person/place/
    /// time facets are set here, once, and are not mutated by edition
    /// folding.
    pub fn from_work(record: &WorkRecord) -> WorkAggregate {
        let mut work = WorkAggregate::empty(record.key.clone());
        work.last_modified_i = datetimestr_to_int(record.last_modified.as_ref());
        work.title = record.title.clone();
        work.subtitle = record.subtitle.clone();
        work.cover_i = record.covers.first().copied();
        work.author_key = record
            .authors
            .iter()
            .filter_map(|a| a.author.as_ref().map(|k| k.key.clone()))
            .collect();

        // Each facet dimension produces the raw values, a _facet copy, a
        // _key slug list, and prefixed seed entries (plain subjects carry
        // no facet-type prefix).
        Self::set_facet(&mut work, &record.subjects, "subject");
        Self::set_facet(&mut work, &record.subject_people, "person");
        Self::set_facet(&mut work, &record.subject_places, "place");
        Self::set_facet(&mut work, &record.subject_times, "time");

        for author_key in work.author_key.clone() {
            push_uniq(&mut work.seed, author_key);
        }
        work
    }

    /// Create a synthetic aggregate for a standalone edition, keyed by
    /// substituting the edition key's path segment.
    pub fn synthetic_from_edition(edition: &EditionRecord) -> Result<WorkAggregate> {
        let key = crate::classify::synthetic_work_key(&edition.key)?;
        let mut work = WorkAggregate::empty(key);
        work.last_modified_i = datetimestr_to_int(edition.last_modified.as_ref());
        work.title = edition.title.clone();
        work.subtitle = edition.subtitle.clone();
        work.cover_i = edition.covers.first().copied();
        Ok(work)
    }

    fn set_facet(work: &mut WorkAggregate, values: &[String], facet: &str) {
        if values.is_empty() {
            return;
        }
        let keys: Vec<String> = values.iter().map(|v| str_to_key(v)).collect();
        let prefix = if facet == "subject" {
            "/subjects/".to_string()
        } else {
            format!("/subjects/{facet}:")
        };
        for key in &keys {
            push_uniq(&mut work.seed, format!("{prefix}{key}"));
        }
        let (raw, facet_copy, key_list) = match facet {
            "subject" => (&mut work.subject, &mut work.subject_facet, &mut work.subject_key),
            "person" => (&mut work.person, &mut work.person_facet, &mut work.person_key),
            "place" => (&mut work.place, &mut work.place_facet, &mut work.place_key),
            _ => (&mut work.time, &mut work.time_facet, &mut work.time_key),
        };
        *raw = values.to_vec();
        *facet_copy = values.to_vec();
        *key_list = keys;
    }

    /// Fold one edition into the aggregate, applying per-field merge
    /// policy. A failure in one field transform is logged and skipped;
    /// it never corrupts already-folded fields or aborts later folds.
    pub fn fold_edition(work: &mut WorkAggregate, edition: &EditionRecord) {
        let shortkey = short_key(&edition.key).unwrap_or(&edition.key).to_string();

        // Edition titles that differ from the work's own become
        // alternative titles.
        if let Some(ref title) = edition.title {
            if work.title.as_deref() != Some(title) && !work.alternative_title.contains(title) {
                work.alternative_title.push(title.clone());
            }
        }
        if let Some(ref subtitle) = edition.subtitle {
            if work.subtitle.as_deref() != Some(subtitle)
                && !work.alternative_subtitle.contains(subtitle)
            {
                work.alternative_subtitle.push(subtitle.clone());
            }
        }

        work.edition_count += 1;

        if let Some(ref by_statement) = edition.by_statement {
            push_uniq(&mut work.by_statement, by_statement.clone());
        }

        if let Some(ref publish_date) = edition.publish_date {
            push_uniq(&mut work.publish_date, publish_date.clone());
            if let Some(capture) = RE_YEAR.captures(publish_date) {
                if let Ok(year) = capture[1].parse::<i32>() {
                    if !work.publish_year.contains(&year) {
                        work.publish_year.push(year);
                    }
                    work.first_publish_year = work.publish_year.iter().min().copied();
                }
            }
        }

        for value in &edition.lccn {
            push_uniq(&mut work.lccn, value.clone());
        }
        for value in &edition.publish_places {
            push_uniq(&mut work.publish_place, value.clone());
        }
        for value in &edition.oclc_numbers {
            push_uniq(&mut work.oclc, value.clone());
        }
        for value in &edition.contributions {
            push_uniq(&mut work.contributor, value.clone());
        }

        if !edition.isbn_10.is_empty() || !edition.isbn_13.is_empty() {
            work.isbns.extend(reconcile(&edition.isbn_10, &edition.isbn_13));
        }

        let last_modified_i = datetimestr_to_int(edition.last_modified.as_ref());
        if last_modified_i > work.last_modified_i {
            work.last_modified_i = last_modified_i;
        }

        if let Some(ref ocaid) = edition.ocaid {
            work.has_fulltext = true;
            work.ebook_count_i += 1;
            push_uniq(&mut work.ia, ocaid.clone());
            work.public_scan_b = work.public_scan_b || edition.public_scan;

            if !edition.ia_collection.is_empty() {
                let mut collections: Vec<String> = work
                    .ia_collection_s
                    .as_deref()
                    .unwrap_or_default()
                    .split(';')
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                for collection in &edition.ia_collection {
                    push_uniq(&mut collections, collection.clone());
                }
                work.ia_collection_s = Some(collections.join(";"));
            }

            // First lending-eligible edition wins; an arbitrary but
            // deliberate tie-break.
            let lending_eligible = edition
                .ia_collection
                .iter()
                .any(|c| c == "lendinglibrary" || c == "inlibrary");
            if work.lending_edition_s.is_none() && lending_eligible {
                work.lending_edition_s = Some(shortkey.clone());
                work.lending_identifier_s = Some(ocaid.clone());
            }

            if edition.ia_collection.iter().any(|c| c == "printdisabled") {
                work.printdisabled_s = Some(match work.printdisabled_s.take() {
                    Some(existing) => format!("{existing};{shortkey}"),
                    None => shortkey.clone(),
                });
            }
        }

        if let Some(ref first_sentence) = edition.first_sentence {
            push_uniq(&mut work.first_sentence, first_sentence.value().to_string());
        }

        for publisher in &edition.publishers {
            let publisher = if is_sine_nomine(publisher) {
                "Sine nomine".to_string()
            } else {
                publisher.clone()
            };
            push_uniq(&mut work.publisher, publisher);
        }

        for language in &edition.languages {
            let code = short_key(language.key()).unwrap_or(language.key()).to_string();
            push_uniq(&mut work.language, code);
        }

        // Identifier namespaces route through the field sanitizer; an
        // invalid namespace drops its ids with a warning, never fatally.
        for (namespace, ids) in &edition.identifiers {
            match sanitize(&format!("id_{namespace}")) {
                Some(field) => {
                    let mut values: Vec<String> = work
                        .extra
                        .get(&field)
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    for id in ids {
                        push_uniq(&mut values, id.trim().to_string());
                    }
                    work.extra.insert(field, Value::from(values));
                }
                None => {
                    tracing::warn!(
                        namespace = %namespace,
                        edition = %shortkey,
                        "Bad identifier name; dropping ids"
                    );
                }
            }
        }

        if let Some(ref value) = edition.ia_loaded_id {
            for id in coerce_string_list(value, "ia_loaded_id", &edition.key) {
                push_uniq(&mut work.ia_loaded_id, id);
            }
        }
        if let Some(ref value) = edition.ia_box_id {
            for id in coerce_string_list(value, "ia_box_id", &edition.key) {
                push_uniq(&mut work.ia_box_id, id);
            }
        }

        push_uniq(&mut work.seed, edition.key.clone());
    }

    /// Choose the edition whose cover represents the work.
    ///
    /// Prefers the edition whose first cover matches the work's own cover
    /// id, else the first English-language edition with a cover, else the
    /// first edition with any cover. The tie-break depends on all
    /// candidates, so this is a second pass over the full edition set,
    /// not an incremental fold.
    pub fn pick_cover_edition(work: &mut WorkAggregate, editions: &[EditionRecord]) {
        let mut first_with_cover: Option<&str> = None;
        let mut first_english: Option<&str> = None;

        for edition in editions.iter().filter(|e| !e.covers.is_empty()) {
            if work.cover_i.is_some() && Some(edition.covers[0]) == work.cover_i {
                work.cover_edition_key = short_key(&edition.key).map(str::to_string);
                return;
            }
            if first_with_cover.is_none() {
                first_with_cover = Some(&edition.key);
            }
            if first_english.is_none()
                && edition.languages.iter().any(|l| l.key() == "/languages/eng")
            {
                first_english = Some(&edition.key);
            }
        }

        if let Some(key) = first_english.or(first_with_cover) {
            work.cover_edition_key = short_key(key).map(str::to_string);
        }
    }
}

/// Inject denormalized author names into a fresh work document by looking
/// up the already-indexed author documents it references.
pub async fn inject_author_names(
    work: &mut WorkAggregate,
    store: &dyn IndexStore,
) -> Result<()> {
    if work.author_key.is_empty() {
        return Ok(());
    }

    let mut request = QueryRequest::new()
        .op(FilterOp::Or)
        .fields(&["key", "name", "alternate_names"]);
    for key in &work.author_key {
        request = request.filter("key", key.clone());
    }
    let response = store.query(&request).await?;

    // Derived wholesale from the index on every call: an aggregate
    // refetched for an incremental fold already carries these fields, and
    // appending to them would duplicate the names on every run.
    let mut author_name = Vec::new();
    let mut author_facet = Vec::new();
    let mut author_alternative_name = Vec::new();

    // Realign by key so author_name stays parallel to author_key even when
    // the store returns documents in a different order.
    for key in &work.author_key {
        let Some(doc) = response
            .docs
            .iter()
            .find(|d| d.get("key").and_then(Value::as_str) == Some(key))
        else {
            continue;
        };
        if let Some(name) = doc.get("name").and_then(Value::as_str) {
            author_name.push(name.to_string());
            author_facet.push(format!("{key} {name}"));
        }
        if let Some(alternates) = doc.get("alternate_names").and_then(Value::as_array) {
            for alternate in alternates.iter().filter_map(Value::as_str) {
                push_uniq(&mut author_alternative_name, alternate.to_string());
            }
        }
    }

    work.author_name = author_name;
    work.author_facet = author_facet;
    work.author_alternative_name = author_alternative_name;
    Ok(())
}
