//! Aggregation pipeline builders for the listing endpoints.
//!
//! Each listing endpoint converts its raw query parameters once into a typed
//! query value, and a pure builder turns that value into the pipeline
//! stages. Results and the total count come out of a single `$facet` stage,
//! so the count always matches the filtered set the page was cut from.

pub mod params;
pub mod job;
pub mod company;
pub mod user;

pub use params::{PageSort, SortOrder};

use mongodb::bson::{doc, Document};

use crate::db::DbConn;

/// Case-insensitive substring predicate over one field.
pub fn substring_match(field: &str, needle: &str) -> Document {
    doc! { field: { "$regex": regex::escape(needle), "$options": "i" } }
}

pub fn lookup(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Document {
    doc! {
        "$lookup": {
            "from": from,
            "localField": local_field,
            "foreignField": foreign_field,
            "as": as_field,
        }
    }
}

/// Left-outer unwind: a dangling reference leaves the field null instead of
/// dropping the row.
pub fn unwind_preserve(path: &str) -> Document {
    doc! {
        "$unwind": {
            "path": format!("${}", path),
            "preserveNullAndEmptyArrays": true,
        }
    }
}

/// The `$facet` stage shared by all paged listings: `metadata` carries the
/// total count of the filtered set, `items` the requested window.
pub fn paged_facet(page_sort: &PageSort, projection: Document) -> Document {
    doc! {
        "$facet": {
            "metadata": [ { "$count": "total" } ],
            "items": [
                { "$sort": page_sort.sort_doc() },
                { "$skip": page_sort.skip() },
                { "$limit": page_sort.limit },
                { "$project": projection },
            ],
        }
    }
}

/// One page of results plus the matching total.
pub struct PagedResult {
    pub total: i64,
    pub items: Vec<Document>,
}

/// Runs a `$facet` pipeline and unpacks `{metadata, items}`.
pub async fn run_paged(
    db: &DbConn,
    collection: &str,
    pipeline: Vec<Document>,
) -> Result<PagedResult, mongodb::error::Error> {
    let mut cursor = db
        .collection::<Document>(collection)
        .aggregate(pipeline, None)
        .await?;

    if !cursor.advance().await? {
        return Ok(PagedResult { total: 0, items: Vec::new() });
    }

    let result = cursor.deserialize_current()?;
    Ok(unpack_facet(&result))
}

fn unpack_facet(result: &Document) -> PagedResult {
    let total = result
        .get_array("metadata")
        .ok()
        .and_then(|meta| meta.first())
        .and_then(|entry| entry.as_document())
        .map(count_field)
        .unwrap_or(0);

    let items = result
        .get_array("items")
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.as_document().cloned())
                .collect()
        })
        .unwrap_or_default();

    PagedResult { total, items }
}

// $count yields an i32; be tolerant of either width.
fn count_field(d: &Document) -> i64 {
    d.get_i64("total")
        .or_else(|_| d.get_i32("total").map(i64::from))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::bson;

    #[test]
    fn substring_match_escapes_regex_metacharacters() {
        let m = substring_match("title", "c++ (senior)");
        let inner = m.get_document("title").unwrap();
        assert_eq!(inner.get_str("$regex").unwrap(), r"c\+\+ \(senior\)");
        assert_eq!(inner.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn unwind_preserves_missing_references() {
        let stage = unwind_preserve("company");
        let inner = stage.get_document("$unwind").unwrap();
        assert_eq!(inner.get_str("path").unwrap(), "$company");
        assert!(inner.get_bool("preserveNullAndEmptyArrays").unwrap());
    }

    #[test]
    fn facet_window_uses_skip_and_limit() {
        let ps = PageSort::resolve(Some("2"), Some("10"), None, None, &["created_at"]);
        let stage = paged_facet(&ps, doc! { "title": 1 });
        let items = stage
            .get_document("$facet")
            .unwrap()
            .get_array("items")
            .unwrap();
        assert_eq!(items[1], bson!({ "$skip": 10_i64 }));
        assert_eq!(items[2], bson!({ "$limit": 10_i64 }));
    }

    #[test]
    fn unpack_reads_count_and_items() {
        let result = doc! {
            "metadata": [ { "total": 42_i32 } ],
            "items": [ { "title": "a" }, { "title": "b" } ],
        };
        let page = unpack_facet(&result);
        assert_eq!(page.total, 42);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn empty_facet_means_zero_total() {
        let page = unpack_facet(&doc! { "metadata": [], "items": [] });
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }
}
