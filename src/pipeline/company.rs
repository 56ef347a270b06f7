use mongodb::bson::{doc, Document};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use super::params::PageSort;
use super::{lookup, paged_facet, substring_match, unwind_preserve};

const COMPANY_SORTS: &[&str] = &["created_at", "updated_at", "name"];

#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct CompanyListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub verified: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Admin company listing spec.
pub struct CompanyListSpec {
    pub search: Option<String>,
    pub status: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub verified: Option<bool>,
    pub page_sort: PageSort,
}

impl From<CompanyListQuery> for CompanyListSpec {
    fn from(query: CompanyListQuery) -> Self {
        let page_sort = PageSort::resolve(
            query.page.as_deref(),
            query.limit.as_deref(),
            query.sort_by.as_deref(),
            query.order.as_deref(),
            COMPANY_SORTS,
        );
        CompanyListSpec {
            search: query.search,
            status: query.status,
            industry: query.industry,
            location: query.location,
            verified: match query.verified.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            page_sort,
        }
    }
}

impl CompanyListSpec {
    pub fn pipeline(&self) -> Vec<Document> {
        let mut match_stage = doc! { "is_deleted": { "$ne": true } };
        if let Some(ref search) = self.search {
            if let Some(predicate) = substring_match("name", search).get("name") {
                match_stage.insert("name", predicate.clone());
            }
        }
        if let Some(ref status) = self.status {
            match_stage.insert("status", status);
        }
        if let Some(ref industry) = self.industry {
            match_stage.insert("industry", industry);
        }
        if let Some(ref location) = self.location {
            match_stage.insert("location", location);
        }
        if let Some(verified) = self.verified {
            match_stage.insert("verified", verified);
        }

        vec![
            doc! { "$match": match_stage },
            lookup("users", "created_by", "_id", "created_by"),
            unwind_preserve("created_by"),
            lookup("users", "recruiters", "_id", "recruiters"),
            paged_facet(
                &self.page_sort,
                doc! {
                    "name": 1,
                    "display_name": 1,
                    "location": 1,
                    "industry": 1,
                    "logo": 1,
                    "status": 1,
                    "verified": 1,
                    "created_at": 1,
                    "updated_at": 1,
                    "created_by": { "name": 1, "email": 1, "profile_pic": 1 },
                    "recruiters": { "name": 1, "email": 1, "profile_pic": 1 },
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_query() -> CompanyListQuery {
        CompanyListQuery {
            search: None,
            status: None,
            industry: None,
            location: None,
            verified: None,
            sort_by: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    fn match_stage(pipeline: &[Document]) -> Document {
        pipeline[0].get_document("$match").unwrap().clone()
    }

    #[test]
    fn deleted_companies_are_always_excluded() {
        let spec = CompanyListSpec::from(empty_query());
        let m = match_stage(&spec.pipeline());
        let ne = m.get_document("is_deleted").unwrap();
        assert_eq!(ne.get_bool("$ne").unwrap(), true);
    }

    #[test]
    fn search_is_case_insensitive_substring_on_name() {
        let mut query = empty_query();
        query.search = Some("acme".into());
        let spec = CompanyListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        let name = m.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "acme");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn exact_filters_apply() {
        let mut query = empty_query();
        query.status = Some("pending".into());
        query.industry = Some("fintech".into());
        query.verified = Some("false".into());
        let spec = CompanyListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        assert_eq!(m.get_str("status").unwrap(), "pending");
        assert_eq!(m.get_str("industry").unwrap(), "fintech");
        assert_eq!(m.get_bool("verified").unwrap(), false);
    }

    #[test]
    fn malformed_verified_flag_is_dropped() {
        let mut query = empty_query();
        query.verified = Some("yes".into());
        let spec = CompanyListSpec::from(query);
        assert!(spec.verified.is_none());
    }
}
