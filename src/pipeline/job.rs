use mongodb::bson::{doc, oid::ObjectId, Document};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use super::params::PageSort;
use super::{lookup, paged_facet, substring_match, unwind_preserve};

const JOB_SORTS: &[&str] = &["created_at", "updated_at", "title", "location", "salary.min"];

/// Raw query string of the job listing endpoints. Everything is optional
/// and loosely typed; conversion into the typed specs below happens once.
#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct JobListQuery {
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_salary: Option<String>,
    pub max_salary: Option<String>,
    pub status: Option<String>,
    pub include_deleted: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Admin `status` shorthand. "pending" and "approved" expand to compound
/// predicates over both the flag and the status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Approved,
    Rejected,
}

impl StatusFilter {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(StatusFilter::Pending),
            "approved" => Some(StatusFilter::Approved),
            "rejected" => Some(StatusFilter::Rejected),
            _ => None,
        }
    }

    fn apply(self, match_stage: &mut Document) {
        match self {
            StatusFilter::Pending => {
                match_stage.insert("is_verified", false);
                match_stage.insert("status", "pending");
            }
            StatusFilter::Approved => {
                match_stage.insert("is_verified", true);
                match_stage.insert("status", "approved");
            }
            StatusFilter::Rejected => {
                match_stage.insert("status", "rejected");
            }
        }
    }
}

/// Filters shared by the public and admin job listings.
#[derive(Debug, Clone)]
pub struct JobFilters {
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
}

impl JobFilters {
    fn from_query(query: &JobListQuery) -> Self {
        JobFilters {
            location: query.location.clone(),
            job_type: query.job_type.clone(),
            category: query.category.clone(),
            search: query.search.clone(),
            min_salary: query.min_salary.as_deref().and_then(|s| s.parse().ok()),
            max_salary: query.max_salary.as_deref().and_then(|s| s.parse().ok()),
        }
    }

    fn apply(&self, match_stage: &mut Document) {
        if let Some(ref location) = self.location {
            match_stage.insert("location", location);
        }
        if let Some(ref job_type) = self.job_type {
            match_stage.insert("job_type", job_type);
        }
        if let Some(ref category) = self.category {
            match_stage.insert("category", category);
        }
        if let Some(ref search) = self.search {
            match_stage.insert(
                "$or",
                vec![
                    substring_match("title", search),
                    substring_match("description", search),
                ],
            );
        }
        if let Some(min) = self.min_salary {
            match_stage.insert("salary.min", doc! { "$gte": min });
        }
        if let Some(max) = self.max_salary {
            match_stage.insert("salary.max", doc! { "$lte": max });
        }
    }
}

/// Public listing: callers can never see deleted or unverified jobs,
/// whatever they put in the query string.
pub struct PublicJobListSpec {
    pub filters: JobFilters,
    pub page_sort: PageSort,
}

impl From<JobListQuery> for PublicJobListSpec {
    fn from(query: JobListQuery) -> Self {
        let page_sort = PageSort::resolve(
            query.page.as_deref(),
            query.limit.as_deref(),
            query.sort_by.as_deref(),
            query.order.as_deref(),
            JOB_SORTS,
        );
        PublicJobListSpec {
            filters: JobFilters::from_query(&query),
            page_sort,
        }
    }
}

impl PublicJobListSpec {
    pub fn pipeline(&self) -> Vec<Document> {
        let mut match_stage = doc! {
            "is_deleted": false,
            "is_verified": true,
        };
        self.filters.apply(&mut match_stage);

        vec![
            doc! { "$match": match_stage },
            lookup("companies", "company", "_id", "company"),
            unwind_preserve("company"),
            lookup("users", "posted_by", "_id", "posted_by"),
            unwind_preserve("posted_by"),
            paged_facet(
                &self.page_sort,
                doc! {
                    "title": 1,
                    "location": 1,
                    "job_type": 1,
                    "category": 1,
                    "salary": 1,
                    "created_at": 1,
                    "company": { "display_name": 1, "logo": 1 },
                    "posted_by": { "name": 1, "profile_pic": 1 },
                },
            ),
        ]
    }
}

/// Admin listing: sees pending/rejected records, optionally deleted ones,
/// and each job's applicant count.
pub struct AdminJobListSpec {
    pub filters: JobFilters,
    pub status: Option<StatusFilter>,
    pub include_deleted: bool,
    pub page_sort: PageSort,
}

impl From<JobListQuery> for AdminJobListSpec {
    fn from(query: JobListQuery) -> Self {
        let page_sort = PageSort::resolve(
            query.page.as_deref(),
            query.limit.as_deref(),
            query.sort_by.as_deref(),
            query.order.as_deref(),
            JOB_SORTS,
        );
        AdminJobListSpec {
            status: query.status.as_deref().and_then(StatusFilter::parse),
            include_deleted: query.include_deleted.as_deref() == Some("true"),
            filters: JobFilters::from_query(&query),
            page_sort,
        }
    }
}

impl AdminJobListSpec {
    pub fn pipeline(&self) -> Vec<Document> {
        let mut match_stage = Document::new();
        if !self.include_deleted {
            match_stage.insert("is_deleted", false);
        }
        if let Some(status) = self.status {
            status.apply(&mut match_stage);
        }
        self.filters.apply(&mut match_stage);

        vec![
            doc! { "$match": match_stage },
            lookup("companies", "company", "_id", "company"),
            unwind_preserve("company"),
            lookup("users", "posted_by", "_id", "posted_by"),
            unwind_preserve("posted_by"),
            lookup("applications", "_id", "job", "applications"),
            doc! { "$addFields": { "applicant_count": { "$size": "$applications" } } },
            paged_facet(
                &self.page_sort,
                doc! {
                    "title": 1,
                    "description": 1,
                    "location": 1,
                    "job_type": 1,
                    "category": 1,
                    "salary": 1,
                    "skills": 1,
                    "requirements": 1,
                    "created_at": 1,
                    "updated_at": 1,
                    "is_verified": 1,
                    "is_deleted": 1,
                    "deleted_at": 1,
                    "status": 1,
                    "verified_by": 1,
                    "verified_at": 1,
                    "applicant_count": 1,
                    "company": { "_id": 1, "display_name": 1, "logo": 1, "verified": 1 },
                    "posted_by": { "_id": 1, "name": 1, "email": 1, "profile_pic": 1 },
                },
            ),
        ]
    }
}

/// A recruiter's own postings with applicant counts, newest first.
pub fn recruiter_jobs_pipeline(recruiter_id: ObjectId) -> Vec<Document> {
    vec![
        doc! { "$match": { "posted_by": recruiter_id, "is_deleted": false } },
        lookup("companies", "company", "_id", "company"),
        unwind_preserve("company"),
        lookup("applications", "_id", "job", "applications"),
        doc! { "$addFields": { "applicant_count": { "$size": "$applications" } } },
        doc! {
            "$project": {
                "title": 1,
                "location": 1,
                "job_type": 1,
                "salary": 1,
                "created_at": 1,
                "is_verified": 1,
                "status": 1,
                "company.display_name": 1,
                "company.logo": 1,
                "applicant_count": 1,
            }
        },
        doc! { "$sort": { "created_at": -1 } },
    ]
}

/// Moderation dashboard counters, all from one snapshot.
pub fn job_stats_pipeline() -> Vec<Document> {
    vec![doc! {
        "$facet": {
            "total": [ { "$count": "count" } ],
            "verified": [ { "$match": { "is_verified": true } }, { "$count": "count" } ],
            "pending": [
                { "$match": { "is_verified": false, "status": "pending" } },
                { "$count": "count" },
            ],
            "rejected": [ { "$match": { "status": "rejected" } }, { "$count": "count" } ],
            "deleted": [ { "$match": { "is_deleted": true } }, { "$count": "count" } ],
            "active": [
                { "$match": { "is_deleted": false, "is_verified": true } },
                { "$count": "count" },
            ],
        }
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_query() -> JobListQuery {
        JobListQuery {
            location: None,
            job_type: None,
            category: None,
            search: None,
            min_salary: None,
            max_salary: None,
            status: None,
            include_deleted: None,
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
    fn public_listing_always_excludes_deleted_and_unverified() {
        let spec = PublicJobListSpec::from(empty_query());
        let m = match_stage(&spec.pipeline());
        assert_eq!(m.get_bool("is_deleted").unwrap(), false);
        assert_eq!(m.get_bool("is_verified").unwrap(), true);
    }

    #[test]
    fn public_listing_ignores_include_deleted_parameter() {
        let mut query = empty_query();
        query.include_deleted = Some("true".into());
        let spec = PublicJobListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        // the hard filter survives whatever the caller sent
        assert_eq!(m.get_bool("is_deleted").unwrap(), false);
        assert_eq!(m.get_bool("is_verified").unwrap(), true);
    }

    #[test]
    fn search_matches_title_and_description() {
        let mut query = empty_query();
        query.search = Some("rust".into());
        let spec = PublicJobListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        let or = m.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
        let title = or[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), "rust");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn exact_filters_and_salary_bounds_land_in_match() {
        let mut query = empty_query();
        query.location = Some("Pune".into());
        query.job_type = Some("full-time".into());
        query.min_salary = Some("30000".into());
        query.max_salary = Some("junk".into()); // invalid → dropped
        let spec = PublicJobListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        assert_eq!(m.get_str("location").unwrap(), "Pune");
        assert_eq!(m.get_str("job_type").unwrap(), "full-time");
        assert_eq!(
            m.get_document("salary.min").unwrap().get_i64("$gte").unwrap(),
            30000
        );
        assert!(m.get_document("salary.max").is_err());
    }

    #[test]
    fn admin_status_shorthand_expands_to_compound_predicates() {
        for (raw, verified, status) in [
            ("pending", Some(false), "pending"),
            ("approved", Some(true), "approved"),
            ("rejected", None, "rejected"),
        ] {
            let mut query = empty_query();
            query.status = Some(raw.into());
            let spec = AdminJobListSpec::from(query);
            let m = match_stage(&spec.pipeline());
            assert_eq!(m.get_str("status").unwrap(), status, "for {}", raw);
            match verified {
                Some(v) => assert_eq!(m.get_bool("is_verified").unwrap(), v, "for {}", raw),
                None => assert!(m.get_bool("is_verified").is_err(), "for {}", raw),
            }
        }
    }

    #[test]
    fn admin_listing_hides_deleted_unless_asked() {
        let spec = AdminJobListSpec::from(empty_query());
        let m = match_stage(&spec.pipeline());
        assert_eq!(m.get_bool("is_deleted").unwrap(), false);

        let mut query = empty_query();
        query.include_deleted = Some("true".into());
        let spec = AdminJobListSpec::from(query);
        let m = match_stage(&spec.pipeline());
        assert!(m.get_bool("is_deleted").is_err());
    }

    #[test]
    fn unknown_status_shorthand_is_ignored() {
        let mut query = empty_query();
        query.status = Some("archived".into());
        let spec = AdminJobListSpec::from(query);
        assert!(spec.status.is_none());
    }

    #[test]
    fn admin_pipeline_counts_applicants_before_facet() {
        let spec = AdminJobListSpec::from(empty_query());
        let pipeline = spec.pipeline();
        let add_fields = pipeline
            .iter()
            .find(|stage| stage.contains_key("$addFields"))
            .expect("applicant count stage");
        let count = add_fields
            .get_document("$addFields")
            .unwrap()
            .get_document("applicant_count")
            .unwrap();
        assert_eq!(count.get_str("$size").unwrap(), "$applications");
    }

    #[test]
    fn recruiter_pipeline_scopes_to_owner() {
        let id = ObjectId::new();
        let pipeline = recruiter_jobs_pipeline(id);
        let m = pipeline[0].get_document("$match").unwrap();
        assert_eq!(m.get_object_id("posted_by").unwrap(), id);
        assert_eq!(m.get_bool("is_deleted").unwrap(), false);
    }
}
