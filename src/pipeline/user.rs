use mongodb::bson::{doc, Document};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use super::params::PageSort;
use super::{lookup, paged_facet, substring_match, unwind_preserve};

const USER_SORTS: &[&str] = &["created_at", "updated_at", "name", "email", "role"];

#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Admin user listing spec. The projection never includes the password hash.
pub struct UserListSpec {
    pub role: Option<String>,
    pub search: Option<String>,
    pub page_sort: PageSort,
}

impl From<UserListQuery> for UserListSpec {
    fn from(query: UserListQuery) -> Self {
        let page_sort = PageSort::resolve(
            query.page.as_deref(),
            query.limit.as_deref(),
            query.sort_by.as_deref(),
            query.order.as_deref(),
            USER_SORTS,
        );
        UserListSpec {
            role: query.role,
            search: query.search,
            page_sort,
        }
    }
}

impl UserListSpec {
    pub fn pipeline(&self) -> Vec<Document> {
        let mut match_stage = doc! { "is_deleted": false };
        if let Some(ref role) = self.role {
            match_stage.insert("role", role);
        }
        if let Some(ref search) = self.search {
            match_stage.insert(
                "$or",
                vec![
                    substring_match("name", search),
                    substring_match("email", search),
                ],
            );
        }

        vec![
            doc! { "$match": match_stage },
            lookup("companies", "company", "_id", "company"),
            unwind_preserve("company"),
            paged_facet(
                &self.page_sort,
                doc! {
                    "name": 1,
                    "email": 1,
                    "role": 1,
                    "profile_pic": 1,
                    "is_suspended": 1,
                    "created_at": 1,
                    "company": { "display_name": 1, "logo": 1 },
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_query() -> UserListQuery {
        UserListQuery {
            role: None,
            search: None,
            sort_by: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn deleted_users_never_listed() {
        let spec = UserListSpec::from(empty_query());
        let pipeline = spec.pipeline();
        let m = pipeline[0].get_document("$match").unwrap();
        assert_eq!(m.get_bool("is_deleted").unwrap(), false);
    }

    #[test]
    fn role_filter_and_search_combine() {
        let mut query = empty_query();
        query.role = Some("recruiter".into());
        query.search = Some("smith".into());
        let spec = UserListSpec::from(query);
        let pipeline = spec.pipeline();
        let m = pipeline[0].get_document("$match").unwrap();
        assert_eq!(m.get_str("role").unwrap(), "recruiter");
        assert_eq!(m.get_array("$or").unwrap().len(), 2);
    }

    #[test]
    fn projection_excludes_password() {
        let spec = UserListSpec::from(empty_query());
        let pipeline = spec.pipeline();
        let facet = pipeline.last().unwrap().get_document("$facet").unwrap();
        let items = facet.get_array("items").unwrap();
        let project = items
            .last()
            .and_then(|s| s.as_document())
            .and_then(|s| s.get_document("$project").ok())
            .expect("projection stage");
        assert!(!project.contains_key("password"));
    }
}
