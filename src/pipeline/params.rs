use mongodb::bson::{doc, Document};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_SORT: &str = "created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn direction(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Validated pagination + sort window. Raw query strings are parsed once
/// here; anything malformed falls back to the default instead of erroring,
/// so a listing endpoint never 400s on a bad `page`.
#[derive(Debug, Clone)]
pub struct PageSort {
    pub page: i64,
    pub limit: i64,
    pub sort_by: String,
    pub order: SortOrder,
}

impl PageSort {
    pub fn resolve(
        page: Option<&str>,
        limit: Option<&str>,
        sort_by: Option<&str>,
        order: Option<&str>,
        allowed_sorts: &[&str],
    ) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE);

        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        let sort_by = sort_by
            .filter(|s| allowed_sorts.contains(s))
            .unwrap_or(DEFAULT_SORT)
            .to_string();

        let order = match order {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        PageSort { page, limit, sort_by, order }
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn sort_doc(&self) -> Document {
        doc! { &self.sort_by: self.order.direction() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTS: &[&str] = &["created_at", "title"];

    #[test]
    fn defaults_apply_when_absent() {
        let ps = PageSort::resolve(None, None, None, None, SORTS);
        assert_eq!(ps.page, 1);
        assert_eq!(ps.limit, 10);
        assert_eq!(ps.sort_by, "created_at");
        assert_eq!(ps.order, SortOrder::Desc);
        assert_eq!(ps.skip(), 0);
    }

    #[test]
    fn invalid_values_fail_closed_to_defaults() {
        let ps = PageSort::resolve(
            Some("banana"),
            Some("-3"),
            Some("password"),
            Some("sideways"),
            SORTS,
        );
        assert_eq!(ps.page, 1);
        assert_eq!(ps.limit, 10);
        assert_eq!(ps.sort_by, "created_at");
        assert_eq!(ps.order, SortOrder::Desc);
    }

    #[test]
    fn zero_page_falls_back_to_one() {
        let ps = PageSort::resolve(Some("0"), None, None, None, SORTS);
        assert_eq!(ps.page, 1);
    }

    #[test]
    fn limit_is_capped() {
        let ps = PageSort::resolve(None, Some("5000"), None, None, SORTS);
        assert_eq!(ps.limit, MAX_LIMIT);
    }

    #[test]
    fn skip_is_page_window_arithmetic() {
        let ps = PageSort::resolve(Some("3"), Some("25"), None, None, SORTS);
        assert_eq!(ps.skip(), 50);
        assert_eq!(ps.limit, 25);
    }

    #[test]
    fn asc_and_desc_negate_each_other() {
        let asc = PageSort::resolve(None, None, Some("title"), Some("asc"), SORTS);
        let desc = PageSort::resolve(None, None, Some("title"), Some("desc"), SORTS);
        assert_eq!(asc.sort_doc().get_i32("title").unwrap(), 1);
        assert_eq!(desc.sort_doc().get_i32("title").unwrap(), -1);
    }
}
