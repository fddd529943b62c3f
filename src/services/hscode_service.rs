//! HS Code Directory Service

use crate::db::models::{is_valid_hs_code, HsCode};
use crate::db::Db;
use crate::error::{AppError, Result};

const MAX_SEARCH_LIMIT: u32 = 100;
const DEFAULT_SEARCH_LIMIT: u32 = 25;

/// HS code directory service
pub struct HsCodeService;

impl HsCodeService {
    /// Search the directory by code prefix or description substring
    pub fn search(db: &Db, query: &str, limit: Option<u32>) -> Result<Vec<HsCode>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Search query must not be empty".to_string()));
        }

        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
        db.search_hs_codes(query, limit)
    }

    /// Detail lookup; bumps the popularity counter on success
    pub fn detail(db: &Db, code: &str) -> Result<HsCode> {
        if !is_valid_hs_code(code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                code
            )));
        }

        let entry = db
            .get_hs_code(code)?
            .ok_or_else(|| AppError::NotFound(format!("Unknown HS code {}", code)))?;

        db.increment_search_count(code)?;

        // Return the entry with the count it had after this lookup
        Ok(HsCode {
            search_count: entry.search_count + 1,
            ..entry
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Db {
        let db = Db::open_in_memory().unwrap();
        for (code, desc, count) in [
            ("120190", "Soybeans, other than seed", 5),
            ("120110", "Soybean seed", 1),
            ("100199", "Wheat and meslin, other", 0),
        ] {
            db.upsert_hs_code(&HsCode {
                code: code.to_string(),
                description: desc.to_string(),
                section: "II".to_string(),
                chapter: "12".to_string(),
                search_count: count,
            })
            .unwrap();
        }
        db
    }

    #[test]
    fn test_search_by_prefix_popularity_order() {
        let db = setup_db();
        let hits = HsCodeService::search(&db, "1201", None).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].code, "120190"); // higher search_count first
        assert_eq!(hits[1].code, "120110");
    }

    #[test]
    fn test_search_by_description() {
        let db = setup_db();
        let hits = HsCodeService::search(&db, "wheat", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "100199");
    }

    #[test]
    fn test_search_empty_query_rejected() {
        let db = setup_db();
        assert!(HsCodeService::search(&db, "   ", None).is_err());
    }

    #[test]
    fn test_detail_increments_count() {
        let db = setup_db();

        let first = HsCodeService::detail(&db, "100199").unwrap();
        assert_eq!(first.search_count, 1);

        let second = HsCodeService::detail(&db, "100199").unwrap();
        assert_eq!(second.search_count, 2);
    }

    #[test]
    fn test_detail_errors() {
        let db = setup_db();
        assert!(matches!(
            HsCodeService::detail(&db, "999999"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            HsCodeService::detail(&db, "abc"),
            Err(AppError::Validation(_))
        ));
    }
}
