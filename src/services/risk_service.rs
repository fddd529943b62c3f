//! Risk Alert Service

use crate::db::models::{is_valid_hs_code, Risk};
use crate::db::Db;
use crate::error::{AppError, Result};
use serde::Deserialize;

/// Request body for creating a risk alert
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRiskRequest {
    pub risk_type: String,
    pub severity: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub impact_direction: String,
    pub impact_percentage: f64,
    #[serde(default)]
    pub affected_hs_codes: Vec<String>,
    #[serde(default)]
    pub affected_regions: Vec<String>,
    #[serde(default)]
    pub mitigation_steps: Vec<String>,
}

/// Risk alert service
pub struct RiskService;

impl RiskService {
    /// Risks active on `date`, highest severity first
    pub fn active(db: &Db, date: &str) -> Result<Vec<Risk>> {
        db.get_active_risks(date)
    }

    /// Active risks naming a specific HS code
    pub fn for_hs_code(db: &Db, hs_code: &str, date: &str) -> Result<Vec<Risk>> {
        if !is_valid_hs_code(hs_code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                hs_code
            )));
        }
        db.get_risks_for_hs_code(hs_code, date)
    }

    /// Create a risk alert (admin only, enforced by the API layer)
    pub fn create(db: &Db, req: CreateRiskRequest) -> Result<Risk> {
        for code in &req.affected_hs_codes {
            if !is_valid_hs_code(code) {
                return Err(AppError::Validation(format!(
                    "Invalid affected HS code '{}'",
                    code
                )));
            }
        }

        let mut risk = Risk {
            id: 0,
            risk_type: req.risk_type,
            severity: req.severity,
            title: req.title,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            impact_direction: req.impact_direction,
            impact_percentage: req.impact_percentage,
            affected_hs_codes: req.affected_hs_codes,
            affected_regions: req.affected_regions,
            mitigation_steps: req.mitigation_steps,
        };

        risk.id = db.insert_risk(&risk)?;
        Ok(risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CreateRiskRequest {
        CreateRiskRequest {
            risk_type: "policy".to_string(),
            severity: 4,
            title: "Export restrictions announced".to_string(),
            description: None,
            start_date: "2025-05-01".to_string(),
            end_date: Some("2025-09-01".to_string()),
            impact_direction: "increase".to_string(),
            impact_percentage: 8.0,
            affected_hs_codes: vec!["120190".to_string()],
            affected_regions: vec!["Black Sea".to_string()],
            mitigation_steps: vec!["Shift sourcing".to_string()],
        }
    }

    #[test]
    fn test_create_and_query() {
        let db = Db::open_in_memory().unwrap();
        let created = RiskService::create(&db, sample_request()).unwrap();
        assert!(created.id > 0);

        let active = RiskService::active(&db, "2025-06-01").unwrap();
        assert_eq!(active.len(), 1);

        let by_code = RiskService::for_hs_code(&db, "120190", "2025-06-01").unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].title, "Export restrictions announced");
    }

    #[test]
    fn test_create_rejects_bad_severity() {
        let db = Db::open_in_memory().unwrap();
        let mut req = sample_request();
        req.severity = 0;
        assert!(RiskService::create(&db, req).is_err());
    }

    #[test]
    fn test_create_rejects_bad_affected_code() {
        let db = Db::open_in_memory().unwrap();
        let mut req = sample_request();
        req.affected_hs_codes = vec!["soy".to_string()];
        assert!(matches!(
            RiskService::create(&db, req),
            Err(AppError::Validation(_))
        ));
    }
}
