// This file is part of rla-core.

//! Recognized audit configuration options (§6). Process-wide defaults are
//! read-only once constructed, mirroring the teacher's treatment of global
//! service state: initialized before use, never mutated afterwards.

use serde::{Deserialize, Serialize};

/// The only audit type currently supported. Kept as an enum (rather than a
/// bare string) so adding a second method later is a variant, not a string match.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditMethod {
    #[serde(rename = "BRAVO")]
    Bravo,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
    /// Risk limit alpha, expressed as a percent in [1, 20] on the wire, stored as a fraction.
    pub risk_limit: f64,
    /// Non-empty printable seed string for the deterministic sampler.
    pub random_seed: String,
    /// Fixed at 2 per spec; kept as a field rather than a literal so the menu/report
    /// code doesn't special-case it.
    pub audit_board_member_count: u32,
    /// Monte-Carlo trial count for stopping-probability sample sizes.
    pub monte_carlo_trials: u32,
    /// Target stopping probabilities for the planner's menu, e.g. [0.70, 0.80, 0.90].
    pub stopping_probabilities: Vec<f64>,
    pub audit_type: AuditMethod,
}

impl AuditConfig {
    /// Build a config from a risk limit percent (1-20) and seed, using the spec's defaults
    /// for everything else.
    pub fn new(risk_limit_percent: f64, random_seed: impl Into<String>) -> Self {
        AuditConfig {
            risk_limit: risk_limit_percent / 100.0,
            random_seed: random_seed.into(),
            audit_board_member_count: 2,
            monte_carlo_trials: 10_000,
            stopping_probabilities: vec![0.70, 0.80, 0.90],
            audit_type: AuditMethod::Bravo,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::RlaError> {
        if !(0.01..=0.20).contains(&self.risk_limit) {
            return Err(crate::error::RlaError::InputValidation(
                "risk_limit must be a percent between 1 and 20".into(),
            ));
        }
        if self.random_seed.trim().is_empty() {
            return Err(crate::error::RlaError::InputValidation(
                "random_seed must be a non-empty printable string".into(),
            ));
        }
        if self.monte_carlo_trials == 0 {
            return Err(crate::error::RlaError::InputValidation(
                "monte_carlo_trials must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_recognized_options() {
        let config = AuditConfig::new(10.0, "seed");
        assert_eq!(config.audit_board_member_count, 2);
        assert_eq!(config.monte_carlo_trials, 10_000);
        assert_eq!(config.stopping_probabilities, vec![0.70, 0.80, 0.90]);
        assert_eq!(config.audit_type, AuditMethod::Bravo);
        assert!((config.risk_limit - 0.10).abs() < 1e-12);
    }

    #[test]
    fn risk_limit_outside_one_to_twenty_percent_is_rejected() {
        assert!(AuditConfig::new(0.5, "seed").validate().is_err());
        assert!(AuditConfig::new(21.0, "seed").validate().is_err());
        assert!(AuditConfig::new(1.0, "seed").validate().is_ok());
        assert!(AuditConfig::new(20.0, "seed").validate().is_ok());
    }

    #[test]
    fn blank_seed_is_rejected() {
        assert!(AuditConfig::new(10.0, "   ").validate().is_err());
        assert!(AuditConfig::new(10.0, "").validate().is_err());
    }

    #[test]
    fn zero_monte_carlo_trials_is_rejected() {
        let mut config = AuditConfig::new(10.0, "seed");
        config.monte_carlo_trials = 0;
        assert!(config.validate().is_err());
    }
}
