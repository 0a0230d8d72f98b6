use serde::Serialize;

use crate::config::RiskSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category sizes the assessment looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskInputs {
    pub modified_config_methods: usize,
    pub new_public_api: usize,
    pub internal_with_impact: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub rationale: String,
}

/// Map category counts to a risk level. First matching rule wins.
pub fn assess(inputs: RiskInputs, thresholds: &RiskSection) -> RiskAssessment {
    if inputs.modified_config_methods >= thresholds.modified_config_methods_high {
        return RiskAssessment {
            level: RiskLevel::High,
            rationale: format!(
                "{} modified config methods (threshold {})",
                inputs.modified_config_methods, thresholds.modified_config_methods_high
            ),
        };
    }
    if inputs.new_public_api >= thresholds.new_public_api_medium {
        return RiskAssessment {
            level: RiskLevel::Medium,
            rationale: format!(
                "{} new public API methods (threshold {})",
                inputs.new_public_api, thresholds.new_public_api_medium
            ),
        };
    }
    if inputs.internal_with_impact >= thresholds.internal_with_impact_medium {
        return RiskAssessment {
            level: RiskLevel::Medium,
            rationale: format!(
                "{} internal changes with impact (threshold {})",
                inputs.internal_with_impact, thresholds.internal_with_impact_medium
            ),
        };
    }
    RiskAssessment {
        level: RiskLevel::Low,
        rationale: "no risk threshold reached".to_string(),
    }
}
