use super::domain::CriterionId;
use serde::Serialize;

pub const SUBCRITERIA_PER_CRITERION: usize = 5;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CriterionTemplate {
    pub id: CriterionId,
    pub title: &'static str,
    pub subcriteria: [&'static str; SUBCRITERIA_PER_CRITERION],
}

/// The fixed evaluation rubric shared by every evaluation.
#[derive(Debug, Serialize)]
pub struct RubricTemplate {
    criteria: &'static [CriterionTemplate],
}

static STANDARD: RubricTemplate = RubricTemplate {
    criteria: &STANDARD_CRITERIA,
};

impl RubricTemplate {
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    pub fn criteria(&self) -> &'static [CriterionTemplate] {
        self.criteria
    }

    pub fn criterion(&self, id: CriterionId) -> Option<&'static CriterionTemplate> {
        self.criteria.iter().find(|criterion| criterion.id == id)
    }

    pub fn criterion_by_title(&self, title: &str) -> Option<&'static CriterionTemplate> {
        self.criteria
            .iter()
            .find(|criterion| criterion.title == title)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

static STANDARD_CRITERIA: [CriterionTemplate; 12] = [
    CriterionTemplate {
        id: CriterionId(1),
        title: "Cost",
        subcriteria: [
            "Implementation",
            "License",
            "Training",
            "Maintenance",
            "Consulting",
        ],
    },
    CriterionTemplate {
        id: CriterionId(2),
        title: "Information Security",
        subcriteria: [
            "Data Protection",
            "Intrusion Detection",
            "Incident Response",
            "Recovery",
            "Prevention",
        ],
    },
    CriterionTemplate {
        id: CriterionId(3),
        title: "Efficiency",
        subcriteria: [
            "Resource Optimization",
            "Response Time",
            "Automation",
            "Scalability",
            "Integration",
        ],
    },
    CriterionTemplate {
        id: CriterionId(4),
        title: "Performance",
        subcriteria: [
            "Effectiveness of Security Measures",
            "Threat Detection Rate",
            "Risk Mitigation",
            "Impact on Operation",
            "Recovery Time",
        ],
    },
    CriterionTemplate {
        id: CriterionId(5),
        title: "Complexity",
        subcriteria: [
            "Ease of Implementation",
            "Learning Curve",
            "Technical Requirements",
            "Compatibility with Existing Systems",
            "Maintenance Complexity",
        ],
    },
    CriterionTemplate {
        id: CriterionId(6),
        title: "Flexibility/Adaptability",
        subcriteria: [
            "Adaptation to Different Sectors",
            "Customization",
            "Scalability",
            "Integration with Other Tools",
            "Configuration Adjustments",
        ],
    },
    CriterionTemplate {
        id: CriterionId(7),
        title: "Compliance",
        subcriteria: [
            "Regulation",
            "Internal Policies",
            "Audit",
            "Reports",
            "Certification",
        ],
    },
    CriterionTemplate {
        id: CriterionId(8),
        title: "Support and Documentation",
        subcriteria: [
            "Documentation Quality",
            "Technical Support Availability",
            "User Community",
            "Learning Resources",
            "Documentation Updates",
        ],
    },
    CriterionTemplate {
        id: CriterionId(9),
        title: "Scalability",
        subcriteria: [
            "Growth Capacity",
            "Large-Scale Performance",
            "Expansion Flexibility",
            "Growth Management",
            "Support for Multinationals",
        ],
    },
    CriterionTemplate {
        id: CriterionId(10),
        title: "Community and Adoption",
        subcriteria: [
            "Popularity",
            "Community Feedback",
            "Real Usage Examples",
            "Collaborations and Partnerships",
            "Continuous Development",
        ],
    },
    CriterionTemplate {
        id: CriterionId(11),
        title: "Integration with Other Tools",
        subcriteria: [
            "Compatibility",
            "APIs and Connectors",
            "Interoperability",
            "Ease of Integration",
            "Support for Open Standards",
        ],
    },
    CriterionTemplate {
        id: CriterionId(12),
        title: "Innovation and Update",
        subcriteria: [
            "Update Frequency",
            "Incorporation of New Technologies",
            "Research and Development",
            "Market Feedback",
            "Continuous Improvements",
        ],
    },
];
