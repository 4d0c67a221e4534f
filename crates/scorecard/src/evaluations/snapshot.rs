use serde::{Deserialize, Deserializer, Serialize};

use crate::rubric::{CriterionId, Priority, Score};
use crate::scoring::{self, SubcriterionWeighting};

/// The rubric as answered, serialized into the evaluation record.
///
/// Stored as a JSON array of frameworks so records written by earlier releases keep parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RubricSnapshot {
    pub frameworks: Vec<FrameworkSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSnapshot {
    pub framework_name: String,
    pub criteria: Vec<CriterionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSnapshot {
    pub id: CriterionId,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub weight: Option<Priority>,
    pub subcriteria: Vec<SubcriterionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcriterionSnapshot {
    pub title: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<Score>,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub weight: Option<Priority>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("evaluation data is invalid or missing")]
    Missing,
    #[error("evaluation data is invalid or missing: {0}")]
    Invalid(#[source] serde_json::Error),
    #[error("failed to encode evaluation data: {0}")]
    Encode(#[source] serde_json::Error),
}

impl RubricSnapshot {
    pub fn parse(raw: &str) -> Result<Self, SnapshotError> {
        if raw.trim().is_empty() {
            return Err(SnapshotError::Missing);
        }
        let snapshot: Self = serde_json::from_str(raw).map_err(SnapshotError::Invalid)?;
        if snapshot.frameworks.is_empty() {
            return Err(SnapshotError::Missing);
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    pub fn framework_names(&self) -> Vec<String> {
        self.frameworks
            .iter()
            .map(|framework| framework.framework_name.clone())
            .collect()
    }

    /// Per-framework scores computed from the answers; unanswered subcriteria are skipped.
    pub fn scores(&self, weighting: SubcriterionWeighting) -> Vec<FrameworkScore> {
        self.frameworks
            .iter()
            .map(|framework| framework.score(weighting))
            .collect()
    }
}

impl FrameworkSnapshot {
    pub fn score(&self, weighting: SubcriterionWeighting) -> FrameworkScore {
        let criteria: Vec<CriterionScore> = self
            .criteria
            .iter()
            .map(|criterion| CriterionScore {
                id: criterion.id,
                title: criterion.title.clone(),
                priority: criterion.weight,
                score: criterion.score(weighting),
            })
            .collect();

        let final_score = scoring::final_score(
            criteria
                .iter()
                .map(|criterion| (criterion.score, criterion.priority.map(Priority::label))),
        );

        FrameworkScore {
            framework: self.framework_name.clone(),
            criteria,
            final_score,
        }
    }
}

impl CriterionSnapshot {
    pub fn score(&self, weighting: SubcriterionWeighting) -> f64 {
        scoring::criterion_score(
            self.subcriteria.iter().filter_map(|sub| {
                sub.score
                    .map(|score| (f64::from(score.value()), sub.weight.map(Priority::label)))
            }),
            weighting,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkScore {
    pub framework: String,
    pub criteria: Vec<CriterionScore>,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub id: CriterionId,
    pub title: String,
    pub priority: Option<Priority>,
    pub score: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

/// Accepts `3`, `"3"`, `""` and `null`; earlier releases stored scores as text.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<Score>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawScore>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawScore::Number(value)) => value,
        Some(RawScore::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(serde::de::Error::custom)?
        }
    };

    if value.fract() != 0.0 || !(f64::from(Score::MIN)..=f64::from(Score::MAX)).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "score {value} is outside the 1-5 scale"
        )));
    }

    Score::new(value as u8)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// Unknown or empty labels are treated as unanswered.
fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.as_deref().map(str::trim).and_then(Priority::from_label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_text_scores_and_blank_labels() {
        let raw = r#"[{
            "frameworkName": "COBIT",
            "criteria": [{
                "id": 1, "title": "Cost", "weight": "High Priority",
                "subcriteria": [
                    {"title": "Implementation", "score": "4", "weight": "Medium Priority"},
                    {"title": "License", "score": "", "weight": ""},
                    {"title": "Training", "score": 2, "weight": "Urgent"}
                ]
            }]
        }]"#;

        let snapshot = RubricSnapshot::parse(raw).expect("legacy snapshot parses");
        let criterion = &snapshot.frameworks[0].criteria[0];
        assert_eq!(criterion.weight, Some(Priority::High));
        assert_eq!(criterion.subcriteria[0].score.map(Score::value), Some(4));
        assert_eq!(criterion.subcriteria[1].score, None);
        assert_eq!(criterion.subcriteria[1].weight, None);
        assert_eq!(criterion.subcriteria[2].weight, None);
    }

    #[test]
    fn parse_rejects_garbage_as_invalid_or_missing() {
        assert!(matches!(RubricSnapshot::parse(""), Err(SnapshotError::Missing)));
        assert!(matches!(RubricSnapshot::parse("[]"), Err(SnapshotError::Missing)));
        let err = RubricSnapshot::parse("{not json").expect_err("garbage rejected");
        assert!(matches!(err, SnapshotError::Invalid(_)));
        assert!(err.to_string().contains("invalid or missing"));

        let out_of_scale = r#"[{"frameworkName":"X","criteria":[{"id":1,"title":"Cost","weight":null,
            "subcriteria":[{"title":"License","score":7,"weight":null}]}]}]"#;
        assert!(matches!(
            RubricSnapshot::parse(out_of_scale),
            Err(SnapshotError::Invalid(_))
        ));
    }

    #[test]
    fn scores_skip_unanswered_cells() {
        let snapshot = RubricSnapshot {
            frameworks: vec![FrameworkSnapshot {
                framework_name: "ITIL".to_string(),
                criteria: vec![CriterionSnapshot {
                    id: CriterionId(1),
                    title: "Cost".to_string(),
                    weight: Some(Priority::Medium),
                    subcriteria: vec![
                        SubcriterionSnapshot {
                            title: "Implementation".to_string(),
                            score: Score::new(4).ok(),
                            weight: Some(Priority::High),
                        },
                        SubcriterionSnapshot {
                            title: "License".to_string(),
                            score: None,
                            weight: Some(Priority::High),
                        },
                    ],
                }],
            }],
        };

        let scores = snapshot.scores(SubcriterionWeighting::Prioritized);
        assert_eq!(scores[0].criteria[0].score, 4.0);
        assert_eq!(scores[0].final_score, 4.0);
    }
}
