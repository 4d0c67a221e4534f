use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{
    CriterionSnapshot, FrameworkScore, FrameworkSnapshot, RubricSnapshot, SnapshotError,
    SubcriterionSnapshot,
};
use crate::rubric::{
    CriterionId, CriterionTemplate, Priority, RubricTemplate, Score, SUBCRITERIA_PER_CRITERION,
};
use crate::scoring::SubcriterionWeighting;
use crate::store::{NewCriterion, NewEvaluation, NewSubcriterion, UserId};

/// Address of one subcriterion answer inside a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub framework: usize,
    pub criterion: CriterionId,
    pub subcriterion: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAnswer {
    pub score: Option<Score>,
    pub priority: Option<Priority>,
}

/// One structural edit; every other answer in the draft is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftEdit {
    SubcriterionScore {
        framework: usize,
        criterion: CriterionId,
        subcriterion: usize,
        score: Option<Score>,
    },
    SubcriterionPriority {
        framework: usize,
        criterion: CriterionId,
        subcriterion: usize,
        priority: Option<Priority>,
    },
    CriterionPriority {
        framework: usize,
        criterion: CriterionId,
        priority: Option<Priority>,
    },
}

/// Rubric answers for a set of frameworks evaluated together.
///
/// The rubric itself is the static template; the draft only stores what the evaluator
/// has filled in so far.
#[derive(Debug, Clone)]
pub struct EvaluationDraft {
    template: &'static RubricTemplate,
    frameworks: Vec<String>,
    criterion_priorities: HashMap<(usize, CriterionId), Priority>,
    answers: HashMap<CellKey, CellAnswer>,
}

impl EvaluationDraft {
    /// Start an empty draft; names are trimmed, must be non-blank and distinct.
    pub fn new<I, S>(frameworks: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for (position, raw) in frameworks.into_iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(DraftError::BlankFrameworkName { position });
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(DraftError::DuplicateFramework(name.to_string()));
            }
            names.push(name.to_string());
        }

        if names.is_empty() {
            return Err(DraftError::NoFrameworks);
        }

        Ok(Self {
            template: RubricTemplate::standard(),
            frameworks: names,
            criterion_priorities: HashMap::new(),
            answers: HashMap::new(),
        })
    }

    pub fn frameworks(&self) -> &[String] {
        &self.frameworks
    }

    pub fn display_name(&self) -> String {
        self.frameworks.join(", ")
    }

    /// Fill every unset priority, criterion and subcriterion alike, with `priority`.
    pub fn prefill_priorities(&mut self, priority: Priority) {
        for framework in 0..self.frameworks.len() {
            for criterion in self.template.criteria() {
                self.criterion_priorities
                    .entry((framework, criterion.id))
                    .or_insert(priority);
                for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
                    let answer = self
                        .answers
                        .entry(CellKey {
                            framework,
                            criterion: criterion.id,
                            subcriterion,
                        })
                        .or_default();
                    answer.priority.get_or_insert(priority);
                }
            }
        }
    }

    pub fn set_score(&mut self, cell: CellKey, score: Option<Score>) -> Result<(), DraftError> {
        self.check_cell(cell)?;
        self.answers.entry(cell).or_default().score = score;
        Ok(())
    }

    pub fn set_subcriterion_priority(
        &mut self,
        cell: CellKey,
        priority: Option<Priority>,
    ) -> Result<(), DraftError> {
        self.check_cell(cell)?;
        self.answers.entry(cell).or_default().priority = priority;
        Ok(())
    }

    pub fn set_criterion_priority(
        &mut self,
        framework: usize,
        criterion: CriterionId,
        priority: Option<Priority>,
    ) -> Result<(), DraftError> {
        self.check_framework(framework)?;
        self.criterion_template(criterion)?;
        match priority {
            Some(priority) => {
                self.criterion_priorities
                    .insert((framework, criterion), priority);
            }
            None => {
                self.criterion_priorities.remove(&(framework, criterion));
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, edit: DraftEdit) -> Result<(), DraftError> {
        match edit {
            DraftEdit::SubcriterionScore {
                framework,
                criterion,
                subcriterion,
                score,
            } => self.set_score(
                CellKey {
                    framework,
                    criterion,
                    subcriterion,
                },
                score,
            ),
            DraftEdit::SubcriterionPriority {
                framework,
                criterion,
                subcriterion,
                priority,
            } => self.set_subcriterion_priority(
                CellKey {
                    framework,
                    criterion,
                    subcriterion,
                },
                priority,
            ),
            DraftEdit::CriterionPriority {
                framework,
                criterion,
                priority,
            } => self.set_criterion_priority(framework, criterion, priority),
        }
    }

    pub fn answer(&self, cell: CellKey) -> CellAnswer {
        self.answers.get(&cell).copied().unwrap_or_default()
    }

    pub fn criterion_priority(&self, framework: usize, criterion: CriterionId) -> Option<Priority> {
        self.criterion_priorities
            .get(&(framework, criterion))
            .copied()
    }

    /// Every missing priority or score, in rubric order; empty means ready to submit.
    pub fn missing_fields(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (framework_index, framework) in self.frameworks.iter().enumerate() {
            for criterion in self.template.criteria() {
                if self.criterion_priority(framework_index, criterion.id).is_none() {
                    issues.push(ValidationIssue {
                        framework: framework.clone(),
                        criterion: criterion.title.to_string(),
                        subcriterion: None,
                        missing: MissingField::CriterionPriority,
                    });
                }
                for (index, title) in criterion.subcriteria.iter().enumerate() {
                    let answer = self.answer(CellKey {
                        framework: framework_index,
                        criterion: criterion.id,
                        subcriterion: index,
                    });
                    if answer.score.is_none() {
                        issues.push(ValidationIssue {
                            framework: framework.clone(),
                            criterion: criterion.title.to_string(),
                            subcriterion: Some((*title).to_string()),
                            missing: MissingField::Score,
                        });
                    }
                    if answer.priority.is_none() {
                        issues.push(ValidationIssue {
                            framework: framework.clone(),
                            criterion: criterion.title.to_string(),
                            subcriterion: Some((*title).to_string()),
                            missing: MissingField::SubcriterionPriority,
                        });
                    }
                }
            }
        }
        issues
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let issues = self.missing_fields();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// The rubric as currently answered, blanks included.
    pub fn snapshot(&self) -> RubricSnapshot {
        let frameworks = self
            .frameworks
            .iter()
            .enumerate()
            .map(|(framework_index, name)| FrameworkSnapshot {
                framework_name: name.clone(),
                criteria: self
                    .template
                    .criteria()
                    .iter()
                    .map(|criterion| CriterionSnapshot {
                        id: criterion.id,
                        title: criterion.title.to_string(),
                        weight: self.criterion_priority(framework_index, criterion.id),
                        subcriteria: criterion
                            .subcriteria
                            .iter()
                            .enumerate()
                            .map(|(index, title)| {
                                let answer = self.answer(CellKey {
                                    framework: framework_index,
                                    criterion: criterion.id,
                                    subcriterion: index,
                                });
                                SubcriterionSnapshot {
                                    title: (*title).to_string(),
                                    score: answer.score,
                                    weight: answer.priority,
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        RubricSnapshot { frameworks }
    }

    /// Rehydrate a draft; criteria are matched by id, falling back to title for older data.
    pub fn from_snapshot(snapshot: &RubricSnapshot) -> Result<Self, DraftError> {
        let mut draft = Self::new(snapshot.framework_names())?;

        for (framework_index, framework) in snapshot.frameworks.iter().enumerate() {
            for stored in &framework.criteria {
                let template = draft
                    .template
                    .criterion(stored.id)
                    .filter(|template| template.title == stored.title)
                    .or_else(|| draft.template.criterion_by_title(&stored.title))
                    .ok_or(DraftError::UnknownCriterion(stored.id))?;

                if let Some(priority) = stored.weight {
                    draft
                        .criterion_priorities
                        .insert((framework_index, template.id), priority);
                }

                for (index, sub) in stored
                    .subcriteria
                    .iter()
                    .take(SUBCRITERIA_PER_CRITERION)
                    .enumerate()
                {
                    let cell = CellKey {
                        framework: framework_index,
                        criterion: template.id,
                        subcriterion: index,
                    };
                    draft.answers.insert(
                        cell,
                        CellAnswer {
                            score: sub.score,
                            priority: sub.weight,
                        },
                    );
                }
            }
        }

        Ok(draft)
    }

    /// Report-style scores for what has been answered so far.
    pub fn preview(&self) -> Vec<FrameworkScore> {
        self.snapshot().scores(SubcriterionWeighting::Prioritized)
    }

    /// Validate and assemble the complete write for one submission.
    pub fn prepare_submission(
        &self,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<NewEvaluation, SubmissionError> {
        self.validate()?;
        let snapshot = self.snapshot();
        let serialized = snapshot.to_json()?;

        let criteria = snapshot
            .frameworks
            .iter()
            .flat_map(|framework| {
                framework.criteria.iter().map(move |criterion| NewCriterion {
                    framework: framework.framework_name.clone(),
                    title: criterion.title.clone(),
                    priority: label_of(criterion.weight),
                    score: criterion.score(SubcriterionWeighting::Uniform),
                    subcriteria: criterion
                        .subcriteria
                        .iter()
                        .map(|sub| NewSubcriterion {
                            title: sub.title.clone(),
                            score: sub.score.map(|score| f64::from(score.value())).unwrap_or(0.0),
                            priority: label_of(sub.weight),
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(NewEvaluation {
            owner,
            display_name: self.display_name(),
            frameworks: self.frameworks.clone(),
            created_at,
            snapshot: serialized,
            criteria,
        })
    }

    fn check_framework(&self, framework: usize) -> Result<(), DraftError> {
        if framework < self.frameworks.len() {
            Ok(())
        } else {
            Err(DraftError::UnknownFramework(framework))
        }
    }

    fn criterion_template(&self, id: CriterionId) -> Result<&'static CriterionTemplate, DraftError> {
        self.template
            .criterion(id)
            .ok_or(DraftError::UnknownCriterion(id))
    }

    fn check_cell(&self, cell: CellKey) -> Result<(), DraftError> {
        self.check_framework(cell.framework)?;
        self.criterion_template(cell.criterion)?;
        if cell.subcriterion >= SUBCRITERIA_PER_CRITERION {
            return Err(DraftError::UnknownSubcriterion {
                criterion: cell.criterion,
                index: cell.subcriterion,
            });
        }
        Ok(())
    }
}

fn label_of(priority: Option<Priority>) -> String {
    priority.map(Priority::label).unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    CriterionPriority,
    Score,
    SubcriterionPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub framework: String,
    pub criterion: String,
    pub subcriterion: Option<String>,
    pub missing: MissingField,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.subcriterion, self.missing) {
            (None, _) | (_, MissingField::CriterionPriority) => write!(
                f,
                "Please select the weight for the criterion: {} ({})",
                self.criterion, self.framework
            ),
            (Some(subcriterion), MissingField::Score) => write!(
                f,
                "Please fill in the score of {} / {} for {}.",
                self.criterion, subcriterion, self.framework
            ),
            (Some(subcriterion), MissingField::SubcriterionPriority) => write!(
                f,
                "Please fill in the weight of {} / {} for {}.",
                self.criterion, subcriterion, self.framework
            ),
        }
    }
}

/// Incomplete rubric; nothing is persisted while this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("evaluation is incomplete: {} field(s) missing", .issues.len())]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("select at least one framework to evaluate")]
    NoFrameworks,
    #[error("framework name at position {} is blank", .position + 1)]
    BlankFrameworkName { position: usize },
    #[error("framework {0} is listed more than once")]
    DuplicateFramework(String),
    #[error("framework index {0} is not part of this evaluation")]
    UnknownFramework(usize),
    #[error("criterion {0} is not part of the rubric")]
    UnknownCriterion(CriterionId),
    #[error("criterion {criterion} has no subcriterion at index {index}")]
    UnknownSubcriterion { criterion: CriterionId, index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Incomplete(#[from] ValidationError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
