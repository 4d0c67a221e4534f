use super::common::*;

use crate::evaluations::ranking::{
    group_by_framework, rank, RankingColumn, RankingEntry, RankingSort, SortDirection,
};
use crate::evaluations::stored::{StoredRows, UNKNOWN_USER};
use crate::scoring::SubcriterionWeighting;
use crate::store::{
    CriterionRecord, CriterionRowId, EvaluationId, EvaluationRecord, SubcriterionRecord,
    SubcriterionRowId, UserId,
};

const HIGH: &str = "High Priority";
const MEDIUM: &str = "Medium Priority";
const LOW: &str = "Low Priority";

fn entry(framework: &str, score: f64, user: &str, day: u32) -> RankingEntry {
    RankingEntry {
        position: 0,
        evaluation_id: EvaluationId(u64::from(day)),
        framework: framework.to_string(),
        evaluation_name: framework.to_string(),
        average_score: score,
        average_score_display: format!("{score:.2}"),
        owner: UserId(1),
        user: user.to_string(),
        created_at: at(day),
        date: at(day).format("%Y-%m-%d").to_string(),
    }
}

#[test]
fn toggling_the_same_column_alternates_direction() {
    let sort = RankingSort::default();
    assert_eq!(sort.column, RankingColumn::AverageScore);
    assert_eq!(sort.direction, SortDirection::Descending);

    let first = sort.toggle(RankingColumn::Framework);
    assert_eq!(first.direction, SortDirection::Ascending);
    let second = first.toggle(RankingColumn::Framework);
    assert_eq!(second.direction, SortDirection::Descending);
    let third = second.toggle(RankingColumn::Framework);
    assert_eq!(third.direction, SortDirection::Ascending);

    // A descending column clicked again starts over ascending.
    assert_eq!(
        sort.toggle(RankingColumn::AverageScore).direction,
        SortDirection::Ascending
    );
    assert_eq!(
        second.toggle(RankingColumn::User),
        RankingSort {
            column: RankingColumn::User,
            direction: SortDirection::Ascending,
        }
    );
}

#[test]
fn applying_a_sort_renumbers_positions() {
    let mut entries = vec![
        entry("ITIL", 3.5, "Carla", 2),
        entry("COBIT", 4.2, "Ana", 5),
        entry("ISO 27001", 2.1, "Bruno", 1),
    ];

    RankingSort {
        column: RankingColumn::Framework,
        direction: SortDirection::Ascending,
    }
    .apply(&mut entries);
    let order: Vec<(&str, usize)> = entries
        .iter()
        .map(|entry| (entry.framework.as_str(), entry.position))
        .collect();
    assert_eq!(order, vec![("COBIT", 1), ("ISO 27001", 2), ("ITIL", 3)]);

    RankingSort {
        column: RankingColumn::Date,
        direction: SortDirection::Descending,
    }
    .apply(&mut entries);
    assert_eq!(entries[0].framework, "COBIT");
    assert_eq!(entries[2].framework, "ISO 27001");

    RankingSort {
        column: RankingColumn::User,
        direction: SortDirection::Ascending,
    }
    .apply(&mut entries);
    assert_eq!(entries[0].user, "Ana");
    assert_eq!(entries[0].position, 1);
}

#[test]
fn grouping_averages_each_framework() {
    let entries = vec![
        entry("ITIL", 4.0, "Ana", 1),
        entry("COBIT", 3.0, "Ana", 2),
        entry("ITIL", 6.0, "Bruno", 3),
    ];

    let averages = group_by_framework(&entries);
    assert_eq!(averages.len(), 2);
    assert_eq!(averages[0].framework, "ITIL");
    assert_eq!(averages[0].evaluations, 2);
    assert_eq!(averages[0].average_score, 5.0);
    assert_eq!(averages[0].average_score_display, "5.00");
    assert_eq!(averages[0].position, 1);
    assert_eq!(averages[1].framework, "COBIT");
    assert_eq!(averages[1].position, 2);
}

#[test]
fn unknown_stored_labels_weigh_as_low_priority() {
    let rows = stored_rows(
        &[StoredEvaluation {
            id: 1,
            owner: 1,
            framework: "ITIL",
            day: 1,
            criteria: vec![
                ("Critical", vec![(5.0, HIGH)]),
                (HIGH, vec![(2.0, HIGH)]),
            ],
        }],
        vec![user_record(1, "Ana")],
    );

    let entries = rank(&rows, SubcriterionWeighting::Uniform);
    assert_eq!(entries.len(), 1);
    // (5·1 + 2·3) / 4
    assert_eq!(entries[0].average_score, 2.75);
    assert_eq!(entries[0].average_score_display, "2.75");
}

#[test]
fn weighting_mode_changes_criterion_aggregation() {
    let rows = stored_rows(
        &[StoredEvaluation {
            id: 1,
            owner: 1,
            framework: "COBIT",
            day: 1,
            criteria: vec![(MEDIUM, vec![(5.0, HIGH), (1.0, "whatever")])],
        }],
        vec![user_record(1, "Ana")],
    );

    assert_eq!(rank(&rows, SubcriterionWeighting::Uniform)[0].average_score, 3.0);
    // (5·3 + 1·1) / 4
    assert_eq!(
        rank(&rows, SubcriterionWeighting::Prioritized)[0].average_score,
        4.0
    );
}

#[test]
fn rank_orders_best_first_and_keeps_ties_in_submission_order() {
    let rows = stored_rows(
        &[
            StoredEvaluation {
                id: 1,
                owner: 1,
                framework: "ITIL",
                day: 1,
                criteria: vec![(LOW, vec![(3.0, LOW)])],
            },
            StoredEvaluation {
                id: 2,
                owner: 2,
                framework: "COBIT",
                day: 2,
                criteria: vec![(LOW, vec![(5.0, LOW)])],
            },
            StoredEvaluation {
                id: 3,
                owner: 9,
                framework: "ISO 27001",
                day: 3,
                criteria: vec![(LOW, vec![(3.0, LOW)])],
            },
        ],
        vec![user_record(1, "Ana"), user_record(2, "Bruno")],
    );

    let entries = rank(&rows, SubcriterionWeighting::Uniform);
    let order: Vec<(usize, &str)> = entries
        .iter()
        .map(|entry| (entry.position, entry.framework.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "COBIT"), (2, "ITIL"), (3, "ISO 27001")]);
    assert_eq!(entries[2].user, UNKNOWN_USER);
    assert_eq!(entries[0].date, "2024-05-02");
}

#[test]
fn legacy_rows_fall_back_to_the_display_name() {
    let evaluation = EvaluationRecord {
        id: EvaluationId(7),
        owner: UserId(1),
        display_name: "ITIL, COBIT".to_string(),
        frameworks: Vec::new(),
        created_at: at(4),
        snapshot: String::new(),
    };
    let criteria = vec![
        CriterionRecord {
            id: CriterionRowId(1),
            evaluation_id: EvaluationId(7),
            framework: String::new(),
            title: "Cost".to_string(),
            priority: Some(HIGH.to_string()),
            score: 4.0,
        },
        CriterionRecord {
            id: CriterionRowId(2),
            evaluation_id: EvaluationId(7),
            framework: String::new(),
            title: "Support".to_string(),
            priority: None,
            score: 1.0,
        },
    ];
    let subcriteria = vec![SubcriterionRecord {
        id: SubcriterionRowId(1),
        criterion_id: CriterionRowId(1),
        title: "License".to_string(),
        score: 2.0,
        priority: Some(LOW.to_string()),
    }];

    let rows = StoredRows::from_parts(vec![evaluation], criteria, subcriteria, Vec::new());
    let entries = rank(&rows, SubcriterionWeighting::Uniform);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].framework, "ITIL, COBIT");
    // Cost recomputed from its single subcriterion (2.0, weight 3); Support keeps its stored 1.0 (weight 1).
    assert_eq!(entries[0].average_score, 1.75);
}
