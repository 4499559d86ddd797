use crate::instance::ProblemDefinition;

/// 2 outlets x 2 slots with identical prices and reach everywhere
pub(crate) fn uniform() -> ProblemDefinition {
    ProblemDefinition {
        capacity: vec![vec![2.0, 2.0], vec![2.0, 2.0]],
        unit_cost: vec![vec![10.0, 10.0], vec![10.0, 10.0]],
        unit_coverage: vec![vec![5.0, 5.0], vec![5.0, 5.0]],
        max_budget: vec![20.0, 20.0],
        min_coverage: 20.0,
        min_slot_spend_fraction: 0.1,
    }
}

/// One outlet whose first slot reaches ten times the audience of the second:
/// the coverage floor forces a deviation of 13 at the optimum
pub(crate) fn lopsided() -> ProblemDefinition {
    ProblemDefinition {
        capacity: vec![vec![2.0, 1.0]],
        unit_cost: vec![vec![10.0, 10.0]],
        unit_coverage: vec![vec![10.0, 1.0]],
        max_budget: vec![30.0],
        min_coverage: 15.0,
        min_slot_spend_fraction: 0.1,
    }
}
