use crate::record::{VariableRecord, is_zero};

/// What the optimal vertex looks like: degenerate or not, unique or not, and which
/// rows it sits on.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    /// Some basic variable is zero
    pub is_degenerate: bool,
    /// Some nonbasic variable has a zero reduced cost
    pub is_multiple_optima: bool,
    /// Rows whose slack is zero, in slack order
    pub binding_constraints: Vec<String>,
    pub degenerate_variables: Vec<String>,
    pub zero_reduced_cost_variables: Vec<String>,
    /// `(name, is_basic)` for every record
    pub basis: Vec<(String, bool)>,
}

/// Classify an optimal vertex.
///
/// `slack_rows` pairs the position of each slack inside `records` with the name of
/// the row it belongs to. Positions outside `records` are ignored.
pub fn classify(records: &[VariableRecord], slack_rows: &[(usize, String)]) -> Classification {
    let degenerate_variables: Vec<String> = records
        .iter()
        .filter(|r| r.is_basic && is_zero(r.value))
        .map(|r| r.name.clone())
        .collect();

    let zero_reduced_cost_variables: Vec<String> = records
        .iter()
        .filter(|r| !r.is_basic && is_zero(r.reduced_cost))
        .map(|r| r.name.clone())
        .collect();

    let binding_constraints = slack_rows
        .iter()
        .filter(|(pos, _)| records.get(*pos).is_some_and(|r| is_zero(r.value)))
        .map(|(_, row)| row.clone())
        .collect();

    Classification {
        is_degenerate: !degenerate_variables.is_empty(),
        is_multiple_optima: !zero_reduced_cost_variables.is_empty(),
        binding_constraints,
        degenerate_variables,
        zero_reduced_cost_variables,
        basis: records.iter().map(|r| (r.name.clone(), r.is_basic)).collect(),
    }
}
