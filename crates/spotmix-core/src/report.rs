use std::fmt;

use crate::alternate::{AlternatePoint, AuxiliaryOutcome};
use crate::driver::PrimalResult;
use crate::record::{SolutionVector, round4};

/// Plain-text rendering of a [`PrimalResult`] in three sections
pub struct TextReport<'a>(pub &'a PrimalResult);

pub fn render_text(result: &PrimalResult) -> String {
    TextReport(result).to_string()
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let classification = &result.classification;

        writeln!(f, "Instance: {} outlets x {} slots", result.outlets, result.slots)?;
        writeln!(
            f,
            "Iterations: {} ({} before the first feasible vertex)",
            result.iterations, result.phase_one_iterations
        )?;
        writeln!(f)?;

        writeln!(f, "QUESTION I")?;
        writeln!(f, "  Objective value:    {}", round4(result.objective_value))?;
        writeln!(f, "  Total coverage:     {}", round4(result.totals.coverage))?;
        writeln!(f, "  Purchased quantity: {}", round4(result.totals.quantity))?;
        writeln!(f, "  Unused budget:      {}", round4(result.totals.unused_budget))?;
        writeln!(f, "  Optimal basic solution:")?;
        write_point(f, &result.optimum())?;
        writeln!(f)?;

        writeln!(f, "QUESTION II")?;
        let flags: Vec<&str> = classification
            .basis
            .iter()
            .map(|(_, basic)| if *basic { "1" } else { "0" })
            .collect();
        writeln!(f, "  Basis: [{}]", flags.join(", "))?;
        let reduced: Vec<String> = result
            .variables
            .iter()
            .map(|r| round4(r.reduced_cost).to_string())
            .collect();
        writeln!(f, "  Reduced costs: [{}]", reduced.join(", "))?;
        writeln!(f, "  Multiple optima: {}", yes_no(classification.is_multiple_optima))?;
        writeln!(f, "  Degenerate: {}", yes_no(classification.is_degenerate))?;
        writeln!(
            f,
            "  Optimal vertex constraints: [{}]",
            classification.binding_constraints.join(", ")
        )?;
        writeln!(f)?;

        writeln!(f, "QUESTION III")?;
        write_alternate(f, "First feasible non-optimal point", &result.bounded_point)?;
        match &result.auxiliary_point {
            AuxiliaryOutcome::Found(point) => {
                write_alternate(f, "Second feasible non-optimal point", point)?;
            }
            AuxiliaryOutcome::Unavailable { reason } => {
                writeln!(f, "  Second feasible non-optimal point: no auxiliary alternate point available")?;
                writeln!(f, "    ({reason})")?;
            }
        }
        write_alternate(
            f,
            &format!("Third feasible non-optimal point (lambda = {})", result.lambda),
            &result.interpolated_point,
        )
    }
}

fn write_alternate(f: &mut fmt::Formatter<'_>, title: &str, alternate: &AlternatePoint) -> fmt::Result {
    writeln!(f, "  {title}, from {}:", alternate.source)?;
    if let Some(status) = alternate.status {
        match alternate.iteration_limit {
            Some(limit) => writeln!(f, "    status {status} after {} of {limit} iterations", alternate.iterations)?,
            None => writeln!(f, "    status {status} after {} iterations", alternate.iterations)?,
        }
    }
    if !alternate.feasible {
        writeln!(f, "    warning: point violates the primal constraints")?;
    }
    if !alternate.distinct_from_optimum {
        writeln!(f, "    note: coincides with the optimal solution")?;
    }
    write_point(f, &alternate.point)
}

fn write_point(f: &mut fmt::Formatter<'_>, point: &SolutionVector) -> fmt::Result {
    for (name, value) in point.iter() {
        writeln!(f, "    {name} = {}", round4(value))?;
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
