use crate::error::{AnalysisError, Stage};

/// Static description of an allocation instance: `M` outlets, `K` slots per outlet.
///
/// `M` and `K` are read off the table shapes; [`ProblemDefinition::validate`]
/// checks that every table agrees with them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDefinition {
    /// Maximum purchasable quantity per outlet and slot
    pub capacity: Vec<Vec<f64>>,
    /// Cost of one unit per outlet and slot
    pub unit_cost: Vec<Vec<f64>>,
    /// Audience reached by one unit per outlet and slot
    pub unit_coverage: Vec<Vec<f64>>,
    /// Spending ceiling per outlet
    pub max_budget: Vec<f64>,
    /// Floor on total coverage
    pub min_coverage: f64,
    /// Share of the total budget every slot must receive at minimum
    pub min_slot_spend_fraction: f64,
}

impl ProblemDefinition {
    /// Number of outlets (`M`)
    pub fn outlets(&self) -> usize {
        self.max_budget.len()
    }

    /// Number of time slots per outlet (`K`)
    pub fn slots(&self) -> usize {
        self.capacity.first().map_or(0, Vec::len)
    }

    pub fn total_budget(&self) -> f64 {
        self.max_budget.iter().sum()
    }

    /// Minimum spend required in every slot
    pub fn slot_spend_floor(&self) -> f64 {
        self.min_slot_spend_fraction * self.total_budget()
    }

    /// Slack rows: one per outlet budget, one per slot floor, one for coverage
    pub fn slack_count(&self) -> usize {
        self.outlets() + self.slots() + 1
    }

    /// +1 for the first half of the slots, -1 for the rest
    pub fn slot_sign(&self, slot: usize) -> f64 {
        if slot < self.slots() / 2 { 1.0 } else { -1.0 }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let m = self.outlets();
        let k = self.slots();
        if m == 0 || k == 0 {
            return Err(self.invalid(format!(
                "instance needs at least one outlet and one slot, got {m}x{k}"
            )));
        }

        for (label, table) in [
            ("capacity", &self.capacity),
            ("unit_cost", &self.unit_cost),
            ("unit_coverage", &self.unit_coverage),
        ] {
            if table.len() != m {
                return Err(self.invalid(format!(
                    "{label} has {} rows but max_budget lists {m} outlets",
                    table.len()
                )));
            }
            if let Some((i, row)) = table.iter().enumerate().find(|(_, row)| row.len() != k) {
                return Err(self.invalid(format!(
                    "{label} row {i} has {} slots, expected {k}",
                    row.len()
                )));
            }
            if let Some(v) = table.iter().flatten().find(|v| !is_non_negative(**v)) {
                return Err(self.invalid(format!(
                    "{label} contains {v}, values must be finite and non-negative"
                )));
            }
        }

        if let Some(v) = self.max_budget.iter().find(|v| !is_non_negative(**v)) {
            return Err(self.invalid(format!(
                "max_budget contains {v}, values must be finite and non-negative"
            )));
        }
        for (label, v) in [
            ("min_coverage", self.min_coverage),
            ("min_slot_spend_fraction", self.min_slot_spend_fraction),
        ] {
            if !is_non_negative(v) {
                return Err(self.invalid(format!(
                    "{label} is {v}, must be finite and non-negative"
                )));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> AnalysisError {
        AnalysisError::InvalidProblem {
            stage: Stage::ModelBuild,
            outlets: self.outlets(),
            slots: self.slots(),
            reason,
        }
    }

    /// Ten television stations with eight daily slots each: a 2% per-slot spending
    /// floor and 86 236 spectators of required coverage.
    pub fn reference() -> Self {
        let capacity = [
            [1, 2, 2, 1, 1, 2, 2, 1],
            [2, 2, 1, 2, 2, 2, 2, 3],
            [1, 1, 2, 1, 1, 2, 2, 3],
            [3, 3, 1, 2, 2, 1, 2, 2],
            [2, 1, 2, 3, 2, 2, 2, 1],
            [2, 2, 2, 3, 2, 3, 1, 1],
            [2, 3, 2, 3, 2, 3, 3, 2],
            [2, 2, 1, 1, 3, 2, 1, 1],
            [3, 2, 2, 2, 3, 1, 3, 2],
            [2, 2, 2, 2, 3, 3, 1, 2],
        ];
        let unit_cost = [
            [914, 972, 1352, 1299, 1258, 1237, 1276, 1286],
            [1030, 969, 1073, 1234, 1289, 1107, 1357, 1276],
            [1270, 1191, 1393, 1112, 1297, 1296, 1244, 1228],
            [1390, 1121, 1009, 1039, 1107, 993, 1144, 1073],
            [1237, 1345, 1191, 1235, 954, 1314, 976, 953],
            [1065, 1012, 1349, 1145, 1087, 938, 1343, 1356],
            [1235, 970, 998, 900, 1064, 1178, 970, 1056],
            [1159, 1077, 1330, 1261, 1294, 1382, 1190, 1002],
            [996, 1137, 1151, 931, 1067, 986, 1014, 1104],
            [1101, 1354, 1381, 1026, 1374, 986, 1067, 1149],
        ];
        let unit_coverage = [
            [1387, 3382, 3496, 1574, 1292, 1989, 2251, 1314],
            [919, 3333, 595, 956, 1299, 2485, 3241, 1642],
            [1546, 2036, 1493, 2429, 2325, 1840, 1124, 3088],
            [2781, 784, 1133, 1203, 1990, 2333, 1046, 2569],
            [2308, 3480, 628, 2628, 2606, 384, 3413, 2764],
            [2348, 392, 3480, 1005, 553, 2536, 2367, 1461],
            [3014, 931, 3194, 1926, 2482, 2680, 947, 359],
            [2712, 3405, 680, 2389, 1517, 2085, 953, 3021],
            [2421, 886, 781, 3246, 3142, 601, 813, 735],
            [911, 2714, 2837, 3135, 3007, 409, 898, 1598],
        ];
        let max_budget = [3356, 2632, 2867, 3215, 3103, 3449, 2825, 3398, 3158, 2657];

        Self {
            capacity: to_table(&capacity),
            unit_cost: to_table(&unit_cost),
            unit_coverage: to_table(&unit_coverage),
            max_budget: max_budget.iter().map(|&v| f64::from(v)).collect(),
            min_coverage: 86236.0,
            min_slot_spend_fraction: 0.02,
        }
    }
}

fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn to_table<const K: usize>(rows: &[[i32; K]]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| row.iter().map(|&v| f64::from(v)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::uniform;

    #[test]
    fn test_reference_instance_shape() {
        let problem = ProblemDefinition::reference();
        problem.validate().unwrap();

        assert_eq!(problem.outlets(), 10);
        assert_eq!(problem.slots(), 8);
        assert_eq!(problem.total_budget(), 30660.0);
        assert!((problem.slot_spend_floor() - 613.2).abs() < 1e-9);
        assert_eq!(problem.slack_count(), 19);
    }

    #[test]
    fn test_slot_sign_splits_in_half() {
        let problem = uniform();
        assert_eq!(problem.slot_sign(0), 1.0);
        assert_eq!(problem.slot_sign(1), -1.0);
    }

    #[test]
    fn test_validate_rejects_ragged_table() {
        let mut problem = uniform();
        problem.unit_cost[1].pop();

        let err = problem.validate().unwrap_err();
        assert!(err.to_string().contains("unit_cost row 1"), "{err}");
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let mut problem = uniform();
        problem.unit_coverage[0][1] = -5.0;
        assert!(problem.validate().is_err());

        let mut problem = uniform();
        problem.min_slot_spend_fraction = f64::NAN;
        assert!(problem.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_budget_length_mismatch() {
        let mut problem = uniform();
        problem.max_budget.push(5.0);

        let err = problem.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidProblem { .. }));
    }
}
