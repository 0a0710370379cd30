//! Backend-neutral linear program description and solver seam.
//!
//! Formulation code builds a [`LinearProgram`]; any [`LpBackend`] that
//! reports true optimality for feasible instances can solve it.

/// Handle to a decision variable of a [`LinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Continuous variable with a lower bound and optional upper bound.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub lower: f64,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

/// `sum(coef * var) <relation> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// Minimization problem over continuous variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    variables: Vec<VariableSpec>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        self.variables.push(VariableSpec {
            name: name.into(),
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, terms: Vec<(VarId, f64)>, relation: Relation, rhs: f64) {
        self.constraints.push(LinearConstraint {
            terms,
            relation,
            rhs,
        });
    }

    /// Sets the objective to minimize, replacing any previous one.
    pub fn minimize(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        dot(&self.objective, values)
    }

    /// Whether `values` satisfies every bound and constraint within `tol`.
    pub fn is_feasible(&self, values: &[f64], tol: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let bounds_ok = self.variables.iter().zip(values).all(|(spec, &v)| {
            v >= spec.lower - tol && spec.upper.is_none_or(|u| v <= u + tol)
        });
        bounds_ok
            && self.constraints.iter().all(|c| {
                let lhs = dot(&c.terms, values);
                match c.relation {
                    Relation::LessEq => lhs <= c.rhs + tol,
                    Relation::GreaterEq => lhs >= c.rhs - tol,
                    Relation::Equal => (lhs - c.rhs).abs() <= tol,
                }
            })
    }
}

fn dot(terms: &[(VarId, f64)], values: &[f64]) -> f64 {
    terms
        .iter()
        .map(|&(id, coef)| coef * values.get(id.index()).copied().unwrap_or(0.0))
        .sum()
}

/// Termination status reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Any other termination, with the backend's explanation.
    Failed(String),
}

/// Status plus, when optimal, one value per variable in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub status: LpStatus,
    pub values: Vec<f64>,
}

impl LpSolution {
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: LpStatus::Optimal,
            values,
        }
    }

    pub fn without_values(status: LpStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    pub fn value(&self, id: VarId) -> Option<f64> {
        self.values.get(id.index()).copied()
    }
}

/// Pluggable LP solver.
pub trait LpBackend {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Solves `program` as a minimization. Blocking.
    fn solve(&self, program: &LinearProgram) -> LpSolution;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_var_program() -> (LinearProgram, VarId, VarId) {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, Some(4.0));
        let y = lp.add_variable("y", 0.0, None);
        lp.add_constraint(vec![(x, 1.0), (y, 1.0)], Relation::GreaterEq, 5.0);
        lp.minimize(vec![(x, 1.0), (y, 3.0)]);
        (lp, x, y)
    }

    #[test]
    fn var_ids_follow_declaration_order() {
        let (lp, x, y) = two_var_program();
        assert_eq!(x.index(), 0);
        assert_eq!(y.index(), 1);
        assert_eq!(lp.num_variables(), 2);
        assert_eq!(lp.variables()[0].upper, Some(4.0));
    }

    #[test]
    fn feasibility_check_respects_bounds_and_constraints() {
        let (lp, _, _) = two_var_program();
        assert!(lp.is_feasible(&[4.0, 1.0], 1e-9));
        assert!(!lp.is_feasible(&[5.0, 0.0], 1e-9)); // x above its bound
        assert!(!lp.is_feasible(&[2.0, 2.0], 1e-9)); // sum below 5
        assert!(!lp.is_feasible(&[2.0], 1e-9));
    }

    #[test]
    fn objective_value_is_weighted_sum() {
        let (lp, _, _) = two_var_program();
        assert_eq!(lp.objective_value(&[4.0, 1.0]), 7.0);
    }

    #[test]
    fn solution_lookup_by_var() {
        let (_, x, y) = two_var_program();
        let sol = LpSolution::optimal(vec![4.0, 1.0]);
        assert_eq!(sol.value(x), Some(4.0));
        assert_eq!(sol.value(y), Some(1.0));
        assert_eq!(LpSolution::without_values(LpStatus::Infeasible).value(x), None);
    }
}
