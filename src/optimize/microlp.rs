//! [`LpBackend`] implementation on `good_lp` with the pure-Rust microlp simplex.

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint, microlp,
    variable,
};

use super::lp::{LinearProgram, LpBackend, LpSolution, LpStatus, Relation, VarId};

/// Stateless simplex backend; every call builds a fresh solver model.
#[derive(Debug, Default, Clone, Copy)]
pub struct MicroLpBackend;

fn expression(terms: &[(VarId, f64)], handles: &[good_lp::Variable]) -> Expression {
    terms
        .iter()
        .filter_map(|&(id, coef)| handles.get(id.index()).map(|&var| coef * var))
        .sum()
}

impl LpBackend for MicroLpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, program: &LinearProgram) -> LpSolution {
        let mut vars = ProblemVariables::new();
        let handles: Vec<good_lp::Variable> = program
            .variables()
            .iter()
            .map(|spec| {
                let mut def = variable().name(spec.name.clone()).min(spec.lower);
                if let Some(upper) = spec.upper {
                    def = def.max(upper);
                }
                vars.add(def)
            })
            .collect();

        let objective = expression(program.objective(), &handles);
        let mut model = vars.minimise(objective).using(microlp);
        for c in program.constraints() {
            let lhs = expression(&c.terms, &handles);
            let rhs = c.rhs;
            model = match c.relation {
                Relation::LessEq => model.with(constraint!(lhs <= rhs)),
                Relation::GreaterEq => model.with(constraint!(lhs >= rhs)),
                Relation::Equal => model.with(constraint!(lhs == rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                LpSolution::optimal(handles.iter().map(|&var| solution.value(var)).collect())
            }
            Err(ResolutionError::Infeasible) => LpSolution::without_values(LpStatus::Infeasible),
            Err(ResolutionError::Unbounded) => LpSolution::without_values(LpStatus::Unbounded),
            Err(other) => LpSolution::without_values(LpStatus::Failed(other.to_string())),
        }
    }
}
