//! Embedded CDCL satisfiability solver.
//!
//! Clauses are watched by two literals, conflicts are analysed to the first
//! unique implication point, and the learnt clause drives a non-chronological
//! backjump. Assumption literals are decided first, one per decision level, so
//! everything learnt stays implied by the clause database alone and is reused
//! across calls with different assumptions.

use super::Literal;

/// Learnt clauses kept before the database is flushed back to the problem clauses.
const LEARNT_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
struct Clause {
    lits: Vec<Literal>,
    learnt: bool,
}

/// Outcome of visiting a clause whose watched literal just became false.
enum Watch {
    Keep,
    Moved(Literal),
    Unit(Literal),
    Conflict,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub solves: u64,
    pub decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
}

/// Incremental SAT solver answering satisfiability under assumptions.
#[derive(Debug, Clone)]
pub struct Solver {
    clauses: Vec<Clause>,
    /// Literal code -> clauses watching that literal.
    watches: Vec<Vec<usize>>,
    assigns: Vec<Option<bool>>,
    level: Vec<usize>,
    reason: Vec<Option<usize>>,
    trail: Vec<Literal>,
    trail_lim: Vec<usize>,
    qhead: usize,
    learnts: usize,
    /// The clause database alone is unsatisfiable.
    inconsistent: bool,
    stats: SolverStats,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            watches: vec![Vec::new(); 2],
            assigns: vec![None],
            level: vec![0],
            reason: vec![None],
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            learnts: 0,
            inconsistent: false,
            stats: SolverStats::default(),
        }
    }

    /// Highest variable id known to the solver.
    pub fn num_vars(&self) -> usize {
        self.assigns.len() - 1
    }

    /// Number of stored clauses, learnt ones included.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Make room for variables up to `var`.
    pub fn ensure_var(&mut self, var: usize) {
        if var >= self.assigns.len() {
            self.assigns.resize(var + 1, None);
            self.level.resize(var + 1, 0);
            self.reason.resize(var + 1, None);
            self.watches.resize(2 * (var + 1), Vec::new());
        }
    }

    /// Add a clause to the database.
    ///
    /// Returns false once the database is known to be unsatisfiable.
    pub fn add_clause(&mut self, lits: &[Literal]) -> bool {
        self.cancel_until(0);
        for lit in lits {
            self.ensure_var(lit.var());
        }
        if self.inconsistent {
            return false;
        }

        let mut lits = lits.to_vec();
        lits.sort();
        lits.dedup();
        if lits.iter().any(|l| lits.contains(&l.negate())) {
            return true;
        }
        if lits.iter().any(|l| self.value(*l) == Some(true)) {
            return true;
        }
        lits.retain(|l| self.value(*l) != Some(false));

        match lits.len() {
            0 => self.inconsistent = true,
            1 => {
                self.enqueue(lits[0], None);
                if self.propagate().is_some() {
                    self.inconsistent = true;
                }
            }
            _ => {
                self.attach(lits, false);
            }
        }
        !self.inconsistent
    }

    /// Check satisfiability of the database together with `assumptions`.
    pub fn solve(&mut self, assumptions: &[Literal]) -> bool {
        self.stats.solves += 1;
        self.cancel_until(0);
        if self.inconsistent {
            return false;
        }
        for lit in assumptions {
            self.ensure_var(lit.var());
        }

        let sat = self.search(assumptions);
        self.cancel_until(0);
        if self.learnts > LEARNT_LIMIT {
            self.forget_learnts();
        }
        sat
    }

    fn search(&mut self, assumptions: &[Literal]) -> bool {
        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                if self.decision_level() == 0 {
                    self.inconsistent = true;
                    return false;
                }

                let (learnt, backjump) = self.analyze(conflict);
                self.cancel_until(backjump);
                if learnt.len() == 1 {
                    self.enqueue(learnt[0], None);
                } else {
                    let asserting = learnt[0];
                    let cr = self.attach(learnt, true);
                    self.enqueue(asserting, Some(cr));
                }
                continue;
            }

            let next = if self.decision_level() < assumptions.len() {
                let assumption = assumptions[self.decision_level()];
                match self.value(assumption) {
                    Some(true) => {
                        // Already implied: open an empty level to keep levels aligned.
                        self.trail_lim.push(self.trail.len());
                        continue;
                    }
                    Some(false) => return false,
                    None => assumption,
                }
            } else {
                match self.pick_branch() {
                    Some(lit) => lit,
                    None => return true,
                }
            };

            self.stats.decisions += 1;
            self.trail_lim.push(self.trail.len());
            self.enqueue(next, None);
        }
    }

    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let false_lit = self.trail[self.qhead].negate();
            self.qhead += 1;
            self.stats.propagations += 1;

            let watchers = std::mem::take(&mut self.watches[false_lit.code()]);
            let mut kept = Vec::with_capacity(watchers.len());
            let mut conflict = None;

            for cr in watchers {
                if conflict.is_some() {
                    kept.push(cr);
                    continue;
                }
                match Self::visit(&mut self.clauses[cr].lits, false_lit, &self.assigns) {
                    Watch::Keep => kept.push(cr),
                    Watch::Moved(lit) => self.watches[lit.code()].push(cr),
                    Watch::Unit(lit) => {
                        kept.push(cr);
                        self.enqueue(lit, Some(cr));
                    }
                    Watch::Conflict => {
                        kept.push(cr);
                        conflict = Some(cr);
                    }
                }
            }

            let slot = &mut self.watches[false_lit.code()];
            kept.append(slot);
            *slot = kept;

            if conflict.is_some() {
                return conflict;
            }
        }
        None
    }

    fn visit(lits: &mut [Literal], false_lit: Literal, assigns: &[Option<bool>]) -> Watch {
        if lits[0] == false_lit {
            lits.swap(0, 1);
        }
        if lit_value(assigns, lits[0]) == Some(true) {
            return Watch::Keep;
        }
        for k in 2..lits.len() {
            if lit_value(assigns, lits[k]) != Some(false) {
                lits.swap(1, k);
                return Watch::Moved(lits[1]);
            }
        }
        match lit_value(assigns, lits[0]) {
            Some(false) => Watch::Conflict,
            _ => Watch::Unit(lits[0]),
        }
    }

    /// First-UIP analysis. Returns the learnt clause (asserting literal first,
    /// highest remaining level second) and the level to backjump to.
    fn analyze(&self, conflict: usize) -> (Vec<Literal>, usize) {
        let current = self.decision_level();
        let mut seen = vec![false; self.assigns.len()];
        let mut others: Vec<Literal> = Vec::new();
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut clause = conflict;
        let mut uip: Option<Literal> = None;

        loop {
            let lits = &self.clauses[clause].lits;
            // Index 0 of a reason clause is the literal it implied.
            let start = usize::from(uip.is_some());
            for &q in &lits[start..] {
                let v = q.var();
                if !seen[v] && self.level[v] > 0 {
                    seen[v] = true;
                    if self.level[v] >= current {
                        pending += 1;
                    } else {
                        others.push(q);
                    }
                }
            }

            let lit = loop {
                index -= 1;
                let candidate = self.trail[index];
                if seen[candidate.var()] {
                    break candidate;
                }
            };
            seen[lit.var()] = false;
            pending -= 1;
            uip = Some(lit);

            if pending == 0 {
                break;
            }
            match self.reason[lit.var()] {
                Some(r) => clause = r,
                None => break,
            }
        }

        let mut learnt = Vec::with_capacity(others.len() + 1);
        if let Some(lit) = uip {
            learnt.push(lit.negate());
        }
        learnt.extend(others);

        let mut backjump = 0;
        if learnt.len() > 1 {
            let best = learnt
                .iter()
                .enumerate()
                .skip(1)
                .max_by_key(|(_, l)| self.level[l.var()])
                .map(|(i, _)| i)
                .unwrap_or(1);
            learnt.swap(1, best);
            backjump = self.level[learnt[1].var()];
        }
        (learnt, backjump)
    }

    fn pick_branch(&self) -> Option<Literal> {
        (1..self.assigns.len())
            .find(|&v| self.assigns[v].is_none())
            .map(|v| Literal::new(v as u32, false))
    }

    fn attach(&mut self, lits: Vec<Literal>, learnt: bool) -> usize {
        let cr = self.clauses.len();
        self.watches[lits[0].code()].push(cr);
        self.watches[lits[1].code()].push(cr);
        self.clauses.push(Clause { lits, learnt });
        if learnt {
            self.learnts += 1;
        }
        cr
    }

    fn enqueue(&mut self, lit: Literal, reason: Option<usize>) {
        let v = lit.var();
        self.assigns[v] = Some(lit.is_positive());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let lim = self.trail_lim[level];
        for lit in self.trail.drain(lim..) {
            self.assigns[lit.var()] = None;
            self.reason[lit.var()] = None;
        }
        self.trail_lim.truncate(level);
        self.qhead = self.qhead.min(lim);
    }

    /// Drop every learnt clause. Only valid at decision level 0.
    fn forget_learnts(&mut self) {
        self.clauses.retain(|c| !c.learnt);
        self.learnts = 0;
        for watchers in self.watches.iter_mut() {
            watchers.clear();
        }
        for (cr, clause) in self.clauses.iter().enumerate() {
            self.watches[clause.lits[0].code()].push(cr);
            self.watches[clause.lits[1].code()].push(cr);
        }
        for reason in self.reason.iter_mut() {
            *reason = None;
        }
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn value(&self, lit: Literal) -> Option<bool> {
        lit_value(&self.assigns, lit)
    }
}

fn lit_value(assigns: &[Option<bool>], lit: Literal) -> Option<bool> {
    assigns
        .get(lit.var())
        .copied()
        .flatten()
        .map(|v| v == lit.is_positive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lit(value: i32) -> Literal {
        Literal::from_signed(value).unwrap()
    }

    fn lits(values: &[i32]) -> Vec<Literal> {
        values.iter().map(|v| lit(*v)).collect()
    }

    fn brute_force(num_vars: u32, clauses: &[Vec<i32>], assumptions: &[i32]) -> bool {
        let holds = |mask: u32, l: i32| {
            let value = mask & (1 << (l.unsigned_abs() - 1)) != 0;
            value == (l > 0)
        };
        (0..1u32 << num_vars).any(|mask| {
            assumptions.iter().all(|l| holds(mask, *l))
                && clauses.iter().all(|c| c.iter().any(|l| holds(mask, *l)))
        })
    }

    #[test]
    fn test_simple_sat_and_unsat() {
        let mut solver = Solver::new();
        assert!(solver.add_clause(&lits(&[1, 2])));
        assert!(solver.add_clause(&lits(&[-1, 2])));
        assert!(solver.solve(&[]));
        assert!(!solver.solve(&lits(&[-2])));
        assert!(solver.solve(&lits(&[2, -1])));

        assert!(!solver.add_clause(&lits(&[-2])));
        assert!(!solver.solve(&[]));
    }

    #[test]
    fn test_contradictory_assumptions() {
        let mut solver = Solver::new();
        solver.add_clause(&lits(&[1, 2, 3]));
        assert!(!solver.solve(&lits(&[1, -1])));
        assert!(!solver.solve(&lits(&[-1, -2, -3])));
        // The database itself is still fine.
        assert!(solver.solve(&[]));
    }

    #[test]
    fn test_empty_clause_is_unsat() {
        let mut solver = Solver::new();
        assert!(!solver.add_clause(&[]));
        assert!(!solver.solve(&[]));
    }

    #[test]
    fn test_tautology_ignored() {
        let mut solver = Solver::new();
        assert!(solver.add_clause(&lits(&[1, -1])));
        assert_eq!(solver.num_clauses(), 0);
        assert!(solver.solve(&lits(&[-1])));
    }

    #[test]
    fn test_pigeonhole_three_into_two() {
        // Variable p_ij (pigeon i in hole j) = 2 * i + j + 1.
        let var = |i: i32, j: i32| 2 * i + j + 1;
        let mut solver = Solver::new();
        for i in 0..3 {
            solver.add_clause(&lits(&[var(i, 0), var(i, 1)]));
        }
        for j in 0..2 {
            for a in 0..3 {
                for b in (a + 1)..3 {
                    solver.add_clause(&lits(&[-var(a, j), -var(b, j)]));
                }
            }
        }
        assert!(!solver.solve(&[]));
        assert!(solver.stats().conflicts > 0);
    }

    #[test]
    fn test_reuse_across_assumptions() {
        // x1 -> x2 -> x3 -> x4
        let mut solver = Solver::new();
        for v in 1..4 {
            solver.add_clause(&lits(&[-v, v + 1]));
        }
        assert!(!solver.solve(&lits(&[1, -4])));
        assert!(solver.solve(&lits(&[-1, 4])));
        assert!(solver.solve(&lits(&[2])));
        assert!(!solver.solve(&lits(&[2, -3])));
        assert!(solver.solve(&[]));
    }

    fn literal_strategy(num_vars: i32) -> impl Strategy<Value = i32> {
        (1..=num_vars, any::<bool>()).prop_map(|(v, positive)| if positive { v } else { -v })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn test_matches_truth_table(
            clauses in prop::collection::vec(prop::collection::vec(literal_strategy(6), 1..4), 0..16),
            queries in prop::collection::vec(prop::collection::vec(literal_strategy(6), 0..4), 1..6),
        ) {
            let mut solver = Solver::new();
            for clause in &clauses {
                solver.add_clause(&lits(clause));
            }
            for assumptions in &queries {
                let expected = brute_force(6, &clauses, assumptions);
                prop_assert_eq!(solver.solve(&lits(assumptions)), expected);
            }
        }
    }
}
