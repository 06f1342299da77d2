//! The propositional knowledge base - static cave rules plus observed facts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use wumpus_rules::{Cell, Property};

use super::{Literal, Solver, SolverStats, SymbolTable};

/// Which percept each hazard or reward emits into its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptTable {
    pairs: Vec<(Property, Property)>,
}

impl PerceptTable {
    /// Build a table from `(hazard, percept)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (Property, Property)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// The percept paired with a hazard, if the table knows it.
    pub fn percept_of(&self, hazard: Property) -> Option<Property> {
        self.pairs
            .iter()
            .find(|(h, _)| *h == hazard)
            .map(|(_, p)| *p)
    }

    pub fn pairs(&self) -> &[(Property, Property)] {
        &self.pairs
    }
}

impl Default for PerceptTable {
    fn default() -> Self {
        Self::new(
            Property::GROUND_TRUTH
                .into_iter()
                .filter_map(|hazard| hazard.percept().map(|percept| (hazard, percept))),
        )
    }
}

/// Rules of the cave in CNF, a set of observed literals, and a SAT oracle.
///
/// The rule set is fixed at construction:
/// - the start cell holds no hazard and no reward;
/// - a percept holds in a cell iff one of its neighbours holds the paired hazard.
///
/// Observations are kept as assumption literals. Entailment of a literal `l`
/// is decided by checking that `rules ∧ assumptions ∧ ¬l` is unsatisfiable, so
/// a contradictory set of assumptions entails everything instead of failing.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    size: i32,
    percepts: PerceptTable,
    symbols: SymbolTable,
    rule_count: usize,
    solver: Solver,
    assumptions: BTreeSet<Literal>,
    /// Entailment answers for the current assumption set.
    cache: HashMap<Literal, bool>,
    consistent: Option<bool>,
}

impl KnowledgeBase {
    /// Create a knowledge base for a `size` x `size` cave with the standard percepts.
    pub fn new(size: i32) -> Self {
        Self::with_percepts(size, PerceptTable::default())
    }

    /// Create a knowledge base using a custom hazard/percept table.
    pub fn with_percepts(size: i32, percepts: PerceptTable) -> Self {
        let mut kb = Self {
            size,
            percepts,
            symbols: SymbolTable::new(),
            rule_count: 0,
            solver: Solver::new(),
            assumptions: BTreeSet::new(),
            cache: HashMap::new(),
            consistent: None,
        };

        let rules = kb.build_rules();
        kb.rule_count = rules.len();
        for clause in &rules {
            kb.solver.add_clause(clause);
        }
        tracing::debug!(
            size,
            clauses = kb.rule_count,
            variables = kb.symbols.len(),
            "knowledge base initialised"
        );
        kb
    }

    fn build_rules(&mut self) -> Vec<Vec<Literal>> {
        let mut cnf = Vec::new();

        for property in Property::GROUND_TRUTH {
            cnf.push(vec![self.symbols.literal(property, Cell::START, false)]);
        }

        let pairs = self.percepts.pairs().to_vec();
        for cell in Cell::all(self.size) {
            let adjacent = cell.neighbors(self.size);
            for &(hazard, percept) in &pairs {
                let sensed = self.symbols.literal(percept, cell, true);

                // Percept -> some neighbour holds the hazard.
                let mut clause = vec![-sensed];
                for neighbor in &adjacent {
                    clause.push(self.symbols.literal(hazard, *neighbor, true));
                }
                cnf.push(clause);

                // A neighbour holding the hazard -> percept.
                for neighbor in &adjacent {
                    let held = self.symbols.literal(hazard, *neighbor, true);
                    cnf.push(vec![sensed, -held]);
                }
            }
        }
        cnf
    }

    /// Side length of the cave.
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn percept_table(&self) -> &PerceptTable {
        &self.percepts
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of clauses in the static rule set.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn solver_stats(&self) -> SolverStats {
        self.solver.stats()
    }

    /// Currently asserted literals.
    pub fn assumptions(&self) -> impl Iterator<Item = Literal> + '_ {
        self.assumptions.iter().copied()
    }

    pub fn assumption_count(&self) -> usize {
        self.assumptions.len()
    }

    /// Assert that a property does (or does not) hold in a cell.
    ///
    /// An assertion of the opposite polarity is replaced. Returns true if the
    /// assumption set changed.
    pub fn add(&mut self, property: Property, cell: Cell, existence: bool) -> bool {
        let literal = self.symbols.literal(property, cell, existence);
        if self.assumptions.contains(&literal) {
            return false;
        }
        self.assumptions.remove(&-literal);
        self.assumptions.insert(literal);
        self.invalidate();
        tracing::trace!(literal = %self.symbols.describe(literal), "assumption added");
        true
    }

    /// Retract an assertion. Returns true if it was present.
    pub fn remove(&mut self, property: Property, cell: Cell, existence: bool) -> bool {
        let Some(var) = self.symbols.get(property, cell) else {
            return false;
        };
        let literal = Literal::new(var, existence);
        if !self.assumptions.remove(&literal) {
            return false;
        }
        self.invalidate();
        tracing::trace!(literal = %self.symbols.describe(literal), "assumption removed");
        true
    }

    /// Retract both polarities of a property in a cell.
    pub fn forget(&mut self, property: Property, cell: Cell) -> bool {
        let positive = self.remove(property, cell, true);
        let negative = self.remove(property, cell, false);
        positive || negative
    }

    /// Plain membership test on the assumption set. No inference.
    pub fn has(&self, property: Property, cell: Cell, existence: bool) -> bool {
        self.symbols
            .get(property, cell)
            .is_some_and(|var| self.assumptions.contains(&Literal::new(var, existence)))
    }

    /// True iff the rules and assumptions force the property to hold in the cell.
    pub fn certain(&mut self, property: Property, cell: Cell) -> bool {
        let literal = self.symbols.literal(property, cell, true);
        self.entails(literal)
    }

    /// True iff the rules and assumptions force the property to be absent.
    pub fn impossible(&mut self, property: Property, cell: Cell) -> bool {
        let literal = self.symbols.literal(property, cell, false);
        self.entails(literal)
    }

    /// Neighbour-corroborated possibility.
    ///
    /// False when the property is impossible. Otherwise true only if some
    /// neighbour is certain to carry the paired percept. This is weaker than
    /// logical possibility: an unexplored cell with no sensed
    /// percept next to it is not considered possibly dangerous.
    pub fn possible(&mut self, property: Property, cell: Cell) -> bool {
        if self.impossible(property, cell) {
            return false;
        }
        let Some(percept) = self.percepts.percept_of(property) else {
            return false;
        };
        cell.neighbors(self.size)
            .into_iter()
            .any(|neighbor| self.certain(percept, neighbor))
    }

    /// Check whether the rules and the current assumptions admit a model.
    pub fn is_consistent(&mut self) -> bool {
        if let Some(answer) = self.consistent {
            return answer;
        }
        let assumptions: Vec<_> = self.assumptions.iter().copied().collect();
        let answer = self.solver.solve(&assumptions);
        self.consistent = Some(answer);
        answer
    }

    fn invalidate(&mut self) {
        self.cache.clear();
        self.consistent = None;
    }

    fn entails(&mut self, literal: Literal) -> bool {
        if let Some(answer) = self.cache.get(&literal) {
            return *answer;
        }
        let mut query: Vec<_> = self.assumptions.iter().copied().collect();
        query.push(-literal);
        let answer = !self.solver.solve(&query);
        self.cache.insert(literal, answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wumpus_rules::WorldMap;

    fn hazards() -> [Property; 4] {
        [
            Property::Pit,
            Property::Wumpus,
            Property::PoisonGas,
            Property::HealingPotion,
        ]
    }

    #[test]
    fn test_fresh_base_knows_only_the_start_cell() {
        let mut kb = KnowledgeBase::new(4);

        for cell in Cell::all(4) {
            for property in Property::GROUND_TRUTH {
                if cell == Cell::START {
                    assert!(kb.impossible(property, cell), "{} at start", property);
                    assert!(!kb.certain(property, cell));
                } else {
                    assert!(!kb.impossible(property, cell), "{} at {}", property, cell);
                    assert!(!kb.certain(property, cell), "{} at {}", property, cell);
                }
            }
        }
        assert!(kb.is_consistent());
    }

    #[test]
    fn test_rule_count() {
        // 5 start clauses + per cell and pair: 1 + |neighbours| clauses.
        let kb = KnowledgeBase::new(2);
        assert_eq!(kb.rule_count(), 5 + 4 * 4 * (1 + 2));
    }

    #[test]
    fn test_add_then_remove_restores_answers() {
        let mut kb = KnowledgeBase::new(4);
        let queries = [
            (Property::Pit, Cell::new(1, 2)),
            (Property::Pit, Cell::new(2, 1)),
            (Property::Breeze, Cell::new(1, 1)),
        ];
        let before: Vec<_> = queries
            .iter()
            .map(|(p, c)| (kb.certain(*p, *c), kb.impossible(*p, *c), kb.possible(*p, *c)))
            .collect();

        assert!(kb.add(Property::Breeze, Cell::new(1, 1), true));
        assert!(!kb.add(Property::Breeze, Cell::new(1, 1), true));
        assert!(kb.possible(Property::Pit, Cell::new(1, 2)));
        assert!(kb.certain(Property::Breeze, Cell::new(1, 1)));

        assert!(kb.remove(Property::Breeze, Cell::new(1, 1), true));
        assert!(!kb.remove(Property::Breeze, Cell::new(1, 1), true));
        let after: Vec<_> = queries
            .iter()
            .map(|(p, c)| (kb.certain(*p, *c), kb.impossible(*p, *c), kb.possible(*p, *c)))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_single_neighbor_deduction() {
        let mut kb = KnowledgeBase::new(4);
        kb.add(Property::Breeze, Cell::new(1, 1), true);
        assert!(!kb.certain(Property::Pit, Cell::new(2, 1)));

        kb.add(Property::Pit, Cell::new(1, 2), false);
        assert!(kb.certain(Property::Pit, Cell::new(2, 1)));
        assert!(!kb.impossible(Property::Pit, Cell::new(2, 1)));
    }

    #[test]
    fn test_deduction_from_absent_percepts() {
        let mut kb = KnowledgeBase::new(4);
        // No stench at (1,2) clears all of its neighbours.
        kb.add(Property::Stench, Cell::new(1, 2), false);
        for cell in [Cell::new(1, 3), Cell::new(2, 2)] {
            assert!(kb.impossible(Property::Wumpus, cell));
        }
        // Stench at (2,1): only (3,1) is left, since (1,1) and (2,2) are clear.
        kb.add(Property::Stench, Cell::new(2, 1), true);
        assert!(kb.certain(Property::Wumpus, Cell::new(3, 1)));
    }

    #[test]
    fn test_opposite_polarity_is_replaced() {
        let mut kb = KnowledgeBase::new(3);
        kb.add(Property::Glow, Cell::new(2, 2), true);
        kb.add(Property::Glow, Cell::new(2, 2), false);

        assert!(kb.has(Property::Glow, Cell::new(2, 2), false));
        assert!(!kb.has(Property::Glow, Cell::new(2, 2), true));
        assert_eq!(kb.assumption_count(), 1);
        assert!(kb.forget(Property::Glow, Cell::new(2, 2)));
        assert_eq!(kb.assumption_count(), 0);
    }

    #[test]
    fn test_has_is_membership_only() {
        let mut kb = KnowledgeBase::new(3);
        assert!(!kb.has(Property::Pit, Cell::START, false));
        assert!(kb.impossible(Property::Pit, Cell::START));
        kb.add(Property::Pit, Cell::new(3, 3), true);
        assert!(kb.has(Property::Pit, Cell::new(3, 3), true));
        assert!(!kb.has(Property::Pit, Cell::new(3, 3), false));
    }

    #[test]
    fn test_possible_needs_corroborating_percept() {
        let mut kb = KnowledgeBase::new(4);
        assert!(!kb.possible(Property::Pit, Cell::new(2, 2)));

        kb.add(Property::Breeze, Cell::new(1, 2), true);
        assert!(kb.possible(Property::Pit, Cell::new(2, 2)));
        assert!(kb.possible(Property::Pit, Cell::new(1, 3)));
        assert!(!kb.possible(Property::Pit, Cell::START));
        assert!(!kb.possible(Property::Pit, Cell::new(4, 4)));

        // Gold emits nothing, so it is never corroborated.
        assert!(!kb.possible(Property::Gold, Cell::new(2, 2)));
    }

    #[test]
    fn test_cache_follows_mutations() {
        let mut kb = KnowledgeBase::new(4);
        kb.add(Property::Whiff, Cell::new(1, 1), true);
        assert!(!kb.certain(Property::PoisonGas, Cell::new(2, 1)));

        kb.add(Property::PoisonGas, Cell::new(1, 2), false);
        assert!(kb.certain(Property::PoisonGas, Cell::new(2, 1)));

        kb.remove(Property::PoisonGas, Cell::new(1, 2), false);
        assert!(!kb.certain(Property::PoisonGas, Cell::new(2, 1)));

        // Re-asserting a known literal keeps every cached answer.
        assert!(kb.is_consistent());
        let solves = kb.solver_stats().solves;
        assert!(!kb.add(Property::Whiff, Cell::new(1, 1), true));
        assert!(kb.is_consistent());
        assert!(!kb.certain(Property::PoisonGas, Cell::new(2, 1)));
        assert_eq!(kb.solver_stats().solves, solves);
    }

    #[test]
    fn test_contradiction_entails_everything() {
        let mut kb = KnowledgeBase::new(4);
        // Breeze at (1,2) but every neighbour is pit-free.
        kb.add(Property::Breeze, Cell::new(1, 2), true);
        kb.add(Property::Pit, Cell::new(1, 3), false);
        kb.add(Property::Pit, Cell::new(2, 2), false);

        assert!(!kb.is_consistent());
        assert!(kb.certain(Property::Wumpus, Cell::new(4, 4)));
        assert!(kb.impossible(Property::Wumpus, Cell::new(4, 4)));
        assert!(kb.certain(Property::Pit, Cell::START));
    }

    #[test]
    fn test_custom_percept_table() {
        let table = PerceptTable::new([(Property::Pit, Property::Breeze)]);
        let mut kb = KnowledgeBase::with_percepts(3, table);
        assert_eq!(kb.rule_count(), 5 + 9 + 24);

        kb.add(Property::Stench, Cell::new(1, 2), true);
        assert!(!kb.possible(Property::Wumpus, Cell::new(2, 2)));
        assert!(!kb.certain(Property::Wumpus, Cell::new(2, 2)));
    }

    fn world_strategy() -> impl Strategy<Value = (Vec<(usize, i32, i32)>, Vec<(i32, i32)>)> {
        (
            prop::collection::vec((0..4usize, 1..=4i32, 1..=4i32), 0..6),
            prop::collection::vec((1..=4i32, 1..=4i32), 1..10),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_truthful_observations_stay_sound((placements, visits) in world_strategy()) {
            let mut world = WorldMap::new(4);
            for (kind, x, y) in placements {
                let cell = Cell::new(x, y);
                if cell != Cell::START {
                    world.place(cell, hazards()[kind]);
                }
            }

            let mut kb = KnowledgeBase::new(4);
            for (x, y) in visits {
                let cell = Cell::new(x, y);
                for property in Property::ALL {
                    kb.add(property, cell, world.has(cell, property));
                }
            }
            prop_assert!(kb.is_consistent());

            for cell in Cell::all(4) {
                for hazard in hazards() {
                    let certain = kb.certain(hazard, cell);
                    let impossible = kb.impossible(hazard, cell);
                    prop_assert!(!(certain && impossible));
                    if certain {
                        prop_assert!(world.has(cell, hazard));
                    }
                    if impossible {
                        prop_assert!(!world.has(cell, hazard));
                    }
                }
            }
        }
    }
}
