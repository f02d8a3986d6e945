// ==========================================
// 局部搜索求解器
// ==========================================
// 决策变量: 工程师 × 所负责设施 的激活开关
// 激活设施 = 授予该设施对其角色开放的全部资质
// 每轮: 贪心激活 (含多人协同激活) → 修复硬约束 → 剪枝冗余激活 → (可选) 交换
// 遍历顺序固定 (工程师ID → 设施ID),同分取先遇到者
// ==========================================

use super::{
    AssignmentProblem, AssignmentSolver, Candidate, ConstraintViolation, ObjectiveScore,
    SolveBudget, SolveOutcome,
};
use crate::domain::matrix::QualificationMatrix;
use crate::domain::roster::Requirement;
use crate::domain::types::RideClass;
use crate::engine::strategy::{ConstraintMode, ConstraintSet, ObjectiveWeights};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const EPS: f64 = 1e-9;

// ==========================================
// LocalSearchSolver
// ==========================================
pub struct LocalSearchSolver {
    // 无状态求解器
}

impl LocalSearchSolver {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LocalSearchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentSolver for LocalSearchSolver {
    fn name(&self) -> &str {
        "local_search"
    }

    fn solve(
        &self,
        problem: &AssignmentProblem,
        objective: &ObjectiveWeights,
        constraints: &ConstraintSet,
        budget: &SolveBudget,
    ) -> SolveOutcome {
        let ctx = SearchContext::new(problem, objective, constraints, budget);
        let mut state = ctx.initial_state();

        for pass in 0..budget.search.max_passes.max(1) {
            match ctx.run_pass(&mut state) {
                Err(Expired) => {
                    debug!(pass, "求解超时,返回现有最优解");
                    return SolveOutcome::TimedOut {
                        incumbent: ctx.candidate(&state),
                    };
                }
                Ok(changed) => {
                    debug!(
                        pass,
                        changed,
                        total = state.score.total,
                        coverage = state.score.coverage,
                        "局部搜索轮次完成"
                    );
                    if !changed {
                        break;
                    }
                }
            }
        }

        let violations = ctx.violations(&state.active);
        let incumbent = ctx.candidate(&state);
        if violations.is_empty() {
            SolveOutcome::Solved(incumbent)
        } else {
            SolveOutcome::Infeasible {
                incumbent,
                violations,
            }
        }
    }
}

// ==========================================
// 内部结构
// ==========================================

struct Expired;

struct RideOption {
    ride_id: String,
    class: RideClass,
    qualifications: BTreeSet<String>,
}

struct Slot {
    engineer_id: String,
    team: String,
    options: Vec<RideOption>,
    seed_quals: BTreeSet<String>,
}

impl Slot {
    fn has_class(&self, class: RideClass) -> bool {
        self.options.iter().any(|o| o.class == class)
    }

    fn class_count(&self, active: &BTreeSet<usize>, class: RideClass) -> usize {
        active.iter().filter(|o| self.options[**o].class == class).count()
    }
}

#[derive(Clone)]
struct SearchState {
    active: Vec<BTreeSet<usize>>,
    matrix: QualificationMatrix,
    fractions: Vec<f64>,
    score: ObjectiveScore,
}

struct SearchContext<'a> {
    problem: &'a AssignmentProblem,
    weights: &'a ObjectiveWeights,
    constraints: &'a ConstraintSet,
    budget: &'a SolveBudget,
    requirements: &'a [Requirement],
    by_qualification: HashMap<&'a str, Vec<usize>>,
    slots: Vec<Slot>,
    slot_index: HashMap<String, usize>,
    /// 班组 → 有可激活设施的工程师槽位
    teams: BTreeMap<String, Vec<usize>>,
    /// 需多人同时在岗的设施 → (该设施的要求索引, 最大所需人数)
    shared_rides: BTreeMap<String, (Vec<usize>, usize)>,
    seed: QualificationMatrix,
}

impl<'a> SearchContext<'a> {
    fn new(
        problem: &'a AssignmentProblem,
        weights: &'a ObjectiveWeights,
        constraints: &'a ConstraintSet,
        budget: &'a SolveBudget,
    ) -> Self {
        let requirements = problem.catalog.requirements();
        let mut by_qualification: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, req) in requirements.iter().enumerate() {
            by_qualification
                .entry(req.qualification_id.as_str())
                .or_default()
                .push(idx);
        }

        let seed = problem.seed_matrix(budget.seed);

        let mut engineers: Vec<_> = problem.engineers.iter().collect();
        engineers.sort_by(|a, b| a.engineer_id.cmp(&b.engineer_id));

        let slots: Vec<Slot> = engineers
            .into_iter()
            .map(|e| Slot {
                engineer_id: e.engineer_id.clone(),
                team: e.team.clone(),
                options: problem
                    .ride_options(e)
                    .into_iter()
                    .map(|(ride_id, class, qualifications)| RideOption {
                        ride_id,
                        class,
                        qualifications,
                    })
                    .collect(),
                seed_quals: seed
                    .qualifications_of(&e.engineer_id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        let slot_index = slots
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.engineer_id.clone(), idx))
            .collect();

        let mut teams: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, slot) in slots.iter().enumerate() {
            if !slot.options.is_empty() {
                teams.entry(slot.team.clone()).or_default().push(idx);
            }
        }

        let mut shared_rides: BTreeMap<String, (Vec<usize>, usize)> = BTreeMap::new();
        for (idx, req) in requirements.iter().enumerate() {
            let headcount = problem.simulator.required_headcount(req) as usize;
            let entry = shared_rides.entry(req.ride_id.clone()).or_default();
            entry.0.push(idx);
            entry.1 = entry.1.max(headcount);
        }
        shared_rides.retain(|_, (_, headcount)| *headcount >= 2);

        Self {
            problem,
            weights,
            constraints,
            budget,
            requirements,
            by_qualification,
            slots,
            slot_index,
            teams,
            shared_rides,
            seed,
        }
    }

    fn initial_state(&self) -> SearchState {
        let active = vec![BTreeSet::new(); self.slots.len()];
        let matrix = self.seed.clone();
        let fractions: Vec<f64> = self
            .requirements
            .par_iter()
            .map(|req| self.problem.simulator.coverage_fraction(req, &matrix))
            .collect();
        let score = self.evaluate(&active, &matrix, &fractions);
        SearchState {
            active,
            matrix,
            fractions,
            score,
        }
    }

    fn candidate(&self, state: &SearchState) -> Candidate {
        let activations = self
            .slots
            .iter()
            .zip(&state.active)
            .filter(|(_, active)| !active.is_empty())
            .map(|(slot, active)| {
                let rides = active
                    .iter()
                    .map(|o| slot.options[*o].ride_id.clone())
                    .collect();
                (slot.engineer_id.clone(), rides)
            })
            .collect();
        Candidate {
            matrix: state.matrix.clone(),
            activations,
            score: state.score,
        }
    }

    // ==========================================
    // 评分
    // ==========================================

    fn evaluate(
        &self,
        active: &[BTreeSet<usize>],
        matrix: &QualificationMatrix,
        fractions: &[f64],
    ) -> ObjectiveScore {
        let coverage: f64 = fractions.iter().sum();
        ObjectiveScore::compute(
            self.weights,
            coverage,
            matrix.addition_count(&self.seed),
            matrix.addition_count(&self.problem.current),
            self.imbalance(active),
        )
    }

    /// 班组内工作量极差 + 等级分配超出 1 的极差
    fn imbalance(&self, active: &[BTreeSet<usize>]) -> usize {
        let mut total = 0;
        for members in self.teams.values() {
            total += spread(members.iter().map(|s| active[*s].len()));
            for class in RideClass::ALL {
                let counts = members
                    .iter()
                    .filter(|s| self.slots[**s].has_class(class))
                    .map(|s| self.slots[*s].class_count(&active[*s], class));
                total += spread(counts).saturating_sub(1);
            }
        }
        total
    }

    fn quals_of(&self, slot: usize, active: &BTreeSet<usize>) -> BTreeSet<String> {
        let slot = &self.slots[slot];
        let mut quals = slot.seed_quals.clone();
        for o in active {
            quals.extend(slot.options[*o].qualifications.iter().cloned());
        }
        quals
    }

    /// 翻转一个激活开关,返回新状态
    fn toggled(&self, state: &SearchState, slot: usize, option: usize) -> SearchState {
        let mut active = state.active.clone();
        if !active[slot].insert(option) {
            active[slot].remove(&option);
        }

        let before = self.quals_of(slot, &state.active[slot]);
        let after = self.quals_of(slot, &active[slot]);
        let engineer_id = &self.slots[slot].engineer_id;
        let added: Vec<&String> = after.difference(&before).collect();
        let removed: Vec<&String> = before.difference(&after).collect();

        let matrix = if !added.is_empty() {
            state.matrix.with_granted(engineer_id, added.iter().map(|q| q.to_string()))
        } else if !removed.is_empty() {
            state.matrix.with_revoked(engineer_id, removed.iter().copied())
        } else {
            state.matrix.clone()
        };

        let affected: BTreeSet<usize> = added
            .iter()
            .chain(removed.iter())
            .filter_map(|q| self.by_qualification.get(q.as_str()))
            .flatten()
            .copied()
            .collect();

        let mut fractions = state.fractions.clone();
        for idx in affected {
            fractions[idx] = self
                .problem
                .simulator
                .coverage_fraction(&self.requirements[idx], &matrix);
        }

        let score = self.evaluate(&active, &matrix, &fractions);
        SearchState {
            active,
            matrix,
            fractions,
            score,
        }
    }

    /// 在给定开关中选出总分最高的翻转
    fn best_toggle<I>(&self, state: &SearchState, slot: usize, options: I) -> Option<SearchState>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut best: Option<SearchState> = None;
        for o in options {
            let trial = self.toggled(state, slot, o);
            let better = match &best {
                Some(b) => trial.score.total > b.score.total + EPS,
                None => true,
            };
            if better {
                best = Some(trial);
            }
        }
        best
    }

    // ==========================================
    // 约束
    // ==========================================

    fn workload_band(&self, members: &[usize], active: &[BTreeSet<usize>]) -> (f64, f64) {
        let total: usize = members.iter().map(|s| active[*s].len()).sum();
        let avg = total as f64 / members.len() as f64;
        let band = (self.constraints.workload_tolerance_pct * avg).max(1.0);
        (avg, band)
    }

    fn above_band(&self, active: &[BTreeSet<usize>], slot: usize) -> bool {
        let Some(members) = self.teams.get(&self.slots[slot].team) else {
            return false;
        };
        let (avg, band) = self.workload_band(members, active);
        active[slot].len() as f64 > avg + band + EPS
    }

    fn violations(&self, active: &[BTreeSet<usize>]) -> Vec<ConstraintViolation> {
        let mut out = Vec::new();

        for (team, members) in &self.teams {
            if self.constraints.workload_balance == ConstraintMode::Hard {
                let (avg, band) = self.workload_band(members, active);
                for s in members {
                    let count = active[*s].len();
                    let slot = &self.slots[*s];
                    if count as f64 > avg + band + EPS {
                        out.push(ConstraintViolation::WorkloadAbove {
                            team: team.clone(),
                            engineer_id: slot.engineer_id.clone(),
                            rides: count,
                        });
                    } else if (count as f64) < avg - band - EPS && count < slot.options.len() {
                        // 已激活全部可选设施的工程师无法再增加,不计违反
                        out.push(ConstraintViolation::WorkloadBelow {
                            team: team.clone(),
                            engineer_id: slot.engineer_id.clone(),
                            rides: count,
                        });
                    }
                }
            }

            if self.constraints.class_split == ConstraintMode::Hard {
                for class in RideClass::ALL {
                    let counts = members
                        .iter()
                        .filter(|s| self.slots[**s].has_class(class))
                        .map(|s| self.slots[*s].class_count(&active[*s], class));
                    let class_spread = spread(counts);
                    if class_spread > 1 {
                        out.push(ConstraintViolation::ClassSplit {
                            team: team.clone(),
                            class,
                            spread: class_spread,
                        });
                    }
                }
            }
        }
        out
    }

    // ==========================================
    // 搜索阶段
    // ==========================================

    fn run_pass(&self, state: &mut SearchState) -> Result<bool, Expired> {
        let mut changed = self.greedy(state)?;
        changed |= self.repair(state)?;
        changed |= self.prune(state)?;
        if self.budget.search.swap_moves {
            changed |= self.swap(state)?;
        }
        Ok(changed)
    }

    fn check_deadline(&self) -> Result<(), Expired> {
        if self.budget.expired() {
            Err(Expired)
        } else {
            Ok(())
        }
    }

    /// 贪心: 每步激活总分增益最大的设施,直到没有正增益
    fn greedy(&self, state: &mut SearchState) -> Result<bool, Expired> {
        let hard_workload = self.constraints.workload_balance == ConstraintMode::Hard;
        let mut changed = false;

        loop {
            self.check_deadline()?;
            let mut best: Option<SearchState> = None;

            for (s, slot) in self.slots.iter().enumerate() {
                for o in 0..slot.options.len() {
                    if state.active[s].contains(&o) {
                        continue;
                    }
                    let trial = self.toggled(state, s, o);
                    if hard_workload && self.above_band(&trial.active, s) {
                        continue;
                    }
                    let threshold = best
                        .as_ref()
                        .map(|b| b.score.total)
                        .unwrap_or(state.score.total);
                    if trial.score.total > threshold + EPS {
                        best = Some(trial);
                    }
                }
            }

            if best.is_none() {
                best = self.co_activation(state)?;
            }

            match best {
                Some(next) => {
                    *state = next;
                    changed = true;
                }
                None => break,
            }
        }
        Ok(changed)
    }

    /// 协同激活: 单个工程师持有多人要求的资质不产生覆盖,
    /// 在同一班组内按在岗人数进度逐个加入持有人,直到覆盖提升
    ///
    /// 组内人数不超过该设施要求的最大同时在岗人数
    fn co_activation(&self, state: &SearchState) -> Result<Option<SearchState>, Expired> {
        let hard_workload = self.constraints.workload_balance == ConstraintMode::Hard;

        for (ride_id, (req_indices, headcount)) in &self.shared_rides {
            for members in self.teams.values() {
                self.check_deadline()?;
                let mut pending: Vec<(usize, usize)> = members
                    .iter()
                    .filter_map(|s| {
                        let o = self.slots[*s]
                            .options
                            .iter()
                            .position(|opt| &opt.ride_id == ride_id)?;
                        (!state.active[*s].contains(&o)).then_some((*s, o))
                    })
                    .collect();
                if pending.len() < 2 {
                    continue;
                }

                let mut trial = state.clone();
                for _ in 0..*headcount {
                    let mut pick: Option<(usize, SearchState, f64)> = None;
                    for (i, (s, o)) in pending.iter().enumerate() {
                        let next = self.toggled(&trial, *s, *o);
                        let progress = self.staffing_progress(req_indices, &next.matrix);
                        let better = match &pick {
                            Some((_, _, best)) => progress > *best + EPS,
                            None => true,
                        };
                        if better {
                            pick = Some((i, next, progress));
                        }
                    }
                    let Some((i, next, _)) = pick else {
                        break;
                    };
                    pending.remove(i);
                    trial = next;
                    if trial.score.coverage > state.score.coverage + EPS {
                        break;
                    }
                }

                let within_band =
                    !hard_workload || !members.iter().any(|s| self.above_band(&trial.active, *s));
                if trial.score.coverage > state.score.coverage + EPS
                    && trial.score.total > state.score.total + EPS
                    && within_band
                {
                    debug!(ride_id = %ride_id, "多人协同激活");
                    return Ok(Some(trial));
                }
            }
        }
        Ok(None)
    }

    fn staffing_progress(&self, req_indices: &[usize], matrix: &QualificationMatrix) -> f64 {
        req_indices
            .iter()
            .map(|idx| {
                self.problem
                    .simulator
                    .staffing_progress(&self.requirements[*idx], matrix)
            })
            .sum()
    }

    /// 修复: 逐条处理第一个硬约束违反
    fn repair(&self, state: &mut SearchState) -> Result<bool, Expired> {
        let option_count: usize = self.slots.iter().map(|s| s.options.len()).sum();
        let max_rounds = option_count * 2 + 8;
        let mut changed = false;

        for _ in 0..max_rounds {
            self.check_deadline()?;
            let violations = self.violations(&state.active);
            let Some(first) = violations.first() else {
                break;
            };

            let next = match first {
                ConstraintViolation::WorkloadAbove { engineer_id, .. } => {
                    let s = self.slot_index[engineer_id];
                    let actives: Vec<usize> = state.active[s].iter().copied().collect();
                    self.best_toggle(state, s, actives)
                }
                ConstraintViolation::WorkloadBelow { engineer_id, .. } => {
                    let s = self.slot_index[engineer_id];
                    let inactive: Vec<usize> = (0..self.slots[s].options.len())
                        .filter(|o| !state.active[s].contains(o))
                        .collect();
                    self.best_toggle(state, s, inactive)
                }
                ConstraintViolation::ClassSplit { team, class, .. } => {
                    self.repair_class_split(state, team, *class)
                }
            };

            match next {
                Some(n) => {
                    *state = n;
                    changed = true;
                }
                None => break,
            }
        }
        Ok(changed)
    }

    /// 等级极差修复: 优先给计数最少者补一个该等级设施,否则从计数最多者撤一个
    fn repair_class_split(
        &self,
        state: &SearchState,
        team: &str,
        class: RideClass,
    ) -> Option<SearchState> {
        let members: Vec<usize> = self
            .teams
            .get(team)?
            .iter()
            .copied()
            .filter(|s| self.slots[*s].has_class(class))
            .collect();
        let count = |s: usize| self.slots[s].class_count(&state.active[s], class);
        let of_class = |s: usize| {
            (0..self.slots[s].options.len()).filter(move |o| self.slots[s].options[*o].class == class)
        };

        let min = members.iter().map(|s| count(*s)).min()?;
        let max = members.iter().map(|s| count(*s)).max()?;

        for s in members.iter().copied().filter(|s| count(*s) == min) {
            let inactive: Vec<usize> = of_class(s).filter(|o| !state.active[s].contains(o)).collect();
            if !inactive.is_empty() {
                return self.best_toggle(state, s, inactive);
            }
        }
        let s = members.iter().copied().find(|s| count(*s) == max)?;
        let actives: Vec<usize> = of_class(s).filter(|o| state.active[s].contains(o)).collect();
        self.best_toggle(state, s, actives)
    }

    /// 剪枝: 撤销不降低覆盖、且提高总分的激活
    fn prune(&self, state: &mut SearchState) -> Result<bool, Expired> {
        let mut changed = false;
        for s in 0..self.slots.len() {
            let actives: Vec<usize> = state.active[s].iter().copied().collect();
            for o in actives {
                self.check_deadline()?;
                let trial = self.toggled(state, s, o);
                if trial.score.coverage + EPS >= state.score.coverage
                    && trial.score.total > state.score.total + EPS
                    && self.violations(&trial.active).len() <= self.violations(&state.active).len()
                {
                    *state = trial;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// 交换: 同一工程师撤一个、激活另一个
    fn swap(&self, state: &mut SearchState) -> Result<bool, Expired> {
        let mut changed = false;
        for s in 0..self.slots.len() {
            let option_count = self.slots[s].options.len();
            let actives: Vec<usize> = state.active[s].iter().copied().collect();
            for o in actives {
                if !state.active[s].contains(&o) {
                    continue;
                }
                for p in 0..option_count {
                    if state.active[s].contains(&p) {
                        continue;
                    }
                    self.check_deadline()?;
                    let trial = self.toggled(&self.toggled(state, s, o), s, p);
                    if trial.score.total > state.score.total + EPS
                        && self.violations(&trial.active).len() <= self.violations(&state.active).len()
                    {
                        *state = trial;
                        changed = true;
                        break;
                    }
                }
            }
        }
        Ok(changed)
    }
}

fn spread<I: Iterator<Item = usize>>(counts: I) -> usize {
    let mut min = usize::MAX;
    let mut max = 0;
    let mut any = false;
    for c in counts {
        any = true;
        min = min.min(c);
        max = max.max(c);
    }
    if any {
        max - min
    } else {
        0
    }
}
