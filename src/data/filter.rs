use std::collections::BTreeSet;

use super::error::DataError;
use super::model::{
    normalize_column_name, CellValue, Dataset, ARRIVAL_LOCATION, BUSNAME, BUSTYPE,
    DEPARTING_TIME, DEPARTURE_LOCATION, PRICE, REACHING_TIME, ROUTE_NAME, SEATS_AVAILABLE,
    STAR_RATING, STATE,
};

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

/// How a step narrows the rows, together with its current selection.
/// `None` means unset: the step contributes no predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Keep rows whose cell equals the selected value.
    Exact(Option<CellValue>),
    /// Keep rows whose numeric cell lies in the selected `[lo, hi]`.
    Range(Option<(f64, f64)>),
}

/// Declared dependency of a step on earlier steps.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// Always evaluated.
    Always,
    /// Evaluated only if at least one earlier step on one of these columns
    /// has a concrete selection.
    AnySet(Vec<String>),
}

/// One filter step of a [`FilterChain`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    column: String,
    kind: StepKind,
    gate: Gate,
}

impl FilterStep {
    /// Unset exact-match step on `column`.
    pub fn exact(column: &str) -> Self {
        FilterStep {
            column: normalize_column_name(column),
            kind: StepKind::Exact(None),
            gate: Gate::Always,
        }
    }

    /// Unset range step on `column`.
    pub fn range(column: &str) -> Self {
        FilterStep {
            column: normalize_column_name(column),
            kind: StepKind::Range(None),
            gate: Gate::Always,
        }
    }

    /// Only evaluate this step once one of `columns` has been selected.
    pub fn gated_on(mut self, columns: &[&str]) -> Self {
        self.gate = Gate::AnySet(columns.iter().map(|c| normalize_column_name(c)).collect());
        self
    }

    /// Builder form of [`FilterStep::set_value`].
    pub fn with_value(mut self, value: impl Into<CellValue>) -> Self {
        self.set_value(value.into());
        self
    }

    /// Builder form of [`FilterStep::set_range`].
    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.set_range(lo, hi);
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Whether the step carries a concrete selection.
    pub fn is_set(&self) -> bool {
        match &self.kind {
            StepKind::Exact(v) => v.is_some(),
            StepKind::Range(r) => r.is_some(),
        }
    }

    /// Select a single value. Returns `false` (and changes nothing) if this is
    /// a range step.
    pub fn set_value(&mut self, value: CellValue) -> bool {
        match &mut self.kind {
            StepKind::Exact(sel) => {
                *sel = Some(value);
                true
            }
            StepKind::Range(_) => false,
        }
    }

    /// Select `[lo, hi]`; bounds are swapped if given in reverse. Returns
    /// `false` (and changes nothing) if this is an exact-match step.
    pub fn set_range(&mut self, lo: f64, hi: f64) -> bool {
        match &mut self.kind {
            StepKind::Range(sel) => {
                *sel = Some(if lo <= hi { (lo, hi) } else { (hi, lo) });
                true
            }
            StepKind::Exact(_) => false,
        }
    }

    /// Back to "no filter".
    pub fn clear(&mut self) {
        match &mut self.kind {
            StepKind::Exact(sel) => *sel = None,
            StepKind::Range(sel) => *sel = None,
        }
    }
}

// ---------------------------------------------------------------------------
// FilterChain
// ---------------------------------------------------------------------------

/// Ordered list of steps. Order is dependency order: each step only sees the
/// rows that survived the ones before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    steps: Vec<FilterStep>,
}

impl FilterChain {
    pub fn new(steps: Vec<FilterStep>) -> Self {
        FilterChain { steps }
    }

    /// The dashboard chain over the bus_routes table, all steps unset.
    pub fn bus_routes() -> Self {
        FilterChain::new(vec![
            FilterStep::exact(STATE),
            FilterStep::exact(ROUTE_NAME),
            FilterStep::exact(BUSNAME).gated_on(&[STATE, ROUTE_NAME]),
            FilterStep::exact(BUSTYPE),
            FilterStep::exact(DEPARTING_TIME),
            FilterStep::exact(DEPARTURE_LOCATION),
            FilterStep::exact(REACHING_TIME),
            FilterStep::exact(ARRIVAL_LOCATION),
            FilterStep::range(STAR_RATING),
            FilterStep::range(PRICE),
            FilterStep::range(SEATS_AVAILABLE),
        ])
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The first `k` steps as a chain of their own.
    pub fn prefix(&self, k: usize) -> FilterChain {
        FilterChain::new(self.steps.iter().take(k).cloned().collect())
    }

    fn step_mut(&mut self, column: &str) -> Option<&mut FilterStep> {
        let column = normalize_column_name(column);
        self.steps.iter_mut().find(|s| s.column == column)
    }

    /// Select `value` on the exact-match step for `column`.
    /// Returns `false` if there is no such step.
    pub fn select_value(&mut self, column: &str, value: CellValue) -> bool {
        self.step_mut(column)
            .map(|s| s.set_value(value))
            .unwrap_or(false)
    }

    /// Select `[lo, hi]` on the range step for `column`.
    /// Returns `false` if there is no such step.
    pub fn select_range(&mut self, column: &str, lo: f64, hi: f64) -> bool {
        self.step_mut(column)
            .map(|s| s.set_range(lo, hi))
            .unwrap_or(false)
    }

    /// Unset the step for `column`.
    pub fn clear(&mut self, column: &str) {
        if let Some(step) = self.step_mut(column) {
            step.clear();
        }
    }

    /// Unset every step.
    pub fn clear_all(&mut self) {
        self.steps.iter_mut().for_each(FilterStep::clear);
    }

    /// Bring selections back in line with `outcomes`, the step outcomes of the
    /// last `apply` of this chain. An exact selection missing from its
    /// candidates is cleared. A range selection is clipped to the new
    /// `[min, max]`, or cleared when it falls entirely outside. Selections on
    /// hidden, fixed or empty steps are cleared. Returns the columns changed.
    pub fn clear_stale(&mut self, outcomes: &[StepOutcome]) -> Vec<String> {
        let mut changed = Vec::new();
        for (step, outcome) in self.steps.iter_mut().zip(outcomes) {
            let keep = match (&mut step.kind, outcome) {
                (StepKind::Exact(None), _) | (StepKind::Range(None), _) => continue,
                (StepKind::Exact(Some(want)), StepOutcome::Values(values)) => {
                    if values.contains(want) {
                        continue;
                    }
                    false
                }
                (StepKind::Range(Some((lo, hi))), &StepOutcome::Range { min, max }) => {
                    if *lo >= min && *hi <= max {
                        continue;
                    }
                    if *hi < min || *lo > max {
                        false
                    } else {
                        *lo = lo.max(min);
                        *hi = hi.min(max);
                        true
                    }
                }
                _ => false,
            };
            if !keep {
                step.clear();
            }
            changed.push(step.column.clone());
        }
        changed
    }

    /// Whether the gate of step `k` is open, judged only by steps before it.
    fn gate_open(&self, k: usize) -> bool {
        match &self.steps[k].gate {
            Gate::Always => true,
            Gate::AnySet(columns) => self.steps[..k]
                .iter()
                .any(|s| s.is_set() && columns.contains(&s.column)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// What a step offers to whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Gate closed: nothing computed, selection ignored.
    Hidden,
    /// Distinct non-null values of the column among the surviving rows.
    Values(BTreeSet<CellValue>),
    /// Numeric bounds among the surviving rows, `min < max`.
    Range { min: f64, max: f64 },
    /// Every surviving numeric value is the same; informational only.
    Fixed(f64),
    /// No numeric value survives; the step is skipped.
    NoData,
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    /// Indices into the input dataset of the surviving rows, ascending.
    pub indices: Vec<usize>,
    /// One outcome per chain step, in chain order.
    pub steps: Vec<StepOutcome>,
}

impl Filtered {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Materialize the surviving rows as a new dataset.
    pub fn to_dataset(&self, dataset: &Dataset) -> Dataset {
        dataset.select(&self.indices)
    }
}

/// Apply `chain` to `dataset`.
///
/// Each step narrows the rows left by the previous one:
/// * Exact-match: candidates are the distinct non-null values; a selection
///   keeps equal cells only. Null cells never match.
/// * Range: bounds come from the non-null numeric cells. No such cells →
///   skipped. `min == max` → reported as fixed, never filters. Otherwise a
///   selection keeps cells with `lo <= v <= hi`; null and non-numeric cells
///   are dropped.
/// * A step whose gate is closed is skipped without computing anything.
///
/// Fails with [`DataError::Schema`] before filtering if any step names a
/// column the dataset does not have. The dataset is never modified and row
/// order is preserved.
pub fn apply(dataset: &Dataset, chain: &FilterChain) -> Result<Filtered, DataError> {
    validate(dataset, chain)?;

    let mut current: Vec<usize> = (0..dataset.len()).collect();
    let mut steps = Vec::with_capacity(chain.len());

    for k in 0..chain.len() {
        let outcome = evaluate(dataset, chain, k, &mut current);
        steps.push(outcome);
    }

    log::debug!(
        "filter chain of {} steps kept {} of {} rows",
        chain.len(),
        current.len(),
        dataset.len()
    );

    Ok(Filtered {
        indices: current,
        steps,
    })
}

/// Outcome of step `k` alone, computed on the rows surviving steps `0..k`.
/// `None` if the chain has no step `k`.
pub fn candidates_at(
    dataset: &Dataset,
    chain: &FilterChain,
    k: usize,
) -> Result<Option<StepOutcome>, DataError> {
    validate(dataset, chain)?;
    if k >= chain.len() {
        return Ok(None);
    }

    let mut current: Vec<usize> = (0..dataset.len()).collect();
    for j in 0..k {
        evaluate(dataset, chain, j, &mut current);
    }
    Ok(Some(evaluate(dataset, chain, k, &mut current)))
}

fn validate(dataset: &Dataset, chain: &FilterChain) -> Result<(), DataError> {
    match chain.steps.iter().find(|s| !dataset.has_column(&s.column)) {
        Some(step) => Err(DataError::Schema {
            column: step.column.clone(),
        }),
        None => Ok(()),
    }
}

/// Run step `k` over `current`, narrowing it in place.
fn evaluate(dataset: &Dataset, chain: &FilterChain, k: usize, current: &mut Vec<usize>) -> StepOutcome {
    if !chain.gate_open(k) {
        return StepOutcome::Hidden;
    }

    let step = &chain.steps[k];
    let column = step.column.as_str();

    match &step.kind {
        StepKind::Exact(selected) => {
            let candidates: BTreeSet<CellValue> = current
                .iter()
                .map(|&i| dataset.value(i, column))
                .filter(|v| !v.is_null())
                .cloned()
                .collect();

            if let Some(want) = selected {
                current.retain(|&i| {
                    let v = dataset.value(i, column);
                    !v.is_null() && v == want
                });
            }
            StepOutcome::Values(candidates)
        }
        StepKind::Range(selected) => {
            let bounds = current
                .iter()
                .filter_map(|&i| dataset.value(i, column).as_f64())
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                });

            match bounds {
                None => StepOutcome::NoData,
                Some((min, max)) if min == max => StepOutcome::Fixed(min),
                Some((min, max)) => {
                    if let Some((lo, hi)) = *selected {
                        current.retain(|&i| {
                            dataset
                                .value(i, column)
                                .as_f64()
                                .is_some_and(|v| lo <= v && v <= hi)
                        });
                    }
                    StepOutcome::Range { min, max }
                }
            }
        }
    }
}
