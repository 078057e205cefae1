use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::bucket::parse_partition;
use super::naming::{
    NameParts, bucket_metric_name, derive_name, derived_output_name, format_threshold, sanitize,
};
use super::types::{
    BucketSlot, COUNT_SLOT, CalcKind, Comparator, CompiledSpec, Condition, DerivedMetric,
    Dimension, DimensionSource, Extraction, FunnelPlan, Granularity, MetricSource, MetricSpec,
    PivotSpec, RetentionPlan, SlotSpec,
};
use crate::command::types::{RawCondition, RawDimension, RawFocus, RawMetric, RawSpec};
use crate::engine::errors::SpecError;
use crate::engine::store::filter::RecordFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Funnel,
    Retention,
}

/// Condition as written, before slots are allocated.
#[derive(Debug, Clone, PartialEq)]
enum ParsedCondition {
    Sum,
    Threshold(Comparator, f64),
    Buckets(Value),
    DependsOn(String),
}

/// Normalizes a raw spec into an executable plan. Every referenced name is
/// resolved here; execution never sees an unvalidated spec.
pub fn compile(raw: &RawSpec) -> Result<CompiledSpec, SpecError> {
    let filter = RecordFilter::from_query(raw.query.as_ref())?;
    let dimensions = raw
        .group
        .iter()
        .enumerate()
        .map(|(i, d)| compile_dimension(i, d))
        .collect::<Result<Vec<_>, _>>()?;

    let compiled = match report_kind(raw)? {
        ReportKind::Funnel => CompiledSpec::Funnel(compile_funnel(raw, filter, dimensions)?),
        ReportKind::Retention => {
            CompiledSpec::Retention(compile_retention(raw, filter, dimensions)?)
        }
    };

    info!(
        target: "snel_cohort::compile",
        dimensions = compiled.dimensions().len(),
        kind = match &compiled {
            CompiledSpec::Funnel(_) => "funnel",
            CompiledSpec::Retention(_) => "retention",
        },
        "Compiled aggregation spec"
    );
    Ok(compiled)
}

fn report_kind(raw: &RawSpec) -> Result<ReportKind, SpecError> {
    match raw.report.as_deref().map(str::trim) {
        None => Ok(if raw.action.is_some() {
            ReportKind::Retention
        } else {
            ReportKind::Funnel
        }),
        Some("funnel") | Some("cohort_funnel") | Some("action_cohort") => Ok(ReportKind::Funnel),
        Some("retention") | Some("user_retention") => Ok(ReportKind::Retention),
        Some(other) => Err(SpecError::UnknownReport(other.to_string())),
    }
}

fn compile_dimension(index: usize, raw: &RawDimension) -> Result<Dimension, SpecError> {
    let context = format!("group[{}]", index);
    let name = non_empty(raw.meta.as_deref()).ok_or_else(|| SpecError::missing(&context, "meta"))?;
    let granularity = Granularity::parse(raw.format.as_deref())?;

    let source = match raw.kind.as_deref().map(str::trim) {
        None | Some("user") => DimensionSource::Attribute,
        Some("action") | Some("event") => {
            let anchors = raw
                .attr
                .as_ref()
                .map(|a| clean_names(&a.to_vec()))
                .unwrap_or_default();
            if anchors.is_empty() {
                return Err(SpecError::missing(&context, "attr"));
            }
            if granularity == Granularity::AbVariant {
                return Err(SpecError::InvalidPivot(format!(
                    "dimension '{}' cannot read AB assignments from an event",
                    name
                )));
            }
            DimensionSource::Event { anchors }
        }
        Some(other) => return Err(SpecError::UnknownDimensionType(other.to_string())),
    };

    Ok(Dimension {
        name,
        source,
        granularity,
    })
}

fn compile_pivot(
    focus: Option<&RawFocus>,
    dimensions: &[Dimension],
) -> Result<Option<PivotSpec>, SpecError> {
    let event_dims = dimensions
        .iter()
        .filter(|d| matches!(d.source, DimensionSource::Event { .. }))
        .count();

    match focus {
        None if event_dims == 0 => Ok(None),
        None => Err(SpecError::InvalidPivot(
            "action dimensions require a focus attribute".to_string(),
        )),
        Some(focus) => {
            let field = non_empty(focus.meta.as_deref())
                .ok_or_else(|| SpecError::missing("focus", "meta"))?;
            if event_dims != 1 {
                return Err(SpecError::InvalidPivot(format!(
                    "a focused report needs exactly one action dimension, found {}",
                    event_dims
                )));
            }
            Ok(Some(PivotSpec {
                field,
                actions: clean_names(&focus.actions),
            }))
        }
    }
}

fn compile_retention(
    raw: &RawSpec,
    filter: RecordFilter,
    dimensions: Vec<Dimension>,
) -> Result<RetentionPlan, SpecError> {
    let action =
        non_empty(raw.action.as_deref()).ok_or_else(|| SpecError::missing("retention", "action"))?;

    if raw.focus.is_some()
        || dimensions
            .iter()
            .any(|d| matches!(d.source, DimensionSource::Event { .. }))
    {
        return Err(SpecError::InvalidPivot(
            "retention reports group by entity attributes only".to_string(),
        ));
    }

    let (cohort, interval) = dimensions
        .iter()
        .enumerate()
        .find_map(|(i, d)| d.granularity.time_granularity().map(|g| (i, g)))
        .ok_or(SpecError::MissingCohortDimension)?;

    if !raw.calc.is_empty() {
        warn!(
            target: "snel_cohort::compile",
            count = raw.calc.len(),
            "Retention reports ignore calc entries"
        );
    }

    Ok(RetentionPlan {
        filter,
        dimensions,
        cohort,
        interval,
        action,
        periods: raw.periods,
    })
}

fn compile_funnel(
    raw: &RawSpec,
    filter: RecordFilter,
    dimensions: Vec<Dimension>,
) -> Result<FunnelPlan, SpecError> {
    let pivot = compile_pivot(raw.focus.as_ref(), &dimensions)?;
    if raw.action.is_some() {
        warn!(target: "snel_cohort::compile", "Funnel reports ignore 'action'");
    }

    let mut builder = FunnelBuilder::new();
    for (i, metric) in raw.calc.iter().enumerate() {
        builder.add(i, metric)?;
    }
    let (slots, metrics, derived) = builder.resolve()?;

    let mut event_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, metric) in metrics.iter().enumerate() {
        if let MetricSource::Events { names, .. } = &metric.source {
            for name in names {
                let entry = event_index.entry(name.clone()).or_default();
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }
        }
    }

    debug!(
        target: "snel_cohort::compile",
        slots = slots.len(),
        metrics = metrics.len(),
        derived = derived.len(),
        pivot = pivot.is_some(),
        "Funnel plan layout"
    );

    Ok(FunnelPlan {
        filter,
        dimensions,
        slots,
        metrics,
        derived,
        pivot,
        event_index,
    })
}

struct PendingDerived {
    name: String,
    kind: CalcKind,
    numerator: String,
    by: String,
    owner: String,
}

/// Allocates accumulator slots in declaration order and tracks every name
/// handed out so collisions are caught before execution.
struct FunnelBuilder {
    slots: Vec<SlotSpec>,
    metrics: Vec<MetricSpec>,
    pending: Vec<PendingDerived>,
    pending_by: Vec<String>,
    names: HashSet<String>,
}

impl FunnelBuilder {
    fn new() -> Self {
        let mut names = HashSet::new();
        names.insert(COUNT_SLOT.to_string());
        Self {
            slots: vec![SlotSpec {
                name: COUNT_SLOT.to_string(),
                kind: CalcKind::Sum,
            }],
            metrics: Vec::new(),
            pending: Vec::new(),
            pending_by: Vec::new(),
            names,
        }
    }

    fn claim(&mut self, name: &str) -> Result<(), SpecError> {
        if !self.names.insert(name.to_string()) {
            return Err(SpecError::DuplicateMetric(name.to_string()));
        }
        Ok(())
    }

    fn push_slot(&mut self, name: &str, kind: CalcKind) -> Result<usize, SpecError> {
        self.claim(name)?;
        self.slots.push(SlotSpec {
            name: name.to_string(),
            kind,
        });
        Ok(self.slots.len() - 1)
    }

    fn add(&mut self, index: usize, raw: &RawMetric) -> Result<(), SpecError> {
        let context = format!("calc[{}]", index);
        let kind = CalcKind::parse(raw.calc.as_deref())?;
        let targets = raw
            .attr
            .as_ref()
            .map(|a| clean_names(&a.to_vec()))
            .unwrap_or_default();
        if targets.is_empty() {
            return Err(SpecError::missing(&context, "attr"));
        }
        let label = raw
            .name
            .clone()
            .unwrap_or_else(|| targets.join("_or_"));

        let is_user = match raw.kind.as_deref().map(str::trim) {
            None | Some("action") | Some("event") => false,
            Some("user") | Some("attribute") => true,
            Some(other) => return Err(SpecError::UnknownMetricType(other.to_string())),
        };

        let mut condition = parse_condition(&label, raw.cond.as_ref())?;
        if let ParsedCondition::Threshold(comparator, _) = &condition {
            if kind != CalcKind::Percentage {
                warn!(
                    target: "snel_cohort::compile",
                    metric = %label,
                    comparator = comparator.label(),
                    "Threshold conditions only apply to percentage metrics; ignoring"
                );
                condition = ParsedCondition::Sum;
            }
        }

        let meta = non_empty(raw.meta.as_deref());
        let source = if is_user {
            if targets.len() != 1 {
                return Err(SpecError::InvalidMetric {
                    metric: label,
                    reason: "user metrics read exactly one attribute".to_string(),
                });
            }
            if meta.is_some() {
                warn!(target: "snel_cohort::compile", metric = %label, "User metrics ignore 'meta'");
            }
            let bucketed = matches!(condition, ParsedCondition::Buckets(_));
            if raw.value.is_none() && !bucketed {
                return Err(SpecError::InvalidMetric {
                    metric: label,
                    reason: "user metrics need a value or a bucket condition".to_string(),
                });
            }
            MetricSource::Attribute {
                attribute: targets[0].clone(),
                literal: if bucketed { None } else { raw.value.clone() },
            }
        } else {
            let extraction = match (&meta, &raw.value) {
                (None, None) => Extraction::Count,
                (Some(m), None) => Extraction::SumAttribute(m.clone()),
                (Some(m), Some(v)) => Extraction::MatchValue {
                    attribute: m.clone(),
                    literal: v.clone(),
                },
                (None, Some(_)) => {
                    return Err(SpecError::InvalidMetric {
                        metric: label,
                        reason: "a value literal needs 'meta'".to_string(),
                    });
                }
            };
            MetricSource::Events {
                names: targets.clone(),
                extraction,
            }
        };

        let name = match non_empty(raw.name.as_deref()) {
            Some(explicit) => explicit,
            None => {
                let prefix = match (&condition, kind) {
                    (ParsedCondition::Threshold(c, t), CalcKind::Percentage) => {
                        Some((c.label(), format_threshold(*t)))
                    }
                    (ParsedCondition::DependsOn(companion), CalcKind::Percentage) => {
                        Some(("if", sanitize(companion)))
                    }
                    _ => None,
                };
                let literal = match &source {
                    MetricSource::Events {
                        extraction: Extraction::MatchValue { literal, .. },
                        ..
                    } => Some(literal),
                    MetricSource::Attribute {
                        literal: Some(literal),
                        ..
                    } => Some(literal),
                    _ => None,
                };
                derive_name(&NameParts {
                    targets: &targets,
                    condition: prefix,
                    attribute: if is_user { None } else { meta.as_deref() },
                    literal,
                })
            }
        };

        let by = non_empty(raw.by.as_deref()).unwrap_or_else(|| COUNT_SLOT.to_string());
        if !matches!(condition, ParsedCondition::Buckets(_))
            && self.shares_slot(&name, &source, &condition)?
        {
            debug!(target: "snel_cohort::compile", metric = %name, "Reusing accumulator of an identical metric");
            self.push_derived(kind, &name, raw.calc_name.as_deref(), &by);
            return Ok(());
        }

        let attribute_buckets = is_user && matches!(condition, ParsedCondition::Buckets(_));
        let slot = if attribute_buckets {
            None
        } else {
            Some(self.push_slot(&name, kind)?)
        };

        let compiled_condition = match condition {
            ParsedCondition::Sum => Condition::Sum,
            ParsedCondition::Threshold(comparator, threshold) => Condition::Threshold {
                comparator,
                threshold,
            },
            ParsedCondition::DependsOn(companion) => Condition::DependsOn {
                companion,
                slot: 0,
            },
            ParsedCondition::Buckets(raw_buckets) => {
                if raw.calc_name.is_some() {
                    warn!(target: "snel_cohort::compile", metric = %name, "calc_name is ignored on bucket metrics");
                }
                let mut slots = Vec::new();
                for bucket in parse_partition(&name, &raw_buckets)? {
                    let sub = bucket_metric_name(&name, &bucket.label());
                    let slot = self.push_slot(&sub, kind)?;
                    if let Some(prefix) = kind.derived_prefix() {
                        self.pending.push(PendingDerived {
                            name: derived_output_name(prefix, &sub),
                            kind,
                            numerator: sub.clone(),
                            by: by.clone(),
                            owner: name.clone(),
                        });
                    }
                    slots.push(BucketSlot {
                        bucket,
                        name: sub,
                        slot,
                    });
                }
                Condition::Buckets(slots)
            }
        };

        if !matches!(compiled_condition, Condition::Buckets(_)) {
            self.push_derived(kind, &name, raw.calc_name.as_deref(), &by);
        }

        self.pending_by.push(by);
        self.metrics.push(MetricSpec {
            name,
            kind,
            source,
            condition: compiled_condition,
            slot,
            denominator: 0,
        });
        Ok(())
    }

    fn push_derived(&mut self, kind: CalcKind, name: &str, calc_name: Option<&str>, by: &str) {
        let Some(prefix) = kind.derived_prefix() else {
            return;
        };
        let output = non_empty(calc_name).unwrap_or_else(|| derived_output_name(prefix, name));
        self.pending.push(PendingDerived {
            name: output,
            kind,
            numerator: name.to_string(),
            by: by.to_string(),
            owner: name.to_string(),
        });
    }

    /// `avg` and `pct` over the same events share one accumulator. A name
    /// reused with a different definition is a collision.
    fn shares_slot(
        &self,
        name: &str,
        source: &MetricSource,
        condition: &ParsedCondition,
    ) -> Result<bool, SpecError> {
        let Some(existing) = self.metrics.iter().find(|m| m.name == name) else {
            return Ok(false);
        };
        let same_condition = match (&existing.condition, condition) {
            (Condition::Sum, ParsedCondition::Sum) => true,
            (
                Condition::Threshold {
                    comparator,
                    threshold,
                },
                ParsedCondition::Threshold(c, t),
            ) => comparator == c && threshold == t,
            (Condition::DependsOn { companion, .. }, ParsedCondition::DependsOn(c)) => {
                companion == c
            }
            _ => false,
        };
        if same_condition && existing.slot.is_some() && existing.source == *source {
            Ok(true)
        } else {
            Err(SpecError::DuplicateMetric(name.to_string()))
        }
    }

    fn lookup(&self, owner: &str, reference: &str) -> Result<usize, SpecError> {
        self.slots
            .iter()
            .position(|s| s.name == reference)
            .ok_or_else(|| SpecError::UnknownMetricReference {
                metric: owner.to_string(),
                reference: reference.to_string(),
            })
    }

    /// Resolves `by` and dependent-if references once every slot exists.
    fn resolve(mut self) -> Result<(Vec<SlotSpec>, Vec<MetricSpec>, Vec<DerivedMetric>), SpecError> {
        for (i, by) in self.pending_by.iter().enumerate() {
            let owner = self.metrics[i].name.clone();
            let denominator = self.lookup(&owner, by)?;
            let companion_slot = match &self.metrics[i].condition {
                Condition::DependsOn { companion, .. } => Some(self.lookup(&owner, companion)?),
                _ => None,
            };
            let metric = &mut self.metrics[i];
            metric.denominator = denominator;
            if let (Condition::DependsOn { slot, .. }, Some(resolved)) =
                (&mut metric.condition, companion_slot)
            {
                *slot = resolved;
            }
        }

        let pending = std::mem::take(&mut self.pending);
        let mut derived = Vec::with_capacity(pending.len());
        for p in pending {
            self.claim(&p.name)?;
            derived.push(DerivedMetric {
                numerator: self.lookup(&p.owner, &p.numerator)?,
                denominator: self.lookup(&p.owner, &p.by)?,
                name: p.name,
                kind: p.kind,
            });
        }

        Ok((self.slots, self.metrics, derived))
    }
}

fn parse_condition(metric: &str, raw: Option<&RawCondition>) -> Result<ParsedCondition, SpecError> {
    let Some(raw) = raw else {
        return Ok(ParsedCondition::Sum);
    };

    let comparator = match raw.kind.as_deref().map(str::trim) {
        None | Some("total") | Some("sum") => return Ok(ParsedCondition::Sum),
        Some("at_least") | Some("at-least") => Comparator::AtLeast,
        Some("at_most") | Some("at-most") => Comparator::AtMost,
        Some("exactly") => Comparator::Exactly,
        Some("bucket") | Some("buckets") => {
            return raw
                .value
                .clone()
                .map(ParsedCondition::Buckets)
                .ok_or_else(|| SpecError::InvalidBucket {
                    metric: metric.to_string(),
                    reason: "bucket condition needs a list of buckets".to_string(),
                });
        }
        Some("if") | Some("dependent_if") | Some("dependent-if") => {
            return match &raw.value {
                Some(Value::String(companion)) if !companion.trim().is_empty() => {
                    Ok(ParsedCondition::DependsOn(companion.trim().to_string()))
                }
                _ => Err(SpecError::missing(format!("cond of '{}'", metric), "value")),
            };
        }
        Some(other) => return Err(SpecError::UnknownComparator(other.to_string())),
    };

    let threshold = match &raw.value {
        None => 1.0,
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| SpecError::InvalidThreshold {
            metric: metric.to_string(),
            reason: format!("{} is not representable", n),
        })?,
        Some(other) => {
            return Err(SpecError::InvalidThreshold {
                metric: metric.to_string(),
                reason: format!("expected a number, got {}", other),
            });
        }
    };
    Ok(ParsedCondition::Threshold(comparator, threshold))
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn clean_names(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|s| non_empty(Some(s)))
        .collect()
}
