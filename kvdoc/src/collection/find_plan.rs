use crate::collection::DocId;
use crate::common::{SortOrder, Value};
use crate::filter::Filter;
use itertools::Itertools;
use std::fmt::Display;
use std::sync::Arc;

/// One index lookup of an index-driven plan.
///
/// A probe with a single value is an equality lookup; several values come from
/// `$in` and are unioned before being intersected with the other probes.
#[derive(Clone, Debug)]
pub struct IndexProbe {
    field: String,
    values: Vec<Value>,
    keys: Vec<String>,
}

impl IndexProbe {
    pub(crate) fn new(field: &str, values: Vec<Value>, keys: Vec<String>) -> Self {
        IndexProbe {
            field: field.to_string(),
            values,
            keys,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Index entry keys consulted by this probe, one per distinct value.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_single_valued(&self) -> bool {
        self.keys.len() == 1
    }
}

/// How the candidate documents of a query are gathered.
#[derive(Clone, Debug)]
pub enum ScanStrategy {
    /// The filter names the documents by id; their primary records are read directly.
    IdLookup(Vec<DocId>),
    /// Candidates are the intersection of one or more index lookups.
    IndexIntersection(Vec<IndexProbe>),
    /// Every document of the collection is a candidate.
    FullScan,
}

/// Execution plan of a find operation.
///
/// The plan is produced by the optimizer and can be inspected with
/// `Collection::explain` or `DocumentCursor::find_plan`. Whatever the strategy,
/// every candidate is re-checked against the complete [Filter].
#[derive(Clone)]
pub struct FindPlan {
    inner: Arc<FindPlanInner>,
}

impl FindPlan {
    pub(crate) fn new(
        filter: Filter,
        strategy: ScanStrategy,
        sort_by: Vec<(String, SortOrder)>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Self {
        FindPlan {
            inner: Arc::new(FindPlanInner {
                filter,
                strategy,
                sort_by,
                skip,
                limit,
            }),
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.inner.filter
    }

    pub fn strategy(&self) -> &ScanStrategy {
        &self.inner.strategy
    }

    pub fn is_full_scan(&self) -> bool {
        matches!(self.inner.strategy, ScanStrategy::FullScan)
    }

    pub fn is_id_lookup(&self) -> bool {
        matches!(self.inner.strategy, ScanStrategy::IdLookup(_))
    }

    pub fn index_probes(&self) -> &[IndexProbe] {
        match &self.inner.strategy {
            ScanStrategy::IndexIntersection(probes) => probes,
            _ => &[],
        }
    }

    pub fn sort_order(&self) -> &[(String, SortOrder)] {
        &self.inner.sort_by
    }

    pub fn skip(&self) -> Option<u64> {
        self.inner.skip
    }

    pub fn limit(&self) -> Option<u64> {
        self.inner.limit
    }
}

struct FindPlanInner {
    filter: Filter,
    strategy: ScanStrategy,
    sort_by: Vec<(String, SortOrder)>,
    skip: Option<u64>,
    limit: Option<u64>,
}

impl Display for FindPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.strategy() {
            ScanStrategy::IdLookup(ids) => {
                write!(f, "IdLookup[{}]", ids.iter().join(", "))?;
            }
            ScanStrategy::IndexIntersection(probes) => {
                write!(
                    f,
                    "IndexIntersection[{}]",
                    probes
                        .iter()
                        .map(|probe| format!(
                            "{} in [{}]",
                            probe.field(),
                            probe.values().iter().join(", ")
                        ))
                        .join(" & ")
                )?;
            }
            ScanStrategy::FullScan => write!(f, "FullScan")?,
        }
        write!(f, " filter {}", self.filter())?;
        if !self.sort_order().is_empty() {
            write!(
                f,
                " sort [{}]",
                self.sort_order()
                    .iter()
                    .map(|(field, order)| format!("{} {:?}", field, order))
                    .join(", ")
            )?;
        }
        if let Some(skip) = self.skip() {
            write!(f, " skip {}", skip)?;
        }
        if let Some(limit) = self.limit() {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FindPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FindPlan({})", self)
    }
}
