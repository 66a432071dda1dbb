use crate::collection::operation::IndexManager;
use crate::collection::{DocId, FindOptions, FindPlan, ScanStrategy};
use crate::common::Value;
use crate::filter::Filter;
use std::collections::HashSet;

/// Chooses how the candidates of a query are gathered.
///
/// In order of preference:
/// 1. equality or membership on the id field reads primary records directly
/// 2. equality or membership on indexed fields intersects their index entries
/// 3. anything else scans the collection
///
/// The plan only narrows the candidate set; execution always re-checks the whole
/// filter, so the choice never changes the result.
#[derive(Clone)]
pub(crate) struct FindOptimizer {
    id_field: String,
    index_manager: IndexManager,
}

impl FindOptimizer {
    pub fn new(id_field: &str, index_manager: IndexManager) -> Self {
        FindOptimizer {
            id_field: id_field.to_string(),
            index_manager,
        }
    }

    pub fn create_find_plan(&self, filter: Filter, find_options: &FindOptions) -> FindPlan {
        let strategy = self.choose_strategy(&filter);
        let plan = FindPlan::new(
            filter,
            strategy,
            find_options.sort_by.clone(),
            find_options.skip,
            find_options.limit,
        );
        log::debug!("Find plan: {}", plan);
        plan
    }

    fn choose_strategy(&self, filter: &Filter) -> ScanStrategy {
        if let Some(ids) = self.id_lookup(filter) {
            return ScanStrategy::IdLookup(ids);
        }

        let probes = filter
            .predicates()
            .iter()
            .filter(|predicate| self.index_manager.is_indexed(predicate.field()))
            .filter_map(|predicate| {
                predicate
                    .predicate()
                    .probe_values()
                    .map(|values| self.index_manager.probe(predicate.field(), values))
            })
            .collect::<Vec<_>>();

        if probes.is_empty() {
            ScanStrategy::FullScan
        } else {
            ScanStrategy::IndexIntersection(probes)
        }
    }

    /// Ids named by the filter, intersected over every id clause.
    fn id_lookup(&self, filter: &Filter) -> Option<Vec<DocId>> {
        let mut ids: Option<Vec<DocId>> = None;
        for predicate in filter.predicates() {
            if predicate.field() != self.id_field {
                continue;
            }
            let Some(values) = predicate.predicate().probe_values() else {
                continue;
            };

            let clause_ids = distinct_ids(values);
            ids = Some(match ids {
                None => clause_ids,
                Some(current) => {
                    let allowed = clause_ids.into_iter().collect::<HashSet<_>>();
                    current.into_iter().filter(|id| allowed.contains(id)).collect()
                }
            });
        }
        ids
    }
}

fn distinct_ids(values: &[Value]) -> Vec<DocId> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| DocId::from_canonical(value.canonical()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SortOrder;
    use crate::filter;
    use crate::filter::FilterSpec;

    fn optimizer() -> FindOptimizer {
        let fields = ["role", "age"].iter().map(|f| f.to_string()).collect();
        FindOptimizer::new("userId", IndexManager::new("", "users", fields))
    }

    fn plan(spec: FilterSpec) -> FindPlan {
        optimizer().create_find_plan(Filter::compile(&spec).unwrap(), &FindOptions::new())
    }

    #[test]
    fn test_indexed_equality_uses_index() {
        let plan = plan(filter! { role: "CTO" });
        assert_eq!(plan.index_probes().len(), 1);
        assert_eq!(plan.index_probes()[0].field(), "role");
    }

    #[test]
    fn test_multiple_indexed_clauses_intersect() {
        let plan = plan(filter! { role: "CTO", age: { "$in": [30, 40] }, name: "x" });
        let fields = plan
            .index_probes()
            .iter()
            .map(|probe| probe.field().to_string())
            .collect::<Vec<_>>();
        assert_eq!(fields, vec!["role", "age"]);
        assert_eq!(plan.index_probes()[1].keys().len(), 2);
    }

    #[test]
    fn test_range_on_indexed_field_scans() {
        assert!(plan(filter! { age: { "$gt": 25 } }).is_full_scan());
        assert!(plan(filter! { role: { "$ne": "CTO" } }).is_full_scan());
    }

    #[test]
    fn test_unindexed_field_scans() {
        assert!(plan(filter! { name: "alice" }).is_full_scan());
        assert!(plan(filter! {}).is_full_scan());
    }

    #[test]
    fn test_mixed_clauses_probe_indexed_only() {
        let plan = plan(filter! { role: "CTO", age: { "$gt": 25 } });
        assert_eq!(plan.index_probes().len(), 1);
        assert_eq!(plan.filter().predicates().len(), 2);
    }

    #[test]
    fn test_id_field_uses_lookup() {
        let plan = plan(filter! { userId: 3, role: "CTO" });
        match plan.strategy() {
            ScanStrategy::IdLookup(ids) => assert_eq!(ids.len(), 1),
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_id_clauses_intersect() {
        let plan = plan(filter! {
            userId: { "$in": [1, 2, 3, 2] },
            "userId": { "$in": [2, 3, 4] },
        });
        match plan.strategy() {
            ScanStrategy::IdLookup(ids) => {
                let ids = ids.iter().map(|id| id.as_str()).collect::<Vec<_>>();
                assert_eq!(ids, vec!["n:2", "n:3"]);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_id_range_scans() {
        assert!(plan(filter! { userId: { "$gt": 1 } }).is_full_scan());
    }

    #[test]
    fn test_options_are_carried() {
        let options = FindOptions::new()
            .sort_by("age", SortOrder::Descending)
            .skip(1)
            .limit(2);
        let plan = optimizer().create_find_plan(Filter::default(), &options);
        assert_eq!(plan.sort_order(), &[("age".to_string(), SortOrder::Descending)]);
        assert_eq!(plan.skip(), Some(1));
        assert_eq!(plan.limit(), Some(2));
    }
}
