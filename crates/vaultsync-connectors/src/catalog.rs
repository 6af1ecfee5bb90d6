//! Endpoint catalog with dependency-DAG validation.
//!
//! A catalog can only be constructed through [`EndpointCatalog::new`],
//! which rejects duplicate names, unknown dependency references, and
//! dependency cycles. Cycle detection happens exactly once, at
//! registration time, never lazily during a run.

use std::collections::BTreeMap;

use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;

/// Immutable, validated set of a platform's endpoints.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    endpoints: Vec<EndpointDescriptor>,
    index: BTreeMap<String, usize>,
}

impl EndpointCatalog {
    /// Build and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` on duplicate endpoint
    /// names, dependencies naming unknown endpoints, or dependency
    /// cycles.
    pub fn new(endpoints: Vec<EndpointDescriptor>) -> Result<Self, ConnectorError> {
        let mut index = BTreeMap::new();
        for (i, ep) in endpoints.iter().enumerate() {
            if index.insert(ep.name.clone(), i).is_some() {
                return Err(ConnectorError::configuration(
                    "DUPLICATE_ENDPOINT",
                    format!("endpoint '{}' declared twice", ep.name),
                ));
            }
        }

        for ep in &endpoints {
            for dep in &ep.dependencies {
                if !index.contains_key(dep) {
                    return Err(ConnectorError::configuration(
                        "UNKNOWN_DEPENDENCY",
                        format!("endpoint '{}' depends on unknown endpoint '{dep}'", ep.name),
                    ));
                }
            }
        }

        let catalog = Self { endpoints, index };
        catalog.check_acyclic()?;
        Ok(catalog)
    }

    /// DFS three-color cycle check over the dependency graph.
    fn check_acyclic(&self) -> Result<(), ConnectorError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks = vec![Mark::White; self.endpoints.len()];

        // Iterative DFS; a grey node reached again closes a cycle.
        for start in 0..self.endpoints.len() {
            if marks[start] != Mark::White {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::Grey;
            while let Some(&(node, next_dep)) = stack.last() {
                let deps = &self.endpoints[node].dependencies;
                if next_dep == deps.len() {
                    marks[node] = Mark::Black;
                    stack.pop();
                    continue;
                }
                let dep_idx = self.index[&deps[next_dep]];
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                match marks[dep_idx] {
                    Mark::Grey => {
                        return Err(ConnectorError::configuration(
                            "DEPENDENCY_CYCLE",
                            format!(
                                "dependency cycle involving endpoint '{}'",
                                self.endpoints[dep_idx].name
                            ),
                        ));
                    }
                    Mark::White => {
                        marks[dep_idx] = Mark::Grey;
                        stack.push((dep_idx, 0));
                    }
                    Mark::Black => {}
                }
            }
        }
        Ok(())
    }

    /// Look up an endpoint by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.index.get(name).map(|&i| &self.endpoints[i])
    }

    /// All endpoints in declaration order.
    #[must_use]
    pub fn as_slice(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Names of endpoints backed up when the user makes no selection,
    /// ordered by priority (declaration order breaks ties).
    #[must_use]
    pub fn default_selection(&self) -> Vec<String> {
        let mut defaults: Vec<&EndpointDescriptor> = self
            .endpoints
            .iter()
            .filter(|ep| ep.enabled_by_default)
            .collect();
        defaults.sort_by_key(|ep| ep.priority);
        defaults.into_iter().map(|ep| ep.name.clone()).collect()
    }

    /// Dependency-ordered execution plan for `selected` endpoints.
    ///
    /// The selection is expanded to its transitive dependency closure,
    /// then topologically sorted. The order is deterministic: ties break
    /// by catalog declaration order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` when a selected name is
    /// not in the catalog.
    pub fn execution_order(&self, selected: &[String]) -> Result<Vec<String>, ConnectorError> {
        let mut wanted = vec![false; self.endpoints.len()];
        let mut queue: Vec<usize> = Vec::new();
        for name in selected {
            let &idx = self.index.get(name).ok_or_else(|| {
                ConnectorError::configuration(
                    "UNKNOWN_ENDPOINT",
                    format!("endpoint '{name}' is not in the platform catalog"),
                )
            })?;
            if !wanted[idx] {
                wanted[idx] = true;
                queue.push(idx);
            }
        }

        // Expand to the dependency closure.
        while let Some(idx) = queue.pop() {
            for dep in &self.endpoints[idx].dependencies {
                let dep_idx = self.index[dep];
                if !wanted[dep_idx] {
                    wanted[dep_idx] = true;
                    queue.push(dep_idx);
                }
            }
        }

        // Kahn's algorithm, visiting candidates in declaration order.
        let mut remaining: Vec<usize> = (0..self.endpoints.len()).filter(|&i| wanted[i]).collect();
        let mut order = Vec::with_capacity(remaining.len());
        let mut done = vec![false; self.endpoints.len()];
        while !remaining.is_empty() {
            let before = order.len();
            remaining.retain(|&idx| {
                let ready = self.endpoints[idx]
                    .dependencies
                    .iter()
                    .all(|dep| done[self.index[dep]]);
                if ready {
                    done[idx] = true;
                    order.push(self.endpoints[idx].name.clone());
                }
                !ready
            });
            // Unreachable for a validated catalog; the constructor
            // already rejected cycles.
            assert!(order.len() > before, "validated catalog cannot stall");
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_types::error::ErrorCategory;

    fn ep(name: &str, deps: &[&str]) -> EndpointDescriptor {
        EndpointDescriptor::new(name, format!("/v1/{name}"), name).depends_on(deps)
    }

    #[test]
    fn valid_catalog_builds() {
        let catalog = EndpointCatalog::new(vec![
            ep("contacts", &[]),
            ep("companies", &[]),
            ep("deals", &["contacts", "companies"]),
        ])
        .unwrap();
        assert!(catalog.get("deals").is_some());
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.as_slice().len(), 3);
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = EndpointCatalog::new(vec![ep("contacts", &[]), ep("contacts", &[])]).unwrap_err();
        assert_eq!(err.code, "DUPLICATE_ENDPOINT");
    }

    #[test]
    fn unknown_dependency_rejected() {
        let err = EndpointCatalog::new(vec![ep("orders", &["contacts"])]).unwrap_err();
        assert_eq!(err.code, "UNKNOWN_DEPENDENCY");
        assert_eq!(err.category, ErrorCategory::Configuration);
    }

    #[test]
    fn cycle_rejected_at_registration() {
        let err = EndpointCatalog::new(vec![
            ep("a", &["b"]),
            ep("b", &["c"]),
            ep("c", &["a"]),
        ])
        .unwrap_err();
        assert_eq!(err.code, "DEPENDENCY_CYCLE");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = EndpointCatalog::new(vec![ep("a", &["a"])]).unwrap_err();
        assert_eq!(err.code, "DEPENDENCY_CYCLE");
    }

    #[test]
    fn execution_order_respects_dependencies() {
        let catalog = EndpointCatalog::new(vec![
            ep("c", &["a", "b"]),
            ep("b", &["a"]),
            ep("a", &[]),
        ])
        .unwrap();
        let order = catalog
            .execution_order(&["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn selection_expands_to_dependency_closure() {
        let catalog = EndpointCatalog::new(vec![
            ep("contacts", &[]),
            ep("companies", &[]),
            ep("deals", &["contacts", "companies"]),
            ep("owners", &[]),
        ])
        .unwrap();
        let order = catalog.execution_order(&["deals".into()]).unwrap();
        assert_eq!(order, vec!["contacts", "companies", "deals"]);
    }

    #[test]
    fn unknown_selection_rejected() {
        let catalog = EndpointCatalog::new(vec![ep("contacts", &[])]).unwrap();
        let err = catalog.execution_order(&["bogus".into()]).unwrap_err();
        assert_eq!(err.code, "UNKNOWN_ENDPOINT");
    }

    #[test]
    fn default_selection_honors_flag() {
        let mut hidden = ep("archived", &[]);
        hidden.enabled_by_default = false;
        let catalog = EndpointCatalog::new(vec![ep("contacts", &[]), hidden]).unwrap();
        assert_eq!(catalog.default_selection(), vec!["contacts"]);
    }

    #[test]
    fn order_is_deterministic_across_calls() {
        let catalog = EndpointCatalog::new(vec![
            ep("x", &[]),
            ep("y", &[]),
            ep("z", &["x", "y"]),
        ])
        .unwrap();
        let sel: Vec<String> = vec!["z".into(), "y".into(), "x".into()];
        let first = catalog.execution_order(&sel).unwrap();
        for _ in 0..5 {
            assert_eq!(catalog.execution_order(&sel).unwrap(), first);
        }
    }
}
