//! Dependency resolution over registered plugins.
//!
//! Nodes are `(name, dependencies)` pairs in registration order. Load order
//! is computed with Kahn's algorithm; among plugins that are ready at the
//! same time the earliest registered goes first, so the order is
//! deterministic.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use nitro_core::error::AppError;
use nitro_core::result::AppResult;

/// A plugin name with its declared dependency names.
pub type DependencyNode = (String, Vec<String>);

/// Computes plugin load orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Orders every node so that each comes after all of its dependencies.
    ///
    /// Fails with `MISSING_DEPENDENCY` when a dependency is not among the
    /// nodes (all missing names are reported at once), and with
    /// `DEPENDENCY_CYCLE` when the graph is cyclic.
    pub fn resolve(nodes: &[DependencyNode]) -> AppResult<Vec<String>> {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.as_str(), i))
            .collect();

        let missing: Vec<String> = nodes
            .iter()
            .flat_map(|(name, deps)| {
                deps.iter()
                    .filter(|dep| !index.contains_key(dep.as_str()))
                    .map(move |dep| format!("'{name}' requires '{dep}'"))
            })
            .collect();
        if !missing.is_empty() {
            return Err(AppError::missing_dependency(format!(
                "Missing plugin dependencies: {}",
                missing.join(", ")
            )));
        }

        let n = nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, (_, deps)) in nodes.iter().enumerate() {
            let unique: HashSet<usize> = deps.iter().map(|d| index[d.as_str()]).collect();
            for dep in unique {
                dependents[dep].push(i);
                in_degree[i] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = ready.pop_first() {
            order.push(nodes[i].0.clone());
            for &j in &dependents[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != n {
            let cycle = find_cycle(nodes, &index, &in_degree);
            return Err(AppError::dependency_cycle(format!(
                "Circular plugin dependency: {}",
                cycle.join(" -> ")
            )));
        }

        debug!(order = ?order, "Resolved plugin load order");
        Ok(order)
    }

    /// Orders the dependency closure of `target`, ending with `target`.
    ///
    /// Only the plugins `target` transitively requires are considered, so
    /// a problem elsewhere in the graph does not affect it.
    pub fn resolve_closure(target: &str, nodes: &[DependencyNode]) -> AppResult<Vec<String>> {
        let by_name: HashMap<&str, &Vec<String>> = nodes
            .iter()
            .map(|(name, deps)| (name.as_str(), deps))
            .collect();

        if !by_name.contains_key(target) {
            return Err(AppError::plugin_not_found(format!(
                "Plugin '{target}' is not registered"
            )));
        }

        let mut closure: HashSet<&str> = HashSet::new();
        let mut missing = Vec::new();
        let mut stack = vec![target];

        while let Some(name) = stack.pop() {
            if !closure.insert(name) {
                continue;
            }
            for dep in by_name[name] {
                if by_name.contains_key(dep.as_str()) {
                    stack.push(dep.as_str());
                } else {
                    missing.push(format!("'{name}' requires '{dep}'"));
                }
            }
        }

        if !missing.is_empty() {
            return Err(AppError::missing_dependency(format!(
                "Missing plugin dependencies: {}",
                missing.join(", ")
            )));
        }

        let subset: Vec<DependencyNode> = nodes
            .iter()
            .filter(|(name, _)| closure.contains(name.as_str()))
            .cloned()
            .collect();
        Self::resolve(&subset)
    }
}

/// Walks unresolved nodes until one repeats, returning the cycle path.
fn find_cycle(nodes: &[DependencyNode], index: &HashMap<&str, usize>, in_degree: &[usize]) -> Vec<String> {
    let Some(start) = (0..nodes.len()).find(|&i| in_degree[i] > 0) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    loop {
        if let Some(&at) = position.get(&current) {
            let mut cycle: Vec<String> = path[at..].iter().map(|&i| nodes[i].0.clone()).collect();
            cycle.push(nodes[current].0.clone());
            return cycle;
        }
        position.insert(current, path.len());
        path.push(current);

        // Every unresolved node has at least one unresolved dependency.
        let next = nodes[current]
            .1
            .iter()
            .map(|d| index[d.as_str()])
            .find(|&d| in_degree[d] > 0);
        match next {
            Some(next) => current = next,
            None => return path.iter().map(|&i| nodes[i].0.clone()).collect(),
        }
    }
}
