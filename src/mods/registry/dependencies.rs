//! Mod dependency resolution
//!
//! Validates declared dependencies and computes the load order. Failures are
//! localized: a mod with unmet dependencies is excluded together with its
//! dependents, everything else still gets ordered.

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::mods::problems::{ProblemKind, ProblemReporter, Stage};
use crate::mods::registry::entries::LoadingEntryRegistry;

/// Dependency resolution result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLoadOrder {
    order: Vec<String>,
    excluded: Vec<String>,
}

impl ResolvedLoadOrder {
    /// Identifiers in load order (dependencies first)
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Identifiers left out of the plan, in registration order
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Dependency resolver
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve dependencies of every registered entry and determine load order
    pub fn resolve(
        registry: &LoadingEntryRegistry,
        reporter: &mut ProblemReporter,
    ) -> ResolvedLoadOrder {
        let entries = registry.entries();
        let mut excluded = vec![false; entries.len()];

        // Unmet required dependencies
        for (i, entry) in entries.iter().enumerate() {
            let info = entry.info();
            for dep in info.required_dependencies() {
                let kind = match registry.get(&dep.id) {
                    Err(_) => ProblemKind::MissingDependency {
                        dependent: info.id.clone(),
                        target: dep.id.clone(),
                    },
                    Ok(target) if !dep.is_satisfied_by(&target.info().version) => {
                        ProblemKind::IncompatibleVersion {
                            dependent: info.id.clone(),
                            target: dep.id.clone(),
                            required: dep.min_version.to_string(),
                            found: target.info().version.to_string(),
                        }
                    }
                    Ok(_) => continue,
                };
                reporter.record(Stage::Resolution, info.id.clone(), kind);
                excluded[i] = true;
            }
        }

        // Propagate exclusions to dependents
        Self::cascade(registry, &mut excluded, reporter);

        // Optional ordering edges given up to break optional-only cycles
        let mut relaxed: HashSet<(usize, usize)> = HashSet::new();

        let order = loop {
            // Build dependency graph and sort what can be sorted
            let graph = Self::build_graph(registry, &excluded, &relaxed);
            let sorted = Self::topological_sort(&graph, &excluded);

            let remaining: Vec<usize> = {
                let in_order: BTreeSet<usize> = sorted.iter().copied().collect();
                (0..entries.len())
                    .filter(|i| !excluded[*i] && !in_order.contains(i))
                    .collect()
            };
            if remaining.is_empty() {
                break sorted;
            }

            // Check for circular required dependencies
            let cycles = find_cycles(&graph, &remaining, true);
            if !cycles.is_empty() {
                for cycle in cycles {
                    let members: Vec<String> = cycle
                        .iter()
                        .map(|&i| entries[i].identifier().to_string())
                        .collect();
                    reporter.record(
                        Stage::Resolution,
                        members[0].clone(),
                        ProblemKind::DependencyCycle(members),
                    );
                    for i in cycle {
                        excluded[i] = true;
                    }
                }
                Self::cascade(registry, &mut excluded, reporter);
                continue;
            }

            // Only optional edges close the remaining cycles; drop them and re-sort
            let mut dropped = 0;
            for component in find_cycles(&graph, &remaining, false) {
                for &from in &component {
                    for edge in &graph[from] {
                        if !edge.required && component.binary_search(&edge.to).is_ok() {
                            debug!(
                                "Ignoring optional ordering {} -> {} inside a dependency cycle",
                                entries[from].identifier(),
                                entries[edge.to].identifier()
                            );
                            relaxed.insert((from, edge.to));
                            dropped += 1;
                        }
                    }
                }
            }
            if dropped == 0 {
                // Unreachable: nodes left over by Kahn's algorithm always contain a cycle
                warn!("Unsortable mods without a detectable cycle: {:?}", remaining);
                for i in remaining {
                    excluded[i] = true;
                }
            }
        };

        // Map positions back to identifiers
        let order: Vec<String> = order
            .into_iter()
            .map(|i| entries[i].identifier().to_string())
            .collect();
        let excluded: Vec<String> = entries
            .iter()
            .zip(&excluded)
            .filter(|(_, &ex)| ex)
            .map(|(e, _)| e.identifier().to_string())
            .collect();

        info!(
            "Dependency resolution complete: {} to load, {} excluded",
            order.len(),
            excluded.len()
        );
        debug!("Load order: {:?}", order);

        ResolvedLoadOrder { order, excluded }
    }

    /// Exclude every entry whose required dependency is excluded, transitively
    fn cascade(
        registry: &LoadingEntryRegistry,
        excluded: &mut [bool],
        reporter: &mut ProblemReporter,
    ) {
        let entries = registry.entries();
        let mut changed = true;
        while changed {
            changed = false;
            for (i, entry) in entries.iter().enumerate() {
                if excluded[i] {
                    continue;
                }
                let broken = entry
                    .info()
                    .required_dependencies()
                    .find(|dep| registry.position(&dep.id).map_or(true, |j| excluded[j]));
                if let Some(dep) = broken {
                    reporter.record(
                        Stage::Resolution,
                        entry.identifier().to_string(),
                        ProblemKind::ExcludedDependency {
                            dependent: entry.identifier().to_string(),
                            dependency: dep.id.clone(),
                        },
                    );
                    excluded[i] = true;
                    changed = true;
                }
            }
        }
    }

    /// Adjacency list of dependency -> dependents among surviving entries
    ///
    /// Optional dependencies contribute ordering edges when their target survives,
    /// unless the edge was relaxed to break an optional-only cycle.
    fn build_graph(
        registry: &LoadingEntryRegistry,
        excluded: &[bool],
        relaxed: &HashSet<(usize, usize)>,
    ) -> Vec<Vec<Edge>> {
        let entries = registry.entries();
        let mut graph = vec![Vec::new(); entries.len()];

        for (i, entry) in entries.iter().enumerate() {
            if excluded[i] {
                continue;
            }
            for dep in &entry.info().dependencies {
                let Some(j) = registry.position(&dep.id) else {
                    continue;
                };
                if excluded[j] || relaxed.contains(&(j, i)) {
                    continue;
                }
                if !dep.required && !dep.is_satisfied_by(&entries[j].info().version) {
                    debug!(
                        "Optional dependency {} of {} is older than {}, ordering anyway",
                        dep.id,
                        entry.identifier(),
                        dep.min_version
                    );
                }
                graph[j].push(Edge {
                    to: i,
                    required: dep.required,
                });
            }
        }

        graph
    }

    /// Kahn's algorithm; ties broken by registration order
    fn topological_sort(graph: &[Vec<Edge>], excluded: &[bool]) -> Vec<usize> {
        let mut in_degree = vec![0usize; graph.len()];
        for edges in graph {
            for edge in edges {
                in_degree[edge.to] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = (0..graph.len())
            .filter(|&i| !excluded[i] && in_degree[i] == 0)
            .collect();
        let mut result = Vec::new();

        while let Some(node) = ready.pop_first() {
            result.push(node);
            for edge in &graph[node] {
                in_degree[edge.to] -= 1;
                if in_degree[edge.to] == 0 {
                    ready.insert(edge.to);
                }
            }
        }

        result
    }
}

/// Ordering edge from a dependency to one of its dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    to: usize,
    required: bool,
}

/// Strongly connected components among `nodes` that form a cycle
///
/// With `required_only` optional edges are ignored. Each returned cycle is
/// sorted by registration order; cycles are ordered by their first member.
/// Tarjan's algorithm with an explicit call stack.
fn find_cycles(graph: &[Vec<Edge>], nodes: &[usize], required_only: bool) -> Vec<Vec<usize>> {
    let mut in_scope = vec![false; graph.len()];
    for &n in nodes {
        in_scope[n] = true;
    }
    let follows = |edge: &Edge| in_scope[edge.to] && (edge.required || !required_only);

    let mut index: Vec<Option<usize>> = vec![None; graph.len()];
    let mut low_link = vec![0usize; graph.len()];
    let mut on_stack = vec![false; graph.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0;
    let mut components: Vec<Vec<usize>> = Vec::new();

    // (node, position of the next edge to visit)
    let mut calls: Vec<(usize, usize)> = Vec::new();

    for &root in nodes {
        if index[root].is_some() {
            continue;
        }
        index[root] = Some(next_index);
        low_link[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        calls.push((root, 0));

        while let Some(frame) = calls.last_mut() {
            let v = frame.0;
            if let Some(edge) = graph[v].get(frame.1) {
                frame.1 += 1;
                if !follows(edge) {
                    continue;
                }
                let w = edge.to;
                match index[w] {
                    None => {
                        index[w] = Some(next_index);
                        low_link[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        calls.push((w, 0));
                    }
                    Some(w_index) if on_stack[w] => {
                        low_link[v] = low_link[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            // Every edge of v visited
            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                low_link[parent] = low_link[parent].min(low_link[v]);
            }
            if Some(low_link[v]) == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    let mut cycles: Vec<Vec<usize>> = components
        .into_iter()
        .filter(|c| c.len() > 1 || graph[c[0]].iter().any(|e| e.to == c[0] && follows(e)))
        .map(|mut c| {
            c.sort_unstable();
            c
        })
        .collect();
    cycles.sort();
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::registry::discovery::PackageKind;
    use crate::mods::registry::entries::LoadingEntry;
    use crate::mods::registry::manifest::{DependencyDecl, ModInfo};
    use semver::Version;
    use std::path::PathBuf;

    fn info(id: &str, version: (u64, u64, u64), deps: &[(&str, bool)]) -> ModInfo {
        let mut info = ModInfo::synthetic(id);
        info.version = Version::new(version.0, version.1, version.2);
        info.dependencies = deps
            .iter()
            .map(|(dep, required)| DependencyDecl {
                id: dep.to_string(),
                min_version: Version::new(1, 0, 0),
                required: *required,
            })
            .collect();
        info
    }

    fn registry(infos: Vec<ModInfo>) -> LoadingEntryRegistry {
        let mut registry = LoadingEntryRegistry::new();
        let mut reporter = ProblemReporter::new();
        for info in infos {
            let source = PathBuf::from(format!("{}.so", info.id));
            registry.register(
                LoadingEntry::new(info, PackageKind::NativeModule, source, None, Vec::new()),
                &mut reporter,
            );
        }
        registry
    }

    #[test]
    fn test_tie_break_is_registration_order() {
        let registry = registry(vec![
            info("c", (1, 0, 0), &[]),
            info("a", (1, 0, 0), &[]),
            info("b", (1, 0, 0), &[("c", true)]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["c", "a", "b"]);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_dependency_moves_ahead() {
        let registry = registry(vec![
            info("b", (1, 0, 0), &[("a", true)]),
            info("a", (1, 0, 0), &[]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["a", "b"]);
    }

    #[test]
    fn test_optional_dependency_orders_but_never_excludes() {
        let registry = registry(vec![
            info("x", (1, 0, 0), &[("y", false), ("ghost", false)]),
            info("y", (1, 0, 0), &[]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["y", "x"]);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_incompatible_version_excludes() {
        let registry = registry(vec![
            info("old", (0, 9, 0), &[]),
            info("needs-old", (1, 0, 0), &[("old", true)]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["old"]);
        assert_eq!(order.excluded(), &["needs-old"]);
        assert_eq!(
            reporter.problems()[0].kind,
            ProblemKind::IncompatibleVersion {
                dependent: "needs-old".into(),
                target: "old".into(),
                required: "1.0.0".into(),
                found: "0.9.0".into(),
            }
        );
    }

    #[test]
    fn test_three_cycle_with_downstream_dependent() {
        let registry = registry(vec![
            info("a", (1, 0, 0), &[("c", true)]),
            info("b", (1, 0, 0), &[("a", true)]),
            info("c", (1, 0, 0), &[("b", true)]),
            info("d", (1, 0, 0), &[("a", true)]),
            info("e", (1, 0, 0), &[("a", false)]),
            info("f", (1, 0, 0), &[]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["e", "f"]);
        assert_eq!(order.excluded(), &["a", "b", "c", "d"]);

        let kinds: Vec<_> = reporter.problems().iter().map(|p| p.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ProblemKind::DependencyCycle(vec!["a".into(), "b".into(), "c".into()]),
                ProblemKind::ExcludedDependency {
                    dependent: "d".into(),
                    dependency: "a".into(),
                },
            ]
        );
    }

    fn edge(to: usize, required: bool) -> Edge {
        Edge { to, required }
    }

    #[test]
    fn test_find_cycles_detects_self_loop() {
        let graph = vec![vec![edge(0, true)], vec![]];
        assert_eq!(find_cycles(&graph, &[0, 1], true), vec![vec![0]]);
    }

    #[test]
    fn test_find_cycles_required_only_skips_optional_edges() {
        // 0 -> 1 required, 1 -> 0 optional, 2 <-> 3 required
        let graph = vec![
            vec![edge(1, true)],
            vec![edge(0, false)],
            vec![edge(3, true)],
            vec![edge(2, true)],
        ];
        assert_eq!(find_cycles(&graph, &[0, 1, 2, 3], true), vec![vec![2, 3]]);
        assert_eq!(
            find_cycles(&graph, &[0, 1, 2, 3], false),
            vec![vec![0, 1], vec![2, 3]]
        );
    }

    #[test]
    fn test_find_cycles_long_chain() {
        let len = 50_000;
        let mut graph: Vec<Vec<Edge>> = (0..len).map(|i| vec![edge(i + 1, true)]).collect();
        graph[len - 1] = vec![edge(0, true)];
        let nodes: Vec<usize> = (0..len).collect();

        let cycles = find_cycles(&graph, &nodes, true);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), len);
    }

    #[test]
    fn test_optional_only_cycle_is_relaxed() {
        let registry = registry(vec![
            info("a", (1, 0, 0), &[("b", false)]),
            info("b", (1, 0, 0), &[("a", false)]),
            info("c", (1, 0, 0), &[("a", true)]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["a", "b", "c"]);
        assert!(order.excluded().is_empty());
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_mixed_cycle_keeps_required_edge() {
        // b requires a; a only optionally wants b first
        let registry = registry(vec![
            info("b", (1, 0, 0), &[("a", true)]),
            info("a", (1, 0, 0), &[("b", false)]),
        ]);
        let mut reporter = ProblemReporter::new();

        let order = DependencyResolver::resolve(&registry, &mut reporter);
        assert_eq!(order.ids(), &["a", "b"]);
        assert!(reporter.is_empty());
    }
}
