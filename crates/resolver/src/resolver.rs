//! Turning a selection into an ordered plan

use crate::graph::DependencyGraph;
use crate::plan::{InstallReason, Plan, PlanEntry, ResolveRequest};
use ifw_errors::{DependencyError, Error};
use ifw_types::{Component, Dependency, RunMode, Version};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Resolve `request` against the known `components`
///
/// For install and update, `components` are the available ones from
/// repository metadata. For uninstall they describe what is installed.
///
/// # Errors
///
/// `UnknownComponent`, `Unresolved`, `VersionMismatch`, `Cycle`,
/// `StillRequired` or `ForcedComponent`.
pub fn resolve(components: &[Component], request: &ResolveRequest) -> Result<Plan, Error> {
    let index: BTreeMap<&str, &Component> =
        components.iter().map(|c| (c.name.as_str(), c)).collect();
    let plan = match request.mode {
        RunMode::Install => resolve_install(&index, request)?,
        RunMode::Update => resolve_update(&index, request)?,
        RunMode::Uninstall => resolve_uninstall(&index, request)?,
    };
    tracing::debug!(
        mode = %plan.mode,
        install = ?plan.install_names(),
        remove = ?plan.remove,
        "resolved plan"
    );
    Ok(plan)
}

struct Expansion<'a> {
    index: &'a BTreeMap<&'a str, &'a Component>,
    installed: &'a BTreeMap<String, Version>,
    reasons: BTreeMap<String, InstallReason>,
    queue: VecDeque<String>,
}

impl<'a> Expansion<'a> {
    fn new(
        index: &'a BTreeMap<&'a str, &'a Component>,
        installed: &'a BTreeMap<String, Version>,
    ) -> Self {
        Self {
            index,
            installed,
            reasons: BTreeMap::new(),
            queue: VecDeque::new(),
        }
    }

    fn add(&mut self, name: &str, reason: InstallReason) {
        if !self.reasons.contains_key(name) {
            self.reasons.insert(name.to_string(), reason);
            self.queue.push_back(name.to_string());
        }
    }

    fn component(&self, name: &str) -> Result<&'a Component, Error> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DependencyError::UnknownComponent(name.to_string()).into())
    }

    /// Pull in one requirement of `owner`, unless an installed version
    /// already satisfies it
    fn require(
        &mut self,
        owner: &str,
        dependency: &Dependency,
        reason: InstallReason,
    ) -> Result<(), Error> {
        if self.reasons.contains_key(&dependency.name) {
            return self.check_planned(owner, dependency);
        }
        if let Some(installed) = self.installed.get(&dependency.name) {
            if dependency.is_satisfied_by(installed) {
                return Ok(());
            }
        }
        let Some(available) = self.index.get(dependency.name.as_str()) else {
            return Err(DependencyError::Unresolved {
                component: owner.to_string(),
                dependency: dependency.name.clone(),
            }
            .into());
        };
        if !dependency.is_satisfied_by(&available.version) {
            return Err(mismatch(owner, dependency, &available.version));
        }
        let reason = if self.installed.contains_key(&dependency.name) {
            InstallReason::Update
        } else {
            reason
        };
        self.add(&dependency.name, reason);
        Ok(())
    }

    fn check_planned(&self, owner: &str, dependency: &Dependency) -> Result<(), Error> {
        match self.index.get(dependency.name.as_str()) {
            Some(c) if !dependency.is_satisfied_by(&c.version) => {
                Err(mismatch(owner, dependency, &c.version))
            }
            _ => Ok(()),
        }
    }

    /// Walk the queue until every planned component has its requirements
    fn expand(&mut self) -> Result<(), Error> {
        while let Some(name) = self.queue.pop_front() {
            let component = self.component(&name)?;
            for dependency in &component.dependencies {
                self.require(&name, dependency, InstallReason::Dependency)?;
            }
            for auto in &component.auto_depend_on {
                self.require(&name, &Dependency::named(auto), InstallReason::AutoDependency)?;
            }
        }
        Ok(())
    }

    /// Add components whose auto-dependencies are all present, at least one
    /// of them newly planned, until nothing changes
    fn apply_auto_dependencies(&mut self) -> Result<(), Error> {
        let index = self.index;
        loop {
            let triggered: Vec<&str> = index
                .values()
                .filter(|c| {
                    !c.auto_depend_on.is_empty()
                        && !self.reasons.contains_key(&c.name)
                        && !self.installed.contains_key(&c.name)
                        && c.auto_depend_on.iter().any(|a| self.reasons.contains_key(a))
                        && c.auto_depend_on.iter().all(|a| {
                            self.reasons.contains_key(a) || self.installed.contains_key(a)
                        })
                })
                .map(|c| c.name.as_str())
                .collect();
            if triggered.is_empty() {
                return Ok(());
            }
            for name in triggered {
                tracing::debug!(component = name, "added by auto dependency");
                self.add(name, InstallReason::AutoDependency);
            }
            self.expand()?;
        }
    }

    fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for name in self.reasons.keys() {
            graph.add_node(name);
            if let Some(component) = self.index.get(name.as_str()) {
                let needs = component
                    .dependencies
                    .iter()
                    .map(|d| d.name.as_str())
                    .chain(component.auto_depend_on.iter().map(String::as_str));
                for dep in needs.filter(|d| self.reasons.contains_key(*d)) {
                    graph.add_edge(name, dep);
                }
            }
        }
        graph
    }

    fn into_entries(self, order: Vec<String>) -> Vec<PlanEntry> {
        order
            .into_iter()
            .filter_map(|name| {
                let component = self.index.get(name.as_str())?;
                let reason = *self.reasons.get(&name)?;
                Some(PlanEntry {
                    version: component.version.clone(),
                    replaces: self.installed.get(&name).cloned(),
                    name,
                    reason,
                })
            })
            .collect()
    }
}

fn mismatch(owner: &str, dependency: &Dependency, found: &Version) -> Error {
    DependencyError::VersionMismatch {
        component: owner.to_string(),
        dependency: dependency.name.clone(),
        constraint: dependency
            .constraint
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        found: found.to_string(),
    }
    .into()
}

/// Forced components that are not installed yet
fn add_forced(expansion: &mut Expansion<'_>) {
    let index = expansion.index;
    let forced: Vec<&str> = index
        .values()
        .filter(|c| c.forced_install && !expansion.installed.contains_key(&c.name))
        .map(|c| c.name.as_str())
        .collect();
    for name in forced {
        expansion.add(name, InstallReason::Forced);
    }
}

fn finish(mut expansion: Expansion<'_>, mode: RunMode) -> Result<Plan, Error> {
    expansion.expand()?;
    expansion.apply_auto_dependencies()?;
    let order = expansion.graph().topological_sort()?;

    let mut plan = Plan::new(mode);
    plan.install = expansion.into_entries(order);
    // Replaced components go away first, dependents before dependencies
    plan.remove = plan
        .install
        .iter()
        .rev()
        .filter(|e| e.replaces.is_some())
        .map(|e| e.name.clone())
        .collect();
    Ok(plan)
}

fn resolve_install(
    index: &BTreeMap<&str, &Component>,
    request: &ResolveRequest,
) -> Result<Plan, Error> {
    let mut expansion = Expansion::new(index, &request.installed);
    for name in &request.selected {
        let component = expansion.component(name)?;
        match request.installed.get(name) {
            Some(installed) if *installed >= component.version => {
                tracing::info!(component = %name, version = %installed, "already installed");
            }
            Some(_) => expansion.add(name, InstallReason::Update),
            None => expansion.add(name, InstallReason::Selected),
        }
    }
    add_forced(&mut expansion);
    finish(expansion, RunMode::Install)
}

fn resolve_update(
    index: &BTreeMap<&str, &Component>,
    request: &ResolveRequest,
) -> Result<Plan, Error> {
    let mut expansion = Expansion::new(index, &request.installed);
    let candidates: Vec<&String> = if request.selected.is_empty() {
        request.installed.keys().collect()
    } else {
        for name in &request.selected {
            if !request.installed.contains_key(name) {
                return Err(DependencyError::UnknownComponent(name.clone()).into());
            }
        }
        request.selected.iter().collect()
    };
    for name in candidates {
        let (Some(installed), Some(available)) =
            (request.installed.get(name), index.get(name.as_str()))
        else {
            continue;
        };
        if available.version > *installed {
            expansion.add(name, InstallReason::Update);
        }
    }
    add_forced(&mut expansion);
    finish(expansion, RunMode::Update)
}

fn resolve_uninstall(
    index: &BTreeMap<&str, &Component>,
    request: &ResolveRequest,
) -> Result<Plan, Error> {
    let installed: BTreeSet<&str> = request.installed.keys().map(String::as_str).collect();
    let everything = request.selected.is_empty();

    let mut removing: BTreeSet<&str> = BTreeSet::new();
    if everything {
        removing.extend(installed.iter().copied());
    } else {
        for name in &request.selected {
            if !installed.contains(name.as_str()) {
                return Err(DependencyError::UnknownComponent(name.clone()).into());
            }
            if index.get(name.as_str()).is_some_and(|c| c.forced_install) {
                return Err(DependencyError::ForcedComponent {
                    component: name.clone(),
                }
                .into());
            }
            removing.insert(name.as_str());
        }
    }

    // Auto-dependent components cannot outlive what triggered them
    loop {
        let cascaded: Vec<&str> = installed
            .iter()
            .copied()
            .filter(|name| !removing.contains(name))
            .filter(|name| {
                index.get(name).is_some_and(|c| {
                    c.auto_depend_on
                        .iter()
                        .any(|a| removing.contains(a.as_str()))
                })
            })
            .collect();
        if cascaded.is_empty() {
            break;
        }
        removing.extend(cascaded);
    }

    let mut still_required: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for remaining in installed.iter().filter(|n| !removing.contains(*n)) {
        if let Some(component) = index.get(remaining) {
            for dep in &component.dependencies {
                if removing.contains(dep.name.as_str()) {
                    still_required
                        .entry(dep.name.as_str())
                        .or_default()
                        .push((*remaining).to_string());
                }
            }
        }
    }
    if let Some((component, dependents)) = still_required.into_iter().next() {
        return Err(DependencyError::StillRequired {
            component: component.to_string(),
            dependents,
        }
        .into());
    }

    let mut graph = DependencyGraph::new();
    for name in &removing {
        graph.add_node(name);
        if let Some(component) = index.get(name) {
            let needs = component
                .dependencies
                .iter()
                .map(|d| d.name.as_str())
                .chain(component.auto_depend_on.iter().map(String::as_str));
            for dep in needs.filter(|d| removing.contains(d)) {
                graph.add_edge(name, dep);
            }
        }
    }

    let mut plan = Plan::new(RunMode::Uninstall);
    plan.remove = graph.topological_sort()?;
    plan.remove.reverse();
    Ok(plan)
}
