//! Integration tests for resolver crate

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ifw_errors::{DependencyError, Error};
    use ifw_resolver::*;
    use ifw_types::{Component, Dependency, RunMode, Version};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn component(name: &str, version: &str, deps: &str) -> Component {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut c = Component::new(name, v(version), date);
        c.dependencies = Dependency::parse_list(deps).unwrap();
        c
    }

    fn installed(pairs: &[(&str, &str)]) -> BTreeMap<String, Version> {
        pairs
            .iter()
            .map(|(name, version)| ((*name).to_string(), v(version)))
            .collect()
    }

    fn repository() -> Vec<Component> {
        let mut core = component("app.core", "1.0", "");
        core.auto_depend_on = vec!["app.runtime".to_string()];
        vec![
            core,
            component("app.runtime", "1.0", ""),
            component("app.docs", "1.0", "app.core"),
            component("app.plugins", "2.0", "app.core->=1.0, app.sdk"),
            component("app.sdk", "2.0", "app.runtime-<2.0"),
        ]
    }

    #[test]
    fn test_auto_dependency_orders_runtime_first() {
        let plan = resolve(&repository(), &ResolveRequest::install(["app.core"])).unwrap();
        assert_eq!(plan.install_names(), vec!["app.runtime", "app.core"]);
        assert_eq!(plan.entry("app.core").unwrap().reason, InstallReason::Selected);
        assert_eq!(
            plan.entry("app.runtime").unwrap().reason,
            InstallReason::AutoDependency
        );
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn test_auto_dependency_fixpoint_triggers_dependent() {
        let plan = resolve(&repository(), &ResolveRequest::install(["app.runtime"])).unwrap();
        assert_eq!(plan.install_names(), vec!["app.runtime", "app.core"]);
        assert_eq!(
            plan.entry("app.core").unwrap().reason,
            InstallReason::AutoDependency
        );
    }

    #[test]
    fn test_transitive_dependencies() {
        let plan = resolve(&repository(), &ResolveRequest::install(["app.plugins"])).unwrap();
        let names = plan.install_names();
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert_eq!(names.len(), 4);
        assert!(pos("app.runtime") < pos("app.sdk"));
        assert!(pos("app.runtime") < pos("app.core"));
        assert!(pos("app.core") < pos("app.plugins"));
        assert!(pos("app.sdk") < pos("app.plugins"));
        assert_eq!(plan.entry("app.sdk").unwrap().reason, InstallReason::Dependency);
    }

    #[test]
    fn test_installed_dependency_is_not_reinstalled() {
        let request = ResolveRequest::install(["app.docs"])
            .with_installed(installed(&[("app.core", "1.0"), ("app.runtime", "1.0")]));
        let plan = resolve(&repository(), &request).unwrap();
        assert_eq!(plan.install_names(), vec!["app.docs"]);
    }

    #[test]
    fn test_missing_dependency_is_unresolved() {
        let components = vec![component("a", "1.0", "ghost")];
        let err = resolve(&components, &ResolveRequest::install(["a"])).unwrap_err();
        assert!(matches!(
            err,
            Error::Dependency(DependencyError::Unresolved { ref dependency, .. }) if dependency == "ghost"
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let components = vec![component("a", "1.0", "b->=2.0"), component("b", "1.5", "")];
        let err = resolve(&components, &ResolveRequest::install(["a"])).unwrap_err();
        match err {
            Error::Dependency(DependencyError::VersionMismatch {
                constraint, found, ..
            }) => {
                assert_eq!(constraint, ">=2.0");
                assert_eq!(found, "1.5");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_unknown_selection() {
        let err = resolve(&repository(), &ResolveRequest::install(["nope"])).unwrap_err();
        assert!(err.to_string().contains("unknown component nope"));
    }

    #[test]
    fn test_cycle_reports_pair() {
        let components = vec![
            component("a", "1.0", "b"),
            component("b", "1.0", "c"),
            component("c", "1.0", "b"),
        ];
        let err = resolve(&components, &ResolveRequest::install(["a"])).unwrap_err();
        match err {
            Error::Dependency(DependencyError::Cycle { a, b }) => {
                let mut pair = [a, b];
                pair.sort();
                assert_eq!(pair, ["b".to_string(), "c".to_string()]);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_forced_components_always_planned() {
        let mut components = repository();
        let mut license = component("app.license", "1.0", "");
        license.forced_install = true;
        components.push(license);

        let plan = resolve(&components, &ResolveRequest::install(["app.runtime"])).unwrap();
        assert_eq!(
            plan.entry("app.license").unwrap().reason,
            InstallReason::Forced
        );

        let request = ResolveRequest::uninstall(["app.license"])
            .with_installed(installed(&[("app.license", "1.0")]));
        let err = resolve(&components, &request).unwrap_err();
        assert!(matches!(
            err,
            Error::Dependency(DependencyError::ForcedComponent { .. })
        ));
    }

    #[test]
    fn test_update_replaces_newer_versions() {
        let mut components = repository();
        components[1] = component("app.runtime", "1.1", "");
        let request = ResolveRequest::update(Vec::<String>::new()).with_installed(installed(&[
            ("app.core", "1.0"),
            ("app.runtime", "1.0"),
        ]));
        let plan = resolve(&components, &request).unwrap();
        assert_eq!(plan.mode, RunMode::Update);
        assert_eq!(plan.install_names(), vec!["app.runtime"]);
        let entry = plan.entry("app.runtime").unwrap();
        assert_eq!(entry.reason, InstallReason::Update);
        assert_eq!(entry.replaces, Some(v("1.0")));
        assert_eq!(plan.remove, vec!["app.runtime"]);
    }

    #[test]
    fn test_update_with_nothing_newer_is_empty() {
        let request = ResolveRequest::update(Vec::<String>::new())
            .with_installed(installed(&[("app.runtime", "1.0")]));
        assert!(resolve(&repository(), &request).unwrap().is_empty());
    }

    #[test]
    fn test_uninstall_still_required() {
        let request = ResolveRequest::uninstall(["app.core"]).with_installed(installed(&[
            ("app.core", "1.0"),
            ("app.runtime", "1.0"),
            ("app.docs", "1.0"),
        ]));
        let err = resolve(&repository(), &request).unwrap_err();
        assert!(err.to_string().contains("cannot resolve all dependencies"));
        assert!(err.to_string().contains("app.docs"));
    }

    #[test]
    fn test_uninstall_cascades_auto_dependents() {
        let request = ResolveRequest::uninstall(["app.runtime"]).with_installed(installed(&[
            ("app.core", "1.0"),
            ("app.runtime", "1.0"),
        ]));
        let plan = resolve(&repository(), &request).unwrap();
        assert_eq!(plan.remove, vec!["app.core", "app.runtime"]);
    }

    #[test]
    fn test_uninstall_everything_reverse_order() {
        let request = ResolveRequest::uninstall(Vec::<String>::new()).with_installed(installed(&[
            ("app.core", "1.0"),
            ("app.runtime", "1.0"),
            ("app.docs", "1.0"),
        ]));
        let plan = resolve(&repository(), &request).unwrap();
        assert_eq!(plan.remove, vec!["app.docs", "app.core", "app.runtime"]);
        assert!(plan.install.is_empty());
    }

    proptest! {
        /// Chains of any length resolve with every dependency first
        #[test]
        fn prop_chain_order(len in 1usize..30) {
            let components: Vec<Component> = (0..len)
                .map(|i| {
                    let deps = if i + 1 < len { format!("c{}", i + 1) } else { String::new() };
                    component(&format!("c{i}"), "1.0", &deps)
                })
                .collect();
            let plan = resolve(&components, &ResolveRequest::install(["c0"])).unwrap();
            let expected: Vec<String> = (0..len).rev().map(|i| format!("c{i}")).collect();
            prop_assert_eq!(plan.install_names(), expected.iter().map(String::as_str).collect::<Vec<_>>());
        }

        /// Random DAGs (edges only towards higher indices) never report a
        /// cycle and always order dependencies first
        #[test]
        fn prop_dag_order(edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40)) {
            let mut deps: BTreeMap<usize, Vec<String>> = BTreeMap::new();
            for (a, b) in edges {
                if a < b {
                    deps.entry(a).or_default().push(format!("n{b}"));
                }
            }
            let components: Vec<Component> = (0..12)
                .map(|i| component(&format!("n{i}"), "1.0", &deps.get(&i).map(|d| d.join(",")).unwrap_or_default()))
                .collect();
            let selected: Vec<String> = (0..12).map(|i| format!("n{i}")).collect();
            let plan = resolve(&components, &ResolveRequest::install(selected)).unwrap();
            let names = plan.install_names();
            prop_assert_eq!(names.len(), 12);
            for (a, targets) in &deps {
                let pa = names.iter().position(|n| *n == format!("n{a}")).unwrap();
                for t in targets {
                    let pt = names.iter().position(|n| *n == t.as_str()).unwrap();
                    prop_assert!(pt < pa);
                }
            }
        }
    }
}
