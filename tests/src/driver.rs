/// Tests for the resolver driver, its configuration and its finding sink
#[cfg(test)]
mod driver_tests {
    use crate::utils::{codes, expect_node, init_logger, load_schema, node, resolve, resolve_with, try_load_schema};
    use yangkit_resolver::{SchemaResolverBuilder, config::ResolverConfig, resolve_schema};
    use yangkit_schema::{
        Schema,
        findings::{Finding, FindingKind, Findings, Severity},
        keyword::Keyword,
        registry::Conformance,
    };

    const BASE: &str = r#"
        module base {
            namespace "urn:base";
            prefix b;

            container top {
                choice mode {
                    leaf fast { type empty; }
                    leaf slow { type empty; }
                }
                container settings {
                    config false;
                    leaf level { type uint8; }
                }
            }
            rpc reset;
        }
    "#;

    const EXTRA: &str = r#"
        module extra {
            namespace "urn:extra";
            prefix e;
            import base { prefix b; }
            augment "/b:top" {
                leaf added { type string; }
            }
            deviation "/b:top/b:settings/b:level" {
                deviate add { units "percent"; }
            }
        }
    "#;

    #[test]
    fn test_second_run_changes_nothing() {
        init_logger();
        let mut resolved = resolve(&[BASE, EXTRA]);
        assert!(
            resolved.findings.is_empty(),
            "First run should be clean, got: {:?}",
            codes(&resolved.findings)
        );
        let size = resolved.schema.arena.len();

        let mut again = Findings::new();
        resolve_schema(&mut resolved.schema, &ResolverConfig::default(), &mut again);
        assert!(again.is_empty(), "Second run reported: {:?}", codes(&again));
        assert_eq!(resolved.schema.arena.len(), size, "Second run should not add or drop statements");
        let level = expect_node(&resolved.schema, "base", &["top", "settings", "level"]);
        assert_eq!(
            resolved.schema.arena.children_of_kind(level, Keyword::Units).len(),
            1,
            "The deviation must not be applied twice"
        );
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        let result = SchemaResolverBuilder::build_resolved_schema(Schema::new(), &ResolverConfig::default());
        assert!(result.is_err(), "Resolving a schema without modules should fail");
    }

    #[test]
    fn test_config_from_json() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{ "fail-fast": true, "max-fixpoint-iterations": 4 }"#).unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.max_fixpoint_iterations, 4);
        assert!(config.resolve_augments, "Missing keys keep their default");
        assert_eq!(config.nesting_depth_threshold, ResolverConfig::default().nesting_depth_threshold);

        let snake_case: ResolverConfig = serde_json::from_str(r#"{ "fail_fast": true }"#).unwrap();
        assert!(!snake_case.fail_fast, "Keys are spelled in kebab-case");
    }

    #[test]
    fn test_findings_serialize() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                leaf x { type missing; }
            }
        "#;
        let resolved = resolve(&[source]);
        let finding = resolved.findings.of_kind(FindingKind::UnresolvableDerivedType)[0].clone();
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "UnresolvableDerivedType");
        assert_eq!(json["message"], "Cannot resolve typedef 'missing'.");
        assert!(json["statement"].is_u64(), "The statement id is a plain number");
        assert!(
            finding.to_string().starts_with("error P113: Cannot resolve typedef 'missing'."),
            "Unexpected display: {finding}"
        );
    }

    #[test]
    fn test_fail_fast_stops_after_first_error() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                leaf x { type missing; }
                leaf y { type nope; }
                container c { uses absent; }
            }
        "#;
        let config = ResolverConfig {
            fail_fast: true,
            ..ResolverConfig::default()
        };
        let resolved = resolve_with(&[source], &config);
        assert_eq!(
            resolved.findings.with_severity(Severity::Error).len(),
            1,
            "Only the first error is forwarded, got: {:?}",
            codes(&resolved.findings)
        );
        assert_eq!(
            resolved.findings.all().last().map(Finding::severity),
            Some(Severity::Error),
            "Nothing follows the first error"
        );
        assert!(
            node(&resolved.schema, "m", &["c"]).is_some(),
            "Resolution itself runs to completion"
        );

        let everything = resolve(&[source]);
        assert_eq!(everything.findings.with_severity(Severity::Error).len(), 3);
    }

    #[test]
    fn test_import_only_findings_can_be_suppressed() {
        let lib = r#"
            module lib {
                namespace "urn:lib";
                prefix l;
                typedef lonely { type string; }
                leaf broken { type missing; }
            }
        "#;
        let user = r#"
            module user {
                namespace "urn:user";
                prefix u;
                import lib { prefix l; }
                leaf bad { type nope; }
            }
        "#;
        let sources = [(lib, Conformance::ImportOnly), (user, Conformance::Implemented)];
        let config = ResolverConfig {
            suppress_findings_on_import_only_modules: true,
            ..ResolverConfig::default()
        };
        let resolved = SchemaResolverBuilder::build_resolved_schema(try_load_schema(&sources).unwrap(), &config)
            .unwrap()
            .resolved_schema();
        let bad = expect_node(&resolved.schema, "user", &["bad"]);
        let remaining: Vec<_> = resolved.findings.iter().filter_map(|finding| finding.statement).collect();
        assert!(!remaining.is_empty(), "Findings on implemented modules are kept");
        assert!(
            remaining
                .iter()
                .all(|statement| resolved.schema.tree_module(*statement) == resolved.schema.tree_module(bad)),
            "Only findings on the implemented module remain, got: {:?}",
            codes(&resolved.findings)
        );

        let unsuppressed = SchemaResolverBuilder::build_resolved_schema(
            try_load_schema(&sources).unwrap(),
            &ResolverConfig::default(),
        )
        .unwrap()
        .resolved_schema();
        assert!(
            unsuppressed.findings.len() > resolved.findings.len(),
            "Without suppression the import-only module reports too"
        );
    }

    #[test]
    fn test_disabled_phases_are_skipped() {
        let config = ResolverConfig {
            resolve_augments: false,
            resolve_deviations: false,
            ..ResolverConfig::default()
        };
        let resolved = resolve_with(&[BASE, EXTRA], &config);
        let schema = &resolved.schema;
        assert_eq!(node(schema, "base", &["top", "added"]), None, "Augments are left alone");
        let level = expect_node(schema, "base", &["top", "settings", "level"]);
        assert!(!schema.arena.has_child_of_kind(level, Keyword::Units), "Deviations are left alone");
        assert!(resolved.findings.is_empty(), "Skipped phases report nothing");
    }

    #[test]
    fn test_disabled_type_and_grouping_resolution() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef name { type string; }
                grouping g { leaf a { type name; } }
                container c { uses g; }
            }
        "#;
        let config = ResolverConfig {
            resolve_derived_types_and_groupings: false,
            ..ResolverConfig::default()
        };
        let resolved = resolve_with(&[source], &config);
        let c = expect_node(&resolved.schema, "m", &["c"]);
        assert!(resolved.schema.arena.has_child_of_kind(c, Keyword::Uses), "The uses stays");
        assert_eq!(node(&resolved.schema, "m", &["c", "a"]), None);
    }

    #[test]
    fn test_submodule_is_merged_into_owner() {
        let main = r#"
            module main {
                namespace "urn:main";
                prefix m;
                include part;
                container local;
            }
        "#;
        let part = r#"
            submodule part {
                belongs-to main { prefix m; }
                container shared { leaf x { type string; } }
            }
        "#;
        let resolved = resolve(&[main, part]);
        let shared = expect_node(&resolved.schema, "main", &["shared"]);
        assert_eq!(
            resolved.schema.effective_namespace(shared),
            Some("urn:main"),
            "Merged nodes take the owner's namespace"
        );
        assert!(node(&resolved.schema, "part", &["shared"]).is_none(), "The submodule body has moved");

        let config = ResolverConfig {
            merge_submodules: false,
            ..ResolverConfig::default()
        };
        let unmerged = resolve_with(&[main, part], &config);
        assert!(node(&unmerged.schema, "part", &["shared"]).is_some());
        assert!(node(&unmerged.schema, "main", &["shared"]).is_none());
    }

    #[test]
    fn test_structural_fixups() {
        let resolved = resolve(&[BASE]);
        let schema = &resolved.schema;

        let fast = expect_node(schema, "base", &["top", "mode", "fast"]);
        assert!(schema.arena.is(fast, Keyword::Case), "Shorthand leaves get a case");
        assert!(node(schema, "base", &["top", "mode", "slow", "slow"]).is_some());

        assert!(node(schema, "base", &["reset", "input"]).is_some(), "rpc gains an input");
        assert!(node(schema, "base", &["reset", "output"]).is_some(), "rpc gains an output");

        let level = expect_node(schema, "base", &["top", "settings", "level"]);
        let top = expect_node(schema, "base", &["top"]);
        assert_eq!(schema.annotations.effective_config.get(&level), Some(&false), "config false is inherited");
        assert_eq!(schema.annotations.effective_config.get(&top), Some(&true));
    }

    #[test]
    fn test_resolve_into_plain_vector() {
        let mut schema = load_schema(&[r#"
            module m {
                namespace "urn:m";
                prefix m;
                leaf x { type missing; }
            }
        "#]);
        let mut sink: Vec<Finding> = Vec::new();
        resolve_schema(&mut schema, &ResolverConfig::default(), &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind, FindingKind::UnresolvableDerivedType);
    }
}
