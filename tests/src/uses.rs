/// Tests for grouping expansion
#[cfg(test)]
mod uses_tests {
    use crate::utils::{child_argument, child_arguments, expect_node, messages, node, resolve};
    use yangkit_schema::{
        Schema,
        findings::FindingKind,
        keyword::Keyword,
        statement::{StatementId, Status},
    };

    fn schema_children(schema: &Schema, parent: StatementId) -> Vec<String> {
        schema
            .arena
            .children(parent)
            .iter()
            .filter(|child| schema.arena.keyword(**child).is_some_and(Keyword::defines_data_node))
            .map(|child| schema.identifier(*child).to_string())
            .collect()
    }

    #[test]
    fn test_uses_expands_in_place() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g {
                    container box { leaf inside { type string; } }
                    leaf plain { type string; }
                }
                container c {
                    leaf before { type string; }
                    uses g;
                    leaf after { type string; }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let c = expect_node(schema, "m", &["c"]);
        assert_eq!(
            schema_children(schema, c),
            vec!["before", "box", "plain", "after"],
            "Expanded nodes should take the place of the uses"
        );
        assert!(!schema.arena.has_child_of_kind(c, Keyword::Uses), "The uses itself is gone");
        assert!(node(schema, "m", &["c", "box", "inside"]).is_some(), "Copies are deep");
    }

    #[test]
    fn test_grouping_is_not_modified() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g { leaf a { type string; } }
                container c1 { uses g { refine a { description "first"; } } }
                container c2 { uses g; }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let root = crate::utils::module_root(schema, "m");
        let grouping = schema.arena.first_child_of_kind(root, Keyword::Grouping).unwrap();
        let template = schema.arena.first_child_of_kind(grouping, Keyword::Leaf).unwrap();
        assert!(
            !schema.arena.has_child_of_kind(template, Keyword::Description),
            "A refine must not leak into the grouping"
        );
        let second = expect_node(schema, "m", &["c2", "a"]);
        assert!(
            !schema.arena.has_child_of_kind(second, Keyword::Description),
            "A refine must not leak into other expansions"
        );
        assert_eq!(
            schema.annotations.grouping_origin.get(&second),
            Some(&grouping),
            "Expanded nodes remember their grouping"
        );
    }

    #[test]
    fn test_nested_uses_resolve_regardless_of_order() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                container c { uses outer; }
                grouping outer {
                    uses inner;
                    leaf x { type string; }
                }
                grouping inner { leaf y { type string; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let c = expect_node(&resolved.schema, "m", &["c"]);
        let mut children = schema_children(&resolved.schema, c);
        children.sort();
        assert_eq!(children, vec!["x", "y"], "Both levels should be expanded");
        assert!(
            !resolved.findings.has(FindingKind::CircularUsesReferences),
            "No cycle in this schema"
        );
    }

    #[test]
    fn test_circular_groupings_reported_per_uses() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g1 { uses g2; }
                grouping g2 { uses g1; }
                container c { uses g1; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            resolved.findings.count(FindingKind::CircularUsesReferences),
            3,
            "Each stuck uses should be flagged once"
        );
        let c = expect_node(&resolved.schema, "m", &["c"]);
        assert_eq!(
            resolved.schema.arena.children(c).len(),
            1,
            "Nothing should be expanded into c"
        );
    }

    #[test]
    fn test_self_referencing_grouping() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g {
                    leaf a { type string; }
                    uses g;
                }
                container c { uses g; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(resolved.findings.count(FindingKind::CircularUsesReferences), 2);
        assert_eq!(
            node(&resolved.schema, "m", &["c", "a"]),
            None,
            "A self-referencing grouping must not be expanded"
        );
    }

    #[test]
    fn test_unresolvable_grouping_and_nested_failure() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping broken { uses missing; }
                container c { uses broken; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            messages(&resolved.findings, FindingKind::UnresolvableGrouping),
            vec!["Cannot resolve grouping 'missing'.".to_string()]
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::NestedUsesNotResolvable),
            vec!["Referenced grouping 'broken' has nested unresolvable 'uses' statement 'missing'.".to_string()]
        );
        assert!(!resolved.findings.has(FindingKind::CircularUsesReferences));
    }

    #[test]
    fn test_refine_replaces_and_adds() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g {
                    leaf a {
                        type string;
                        description "old";
                        must "true()";
                    }
                    container box;
                }
                container c {
                    uses g {
                        refine a {
                            description "new";
                            default "hello";
                            must "false()";
                        }
                        refine box { presence "on"; }
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let a = expect_node(schema, "m", &["c", "a"]);
        assert_eq!(child_arguments(schema, a, Keyword::Description), vec!["new".to_string()]);
        assert_eq!(child_argument(schema, a, Keyword::Default).as_deref(), Some("hello"));
        assert_eq!(
            child_arguments(schema, a, Keyword::Must),
            vec!["true()".to_string(), "false()".to_string()],
            "must is added, not replaced"
        );
        let b = expect_node(schema, "m", &["c", "box"]);
        assert_eq!(child_argument(schema, b, Keyword::Presence).as_deref(), Some("on"));
    }

    #[test]
    fn test_refine_of_wrong_target_kind() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g { leaf a { type string; } }
                container c { uses g { refine a { presence "on"; } } }
            }
        "#;
        let resolved = resolve(&[source]);
        let c = expect_node(&resolved.schema, "m", &["c"]);
        let findings = resolved.findings.of_kind(FindingKind::InvalidRefineTargetNode);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Statement 'presence' cannot be used to refine a 'leaf'.");
        assert_eq!(findings[0].statement, Some(c), "Reported on the parent of the uses");
        let a = expect_node(&resolved.schema, "m", &["c", "a"]);
        assert!(!resolved.schema.arena.has_child_of_kind(a, Keyword::Presence));
    }

    #[test]
    fn test_refine_with_missing_target() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g { leaf a { type string; } }
                container c { uses g { refine nope { description "x"; } } }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            messages(&resolved.findings, FindingKind::UnresolvablePath),
            vec!["Cannot find schema node with path 'nope' for refine of grouping 'g'.".to_string()]
        );
        assert!(node(&resolved.schema, "m", &["c", "a"]).is_some(), "Expansion still happens");
    }

    #[test]
    fn test_uses_augment() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g {
                    container box;
                    leaf a { type string; }
                }
                container c {
                    uses g {
                        augment box {
                            when "../a = 'x'";
                            leaf extra { type string; }
                        }
                        augment a { leaf bad { type string; } }
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let extra = expect_node(schema, "m", &["c", "box", "extra"]);
        let when = schema.arena.first_child_of_kind(extra, Keyword::When).unwrap();
        assert!(
            schema.annotations.when_applies_to_parent.contains(&when),
            "A when copied from an augment applies to the augmented parent"
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::InvalidUsesAugmentTargetNode),
            vec!["Statement 'leaf' pointed to by 'a' cannot be augmented.".to_string()]
        );
    }

    #[test]
    fn test_uses_augment_into_choice_wraps_shorthand() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g { choice pick { case one { leaf first { type string; } } } }
                container c {
                    uses g {
                        augment pick { container second; }
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        assert!(
            node(&resolved.schema, "m", &["c", "pick", "second", "second"]).is_some(),
            "The augmented container should get a case named after it"
        );
    }

    #[test]
    fn test_if_feature_and_when_are_copied_onto_expansion() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                feature fancy;
                grouping g {
                    leaf a { type string; }
                    leaf b { type string; }
                }
                container c {
                    uses g {
                        if-feature fancy;
                        when "../enabled";
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        for leaf in ["a", "b"] {
            let id = expect_node(schema, "m", &["c", leaf]);
            assert_eq!(
                child_argument(schema, id, Keyword::IfFeature).as_deref(),
                Some("fancy"),
                "{leaf} should inherit the if-feature"
            );
            let when = schema.arena.first_child_of_kind(id, Keyword::When).unwrap();
            assert!(schema.annotations.when_applies_to_parent.contains(&when));
        }
    }

    #[test]
    fn test_status_pushed_from_uses() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g {
                    leaf a { type string; }
                    leaf b { type string; status obsolete; }
                }
                container c { uses g { status deprecated; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let a = expect_node(schema, "m", &["c", "a"]);
        let b = expect_node(schema, "m", &["c", "b"]);
        assert_eq!(schema.explicit_status(a), Some(Status::Deprecated));
        assert_eq!(
            schema.explicit_status(b),
            Some(Status::Obsolete),
            "A stricter own status is kept"
        );
    }

    #[test]
    fn test_uses_augment_status_overrides_weaker_explicit_status() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping g { container box; }
                container c {
                    uses g {
                        augment box {
                            status deprecated;
                            leaf plain { type string; }
                            leaf cur { type string; status current; }
                            leaf old { type string; status obsolete; }
                        }
                        augment box {
                            status obsolete;
                            leaf skipped { type string; }
                        }
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let schema = &resolved.schema;
        let plain = expect_node(schema, "m", &["c", "box", "plain"]);
        let cur = expect_node(schema, "m", &["c", "box", "cur"]);
        let old = expect_node(schema, "m", &["c", "box", "old"]);
        assert_eq!(schema.explicit_status(plain), Some(Status::Deprecated));
        assert_eq!(
            schema.explicit_status(cur),
            Some(Status::Deprecated),
            "A weaker explicit status is replaced by the augment's"
        );
        assert_eq!(
            child_arguments(schema, cur, Keyword::Status),
            vec!["deprecated".to_string()],
            "The old status statement is dropped"
        );
        assert_eq!(schema.explicit_status(old), Some(Status::Obsolete), "A stricter status is kept");
        assert_eq!(
            node(schema, "m", &["c", "box", "skipped"]),
            None,
            "An obsolete augment is not applied"
        );
    }

    #[test]
    fn test_grouping_from_imported_module() {
        let lib = r#"
            module lib {
                namespace "urn:lib";
                prefix l;
                grouping address { leaf street { type string; } }
            }
        "#;
        let user = r#"
            module user {
                namespace "urn:user";
                prefix u;
                import lib { prefix l; }
                container home { uses l:address; }
            }
        "#;
        let resolved = resolve(&[lib, user]);
        assert!(
            node(&resolved.schema, "user", &["home", "street"]).is_some(),
            "A prefixed grouping should expand across modules"
        );
    }

    #[test]
    fn test_grouping_usage_findings() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                grouping unused { leaf a { type string; } }
                grouping once { leaf b { type string; } }
                container c { uses once; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            messages(&resolved.findings, FindingKind::GroupingNotUsed),
            vec!["grouping statement 'unused' not used.".to_string()]
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::GroupingUsedOnlyOnce),
            vec!["grouping statement 'once' used only once; consider inlining.".to_string()]
        );
    }
}
