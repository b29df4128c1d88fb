/// Tests for derived type flattening
///
/// These tests verify that the type resolver:
/// 1. Replaces every derived type by its built-in base, whatever the declaration order
/// 2. Merges and checks range, length, pattern, bit and enum restrictions
/// 3. Reports cycles, unresolvable typedefs and dead typedefs
/// 4. Flattens unions nested in unions
#[cfg(test)]
mod types_tests {
    use crate::utils::{child_argument, child_arguments, codes, expect_node, messages, resolve, union_members};
    use yangkit_schema::{findings::FindingKind, keyword::Keyword};

    fn leaf_type(resolved: &yangkit_resolver::ResolvedSchema, module: &str, leaf: &str) -> yangkit_schema::statement::StatementId {
        let leaf = expect_node(&resolved.schema, module, &[leaf]);
        resolved
            .schema
            .arena
            .first_child_of_kind(leaf, Keyword::Type)
            .expect("leaf should have a type")
    }

    #[test]
    fn test_typedef_chain_declared_out_of_order() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                leaf x { type outer; }
                typedef outer { type middle; }
                typedef middle { type inner; }
                typedef inner { type string; }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "x");
        assert_eq!(resolved.schema.identifier(usage), "string", "Chain should flatten down to string");
        assert!(
            !resolved.findings.has(FindingKind::CircularTypedefReferences),
            "A chain without cycle must resolve, got: {:?}",
            codes(&resolved.findings)
        );
        let chain: Vec<&str> = resolved.schema.annotations.typedef_chain[&usage]
            .iter()
            .map(|reference| reference.name.as_str())
            .collect();
        assert_eq!(
            chain,
            vec!["inner", "middle", "outer"],
            "The leaf's type should record every typedef it went through, innermost first"
        );
    }

    #[test]
    fn test_range_narrowing_within_base() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef percent { type uint8 { range "0..100"; } }
                leaf narrow { type percent { range "20..30"; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "narrow");
        assert_eq!(resolved.schema.identifier(usage), "uint8");
        assert_eq!(
            child_argument(&resolved.schema, usage, Keyword::Range).as_deref(),
            Some("20..30"),
            "The usage's range should replace the base range"
        );
        assert!(
            !resolved.findings.has(FindingKind::IllegalDataTypeRestriction),
            "Narrowing inside the base range is legal"
        );
    }

    #[test]
    fn test_range_widening_is_reported_once_and_still_applied() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef percent { type uint8 { range "0..100"; } }
                leaf wide { type percent { range "20..200"; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "wide");
        assert_eq!(
            resolved.findings.count(FindingKind::IllegalDataTypeRestriction),
            1,
            "Widening should produce exactly one finding"
        );
        assert_eq!(
            child_argument(&resolved.schema, usage, Keyword::Range).as_deref(),
            Some("20..200"),
            "The usage's range is applied regardless"
        );
    }

    #[test]
    fn test_length_on_numeric_base_is_illegal() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef counter { type uint32; }
                leaf c { type counter { length "1..5"; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let leaf = expect_node(&resolved.schema, "m", &["c"]);
        let finding = resolved.findings.of_kind(FindingKind::IllegalDataTypeRestriction);
        assert_eq!(finding.len(), 1, "length on a uint32 should be reported");
        assert_eq!(finding[0].statement, Some(leaf), "The finding goes on the leaf using the type");
    }

    #[test]
    fn test_patterns_accumulate() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef word { type string { pattern "[a-z]+"; } }
                leaf w { type word { pattern "[a-c]+"; } }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "w");
        assert_eq!(
            child_arguments(&resolved.schema, usage, Keyword::Pattern),
            vec!["[a-z]+".to_string(), "[a-c]+".to_string()],
            "Patterns of base and usage both apply"
        );
    }

    #[test]
    fn test_enum_restriction_checks_members() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef color {
                    type enumeration {
                        enum red;
                        enum green { value 5; }
                        enum blue;
                    }
                }
                leaf ok { type color { enum green; } }
                leaf bad { type color { enum purple; } }
                leaf clash { type color { enum blue { value 1; } } }
            }
        "#;
        let resolved = resolve(&[source]);
        let ok = leaf_type(&resolved, "m", "ok");
        let green = resolved.schema.arena.first_child_of_kind(ok, Keyword::Enum).unwrap();
        assert_eq!(
            child_argument(&resolved.schema, green, Keyword::Value).as_deref(),
            Some("5"),
            "The base's value should be made explicit on the restricted enum"
        );
        assert_eq!(
            child_arguments(&resolved.schema, ok, Keyword::Enum),
            vec!["green".to_string()],
            "Only the picked enum should remain"
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::IllegalDataTypeRestriction),
            vec![
                "Enum 'purple' does not exist in derived type.".to_string(),
                "'value' mismatch for enum 'blue'. In derived type: '6'; in type using the derived type: '1'.".to_string(),
            ]
        );
    }

    #[test]
    fn test_typedef_default_propagates_to_leaf() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef port { type uint16; default 830; }
                leaf a { type port; }
                leaf b { type port; default 22; }
            }
        "#;
        let resolved = resolve(&[source]);
        let a = expect_node(&resolved.schema, "m", &["a"]);
        let b = expect_node(&resolved.schema, "m", &["b"]);
        assert_eq!(child_argument(&resolved.schema, a, Keyword::Default).as_deref(), Some("830"));
        assert_eq!(
            child_arguments(&resolved.schema, b, Keyword::Default),
            vec!["22".to_string()],
            "An explicit default wins over the typedef's"
        );
    }

    #[test]
    fn test_circular_typedefs_reported_per_usage() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef a { type b; }
                typedef b { type a; }
                leaf x { type a; }
            }
        "#;
        let resolved = resolve(&[source]);
        let circular = resolved.findings.of_kind(FindingKind::CircularTypedefReferences);
        assert_eq!(circular.len(), 3, "Each of the three stuck usages should be flagged once");
        let mut statements: Vec<_> = circular.iter().map(|finding| finding.statement).collect();
        statements.dedup();
        assert_eq!(statements.len(), 3, "Findings should be on distinct statements");
        let usage = leaf_type(&resolved, "m", "x");
        assert_eq!(resolved.schema.identifier(usage), "a", "The stuck usage stays as written");
    }

    #[test]
    fn test_deep_typedef_chain_flagged_once() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef t1 { type t2; }
                typedef t2 { type t3; }
                typedef t3 { type t4; }
                typedef t4 { type t5; }
                typedef t5 { type string; }
                leaf x { type t1; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            resolved.findings.count(FindingKind::ExcessiveTypedefDepth),
            1,
            "Only the first deep usage is flagged"
        );
        let usage = leaf_type(&resolved, "m", "x");
        assert_eq!(resolved.schema.identifier(usage), "string", "Deep chains still resolve");
    }

    #[test]
    fn test_unresolvable_and_nested_unresolvable_typedefs() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef broken { type nope; }
                leaf x { type broken; }
                leaf y { type missing; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            messages(&resolved.findings, FindingKind::UnresolvableDerivedType),
            vec!["Cannot resolve typedef 'nope'.".to_string(), "Cannot resolve typedef 'missing'.".to_string()]
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::NestedDerivedTypeNotResolvable),
            vec!["Referenced typedef 'broken' has nested unresolvable 'type' statement 'nope'.".to_string()]
        );
        assert!(
            !resolved.findings.has(FindingKind::CircularTypedefReferences),
            "Marked usages are not reported as cycles"
        );
    }

    #[test]
    fn test_unused_and_single_use_typedefs() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef lonely { type string; }
                typedef once { type string; }
                typedef twice { type string; }
                leaf a { type once; }
                leaf b { type twice; }
                leaf c { type twice; }
            }
        "#;
        let resolved = resolve(&[source]);
        assert_eq!(
            messages(&resolved.findings, FindingKind::TypedefNotUsed),
            vec!["typedef statement 'lonely' not used.".to_string()]
        );
        assert_eq!(
            messages(&resolved.findings, FindingKind::TypedefUsedOnlyOnce),
            vec!["typedef statement 'once' used only once; consider inlining.".to_string()]
        );
    }

    #[test]
    fn test_nested_union_flattens_in_order() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                leaf u {
                    type union {
                        type union {
                            type int8;
                            type string;
                        }
                        type boolean;
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "u");
        assert_eq!(
            union_members(&resolved.schema, usage),
            vec!["int8".to_string(), "string".to_string(), "boolean".to_string()],
            "Nested members should take the nested union's place"
        );
    }

    #[test]
    fn test_union_of_typedef_unions_flattens() {
        let source = r#"
            module m {
                namespace "urn:m";
                prefix m;
                typedef num-or-text { type union { type int32; type string; } }
                leaf u {
                    type union {
                        type empty;
                        type num-or-text;
                        type boolean;
                    }
                }
            }
        "#;
        let resolved = resolve(&[source]);
        let usage = leaf_type(&resolved, "m", "u");
        assert_eq!(
            union_members(&resolved.schema, usage),
            vec![
                "empty".to_string(),
                "int32".to_string(),
                "string".to_string(),
                "boolean".to_string()
            ]
        );
    }
}
