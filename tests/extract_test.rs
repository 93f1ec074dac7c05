// ============================================
// WORLDSMITH - Extraction & Validation Tests
// ============================================

#[cfg(test)]
mod extract_tests {
    use serde_json::{json, Value};
    use worldsmith::extract::{extract, validate, ExtractionError, ValidationError};

    fn sample_worlds() -> Vec<Value> {
        vec![
            json!({}),
            json!({"a": 1}),
            json!({
                "name": "The Shattered Reach",
                "summary": "Floating isles, bound by \"old\" chains; storms}] below.",
                "population": 120000,
                "gravity": 0.75,
                "habitable": true,
                "ruined": false,
                "cultures": [
                    {"name": "Skywrights", "values": ["craft", "kinship"], "size": 3},
                    {"name": "Deepborn", "values": [], "size": 0}
                ],
                "calendar": {"months": 13, "leap": null, "names": ["Thaw", "Ember"]}
            }),
            json!({"unicode": "Ærø · 北京 🐉", "escape": "tab\there, slash \\ done", "nested": {"deep": {"deeper": [1, [2, [3]]]}}}),
            json!({"comma in text": "a, }", "bracket": "x, ]", "quote_colon": "\"k\": v"}),
        ]
    }

    #[test]
    fn test_clean_json_is_fixed_point() {
        for world in sample_worlds() {
            let compact = serde_json::to_string(&world).unwrap();
            assert_eq!(extract(&compact).unwrap(), world, "compact: {}", compact);

            let pretty = serde_json::to_string_pretty(&world).unwrap();
            assert_eq!(extract(&pretty).unwrap(), world, "pretty: {}", pretty);
        }
    }

    #[test]
    fn test_defect_injected_round_trip() {
        let intended = json!({
            "name": "Vael",
            "story": "The river remembers every king. It forgets every queen.",
            "regions": ["north", "south"]
        });

        let raw = "<think>\nThe user wants a kingdom. Let me plan {carefully}.\n</think>\n\
                   Here is your world:\n\
                   ```json\n\
                   {\n  \"name\": \"Vael\",\n  \"story\": \"The river remembers every king.\nIt forgets every queen.\",\n  \"regions\": [\"north\", \"south\",],\n}\n\
                   ```\n";

        assert_eq!(extract(raw).unwrap(), intended);
    }

    #[test]
    fn test_missing_comma_between_properties() {
        let raw = "{\n  \"name\": \"Vael\"\n  \"era\": \"Second Dawn\"\n  \"age\": 300\n}";
        // only string-to-key gaps are repaired; the number before "}" is fine
        assert_eq!(
            extract(raw).unwrap(),
            json!({"name": "Vael", "era": "Second Dawn", "age": 300})
        );
    }

    #[test]
    fn test_reasoning_fence_trailing_comma_scenario() {
        let raw = "<reasoning>ignore me</reasoning>```json\n{\"a\":1,}\n```";
        assert_eq!(extract(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_empty_and_braceless_input() {
        assert!(matches!(
            extract(""),
            Err(ExtractionError::NoObjectFound { .. })
        ));
        assert!(matches!(
            extract("```json\n```"),
            Err(ExtractionError::NoObjectFound { .. })
        ));
    }

    #[test]
    fn test_unrepairable_output_keeps_both_texts() {
        let raw = format!("{}{{\"a\": tru}}", "x".repeat(800));
        match extract(&raw) {
            Err(ExtractionError::Syntax { raw: r, repaired, .. }) => {
                assert_eq!(r.total_chars, 810);
                assert_eq!(r.head.chars().count(), 500);
                assert_eq!(repaired.head, "{\"a\": tru}");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_names_first_missing_field_in_order() {
        let obj = json!({"a": "present"});
        assert_eq!(
            validate(&obj, &["a", "b", "c"]).unwrap_err(),
            ValidationError::MissingField { field: "b".into() }
        );
    }

    #[test]
    fn test_extract_then_validate() {
        let raw = "```json\n{\"name\": \"\", \"summary\": \"misty\"}\n```";
        let value = extract(raw).unwrap();
        let err = validate(&value, &["summary", "name"]).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }
}
