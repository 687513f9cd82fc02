#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use crate::error::AppError;
    use crate::types::default_avatar;
    use crate::validation::{parse_id, require_object, BodyValidator};

    fn object(value: Value) -> Map<String, Value> {
        require_object(value).unwrap()
    }

    fn failed_fields(result: Result<(), AppError>) -> Vec<(String, String)> {
        match result {
            Err(AppError::Validation { fields, .. }) => fields.into_iter().map(|f| (f.field, f.message)).collect(),
            Err(other) => panic!("expected a validation error, got {:?}", other),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_parse_id_normalizes() {
        let id = parse_id(" 5F0C6D2E-8A57-4A5E-9D1F-1C2B3A4D5E6F ", "itemId").unwrap();
        assert_eq!(id, "5f0c6d2e-8a57-4a5e-9d1f-1c2b3a4d5e6f");
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        match parse_id("63f1c0ffee", "itemId") {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("itemId")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_require_object() {
        assert!(require_object(json!({ "a": 1 })).is_ok());
        assert!(matches!(require_object(json!([1, 2])), Err(AppError::BadRequest(_))));
        assert!(matches!(require_object(Value::Null), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_valid_body_passes() {
        let body = object(json!({
            "collectionId": "5f0c6d2e-8a57-4a5e-9d1f-1c2b3a4d5e6f",
            "itemName": "Dune",
            "itemImage": "",
            "customFields": [{ "k": "v" }],
        }));
        let result = BodyValidator::new(&body)
            .required_id("collectionId")
            .required_text("itemName", 100)
            .optional_url("itemImage")
            .optional_objects("customFields")
            .optional_text("missing", 10)
            .finish("Creation error");
        assert!(result.is_ok());
    }

    #[test]
    fn test_null_counts_as_missing() {
        let body = object(json!({ "itemName": null, "itemImage": null }));
        let fields = failed_fields(
            BodyValidator::new(&body).required_text("itemName", 100).optional_url("itemImage").finish("e"),
        );
        assert_eq!(fields, vec![("itemName".to_string(), "is required".to_string())]);
    }

    #[test]
    fn test_collects_every_failure() {
        let body = object(json!({
            "collectionId": 7,
            "itemName": "   ",
            "ownerName": "é".repeat(6),
            "itemImage": "https://exa mple.com",
            "customFields": [{}, "x"],
        }));
        let fields = failed_fields(
            BodyValidator::new(&body)
                .required_id("collectionId")
                .required_text("itemName", 100)
                .required_text("ownerName", 5)
                .optional_url("itemImage")
                .optional_objects("customFields")
                .finish("Creation error"),
        );
        assert_eq!(
            fields,
            vec![
                ("collectionId".to_string(), "must be a valid id".to_string()),
                ("itemName".to_string(), "must not be empty".to_string()),
                ("ownerName".to_string(), "must be at most 5 characters".to_string()),
                ("itemImage".to_string(), "must not contain whitespace".to_string()),
                ("customFields".to_string(), "entry 1 must be an object".to_string()),
            ]
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let body = object(json!({ "name": "ééééé" }));
        assert!(BodyValidator::new(&body).required_text("name", 5).finish("e").is_ok());
    }

    #[test]
    fn test_default_avatar_encoding() {
        assert_eq!(
            default_avatar("Old Penny", "user 1"),
            "https://source.boringavatars.com/marble/120/Old%20Penny%20user%201?colors=F97D58,CDDCEB,F9DBCF,33B99,5D70C5&square"
        );
        assert!(default_avatar("a/b?c", "u").starts_with("https://source.boringavatars.com/marble/120/a%2Fb%3Fc%20u?"));
    }
}
