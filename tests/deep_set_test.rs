use resource_cache::deep_set::deep_set;
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn test_sets_at_the_given_path() {
    let mut obj = Map::new();
    deep_set(&mut obj, "a", &json!("foo"));

    assert_eq!(obj.get("a"), Some(&json!("foo")));
}

#[test]
fn test_overwrites_at_the_given_path() {
    let mut obj = object(json!({"a": "foo"}));
    deep_set(&mut obj, "a", &json!("bar"));

    assert_eq!(obj.get("a"), Some(&json!("bar")));
}

#[test]
fn test_overwriting_replaces_the_whole_leaf() {
    let mut obj = object(json!({"a": {"old": 1}}));
    deep_set(&mut obj, "a", &json!({"new": 2}));

    assert_eq!(Value::Object(obj), json!({"a": {"new": 2}}));
}

#[test]
fn test_creates_empty_objects_at_missing_nodes() {
    let mut obj = Map::new();
    deep_set(&mut obj, "a.b.c", &json!("foo"));

    let a = obj.get("a").expect("a should be created");
    assert!(a.is_object());
    let b = a.get("b").expect("a.b should be created");
    assert!(b.is_object());
    assert_eq!(b.get("c"), Some(&json!("foo")));
}

#[test]
fn test_does_not_share_nested_data_with_the_source() {
    let mut ticket = object(json!({
        "data": { "group": { "id": 1, "name": "Support" } }
    }));
    let mut group = object(json!({
        "data": { "id": 2, "name": "Development" }
    }));

    // Copy the group into the ticket
    deep_set(&mut ticket, "data.group", &group["data"]);
    assert_eq!(ticket["data"]["group"]["id"], group["data"]["id"]);
    assert_eq!(ticket["data"]["group"]["name"], group["data"]["name"]);

    // Mutating either side must not leak into the other
    group["data"]["name"] = json!("Operations");
    assert_eq!(ticket["data"]["group"]["name"], json!("Development"));

    ticket["data"]["group"]["id"] = json!(99);
    assert_eq!(group["data"]["id"], json!(2));
}
