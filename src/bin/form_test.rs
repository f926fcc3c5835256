#![cfg(not(tarpaulin_include))]
use docx_filler::form::FormState;
use docx_filler::mapper;
use docx_filler::schema::SchemaModel;
use serde_json::json;

// Test form synthesis for the invoice scenario
fn test_synthesize_invoice() {
    println!("\n====== Testing synthesize ======");
    let schema = SchemaModel::load(&json!({
        "client_name": {"type": "simple", "position": 1},
        "paid": {"type": "boolean", "position": 2},
        "items": {"type": "array", "fields": ["desc", "amount"], "position": 3},
    }))
    .unwrap();
    let form = FormState::synthesize(&schema);

    let names: Vec<&str> = form.variables().iter().map(String::as_str).collect();
    assert_eq!(names, ["client_name", "paid", "items"]);
    println!("✓ Variables come out in position order");

    assert!(form.widget("field_client_name").is_some());
    assert!(form.widget("field_paid").is_some());
    println!("✓ One text field and one checkbox synthesized");

    assert_eq!(form.group("items").unwrap().items, vec![0]);
    assert!(form.widget("items[0].desc").is_some());
    assert!(form.widget("items[0].amount").is_some());
    println!("✓ Array block pre-added one item with desc/amount inputs");
}

// Test the ordering rule: position first, missing positions last, name ties
fn test_ordering() {
    println!("\n====== Testing ordering ======");
    let schema = SchemaModel::load(&json!({
        "b": {"type": "simple", "position": 2},
        "a": {"type": "simple"},
        "c": {"type": "simple", "position": 1},
    }))
    .unwrap();
    let form = FormState::synthesize(&schema);
    let names: Vec<&str> = form.variables().iter().map(String::as_str).collect();
    assert_eq!(names, ["c", "b", "a"]);
    println!("✓ Schema {{b: pos 2, a: none, c: pos 1}} synthesizes as c, b, a");
}

// Test collecting the filled invoice form
fn test_collect_invoice() {
    println!("\n====== Testing collect ======");
    let schema = SchemaModel::load(&json!({
        "client_name": {"type": "simple", "position": 1},
        "paid": {"type": "boolean", "position": 2},
        "items": {"type": "array", "fields": ["desc", "amount"], "position": 3},
    }))
    .unwrap();
    let mut form = FormState::synthesize(&schema);

    form.set_scalar("client_name", "Acme").unwrap();
    form.set_toggle("field_paid", true).unwrap();
    form.set_group_field("items", 0, "desc", "Widget").unwrap();
    form.set_group_field("items", 0, "amount", "9.99").unwrap();

    let data = mapper::collect(&form, &schema);
    assert_eq!(
        data,
        json!({
            "client_name": "Acme",
            "paid": true,
            "items": [{"desc": "Widget", "amount": "9.99"}],
        })
    );
    println!("✓ Filled form collects to the expected payload");
}

// Test that removals leave index gaps without breaking collection
fn test_gap_tolerance() {
    println!("\n====== Testing index gaps ======");
    let schema = SchemaModel::load(&json!({
        "items": {"type": "array", "fields": ["desc"]},
    }))
    .unwrap();
    let mut form = FormState::synthesize(&schema);
    form.add_item("items").unwrap();
    form.add_item("items").unwrap();
    form.set_group_field("items", 0, "desc", "first").unwrap();
    form.set_group_field("items", 1, "desc", "second").unwrap();
    form.set_group_field("items", 2, "desc", "third").unwrap();

    form.remove_item("items", 1).unwrap();
    assert_eq!(form.group("items").unwrap().items, vec![0, 2]);
    println!("✓ Surviving indices keep their values after removal");

    let data = mapper::collect(&form, &schema);
    assert_eq!(data["items"], json!([{"desc": "first"}, {"desc": "third"}]));
    println!("✓ Collection preserves order and fields across the gap");
}

fn main() {
    test_synthesize_invoice();
    test_ordering();
    test_collect_invoice();
    test_gap_tolerance();
    println!("\nAll form tests passed");
}
