use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use docschema::{
    doc, BooleanNode, Context, ConvertResult, DateNode, DefaultTo, DictNode, Document, EqualTo,
    Error, IntegerNode, IntoNode, Invalid, ListNode, RegexpNode, Schema, Slot, StringNode,
    TargetShape, Value,
};
use serde::Deserialize;

fn bio() -> Schema {
    Schema::builder()
        .field("name", StringNode::new())
        .field("url", StringNode::new())
        .build()
        .unwrap()
}

fn simple() -> Schema {
    Schema::builder()
        .field("not_required", StringNode::new())
        .field("required", StringNode::new().required())
        .field("with_default", StringNode::new().on_serialize(DefaultTo::value("default")))
        .build()
        .unwrap()
}

fn with_bios() -> Schema {
    Schema::builder()
        .field("name", StringNode::new())
        .field("bio1", bio().on_serialize(DefaultTo::value(doc! { "name" => "foobar" })))
        .field("bio2", bio().required())
        .build()
        .unwrap()
}

/// Tests a required name next to a list of tags that defaults to empty.
#[test]
fn test_required_name_and_defaulted_tags() {
    let schema = Schema::builder()
        .field("name", StringNode::new().required())
        .field("tags", ListNode::of(StringNode::new()).default_value(Value::List(vec![])))
        .build()
        .unwrap();

    let filled = schema.serialize(doc! { "name" => "a" }).unwrap();
    assert_eq!(filled, Value::Map(doc! { "name" => "a", "tags" => Value::List(vec![]) }));

    let err = schema.serialize(doc! { "tags" => vec!["x"] }).unwrap_err();
    assert_eq!(err.path(), "name");
    assert_eq!(err.message(), "required data missing");

    let full = doc! { "name" => "a", "tags" => vec!["x", "y"] };
    assert_eq!(schema.serialize(full.clone()).unwrap(), Value::Map(full));
}

#[test]
fn test_regexp_field() {
    let schema = Schema::builder()
        .field("slug", RegexpNode::new("^[a-z]+$").unwrap())
        .build()
        .unwrap();
    assert!(schema.serialize(doc! { "slug" => "abc" }).is_ok());
    let err = schema.serialize(doc! { "slug" => "ABC" }).unwrap_err();
    assert_eq!(err.node(), "Regexp");
}

#[test]
fn test_serialize_with_filter_default() {
    let result = simple().serialize(doc! { "not_required" => "n/a", "required" => "Required" }).unwrap();
    assert_eq!(result.get("not_required"), Some(&Value::from("n/a")));
    assert_eq!(result.get("with_default"), Some(&Value::from("default")));

    let missing = simple().serialize(doc! { "required" => "Required" }).unwrap();
    assert_eq!(missing.get("not_required"), None);

    assert!(simple().serialize(doc! { "not_required" => "Required" }).is_err());
}

#[test]
fn test_sub_schemas() {
    let bio = doc! { "name" => "Foo", "url" => "http://example.com" };
    let result = with_bios()
        .serialize(doc! { "bio1" => bio.clone(), "bio2" => bio.clone() })
        .unwrap();
    assert_eq!(result.get("bio1"), Some(&Value::Map(bio.clone())));
    assert_eq!(result.get("bio2"), Some(&Value::Map(bio.clone())));

    let err = with_bios().serialize(doc! { "bio1" => bio.clone() }).unwrap_err();
    assert_eq!(err.path(), "bio2");
    assert_eq!(err.node(), "Schema");

    let defaulted = with_bios().serialize(doc! { "bio2" => bio }).unwrap();
    let bio1 = defaulted.get("bio1").unwrap();
    assert_eq!(bio1.get("name"), Some(&Value::from("foobar")));
    assert_eq!(bio1.get("url"), None);
}

#[test]
fn test_nested_defaults_propagate() {
    let leaf = Schema::builder()
        .field("depth", IntegerNode::new().default_value(2))
        .build()
        .unwrap();
    let sub = Schema::builder()
        .field("test", StringNode::new())
        .field("flag", BooleanNode::new())
        .field("kind", StringNode::new().default_value("sub"))
        .field("leaf", leaf.default_value(Document::new()))
        .build()
        .unwrap();
    let schema = Schema::builder().field("sub", sub).build().unwrap();

    let result = schema.serialize(doc! { "sub" => doc! { "test" => "x" } }).unwrap();
    assert_eq!(
        result,
        Value::Map(doc! {
            "sub" => doc! {
                "test" => "x",
                "flag" => false,
                "kind" => "sub",
                "leaf" => doc! { "depth" => 2 },
            }
        })
    );
}

#[test]
fn test_list_of_schemas() {
    let link = Schema::builder()
        .field("url", StringNode::new().required())
        .field("description", StringNode::new())
        .build()
        .unwrap();
    let schema = Schema::builder()
        .field("permissions", ListNode::of(StringNode::new()).on_serialize(DefaultTo::value(Value::List(vec![]))))
        .field("links", ListNode::of(link))
        .build()
        .unwrap();

    let links = vec![
        Value::Map(doc! { "url" => "http://a.example" }),
        Value::Map(doc! { "url" => "http://b.example", "description" => "b" }),
    ];
    let result = schema.serialize(doc! { "links" => Value::List(links.clone()) }).unwrap();
    assert_eq!(result.get("permissions"), Some(&Value::List(vec![])));
    assert_eq!(result.get("links"), Some(&Value::List(links)));

    let broken = vec![
        Value::Map(doc! { "url" => "http://a.example" }),
        Value::Map(doc! { "description" => "no url" }),
    ];
    let err = schema.serialize(doc! { "links" => Value::List(broken) }).unwrap_err();
    assert_eq!(err.path(), "links.1.url");
    assert_eq!(err.to_string(), "links.1.url (String): required data missing");
}

#[test]
fn test_subclassed_schema() {
    let sub = Schema::builder()
        .extend(&simple())
        .field("name2", StringNode::new())
        .build()
        .unwrap();
    let result = sub
        .serialize(doc! {
            "not_required" => "n/a",
            "name2" => "hansi",
            "required" => "Required",
            "with_default" => "no default",
        })
        .unwrap();
    let keys: Vec<_> = result.as_document().unwrap().keys().collect();
    assert_eq!(keys, vec!["not_required", "required", "with_default", "name2"]);
    assert_eq!(result.get("name2"), Some(&Value::from("hansi")));
}

#[test]
fn test_underscore_field_names() {
    let schema = Schema::builder().field("_name", StringNode::new()).build().unwrap();
    let result = schema.serialize(doc! { "_name" => "foobar" }).unwrap();
    assert_eq!(result.get("_name"), Some(&Value::from("foobar")));
}

#[test]
fn test_password_confirmation() {
    let schema = Schema::builder()
        .field("password", StringNode::new().required())
        .field("password2", StringNode::new().on_serialize(EqualTo::field("password")))
        .build()
        .unwrap();

    assert!(schema.serialize(doc! { "password" => "s3cret", "password2" => "s3cret" }).is_ok());

    let err = schema
        .serialize(doc! { "password" => "s3cret", "password2" => "secret" })
        .unwrap_err();
    assert_eq!(err.message(), "fields do not match: 'password'");
    assert_eq!(err.field(), Some("password2"));
}

#[test]
fn test_context_reaches_nested_filters() {
    let only_for_admins = |value: Slot, _: &Slot, ctx: &Context| -> ConvertResult<Slot> {
        match ctx.get("role") {
            Some(Value::String(role)) if role == "admin" => Ok(value),
            _ => Err(Invalid::new("Permission", "admins only")),
        }
    };
    let inner = Schema::builder()
        .field("secret", StringNode::new().on_serialize(only_for_admins))
        .build()
        .unwrap();
    let schema = Schema::builder().field("inner", inner).build().unwrap();
    let input = doc! { "inner" => doc! { "secret" => "x" } };

    assert!(schema.serialize(input.clone()).is_err());
    let ctx = Context::new().with("role", "admin");
    assert!(schema.serialize_with(input, &ctx).is_ok());
}

#[test]
fn test_deserialize_materializes_nested_targets() {
    let name = Schema::builder()
        .field("name", StringNode::new())
        .target(TargetShape::record("Name"))
        .build()
        .unwrap();
    let names = Schema::builder()
        .field("names", ListNode::of(name))
        .target(TargetShape::record("Names"))
        .build()
        .unwrap();

    let data = doc! {
        "names" => Value::List(vec![
            Value::Map(doc! { "name" => "one" }),
            Value::Map(doc! { "name" => "two" }),
            Value::Map(doc! { "name" => "three" }),
        ])
    };
    let stored = names.serialize(data).unwrap();
    let Value::Record(result) = names.deserialize(stored).unwrap() else {
        panic!("expected a Names record");
    };
    assert_eq!(result.shape(), "Names");

    let first = &result.get("names").and_then(Value::as_list).unwrap()[0];
    match first {
        Value::Record(record) => {
            assert_eq!(record.shape(), "Name");
            assert_eq!(record.get("name"), Some(&Value::from("one")));
        }
        other => panic!("expected a Name record, got {:?}", other),
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Address {
    city: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    name: String,
    born: NaiveDate,
    address: Address,
}

fn person_schema() -> Schema {
    let address = Schema::builder()
        .field("city", StringNode::new())
        .target(TargetShape::serde::<Address>("Address"))
        .build()
        .unwrap();
    Schema::builder()
        .field("name", StringNode::new().required())
        .field("born", DateNode::new())
        .field("address", address)
        .build()
        .unwrap()
}

#[test]
fn test_typed_targets_through_serde() {
    let schema = person_schema();
    let stored = schema
        .serialize(doc! {
            "name" => "hans",
            "born" => NaiveDate::from_ymd_opt(1970, 1, 2).unwrap(),
            "address" => doc! { "city" => "Bonn" },
        })
        .unwrap();

    let value = schema.deserialize(stored.clone()).unwrap();
    match value.get("address") {
        Some(Value::Record(record)) => {
            assert_eq!(record.downcast_ref::<Address>(), Some(&Address { city: "Bonn".into() }));
        }
        other => panic!("expected an Address record, got {:?}", other),
    }

    let person: Person = schema.deserialize_as(stored).unwrap();
    assert_eq!(
        person,
        Person {
            name: "hans".into(),
            born: NaiveDate::from_ymd_opt(1970, 1, 2).unwrap(),
            address: Address { city: "Bonn".into() },
        }
    );
}

#[test]
fn test_typed_target_reports_shape_errors() {
    let schema = person_schema();
    let err = schema.deserialize_as::<Person>(doc! { "born" => "1970-01-02" });
    assert!(matches!(err, Err(Error::Invalid(_))));

    // the stored document lacks the address, serde cannot build a Person
    let stored = doc! { "name" => "hans", "born" => NaiveDate::from_ymd_opt(1970, 1, 2).unwrap() };
    let err = Schema::builder()
        .field("name", StringNode::new())
        .field("born", DateNode::new())
        .build()
        .unwrap()
        .deserialize_as::<Person>(stored);
    assert!(matches!(err, Err(Error::ShapeError(_))));
}

#[test]
fn test_dotted_dict_and_attrs_target() {
    let schema = Schema::builder()
        .field("settings", DictNode::new().dotted(true))
        .target(TargetShape::attrs())
        .build()
        .unwrap();
    let value = schema
        .deserialize(doc! { "settings" => doc! { "mail" => doc! { "enabled" => true } } })
        .unwrap();
    let Value::Attrs(mut attrs) = value else {
        panic!("expected attrs");
    };
    assert_eq!(attrs.attr("settings.mail.enabled"), Some(&Value::Bool(true)));

    attrs.merge(doc! { "settings" => doc! { "theme" => "dark" } });
    assert_eq!(attrs.attr("settings.theme"), Some(&Value::from("dark")));
    assert_eq!(attrs.attr("settings.mail.enabled"), Some(&Value::Bool(true)));
}

#[test]
fn test_schema_shared_across_threads() {
    let schema = Arc::new(
        Schema::builder()
            .field("n", IntegerNode::new().required())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || schema.serialize(doc! { "n" => i.to_string() }))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.get("n"), Some(&Value::Int(i as i64)));
    }
}
