use std::collections::HashMap;
use std::error::Error as _;
use std::num::ParseIntError;

use fieldmap::{
    Error, Kind, Record, Reflect, TagError, TypeDesc, Value, for_each, struct_info, struct_info_of,
};

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Settings {
    #[fieldmap(tag = r#"env:"HOME""#)]
    pub home: String,

    #[fieldmap(tag = r#"env:"PORT" default:"8080""#)]
    pub port: u64,

    #[fieldmap(tag = r#"env:"DEBUG""#)]
    pub debug: bool,

    secret: String,
}

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Base {
    #[fieldmap(tag = r#"map:"id""#)]
    pub id: i64,
}

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Inner {
    #[fieldmap(tag = r#"map:"label""#)]
    pub label: String,
}

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Outer {
    #[fieldmap(tag = r#"map:"name""#)]
    pub name: String,

    #[fieldmap(embed)]
    pub base: Base,

    pub inner: Inner,

    pub maybe: Option<Inner>,
}

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Lists {
    pub ints: Vec<i64>,
    pub names: Vec<String>,
    pub ptrs: Vec<Option<i32>>,
}

#[derive(Record, Clone, Debug, Default, PartialEq)]
struct Pointers {
    pub nickname: Option<String>,
    pub count: i32,
    pub ratio: f32,
}

#[derive(Record, Clone, Debug, Default)]
struct BadTag {
    #[fieldmap(tag = r#"env:HOME"#)]
    pub home: String,
}

#[derive(Record, Clone, Debug, PartialEq)]
struct Document {
    #[fieldmap(tag = r#"json:"extra""#)]
    pub extra: Value,

    #[fieldmap(tag = r#"json:"items""#)]
    pub items: Vec<Value>,
}

impl Document {
    fn empty() -> Self {
        Self {
            extra: Value::from(0i64),
            items: Vec::new(),
        }
    }
}

#[derive(Record, Clone, Debug, Default)]
struct Wrapper<T> {
    pub inner: T,
    pub items: Vec<T>,
}

#[test]
fn fills_fields_from_tags() {
    let source: HashMap<&str, Value> = HashMap::from([
        ("HOME", Value::from("/home/user")),
        ("PORT", Value::U32(9090)),
        ("DEBUG", Value::Bool(true)),
    ]);

    let mut settings = Settings::default();
    for_each(&mut settings, |mut field| {
        if let Some(value) = field.tag("env").and_then(|key| source.get(key)) {
            field.set(value.clone())?;
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(settings.home, "/home/user");
    assert_eq!(settings.port, 9090);
    assert!(settings.debug);
}

#[test]
fn skips_private_fields() {
    let mut settings = Settings::default();
    let mut visited = Vec::new();
    for_each(&mut settings, |mut field| {
        visited.push(field.name());
        if field.kind() == Kind::String {
            field.set("fake-value-for-string")?;
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(visited, ["home", "port", "debug"]);
    assert_eq!(settings.home, "fake-value-for-string");
    assert_eq!(settings.secret, "");
}

#[test]
fn struct_info_lists_exported_fields() {
    let info = struct_info_of::<Settings>().unwrap();
    assert_eq!(info.name(), "Settings");
    assert_eq!(info.len(), 3);

    let port = info.field("port").unwrap();
    assert_eq!(port.ordinal(), 1);
    assert_eq!(port.ty(), &TypeDesc::U64);
    assert_eq!(port.kind(), Kind::Uint);
    assert_eq!(port.tag("env"), Some("PORT"));
    assert_eq!(port.tag("default"), Some("8080"));
    assert!(info.field("secret").is_none());

    let again = struct_info(&Settings::default()).unwrap();
    assert!(info.shares_descriptors(&again));
}

#[test]
fn struct_info_serializes_to_json() {
    let info = struct_info_of::<Settings>().unwrap();
    let json = serde_json::to_value(&info).unwrap();

    assert_eq!(json["name"], "Settings");
    assert_eq!(json["fields"][0]["name"], "home");
    assert_eq!(json["fields"][0]["type"], "String");
    assert_eq!(json["fields"][0]["tags"]["env"], "HOME");
    assert_eq!(json["fields"][1]["type"], "u64");
}

#[test]
fn struct_info_for_types() {
    let info = fieldmap::struct_info_for(&TypeDesc::ptr(Outer::type_desc())).unwrap();
    assert_eq!(info.name(), "Outer");

    let base = info.field("base").unwrap();
    assert!(base.is_embedded());
    assert_eq!(base.kind(), Kind::Record);
    assert!(!info.field("inner").unwrap().is_embedded());

    let err = fieldmap::struct_info_for(&TypeDesc::seq(TypeDesc::I32)).unwrap_err();
    assert!(err.to_string().contains("can only get struct info from structs"), "{err}");
}

#[test]
fn walks_nested_records_in_place() {
    let source: HashMap<&str, Value> = HashMap::from([
        ("name", Value::from("outer")),
        ("id", Value::I8(42)),
        ("label", Value::from("nested")),
    ]);

    fn fill(
        target: &mut dyn fieldmap::Slot,
        source: &HashMap<&str, Value>,
    ) -> Result<(), Error> {
        for_each(target, |mut field| {
            if field.kind() == Kind::Record {
                fill(field.slot(), source)?;
            } else if let Some(value) = field.tag("map").and_then(|key| source.get(key)) {
                field.set(value.clone())?;
            }
            Ok(())
        })
    }

    let mut outer = Outer::default();
    fill(&mut outer, &source).unwrap();

    assert_eq!(outer.name, "outer");
    assert_eq!(outer.base.id, 42);
    assert_eq!(outer.inner.label, "nested");
    assert_eq!(outer.maybe, None);
}

#[test]
fn nil_nested_record_is_reported() {
    let mut outer = Outer::default();
    let err = for_each(&mut outer, |mut field| {
        if field.name() == "maybe" {
            for_each(field.slot(), |_| Ok(()))?;
        }
        Ok(())
    })
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("maybe"), "{msg}");
    assert!(msg.contains("expected non-nil pointer"), "{msg}");

    outer.maybe = Some(Inner::default());
    for_each(&mut outer, |mut field| {
        if field.name() == "maybe" {
            for_each(field.slot(), |mut inner| {
                inner.set("present")?;
                Ok(())
            })?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(outer.maybe.unwrap().label, "present");
}

#[test]
fn converts_sequence_fields_element_wise() {
    let mut lists = Lists::default();
    for_each(&mut lists, |mut field| {
        match field.name() {
            "ints" => field.set(vec![1.0f64, 2.0, 3.0])?,
            "names" => field.set(Value::pointer(vec!["a".to_owned(), "b".to_owned()]))?,
            "ptrs" => field.set(vec![1u8, 2])?,
            _ => {}
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(lists.ints, vec![1, 2, 3]);
    assert_eq!(lists.names, vec!["a", "b"]);
    assert_eq!(lists.ptrs, vec![Some(1), Some(2)]);
}

#[test]
fn sequence_field_rejects_non_sequences() {
    let mut lists = Lists::default();
    let err = for_each(&mut lists, |mut field| {
        field.set("not-a-list")?;
        Ok(())
    })
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("iteration error"), "{msg}");
    assert!(msg.contains("expected slice for field ints"), "{msg}");
    assert!(msg.contains("Vec<i64>"), "{msg}");
    assert!(msg.contains("not-a-list"), "{msg}");
    assert!(msg.contains("String"), "{msg}");
}

#[test]
fn failing_element_leaves_sequence_field_untouched() {
    let mut lists = Lists {
        ints: vec![9],
        ..Default::default()
    };
    let err = for_each(&mut lists, |mut field| {
        field.set(Value::list([Value::from(1i32), Value::from("not-an-int")]))?;
        Ok(())
    })
    .unwrap_err();

    assert_eq!(lists.ints, vec![9]);
    match &err {
        Error::Field { name, source, .. } => {
            assert_eq!(*name, "ints");
            let inner = source.downcast_ref::<Error>().unwrap();
            assert!(matches!(inner, Error::Element { index: 1, .. }), "{inner}");
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("error converting ints[1]"), "{msg}");
    assert!(msg.contains("not-an-int"), "{msg}");
}

#[test]
fn converts_through_references() {
    let mut pointers = Pointers::default();
    for_each(&mut pointers, |mut field| {
        match field.name() {
            "nickname" => field.set("bob")?,
            "count" => field.set(Value::pointer(7u8))?,
            "ratio" => field.set(0.5f64)?,
            _ => {}
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(
        pointers,
        Pointers {
            nickname: Some("bob".to_owned()),
            count: 7,
            ratio: 0.5,
        }
    );

    for_each(&mut pointers, |mut field| {
        if field.name() == "nickname" {
            field.set(Value::nil(TypeDesc::Any))?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(pointers.nickname, None);
}

#[test]
fn incompatible_value_names_both_types() {
    let mut settings = Settings::default();
    let err = for_each(&mut settings, |mut field| {
        if field.name() == "port" {
            field.set(Value::record(Inner::default()))?;
        }
        Ok(())
    })
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("cannot convert"), "{msg}");
    assert!(msg.contains("Inner"), "{msg}");
    assert!(msg.contains("u64"), "{msg}");
}

#[test]
fn visitor_error_stops_iteration_and_keeps_source() {
    let mut settings = Settings::default();
    let mut visited = Vec::new();
    let err = for_each(&mut settings, |field| {
        visited.push(field.name());
        if field.name() == "port" {
            "not-a-number".parse::<u64>()?;
        }
        Ok(())
    })
    .unwrap_err();

    assert_eq!(visited, ["home", "port"]);

    let msg = err.to_string();
    assert!(msg.contains("iteration error on field 'port'"), "{msg}");
    assert!(msg.contains("u64"), "{msg}");
    assert!(
        err.source()
            .and_then(|source| source.downcast_ref::<ParseIntError>())
            .is_some()
    );
}

#[test]
fn shape_errors() {
    let mut visited = 0;

    let mut missing: Option<Settings> = None;
    let err = for_each(&mut missing, |_| {
        visited += 1;
        Ok(())
    })
    .unwrap_err();
    assert!(err.to_string().contains("expected non-nil pointer"), "{err}");

    let mut by_value = Value::record(Settings::default());
    let err = for_each(&mut by_value, |_| {
        visited += 1;
        Ok(())
    })
    .unwrap_err();
    assert!(err.to_string().contains("expected struct pointer"), "{err}");

    let mut scalar = 5i32;
    let err = for_each(&mut scalar, |_| {
        visited += 1;
        Ok(())
    })
    .unwrap_err();
    assert!(err.to_string().contains("can only get struct info from structs"), "{err}");

    let mut not_record = Some(3i32);
    let err = for_each(&mut not_record, |_| Ok(())).unwrap_err();
    assert!(matches!(err, Error::NotStruct(_)), "{err}");

    let err = struct_info(&Value::record(Settings::default())).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("expected struct pointer"), "{msg}");
    assert!(msg.contains("Settings"), "{msg}");

    assert_eq!(visited, 0);
}

#[test]
fn walks_records_behind_references() {
    let mut typed = Some(Settings::default());
    for_each(&mut typed, |mut field| {
        if field.name() == "home" {
            field.set("/root")?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(typed.unwrap().home, "/root");

    let mut dynamic = Value::pointer(Value::record(Settings::default()));
    for_each(&mut dynamic, |mut field| {
        if field.name() == "port" {
            field.set(22i32)?;
        }
        Ok(())
    })
    .unwrap();

    let expected = Settings {
        port: 22,
        ..Default::default()
    };
    assert_eq!(dynamic, Value::pointer(Value::record(expected)));
}

#[test]
fn malformed_tags_fail_before_any_visit() {
    let err = struct_info_of::<BadTag>().unwrap_err();
    match &err {
        Error::Tag(tag) => {
            assert!(matches!(tag, TagError::MissingQuotes { .. }));
            assert_eq!(tag.tag(), "env:HOME");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("malformed tag"), "{err}");

    let mut bad = BadTag::default();
    let mut visited = false;
    assert!(
        for_each(&mut bad, |_| {
            visited = true;
            Ok(())
        })
        .is_err()
    );
    assert!(!visited);
}

#[test]
fn generic_records() {
    let mut wrapper = Wrapper::<i32>::default();
    for_each(&mut wrapper, |mut field| {
        match field.name() {
            "inner" => field.set(5u8)?,
            "items" => field.set(vec![1i64, 2])?,
            _ => {}
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(wrapper.inner, 5);
    assert_eq!(wrapper.items, vec![1, 2]);

    let info = struct_info_of::<Wrapper<String>>().unwrap();
    assert_eq!(info.field("items").unwrap().ty(), &TypeDesc::seq(TypeDesc::Str));

    let ints = struct_info_of::<Wrapper<i32>>().unwrap();
    assert_ne!(ints.name(), info.name());
    assert!(ints.name().contains("Wrapper"), "{}", ints.name());
    assert!(ints.name().contains("i32"), "{}", ints.name());
    assert!(info.name().contains("String"), "{}", info.name());
}

#[test]
fn dynamic_fields_take_nil_from_json() {
    let json = Value::from(serde_json::json!({
        "extra": null,
        "items": [1, null],
    }));
    let input = json.as_map().unwrap();

    let mut doc = Document::empty();
    for_each(&mut doc, |mut field| {
        if let Some(value) = field.tag("json").and_then(|key| input.get(key)) {
            field.set(value.clone())?;
        }
        Ok(())
    })
    .unwrap();

    assert!(doc.extra.is_nil(), "{}", doc.extra);
    assert_eq!(doc.items, vec![Value::I64(1), Value::nil(TypeDesc::Any)]);
}

#[test]
fn dynamic_field_keeps_record_reference_for_walking() {
    let mut doc = Document::empty();
    for_each(&mut doc, |mut field| {
        if field.name() == "extra" {
            field.set(Value::pointer(Value::record(Inner::default())))?;
        }
        Ok(())
    })
    .unwrap();

    for_each(&mut doc.extra, |mut field| {
        if field.tag("map") == Some("label") {
            field.set("walked")?;
        }
        Ok(())
    })
    .unwrap();

    let expected = Inner {
        label: "walked".to_owned(),
    };
    assert_eq!(doc.extra, Value::pointer(Value::record(expected)));
}

#[test]
fn field_values_are_readable() {
    let mut settings = Settings {
        home: "/srv".to_owned(),
        port: 80,
        ..Default::default()
    };
    let mut values = Vec::new();
    for_each(&mut settings, |field| {
        values.push(field.value());
        Ok(())
    })
    .unwrap();

    assert_eq!(
        values,
        vec![Value::from("/srv"), Value::U64(80), Value::Bool(false)]
    );
}
