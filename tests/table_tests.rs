use hashbase::core::error::ErrorKind;
use hashbase::core::types::{attributes, Attributes, Value};
use hashbase::core::table::Model;

fn countries() -> Model {
    let model = Model::new("Country");
    model
        .set_data(vec![
            attributes([("id", Value::from(1)), ("name", Value::from("US")), ("language", Value::from("English"))]),
            attributes([("id", Value::from(2)), ("name", Value::from("Canada")), ("language", Value::from("English"))]),
            attributes([("id", Value::from(3)), ("name", Value::from("Mexico")), ("language", Value::from("Spanish"))]),
        ])
        .unwrap();
    model
}

#[test]
fn test_duplicate_id_raises_on_populated_table() {
    let model = countries();

    let err = model
        .create(attributes([("id", Value::from(2)), ("name", Value::from("Again"))]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::IdError);
    assert!(err.context.starts_with("Duplicate ID found for record"));

    assert_eq!(model.ids(), vec![Value::from(1), Value::from(2), Value::from(3)]);
}

#[test]
fn test_string_and_integer_ids_collide() {
    let model = countries();
    assert!(model.create(attributes([("id", "2")])).is_err());
}

#[test]
fn test_index_consistent_after_data_and_insert() {
    let model = countries();
    for record in model.all().iter() {
        let found = model.find_by_id(record.id().unwrap().clone()).unwrap();
        assert_eq!(&found, record);
    }

    let created = model.create(attributes([("name", "Japan")])).unwrap();
    assert_eq!(model.find_by_id(4), Some(created));
}

#[test]
fn test_auto_increment_uses_max_id() {
    let model = Model::new("Country");
    model
        .set_data(vec![attributes([("id", 1)]), attributes([("id", 5)])])
        .unwrap();

    let mut record = model.new_record(Attributes::new());
    model.save(&mut record).unwrap();
    assert_eq!(record.id(), Some(&Value::from(6)));
}

#[test]
fn test_auto_increment_on_empty_table_starts_at_one() {
    let model = Model::new("Country");
    let first = model.create(Attributes::new()).unwrap();
    assert_eq!(first.id(), Some(&Value::from(1)));
}

#[test]
fn test_data_round_trip_adds_ids() {
    let model = Model::new("Country");
    let rows = vec![
        attributes([("name", "US")]),
        attributes([("name", "Canada")]),
    ];
    model.set_data(rows.clone()).unwrap();

    let data = model.data().unwrap();
    assert_eq!(data.len(), rows.len());
    for (i, (row, original)) in data.iter().zip(&rows).enumerate() {
        assert_eq!(row["id"], Value::from(i as i64 + 1));
        assert_eq!(row["name"], original["name"]);
    }
}

#[test]
fn test_empty_data() {
    let model = countries();
    model.set_data(None).unwrap();

    assert!(model.all().is_empty());
    assert_eq!(model.count(), 0);
    assert!(model.first().is_none());
}

#[test]
fn test_nil_ids_are_not_indexed() {
    let model = Model::new("Country");
    model
        .set_data(vec![attributes([("id", "us")]), attributes([("name", "nowhere")])])
        .unwrap();

    assert_eq!(model.count(), 2);
    assert!(model.find_by_id(Value::Null).is_none());
    assert!(model.last().unwrap().id().is_none());
}

#[test]
fn test_dirty_flag_lifecycle() {
    let model = Model::new("Country");
    assert!(!model.is_dirty());

    model.set_data(vec![attributes([("name", "US")])]).unwrap();
    assert!(model.is_dirty());

    model.mark_clean();
    assert!(!model.is_dirty());

    model.create(attributes([("name", "Canada")])).unwrap();
    assert!(model.is_dirty());
}

#[test]
fn test_reserved_field_is_rejected() {
    let model = Model::new("Country");
    let err = model.fields(["name", "attributes"]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReservedField);
    assert_eq!(err.context, "attributes is a reserved field. Please use another name.");
}

#[test]
fn test_field_defaults_apply_to_reads() {
    use hashbase::schema::schema::FieldOptions;

    let model = Model::new("Country");
    model.field("name", FieldOptions::with_default("foobar")).unwrap();
    model.set_data(vec![attributes([("id", 1)])]).unwrap();

    let record = model.find(1).unwrap();
    assert_eq!(record.read("name"), Value::from("foobar"));
    assert_eq!(model.filter(hashbase::Constraints::from([("name", "foobar")])).len(), 1);
}

#[test]
fn test_model_is_shared_across_threads() {
    let model = countries();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let model = model.clone();
            std::thread::spawn(move || {
                if i == 0 {
                    model.reload().unwrap();
                }
                model.all().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

#[test]
fn test_custom_methods_feed_queries() {
    let model = countries();
    model.define_method("label", |record| {
        Value::from(format!("{} ({})", record.read("name"), record.read("language")))
    });

    let us = model.find(1).unwrap();
    assert_eq!(us.call("label").unwrap(), Value::from("US (English)"));
    assert_eq!(us.call("language?").unwrap(), Value::Bool(true));
    assert_eq!(
        model.filter(hashbase::Constraints::from([("label", "Mexico (Spanish)")])).ids(),
        vec![Value::from(3)]
    );
    assert!(us.call("capital").is_err());
}
