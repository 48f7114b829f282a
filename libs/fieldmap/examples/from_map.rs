//! Binds a JSON document onto a nested record, converting numbers and
//! sequences to the declared field types on the way.

use fieldmap::{Kind, MapValue, Record, Slot, Value};

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct Address {
    #[fieldmap(tag = r#"map:"street""#)]
    pub street: String,

    #[fieldmap(tag = r#"map:"city""#)]
    pub city: String,

    #[fieldmap(tag = r#"map:"country""#)]
    pub country: String,
}

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct User {
    #[fieldmap(tag = r#"map:"id""#)]
    pub id: i32,

    #[fieldmap(tag = r#"map:"username""#)]
    pub username: String,

    #[fieldmap(tag = r#"map:"address""#)]
    pub address: Address,

    #[fieldmap(tag = r#"map:"some_slice""#)]
    pub some_slice: Vec<i32>,
}

/// Copies `input` into the record behind `target`, recursing into nested
/// records whose entry is itself an object.
fn load_from_map(target: &mut dyn Slot, input: &MapValue) -> Result<(), fieldmap::Error> {
    fieldmap::for_each(target, |mut field| {
        let Some(key) = field.tag("map") else {
            return Ok(());
        };
        let Some(value) = input.get(key) else {
            return Ok(());
        };

        if field.kind() == Kind::Record {
            if let Some(nested) = value.as_map() {
                load_from_map(field.slot(), nested)?;
                return Ok(());
            }
        }

        field.set(value.clone())?;
        Ok(())
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let input = Value::from(serde_json::json!({
        "id": 42,
        "username": "fakeUsername",
        "address": {
            "street": "fakeStreet",
            "city": "fakeCity",
            "country": "fakeCountry",
        },
        // Floats here, integers in the record: every element is converted.
        "some_slice": [1.0, 2.0, 3.0],
    }));

    let Some(input) = input.as_map() else {
        tracing::error!("input is not an object");
        std::process::exit(1);
    };

    let mut user = User::default();
    if let Err(e) = load_from_map(&mut user, input) {
        tracing::error!(error = %e, "error loading data from map");
        std::process::exit(1);
    }

    println!(
        "loaded user: {}",
        serde_json::to_string_pretty(&user).unwrap_or_default()
    );
}
