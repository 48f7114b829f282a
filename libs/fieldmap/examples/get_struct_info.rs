//! Prints the fields and tags of a record, descending into nested records.

use fieldmap::{Kind, Record};

#[derive(Record, Clone, Debug, Default)]
struct Address {
    #[fieldmap(tag = r#"map:"street""#)]
    pub street: String,

    #[fieldmap(tag = r#"map:"city""#)]
    pub city: String,
}

#[derive(Record, Clone, Debug, Default)]
struct User {
    #[fieldmap(tag = r#"map:"name""#)]
    pub name: String,

    #[fieldmap(tag = r#"map:"home""#)]
    pub home_dir: Address,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let info = match fieldmap::struct_info(&User::default()) {
        Ok(info) => info,
        Err(e) => {
            tracing::error!(error = %e, "failed to describe record");
            std::process::exit(1);
        }
    };

    for field in info.fields() {
        let tags = serde_json::to_string(field.tags()).unwrap_or_default();
        println!("Field {:?} has tags {tags}", field.name());

        if field.kind() == Kind::Record {
            match fieldmap::struct_info_for(field.ty()) {
                Ok(nested) => {
                    println!("Nested field {:?} has {} fields", field.name(), nested.len())
                }
                Err(e) => {
                    tracing::error!(error = %e, field = field.name(), "failed to describe nested record");
                    std::process::exit(1);
                }
            }
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&info).unwrap_or_default()
    );
}
