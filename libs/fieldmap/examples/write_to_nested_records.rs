//! Fills a record, creating a missing nested record on the way.

use fieldmap::{Kind, Record, Value};

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct Other {
    pub attr2: i32,
}

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct Output {
    pub attr1: i32,
    pub other: Option<Other>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut output = Output::default();
    let modified = fieldmap::for_each(&mut output, |mut field| {
        let pointee = field.ty().elem().and_then(|elem| elem.record());
        if field.kind() == Kind::Pointer && pointee.is_some() {
            let mut nested = Value::pointer(Value::record(Other::default()));
            fieldmap::for_each(&mut nested, |mut field| {
                field.set(42i64)?;
                Ok(())
            })?;
            field.set(nested)?;
            return Ok(());
        }

        field.set(64u8)?;
        Ok(())
    });
    if let Err(e) = modified {
        tracing::error!(error = %e, "error modifying struct");
        std::process::exit(1);
    }

    println!(
        "modified struct: {}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
}
