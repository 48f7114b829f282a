//! Appends to one sequence field and rewrites the elements of another.

use fieldmap::{Kind, Record, slices};

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct Output {
    pub not_a_slice: i32,

    #[fieldmap(tag = r#"tag:"s1""#)]
    pub empty_slice: Vec<u32>,

    #[fieldmap(tag = r#"tag:"s2""#)]
    pub slice_with_values: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut output = Output {
        slice_with_values: vec!["foo".to_owned(), "bar".to_owned()],
        ..Default::default()
    };

    let modified = fieldmap::for_each(&mut output, |mut field| {
        if field.kind() != Kind::Sequence {
            return Ok(());
        }

        if field.tag("tag") == Some("s1") {
            // 42i64 is converted to u32 on the way in.
            slices::append(field.slot(), [42i64])?;
            return Ok(());
        }

        slices::for_each(field.slot(), |mut item| {
            let current = item.value();
            item.set(format!("{current}{}", item.index()))?;
            Ok(())
        })?;
        Ok(())
    });
    if let Err(e) = modified {
        tracing::error!(error = %e, "error modifying struct");
        std::process::exit(1);
    }

    println!(
        "modified struct with slices: {}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
}
