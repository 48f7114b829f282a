//! Loads a config record from environment variables named by `env` tags.

use fieldmap::Record;

#[derive(Record, serde::Serialize, Clone, Debug, Default)]
struct Config {
    #[fieldmap(tag = r#"env:"CARGO_HOME""#)]
    pub cargo_home: String,

    #[fieldmap(tag = r#"env:"HOME""#)]
    pub home: String,

    #[fieldmap(tag = r#"env:"PWD""#)]
    pub current_dir: String,

    #[fieldmap(tag = r#"env:"SHELL""#)]
    pub shell: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = Config::default();
    let loaded = fieldmap::for_each(&mut config, |mut field| {
        if let Some(var) = field.tag("env") {
            field.set(std::env::var(var).unwrap_or_default())?;
        }
        Ok(())
    });
    if let Err(e) = loaded {
        tracing::error!(error = %e, "error loading env vars");
        std::process::exit(1);
    }

    tracing::info!(fields = 4, "config loaded");
    println!(
        "loaded config: {}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );
}
