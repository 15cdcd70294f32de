use linky::api::consumption::ConsumptionHistory;
use linky::api::series::as_polars_df;
use linky::LinkyApi;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut api = LinkyApi::from_env_values();
    api.login()?;

    let history = ConsumptionHistory::new(&api);
    let report = history.fetch_all()?;

    println!("hourly:\n{}", as_polars_df(&report.hourly)?);
    println!("daily:\n{}", as_polars_df(&report.daily)?);
    println!("monthly:\n{}", as_polars_df(&report.monthly)?);
    println!("yearly:\n{}", as_polars_df(&report.yearly)?);

    Ok(())
}
