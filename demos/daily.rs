use chrono::{Days, Local};
use linky::api::consumption::ConsumptionHistory;
use linky::LinkyApi;

fn main() -> anyhow::Result<()> {
    let mut api = LinkyApi::from_env_values();
    api.login()?;

    let today = Local::now().date_naive();
    let week_ago = today - Days::new(7);

    let history = ConsumptionHistory::new(&api);
    let samples = history.per_day(week_ago, today)?;

    for sample in samples {
        println!("{}: {} kWh", sample.time, sample.conso);
    }

    Ok(())
}
