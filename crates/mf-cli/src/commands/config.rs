use mf_simulation::SchedulerConfig;

pub fn run() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&SchedulerConfig::default())
        .map_err(|e| format!("cannot serialize config: {e}"))?;
    println!("{json}");
    Ok(())
}
