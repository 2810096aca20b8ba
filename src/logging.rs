//! Logging setup, mirroring the teacher crate's combined terminal + file
//! logger. Library consumers may call [`init`] for a ready-made setup, or
//! wire their own `log` implementation and ignore this module entirely.

/// Initialize a combined terminal + file logger under `./logs/<unix-ts>.log`.
///
/// Mirrors the teacher's own `init()`: `TermLogger` at `Info`, `WriteLogger`
/// at `Debug`, location/target/thread annotations switched off for
/// readability. Safe to call at most once per process; a second call logs
/// a warning and is otherwise a no-op.
pub fn init() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    let _ = simplelog::CombinedLogger::init(vec![term, file]);
}
