//! Entry point for meshview: interactive OBJ viewers, one window each.

use anyhow::Result;

mod args;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let config = args::parse_run_config(&argv)?;
    log::info!(
        "Starting meshview. Backend: {:?}, show_fps={}, window_size={}x{}, viewers={}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.viewers.len()
    );

    platform::run_with_renderer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
