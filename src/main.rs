use ggine::{app::GgineApp, config::EngineConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::from_env();
    log::info!("Starting ggine (assets: {})", config.assets_dir.display());

    GgineApp::new(config)?.run()
}
