//! Deskdust - desktop-overlay particle toys

use deskdust::App;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Deskdust");

    pollster::block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let (app, event_loop) = App::new().await?;
    App::run(event_loop, app)
}
