use clap::Parser;

use cookbot::cli::{Cli, Commands};
use cookbot::{BotConfig, Result};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if let Err(e) = dispatch(&cli) {
        log::error!("{}", e);
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    let config = BotConfig::load_or_default(&cli.config)?;
    match cli.command() {
        Commands::Run => desktop::run(cli, &config),
        Commands::Calibrate => desktop::calibrate(&config),
        Commands::Position => desktop::position(),
    }
}

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::mpsc;

    use cookbot::cli::Cli;
    use cookbot::desktop::{spawn_listener, EnigoPointer, XcapScreen};
    use cookbot::region::{calibrate as calibrate_from, load_region, save_region};
    use cookbot::{BotConfig, CookBot, Result, StopToken, TemplateStore};

    pub fn run(cli: &Cli, config: &BotConfig) -> Result<()> {
        let templates = TemplateStore::load(&config.files, (&config.matching).into())?;
        let region = load_region(&config.files.region_path());

        let mut bot = CookBot::new(
            config,
            templates,
            XcapScreen::primary()?,
            EnigoPointer::new()?,
        )?
        .with_region(region);

        if config.preview.enabled && !cli.no_preview {
            bot.preview_region()?;
        }

        let token = StopToken::new();
        spawn_listener(token.clone(), None)?;
        log::info!("Press Esc or Space to stop");

        let summary = bot.run(&token)?;
        println!("{}", summary);
        Ok(())
    }

    pub fn calibrate(config: &BotConfig) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        spawn_listener(StopToken::new(), Some(tx))?;
        log::info!("Click the top-left corner of the search area (Esc to cancel)");

        match calibrate_from(rx.iter())? {
            Some(region) => {
                let path = config.files.region_path();
                save_region(&path, &region)?;
                println!("{} -> {}", region, path.display());
            }
            None => log::warn!("Calibration cancelled"),
        }
        Ok(())
    }

    pub fn position() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        spawn_listener(StopToken::new(), Some(tx))?;
        log::info!("Listening for clicks, Esc to stop");
        for point in rx.iter() {
            println!("Mouse clicked at: X={}, Y={}", point.x, point.y);
        }
        Ok(())
    }
}

#[cfg(not(feature = "desktop"))]
mod desktop {
    use cookbot::cli::Cli;
    use cookbot::{BotConfig, CookbotError, Result};

    fn unavailable() -> Result<()> {
        Err(CookbotError::Config(
            "built without the `desktop` feature; rebuild with `--features desktop`".to_string(),
        ))
    }

    pub fn run(_cli: &Cli, _config: &BotConfig) -> Result<()> {
        unavailable()
    }

    pub fn calibrate(_config: &BotConfig) -> Result<()> {
        unavailable()
    }

    pub fn position() -> Result<()> {
        unavailable()
    }
}
