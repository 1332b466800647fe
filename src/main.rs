use clap::Parser;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

use arbor::core::config::{self, CliOverrides};

#[derive(Parser)]
#[command(name = "arbor", about = "Terminal browser that grows links into a tab tree")]
struct Args {
    /// URL to open in the first tab instead of the home page
    url: Option<String>,

    /// Home page for new root tabs
    #[arg(long)]
    home: Option<String>,

    /// Log level written to arbor.log (off, error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let (file_config, config_error) = match config::load_config() {
        Ok(c) => (c, None),
        Err(e) => (config::ArborConfig::default(), Some(e)),
    };
    let resolved = config::resolve(
        &file_config,
        CliOverrides {
            home_url: args.home.as_deref(),
            start_url: args.url.as_deref(),
            log_level: args.log_level.as_deref(),
        },
    );

    // Initialize file logger - writes to arbor.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("arbor.log") {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    if let Some(e) = config_error {
        log::warn!("Falling back to default config: {e}");
    }
    log::info!("Arbor starting up with home page {}", resolved.home_url);

    arbor::tui::run(resolved)
}
