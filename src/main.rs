use std::path::Path;

use scene_ngin::{app, options::DEFAULT_OPTIONS_FILE};

fn main() -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or("info");
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    app::run_with_options_file(Path::new(DEFAULT_OPTIONS_FILE))
}
