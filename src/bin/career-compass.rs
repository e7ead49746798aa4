use std::io;

use clap::Parser;
use log::LevelFilter;

use career_compass::app::App;
use career_compass::catalog::CatalogLibrary;
use career_compass::cli::{Cli, Command};
use career_compass::config::Config;
use career_compass::input::{ConsolePrompter, SystemEditor};
use career_compass::store::FileSessionStore;
use career_compass::Engine;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    // Environment first, then CLI overrides
    let config = Config::from_env().with_overrides(
        cli.catalog_dir.clone(),
        cli.results_dir.clone(),
        cli.session_dir.clone(),
    );

    let library = match load_library(&config) {
        Ok(library) => library,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    let use_editor = matches!(&cli.command, Command::Take(args) if args.editor);
    let prompter = ConsolePrompter::new(
        io::stdin().lock(),
        io::stdout(),
        use_editor.then(SystemEditor::new),
    );
    let sessions = FileSessionStore::new(&config.session_dir);

    let mut app = App::new(Engine::new(library), config, sessions, prompter);
    if let Err(err) = app.run(cli.command) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn load_library(config: &Config) -> Result<CatalogLibrary, career_compass::catalog::CatalogError> {
    let mut library = CatalogLibrary::builtin()?;
    if let Some(dir) = &config.catalog_dir {
        let loaded = library.load_dir(dir)?;
        log::debug!("Loaded {} catalog(s) from {}", loaded, dir.display());
    }
    Ok(library)
}
