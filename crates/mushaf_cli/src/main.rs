/* 📖 # How is the CLI organized?

Every subcommand starts the same way: read `mushaf.toml` (or the file given
with `--config`) from the current directory, then load the corpus and all
translations. Loading is strict, so a broken data file stops the command
before anything is served or printed.

- `serve` starts the HTTP API and blocks until the process is stopped
- `stats` prints corpus counts and the loaded translations
- `search` runs a search and prints the first page of matches
- `verse` prints one verse with every translation of it

Exit codes:
- 0: Success
- 1: Error (config not found, data failed to load, bad arguments)
*/

use std::env;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use mushaf_base::tracing::init_tracing;
use mushaf_base::{FilePath, MushafError, MushafResult, PalHandle, RealPal, err};
use mushaf_engine::{
    ApiService, Config, Library, Location, SearchEngine, SearchOptions, SearchPage, SiteInfo,
    load_config, load_library,
};

#[derive(Debug, Parser)]
#[command(name = "mushaf", version, about = "Serve and search a Quran corpus with parallel translations")]
struct Cli {
    /// Configuration file, relative to the current directory
    #[arg(long, short, global = true, default_value = "mushaf.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print corpus statistics
    Stats,
    /// Search the primary text or a translation
    Search {
        /// One or more query terms; a verse matching any of them is reported once
        #[arg(required = true)]
        queries: Vec<String>,
        /// Match whole words instead of substrings
        #[arg(long)]
        exact: bool,
        /// Compare raw text without normalization
        #[arg(long)]
        raw: bool,
        /// Respect letter case (only with --raw)
        #[arg(long)]
        case_sensitive: bool,
        /// Search this translation instead of the primary text
        #[arg(long)]
        translation: Option<String>,
        /// Maximum number of matches to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a verse with all of its translations
    Verse {
        /// Verse location as CHAPTER:VERSE, e.g. 2:255
        location: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> MushafResult<()> {
    let current_dir =
        env::current_dir().map_err(|e| err!("Failed to get current directory: {}", e))?;
    let pal = PalHandle::new(RealPal::new(current_dir));

    let config = load_config(&*pal, &FilePath::from(cli.config.as_str()))?;
    let library = load_library(&*pal, &config)?;

    match cli.command {
        Command::Serve { host, port } => serve(&pal, &config, library, host, port),
        Command::Stats => {
            print_stats(&library);
            Ok(())
        }
        Command::Search {
            queries,
            exact,
            raw,
            case_sensitive,
            translation,
            limit,
        } => {
            let mut options = if exact {
                SearchOptions::exact()
            } else {
                SearchOptions::substring()
            }
            .with_normalize(!raw)
            .with_case_sensitive(case_sensitive);
            if let Some(key) = translation {
                options = options.with_translation(key);
            }
            let limit = config.search.effective_limit(limit);
            search(library, &queries, &options, limit)
        }
        Command::Verse { location } => print_verse(&library, location.parse()?),
    }
}

fn serve(
    pal: &PalHandle,
    config: &Config,
    library: Library,
    host: Option<String>,
    port: Option<u16>,
) -> MushafResult<()> {
    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let service =
        ApiService::new(library, SiteInfo::new(config.title.as_str())).with_search_limits(config.search);
    let handle = pal.start_http_server(Box::new(service), server.to_http_config())?;
    let address = handle.address(&server.host);
    info!(%address, workers = server.workers, "serving API");
    println!("Serving {} on http://{}/api/info", config.title, address);

    handle.wait();
    Ok(())
}

fn print_stats(library: &Library) {
    let book = library.book();
    let stats = book.stats();
    println!("{}", book.name());
    println!("  chapters: {}", stats.chapters);
    println!("  verses:   {}", stats.verses);
    println!("  tokens:   {}", stats.tokens);
    println!("Translations: {}", library.translations().len());
    for translation in library.translations().iter() {
        let info = translation.info();
        println!(
            "  {} - {} ({}), {} verses",
            info.key,
            info.name,
            info.language_name,
            translation.verse_count()
        );
    }
}

fn search(library: Library, queries: &[String], options: &SearchOptions, limit: usize) -> MushafResult<()> {
    let engine = SearchEngine::new(library);
    let matches = engine.search_batch(queries, options)?;
    let page = SearchPage::new(matches, 0, limit);

    for record in &page.items {
        println!("{}  {}", record.location, record.text);
        if !record.tokens.is_empty() {
            let tokens: Vec<String> = record
                .tokens
                .iter()
                .map(|token| format!("{}:{}", token.position, token.text))
                .collect();
            println!("      matched: {}", tokens.join(" "));
        }
        if let Some(primary) = record.primary {
            println!("      {}", primary);
        }
    }

    if page.has_more {
        println!("Showing {} of {} matches", page.items.len(), page.total);
    } else {
        println!("{} matches", page.total);
    }
    Ok(())
}

fn print_verse(library: &Library, location: Location) -> MushafResult<()> {
    let comparison = library
        .translations()
        .compare(library.book(), location.chapter, location.verse)
        .ok_or_else(|| Box::new(MushafError::not_found(format!("Verse {}", location.verse_location()))))?;

    if let Some(preamble) = library.book().verse_at(location).and_then(|verse| verse.preamble()) {
        println!("{}", preamble);
    }
    println!("{}  {}", comparison.location, comparison.primary);
    for (key, text) in &comparison.translations {
        println!("  [{}] {}", key, text);
    }
    Ok(())
}
