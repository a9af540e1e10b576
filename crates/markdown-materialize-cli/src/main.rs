use anyhow::{Context, Result, bail};
use markdown_materialize_config::{Config, PolicyName};
use markdown_materialize_engine::{
    Document, EventLoop, MaterializeOptions, RevealPolicy, create_streaming_parser_with_options,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs, process};

struct Args {
    config_path: Option<PathBuf>,
    write_config: bool,
    chunk_size: usize,
    tick: Duration,
    input: Option<PathBuf>,
}

fn print_usage() {
    eprintln!(
        "Usage: markdown-materialize [options] [path]\n\
\n\
Options:\n\
  --config <path>      Config file (default: ~/.config/markdown-materialize/config.toml)\n\
  --chunk-size <n>     Characters per streamed chunk (default: 8)\n\
  --tick-ms <n>        Virtual milliseconds between chunks (default: 5)\n\
  --write-config       Write the effective config to the config path and exit\n\
  -h, --help           Show this help\n\
\n\
If [path] is omitted, reads markdown from stdin."
    );
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        config_path: None,
        write_config: false,
        chunk_size: 8,
        tick: Duration::from_millis(5),
        input: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                let value = iter.next().context("--config expects a path")?;
                args.config_path = Some(PathBuf::from(value));
            }
            "--write-config" => args.write_config = true,
            "--chunk-size" => {
                let value = iter.next().context("--chunk-size expects a value")?;
                args.chunk_size = value
                    .parse()
                    .with_context(|| format!("invalid --chunk-size: {value}"))?;
                if args.chunk_size == 0 {
                    bail!("--chunk-size must be at least 1");
                }
            }
            "--tick-ms" => {
                let value = iter.next().context("--tick-ms expects a value")?;
                let ms: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --tick-ms: {value}"))?;
                args.tick = Duration::from_millis(ms);
            }
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            path => args.input = Some(PathBuf::from(path)),
        }
    }
    Ok(Some(args))
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let loaded = match path {
        Some(path) => {
            let path = Config::expand_path(path).unwrap_or_else(|| path.clone());
            log::info!("Config path: {}", path.display());
            Config::load_from_path(&path)?
        }
        None => {
            log::info!("Config path: {}", Config::config_path().display());
            Config::load()?
        }
    };
    Ok(loaded.unwrap_or_else(|| {
        log::info!("No config file found, using defaults");
        Config::default()
    }))
}

fn write_config(config: &Config, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(path) => {
            let path = Config::expand_path(path).unwrap_or_else(|| path.clone());
            config.save_to_path(&path)?;
            log::info!("Wrote config to {}", path.display());
        }
        None => {
            config.save()?;
            log::info!("Wrote config to {}", Config::config_path().display());
        }
    }
    Ok(())
}

fn options_from_config(config: &Config) -> MaterializeOptions {
    let policy = match config.fade.policy {
        PolicyName::LastWins => RevealPolicy::LastWins,
        PolicyName::Batch => RevealPolicy::Batch {
            max_pending: config.fade.max_pending,
        },
    };
    MaterializeOptions {
        quiet_period: Duration::from_millis(config.fade.quiet_period_ms),
        policy,
        hidden_class: config.classes.hidden.clone(),
        revealed_class: config.classes.revealed.clone(),
        root_class: config.classes.root.clone(),
        ..MaterializeOptions::default()
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            Ok(s)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config_path.as_ref())?;
    if args.write_config {
        return write_config(&config, args.config_path.as_ref());
    }
    let options = options_from_config(&config);
    let markdown = read_input(args.input.as_ref())?;

    let document = Document::new_shared();
    let root = {
        let mut doc = document.borrow_mut();
        let root = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, root)?;
        root
    };
    let event_loop = EventLoop::new();
    let mut parser = create_streaming_parser_with_options(
        document.clone(),
        root,
        event_loop.clone(),
        options.clone(),
    );

    let chars: Vec<char> = markdown.chars().collect();
    for chunk in chars.chunks(args.chunk_size) {
        parser.write(&chunk.iter().collect::<String>());
        event_loop.advance(args.tick);
    }
    parser.end();
    let fired = event_loop.run_until_idle();
    log::debug!("drained {fired} trailing timer(s) at {:?}", event_loop.now());

    let doc = document.borrow();
    let hidden = doc.count_with_class(root, &options.hidden_class);
    let revealed = doc.count_with_class(root, &options.revealed_class);
    log::info!(
        "Streamed {} chars in {:?}: {revealed} of {hidden} blocks revealed",
        chars.len(),
        event_loop.now()
    );
    if revealed < hidden {
        log::warn!(
            "{} block(s) were superseded before their reveal; try policy = \"batch\"",
            hidden - revealed
        );
    }

    println!("{}", doc.to_html(root)?);
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.fade.policy = PolicyName::Batch;
        config.fade.max_pending = 8;

        write_config(&config, Some(&path)).unwrap();
        let loaded = Config::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn batch_config_maps_to_batch_policy() {
        let mut config = Config::default();
        config.fade.policy = PolicyName::Batch;
        config.fade.quiet_period_ms = 25;
        let options = options_from_config(&config);
        assert_eq!(options.policy, RevealPolicy::Batch { max_pending: 64 });
        assert_eq!(options.quiet_period, Duration::from_millis(25));
    }
}
