use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use emoji_composer::{
    Category, Composer, ComposerConfig, ComposerProfile, Configurable, DirFetcher, DirectorySink,
    DownloadSink,
};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "emoji-composer", version, about = "Compose and export layered emoji avatars")]
struct Cli {
    /// Composer config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset root (overrides the config).
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Directory exports are written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Seed for the initial random composition.
    #[arg(long)]
    seed: Option<u64>,

    /// Canvas side length in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Select an entry, e.g. `--select eyes=2`. Repeatable; applied after `--profile`.
    #[arg(long = "select", value_name = "CATEGORY=INDEX", value_parser = parse_select)]
    select: Vec<(Category, usize)>,

    /// Profile JSON to apply after the random start.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Write the final selection as a profile JSON.
    #[arg(long)]
    save_profile: Option<PathBuf>,

    /// What to export.
    #[arg(long, value_enum, default_value_t = FormatChoice::Png)]
    format: FormatChoice,

    /// Print the catalog and exit.
    #[arg(long)]
    list: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatChoice {
    Png,
    Svg,
    Both,
}

fn parse_select(arg: &str) -> Result<(Category, usize), String> {
    let (category, index) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=INDEX, got '{arg}'"))?;
    let category = category.parse::<Category>().map_err(|e| e.to_string())?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad index '{index}': {e}"))?;
    Ok((category, index))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "emoji_composer=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    futures::executor::block_on(run(cli))
}

fn build_config(cli: &Cli) -> anyhow::Result<ComposerConfig> {
    let mut config = match &cli.config {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => ComposerConfig::default(),
    };
    if let Some(assets) = &cli.assets {
        config.assets_dir = assets.clone();
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(size) = cli.size {
        config.canvas_size = size;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    let root = config.assets_dir.clone();
    let fetcher = Rc::new(DirFetcher::new(&root));
    let composer = Composer::start(config, fetcher)
        .await
        .with_context(|| format!("load assets from '{}'", root.display()))?;

    if cli.list {
        for (category, sources) in composer.assets().iter() {
            println!("{category}:");
            for (index, source) in sources.iter().enumerate() {
                println!("  {index:>3}  {source}");
            }
        }
        return Ok(());
    }

    if let Some(path) = &cli.profile {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read profile '{}'", path.display()))?;
        let profile = ComposerProfile::from_json(&json)
            .with_context(|| format!("parse profile '{}'", path.display()))?;
        composer.apply_profile(&profile).await;
    }

    for &(category, index) in &cli.select {
        composer
            .set_selection(category, index)
            .with_context(|| format!("select {category}={index}"))?
            .await;
    }

    if let Some(path) = &cli.save_profile {
        let json = composer.export_profile().to_json_pretty()?;
        std::fs::write(path, json)
            .with_context(|| format!("write profile '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    let sink = DirectorySink::new(&cli.out);
    if matches!(cli.format, FormatChoice::Png | FormatChoice::Both) {
        let file = composer.export_png()?;
        let path = sink.save(&file)?;
        eprintln!("wrote {}", path.display());
    }
    if matches!(cli.format, FormatChoice::Svg | FormatChoice::Both) {
        let file = composer.export_svg().await?;
        let path = sink.save(&file)?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("emoji-composer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn select_parses_category_and_index() {
        assert_eq!(parse_select("eyes=2"), Ok((Category::Eyes, 2)));
        assert_eq!(parse_select("Mouth= 0"), Ok((Category::Mouth, 0)));
        // The detail category also answers to its directory name.
        assert_eq!(parse_select("details=1"), Ok((Category::Detail, 1)));
    }

    #[test]
    fn select_rejects_malformed_arguments() {
        assert!(parse_select("eyes").unwrap_err().contains("CATEGORY=INDEX"));
        assert!(parse_select("nose=1").is_err());
        assert!(parse_select("mouth=x").unwrap_err().contains("bad index"));
        assert!(parse_select("mouth=-1").is_err());
    }

    #[test]
    fn repeated_select_flags_keep_order() {
        let cli = cli(&["--select", "head=1", "--select", "eyebrows=0"]);
        assert_eq!(cli.select, [(Category::Head, 1), (Category::Eyebrows, 0)]);
        assert!(Cli::try_parse_from(["emoji-composer", "--select", "head"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let config = build_config(&cli(&["--assets", "art", "--seed", "9", "--size", "128"])).unwrap();
        assert_eq!(config.assets_dir, PathBuf::from("art"));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.canvas_size, 128);
        assert_eq!(config.svg_export_size, ComposerConfig::default().svg_export_size);
    }

    #[test]
    fn out_of_range_size_is_rejected() {
        assert!(build_config(&cli(&["--size", "0"])).is_err());
        assert!(build_config(&cli(&["--size", "9000"])).is_err());
    }

    #[test]
    fn flags_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"canvasSize":64,"seed":1,"assetsDir":"from-file"}"#).unwrap();
        let path = path.to_str().unwrap();

        let config = build_config(&cli(&["--config", path])).unwrap();
        assert_eq!(config.canvas_size, 64);
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.assets_dir, PathBuf::from("from-file"));

        let config = build_config(&cli(&["--config", path, "--seed", "5", "--size", "32"])).unwrap();
        assert_eq!(config.canvas_size, 32);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.assets_dir, PathBuf::from("from-file"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = build_config(&cli(&["--config", missing.to_str().unwrap()])).unwrap_err();
        assert!(err.to_string().starts_with("load config"));
    }
}
