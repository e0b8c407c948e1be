use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;
use spritebox_core::msg::MsgBuffer;
use spritebox_core::prelude::*;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "spritebox",
    about = "Build, repack and inspect sprite-atlas projects",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a project from a file or directory of images
    New(NewArgs),
    /// Add (or replace) sprites in an existing project
    Add(AddArgs),
    /// Remove sprites by name
    Remove(RemoveArgs),
    /// Repack a project, optionally changing its layout settings
    Repack(RepackArgs),
    /// Print packing statistics and the sprite list
    Info(InfoArgs),
    /// Convert between JSON text and the tagged binary format (.msg)
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone)]
struct NewArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Project file to write
    #[arg(short, long, default_value = "atlas.json", help_heading = "Input/Output")]
    output: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args, Debug, Clone)]
struct AddArgs {
    /// Project file
    project: PathBuf,
    /// Image files; each sprite is named after its file stem
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct RemoveArgs {
    /// Project file
    project: PathBuf,
    /// Sprite names
    #[arg(required = true)]
    names: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct RepackArgs {
    /// Project file
    project: PathBuf,
    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args, Debug, Clone)]
struct InfoArgs {
    /// Project file
    project: PathBuf,
    /// Print machine-readable JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    /// Source file (.json or .msg)
    input: PathBuf,
    /// Destination file (.json or .msg)
    output: PathBuf,
}

/// Layout options. Unset options keep the project's stored value.
#[derive(Args, Debug, Clone, Default)]
struct LayoutArgs {
    /// Canvas width
    #[arg(long, help_heading = "Layout")]
    width: Option<u32>,
    /// Canvas height
    #[arg(long, help_heading = "Layout")]
    height: Option<u32>,
    /// Padding around every sprite
    #[arg(long, help_heading = "Layout")]
    padding: Option<u32>,
    /// Margin kept free along the sheet border
    #[arg(long, help_heading = "Layout")]
    spacing: Option<u32>,
    /// MaxRects heuristic: bssf|blsf|baf|bl|cp
    #[arg(long, help_heading = "Layout")]
    heuristic: Option<String>,
    /// Export the sheet cropped to the placed sprites
    #[arg(long, action=ArgAction::Set, help_heading = "Export")]
    trim: Option<bool>,
    /// Embed the sheet in the project document instead of a sibling PNG
    #[arg(long, action=ArgAction::Set, help_heading = "Export")]
    embed: Option<bool>,
    /// YAML config file path (present keys override the options above)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    run(&cli)
}

/// Runs one subcommand. Errors are returned, not logged; `main` reports them.
fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::New(args) => run_new(args, cli.progress && !cli.quiet),
        Commands::Add(args) => run_add(args),
        Commands::Remove(args) => run_remove(args),
        Commands::Repack(args) => run_repack(args),
        Commands::Info(args) => run_info(args),
        Commands::Convert(args) => run_convert(args),
    }
}

fn run_new(args: &NewArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = merge_layout(PackerConfig::default(), &args.layout)?;
    if args.layout.print_config {
        return print_config(&cfg, &args.layout.print_config_format);
    }

    let paths = gather_paths(&args.input, &args.include, &args.exclude)?;
    if paths.is_empty() {
        anyhow::bail!("no images found under {}", args.input.display());
    }
    let mut project = Project::with_config(cfg);
    let added = add_files_with_progress(&mut project, &paths, show_progress)?;
    info!(count = added, "loaded input images");

    let all = project.repack();
    if !all {
        warn!("some sprites did not fit the canvas");
    }
    project
        .save(&args.output, &DefaultCodec)
        .with_context(|| format!("write {}", args.output.display()))?;
    info!(path = ?args.output, "{}", project.stats().summary());
    Ok(())
}

fn run_add(args: &AddArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    for f in &args.files {
        let name = project
            .add_file(f, &DefaultCodec)
            .with_context(|| format!("load {}", f.display()))?;
        info!(name = %name, "added sprite");
    }
    save_project(&mut project, &args.project)
}

fn run_remove(args: &RemoveArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    for name in &args.names {
        if project.remove_sprite(name) {
            info!(name = %name, "removed sprite");
        } else {
            warn!(name = %name, "no such sprite");
        }
    }
    save_project(&mut project, &args.project)
}

fn run_repack(args: &RepackArgs) -> anyhow::Result<()> {
    let mut project = open_project(&args.project)?;
    let cfg = merge_layout(project.config().clone(), &args.layout)?;
    if args.layout.print_config {
        return print_config(&cfg, &args.layout.print_config_format);
    }
    project.set_config(cfg)?;
    if !project.repack() {
        warn!("some sprites did not fit the canvas");
    }
    save_project(&mut project, &args.project)
}

fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    let project = open_project(&args.project)?;
    let stats = project.stats();
    if args.json {
        let sprites: Vec<serde_json::Value> = project
            .sprites()
            .iter()
            .map(|(name, s)| {
                serde_json::json!({
                    "name": name,
                    "packed": s.packed,
                    "kind": s.kind,
                    "region": s.region,
                    "origin_a": [s.origin_a.0, s.origin_a.1],
                    "origin_b": [s.origin_b.0, s.origin_b.1],
                })
            })
            .collect();
        let compositions: Vec<serde_json::Value> = project
            .compositions()
            .iter()
            .map(|(name, c)| serde_json::json!({ "name": name, "nodes": c.len() }))
            .collect();
        let value = serde_json::json!({
            "config": project.config(),
            "stats": stats,
            "sprites": sprites,
            "compositions": compositions,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", stats.summary());
    for (name, s) in project.sprites() {
        let r = s.region;
        if s.packed {
            println!("  {name:<24} {}x{} at ({}, {})", r.w, r.h, r.x, r.y);
        } else {
            println!("  {name:<24} {}x{} UNPACKED", r.w, r.h);
        }
    }
    for (name, c) in project.compositions() {
        println!("  composition {name}: {} nodes", c.len());
    }
    Ok(())
}

fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let buf = match extension(&args.input).as_deref() {
        Some("msg") => MsgBuffer::from_bytes(
            fs::read(&args.input).with_context(|| format!("read {}", args.input.display()))?,
        ),
        _ => {
            let text = fs::read_to_string(&args.input)
                .with_context(|| format!("read {}", args.input.display()))?;
            MsgBuffer::from_json(&text)
                .with_context(|| format!("parse {}", args.input.display()))?
        }
    };
    match extension(&args.output).as_deref() {
        Some("msg") => fs::write(&args.output, buf.as_bytes()),
        _ => {
            let Some(text) = buf.to_json() else {
                anyhow::bail!("{} is not a valid tagged buffer", args.input.display());
            };
            fs::write(&args.output, text)
        }
    }
    .with_context(|| format!("write {}", args.output.display()))?;
    info!(bytes = buf.len(), output = ?args.output, "converted");
    Ok(())
}

fn extension(p: &Path) -> Option<String> {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

fn open_project(path: &Path) -> anyhow::Result<Project> {
    let mut project = Project::new();
    project
        .open(path, &DefaultCodec)
        .with_context(|| format!("open {}", path.display()))?;
    Ok(project)
}

fn save_project(project: &mut Project, path: &Path) -> anyhow::Result<()> {
    project
        .save(path, &DefaultCodec)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = ?path, "{}", project.stats().summary());
    Ok(())
}

fn print_config(cfg: &PackerConfig, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => println!("{}", serde_yaml::to_string(cfg)?),
        _ => println!("{}", serde_json::to_string_pretty(cfg)?),
    }
    Ok(())
}

/// Applies CLI options, then the YAML file, on top of `cfg`.
fn merge_layout(mut cfg: PackerConfig, args: &LayoutArgs) -> anyhow::Result<PackerConfig> {
    if let Some(v) = args.width {
        cfg.width = v;
    }
    if let Some(v) = args.height {
        cfg.height = v;
    }
    if let Some(v) = args.padding {
        cfg.padding = v;
    }
    if let Some(v) = args.spacing {
        cfg.spacing = v;
    }
    if let Some(v) = &args.heuristic {
        cfg.heuristic = parse_heuristic(v)?;
    }
    if let Some(v) = args.trim {
        cfg.trim = v;
    }
    if let Some(v) = args.embed {
        cfg.embed = v;
    }
    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_packer_config(cfg)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn parse_heuristic(s: &str) -> anyhow::Result<MaxRectsHeuristic> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown heuristic: {}", s))
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        extension(p),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

/// Adds every path as a sprite. Unreadable files are logged and skipped;
/// a later file with the same stem replaces the earlier sprite.
fn add_files_with_progress(
    project: &mut Project,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut added = 0;
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match project.add_file(p, &DefaultCodec) {
            Ok(_) => added += 1,
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(added)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    width: Option<u32>,
    height: Option<u32>,
    padding: Option<u32>,
    spacing: Option<u32>,
    heuristic: Option<String>,
    trim: Option<bool>,
    embed: Option<bool>,
}

impl YamlConfig {
    fn into_packer_config(self, mut cfg: PackerConfig) -> anyhow::Result<PackerConfig> {
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.spacing {
            cfg.spacing = v;
        }
        if let Some(v) = self.heuristic {
            cfg.heuristic = parse_heuristic(&v)?;
        }
        if let Some(v) = self.trim {
            cfg.trim = v;
        }
        if let Some(v) = self.embed {
            cfg.embed = v;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_cli_options() {
        let args = LayoutArgs {
            width: Some(128),
            padding: Some(1),
            heuristic: Some("cp".into()),
            ..Default::default()
        };
        let cfg = merge_layout(PackerConfig::default(), &args).unwrap();
        assert_eq!((cfg.width, cfg.height, cfg.padding), (128, 512, 1));
        assert_eq!(cfg.heuristic, MaxRectsHeuristic::ContactPoint);

        let y: YamlConfig = serde_yaml::from_str("padding: 4\nheuristic: baf\ntrim: true\n").unwrap();
        let cfg = y.into_packer_config(cfg).unwrap();
        assert_eq!(cfg.padding, 4);
        assert_eq!(cfg.width, 128);
        assert_eq!(cfg.heuristic, MaxRectsHeuristic::BestAreaFit);
        assert!(cfg.trim);
    }

    #[test]
    fn bad_layout_is_rejected() {
        let args = LayoutArgs {
            heuristic: Some("skyline".into()),
            ..Default::default()
        };
        assert!(merge_layout(PackerConfig::default(), &args).is_err());
        let args = LayoutArgs {
            width: Some(0),
            ..Default::default()
        };
        assert!(merge_layout(PackerConfig::default(), &args).is_err());
    }

    #[test]
    fn failed_command_returns_its_error() {
        let dir = std::env::temp_dir().join("spritebox-cli-missing");
        let input = dir.join("absent.json");
        let output = dir.join("out.msg");
        let cli = Cli::try_parse_from([
            "spritebox".to_string(),
            "convert".to_string(),
            input.display().to_string(),
            output.display().to_string(),
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().starts_with("read "), "{err:#}");
        assert!(!output.exists());
    }

    #[test]
    fn image_extensions() {
        assert!(is_image(Path::new("a/B.PNG")));
        assert!(!is_image(Path::new("a/b.json")));
        assert!(!is_image(Path::new("noext")));
    }
}
