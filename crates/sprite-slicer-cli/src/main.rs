use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use handlebars::Handlebars;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use sprite_slicer_core::effects::{ColorCount, dominant_colors};
use sprite_slicer_core::refine::image_content_bounds;
use sprite_slicer_core::report::{self, LayoutReport, ReportEntry};
use sprite_slicer_core::{
    LayoutEntry, LayoutTable, SheetInput, SheetOutput, SheetSpec, SlicerConfig, batch_stats,
    detect_layout, reject_degenerate, slice_sheets_with_variant,
};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "sprite-slicer",
    about = "Slice irregular sprite sheets into centered animation frames",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
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
    /// Detect frame layouts automatically and write a reviewable report
    Detect(DetectArgs),
    /// Cut sheets into normalized PNG frames using a layout table
    Slice(SliceArgs),
    /// Turn a detection report into a fixed (explicit) layout table
    Promote(PromoteArgs),
    /// List the dominant colours and content bounds of an image
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Input sheet or directory of sheets
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct DetectorArgs {
    /// YAML config file path (its keys override the detector options below)
    #[arg(long, help_heading = "Detector")]
    config: Option<PathBuf>,
    /// Mask downsampling factor
    #[arg(long, default_value_t = 2, help_heading = "Detector")]
    scale: u32,
    /// Alpha values strictly above this count as occupied
    #[arg(long, default_value_t = 10, help_heading = "Detector")]
    alpha_threshold: u8,
    /// 4-connected dilation passes on the mask
    #[arg(long, default_value_t = 3, help_heading = "Detector")]
    dilation_passes: u32,
    /// Components must be wider than this (pixels)
    #[arg(long, default_value_t = 20, help_heading = "Detector")]
    min_width: u32,
    /// Components must be taller than this (pixels)
    #[arg(long, default_value_t = 20, help_heading = "Detector")]
    min_height: u32,
    /// Padding around each rough box before refinement (pixels)
    #[arg(long, default_value_t = 5, help_heading = "Detector")]
    refinement_padding: u32,
    /// Output canvas side (pixels)
    #[arg(long, default_value_t = 256, help_heading = "Output")]
    canvas_size: u32,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Output")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Output")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct DetectArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    detector: DetectorArgs,
    /// Number of frame rows the sheets are drawn with
    #[arg(long, help_heading = "Layout")]
    rows: u32,
    /// Expected frames per sheet; other counts are flagged as degenerate
    #[arg(long, help_heading = "Layout")]
    expected: Option<usize>,
    /// Report file (JSON)
    #[arg(short, long, default_value = "layout_report.json", help_heading = "Input/Output")]
    out: PathBuf,
    /// Dry run: detect and log but do not write the report
    #[arg(long, default_value_t = false, help_heading = "Input/Output")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct SliceArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    detector: DetectorArgs,
    /// Layout table (YAML or JSON)
    #[arg(long, help_heading = "Layout")]
    layout: Option<PathBuf>,
    /// Sheets missing from the table are auto-detected with this many rows
    #[arg(long, help_heading = "Layout")]
    auto_rows: Option<u32>,
    /// Expected frame count for sheets detected through --auto-rows
    #[arg(long, help_heading = "Layout")]
    expected: Option<usize>,
    /// Apply the named table variant's effects to sheets not already resolved through a variant
    #[arg(long, help_heading = "Effects")]
    variant: Option<String>,
    /// Output directory
    #[arg(short, long, default_value = "frames", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Frame file name (handlebars): stem, sheet, index, seq are available
    #[arg(long, default_value = "{{stem}}_frame_{{index}}.png", help_heading = "Input/Output")]
    name_template: String,
    /// Treat degenerate detections as sheet failures
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    strict: bool,
    /// Export batch stats (JSON) to this file
    #[arg(long, help_heading = "Input/Output")]
    export_stats: Option<PathBuf>,
    /// Dry run: slice and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Input/Output")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct PromoteArgs {
    /// Detection report written by `detect`
    report: PathBuf,
    /// Output table (YAML, or JSON when the extension is .json)
    #[arg(short, long, default_value = "layout_table.yaml")]
    out: PathBuf,
    /// Existing table to merge into; promoted entries replace same-named sheets
    #[arg(long)]
    base: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct AnalyzeArgs {
    /// Image to analyze
    image: PathBuf,
    /// Number of colours to list
    #[arg(long, default_value_t = 20)]
    top: usize,
    /// Output format: text|json
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Detect(args) => run_detect(args, show_progress),
        Commands::Slice(args) => run_slice(args, show_progress),
        Commands::Promote(args) => run_promote(args),
        Commands::Analyze(args) => run_analyze(args),
    }
}

fn run_detect(args: &DetectArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = resolve_config(&args.detector)?;
    if args.detector.print_config {
        return print_config(&cfg, &args.detector.print_config_format);
    }

    let paths = gather_paths(&args.input.input, &args.input.include, &args.input.exclude)?;
    let inputs = load_images_with_progress(&args.input.input, &paths, show_progress)?;
    info!(count = inputs.len(), "loaded sheets");

    let start = Instant::now();
    let mut report = LayoutReport::default();
    let mut failed = 0usize;
    for input in &inputs {
        let rgba = input.image.to_rgba8();
        match detect_layout(&input.identity, &rgba, &cfg, args.rows, args.expected) {
            Ok(det) => {
                match &det.issue {
                    Some(issue) => warn!(sheet = %input.identity, %issue, "check this sheet"),
                    None => info!(sheet = %input.identity, frames = det.frames.len(), "detected"),
                }
                report.insert(
                    input.identity.clone(),
                    ReportEntry::from_detection(&det, args.rows),
                );
            }
            Err(e) => {
                failed += 1;
                error!(sheet = %input.identity, error = %e, "detection failed");
            }
        }
    }
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "detection finished");

    let value = report::to_json(&report);
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&args.out, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", args.out.display()))?;
        info!(path = ?args.out, sheets = report.sheets.len(), "report written");
    }
    if failed > 0 {
        anyhow::bail!("{failed} sheet(s) failed detection");
    }
    Ok(())
}

fn run_slice(args: &SliceArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = resolve_config(&args.detector)?;
    if args.detector.print_config {
        return print_config(&cfg, &args.detector.print_config_format);
    }

    let mut table = match &args.layout {
        Some(path) => load_table(path)?,
        None if args.auto_rows.is_some() => LayoutTable::default(),
        None => anyhow::bail!("either --layout or --auto-rows is required"),
    };
    table.validate()?;
    if let Some(name) = &args.variant {
        if !table.variants.contains_key(name) {
            anyhow::bail!("unknown variant '{name}'");
        }
    }

    let paths = gather_paths(&args.input.input, &args.input.include, &args.input.exclude)?;
    let inputs = load_images_with_progress(&args.input.input, &paths, show_progress)?;
    info!(count = inputs.len(), "loaded sheets");

    if let Some(rows) = args.auto_rows {
        for input in &inputs {
            if table.resolve(&input.identity).is_none() {
                debug!(sheet = %input.identity, rows, "no table entry, falling back to auto");
                table.insert(
                    input.identity.clone(),
                    SheetSpec::new(LayoutEntry::Auto {
                        row_bucket_count: rows,
                        expected_frames: args.expected,
                    }),
                );
            }
        }
    }

    let start = Instant::now();
    let mut results = slice_sheets_with_variant(&inputs, &table, &cfg, args.variant.as_deref());
    info!(
        sheets = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sliced"
    );

    if args.strict {
        let rejected = reject_degenerate(&mut results);
        if rejected > 0 {
            error!(rejected, "degenerate detections rejected by --strict");
        }
    }

    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("name", &args.name_template)
        .with_context(|| format!("parse name template '{}'", args.name_template))?;

    if !args.dry_run {
        fs::create_dir_all(&args.out_dir)
            .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    }
    let total_frames: usize = results
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .map(|o| o.frames.len())
        .sum();
    let bar = progress_bar(total_frames as u64, "writing", show_progress);
    for (id, r) in &results {
        match r {
            Ok(out) => {
                for issue in &out.issues {
                    warn!(sheet = %id, %issue, "sheet issue");
                }
                write_frames(out, &reg, args, bar.as_ref())?;
            }
            Err(e) => error!(sheet = %id, error = %e, "sheet failed"),
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }

    let stats = batch_stats(&results);
    info!("{}", stats.summary());
    if let Some(stats_path) = &args.export_stats {
        let value = serde_json::json!({
            "stats": stats,
            "clean": stats.is_clean(),
            "sheets": results.iter().map(|(id, r)| match r {
                Ok(out) => serde_json::json!({
                    "sheet": id,
                    "frames": out.frames.len(),
                    "variant": out.variant,
                    "issues": out.issues,
                }),
                Err(e) => serde_json::json!({"sheet": id, "error": e.to_string()}),
            }).collect::<Vec<_>>(),
        });
        if !args.dry_run {
            fs::write(stats_path, serde_json::to_string_pretty(&value)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        } else {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    if stats.num_failed > 0 {
        anyhow::bail!("{} sheet(s) failed", stats.num_failed);
    }
    Ok(())
}

#[derive(Serialize)]
struct FrameName<'a> {
    /// File stem of the sheet
    stem: &'a str,
    /// Full sheet identity
    sheet: &'a str,
    /// Layout index (gaps where frames were skipped)
    index: usize,
    /// Position among the frames actually written
    seq: usize,
}

fn write_frames(
    out: &SheetOutput,
    reg: &Handlebars<'_>,
    args: &SliceArgs,
    bar: Option<&indicatif::ProgressBar>,
) -> anyhow::Result<()> {
    let stem = Path::new(&out.identity)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&out.identity);
    for (seq, frame) in out.frames.iter().enumerate() {
        let name = reg.render(
            "name",
            &FrameName {
                stem,
                sheet: &out.identity,
                index: frame.index,
                seq,
            },
        )?;
        let path = args.out_dir.join(&name);
        if !args.dry_run {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            frame
                .rgba
                .save(&path)
                .with_context(|| format!("write {}", path.display()))?;
        }
        debug!(?path, index = frame.index, source = %frame.source, "frame");
        if let Some(b) = bar {
            b.set_message(name);
            b.inc(1);
        }
    }
    Ok(())
}

fn run_promote(args: &PromoteArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.report)
        .with_context(|| format!("read {}", args.report.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let report = report::from_json(&value)
        .with_context(|| format!("parse report {}", args.report.display()))?;

    let mut table = match &args.base {
        Some(path) => load_table(path)?,
        None => LayoutTable::default(),
    };
    let promoted = report.promote();
    let skipped = report.sheets.len() - promoted.sheets.len();
    for (id, spec) in promoted.sheets {
        table.insert(id, spec);
    }
    table.validate()?;

    let text = if has_extension(&args.out, "json") {
        serde_json::to_string_pretty(&table)?
    } else {
        serde_yaml::to_string(&table)?
    };
    fs::write(&args.out, text).with_context(|| format!("write {}", args.out.display()))?;
    info!(path = ?args.out, sheets = table.sheets.len(), skipped, "layout table written");
    Ok(())
}

#[derive(Serialize)]
struct Analysis {
    width: u32,
    height: u32,
    content: Option<[u32; 4]>,
    colors: Vec<ColorCount>,
}

fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let rgba = load_image(&args.image)
        .with_context(|| format!("load {}", args.image.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let visible = rgba.pixels().filter(|p| p[3] > 0).count();
    let analysis = Analysis {
        width,
        height,
        content: image_content_bounds(&rgba).map(Into::into),
        colors: dominant_colors(&rgba, args.top),
    };
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&analysis)?),
        _ => {
            println!("{}: {}x{}, {} visible pixels", args.image.display(), width, height, visible);
            if let Some([x1, y1, x2, y2]) = analysis.content {
                println!("content: [{x1}, {y1}, {x2}, {y2}] ({}x{})", x2 - x1, y2 - y1);
            }
            for (i, c) in analysis.colors.iter().enumerate() {
                let [r, g, b, a] = c.rgba;
                let pct = if visible > 0 {
                    c.count as f64 / visible as f64 * 100.0
                } else {
                    0.0
                };
                println!(
                    "{:>3}. #{r:02x}{g:02x}{b:02x}{a:02x} rgba({r}, {g}, {b}, {a}) {:>8} {:>6.2}%",
                    i + 1,
                    c.count,
                    pct
                );
            }
        }
    }
    Ok(())
}

fn resolve_config(d: &DetectorArgs) -> anyhow::Result<SlicerConfig> {
    let mut cfg = SlicerConfig::builder()
        .scale(d.scale)
        .alpha_threshold(d.alpha_threshold)
        .dilation_passes(d.dilation_passes)
        .min_component(d.min_width, d.min_height)
        .refinement_padding(d.refinement_padding)
        .canvas_size(d.canvas_size)
        .build();
    if let Some(path) = &d.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_slicer_config(cfg);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn print_config(cfg: &SlicerConfig, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => println!("{}", serde_yaml::to_string(cfg)?),
        _ => println!("{}", serde_json::to_string_pretty(cfg)?),
    }
    Ok(())
}

fn load_table(path: &Path) -> anyhow::Result<LayoutTable> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let table = if has_extension(path, "json") {
        serde_json::from_str(&text)
            .with_context(|| format!("parse layout table {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("parse layout table {}", path.display()))?
    };
    Ok(table)
}

fn has_extension(p: &Path, ext: &str) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
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
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if ext == "png"
    )
}

/// Sheet identity: the path relative to the input root, `/`-separated. A single input
/// file is identified by its file name.
fn identity_for(root: &Path, p: &Path) -> String {
    let rel = if root.is_file() {
        p.file_name().map(Path::new).unwrap_or(p)
    } else {
        p.strip_prefix(root).unwrap_or(p)
    };
    rel.to_string_lossy().replace('\\', "/")
}

fn progress_bar(len: u64, verb: &str, show: bool) -> Option<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};
    if !show {
        return None;
    }
    let b = ProgressBar::new(len);
    let template = format!("{{spinner:.green}} {verb} {{pos}}/{{len}} [{{elapsed_precise}}] {{wide_msg}}");
    if let Ok(style) = ProgressStyle::with_template(&template) {
        b.set_style(style);
    }
    Some(b)
}

fn load_images_with_progress(
    root: &Path,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<SheetInput>> {
    let bar = progress_bar(paths.len() as u64, "loading", progress);
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(img) => list.push(SheetInput {
                identity: identity_for(root, p),
                image: img,
            }),
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
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
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
        .with_writer(std::io::stderr)
        .try_init();
}

/// Detector settings read from `--config`; present keys override the command line.
#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    scale: Option<u32>,
    alpha_threshold: Option<u8>,
    dilation_passes: Option<u32>,
    min_component_width: Option<u32>,
    min_component_height: Option<u32>,
    refinement_padding: Option<u32>,
    canvas_size: Option<u32>,
}

impl YamlConfig {
    fn into_slicer_config(self, mut cfg: SlicerConfig) -> SlicerConfig {
        if let Some(v) = self.scale {
            cfg.scale = v;
        }
        if let Some(v) = self.alpha_threshold {
            cfg.alpha_threshold = v;
        }
        if let Some(v) = self.dilation_passes {
            cfg.dilation_passes = v;
        }
        if let Some(v) = self.min_component_width {
            cfg.min_component_width = v;
        }
        if let Some(v) = self.min_component_height {
            cfg.min_component_height = v;
        }
        if let Some(v) = self.refinement_padding {
            cfg.refinement_padding = v;
        }
        if let Some(v) = self.canvas_size {
            cfg.canvas_size = v;
        }
        cfg
    }
}
