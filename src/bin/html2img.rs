//! CLI binary for html2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CaptureConfig`, runs one conversion per input on a single session and
//! exports the results.

use anyhow::{Context, Result};
use clap::Parser;
use html2img::{
    BasicRenderer, CaptureConfig, CaptureError, CaptureResult, ConversionSession, DevicePresetId,
    DirectorySink, MarkupFile, OutputFormat, RawInput, ResultRegistry, SessionObserver,
    SessionState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Session observer using indicatif ─────────────────────────────────────────

/// Spinner that follows the session through its states and prints one line
/// per finished conversion.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn start(&self, label: &str) {
        self.bar.reset_elapsed();
        self.bar.set_prefix(truncate(label, 48));
        self.bar.set_message("queued");
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Print above the spinner without tearing its line.
    fn println(&self, line: String) {
        self.bar.println(line);
    }
}

impl SessionObserver for SpinnerObserver {
    fn on_state_change(&self, _from: SessionState, to: SessionState) {
        let msg = match to {
            SessionState::Validating => "validating input…",
            SessionState::Acquiring => "rendering…",
            SessionState::FallingBack => "drawing preview…",
            SessionState::Encoding => "encoding…",
            SessionState::Idle | SessionState::Completed | SessionState::Failed => return,
        };
        self.bar.set_message(msg);
    }

    fn on_fallback(&self, source: &str) {
        self.bar.println(format!(
            "  {} {} refused direct capture; using a synthesized preview",
            yellow("⚠"),
            source
        ));
    }

    fn on_complete(&self, result: &CaptureResult) {
        self.bar.println(summary_line(result));
    }

    fn on_failure(&self, error: &CaptureError) {
        self.bar
            .println(format!("  {} {}", red("✗"), red(&error.user_message())));
    }
}

/// Where a status line goes while inputs are being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineTarget {
    Spinner,
    Stderr,
    Nowhere,
}

/// A ticking spinner owns the terminal line, so status goes through it.
fn line_target(spinner_active: bool, quiet: bool) -> LineTarget {
    if spinner_active {
        LineTarget::Spinner
    } else if quiet {
        LineTarget::Nowhere
    } else {
        LineTarget::Stderr
    }
}

fn summary_line(result: &CaptureResult) -> String {
    let tag = if result.is_synthesized() {
        yellow(" preview")
    } else {
        String::new()
    };
    format!(
        "  {} {:<40}  {:>9}x{:<5}  {:>10}  {}{}",
        green("✓"),
        truncate(&result.source_description, 40),
        result.dimensions.width,
        result.dimensions.height,
        dim(&result.size_label()),
        result.format,
        tag
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Capture a webpage (scheme defaults to https://)
  html2img --url example.com

  # Inline markup as JPEG at 80% quality
  html2img --html '<h1>Hello</h1>' --format jpeg --quality 80

  # Several inputs, mobile viewport, full page height
  html2img --url example.com --file page.html --device mobile --full-page -o shots/

  # Custom viewport
  html2img --url example.com --width 1280 --height 720

  # Metadata as JSON
  html2img --url example.com --json > results.json

DEVICE PRESETS:
  desktop   1920 × 1080 (default)
  laptop    1366 × 768
  tablet     768 × 1024
  mobile     375 × 667

NOTES:
  Pages that refuse to be embedded (X-Frame-Options / CSP frame-ancestors)
  are exported as a synthesized preview; the footer of the image says so.
  Address captures time out after --timeout milliseconds (default 15000).

ENVIRONMENT VARIABLES:
  Every flag has an HTML2IMG_* override, e.g. HTML2IMG_FORMAT=jpeg.
  RUST_LOG overrides the log filter.
"#;

/// Capture webpages and HTML as PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "html2img",
    version,
    about = "Capture webpages and HTML as PNG or JPEG images",
    long_about = "Capture webpages (by address), inline HTML and HTML files as PNG or JPEG \
images at a chosen device viewport. Results are written to the output directory one by one \
with a short pause between files.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Webpage address to capture (repeatable).
    #[arg(short, long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Inline HTML to capture (repeatable).
    #[arg(long = "html", value_name = "MARKUP")]
    html: Vec<String>,

    /// HTML file to capture (repeatable).
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Output image format.
    #[arg(short, long, env = "HTML2IMG_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// JPEG quality (10–100); ignored for PNG.
    #[arg(long, env = "HTML2IMG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(10..=100))]
    quality: u8,

    /// Device preset for the viewport.
    #[arg(short, long, env = "HTML2IMG_DEVICE", value_enum, default_value = "desktop")]
    device: DeviceArg,

    /// Custom viewport width in pixels (100–4000); overrides the preset.
    #[arg(long, env = "HTML2IMG_WIDTH")]
    width: Option<u32>,

    /// Custom viewport height in pixels (100–4000); overrides the preset.
    #[arg(long, env = "HTML2IMG_HEIGHT")]
    height: Option<u32>,

    /// Capture the full content height instead of one viewport.
    #[arg(long, env = "HTML2IMG_FULL_PAGE")]
    full_page: bool,

    /// Milliseconds to let the page settle before capturing (500–5000).
    #[arg(long, env = "HTML2IMG_SETTLE_DELAY", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(500..=5000))]
    settle_delay: u64,

    /// Hard deadline for address captures in milliseconds.
    #[arg(long, env = "HTML2IMG_TIMEOUT", default_value_t = 15_000)]
    timeout: u64,

    /// Directory to write images into.
    #[arg(short, long, env = "HTML2IMG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print result metadata as JSON on stdout.
    #[arg(long, env = "HTML2IMG_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "HTML2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DeviceArg {
    Desktop,
    Laptop,
    Tablet,
    Mobile,
}

impl From<DeviceArg> for DevicePresetId {
    fn from(v: DeviceArg) -> Self {
        match v {
            DeviceArg::Desktop => DevicePresetId::Desktop,
            DeviceArg::Laptop => DevicePresetId::Laptop,
            DeviceArg::Tablet => DevicePresetId::Tablet,
            DeviceArg::Mobile => DevicePresetId::Mobile,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless --verbose.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let inputs = collect_inputs(&cli);
    if inputs.is_empty() {
        anyhow::bail!("Nothing to capture: pass --url, --html or --file");
    }

    let spinner = show_progress.then(SpinnerObserver::new);
    let config = build_config(&cli, spinner.clone())?;

    // ── Run conversions ──────────────────────────────────────────────────
    let mut session = ConversionSession::new(Arc::new(BasicRenderer::new()), config);
    let mut registry = ResultRegistry::new();
    let mut failed = 0usize;

    for (label, raw) in inputs {
        if let Some(ref s) = spinner {
            s.start(&label);
        }
        if let Err(e) = session.select_input(raw) {
            failed += 1;
            let line = format!("  {} {}: {}", red("✗"), label, red(&e.to_string()));
            match line_target(spinner.is_some(), cli.quiet) {
                LineTarget::Spinner => {
                    if let Some(ref s) = spinner {
                        s.println(line);
                    }
                }
                LineTarget::Stderr => eprintln!("{line}"),
                LineTarget::Nowhere => {}
            }
            continue;
        }
        match session.convert(&mut registry).await {
            Ok(id) => {
                if spinner.is_none() && !cli.quiet && !cli.json {
                    if let Some(r) = registry.get(id) {
                        eprintln!("{}", summary_line(r));
                    }
                }
            }
            Err(e) => {
                failed += 1;
                if spinner.is_none() && !cli.quiet {
                    eprintln!("  {} {}: {}", red("✗"), label, red(&e.user_message()));
                }
            }
        }
    }
    if let Some(ref s) = spinner {
        s.finish();
    }

    // ── Export ───────────────────────────────────────────────────────────
    let written = if registry.is_empty() {
        Vec::new()
    } else {
        let sink = DirectorySink::new(&cli.output_dir).with_context(|| {
            format!("Failed to create output directory {}", cli.output_dir.display())
        })?;
        registry.export_all(&sink).await;
        sink.finish().await.context("Failed to write images")?
    };

    if cli.json {
        let results: Vec<&CaptureResult> = registry.iter().collect();
        let json = serde_json::to_string_pretty(&results).context("Failed to serialise results")?;
        println!("{json}");
    }

    if !cli.quiet && !cli.json {
        for path in &written {
            eprintln!("  {} {}", dim("→"), path.display());
        }
        eprintln!(
            "{} {}/{} captured  {}",
            if failed == 0 { green("✔") } else { yellow("⚠") },
            bold(&registry.len().to_string()),
            registry.len() + failed,
            dim(&html2img::format_file_size(registry.total_bytes())),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} conversion(s) failed");
    }
    Ok(())
}

/// Inputs in flag order: addresses, then markup, then files.
fn collect_inputs(cli: &Cli) -> Vec<(String, RawInput)> {
    let mut inputs = Vec::new();
    for url in &cli.urls {
        inputs.push((url.clone(), RawInput::Address(url.clone())));
    }
    for (i, html) in cli.html.iter().enumerate() {
        inputs.push((format!("html #{}", i + 1), RawInput::Markup(html.clone())));
    }
    for path in &cli.files {
        inputs.push((
            path.display().to_string(),
            RawInput::File(MarkupFile::from_path(path)),
        ));
    }
    inputs
}

/// Map CLI args to `CaptureConfig`.
fn build_config(cli: &Cli, spinner: Option<Arc<SpinnerObserver>>) -> Result<CaptureConfig> {
    let mut builder = CaptureConfig::builder()
        .device(cli.device.into())
        .full_extent(cli.full_page)
        .format(cli.format.into())
        .quality(cli.quality)
        .settle_delay_ms(cli.settle_delay)
        .address_timeout_ms(cli.timeout);

    if cli.width.is_some() || cli.height.is_some() {
        let preset = DevicePresetId::from(cli.device).preset();
        builder = builder.dimensions(
            cli.width.unwrap_or(preset.width),
            cli.height.unwrap_or(preset.height),
        );
    }

    if let Some(s) = spinner {
        builder = builder.observer(s as Arc<dyn SessionObserver>);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_print_through_active_spinner() {
        assert_eq!(line_target(true, false), LineTarget::Spinner);
        assert_eq!(line_target(false, false), LineTarget::Stderr);
        assert_eq!(line_target(false, true), LineTarget::Nowhere);
    }

    #[test]
    fn truncate_keeps_short_labels() {
        assert_eq!(truncate("example.com", 20), "example.com");
        assert_eq!(truncate("abcdefgh", 5), "abcd\u{2026}");
    }
}
