use clap::{Parser, Subcommand};
use media_prep::config;
use media_prep::convert::{self, ConvertEvent, ConvertOptions};
use media_prep::imaging::RustBackend;
use media_prep::video::{self, EncoderRequirement, Ffmpeg, VideoJob, WebmSettings};
use media_prep::{icons, manifest, output, pipeline, projects};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

#[derive(Parser)]
#[command(name = "media-prep")]
#[command(about = "Batch media preparation for the site: photos, projects, video, icons")]
#[command(long_about = "\
Batch media preparation for the site: photos, projects, video, icons

Gallery layout:

  favourites/            # Source photos (flat)
  favourites_webp/       # <stem>.webp + <stem>-thumb.webp
  public/photos.json     # Manifest: [{url, date, thumbnail}], newest first

Every command works without arguments; defaults come from media-prep.toml
in the working directory (or --config). Flags override the file.

Run 'media-prep gen-config' to generate a documented media-prep.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the gallery manifest from the photo directory
    Manifest {
        /// Photo directory
        #[arg(long)]
        source: Option<PathBuf>,
        /// Manifest file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert photos to WebP (and thumbnails) in parallel
    Convert(ConvertArgs),
    /// Run the full gallery pipeline: manifest → convert
    Build,
    /// Convert project PNGs to WebP in place
    Projects {
        /// Projects root
        #[arg(long)]
        root: Option<PathBuf>,
        /// Keep PNG files after converting
        #[arg(long)]
        keep_source: bool,
    },
    /// Transcode every video.mp4 to a streaming-friendly VP9 WebM
    Webm {
        #[arg(long)]
        root: Option<PathBuf>,
        /// List files but don't encode
        #[arg(long)]
        dry_run: bool,
        /// Overwrite existing outputs
        #[arg(long)]
        overwrite: bool,
        /// VP9 CRF quality (lower = better quality, 15-40)
        #[arg(long)]
        crf: Option<u32>,
        /// Encoder threads (0 = let the encoder decide)
        #[arg(long)]
        threads: Option<u32>,
    },
    /// Re-encode every *.mp4 in place with HEVC NVENC at half resolution
    Nvenc {
        #[arg(long)]
        root: Option<PathBuf>,
        /// List files but don't encode
        #[arg(long)]
        dry_run: bool,
    },
    /// Download technology icons
    Icons {
        /// Target directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print a stock media-prep.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Photo directory
    #[arg(long)]
    source: Option<PathBuf>,
    /// Output directory
    #[arg(long)]
    output: Option<PathBuf>,
    /// WebP quality (0-100)
    #[arg(long)]
    quality: Option<u32>,
    /// Worker cap (clamped to CPU cores)
    #[arg(long)]
    threads: Option<usize>,
    /// Skip <stem>-thumb.webp
    #[arg(long)]
    no_thumbnails: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config)?;
    let backend = RustBackend::new();

    match cli.command {
        Command::Manifest {
            source,
            output: manifest_path,
        } => {
            if let Some(source) = source {
                config.photos.source = source;
            }
            if let Some(path) = manifest_path {
                config.photos.manifest = path;
            }
            let entries = manifest::build_manifest(&config.photos.source)?;
            manifest::write_manifest(&config.photos.manifest, &entries)?;
            output::print_manifest_written(&config.photos.manifest, entries.len());
        }
        Command::Convert(args) => {
            if let Some(source) = args.source {
                config.photos.source = source;
            }
            if let Some(dir) = args.output {
                config.photos.output = dir;
            }
            if let Some(quality) = args.quality {
                config.webp.quality = quality;
            }
            if let Some(threads) = args.threads {
                config.processing.max_threads = threads;
            }
            if args.no_thumbnails {
                config.thumbnails.enabled = false;
            }
            config.validate()?;

            let options = ConvertOptions::from_config(&config);
            let (tx, printer) = spawn_printer(options.extensions.clone());
            let summary = convert::convert_directory(
                &backend,
                &config.photos.source,
                &config.photos.output,
                &options,
                Some(tx),
            );
            join_printer(printer);
            output::print_batch_summary(&summary?);
            println!("Done.");
        }
        Command::Build => {
            let options = ConvertOptions::from_config(&config);
            let (tx, printer) = spawn_printer(options.extensions.clone());
            let report = pipeline::run_with_options(&config, &options, &backend, Some(tx));
            join_printer(printer);
            output::print_batch_summary(&report?.batch);
            output::print_done();
        }
        Command::Projects { root, keep_source } => {
            if let Some(root) = root {
                config.projects.root = root;
            }
            let mut options = projects::ProjectsOptions::from_config(&config.projects);
            if keep_source {
                options.delete_source = false;
            }
            let report = projects::convert_projects(&backend, &config.projects.root, &options)?;
            output::print_projects_report(&report);
        }
        Command::Webm {
            root,
            dry_run,
            overwrite,
            crf,
            threads,
        } => {
            let root = root.unwrap_or(config.video.root);
            let settings = WebmSettings {
                crf: crf.unwrap_or(config.video.crf),
                threads: threads.unwrap_or(config.video.threads),
                overwrite,
            };
            let jobs = video::plan_webm(&root)?;
            run_video_jobs(
                EncoderRequirement::Vp9,
                &jobs,
                &root,
                "video.mp4",
                dry_run,
                |ffmpeg, job| video::encode_webm(ffmpeg, job, &settings),
            )?;
        }
        Command::Nvenc { root, dry_run } => {
            let root = root.unwrap_or(config.video.root);
            let jobs = video::plan_nvenc(&root)?;
            run_video_jobs(
                EncoderRequirement::Nvenc,
                &jobs,
                &root,
                "*.mp4",
                dry_run,
                video::encode_nvenc,
            )?;
        }
        Command::Icons { dir } => {
            let dir = dir.unwrap_or(config.icons.dir);
            let results = icons::download_icons(
                &icons::HttpFetcher::new(),
                &dir,
                &config.icons.urls,
                &config.icons.user_agent,
            )?;
            output::print_icon_results(&results);
        }
        // Handled before config loading
        Command::GenConfig => {}
    }

    Ok(())
}

/// Spawn the thread that renders conversion events as they arrive.
fn spawn_printer(extensions: Vec<String>) -> (Sender<ConvertEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_convert_event(&event, &extensions) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) {
    if printer.join().is_err() {
        log::warn!("progress printer thread panicked");
    }
}

/// Probe ffmpeg, list the jobs, and run them unless this is a dry run.
///
/// A failed probe aborts the command unless `dry_run` is set.
fn run_video_jobs(
    requirement: EncoderRequirement,
    jobs: &[VideoJob],
    root: &std::path::Path,
    what: &str,
    dry_run: bool,
    encode: impl Fn(&Ffmpeg, &VideoJob) -> Result<video::EncodeOutcome, video::EncodeError>,
) -> Result<(), video::VideoError> {
    let ffmpeg = match Ffmpeg::probe(requirement) {
        Ok(ffmpeg) => Some(ffmpeg),
        Err(e) => {
            output::print_probe_failure(&e, dry_run);
            if !dry_run {
                return Err(e.into());
            }
            None
        }
    };

    output::print_video_plan(jobs, root, what);
    for job in jobs {
        println!("{}", output::format_video_job(job));
        if dry_run {
            continue;
        }
        if let Some(ffmpeg) = &ffmpeg {
            println!("{}", output::format_encode_result(&encode(ffmpeg, job)));
        }
    }
    Ok(())
}
