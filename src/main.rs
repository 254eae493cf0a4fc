// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use shortform::app_config::{self, Config};
use shortform::app_controller::{Controller, RenderOptions};
use shortform::captions::{render_srt, segment_narration, write_srt};
use shortform::file_utils::FileManager;
use shortform::render::{parse_key_path, parse_override, PatchOp, TemplateRender};
use shortform::server::StaticServer;
use shortform::story::{load_narrated, load_stories};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Caption options shared by the narrating commands
#[derive(Args, Debug, Clone)]
struct CaptionArgs {
    /// Maximum caption length in characters
    #[arg(short, long)]
    max_length: Option<usize>,

    /// Narration language (ISO 639-1, e.g. 'ko', 'en')
    #[arg(short = 'L', long)]
    language: Option<String>,

    /// Directory for generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

/// Render service options
#[derive(Args, Debug, Clone)]
struct RenderServiceArgs {
    /// Render API key
    #[arg(long, env = "SHORTFORM_RENDER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Public URL of the static server, used to expose local media
    #[arg(long)]
    media_base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split narration into captions and time them as SRT
    Captions {
        /// Narration text (reads --file when omitted)
        #[arg(value_name = "TEXT", required_unless_present = "file")]
        text: Option<String>,

        /// Read the narration from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Write the SRT here instead of stdout
        #[arg(long)]
        srt: Option<PathBuf>,

        /// Only print the captions, without speech synthesis or timing
        #[arg(long)]
        segments_only: bool,

        #[command(flatten)]
        captions: CaptionArgs,
    },

    /// Narrate a stories file: captions, audio clips and the information JSON
    Narrate {
        /// Stories JSON file
        #[arg(value_name = "STORIES")]
        stories: PathBuf,

        #[command(flatten)]
        captions: CaptionArgs,
    },

    /// Build render sources from an information JSON and render them
    Render {
        /// Information JSON written by `narrate`
        #[arg(value_name = "INFORMATION")]
        information: PathBuf,

        /// Set a value in every render source (path.to.key=value)
        #[arg(long = "set", value_name = "PATH=VALUE")]
        set: Vec<String>,

        /// Remove a key from every render source
        #[arg(long = "unset", value_name = "PATH")]
        unset: Vec<String>,

        /// Write the render sources without submitting them
        #[arg(long)]
        dry_run: bool,

        /// Directory for generated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        service: RenderServiceArgs,
    },

    /// Render a stored template
    Template {
        /// Template id
        #[arg(value_name = "TEMPLATE_ID")]
        template_id: String,

        /// Replace an element value (element_id=value)
        #[arg(long = "modify", value_name = "ID=VALUE")]
        modify: Vec<String>,

        /// JSON object of modifications
        #[arg(long)]
        modifications: Option<PathBuf>,

        /// Directory for generated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        service: RenderServiceArgs,
    },

    /// Narrate a stories file and mux each story locally with ffmpeg
    Local {
        /// Stories JSON file
        #[arg(value_name = "STORIES")]
        stories: PathBuf,

        #[command(flatten)]
        captions: CaptionArgs,
    },

    /// Serve a directory over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Stretch images onto a 9:16 canvas
    Resize {
        /// Image files or directories
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Where resized images are written
        #[arg(short, long, default_value = "resized")]
        output_dir: PathBuf,
    },

    /// Generate shell completions for shortform
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// shortform - narrated short videos from stories
///
/// Splits narration into captions, times them against synthesized speech,
/// and renders vertical videos remotely or locally with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "shortform")]
#[command(version)]
#[command(about = "Narrated vertical short videos from stories")]
#[command(long_about = "shortform turns story JSON files into narrated, captioned 9:16 videos.

EXAMPLES:
    shortform captions \"첫 문장입니다. 두 번째 문장입니다.\"   # Print timed SRT
    shortform captions --segments-only -f story.txt        # Print captions only
    shortform narrate stories.json                         # Captions, audio and information JSON
    shortform render output/20240101_120000_information.json --dry-run
    shortform render info.json --set frame_rate=30         # Override render source values
    shortform template <ID> --modify title=\"Hello\"          # Render a stored template
    shortform local stories.json                           # Mux videos with ffmpeg
    shortform serve --port 8000                            # Expose local media
    shortform resize images/                               # 9:16 images
    shortform completions bash > shortform.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "shortform", &mut std::io::stdout());
        return Ok(());
    }

    // The logger takes its level from the config, so it starts after loading
    let (mut config, created) = load_config(&cli.config_path, cli.log_level.clone())?;
    CustomLogger::init(config.log_level.to_level_filter())?;
    if created {
        warn!("Config file not found at '{}', created a default one.", cli.config_path);
    }

    match cli.command {
        Commands::Captions {
            text,
            file,
            srt,
            segments_only,
            captions,
        } => {
            apply_caption_args(&mut config, &captions);
            let narration = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => FileManager::read_to_string(file)?,
                (None, None) => return Err(anyhow!("Provide narration TEXT or --file")),
            };
            run_captions(config, &narration, srt.as_deref(), segments_only).await
        }
        Commands::Narrate { stories, captions } => {
            apply_caption_args(&mut config, &captions);
            let controller = Controller::with_config(config)?;
            let stories = load_stories(&stories)?;
            let run = controller.new_run();
            controller.narrate(&stories, &run).await?;
            info!("Information written: {:?}", run.information_path());
            Ok(())
        }
        Commands::Render {
            information,
            set,
            unset,
            dry_run,
            output_dir,
            service,
        } => {
            apply_service_args(&mut config, &service);
            if let Some(dir) = output_dir {
                config.output.output_dir = dir;
            }

            let mut overrides = set.iter().map(|raw| parse_override(raw)).collect::<Result<Vec<_>>>()?;
            for path in &unset {
                overrides.push((parse_key_path(path)?, PatchOp::Remove));
            }

            let controller = Controller::with_config(config)?;
            let narrated = load_narrated(&information)?;
            let run = controller.new_run();
            let outputs = controller.render(&narrated, &run, &RenderOptions { overrides, dry_run }).await?;
            for output in outputs {
                info!("Success: {:?}", output);
            }
            Ok(())
        }
        Commands::Template {
            template_id,
            modify,
            modifications,
            output_dir,
            service,
        } => {
            apply_service_args(&mut config, &service);
            if let Some(dir) = output_dir {
                config.output.output_dir = dir;
            }

            let template = TemplateRender {
                template_id,
                modifications: collect_modifications(modifications.as_deref(), &modify)?,
            };

            let controller = Controller::with_config(config)?;
            let run = controller.new_run();
            for output in controller.render_template(&template, &run).await? {
                info!("Success: {:?}", output);
            }
            Ok(())
        }
        Commands::Local { stories, captions } => {
            apply_caption_args(&mut config, &captions);
            let controller = Controller::with_config(config)?;
            let stories = load_stories(&stories)?;
            let run = controller.new_run();
            for video in controller.local(&stories, &run).await? {
                info!("Success: {:?}", video);
            }
            Ok(())
        }
        Commands::Serve { port, root } => {
            let port = port.unwrap_or(config.server.port);
            let root = root.unwrap_or(config.server.root);
            let server = StaticServer::bind(SocketAddr::from(([0, 0, 0, 0], port)), root).await?;
            info!("Access your files at http://localhost:{}", server.local_addr().port());
            server.serve().await
        }
        Commands::Resize { inputs, output_dir } => {
            let controller = Controller::with_config(config)?;
            for output in controller.resize(&inputs, &output_dir).await? {
                info!("Success: {:?}", output);
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the configuration file, creating it with defaults when missing.
///
/// Also returns whether the file had to be created.
fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<(Config, bool)> {
    let created = !Path::new(config_path).exists();
    let mut config = if !created {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(level) = log_level {
        config.log_level = level.into();
    }

    Ok((config, created))
}

fn apply_caption_args(config: &mut Config, args: &CaptionArgs) {
    if let Some(max_length) = args.max_length {
        config.captions.max_length = max_length;
    }
    if let Some(language) = &args.language {
        config.captions.language = language.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output.output_dir = dir.clone();
    }
}

fn apply_service_args(config: &mut Config, args: &RenderServiceArgs) {
    if let Some(api_key) = &args.api_key {
        config.render.api_key = api_key.clone();
    }
    if let Some(base) = &args.media_base_url {
        config.render.media_base_url = Some(base.clone());
    }
}

async fn run_captions(config: Config, narration: &str, srt: Option<&Path>, segments_only: bool) -> Result<()> {
    if segments_only {
        for caption in segment_narration(narration, config.captions.max_length)? {
            println!("{}", caption);
        }
        return Ok(());
    }

    let controller = Controller::with_config(config)?;
    let run = controller.new_run();
    let oracle = controller.narration_oracle(&run)?;
    let timed = controller.caption(narration, &oracle).await?;

    match srt {
        Some(path) => {
            write_srt(path, &timed)?;
            info!("Success: {:?}", path);
        }
        None => print!("{}", render_srt(&timed)),
    }
    Ok(())
}

/// Modifications from an optional JSON file, then `id=value` flags on top
fn collect_modifications(file: Option<&Path>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut modifications = match file {
        Some(path) => {
            let content = FileManager::read_to_string(path)?;
            serde_json::from_str::<Map<String, Value>>(&content)
                .with_context(|| format!("Modifications file must hold a JSON object: {:?}", path))?
        }
        None => Map::new(),
    };

    for pair in pairs {
        let (id, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Modification '{}' must look like element_id=value", pair))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        modifications.insert(id.to_string(), value);
    }

    Ok(modifications)
}
