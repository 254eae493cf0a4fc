use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::captions::{place_captions, write_srt, CaptionTimer, DurationOracle, Segmenter, SrtTimestamp, TimedCaption};
use crate::ffmpeg::{self, ConcatEntry};
use crate::file_utils::{media_url, FileManager, RunContext, IMAGE_EXTENSIONS};
use crate::render::{
    apply_patch, build_render_source, random_title_color, PatchOp, RenderClient, RenderJob, TemplateRender,
};
use crate::speech::{DurationProbe, FfprobeProbe, GoogleTranslateTts, NarrationOracle, SpeechSynthesizer};
use crate::story::{save_narrated, Description, NarratedImage, NarratedStory, Story};

// @module: Application controller for the narration and rendering workflows

/// Options for a render run
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Edits applied to every render source before submission
    pub overrides: Vec<(Vec<String>, PatchOp)>,
    /// Write the render sources without contacting the service
    pub dry_run: bool,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Shared progress display
    progress: MultiProgress,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self {
            config,
            progress: MultiProgress::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a new run, fixing the file name prefix
    pub fn new_run(&self) -> RunContext {
        RunContext::new(&self.config.output)
    }

    /// Caption timer configured for the narration language
    pub fn caption_timer(&self) -> CaptionTimer {
        CaptionTimer::new(self.config.captions.language.clone())
            .concurrency(self.config.captions.concurrency)
            .timeout(self.config.oracle_timeout())
    }

    /// Narration oracle backed by the configured TTS service and ffprobe
    pub fn narration_oracle(&self, run: &RunContext) -> Result<NarrationOracle<GoogleTranslateTts, FfprobeProbe>> {
        let synthesizer = GoogleTranslateTts::new(&self.config.speech)?;
        let probe = FfprobeProbe::new(
            self.config.local.ffprobe_path.clone(),
            Duration::from_secs(self.config.local.timeout_secs),
        );
        Ok(NarrationOracle::new(synthesizer, probe, &run.audio_dir))
    }

    /// Segment one narration block and time its captions
    pub async fn caption<O>(&self, narration: &str, oracle: &O) -> Result<Vec<TimedCaption>>
    where
        O: DurationOracle + ?Sized,
    {
        let segmenter = Segmenter::new(self.config.captions.max_length)?;
        let captions = segmenter.segment(narration);
        Ok(self.caption_timer().time(&captions, oracle).await?)
    }

    /// Narrate stories with the configured TTS service
    pub async fn narrate(&self, stories: &[Story], run: &RunContext) -> Result<Vec<NarratedStory>> {
        let oracle = self.narration_oracle(run)?;
        self.narrate_with(stories, &oracle, run).await
    }

    /// Narrate every section of every story.
    ///
    /// Writes one SRT per image and the information JSON describing the
    /// captions, their audio clips and durations.
    pub async fn narrate_with<S, P>(
        &self,
        stories: &[Story],
        oracle: &NarrationOracle<S, P>,
        run: &RunContext,
    ) -> Result<Vec<NarratedStory>>
    where
        S: SpeechSynthesizer,
        P: DurationProbe,
    {
        let start_time = Instant::now();
        FileManager::ensure_dir(&run.output_dir)?;

        let total_scenes: usize = stories.iter().map(|s| s.scenes().count()).sum();
        let progress_bar = self.progress_bar(total_scenes as u64, "images");
        progress_bar.set_message("Narrating");

        let language = self.config.captions.language.as_str();
        let mut narrated = Vec::with_capacity(stories.len());

        for (i, story) in stories.iter().enumerate() {
            let mut images = Vec::new();

            for (j, (text, source)) in story.scenes().enumerate() {
                progress_bar.set_message(format!("{} #{}", story.title, j));

                let timed = self
                    .caption(text, oracle)
                    .await
                    .with_context(|| format!("Failed to narrate story {} ('{}') image {}", i, story.title, j))?;
                write_srt(run.srt_path(i, j), &timed)?;

                let descriptions = timed
                    .iter()
                    .map(|caption| {
                        let clip = oracle
                            .clip_for(&caption.text, language)
                            .ok_or_else(|| anyhow!("No narration clip for caption '{}'", caption.text))?;
                        Ok(Description {
                            script: caption.text.clone(),
                            audio: clip.path.to_string_lossy().into_owned(),
                            duration: caption.duration_secs,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                debug!("Story {} image {}: {} caption(s)", i, j, descriptions.len());
                images.push(NarratedImage::new(source, descriptions));
                progress_bar.inc(1);
            }

            if images.is_empty() {
                warn!("Story '{}' has no section with an image", story.title);
            }
            narrated.push(NarratedStory {
                title: story.title.clone(),
                images,
            });
        }

        progress_bar.finish_and_clear();

        let information = run.information_path();
        save_narrated(&information, &narrated)?;
        info!(
            "Narrated {} stor{} in {}: {:?}",
            narrated.len(),
            if narrated.len() == 1 { "y" } else { "ies" },
            Self::format_duration(start_time.elapsed()),
            information
        );

        Ok(narrated)
    }

    /// Build, save and (unless dry-run) render one scene per story.
    ///
    /// Returns the render source files in dry-run mode, the downloaded
    /// videos otherwise.
    pub async fn render(&self, narrated: &[NarratedStory], run: &RunContext, options: &RenderOptions) -> Result<Vec<PathBuf>> {
        let client = if options.dry_run {
            None
        } else {
            Some(RenderClient::new(&self.config.render)?)
        };

        let mut outputs = Vec::new();
        for (i, story) in narrated.iter().enumerate() {
            let source = self.render_source(story, &options.overrides)?;

            let source_path = run.render_source_path(i);
            let json = serde_json::to_string_pretty(&source).context("Failed to serialize render source")?;
            FileManager::write_to_file(&source_path, &json)?;
            info!("Render source written: {:?}", source_path);

            let Some(client) = &client else {
                outputs.push(source_path);
                continue;
            };

            for job in client.submit_source(&source).await? {
                outputs.extend(self.collect(client, &job, &format!("category_{}", i), false, run).await?);
            }
        }

        Ok(outputs)
    }

    /// Render source for one story, with media paths mapped to URLs and
    /// overrides applied
    pub fn render_source(&self, story: &NarratedStory, overrides: &[(Vec<String>, PatchOp)]) -> Result<serde_json::Value> {
        let images = self.with_media_urls(&story.images)?;
        let mut source = build_render_source(&story.title, &images, &self.config.render, random_title_color());

        for (key_path, op) in overrides {
            let keys: Vec<&str> = key_path.iter().map(String::as_str).collect();
            apply_patch(&mut source, &keys, op.clone())
                .with_context(|| format!("Failed to apply override at '{}'", key_path.join(".")))?;
        }

        Ok(source)
    }

    /// Render a stored template and download every output, snapshots included
    pub async fn render_template(&self, template: &TemplateRender, run: &RunContext) -> Result<Vec<PathBuf>> {
        let client = RenderClient::new(&self.config.render)?;

        let mut outputs = Vec::new();
        for (k, job) in client.submit_template(template).await?.iter().enumerate() {
            outputs.extend(self.collect(&client, job, &format!("template_{}", k), true, run).await?);
        }
        Ok(outputs)
    }

    async fn collect(
        &self,
        client: &RenderClient,
        job: &RenderJob,
        label: &str,
        with_snapshot: bool,
        run: &RunContext,
    ) -> Result<Vec<PathBuf>> {
        let job = client.wait_for(&job.id).await?;

        let mut files = Vec::new();
        let url = job
            .url
            .as_deref()
            .ok_or_else(|| crate::errors::RenderError::MissingOutput(job.id.clone()))?;
        let dest = run.download_path(label, url);
        client.download(url, &dest).await?;
        files.push(dest);

        if with_snapshot {
            if let Some(snapshot) = job.snapshot_url.as_deref() {
                let dest = run.download_path(&format!("{}_snapshot", label), snapshot);
                client.download(snapshot, &dest).await?;
                files.push(dest);
            }
        }

        Ok(files)
    }

    fn with_media_urls(&self, images: &[NarratedImage]) -> Result<Vec<NarratedImage>> {
        let base = self.config.render.media_base_url.as_deref();
        let to_url = |raw: &str| -> Result<String> {
            if is_remote(raw) {
                return Ok(raw.to_string());
            }
            let path = Path::new(raw);
            let relative = path.strip_prefix(&self.config.server.root).unwrap_or(path);
            media_url(base, relative)
        };

        images
            .iter()
            .map(|image| {
                let descriptions = image
                    .descriptions
                    .iter()
                    .map(|d| {
                        Ok(Description {
                            audio: to_url(&d.audio)?,
                            ..d.clone()
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(NarratedImage {
                    source: to_url(&image.source)?,
                    descriptions,
                    total_duration: image.total_duration,
                })
            })
            .collect()
    }

    /// Narrate stories and mux each one locally with ffmpeg
    pub async fn local(&self, stories: &[Story], run: &RunContext) -> Result<Vec<PathBuf>> {
        let narrated = self.narrate(stories, run).await?;
        self.local_from(&narrated, run).await
    }

    /// Mux already narrated stories: images shown for their narration,
    /// audio clips back to back, captions re-timed across the whole story.
    pub async fn local_from(&self, narrated: &[NarratedStory], run: &RunContext) -> Result<Vec<PathBuf>> {
        let progress_bar = self.progress_bar(narrated.len() as u64, "videos");
        progress_bar.set_message("Muxing");

        let mut videos = Vec::new();
        for (i, story) in narrated.iter().enumerate() {
            if story.images.is_empty() {
                warn!("Skipping story '{}': nothing to show", story.title);
                progress_bar.inc(1);
                continue;
            }

            let files = self.write_local_inputs(i, story, run)?;
            let video = run.video_path(i);
            ffmpeg::create_video(&self.config.local, &files.images, &files.audio, &files.subtitles, &video)
                .await
                .with_context(|| format!("Failed to create video for '{}'", story.title))?;

            videos.push(video);
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(videos)
    }

    /// Write the concat lists and combined SRT ffmpeg needs for one story
    pub fn write_local_inputs(&self, index: usize, story: &NarratedStory, run: &RunContext) -> Result<LocalInputs> {
        let descriptions = || story.images.iter().flat_map(|image| image.descriptions.iter());

        let image_entries = story
            .images
            .iter()
            .map(|image| Ok(ConcatEntry::still(local_path(&image.source)?, image.total_duration)))
            .collect::<Result<Vec<_>>>()?;
        let audio_entries = descriptions()
            .map(|d| Ok(ConcatEntry::file(local_path(&d.audio)?)))
            .collect::<Result<Vec<_>>>()?;

        let inputs = LocalInputs {
            images: run.concat_list_path(index, "images"),
            audio: run.concat_list_path(index, "audio"),
            subtitles: run.story_srt_path(index),
        };

        ffmpeg::write_concat_list(&inputs.images, &image_entries)?;
        ffmpeg::write_concat_list(&inputs.audio, &audio_entries)?;

        let captions = place_captions(descriptions().map(|d| (d.script.clone(), d.duration)), SrtTimestamp::ZERO)?;
        write_srt(&inputs.subtitles, &captions)?;

        Ok(inputs)
    }

    /// Stretch images onto a 9:16 canvas.
    ///
    /// Directories are searched for images; results are written to
    /// `output_dir` as `<stem>_9x16.<ext>`.
    pub async fn resize(&self, inputs: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        for input in inputs {
            if FileManager::dir_exists(input) {
                images.extend(FileManager::find_files(input, &IMAGE_EXTENSIONS)?);
            } else if FileManager::file_exists(input) {
                images.push(input.clone());
            } else {
                return Err(anyhow!("Input does not exist: {:?}", input));
            }
        }

        if images.is_empty() {
            return Err(anyhow!("No images found in {:?}", inputs));
        }
        FileManager::ensure_dir(output_dir)?;

        let progress_bar = self.progress_bar(images.len() as u64, "images");
        progress_bar.set_message("Resizing");

        let mut outputs = Vec::with_capacity(images.len());
        for image in &images {
            let output = output_dir.join(portrait_file_name(image));
            ffmpeg::resize_to_portrait(&self.config.local, image, &output).await?;
            outputs.push(output);
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(outputs)
    }

    fn progress_bar(&self, len: u64, unit: &str) -> ProgressBar {
        let progress_bar = self.progress.add(ProgressBar::new(len));
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Format a duration as a human readable string
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Files written for a local mux
#[derive(Debug, Clone, PartialEq)]
pub struct LocalInputs {
    pub images: PathBuf,
    pub audio: PathBuf,
    pub subtitles: PathBuf,
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// Concat lists resolve relative entries against the list's own directory
fn local_path(source: &str) -> Result<PathBuf> {
    if is_remote(source) {
        return Err(anyhow!("Local rendering needs local files, got URL: {}", source));
    }
    std::path::absolute(source).with_context(|| format!("Failed to resolve path: {}", source))
}

/// Output file name for a resized image
pub fn portrait_file_name(image: &Path) -> String {
    let stem = image.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    match image.extension() {
        Some(ext) => format!("{}_9x16.{}", stem, ext.to_string_lossy()),
        None => format!("{}_9x16", stem),
    }
}
