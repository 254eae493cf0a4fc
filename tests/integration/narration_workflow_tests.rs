/*!
 * End-to-end narration workflow tests: stories in, SRT files, information
 * JSON, render sources and local mux inputs out. Speech is mocked.
 */

use anyhow::Result;
use std::path::Path;

use shortform::app_config::Config;
use shortform::app_controller::{Controller, RenderOptions};
use shortform::file_utils::RunContext;
use shortform::render::PatchOp;
use shortform::speech::NarrationOracle;
use shortform::story::{load_narrated, NarratedStory};

use crate::common;
use crate::common::mock_providers::{MockProbe, MockSynthesizer, SECS_PER_CHAR};

fn test_controller(dir: &Path) -> Result<Controller> {
    common::init_logging();
    let mut config = Config::default();
    config.output.output_dir = dir.join("output");
    config.output.audio_dir = dir.join("audio");
    Controller::with_config(config)
}

async fn narrate_samples(controller: &Controller, run: &RunContext) -> Result<(Vec<NarratedStory>, MockSynthesizer)> {
    let synthesizer = MockSynthesizer::new();
    let oracle = NarrationOracle::new(synthesizer.clone(), MockProbe, &run.audio_dir);
    let narrated = controller.narrate_with(&common::sample_stories(), &oracle, run).await?;
    Ok((narrated, synthesizer))
}

fn sample_run(controller: &Controller) -> RunContext {
    let output = &controller.config().output;
    RunContext::with_prefix("20250101_093000", &output.output_dir, &output.audio_dir)
}

/// Test that narration produces captions, clips and durations per image
#[tokio::test]
async fn test_narrateWith_withSampleStories_shouldDescribeEveryImage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);

    let (narrated, synthesizer) = narrate_samples(&controller, &run).await?;

    assert_eq!(narrated.len(), 2);
    assert_eq!(narrated[0].images.len(), 2);
    // The second section of the second story has no image
    assert_eq!(narrated[1].images.len(), 1);

    let first = &narrated[0].images[0];
    assert_eq!(first.source, "img/a.png");
    let scripts: Vec<&str> = first.descriptions.iter().map(|d| d.script.as_str()).collect();
    assert_eq!(scripts, vec!["Hello there, friend.", "It is a sunny day."]);
    assert!((first.descriptions[0].duration - 20.0 * SECS_PER_CHAR).abs() < 1e-9);
    assert!((first.total_duration - 38.0 * SECS_PER_CHAR).abs() < 1e-9);
    assert!(first.descriptions.iter().all(|d| Path::new(&d.audio).is_file()));

    assert_eq!(synthesizer.requests(), vec![
        "Hello there, friend.",
        "It is a sunny day.",
        "Bye.",
        "One more.",
    ]);
    Ok(())
}

/// Test that every image gets its own SRT file
#[tokio::test]
async fn test_narrateWith_shouldWriteSrtPerImage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);

    narrate_samples(&controller, &run).await?;

    let srt = std::fs::read_to_string(run.srt_path(0, 0))?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello there, friend.\n\n2\n"));
    assert!(srt.contains("It is a sunny day."));

    let bye = std::fs::read_to_string(run.srt_path(0, 1))?;
    assert_eq!(bye, "1\n00:00:00,000 --> 00:00:00,400\nBye.\n\n");

    assert!(run.srt_path(1, 0).is_file());
    assert!(!run.srt_path(1, 1).exists());
    Ok(())
}

/// Test that the information file round-trips to the returned stories
#[tokio::test]
async fn test_narrateWith_shouldSaveInformation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);

    let (narrated, _) = narrate_samples(&controller, &run).await?;

    assert_eq!(load_narrated(run.information_path())?, narrated);
    Ok(())
}

/// Test that a synthesis failure aborts narration without writing information
#[tokio::test]
async fn test_narrateWith_withSynthesisFailure_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);
    let oracle = NarrationOracle::new(MockSynthesizer::failing_on("Bye."), MockProbe, &run.audio_dir);

    let result = controller.narrate_with(&common::sample_stories(), &oracle, &run).await;

    assert!(result.is_err());
    assert!(!run.information_path().exists());
    Ok(())
}

/// Test that a dry run writes one render source per story and submits nothing
#[tokio::test]
async fn test_render_withDryRun_shouldWriteRenderSources() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);
    let (narrated, _) = narrate_samples(&controller, &run).await?;

    let options = RenderOptions {
        overrides: vec![
            (vec!["frame_rate".to_string()], PatchOp::Set(serde_json::json!(30))),
            (vec!["output_format".to_string()], PatchOp::Remove),
        ],
        dry_run: true,
    };
    let outputs = controller.render(&narrated, &run, &options).await?;

    assert_eq!(outputs, vec![run.render_source_path(0), run.render_source_path(1)]);

    let source: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&outputs[0])?)?;
    assert_eq!(source["frame_rate"], serde_json::json!(30));
    assert!(source.get("output_format").is_none());
    // Title card plus one composition per image
    assert_eq!(source["elements"].as_array().map(Vec::len), Some(3));
    Ok(())
}

/// Test that render sources point at the media server when a base URL is set
#[tokio::test]
async fn test_renderSource_withMediaBaseUrl_shouldMapLocalPaths() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.output.audio_dir = temp_dir.path().join("audio");
    config.server.root = temp_dir.path().to_path_buf();
    config.render.media_base_url = Some("http://10.0.0.2:8000".to_string());
    let controller = Controller::with_config(config)?;

    let story = NarratedStory {
        title: "Mapped".to_string(),
        images: vec![shortform::story::NarratedImage::new(
            "https://cdn.example.com/a.png",
            vec![shortform::story::Description {
                script: "Hi.".to_string(),
                audio: temp_dir.path().join("audio/x.mp3").to_string_lossy().into_owned(),
                duration: 1.0,
            }],
        )],
    };

    let source = controller.render_source(&story, &[])?;
    let text = source.to_string();

    assert!(text.contains("\"https://cdn.example.com/a.png\""));
    assert!(text.contains("\"http://10.0.0.2:8000/audio/x.mp3\""));
    Ok(())
}

/// Test the concat lists and combined captions written for a local mux
#[tokio::test]
async fn test_writeLocalInputs_shouldWriteConcatListsAndStorySrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = test_controller(temp_dir.path())?;
    let run = sample_run(&controller);
    let (narrated, _) = narrate_samples(&controller, &run).await?;

    let inputs = controller.write_local_inputs(0, &narrated[0], &run)?;

    let images = std::fs::read_to_string(&inputs.images)?;
    assert!(images.contains("a.png'\nduration 3.800\n"));
    assert!(images.contains("b.png'\nduration 0.400\n"));
    assert!(images.lines().all(|line| !line.starts_with("file 'img/")));

    let audio = std::fs::read_to_string(&inputs.audio)?;
    assert_eq!(audio.lines().count(), 3);

    let subtitles = std::fs::read_to_string(&inputs.subtitles)?;
    assert!(subtitles.contains("3\n00:00:03,800 --> 00:00:04,200\nBye.\n"));
    Ok(())
}
