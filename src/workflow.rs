use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PromptCutError, Result};
use crate::filter::{FilterGraph, FilterGraphCompiler};
use crate::intent::{EditIntent, PromptInterpreter};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::request::{EditRequest, MediaAsset, RenderOutput};
use crate::subtitle::generate_subtitles;
use crate::transcribe::{TranscriberFactory, TranscriberTrait};
use crate::validate::ValidationGate;
use crate::workspace::Workspace;

/// Pipeline position reported to progress listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Normalizing,
    Concatenating,
    Subtitles,
    Encoding,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Validating => "Validating input",
            Stage::Normalizing => "Normalizing clips",
            Stage::Concatenating => "Joining clips",
            Stage::Subtitles => "Generating subtitles",
            Stage::Encoding => "Encoding output",
            Stage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// An accepted upload on disk with its probed length.
struct ProbedClip {
    path: PathBuf,
    duration_secs: f64,
}

pub struct Workflow {
    config: Config,
    interpreter: PromptInterpreter,
    gate: ValidationGate,
    compiler: FilterGraphCompiler,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        Self::with_components(config, media, transcriber)
    }

    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn TranscriberTrait>,
    ) -> Self {
        Self {
            interpreter: PromptInterpreter::new(config.intent.enable_nature_style),
            gate: ValidationGate::new(&config.limits),
            compiler: FilterGraphCompiler::new(config.luts.clone(), config.overlay.clone()),
            config,
            media,
            transcriber,
        }
    }

    /// Check every external tool the pipeline needs; returns version lines
    pub async fn check_dependencies(&self) -> Result<Vec<String>> {
        let versions = self.media.check_availability().await?;
        self.transcriber.check_availability().await?;
        Ok(versions)
    }

    /// Interpret a prompt and preview its filters without touching media or LUT files
    pub fn plan(&self, prompt: &str) -> (EditIntent, FilterGraph) {
        let intent = self.interpreter.interpret(prompt);
        let graph = self.compiler.preview(&intent);
        (intent, graph)
    }

    /// Check the resources a render of `intent` would need, such as its LUT file
    pub fn check_resources(&self, intent: &EditIntent) -> Result<()> {
        self.compiler.check_resources(intent)
    }

    /// Run the full pipeline for one request
    pub async fn process(&self, request: &EditRequest) -> Result<RenderOutput> {
        self.process_with_progress(request, |_| {}).await
    }

    pub async fn process_with_progress<F>(&self, request: &EditRequest, on_stage: F) -> Result<RenderOutput>
    where
        F: Fn(Stage) + Send + Sync,
    {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let result = self
            .run(request_id, request, &on_stage)
            .instrument(info_span!("render", request_id = %request_id))
            .await;

        match &result {
            Ok(output) => info!(
                "Request {} rendered {} ({} bytes) in {:.1}s",
                request_id,
                output.filename,
                output.data.len(),
                started.elapsed().as_secs_f64()
            ),
            Err(e) => error!("Request {} failed with status {}: {}", request_id, e.status_code(), e),
        }

        result
    }

    async fn run<F>(&self, request_id: Uuid, request: &EditRequest, on_stage: &F) -> Result<RenderOutput>
    where
        F: Fn(Stage) + Send + Sync,
    {
        let assets = request.assets()?;
        for asset in &assets {
            self.gate.check_size(asset)?;
        }

        let intent = self.interpreter.interpret(&request.prompt);
        info!("Interpreted prompt {:?} as {:?}", request.prompt, intent);
        let graph = self.compiler.plan(&intent)?;

        // Dropped on every return path below, which removes the directory
        let workspace = Workspace::create(
            &self.config.workspace.root_dir(),
            request_id,
            self.config.workspace.keep,
        )?;

        on_stage(Stage::Validating);
        let mut clips = Vec::with_capacity(assets.len());
        for (index, asset) in assets.iter().enumerate() {
            clips.push(self.accept_asset(asset, index + 1, &workspace).await?);
        }
        let total_secs: f64 = clips.iter().map(|clip| clip.duration_secs).sum();
        let inputs: Vec<PathBuf> = clips.into_iter().map(|clip| clip.path).collect();
        debug!("Timeline will run {:.1}s across {} clip(s)", total_secs, inputs.len());

        on_stage(Stage::Normalizing);
        let timeline = self.build_timeline(&inputs, &workspace, on_stage).await?;

        let graph = if intent.wants_subtitles {
            on_stage(Stage::Subtitles);
            let subtitle_path = generate_subtitles(
                self.media.as_ref(),
                self.transcriber.as_ref(),
                &timeline,
                &workspace,
            )
            .await?;
            graph.with_subtitles(&subtitle_path)
        } else {
            graph
        };

        on_stage(Stage::Encoding);
        let filter_expression = graph.render();
        let output_path = workspace.output();
        self.media.encode(&timeline, &filter_expression, &output_path).await?;

        let data = fs::read(&output_path)
            .await
            .map_err(|e| PromptCutError::Media(format!("Failed to read encoded output: {}", e)))?;
        if data.is_empty() {
            return Err(PromptCutError::Media("Encoder produced an empty file".to_string()));
        }

        on_stage(Stage::Done);
        Ok(RenderOutput::new(data))
    }

    /// Persist an upload, probe it and run it through the validation gate
    async fn accept_asset(&self, asset: &MediaAsset, index: usize, workspace: &Workspace) -> Result<ProbedClip> {
        let path = workspace.input(index, &asset.extension);
        fs::write(&path, &asset.data).await?;

        let duration_secs = self.media.probe_duration(&path).await?;
        self.gate.validate(asset, duration_secs)?;

        info!("Accepted {} ({:.1}s)", asset.name, duration_secs);
        Ok(ProbedClip { path, duration_secs })
    }

    /// Normalize every input, concurrently when there are two, and join them.
    /// Returns the path of the single timeline later stages work on.
    async fn build_timeline<F>(&self, inputs: &[PathBuf], workspace: &Workspace, on_stage: &F) -> Result<PathBuf>
    where
        F: Fn(Stage) + Send + Sync,
    {
        match inputs {
            [only] => {
                let normalized = workspace.normalized(1);
                self.media.normalize(only, &normalized).await?;
                Ok(normalized)
            }
            [first, second] => {
                let (n1, n2) = (workspace.normalized(1), workspace.normalized(2));
                tokio::try_join!(
                    self.media.normalize(first, &n1),
                    self.media.normalize(second, &n2),
                )?;

                on_stage(Stage::Concatenating);
                let merged = workspace.merged();
                self.media
                    .concat(&[n1, n2], &workspace.concat_list(), &merged)
                    .await?;
                Ok(merged)
            }
            _ => Err(PromptCutError::Media(format!(
                "Expected one or two clips, got {}",
                inputs.len()
            ))),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::media::MockMediaProcessorTrait;
    use crate::transcribe::MockTranscriberTrait;
    use assert_fs::TempDir;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const RENDERED: &[u8] = b"rendered-mp4";

    fn test_config(root: &TempDir) -> Config {
        let mut config = Config::default();
        config.workspace.root = Some(root.path().join("work"));
        config.luts.directory = root.path().join("luts");
        std::fs::create_dir_all(&config.luts.directory).unwrap();
        config
    }

    fn named(path: &Path, name: &str) -> bool {
        path.file_name().is_some_and(|n| n == name)
    }

    fn clip(name: &str) -> MediaAsset {
        MediaAsset::new(name, "mp4", vec![7; 1024])
    }

    fn expect_encode(media: &mut MockMediaProcessorTrait) {
        media.expect_encode().times(1).returning(|_, _, output| {
            std::fs::write(output, RENDERED)?;
            Ok(())
        });
    }

    fn workspace_dirs(root: &TempDir) -> usize {
        std::fs::read_dir(root.path().join("work")).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_single_clip_with_title() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().times(1).returning(|_| Ok(10.0));
        media
            .expect_normalize()
            .withf(|input, output| named(input, "v1.mp4") && named(output, "n1.mp4"))
            .times(1)
            .returning(|_, _| Ok(()));
        media.expect_concat().never();
        media.expect_extract_audio().never();
        media
            .expect_encode()
            .withf(|input, expr, _| {
                named(input, "n1.mp4")
                    && expr.starts_with("drawtext=text=Hello:")
                    && expr.ends_with("enable='between(t,2,5)'")
            })
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, RENDERED)?;
                Ok(())
            });
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_transcribe().never();

        let workflow = Workflow::with_components(test_config(&root), Box::new(media), Box::new(transcriber));
        let request = EditRequest::new(clip("video1"), None, "Add title: Hello at 0:02");

        let output = workflow.process(&request).await.unwrap();
        assert_eq!(output.data, RENDERED);
        assert!(output.filename.starts_with("promptcut-"));
        assert_eq!(workspace_dirs(&root), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_passes_through() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(5.0));
        media.expect_normalize().returning(|_, _| Ok(()));
        media
            .expect_encode()
            .withf(|_, expr, _| expr == "null")
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, RENDERED)?;
                Ok(())
            });

        let workflow =
            Workflow::with_components(test_config(&root), Box::new(media), Box::new(MockTranscriberTrait::new()));
        let output = workflow.process(&EditRequest::new(clip("video1"), None, "")).await.unwrap();
        assert_eq!(output.data, RENDERED);
    }

    #[tokio::test]
    async fn test_two_clips_are_normalized_then_joined() {
        let root = TempDir::new().unwrap();
        let config = test_config(&root);
        std::fs::write(config.luts.directory.join("cinematic.cube"), "LUT_3D_SIZE 2\n").unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().times(2).returning(|_| Ok(20.0));
        media.expect_normalize().times(2).returning(|_, _| Ok(()));
        media
            .expect_concat()
            .withf(|inputs, list, output| {
                inputs.len() == 2
                    && named(&inputs[0], "n1.mp4")
                    && named(&inputs[1], "n2.mp4")
                    && named(list, "concat.txt")
                    && named(output, "merged.mp4")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        media
            .expect_encode()
            .withf(|input, expr, _| named(input, "merged.mp4") && expr.contains("lut3d") && expr.contains("0.28"))
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, RENDERED)?;
                Ok(())
            });

        let workflow = Workflow::with_components(config, Box::new(media), Box::new(MockTranscriberTrait::new()));
        let request = EditRequest::new(clip("video1"), Some(clip("video2")), "warm and cinematic");

        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stages);
        workflow
            .process_with_progress(&request, move |stage| seen.lock().unwrap().push(stage))
            .await
            .unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![Stage::Validating, Stage::Normalizing, Stage::Concatenating, Stage::Encoding, Stage::Done]
        );
    }

    #[tokio::test]
    async fn test_subtitles_burned_from_merged_timeline() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(8.0));
        media.expect_normalize().returning(|_, _| Ok(()));
        media
            .expect_extract_audio()
            .withf(|video, audio| named(video, "n1.mp4") && named(audio, "audio.wav"))
            .times(1)
            .returning(|_, _| Ok(()));
        media
            .expect_encode()
            .withf(|_, expr, _| expr.starts_with("subtitles=filename=") && expr.contains("subtitles.srt"))
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, RENDERED)?;
                Ok(())
            });
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_transcribe().times(1).returning(|_, subtitle_path| {
            std::fs::write(subtitle_path, "1\n00:00:00,000 --> 00:00:02,000\nHi\n")?;
            Ok(())
        });

        let workflow = Workflow::with_components(test_config(&root), Box::new(media), Box::new(transcriber));
        let request = EditRequest::new(clip("video1"), None, "add subtitles");
        assert!(workflow.process(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_subtitle_failure_aborts_request() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(8.0));
        media.expect_normalize().returning(|_, _| Ok(()));
        media.expect_extract_audio().returning(|_, _| Ok(()));
        media.expect_encode().never();
        let mut transcriber = MockTranscriberTrait::new();
        transcriber
            .expect_transcribe()
            .returning(|_, _| Err(PromptCutError::Subtitle("whisper exited with status 1".to_string())));

        let workflow = Workflow::with_components(test_config(&root), Box::new(media), Box::new(transcriber));
        let request = EditRequest::new(clip("video1"), None, "add captions please");

        let err = workflow.process(&request).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(matches!(err, PromptCutError::Subtitle(_)));
        assert_eq!(workspace_dirs(&root), 0);
    }

    #[tokio::test]
    async fn test_overlong_second_clip_rejected_before_normalizing() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_probe_duration()
            .times(2)
            .returning(|path| Ok(if named(path, "v2.mp4") { 61.0 } else { 10.0 }));
        media.expect_normalize().never();
        media.expect_encode().never();

        let workflow =
            Workflow::with_components(test_config(&root), Box::new(media), Box::new(MockTranscriberTrait::new()));
        let request = EditRequest::new(clip("video1"), Some(clip("video2")), "");

        let err = workflow.process(&request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(matches!(
            err,
            PromptCutError::Rejected(Rejection::TooLong { ref name, .. }) if name == "video2"
        ));
        assert_eq!(workspace_dirs(&root), 0);
    }

    #[tokio::test]
    async fn test_oversized_clip_rejected_before_probe() {
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.limits.max_size_mb = 1;

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().never();

        let workflow = Workflow::with_components(config, Box::new(media), Box::new(MockTranscriberTrait::new()));
        let big = MediaAsset::new("video1", "mp4", vec![0; 2 * 1024 * 1024]);

        let err = workflow.process(&EditRequest::new(big, None, "")).await.unwrap_err();
        assert!(matches!(err, PromptCutError::Rejected(Rejection::TooLarge { .. })));
    }

    #[tokio::test]
    async fn test_missing_lut_fails_before_transcoding() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().never();
        media.expect_normalize().never();

        let workflow =
            Workflow::with_components(test_config(&root), Box::new(media), Box::new(MockTranscriberTrait::new()));
        let err = workflow
            .process(&EditRequest::new(clip("video1"), None, "golden hour"))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptCutError::MissingLut { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_missing_primary_is_input_error() {
        let root = TempDir::new().unwrap();
        let workflow = Workflow::with_components(
            test_config(&root),
            Box::new(MockMediaProcessorTrait::new()),
            Box::new(MockTranscriberTrait::new()),
        );
        let request = EditRequest { primary: None, secondary: Some(clip("video2")), prompt: String::new() };

        let err = workflow.process(&request).await.unwrap_err();
        assert!(matches!(err, PromptCutError::MissingAsset(_)));
    }

    #[tokio::test]
    async fn test_probe_failure_is_hard_failure() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_probe_duration()
            .returning(|_| Err(PromptCutError::Probe("Unparsable duration: \"N/A\"".to_string())));
        media.expect_normalize().never();

        let workflow =
            Workflow::with_components(test_config(&root), Box::new(media), Box::new(MockTranscriberTrait::new()));
        let err = workflow.process(&EditRequest::new(clip("video1"), None, "")).await.unwrap_err();
        assert_eq!(err.payload().error, "Video processing failed");
    }

    #[tokio::test]
    async fn test_normalization_failure_skips_remaining_stages() {
        let root = TempDir::new().unwrap();

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(10.0));
        media
            .expect_normalize()
            .returning(|input, _| {
                if named(input, "v2.mp4") {
                    Err(PromptCutError::Media("Normalization failed".to_string()))
                } else {
                    Ok(())
                }
            });
        media.expect_concat().never();
        media.expect_encode().never();

        let workflow =
            Workflow::with_components(test_config(&root), Box::new(media), Box::new(MockTranscriberTrait::new()));
        let request = EditRequest::new(clip("video1"), Some(clip("video2")), "");
        assert!(matches!(workflow.process(&request).await.unwrap_err(), PromptCutError::Media(_)));
    }

    #[tokio::test]
    async fn test_keep_retains_workspace() {
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.workspace.keep = true;

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(3.0));
        media.expect_normalize().returning(|_, _| Ok(()));
        expect_encode(&mut media);

        let workflow = Workflow::with_components(config, Box::new(media), Box::new(MockTranscriberTrait::new()));
        workflow.process(&EditRequest::new(clip("video1"), None, "")).await.unwrap();
        assert_eq!(workspace_dirs(&root), 1);
    }

    #[test]
    fn test_plan_reports_intent() {
        let root = TempDir::new().unwrap();
        let workflow = Workflow::with_components(
            test_config(&root),
            Box::new(MockMediaProcessorTrait::new()),
            Box::new(MockTranscriberTrait::new()),
        );
        let (intent, graph) = workflow.plan("monochrome with captions");
        assert!(intent.wants_subtitles);
        assert_eq!(graph.render(), "hue=s=0");
    }

    #[test]
    fn test_plan_works_without_lut_directory() {
        let root = TempDir::new().unwrap();
        let mut config = test_config(&root);
        config.luts.directory = root.path().join("missing-luts");
        let workflow = Workflow::with_components(
            config,
            Box::new(MockMediaProcessorTrait::new()),
            Box::new(MockTranscriberTrait::new()),
        );

        let (intent, graph) = workflow.plan("warm and cinematic");
        assert_eq!(intent.color_style, Some(crate::intent::ColorStyle::Cinematic));
        assert!(graph.render().contains("cinematic.cube"));
        assert!(matches!(
            workflow.check_resources(&intent),
            Err(PromptCutError::MissingLut { .. })
        ));
    }
}
