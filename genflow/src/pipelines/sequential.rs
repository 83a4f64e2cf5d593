//! Reaction video pipeline: a strictly sequential composition.
//!
//! prompts -> face -> video -> slowmo? -> text? -> rewrite? -> upload

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::prompts::{
    person_prompt_text, person_user_prompt, reaction_prompt_text, reaction_user_prompt,
    PersonTraits, PERSON_SYSTEM_PROMPT, REACTION_SYSTEM_PROMPT,
};
use super::upload::{UploadTarget, Uploader};
use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::context::{PipelineContext, StatusHandle};
use crate::core::PipelineInput;
use crate::errors::GenflowError;
use crate::events::{noop_sink, EventSink};
use crate::execution::{UnitOfWorkExecutor, UnitOptions};
use crate::fallback::FallbackCompletionClient;
use crate::gateways::{
    BestEffortRewriter, CompletionRequest, GenerationGateway, GenerationKind, GenerationRequest,
    Gateways,
};

/// Pipeline name used in status and events.
pub const REACTION_PIPELINE: &str = "reaction_video";

const PROMPT_TIMEOUT: Duration = Duration::from_secs(120);
const FACE_TIMEOUT: Duration = Duration::from_secs(180);
const VIDEO_TIMEOUT: Duration = Duration::from_secs(600);
const VIDEO_HEARTBEAT: Duration = Duration::from_secs(30);
const POST_PROCESS_TIMEOUT: Duration = Duration::from_secs(300);
const SLOW_MOTION_FACTOR: f64 = 0.7;
const REWRITE_PLAYBACK_SPEED: f32 = 1.0;
const FACES_FOLDER: &str = "reaction/faces";
const VIDEOS_FOLDER: &str = "reaction/videos";
const SUPPORTED_ASPECT_RATIOS: [&str; 3] = ["9:16", "16:9", "1:1"];

fn default_emotion() -> String {
    "shocked".to_string()
}

fn default_gender() -> String {
    "female".to_string()
}

fn default_age_range() -> String {
    "early_20s".to_string()
}

fn default_ethnicity() -> String {
    "caucasian".to_string()
}

fn default_hair_color() -> String {
    "brown".to_string()
}

fn default_style() -> String {
    "coquette".to_string()
}

fn default_background() -> String {
    "bedroom".to_string()
}

fn default_clothing() -> String {
    "casual".to_string()
}

fn default_aspect_ratio() -> String {
    "9:16".to_string()
}

fn default_video_duration() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_image_model() -> String {
    "nano-banana".to_string()
}

fn default_video_model() -> String {
    "kling-v2.6".to_string()
}

/// Input for a reaction video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionVideoInput {
    /// Auth and rewrite settings.
    #[serde(flatten)]
    pub base: PipelineInput,
    /// Extra guidance for both prompts.
    #[serde(default)]
    pub additional_prompt: Option<String>,
    /// Emotion shown (shocked, scared, surprised, ...).
    #[serde(default = "default_emotion")]
    pub emotion: String,
    /// Caption burned into the video.
    #[serde(default)]
    pub text_overlay: Option<String>,
    /// Whether to burn in `text_overlay`.
    #[serde(default = "default_true")]
    pub text_overlay_enabled: bool,
    /// Person appearance.
    #[serde(default = "default_gender")]
    pub gender: String,
    /// Age bracket, e.g. "early_20s".
    #[serde(default = "default_age_range")]
    pub age_range: String,
    /// Ethnicity.
    #[serde(default = "default_ethnicity")]
    pub ethnicity: String,
    /// Hair color.
    #[serde(default = "default_hair_color")]
    pub hair_color: String,
    /// Aesthetic style.
    #[serde(default = "default_style")]
    pub style: String,
    /// Scene background.
    #[serde(default = "default_background")]
    pub background: String,
    /// Clothing.
    #[serde(default = "default_clothing")]
    pub clothing: String,
    /// One of 9:16, 16:9, 1:1.
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// Video length in seconds, 5 to 10.
    #[serde(default = "default_video_duration")]
    pub video_duration: u32,
    /// Apply the slow-motion pass.
    #[serde(default = "default_true")]
    pub slowed_video: bool,
    /// Image model id.
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Video model id.
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Image model parameter overrides.
    #[serde(default)]
    pub image_model_params: Map<String, Value>,
    /// Video model parameter overrides.
    #[serde(default)]
    pub video_model_params: Map<String, Value>,
}

impl Default for ReactionVideoInput {
    fn default() -> Self {
        Self {
            base: PipelineInput::default(),
            additional_prompt: None,
            emotion: default_emotion(),
            text_overlay: None,
            text_overlay_enabled: true,
            gender: default_gender(),
            age_range: default_age_range(),
            ethnicity: default_ethnicity(),
            hair_color: default_hair_color(),
            style: default_style(),
            background: default_background(),
            clothing: default_clothing(),
            aspect_ratio: default_aspect_ratio(),
            video_duration: default_video_duration(),
            slowed_video: true,
            image_model: default_image_model(),
            video_model: default_video_model(),
            image_model_params: Map::new(),
            video_model_params: Map::new(),
        }
    }
}

impl ReactionVideoInput {
    /// Sets the auth and rewrite settings.
    #[must_use]
    pub fn with_base(mut self, base: PipelineInput) -> Self {
        self.base = base;
        self
    }

    /// Sets the caption.
    #[must_use]
    pub fn with_text_overlay(mut self, text: impl Into<String>) -> Self {
        self.text_overlay = Some(text.into());
        self
    }

    /// Toggles the slow-motion pass.
    #[must_use]
    pub fn with_slowed_video(mut self, slowed: bool) -> Self {
        self.slowed_video = slowed;
        self
    }

    /// Returns the caption when the text step should run.
    #[must_use]
    pub fn overlay_text(&self) -> Option<&str> {
        if !self.text_overlay_enabled {
            return None;
        }
        self.text_overlay
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Validation`] for an empty emotion, an
    /// unsupported aspect ratio, or a duration outside 5 to 10 seconds.
    pub fn validate(&self) -> Result<(), GenflowError> {
        if self.emotion.trim().is_empty() {
            return Err(GenflowError::validation("emotion must not be empty"));
        }
        if !SUPPORTED_ASPECT_RATIOS.contains(&self.aspect_ratio.as_str()) {
            return Err(GenflowError::validation(format!(
                "unsupported aspect_ratio '{}', expected one of {SUPPORTED_ASPECT_RATIOS:?}",
                self.aspect_ratio
            )));
        }
        if !(5..=10).contains(&self.video_duration) {
            return Err(GenflowError::validation(format!(
                "video_duration must be between 5 and 10 seconds, got {}",
                self.video_duration
            )));
        }
        Ok(())
    }

    fn person_traits(&self) -> PersonTraits<'_> {
        PersonTraits {
            gender: &self.gender,
            age_range: &self.age_range,
            emotion: &self.emotion,
            style: &self.style,
            setting: &self.background,
            hair_color: &self.hair_color,
            ethnicity: &self.ethnicity,
            clothing: &self.clothing,
            context: self.additional_prompt.as_deref(),
        }
    }
}

/// Result of a reaction video run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionVideoOutput {
    /// Permanent URL of the face image.
    pub face_image_url: String,
    /// Temporary URL of the video before post-processing.
    pub raw_video_url: String,
    /// Permanent URL of the final video.
    pub final_video_url: String,
    /// Prompt used for the face image.
    pub enhanced_image_prompt: String,
    /// Prompt used for the video.
    pub enhanced_video_prompt: String,
    /// Image model used.
    pub image_model: String,
    /// Video model used.
    pub video_model: String,
    /// True if a prompt was served by the fallback model.
    pub fallback_used: bool,
    /// Best-effort degradations (e.g. rewrite failures).
    pub warnings: Vec<String>,
}

struct Prompts {
    image: String,
    video: String,
    fallback_used: bool,
}

/// Collaborators shared by the steps, split from the context so step
/// bodies can borrow them while the context is borrowed mutably.
struct ReactionStages {
    generation: Arc<dyn GenerationGateway>,
    fallback: FallbackCompletionClient,
    rewriter: Option<BestEffortRewriter>,
    uploader: Uploader,
    executor: UnitOfWorkExecutor,
}

impl ReactionStages {
    async fn prompts(&self, input: &ReactionVideoInput) -> Result<Prompts, GenflowError> {
        let options = UnitOptions::fast(PROMPT_TIMEOUT);
        let fallback = &self.fallback;

        let person_request = CompletionRequest::prompt(
            person_user_prompt(&input.person_traits()),
            Some(PERSON_SYSTEM_PROMPT),
        );
        let person_request = &person_request;
        let person = self
            .executor
            .run("prompts.person", &options, move |_| {
                fallback.complete_json_request(person_request.clone())
            })
            .await?;

        let reaction_request = CompletionRequest::prompt(
            reaction_user_prompt(
                &input.emotion,
                input.additional_prompt.as_deref(),
                input.video_duration,
            ),
            Some(REACTION_SYSTEM_PROMPT),
        );
        let reaction_request = &reaction_request;
        let reaction = self
            .executor
            .run("prompts.reaction", &options, move |_| {
                fallback.complete_json_request(reaction_request.clone())
            })
            .await?;

        Ok(Prompts {
            image: person_prompt_text(&person.value),
            video: reaction_prompt_text(&reaction.value, &input.emotion),
            fallback_used: person.fallback_used || reaction.fallback_used,
        })
    }

    async fn generate(
        &self,
        name: &str,
        options: UnitOptions,
        request: GenerationRequest,
    ) -> Result<String, GenflowError> {
        let generation = &self.generation;
        let request = &request;
        let media = self
            .executor
            .run(name, &options, move |_| generation.generate(request))
            .await?;
        info!(unit = name, url = %media.url, model = %media.model, "Media generated");
        Ok(media.url)
    }

    async fn face(&self, input: &ReactionVideoInput, prompt: &str) -> Result<String, GenflowError> {
        let request = GenerationRequest::new(GenerationKind::Image)
            .with_prompt(prompt)
            .with_model(Some(input.image_model.clone()))
            .with_param("aspect_ratio", json!(input.aspect_ratio))
            .merge_params(&input.image_model_params);
        self.generate("face", UnitOptions::slow(FACE_TIMEOUT), request)
            .await
    }

    async fn video(
        &self,
        input: &ReactionVideoInput,
        prompt: &str,
        face_url: &str,
    ) -> Result<String, GenflowError> {
        let request = GenerationRequest::new(GenerationKind::Video)
            .with_prompt(prompt)
            .with_model(Some(input.video_model.clone()))
            .with_source(face_url)
            .with_param("duration", json!(input.video_duration))
            .with_param("aspect_ratio", json!(input.aspect_ratio))
            .with_param("generate_audio", json!(false))
            .merge_params(&input.video_model_params);
        let options = UnitOptions::slow(VIDEO_TIMEOUT).with_heartbeat(VIDEO_HEARTBEAT);
        self.generate("video", options, request).await
    }

    async fn slow_motion(&self, video_url: &str) -> Result<String, GenflowError> {
        let request = GenerationRequest::new(GenerationKind::SlowMotion)
            .with_source(video_url)
            .with_param("speed_factor", json!(SLOW_MOTION_FACTOR))
            .with_param("preserve_audio", json!(false));
        self.generate("slowmo", UnitOptions::fast(POST_PROCESS_TIMEOUT), request)
            .await
    }

    async fn text_overlay(&self, video_url: &str, text: &str) -> Result<String, GenflowError> {
        let request = GenerationRequest::new(GenerationKind::TextOverlay)
            .with_source(video_url)
            .with_param("text", json!(text))
            .with_param("position", json!("center"))
            .with_param("font", json!("impact"))
            .with_param("font_color", json!("white"))
            .with_param("font_scale_factor", json!(28.0))
            .with_param("border_width", json!(4))
            .with_param("border_color", json!("black"))
            .with_param("max_chars_per_line", json!(24));
        self.generate("text", UnitOptions::fast(POST_PROCESS_TIMEOUT), request)
            .await
    }

    async fn rewrite(
        &self,
        input: &ReactionVideoInput,
        face_url: String,
        video_url: String,
    ) -> Result<(String, String, Vec<String>), GenflowError> {
        let rewriter = self
            .rewriter
            .as_ref()
            .ok_or_else(|| GenflowError::config("rewrite enabled but no rewrite gateway configured"))?;
        let device = input.base.rewrite_device;

        let images = rewriter.rewrite_images(&[face_url], device).await;
        let video = rewriter
            .rewrite_video(&video_url, REWRITE_PLAYBACK_SPEED, device)
            .await?;

        let warnings = images
            .warning
            .into_iter()
            .chain(video.warning)
            .collect();
        let face = images.value.into_iter().next().unwrap_or_default();
        Ok((face, video.value, warnings))
    }

    async fn upload(&self, face_url: &str, video_url: &str) -> Result<(String, String), GenflowError> {
        let mut urls = self
            .uploader
            .upload_outputs(vec![
                UploadTarget::new("face", face_url, FACES_FOLDER),
                UploadTarget::new("video", video_url, VIDEOS_FOLDER),
            ])
            .await?;
        let face = urls
            .remove("face")
            .ok_or_else(|| GenflowError::Internal("face upload missing".into()))?;
        let video = urls
            .remove("video")
            .ok_or_else(|| GenflowError::Internal("video upload missing".into()))?;
        Ok((face, video))
    }
}

/// Generates a face image, animates it, post-processes and persists it.
///
/// One instance serves one invocation; a second `run` is rejected.
pub struct ReactionVideoPipeline {
    ctx: PipelineContext,
    stages: ReactionStages,
}

impl std::fmt::Debug for ReactionVideoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionVideoPipeline")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl ReactionVideoPipeline {
    /// Builds the pipeline from collaborators and engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if the generation, completion or
    /// storage gateway is missing.
    pub fn new(gateways: &Gateways, config: &EngineConfig) -> Result<Self, GenflowError> {
        Self::with_observers(gateways, config, noop_sink(), Arc::new(CancellationToken::new()))
    }

    /// Like [`new`](Self::new) with an event sink and a shared token.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_observers(
        gateways: &Gateways,
        config: &EngineConfig,
        events: Arc<dyn EventSink>,
        cancel: Arc<CancellationToken>,
    ) -> Result<Self, GenflowError> {
        let executor = UnitOfWorkExecutor::new()
            .with_event_sink(events.clone())
            .with_cancellation(cancel.clone());

        let stages = ReactionStages {
            generation: gateways.generation()?.clone(),
            fallback: FallbackCompletionClient::new(
                gateways.completion()?.clone(),
                config.completion.policy(),
            ),
            rewriter: gateways
                .rewrite()
                .ok()
                .map(|gateway| BestEffortRewriter::new(gateway.clone())),
            uploader: Uploader::new(gateways.storage()?.clone(), executor.clone()),
            executor,
        };

        let ctx = PipelineContext::new(REACTION_PIPELINE, config.auth.gate())
            .with_event_sink(events)
            .with_cancellation(cancel);

        Ok(Self { ctx, stages })
    }

    /// Returns a read-only status view.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.ctx.status_handle()
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        self.ctx.cancellation().clone()
    }

    /// Requests cancellation; takes effect at the next suspension point.
    pub fn cancel(&self, reason: &str) {
        self.ctx.cancellation().cancel(reason);
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Authentication`] before any step runs.
    /// - [`GenflowError::Validation`] for out-of-range input.
    /// - The first step error; no partial output is returned.
    pub async fn run(
        &mut self,
        input: &ReactionVideoInput,
    ) -> Result<ReactionVideoOutput, GenflowError> {
        let (ctx, stages) = (&mut self.ctx, &self.stages);
        ctx.start(&input.base).await?;

        if let Err(e) = input.validate() {
            ctx.fail(&e.to_string()).await;
            return Err(e);
        }

        let prompts = ctx
            .step("prompts", "Generate Prompts", 0, stages.prompts(input))
            .await?;

        let face_url = ctx
            .step("face", "Generate Face", 10, stages.face(input, &prompts.image))
            .await?;
        ctx.set_output("face_url", json!(face_url));

        let raw_video_url = ctx
            .step(
                "video",
                "Generate Video",
                30,
                stages.video(input, &prompts.video, &face_url),
            )
            .await?;
        ctx.set_output("raw_video_url", json!(raw_video_url));

        let mut final_video_url = raw_video_url.clone();

        if input.slowed_video {
            final_video_url = ctx
                .step(
                    "slowmo",
                    "Apply Slow Motion",
                    60,
                    stages.slow_motion(&final_video_url),
                )
                .await?;
        } else {
            ctx.skip("slowmo", "Apply Slow Motion", 60, "slowed_video disabled")
                .await?;
        }

        if let Some(text) = input.overlay_text() {
            final_video_url = ctx
                .step(
                    "text",
                    "Add Text",
                    80,
                    stages.text_overlay(&final_video_url, text),
                )
                .await?;
        } else {
            ctx.skip("text", "Add Text", 80, "no text overlay").await?;
        }

        let mut face_for_upload = face_url;
        let mut warnings = Vec::new();
        if input.base.rewrite_enabled {
            let (face, video, rewrite_warnings) = ctx
                .step(
                    "rewrite",
                    "Rewrite Media",
                    85,
                    stages.rewrite(input, face_for_upload, final_video_url),
                )
                .await?;
            face_for_upload = face;
            final_video_url = video;
            warnings.extend(rewrite_warnings);
        } else {
            ctx.skip("rewrite", "Rewrite Media", 85, "rewrite disabled")
                .await?;
        }

        let (face_image_url, final_video_url) = ctx
            .step(
                "upload",
                "Upload",
                90,
                stages.upload(&face_for_upload, &final_video_url),
            )
            .await?;

        ctx.complete().await;

        Ok(ReactionVideoOutput {
            face_image_url,
            raw_video_url,
            final_video_url,
            enhanced_image_prompt: prompts.image,
            enhanced_video_prompt: prompts.video,
            image_model: input.image_model.clone(),
            video_model: input.video_model.clone(),
            fallback_used: prompts.fallback_used,
            warnings,
        })
    }
}
