//! What a scene pipeline does, independent of the GPU.
//!
//! [`PipelinePlan`] lists the post-processing stages for a [`QualityTier`];
//! the render graph turns a plan into passes. The blend functions here are the
//! CPU mirror of the shader math and are what the tests pin down.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::{GlassParams, PostProcessParams};
use crate::error::{Result, VitrineError};

/// Shorter viewport side below which the mobile tier is used.
const MOBILE_MIN_SIDE: u32 = 600;
/// Portrait viewports up to this width count as mobile.
const MOBILE_PORTRAIT_WIDTH: u32 = 820;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Box blur, depth of field, bloom and antialiasing.
    #[default]
    Desktop,
    /// Antialiasing only.
    Mobile,
}

impl QualityTier {
    /// Coarse guess from the initial viewport. Decided once at startup.
    pub fn detect(width: u32, height: u32) -> Self {
        let shorter = width.min(height);
        let portrait = height > width;
        if shorter < MOBILE_MIN_SIDE || (portrait && width <= MOBILE_PORTRAIT_WIDTH) {
            QualityTier::Mobile
        } else {
            QualityTier::Desktop
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    BoxBlur,
    DepthOfField,
    Bloom,
    Antialias,
}

/// Image a stage reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Shaded color from the scene capture.
    SceneColor,
    /// Per-pixel motion and view-space depth from the scene capture.
    SceneMotion,
    /// Output of an earlier stage.
    Stage(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    pub inputs: Vec<Slot>,
}

impl Stage {
    fn new(kind: StageKind, inputs: &[Slot]) -> Self {
        Self {
            kind,
            inputs: inputs.to_vec(),
        }
    }
}

/// Ordered post-processing stages following the scene capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelinePlan {
    tier: QualityTier,
    stages: Vec<Stage>,
}

impl PipelinePlan {
    pub fn for_tier(tier: QualityTier) -> Self {
        use Slot::{SceneColor, SceneMotion};
        let stages = match tier {
            QualityTier::Desktop => vec![
                Stage::new(StageKind::BoxBlur, &[SceneColor]),
                Stage::new(
                    StageKind::DepthOfField,
                    &[SceneColor, Slot::Stage(0), SceneMotion],
                ),
                Stage::new(StageKind::Bloom, &[Slot::Stage(1)]),
                Stage::new(StageKind::Antialias, &[Slot::Stage(2)]),
            ],
            QualityTier::Mobile => vec![Stage::new(StageKind::Antialias, &[SceneColor])],
        };
        Self { tier, stages }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn has(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|s| s.kind == kind)
    }

    /// Checks that every stage only reads images produced before it and that
    /// the plan ends in antialiasing.
    pub fn validate(&self) -> Result<()> {
        for (index, stage) in self.stages.iter().enumerate() {
            for input in &stage.inputs {
                if let Slot::Stage(source) = input {
                    if *source >= index {
                        return Err(VitrineError::Config(format!(
                            "stage {index} ({:?}) reads stage {source} before it runs",
                            stage.kind
                        )));
                    }
                }
            }
        }
        match self.stages.last() {
            Some(last) if last.kind == StageKind::Antialias => Ok(()),
            _ => Err(VitrineError::Config(
                "pipeline must end with antialiasing".to_string(),
            )),
        }
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Sharp-to-blurred mix factor for a pixel at `view_z`.
///
/// Both `view_z` and `focus_distance` are camera-local z values.
pub fn dof_blend(view_z: f32, focus_distance: f32, min_distance: f32, max_distance: f32) -> f32 {
    smoothstep(min_distance, max_distance, (view_z - focus_distance).abs())
}

/// Fraction of the incoming scene shown at a pixel whose pattern value is
/// `pattern`. Progress 0 shows only the outgoing scene, 1 only the incoming.
pub fn wipe_mix(pattern: f32, progress: f32, threshold: f32) -> f32 {
    let t = 1.0 - progress.clamp(0.0, 1.0);
    let reveal = t * (1.0 + 2.0 * threshold) - threshold;
    ((pattern - reveal) / threshold).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

impl BloomSettings {
    pub fn from_params(post: &PostProcessParams) -> Self {
        Self {
            strength: post.bloom_strength,
            radius: post.bloom_radius,
            threshold: post.bloom_threshold,
        }
    }
}

/// Shared, runtime-tunable bloom parameters of one pipeline.
#[derive(Clone, Debug)]
pub struct BloomHandle(Rc<Cell<BloomSettings>>);

impl BloomHandle {
    pub fn new(settings: BloomSettings) -> Self {
        Self(Rc::new(Cell::new(settings)))
    }

    pub fn get(&self) -> BloomSettings {
        self.0.get()
    }

    pub fn set(&self, settings: BloomSettings) {
        self.0.set(settings);
    }
}

/// Hands out a bloom handle to the first pipeline that asks.
#[derive(Debug, Default)]
pub struct BloomTuning {
    handle: Option<BloomHandle>,
}

impl BloomTuning {
    /// Returns a handle on the first call only. Later pipelines read the
    /// shared tunables instead.
    pub fn claim(&mut self, post: &PostProcessParams) -> Option<BloomHandle> {
        if self.handle.is_some() {
            return None;
        }
        let handle = BloomHandle::new(BloomSettings::from_params(post));
        self.handle = Some(handle.clone());
        Some(handle)
    }

    pub fn handle(&self) -> Option<&BloomHandle> {
        self.handle.as_ref()
    }
}

/// Live values every pipeline reads each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunables {
    pub post: PostProcessParams,
    pub glass: GlassParams,
    /// Camera-local z of the smoothed focus point.
    pub focus_distance: f32,
}

impl Tunables {
    pub fn new(post: PostProcessParams, glass: GlassParams) -> Self {
        Self {
            post,
            glass,
            focus_distance: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_detection() {
        assert_eq!(QualityTier::detect(1920, 1080), QualityTier::Desktop);
        assert_eq!(QualityTier::detect(1024, 1366), QualityTier::Desktop);
        assert_eq!(QualityTier::detect(390, 844), QualityTier::Mobile);
        assert_eq!(QualityTier::detect(800, 1280), QualityTier::Mobile);
        assert_eq!(QualityTier::detect(1280, 500), QualityTier::Mobile);
    }

    #[test]
    fn desktop_plan_runs_every_stage_in_order() {
        let plan = PipelinePlan::for_tier(QualityTier::Desktop);
        let kinds: Vec<_> = plan.stages().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::BoxBlur,
                StageKind::DepthOfField,
                StageKind::Bloom,
                StageKind::Antialias
            ]
        );
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn desktop_stages_chain_through_earlier_outputs() {
        let plan = PipelinePlan::for_tier(QualityTier::Desktop);
        let inputs: Vec<&[Slot]> = plan.stages().iter().map(|s| s.inputs.as_slice()).collect();
        assert_eq!(inputs[0], &[Slot::SceneColor]);
        assert_eq!(
            inputs[1],
            &[Slot::SceneColor, Slot::Stage(0), Slot::SceneMotion]
        );
        assert_eq!(inputs[2], &[Slot::Stage(1)]);
        assert_eq!(inputs[3], &[Slot::Stage(2)]);
    }

    #[test]
    fn mobile_plan_only_antialiases_the_capture() {
        let plan = PipelinePlan::for_tier(QualityTier::Mobile);
        assert_eq!(plan.stages().len(), 1);
        assert_eq!(plan.stages()[0].inputs, vec![Slot::SceneColor]);
        assert!(!plan.has(StageKind::Bloom));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn forward_references_are_invalid() {
        let plan = PipelinePlan {
            tier: QualityTier::Desktop,
            stages: vec![
                Stage::new(StageKind::Bloom, &[Slot::Stage(1)]),
                Stage::new(StageKind::Antialias, &[Slot::Stage(0)]),
            ],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn dof_is_sharp_near_focus_and_blurred_far_from_it() {
        assert_eq!(dof_blend(-5.0, -5.0, 1.0, 3.0), 0.0);
        assert_eq!(dof_blend(-5.5, -5.0, 1.0, 3.0), 0.0);
        assert_eq!(dof_blend(-9.0, -5.0, 1.0, 3.0), 1.0);
        let mid = dof_blend(-7.0, -5.0, 1.0, 3.0);
        assert!((mid - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wipe_covers_everything_at_the_endpoints() {
        for pattern in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(wipe_mix(pattern, 0.0, 0.3), 0.0, "pattern {pattern}");
            assert_eq!(wipe_mix(pattern, 1.0, 0.3), 1.0, "pattern {pattern}");
        }
    }

    #[test]
    fn wipe_reveals_bright_pattern_first() {
        let bright = wipe_mix(0.9, 0.4, 0.3);
        let dark = wipe_mix(0.1, 0.4, 0.3);
        assert!(bright > dark);
    }

    #[test]
    fn only_the_first_pipeline_gets_a_bloom_handle() {
        let post = PostProcessParams::default();
        let mut tuning = BloomTuning::default();
        let first = tuning.claim(&post).expect("first claim");
        assert!(tuning.claim(&post).is_none());

        let mut settings = first.get();
        settings.strength = 0.8;
        first.set(settings);
        assert_eq!(tuning.handle().map(|h| h.get().strength), Some(0.8));
    }
}
