//! Render-side driver: advance an instance's animations, run layers, resolve
//! bone matrices, and notify hook observers.
//!
//! The host renderer owns mesh submission; this module only produces the
//! posed skeleton the host then reads.

use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};

use crate::bone::Bone;
use crate::cache::AnimatableInstanceCache;
use crate::data::AnimationLibrary;
use crate::ids::InstanceId;
use crate::manager::FrameContext;
use crate::model::GeoModel;
use crate::skeleton::Skeleton;

/// Per-render information handed to hooks and layers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderContext {
    pub instance_id: InstanceId,
    pub frame: FrameContext,
}

pub type PreRenderHook = Box<dyn FnMut(&RenderContext, &Skeleton) -> bool + Send>;
pub type PostRenderHook = Box<dyn FnMut(&RenderContext, &Skeleton) + Send>;

/// Observer lists run around each render. Any pre-hook returning `false`
/// cancels the render; later pre-hooks are not called.
#[derive(Default)]
pub struct RenderHooks {
    pre: Vec<PreRenderHook>,
    post: Vec<PostRenderHook>,
}

impl RenderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pre_render<F>(&mut self, hook: F)
    where
        F: FnMut(&RenderContext, &Skeleton) -> bool + Send + 'static,
    {
        self.pre.push(Box::new(hook));
    }

    pub fn on_post_render<F>(&mut self, hook: F)
    where
        F: FnMut(&RenderContext, &Skeleton) + Send + 'static,
    {
        self.post.push(Box::new(hook));
    }

    pub fn fire_pre_render(&mut self, ctx: &RenderContext, skeleton: &Skeleton) -> bool {
        self.pre.iter_mut().all(|hook| hook(ctx, skeleton))
    }

    pub fn fire_post_render(&mut self, ctx: &RenderContext, skeleton: &Skeleton) {
        for hook in &mut self.post {
            hook(ctx, skeleton);
        }
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extra pass over the posed skeleton before matrices are resolved.
pub trait RenderLayer: Send {
    fn apply(&mut self, skeleton: &mut Skeleton, ctx: &RenderContext);
}

pub type BoneCallback = Box<dyn FnMut(&mut Bone, &RenderContext) + Send>;

/// Applies a callback to a fixed list of bones, looked up by name, without
/// walking the hierarchy.
pub struct BoneFilterLayer {
    bones: Vec<String>,
    apply: BoneCallback,
}

impl BoneFilterLayer {
    pub fn new<I, S, F>(bones: I, apply: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&mut Bone, &RenderContext) + Send + 'static,
    {
        Self {
            bones: bones.into_iter().map(Into::into).collect(),
            apply: Box::new(apply),
        }
    }

    pub fn affected_bones(&self) -> &[String] {
        &self.bones
    }
}

impl RenderLayer for BoneFilterLayer {
    fn apply(&mut self, skeleton: &mut Skeleton, ctx: &RenderContext) {
        for name in &self.bones {
            if let Some(bone) = skeleton.bone_mut(name) {
                (self.apply)(bone, ctx);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A pre-render hook vetoed the render.
    Cancelled,
    Rendered {
        /// Whether any controller changed state this frame.
        changed: bool,
        /// Bones visited while resolving matrices.
        resolved: usize,
    },
}

/// Drives one model's skeleton for every instance rendered through it.
pub struct AnimatableRenderer<M: GeoModel> {
    model: M,
    skeleton: Skeleton,
    library: Arc<AnimationLibrary>,
    hooks: RenderHooks,
    layers: Vec<Box<dyn RenderLayer>>,
    scale_width: f32,
    scale_height: f32,
}

impl<M: GeoModel> AnimatableRenderer<M> {
    pub fn new(model: M, skeleton: Skeleton, library: Arc<AnimationLibrary>) -> Self {
        Self {
            model,
            skeleton,
            library,
            hooks: RenderHooks::new(),
            layers: Vec::new(),
            scale_width: 1.0,
            scale_height: 1.0,
        }
    }

    /// Scale applied to the whole model: `width` on x/z, `height` on y.
    pub fn with_render_scale(mut self, width: f32, height: f32) -> Self {
        self.scale_width = width;
        self.scale_height = height;
        self
    }

    pub fn with_layer<L: RenderLayer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn hooks_mut(&mut self) -> &mut RenderHooks {
        &mut self.hooks
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn skeleton_mut(&mut self) -> &mut Skeleton {
        &mut self.skeleton
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    pub fn reference_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(
            self.scale_width,
            self.scale_height,
            self.scale_width,
        ))
    }

    /// Render one instance.
    ///
    /// Order: pre-render hooks, animation (skipped on re-render passes),
    /// layers, matrix resolution, post-render hooks.
    pub fn render<C>(&mut self, cache: &mut C, instance_id: InstanceId, frame: &FrameContext) -> RenderOutcome
    where
        C: AnimatableInstanceCache + ?Sized,
    {
        let ctx = RenderContext {
            instance_id,
            frame: *frame,
        };
        if !self.hooks.fire_pre_render(&ctx, &self.skeleton) {
            log::trace!("render of instance {instance_id} cancelled by a pre-render hook");
            return RenderOutcome::Cancelled;
        }

        let mut changed = false;
        if !frame.is_re_render {
            let manager = cache.manager_for_id(instance_id);
            changed = self.model.handle_animations(
                instance_id,
                manager,
                frame,
                &self.library,
                &mut self.skeleton,
            );
        }

        for layer in &mut self.layers {
            layer.apply(&mut self.skeleton, &ctx);
        }

        let reference = self.reference_matrix();
        let resolved = self.skeleton.resolve_matrices(&reference);
        self.hooks.fire_post_render(&ctx, &self.skeleton);

        RenderOutcome::Rendered { changed, resolved }
    }
}
