//! AnimationController: one independent animation state machine.
//!
//! States are implicit: stopped (no current animation), running, or
//! transitioning (an outgoing pose is being blended into the current one).
//!
//! Per-frame advance order:
//!   pending trigger → state handler → sample (and blend) → clip time →
//!   transition timer.
//! The pose returned by [`AnimationController::advance`] is sampled before
//! time moves, so the first frame of a clip shows its first keyframe.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::Serialize;

use crate::config::Config;
use crate::data::{AnimationClip, AnimationLibrary, ClipLoop};
use crate::data_ticket::{DataStore, DataTicket};
use crate::interp::Easing;
use crate::manager::FrameContext;
use crate::raw_animation::RawAnimation;
use crate::sampling::{sample_clip, Pose};

/// Callback deciding which animation should play when no trigger is active.
/// Returning `None` stops the controller.
pub type StateHandler = Box<dyn FnMut(&AnimationTest<'_>) -> Option<RawAnimation> + Send>;

/// Read-only view handed to a [`StateHandler`] each frame.
pub struct AnimationTest<'a> {
    controller: &'a str,
    dt: f32,
    frame: &'a FrameContext,
    data: &'a DataStore,
    current: Option<&'a RawAnimation>,
}

impl<'a> AnimationTest<'a> {
    pub fn controller_name(&self) -> &str {
        self.controller
    }

    /// Seconds this controller advances by this frame.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn frame(&self) -> &FrameContext {
        self.frame
    }

    pub fn partial_tick(&self) -> f32 {
        self.frame.partial_tick
    }

    /// Synced data of the owning instance.
    pub fn data<D: std::any::Any + Send + Sync>(&self, ticket: &DataTicket<D>) -> Option<&D> {
        self.data.get(ticket)
    }

    pub fn current_animation(&self) -> Option<&RawAnimation> {
        self.current
    }

    pub fn is_current(&self, raw: &RawAnimation) -> bool {
        self.current == Some(raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Stopped,
    Running,
    Transitioning,
}

/// Result of advancing one controller by one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerStep {
    /// True when the controller switched animation, stage, or state this frame.
    pub changed: bool,
    pub pose: Option<Pose>,
}

/// Comparable summary of a controller's state, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub name: String,
    pub state: ControllerState,
    pub animation: Option<RawAnimation>,
    pub clip: Option<String>,
    pub stage: usize,
    pub clip_time: f32,
    pub finished: bool,
    pub transition_elapsed: Option<f32>,
    pub pending_trigger: Option<String>,
    pub triggered: Option<String>,
}

#[derive(Clone, Debug)]
struct ActiveAnimation {
    raw: RawAnimation,
    stage: usize,
    clip: Arc<AnimationClip>,
    loop_mode: ClipLoop,
    time: f32,
    finished: bool,
}

impl ActiveAnimation {
    fn start(raw: RawAnimation, library: &AnimationLibrary) -> Option<Self> {
        let first = raw.stages().first()?;
        let clip = library.get(&first.animation)?.clone();
        let loop_mode = first.loop_type.resolve(clip.loop_mode);
        Some(Self {
            raw,
            stage: 0,
            clip,
            loop_mode,
            time: 0.0,
            finished: false,
        })
    }

    /// Move local time forward. Returns true when the stage changed or the
    /// animation finished.
    fn step(&mut self, dt: f32, library: &AnimationLibrary) -> bool {
        if self.finished {
            return false;
        }
        self.time += dt;
        let len = self.clip.length_secs;
        if self.time < len {
            return false;
        }
        match self.loop_mode {
            ClipLoop::Loop => {
                self.time = if len > 0.0 { fmod(self.time, len) } else { 0.0 };
                false
            }
            ClipLoop::HoldOnLastFrame => {
                self.time = len;
                self.finished = true;
                true
            }
            ClipLoop::PlayOnce => {
                let overflow = self.time - len;
                let next = self.stage + 1;
                let Some(stage) = self.raw.stages().get(next) else {
                    self.time = len;
                    self.finished = true;
                    return true;
                };
                match library.get(&stage.animation) {
                    Some(clip) => {
                        self.loop_mode = stage.loop_type.resolve(clip.loop_mode);
                        self.clip = clip.clone();
                        self.stage = next;
                        self.time = overflow.min(self.clip.length_secs);
                    }
                    None => {
                        log::warn!(
                            "animation '{}' not found; ending sequence after '{}'",
                            stage.animation,
                            self.clip.name
                        );
                        self.time = len;
                        self.finished = true;
                    }
                }
                true
            }
        }
    }
}

/// What a transition blends out of.
#[derive(Clone, Debug)]
enum BlendSource {
    Rest,
    /// The outgoing animation keeps playing while it fades.
    Animation(ActiveAnimation),
    /// Blended pose captured when a new animation interrupted a transition.
    Frozen(Pose),
}

#[derive(Clone, Debug)]
struct Transition {
    from: BlendSource,
    elapsed: f32,
}

fn fmod(a: f32, b: f32) -> f32 {
    let m = a % b;
    if m < 0.0 {
        m + b
    } else {
        m
    }
}

pub struct AnimationController {
    name: String,
    transition_secs: f32,
    easing: Easing,
    restart_on_retrigger: bool,
    speed: f32,
    triggerables: HashMap<String, RawAnimation>,
    state_handler: Option<StateHandler>,
    current: Option<ActiveAnimation>,
    transition: Option<Transition>,
    pending_trigger: Option<String>,
    triggered: Option<String>,
}

impl std::fmt::Debug for AnimationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationController")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("clip", &self.current_clip_name())
            .field("triggered", &self.triggered)
            .finish_non_exhaustive()
    }
}

impl AnimationController {
    /// Controller with instant switches and no retrigger restart.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transition_secs: 0.0,
            easing: Easing::Linear,
            restart_on_retrigger: false,
            speed: 1.0,
            triggerables: HashMap::new(),
            state_handler: None,
            current: None,
            transition: None,
            pending_trigger: None,
            triggered: None,
        }
    }

    /// Controller using the transition and retrigger defaults from `cfg`.
    pub fn from_config(name: &str, cfg: &Config) -> Self {
        Self::new(name)
            .with_transition(cfg.default_transition_secs, cfg.default_easing)
            .restart_on_retrigger(cfg.restart_on_retrigger)
    }

    pub fn with_transition(mut self, secs: f32, easing: Easing) -> Self {
        self.transition_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self.easing = easing;
        self
    }

    pub fn restart_on_retrigger(mut self, restart: bool) -> Self {
        self.restart_on_retrigger = restart;
        self
    }

    /// Playback speed multiplier applied to every advance.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Declare an animation that can be fired by name via [`Self::try_trigger`].
    pub fn triggerable(mut self, name: &str, raw: RawAnimation) -> Self {
        self.triggerables.insert(name.to_string(), raw);
        self
    }

    pub fn with_state_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&AnimationTest<'_>) -> Option<RawAnimation> + Send + 'static,
    {
        self.state_handler = Some(Box::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transition_secs(&self) -> f32 {
        self.transition_secs
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn has_triggerable(&self, name: &str) -> bool {
        self.triggerables.contains_key(name)
    }

    pub fn state(&self) -> ControllerState {
        match (&self.current, &self.transition) {
            (None, _) => ControllerState::Stopped,
            (Some(_), Some(_)) => ControllerState::Transitioning,
            (Some(_), None) => ControllerState::Running,
        }
    }

    pub fn current_animation(&self) -> Option<&RawAnimation> {
        self.current.as_ref().map(|a| &a.raw)
    }

    pub fn current_clip_name(&self) -> Option<&str> {
        self.current.as_ref().map(|a| a.clip.name.as_str())
    }

    /// Local time of the current clip in seconds.
    pub fn clip_time(&self) -> Option<f32> {
        self.current.as_ref().map(|a| a.time)
    }

    pub fn is_finished(&self) -> bool {
        self.current.as_ref().is_some_and(|a| a.finished)
    }

    /// Eased blend weight of the running transition, if any.
    pub fn transition_weight(&self) -> Option<f32> {
        self.transition
            .as_ref()
            .map(|t| self.easing.apply(t.elapsed / self.transition_secs))
    }

    pub fn triggered_animation(&self) -> Option<&str> {
        self.triggered.as_deref()
    }

    pub fn pending_trigger(&self) -> Option<&str> {
        self.pending_trigger.as_deref()
    }

    /// Queue a declared triggerable animation for the next advance.
    ///
    /// Returns whether `anim` is declared on this controller. A later request
    /// before the next advance replaces an earlier one. Re-triggering the
    /// animation that is already fully active is a no-op unless restart on
    /// retrigger is enabled.
    pub fn try_trigger(&mut self, anim: &str) -> bool {
        if !self.triggerables.contains_key(anim) {
            log::debug!(
                "controller '{}' has no triggerable animation '{anim}'",
                self.name
            );
            return false;
        }
        let fully_active = self.triggered.as_deref() == Some(anim)
            && self.transition.is_none()
            && !self.is_finished();
        if fully_active && !self.restart_on_retrigger {
            // Supersedes any other request queued since the last advance.
            self.pending_trigger = None;
            return true;
        }
        self.pending_trigger = Some(anim.to_string());
        true
    }

    /// Stop whatever is playing; bones return to rest on the next pose write.
    pub fn stop(&mut self) {
        self.current = None;
        self.transition = None;
        self.pending_trigger = None;
        self.triggered = None;
    }

    /// End a running triggered animation so the state handler takes over again.
    pub fn stop_triggered_animation(&mut self) -> bool {
        self.pending_trigger = None;
        if self.triggered.take().is_some() {
            self.current = None;
            self.transition = None;
            return true;
        }
        false
    }

    /// Restart the current animation from its first stage on the next advance.
    pub fn force_animation_reset(&mut self) {
        if let Some(name) = self.triggered.clone() {
            self.pending_trigger = Some(name);
        } else if let Some(active) = self.current.as_mut() {
            active.finished = true;
        }
    }

    /// Switch to `raw` now, blending from the current pose when a transition
    /// length is configured. Unknown clips leave the controller untouched.
    fn start(&mut self, raw: RawAnimation, library: &AnimationLibrary) -> bool {
        let Some(incoming) = ActiveAnimation::start(raw, library) else {
            log::warn!(
                "controller '{}' could not start animation: first stage missing from library",
                self.name
            );
            return false;
        };
        self.transition = if self.transition_secs > 0.0 {
            let from = if self.transition.is_some() {
                self.current_pose().map_or(BlendSource::Rest, BlendSource::Frozen)
            } else {
                self.current.take().map_or(BlendSource::Rest, BlendSource::Animation)
            };
            Some(Transition { from, elapsed: 0.0 })
        } else {
            None
        };
        self.current = Some(incoming);
        true
    }

    /// Pose at the current time, blended with the transition source.
    fn current_pose(&self) -> Option<Pose> {
        let current = self.current.as_ref()?;
        let pose = sample_clip(&current.clip, current.time);
        let Some(transition) = &self.transition else {
            return Some(pose);
        };
        let weight = self.easing.apply(transition.elapsed / self.transition_secs);
        let from = match &transition.from {
            BlendSource::Rest => Pose::default(),
            BlendSource::Animation(a) => sample_clip(&a.clip, a.time),
            BlendSource::Frozen(p) => p.clone(),
        };
        Some(from.blend(&pose, weight))
    }

    /// Advance by `dt` seconds and return the pose for this frame.
    pub fn advance(
        &mut self,
        dt: f32,
        library: &AnimationLibrary,
        data: &DataStore,
        frame: &FrameContext,
    ) -> ControllerStep {
        let dt = (dt * self.speed).max(0.0);
        let mut changed = false;

        if let Some(name) = self.pending_trigger.take() {
            match self.triggerables.get(&name).cloned() {
                Some(raw) => {
                    if self.start(raw, library) {
                        self.triggered = Some(name);
                        changed = true;
                    }
                }
                None => log::debug!("trigger '{name}' vanished before it could start"),
            }
        }

        if self.triggered.is_none() {
            if let Some(handler) = self.state_handler.as_mut() {
                let requested = {
                    let test = AnimationTest {
                        controller: &self.name,
                        dt,
                        frame,
                        data,
                        current: self.current.as_ref().map(|a| &a.raw),
                    };
                    handler(&test)
                };
                match requested {
                    Some(raw) => {
                        // A finished play-once sequence requested again replays;
                        // a held last frame stays held.
                        let same = self.current.as_ref().is_some_and(|a| {
                            a.raw == raw && !(a.finished && a.loop_mode == ClipLoop::PlayOnce)
                        });
                        if !same && self.start(raw, library) {
                            changed = true;
                        }
                    }
                    None => {
                        if self.current.is_some() {
                            self.current = None;
                            self.transition = None;
                            changed = true;
                        }
                    }
                }
            }
        }

        let (Some(pose), Some(current)) = (self.current_pose(), self.current.as_mut()) else {
            return ControllerStep {
                changed,
                pose: None,
            };
        };

        if current.step(dt, library) {
            changed = true;
            if current.finished && current.loop_mode == ClipLoop::PlayOnce {
                // Triggered sequences hand control back to the state handler.
                self.triggered = None;
            }
        }

        if let Some(transition) = self.transition.as_mut() {
            transition.elapsed += dt;
            if let BlendSource::Animation(from) = &mut transition.from {
                from.step(dt, library);
            }
            if transition.elapsed >= self.transition_secs {
                self.transition = None;
                changed = true;
            }
        }

        ControllerStep {
            changed,
            pose: Some(pose),
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            name: self.name.clone(),
            state: self.state(),
            animation: self.current.as_ref().map(|a| a.raw.clone()),
            clip: self.current.as_ref().map(|a| a.clip.name.clone()),
            stage: self.current.as_ref().map_or(0, |a| a.stage),
            clip_time: self.current.as_ref().map_or(0.0, |a| a.time),
            finished: self.is_finished(),
            transition_elapsed: self.transition.as_ref().map(|t| t.elapsed),
            pending_trigger: self.pending_trigger.clone(),
            triggered: self.triggered.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BoneAnimation, Keyframe, KeyframeChannel};

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() <= 1e-4, "left={a} right={b}");
    }

    fn clip(name: &str, len: f32, mode: ClipLoop, x: f32) -> AnimationClip {
        AnimationClip::new(name, len, mode).with_bone(BoneAnimation {
            bone: "body".into(),
            position: KeyframeChannel::new(vec![Keyframe::new(0.0, [x, 0.0, 0.0])]),
            ..Default::default()
        })
    }

    fn library() -> AnimationLibrary {
        let mut lib = AnimationLibrary::new();
        lib.insert(clip("walk", 1.0, ClipLoop::Loop, 1.0)).unwrap();
        lib.insert(clip("idle", 2.0, ClipLoop::Loop, 0.0)).unwrap();
        lib.insert(clip("jump", 0.5, ClipLoop::PlayOnce, 4.0)).unwrap();
        lib.insert(clip("land", 0.25, ClipLoop::PlayOnce, 2.0)).unwrap();
        lib.insert(clip("sit", 0.5, ClipLoop::HoldOnLastFrame, 3.0)).unwrap();
        lib
    }

    fn step(ctrl: &mut AnimationController, lib: &AnimationLibrary, dt: f32) -> ControllerStep {
        ctrl.advance(dt, lib, &DataStore::new(), &FrameContext::default())
    }

    #[test]
    fn looping_clip_wraps_local_time() {
        let lib = library();
        let mut ctrl = AnimationController::new("walk")
            .with_state_handler(|_| Some(RawAnimation::begin().then_loop("walk")));
        for _ in 0..4 {
            step(&mut ctrl, &lib, 0.3);
        }
        approx(ctrl.clip_time().unwrap(), 0.2);
        assert_eq!(ctrl.state(), ControllerState::Running);
    }

    #[test]
    fn instant_trigger_switches_on_next_advance() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("jump", RawAnimation::begin().then_play("jump"));
        assert!(ctrl.try_trigger("jump"));
        let out = step(&mut ctrl, &lib, 0.0);
        assert!(out.changed);
        assert_eq!(ctrl.current_clip_name(), Some("jump"));
        assert_eq!(ctrl.state(), ControllerState::Running);
        assert_eq!(ctrl.triggered_animation(), Some("jump"));
    }

    #[test]
    fn undeclared_trigger_is_rejected() {
        let mut ctrl = AnimationController::new("main");
        assert!(!ctrl.try_trigger("jump"));
        assert_eq!(ctrl.pending_trigger(), None);
    }

    #[test]
    fn retrigger_of_active_animation_is_a_noop() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("sit", RawAnimation::begin().then_loop("walk"));
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.1);
        let before = ctrl.snapshot();
        assert!(ctrl.try_trigger("sit"));
        assert_eq!(ctrl.snapshot(), before);
    }

    #[test]
    fn retrigger_restarts_when_enabled() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .restart_on_retrigger(true)
            .triggerable("sit", RawAnimation::begin().then_loop("walk"));
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.4);
        approx(ctrl.clip_time().unwrap(), 0.4);
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.1);
        approx(ctrl.clip_time().unwrap(), 0.1);
    }

    #[test]
    fn last_trigger_before_advance_wins() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("jump", RawAnimation::begin().then_play("jump"))
            .triggerable("sit", RawAnimation::begin().then_play_and_hold("sit"));
        ctrl.try_trigger("jump");
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("sit"));
    }

    #[test]
    fn missing_clip_keeps_prior_state() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("walk", RawAnimation::begin().then_loop("walk"))
            .triggerable("fly", RawAnimation::begin().then_loop("fly"));
        ctrl.try_trigger("walk");
        step(&mut ctrl, &lib, 0.2);
        ctrl.try_trigger("fly");
        let out = step(&mut ctrl, &lib, 0.2);
        assert_eq!(ctrl.current_clip_name(), Some("walk"));
        approx(ctrl.clip_time().unwrap(), 0.4);
        assert!(!out.changed);
    }

    #[test]
    fn play_once_stages_fall_through_then_hand_back() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("jump", RawAnimation::begin().then_play("jump").then_play("land"))
            .with_state_handler(|_| Some(RawAnimation::begin().then_loop("idle")));
        step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("idle"));

        ctrl.try_trigger("jump");
        step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("jump"));

        let out = step(&mut ctrl, &lib, 0.6);
        assert!(out.changed);
        assert_eq!(ctrl.current_clip_name(), Some("land"));
        approx(ctrl.clip_time().unwrap(), 0.1);

        step(&mut ctrl, &lib, 0.2);
        assert!(ctrl.is_finished());
        assert_eq!(ctrl.triggered_animation(), None);

        step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("idle"));
    }

    #[test]
    fn hold_on_last_frame_keeps_trigger_active() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("sit", RawAnimation::begin().then_play_and_hold("sit"));
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.0);
        step(&mut ctrl, &lib, 1.0);
        assert!(ctrl.is_finished());
        approx(ctrl.clip_time().unwrap(), 0.5);
        assert_eq!(ctrl.triggered_animation(), Some("sit"));
        assert!(ctrl.stop_triggered_animation());
        assert_eq!(ctrl.state(), ControllerState::Stopped);
    }

    #[test]
    fn handler_hold_stays_on_last_frame() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_state_handler(|_| Some(RawAnimation::begin().then_play_and_hold("sit")));
        step(&mut ctrl, &lib, 0.6);
        assert!(ctrl.is_finished());
        approx(ctrl.clip_time().unwrap(), 0.5);

        let out = step(&mut ctrl, &lib, 0.1);
        assert!(!out.changed);
        assert!(ctrl.is_finished());
        approx(ctrl.clip_time().unwrap(), 0.5);
        approx(out.pose.unwrap().get("body").unwrap().position[0], 3.0);
    }

    #[test]
    fn handler_replays_finished_play_once() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_state_handler(|_| Some(RawAnimation::begin().then_play("jump")));
        step(&mut ctrl, &lib, 0.6);
        assert!(ctrl.is_finished());
        let out = step(&mut ctrl, &lib, 0.1);
        assert!(out.changed);
        approx(ctrl.clip_time().unwrap(), 0.1);
    }

    #[test]
    fn superseded_request_keeps_active_trigger_running() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .triggerable("walk", RawAnimation::begin().then_loop("walk"))
            .triggerable("jump", RawAnimation::begin().then_play("jump"));
        ctrl.try_trigger("walk");
        step(&mut ctrl, &lib, 0.4);
        approx(ctrl.clip_time().unwrap(), 0.4);

        assert!(ctrl.try_trigger("jump"));
        assert!(ctrl.try_trigger("walk"));
        assert_eq!(ctrl.pending_trigger(), None);
        step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("walk"));
        approx(ctrl.clip_time().unwrap(), 0.4);
    }

    #[test]
    fn interrupted_transition_blends_from_current_pose() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_transition(1.0, Easing::Linear)
            .triggerable("walk", RawAnimation::begin().then_loop("walk"))
            .triggerable("sit", RawAnimation::begin().then_play_and_hold("sit"))
            .triggerable("jump", RawAnimation::begin().then_play("jump"));
        ctrl.try_trigger("walk");
        step(&mut ctrl, &lib, 1.0);
        ctrl.try_trigger("sit");
        step(&mut ctrl, &lib, 0.5);
        approx(ctrl.transition_weight().unwrap(), 0.5);

        // walk (x=1) → sit (x=3) is at x=2 when jump (x=4) arrives.
        ctrl.try_trigger("jump");
        let out = step(&mut ctrl, &lib, 0.0);
        assert_eq!(ctrl.current_clip_name(), Some("jump"));
        approx(out.pose.unwrap().get("body").unwrap().position[0], 2.0);

        step(&mut ctrl, &lib, 0.5);
        let out = step(&mut ctrl, &lib, 0.0);
        approx(out.pose.unwrap().get("body").unwrap().position[0], 3.0);
    }

    #[test]
    fn step_transition_holds_outgoing_pose() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_transition(1.0, Easing::Step)
            .triggerable("walk", RawAnimation::begin().then_loop("walk"));
        ctrl.try_trigger("walk");
        for dt in [0.5, 0.25, 0.25] {
            let out = step(&mut ctrl, &lib, dt);
            approx(out.pose.unwrap().get("body").unwrap().position[0], 0.0);
        }
        assert_eq!(ctrl.state(), ControllerState::Running);
        let out = step(&mut ctrl, &lib, 0.0);
        approx(out.pose.unwrap().get("body").unwrap().position[0], 1.0);
    }

    #[test]
    fn ease_in_transition_lags_linear() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_transition(1.0, Easing::EaseIn)
            .triggerable("walk", RawAnimation::begin().then_loop("walk"));
        ctrl.try_trigger("walk");
        step(&mut ctrl, &lib, 0.5);
        let out = step(&mut ctrl, &lib, 0.0);
        let x = out.pose.unwrap().get("body").unwrap().position[0];
        assert!(x > 0.0 && x < 0.5, "x={x}");
        approx(ctrl.transition_weight().unwrap(), x);
    }

    #[test]
    fn transition_blends_and_clears() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_transition(1.0, Easing::Linear)
            .triggerable("walk", RawAnimation::begin().then_loop("walk"))
            .triggerable("jump", RawAnimation::begin().then_play_and_hold("sit"));
        ctrl.try_trigger("walk");
        // From rest: first frame has weight 0.
        let out = step(&mut ctrl, &lib, 0.5);
        assert_eq!(ctrl.state(), ControllerState::Transitioning);
        approx(out.pose.unwrap().get("body").unwrap().position[0], 0.0);

        let out = step(&mut ctrl, &lib, 0.5);
        approx(out.pose.unwrap().get("body").unwrap().position[0], 0.5);
        assert_eq!(ctrl.state(), ControllerState::Running);

        ctrl.try_trigger("jump");
        step(&mut ctrl, &lib, 0.25);
        let out = step(&mut ctrl, &lib, 0.25);
        // walk (x=1) → sit (x=3) at weight 0.25
        approx(out.pose.unwrap().get("body").unwrap().position[0], 1.5);
        approx(ctrl.transition_weight().unwrap(), 0.5);
    }

    #[test]
    fn handler_returning_none_stops() {
        let lib = library();
        let mut on = true;
        let mut ctrl = AnimationController::new("main").with_state_handler(move |_| {
            let out = on.then(|| RawAnimation::clip("walk"));
            on = false;
            out
        });
        step(&mut ctrl, &lib, 0.1);
        assert_eq!(ctrl.state(), ControllerState::Running);
        let out = step(&mut ctrl, &lib, 0.1);
        assert!(out.changed);
        assert!(out.pose.is_none());
        assert_eq!(ctrl.state(), ControllerState::Stopped);
    }

    #[test]
    fn handler_reads_instance_data() {
        const MOVING: DataTicket<bool> = DataTicket::new("test:moving");
        let lib = library();
        let mut ctrl = AnimationController::new("main").with_state_handler(|test| {
            if test.data(&MOVING).copied().unwrap_or(false) {
                Some(RawAnimation::begin().then_loop("walk"))
            } else {
                Some(RawAnimation::begin().then_loop("idle"))
            }
        });
        let mut data = DataStore::new();
        ctrl.advance(0.1, &lib, &data, &FrameContext::default());
        assert_eq!(ctrl.current_clip_name(), Some("idle"));
        data.set(&MOVING, true);
        ctrl.advance(0.1, &lib, &data, &FrameContext::default());
        assert_eq!(ctrl.current_clip_name(), Some("walk"));
    }

    #[test]
    fn speed_scales_time() {
        let lib = library();
        let mut ctrl = AnimationController::new("main")
            .with_speed(2.0)
            .with_state_handler(|_| Some(RawAnimation::begin().then_loop("idle")));
        step(&mut ctrl, &lib, 0.25);
        approx(ctrl.clip_time().unwrap(), 0.5);
    }
}
