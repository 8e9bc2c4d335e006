//! Per-instance animation state: named controllers plus the synced data store.
//!
//! A manager is created lazily by an instance cache the first time its id is
//! seen and lives exactly as long as that cache entry.

use indexmap::IndexMap;
use serde::Serialize;

use crate::controller::{AnimationController, ControllerSnapshot};
use crate::data::AnimationLibrary;
use crate::data_ticket::{DataStore, DataTicket};
use crate::error::AnimationError;
use crate::sampling::{apply_pose, Pose};
use crate::skeleton::Skeleton;

/// Per-frame timing supplied by the host renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FrameContext {
    /// Host clock in seconds. Only differences between frames matter.
    pub time_secs: f64,
    /// Fraction of the current game tick elapsed, in `[0, 1)`.
    pub partial_tick: f32,
    /// Second pass over an already-animated frame (shadows, outlines, ...).
    pub is_re_render: bool,
}

impl FrameContext {
    pub fn at(time_secs: f64) -> Self {
        Self {
            time_secs,
            ..Self::default()
        }
    }

    pub fn re_render(mut self) -> Self {
        self.is_re_render = true;
        self
    }
}

/// Outcome of one manager advance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagerStep {
    pub changed: bool,
    /// Merged pose of all controllers; later-registered controllers win on
    /// bones animated by more than one controller.
    pub pose: Pose,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManagerSnapshot {
    pub data_tickets: Vec<&'static str>,
    pub controllers: Vec<ControllerSnapshot>,
}

#[derive(Debug, Default)]
pub struct AnimatableManager {
    controllers: IndexMap<String, AnimationController>,
    data: DataStore,
    last_update_time: Option<f64>,
}

impl AnimatableManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_controllers<I>(controllers: I) -> Self
    where
        I: IntoIterator<Item = AnimationController>,
    {
        let mut manager = Self::new();
        for controller in controllers {
            manager.add_controller(controller);
        }
        manager
    }

    /// Register a controller. A controller with the same name is replaced in place.
    pub fn add_controller(&mut self, controller: AnimationController) {
        let name = controller.name().to_string();
        if self.controllers.insert(name.clone(), controller).is_some() {
            log::debug!("replaced animation controller '{name}'");
        }
    }

    pub fn controller(&self, name: &str) -> Option<&AnimationController> {
        self.controllers.get(name)
    }

    pub fn controller_mut(&mut self, name: &str) -> Option<&mut AnimationController> {
        self.controllers.get_mut(name)
    }

    /// Controllers in registration order.
    pub fn controllers(&self) -> impl Iterator<Item = &AnimationController> {
        self.controllers.values()
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn set_data<D: std::any::Any + Send + Sync>(&mut self, ticket: &DataTicket<D>, value: D) {
        self.data.set(ticket, value);
    }

    pub fn data<D: std::any::Any + Send + Sync>(&self, ticket: &DataTicket<D>) -> Option<&D> {
        self.data.get(ticket)
    }

    pub fn try_data<D: std::any::Any + Send + Sync>(
        &self,
        ticket: &DataTicket<D>,
    ) -> Result<Option<&D>, AnimationError> {
        self.data.try_get(ticket)
    }

    pub fn data_store(&self) -> &DataStore {
        &self.data
    }

    pub fn data_store_mut(&mut self) -> &mut DataStore {
        &mut self.data
    }

    /// Request a triggerable animation.
    ///
    /// With a controller name only that controller is asked. Without one the
    /// first controller, in registration order, that declares `anim` takes it.
    pub fn try_trigger_animation(&mut self, controller: Option<&str>, anim: &str) -> bool {
        match controller {
            Some(name) => match self.controllers.get_mut(name) {
                Some(ctrl) => ctrl.try_trigger(anim),
                None => {
                    log::debug!("no animation controller named '{name}'");
                    false
                }
            },
            None => {
                let found = self
                    .controllers
                    .values_mut()
                    .find(|ctrl| ctrl.has_triggerable(anim));
                match found {
                    Some(ctrl) => ctrl.try_trigger(anim),
                    None => {
                        log::debug!("no controller declares triggerable animation '{anim}'");
                        false
                    }
                }
            }
        }
    }

    /// Checked form of [`Self::try_trigger_animation`] for callers that
    /// need to know why a request went nowhere.
    pub fn trigger_animation(&mut self, controller: Option<&str>, anim: &str) -> Result<(), AnimationError> {
        if let Some(name) = controller {
            let ctrl = self
                .controllers
                .get(name)
                .ok_or_else(|| AnimationError::ControllerNotFound { name: name.to_string() })?;
            if !ctrl.has_triggerable(anim) {
                return Err(AnimationError::AnimationNotFound { name: anim.to_string() });
            }
        }
        if self.try_trigger_animation(controller, anim) {
            Ok(())
        } else {
            Err(AnimationError::AnimationNotFound { name: anim.to_string() })
        }
    }

    /// Stop triggered animations on one controller, or on all of them.
    pub fn stop_triggered_animation(&mut self, controller: Option<&str>) -> bool {
        match controller {
            Some(name) => self
                .controllers
                .get_mut(name)
                .is_some_and(|ctrl| ctrl.stop_triggered_animation()),
            None => self
                .controllers
                .values_mut()
                .fold(false, |any, ctrl| ctrl.stop_triggered_animation() | any),
        }
    }

    /// Advance every controller by `dt` seconds.
    pub fn advance(&mut self, dt: f32, library: &AnimationLibrary, frame: &FrameContext) -> ManagerStep {
        let mut out = ManagerStep::default();
        for ctrl in self.controllers.values_mut() {
            let step = ctrl.advance(dt, library, &self.data, frame);
            out.changed |= step.changed;
            if let Some(pose) = step.pose {
                out.pose.overlay(pose);
            }
        }
        out
    }

    /// Render-side entry point: advance by the time elapsed since the last
    /// update and write the resulting pose into `skeleton`.
    ///
    /// Re-render passes leave both the controllers and the skeleton untouched.
    pub fn update(
        &mut self,
        frame: &FrameContext,
        library: &AnimationLibrary,
        skeleton: &mut Skeleton,
    ) -> bool {
        if frame.is_re_render {
            return false;
        }
        let dt = match self.last_update_time {
            Some(last) if frame.time_secs > last => (frame.time_secs - last) as f32,
            _ => 0.0,
        };
        self.last_update_time = Some(frame.time_secs);
        let step = self.advance(dt, library, frame);
        apply_pose(skeleton, &step.pose);
        step.changed
    }

    pub fn last_update_time(&self) -> Option<f64> {
        self.last_update_time
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            data_tickets: self.data.ticket_ids(),
            controllers: self.controllers.values().map(|c| c.snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AnimationClip, BoneAnimation, ClipLoop, Keyframe, KeyframeChannel};
    use crate::raw_animation::RawAnimation;

    const VARIANT: DataTicket<u8> = DataTicket::new("test:variant");

    fn lib() -> AnimationLibrary {
        let mut lib = AnimationLibrary::new();
        for (name, bone, x) in [("wave", "arm", 1.0), ("nod", "head", 2.0), ("flap", "arm", 5.0)] {
            lib.insert(
                AnimationClip::new(name, 1.0, ClipLoop::Loop).with_bone(BoneAnimation {
                    bone: bone.into(),
                    position: KeyframeChannel::new(vec![Keyframe::new(0.0, [x, 0.0, 0.0])]),
                    ..Default::default()
                }),
            )
            .unwrap();
        }
        lib
    }

    fn two_controllers() -> AnimatableManager {
        AnimatableManager::with_controllers([
            AnimationController::new("base")
                .triggerable("wave", RawAnimation::begin().then_loop("wave"))
                .triggerable("nod", RawAnimation::begin().then_loop("nod")),
            AnimationController::new("overlay")
                .triggerable("wave", RawAnimation::begin().then_loop("flap")),
        ])
    }

    #[test]
    fn data_is_last_writer_wins() {
        let mut m = AnimatableManager::new();
        assert_eq!(m.data(&VARIANT), None);
        m.set_data(&VARIANT, 1);
        m.set_data(&VARIANT, 2);
        assert_eq!(m.data(&VARIANT), Some(&2));
    }

    #[test]
    fn unnamed_trigger_takes_first_registered_match() {
        let mut m = two_controllers();
        assert!(m.try_trigger_animation(None, "wave"));
        assert_eq!(m.controller("base").unwrap().pending_trigger(), Some("wave"));
        assert_eq!(m.controller("overlay").unwrap().pending_trigger(), None);
    }

    #[test]
    fn named_trigger_routes_to_that_controller() {
        let mut m = two_controllers();
        assert!(m.try_trigger_animation(Some("overlay"), "wave"));
        assert_eq!(m.controller("base").unwrap().pending_trigger(), None);
        assert!(!m.try_trigger_animation(Some("missing"), "wave"));
        assert!(!m.try_trigger_animation(Some("overlay"), "nod"));
        assert!(!m.try_trigger_animation(None, "dance"));
    }

    #[test]
    fn checked_trigger_reports_the_miss() {
        let mut m = two_controllers();
        assert_eq!(
            m.trigger_animation(Some("missing"), "wave"),
            Err(AnimationError::ControllerNotFound { name: "missing".into() })
        );
        assert_eq!(
            m.trigger_animation(Some("overlay"), "nod"),
            Err(AnimationError::AnimationNotFound { name: "nod".into() })
        );
        assert_eq!(
            m.trigger_animation(None, "dance"),
            Err(AnimationError::AnimationNotFound { name: "dance".into() })
        );
        assert_eq!(m.trigger_animation(None, "nod"), Ok(()));
        assert_eq!(m.controller("base").unwrap().pending_trigger(), Some("nod"));
    }

    #[test]
    fn later_controllers_override_shared_bones() {
        let lib = lib();
        let mut m = two_controllers();
        m.try_trigger_animation(Some("base"), "wave");
        m.try_trigger_animation(Some("overlay"), "wave");
        let step = m.advance(0.0, &lib, &FrameContext::default());
        assert!(step.changed);
        assert_eq!(step.pose.get("arm").unwrap().position[0], 5.0);
    }

    #[test]
    fn update_derives_dt_and_skips_re_render() {
        let lib = lib();
        let mut skeleton = Skeleton::builder().bone("arm", None).unwrap().build();
        let mut m = two_controllers();
        m.try_trigger_animation(Some("base"), "wave");
        assert!(m.update(&FrameContext::at(10.0), &lib, &mut skeleton));
        assert_eq!(m.controller("base").unwrap().clip_time(), Some(0.0));

        assert!(!m.update(&FrameContext::at(10.25).re_render(), &lib, &mut skeleton));
        assert_eq!(m.controller("base").unwrap().clip_time(), Some(0.0));

        m.update(&FrameContext::at(10.5), &lib, &mut skeleton);
        let t = m.controller("base").unwrap().clip_time().unwrap();
        assert!((t - 0.5).abs() < 1e-5);
        assert_eq!(skeleton.bone("arm").unwrap().transform().position[0], 1.0);
    }

    #[test]
    fn stop_all_triggered() {
        let lib = lib();
        let mut m = two_controllers();
        m.try_trigger_animation(Some("base"), "nod");
        m.advance(0.0, &lib, &FrameContext::default());
        assert!(m.stop_triggered_animation(None));
        assert!(!m.stop_triggered_animation(Some("base")));
        assert!(m.advance(0.0, &lib, &FrameContext::default()).pose.is_empty());
    }
}
