use std::collections::BTreeMap;

use log::debug;

use crate::coords::{ColorRgba, Rect};

use super::controls::{ControlCommand, Controls};
use super::state::InputState;

/// Virtual keys of the on-screen touch pad.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TouchKey {
    Start,
    Left,
    Right,
    Up,
    Down,
    Run,
    Jump,
    AltRun,
    AltJump,
    Drop,
    HoldRun,
    ToggleKeysView,
}

impl TouchKey {
    pub const COUNT: usize = 12;

    pub const ALL: [TouchKey; TouchKey::COUNT] = [
        TouchKey::Start,
        TouchKey::Left,
        TouchKey::Right,
        TouchKey::Up,
        TouchKey::Down,
        TouchKey::Run,
        TouchKey::Jump,
        TouchKey::AltRun,
        TouchKey::AltJump,
        TouchKey::Drop,
        TouchKey::HoldRun,
        TouchKey::ToggleKeysView,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Player command driven by this key, if any.
    pub fn command(self) -> Option<ControlCommand> {
        Some(match self {
            TouchKey::Start => ControlCommand::Start,
            TouchKey::Left => ControlCommand::Left,
            TouchKey::Right => ControlCommand::Right,
            TouchKey::Up => ControlCommand::Up,
            TouchKey::Down => ControlCommand::Down,
            TouchKey::Run => ControlCommand::Run,
            TouchKey::Jump => ControlCommand::Jump,
            TouchKey::AltRun => ControlCommand::AltRun,
            TouchKey::AltJump => ControlCommand::AltJump,
            TouchKey::Drop => ControlCommand::Drop,
            TouchKey::HoldRun | TouchKey::ToggleKeysView => return None,
        })
    }
}

/// Hit box of one key on the virtual canvas, edges inclusive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyPos {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub key: TouchKey,
}

/// Touch key hit boxes on a virtual canvas independent of the screen size.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchKeyMap {
    canvas_w: f32,
    canvas_h: f32,
    keys: [KeyPos; TouchKey::COUNT],
}

const fn pos(x1: f32, y1: f32, x2: f32, y2: f32, key: TouchKey) -> KeyPos {
    KeyPos { x1, y1, x2, y2, key }
}

impl Default for TouchKeyMap {
    fn default() -> Self {
        Self::new(
            1024.0,
            600.0,
            [
                pos(331.0, 537.0, 482.0, 587.0, TouchKey::Start),
                pos(1.0, 328.0, 91.0, 498.0, TouchKey::Left),
                pos(171.0, 328.0, 261.0, 498.0, TouchKey::Right),
                pos(1.0, 328.0, 261.0, 418.0, TouchKey::Up),
                pos(1.0, 498.0, 261.0, 588.0, TouchKey::Down),
                pos(807.0, 431.0, 914.0, 522.0, TouchKey::Run),
                pos(898.0, 396.0, 1005.0, 487.0, TouchKey::Jump),
                pos(807.0, 325.0, 914.0, 416.0, TouchKey::AltRun),
                pos(898.0, 290.0, 1005.0, 381.0, TouchKey::AltJump),
                pos(542.0, 537.0, 693.0, 587.0, TouchKey::Drop),
                pos(807.0, 150.0, 914.0, 180.0, TouchKey::HoldRun),
                pos(10.0, 10.0, 70.0, 70.0, TouchKey::ToggleKeysView),
            ],
        )
    }
}

impl TouchKeyMap {
    /// # Panics
    ///
    /// If `keys` is not ordered like [`TouchKey::ALL`].
    pub fn new(canvas_w: f32, canvas_h: f32, keys: [KeyPos; TouchKey::COUNT]) -> Self {
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(k.key.index(), i, "touch key table out of order at {:?}", k.key);
        }
        Self { canvas_w, canvas_h, keys }
    }

    pub fn canvas_size(&self) -> (f32, f32) {
        (self.canvas_w, self.canvas_h)
    }

    pub fn set_canvas_size(&mut self, width: f32, height: f32) {
        self.canvas_w = width;
        self.canvas_h = height;
    }

    pub fn key_pos(&self, key: TouchKey) -> KeyPos {
        self.keys[key.index()]
    }

    pub fn set_key_pos(&mut self, key: TouchKey, left: f32, top: f32, right: f32, bottom: f32) {
        self.keys[key.index()] = pos(left, top, right, bottom, key);
    }

    /// Marks the keys under a normalized point in `held`; returns how many.
    pub fn find_touch_keys(&self, x: f32, y: f32, held: &mut [bool; TouchKey::COUNT]) -> usize {
        let x = x * self.canvas_w;
        let y = y * self.canvas_h;
        let mut count = 0;
        for p in &self.keys {
            let hit = x >= p.x1 && x <= p.x2 && y >= p.y1 && y <= p.y2;
            held[p.key.index()] = hit;
            count += usize::from(hit);
        }
        count
    }
}

/// One contact reported by a touch device, normalized to 0..1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FingerSample {
    /// Negative ids are invalid.
    pub id: i64,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

impl FingerSample {
    fn is_valid(&self) -> bool {
        self.id >= 0 && self.x.is_finite() && self.y.is_finite()
    }
}

/// Polled touch hardware.
pub trait TouchSource {
    fn device_count(&self) -> usize;

    fn fingers(&self, device: usize) -> Vec<FingerSample>;
}

/// Window touches tracked by the runtime count as one device once any touch
/// has been seen.
impl TouchSource for InputState {
    fn device_count(&self) -> usize {
        usize::from(self.touch_seen)
    }

    fn fingers(&self, device: usize) -> Vec<FingerSample> {
        if device != 0 {
            return Vec::new();
        }
        self.touches
            .iter()
            .map(|(&id, &(x, y))| FingerSample {
                id: i64::try_from(id).unwrap_or(-1),
                x,
                y,
                pressure: 1.0,
            })
            .collect()
    }
}

/// Touch-only keys and their single-poll pulses.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ExtraKeys {
    pub run_once: bool,
    pub alt_run_once: bool,
    pub hold_run: bool,
    pub hold_run_once: bool,
    pub toggle_view: bool,
    pub toggle_view_once: bool,
}

#[derive(Debug, Copy, Clone, Default)]
struct FingerState {
    alive: bool,
    held: [bool; TouchKey::COUNT],
    held_prev: [bool; TouchKey::COUNT],
}

/// Turns finger positions into held commands.
///
/// Each finger remembers the keys it held in the previous poll, so a key
/// turns off only when the finger that pressed it leaves. Fingers touching no
/// key are dropped. The first device that presses a key is locked in for the
/// rest of the session.
#[derive(Debug, Clone)]
pub struct TouchScreenController {
    map: TouchKeyMap,
    enabled: bool,
    fingers: BTreeMap<i64, FingerState>,
    keys: Controls,
    extra: ExtraKeys,
    touch_hidden: bool,
    run_held: bool,
    actual_device: Option<usize>,
}

impl Default for TouchScreenController {
    fn default() -> Self {
        Self::new(TouchKeyMap::default())
    }
}

impl TouchScreenController {
    pub fn new(map: TouchKeyMap) -> Self {
        Self {
            map,
            enabled: true,
            fingers: BTreeMap::new(),
            keys: Controls::default(),
            extra: ExtraKeys::default(),
            touch_hidden: false,
            run_held: false,
            actual_device: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn map(&self) -> &TouchKeyMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut TouchKeyMap {
        &mut self.map
    }

    pub fn touch_supported(&self, source: &dyn TouchSource) -> bool {
        self.enabled && source.device_count() > 0
    }

    /// Commands currently held through touch.
    pub fn keys(&self) -> Controls {
        self.keys
    }

    pub fn extra(&self) -> ExtraKeys {
        self.extra
    }

    pub fn touch_hidden(&self) -> bool {
        self.touch_hidden
    }

    pub fn run_held(&self) -> bool {
        self.run_held
    }

    pub fn locked_device(&self) -> Option<usize> {
        self.actual_device
    }

    /// Polls `source` and writes the held commands into `controls`.
    ///
    /// Touch only ever sets commands; run is forced while hold-run is on.
    pub fn update(&mut self, source: &dyn TouchSource, controls: &mut Controls) {
        if !self.touch_supported(source) {
            return;
        }

        match self.actual_device {
            Some(dev) if dev < source.device_count() => self.process_device(source, dev),
            Some(dev) => {
                debug!("touch device {dev} went away");
                self.release_all();
            }
            None => {
                for dev in 0..source.device_count() {
                    self.process_device(source, dev);
                    if self.actual_device.is_some() {
                        break;
                    }
                }
            }
        }

        for cmd in ControlCommand::ALL {
            if self.keys.get(cmd) {
                controls.set(cmd, true);
            }
        }
        if self.run_held {
            controls.run = true;
        }
    }

    fn process_device(&mut self, source: &dyn TouchSource, dev: usize) {
        let prev_keys = self.keys;
        let prev_extra = self.extra;

        for finger in self.fingers.values_mut() {
            finger.alive = false;
        }

        for sample in source.fingers(dev) {
            if !sample.is_valid() {
                debug!("skipping malformed touch sample {sample:?}");
                continue;
            }

            let mut held = [false; TouchKey::COUNT];
            let hits = self.map.find_touch_keys(sample.x, sample.y, &mut held);
            let mut finger = self.fingers.get(&sample.id).copied();
            let known = finger.is_some();
            let fs = finger.get_or_insert_with(FingerState::default);
            fs.held = held;

            for key in self.active_keys() {
                let i = key.index();
                if fs.held_prev[i] && !fs.held[i] {
                    self.set_key(key, false);
                    fs.held_prev[i] = false;
                } else if fs.held[i] {
                    self.set_key(key, true);
                    fs.held_prev[i] = true;
                    if self.actual_device.is_none() {
                        self.actual_device = Some(dev);
                    }
                }
            }
            fs.alive = hits > 0;

            if known || fs.alive {
                self.fingers.insert(sample.id, *fs);
            }
        }

        let dead: Vec<i64> = self
            .fingers
            .iter()
            .filter(|(_, f)| !f.alive)
            .map(|(&id, _)| id)
            .collect();
        for id in dead {
            self.fingers.remove(&id);
            for key in TouchKey::ALL {
                self.set_key(key, false);
            }
        }

        self.extra.run_once = self.keys.run && !prev_keys.run;
        self.extra.alt_run_once = self.keys.alt_run && !prev_keys.alt_run;
        self.extra.hold_run_once = self.extra.hold_run && !prev_extra.hold_run;
        self.extra.toggle_view_once = self.extra.toggle_view && !prev_extra.toggle_view;

        if self.extra.toggle_view_once {
            self.touch_hidden = !self.touch_hidden;
        }
        if self.extra.hold_run_once {
            self.run_held = !self.run_held;
        }
    }

    fn active_keys(&self) -> Vec<TouchKey> {
        if self.touch_hidden {
            vec![TouchKey::ToggleKeysView]
        } else {
            TouchKey::ALL.to_vec()
        }
    }

    fn set_key(&mut self, key: TouchKey, on: bool) {
        match key.command() {
            Some(cmd) => self.keys.set(cmd, on),
            None if key == TouchKey::HoldRun => self.extra.hold_run = on,
            None => self.extra.toggle_view = on,
        }
    }

    fn release_all(&mut self) {
        self.fingers.clear();
        self.keys = Controls::default();
        self.extra = ExtraKeys::default();
    }

    /// Key overlay scaled to a `screen_w × screen_h` area: one translucent
    /// box per visible key, the hold-run key green while run is held.
    pub fn overlay(&self, screen_w: u32, screen_h: u32) -> Vec<(Rect, ColorRgba)> {
        let (cw, ch) = self.map.canvas_size();
        let sx = screen_w as f32 / cw;
        let sy = screen_h as f32 / ch;

        self.active_keys()
            .into_iter()
            .map(|key| {
                let k = self.map.key_pos(key);
                let x1 = (k.x1 * sx).round();
                let y1 = (k.y1 * sy).round();
                let x2 = (k.x2 * sx).round();
                let y2 = (k.y2 * sy).round();
                let color = if key == TouchKey::HoldRun && self.run_held {
                    ColorRgba::new(0.0, 1.0, 0.0, 0.3)
                } else {
                    ColorRgba::new(1.0, 0.0, 0.0, 0.3)
                };
                (Rect::new(x1, y1, x2 - x1, y2 - y1), color)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Fingers {
        devices: Vec<Vec<FingerSample>>,
    }

    impl Fingers {
        fn one(samples: &[(i64, f32, f32)]) -> Self {
            Self {
                devices: vec![samples.iter().map(|&(id, x, y)| finger(id, x, y)).collect()],
            }
        }
    }

    impl TouchSource for Fingers {
        fn device_count(&self) -> usize {
            self.devices.len()
        }

        fn fingers(&self, device: usize) -> Vec<FingerSample> {
            self.devices.get(device).cloned().unwrap_or_default()
        }
    }

    fn finger(id: i64, x: f32, y: f32) -> FingerSample {
        FingerSample { id, x, y, pressure: 1.0 }
    }

    /// Normalized centre of a key on the default canvas.
    fn centre(key: TouchKey) -> (f32, f32) {
        let map = TouchKeyMap::default();
        let k = map.key_pos(key);
        ((k.x1 + k.x2) / 2.0 / 1024.0, (k.y1 + k.y2) / 2.0 / 600.0)
    }

    fn poll(tc: &mut TouchScreenController, source: &Fingers) -> Controls {
        let mut c = Controls::default();
        tc.update(source, &mut c);
        c
    }

    // ── key map ───────────────────────────────────────────────────────────

    #[test]
    fn hit_boxes_may_overlap() {
        let map = TouchKeyMap::default();
        let mut held = [false; TouchKey::COUNT];

        // Left and Up share the top-left corner of the d-pad.
        assert_eq!(map.find_touch_keys(50.0 / 1024.0, 370.0 / 600.0, &mut held), 2);
        assert!(held[TouchKey::Left.index()] && held[TouchKey::Up.index()]);

        assert_eq!(map.find_touch_keys(0.5, 0.1, &mut held), 0);
        assert!(held.iter().all(|h| !h));
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn misordered_table_is_rejected() {
        let mut keys = TouchKeyMap::default().keys;
        keys.swap(0, 1);
        let _ = TouchKeyMap::new(1024.0, 600.0, keys);
    }

    // ── controller ────────────────────────────────────────────────────────

    #[test]
    fn held_key_sets_its_command() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::Jump);
        let c = poll(&mut tc, &Fingers::one(&[(1, x, y)]));
        assert!(c.jump);
        assert!(!c.run);
        assert_eq!(tc.locked_device(), Some(0));
    }

    #[test]
    fn run_pulse_fires_on_the_entry_poll_only() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::Run);
        let down = Fingers::one(&[(7, x, y)]);

        poll(&mut tc, &down);
        assert!(tc.extra().run_once);
        poll(&mut tc, &down);
        assert!(!tc.extra().run_once);
        assert!(tc.keys().run);

        poll(&mut tc, &Fingers::one(&[]));
        assert!(!tc.keys().run);
        assert!(!tc.extra().run_once);
    }

    #[test]
    fn sliding_off_a_key_releases_it() {
        let mut tc = TouchScreenController::default();
        let (lx, ly) = centre(TouchKey::Left);
        let (rx, ry) = centre(TouchKey::Right);

        poll(&mut tc, &Fingers::one(&[(3, lx, ly)]));
        let c = poll(&mut tc, &Fingers::one(&[(3, rx, ry)]));
        assert!(c.right);
        assert!(!c.left);
    }

    #[test]
    fn finger_leaving_every_key_is_dropped() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::Drop);
        poll(&mut tc, &Fingers::one(&[(2, x, y)]));
        let c = poll(&mut tc, &Fingers::one(&[(2, 0.5, 0.1)]));
        assert!(!c.drop);
        assert!(tc.fingers.is_empty());
    }

    #[test]
    fn hold_run_toggles_and_forces_run() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::HoldRun);

        poll(&mut tc, &Fingers::one(&[(1, x, y)]));
        assert!(tc.run_held());
        poll(&mut tc, &Fingers::one(&[(1, x, y)]));
        assert!(tc.run_held());

        let c = poll(&mut tc, &Fingers::one(&[]));
        assert!(c.run);

        poll(&mut tc, &Fingers::one(&[(1, x, y)]));
        assert!(!tc.run_held());
    }

    #[test]
    fn hidden_mode_only_listens_to_the_toggle() {
        let mut tc = TouchScreenController::default();
        let (tx, ty) = centre(TouchKey::ToggleKeysView);
        let (jx, jy) = centre(TouchKey::Jump);

        poll(&mut tc, &Fingers::one(&[(1, tx, ty)]));
        assert!(tc.touch_hidden());
        poll(&mut tc, &Fingers::one(&[]));

        let c = poll(&mut tc, &Fingers::one(&[(2, jx, jy)]));
        assert!(!c.jump);
        assert_eq!(tc.overlay(1024, 600).len(), 1);

        poll(&mut tc, &Fingers::one(&[]));
        poll(&mut tc, &Fingers::one(&[(1, tx, ty)]));
        assert!(!tc.touch_hidden());
    }

    #[test]
    fn malformed_samples_are_skipped() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::Start);
        let c = poll(&mut tc, &Fingers::one(&[(-1, x, y), (4, f32::NAN, y)]));
        assert!(!c.any_held());
    }

    #[test]
    fn first_active_device_is_locked() {
        let mut tc = TouchScreenController::default();
        let (x, y) = centre(TouchKey::Jump);
        let source = Fingers {
            devices: vec![vec![finger(1, 0.5, 0.1)], vec![finger(1, x, y)]],
        };
        assert!(poll(&mut tc, &source).jump);
        assert_eq!(tc.locked_device(), Some(1));

        let gone = Fingers { devices: vec![vec![]] };
        assert!(!poll(&mut tc, &gone).jump);
    }

    #[test]
    fn disabled_or_absent_touch_writes_nothing() {
        let mut tc = TouchScreenController::default();
        assert!(!poll(&mut tc, &Fingers::default()).any_held());

        tc.set_enabled(false);
        let (x, y) = centre(TouchKey::Jump);
        assert!(!poll(&mut tc, &Fingers::one(&[(1, x, y)])).jump);
    }

    // ── overlay ───────────────────────────────────────────────────────────

    #[test]
    fn overlay_scales_the_canvas_to_the_screen() {
        let tc = TouchScreenController::default();
        let boxes = tc.overlay(512, 300);
        assert_eq!(boxes.len(), TouchKey::COUNT);
        let (toggle, _) = boxes[TouchKey::ToggleKeysView.index()];
        assert_eq!(toggle, Rect::new(5.0, 5.0, 30.0, 30.0));
    }

    #[test]
    fn window_touches_feed_the_controller() {
        use crate::input::{InputEvent, InputFrame, TouchEvent, TouchPhase};

        let mut state = InputState::default();
        assert_eq!(state.device_count(), 0);

        let (x, y) = centre(TouchKey::Jump);
        state.apply_event(
            &mut InputFrame::default(),
            InputEvent::Touch(TouchEvent { id: 9, phase: TouchPhase::Started, x, y }),
        );
        let mut tc = TouchScreenController::default();
        let mut c = Controls::default();
        tc.update(&state, &mut c);
        assert!(c.jump);
    }
}
