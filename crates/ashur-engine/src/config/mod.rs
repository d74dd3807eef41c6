//! Engine configuration.
//!
//! Settings are read from an INI file. Every value has a safe default so the
//! engine can start without a config file; missing keys keep their defaults and
//! unparsable values are logged and ignored.
//!
//! # Configuration File Format
//!
//! ```ini
//! [screen]
//! width = 800
//! height = 600
//! layout = single
//! swap_screens = false
//! max_3d_offset = 20
//!
//! [window]
//! width = 800
//! height = 600
//! title = ashur
//! vsync = true
//!
//! [timer]
//! tick_rate = 64.1
//! max_catch_up = 5
//! frame_skip = true
//!
//! [textures]
//! max_texture_rows = 1024
//! low_water_bytes = 4194304
//! video_memory_bytes = 134217728
//!
//! [touch]
//! enabled = true
//! canvas_width = 1024
//! canvas_height = 600
//!
//! [joystick]
//! enabled = true
//! deadzone = 0.25
//!
//! [joystick.0]
//! jump = button:0
//! left = axis:0:-
//!
//! [players]
//! count = 1
//! source1 = keyboard
//! source2 = joystick:0
//!
//! [log]
//! filter = info
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use configparser::ini::Ini;
use log::{info, warn};

use crate::input::PlayerSource;
use crate::render::LayoutKind;

/// Highest number of local players the front-end tracks.
pub const MAX_PLAYERS: usize = 4;

const DEFAULT_SCREEN_WIDTH: u32 = 800;
const DEFAULT_SCREEN_HEIGHT: u32 = 600;
const DEFAULT_MAX_3D_OFFSET: f32 = 20.0;
const DEFAULT_TICK_RATE: f64 = 64.1;
/// Slowest accepted `[timer] tick_rate`.
pub const MIN_TICK_RATE: f64 = 1.0;
const DEFAULT_MAX_CATCH_UP: u32 = 5;
const DEFAULT_TEXTURE_ROWS: u32 = 1024;
const DEFAULT_LOW_WATER: u64 = 4 * 1024 * 1024;
const DEFAULT_VIDEO_MEMORY: u64 = 128 * 1024 * 1024;
const DEFAULT_TOUCH_CANVAS: (u32, u32) = (1024, 600);
const DEFAULT_DEADZONE: f32 = 0.25;

const JOYSTICK_DEVICE_PREFIX: &str = "joystick.";

/// Logical screen and display layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    /// Logical canvas the game draws into.
    pub width: u32,
    pub height: u32,
    pub layout: LayoutKind,
    /// Show the game on the secondary display (dual layout only).
    pub swap_screens: bool,
    /// Maximum stereoscopic parallax in screen pixels.
    pub max_3d_offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimerConfig {
    /// Logic ticks per second.
    pub tick_rate: f64,
    /// Ticks run per frame before the rest of the backlog is dropped.
    pub max_catch_up: u32,
    /// Skip rendering on frames that hit the catch-up cap.
    pub frame_skip: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureConfig {
    /// Tallest texture a single picture chunk may use.
    pub max_texture_rows: u32,
    /// Eviction starts when free video memory drops below this.
    pub low_water_bytes: u64,
    /// Budget tracked by the backend's memory ledger.
    pub video_memory_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchConfig {
    pub enabled: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoystickConfig {
    pub enabled: bool,
    pub deadzone: f32,
    /// Raw `command = input` entries per device index, parsed by the input
    /// front-end.
    pub devices: BTreeMap<usize, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayersConfig {
    pub count: usize,
    pub sources: [PlayerSource; MAX_PLAYERS],
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub screen: ScreenConfig,
    pub window: WindowConfig,
    pub timer: TimerConfig,
    pub textures: TextureConfig,
    pub touch: TouchConfig,
    pub joystick: JoystickConfig,
    pub players: PlayersConfig,
    /// `env_logger` filter; `None` defers to `RUST_LOG`.
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Configuration with safe default values.
    pub fn new() -> Self {
        Self {
            screen: ScreenConfig {
                width: DEFAULT_SCREEN_WIDTH,
                height: DEFAULT_SCREEN_HEIGHT,
                layout: LayoutKind::Single,
                swap_screens: false,
                max_3d_offset: DEFAULT_MAX_3D_OFFSET,
            },
            window: WindowConfig {
                width: DEFAULT_SCREEN_WIDTH,
                height: DEFAULT_SCREEN_HEIGHT,
                title: "ashur".to_string(),
                vsync: true,
            },
            timer: TimerConfig {
                tick_rate: DEFAULT_TICK_RATE,
                max_catch_up: DEFAULT_MAX_CATCH_UP,
                frame_skip: true,
            },
            textures: TextureConfig {
                max_texture_rows: DEFAULT_TEXTURE_ROWS,
                low_water_bytes: DEFAULT_LOW_WATER,
                video_memory_bytes: DEFAULT_VIDEO_MEMORY,
            },
            touch: TouchConfig {
                enabled: true,
                canvas_width: DEFAULT_TOUCH_CANVAS.0,
                canvas_height: DEFAULT_TOUCH_CANVAS.1,
            },
            joystick: JoystickConfig {
                enabled: true,
                deadzone: DEFAULT_DEADZONE,
                devices: BTreeMap::new(),
            },
            players: PlayersConfig {
                count: 1,
                sources: [
                    PlayerSource::Keyboard,
                    PlayerSource::Joystick(0),
                    PlayerSource::None,
                    PlayerSource::None,
                ],
            },
            log_filter: None,
        }
    }

    /// Loads a config file on top of the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::new();
        config.load_from_file(path)?;
        Ok(config)
    }

    /// Applies values from an INI file.
    ///
    /// Returns an error if the file cannot be read or parsed; individual bad
    /// values only produce warnings.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("failed to load config file {}", path.display()))?;
        self.apply(&ini);
        info!(
            "loaded config {}: screen {}x{} ({:?}), tick rate {}, {} player(s)",
            path.display(),
            self.screen.width,
            self.screen.height,
            self.screen.layout,
            self.timer.tick_rate,
            self.players.count
        );
        Ok(())
    }

    /// Applies values from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<()> {
        let mut ini = Ini::new();
        ini.read(text.to_string())
            .map_err(|e| anyhow!(e))
            .context("failed to parse config text")?;
        self.apply(&ini);
        Ok(())
    }

    fn apply(&mut self, ini: &Ini) {
        // [screen]
        if let Some(v) = read_uint(ini, "screen", "width") {
            self.screen.width = v;
        }
        if let Some(v) = read_uint(ini, "screen", "height") {
            self.screen.height = v;
        }
        if let Some(v) = read_parsed::<LayoutKind>(ini, "screen", "layout") {
            self.screen.layout = v;
        }
        if let Some(v) = read_bool(ini, "screen", "swap_screens") {
            self.screen.swap_screens = v;
        }
        if let Some(v) = read_float(ini, "screen", "max_3d_offset") {
            self.screen.max_3d_offset = v.max(0.0) as f32;
        }

        // [window]
        if let Some(v) = read_uint(ini, "window", "width") {
            self.window.width = v;
        }
        if let Some(v) = read_uint(ini, "window", "height") {
            self.window.height = v;
        }
        if let Some(v) = ini.get("window", "title") {
            self.window.title = v;
        }
        if let Some(v) = read_bool(ini, "window", "vsync") {
            self.window.vsync = v;
        }

        // [timer]
        if let Some(v) = read_float(ini, "timer", "tick_rate") {
            if v.is_finite() && v >= MIN_TICK_RATE {
                self.timer.tick_rate = v;
            } else {
                warn!(
                    "config [timer] tick_rate must be at least {MIN_TICK_RATE}, got {v}; keeping default"
                );
            }
        }
        if let Some(v) = read_uint(ini, "timer", "max_catch_up") {
            self.timer.max_catch_up = v.max(1);
        }
        if let Some(v) = read_bool(ini, "timer", "frame_skip") {
            self.timer.frame_skip = v;
        }

        // [textures]
        if let Some(v) = read_uint(ini, "textures", "max_texture_rows") {
            self.textures.max_texture_rows = v.max(1);
        }
        if let Some(v) = read_u64(ini, "textures", "low_water_bytes") {
            self.textures.low_water_bytes = v;
        }
        if let Some(v) = read_u64(ini, "textures", "video_memory_bytes") {
            self.textures.video_memory_bytes = v;
        }

        // [touch]
        if let Some(v) = read_bool(ini, "touch", "enabled") {
            self.touch.enabled = v;
        }
        if let Some(v) = read_uint(ini, "touch", "canvas_width") {
            self.touch.canvas_width = v.max(1);
        }
        if let Some(v) = read_uint(ini, "touch", "canvas_height") {
            self.touch.canvas_height = v.max(1);
        }

        // [joystick] and [joystick.N]
        if let Some(v) = read_bool(ini, "joystick", "enabled") {
            self.joystick.enabled = v;
        }
        if let Some(v) = read_float(ini, "joystick", "deadzone") {
            self.joystick.deadzone = v.clamp(0.0, 0.99) as f32;
        }
        for (section, entries) in ini.get_map_ref() {
            let Some(index) = section.strip_prefix(JOYSTICK_DEVICE_PREFIX) else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                warn!("config section [{section}] has no device index; ignored");
                continue;
            };
            let table = self.joystick.devices.entry(index).or_default();
            for (key, value) in entries {
                if let Some(value) = value {
                    table.insert(key.clone(), value.clone());
                }
            }
        }

        // [players]
        if let Some(v) = read_uint(ini, "players", "count") {
            self.players.count = (v as usize).clamp(1, MAX_PLAYERS);
        }
        for (i, source) in self.players.sources.iter_mut().enumerate() {
            let key = format!("source{}", i + 1);
            if let Some(v) = read_parsed::<PlayerSource>(ini, "players", &key) {
                *source = v;
            }
        }

        // [log]
        if let Some(v) = ini.get("log", "filter") {
            self.log_filter = (!v.trim().is_empty()).then_some(v);
        }
    }

    /// Writes the configuration to an INI file, creating it if needed.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ini = self.to_ini();
        ini.write(path)
            .with_context(|| format!("failed to save config file {}", path.display()))?;
        info!("saved config to {}", path.display());
        Ok(())
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let mut set = |section: &str, key: &str, value: String| {
            ini.set(section, key, Some(value));
        };

        set("screen", "width", self.screen.width.to_string());
        set("screen", "height", self.screen.height.to_string());
        set("screen", "layout", self.screen.layout.to_string());
        set("screen", "swap_screens", self.screen.swap_screens.to_string());
        set("screen", "max_3d_offset", self.screen.max_3d_offset.to_string());

        set("window", "width", self.window.width.to_string());
        set("window", "height", self.window.height.to_string());
        set("window", "title", self.window.title.clone());
        set("window", "vsync", self.window.vsync.to_string());

        set("timer", "tick_rate", self.timer.tick_rate.to_string());
        set("timer", "max_catch_up", self.timer.max_catch_up.to_string());
        set("timer", "frame_skip", self.timer.frame_skip.to_string());

        set("textures", "max_texture_rows", self.textures.max_texture_rows.to_string());
        set("textures", "low_water_bytes", self.textures.low_water_bytes.to_string());
        set("textures", "video_memory_bytes", self.textures.video_memory_bytes.to_string());

        set("touch", "enabled", self.touch.enabled.to_string());
        set("touch", "canvas_width", self.touch.canvas_width.to_string());
        set("touch", "canvas_height", self.touch.canvas_height.to_string());

        set("joystick", "enabled", self.joystick.enabled.to_string());
        set("joystick", "deadzone", self.joystick.deadzone.to_string());
        for (index, table) in &self.joystick.devices {
            let section = format!("{JOYSTICK_DEVICE_PREFIX}{index}");
            for (key, value) in table {
                set(&section, key, value.clone());
            }
        }

        set("players", "count", self.players.count.to_string());
        for (i, source) in self.players.sources.iter().enumerate() {
            set("players", &format!("source{}", i + 1), source.to_string());
        }

        if let Some(filter) = &self.log_filter {
            set("log", "filter", filter.clone());
        }

        ini
    }
}

fn read_u64(ini: &Ini, section: &str, key: &str) -> Option<u64> {
    match ini.getuint(section, key) {
        Ok(v) => v,
        Err(e) => {
            warn!("config [{section}] {key}: {e}; keeping default");
            None
        }
    }
}

fn read_uint(ini: &Ini, section: &str, key: &str) -> Option<u32> {
    let v = read_u64(ini, section, key)?;
    match u32::try_from(v) {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("config [{section}] {key} = {v} is out of range; keeping default");
            None
        }
    }
}

fn read_float(ini: &Ini, section: &str, key: &str) -> Option<f64> {
    match ini.getfloat(section, key) {
        Ok(v) => v,
        Err(e) => {
            warn!("config [{section}] {key}: {e}; keeping default");
            None
        }
    }
}

fn read_bool(ini: &Ini, section: &str, key: &str) -> Option<bool> {
    match ini.getbool(section, key) {
        Ok(v) => v,
        Err(e) => {
            warn!("config [{section}] {key}: {e}; keeping default");
            None
        }
    }
}

fn read_parsed<T>(ini: &Ini, section: &str, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = ini.get(section, key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("config [{section}] {key} = {raw:?}: {e}; keeping default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FrameTimer;

    fn parsed(text: &str) -> EngineConfig {
        let mut config = EngineConfig::new();
        config.load_from_str(text).unwrap();
        config
    }

    // ── defaults ──────────────────────────────────────────────────────────

    #[test]
    fn defaults_are_usable_without_a_file() {
        let c = EngineConfig::default();
        assert_eq!((c.screen.width, c.screen.height), (800, 600));
        assert_eq!(c.screen.layout, LayoutKind::Single);
        assert_eq!(c.textures.max_texture_rows, 1024);
        assert_eq!(c.textures.low_water_bytes, 4_194_304);
        assert_eq!((c.touch.canvas_width, c.touch.canvas_height), (1024, 600));
        assert_eq!(c.players.sources[0], PlayerSource::Keyboard);
    }

    // ── parsing ───────────────────────────────────────────────────────────

    #[test]
    fn values_override_defaults() {
        let c = parsed(
            "[screen]\nlayout = dual\nswap_screens = true\n\
             [timer]\ntick_rate = 60\nframe_skip = false\n\
             [players]\ncount = 2\nsource2 = keyboard\n\
             [log]\nfilter = debug\n",
        );
        assert_eq!(c.screen.layout, LayoutKind::Dual);
        assert!(c.screen.swap_screens);
        assert_eq!(c.timer.tick_rate, 60.0);
        assert!(!c.timer.frame_skip);
        assert_eq!(c.players.count, 2);
        assert_eq!(c.players.sources[1], PlayerSource::Keyboard);
        assert_eq!(c.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let c = parsed(
            "[screen]\nwidth = wide\nlayout = triple\n\
             [timer]\ntick_rate = 0\n\
             [textures]\nmax_texture_rows = -3\n",
        );
        assert_eq!(c.screen.width, 800);
        assert_eq!(c.screen.layout, LayoutKind::Single);
        assert_eq!(c.timer.tick_rate, DEFAULT_TICK_RATE);
        assert_eq!(c.textures.max_texture_rows, 1024);
    }

    #[test]
    fn tiny_tick_rates_are_rejected() {
        for raw in ["1e-320", "0.5", "inf", "-64"] {
            let c = parsed(&format!("[timer]\ntick_rate = {raw}\n"));
            assert_eq!(c.timer.tick_rate, DEFAULT_TICK_RATE, "tick_rate = {raw}");
        }
        let c = parsed("[timer]\ntick_rate = 1\n");
        assert_eq!(c.timer.tick_rate, MIN_TICK_RATE);
        let _ = FrameTimer::from_config(&c.timer);
    }

    #[test]
    fn joystick_device_sections_are_collected() {
        let c = parsed(
            "[joystick]\ndeadzone = 0.4\n\
             [joystick.1]\njump = button:2\nleft = axis:0:-\n\
             [joystick.x]\njump = button:0\n",
        );
        assert!((c.joystick.deadzone - 0.4).abs() < 1e-6);
        assert_eq!(c.joystick.devices.len(), 1);
        let table = &c.joystick.devices[&1];
        assert_eq!(table["jump"], "button:2");
        assert_eq!(table["left"], "axis:0:-");
    }

    // ── files ─────────────────────────────────────────────────────────────

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ashur.ini");

        let mut original = EngineConfig::new();
        original.screen.layout = LayoutKind::Dual;
        original.timer.max_catch_up = 3;
        original.players.count = 2;
        original
            .joystick
            .devices
            .entry(0)
            .or_default()
            .insert("run".into(), "button:1".into());
        original.save_to_file(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.screen.layout, LayoutKind::Dual);
        assert_eq!(loaded.timer.max_catch_up, 3);
        assert_eq!(loaded.players.count, 2);
        assert_eq!(loaded.joystick.devices[&0]["run"], "button:1");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = EngineConfig::new();
        assert!(c.load_from_file(dir.path().join("absent.ini")).is_err());
        assert_eq!(c, EngineConfig::new());
    }
}
