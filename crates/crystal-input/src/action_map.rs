//! Logical clock actions and the bindings that trigger them.
//!
//! [`ActionMap`] says which physical keys fire which [`ClockAction`]. Once per
//! tick, [`InputFrame::poll`] reads the keyboard edges and drained touch
//! gestures and produces an [`ActionSet`]: each action is either fired this
//! tick or not. Holding a key never re-fires it.
//!
//! Bindings persist as `bindings.ron` next to the clock config.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::gesture::{Gesture, GestureTracker};
use crate::keyboard::KeyboardState;

/// File name of the persisted bindings inside the config directory.
pub const BINDINGS_FILE_NAME: &str = "bindings.ron";

/// Serde helper for [`KeyCode`], which has no serde impls of its own.
mod keycode_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use winit::keyboard::KeyCode;

    pub fn serialize<S: Serializer>(code: &KeyCode, s: S) -> Result<S::Ok, S::Error> {
        format!("{code:?}").serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<KeyCode, D::Error> {
        let name = String::deserialize(d)?;
        string_to_keycode(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown key: {name}")))
    }

    fn string_to_keycode(s: &str) -> Option<KeyCode> {
        if let Some(letter) = s.strip_prefix("Key")
            && letter.len() == 1
        {
            return letter_key(letter.as_bytes()[0]);
        }
        Some(match s {
            "Space" => KeyCode::Space,
            "Enter" => KeyCode::Enter,
            "Escape" => KeyCode::Escape,
            "Tab" => KeyCode::Tab,
            "F1" => KeyCode::F1,
            "F11" => KeyCode::F11,
            _ => return None,
        })
    }

    fn letter_key(c: u8) -> Option<KeyCode> {
        const LETTERS: [KeyCode; 26] = [
            KeyCode::KeyA,
            KeyCode::KeyB,
            KeyCode::KeyC,
            KeyCode::KeyD,
            KeyCode::KeyE,
            KeyCode::KeyF,
            KeyCode::KeyG,
            KeyCode::KeyH,
            KeyCode::KeyI,
            KeyCode::KeyJ,
            KeyCode::KeyK,
            KeyCode::KeyL,
            KeyCode::KeyM,
            KeyCode::KeyN,
            KeyCode::KeyO,
            KeyCode::KeyP,
            KeyCode::KeyQ,
            KeyCode::KeyR,
            KeyCode::KeyS,
            KeyCode::KeyT,
            KeyCode::KeyU,
            KeyCode::KeyV,
            KeyCode::KeyW,
            KeyCode::KeyX,
            KeyCode::KeyY,
            KeyCode::KeyZ,
        ];
        c.checked_sub(b'A')
            .and_then(|i| LETTERS.get(usize::from(i)))
            .copied()
    }
}

/// What the user can ask the clock to do.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ClockAction {
    /// Fade the clock and tunnel layers out, or back in.
    ToggleFade,
    /// Show or hide the date/time text.
    ToggleTimeDisplay,
    /// Leave the application.
    Quit,
}

impl ClockAction {
    pub const ALL: [ClockAction; 3] = [Self::ToggleFade, Self::ToggleTimeDisplay, Self::Quit];

    /// Gesture bound to this action on touch hosts.
    #[must_use]
    pub fn gesture(self) -> Option<Gesture> {
        match self {
            Self::ToggleFade => Some(Gesture::SwipeDown),
            Self::ToggleTimeDisplay => Some(Gesture::SwipeUp),
            Self::Quit => None,
        }
    }
}

/// One bound key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding(#[serde(with = "keycode_serde")] pub KeyCode);

/// Key bindings per action. Serialisable to RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMap {
    pub bindings: HashMap<ClockAction, Vec<KeyBinding>>,
}

impl Default for ActionMap {
    /// J fades, K toggles the time text, Escape quits.
    fn default() -> Self {
        let mut map = Self {
            bindings: HashMap::new(),
        };
        map.set_bindings(ClockAction::ToggleFade, &[KeyCode::KeyJ]);
        map.set_bindings(ClockAction::ToggleTimeDisplay, &[KeyCode::KeyK]);
        map.set_bindings(ClockAction::Quit, &[KeyCode::Escape]);
        map
    }
}

impl ActionMap {
    /// Replace the keys bound to `action`.
    pub fn set_bindings(&mut self, action: ClockAction, keys: &[KeyCode]) {
        self.bindings
            .insert(action, keys.iter().copied().map(KeyBinding).collect());
    }

    #[must_use]
    pub fn keys(&self, action: ClockAction) -> Vec<PhysicalKey> {
        self.bindings
            .get(&action)
            .map(|b| b.iter().map(|k| PhysicalKey::Code(k.0)).collect())
            .unwrap_or_default()
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// # Errors
    /// Returns an error if the RON string is malformed or names an unknown key.
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Write the bindings to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load bindings from `path`. A missing or malformed file yields the
    /// defaults with a warning.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_ron(&contents).unwrap_or_else(|e| {
                tracing::warn!("Malformed bindings file {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Could not read bindings file {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Load `bindings.ron` from `config_dir`, writing the defaults there first
    /// if it does not exist.
    #[must_use]
    pub fn load_or_create(config_dir: &Path) -> Self {
        let path = config_dir.join(BINDINGS_FILE_NAME);
        if path.exists() {
            return Self::load(&path);
        }
        let map = Self::default();
        match map.save(&path) {
            Ok(()) => tracing::info!("Created default bindings at {}", path.display()),
            Err(e) => tracing::warn!("Could not write {}: {e}", path.display()),
        }
        map
    }
}

/// Actions fired during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub toggle_fade: bool,
    pub toggle_time_display: bool,
    pub quit: bool,
}

impl ActionSet {
    #[must_use]
    pub fn contains(&self, action: ClockAction) -> bool {
        match action {
            ClockAction::ToggleFade => self.toggle_fade,
            ClockAction::ToggleTimeDisplay => self.toggle_time_display,
            ClockAction::Quit => self.quit,
        }
    }

    pub fn insert(&mut self, action: ClockAction) {
        match action {
            ClockAction::ToggleFade => self.toggle_fade = true,
            ClockAction::ToggleTimeDisplay => self.toggle_time_display = true,
            ClockAction::Quit => self.quit = true,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-tick input sampler.
pub struct InputFrame;

impl InputFrame {
    /// Collect this tick's fired actions. Drains the gesture tracker.
    pub fn poll(keyboard: &KeyboardState, gestures: &mut GestureTracker, map: &ActionMap) -> ActionSet {
        let mut fired = ActionSet::default();
        let swipes = gestures.drain();

        for action in ClockAction::ALL {
            let by_key = keyboard.any_just_pressed(&map.keys(action));
            let by_gesture = action.gesture().is_some_and(|g| swipes.contains(&g));
            if by_key || by_gesture {
                fired.insert(action);
            }
        }

        if !fired.is_empty() {
            tracing::debug!(?fired, "Input actions fired");
        }
        fired
    }
}
