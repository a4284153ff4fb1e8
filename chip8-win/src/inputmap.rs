use chip8::{constants::KEY_COUNT, KeyCode};
use serde::Deserialize;
use smol_str::SmolStr;
use winit::event::{ElementState, VirtualKeyCode};

/// Input mapper
///
/// Maps user input events to either Chip8 keycodes (suitable to be used in the VM),
/// or application specific named actions.
///
/// - *Chip8 Keycode*: These are the 16 keys of the old COSMAC VIP computer.
///   Stored in 8-bit integers and suitable to be passed to the virtual machine.
/// - *Named Action*: These are application specific input events that are
///   identified by a readable string.
#[derive(Debug)]
pub struct InputMap {
    /// Mapping of host keyboard keys to inputs.
    keys: Box<[(VirtualKeyCode, InputKind)]>,
    /// Mapped host keys currently held down.
    held: Vec<VirtualKeyCode>,
}

/// Key binding as written in the configuration file.
#[derive(Debug, Deserialize)]
pub struct InputDef {
    chip8: Option<KeyCode>,
    action: Option<SmolStr>,
    keyboard_keys: Option<Vec<VirtualKeyCode>>,
}

impl InputDef {
    /// A binding without a target is dropped.
    fn kind(&self) -> Option<InputKind> {
        if let Some(keycode) = self.chip8 {
            Some(InputKind::Chip8(keycode))
        } else {
            self.action.clone().map(InputKind::Action)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Action(SmolStr),
    Chip8(KeyCode),
}

impl InputMap {
    pub fn new(defs: &[InputDef]) -> Self {
        InputMap {
            keys: Self::build_keys(defs),
            held: Vec::new(),
        }
    }

    /// Build a flat mapping of [`VirtualKeyCode`]s to their inputs.
    fn build_keys(defs: &[InputDef]) -> Box<[(VirtualKeyCode, InputKind)]> {
        defs.iter()
            // lift keycodes and targets out of the definitions
            .filter_map(|def| Some((def.kind()?, def.keyboard_keys.as_ref()?)))
            // flatten borrowed keycodes into one iterator of copied keycodes
            .flat_map(|(kind, keys)| keys.iter().map(move |keycode| (*keycode, kind.clone())))
            .collect::<Vec<_>>()
            .into_boxed_slice()
    }

    /// Given a user input keycode, map it to either a Chip8 key, or a named action.
    pub fn map_key(&self, key: VirtualKeyCode) -> Option<&InputKind> {
        self.keys
            .iter()
            .find(|(keycode, _)| *keycode == key)
            .map(|(_, kind)| kind)
    }

    /// Push key event into the input state.
    pub fn push_key(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        // Convert `winit` key to our input framework
        match self.map_key(keycode) {
            Some(_) => {
                let position = self.held.iter().position(|held| *held == keycode);
                match (state, position) {
                    (ElementState::Pressed, None) => self.held.push(keycode),
                    (ElementState::Released, Some(index)) => {
                        self.held.swap_remove(index);
                    }
                    // Key repeat, or a release for a press we never saw.
                    _ => {}
                }
            }
            None => {
                log::trace!("no input mapping for {keycode:?}");
            }
        }
    }

    pub fn is_action_pressed(&self, action: impl AsRef<str>) -> bool {
        let query = action.as_ref().trim();
        self.iter_held()
            .any(|held| matches!(held, InputKind::Action(name) if name == query))
    }

    /// Snapshot of the chip8 keypad.
    pub fn chip8_keys(&self) -> [bool; KEY_COUNT as usize] {
        let mut keys = [false; KEY_COUNT as usize];
        for held in self.iter_held() {
            if let InputKind::Chip8(keycode) = held {
                keys[keycode.as_u8() as usize] = true;
            }
        }
        keys
    }

    fn iter_held(&self) -> impl Iterator<Item = &InputKind> + '_ {
        self.held.iter().filter_map(|keycode| self.map_key(*keycode))
    }

    /// Release everything, for when the window loses focus.
    pub fn clear_state(&mut self) {
        self.held.clear();
    }
}
