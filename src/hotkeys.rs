use anyhow::{Context, Result};
use evdev::{AttributeSet, Device, EventType, KeyCode};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::chord::Chord;
use crate::constants::{events, input};

/// Notification from the OS-level hook
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    /// `press<name>` or `hold<name>`
    pub channel: String,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
struct HoldPayload {
    pressed: u32,
}

pub fn press_channel(name_key: &str) -> String {
    format!("{}{name_key}", events::PRESS_PREFIX)
}

pub fn hold_channel(name_key: &str) -> String {
    format!("{}{name_key}", events::HOLD_PREFIX)
}

impl HookEvent {
    pub fn press(name_key: &str) -> Self {
        Self {
            channel: press_channel(name_key),
            payload: Value::String(String::new()),
        }
    }

    pub fn hold(name_key: &str) -> Self {
        Self {
            channel: hold_channel(name_key),
            payload: serde_json::to_value(HoldPayload { pressed: 1 }).unwrap_or(Value::Null),
        }
    }
}

/// OS-level key interception service
///
/// Requests are fire-and-forget; implementations log their own failures.
pub trait KeyHook {
    /// Intercept `name_key` and notify `press<name_key>` on each press
    fn bind_key(&mut self, name_key: &str);

    /// Intercept `name_key` and notify `hold<name_key>` repeatedly while held
    fn bind_hold_key(&mut self, name_key: &str);

    /// Start global dispatch for everything bound so far
    fn active_handle(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindMode {
    Press,
    Hold,
}

/// Resolve a key name to evdev codes; families (e.g. `Shift`) match either side
fn key_codes(name: &str) -> Option<&'static [KeyCode]> {
    let codes: &'static [KeyCode] = match name {
        "Backquote" => &[KeyCode::KEY_GRAVE],
        "F1" => &[KeyCode::KEY_F1],
        "F2" => &[KeyCode::KEY_F2],
        "F3" => &[KeyCode::KEY_F3],
        "F4" => &[KeyCode::KEY_F4],
        "F5" => &[KeyCode::KEY_F5],
        "F6" => &[KeyCode::KEY_F6],
        "F7" => &[KeyCode::KEY_F7],
        "F8" => &[KeyCode::KEY_F8],
        "F9" => &[KeyCode::KEY_F9],
        "F10" => &[KeyCode::KEY_F10],
        "F11" => &[KeyCode::KEY_F11],
        "F12" => &[KeyCode::KEY_F12],
        "Numpad0" => &[KeyCode::KEY_KP0],
        "Numpad1" => &[KeyCode::KEY_KP1],
        "Numpad2" => &[KeyCode::KEY_KP2],
        "Numpad3" => &[KeyCode::KEY_KP3],
        "Numpad4" => &[KeyCode::KEY_KP4],
        "Numpad5" => &[KeyCode::KEY_KP5],
        "Numpad6" => &[KeyCode::KEY_KP6],
        "Numpad7" => &[KeyCode::KEY_KP7],
        "Numpad8" => &[KeyCode::KEY_KP8],
        "Numpad9" => &[KeyCode::KEY_KP9],
        "Add" => &[KeyCode::KEY_KPPLUS],
        "Subtract" => &[KeyCode::KEY_KPMINUS],
        "Multiply" => &[KeyCode::KEY_KPASTERISK],
        "Divide" => &[KeyCode::KEY_KPSLASH],
        "Decimal" => &[KeyCode::KEY_KPDOT],
        "Separator" => &[KeyCode::KEY_KPCOMMA],
        "Equal" => &[KeyCode::KEY_EQUAL],
        "Minus" => &[KeyCode::KEY_MINUS],
        "Shift" => &[KeyCode::KEY_LEFTSHIFT, KeyCode::KEY_RIGHTSHIFT],
        "LShift" => &[KeyCode::KEY_LEFTSHIFT],
        "RShift" => &[KeyCode::KEY_RIGHTSHIFT],
        "Control" => &[KeyCode::KEY_LEFTCTRL, KeyCode::KEY_RIGHTCTRL],
        "LControl" => &[KeyCode::KEY_LEFTCTRL],
        "RControl" => &[KeyCode::KEY_RIGHTCTRL],
        "Alt" => &[KeyCode::KEY_LEFTALT, KeyCode::KEY_RIGHTALT],
        "LAlt" => &[KeyCode::KEY_LEFTALT],
        "RAlt" => &[KeyCode::KEY_RIGHTALT],
        "LeftButton" => &[KeyCode::BTN_LEFT],
        "RightButton" => &[KeyCode::BTN_RIGHT],
        "MiddleButton" => &[KeyCode::BTN_MIDDLE],
        _ => return None,
    };
    Some(codes)
}

/// A chord resolved to device key codes
#[derive(Debug, Clone)]
struct HookBinding {
    name: String,
    mode: BindMode,
    primary: &'static [KeyCode],
    modifiers: Vec<&'static [KeyCode]>,
}

impl HookBinding {
    fn resolve(name_key: &str, mode: BindMode) -> Option<Self> {
        let chord = match Chord::parse(name_key) {
            Ok(chord) => chord,
            Err(e) => {
                warn!(chord = name_key, error = %e, "Cannot bind malformed chord");
                return None;
            }
        };

        let Some(primary) = key_codes(chord.primary_token()) else {
            warn!(chord = name_key, key = chord.primary_token(), "No device key for chord");
            return None;
        };

        let mut modifiers = Vec::new();
        for token in chord.modifier_tokens() {
            let Some(codes) = key_codes(token) else {
                warn!(chord = name_key, modifier = token, "No device key for modifier");
                return None;
            };
            modifiers.push(codes);
        }

        Some(Self {
            name: name_key.to_string(),
            mode,
            primary,
            modifiers,
        })
    }

    fn is_primary(&self, code: KeyCode) -> bool {
        self.primary.contains(&code)
    }

    fn modifiers_held(&self, is_pressed: impl Fn(KeyCode) -> bool) -> bool {
        self.modifiers
            .iter()
            .all(|family| family.iter().any(|code| is_pressed(*code)))
    }
}

/// Key hook backed by Linux evdev devices
///
/// Modifiers are read from the same device that produced the primary key.
pub struct EvdevHook {
    sender: UnboundedSender<HookEvent>,
    bindings: Vec<HookBinding>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl EvdevHook {
    pub fn new(sender: UnboundedSender<HookEvent>) -> Self {
        Self {
            sender,
            bindings: Vec::new(),
            handles: Vec::new(),
        }
    }

    fn bind(&mut self, name_key: &str, mode: BindMode) {
        if !self.handles.is_empty() {
            warn!(chord = name_key, "Hook already active, binding ignored");
            return;
        }
        if let Some(binding) = HookBinding::resolve(name_key, mode) {
            debug!(chord = name_key, mode = ?mode, "Bound hook key");
            self.bindings.push(binding);
        }
    }
}

impl KeyHook for EvdevHook {
    fn bind_key(&mut self, name_key: &str) {
        self.bind(name_key, BindMode::Press);
    }

    fn bind_hold_key(&mut self, name_key: &str) {
        self.bind(name_key, BindMode::Hold);
    }

    fn active_handle(&mut self) {
        if !self.handles.is_empty() {
            warn!("Hook already active");
            return;
        }
        if self.bindings.is_empty() {
            info!("No hook bindings, not listening");
            return;
        }

        let devices = match find_input_devices(&self.bindings) {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "Failed to start hook listener");
                print_permission_error();
                return;
            }
        };

        let bindings: Arc<[HookBinding]> = self.bindings.clone().into();
        for device in devices {
            let bindings = Arc::clone(&bindings);
            let sender = self.sender.clone();
            self.handles.push(thread::spawn(move || {
                info!(device = ?device.name(), "Hook listener started");
                if let Err(e) = listen_for_bindings(device, &bindings, &sender) {
                    error!(error = %e, "Hook listener error");
                }
            }));
        }
    }
}

/// Hook used when OS-level interception is unavailable or disabled
#[derive(Debug, Default)]
pub struct NoHook;

impl KeyHook for NoHook {
    fn bind_key(&mut self, name_key: &str) {
        debug!(chord = name_key, "Hook disabled, press binding kept local");
    }

    fn bind_hold_key(&mut self, name_key: &str) {
        debug!(chord = name_key, "Hook disabled, hold binding kept local");
    }

    fn active_handle(&mut self) {
        info!("Key hook disabled, only local chords are active");
    }
}

/// Find all input devices that report any bound key
fn find_input_devices(bindings: &[HookBinding]) -> Result<Vec<Device>> {
    info!(path = %input::DEV_INPUT, "Scanning for input devices...");

    let mut devices = Vec::new();
    for entry in std::fs::read_dir(input::DEV_INPUT)
        .context(format!("Failed to read {} - are you in the '{}' group?", input::DEV_INPUT, input::INPUT_GROUP))?
    {
        let path = entry?.path();
        let Ok(device) = Device::open(&path) else {
            continue;
        };
        let relevant = device.supported_keys().is_some_and(|keys| {
            bindings
                .iter()
                .flat_map(|b| b.primary.iter())
                .any(|code| keys.contains(*code))
        });
        if relevant {
            info!(device_path = %path.display(), name = ?device.name(), "Found input device");
            devices.push(device);
        }
    }

    if devices.is_empty() {
        anyhow::bail!("No input device reports any bound key");
    }

    info!(count = devices.len(), "Listening on input device(s)");
    Ok(devices)
}

/// Held flag of one hold binding
///
/// Each press starts a new generation. A repeater only keeps running while
/// the key is down and its generation is still the latest, so a quick
/// release and repress never leaves two repeaters alive.
#[derive(Debug, Default)]
struct HoldState {
    held: AtomicBool,
    generation: AtomicU64,
}

impl HoldState {
    /// Mark the key down; returns the new generation unless it already was
    fn press(&self) -> Option<u64> {
        if self.held.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.held.load(Ordering::Acquire) && self.generation.load(Ordering::Acquire) == generation
    }
}

/// Listen for bound keys on a single device
fn listen_for_bindings(
    mut device: Device,
    bindings: &[HookBinding],
    sender: &UnboundedSender<HookEvent>,
) -> Result<()> {
    let holds: Vec<Arc<HoldState>> = bindings.iter().map(|_| Arc::default()).collect();

    loop {
        // Collect transitions first; key state can only be queried once the
        // events iterator is finished
        let mut transitions = Vec::new();
        for event in device.fetch_events().context("Failed to fetch events")? {
            if event.event_type() != EventType::KEY {
                continue;
            }
            let value = event.value();
            if value == input::KEY_PRESS || value == input::KEY_RELEASE {
                transitions.push((KeyCode::new(event.code()), value == input::KEY_PRESS));
            }
        }
        if transitions.is_empty() {
            continue;
        }

        let key_state: AttributeSet<KeyCode> = device
            .get_key_state()
            .context("Failed to get key state")?;

        for (code, pressed) in transitions {
            for (binding, hold) in bindings.iter().zip(&holds) {
                if !binding.is_primary(code) {
                    continue;
                }
                if !pressed {
                    hold.release();
                    continue;
                }
                if !binding.modifiers_held(|k| key_state.contains(k)) {
                    continue;
                }

                match binding.mode {
                    BindMode::Press => {
                        debug!(chord = %binding.name, "Hook press");
                        if sender.send(HookEvent::press(&binding.name)).is_err() {
                            return Ok(());
                        }
                    }
                    BindMode::Hold => {
                        if let Some(generation) = hold.press() {
                            spawn_hold_repeater(binding.name.clone(), Arc::clone(hold), generation, sender.clone());
                        }
                    }
                }
            }
        }
    }
}

/// Emit `hold<name>` now and every HOLD_REPEAT_MS until released
fn spawn_hold_repeater(
    name: String,
    hold: Arc<HoldState>,
    generation: u64,
    sender: UnboundedSender<HookEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        debug!(chord = %name, "Hold started");
        let event = HookEvent::hold(&name);
        loop {
            if sender.send(event.clone()).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(input::HOLD_REPEAT_MS));
            if !hold.is_current(generation) {
                break;
            }
        }
        debug!(chord = %name, generation, "Hold released");
    })
}

/// Check if the hook can run (user has input group permissions)
pub fn check_permissions() -> bool {
    std::fs::read_dir(Path::new(input::DEV_INPUT)).is_ok()
}

/// Print helpful error message if permissions missing
pub fn print_permission_error() {
    error!(path = %input::DEV_INPUT, "Cannot access input devices");
    error!(group = %input::INPUT_GROUP, "Key hook requires group membership");
    error!(command = %input::ADD_TO_INPUT_GROUP, "Add user to input group");
    error!("  Then log out and back in");
    warn!(continuing = true, "Continuing without OS-level key hook...");
}
