//! Application-wide constants
//!
//! Default values, event names and user-facing strings live here so the
//! config store, dispatcher and tray all agree on them.

/// Config file location
pub mod config {
    /// Directory under the user's config dir
    pub const APP_DIR: &str = "mouse-macros";

    /// Persisted configuration file name
    pub const FILENAME: &str = "config.json";

    /// Suffix for the temp file used by atomic saves
    pub const TEMP_SUFFIX: &str = "tmp";
}

/// Default values for freshly constructed variants
pub mod defaults {
    /// Every main variant carries exactly this many sub-variants (ids 0..9)
    pub const SUB_VARIANT_COUNT: u32 = 10;

    /// Title of the fallback main variant
    pub const MAIN_VARIANT_TITLE: &str = "Main";

    /// Prefix for sub-variant titles ("variant0" .. "variant9")
    pub const SUB_VARIANT_TITLE_PREFIX: &str = "variant";

    pub const SENSITIVITY: f64 = 1.0;
    pub const TIMES: u32 = 10;
    pub const RATE: u32 = 10;

    pub const CLICK_TIMES: u32 = 5;
    pub const CLICK_RATE: u32 = 15;

    /// Step applied by the sensitivity up/down commands
    pub const SENSITIVITY_STEP: f64 = 1.0;
}

/// Event and channel names shared with the hook service and tray
pub mod events {
    /// Named event carrying a TransportConfig to the tray
    pub const CHANGE_CONFIG: &str = "changeConfig";

    /// Prefix of the hook channel for press bindings
    pub const PRESS_PREFIX: &str = "press";

    /// Prefix of the hook channel for hold bindings
    pub const HOLD_PREFIX: &str = "hold";

    /// Label stamped on locally synthesized chord events
    pub const MAIN_WINDOW_LABEL: &str = "main";
}

/// Chord identifier syntax
pub mod chord {
    /// Separator between modifier tokens and the primary key ("LAlt_LShift_Backquote")
    pub const DELIMITER: char = '_';

    /// Maximum number of tokens in a chord identifier
    pub const MAX_TOKENS: usize = 3;
}

/// Input device paths and evdev values
pub mod input {
    /// Key press event value
    pub const KEY_PRESS: i32 = 1;

    /// Key release event value
    pub const KEY_RELEASE: i32 = 0;

    /// Interval between repeated hold notifications
    pub const HOLD_REPEAT_MS: u64 = 10;

    /// Linux input device directory
    pub const DEV_INPUT: &str = "/dev/input";

    /// Group required to read input devices
    pub const INPUT_GROUP: &str = "input";

    /// Command to add the current user to the input group
    pub const ADD_TO_INPUT_GROUP: &str = "sudo usermod -aG input $USER";
}

/// Pointer action timing
pub mod pointer {
    /// Delay between press and release of a simulated click
    pub const CLICK_HOLD_MS: u64 = 20;
}

/// Tray IPC
pub mod ipc {
    /// Socket path relative to the runtime dir
    pub const SOCKET_PATH: &str = "mouse-macros/tray.sock";

    /// Maximum frame size (1 MiB)
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    /// A stuck tray fails a publish after this long instead of stalling the event loop
    pub const WRITE_TIMEOUT_MS: u64 = 200;
}

/// User-facing failure notices
pub mod messages {
    pub const TITLE: &str = "MouseMacros";

    pub const NOT_OPEN: &str = "Configuration is not open!";
    pub const NOT_SAVED: &str = "Configuration is not saved!";
    pub const NOT_CHANGED: &str = "Configuration is not change!";
    pub const CLICK_NOT_SAVED: &str = "Auto Save Click is not saved!";
    pub const SUB_VARIANT_NOT_SAVED: &str = "Auto Save Sub VariantConfig is not saved!";

    pub const HOOK_UNAVAILABLE: &str = "Global keys are not active!";
    pub const TRAY_UNAVAILABLE: &str = "Tray is not running!";

    /// "Configuration sub variant {id} is not active!"
    pub fn sub_variant_not_active(id: u32) -> String {
        format!("Configuration sub variant {id} is not active!")
    }
}
