//! Composition root
//!
//! Owns the config store and wires the three key delivery paths (local echo,
//! hook registration, hook subscription) plus the two guarded automation
//! actions. Every store failure is turned into a user notice here.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chord::{ChordCallback, ChordError, ChordEvent, ChordMatcher, KeyEvent};
use crate::command::{Binding, Command, Param, Toggle};
use crate::config::ConfigStore;
use crate::constants::{events, messages};
use crate::guard::{ActionGuard, ActionKind};
use crate::hotkeys::{HookEvent, KeyHook, hold_channel, press_channel};
use crate::ipc::{self, TransportConfig, TraySink};
use crate::notify::{Notice, Notifier};
use crate::pointer::PointerBackend;

pub struct Dispatcher {
    store: ConfigStore,
    matcher: ChordMatcher,
    hook: Box<dyn KeyHook>,
    subscriptions: HashMap<String, Vec<ChordCallback>>,
    move_guard: ActionGuard,
    click_guard: ActionGuard,
    pointer: Arc<dyn PointerBackend>,
    tray: Option<Box<dyn TraySink>>,
    notifier: Box<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        store: ConfigStore,
        hook: Box<dyn KeyHook>,
        pointer: Arc<dyn PointerBackend>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            matcher: ChordMatcher::new(events::MAIN_WINDOW_LABEL),
            hook,
            subscriptions: HashMap::new(),
            move_guard: ActionGuard::new(ActionKind::Move),
            click_guard: ActionGuard::new(ActionKind::Click),
            pointer,
            tray: None,
            notifier,
        }
    }

    /// Attach the tray connection that receives `changeConfig`
    pub fn with_tray(mut self, tray: Box<dyn TraySink>) -> Self {
        self.tray = Some(tray);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Bind `callback` to chord `name` on all three paths
    pub fn bind_key(&mut self, name: &str, callback: ChordCallback) -> Result<(), ChordError> {
        self.matcher.register(name, Arc::clone(&callback))?;
        self.hook.bind_key(name);
        self.subscribe(press_channel(name), callback);
        Ok(())
    }

    /// Like `bind_key`, but the hook keeps notifying while the key is held
    pub fn bind_hold_key(&mut self, name: &str, callback: ChordCallback) -> Result<(), ChordError> {
        self.matcher.register(name, Arc::clone(&callback))?;
        self.hook.bind_hold_key(name);
        self.subscribe(hold_channel(name), callback);
        Ok(())
    }

    fn subscribe(&mut self, channel: String, callback: ChordCallback) {
        debug!(channel = %channel, "Subscribed to hook channel");
        self.subscriptions.entry(channel).or_default().push(callback);
    }

    /// Bind each chord to a callback that queues its command
    ///
    /// Invalid chords are logged and skipped.
    pub fn bind_commands(&mut self, bindings: &[Binding], commands: &UnboundedSender<Command>) {
        for binding in bindings {
            let sender = commands.clone();
            let command = binding.command.clone();
            let callback: ChordCallback = Arc::new(move |_event: &ChordEvent| {
                if sender.send(command.clone()).is_err() {
                    debug!("Command queue closed, dropping chord trigger");
                }
            });

            let bound = if binding.hold {
                self.bind_hold_key(&binding.chord, callback)
            } else {
                self.bind_key(&binding.chord, callback)
            };
            if let Err(e) = bound {
                warn!(chord = %binding.chord, error = %e, "Skipping invalid binding");
            }
        }
        info!(bindings = self.matcher.len(), "Chord bindings registered");
    }

    /// Start OS-level dispatch for everything bound so far
    pub fn activate(&mut self) {
        self.hook.active_handle();
    }

    /// Local keydown path; returns how many callbacks fired
    pub fn on_keydown(&self, event: &KeyEvent) -> usize {
        self.matcher.dispatch(event)
    }

    /// Hook notification path; the payload is forwarded verbatim
    pub fn on_hook_event(&self, event: &HookEvent) -> usize {
        let Some(callbacks) = self.subscriptions.get(&event.channel) else {
            debug!(channel = %event.channel, "No subscription for hook channel");
            return 0;
        };
        let chord_event = ChordEvent {
            event: event.channel.clone(),
            window_label: events::MAIN_WINDOW_LABEL.to_string(),
            id: 0,
            payload: event.payload.clone(),
        };
        for callback in callbacks {
            callback(&chord_event);
        }
        callbacks.len()
    }

    /// Guarded move with the live sensitivity/times/rate
    pub fn mouse_move(&self) -> Option<JoinHandle<Result<bool>>> {
        let live = self.store.live();
        let (sensitivity, times, rate) = (live.main.sensitivity, live.main.times, live.main.rate);
        let pointer = Arc::clone(&self.pointer);
        self.move_guard
            .invoke(live.script_active, move || pointer.mouse_move(sensitivity, times, rate))
    }

    /// Guarded click; needs both the script and click toggles
    pub fn mouse_click(&self) -> Option<JoinHandle<Result<bool>>> {
        let live = self.store.live();
        let (times, rate) = (live.click.times, live.click.rate);
        let pointer = Arc::clone(&self.pointer);
        self.click_guard.invoke(live.script_active && live.click_active, move || {
            pointer.mouse_click(times, rate)
        })
    }

    /// Apply one command; `Break` asks the caller to shut down
    pub fn handle(&mut self, command: Command) -> ControlFlow<()> {
        debug!(command = ?command, "Handling command");
        match command {
            Command::AddMainVariant(title) => {
                self.store.add_main_variant(&title);
            }
            Command::SelectMainVariant(id) => {
                let result = self.store.select_main_variant(id);
                if self.report(result, messages::NOT_CHANGED) {
                    self.publish();
                }
            }
            Command::SelectSubVariant(id) => {
                let result = self.store.select_sub_variant(id);
                if self.report(result, &messages::sub_variant_not_active(id)) {
                    self.publish();
                }
            }
            Command::CommitSubVariant(id) => {
                let result = self.store.commit_sub_variant(id);
                self.report(result, messages::NOT_SAVED);
            }
            Command::CommitActiveSubVariant => self.auto_save_sub_variant(),
            Command::CommitClick => self.auto_save_click(),
            Command::Set(param) => {
                self.set_param(param);
                self.publish();
            }
            Command::AdjustSensitivity(delta) => {
                let current = self.store.live().main.sensitivity;
                self.set_param(Param::Sensitivity((current + delta).max(0.0)));
                self.publish();
            }
            Command::Toggle(toggle) => {
                self.toggle(toggle);
                self.publish();
            }
            Command::Save => {
                let result = self.store.save();
                self.report(result, messages::NOT_SAVED);
            }
            Command::Load => {
                let result = self.store.load();
                if self.report(result, messages::NOT_OPEN) {
                    self.publish();
                }
            }
            Command::MouseMove => {
                if let Some(handle) = self.mouse_move() {
                    watch_action(self.move_guard.kind(), handle);
                }
            }
            Command::MouseClick => {
                if let Some(handle) = self.mouse_click() {
                    watch_action(self.click_guard.kind(), handle);
                }
            }
            Command::Key(event) => {
                let fired = self.on_keydown(&event);
                debug!(key = %event.key, fired, "Local keydown");
            }
            Command::Status => self.log_status(),
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Live edits are written straight back into the active slot
    fn set_param(&mut self, param: Param) {
        let live = self.store.live_mut();
        match param {
            Param::Sensitivity(sensitivity) => live.main.sensitivity = sensitivity,
            Param::Times(times) => live.main.times = times,
            Param::Rate(rate) => live.main.rate = rate,
            Param::ClickTimes(times) => live.click.times = times,
            Param::ClickRate(rate) => live.click.rate = rate,
        }
        match param {
            Param::ClickTimes(_) | Param::ClickRate(_) => self.auto_save_click(),
            _ => self.auto_save_sub_variant(),
        }
    }

    fn auto_save_sub_variant(&mut self) {
        let result = self.store.commit_active_sub_variant();
        self.report(result, messages::SUB_VARIANT_NOT_SAVED);
    }

    fn auto_save_click(&mut self) {
        let result = self.store.commit_click();
        self.report(result, messages::CLICK_NOT_SAVED);
    }

    fn toggle(&mut self, toggle: Toggle) {
        let live = self.store.live_mut();
        let (name, value) = match toggle {
            Toggle::Script => {
                live.script_active = !live.script_active;
                ("script", live.script_active)
            }
            Toggle::Click => {
                live.click_active = !live.click_active;
                ("click", live.click_active)
            }
            Toggle::Tray => {
                live.show_tray = !live.show_tray;
                ("tray", live.show_tray)
            }
        };
        info!(toggle = name, enabled = value, "Toggled");
    }

    /// Show `message` if `result` failed; true on success
    fn report(&self, result: crate::error::Result<()>, message: &str) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Config operation failed");
                self.notifier.notify(&Notice::error(message));
                false
            }
        }
    }

    /// Push the current live state to the tray, if one is attached
    pub fn publish(&mut self) {
        let Some(tray) = self.tray.as_mut() else {
            return;
        };
        let live = self.store.live();
        let config = TransportConfig::project(live, live.script_active, live.show_tray);
        ipc::publish(tray.as_mut(), &config);
    }

    fn log_status(&self) {
        let live = self.store.live();
        info!(
            main_variant = live.active_main_variant,
            sub_variant = live.active_sub_variant,
            sensitivity = live.main.sensitivity,
            times = live.main.times,
            rate = live.main.rate,
            click_times = live.click.times,
            click_rate = live.click.rate,
            script = live.script_active,
            click = live.click_active,
            tray = live.show_tray,
            variants = self.store.variants().len(),
            title = self.store.active_variant().map_or("<missing>", |v| v.title.as_str()),
            "Status"
        );
    }
}

/// Log how a spawned action ended
fn watch_action(kind: ActionKind, handle: JoinHandle<Result<bool>>) {
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(done)) => debug!(action = %kind, done, "Action finished"),
            Ok(Err(e)) => warn!(action = %kind, error = ?e, "Action failed"),
            Err(e) => error!(action = %kind, error = %e, "Action task aborted"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default, Clone)]
    struct RecordingHook {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl KeyHook for RecordingHook {
        fn bind_key(&mut self, name_key: &str) {
            self.calls.lock().unwrap().push(format!("bind_key {name_key}"));
        }

        fn bind_hold_key(&mut self, name_key: &str) {
            self.calls.lock().unwrap().push(format!("bind_hold_key {name_key}"));
        }

        fn active_handle(&mut self) {
            self.calls.lock().unwrap().push("active_handle".to_string());
        }
    }

    #[derive(Default, Clone)]
    struct RecordingNotifier {
        notices: Arc<Mutex<Vec<Notice>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<(String, TransportConfig)>>>,
    }

    impl TraySink for RecordingSink {
        fn emit(&mut self, event: &str, payload: &TransportConfig) -> Result<()> {
            self.frames.lock().unwrap().push((event.to_string(), payload.clone()));
            Ok(())
        }
    }

    /// Blocks each call for a short while and counts calls
    #[derive(Default)]
    struct SlowPointer {
        moves: AtomicUsize,
        clicks: AtomicUsize,
        last_move: Mutex<Option<(f64, u32, u32)>>,
    }

    impl PointerBackend for SlowPointer {
        fn mouse_move(&self, sensitivity: f64, times: u32, rate: u32) -> Result<bool> {
            self.moves.fetch_add(1, Ordering::SeqCst);
            *self.last_move.lock().unwrap() = Some((sensitivity, times, rate));
            std::thread::sleep(Duration::from_millis(50));
            Ok(true)
        }

        fn mouse_click(&self, _times: u32, _rate: u32) -> Result<bool> {
            self.clicks.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(true)
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        hook: RecordingHook,
        notifier: RecordingNotifier,
        sink: RecordingSink,
        pointer: Arc<SlowPointer>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        harness_at(dir, path)
    }

    fn harness_at(dir: tempfile::TempDir, path: std::path::PathBuf) -> Harness {
        let hook = RecordingHook::default();
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();
        let pointer = Arc::new(SlowPointer::default());
        let dispatcher = Dispatcher::new(
            ConfigStore::new(path),
            Box::new(hook.clone()),
            pointer.clone(),
            Box::new(notifier.clone()),
        )
        .with_tray(Box::new(sink.clone()));
        Harness {
            dispatcher,
            hook,
            notifier,
            sink,
            pointer,
            _dir: dir,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<ChordEvent>>>, ChordCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ChordCallback = Arc::new(move |event: &ChordEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (seen, callback)
    }

    #[test]
    fn test_bind_key_wires_all_three_paths() {
        let mut h = harness();
        let (seen, callback) = recorder();
        h.dispatcher.bind_key("LControl_Numpad4", callback).unwrap();
        h.dispatcher.activate();

        assert_eq!(
            *h.hook.calls.lock().unwrap(),
            vec!["bind_key LControl_Numpad4".to_string(), "active_handle".to_string()]
        );

        assert_eq!(h.dispatcher.on_keydown(&KeyEvent::new("4").with_ctrl()), 1);
        assert_eq!(h.dispatcher.on_hook_event(&HookEvent::press("LControl_Numpad4")), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].event, "LControl_Numpad4");
        assert_eq!(seen[0].payload, serde_json::Value::Null);
        assert_eq!(seen[1].event, "pressLControl_Numpad4");
        assert_eq!(seen[1].payload, json!(""));
    }

    #[test]
    fn test_hold_payload_forwarded_verbatim() {
        let mut h = harness();
        let (seen, callback) = recorder();
        h.dispatcher.bind_hold_key("Backquote", callback).unwrap();

        let event = HookEvent {
            channel: "holdBackquote".to_string(),
            payload: json!({"pressed": 1, "extra": [1, 2]}),
        };
        assert_eq!(h.dispatcher.on_hook_event(&event), 1);
        assert_eq!(seen.lock().unwrap()[0].payload, event.payload);

        // press channel for the same key is not subscribed
        assert_eq!(h.dispatcher.on_hook_event(&HookEvent::press("Backquote")), 0);
    }

    #[test]
    fn test_invalid_chord_not_bound_anywhere() {
        let mut h = harness();
        let (_seen, callback) = recorder();
        assert!(h.dispatcher.bind_key("A_B_C_D", callback).is_err());
        assert!(h.hook.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bound_commands_reach_queue() {
        let mut h = harness();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.dispatcher.bind_commands(&crate::command::default_bindings(), &tx);

        h.dispatcher.on_keydown(&KeyEvent::new("3").with_alt());
        assert_eq!(rx.try_recv().unwrap(), Command::SelectSubVariant(3));
        assert!(rx.try_recv().is_err());

        h.dispatcher.on_hook_event(&HookEvent::press("LControl_Numpad7"));
        assert_eq!(rx.try_recv().unwrap(), Command::CommitSubVariant(7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ctrl_numpad_commits_without_switching() {
        let mut h = harness();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.dispatcher.bind_commands(&crate::command::default_bindings(), &tx);
        h.dispatcher.handle(Command::Set(Param::Rate(77)));

        assert_eq!(h.dispatcher.on_keydown(&KeyEvent::new("3").with_ctrl()), 1);
        let mut queued = Vec::new();
        while let Ok(command) = rx.try_recv() {
            queued.push(command);
        }
        assert_eq!(queued, vec![Command::CommitSubVariant(3)]);

        for command in queued {
            h.dispatcher.handle(command);
        }
        let live = h.dispatcher.store().live();
        assert_eq!(live.active_sub_variant, 0);
        assert_eq!(live.main.rate, 77);
        let variant = h.dispatcher.store().active_variant().unwrap();
        assert_eq!(variant.sub_variant(3).unwrap().rate, 77);
        assert_eq!(variant.active_sub_variant, 0);
    }

    #[test]
    fn test_script_toggle_chord_does_not_move() {
        let mut h = harness();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.dispatcher.bind_commands(&crate::command::default_bindings(), &tx);

        h.dispatcher.on_keydown(&KeyEvent::new("F11").with_alt());
        assert_eq!(rx.try_recv().unwrap(), Command::Toggle(Toggle::Script));
        assert!(rx.try_recv().is_err());

        h.dispatcher.on_keydown(&KeyEvent::new("`"));
        assert_eq!(rx.try_recv().unwrap(), Command::MouseMove);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_select_sub_variant_publishes() {
        let mut h = harness();
        assert!(h.dispatcher.handle(Command::SelectSubVariant(6)).is_continue());

        let frames = h.sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, "changeConfig");
        assert_eq!(frames[0].1.config.active_variant, 6);
        assert!(h.notifier.notices.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failures_become_notices() {
        let mut h = harness();
        h.dispatcher.handle(Command::SelectSubVariant(12));
        h.dispatcher.handle(Command::SelectMainVariant(5));
        h.dispatcher.handle(Command::CommitSubVariant(10));
        h.dispatcher.handle(Command::Load);

        let notices = h.notifier.notices.lock().unwrap();
        let texts: Vec<&str> = notices.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Configuration sub variant 12 is not active!",
                "Configuration is not change!",
                "Configuration is not saved!",
                "Configuration is not open!",
            ]
        );
        assert!(notices.iter().all(|n| n.severity == Severity::Error && n.title == "MouseMacros"));
        assert!(h.sink.frames.lock().unwrap().is_empty());
    }

    fn notice_texts(h: &Harness) -> Vec<String> {
        h.notifier.notices.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }

    #[test]
    fn test_auto_save_failures_without_active_main_variant() {
        let mut h = harness();
        std::fs::write(
            h.dispatcher.store().path(),
            r#"{"activeMainVariant": 5, "mainVariants": []}"#,
        )
        .unwrap();
        h.dispatcher.handle(Command::Load);
        assert!(h.notifier.notices.lock().unwrap().is_empty());

        let live_before = h.dispatcher.store().live().clone();
        h.dispatcher.handle(Command::CommitClick);
        h.dispatcher.handle(Command::CommitActiveSubVariant);
        assert_eq!(h.dispatcher.store().live(), &live_before);

        h.dispatcher.handle(Command::Set(Param::ClickTimes(9)));
        h.dispatcher.handle(Command::Set(Param::Rate(40)));

        assert_eq!(
            notice_texts(&h),
            vec![
                "Auto Save Click is not saved!",
                "Auto Save Sub VariantConfig is not saved!",
                "Auto Save Click is not saved!",
                "Auto Save Sub VariantConfig is not saved!",
            ]
        );
        assert!(h.dispatcher.store().variants().is_empty());
        assert!(h.dispatcher.store().active_variant().is_none());
    }

    #[test]
    fn test_save_failure_becomes_notice() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("config.json");
        let mut h = harness_at(dir, path.clone());

        let variants_before = h.dispatcher.store().variants().to_vec();
        let live_before = h.dispatcher.store().live().clone();
        h.dispatcher.handle(Command::Save);

        assert_eq!(notice_texts(&h), vec!["Configuration is not saved!"]);
        assert!(!path.exists());
        assert_eq!(h.dispatcher.store().variants(), variants_before.as_slice());
        assert_eq!(h.dispatcher.store().live(), &live_before);
        assert!(h.sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_param_auto_saves_active_slot() {
        let mut h = harness();
        h.dispatcher.handle(Command::SelectSubVariant(2));
        h.dispatcher.handle(Command::Set(Param::Rate(40)));
        h.dispatcher.handle(Command::Set(Param::ClickTimes(9)));

        let variant = h.dispatcher.store().active_variant().unwrap();
        assert_eq!(variant.sub_variant(2).unwrap().rate, 40);
        assert_eq!(variant.sub_variant(3).unwrap().rate, 10);
        assert_eq!(variant.click.times, 9);
        assert_eq!(h.sink.frames.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_sensitivity_steps_floor_at_zero() {
        let mut h = harness();
        h.dispatcher.handle(Command::AdjustSensitivity(1.0));
        assert_eq!(h.dispatcher.store().live().main.sensitivity, 2.0);
        for _ in 0..4 {
            h.dispatcher.handle(Command::AdjustSensitivity(-1.0));
        }
        assert_eq!(h.dispatcher.store().live().main.sensitivity, 0.0);
    }

    #[test]
    fn test_toggles_publish_state() {
        let mut h = harness();
        h.dispatcher.handle(Command::Toggle(Toggle::Script));
        h.dispatcher.handle(Command::Toggle(Toggle::Tray));

        let live = h.dispatcher.store().live();
        assert!(live.script_active);
        assert!(!live.show_tray);

        let frames = h.sink.frames.lock().unwrap();
        let last = &frames.last().unwrap().1;
        assert!(last.active_script);
        assert!(!last.show_tray);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut h = harness();
        h.dispatcher.handle(Command::AddMainVariant("Second".to_string()));
        h.dispatcher.handle(Command::Save);
        h.dispatcher.handle(Command::Load);
        assert!(h.notifier.notices.lock().unwrap().is_empty());
        assert_eq!(h.dispatcher.store().variants().len(), 2);
    }

    #[test]
    fn test_quit_breaks() {
        let mut h = harness();
        assert!(h.dispatcher.handle(Command::Quit).is_break());
    }

    #[tokio::test]
    async fn test_move_requires_script_active() {
        let mut h = harness();
        assert!(h.dispatcher.mouse_move().is_none());

        h.dispatcher.handle(Command::Toggle(Toggle::Script));
        h.dispatcher.handle(Command::Set(Param::Times(3)));
        let handle = h.dispatcher.mouse_move().unwrap();
        assert!(handle.await.unwrap().unwrap());

        assert_eq!(h.pointer.moves.load(Ordering::SeqCst), 1);
        assert_eq!(*h.pointer.last_move.lock().unwrap(), Some((1.0, 3, 10)));
    }

    #[tokio::test]
    async fn test_click_requires_both_toggles() {
        let mut h = harness();
        h.dispatcher.handle(Command::Toggle(Toggle::Script));
        assert!(h.dispatcher.mouse_click().is_none());

        h.dispatcher.handle(Command::Toggle(Toggle::Click));
        let handle = h.dispatcher.mouse_click().unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(h.pointer.clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeat_trigger_dropped_but_other_kind_runs() {
        let mut h = harness();
        h.dispatcher.handle(Command::Toggle(Toggle::Script));
        h.dispatcher.handle(Command::Toggle(Toggle::Click));

        let first = h.dispatcher.mouse_move().unwrap();
        assert!(h.dispatcher.mouse_move().is_none());
        let click = h.dispatcher.mouse_click().unwrap();

        first.await.unwrap().unwrap();
        click.await.unwrap().unwrap();
        assert_eq!(h.pointer.moves.load(Ordering::SeqCst), 1);
        assert_eq!(h.pointer.clicks.load(Ordering::SeqCst), 1);

        // released after completion
        assert!(h.dispatcher.mouse_move().unwrap().await.unwrap().unwrap());
    }
}
