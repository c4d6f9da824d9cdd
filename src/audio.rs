// audio.rs - named audio elements, toggling, and the ambient/interview cycle

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("no audio output device")]
    NoOutput,
    #[error("cannot create audio sink: {0}")]
    Sink(String),
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("cannot decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("playback worker went away")]
    Disconnected,
}

pub type PlaybackResult = Result<(), PlaybackError>;

/// Completion signal of a play request; fulfilled later, never awaited.
pub type PlaybackTicket = Receiver<PlaybackResult>;

/// A media element that can be started, paused and rewound.
pub trait AudioElement {
    fn play(&mut self) -> PlaybackTicket;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Back to time 0. Output stops until the next `play`.
    fn rewind(&mut self);
}

pub trait AudioBackend {
    fn open(&mut self, path: &Path, looping: bool) -> Box<dyn AudioElement>;
}

fn ready(result: PlaybackResult) -> PlaybackTicket {
    let (tx, rx) = channel();
    let _ = tx.send(result);
    rx
}

/// rodio output. Keeps the stream alive for as long as the backend lives.
pub struct RodioBackend {
    _stream: Option<OutputStream>,
    handle: Option<OutputStreamHandle>,
}

impl RodioBackend {
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok((stream, handle)) => Self {
                _stream: Some(stream),
                handle: Some(handle),
            },
            Err(e) => {
                log::warn!("audio disabled: {e}");
                Self {
                    _stream: None,
                    handle: None,
                }
            }
        }
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioBackend {
    fn open(&mut self, path: &Path, looping: bool) -> Box<dyn AudioElement> {
        Box::new(RodioElement {
            path: path.to_path_buf(),
            looping,
            handle: self.handle.clone(),
            sink: None,
            load: LoadTracker::default(),
            playing: false,
        })
    }
}

/// Decode progress of a rodio element, shared with its worker thread.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Default)]
struct LoadSlot {
    state: LoadState,
    /// Tickets handed out while the decode runs; all settle with its result.
    waiters: Vec<Sender<PlaybackResult>>,
}

#[derive(Clone, Default)]
struct LoadTracker(Arc<Mutex<LoadSlot>>);

impl LoadTracker {
    fn state(&self) -> LoadState {
        self.0.lock().map(|slot| slot.state).unwrap_or(LoadState::Failed)
    }

    fn begin(&self) -> PlaybackTicket {
        let (tx, rx) = channel();
        if let Ok(mut slot) = self.0.lock() {
            slot.state = LoadState::Loading;
            slot.waiters.push(tx);
        }
        rx
    }

    /// Ticket that settles with the decode in flight. Without one the sender
    /// is dropped and the ticket reads as disconnected.
    fn wait(&self) -> PlaybackTicket {
        let (tx, rx) = channel();
        if let Ok(mut slot) = self.0.lock() {
            match slot.state {
                LoadState::Loading => slot.waiters.push(tx),
                LoadState::Loaded => {
                    let _ = tx.send(Ok(()));
                }
                LoadState::Unloaded | LoadState::Failed => {}
            }
        }
        rx
    }

    fn finish(&self, result: PlaybackResult) {
        if let Ok(mut slot) = self.0.lock() {
            slot.state = if result.is_ok() {
                LoadState::Loaded
            } else {
                LoadState::Failed
            };
            for tx in slot.waiters.drain(..) {
                let _ = tx.send(result.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlayPlan {
    /// Source queued and not drained: unpause.
    Resume,
    /// Decode still running: unpause and settle with the decode.
    AwaitLoad,
    /// Nothing usable queued: new sink, new decode.
    Reload,
}

fn plan_play(state: LoadState, sink_empty: bool) -> PlayPlan {
    match state {
        LoadState::Loading => PlayPlan::AwaitLoad,
        LoadState::Loaded if !sink_empty => PlayPlan::Resume,
        _ => PlayPlan::Reload,
    }
}

fn reads_as_paused(state: LoadState, playing: bool, sink_paused: bool, sink_empty: bool) -> bool {
    match state {
        LoadState::Unloaded | LoadState::Failed => true,
        LoadState::Loading => !playing || sink_paused,
        LoadState::Loaded => !playing || sink_paused || sink_empty,
    }
}

fn decode_into(path: &Path, looping: bool, sink: &Sink) -> PlaybackResult {
    let shown = path.display().to_string();
    let file = File::open(path).map_err(|e| PlaybackError::Open {
        path: shown.clone(),
        reason: e.to_string(),
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: shown,
        reason: e.to_string(),
    })?;
    if looping {
        sink.append(decoder.repeat_infinite());
    } else {
        sink.append(decoder);
    }
    Ok(())
}

struct RodioElement {
    path: PathBuf,
    looping: bool,
    handle: Option<OutputStreamHandle>,
    sink: Option<Arc<Sink>>,
    load: LoadTracker,
    playing: bool,
}

impl AudioElement for RodioElement {
    fn play(&mut self) -> PlaybackTicket {
        let plan = match &self.sink {
            Some(sink) => plan_play(self.load.state(), sink.empty()),
            None => PlayPlan::Reload,
        };

        match (plan, &self.sink) {
            (PlayPlan::Resume, Some(sink)) => {
                sink.play();
                self.playing = true;
                return ready(Ok(()));
            }
            (PlayPlan::AwaitLoad, Some(sink)) => {
                sink.play();
                self.playing = true;
                return self.load.wait();
            }
            _ => {}
        }

        let Some(handle) = &self.handle else {
            return ready(Err(PlaybackError::NoOutput));
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let sink = match Sink::try_new(handle) {
            Ok(s) => Arc::new(s),
            Err(e) => return ready(Err(PlaybackError::Sink(e.to_string()))),
        };
        self.sink = Some(sink.clone());
        self.load = LoadTracker::default();
        self.playing = true;

        let ticket = self.load.begin();
        let load = self.load.clone();
        let path = self.path.clone();
        let looping = self.looping;
        thread::spawn(move || load.finish(decode_into(&path, looping, &sink)));
        ticket
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.playing = false;
    }

    fn is_paused(&self) -> bool {
        match &self.sink {
            Some(sink) => reads_as_paused(self.load.state(), self.playing, sink.is_paused(), sink.empty()),
            None => true,
        }
    }

    fn rewind(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        // a decode still running settles on the old tracker
        self.load = LoadTracker::default();
        self.playing = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackStatus {
    Idle,
    /// Play requested, outcome not known yet.
    Pending,
    Playing,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OnSuccess {
    Nothing,
    /// Show this cycle index once playback actually started.
    CycleIndex(i32),
}

struct PendingPlay {
    key: String,
    ticket: PlaybackTicket,
    on_success: OnSuccess,
}

/// Ambient loop plus an ordered list of interview tracks.
/// Index -1 means no interview is selected and the ambient track owns the output.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCycle {
    pub ambient: Option<String>,
    pub tracks: Vec<String>,
    index: i32,
    shown_index: i32,
}

impl AudioCycle {
    pub fn new(ambient: Option<String>, tracks: Vec<String>) -> Self {
        Self {
            ambient,
            tracks,
            index: -1,
            shown_index: -1,
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    /// Index the control should display; only moves once playback succeeded.
    pub fn shown_index(&self) -> i32 {
        self.shown_index
    }

    fn selected(&self) -> Option<&str> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.tracks.get(i))
            .map(String::as_str)
    }
}

pub struct AudioPresenter {
    backend: Box<dyn AudioBackend>,
    library: HashMap<String, PathBuf>,
    elements: HashMap<String, Box<dyn AudioElement>>,
    status: HashMap<String, PlaybackStatus>,
    pending: Vec<PendingPlay>,
    cycle: Option<AudioCycle>,
    muted: bool,
    /// Most recent failed key and message.
    last_failure: Option<(String, String)>,
}

impl AudioPresenter {
    /// `library` maps selectors to files. The ambient element loops.
    pub fn new(
        backend: Box<dyn AudioBackend>,
        library: HashMap<String, PathBuf>,
        cycle: Option<AudioCycle>,
    ) -> Self {
        Self {
            backend,
            library,
            elements: HashMap::new(),
            status: HashMap::new(),
            pending: Vec::new(),
            cycle,
            muted: false,
            last_failure: None,
        }
    }

    pub fn cycle(&self) -> Option<&AudioCycle> {
        self.cycle.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn status(&self, key: &str) -> PlaybackStatus {
        self.status.get(key).cloned().unwrap_or(PlaybackStatus::Idle)
    }

    /// Playing as far as the UI is concerned: started successfully and not paused since.
    pub fn is_active(&self, key: &str) -> bool {
        self.status(key) == PlaybackStatus::Playing
            && self.elements.get(key).is_some_and(|e| !e.is_paused())
    }

    /// Latest failure, for the status line. Cleared once that element is
    /// paused, stopped or started again.
    pub fn last_failure(&self) -> Option<(&str, &str)> {
        let (key, msg) = self.last_failure.as_ref()?;
        matches!(self.status.get(key), Some(PlaybackStatus::Failed(_))).then(|| (key.as_str(), msg.as_str()))
    }

    fn is_ambient(&self, key: &str) -> bool {
        self.cycle.as_ref().and_then(|c| c.ambient.as_deref()) == Some(key)
    }

    fn sounding(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter(|(_, e)| !e.is_paused())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Pauses every other sounding element, ambient included, so `key` plays
    /// alone. A foreign element taking over sends the cycle back to ambient.
    fn claim_output(&mut self, key: &str) {
        for other in self.sounding() {
            if other != key {
                self.pause(&other);
            }
        }
        if let Some(c) = self.cycle.as_mut() {
            if c.index >= 0 && c.selected() != Some(key) {
                c.index = -1;
                c.shown_index = -1;
            }
        }
    }

    fn start_foreground(&mut self, key: &str, on_success: OnSuccess) -> bool {
        self.muted = false;
        self.claim_output(key);
        self.start(key, on_success)
    }

    fn element(&mut self, key: &str) -> Option<&mut Box<dyn AudioElement>> {
        if !self.elements.contains_key(key) {
            let path = self.library.get(key)?.clone();
            let looping = self.is_ambient(key);
            let element = self.backend.open(&path, looping);
            self.elements.insert(key.to_string(), element);
        }
        self.elements.get_mut(key)
    }

    fn start(&mut self, key: &str, on_success: OnSuccess) -> bool {
        let Some(element) = self.element(key) else {
            log::warn!("audio element not found: {key}");
            return false;
        };
        let ticket = element.play();
        self.status.insert(key.to_string(), PlaybackStatus::Pending);
        self.pending.push(PendingPlay {
            key: key.to_string(),
            ticket,
            on_success,
        });
        true
    }

    fn pause(&mut self, key: &str) {
        if let Some(element) = self.elements.get_mut(key) {
            element.pause();
            self.status.insert(key.to_string(), PlaybackStatus::Idle);
        }
    }

    fn stop(&mut self, key: &str) {
        if let Some(element) = self.elements.get_mut(key) {
            element.pause();
            element.rewind();
            self.status.insert(key.to_string(), PlaybackStatus::Idle);
        }
    }

    /// Play if paused, pause otherwise. Starting a foreground element pauses
    /// whatever else is sounding. Unknown selectors warn and do nothing.
    pub fn toggle(&mut self, selector: &str) -> bool {
        let Some(element) = self.element(selector) else {
            log::warn!("audio element not found: {selector}");
            return false;
        };
        let paused = element.is_paused();
        if paused && self.is_ambient(selector) {
            self.start(selector, OnSuccess::Nothing)
        } else if paused {
            self.start_foreground(selector, OnSuccess::Nothing)
        } else {
            self.pause(selector);
            true
        }
    }

    /// Toggle for a file referenced directly (modal track lists).
    pub fn toggle_path(&mut self, path: &Path) -> bool {
        let key = path.display().to_string();
        self.library
            .entry(key.clone())
            .or_insert_with(|| path.to_path_buf());
        self.toggle(&key)
    }

    /// Ambient autoplay at startup.
    pub fn start_ambient(&mut self) {
        if let Some(ambient) = self.cycle.as_ref().and_then(|c| c.ambient.clone()) {
            self.start(&ambient, OnSuccess::Nothing);
        }
    }

    /// Advances the cycle: ambient -> track 0 -> ... -> last track -> ambient.
    pub fn advance_cycle(&mut self) {
        let Some(cycle) = self.cycle.clone() else {
            return;
        };
        self.muted = false;

        let next = cycle.index + 1;
        let next_track = usize::try_from(next)
            .ok()
            .and_then(|i| cycle.tracks.get(i))
            .cloned();

        match next_track {
            Some(track) => {
                if let Some(ambient) = &cycle.ambient {
                    self.pause(ambient);
                }
                if let Some(prev) = cycle.selected() {
                    self.stop(prev);
                }
                // the previous track is silent now; the label follows on success
                if let Some(c) = self.cycle.as_mut() {
                    c.index = next;
                    c.shown_index = -1;
                }
                self.stop(&track);
                self.start_foreground(&track, OnSuccess::CycleIndex(next));
            }
            None => {
                for track in &cycle.tracks {
                    self.stop(track);
                }
                if let Some(c) = self.cycle.as_mut() {
                    c.index = -1;
                    c.shown_index = -1;
                }
                if let Some(ambient) = &cycle.ambient {
                    self.stop(ambient);
                    self.start(ambient, OnSuccess::Nothing);
                }
            }
        }
    }

    /// Global mute: silences everything; un-muting resumes the selected
    /// interview, or the ambient loop when none is selected.
    pub fn toggle_mute(&mut self) {
        let Some(cycle) = self.cycle.clone() else {
            return;
        };
        if self.muted {
            self.muted = false;
            match cycle.selected() {
                Some(track) => {
                    self.start_foreground(track, OnSuccess::Nothing);
                }
                None => {
                    if let Some(ambient) = &cycle.ambient {
                        self.start(ambient, OnSuccess::Nothing);
                    }
                }
            }
        } else {
            self.muted = true;
            for key in self.sounding() {
                self.pause(&key);
            }
        }
    }

    /// Applies playback outcomes that arrived since the last frame.
    pub fn poll(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        // A newer request for the same element supersedes older ones.
        let superseded: Vec<bool> = pending
            .iter()
            .enumerate()
            .map(|(i, p)| pending[i + 1..].iter().any(|q| q.key == p.key))
            .collect();

        let mut still_pending = Vec::new();
        for (p, superseded) in pending.into_iter().zip(superseded) {
            let outcome = match p.ticket.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => {
                    if !superseded {
                        still_pending.push(p);
                    }
                    continue;
                }
                Err(TryRecvError::Disconnected) => Err(PlaybackError::Disconnected),
            };
            if superseded {
                continue;
            }

            match outcome {
                Ok(()) => {
                    if self.status(&p.key) == PlaybackStatus::Pending {
                        self.status.insert(p.key.clone(), PlaybackStatus::Playing);
                    }
                    if let OnSuccess::CycleIndex(i) = p.on_success {
                        if let Some(c) = self.cycle.as_mut() {
                            if c.index == i {
                                c.shown_index = i;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::warn!("playback of {} failed: {e}", p.key);
                    self.status.insert(p.key.clone(), PlaybackStatus::Failed(e.to_string()));
                    self.last_failure = Some((p.key.clone(), e.to_string()));
                }
            }
        }
        self.pending = still_pending;
    }
}

/// In-memory element used by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone, PartialEq)]
    pub(crate) struct FakeState {
        pub playing: bool,
        pub current_time: f32,
        pub plays: u32,
        pub looping: bool,
    }

    #[derive(Default, Clone)]
    pub(crate) struct FakeBackend {
        pub states: Rc<RefCell<HashMap<PathBuf, FakeState>>>,
        pub failing: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl FakeBackend {
        pub fn state(&self, path: &str) -> FakeState {
            self.states.borrow().get(Path::new(path)).cloned().unwrap_or_default()
        }

        pub fn advance_time(&self, path: &str, secs: f32) {
            if let Some(s) = self.states.borrow_mut().get_mut(Path::new(path)) {
                s.current_time += secs;
            }
        }
    }

    struct FakeElement {
        path: PathBuf,
        backend: FakeBackend,
    }

    impl AudioElement for FakeElement {
        fn play(&mut self) -> PlaybackTicket {
            if self.backend.failing.borrow().contains(&self.path) {
                return ready(Err(PlaybackError::Decode {
                    path: self.path.display().to_string(),
                    reason: "blocked".into(),
                }));
            }
            let mut states = self.backend.states.borrow_mut();
            let s = states.entry(self.path.clone()).or_default();
            s.playing = true;
            s.plays += 1;
            ready(Ok(()))
        }

        fn pause(&mut self) {
            if let Some(s) = self.backend.states.borrow_mut().get_mut(&self.path) {
                s.playing = false;
            }
        }

        fn is_paused(&self) -> bool {
            !self.backend.state(&self.path.display().to_string()).playing
        }

        fn rewind(&mut self) {
            if let Some(s) = self.backend.states.borrow_mut().get_mut(&self.path) {
                s.current_time = 0.0;
                s.playing = false;
            }
        }
    }

    impl AudioBackend for FakeBackend {
        fn open(&mut self, path: &Path, looping: bool) -> Box<dyn AudioElement> {
            self.states
                .borrow_mut()
                .entry(path.to_path_buf())
                .or_default()
                .looping = looping;
            Box::new(FakeElement {
                path: path.to_path_buf(),
                backend: self.clone(),
            })
        }
    }
}
