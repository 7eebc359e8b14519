//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use roadlore_application::{WakeLock, WakeLockError};
use roadlore_audio::AudioAsset;
use roadlore_context::{
    ContextProvider, ContextResult, ExploreMode, LookupError, NarrationError, NarrationProvider,
    Place, Position,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn sao_paulo() -> Position {
    Position::new(-23.5505, -46.6333)
}

pub fn place(id: &str, title: &str) -> Place {
    Place::new(id, title, sao_paulo())
}

/// The lookup result used by the reference scenarios.
pub fn old_square() -> ContextResult {
    ContextResult::new("Old square.")
        .with_highlight("Founded in 1560.")
        .with_place(place("p1", "Praça da Sé"))
}

/// Holds a provider call open until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// Context provider replaying a script of results; repeats the last one.
pub struct ScriptedContext {
    script: Mutex<VecDeque<Result<ContextResult, LookupError>>>,
    last: Mutex<Option<Result<ContextResult, LookupError>>>,
    gate: Mutex<Option<Arc<Gate>>>,
    calls: Mutex<Vec<(Position, ExploreMode)>>,
}

impl ScriptedContext {
    pub fn new(script: Vec<Result<ContextResult, LookupError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always(result: ContextResult) -> Arc<Self> {
        Self::new(vec![Ok(result)])
    }

    /// Gate the next call only.
    pub fn gate_next(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Position, ExploreMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextProvider for ScriptedContext {
    async fn lookup(
        &self,
        position: &Position,
        mode: ExploreMode,
    ) -> Result<ContextResult, LookupError> {
        self.calls.lock().unwrap().push((*position, mode));

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Err(LookupError::Provider("script exhausted".into())))
    }
}

/// Narration provider that records every request.
pub struct CountingNarrator {
    texts: Mutex<Vec<String>>,
    fail: bool,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl CountingNarrator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            texts: Mutex::new(Vec::new()),
            fail: false,
            gate: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            texts: Mutex::new(Vec::new()),
            fail: true,
            gate: Mutex::new(None),
        })
    }

    pub fn gate_next(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.texts.lock().unwrap().len()
    }
}

#[async_trait]
impl NarrationProvider for CountingNarrator {
    async fn narrate(&self, text: &str) -> Result<AudioAsset, NarrationError> {
        self.texts.lock().unwrap().push(text.to_string());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if self.fail {
            return Err(NarrationError::Failed("tts quota exceeded".into()));
        }
        Ok(AudioAsset::new(vec![0.25; 4800], 24000, 1)?)
    }
}

#[derive(Default)]
pub struct CountingWakeLock {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub fail: bool,
}

impl CountingWakeLock {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self) -> Result<(), WakeLockError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WakeLockError("screen lock not supported".into()));
        }
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Yield to spawned tasks until `condition` holds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
