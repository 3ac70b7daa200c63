//! The board session: bootstrap, sync bridge, undo/redo, and auto-save.
//!
//! DESIGN
//! ======
//! One `BoardSession` per participant per board. Local mutations commit
//! the pre-mutation snapshot to history and push the new serialization to
//! the shared cell immediately; incoming cell changes are applied behind
//! the mode state machine so the session's own echo and the adapter
//! events raised by a remote load never loop back out. All cross-session
//! consistency is last-writer-wins at whole-document granularity — the
//! bridge always writes the full local serialization, never
//! read-modify-write.
//!
//! LIFECYCLE
//! =========
//! 1. `connect` — init the scene host, bootstrap (cell first, durable
//!    record as fallback, seeding the cell from the fallback), spawn the
//!    remote/peer/auto-save tasks, publish initial presence.
//! 2. Edits, undo/redo, cursor updates.
//! 3. `shutdown` — abort tasks, final durable flush, announce departure.
//!    In-flight cell writes are fire-and-forget and not cancelled.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scene::{SceneDocument, SceneObject};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::EngineError;
use crate::adapter::{SceneEvent, SceneHost};
use crate::history::History;
use crate::mode::Mode;
use crate::presence::{PeerEvent, PresenceRecord, Roster, random_color};
use crate::remote::{BoardStore, PresenceChannel, SharedCell};

/// Pause after applying a remote update before local writes resume, so
/// adapter-internal events raised by the load drain without re-broadcast.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Default durable flush interval.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// OPTIONS
// =============================================================================

/// Per-session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Display name published with presence.
    pub name: String,
    /// Presence color. Randomized from the shared palette when `None`.
    pub color: Option<String>,
    /// Whether the periodic durable flush runs.
    pub auto_save: bool,
    /// Durable flush interval. Tests shrink this.
    pub autosave_interval: Duration,
}

impl SessionOptions {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            auto_save: true,
            autosave_interval: AUTOSAVE_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    #[must_use]
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// State shared with the background tasks.
struct Shared {
    board_id: Uuid,
    host: Mutex<SceneHost>,
    history: Mutex<History>,
    mode: Mutex<Mode>,
    /// Last serialization known to match the shared cell. Incoming
    /// notifications equal to this are echoes or no-ops and are skipped.
    last_sync: Mutex<String>,
    roster: Mutex<Roster>,
    cell: Arc<dyn SharedCell>,
    store: Arc<dyn BoardStore>,
    presence: Arc<dyn PresenceChannel>,
    auto_save: AtomicBool,
}

/// One participant's live editing session on one board.
pub struct BoardSession {
    shared: Arc<Shared>,
    client_id: Uuid,
    name: String,
    color: String,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

enum Restore {
    Undo,
    Redo,
}

impl BoardSession {
    /// Open a session: initialize the scene host, bootstrap scene content,
    /// start the sync/presence/auto-save tasks, and publish presence.
    ///
    /// # Errors
    ///
    /// Currently infallible beyond future collaborator construction
    /// failures; bootstrap I/O errors degrade to an empty scene and are
    /// logged, per the session's no-fatal-failures policy.
    pub async fn connect(
        board_id: Uuid,
        cell: Arc<dyn SharedCell>,
        store: Arc<dyn BoardStore>,
        presence: Arc<dyn PresenceChannel>,
        options: SessionOptions,
    ) -> Result<Self, EngineError> {
        let client_id = presence.client_id();
        let color = options.color.clone().unwrap_or_else(random_color);

        let mut host = SceneHost::new();
        host.init();

        // Subscribe before bootstrap so a write landing between the seed
        // and the listener start is still observed.
        let changes = cell.changes();
        let peer_events = presence.peers();

        let shared = Arc::new(Shared {
            board_id,
            host: Mutex::new(host),
            history: Mutex::new(History::new()),
            mode: Mutex::new(Mode::Idle),
            last_sync: Mutex::new(String::new()),
            roster: Mutex::new(Roster::new()),
            cell,
            store,
            presence,
            auto_save: AtomicBool::new(options.auto_save),
        });

        bootstrap(&shared).await;

        let session = Self {
            shared: Arc::clone(&shared),
            client_id,
            name: options.name.clone(),
            color: color.clone(),
            tasks: Mutex::new(Vec::new()),
        };

        {
            let mut tasks = session.tasks.lock().await;
            tasks.push(tokio::spawn(remote_listener(Arc::clone(&shared), changes)));
            tasks.push(tokio::spawn(peer_listener(Arc::clone(&shared), peer_events, client_id)));
            tasks.push(tokio::spawn(autosave_loop(Arc::clone(&shared), options.autosave_interval)));
        }

        if let Err(e) = shared.presence.publish(PresenceRecord::new(&options.name, &color)).await {
            warn!(error = %e, "initial presence publish failed");
        }

        info!(%board_id, %client_id, "session connected");
        Ok(session)
    }

    // =========================================================================
    // LOCAL MUTATIONS
    // =========================================================================

    /// Append an object to the scene.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] if the scene host is not
    /// initialized.
    pub async fn add_object(&self, obj: SceneObject) -> Result<(), EngineError> {
        let before = {
            let mut host = self.shared.host.lock().await;
            let before = host.serialize_scene();
            host.add_object(obj)?;
            before
        };
        self.after_local_mutation(before).await;
        Ok(())
    }

    /// Merge attribute updates into the object at `index`. Returns `false`
    /// when the index is out of range (nothing committed or broadcast).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] if the scene host is not
    /// initialized.
    pub async fn update_object(&self, index: usize, patch: &Map<String, Value>) -> Result<bool, EngineError> {
        let before = {
            let mut host = self.shared.host.lock().await;
            let before = host.serialize_scene();
            if !host.update_object(index, patch)? {
                return Ok(false);
            }
            before
        };
        self.after_local_mutation(before).await;
        Ok(true)
    }

    /// Remove the object at `index`. Returns `false` when out of range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] if the scene host is not
    /// initialized.
    pub async fn remove_object(&self, index: usize) -> Result<bool, EngineError> {
        let before = {
            let mut host = self.shared.host.lock().await;
            let before = host.serialize_scene();
            if !host.remove_object(index)? {
                return Ok(false);
            }
            before
        };
        self.after_local_mutation(before).await;
        Ok(true)
    }

    /// History commit + cell push for a completed local mutation.
    async fn after_local_mutation(&self, before: String) {
        let mode = *self.shared.mode.lock().await;
        if mode == Mode::RestoringHistory {
            // Undo/redo side effects never re-enter history.
            return;
        }

        self.shared.history.lock().await.commit(before);

        if mode == Mode::ApplyingRemote {
            // Settling window: suppress the re-broadcast.
            return;
        }

        let json = self.shared.host.lock().await.serialize_scene();
        *self.shared.last_sync.lock().await = json.clone();
        push_to_cell(&self.shared, json);
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    /// Step back one snapshot. Returns `false` when there is nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Busy`] while a remote update is settling.
    pub async fn undo(&self) -> Result<bool, EngineError> {
        self.restore(Restore::Undo).await
    }

    /// Step forward one snapshot. Returns `false` when there is nothing
    /// to redo.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Busy`] while a remote update is settling.
    pub async fn redo(&self) -> Result<bool, EngineError> {
        self.restore(Restore::Redo).await
    }

    async fn restore(&self, direction: Restore) -> Result<bool, EngineError> {
        self.shared.mode.lock().await.begin_restoring_history()?;
        let result = self.restore_inner(direction).await;
        self.shared.mode.lock().await.finish();
        result
    }

    async fn restore_inner(&self, direction: Restore) -> Result<bool, EngineError> {
        let current = self.shared.host.lock().await.serialize_scene();
        let snapshot = {
            let mut history = self.shared.history.lock().await;
            match direction {
                Restore::Undo => history.undo(current),
                Restore::Redo => history.redo(current),
            }
        };
        let Some(snapshot) = snapshot else {
            return Ok(false);
        };

        let applied = self.shared.host.lock().await.load_scene(&snapshot)?;
        if applied {
            // Restored state propagates to peers like any other edit.
            *self.shared.last_sync.lock().await = snapshot.clone();
            push_to_cell(&self.shared, snapshot);
        }
        Ok(applied)
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    /// Publish the local pointer position. Called on every pointer move
    /// over the canvas; no local throttling.
    pub async fn pointer_moved(&self, x: f64, y: f64) {
        let record = PresenceRecord::new(&self.name, &self.color).at(x, y);
        if let Err(e) = self.shared.presence.publish(record).await {
            warn!(error = %e, "presence publish failed");
        }
    }

    /// Publish that the pointer left the canvas.
    pub async fn pointer_left(&self) {
        let record = PresenceRecord::new(&self.name, &self.color);
        if let Err(e) = self.shared.presence.publish(record).await {
            warn!(error = %e, "presence publish failed");
        }
    }

    /// Peer cursors currently worth rendering.
    pub async fn visible_cursors(&self) -> Vec<(Uuid, PresenceRecord)> {
        self.shared
            .roster
            .lock()
            .await
            .visible_cursors()
            .into_iter()
            .map(|(id, record)| (id, record.clone()))
            .collect()
    }

    /// Connected peer count, visible cursor or not.
    pub async fn peer_count(&self) -> usize {
        self.shared.roster.lock().await.len()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Current scene serialization.
    pub async fn scene_json(&self) -> String {
        self.shared.host.lock().await.serialize_scene()
    }

    /// Snapshot of the current document.
    pub async fn document(&self) -> SceneDocument {
        self.shared.host.lock().await.document().clone()
    }

    /// Visual-surface repaints so far.
    pub async fn render_count(&self) -> u64 {
        self.shared.host.lock().await.render_count()
    }

    /// Mutation events for the hosting UI.
    pub async fn subscribe_events(&self) -> broadcast::Receiver<SceneEvent> {
        self.shared.host.lock().await.subscribe()
    }

    pub async fn can_undo(&self) -> bool {
        self.shared.history.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.shared.history.lock().await.can_redo()
    }

    /// `(past, future)` stack depths.
    pub async fn history_depth(&self) -> (usize, usize) {
        let history = self.shared.history.lock().await;
        (history.past_len(), history.future_len())
    }

    /// Toggle the periodic durable flush.
    pub fn set_auto_save(&self, enabled: bool) {
        self.shared.auto_save.store(enabled, Ordering::Relaxed);
    }

    /// Flatten the current scene to SVG for the download surface.
    pub async fn export_svg(&self) -> String {
        scene::export::to_svg(self.shared.host.lock().await.document())
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// On-demand durable flush of the current scene.
    ///
    /// # Errors
    ///
    /// Surfaces the store failure to the caller; the operation is not
    /// retried automatically.
    pub async fn flush_now(&self) -> Result<(), EngineError> {
        let json = self.shared.host.lock().await.serialize_scene();
        self.shared.store.update_board_data(self.shared.board_id, &json).await?;
        Ok(())
    }

    /// Tear the session down: stop background tasks, flush once more, and
    /// announce departure. In-flight cell writes are not cancelled.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        let json = self.shared.host.lock().await.serialize_scene();
        if let Err(e) = self.shared.store.update_board_data(self.shared.board_id, &json).await {
            warn!(error = %e, "final durable flush failed");
        }
        if let Err(e) = self.shared.presence.disconnect().await {
            warn!(error = %e, "presence disconnect failed");
        }

        info!(board_id = %self.shared.board_id, client_id = %self.client_id, "session closed");
    }
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

/// Bootstrap policy: non-empty cell content is authoritative; otherwise
/// fall back to the durable board record and, when that is non-empty,
/// seed the cell with it so later joiners converge.
async fn bootstrap(shared: &Arc<Shared>) {
    let cell_content = match shared.cell.read().await {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "cell read failed at bootstrap; falling back to board store");
            String::new()
        }
    };

    if !SceneDocument::is_placeholder(&cell_content) {
        let loaded = shared
            .host
            .lock()
            .await
            .load_scene(&cell_content)
            .unwrap_or(false);
        if loaded {
            *shared.last_sync.lock().await = cell_content;
            info!(board_id = %shared.board_id, "bootstrapped from shared cell");
        }
        return;
    }

    match shared.store.fetch_board(shared.board_id).await {
        Ok(Some(record)) if !SceneDocument::is_placeholder(&record.data) => {
            let loaded = shared
                .host
                .lock()
                .await
                .load_scene(&record.data)
                .unwrap_or(false);
            if loaded {
                *shared.last_sync.lock().await = record.data.clone();
                if let Err(e) = shared.cell.write(record.data).await {
                    warn!(error = %e, "cell seed from board record failed");
                }
                info!(board_id = %shared.board_id, "bootstrapped from board record");
            }
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "board fetch failed at bootstrap; starting empty");
        }
    }
}

// =============================================================================
// BACKGROUND TASKS
// =============================================================================

/// Fire-and-forget cell write, off the caller's latency path.
fn push_to_cell(shared: &Arc<Shared>, json: String) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        if let Err(e) = shared.cell.write(json).await {
            warn!(error = %e, "cell write failed");
        }
    });
}

async fn remote_listener(shared: Arc<Shared>, mut changes: broadcast::Receiver<String>) {
    loop {
        match changes.recv().await {
            Ok(json) => apply_remote(&shared, json).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "remote change notifications lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Apply one incoming cell change unless it is an echo, a no-op, or the
/// session is mid-transition.
async fn apply_remote(shared: &Arc<Shared>, json: String) {
    {
        let mut mode = shared.mode.lock().await;
        if !mode.is_idle() {
            return;
        }
        if *shared.last_sync.lock().await == json {
            // Identical to the last known serialization: skip the reload.
            return;
        }
        // Just verified Idle; the transition cannot fail.
        let _ = mode.begin_applying_remote();
    }

    let applied = shared.host.lock().await.load_scene(&json).unwrap_or(false);
    if applied {
        *shared.last_sync.lock().await = json;
    }

    tokio::time::sleep(SETTLE_DELAY).await;
    shared.mode.lock().await.finish();
}

async fn peer_listener(shared: Arc<Shared>, mut events: broadcast::Receiver<PeerEvent>, client_id: Uuid) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let own = match &event {
                    PeerEvent::Update { client_id: id, .. } | PeerEvent::Left { client_id: id } => *id == client_id,
                };
                if !own {
                    shared.roster.lock().await.apply(event);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "peer presence notifications lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn autosave_loop(shared: Arc<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so a fresh session
    // does not flush before anything changed.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !shared.auto_save.load(Ordering::Relaxed) {
            continue;
        }
        let json = shared.host.lock().await.serialize_scene();
        if let Err(e) = shared.store.update_board_data(shared.board_id, &json).await {
            warn!(error = %e, "auto-save flush failed");
        }
    }
}
