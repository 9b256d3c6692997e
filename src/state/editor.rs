/// Async transform queue on top of the session store
///
/// Requests for one photo run strictly in the order they were submitted,
/// whatever order the returned futures are polled in. Each request holds a
/// `Slot` that waits on the completion signal of the one submitted before
/// it, wired up synchronously inside `submit`. Requests for different photos
/// don't wait on each other.
///
/// Pixel work runs on tokio's blocking pool. The session mutex is only held
/// to read an item or to swap in a result, never across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbImage;
use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task;

use super::data::{PhotoId, PhotoItem, PhotoUpdate, TransformState};
use super::library::{Session, Snapshot};
use super::preferences::{PreferenceStore, REMOVEBG_API_KEY};
use crate::color::Color;
use crate::error::{EditorError, ExportError, InvalidDimensionError, TransformError};
use crate::export::{ExportOutput, Exporter};
use crate::raster::{loader, Raster};
use crate::render::{self, RenderedPage};
use crate::transform::{self, CropRegion, Orientation, RasterOp};

/// One edit request for a photo
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    /// Clockwise rotation in degrees
    Rotate { degrees: f64 },
    Flip { horizontal: bool, vertical: bool },
    /// Change the fill used behind the photo
    SetBackground { color: Color },
    /// Re-derive from the source: crop to the aspect ratio, then fill
    Crop { region: CropRegion, aspect_ratio: f64 },
    /// Bake a pending orientation left behind by an earlier failure
    BakePending,
    /// Result of background removal, still carrying transparency
    ReplaceWithCutout { raster: Raster },
}

/// What happened to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The new raster was stored
    Applied,
    /// The photo was deleted before the result arrived
    Discarded,
    /// Decoding failed, so the orientation was kept as a render hint
    DeferredAsPending,
}

/// External cutout service (e.g. an HTTP background removal API)
pub trait BackgroundRemover {
    type Error: std::fmt::Display;

    /// Return `raster` with its background made transparent
    fn remove_background(
        &self,
        raster: Raster,
        api_key: &str,
    ) -> impl Future<Output = Result<Raster, Self::Error>> + Send;
}

/// Everything needed to run one request, worked out from the item's state
/// at the moment the request reaches the front of its queue
struct Plan {
    input: Raster,
    op: RasterOp,
    update: PhotoUpdate,
    /// Orientation to record if the input can't be decoded
    fallback: Option<Orientation>,
}

impl Plan {
    fn for_item(item: &PhotoItem, op: TransformOp) -> Option<Plan> {
        let color = item.background;
        let pending = item.transform.pending();

        let bake = |orientation: Orientation, fallback: Option<Orientation>| Plan {
            input: item.processed.clone(),
            op: RasterOp::Combine { orientation, color },
            update: PhotoUpdate::default(),
            fallback,
        };

        let plan = match op {
            TransformOp::Rotate { degrees } => {
                let orientation = pending.then_rotate(degrees);
                bake(orientation, Some(orientation))
            }
            TransformOp::Flip { horizontal, vertical } => {
                let orientation = pending.then_flip(horizontal, vertical);
                bake(orientation, Some(orientation))
            }
            TransformOp::BakePending => {
                if pending.is_identity() {
                    return None;
                }
                bake(pending, None)
            }
            TransformOp::SetBackground { color } => Plan {
                input: item.processed.clone(),
                op: RasterOp::Background { color },
                update: PhotoUpdate {
                    background: Some(color),
                    ..Default::default()
                },
                fallback: None,
            },
            TransformOp::Crop { region, aspect_ratio } => Plan {
                input: item.source.clone(),
                op: RasterOp::CropToAspect {
                    region,
                    aspect_ratio,
                    color,
                },
                update: PhotoUpdate {
                    crop: Some(region),
                    ..Default::default()
                },
                fallback: None,
            },
            TransformOp::ReplaceWithCutout { raster } => Plan {
                input: raster,
                op: RasterOp::Background { color },
                update: PhotoUpdate::default(),
                fallback: None,
            },
        };
        Some(plan)
    }

    /// Transform state stored with the new raster
    fn next_state(&self, previous: TransformState) -> TransformState {
        match self.op {
            // Only a background change leaves a pending hint in place
            RasterOp::Background { .. } if self.update.background.is_some() => previous,
            _ => TransformState::Baked,
        }
    }
}

/// Tail of one photo's request chain
struct Tail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Queues {
    tails: HashMap<PhotoId, Tail>,
    next_seq: u64,
}

/// A reserved place in one photo's queue
///
/// Dropping the slot, finished or not, releases the next request and clears
/// the photo's tail entry if nothing was queued behind it.
struct Slot {
    id: PhotoId,
    seq: u64,
    previous: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
    queues: Arc<Mutex<Queues>>,
}

impl Slot {
    fn reserve(queues: &Arc<Mutex<Queues>>, id: PhotoId) -> Slot {
        let (done_tx, done_rx) = oneshot::channel();
        let mut guard = lock_queues(queues);
        let seq = guard.next_seq;
        guard.next_seq += 1;
        let previous = guard.tails.insert(id, Tail { seq, done: done_rx });
        Slot {
            id,
            seq,
            previous: previous.map(|tail| tail.done),
            _done: done_tx,
            queues: Arc::clone(queues),
        }
    }

    /// Wait until every earlier request for the photo has finished
    async fn ready(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Closed without a value when the earlier request is dropped
            let _ = previous.await;
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut queues = lock_queues(&self.queues);
        if queues.tails.get(&self.id).map(|tail| tail.seq) == Some(self.seq) {
            queues.tails.remove(&self.id);
        }
    }
}

/// Shared handle to the session plus its per-photo transform queues
#[derive(Clone)]
pub struct Editor {
    session: Arc<Mutex<Session>>,
    queues: Arc<Mutex<Queues>>,
}

impl Editor {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            queues: Arc::new(Mutex::new(Queues::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }

    /// Run a synchronous edit against the session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn get(&self, id: PhotoId) -> Option<PhotoItem> {
        self.lock().get(id).cloned()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Decode a new photo, composite it onto white and add it to the session
    pub async fn ingest(&self, source: Raster) -> Result<PhotoId, EditorError> {
        let input = source.clone();
        let (size, processed) = task::spawn_blocking(move || -> Result<_, TransformError> {
            let size = input.dimensions()?;
            let processed = transform::apply_background(&input, Color::WHITE)?;
            Ok((size, processed))
        })
        .await
        .map_err(|e| EditorError::Join(e.to_string()))??;

        Ok(self.lock().insert(source, processed, size)?)
    }

    /// Read a file from disk and ingest it
    pub async fn ingest_file(&self, path: &Path) -> Result<PhotoId, EditorError> {
        let (raster, _, _) = loader::load_file(path).await?;
        self.ingest(raster).await
    }

    /// Queue a transform for one photo
    ///
    /// The position in the photo's queue is taken now, not when the returned
    /// future is first polled. Dropping the future without polling it lets
    /// later requests go ahead.
    pub fn submit(
        &self,
        id: PhotoId,
        op: TransformOp,
    ) -> impl Future<Output = Result<TransformOutcome, EditorError>> + Send + 'static {
        let known = self.lock().contains(id);
        let slot = known.then(|| Slot::reserve(&self.queues, id));
        let session = Arc::clone(&self.session);

        async move {
            let mut slot = slot.ok_or(EditorError::UnknownPhoto(id))?;
            check_op(&op)?;
            slot.ready().await;
            run(&session, id, op).await
        }
    }

    /// Cut out the photo's background through `remover`
    ///
    /// Goes through the photo's queue like any other edit, taking its place
    /// when first polled: the remover gets the processed raster as left by
    /// every edit queued before that, and later edits wait for the cutout.
    /// Without an explicit key the stored `removebg_api_key` preference is
    /// used. The key is saved back after a successful call.
    pub async fn remove_background<R, P>(
        &self,
        id: PhotoId,
        remover: &R,
        preferences: &mut P,
        api_key: Option<String>,
    ) -> Result<TransformOutcome, EditorError>
    where
        R: BackgroundRemover,
        P: PreferenceStore,
    {
        let key = match api_key.filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => preferences
                .get(REMOVEBG_API_KEY)?
                .filter(|key| !key.is_empty())
                .ok_or(EditorError::MissingApiKey)?,
        };

        if !self.lock().contains(id) {
            return Err(EditorError::UnknownPhoto(id));
        }
        let mut slot = Slot::reserve(&self.queues, id);
        slot.ready().await;

        let Some(current) = self.get(id).map(|item| item.processed) else {
            debug!("🗑️  Photo {} was deleted before its cutout started", id);
            return Ok(TransformOutcome::Discarded);
        };

        let cutout = remover
            .remove_background(current, &key)
            .await
            .map_err(|e| EditorError::BackgroundRemoval(e.to_string()))?;

        let outcome = run(&self.session, id, TransformOp::ReplaceWithCutout { raster: cutout }).await?;
        drop(slot);

        preferences.set(REMOVEBG_API_KEY, &key)?;
        info!("✂️  Removed background of photo {}", id);
        Ok(outcome)
    }

    /// Delete a photo
    ///
    /// Queued edits for it still run in order and come back as
    /// `TransformOutcome::Discarded`.
    pub fn delete(&self, id: PhotoId) -> bool {
        self.lock().delete(id)
    }

    /// Number of photos with queued or running edits
    pub fn busy_photos(&self) -> usize {
        lock_queues(&self.queues).tails.len()
    }

    /// Render one page of the current session for display
    pub fn preview(
        &self,
        page_index: usize,
        scale: f64,
    ) -> Result<(RgbImage, RenderedPage), InvalidDimensionError> {
        render::render_preview(&self.snapshot(), page_index, scale)
    }

    /// Snapshot the session and export it
    pub async fn export(&self, exporter: &Exporter) -> Result<ExportOutput, ExportError> {
        exporter.export(self.snapshot()).await
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_queues(queues: &Mutex<Queues>) -> MutexGuard<'_, Queues> {
    queues.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reject requests that can never produce a raster
fn check_op(op: &TransformOp) -> Result<(), EditorError> {
    match op {
        TransformOp::Rotate { degrees } if !degrees.is_finite() => {
            Err(EditorError::InvalidRotation(*degrees))
        }
        _ => Ok(()),
    }
}

async fn run(
    session: &Mutex<Session>,
    id: PhotoId,
    op: TransformOp,
) -> Result<TransformOutcome, EditorError> {
    let Some(item) = lock_session(session).get(id).cloned() else {
        debug!("🗑️  Photo {} was deleted before its edit ran", id);
        return Ok(TransformOutcome::Discarded);
    };
    let Some(plan) = Plan::for_item(&item, op) else {
        return Ok(TransformOutcome::Applied);
    };

    let result = plan.op.clone().apply_async(plan.input.clone()).await;

    let mut session = lock_session(session);
    if !session.contains(id) {
        debug!("🗑️  Discarding result for deleted photo {}", id);
        return Ok(TransformOutcome::Discarded);
    }

    match result {
        Ok(raster) => {
            let state = plan.next_state(item.transform);
            session.replace_raster(id, raster, state, &plan.update);
            Ok(TransformOutcome::Applied)
        }
        Err(TransformError::Decode(error)) if plan.fallback.is_some() => {
            warn!("⚠️  Photo {} could not be decoded ({}), keeping the edit as pending", id, error);
            session.update(
                id,
                &PhotoUpdate {
                    pending: plan.fallback,
                    ..Default::default()
                },
            )?;
            Ok(TransformOutcome::DeferredAsPending)
        }
        Err(error) => Err(error.into()),
    }
}
