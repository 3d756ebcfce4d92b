//! Off-thread avatar rendering.
//!
//! [`AvatarTaskPool`] runs badge renders on tokio's blocking pool while
//! bounding how many run at once. Every submission gets an [`AvatarHandle`]
//! that can cancel it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use drips_core::avatar::{AvatarImage, BadgeRenderer, BadgeSize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Identifies one submitted render.
#[derive(Debug, Clone)]
pub struct AvatarHandle {
    id: u64,
    key: usize,
    token: CancellationToken,
}

impl AvatarHandle {
    /// Unique per pool.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Caller-chosen key the render was submitted under (a row index).
    pub fn key(&self) -> usize {
        self.key
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A finished render, handed to the submitter's callback.
#[derive(Debug, Clone)]
pub struct AvatarRender {
    pub handle: AvatarHandle,
    pub initials: String,
    /// `None` when the renderer panicked.
    pub image: Option<AvatarImage>,
}

impl AvatarRender {
    /// True when the render was cancelled after it had already started.
    /// The image must then be discarded.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

/// Concurrency-limited badge renderer.
///
/// Cancellation is cooperative. A job cancelled before it gets a worker slot
/// never renders and never calls back. A job cancelled mid-render still calls
/// back, with [`AvatarRender::is_cancelled`] set. Every job that started calls
/// back exactly once, including when the renderer panics.
pub struct AvatarTaskPool {
    renderer: Arc<dyn BadgeRenderer>,
    badge_size: BadgeSize,
    workers: usize,
    permits: Arc<Semaphore>,
    /// Parent of every live job token; replaced on `cancel_all`.
    generation: Mutex<CancellationToken>,
    next_id: AtomicU64,
}

impl AvatarTaskPool {
    pub fn new(renderer: Arc<dyn BadgeRenderer>, workers: usize, badge_size: BadgeSize) -> Self {
        let workers = workers.max(1);
        Self {
            renderer,
            badge_size,
            workers,
            permits: Arc::new(Semaphore::new(workers)),
            generation: Mutex::new(CancellationToken::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn badge_size(&self) -> BadgeSize {
        self.badge_size
    }

    /// Queues a render of `initials` and returns its handle.
    ///
    /// `on_complete` runs on a pool task, not on the caller's task. Callers
    /// that own single-threaded state should forward the result over a
    /// channel rather than touch that state from the callback.
    pub fn submit<F>(&self, key: usize, initials: impl Into<String>, on_complete: F) -> AvatarHandle
    where
        F: FnOnce(AvatarRender) + Send + 'static,
    {
        let initials = initials.into();
        let token = self.current_generation().child_token();
        let handle = AvatarHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            key,
            token: token.clone(),
        };

        let job_handle = handle.clone();
        let permits = Arc::clone(&self.permits);
        let renderer = Arc::clone(&self.renderer);
        let size = self.badge_size;

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::trace!("[AvatarTaskPool] Job {} for row {} cancelled before start", job_handle.id, key);
                    return;
                }
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            if token.is_cancelled() {
                return;
            }

            let text = initials.clone();
            let rendered = tokio::task::spawn_blocking(move || renderer.render(&text, size)).await;
            drop(permit);

            let image = match rendered {
                Ok(image) => Some(image),
                Err(err) => {
                    tracing::warn!(
                        "[AvatarTaskPool] Rendering '{}' for row {} failed, skipping: {}",
                        initials,
                        key,
                        err
                    );
                    None
                }
            };

            on_complete(AvatarRender {
                handle: job_handle,
                initials,
                image,
            });
        });

        handle
    }

    pub fn cancel(&self, handle: &AvatarHandle) {
        handle.cancel();
    }

    /// Cancels every job submitted so far. Later submissions are unaffected.
    pub fn cancel_all(&self) {
        let mut generation = self
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        generation.cancel();
        *generation = CancellationToken::new();
    }

    fn current_generation(&self) -> CancellationToken {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
