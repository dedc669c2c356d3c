//! Background actor loading.
//!
//! Jobs run on a bounded rayon pool and hand their results to the renderer
//! through a [`RendererHandle`]. Each job is stamped with the generation that
//! was current when it was spawned, so results of a scene that has since been
//! cleared are discarded by the render thread.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::LoaderError;
use crate::renderer::RendererHandle;
use crate::scene::ActorDesc;

#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn enter(&self) {
        *self.count.lock() += 1;
    }

    fn leave(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Fire-and-forget loader pool.
pub struct ActorLoader {
    pool: ThreadPool,
    handle: RendererHandle,
    in_flight: Arc<InFlight>,
}

impl ActorLoader {
    pub fn new(handle: RendererHandle, threads: usize) -> Result<Self, LoaderError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("actor-loader-{i}"))
            .build()?;
        log::debug!("actor loader started with {} threads", pool.current_num_threads());

        Ok(Self {
            pool,
            handle,
            in_flight: Arc::new(InFlight::default()),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Jobs spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.count.lock()
    }

    /// Runs `job` on the pool and queues every actor it produces.
    ///
    /// A failing job is logged; nothing is queued for it.
    pub fn spawn<F>(&self, label: impl Into<String>, job: F)
    where
        F: FnOnce() -> anyhow::Result<Vec<ActorDesc>> + Send + 'static,
    {
        let label = label.into();
        let generation = self.handle.generation();
        let handle = self.handle.clone();
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.enter();
        self.pool.spawn(move || {
            match job() {
                Ok(descs) => {
                    let count = descs.len();
                    for desc in descs {
                        handle.add_actor_to_init_queue_for(generation, desc);
                    }
                    log::debug!("{label}: queued {count} actors for {generation}");
                }
                Err(e) => log::error!("{label}: load failed: {e:#}"),
            }
            in_flight.leave();
        });
    }

    /// Blocks until every spawned job has finished.
    pub fn wait_idle(&self) {
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            self.in_flight.idle.wait(&mut count);
        }
    }
}
