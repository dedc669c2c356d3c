use crate::backend::{Backend, BufferId, BufferKind, TransparencyBuffers};
use crate::error::OitError;

use super::layout::{depth_budget, fragment_capacity, HEAD_SENTINEL};

/// Lifecycle of a [`TransparencyContext`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContextState {
    Uninitialized,
    /// All three buffers allocated and attached.
    Ready,
    /// An allocation failed; nothing is held.
    Failed,
    Disposed,
}

/// GPU resources of the per-pixel linked-list OIT algorithm.
///
/// Owns the head-pointer image, the atomic fragment counter and the shared
/// fragment storage. Invariant: while `Ready`, all three handles are live and
/// attached to the backend; in every other state none are held.
#[derive(Debug)]
pub struct TransparencyContext {
    width: u32,
    height: u32,
    quarter_depth: u32,
    buffers: Option<TransparencyBuffers>,
    state: ContextState,
    frames_reset: u64,
}

impl Default for TransparencyContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransparencyContext {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            quarter_depth: 0,
            buffers: None,
            state: ContextState::Uninitialized,
            frames_reset: 0,
        }
    }

    /// Allocates and attaches the three buffers, then clears them.
    ///
    /// Fails fast: the first failing allocation releases whatever was already
    /// allocated, leaves the context `Failed` and returns the error.
    pub fn initialize<B: Backend>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
        quarter_depth: u32,
    ) -> Result<(), OitError> {
        self.release(backend);

        self.width = width;
        self.height = height;
        self.quarter_depth = quarter_depth;

        if width == 0 || height == 0 {
            self.state = ContextState::Failed;
            return Err(OitError::InvalidSize { width, height });
        }
        if quarter_depth == 0 {
            self.state = ContextState::Failed;
            return Err(OitError::InvalidDepth);
        }

        let heads = self.allocate(backend, BufferKind::HeadPointers { width, height }, &[])?;
        let counter = self.allocate(backend, BufferKind::AtomicCounter, &[heads])?;
        let capacity = fragment_capacity(width, height, quarter_depth);
        let fragments = self.allocate(
            backend,
            BufferKind::FragmentStorage { capacity },
            &[heads, counter],
        )?;

        let buffers = TransparencyBuffers {
            heads,
            counter,
            fragments,
        };

        if let Err(source) = backend.attach_transparency(buffers) {
            log::error!("attaching transparency buffers failed: {source}");
            for id in [heads, counter, fragments] {
                backend.release_buffer(id);
            }
            self.state = ContextState::Failed;
            return Err(OitError::Allocation {
                resource: "transparency bindings",
                source,
            });
        }

        self.buffers = Some(buffers);
        self.state = ContextState::Ready;

        if let Err(e) = self.reset_frame(backend) {
            self.release(backend);
            self.state = ContextState::Failed;
            return Err(e);
        }

        log::info!(
            "transparency context {width}x{height}: {} layers/pixel, {capacity} fragment slots",
            depth_budget(quarter_depth)
        );
        Ok(())
    }

    fn allocate<B: Backend>(
        &mut self,
        backend: &mut B,
        kind: BufferKind,
        allocated: &[BufferId],
    ) -> Result<BufferId, OitError> {
        backend.allocate(kind).map_err(|source| {
            log::error!("allocating {} ({} bytes) failed: {source}", kind.label(), kind.byte_size());
            for id in allocated {
                backend.release_buffer(*id);
            }
            self.state = ContextState::Failed;
            OitError::Allocation {
                resource: kind.label(),
                source,
            }
        })
    }

    /// Clears every head pointer to the sentinel and the counter to zero.
    ///
    /// Must run once before the first write pass of every displayed frame.
    pub fn reset_frame<B: Backend>(&mut self, backend: &mut B) -> Result<(), OitError> {
        let buffers = match (self.state, self.buffers) {
            (ContextState::Ready, Some(buffers)) => buffers,
            _ => return Err(OitError::NotReady),
        };
        backend
            .fill(buffers.heads, HEAD_SENTINEL)
            .map_err(OitError::Reset)?;
        backend.fill(buffers.counter, 0).map_err(OitError::Reset)?;
        self.frames_reset += 1;
        Ok(())
    }

    /// Releases all buffers. Calling it again is a no-op.
    pub fn dispose<B: Backend>(&mut self, backend: &mut B) {
        if self.release(backend) {
            log::debug!("transparency context disposed");
        }
        if self.state != ContextState::Uninitialized {
            self.state = ContextState::Disposed;
        }
    }

    /// Re-initializes at a new size, keeping the configured depth.
    pub fn resize<B: Backend>(&mut self, backend: &mut B, width: u32, height: u32) -> Result<(), OitError> {
        if self.state == ContextState::Ready && (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let quarter_depth = self.quarter_depth;
        self.initialize(backend, width, height, quarter_depth)
    }

    fn release<B: Backend>(&mut self, backend: &mut B) -> bool {
        let Some(buffers) = self.buffers.take() else { return false };
        backend.detach_transparency();
        backend.release_buffer(buffers.heads);
        backend.release_buffer(buffers.counter);
        backend.release_buffer(buffers.fragments);
        true
    }

    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ContextState::Ready
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn quarter_depth(&self) -> u32 {
        self.quarter_depth
    }

    /// Transparent layers per pixel the storage is sized for.
    #[inline]
    pub fn depth_budget(&self) -> u32 {
        depth_budget(self.quarter_depth)
    }

    #[inline]
    pub fn fragment_capacity(&self) -> u64 {
        fragment_capacity(self.width, self.height, self.quarter_depth)
    }

    #[inline]
    pub fn buffers(&self) -> Option<TransparencyBuffers> {
        self.buffers
    }

    /// Number of successful `reset_frame` calls.
    #[inline]
    pub fn frames_reset(&self) -> u64 {
        self.frames_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    fn ready(backend: &mut SoftwareBackend) -> TransparencyContext {
        let mut ctx = TransparencyContext::new();
        ctx.initialize(backend, 8, 4, 2).unwrap();
        ctx
    }

    // ── initialize ────────────────────────────────────────────────────────

    #[test]
    fn initialize_allocates_three_buffers_and_clears_them() {
        let mut backend = SoftwareBackend::new(8, 4);
        let ctx = ready(&mut backend);

        assert!(ctx.is_ready());
        assert_eq!(backend.live_buffers(), 3);
        assert_eq!(ctx.fragment_capacity(), 8 * 4 * 8);
        assert!(backend.head_pointers().unwrap().iter().all(|&h| h == HEAD_SENTINEL));
        assert_eq!(backend.counter_value(), Some(0));
    }

    #[test]
    fn initialize_rejects_zero_size_and_depth() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = TransparencyContext::new();

        assert_eq!(
            ctx.initialize(&mut backend, 0, 4, 2),
            Err(OitError::InvalidSize { width: 0, height: 4 })
        );
        assert_eq!(ctx.initialize(&mut backend, 8, 4, 0), Err(OitError::InvalidDepth));
        assert_eq!(ctx.state(), ContextState::Failed);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn failed_fragment_allocation_releases_earlier_buffers() {
        // Heads (128 B) and counter fit; 256 fragment nodes (4 KiB) do not.
        let mut backend = SoftwareBackend::new(8, 4).with_max_buffer_bytes(1024);
        let mut ctx = TransparencyContext::new();

        let err = ctx.initialize(&mut backend, 8, 4, 2).unwrap_err();

        assert!(matches!(err, OitError::Allocation { resource: "fragment storage", .. }));
        assert_eq!(ctx.state(), ContextState::Failed);
        assert_eq!(backend.live_buffers(), 0);
        assert!(ctx.buffers().is_none());
        assert_eq!(ctx.reset_frame(&mut backend), Err(OitError::NotReady));
    }

    // ── reset_frame ───────────────────────────────────────────────────────

    #[test]
    fn reset_twice_leaves_sentinels_and_zero_counter() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = ready(&mut backend);

        ctx.reset_frame(&mut backend).unwrap();
        ctx.reset_frame(&mut backend).unwrap();

        assert!(backend.head_pointers().unwrap().iter().all(|&h| h == HEAD_SENTINEL));
        assert_eq!(backend.counter_value(), Some(0));
        // One reset from initialize, two explicit.
        assert_eq!(ctx.frames_reset(), 3);
    }

    #[test]
    fn reset_before_initialize_is_not_ready() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = TransparencyContext::new();
        assert_eq!(ctx.reset_frame(&mut backend), Err(OitError::NotReady));
    }

    // ── dispose / resize ──────────────────────────────────────────────────

    #[test]
    fn dispose_is_idempotent() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = ready(&mut backend);

        ctx.dispose(&mut backend);
        let releases = backend.stats().releases;
        ctx.dispose(&mut backend);

        assert_eq!(ctx.state(), ContextState::Disposed);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.stats().releases, releases);
    }

    #[test]
    fn resize_reallocates_at_new_size() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = ready(&mut backend);

        ctx.resize(&mut backend, 16, 8).unwrap();

        assert_eq!(ctx.dimensions(), (16, 8));
        assert_eq!(backend.live_buffers(), 3);
        assert_eq!(backend.head_pointers().unwrap().len(), 128);
    }

    #[test]
    fn resize_to_same_size_is_noop() {
        let mut backend = SoftwareBackend::new(8, 4);
        let mut ctx = ready(&mut backend);
        let allocations = backend.stats().allocations;

        ctx.resize(&mut backend, 8, 4).unwrap();

        assert_eq!(backend.stats().allocations, allocations);
    }
}
