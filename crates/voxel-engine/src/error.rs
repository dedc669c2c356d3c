//! Engine error types.
//!
//! Host/runtime setup reports through `anyhow`; the rendering core uses these
//! typed errors so callers can react to specific failures (e.g. fall back when
//! the transparency buffers cannot be allocated).

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ProgramKind;

/// Failure reported by a rendering backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{label}: {bytes} bytes exceeds the device limit of {limit} bytes")]
    AllocationTooLarge {
        label: &'static str,
        bytes: u64,
        limit: u64,
    },

    #[error("{label}: device rejected the allocation: {reason}")]
    Allocation { label: &'static str, reason: String },

    #[error("{label}: zero-sized allocation")]
    EmptyAllocation { label: &'static str },

    #[error("unknown {0} handle")]
    UnknownHandle(&'static str),

    #[error("no program bound")]
    NoProgramBound,

    #[error("transparency buffers are not attached")]
    TransparencyDetached,

    #[error("{kind:?} program: {reason}")]
    Program { kind: ProgramKind, reason: String },

    #[error("invalid geometry: {0}")]
    Geometry(String),
}

/// Failure while building CPU-side geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("volume of {dims:?} voxels does not fit in memory")]
    VolumeTooLarge { dims: [u32; 3] },

    #[error("volume of {dims:?} voxels needs {expected} intensities, got {actual}")]
    IntensityCount {
        dims: [u32; 3],
        expected: usize,
        actual: usize,
    },

    #[error("{count} vertices exceed the u32 index range")]
    TooManyVertices { count: usize },
}

/// Failure of the order-independent-transparency context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OitError {
    #[error("failed to allocate {resource}")]
    Allocation {
        resource: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("transparency context cannot be sized {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("transparency quarter depth must be at least 1")]
    InvalidDepth,

    #[error("failed to reset transparency buffers")]
    Reset(#[source] BackendError),

    #[error("transparency context is not initialized")]
    NotReady,
}

/// Failure while loading or validating viewer properties.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed properties")]
    Parse(#[from] toml::de::Error),

    #[error("invalid property `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Failure while building the background loader pool.
#[derive(Debug, Error)]
#[error("failed to start actor loader pool")]
pub struct LoaderError(#[from] rayon::ThreadPoolBuildError);
