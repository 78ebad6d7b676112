// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for culler configuration and registration.

/// Errors returned by [`GridCuller`][crate::GridCuller] operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CullError {
    /// Cell dimensions must be finite and strictly positive.
    #[error("invalid cell size {width}x{height}: dimensions must be finite and positive")]
    InvalidCellSize {
        /// Requested cell width.
        width: f64,
        /// Requested cell height.
        height: f64,
    },

    /// The scene has no object with the given id.
    #[error("object is not present in the scene")]
    UnknownObject,

    /// The object is already tracked, individually or as a container child.
    #[error("object is already registered")]
    AlreadyRegistered,

    /// The object is not tracked by this culler (or not by the named container).
    #[error("object is not registered")]
    NotRegistered,

    /// The container is already registered.
    #[error("container is already registered")]
    ContainerAlreadyRegistered,

    /// The container is not registered.
    #[error("container is not registered")]
    ContainerNotRegistered,
}
