// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Output Generators
//!
//! Implementations of [`OutputGenerator`](crate::OutputGenerator).

/// Writes rendered documents, minifying HTML on request.
pub mod html;

pub use html::HtmlGenerator;
