// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per durable surface.

pub mod credentials;
pub mod erase;
pub mod history;
pub mod jobs;
pub mod status;
