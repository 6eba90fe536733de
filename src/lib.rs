/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]

pub mod alphabet;
pub mod bits;
pub mod index;
pub mod traits;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::alphabet::*;
    pub use crate::bits::*;
    pub use crate::index::*;
    pub use crate::traits::*;
}
