/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Traits at the boundary of the index constructors.

[`SymbolSource`] is the pull-reader contract every online index
constructor consumes: a resettable stream of [`Xchar`](crate::alphabet::Xchar)
symbols. [`ByteSource`] and [`XcharSource`] adapt in-memory slices to it.

*/

mod symbols;
pub use symbols::*;
