// Copyright 2024 Viktor Reusch
//
// This file is part of kml_gpx_convert.
//
// kml_gpx_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! Non-fatal data-quality reports emitted during conversion.

use std::num::ParseFloatError;

use thiserror::Error;

/// Something in the source was dropped, but conversion carried on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    /// A coordinate tuple could not be turned into a point.
    #[error("illegal point string {token:?}: {issue}")]
    MalformedCoordinate {
        token: String,
        issue: CoordinateIssue,
    },
}

/// Reason a coordinate tuple was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateIssue {
    /// Longitude, latitude, and elevation are all required.
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),
    #[error("blank field")]
    BlankField,
    #[error("{0}")]
    NotANumber(#[from] ParseFloatError),
    /// `NaN` and infinities cannot be written as GPX decimals.
    #[error("non-finite number {0:?}")]
    NotFinite(String),
}

/// Receiver for [`Warning`]s.
pub trait Diagnostics {
    fn warn(&mut self, warning: Warning);
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn warn(&mut self, warning: Warning) {
        (**self).warn(warning);
    }
}

/// Forwards every warning to the [`log`] facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
    }
}

/// Collects warnings, e.g. for reporting them after conversion.
impl Diagnostics for Vec<Warning> {
    fn warn(&mut self, warning: Warning) {
        self.push(warning);
    }
}
