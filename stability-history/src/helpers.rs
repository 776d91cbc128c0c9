// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "regression" if `count` is 1, otherwise "regressions".
    pub(crate) fn regressions_str(count: usize) -> &'static str {
        if count == 1 {
            "regression"
        } else {
            "regressions"
        }
    }
}
