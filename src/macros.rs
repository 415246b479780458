// Copyright (c) 2017-2021 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

// Declare a catalog entry. Every board in the catalog is made by
// BPI-Sinovoip, ships as revision 1 and carries no warranty flag.
macro_rules! board {
    ($name:expr, $layout:expr, $model:expr, $memory:expr) => {
        board!($name, $layout, $model, $memory, None, RegisterFamily::Sunxi)
    };
    ($name:expr, $layout:expr, $model:expr, $memory:expr, $pin_map:expr) => {
        board!(
            $name,
            $layout,
            $model,
            $memory,
            Some($pin_map),
            RegisterFamily::Sunxi
        )
    };
    ($name:expr, $layout:expr, $model:expr, $memory:expr, $pin_map:expr, $family:expr) => {
        BoardDescriptor {
            name: $name,
            layout: $layout,
            model: $model,
            revision: 1,
            memory: $memory,
            maker: MAKER_SINOVOIP,
            warranty: false,
            pin_map: $pin_map,
            family: $family,
        }
    };
}

// Log a diagnostic only when the configured debug level is high enough.
macro_rules! debug_at {
    ($current:expr, $level:expr, $($arg:tt)+) => {{
        if $current >= $level {
            log::debug!($($arg)+);
        }
    }};
}
