// SPDX-License-Identifier: MIT

//! Browser session drivers

pub mod chromium;

pub use chromium::ChromiumDriver;
