//! Driver layer for browser automation.
//!
//! This crate defines the browsing capability the search pipeline depends on
//! and a WebDriver-backed implementation of it.
//!
//! - [`browser::BrowserResource`] and friends: the session/context/page surface
//! - [`browser::driver::WebDriverResource`]: `fantoccini` client wrapper
//! - [`browser::page::WebDriverPage`]: navigation, settle waits and script evaluation
//! - [`browser::guard`]: close-on-drop owners for contexts and pages
//! - [`browser::stealth`]: stealth profiles and JS evasions
pub mod browser;
