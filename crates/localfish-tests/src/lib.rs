//! End-to-end tests: real HTTP, real session, scripted engine.

#[cfg(all(test, unix))]
mod api_tests;
#[cfg(all(test, unix))]
mod helpers;
