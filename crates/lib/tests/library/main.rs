#![cfg(unix)]

mod common;
mod dispatch_tests;
mod release_tests;
mod resolution_tests;
