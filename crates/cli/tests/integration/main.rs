#![cfg(unix)]

mod common;
mod release_tests;
