//! Dashboard rendering and output.

pub mod generator;

pub use generator::{read_template, render, write_output};
