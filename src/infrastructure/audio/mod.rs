mod microphone;
mod transcriber;

pub use microphone::*;
pub use transcriber::*;
