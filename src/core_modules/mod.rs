pub mod assembler;
pub mod cell;
pub mod classifier;
pub mod color;
pub mod grid;
pub mod sampler;
pub mod transparency;
