pub mod console;
pub mod input_driver;
pub mod output_driver;

pub use input_driver::{InputDriver, ScriptedInputDriver};
pub use output_driver::OutputDriver;
