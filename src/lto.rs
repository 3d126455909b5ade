//! The bridge to link-time optimization. The resolution core doesn't link
//! against a compiler; the driver registers an implementation of
//! [`BitcodeCompiler`] and the table drives it once all inputs are in.

use crate::error::Result;
use crate::input_file::BitcodeFile;
use crate::input_file::ObjectFile;

/// Compiles the bitcode inputs of a link into native objects. All bitcode
/// files are handed over before `compile` runs, so the implementation can do
/// whole-program optimization.
pub trait BitcodeCompiler<'data> {
    /// Feeds one bitcode input to the compiler.
    fn add(&mut self, file: &BitcodeFile<'data>);

    /// Compiles everything fed so far.
    fn compile(&mut self) -> Result<Vec<ObjectFile<'data>>>;
}
