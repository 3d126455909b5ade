//! A handwritten parser for the options the resolution core recognizes.
//!
//! We don't use a 3rd party library like clap because linker flags don't fit
//! it well: long options have to be accepted with a single '-' in addition to
//! the more common double-dash, and values arrive both as `--opt value` and
//! `--opt=value`. The embedding driver parses the full command line and
//! forwards the subset here.

use crate::error::Result;
use crate::input_file::ElfKind;
use crate::version_script::VersionScript;
use anyhow::Context as _;
use anyhow::bail;
use object::elf;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct Args {
    /// The `-m` value, used in incompatible-input messages.
    pub emulation: Option<String>,

    /// Expected ELF kind and machine. When unset, the first regular object
    /// becomes the reference that later inputs are checked against.
    pub ekind: Option<ElfKind>,
    pub emachine: Option<u16>,

    pub shared: bool,
    pub export_dynamic: bool,
    pub allow_multiple_definition: bool,
    pub warn_common: bool,
    pub trace: bool,
    pub no_undefined_version: bool,

    /// Names from `-u` flags. Matching lazy symbols are force-loaded.
    pub undefined: Vec<String>,

    /// Names from `-y` flags whose defining file should be printed.
    pub trace_symbol: Vec<String>,

    /// Names to export in the dynamic table.
    pub dynamic_list: Vec<String>,

    /// Names from `--wrap` flags.
    pub wrap: Vec<String>,

    pub version_script_path: Option<PathBuf>,

    /// Parsed from the file at `version_script_path` by the driver.
    pub version_script: VersionScript,
}

impl Args {
    pub fn parse<S: AsRef<str>, I: Iterator<Item = S>>(input: I) -> Result<Args> {
        let mut args = Args::default();
        let mut input = input
            .map(|a| a.as_ref().to_owned())
            .collect::<Vec<String>>()
            .into_iter();

        while let Some(arg) = input.next() {
            if !arg.starts_with('-') {
                bail!("Unexpected input `{arg}`: the resolution core takes options only");
            }
            let (name, mut inline_value) = match arg.split_once('=') {
                Some((name, value)) => (name.to_owned(), Some(value.to_owned())),
                None => (arg.clone(), None),
            };
            let mut value = |input: &mut std::vec::IntoIter<String>| -> Result<String> {
                if let Some(value) = inline_value.take() {
                    return Ok(value);
                }
                input
                    .next()
                    .with_context(|| format!("Missing argument to {name}"))
            };

            match name.trim_start_matches('-') {
                "shared" | "Bshareable" => args.shared = true,
                "export-dynamic" | "E" => args.export_dynamic = true,
                "allow-multiple-definition" => args.allow_multiple_definition = true,
                "warn-common" => args.warn_common = true,
                "trace" | "t" => args.trace = true,
                "no-undefined-version" => args.no_undefined_version = true,
                "m" => {
                    let emulation = value(&mut input)?;
                    args.set_emulation(&emulation)?;
                }
                "u" | "undefined" => args.undefined.push(value(&mut input)?),
                "y" | "trace-symbol" => args.trace_symbol.push(value(&mut input)?),
                "dynamic-list" => args.dynamic_list.push(value(&mut input)?),
                "wrap" => args.wrap.push(value(&mut input)?),
                "version-script" => {
                    args.version_script_path = Some(PathBuf::from(value(&mut input)?));
                }
                _ => bail!("Unrecognized option `{arg}`"),
            }
        }

        Ok(args)
    }

    fn set_emulation(&mut self, emulation: &str) -> Result {
        let (ekind, emachine) = match emulation {
            "elf_x86_64" => (ElfKind::Elf64Le, elf::EM_X86_64),
            "elf_i386" => (ElfKind::Elf32Le, elf::EM_386),
            "aarch64linux" | "aarch64elf" => (ElfKind::Elf64Le, elf::EM_AARCH64),
            _ => bail!("Unknown emulation: {emulation}"),
        };
        self.emulation = Some(emulation.to_owned());
        self.ekind = Some(ekind);
        self.emachine = Some(emachine);
        Ok(())
    }
}
