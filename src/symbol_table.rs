//! The symbol table is a bag of every global symbol seen across the inputs.
//! Each admitted file feeds its symbol records through the `add_*`
//! operations, which resolve name conflicts as they arrive: the winning
//! definition is written into the existing symbol's body in place, so
//! anything holding a [`SymbolId`] observes the replacement for free.

use crate::args::Args;
use crate::error::Context as _;
use crate::error::Result;
use crate::error::warning;
use crate::input_file::ArchiveFile;
use crate::input_file::ArchiveSymbol;
use crate::input_file::BitcodeFile;
use crate::input_file::BitcodeSymbol;
use crate::input_file::ElfKind;
use crate::input_file::FileId;
use crate::input_file::InputFile;
use crate::input_file::LazyObjectFile;
use crate::input_file::ObjectFile;
use crate::input_file::ObjectSymbol;
use crate::input_file::SharedFile;
use crate::input_file::SharedSymbol;
use crate::input_file::SymbolPlace;
use crate::lto::BitcodeCompiler;
use crate::resolution::Resolution;
use crate::resolution::compare_defined;
use crate::resolution::compare_defined_non_common;
use crate::symbol::OutputSectionId;
use crate::symbol::SectionRef;
use crate::symbol::Symbol;
use crate::symbol::SymbolBody;
use crate::symbol::SymbolId;
use anyhow::bail;
use bumpalo::Bump;
use foldhash::HashMap;
use glob::Pattern;
use hashbrown::HashSet;
use memchr::memchr;
use object::elf;

pub struct SymbolTable<'data> {
    args: &'data Args,
    arena: &'data Bump,

    /// Global symbol names to IDs. Keys are interned in `arena`, so they
    /// outlive the input buffers they were first seen in.
    names: HashMap<&'data [u8], SymbolId>,
    symbols: Vec<Symbol<'data>>,

    pub object_files: Vec<ObjectFile<'data>>,
    pub shared_files: Vec<SharedFile<'data>>,
    pub archive_files: Vec<ArchiveFile<'data>>,
    pub bitcode_files: Vec<BitcodeFile<'data>>,
    pub lazy_object_files: Vec<LazyObjectFile<'data>>,

    /// Sonames of admitted DSOs. A DSO whose soname was seen before is
    /// dropped without error.
    sonames: HashSet<&'data [u8]>,

    /// COMDAT group signatures claimed so far. Sections in groups claimed by
    /// an earlier file are discarded.
    comdat_groups: HashSet<&'data [u8]>,

    /// ELF kind and machine of the first regular input, checked against
    /// every later ELF input unless the -m flag pinned them already.
    reference: Option<FileAttributes<'data>>,

    lto: Option<Box<dyn BitcodeCompiler<'data> + 'data>>,
}

#[derive(Clone, Copy)]
struct FileAttributes<'data> {
    ekind: ElfKind,
    emachine: u16,
    name: &'data str,
}

enum ComdatMode {
    Claim,
    /// Used when re-ingesting LTO outputs: their sections must not be folded
    /// against groups claimed during the first pass.
    Ignore,
}

impl<'data> SymbolTable<'data> {
    pub fn new(args: &'data Args, arena: &'data Bump) -> Self {
        Self {
            args,
            arena,
            names: HashMap::default(),
            symbols: Vec::new(),
            object_files: Vec::new(),
            shared_files: Vec::new(),
            archive_files: Vec::new(),
            bitcode_files: Vec::new(),
            lazy_object_files: Vec::new(),
            sonames: HashSet::new(),
            comdat_groups: HashSet::new(),
            reference: None,
            lto: None,
        }
    }

    pub fn set_bitcode_compiler(&mut self, compiler: Box<dyn BitcodeCompiler<'data> + 'data>) {
        self.lto = Some(compiler);
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol<'data> {
        &self.symbols[id.as_usize()]
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol<'data>> {
        self.symbols.iter()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Exact lookup of a symbol's current body.
    pub fn find(&self, name: &[u8]) -> Option<&SymbolBody> {
        self.names.get(name).map(|id| &self.symbols[id.as_usize()].body)
    }

    pub fn find_symbol(&self, name: &[u8]) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Returns the non-undefined symbols matching a glob pattern (`?` and
    /// `*`). A pattern without wildcards is a plain map lookup.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<SymbolId>> {
        if !pattern.bytes().any(|b| b == b'?' || b == b'*') {
            return Ok(self
                .find_symbol(pattern.as_bytes())
                .filter(|id| !self.symbols[id.as_usize()].body.is_undefined())
                .into_iter()
                .collect());
        }

        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid symbol pattern `{pattern}`"))?;
        let mut matches = Vec::new();
        for (i, sym) in self.symbols.iter().enumerate() {
            if sym.body.is_undefined() {
                continue;
            }
            let Ok(name) = std::str::from_utf8(sym.name) else {
                continue;
            };
            if pattern.matches(name) {
                matches.push(SymbolId::from_usize(i));
            }
        }
        Ok(matches)
    }

    /// Admits a parsed input file, resolving each of its symbols. Fetching a
    /// lazy member re-enters this function with the fetched object, so all
    /// inputs go through the same rules no matter how they arrived.
    pub fn add_file(&mut self, file: InputFile<'data>) -> Result {
        match file {
            InputFile::Archive(archive) => {
                let archive_index = self.archive_files.len() as u32;
                self.archive_files.push(archive);
                for i in 0..self.archive_files[archive_index as usize].index().len() {
                    let sym = self.archive_files[archive_index as usize].index()[i];
                    self.add_lazy_archive(archive_index, sym)?;
                }
            }
            InputFile::LazyObject(lazy) => {
                let file_index = self.lazy_object_files.len() as u32;
                self.lazy_object_files.push(lazy);
                for i in 0..self.lazy_object_files[file_index as usize].exported().len() {
                    let name = self.lazy_object_files[file_index as usize].exported()[i];
                    self.add_lazy_object(name, file_index)?;
                }
            }
            InputFile::Shared(dso) => {
                self.check_compatible(dso.name, dso.ekind, dso.emachine)?;
                if self.args.trace {
                    println!("{}", dso.name);
                }
                // DSOs are uniquified by soname, not by filename.
                let soname = dso.soname;
                if !self.sonames.insert(soname) {
                    return Ok(());
                }
                let dso_index = self.shared_files.len() as u32;
                self.shared_files.push(dso);
                for i in 0..self.shared_files[dso_index as usize].symbols.len() {
                    let sym = self.shared_files[dso_index as usize].symbols[i];
                    self.add_shared(dso_index, sym)?;
                }
            }
            InputFile::Bitcode(bitcode) => {
                if self.args.trace {
                    println!("{}", bitcode.name);
                }
                let file_index = self.bitcode_files.len() as u32;
                self.bitcode_files.push(bitcode);
                for i in 0..self.bitcode_files[file_index as usize].symbols.len() {
                    let sym = self.bitcode_files[file_index as usize].symbols[i];
                    self.add_bitcode(sym, file_index)?;
                }
            }
            InputFile::Object(obj) => {
                self.check_compatible(obj.name, obj.ekind, obj.emachine)?;
                if self.args.trace {
                    println!("{}", obj.name);
                }
                self.add_object(obj, ComdatMode::Claim)?;
            }
        }
        Ok(())
    }

    /// Records a reference to `name`. A non-weak reference upgrades the
    /// binding of shared and lazy bodies and forces a lazy body's member to
    /// load.
    pub fn add_undefined(
        &mut self,
        name: &[u8],
        binding: u8,
        st_other: u8,
        ty: u8,
        can_omit: bool,
        file: Option<FileId>,
    ) -> Result<SymbolId> {
        let used_in_regular = !matches!(file, Some(FileId::Bitcode(_)));
        let (id, was_inserted) =
            self.insert_with(name, ty, st_other & 3, can_omit, used_in_regular, file)?;
        if was_inserted {
            let sym = &mut self.symbols[id.as_usize()];
            sym.binding = binding;
            sym.body = SymbolBody::Undefined {
                ty: Some(ty),
                st_other,
                file,
            };
            return Ok(id);
        }
        if binding != elf::STB_WEAK {
            let sym = &mut self.symbols[id.as_usize()];
            if sym.body.is_shared() || sym.body.is_lazy() {
                sym.binding = binding;
            }
            if let SymbolBody::Shared {
                file: FileId::Shared(dso),
                ..
            } = sym.body
            {
                self.shared_files[dso as usize].is_used = true;
            }
        }
        let body = self.symbols[id.as_usize()].body;
        if body.is_lazy() {
            if self.symbols[id.as_usize()].is_weak() {
                // A weak reference must not load the member, but the type has
                // to stick in case the symbol is still lazy at the end of the
                // link.
                self.symbols[id.as_usize()].body.set_lazy_ty(Some(ty));
            } else {
                self.fetch_lazy(body)?;
            }
        }
        Ok(id)
    }

    /// Records an ordinary definition for one of an object's symbol records.
    pub fn add_regular(
        &mut self,
        name: &[u8],
        sym: &ObjectSymbol<'data>,
        section: Option<SectionRef>,
    ) -> Result<SymbolId> {
        let file = section.map(|s| FileId::Object(s.file));
        let (id, was_inserted) =
            self.insert_with(name, sym.ty, sym.st_other & 3, false, true, file)?;
        let warn_common = self.args.warn_common;
        match compare_defined_non_common(
            &mut self.symbols[id.as_usize()],
            was_inserted,
            sym.binding,
            warn_common,
        ) {
            Resolution::Win => {
                self.symbols[id.as_usize()].body = SymbolBody::DefinedRegular {
                    ty: Some(sym.ty),
                    section,
                    value: sym.value,
                    size: sym.size,
                };
            }
            Resolution::Conflict => self.report_duplicate(id, file)?,
            Resolution::Lose => {}
        }
        Ok(id)
    }

    /// Records a linker-made absolute definition, e.g. `_end`.
    pub fn add_absolute(&mut self, name: &[u8], visibility: u8) -> Result<SymbolId> {
        let (id, was_inserted) =
            self.insert_with(name, elf::STT_NOTYPE, visibility, false, true, None)?;
        let warn_common = self.args.warn_common;
        match compare_defined_non_common(
            &mut self.symbols[id.as_usize()],
            was_inserted,
            elf::STB_GLOBAL,
            warn_common,
        ) {
            Resolution::Win => {
                self.symbols[id.as_usize()].body = SymbolBody::DefinedRegular {
                    ty: Some(elf::STT_NOTYPE),
                    section: None,
                    value: 0,
                    size: 0,
                };
            }
            Resolution::Conflict => self.report_duplicate(id, None)?,
            Resolution::Lose => {}
        }
        Ok(id)
    }

    /// Defines `name` as an absolute, but only if something references it
    /// already. Used for symbols like `_etext` that we provide on demand.
    pub fn add_ignored(&mut self, name: &[u8], visibility: u8) -> Result<Option<SymbolId>> {
        if self.find_symbol(name).is_none() {
            return Ok(None);
        }
        Ok(Some(self.add_absolute(name, visibility)?))
    }

    /// Records a tentative definition. Commons coalesce by taking the
    /// maximum size and alignment, and lose to any non-common definition.
    pub fn add_common(
        &mut self,
        name: &[u8],
        size: u64,
        alignment: u64,
        binding: u8,
        st_other: u8,
        ty: u8,
        file: Option<FileId>,
    ) -> Result<SymbolId> {
        let (id, was_inserted) = self.insert_with(name, ty, st_other & 3, false, true, file)?;
        let warn_common = self.args.warn_common;
        match compare_defined(&self.symbols[id.as_usize()], was_inserted, binding) {
            Resolution::Win => {
                let sym = &mut self.symbols[id.as_usize()];
                sym.binding = binding;
                sym.body = SymbolBody::DefinedCommon {
                    ty: Some(ty),
                    size,
                    alignment,
                    st_other,
                    file,
                };
            }
            Resolution::Conflict => {
                let name = String::from_utf8_lossy(self.symbols[id.as_usize()].name).into_owned();
                match &mut self.symbols[id.as_usize()].body {
                    SymbolBody::DefinedCommon {
                        size: existing_size,
                        alignment: existing_alignment,
                        ..
                    } => {
                        if warn_common {
                            warning(&format!("multiple common of {name}"));
                        }
                        *existing_size = (*existing_size).max(size);
                        *existing_alignment = (*existing_alignment).max(alignment);
                    }
                    _ => {
                        if warn_common {
                            warning(&format!("common {name} is overridden"));
                        }
                    }
                }
            }
            Resolution::Lose => {}
        }
        Ok(id)
    }

    /// Records a linker-synthesized definition, e.g.
    /// `_GLOBAL_OFFSET_TABLE_`.
    pub fn add_synthetic(
        &mut self,
        name: &[u8],
        section: OutputSectionId,
        value: u64,
    ) -> Result<SymbolId> {
        let (id, was_inserted) =
            self.insert_with(name, elf::STT_NOTYPE, elf::STV_HIDDEN, false, true, None)?;
        let warn_common = self.args.warn_common;
        match compare_defined_non_common(
            &mut self.symbols[id.as_usize()],
            was_inserted,
            elf::STB_GLOBAL,
            warn_common,
        ) {
            Resolution::Win => {
                self.symbols[id.as_usize()].body =
                    SymbolBody::DefinedSynthetic { section, value };
            }
            Resolution::Conflict => self.report_duplicate(id, None)?,
            Resolution::Lose => {}
        }
        Ok(id)
    }

    /// Records a definition provided by the DSO at `dso`.
    pub fn add_shared(&mut self, dso: u32, sym: SharedSymbol<'data>) -> Result {
        // DSO symbols don't tighten visibility in the output, so merge in
        // STV_DEFAULT whatever the DSO says.
        let file = FileId::Shared(dso);
        let (id, was_inserted) =
            self.insert_with(sym.name, sym.ty, elf::STV_DEFAULT, true, false, Some(file))?;
        // A symbol visible by default in a DSO must stay preemptible.
        if sym.st_other & 3 == elf::STV_DEFAULT {
            self.symbols[id.as_usize()].export_dynamic = true;
        }
        if was_inserted || self.symbols[id.as_usize()].body.is_undefined() {
            self.symbols[id.as_usize()].body = SymbolBody::Shared {
                ty: Some(sym.ty),
                file,
                value: sym.value,
                size: sym.size,
                verdef: sym.verdef,
            };
            if !self.symbols[id.as_usize()].is_weak() {
                self.shared_files[dso as usize].is_used = true;
            }
        }
        Ok(())
    }

    /// Records an LTO candidate definition from the bitcode file at `file`.
    pub fn add_bitcode(&mut self, sym: BitcodeSymbol<'data>, file: u32) -> Result<SymbolId> {
        let file = FileId::Bitcode(file);
        let (id, was_inserted) = self.insert_with(
            sym.name,
            sym.ty,
            sym.st_other & 3,
            sym.can_omit,
            false,
            Some(file),
        )?;
        let binding = if sym.is_weak {
            elf::STB_WEAK
        } else {
            elf::STB_GLOBAL
        };
        let warn_common = self.args.warn_common;
        match compare_defined_non_common(
            &mut self.symbols[id.as_usize()],
            was_inserted,
            binding,
            warn_common,
        ) {
            Resolution::Win => {
                self.symbols[id.as_usize()].body = SymbolBody::DefinedBitcode {
                    ty: Some(sym.ty),
                    st_other: sym.st_other,
                    file,
                };
            }
            Resolution::Conflict => self.report_duplicate(id, Some(file))?,
            Resolution::Lose => {}
        }
        Ok(id)
    }

    /// Records that the archive at `archive` can provide `sym` on demand.
    pub fn add_lazy_archive(&mut self, archive: u32, sym: ArchiveSymbol<'data>) -> Result {
        let file = FileId::Archive(archive);
        let (id, was_inserted) = self.insert(sym.name)?;
        if was_inserted {
            self.symbols[id.as_usize()].body = SymbolBody::LazyArchive {
                ty: None,
                file,
                member: sym.member,
            };
            return Ok(());
        }
        if !self.symbols[id.as_usize()].body.is_undefined() {
            return Ok(());
        }
        // A weak undefined must not pull the member in. Still, if no strong
        // reference ever arrives, the symbol stays a weak undefined to the
        // end of the link, so the type it recorded has to survive the body
        // replacement.
        if self.symbols[id.as_usize()].is_weak() {
            let ty = self.symbols[id.as_usize()].body.ty();
            self.symbols[id.as_usize()].body = SymbolBody::LazyArchive {
                ty,
                file,
                member: sym.member,
            };
            return Ok(());
        }
        if let Some(obj) = self.archive_files[archive as usize].fetch(sym.member) {
            self.add_file(InputFile::Object(obj))?;
        }
        Ok(())
    }

    /// Like [`Self::add_lazy_archive`], for a lazy object file.
    pub fn add_lazy_object(&mut self, name: &[u8], file: u32) -> Result {
        let file_id = FileId::LazyObject(file);
        let (id, was_inserted) = self.insert(name)?;
        if was_inserted {
            self.symbols[id.as_usize()].body = SymbolBody::LazyObject {
                ty: None,
                file: file_id,
            };
            return Ok(());
        }
        if !self.symbols[id.as_usize()].body.is_undefined() {
            return Ok(());
        }
        if self.symbols[id.as_usize()].is_weak() {
            let ty = self.symbols[id.as_usize()].body.ty();
            self.symbols[id.as_usize()].body = SymbolBody::LazyObject { ty, file: file_id };
            return Ok(());
        }
        if let Some(obj) = self.lazy_object_files[file as usize].fetch() {
            self.add_file(InputFile::Object(obj))?;
        }
        Ok(())
    }

    /// Renames `name` to `__real_name` and redirects references to `name`
    /// into `__wrap_name`. Because references hold symbol IDs rather than
    /// bodies, rewriting the body slots redirects every reference at once.
    pub fn wrap(&mut self, name: &[u8]) -> Result {
        let Some(original) = self.find_symbol(name) else {
            return Ok(());
        };
        let real_name = self.intern_concat(b"__real_", name);
        let wrap_name = self.intern_concat(b"__wrap_", name);
        let real = self.add_undefined(real_name, elf::STB_GLOBAL, 0, elf::STT_NOTYPE, false, None)?;
        let wrap = self.add_undefined(wrap_name, elf::STB_GLOBAL, 0, elf::STT_NOTYPE, false, None)?;
        let original_body = self.symbols[original.as_usize()].body;
        self.symbols[real.as_usize()].body = original_body;
        self.symbols[original.as_usize()].body = self.symbols[wrap.as_usize()].body;
        Ok(())
    }

    /// Compiles the collected bitcode files into native objects and feeds
    /// them back through resolution, replacing every bitcode body. Passing
    /// every bitcode file to one compiler invocation is what makes
    /// whole-program optimization possible.
    #[tracing::instrument(skip_all, name = "LTO")]
    pub fn add_combined_lto_object(&mut self) -> Result {
        if self.bitcode_files.is_empty() {
            return Ok(());
        }
        let mut lto = self
            .lto
            .take()
            .context("Bitcode inputs require a bitcode compiler")?;
        for file in &self.bitcode_files {
            lto.add(file);
        }
        let objects = lto.compile()?;
        for obj in objects {
            self.add_object(obj, ComdatMode::Ignore)?;
        }
        if cfg!(debug_assertions) {
            for sym in &self.symbols {
                debug_assert!(
                    !sym.body.is_bitcode(),
                    "bitcode symbol {} survived LTO",
                    String::from_utf8_lossy(sym.name)
                );
            }
        }
        Ok(())
    }

    /// Loads the lazy symbols named by -u flags.
    #[tracing::instrument(skip_all, name = "Scan undefined flags")]
    pub fn scan_undefined_flags(&mut self) -> Result {
        let args = self.args;
        for name in &args.undefined {
            if let Some(id) = self.find_symbol(name.as_bytes()) {
                let body = self.symbols[id.as_usize()].body;
                if body.is_lazy() {
                    self.fetch_lazy(body)?;
                }
            }
        }
        Ok(())
    }

    /// DSOs may have undefined symbols that they expect the executable to
    /// provide, e.g. BSD's `__progname`. Such symbols have to land in the
    /// program's dynamic table so the DSO can find them at runtime.
    #[tracing::instrument(skip_all, name = "Scan shared library undefines")]
    pub fn scan_shlib_undefined(&mut self) {
        for dso in 0..self.shared_files.len() {
            for i in 0..self.shared_files[dso].undefined.len() {
                let name = self.shared_files[dso].undefined[i];
                if let Some(id) = self.find_symbol(name) {
                    if self.symbols[id.as_usize()].body.is_defined() {
                        self.symbols[id.as_usize()].export_dynamic = true;
                    }
                }
            }
        }
    }

    /// Marks the symbols named by --dynamic-list for export.
    pub fn scan_dynamic_list(&mut self) {
        let args = self.args;
        for name in &args.dynamic_list {
            if let Some(id) = self.find_symbol(name.as_bytes()) {
                self.symbols[id.as_usize()].export_dynamic = true;
            }
        }
    }

    /// Applies the version script's patterns to the resolved symbols. A
    /// script with only an anonymous global list just marks those names
    /// VER_NDX_GLOBAL; declared versions assign their ids to every matching
    /// defined symbol.
    #[tracing::instrument(skip_all, name = "Scan version script")]
    pub fn scan_version_script(&mut self) -> Result {
        let args = self.args;
        let script = &args.version_script;

        if !script.globals.is_empty() {
            for name in &script.globals {
                if let Some(id) = self.find_symbol(name.as_bytes()) {
                    self.symbols[id.as_usize()].version_id = elf::VER_NDX_GLOBAL;
                }
            }
            return Ok(());
        }

        for (i, version) in script.versions.iter().enumerate() {
            let version_id = (i + 2) as u16;
            for pattern in &version.globals {
                let matches = self.find_all(pattern)?;
                if matches.is_empty() {
                    if args.no_undefined_version {
                        bail!(
                            "version script assignment of {} to symbol {} failed: symbol not defined",
                            version.name,
                            pattern
                        );
                    }
                    continue;
                }
                for id in matches {
                    let sym = &mut self.symbols[id.as_usize()];
                    if sym.version_id != elf::VER_NDX_GLOBAL
                        && sym.version_id != elf::VER_NDX_LOCAL
                    {
                        warning(&format!("duplicate symbol {pattern} in version script"));
                    }
                    sym.version_id = version_id;
                }
            }
        }
        Ok(())
    }

    /// Prints the defining file of each symbol named by -y flags.
    pub fn trace_defined(&self) {
        let args = self.args;
        for name in &args.trace_symbol {
            if let Some(id) = self.find_symbol(name.as_bytes()) {
                let sym = &self.symbols[id.as_usize()];
                if sym.body.is_defined() {
                    if let Some(file) = sym.body.file() {
                        println!(
                            "{}: definition of {}",
                            self.file_name(Some(file)),
                            String::from_utf8_lossy(sym.name)
                        );
                    }
                }
            }
        }
    }

    /// The name of the file a body came from, for diagnostics.
    pub fn file_name(&self, file: Option<FileId>) -> &str {
        match file {
            None => "<internal>",
            Some(FileId::Object(i)) => self.object_files[i as usize].name,
            Some(FileId::Shared(i)) => self.shared_files[i as usize].name,
            Some(FileId::Archive(i)) => self.archive_files[i as usize].name,
            Some(FileId::LazyObject(i)) => self.lazy_object_files[i as usize].name,
            Some(FileId::Bitcode(i)) => self.bitcode_files[i as usize].name,
        }
    }

    /// Finds an existing symbol or creates one. New symbols start as weak
    /// undefined with default visibility; their version id comes from the
    /// name's `@` suffix, if any.
    fn insert(&mut self, name: &[u8]) -> Result<(SymbolId, bool)> {
        if let Some(&id) = self.names.get(name) {
            return Ok((id, false));
        }
        let version_id = self.compute_version_id(name)?;
        let name: &'data [u8] = self.arena.alloc_slice_copy(name);
        let id = SymbolId::from_usize(self.symbols.len());
        self.names.insert(name, id);
        self.symbols.push(Symbol {
            name,
            binding: elf::STB_WEAK,
            visibility: elf::STV_DEFAULT,
            is_used_in_regular_obj: false,
            export_dynamic: false,
            version_id,
            versioned_name: version_id != elf::VER_NDX_LOCAL && version_id != elf::VER_NDX_GLOBAL,
            body: SymbolBody::Undefined {
                ty: None,
                st_other: elf::STV_DEFAULT,
                file: None,
            },
        });
        Ok((id, true))
    }

    /// [`Self::insert`], then merge the supplied attributes into the symbol.
    fn insert_with(
        &mut self,
        name: &[u8],
        ty: u8,
        visibility: u8,
        can_omit: bool,
        used_in_regular: bool,
        file: Option<FileId>,
    ) -> Result<(SymbolId, bool)> {
        let (id, was_inserted) = self.insert(name)?;
        let export = !can_omit && (self.args.shared || self.args.export_dynamic);
        {
            let sym = &mut self.symbols[id.as_usize()];
            sym.visibility = min_visibility(sym.visibility, visibility);
            if export {
                sym.export_dynamic = true;
            }
            if used_in_regular {
                sym.is_used_in_regular_obj = true;
            }
        }
        if !was_inserted {
            if let Some(existing_ty) = self.symbols[id.as_usize()].body.ty() {
                if (ty == elf::STT_TLS) != (existing_ty == elf::STT_TLS) {
                    bail!(
                        "TLS attribute mismatch for symbol: {}",
                        self.conflict_message(id, file)
                    );
                }
            }
        }
        Ok((id, was_inserted))
    }

    /// A symbol version may be appended to a name after '@'; '@@' marks the
    /// default version. The id is resolved against the declared versions
    /// right at insertion.
    fn compute_version_id(&self, name: &[u8]) -> Result<u16> {
        let script = &self.args.version_script;
        let Some(at) = memchr(b'@', name) else {
            return Ok(if script.global_by_default {
                elf::VER_NDX_GLOBAL
            } else {
                elf::VER_NDX_LOCAL
            });
        };
        let mut version = &name[at + 1..];
        let is_default = version.starts_with(b"@");
        if is_default {
            version = &version[1..];
        }
        if let Some(index) = script.version_index(version) {
            return Ok(if is_default {
                index
            } else {
                index | elf::VERSYM_HIDDEN
            });
        }
        bail!(
            "symbol {} has undefined version {}",
            String::from_utf8_lossy(name),
            String::from_utf8_lossy(version)
        );
    }

    fn add_object(&mut self, obj: ObjectFile<'data>, comdat: ComdatMode) -> Result {
        // Work out which sections survive COMDAT group deduplication before
        // touching any symbols. A group may span several sections of this
        // file; only claims from earlier files discard them.
        let mut discarded = vec![false; obj.sections.len()];
        if let ComdatMode::Claim = comdat {
            let mut claimed_here: HashSet<&[u8]> = HashSet::new();
            for (i, sec) in obj.sections.iter().enumerate() {
                if let Some(group) = sec.group {
                    if self.comdat_groups.contains(group) && !claimed_here.contains(group) {
                        discarded[i] = true;
                    } else {
                        self.comdat_groups.insert(group);
                        claimed_here.insert(group);
                    }
                }
            }
        }

        let file_index = self.object_files.len() as u32;
        let file_id = FileId::Object(file_index);
        self.object_files.push(obj);

        for i in 0..self.object_files[file_index as usize].symbols.len() {
            let sym = self.object_files[file_index as usize].symbols[i];
            if sym.binding == elf::STB_LOCAL {
                continue;
            }
            match sym.place {
                SymbolPlace::Undefined => {
                    self.add_undefined(sym.name, sym.binding, sym.st_other, sym.ty, false, Some(file_id))?;
                }
                SymbolPlace::Common { alignment } => {
                    self.add_common(
                        sym.name,
                        sym.size,
                        alignment,
                        sym.binding,
                        sym.st_other,
                        sym.ty,
                        Some(file_id),
                    )?;
                }
                SymbolPlace::Section { index } => {
                    if discarded.get(index as usize).copied().unwrap_or(false) {
                        // Definitions in discarded group members degrade to
                        // references to the kept copy.
                        self.add_undefined(
                            sym.name,
                            sym.binding,
                            sym.st_other,
                            sym.ty,
                            false,
                            Some(file_id),
                        )?;
                    } else {
                        self.add_regular(
                            sym.name,
                            &sym,
                            Some(SectionRef {
                                file: file_index,
                                section: index,
                            }),
                        )?;
                    }
                }
                SymbolPlace::Absolute => {
                    self.add_regular(sym.name, &sym, None)?;
                }
            }
        }
        Ok(())
    }

    /// It does not make sense to link, say, x86-64 object files with AArch64
    /// object files, so every ELF input is checked against the reference.
    fn check_compatible(&mut self, name: &'data str, ekind: ElfKind, emachine: u16) -> Result {
        let expected = match (self.args.ekind, self.args.emachine) {
            (Some(kind), Some(machine)) => Some((kind, machine)),
            _ => self.reference.map(|r| (r.ekind, r.emachine)),
        };
        let compatible = match expected {
            Some((kind, machine)) => kind == ekind && machine == emachine,
            None => true,
        };
        if compatible {
            if self.reference.is_none() {
                self.reference = Some(FileAttributes {
                    ekind,
                    emachine,
                    name,
                });
            }
            return Ok(());
        }
        let wanted = self
            .args
            .emulation
            .as_deref()
            .or(self.reference.map(|r| r.name))
            .unwrap_or("the requested emulation");
        bail!("{name} is incompatible with {wanted}");
    }

    fn fetch_lazy(&mut self, body: SymbolBody) -> Result {
        match body {
            SymbolBody::LazyArchive {
                file: FileId::Archive(archive),
                member,
                ..
            } => {
                if let Some(obj) = self.archive_files[archive as usize].fetch(member) {
                    self.add_file(InputFile::Object(obj))?;
                }
            }
            SymbolBody::LazyObject {
                file: FileId::LazyObject(file),
                ..
            } => {
                if let Some(obj) = self.lazy_object_files[file as usize].fetch() {
                    self.add_file(InputFile::Object(obj))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn report_duplicate(&self, id: SymbolId, new_file: Option<FileId>) -> Result {
        let message = format!("duplicate symbol: {}", self.conflict_message(id, new_file));
        if self.args.allow_multiple_definition {
            warning(&message);
            return Ok(());
        }
        bail!("{message}");
    }

    /// Builds "NAME in FILE1 and FILE2" for conflict diagnostics.
    fn conflict_message(&self, id: SymbolId, new_file: Option<FileId>) -> String {
        let sym = &self.symbols[id.as_usize()];
        format!(
            "{} in {} and {}",
            String::from_utf8_lossy(sym.name),
            self.file_name(sym.body.file()),
            self.file_name(new_file)
        )
    }

    fn intern_concat(&self, prefix: &[u8], name: &[u8]) -> &'data [u8] {
        self.arena.alloc_slice_copy(&[prefix, name].concat())
    }
}

fn min_visibility(a: u8, b: u8) -> u8 {
    if a == elf::STV_DEFAULT {
        return b;
    }
    if b == elf::STV_DEFAULT {
        return a;
    }
    a.min(b)
}
