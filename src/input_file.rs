//! Typed shapes for the input files that feed the symbol table. The driver's
//! readers parse raw bytes into these records; the resolution core never
//! looks at ELF bytes itself.

/// A parsed input file, ready to be admitted via
/// [`crate::SymbolTable::add_file`].
#[derive(Debug)]
pub enum InputFile<'data> {
    Object(ObjectFile<'data>),
    Archive(ArchiveFile<'data>),
    LazyObject(LazyObjectFile<'data>),
    Shared(SharedFile<'data>),
    Bitcode(BitcodeFile<'data>),
}

/// ELF class and endianness of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfKind {
    Elf32Le,
    Elf32Be,
    Elf64Le,
    Elf64Be,
}

/// Identifies an admitted input file by kind and index into the symbol
/// table's per-kind file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileId {
    Object(u32),
    Shared(u32),
    Archive(u32),
    LazyObject(u32),
    Bitcode(u32),
}

/// A relocatable object. Only global symbols appear in `symbols`; locals
/// never participate in resolution.
#[derive(Debug)]
pub struct ObjectFile<'data> {
    pub name: &'data str,
    pub ekind: ElfKind,
    pub emachine: u16,
    pub sections: Vec<InputSection<'data>>,
    pub symbols: Vec<ObjectSymbol<'data>>,
}

#[derive(Debug, Clone, Copy)]
pub struct InputSection<'data> {
    pub name: &'data [u8],
    /// COMDAT group signature, if the section is a member of a group.
    pub group: Option<&'data [u8]>,
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectSymbol<'data> {
    pub name: &'data [u8],
    /// STB_* value.
    pub binding: u8,
    /// Raw st_other byte. The low two bits hold the STV_* visibility.
    pub st_other: u8,
    /// STT_* value.
    pub ty: u8,
    pub place: SymbolPlace,
    pub value: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum SymbolPlace {
    /// SHN_UNDEF: the symbol is a reference.
    Undefined,
    /// SHN_COMMON: a tentative definition contributing size and alignment.
    Common { alignment: u64 },
    /// Defined in the section with the given index.
    Section { index: u32 },
    /// SHN_ABS: defined with an absolute value.
    Absolute,
}

/// An archive. Members stay unloaded until a strong undefined reference
/// matches a name in the archive's symbol index.
#[derive(Debug)]
pub struct ArchiveFile<'data> {
    pub name: &'data str,
    members: Vec<Option<ObjectFile<'data>>>,
    index: Vec<ArchiveSymbol<'data>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveSymbol<'data> {
    pub name: &'data [u8],
    /// Index of the member that defines the name.
    pub member: u32,
}

impl<'data> ArchiveFile<'data> {
    pub fn new(
        name: &'data str,
        members: Vec<ObjectFile<'data>>,
        index: Vec<ArchiveSymbol<'data>>,
    ) -> Self {
        Self {
            name,
            members: members.into_iter().map(Some).collect(),
            index,
        }
    }

    pub(crate) fn index(&self) -> &[ArchiveSymbol<'data>] {
        &self.index
    }

    /// Takes the member out of the archive. Returns `None` if it was fetched
    /// before, so a member can only ever be admitted once.
    pub(crate) fn fetch(&mut self, member: u32) -> Option<ObjectFile<'data>> {
        self.members.get_mut(member as usize)?.take()
    }
}

/// An object admitted with `--start-lib` semantics: its symbols behave as if
/// the file were a single-member archive.
#[derive(Debug)]
pub struct LazyObjectFile<'data> {
    pub name: &'data str,
    exported: Vec<&'data [u8]>,
    object: Option<ObjectFile<'data>>,
}

impl<'data> LazyObjectFile<'data> {
    pub fn new(name: &'data str, exported: Vec<&'data [u8]>, object: ObjectFile<'data>) -> Self {
        Self {
            name,
            exported,
            object: Some(object),
        }
    }

    pub(crate) fn exported(&self) -> &[&'data [u8]] {
        &self.exported
    }

    pub(crate) fn fetch(&mut self) -> Option<ObjectFile<'data>> {
        self.object.take()
    }
}

/// A shared object. DSOs are uniquified by soname, not by path.
#[derive(Debug)]
pub struct SharedFile<'data> {
    pub name: &'data str,
    pub ekind: ElfKind,
    pub emachine: u16,
    pub soname: &'data [u8],
    /// DT_NEEDED entries, for the driver's dependency handling.
    pub needed: Vec<&'data [u8]>,
    pub symbols: Vec<SharedSymbol<'data>>,
    /// Names the DSO references but does not define.
    pub undefined: Vec<&'data [u8]>,
    /// Set once a non-weak reference binds to this DSO. Feeds the driver's
    /// --as-needed handling.
    pub is_used: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SharedSymbol<'data> {
    pub name: &'data [u8],
    pub ty: u8,
    pub st_other: u8,
    pub value: u64,
    pub size: u64,
    /// Index into the DSO's version definitions, if the symbol is versioned.
    pub verdef: Option<u16>,
}

/// An LLVM bitcode file awaiting link-time optimization.
#[derive(Debug)]
pub struct BitcodeFile<'data> {
    pub name: &'data str,
    pub symbols: Vec<BitcodeSymbol<'data>>,
}

#[derive(Debug, Clone, Copy)]
pub struct BitcodeSymbol<'data> {
    pub name: &'data [u8],
    pub is_weak: bool,
    pub st_other: u8,
    pub ty: u8,
    /// Whether the symbol may be omitted from the dynamic symbol table.
    pub can_omit: bool,
}
