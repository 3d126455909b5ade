use crate::input_file::FileId;
use object::elf;
use std::fmt::Display;

/// An ID for a symbol. Symbols are addressed by ID everywhere, which keeps
/// references valid when a symbol's body is rewritten in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) fn from_usize(value: usize) -> SymbolId {
        SymbolId(u32::try_from(value).expect("Symbols overflowed 32 bits"))
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A named symbol. There is at most one per name; the body is replaced as
/// stronger definitions arrive, but the symbol itself is never removed.
#[derive(Debug)]
pub struct Symbol<'data> {
    /// The name, interned in the table's arena. Version-suffixed names
    /// (`foo@V1`) keep their suffix.
    pub name: &'data [u8],

    /// STB_* value.
    pub binding: u8,

    /// STV_* value. Only becomes stricter over time.
    pub visibility: u8,

    /// Whether any non-bitcode input references or defines the symbol.
    pub is_used_in_regular_obj: bool,

    /// Whether the symbol should appear in the dynamic symbol table.
    pub export_dynamic: bool,

    /// Low 15 bits index the declared versions (VER_NDX_LOCAL and
    /// VER_NDX_GLOBAL are reserved, user versions start at 2). The high bit
    /// marks a non-default version.
    pub version_id: u16,

    /// True when the name carried an `@` suffix that resolved to a user
    /// version.
    pub versioned_name: bool,

    pub body: SymbolBody,
}

impl Symbol<'_> {
    pub fn is_weak(&self) -> bool {
        self.binding == elf::STB_WEAK
    }
}

/// A reference to an input section of an admitted object file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRef {
    /// Index into the table's object-file list.
    pub file: u32,
    /// Section index within that file.
    pub section: u32,
}

/// Identifies a linker-synthesized output section, assigned by the layout
/// code downstream of resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSectionId(pub u32);

/// What a symbol currently resolves to. `ty` fields are `None` where the
/// symbol type isn't known yet, which matters for lazy symbols: a weak
/// undefined records its type on the lazy body so the right type survives if
/// the member is never fetched.
#[derive(Debug, Clone, Copy)]
pub enum SymbolBody {
    /// Referenced, but not defined by anything seen so far.
    Undefined {
        ty: Option<u8>,
        st_other: u8,
        file: Option<FileId>,
    },

    /// An ordinary definition. `section` is `None` for absolute symbols.
    DefinedRegular {
        ty: Option<u8>,
        section: Option<SectionRef>,
        value: u64,
        size: u64,
    },

    /// A tentative definition. Coalesces with other commons and loses to any
    /// non-common definition.
    DefinedCommon {
        ty: Option<u8>,
        size: u64,
        alignment: u64,
        st_other: u8,
        file: Option<FileId>,
    },

    /// A linker-synthesized definition, e.g. `_GLOBAL_OFFSET_TABLE_`.
    DefinedSynthetic {
        section: OutputSectionId,
        value: u64,
    },

    /// Defined in bitcode; replaced with a native definition after LTO.
    DefinedBitcode {
        ty: Option<u8>,
        st_other: u8,
        file: FileId,
    },

    /// Defined by a shared object.
    Shared {
        ty: Option<u8>,
        file: FileId,
        value: u64,
        size: u64,
        verdef: Option<u16>,
    },

    /// In an archive member that hasn't been fetched.
    LazyArchive {
        ty: Option<u8>,
        file: FileId,
        member: u32,
    },

    /// In a lazy object that hasn't been loaded.
    LazyObject {
        ty: Option<u8>,
        file: FileId,
    },
}

impl SymbolBody {
    pub fn ty(&self) -> Option<u8> {
        match self {
            SymbolBody::Undefined { ty, .. }
            | SymbolBody::DefinedRegular { ty, .. }
            | SymbolBody::DefinedCommon { ty, .. }
            | SymbolBody::DefinedBitcode { ty, .. }
            | SymbolBody::Shared { ty, .. }
            | SymbolBody::LazyArchive { ty, .. }
            | SymbolBody::LazyObject { ty, .. } => *ty,
            SymbolBody::DefinedSynthetic { .. } => Some(elf::STT_NOTYPE),
        }
    }

    pub fn is_tls(&self) -> bool {
        self.ty() == Some(elf::STT_TLS)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, SymbolBody::Undefined { .. })
    }

    pub fn is_lazy(&self) -> bool {
        matches!(
            self,
            SymbolBody::LazyArchive { .. } | SymbolBody::LazyObject { .. }
        )
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, SymbolBody::Shared { .. })
    }

    pub fn is_common(&self) -> bool {
        matches!(self, SymbolBody::DefinedCommon { .. })
    }

    pub fn is_bitcode(&self) -> bool {
        matches!(self, SymbolBody::DefinedBitcode { .. })
    }

    /// Whether the symbol has a definition. Shared and bitcode definitions
    /// count; lazy placeholders and undefineds don't.
    pub fn is_defined(&self) -> bool {
        matches!(
            self,
            SymbolBody::DefinedRegular { .. }
                | SymbolBody::DefinedCommon { .. }
                | SymbolBody::DefinedSynthetic { .. }
                | SymbolBody::DefinedBitcode { .. }
                | SymbolBody::Shared { .. }
        )
    }

    /// The input file the body came from, for diagnostics. Synthesized and
    /// absolute definitions have none.
    pub fn file(&self) -> Option<FileId> {
        match *self {
            SymbolBody::Undefined { file, .. } | SymbolBody::DefinedCommon { file, .. } => file,
            SymbolBody::DefinedRegular { section, .. } => {
                section.map(|s| FileId::Object(s.file))
            }
            SymbolBody::DefinedSynthetic { .. } => None,
            SymbolBody::DefinedBitcode { file, .. }
            | SymbolBody::Shared { file, .. }
            | SymbolBody::LazyArchive { file, .. }
            | SymbolBody::LazyObject { file, .. } => Some(file),
        }
    }

    pub(crate) fn set_lazy_ty(&mut self, new_ty: Option<u8>) {
        if let SymbolBody::LazyArchive { ty, .. } | SymbolBody::LazyObject { ty, .. } = self {
            *ty = new_ty;
        }
    }
}
