//! The decision rules for what happens when a new definition arrives for a
//! name the table may already know. These are pure: the only mutation is the
//! binding update on a win, which keeps every call site's handling uniform.

use crate::error::warning;
use crate::symbol::Symbol;
use object::elf;

/// Outcome of weighing a new defined symbol against an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The new symbol replaces the existing body.
    Win,
    /// The existing body stays.
    Lose,
    /// Both are strong definitions; the caller decides (common merge or
    /// duplicate error).
    Conflict,
}

/// We have a new defined symbol with the specified binding. Anything defined
/// beats a lazy, undefined or shared body; after that weakness decides.
pub(crate) fn compare_defined(existing: &Symbol, was_inserted: bool, new_binding: u8) -> Resolution {
    if was_inserted {
        return Resolution::Win;
    }
    let body = &existing.body;
    if body.is_lazy() || body.is_undefined() || body.is_shared() {
        return Resolution::Win;
    }
    if new_binding == elf::STB_WEAK {
        return Resolution::Lose;
    }
    if existing.is_weak() {
        return Resolution::Win;
    }
    Resolution::Conflict
}

/// Like [`compare_defined`], for non-common candidates. On a win the
/// existing symbol takes the new binding. A conflict against a common body
/// resolves in the newcomer's favour: non-common definitions take precedence
/// over common ones. A conflict against a bitcode body does too, which is
/// what lets the native objects produced by LTO replace the placeholders
/// recorded for their bitcode inputs.
pub(crate) fn compare_defined_non_common(
    existing: &mut Symbol,
    was_inserted: bool,
    new_binding: u8,
    warn_common: bool,
) -> Resolution {
    match compare_defined(existing, was_inserted, new_binding) {
        Resolution::Win => {
            existing.binding = new_binding;
            Resolution::Win
        }
        Resolution::Lose => Resolution::Lose,
        Resolution::Conflict => {
            if existing.body.is_bitcode() {
                Resolution::Win
            } else if existing.body.is_common() {
                if warn_common {
                    warning(&format!(
                        "common {} is overridden",
                        String::from_utf8_lossy(existing.name)
                    ));
                }
                Resolution::Win
            } else {
                Resolution::Conflict
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolBody;

    fn symbol(binding: u8, body: SymbolBody) -> Symbol<'static> {
        Symbol {
            name: b"sym",
            binding,
            visibility: elf::STV_DEFAULT,
            is_used_in_regular_obj: false,
            export_dynamic: false,
            version_id: elf::VER_NDX_GLOBAL,
            versioned_name: false,
            body,
        }
    }

    fn undefined() -> SymbolBody {
        SymbolBody::Undefined {
            ty: None,
            st_other: 0,
            file: None,
        }
    }

    fn regular() -> SymbolBody {
        SymbolBody::DefinedRegular {
            ty: Some(elf::STT_FUNC),
            section: None,
            value: 0,
            size: 0,
        }
    }

    fn common() -> SymbolBody {
        SymbolBody::DefinedCommon {
            ty: Some(elf::STT_OBJECT),
            size: 4,
            alignment: 4,
            st_other: 0,
            file: None,
        }
    }

    fn shared() -> SymbolBody {
        SymbolBody::Shared {
            ty: Some(elf::STT_FUNC),
            file: crate::input_file::FileId::Shared(0),
            value: 0,
            size: 0,
            verdef: None,
        }
    }

    #[test]
    fn fresh_symbol_always_wins() {
        let existing = symbol(elf::STB_WEAK, undefined());
        assert_eq!(
            compare_defined(&existing, true, elf::STB_WEAK),
            Resolution::Win
        );
    }

    #[test]
    fn defined_beats_undefined_and_shared() {
        for body in [undefined(), shared()] {
            let existing = symbol(elf::STB_GLOBAL, body);
            assert_eq!(
                compare_defined(&existing, false, elf::STB_WEAK),
                Resolution::Win
            );
        }
    }

    #[test]
    fn weak_newcomer_loses_to_existing_definition() {
        let existing = symbol(elf::STB_GLOBAL, regular());
        assert_eq!(
            compare_defined(&existing, false, elf::STB_WEAK),
            Resolution::Lose
        );
    }

    #[test]
    fn strong_newcomer_beats_weak_definition() {
        let existing = symbol(elf::STB_WEAK, regular());
        assert_eq!(
            compare_defined(&existing, false, elf::STB_GLOBAL),
            Resolution::Win
        );
    }

    #[test]
    fn two_strong_definitions_conflict() {
        let existing = symbol(elf::STB_GLOBAL, regular());
        assert_eq!(
            compare_defined(&existing, false, elf::STB_GLOBAL),
            Resolution::Conflict
        );
    }

    #[test]
    fn winner_takes_the_new_binding() {
        let mut existing = symbol(elf::STB_WEAK, regular());
        assert_eq!(
            compare_defined_non_common(&mut existing, false, elf::STB_GLOBAL, false),
            Resolution::Win
        );
        assert_eq!(existing.binding, elf::STB_GLOBAL);
    }

    #[test]
    fn non_common_beats_common_without_binding_update() {
        let mut existing = symbol(elf::STB_GLOBAL, common());
        assert_eq!(
            compare_defined_non_common(&mut existing, false, elf::STB_GLOBAL, false),
            Resolution::Win
        );
        assert_eq!(existing.binding, elf::STB_GLOBAL);
    }

    #[test]
    fn non_common_beats_bitcode_at_equal_strength() {
        let bitcode = SymbolBody::DefinedBitcode {
            ty: Some(elf::STT_FUNC),
            st_other: 0,
            file: crate::input_file::FileId::Bitcode(0),
        };
        let mut existing = symbol(elf::STB_GLOBAL, bitcode);
        assert_eq!(
            compare_defined_non_common(&mut existing, false, elf::STB_GLOBAL, false),
            Resolution::Win
        );
    }

    #[test]
    fn strong_regular_pair_still_conflicts() {
        let mut existing = symbol(elf::STB_GLOBAL, regular());
        assert_eq!(
            compare_defined_non_common(&mut existing, false, elf::STB_GLOBAL, false),
            Resolution::Conflict
        );
    }
}
