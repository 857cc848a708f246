use super::assembly::{Directive, Label, Section};
use super::output::AssemblyOutput;
use super::stack::WORD;
use crate::error::{CodegenError, CodegenResult};
use crate::strings::{self, StringTable};
use crate::symbols::{SymbolKind, SymbolTable};

/// `printf` format for integers
pub const INTEGER_FORMAT: Label<'static> = Label::Runtime(".intout");
/// `printf` format for strings
pub const STRING_FORMAT: Label<'static> = Label::Runtime(".strout");
/// `scanf` format for integers
pub const INTEGER_INPUT: Label<'static> = Label::Runtime(".intin");
/// Message shown when the program is run with the wrong amount of arguments
pub const WRONG_ARGUMENTS: Label<'static> = Label::Runtime(".errout");

const RUNTIME_STRINGS: [(Label<'static>, &str); 4] = [
    (INTEGER_FORMAT, "%ld "),
    (STRING_FORMAT, "%s "),
    (INTEGER_INPUT, "%ld"),
    (WRONG_ARGUMENTS, super::entry::WRONG_ARGUMENTS_MESSAGE),
];

/// Read-only data: the runtime support strings, then every literal in table order.
pub fn string_section<'code>(table: &StringTable<'code>) -> AssemblyOutput<'code> {
    let mut output = AssemblyOutput::from(Directive::Section(Section::ReadOnlyData));
    for (label, text) in RUNTIME_STRINGS {
        output
            .push_back(label)
            .push_back(Directive::Asciz(strings::escape(text)));
    }
    for (label, text) in table.iter() {
        output
            .push_back(Label::Str(label))
            .push_back(Directive::Asciz(strings::escape(text)));
    }
    output
}

/// One zeroed, aligned word per global variable.
pub fn global_section(symbols: &SymbolTable) -> CodegenResult<AssemblyOutput<'_>> {
    let mut output = AssemblyOutput::from(Directive::Section(Section::Bss));
    for global in &symbols.globals {
        if global.kind != SymbolKind::GlobalVar {
            return Err(CodegenError::InconsistentSymbol {
                name: global.name.clone(),
                found: global.kind,
                expected: "global variable",
            }
            .into());
        }
        // both kinds are mangled the same way, so they share one namespace
        if symbols.function_named(&global.name).is_some() {
            return Err(CodegenError::InconsistentSymbol {
                name: global.name.clone(),
                found: SymbolKind::Function,
                expected: "global variable",
            }
            .into());
        }
        output
            .push_back(Directive::Align(WORD))
            .push_back(Label::Global(&global.name))
            .push_back(Directive::Zero(WORD));
    }
    Ok(output)
}
