//! Assembly generation for a whole program.
//!
//! The generated unit always has the same shape: string constants
//! (`.rodata`), one zeroed word per global (`.bss`), every function in
//! declaration order, and finally the process entry point.
pub mod abi;
pub mod assembly;
mod entry;
mod expr;
mod function;
pub mod labels;
pub mod output;
mod sections;
pub mod stack;
mod statement;

pub use entry::{ABORT_STATUS, WRONG_ARGUMENTS_MESSAGE};
pub use output::AssemblyOutput;

use self::abi::Convention;
use self::assembly::{Label, Memory};
use self::labels::LabelGenerator;
use self::stack::{FrameLayout, StackTracker};
use crate::error::{CodegenError, CodegenResult, Error};
use crate::strings::StringTable;
use crate::symbols::{FunctionSymbol, SymbolKind, SymbolRef, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// function called on process entry when the program declares it
    pub entry_name: String,
    pub convention: Convention,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            entry_name: "main".to_string(),
            convention: Convention::default(),
        }
    }
}

/// Generates the assembly unit for `symbols`.
///
/// Nothing is returned unless every part of the program could be generated.
pub fn generate_program<'code>(
    symbols: &'code SymbolTable,
    options: &CodegenOptions,
) -> CodegenResult<AssemblyOutput<'code>> {
    let entry = select_entry(symbols, &options.entry_name)?;
    tracing::info!(
        target: "asmgen::program",
        "generating {} globals, {} functions, entry `{}`",
        symbols.globals.len(),
        symbols.functions.len(),
        entry.name()
    );

    let mut generator = Generator::new(symbols, options.convention);
    // literals are discovered while generating the functions, so the text goes
    // first and the sections get put in their final order afterwards.
    let text = generator.generate_functions()?;
    let entry_point = generator.generate_entry(entry);
    let globals = sections::global_section(symbols)?;

    tracing::debug!(target: "asmgen::program", "string table: {:?}", generator.strings);

    Ok(sections::string_section(&generator.strings)
        .chain(globals)
        .chain(text)
        .chain(entry_point))
}

/// The function named `name`, or the first one declared.
pub fn select_entry<'code>(
    symbols: &'code SymbolTable,
    name: &str,
) -> CodegenResult<&'code FunctionSymbol> {
    symbols
        .function_named(name)
        .or_else(|| symbols.functions.first())
        .ok_or_else(|| Error::new(CodegenError::NoFunctions))
}

/// State threaded through a whole generation run. Nothing here is global, so
/// independent runs never see each other's labels or strings.
pub struct Generator<'code> {
    symbols: &'code SymbolTable,
    convention: Convention,
    strings: StringTable<'code>,
    labels: LabelGenerator,
}

/// State for the function currently being generated.
pub struct FunctionContext<'code> {
    function: &'code FunctionSymbol,
    frame: FrameLayout<'code>,
    stack: StackTracker,
    epilogue: Label<'code>,
    /// heads of the loops we're in, innermost last
    loops: Vec<Label<'code>>,
}

impl<'code> Generator<'code> {
    pub fn new(symbols: &'code SymbolTable, convention: Convention) -> Self {
        Self {
            symbols,
            convention,
            strings: StringTable::new(),
            labels: LabelGenerator::new(),
        }
    }

    fn generate_functions(&mut self) -> CodegenResult<AssemblyOutput<'code>> {
        let symbols = self.symbols;
        let mut output = AssemblyOutput::from(assembly::Directive::Section(
            assembly::Section::Text,
        ));
        for function in &symbols.functions {
            output.extend(self.generate_function(function)?);
        }
        Ok(output)
    }

    /// Where the variable `symbol` is stored.
    fn storage(
        &self,
        ctx: &FunctionContext<'code>,
        symbol: SymbolRef,
    ) -> CodegenResult<Memory<'code>> {
        match symbol {
            SymbolRef::Global(index) => {
                let global = self
                    .symbols
                    .globals
                    .get(index)
                    .ok_or(CodegenError::UnresolvedSymbol(symbol))?;
                if global.kind != SymbolKind::GlobalVar {
                    return Err(CodegenError::InconsistentSymbol {
                        name: global.name.clone(),
                        found: global.kind,
                        expected: "global variable",
                    }
                    .into());
                }
                Ok(Memory::label(Label::Global(&global.name)))
            }
            SymbolRef::Local(index) => ctx
                .frame
                .slot(index)
                .ok_or_else(|| CodegenError::UnresolvedSymbol(symbol).into()),
            SymbolRef::Function(index) => {
                let function = self
                    .symbols
                    .functions
                    .get(index)
                    .ok_or(CodegenError::UnresolvedSymbol(symbol))?;
                Err(CodegenError::InconsistentSymbol {
                    name: function.name().to_string(),
                    found: function.symbol.kind,
                    expected: "variable",
                }
                .into())
            }
        }
    }

    /// The function a call node refers to.
    fn callee(
        &self,
        ctx: &FunctionContext<'code>,
        symbol: SymbolRef,
    ) -> CodegenResult<&'code FunctionSymbol> {
        let symbols = self.symbols;
        let not_callable = |name: &str, found| {
            Error::new(CodegenError::InconsistentSymbol {
                name: name.to_string(),
                found,
                expected: "function",
            })
        };
        match symbol {
            SymbolRef::Function(index) => {
                let function = symbols
                    .functions
                    .get(index)
                    .ok_or(CodegenError::UnresolvedSymbol(symbol))?;
                if function.symbol.kind == SymbolKind::Function {
                    Ok(function)
                } else {
                    Err(not_callable(function.name(), function.symbol.kind))
                }
            }
            SymbolRef::Global(index) => match symbols.globals.get(index) {
                Some(global) => Err(not_callable(&global.name, global.kind)),
                None => Err(CodegenError::UnresolvedSymbol(symbol).into()),
            },
            SymbolRef::Local(index) => match ctx.function.locals.get(index) {
                Some(local) => Err(not_callable(&local.name, local.kind)),
                None => Err(CodegenError::UnresolvedSymbol(symbol).into()),
            },
        }
    }
}
