use pretty_assertions::assert_eq;
use vslgen::asmgen::{generate_program, CodegenOptions, ABORT_STATUS, WRONG_ARGUMENTS_MESSAGE};
use vslgen::ast::{ArithmeticOp, Node, Relation};
use vslgen::symbols::{FunctionSymbol, SymbolRef, SymbolTable};

fn compile(symbols: &SymbolTable) -> String {
    generate_program(symbols, &CodegenOptions::default())
        .unwrap()
        .to_string()
}

/// The instructions of the source level function `name`, up to the next label
/// that starts another function or the entry point.
fn function_text<'a>(asm: &'a str, name: &str) -> &'a str {
    let start = asm
        .find(&format!("\n_{name}:\n"))
        .unwrap_or_else(|| panic!("no function {name} in\n{asm}"));
    let rest = &asm[start + 1..];
    let end = rest.find("\t.globl").unwrap_or(rest.len());
    &rest[..end]
}

fn entry_text(asm: &str) -> &str {
    let start = asm.find("\t.globl main\n").expect("no entry point");
    &asm[start..]
}

#[test]
fn identity_main_returns_its_argument() {
    let mut symbols = SymbolTable::new();
    let main = FunctionSymbol::new("main", ["x"]);
    let x = main.parameter(0);
    symbols.declare_function(main.with_body(Node::ret(Node::identifier(x))));

    let asm = compile(&symbols);
    let main = function_text(&asm, "main");
    assert!(main.contains("\tpushq   %rdi\n"));
    assert!(main.contains("\tmovq    -8(%rbp), %rax\n"));

    let entry = entry_text(&asm);
    assert!(entry.contains("\tcmpq    $1, %rdi\n"));
    assert!(entry.contains("\tmovq    %rax, -16(%rbp)\n"));
    assert!(entry.contains(
        "\tmovq    -16(%rbp), %rdi\n\tcall    _main\n\t# finish: the result is the exit status\n\tmovq    %rax, %rdi\n\tcall    exit\n"
    ));
}

#[test]
fn argument_mismatch_aborts() {
    let mut symbols = SymbolTable::new();
    symbols.declare_function(FunctionSymbol::new("main", []).with_body(Node::ret(Node::number(0))));

    let asm = compile(&symbols);
    assert_eq!(ABORT_STATUS, 1);
    assert!(asm.contains(&format!(".errout:\n\t.asciz \"{WRONG_ARGUMENTS_MESSAGE}\"\n")));

    let entry = entry_text(&asm);
    let abort = entry
        .lines()
        .find_map(|line| line.strip_prefix("\tjne     "))
        .expect("no validation branch");
    assert!(entry.contains("\tcmpq    $0, %rdi\n"));
    assert!(entry.ends_with(&format!(
        "{abort}:\n\t# abort\n\tleaq    .errout(%rip), %rdi\n\tcall    puts\n\tmovq    $1, %rdi\n\tcall    exit\n"
    )));
}

#[test]
fn first_function_is_the_fallback_entry() {
    let mut symbols = SymbolTable::new();
    symbols.declare_function(FunctionSymbol::new("g", []));
    symbols.declare_function(FunctionSymbol::new("f", []));

    let asm = compile(&symbols);
    let entry = entry_text(&asm);
    assert!(entry.contains("\tcall    _g\n"));
    assert!(!entry.contains("_f"));
}

#[test]
fn configured_entry_name_is_honored() {
    let mut symbols = SymbolTable::new();
    symbols.declare_function(FunctionSymbol::new("g", []));
    symbols.declare_function(FunctionSymbol::new("start", []));
    let options = CodegenOptions {
        entry_name: "start".into(),
        ..CodegenOptions::default()
    };
    let asm = generate_program(&symbols, &options).unwrap().to_string();
    assert!(entry_text(&asm).contains("\tcall    _start\n"));
}

#[test]
fn repeated_literals_are_not_merged() {
    let mut symbols = SymbolTable::new();
    let body = Node::block([
        Node::print([Node::text("abc")]),
        Node::print([Node::text("xyz")]),
        Node::print([Node::text("abc")]),
    ]);
    symbols.declare_function(FunctionSymbol::new("main", []).with_body(body));

    let asm = compile(&symbols);
    assert!(asm.contains(
        "STR0:\n\t.asciz \"abc\"\nSTR1:\n\t.asciz \"xyz\"\nSTR2:\n\t.asciz \"abc\"\n"
    ));
    assert!(!asm.contains("STR3"));
    let references: Vec<_> = function_text(&asm, "main")
        .lines()
        .filter_map(|line| line.strip_prefix("\tleaq    STR"))
        .collect();
    assert_eq!(
        references,
        ["0(%rip), %rax", "1(%rip), %rax", "2(%rip), %rax"]
    );
}

#[test]
fn operands_run_left_to_right() {
    let mut symbols = SymbolTable::new();
    let f = FunctionSymbol::new("f", ["v"]);
    let v = f.parameter(0);
    let f = symbols.declare_function(f.with_body(Node::block([
        Node::print([Node::identifier(v)]),
        Node::ret(Node::identifier(v)),
    ])));

    let main = FunctionSymbol::new("main", ["a", "b"]);
    let (a, b) = (main.parameter(0), main.parameter(1));
    symbols.declare_function(main.with_body(Node::ret(Node::binary(
        ArithmeticOp::Add,
        Node::call(f, [Node::identifier(a)]),
        Node::call(f, [Node::identifier(b)]),
    ))));

    let asm = compile(&symbols);
    let main = function_text(&asm, "main");
    let load_a = main.find("\tmovq    -8(%rbp), %rax\n").unwrap();
    let load_b = main.find("\tmovq    -16(%rbp), %rax\n").unwrap();
    let calls: Vec<_> = main.match_indices("\tcall    _f\n").map(|(i, _)| i).collect();
    assert_eq!(calls.len(), 2);
    assert!(load_a < calls[0] && calls[0] < load_b && load_b < calls[1]);
}

#[test]
fn control_flow_labels_are_unique_program_wide() {
    let mut symbols = SymbolTable::new();
    for name in ["f", "g"] {
        let mut function = FunctionSymbol::new(name, ["n"]);
        let n = function.parameter(0);
        let i = function.declare_local("i");
        let body = Node::block([
            Node::assign(i, Node::number(0)),
            Node::while_loop(
                Node::binary(Relation::LessThan, Node::identifier(i), Node::identifier(n)),
                Node::block([
                    Node::if_then(
                        Node::identifier(i),
                        Node::print([Node::identifier(i)]),
                        Some(Node::print([Node::text("zero")])),
                    ),
                    Node::compound_assign(i, ArithmeticOp::Add, Node::number(1)),
                ]),
            ),
            Node::ret(Node::identifier(i)),
        ]);
        symbols.declare_function(function.with_body(body));
    }

    let asm = compile(&symbols);
    let mut labels: Vec<_> = asm
        .lines()
        .filter(|line| line.starts_with(".L") && line.ends_with(':'))
        .collect();
    // epilogue, loop head and exit, if end and else, per function, then the abort label
    assert_eq!(labels.len(), 11);
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), 11);
}

#[test]
fn globals_get_one_slot_each() {
    let mut symbols = SymbolTable::new();
    let counter = symbols.declare_global("counter");
    symbols.declare_global("unused");
    let body = Node::block([
        Node::compound_assign(counter, ArithmeticOp::Add, Node::number(1)),
        Node::compound_assign(counter, ArithmeticOp::Add, Node::number(1)),
        Node::ret(Node::identifier(counter)),
    ]);
    symbols.declare_function(FunctionSymbol::new("main", []).with_body(body));

    let asm = compile(&symbols);
    assert!(asm.contains(
        "\t.section .bss\n\t.align 8\n_counter:\n\t.zero 8\n\t.align 8\n_unused:\n\t.zero 8\n\t.section .text\n"
    ));
    assert_eq!(asm.matches("_counter:").count(), 1);
    assert_eq!(asm.matches("movq    %rax, _counter(%rip)").count(), 2);
}

#[test]
fn reads_the_json_hand_off() {
    let json = r#"{
        "globals": [{ "name": "total", "kind": "GLOBAL_VAR", "seq": 0 }],
        "functions": [{
            "name": "main",
            "kind": "FUNCTION",
            "nparms": 1,
            "locals": [{ "name": "x", "kind": "PARAMETER", "seq": 0 }],
            "body": {
                "kind": "block",
                "statements": [
                    {
                        "kind": "assign",
                        "target": { "scope": "global", "index": 0 },
                        "value": { "kind": "identifier", "symbol": { "scope": "local", "index": 0 } }
                    },
                    {
                        "kind": "return",
                        "value": {
                            "kind": "binary",
                            "operator": { "class": "arithmetic", "op": "multiply" },
                            "lhs": { "kind": "identifier", "symbol": { "scope": "global", "index": 0 } },
                            "rhs": { "kind": "number", "value": 2 }
                        }
                    }
                ]
            }
        }]
    }"#;
    let symbols: SymbolTable = serde_json::from_str(json).unwrap();
    assert_eq!(symbols.functions[0].name(), "main");
    assert_eq!(symbols.functions[0].symbol.seq, 0);

    let asm = compile(&symbols);
    let main = function_text(&asm, "main");
    assert!(main.contains("\tmovq    %rax, _total(%rip)\n"));
    assert!(main.contains("\timulq   %r10, %rax\n"));
}

#[test]
fn failed_generation_reports_where() {
    let mut symbols = SymbolTable::new();
    let body = Node::block([
        Node::ret(Node::number(0)),
        Node::ret(Node::call(SymbolRef::Function(7), [])),
    ]);
    symbols.declare_function(FunctionSymbol::new("main", []).with_body(body));

    let err = generate_program(&symbols, &CodegenOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unresolved symbol reference: function #7\n   --> at call of function #7 with 0 arguments\
         \nwhile generating statement 2 of a block\nwhile generating function `main`"
    );
}
