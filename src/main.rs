use structopt::StructOpt;
use vslgen::asmgen::{self, CodegenOptions};
use vslgen::symbols::SymbolTable;

use anyhow::Context;
use tracing_subscriber::fmt;

fn main() {
    if let Err(ref e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), anyhow::Error> {
    use std::fs;
    use std::io::Write;

    let opt = Opt::from_args();

    if let Some((_, filter)) = std::env::vars().find(|x| x.0 == "VSLGEN_TRACE") {
        fmt::Subscriber::builder()
            .with_ansi(true)
            .pretty()
            .with_env_filter(filter)
            .init();
    }

    let filename = opt.file;
    let file = fs::read_to_string(&filename)
        .with_context(|| format!("reading {}", filename.display()))?;
    let symbols: SymbolTable = serde_json::from_str(&file)
        .with_context(|| format!("{} is not a valid program", filename.display()))?;

    log::debug!(
        "loaded {} globals and {} functions from {}",
        symbols.globals.len(),
        symbols.functions.len(),
        filename.display()
    );

    let options = CodegenOptions {
        entry_name: opt.entry,
        ..CodegenOptions::default()
    };
    // the message already includes the error kind
    let output = asmgen::generate_program(&symbols, &options)
        .map_err(|e| anyhow::anyhow!("code generation failed: {e}"))?;

    // nothing gets written unless generation succeeded
    match opt.output {
        Some(path) => {
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            write!(file, "{}", output)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write!(lock, "{}", output)?;
        }
    }

    Ok(())
}

#[derive(Debug, StructOpt)]
struct Opt {
    /// The program to compile, as the JSON symbol table handed over by the front end
    #[structopt(parse(from_os_str))]
    file: std::path::PathBuf,
    /// Where to write the assembly (standard output by default)
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<std::path::PathBuf>,
    /// Function called on process entry, falling back to the first declared one
    #[structopt(long = "entry", default_value = "main")]
    entry: String,
}
