use std::{env, fs, process::ExitCode, time::Instant};

use novac::{
    config::CompilerConfig,
    intern::InternerBuilder,
    package::{CompiledPackage, Package},
};

mod lexer;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let dump_mir = args.iter().any(|a| a == "--dump-mir");
    let file_path = args.iter().skip(1).find(|a| !a.starts_with("--")).map_or("example.nv", String::as_str);

    let source = match read_file(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interner = InternerBuilder::new();
    let file = interner.intern(file_path);
    let tokens = lexer::Lexer::new(&source, file).tokenize(&mut interner);

    let start = Instant::now();
    let package = Package::new(&mut interner, CompilerConfig::new());
    let result = package.compile(vec![tokens]);
    let elapsed = start.elapsed();

    for diagnostic in result.diagnostics.records() {
        eprint!("{}", diagnostic.render_header(&interner));
    }

    let CompiledPackage { diagnostics, mir, .. } = result;
    if diagnostics.has_errors() {
        eprintln!(
            "compile failed after {elapsed:?} ({} error(s), {} warning(s))",
            diagnostics.error_count(),
            diagnostics.warning_count()
        );
        return ExitCode::FAILURE;
    }

    let mir = mir.expect("a clean compile always reaches MIR lowering");
    if dump_mir {
        println!("{mir:#?}");
    }
    eprintln!(
        "compiled {} item(s) in {elapsed:?} ({} warning(s))",
        mir.items.len(),
        diagnostics.warning_count()
    );
    ExitCode::SUCCESS
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("{file_path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("error reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("error reading file: {err}"))
}
