// rezparse: parse a Rez source file and list what it declares

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use rezparse::host::{FsFileReader, Host};
use rezparse::parser::ast::Declaration;
use rezparse::{ParseOutput, Parser, ParserConfig, TemplateIndex};

#[derive(ClapParser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Rez source file
    source: PathBuf,

    /// Search directories for included files (repeatable)
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Predefined macros, `NAME` or `NAME=VALUE` (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    define: Vec<String>,

    /// Preprocess as DeRez would (`derez` = 1, `rez` = 0)
    #[arg(long)]
    derez: bool,

    /// Make macro redefinitions errors
    #[arg(long)]
    strict: bool,

    /// Let `$$Read` load files from the include directories
    #[arg(long)]
    allow_read: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let source = match fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", args.source.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let config = args
        .define
        .iter()
        .fold(ParserConfig::new(), |config, define| config.define_arg(define))
        .derez(args.derez)
        .strict_redefinition(args.strict);
    let config = args
        .include
        .iter()
        .fold(config, |config, path| config.include_path(path.clone()));

    let mut host = Host::with_include_paths(config.include_paths.clone());
    if args.allow_read {
        host = host.reader(FsFileReader::new(config.include_paths.clone()));
    }

    let name = args.source.display().to_string();
    let output = Parser::with_host(&name, &source, &config, host).parse_file();
    report(&output)
}

fn report(output: &ParseOutput) -> ExitCode {
    if !output.printf_output.is_empty() {
        print!("{}", output.printf_output);
    }

    for declaration in &output.declarations {
        println!("{}", describe(declaration));
    }

    for warning in &output.warnings {
        eprintln!("{}: {}", file_of(output, warning.location), warning);
    }

    let index = TemplateIndex::new(&output.declarations);
    let mut failed = false;
    if let Err(e) = index.check_aliases() {
        eprintln!("{}: error: {}", file_of(output, e.location()), e);
        failed = true;
    }

    for error in &output.errors {
        eprintln!("{}: error: {}", file_of(output, error.location()), error);
        failed = true;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        eprintln!("Parsed {} declarations.", output.declarations.len());
        ExitCode::SUCCESS
    }
}

fn file_of(output: &ParseOutput, location: rezparse::parser::ast::SourceLocation) -> &str {
    output.file_name(location).unwrap_or("<unknown>")
}

fn describe(declaration: &Declaration) -> String {
    match declaration {
        Declaration::Type(def) => format!(
            "type {}{} ({} fields)",
            def.type_code,
            def.id_filter.map(|f| format!(" {:?}", f)).unwrap_or_default(),
            def.fields.len()
        ),
        Declaration::Alias(def) => format!("type {} as {}", def.type_code, def.target.type_code),
        Declaration::Resource(def) => format!(
            "resource {} ({}) with {} values",
            def.spec.type_code,
            def.spec.id,
            def.body.len()
        ),
        Declaration::Data(def) => format!(
            "data {} ({}) of {} bytes",
            def.spec.type_code,
            def.spec.id,
            def.bytes().map_or(0, |bytes| bytes.len())
        ),
        Declaration::Enum(def) => format!(
            "enum {}with {} constants",
            def.name.as_deref().map(|n| format!("{} ", n)).unwrap_or_default(),
            def.constants.len()
        ),
        Declaration::Read(def) => format!(
            "read {} ({}) from \"{}\"",
            def.spec.type_code,
            def.spec.id,
            String::from_utf8_lossy(&def.path)
        ),
        Declaration::Include(def) => {
            format!("include \"{}\"", String::from_utf8_lossy(&def.path))
        }
        Declaration::Delete(def) => format!("delete {}", def.target.type_code),
        Declaration::Change(def) => format!(
            "change {} to {} ({})",
            def.from.type_code, def.to.type_code, def.to.id
        ),
    }
}
