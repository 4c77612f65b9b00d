use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use livelisp::interpreter::cps::printer::print;
use livelisp::interpreter::cps_json::to_json_string;
use livelisp::reader::read_form;
use livelisp::{Error, Interpreter, Value};

#[derive(Parser, Debug)]
#[command(name = "livelisp", version, about = "Evaluate livelisp programs or start a REPL")]
struct Cli {
    /// Program file to run; starts a REPL when absent
    file: Option<PathBuf>,

    /// Evaluate this source instead of a file
    #[arg(short, long)]
    eval: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print what each top-level form expanded into instead of the result
    #[arg(long)]
    expand: bool,

    /// Log filter directive
    #[arg(long, env = "LIVELISP_LOG", default_value = "warn")]
    log: String,

    /// Write logs to a daily file in this directory instead of stderr
    #[arg(long, env = "LIVELISP_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "livelisp.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(ChronoLocal::rfc_3339())
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn render(value: &Value, json: bool) -> Result<String, Error> {
    if json {
        Ok(to_json_string(value)?)
    } else {
        Ok(print(value))
    }
}

fn run(rt: &Interpreter, src: &str, cli: &Cli) -> Result<(), Error> {
    let program = rt.read(src)?;
    let value = rt.eval(&program)?;
    match (&program, cli.expand) {
        (Value::List(forms), true) => {
            for form in forms.items() {
                println!("{}", render(&rt.expand(form), cli.json)?);
            }
        }
        _ => println!("{}", render(&value, cli.json)?),
    }
    Ok(())
}

/// `:expand <form>` expands one macro step without evaluating.
fn expand_command(rt: &Interpreter, src: &str) -> Result<Value, Error> {
    let form = read_form(src, rt.keywords())?;
    Ok(rt.macroexpand(&form)?)
}

fn repl(rt: &Interpreter, cli: &Cli) {
    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("livelisp".to_string()), DefaultPromptSegment::Empty);

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                let result = match line {
                    "" => continue,
                    ":quit" => break,
                    _ => match line.strip_prefix(":expand") {
                        Some(form) => expand_command(rt, form),
                        None => rt.read_eval(line),
                    },
                };
                match result.and_then(|value| render(&value, cli.json)) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("{}", e.to_string().red()),
                }
            }
            Ok(Signal::CtrlD) => break,
            Ok(Signal::CtrlC) => continue,
            Ok(_) => continue,
            Err(e) => {
                error!("line editor failed: {}", e);
                break;
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);
    let rt = Interpreter::new();

    let src = match (&cli.eval, &cli.file) {
        (Some(src), _) => src.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(src) => src,
            Err(e) => {
                eprintln!("{}", format!("{}: {}", path.display(), e).red());
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            repl(&rt, &cli);
            return ExitCode::SUCCESS;
        }
    };

    match run(&rt, &src, &cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}
