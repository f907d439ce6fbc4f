use std::io::IsTerminal;

use moonhost_stdlib::new_state;
use moonhost_vm::{new_table, LuaError, Options, State, Value};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!("moonhost ", env!("CARGO_PKG_VERSION"), " -- Lua 5.1");

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    let mut script_file: Option<String> = None;
    let mut exec_statements: Vec<String> = Vec::new();
    let mut load_modules: Vec<String> = Vec::new();
    let mut interactive = false;
    let mut show_version = false;
    let mut script_args: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--" => {
                if let Some(script) = args.get(i + 1) {
                    script_file = Some(script.clone());
                    script_args = args[i + 2..].to_vec();
                }
                break;
            }
            "-v" => {
                show_version = true;
                i += 1;
            }
            "-i" => {
                interactive = true;
                i += 1;
            }
            "-e" | "-l" => {
                let Some(value) = args.get(i + 1) else {
                    fail(&format!("'{}' needs argument", args[i]));
                };
                if args[i] == "-e" {
                    exec_statements.push(value.clone());
                } else {
                    load_modules.push(value.clone());
                }
                i += 2;
            }
            arg if arg.starts_with("-e") && arg.len() > 2 => {
                exec_statements.push(arg[2..].to_string());
                i += 1;
            }
            arg if arg.starts_with("-l") && arg.len() > 2 => {
                load_modules.push(arg[2..].to_string());
                i += 1;
            }
            arg if arg.starts_with('-') && arg != "-" => {
                fail(&format!("unrecognized option '{arg}'"));
            }
            _ => {
                script_file = Some(args[i].clone());
                script_args = args[i + 1..].to_vec();
                break;
            }
        }
    }

    if show_version {
        println!("{VERSION}");
    }

    let mut state = match new_state(Options::default()) {
        Ok(state) => state,
        Err(e) => fail(&e.to_string()),
    };
    set_arg_table(&mut state, &args[0], script_file.as_deref(), &script_args);

    for name in &load_modules {
        let require = state.get_global("require");
        report(state.pcall(&require, vec![Value::from(name.as_str())]));
    }
    for stat in &exec_statements {
        report(run_chunk(&mut state, stat.as_bytes(), "(command line)", Vec::new()));
    }

    let stdin_is_tty = std::io::stdin().is_terminal();
    match script_file.as_deref() {
        Some(path) => {
            let args = script_args.iter().map(|a| Value::from(a.as_str())).collect();
            // "-" names standard input, which `load_file` reads for "".
            let path = if path == "-" { "" } else { path };
            let result = state
                .load_file(path)
                .and_then(|chunk| state.pcall(&Value::Function(chunk), args));
            report(result);
            if interactive {
                run_repl(&mut state);
            }
        }
        None if interactive => run_repl(&mut state),
        None if !exec_statements.is_empty() || show_version => {}
        None if stdin_is_tty => {
            println!("{VERSION}");
            run_repl(&mut state);
        }
        None => report(
            state
                .load_file("")
                .and_then(|chunk| state.pcall(&Value::Function(chunk), Vec::new())),
        ),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MOONHOST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("moonhost: {message}");
    std::process::exit(1);
}

fn report<T>(result: Result<T, LuaError>) {
    if let Err(e) = result {
        fail(&e.to_string());
    }
}

/// `arg[0]` is the script, `arg[1..]` its arguments, `arg[-1]` the host.
fn set_arg_table(state: &mut State, program: &str, script: Option<&str>, script_args: &[String]) {
    let arg = new_table(script_args.len(), 2);
    {
        let mut t = arg.borrow_mut();
        t.raw_set_int(-1, Value::from(program));
        if let Some(script) = script {
            t.raw_set_int(0, Value::from(script));
        }
        for (j, a) in script_args.iter().enumerate() {
            t.raw_set_int(j as i64 + 1, Value::from(a.as_str()));
        }
    }
    state.set_global("arg", Value::Table(arg));
}

fn run_chunk(
    state: &mut State,
    source: &[u8],
    name: &str,
    args: Vec<Value>,
) -> Result<Vec<Value>, LuaError> {
    let chunk = state.load_buffer(source, name)?;
    state.pcall(&Value::Function(chunk), args)
}

fn run_repl(state: &mut State) {
    let config = rustyline::config::Config::builder()
        .auto_add_history(true)
        .build();

    let mut rl = match rustyline::DefaultEditor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("moonhost: cannot initialize REPL: {e}");
            return;
        }
    };

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => continue,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("moonhost: readline error: {e}");
                break;
            }
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        // Expressions print their values; anything else runs as a statement.
        let expr = format!("return {line}");
        let result = match state.load_buffer(expr.as_bytes(), "stdin") {
            Ok(chunk) => state.pcall(&Value::Function(chunk), Vec::new()),
            Err(_) => run_statement(state, &mut rl, line),
        };
        match result {
            Ok(values) if !values.is_empty() => {
                let parts: Vec<String> = values.iter().map(Value::to_string).collect();
                println!("{}", parts.join("\t"));
            }
            Ok(_) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
}

/// Compile `line`, reading continuation lines while the input ends early.
fn run_statement(
    state: &mut State,
    rl: &mut rustyline::DefaultEditor,
    mut source: String,
) -> Result<Vec<Value>, LuaError> {
    loop {
        match state.load_buffer(source.as_bytes(), "stdin") {
            Ok(chunk) => return state.pcall(&Value::Function(chunk), Vec::new()),
            Err(e) if e.to_string().contains("<eof>") => match rl.readline(">> ") {
                Ok(more) => {
                    source.push('\n');
                    source.push_str(&more);
                }
                Err(_) => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
