use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Parser;
use emoti_core::{
    CompileOptions, CompileResponse, CoreError, MAX_DEPTH_CEILING, compile_with_options,
    load_source_files,
};
use tracing::{debug, info};

/// Compile EmotiLang programs to JavaScript.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile (reads stdin when absent)
    #[arg(short, long)]
    input: Option<String>,

    /// Where to write the result (writes stdout when absent)
    #[arg(short, long)]
    output: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        conflicts_with_all = ["input", "output"],
        help = "Compile every .emoti file below DIR to a sibling .js file"
    )]
    dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "js",
        help = "Output format: js, trace, json"
    )]
    emit: String,

    #[arg(long, help = "Run the generated JavaScript with node")]
    run: bool,

    #[arg(
        long,
        value_name = "N",
        value_parser = parse_max_depth,
        help = "Maximum expression and block nesting depth (default 256, at most 512); \
                every binary operator in a chain such as `a :+) b :+) c` counts as one level"
    )]
    max_depth: Option<usize>,

    #[arg(long, value_name = "BYTES", help = "Reject sources larger than this")]
    max_source_bytes: Option<usize>,

    #[arg(long, help = "Leave the token listing out of the debug trace")]
    no_token_trace: bool,

    #[arg(short, long, help = "Log compiler stages at debug level")]
    verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    log_json: bool,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        let defaults = CompileOptions::default();
        CompileOptions {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            max_source_bytes: self.max_source_bytes.unwrap_or(defaults.max_source_bytes),
            trace_tokens: !self.no_token_trace,
        }
    }
}

fn parse_max_depth(value: &str) -> Result<usize, String> {
    let depth: usize = value
        .parse()
        .map_err(|err| format!("`{value}` is not a nesting depth: {err}"))?;
    if !(1..=MAX_DEPTH_CEILING).contains(&depth) {
        return Err(format!("must be between 1 and {MAX_DEPTH_CEILING}"));
    }
    Ok(depth)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    execute(cli)
}

fn init_logging(verbose: bool, json: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().with_current_span(false).init();
    } else {
        builder.init();
    }
}

fn execute(cli: Cli) -> Result<()> {
    let options = cli.options();
    if let Some(dir) = &cli.dir {
        if cli.emit != "js" {
            return Err(CoreError::UnsupportedFormat(format!("{} (with --dir)", cli.emit)).into());
        }
        return compile_dir(dir, &options, cli.run);
    }

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };

    let result = compile_with_options(&source, &options);
    info!(success = result.success, "compiled input");

    match cli.emit.as_str() {
        "js" => {
            if !result.success {
                return Err(compilation_failed(result.error_summary));
            }
            write_output(cli.output.as_deref().map(Path::new), &result.generated_code)?;
            if cli.run {
                run_node(&result.generated_code)?;
            }
        }
        "trace" => {
            write_output(cli.output.as_deref().map(Path::new), &result.debug_trace)?;
            if !result.success {
                return Err(compilation_failed(result.error_summary));
            }
        }
        "json" => {
            let json = CompileResponse::from(&result).to_json()?;
            write_output(cli.output.as_deref().map(Path::new), &format!("{json}\n"))?;
            if !result.success {
                return Err(compilation_failed(result.error_summary));
            }
        }
        other => return Err(CoreError::UnsupportedFormat(other.to_string()).into()),
    }

    if cli.run && cli.emit != "js" {
        eprintln!("--run is ignored for non-js outputs");
    }

    Ok(())
}

fn compile_dir(dir: &Path, options: &CompileOptions, run: bool) -> Result<()> {
    let files = load_source_files(dir)
        .with_context(|| format!("failed to collect sources under {}", dir.display()))?;
    let mut failed = 0usize;
    for file in &files {
        let result = compile_with_options(&file.contents, options);
        if !result.success {
            failed += 1;
            eprintln!("{}:\n{}", file.path.display(), result.error_summary);
            continue;
        }
        let target = dir.join(file.output_path());
        debug!(source = %file.path.display(), target = %target.display(), "writing output");
        write_output(Some(&target), &result.generated_code)?;
        if run {
            run_node(&result.generated_code)?;
        }
    }
    println!(
        "compiled {} of {} file(s) under {}",
        files.len() - failed,
        files.len(),
        dir.display()
    );
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to compile");
    }
    Ok(())
}

fn compilation_failed(summary: String) -> anyhow::Error {
    CoreError::Compilation { summary }.into()
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    let Some(path) = path else {
        io::stdout()
            .write_all(text.as_bytes())
            .context("failed to write to stdout")?;
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, text)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

/// Feed the program to `node` on stdin, inheriting its stdout and stderr.
fn run_node(code: &str) -> Result<()> {
    let mut child = Command::new("node")
        .stdin(Stdio::piped())
        .spawn()
        .context("failed to start node; is it installed?")?;
    child
        .stdin
        .take()
        .context("node stdin unavailable")?
        .write_all(code.as_bytes())
        .context("failed to send program to node")?;
    let status = child.wait().context("failed to wait for node")?;
    if !status.success() {
        anyhow::bail!("program exited with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    fn cli() -> Command {
        Command::cargo_bin("emoti-cli").expect("binary exists")
    }

    fn node_available() -> bool {
        std::process::Command::new("node")
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    #[test]
    fn compiles_file_to_output() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("answer.emoti");
        fs::write(&input_path, ":< answer :> :0 <3 :0 42 ;)\n:P answer ;)").expect("write input");
        let output_path = dir.path().join("out/answer.js");

        cli()
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        let js = fs::read_to_string(&output_path).expect("read output");
        assert!(js.starts_with("// Transpiled from EmotiLang\n"));
        assert!(js.contains("console.log(answer);"));
    }

    #[test]
    fn reads_stdin_and_writes_stdout() {
        cli()
            .write_stdin(":P :L \"hi\" ;)")
            .assert()
            .success()
            .stdout(predicate::str::contains("console.log(\"hi\");"));
    }

    #[test]
    fn reports_diagnostics_on_failure() {
        cli()
            .write_stdin(":P :0 1 ;)\n:P ghost ;)")
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains(
                "resolver: NameError at line 2, column 4: undeclared identifier `ghost`",
            ));
    }

    #[test]
    fn emits_json_response() {
        cli()
            .arg("--emit")
            .arg("json")
            .write_stdin(":P :D ;)")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"success\":true"))
            .stdout(predicate::str::contains("\"js_code\""));
    }

    #[test]
    fn emits_trace_even_when_compilation_fails() {
        cli()
            .arg("--emit")
            .arg("trace")
            .write_stdin(":P :0 1 :+) :D ;)")
            .assert()
            .failure()
            .stdout(predicate::str::contains("=== LEXER ==="))
            .stdout(predicate::str::contains("TypeError"));
    }

    #[test]
    fn token_trace_flag() {
        cli()
            .args(["--emit", "trace", "--no-token-trace"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .success()
            .stdout(predicate::str::contains("=== LEXER ===\n5 tokens\n"));
    }

    #[test]
    fn rejects_unknown_format() {
        cli()
            .args(["--emit", "wasm"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported emit format: wasm"));
    }

    #[test]
    fn max_depth_flag_limits_nesting() {
        cli()
            .args(["--max-depth", "2"])
            .write_stdin(":P :( :( :0 1 :) :) ;)")
            .assert()
            .failure()
            .stderr(predicate::str::contains("LimitExceeded"));
    }

    #[test]
    fn max_depth_above_ceiling_is_rejected() {
        cli()
            .args(["--max-depth", "1000000"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .failure()
            .stderr(predicate::str::contains("must be between 1 and 512"));
    }

    #[test]
    fn max_depth_at_ceiling_is_accepted() {
        cli()
            .args(["--max-depth", "512"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .success()
            .stdout(predicate::str::contains("console.log(1);"));
    }

    #[test]
    fn help_explains_operator_chains() {
        cli()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("every binary operator in a chain"));
    }

    #[test]
    fn long_flat_chain_compiles_with_defaults() {
        let source = format!(":P :0 1{} ;)", " :+) :0 1".repeat(150));
        cli()
            .write_stdin(source)
            .assert()
            .success()
            .stdout(predicate::str::contains("console.log("));
    }

    #[test]
    fn max_source_bytes_flag() {
        cli()
            .args(["--max-source-bytes", "4"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .failure()
            .stderr(predicate::str::contains("driver: LimitExceeded"));
    }

    #[test]
    fn compiles_directory_tree() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("one.emoti"), ":P :0 1 ;)").expect("write");
        fs::write(dir.path().join("nested/two.emoti"), ":P :0 2 ;)").expect("write");

        cli()
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("compiled 2 of 2 file(s)"));

        assert!(dir.path().join("one.js").exists());
        let two = fs::read_to_string(dir.path().join("nested/two.js")).expect("read");
        assert!(two.contains("console.log(2);"));
    }

    #[test]
    fn directory_mode_reports_failing_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("good.emoti"), ":P :0 1 ;)").expect("write");
        fs::write(dir.path().join("bad.emoti"), ":P nope ;)").expect("write");

        cli()
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("bad.emoti"))
            .stderr(predicate::str::contains("1 file(s) failed to compile"));

        assert!(dir.path().join("good.js").exists());
        assert!(!dir.path().join("bad.js").exists());
    }

    #[test]
    fn verbose_logs_stages() {
        cli()
            .arg("--verbose")
            .write_stdin(":P :0 1 ;)")
            .assert()
            .success()
            .stderr(predicate::str::contains("compilation finished"));
    }

    #[test]
    fn json_logs() {
        cli()
            .args(["--verbose", "--log-json"])
            .write_stdin(":P :0 1 ;)")
            .assert()
            .success()
            .stderr(predicate::str::contains("\"message\":\"compilation finished\""));
    }

    #[test]
    fn runs_generated_code_with_node() {
        if !node_available() {
            return;
        }
        cli()
            .arg("--run")
            .write_stdin(":< i :> :0 <3 :0 6 ;)\n:P i *_* :0 7 ;)")
            .assert()
            .success()
            .stdout(predicate::str::contains("42"));
    }
}
