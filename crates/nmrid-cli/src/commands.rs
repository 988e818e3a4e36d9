use std::io::BufRead;

use anyhow::Context;
use colored::Colorize;
use nmrid_core::descriptor;
use nmrid_types::{ClassKind, Pid};
use serde::Serialize;

use crate::cli::*;
use crate::config::CliConfig;
use crate::console::Console;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Pid(args) => cmd_pid(args, cli.format),
        Command::Classes => cmd_classes(cli.format),
        Command::Run(args) => cmd_run(args, &config, cli.format),
        Command::Shell(args) => cmd_shell(args, config, cli.format),
    }
}

#[derive(Serialize)]
struct PidReport {
    pid: Pid,
    class: ClassKind,
    tag: &'static str,
    long: String,
    parts: Vec<String>,
}

fn cmd_pid(args: PidArgs, format: OutputFormat) -> anyhow::Result<()> {
    let pid = Pid::parse_with(&args.pid, !args.short_only)?;
    let report = PidReport {
        class: pid.kind(),
        tag: pid.type_tag(),
        long: pid.render_long(),
        parts: pid.parts().to_vec(),
        pid,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{} {}", "✓".green().bold(), report.pid.to_string().yellow());
            println!("  Class: {} ({})", report.class.to_string().cyan(), report.tag);
            println!("  Long form: {}", report.long);
            for (i, part) in report.parts.iter().enumerate() {
                println!("  Part {}: {}", i + 1, part);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ClassRow {
    class: ClassKind,
    tag: &'static str,
    parent: Option<ClassKind>,
    key_parts: usize,
    link: Option<&'static str>,
}

fn cmd_classes(format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<ClassRow> = descriptor::breadth_first()
        .into_iter()
        .map(|desc| ClassRow {
            class: desc.kind,
            tag: desc.kind.short_name(),
            parent: desc.kind.parent(),
            key_parts: desc.kind.key_arity(),
            link: desc.plural_name,
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in &rows {
                let parent = row.parent.map_or("-".to_string(), |p| p.to_string());
                println!(
                    "{:<4}{:<17}parent={:<14}keys={} {}",
                    row.tag.yellow(),
                    row.class.to_string(),
                    parent,
                    row.key_parts,
                    row.link.unwrap_or("").dimmed()
                );
            }
        }
    }
    Ok(())
}

fn cmd_run(args: RunArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let console = Console::new(config, format)?;
    let mut failures = 0;
    for (number, line) in script.lines().enumerate() {
        match console.execute(line) {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(err) if args.keep_going => {
                failures += 1;
                eprintln!("{} line {}: {err:#}", "✗".red().bold(), number + 1);
            }
            Err(err) => {
                return Err(err.context(format!("{}:{}", args.script.display(), number + 1)));
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} line(s) failed");
    }
    Ok(())
}

fn cmd_shell(args: ShellArgs, mut config: CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(name) = args.name {
        config.store_name = name;
    }
    let console = Console::new(&config, format)?;
    println!("{} project {}", "nmrid".bold(), console.project().pid()?.to_string().yellow());
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }
        match console.execute(&line) {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(err) => eprintln!("{} {err:#}", "✗".red().bold()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn script(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn run_executes_a_script() {
        let file = script("# setup\nnew Chain - A\nnew Residue MC:A 1 ALA\nverify\n");
        let args = RunArgs {
            script: file.path().to_path_buf(),
            keep_going: false,
        };
        cmd_run(args, &CliConfig::default(), OutputFormat::Text).unwrap();
    }

    #[test]
    fn run_stops_at_first_failure_with_line_number() {
        let file = script("new Chain - A\nget MC:Z\nnew Chain - B\n");
        let args = RunArgs {
            script: file.path().to_path_buf(),
            keep_going: false,
        };
        let err = cmd_run(args, &CliConfig::default(), OutputFormat::Text).unwrap_err();
        assert!(err.to_string().ends_with(":2"));
    }

    #[test]
    fn run_keep_going_counts_failures() {
        let file = script("get MC:Z\nbogus\nnew Chain - A\n");
        let args = RunArgs {
            script: file.path().to_path_buf(),
            keep_going: true,
        };
        let err = cmd_run(args, &CliConfig::default(), OutputFormat::Text).unwrap_err();
        assert_eq!(err.to_string(), "2 line(s) failed");
    }

    #[test]
    fn run_missing_script() {
        let args = RunArgs {
            script: PathBuf::from("/nonexistent/setup.nmr"),
            keep_going: false,
        };
        assert!(cmd_run(args, &CliConfig::default(), OutputFormat::Text).is_err());
    }

    #[test]
    fn pid_command_parses() {
        let args = PidArgs {
            pid: "Residue:A.1.ALA".into(),
            short_only: false,
        };
        cmd_pid(args, OutputFormat::Json).unwrap();

        let strict = PidArgs {
            pid: "Residue:A.1.ALA".into(),
            short_only: true,
        };
        assert!(cmd_pid(strict, OutputFormat::Text).is_err());
    }
}
