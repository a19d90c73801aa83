//! Rewrite an S-expression document in canonical form
//!
//! Usage:
//!   sexpr_fmt <file> [options]
//!
//! Options:
//!   --check             Exit with status 1 when the file is not canonical
//!   --stats             Print zone polygon statistics instead of the text
//!   --config <json>     Load parse/format/geometry options from a JSON file
//!
//! Boards and library tables go through their own parsers; any other
//! document is printed as a generic tree. Set `RUST_LOG` for diagnostics.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};

use pcb_kernel::board::{board_from_tree, format_board, Board};
use pcb_kernel::config::KernelConfig;
use pcb_kernel::libtable::{table_from_tree, LibTableKind};
use pcb_kernel::report::{LogReporter, Reporter};
use pcb_kernel::sexpr::{self, NumericScope, IU_PER_MM};

struct Args {
    path: PathBuf,
    check: bool,
    stats: bool,
    config: Option<PathBuf>,
}

fn usage(program: &str) {
    eprintln!("Usage: {} <file> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --check            Exit with status 1 when the file is not canonical");
    eprintln!("  --stats            Print zone polygon statistics");
    eprintln!("  --config <json>    Load options from a JSON file");
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut path = None;
    let mut check = false;
    let mut stats = false;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--check" => check = true,
            "--stats" => stats = true,
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(p) => config = Some(PathBuf::from(p)),
                    None => bail!("--config needs a file name"),
                }
            }
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            file => {
                if path.is_some() {
                    bail!("only one input file is accepted");
                }
                path = Some(PathBuf::from(file));
            }
        }
        i += 1;
    }

    let path = path.context("no input file given")?;
    Ok(Args { path, check, stats, config })
}

fn mm2(iu2: f64) -> f64 {
    iu2 / (IU_PER_MM * IU_PER_MM)
}

fn print_stats(board: &Board) {
    println!("zones: {}", board.zones.len());
    for (i, zone) in board.zones.iter().enumerate() {
        let label = zone.name.clone().unwrap_or_else(|| format!("#{}", i));
        println!(
            "zone {} net '{}': outline area {:.4} mm2, {} outline vertices",
            label,
            zone.net_name,
            mm2(zone.outline.area()),
            zone.outline.vertex_count()
        );
        for fill in &zone.fills {
            let restored = fill.polygons.unfracture();
            println!(
                "  fill {}: {} islands, {} holes, area {:.4} mm2, {} fractured vertices",
                fill.layer,
                restored.outline_count(),
                restored.hole_count(),
                mm2(fill.polygons.area()),
                fill.polygons.vertex_count()
            );
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let config = match &args.config {
        Some(path) => KernelConfig::from_json_file(path)?,
        None => KernelConfig::default(),
    };
    let text = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    let _scope = NumericScope::enter();
    let root = sexpr::parse(&text).with_context(|| format!("failed to parse {}", args.path.display()))?;
    let mut log_reporter = LogReporter;
    let mut reporter: Option<&mut dyn Reporter> = Some(&mut log_reporter);

    let head = root.head().unwrap_or_default();
    let canonical = if head == "kicad_pcb" {
        let board = board_from_tree(&root, &config.parse, reporter, None)?;
        if args.stats {
            print_stats(&board);
            return Ok(true);
        }
        format_board(&board, &config.format)
    } else if LibTableKind::from_root_keyword(head).is_some() {
        let table = table_from_tree(&root, &mut reporter)?;
        table.to_sexpr_string(&config.format)
    } else {
        log::debug!("no grammar for '{}', printing generic tree", head);
        root.to_sexpr_string_with(&config.format)
    };

    if args.stats {
        println!("no zone statistics for '{}'", head);
        return Ok(true);
    }
    if args.check {
        let ok = canonical == text;
        if !ok {
            eprintln!("{}: not in canonical form", args.path.display());
        }
        return Ok(ok);
    }
    print!("{}", canonical);
    Ok(true)
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("sexpr_fmt");
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {}", err);
            usage(program);
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
