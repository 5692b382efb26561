use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use html2tex::{convert_with, Options};

/// Convert an HTML document to LaTeX.
#[derive(Debug, Parser)]
#[command(name = "html2tex", version, about)]
struct Args {
    /// Collapse whitespace while parsing
    #[arg(long)]
    minify: bool,

    /// Download referenced images into DIR
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// Keep original image URLs instead of downloading
    #[arg(long)]
    no_download: bool,

    /// Input HTML file, or `-` for stdin
    input: PathBuf,

    /// Output LaTeX file, or `-`/omitted for stdout
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let html = match read_input(&args.input) {
        Ok(html) => html,
        Err(err) => {
            eprintln!("html2tex: cannot read {}: {err}", args.input.display());
            return ExitCode::from(1);
        }
    };

    let mut options = Options::new()
        .with_minify(args.minify)
        .with_downloads(!args.no_download);
    if let Some(dir) = &args.images {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("html2tex: cannot create {}: {err}", dir.display());
            return ExitCode::from(1);
        }
        options = options.with_image_dir(dir);
    }

    let tex = match convert_with(&html, &options) {
        Ok(tex) => tex,
        Err(err) => {
            eprintln!("html2tex: conversion failed: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = write_output(args.output.as_deref(), &tex) {
        eprintln!("html2tex: cannot write output: {err}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn read_input(path: &std::path::Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut html = String::new();
        io::stdin().read_to_string(&mut html)?;
        Ok(html)
    } else {
        std::fs::read_to_string(path)
    }
}

fn write_output(path: Option<&std::path::Path>, tex: &str) -> io::Result<()> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::write(path, tex),
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(tex.as_bytes())?;
            stdout.flush()
        }
    }
}
