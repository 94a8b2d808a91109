use std::io::{self, Write};

use serde::Serialize;

use crate::fetcher::FetchReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(report: &FetchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_fetch(report: &FetchReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        Self::write_fetch(&mut stdout, report)
    }

    pub fn write_fetch(out: &mut impl Write, report: &FetchReport) -> io::Result<()> {
        let green = "\x1b[32m";
        let cyan = "\x1b[36m";
        let reset = "\x1b[0m";

        if report.dry_run {
            writeln!(out, "{cyan}dry run, nothing downloaded{reset}")?;
            for transfer in &report.transfers {
                writeln!(out, "  {}", transfer.command.join(" "))?;
            }
            return Ok(());
        }

        for transfer in &report.transfers {
            match transfer.extracted_files {
                Some(files) => writeln!(
                    out,
                    "{green}fetched {} ({}), {files} files extracted{reset}",
                    transfer.url, transfer.method
                )?,
                None => writeln!(
                    out,
                    "{green}fetched {} ({}){reset}",
                    transfer.url, transfer.method
                )?,
            }
        }
        writeln!(out, "{cyan}output: {}{reset}", report.output_dir)
    }
}
