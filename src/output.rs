use std::io::{self, Write};

use serde::Serialize;

use crate::assets::AssetReport;
use crate::domain::EntityRecord;
use crate::importer::ImportReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_import(report: &ImportReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_assets(report: &AssetReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_records(records: &[EntityRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    pub fn print_record(record: &EntityRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_import(report: &ImportReport) {
        println!(
            "{} import: {} listed, {} created, {} existing, {} errors{}",
            report.phase,
            report.listed,
            report.created,
            report.existing,
            report.errors,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        for item in report.failed() {
            println!(
                "  error {}: {}",
                item.name,
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    pub fn print_assets(report: &AssetReport) {
        println!(
            "sprites: {} records, {} downloaded, {} existing, {} errors{}",
            report.total,
            report.downloaded,
            report.existing,
            report.errors,
            if report.cancelled { " (cancelled)" } else { "" }
        );
    }

    pub fn print_records(records: &[EntityRecord]) {
        for record in records {
            println!(
                "{:>5}  {:<24} {:<20} {}",
                record.id,
                record.name,
                record.types.join("/"),
                record.generation.as_deref().unwrap_or("-")
            );
        }
    }

    pub fn print_record(record: &EntityRecord) {
        println!("#{} {}", record.id, record.name);
        println!("  height {}  weight {}", record.height, record.weight);
        println!("  types      {}", record.types.join(", "));
        println!("  abilities  {}", record.abilities.join(", "));
        println!(
            "  generation {}",
            record.generation.as_deref().unwrap_or("unknown")
        );
        println!("  evolution  {}", record.evolution.join(" -> "));
        for (stat, value) in &record.stats {
            println!("  {stat:<16} {value}");
        }
        println!("  {}", record.description);
        println!(
            "  sprite     {}{}",
            record.sprite,
            if record.has_sprite_asset() { " (embedded)" } else { "" }
        );
    }
}
