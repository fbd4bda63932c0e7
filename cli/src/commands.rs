use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use holotrace_core::combat_log::{format_duration_ms, to_text, PrintOptions};
use holotrace_core::timekeeping::NtpTimeKeeper;
use holotrace_core::{ClockSource, DamageMeter, EncounterStats, Pipeline};

use crate::config::HostConfig;
use crate::reader::LogFile;

fn keeper_for(cfg: &HostConfig) -> NtpTimeKeeper {
    NtpTimeKeeper::new(cfg.ntp_servers.clone(), cfg.ntp_timeout_ms)
}

pub fn parse_file(cfg: &HostConfig, path: &Path, no_sync: bool) -> Result<()> {
    let keeper = keeper_for(cfg);
    if !no_sync {
        if let Err(err) = keeper.synchronize(false) {
            warn!(%err, "continuing on the host clock");
        }
    }

    let mut pipeline = Pipeline::with_clock(Arc::new(keeper));
    let meter = DamageMeter::new();
    let stats = EncounterStats::new();
    pipeline.register_plugin(Box::new(meter.clone()));
    pipeline.register_plugin(Box::new(stats.clone()));

    let file = LogFile::open(path)?;
    for line in file.lines() {
        // malformed lines are counted by the pipeline; keep going
        let _ = pipeline.process_line(&line);
    }

    report(&pipeline, &meter, &stats);
    Ok(())
}

fn report(pipeline: &Pipeline, meter: &DamageMeter, stats: &EncounterStats) {
    let counts = pipeline.stats();
    println!("lines processed:    {}", counts.lines_processed);
    println!("malformed lines:    {}", counts.malformed_lines);

    let recon = pipeline.reconstructor_stats();
    println!("area events:        {}", recon.area_events);
    println!("midnight rollovers: {}", recon.midnight_rollovers);
    println!("time jumps:         {}", recon.time_jumps);
    if recon.max_late_arrival_ms > 0 {
        println!(
            "late arrivals:      {} ms total, {} ms worst",
            recon.late_arrival_total_ms, recon.max_late_arrival_ms
        );
    }

    let state = pipeline.state();
    println!("in combat at eof:   {}", pipeline.is_in_combat());
    println!("last encounter:     {}", format_duration_ms(state.combat_duration_ms()));
    if let Some(area) = state.last_area() {
        println!("last area:          {} ({})", area.area.name, area.difficulty_kind.label());
    }
    if let Some(owner) = state.owner() {
        println!("owner:              {}", owner.name);
    }
    if let Some(event) = pipeline.last_event() {
        let single_line = PrintOptions {
            multiline: false,
            ..PrintOptions::default()
        };
        println!("last event:         {}", to_text(event, &single_line));
    }

    let registry = pipeline.registry();
    println!("entities tracked:   {}", registry.len());
    println!("damage by source:");
    for (id, damage) in meter.rows().into_iter().take(10) {
        let name = registry
            .get(id)
            .map(|e| e.entity.name)
            .filter(|n| !n.is_empty())
            .unwrap_or("<environment>");
        println!("  {name:<32} {damage:>12}");
    }

    let summary = stats.summary();
    if summary.tracked_id != 0 {
        println!("owner summary:");
        println!(
            "  dps {:.1}  hps {:.1}  dtps {:.1}  apm {:.1}  deaths {}",
            summary.damage.dps,
            summary.healing.hps,
            summary.taken.dtps,
            summary.apm,
            summary.taken.deaths
        );
        for row in stats.top_damage_abilities(5) {
            println!(
                "  {:<30} {:>10}  ({} hits, {:.0}% crit, {:.0}% share)",
                row.name,
                row.total,
                row.hits,
                row.crit_rate * 100.0,
                row.share * 100.0
            );
        }
    }
}

pub fn sync_clock(cfg: &HostConfig) -> Result<()> {
    let keeper = keeper_for(cfg);
    match keeper.synchronize(true) {
        Ok(offset) => {
            let result = keeper.last_result();
            if let Some(result) = result.filter(|r| r.is_success()) {
                println!(
                    "synchronized against {}: offset {} ms, round trip {} ms",
                    result.server, result.offset_ms, result.round_trip_ms
                );
            } else {
                println!("synchronized: offset {offset} ms");
            }
        }
        Err(err) => {
            println!("synchronization failed: {err}");
            if let Some(result) = keeper.last_result() {
                if let Some(error) = result.error {
                    println!("last attempt ({}): {error}", result.server);
                }
            }
        }
    }
    println!("local utc offset: {} ms", keeper.utc_offset_ms());
    Ok(())
}

pub fn show_config(cfg: &HostConfig) -> Result<()> {
    println!("ntp timeout: {} ms", cfg.ntp_timeout_ms);
    println!("ntp servers:");
    for server in &cfg.ntp_servers {
        println!("  {server}");
    }
    Ok(())
}
