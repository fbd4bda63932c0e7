use super::super::tests::FixedClock;
use super::*;
use crate::pipeline::Pipeline;

// 2025-01-01T00:00:00 in "local epoch ms"
const BASE: i64 = 1_735_689_600_000;

const OWNER: &str = "@Kel Vara#690000000000001|(0,0,0,0)|(100/100)";
const DROID: &str = "Sentry Droid {3273941900591104}:5320000112163|(0,0,0,0)|(50000/50000)";
const OWNER_ID: u64 = 690000000000001;
const DROID_ID: u64 = 5320000112163;

fn tracked_pipeline() -> (Pipeline, EncounterStats) {
    let mut p = Pipeline::with_clock(Arc::new(FixedClock {
        now: BASE + 80_000_000,
    }));
    let stats = EncounterStats::new();
    p.register_plugin(Box::new(stats.clone()));
    feed(
        &mut p,
        &[
            format!(
                "[06:00:00.000] [{OWNER}] [] [] \
                 [AreaEntered {{836045448953664}}: Vaiken Spacedock {{137438989504}}]"
            ),
            format!(
                "[06:00:01.000] [{OWNER}] [] [] [Event {{836045448945472}}: EnterCombat {{836045448945489}}]"
            ),
        ],
    );
    (p, stats)
}

fn feed(p: &mut Pipeline, lines: &[String]) {
    for line in lines {
        p.process_line(line).expect("test line parses");
    }
}

fn damage(time: &str, ability: &str, ability_id: u64, tail: &str) -> String {
    format!(
        "[{time}] [{OWNER}] [{DROID}] [{ability} {{{ability_id}}}] \
         [Event {{836045448945472}}: Damage {{836045448945501}}] {tail}"
    )
}

fn damage_taken(time: &str, tail: &str) -> String {
    format!(
        "[{time}] [{DROID}] [{OWNER}] [Blast {{900}}] \
         [Event {{836045448945472}}: Damage {{836045448945501}}] {tail}"
    )
}

#[test]
fn adopts_the_owner_and_accumulates_output() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[
            damage("06:00:02.000", "Slash", 101, "(600* energy {1}) <600>"),
            damage("06:00:04.000", "Slash", 101, "(400 energy {1}) <400>"),
            damage("06:00:06.000", "Burn", 102, "(250 elemental {2}) <250>"),
        ],
    );

    assert_eq!(stats.tracked_entity(), Some(OWNER_ID));
    let summary = stats.summary();
    assert_eq!(summary.tracked_id, OWNER_ID);
    assert_eq!(summary.damage.total, 1250);
    assert_eq!(summary.damage.largest_hit, 600);
    assert!((summary.damage.crit_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.threat.total, 1250);
    assert!(summary.threat.available);

    // 5 seconds in combat (enter at :01, last damage at :06)
    assert_eq!(summary.duration_ms, 5_000);
    assert!((summary.damage.dps - 250.0).abs() < 1e-9);
}

#[test]
fn ability_breakdown_rows() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[
            damage("06:00:02.000", "Slash", 101, "(600 energy {1})"),
            damage("06:00:03.000", "Slash", 101, "(400 energy {1})"),
            damage("06:00:04.000", "Burn", 102, "(250 elemental {2})"),
        ],
    );

    let rows = stats.top_damage_abilities(10);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Slash");
    assert_eq!(rows[0].total, 1000);
    assert_eq!(rows[0].hits, 2);
    assert!((rows[0].avg - 500.0).abs() < 1e-9);
    assert!((rows[0].share - 0.8).abs() < 1e-9);
    assert_eq!(rows[1].name, "Burn");

    let rows = stats.top_damage_abilities(1);
    assert_eq!(rows.len(), 1);
}

#[test]
fn intake_defense_and_deaths() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[
            damage_taken("06:00:02.000", "(1000 energy {1})"),
            damage_taken("06:00:03.000", "(0 -dodge {836045448945505})"),
            damage_taken("06:00:04.000", "(500 energy {1} -shield {836045448945509} (200 absorbed {836045448945511}))"),
            format!(
                "[06:00:05.000] [{DROID}] [{OWNER}] [] [Event {{836045448945472}}: Death {{836045448945493}}]"
            ),
        ],
    );

    let summary = stats.summary();
    assert_eq!(summary.taken.total, 1500);
    assert_eq!(summary.taken.defended, 1);
    assert_eq!(summary.taken.shielded, 1);
    assert_eq!(summary.taken.deaths, 1);

    let by_source = stats.top_damage_taken_by_source(5);
    assert_eq!(by_source.len(), 1);
    assert_eq!(by_source[0].id, DROID_ID);
    assert_eq!(by_source[0].total, 1500);
    assert!((by_source[0].share - 1.0).abs() < 1e-9);
}

#[test]
fn healing_and_overheal() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[format!(
            "[06:00:02.000] [{OWNER}] [=] [Kolto Shot {{300}}] \
             [Event {{836045448945472}}: Heal {{836045448945500}}] (4000* ~1500) <1000>"
        )],
    );

    let summary = stats.summary();
    assert_eq!(summary.healing.total, 4000);
    assert_eq!(summary.healing.overheal, 1500);
    assert_eq!(summary.healing.effective, 2500);
    assert!((summary.healing.crit_rate - 1.0).abs() < 1e-9);

    let received = stats.top_healing_received_by_source(5);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, OWNER_ID);
}

#[test]
fn effect_uptime_windows() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[
            format!(
                "[06:00:02.000] [{OWNER}] [=] [Hunker Down {{400}}] \
                 [ApplyEffect {{836045448945477}}: Hunker Down {{400}}]"
            ),
            damage("06:00:04.000", "Slash", 101, "(100 energy {1})"),
            format!(
                "[06:00:06.000] [{OWNER}] [=] [Hunker Down {{400}}] \
                 [RemoveEffect {{836045448945478}}: Hunker Down {{400}}]"
            ),
            damage("06:00:11.000", "Slash", 101, "(100 energy {1})"),
        ],
    );

    let rows = stats.effect_uptimes();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Hunker Down");
    // active 4s of a 10s window
    assert!((rows[0].uptime - 0.4).abs() < 1e-9);
}

#[test]
fn burst_windows() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[
            damage("06:00:02.000", "Slash", 101, "(1000 energy {1})"),
            damage("06:00:03.000", "Slash", 101, "(1000 energy {1})"),
            damage("06:00:20.000", "Slash", 101, "(100 energy {1})"),
        ],
    );

    // best 5s window holds the two 1000s
    let burst = stats.peak_dps_window(5_000).unwrap();
    assert!((burst.peak_rate - 400.0).abs() < 1e-9);
    assert!(stats.peak_dps_window(0).is_none());
    assert!(stats.peak_hps_window(5_000).is_none());
}

#[test]
fn explicit_tracking_survives_reset() {
    let (mut p, stats) = tracked_pipeline();
    stats.set_tracked_entity(DROID_ID);
    feed(
        &mut p,
        &[damage_taken("06:00:02.000", "(1000 energy {1})")],
    );
    assert_eq!(stats.summary().damage.total, 1000, "droid output is tracked");

    feed(
        &mut p,
        &[format!(
            "[06:10:00.000] [{OWNER}] [] [] \
             [AreaEntered {{836045448953664}}: Vaiken Spacedock {{137438989504}}]"
        )],
    );
    assert_eq!(stats.tracked_entity(), Some(DROID_ID));
    assert_eq!(stats.summary().damage.total, 0);
}

#[test]
fn summary_json_is_compact() {
    let (mut p, stats) = tracked_pipeline();
    feed(
        &mut p,
        &[damage("06:00:02.000", "Slash", 101, "(600 energy {1})")],
    );
    let json = stats.summary_json();
    assert!(json.starts_with('{'));
    assert!(json.contains("\"dps\":"));
    assert!(json.contains("\"deaths\":0"));
}
