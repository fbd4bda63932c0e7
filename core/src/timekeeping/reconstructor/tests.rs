use super::*;
use crate::combat_log::{CombatEvent, LineParser, TimeStamp};

// 2025-01-01T00:00:00 in "local epoch ms"
const BASE: i64 = 1_735_689_600_000;

/// Clock pinned to a fixed instant, UTC offset zero.
struct FixedClock {
    now: i64,
}

impl ClockSource for FixedClock {
    fn now_local_epoch_ms(&self) -> i64 {
        self.now
    }

    fn utc_offset_ms(&self) -> i64 {
        0
    }

    fn is_synchronized(&self) -> bool {
        true
    }
}

fn reconstructor_at(now: i64) -> TimeReconstructor {
    TimeReconstructor::new(Arc::new(FixedClock { now }))
}

fn event_at(combat_ms: u32) -> CombatEvent<'static> {
    CombatEvent {
        time: TimeStamp::from_combat_ms(combat_ms),
        ..CombatEvent::default()
    }
}

fn area_event_at(combat_ms: u32) -> CombatEvent<'static> {
    let line = format!(
        "[{:02}:{:02}:{:02}.{:03}] [@Kel Vara#1|(0,0,0,0)|(1/1)] [] [] \
         [AreaEntered {{836045448953664}}: Vaiken Spacedock {{137438989504}}]",
        combat_ms / 3_600_000,
        (combat_ms / 60_000) % 60,
        (combat_ms / 1000) % 60,
        combat_ms % 1000,
    );
    let event = LineParser::new().parse_line(&line).unwrap();
    event.deep_clone()
}

fn run(recon: &mut TimeReconstructor, combat_ms: u32) -> i64 {
    let mut event = event_at(combat_ms);
    recon.process(&mut event);
    event.time.epoch_ms
}

#[test]
fn assigns_base_plus_combat_ms() {
    let mut recon = reconstructor_at(BASE + 50_000_000);
    assert_eq!(run(&mut recon, 3_600_000), BASE + 3_600_000);
    assert_eq!(recon.base_date_epoch_ms(), BASE);
}

#[test]
fn rolls_base_back_when_line_is_in_the_future() {
    // host synchronized just after midnight, log written just before it
    let mut recon = reconstructor_at(BASE + 600);
    let epoch = run(&mut recon, 86_399_500);
    assert_eq!(recon.base_date_epoch_ms(), BASE - MS_PER_DAY);
    assert_eq!(epoch, BASE - MS_PER_DAY + 86_399_500);
}

#[test]
fn midnight_rollover_two_phase() {
    let mut recon = reconstructor_at(BASE + 86_399_600);

    // 23:59:59.500 arms near-midnight
    assert_eq!(run(&mut recon, 86_399_500), BASE + 86_399_500);
    // 00:00:00.600 lands in the next day but does not commit yet
    assert_eq!(run(&mut recon, 600), BASE + 86_400_600);
    assert_eq!(recon.base_date_epoch_ms(), BASE);
    // a late arrival from before midnight is still honored
    assert_eq!(run(&mut recon, 86_399_900), BASE + 86_400_600); // clamped
    // 00:01:00.000 commits the rollover
    assert_eq!(run(&mut recon, 60_000), BASE + 86_460_000);
    assert_eq!(recon.base_date_epoch_ms(), BASE + MS_PER_DAY);
    assert_eq!(recon.stats().midnight_rollovers, 1);
    assert!(recon.stats().time_jumps >= 1);
}

#[test]
fn late_arrivals_are_clamped_and_counted() {
    let mut recon = reconstructor_at(BASE + 50_000_000);
    let a = run(&mut recon, 10_000_000);
    let b = run(&mut recon, 9_998_000); // 2s late
    assert_eq!(b, a);
    assert_eq!(recon.stats().late_arrival_total_ms, 2_000);
    assert_eq!(recon.stats().max_late_arrival_ms, 2_000);
    assert_eq!(recon.stats().time_jumps, 1);
}

#[test]
fn raw_mode_skips_the_clamp() {
    let mut recon = reconstructor_at(BASE + 50_000_000).with_late_arrival_adjustment(false);
    let a = run(&mut recon, 10_000_000);
    let b = run(&mut recon, 9_998_000);
    assert_eq!(b, a - 2_000);
    assert_eq!(recon.stats().late_arrival_total_ms, 0);
}

#[test]
fn area_entered_reanchors_and_counts() {
    let mut recon = reconstructor_at(BASE + 50_000_000);
    run(&mut recon, 10_000_000);

    let mut area = area_event_at(11_000_000);
    recon.process(&mut area);
    assert_eq!(area.time.epoch_ms, BASE + 11_000_000);
    assert_eq!(recon.stats().area_events, 1);
    assert_eq!(recon.base_date_epoch_ms(), BASE);
}

#[test]
fn monotone_over_random_late_arrivals() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);

    let mut recon = reconstructor_at(BASE + 80_000_000);
    let mut last = i64::MIN;
    let mut t = 40_000_000i64;
    for _ in 0..2_000 {
        t += rng.gen_range(0..1_500);
        // permute within a 5-second window
        let jitter = rng.gen_range(0..5_000);
        let combat_ms = (t - jitter).max(0) as u32;
        let epoch = run(&mut recon, combat_ms);
        assert!(epoch >= last, "epoch regressed: {epoch} < {last}");
        last = epoch;
    }
}

#[test]
fn reset_clears_state_and_stats() {
    let mut recon = reconstructor_at(BASE + 50_000_000);
    run(&mut recon, 10_000_000);
    recon.reset();
    assert_eq!(recon.stats(), ReconstructorStats::default());
    assert_eq!(recon.last_combat_ms(), 0);
}
